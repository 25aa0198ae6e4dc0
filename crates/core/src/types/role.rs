//! Administrator roles.

use serde::{Deserialize, Serialize};

/// Administrator role.
///
/// The role does not grant capabilities by itself: what an administrator may
/// do is decided by their [`Permissions`](super::Permissions). Only operations
/// documented as super-admin-only look at the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Regular administrator.
    #[default]
    Admin,
    /// Administrator allowed to run super-admin-only operations.
    SuperAdmin,
}

impl AdminRole {
    /// Whether this is the super-admin role.
    #[must_use]
    pub const fn is_super_admin(self) -> bool {
        matches!(self, Self::SuperAdmin)
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuperAdmin => write!(f, "super_admin"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid admin role: {s}")),
        }
    }
}
