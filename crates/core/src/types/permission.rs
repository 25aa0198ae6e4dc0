//! Administrator capabilities.
//!
//! Each privileged operation names exactly one [`Permission`]. An
//! administrator's [`Permissions`] is a set of named booleans, serialized as
//! a flat JSON object so it can be stored and returned as-is.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown permission name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown permission: {0}")]
pub struct PermissionError(pub String);

/// A single capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Manage platform users (students, teachers).
    ManageUsers,
    /// Manage the course catalog.
    ManageCourses,
    /// Manage blog posts.
    ManageBlog,
    /// Manage administrator accounts.
    ManageAdmins,
    /// Manage course enrollments.
    ManageMatriculas,
}

impl Permission {
    /// All capabilities, in a stable order.
    pub const ALL: [Self; 5] = [
        Self::ManageUsers,
        Self::ManageCourses,
        Self::ManageBlog,
        Self::ManageAdmins,
        Self::ManageMatriculas,
    ];

    /// The wire name of this capability.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManageUsers => "manage_users",
            Self::ManageCourses => "manage_courses",
            Self::ManageBlog => "manage_blog",
            Self::ManageAdmins => "manage_admins",
            Self::ManageMatriculas => "manage_matriculas",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PermissionError(s.to_owned()))
    }
}

/// The capability set of an administrator.
///
/// Missing fields deserialize as `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Permissions {
    pub manage_users: bool,
    pub manage_courses: bool,
    pub manage_blog: bool,
    pub manage_admins: bool,
    pub manage_matriculas: bool,
}

impl Permissions {
    /// A set with every capability granted.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            manage_users: true,
            manage_courses: true,
            manage_blog: true,
            manage_admins: true,
            manage_matriculas: true,
        }
    }

    /// An empty set.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            manage_users: false,
            manage_courses: false,
            manage_blog: false,
            manage_admins: false,
            manage_matriculas: false,
        }
    }

    /// Whether the capability is granted.
    #[must_use]
    pub const fn has(&self, permission: Permission) -> bool {
        match permission {
            Permission::ManageUsers => self.manage_users,
            Permission::ManageCourses => self.manage_courses,
            Permission::ManageBlog => self.manage_blog,
            Permission::ManageAdmins => self.manage_admins,
            Permission::ManageMatriculas => self.manage_matriculas,
        }
    }

    /// Grant or revoke a capability.
    pub const fn set(&mut self, permission: Permission, granted: bool) {
        match permission {
            Permission::ManageUsers => self.manage_users = granted,
            Permission::ManageCourses => self.manage_courses = granted,
            Permission::ManageBlog => self.manage_blog = granted,
            Permission::ManageAdmins => self.manage_admins = granted,
            Permission::ManageMatriculas => self.manage_matriculas = granted,
        }
    }

    /// Builder-style grant.
    #[must_use]
    pub const fn with(mut self, permission: Permission) -> Self {
        self.set(permission, true);
        self
    }

    /// Iterate over granted capabilities.
    pub fn granted(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL.into_iter().filter(|p| self.has(*p))
    }
}

impl FromIterator<Permission> for Permissions {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_has_matches_set() {
        let mut perms = Permissions::none();
        for p in Permission::ALL {
            assert!(!perms.has(p));
            perms.set(p, true);
            assert!(perms.has(p));
        }
        assert_eq!(perms, Permissions::all());
    }

    #[test]
    fn test_parse_names() {
        for p in Permission::ALL {
            assert_eq!(p.as_str().parse::<Permission>().unwrap(), p);
        }
        assert!("manage_everything".parse::<Permission>().is_err());
    }

    #[test]
    fn test_json_shape_is_named_booleans() {
        let perms = Permissions::none().with(Permission::ManageBlog);
        let json = serde_json::to_value(perms).unwrap();
        assert_eq!(json["manage_blog"], true);
        assert_eq!(json["manage_admins"], false);

        let partial: Permissions = serde_json::from_str(r#"{"manage_users": true}"#).unwrap();
        assert_eq!(partial.granted().collect::<Vec<_>>(), [Permission::ManageUsers]);
    }
}
