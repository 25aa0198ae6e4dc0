//! Administrator domain types.
//!
//! These types represent validated administrator records as held by the
//! directory, plus the inputs used to create and modify them.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use aula_core::{AdminKey, AdminRole, Email, Permission, Permissions};

/// An administrator record (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRecord {
    /// Legacy document key derived from the email.
    pub key: AdminKey,
    /// Administrator's email address (lower-cased).
    pub email: Email,
    /// Administrator's role.
    pub role: AdminRole,
    /// Capabilities granted to this administrator.
    pub permissions: Permissions,
    /// Disabled administrators cannot log in or use existing sessions.
    pub active: bool,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
    /// Last successful login or session refresh.
    pub last_login: Option<DateTime<Utc>>,
    /// Source address of the last password login.
    pub last_login_ip: Option<IpAddr>,
}

impl AdminRecord {
    /// Build a fresh record from provisioning input.
    #[must_use]
    pub fn new(admin: NewAdmin, now: DateTime<Utc>) -> Self {
        Self {
            key: AdminKey::from_email(&admin.email),
            email: admin.email,
            role: admin.role,
            permissions: admin.permissions,
            active: admin.active,
            created_at: now,
            updated_at: now,
            last_login: None,
            last_login_ip: None,
        }
    }

    /// Apply a partial update, bumping `updated_at`.
    pub fn apply(&mut self, update: &AdminUpdate, now: DateTime<Utc>) {
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(permissions) = update.permissions {
            self.permissions = permissions;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        self.updated_at = now;
    }
}

/// Input for provisioning an administrator.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAdmin {
    pub email: Email,
    #[serde(default)]
    pub role: AdminRole,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// Partial update of an administrator record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminUpdate {
    pub role: Option<AdminRole>,
    pub permissions: Option<Permissions>,
    pub active: Option<bool>,
}

impl AdminUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.role.is_none() && self.permissions.is_none() && self.active.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_admin_defaults() {
        let admin: NewAdmin = serde_json::from_str(r#"{"email": "Docente@Aula.dev"}"#).unwrap();
        assert_eq!(admin.email.as_str(), "docente@aula.dev");
        assert_eq!(admin.role, AdminRole::Admin);
        assert_eq!(admin.permissions, Permissions::none());
        assert!(admin.active);
    }

    #[test]
    fn test_apply_update() {
        let now = Utc::now();
        let mut record = AdminRecord::new(
            NewAdmin {
                email: Email::parse("a@aula.dev").unwrap(),
                role: AdminRole::Admin,
                permissions: Permissions::none(),
                active: true,
            },
            now,
        );
        let later = now + chrono::TimeDelta::minutes(5);
        record.apply(
            &AdminUpdate {
                active: Some(false),
                permissions: Some(Permissions::none().with(Permission::ManageBlog)),
                ..AdminUpdate::default()
            },
            later,
        );
        assert!(!record.active);
        assert!(record.permissions.has(Permission::ManageBlog));
        assert_eq!(record.role, AdminRole::Admin);
        assert_eq!(record.updated_at, later);
        assert_eq!(record.key.as_str(), "a_aula_dev");
    }
}
