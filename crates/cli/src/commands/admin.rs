//! Administrator provisioning commands.
//!
//! # Usage
//!
//! ```bash
//! # Provision a super admin with every capability
//! aula-cli admin create -e root@aula.academy -r super_admin -p all
//!
//! # Provision a content editor
//! aula-cli admin create -e editor@aula.academy -p manage_blog,manage_courses
//!
//! aula-cli admin list
//! aula-cli admin deactivate editor@aula.academy
//! aula-cli admin grant editor@aula.academy manage_users
//! ```
//!
//! Passwords are never handled here: the account must already exist at the
//! identity provider.

use chrono::Utc;
use thiserror::Error;

use aula_admin::db::{AdminDirectory, DirectoryError, PgAdminDirectory};
use aula_admin::models::{AdminUpdate, NewAdmin};
use aula_core::{AdminRole, Email, Permission, Permissions};

use super::ConnectError;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Directory operation failed.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: super_admin, admin")]
    InvalidRole(String),

    /// Invalid permission name.
    #[error("Invalid permission: {0}")]
    InvalidPermission(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
}

fn parse_email(email: &str) -> Result<Email, AdminError> {
    Email::parse(email).map_err(|e| AdminError::InvalidEmail(format!("{email}: {e}")))
}

/// Parse a comma separated permission list; `all` grants every capability.
fn parse_permissions(list: &str) -> Result<Permissions, AdminError> {
    if list.trim() == "all" {
        return Ok(Permissions::all());
    }
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            name.parse::<Permission>()
                .map_err(|_| AdminError::InvalidPermission(name.to_owned()))
        })
        .collect()
}

async fn directory() -> Result<PgAdminDirectory, AdminError> {
    Ok(PgAdminDirectory::new(super::connect().await?))
}

/// Provision a new administrator.
pub async fn create(email: &str, role: &str, permissions: &str) -> Result<(), AdminError> {
    let email = parse_email(email)?;
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let permissions = parse_permissions(permissions)?;

    let record = directory()
        .await?
        .insert(
            NewAdmin {
                email,
                role,
                permissions,
                active: true,
            },
            Utc::now(),
        )
        .await?;

    tracing::info!(
        email = %record.email,
        role = %record.role,
        key = %record.key,
        "Administrator created"
    );
    Ok(())
}

/// Log every administrator, newest first.
pub async fn list() -> Result<(), AdminError> {
    let admins = directory().await?.list().await?;
    tracing::info!("{} administrator(s)", admins.len());

    for admin in admins {
        let granted: Vec<&str> = admin.permissions.granted().map(Permission::as_str).collect();
        tracing::info!(
            email = %admin.email,
            role = %admin.role,
            active = admin.active,
            permissions = %granted.join(","),
            last_login = ?admin.last_login,
            "Administrator"
        );
    }
    Ok(())
}

/// Enable or disable an administrator.
pub async fn set_active(email: &str, active: bool) -> Result<(), AdminError> {
    let email = parse_email(email)?;
    let update = AdminUpdate {
        active: Some(active),
        ..AdminUpdate::default()
    };
    let record = directory().await?.update(&email, &update, Utc::now()).await?;

    tracing::info!(email = %record.email, active = record.active, "Administrator updated");
    Ok(())
}

/// Add capabilities to an administrator, keeping the ones already held.
pub async fn grant(email: &str, permissions: &str) -> Result<(), AdminError> {
    let email = parse_email(email)?;
    let added = parse_permissions(permissions)?;

    let directory = directory().await?;
    let Some(current) = directory.find(&email).await? else {
        return Err(DirectoryError::NotFound.into());
    };

    let mut merged = current.permissions;
    for permission in added.granted() {
        merged.set(permission, true);
    }
    let update = AdminUpdate {
        permissions: Some(merged),
        ..AdminUpdate::default()
    };
    let record = directory.update(&email, &update, Utc::now()).await?;

    let granted: Vec<&str> = record.permissions.granted().map(Permission::as_str).collect();
    tracing::info!(
        email = %record.email,
        permissions = %granted.join(","),
        "Permissions granted"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_permissions() {
        let perms = parse_permissions("manage_blog, manage_users").unwrap();
        assert!(perms.has(Permission::ManageBlog));
        assert!(perms.has(Permission::ManageUsers));
        assert!(!perms.has(Permission::ManageAdmins));

        assert_eq!(parse_permissions("all").unwrap(), Permissions::all());
        assert_eq!(parse_permissions("").unwrap(), Permissions::none());
        assert!(matches!(
            parse_permissions("manage_everything"),
            Err(AdminError::InvalidPermission(name)) if name == "manage_everything"
        ));
    }
}
