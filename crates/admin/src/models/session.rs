//! Session-related types for admin authentication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aula_core::{AdminRole, Email, Permission, Permissions};

/// A verified administrator identity attached to a request.
///
/// Role and permissions are the live values read from the directory at
/// verification time, never the ones embedded in the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAdmin {
    /// Administrator's email address.
    pub email: Email,
    /// Administrator's current role.
    pub role: AdminRole,
    /// Administrator's current capabilities.
    pub permissions: Permissions,
    /// Expiry of the access credential that authenticated this request.
    pub expires_at: DateTime<Utc>,
}

impl CurrentAdmin {
    /// Whether the administrator holds `permission`.
    #[must_use]
    pub const fn can(&self, permission: Permission) -> bool {
        self.permissions.has(permission)
    }
}

/// Which of the two session credentials a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived credential presented on every request.
    Access,
    /// Long-lived credential used only to mint new access credentials.
    Refresh,
}

/// Cookie names for admin session credentials.
pub mod cookies {
    /// Access credential cookie.
    pub const ACCESS: &str = "aula_admin_session";

    /// Refresh credential cookie.
    pub const REFRESH: &str = "aula_admin_refresh";
}
