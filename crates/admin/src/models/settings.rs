//! Site-wide settings read by the public client.

use serde::{Deserialize, Serialize};

/// Flags driving registration and maintenance-mode redirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSettings {
    pub allow_registration: bool,
    pub maintenance_mode: bool,
}

impl Default for SiteSettings {
    /// Used when no settings document exists yet.
    fn default() -> Self {
        Self {
            allow_registration: true,
            maintenance_mode: false,
        }
    }
}
