//! Login error types.

use std::time::Duration;

use thiserror::Error;

use crate::db::DirectoryError;
use crate::services::session::SessionError;

/// Errors that can end a login attempt.
///
/// Every variant except `Directory`, `Session` and `Upstream` is the
/// caller's fault; all of them have already been counted by the rate limiter.
#[derive(Debug, Error)]
pub enum LoginError {
    /// Too many attempts from this client.
    #[error("too many login attempts")]
    RateLimited { retry_after: Duration },

    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Wrong password or unknown user. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials { remaining: u32 },

    /// Correct password, but the email has no administrator record.
    #[error("not an administrator")]
    NotAdministrator { remaining: u32 },

    /// The administrator record exists but is deactivated.
    #[error("administrator account is disabled")]
    AdminInactive { remaining: u32 },

    /// The identity provider could not verify the password.
    #[error("identity provider unavailable: {0}")]
    Upstream(String),

    /// The administrator directory could not be consulted.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Session credentials could not be issued.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}
