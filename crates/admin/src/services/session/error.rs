//! Session verification error types.

use thiserror::Error;

use crate::db::DirectoryError;

/// Why a session credential was not accepted.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No credential was presented.
    #[error("no session credential")]
    Missing,

    /// Bad signature, bad format, wrong token kind or revoked.
    #[error("invalid session credential")]
    Invalid,

    /// The credential is past its expiry.
    #[error("session expired")]
    Expired,

    /// The bound administrator no longer exists.
    #[error("administrator not found")]
    AdminNotFound,

    /// The bound administrator has been deactivated.
    #[error("administrator is inactive")]
    AdminInactive,

    /// The proof token was issued for a different email.
    #[error("proof token does not belong to this administrator")]
    ProofMismatch,

    /// The directory could not be consulted.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// A credential could not be minted.
    #[error("failed to sign session credential: {0}")]
    Signing(String),
}

impl SessionError {
    /// Whether the caller should be told their session expired rather than
    /// being shown a generic authentication error.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }

    /// Failures caused by the server rather than by the credential.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Directory(_) | Self::Signing(_))
    }
}
