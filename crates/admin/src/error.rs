//! Unified error handling for admin.
//!
//! Every handler returns `Result<T, AppError>`. Server-side failures are
//! captured to Sentry and logged before a generic message is sent; client
//! errors carry a message meant to be shown to the caller.

use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::DirectoryError;
use crate::db::settings::SettingsError;
use crate::services::{LoginError, SessionError};

/// Non-standard status telling clients their session expired.
pub const SESSION_EXPIRED_STATUS: u16 = 440;

/// Status code for [`AppError::SessionExpired`].
#[must_use]
pub fn session_expired_status() -> StatusCode {
    StatusCode::from_u16(SESSION_EXPIRED_STATUS).unwrap_or(StatusCode::UNAUTHORIZED)
}

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Too many login attempts from this client.
    #[error("Too many login attempts. Please try again later.")]
    RateLimited { retry_after: Duration },

    /// Caller is not authenticated or gave bad credentials.
    #[error("{message}")]
    AuthenticationFailed {
        message: String,
        remaining: Option<u32>,
    },

    /// Caller is authenticated but not allowed.
    #[error("{message}")]
    AuthorizationFailed {
        message: String,
        remaining: Option<u32>,
    },

    /// Session credential is past its expiry.
    #[error("Session expired")]
    SessionExpired,

    /// Identity provider could not be reached.
    #[error("Upstream service error: {0}")]
    Upstream(String),

    /// Administrator directory failed.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Settings store failed.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Resource already exists.
    #[error("{0}")]
    Conflict(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// A 401 carrying `message`.
    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            message: message.into(),
            remaining: None,
        }
    }

    /// A 403 carrying `message`.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::AuthorizationFailed {
            message: message.into(),
            remaining: None,
        }
    }

    /// The HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
            Self::AuthorizationFailed { .. } => StatusCode::FORBIDDEN,
            Self::SessionExpired => session_expired_status(),
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) | Self::Directory(_) | Self::Settings(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Upstream(_) | Self::Directory(_) | Self::Settings(_) | Self::Internal(_)
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining_attempts: Option<u32>,
    /// Minutes until the rate-limit window lapses.
    #[serde(skip_serializing_if = "Option::is_none")]
    time_to_reset: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let error = match &self {
            Self::Upstream(_) => "Authentication service unavailable".to_string(),
            Self::Directory(_) | Self::Settings(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let (remaining_attempts, retry_after) = match &self {
            Self::AuthenticationFailed { remaining, .. }
            | Self::AuthorizationFailed { remaining, .. } => (*remaining, None),
            Self::RateLimited { retry_after } => (None, Some(*retry_after)),
            _ => (None, None),
        };

        let body = ErrorBody {
            error,
            remaining_attempts,
            time_to_reset: retry_after.map(|d| d.as_secs().div_ceil(60)),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(retry_after) = retry_after
            && let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().to_string())
        {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        response
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Missing => Self::unauthenticated("Not authenticated"),
            SessionError::Invalid => Self::unauthenticated("Invalid session"),
            SessionError::Expired => Self::SessionExpired,
            SessionError::AdminNotFound => Self::forbidden("Administrator not found"),
            SessionError::AdminInactive => Self::forbidden("Administrator account is disabled"),
            SessionError::Directory(e) => Self::Directory(e),
            SessionError::ProofMismatch | SessionError::Signing(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<LoginError> for AppError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::RateLimited { retry_after } => Self::RateLimited { retry_after },
            LoginError::Validation(message) => Self::Validation(message),
            LoginError::InvalidCredentials { remaining } => Self::AuthenticationFailed {
                message: "Invalid credentials".to_string(),
                remaining: Some(remaining),
            },
            LoginError::NotAdministrator { remaining } => Self::AuthorizationFailed {
                message: "Not authorized as administrator".to_string(),
                remaining: Some(remaining),
            },
            LoginError::AdminInactive { remaining } => Self::AuthorizationFailed {
                message: "Administrator account is disabled".to_string(),
                remaining: Some(remaining),
            },
            LoginError::Upstream(reason) => Self::Upstream(reason),
            LoginError::Directory(e) => Self::Directory(e),
            LoginError::Session(e) => e.into(),
        }
    }
}

/// Set the Sentry user context for the authenticated administrator.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}
