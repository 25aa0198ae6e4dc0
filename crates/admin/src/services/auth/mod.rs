//! Password login for administrators.
//!
//! A login attempt runs, in order:
//!
//! 1. the rate limiter, which counts the attempt against the client key
//! 2. input validation
//! 3. password verification at the identity provider
//! 4. the administrator directory (exists, then active)
//! 5. session issuance
//!
//! Only a fully successful login clears the client's counter.

mod error;

pub use error::LoginError;

use std::net::IpAddr;
use std::sync::Arc;

use secrecy::SecretString;
use serde::Deserialize;

use aula_core::Email;

use crate::db::AdminDirectory;
use crate::models::AdminRecord;
use crate::services::identity::{IdentityError, IdentityProvider};
use crate::services::rate_limit::AttemptLimiter;
use crate::services::session::{IssuedSession, SessionService};

/// Where a login attempt came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey {
    /// Rate-limit key.
    pub key: String,
    /// Address recorded as the last login IP, when known.
    pub ip: Option<IpAddr>,
}

/// Login request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Validated login credentials.
#[derive(Debug)]
pub struct LoginCredentials {
    pub email: Email,
    pub password: SecretString,
}

impl LoginRequest {
    /// Parse a raw request body.
    ///
    /// # Errors
    ///
    /// Returns `LoginError::Validation` for a body that is not a JSON object
    /// or lacks either field.
    pub fn from_body(body: &[u8]) -> Result<LoginCredentials, LoginError> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|_| LoginError::Validation("Request body must be a JSON object".to_string()))?;
        request.validate()
    }

    fn validate(self) -> Result<LoginCredentials, LoginError> {
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| LoginError::Validation("Email and password are required".to_string()))?;
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .map(SecretString::from)
            .ok_or_else(|| LoginError::Validation("Email and password are required".to_string()))?;
        let email = Email::parse(&email)
            .map_err(|e| LoginError::Validation(format!("Invalid email: {e}")))?;

        Ok(LoginCredentials { email, password })
    }
}

/// A completed login.
#[derive(Debug)]
pub struct LoginSuccess {
    pub admin: AdminRecord,
    pub session: IssuedSession,
}

/// Admin login orchestration.
#[derive(Clone)]
pub struct LoginService {
    limiter: Arc<dyn AttemptLimiter>,
    identity: Arc<dyn IdentityProvider>,
    directory: Arc<dyn AdminDirectory>,
    sessions: SessionService,
}

impl LoginService {
    #[must_use]
    pub fn new(
        limiter: Arc<dyn AttemptLimiter>,
        identity: Arc<dyn IdentityProvider>,
        directory: Arc<dyn AdminDirectory>,
        sessions: SessionService,
    ) -> Self {
        Self {
            limiter,
            identity,
            directory,
            sessions,
        }
    }

    /// Run one login attempt from `client` with the raw request `body`.
    ///
    /// # Errors
    ///
    /// Returns the [`LoginError`] that ended the attempt.
    #[tracing::instrument(skip(self, client, body), fields(client = %client.key))]
    pub async fn login(
        &self,
        client: &ClientKey,
        body: &[u8],
    ) -> Result<LoginSuccess, LoginError> {
        if !self.limiter.check(&client.key).await {
            return Err(LoginError::RateLimited {
                retry_after: self.limiter.time_to_reset(&client.key).await,
            });
        }

        let credentials = LoginRequest::from_body(body)?;
        let email = &credentials.email;

        let proof = match self
            .identity
            .verify_password(email, &credentials.password)
            .await
        {
            Ok(proof) => proof,
            Err(IdentityError::InvalidCredentials | IdentityError::UserNotFound) => {
                tracing::info!(email = %email, "Admin login rejected: invalid credentials");
                return Err(LoginError::InvalidCredentials {
                    remaining: self.limiter.remaining(&client.key).await,
                });
            }
            Err(IdentityError::Unavailable(reason)) => {
                tracing::error!(email = %email, reason = %reason, "Identity provider unavailable");
                return Err(LoginError::Upstream(reason));
            }
        };

        let Some(admin) = self.directory.find(email).await? else {
            tracing::warn!(
                email = %email,
                client = %client.key,
                "Login with valid credentials for an email that is not an administrator"
            );
            return Err(LoginError::NotAdministrator {
                remaining: self.limiter.remaining(&client.key).await,
            });
        };

        if !admin.active {
            tracing::warn!(email = %email, "Login attempt by deactivated administrator");
            return Err(LoginError::AdminInactive {
                remaining: self.limiter.remaining(&client.key).await,
            });
        }

        let session = self.sessions.issue(&proof, &admin, client.ip).await?;
        self.limiter.reset(&client.key).await;

        tracing::info!(email = %email, role = %admin.role, "Admin logged in");
        Ok(LoginSuccess { admin, session })
    }
}
