//! Password verification against the external identity provider.
//!
//! The admin service never stores or hashes passwords itself. It hands the
//! submitted email and password to the identity provider and receives either
//! a short-lived proof token or a typed failure.
//!
//! # Adapters
//!
//! - [`HttpIdentityProvider`] - identity toolkit REST API
//!   (`accounts:signInWithPassword`)
//! - [`StaticIdentityProvider`] - fixed accounts held in memory, for tests
//!   and local runs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use aula_core::Email;

use crate::config::IdentityProviderConfig;

/// Typed failures of password verification.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Wrong password, or the account is disabled at the provider.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account exists for the email.
    #[error("user not found")]
    UserNotFound,

    /// The provider could not be reached or answered unexpectedly.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Short-lived evidence that a password was verified for `email`.
///
/// Consumed immediately to mint a session; never sent to the client.
#[derive(Debug)]
pub struct ProofToken {
    email: Email,
    token: SecretString,
}

impl ProofToken {
    #[must_use]
    pub const fn new(email: Email, token: SecretString) -> Self {
        Self { email, token }
    }

    /// The email the provider verified.
    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    /// The provider-issued token.
    #[must_use]
    pub const fn token(&self) -> &SecretString {
        &self.token
    }
}

/// Password verification entry point of an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify `password` for `email`.
    async fn verify_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<ProofToken, IdentityError>;
}

// =============================================================================
// HTTP adapter
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct ProviderErrorEnvelope {
    error: ProviderErrorBody,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// Map a provider error message to a typed failure.
///
/// Messages look like `INVALID_PASSWORD` or
/// `TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account ...`.
fn classify_provider_error(message: &str) -> IdentityError {
    let code = message.split_whitespace().next().unwrap_or_default();
    match code {
        "EMAIL_NOT_FOUND" => IdentityError::UserNotFound,
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" | "INVALID_EMAIL" => {
            IdentityError::InvalidCredentials
        }
        other => IdentityError::Unavailable(format!("provider rejected sign-in: {other}")),
    }
}

/// Identity toolkit REST client.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    inner: Arc<HttpIdentityProviderInner>,
}

struct HttpIdentityProviderInner {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl HttpIdentityProvider {
    /// Create a client for the configured provider.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unavailable` if the endpoint URL is invalid or
    /// the HTTP client fails to build.
    pub fn new(config: &IdentityProviderConfig) -> Result<Self, IdentityError> {
        let mut endpoint = url::Url::parse(&format!(
            "{}/accounts:signInWithPassword",
            config.base_url.trim_end_matches('/')
        ))
        .map_err(|e| IdentityError::Unavailable(format!("invalid provider URL: {e}")))?;
        endpoint
            .query_pairs_mut()
            .append_pair("key", config.api_key.expose_secret());

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| IdentityError::Unavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(HttpIdentityProviderInner { client, endpoint }),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    #[tracing::instrument(skip(self, password), fields(email = %email))]
    async fn verify_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<ProofToken, IdentityError> {
        let body = SignInRequest {
            email: email.as_str(),
            password: password.expose_secret(),
            return_secure_token: true,
        };

        let response = self
            .inner
            .client
            .post(self.inner.endpoint.clone())
            .json(&body)
            .send()
            .await
            // Strip the URL: it carries the API key.
            .map_err(|e| IdentityError::Unavailable(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            let signed_in: SignInResponse = response
                .json()
                .await
                .map_err(|e| IdentityError::Unavailable(format!("malformed response: {e}")))?;
            let verified = signed_in
                .email
                .and_then(|e| Email::parse(&e).ok())
                .unwrap_or_else(|| email.clone());
            return Ok(ProofToken::new(verified, SecretString::from(signed_in.id_token)));
        }

        if status.is_client_error() {
            let envelope: ProviderErrorEnvelope = response.json().await.map_err(|e| {
                IdentityError::Unavailable(format!("malformed error response ({status}): {e}"))
            })?;
            return Err(classify_provider_error(&envelope.error.message));
        }

        Err(IdentityError::Unavailable(format!(
            "provider returned {status}"
        )))
    }
}

// =============================================================================
// Static adapter
// =============================================================================

/// Fixed set of accounts held in memory.
///
/// Only password digests are kept.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    accounts: HashMap<Email, [u8; 32]>,
}

impl StaticIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account.
    #[must_use]
    pub fn with_account(mut self, email: Email, password: &str) -> Self {
        self.accounts.insert(email, digest(password));
        self
    }
}

fn digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<ProofToken, IdentityError> {
        let stored = self.accounts.get(email).ok_or(IdentityError::UserNotFound)?;
        if *stored != digest(password.expose_secret()) {
            return Err(IdentityError::InvalidCredentials);
        }
        let token = SecretString::from(uuid::Uuid::new_v4().to_string());
        Ok(ProofToken::new(email.clone(), token))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_provider_error() {
        assert!(matches!(
            classify_provider_error("EMAIL_NOT_FOUND"),
            IdentityError::UserNotFound
        ));
        assert!(matches!(
            classify_provider_error("INVALID_LOGIN_CREDENTIALS"),
            IdentityError::InvalidCredentials
        ));
        assert!(matches!(
            classify_provider_error("USER_DISABLED"),
            IdentityError::InvalidCredentials
        ));
        assert!(matches!(
            classify_provider_error("TOO_MANY_ATTEMPTS_TRY_LATER : Access disabled"),
            IdentityError::Unavailable(msg) if msg.ends_with("TOO_MANY_ATTEMPTS_TRY_LATER")
        ));
    }

    #[tokio::test]
    async fn test_static_provider() {
        let email = Email::parse("ana@aula.dev").unwrap();
        let provider = StaticIdentityProvider::new().with_account(email.clone(), "hunter22");

        let proof = provider
            .verify_password(&email, &SecretString::from("hunter22"))
            .await
            .unwrap();
        assert_eq!(proof.email(), &email);

        assert!(matches!(
            provider
                .verify_password(&email, &SecretString::from("wrong"))
                .await,
            Err(IdentityError::InvalidCredentials)
        ));
        assert!(matches!(
            provider
                .verify_password(
                    &Email::parse("bob@aula.dev").unwrap(),
                    &SecretString::from("hunter22")
                )
                .await,
            Err(IdentityError::UserNotFound)
        ));
    }

    #[test]
    fn test_endpoint_carries_key() {
        let config = IdentityProviderConfig {
            base_url: "https://idp.test/v1/".to_string(),
            api_key: SecretString::from("k3y"),
            timeout: std::time::Duration::from_secs(1),
        };
        let provider = HttpIdentityProvider::new(&config).unwrap();
        assert_eq!(
            provider.inner.endpoint.as_str(),
            "https://idp.test/v1/accounts:signInWithPassword?key=k3y"
        );
    }
}
