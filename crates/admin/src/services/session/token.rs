//! Signed session credential codec.
//!
//! Wire format: `base64url(json claims) "." base64url(HMAC-SHA256(json claims))`,
//! both parts without padding. Signature checks are constant time.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use aula_core::{AdminRole, Email, Permissions};

use crate::models::TokenKind;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a session credential.
///
/// `role` and `permissions` reflect the record at issuance. They are a
/// cache hint for clients and are never used for authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Email,
    pub role: AdminRole,
    pub permissions: Permissions,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

/// Why a credential could not be decoded.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed credential")]
    Malformed,
    #[error("signature mismatch")]
    BadSignature,
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Signs and checks session credentials with a server-held secret.
pub struct TokenSigner {
    secret: SecretString,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl TokenSigner {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Encode and sign `claims`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if the claims cannot be serialized.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let payload =
            serde_json::to_vec(claims).map_err(|e| TokenError::Signing(e.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Check the signature of `token` and decode its claims.
    ///
    /// Expiry is not checked here.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed` for anything that is not two base64url
    /// parts, `TokenError::BadSignature` if the signature does not verify.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let (payload_b64, signature_b64) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)
    }
}
