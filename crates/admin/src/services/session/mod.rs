//! Session issuance and verification.
//!
//! A login mints two signed credentials: a short-lived access credential
//! presented on every request and a longer-lived refresh credential used to
//! mint new access credentials once the first expires.
//!
//! Verification is not purely stateless. A credential is accepted only if
//! its signature verifies, it has not expired, it was not revoked by a
//! logout, and the bound administrator still exists and is active. The role
//! and permissions handed back are always read live from the directory.
//!
//! [`SessionService`] holds no per-request state: callers pass in the
//! credentials they received and get an explicit result back.

mod error;
mod token;

pub use error::SessionError;
pub use token::{Claims, TokenError, TokenSigner};

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use uuid::Uuid;

use crate::clock::{Clock, to_delta};
use crate::config::SessionConfig;
use crate::db::AdminDirectory;
use crate::models::{AdminRecord, CurrentAdmin, TokenKind};
use crate::services::identity::ProofToken;

/// Upper bound on revoked token ids remembered at once.
const MAX_REVOKED_TOKENS: u64 = 100_000;

/// A freshly minted credential.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Encoded credential, as stored in the cookie.
    pub value: String,
    /// When the credential stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// Lifetime to advertise as cookie `Max-Age`.
    pub max_age: Duration,
}

/// Access and refresh credentials minted at login.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Outcome of a successful [`SessionService::authenticate`].
#[derive(Debug, Clone)]
pub struct VerifiedSession {
    /// The administrator, with live role and permissions.
    pub admin: CurrentAdmin,
    /// A new access credential when the old one was silently refreshed.
    pub refreshed: Option<IssuedToken>,
}

/// Issues and verifies admin session credentials.
#[derive(Clone)]
pub struct SessionService {
    inner: Arc<SessionServiceInner>,
}

struct SessionServiceInner {
    signer: TokenSigner,
    directory: Arc<dyn AdminDirectory>,
    clock: Arc<dyn Clock>,
    revoked: Cache<Uuid, ()>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionService {
    /// Create a session service.
    #[must_use]
    pub fn new(
        config: &SessionConfig,
        directory: Arc<dyn AdminDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // A revoked id only needs remembering while the token could still verify.
        let revoked = Cache::builder()
            .max_capacity(MAX_REVOKED_TOKENS)
            .time_to_live(config.refresh_ttl.max(config.access_ttl))
            .build();

        Self {
            inner: Arc::new(SessionServiceInner {
                signer: TokenSigner::new(config.secret.clone()),
                directory,
                clock,
                revoked,
                access_ttl: config.access_ttl,
                refresh_ttl: config.refresh_ttl,
            }),
        }
    }

    /// Lifetime of access credentials.
    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.inner.access_ttl
    }

    fn mint(
        &self,
        admin: &AdminRecord,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, SessionError> {
        let ttl = match kind {
            TokenKind::Access => self.inner.access_ttl,
            TokenKind::Refresh => self.inner.refresh_ttl,
        };
        let expires_at = now + to_delta(ttl);
        let claims = Claims {
            sub: admin.email.clone(),
            role: admin.role,
            permissions: admin.permissions,
            kind,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };
        let value = self
            .inner
            .signer
            .sign(&claims)
            .map_err(|e| SessionError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            value,
            expires_at,
            max_age: ttl,
        })
    }

    /// Mint access and refresh credentials for a verified login.
    ///
    /// Stamps the login on the administrator record. That update is best
    /// effort: a failure is logged and the credentials are still issued.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ProofMismatch` if `proof` was issued for a
    /// different email, `SessionError::AdminInactive` for a deactivated
    /// administrator, or `SessionError::Signing` if minting fails.
    pub async fn issue(
        &self,
        proof: &ProofToken,
        admin: &AdminRecord,
        client_ip: Option<IpAddr>,
    ) -> Result<IssuedSession, SessionError> {
        if proof.email() != &admin.email {
            return Err(SessionError::ProofMismatch);
        }
        if !admin.active {
            return Err(SessionError::AdminInactive);
        }

        let now = self.inner.clock.now();
        let session = IssuedSession {
            access: self.mint(admin, TokenKind::Access, now)?,
            refresh: self.mint(admin, TokenKind::Refresh, now)?,
        };

        if let Err(e) = self
            .inner
            .directory
            .record_login(&admin.email, now, client_ip)
            .await
        {
            tracing::warn!(email = %admin.email, error = %e, "Failed to record admin login");
        }

        Ok(session)
    }

    /// Decode a credential of the expected kind and check it is still live.
    fn check(&self, token: &str, kind: TokenKind) -> Result<Claims, SessionError> {
        let claims = self
            .inner
            .signer
            .verify(token)
            .map_err(|e| match e {
                TokenError::Signing(msg) => SessionError::Signing(msg),
                TokenError::Malformed | TokenError::BadSignature => SessionError::Invalid,
            })?;

        if claims.kind != kind || self.inner.revoked.contains_key(&claims.jti) {
            return Err(SessionError::Invalid);
        }
        if self.inner.clock.now().timestamp() >= claims.exp {
            return Err(SessionError::Expired);
        }
        Ok(claims)
    }

    /// Re-read the bound administrator and require it to be active.
    async fn live_admin(&self, claims: &Claims) -> Result<AdminRecord, SessionError> {
        let admin = self
            .inner
            .directory
            .find(&claims.sub)
            .await?
            .ok_or(SessionError::AdminNotFound)?;
        if !admin.active {
            return Err(SessionError::AdminInactive);
        }
        Ok(admin)
    }

    /// Verify an access credential.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] kind describing why the credential was
    /// rejected.
    pub async fn verify(&self, access: Option<&str>) -> Result<CurrentAdmin, SessionError> {
        let token = access.ok_or(SessionError::Missing)?;
        let claims = self.check(token, TokenKind::Access)?;
        let admin = self.live_admin(&claims).await?;

        Ok(CurrentAdmin {
            email: admin.email,
            role: admin.role,
            permissions: admin.permissions,
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC),
        })
    }

    async fn mint_from_refresh(
        &self,
        refresh: &str,
    ) -> Result<(AdminRecord, VerifiedSession), SessionError> {
        let claims = self.check(refresh, TokenKind::Refresh)?;
        let admin = self.live_admin(&claims).await?;
        let access = self.mint(&admin, TokenKind::Access, self.inner.clock.now())?;

        let session = VerifiedSession {
            admin: CurrentAdmin {
                email: admin.email.clone(),
                role: admin.role,
                permissions: admin.permissions,
                expires_at: access.expires_at,
            },
            refreshed: Some(access),
        };
        Ok((admin, session))
    }

    /// Verify the access credential, silently refreshing it if needed.
    ///
    /// An absent or expired access credential is replaced when the refresh
    /// credential verifies. Any other access failure is final. This never
    /// writes to the directory.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Expired` when both credentials have lapsed so
    /// the caller can show a specific message, otherwise the failure of the
    /// credential that was decisive.
    pub async fn authenticate(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
    ) -> Result<VerifiedSession, SessionError> {
        let access_err = match self.verify(access).await {
            Ok(admin) => {
                return Ok(VerifiedSession {
                    admin,
                    refreshed: None,
                });
            }
            Err(e @ (SessionError::Missing | SessionError::Expired)) => e,
            Err(e) => return Err(e),
        };

        let Some(refresh) = refresh else {
            return Err(access_err);
        };

        match self.mint_from_refresh(refresh).await {
            Ok((_, session)) => {
                tracing::debug!(email = %session.admin.email, "Silently refreshed admin session");
                Ok(session)
            }
            Err(SessionError::Invalid | SessionError::Expired) if access_err.is_expired() => {
                Err(SessionError::Expired)
            }
            Err(e) => Err(e),
        }
    }

    /// Explicitly exchange a refresh credential for a new access credential.
    ///
    /// Stamps the refresh as a login (without address) on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] kind describing why the refresh
    /// credential was rejected.
    pub async fn refresh(&self, refresh: Option<&str>) -> Result<VerifiedSession, SessionError> {
        let token = refresh.ok_or(SessionError::Missing)?;
        let (admin, session) = self.mint_from_refresh(token).await?;

        if let Err(e) = self
            .inner
            .directory
            .record_login(&admin.email, self.inner.clock.now(), None)
            .await
        {
            tracing::warn!(email = %admin.email, error = %e, "Failed to record admin refresh");
        }
        Ok(session)
    }

    /// Revoke the given credentials.
    ///
    /// Credentials that do not carry a valid signature are ignored.
    pub async fn revoke(&self, access: Option<&str>, refresh: Option<&str>) {
        for token in [access, refresh].into_iter().flatten() {
            if let Ok(claims) = self.inner.signer.verify(token) {
                self.inner.revoked.insert(claims.jti, ()).await;
                tracing::debug!(email = %claims.sub, jti = %claims.jti, "Revoked session credential");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use secrecy::SecretString;

    use crate::clock::ManualClock;
    use crate::db::InMemoryAdminDirectory;
    use crate::models::{AdminUpdate, NewAdmin};
    use aula_core::{AdminRole, Email, Permission, Permissions};

    struct Fixture {
        service: SessionService,
        directory: Arc<InMemoryAdminDirectory>,
        clock: ManualClock,
        admin: AdminRecord,
    }

    async fn fixture() -> Fixture {
        let clock = ManualClock::default();
        let directory = Arc::new(InMemoryAdminDirectory::new());
        let admin = directory
            .insert(
                NewAdmin {
                    email: Email::parse("ana@aula.dev").unwrap(),
                    role: AdminRole::Admin,
                    permissions: Permissions::none().with(Permission::ManageCourses),
                    active: true,
                },
                clock.now(),
            )
            .await
            .unwrap();
        let config = SessionConfig::new(
            SecretString::from("k9$Vq2!mZ7@pR4#tX8&wL1^nB6*cF3%h"),
            false,
        );
        let service = SessionService::new(&config, directory.clone(), Arc::new(clock.clone()));
        Fixture {
            service,
            directory,
            clock,
            admin,
        }
    }

    fn proof(admin: &AdminRecord) -> ProofToken {
        ProofToken::new(admin.email.clone(), SecretString::from("proof"))
    }

    #[tokio::test]
    async fn test_issue_then_verify_yields_same_email() {
        let f = fixture().await;
        let session = f.service.issue(&proof(&f.admin), &f.admin, None).await.unwrap();

        let admin = f.service.verify(Some(&session.access.value)).await.unwrap();
        assert_eq!(admin.email, f.admin.email);
        assert_eq!(session.access.max_age, Duration::from_secs(3600));
        assert_eq!(session.refresh.max_age, Duration::from_secs(7 * 24 * 3600));
    }

    #[tokio::test]
    async fn test_issue_records_login() {
        let f = fixture().await;
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        f.service.issue(&proof(&f.admin), &f.admin, Some(ip)).await.unwrap();

        let stored = f.directory.find(&f.admin.email).await.unwrap().unwrap();
        assert_eq!(stored.last_login, Some(f.clock.now()));
        assert_eq!(stored.last_login_ip, Some(ip));
    }

    #[tokio::test]
    async fn test_issue_rejects_foreign_proof() {
        let f = fixture().await;
        let other = ProofToken::new(
            Email::parse("eve@aula.dev").unwrap(),
            SecretString::from("proof"),
        );
        assert!(matches!(
            f.service.issue(&other, &f.admin, None).await,
            Err(SessionError::ProofMismatch)
        ));
    }

    #[tokio::test]
    async fn test_missing_and_malformed() {
        let f = fixture().await;
        assert!(matches!(f.service.verify(None).await, Err(SessionError::Missing)));
        assert!(matches!(
            f.service.verify(Some("not-a-token")).await,
            Err(SessionError::Invalid)
        ));
    }

    #[tokio::test]
    async fn test_expired_is_distinct_from_invalid() {
        let f = fixture().await;
        let session = f.service.issue(&proof(&f.admin), &f.admin, None).await.unwrap();

        f.clock.advance(TimeDelta::hours(1) + TimeDelta::seconds(1));
        assert!(matches!(
            f.service.verify(Some(&session.access.value)).await,
            Err(SessionError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_deactivated_admin_is_inactive_not_invalid() {
        let f = fixture().await;
        let session = f.service.issue(&proof(&f.admin), &f.admin, None).await.unwrap();

        f.directory
            .update(
                &f.admin.email,
                &AdminUpdate {
                    active: Some(false),
                    ..AdminUpdate::default()
                },
                f.clock.now(),
            )
            .await
            .unwrap();

        assert!(matches!(
            f.service.verify(Some(&session.access.value)).await,
            Err(SessionError::AdminInactive)
        ));
    }

    #[tokio::test]
    async fn test_unknown_admin_is_not_found() {
        let f = fixture().await;
        let session = f.service.issue(&proof(&f.admin), &f.admin, None).await.unwrap();

        // Same signing key, but a directory that never heard of the admin.
        let config = SessionConfig::new(
            SecretString::from("k9$Vq2!mZ7@pR4#tX8&wL1^nB6*cF3%h"),
            false,
        );
        let elsewhere = SessionService::new(
            &config,
            Arc::new(InMemoryAdminDirectory::new()),
            Arc::new(f.clock.clone()),
        );

        assert!(matches!(
            elsewhere.verify(Some(&session.access.value)).await,
            Err(SessionError::AdminNotFound)
        ));
        assert!(matches!(
            elsewhere.refresh(Some(&session.refresh.value)).await,
            Err(SessionError::AdminNotFound)
        ));
    }

    #[tokio::test]
    async fn test_verify_returns_live_permissions() {
        let f = fixture().await;
        let session = f.service.issue(&proof(&f.admin), &f.admin, None).await.unwrap();

        f.directory
            .update(
                &f.admin.email,
                &AdminUpdate {
                    permissions: Some(Permissions::none().with(Permission::ManageBlog)),
                    ..AdminUpdate::default()
                },
                f.clock.now(),
            )
            .await
            .unwrap();

        let admin = f.service.verify(Some(&session.access.value)).await.unwrap();
        assert!(admin.can(Permission::ManageBlog));
        assert!(!admin.can(Permission::ManageCourses));
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let f = fixture().await;
        let session = f.service.issue(&proof(&f.admin), &f.admin, None).await.unwrap();
        assert!(matches!(
            f.service.verify(Some(&session.refresh.value)).await,
            Err(SessionError::Invalid)
        ));
    }

    #[tokio::test]
    async fn test_silent_refresh() {
        let f = fixture().await;
        let session = f.service.issue(&proof(&f.admin), &f.admin, None).await.unwrap();
        f.clock.advance(TimeDelta::hours(2));

        let verified = f
            .service
            .authenticate(Some(&session.access.value), Some(&session.refresh.value))
            .await
            .unwrap();
        let fresh = verified.refreshed.unwrap();
        assert_eq!(verified.admin.email, f.admin.email);
        assert_eq!(fresh.expires_at, f.clock.now() + TimeDelta::hours(1));
        assert!(f.service.verify(Some(&fresh.value)).await.is_ok());
    }

    #[tokio::test]
    async fn test_no_refresh_when_access_valid() {
        let f = fixture().await;
        let session = f.service.issue(&proof(&f.admin), &f.admin, None).await.unwrap();
        let verified = f
            .service
            .authenticate(Some(&session.access.value), Some(&session.refresh.value))
            .await
            .unwrap();
        assert!(verified.refreshed.is_none());
    }

    #[tokio::test]
    async fn test_both_expired_reports_expired() {
        let f = fixture().await;
        let session = f.service.issue(&proof(&f.admin), &f.admin, None).await.unwrap();
        f.clock.advance(TimeDelta::days(8));

        assert!(matches!(
            f.service
                .authenticate(Some(&session.access.value), Some(&session.refresh.value))
                .await,
            Err(SessionError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_refresh_for_inactive_admin_is_denied() {
        let f = fixture().await;
        let session = f.service.issue(&proof(&f.admin), &f.admin, None).await.unwrap();
        f.directory
            .update(
                &f.admin.email,
                &AdminUpdate {
                    active: Some(false),
                    ..AdminUpdate::default()
                },
                f.clock.now(),
            )
            .await
            .unwrap();

        assert!(matches!(
            f.service.authenticate(None, Some(&session.refresh.value)).await,
            Err(SessionError::AdminInactive)
        ));
    }

    #[tokio::test]
    async fn test_revoked_credentials_are_invalid() {
        let f = fixture().await;
        let session = f.service.issue(&proof(&f.admin), &f.admin, None).await.unwrap();
        f.service
            .revoke(Some(&session.access.value), Some(&session.refresh.value))
            .await;

        assert!(matches!(
            f.service.verify(Some(&session.access.value)).await,
            Err(SessionError::Invalid)
        ));
        assert!(matches!(
            f.service.refresh(Some(&session.refresh.value)).await,
            Err(SessionError::Invalid)
        ));
    }
}
