//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Password login orchestration
//! - `identity` - Password verification at the identity provider
//! - `rate_limit` - Per-client login attempt limiting
//! - `session` - Session credential issuance, verification and refresh

pub mod auth;
pub mod identity;
pub mod rate_limit;
pub mod session;

pub use auth::{ClientKey, LoginError, LoginService, LoginSuccess};
pub use identity::{
    HttpIdentityProvider, IdentityError, IdentityProvider, ProofToken, StaticIdentityProvider,
};
pub use rate_limit::{AttemptLimiter, InMemoryRateLimiter};
pub use session::{IssuedSession, IssuedToken, SessionError, SessionService, VerifiedSession};
