//! HTTP middleware and extractors for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Security headers
//! 4. Access gate on `/admin` (session verification, silent refresh)
//!
//! Handlers then declare capabilities with the extractors in [`permission`].

pub mod access;
pub mod client_ip;
pub mod cookies;
pub mod permission;
pub mod security_headers;

pub use access::require_admin_session;
pub use client_ip::ClientAddr;
pub use cookies::SessionCookies;
pub use permission::{AuthenticatedAdmin, RequirePermission, RequireSuperAdmin};
pub use security_headers::security_headers_middleware;
