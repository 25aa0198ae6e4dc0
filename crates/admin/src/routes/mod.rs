//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                    - Liveness
//! GET   /health/ready              - Readiness (directory reachable)
//!
//! # Auth (public)
//! POST  /api/auth/login            - Password login, sets session cookies
//! GET   /api/auth/verify           - Verify session (silent refresh)
//! POST  /api/auth/refresh          - Exchange refresh credential
//! POST  /api/auth/logout           - Revoke and clear session
//!
//! # Settings (public read)
//! GET   /api/settings              - Registration / maintenance flags
//!
//! # Admin area (session required, redirects to /login otherwise)
//! GET   /admin/api/me              - Current administrator
//! GET   /admin/api/admins          - List administrators (manage_admins)
//! POST  /admin/api/admins          - Provision administrator (manage_admins)
//! PATCH /admin/api/admins/{email}  - Update administrator (manage_admins)
//! PUT   /admin/api/settings        - Update settings (super admin)
//! ```

use axum::{Router, middleware};

use crate::middleware::{require_admin_session, security_headers_middleware};
use crate::state::AppState;

pub mod admin_users;
pub mod auth;
pub mod health;
pub mod settings;

/// Routes behind the admin session gate.
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(admin_users::router())
        .merge(settings::admin_router())
        .layer(middleware::from_fn_with_state(state, require_admin_session))
}

/// Build the application router with state applied.
///
/// Tracing and Sentry layers are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(settings::public_router())
        .nest("/admin", admin_routes(state.clone()))
        .layer(middleware::from_fn(security_headers_middleware))
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request, http::StatusCode};
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::*;
    use crate::config::SessionConfig;
    use crate::db::{InMemoryAdminDirectory, InMemorySettingsStore};
    use crate::services::StaticIdentityProvider;

    fn app() -> Router {
        let state = AppState::builder(
            SessionConfig::new(SecretString::from("router-test-signing-secret-0123456789"), true),
            Arc::new(InMemoryAdminDirectory::new()),
            Arc::new(StaticIdentityProvider::new()),
            Arc::new(InMemorySettingsStore::new()),
        )
        .build();
        router(state)
    }

    #[tokio::test]
    async fn test_health_has_security_headers() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(headers.get("cache-control").unwrap(), "no-store, max-age=0");
    }

    #[tokio::test]
    async fn test_admin_area_requires_session() {
        let response = app()
            .oneshot(Request::get("/admin/api/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers().get("location").unwrap().to_str().unwrap();
        assert_eq!(location, "/login?error=Please%20sign%20in%20to%20continue");
    }

    #[tokio::test]
    async fn test_logout_clears_secure_cookies() {
        let response = app()
            .oneshot(Request::post("/api/auth/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cleared: Vec<_> = response.headers().get_all("set-cookie").iter().collect();
        assert_eq!(cleared.len(), 2);
        assert!(cleared.iter().all(|c| c.to_str().unwrap().ends_with("; Secure")));
    }
}
