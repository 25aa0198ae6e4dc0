//! End-to-end tests for the Aula admin back-office.
//!
//! The full router runs in process against in-memory collaborators: an
//! in-memory administrator directory and settings store, a static identity
//! provider and a manual clock. Requests go through
//! `tower::ServiceExt::oneshot`, so no server or database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p aula-integration-tests
//! ```
//!
//! # Seeded accounts
//!
//! | email | administrator | notes |
//! |---|---|---|
//! | `root@aula.dev` | `super_admin` | every permission |
//! | `editor@aula.dev` | `admin` | `manage_blog` only |
//! | `manager@aula.dev` | `admin` | `manage_admins` |
//! | `disabled@aula.dev` | `admin` | inactive |
//! | `student@aula.dev` | no | identity provider account only |
//!
//! Every account uses [`PASSWORD`].

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request, Response, header},
};
use chrono::TimeDelta;
use secrecy::SecretString;
use tower::ServiceExt;

use aula_admin::clock::ManualClock;
use aula_admin::config::{RateLimitConfig, SessionConfig};
use aula_admin::db::{AdminDirectory, InMemoryAdminDirectory, InMemorySettingsStore};
use aula_admin::models::NewAdmin;
use aula_admin::services::{IdentityProvider, StaticIdentityProvider};
use aula_admin::state::AppState;
use aula_core::{AdminRole, Email, Permission, Permissions};

/// Password shared by every seeded account.
pub const PASSWORD: &str = "correct horse battery staple";

pub const ROOT: &str = "root@aula.dev";
pub const EDITOR: &str = "editor@aula.dev";
pub const MANAGER: &str = "manager@aula.dev";
pub const DISABLED: &str = "disabled@aula.dev";
pub const STUDENT: &str = "student@aula.dev";

const SIGNING_SECRET: &str = "kq8Zr2VnX4bTw7Lc1Hs9Pd3Ff6Jm0Ya5Ue-test-signing-key";

/// The application under test and handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub clock: ManualClock,
    pub directory: Arc<InMemoryAdminDirectory>,
}

impl TestApp {
    /// App with the seeded accounts and the default login policy.
    pub async fn new() -> Self {
        Self::with_identity(Arc::new(seeded_identity())).await
    }

    /// App using a custom identity provider.
    pub async fn with_identity(identity: Arc<dyn IdentityProvider>) -> Self {
        let clock = ManualClock::default();
        let directory = Arc::new(InMemoryAdminDirectory::new());
        seed_directory(directory.as_ref(), &clock).await;

        let state = AppState::builder(
            SessionConfig::new(SecretString::from(SIGNING_SECRET), false),
            directory.clone(),
            identity,
            Arc::new(InMemorySettingsStore::new()),
        )
        .clock(Arc::new(clock.clone()))
        .rate_limit(RateLimitConfig::default())
        .trust_proxy_headers(true)
        .build();

        Self {
            router: aula_admin::router(state),
            clock,
            directory,
        }
    }

    /// Send one request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Attempt a login from `client_ip`.
    pub async fn login_from(&self, client_ip: &str, email: &str, password: &str) -> Response<Body> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.send(
            Request::post("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", client_ip)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Log in and return the `Cookie` header carrying the session.
    pub async fn session_for(&self, email: &str) -> String {
        let response = self.login_from("198.51.100.1", email, PASSWORD).await;
        assert_eq!(response.status(), 200, "login for {email} failed");
        cookie_header(&response)
    }

    /// Advance the clock.
    pub fn advance(&self, by: TimeDelta) {
        self.clock.advance(by);
    }
}

/// Identity provider knowing every seeded account.
#[must_use]
pub fn seeded_identity() -> StaticIdentityProvider {
    [ROOT, EDITOR, MANAGER, DISABLED, STUDENT]
        .into_iter()
        .fold(StaticIdentityProvider::new(), |provider, email| {
            provider.with_account(Email::parse(email).unwrap(), PASSWORD)
        })
}

async fn seed_directory(directory: &InMemoryAdminDirectory, clock: &ManualClock) {
    use aula_admin::clock::Clock;

    let admins = [
        (ROOT, AdminRole::SuperAdmin, Permissions::all(), true),
        (
            EDITOR,
            AdminRole::Admin,
            Permissions::none().with(Permission::ManageBlog),
            true,
        ),
        (
            MANAGER,
            AdminRole::Admin,
            Permissions::none().with(Permission::ManageAdmins),
            true,
        ),
        (DISABLED, AdminRole::Admin, Permissions::all(), false),
    ];
    for (email, role, permissions, active) in admins {
        directory
            .insert(
                NewAdmin {
                    email: Email::parse(email).unwrap(),
                    role,
                    permissions,
                    active,
                },
                clock.now(),
            )
            .await
            .unwrap();
    }
}

/// All `Set-Cookie` values of a response.
#[must_use]
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The `Set-Cookie` value for cookie `name`, if any.
#[must_use]
pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&format!("{name}=")))
}

/// A `Cookie` request header replaying every non-empty cookie the response set.
#[must_use]
pub fn cookie_header(response: &Response<Body>) -> String {
    set_cookies(response)
        .iter()
        .filter_map(|c| c.split(';').next())
        .filter(|pair| !pair.ends_with('='))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A GET request carrying `cookie`.
#[must_use]
pub fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, HeaderValue::from_str(cookie).unwrap())
        .body(Body::empty())
        .unwrap()
}

/// A request with a JSON body carrying `cookie`.
#[must_use]
pub fn json_with_cookie(
    method: &str,
    uri: &str,
    cookie: &str,
    body: &serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, HeaderValue::from_str(cookie).unwrap())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
