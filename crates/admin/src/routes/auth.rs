//! Authentication route handlers.
//!
//! Password login against the identity provider, session verification,
//! explicit refresh and logout. Session credentials travel in cookies only.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::instrument;

use aula_core::{AdminRole, Email, Permissions};

use crate::error::{AppError, set_sentry_user};
use crate::middleware::{ClientAddr, SessionCookies, cookies};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/verify", get(verify))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    success: bool,
    role: AdminRole,
    permissions: Permissions,
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    valid: bool,
    email: Email,
    role: AdminRole,
    permissions: Permissions,
}

#[derive(Debug, Serialize)]
struct SuccessResponse {
    success: bool,
}

/// Log in with email and password.
///
/// POST /api/auth/login
#[instrument(skip(state, body))]
async fn login(
    State(state): State<AppState>,
    ClientAddr(client): ClientAddr,
    body: Bytes,
) -> Result<Response, AppError> {
    let success = state.login().login(&client, &body).await?;

    set_sentry_user(success.admin.email.as_str());

    let mut response = Json(LoginResponse {
        success: true,
        role: success.admin.role,
        permissions: success.admin.permissions,
    })
    .into_response();
    cookies::append_session(
        response.headers_mut(),
        &success.session,
        state.session_config().secure_cookies,
    );
    Ok(response)
}

/// Check the presented session.
///
/// Silently refreshes the access credential when only the refresh
/// credential is still valid.
///
/// GET /api/auth/verify
#[instrument(skip_all)]
async fn verify(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let presented = SessionCookies::from_headers(&headers);
    let verified = state
        .sessions()
        .authenticate(presented.access.as_deref(), presented.refresh.as_deref())
        .await?;

    let admin = &verified.admin;
    let mut response = Json(VerifyResponse {
        valid: true,
        email: admin.email.clone(),
        role: admin.role,
        permissions: admin.permissions,
    })
    .into_response();
    if let Some(access) = &verified.refreshed {
        cookies::append_access(
            response.headers_mut(),
            access,
            state.session_config().secure_cookies,
        );
    }
    Ok(response)
}

/// Exchange the refresh credential for a new access credential.
///
/// POST /api/auth/refresh
#[instrument(skip_all)]
async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let presented = SessionCookies::from_headers(&headers);
    let verified = state.sessions().refresh(presented.refresh.as_deref()).await?;

    let mut response = Json(SuccessResponse { success: true }).into_response();
    if let Some(access) = &verified.refreshed {
        cookies::append_access(
            response.headers_mut(),
            access,
            state.session_config().secure_cookies,
        );
    }
    Ok(response)
}

/// Revoke and clear the session. Always succeeds.
///
/// POST /api/auth/logout
#[instrument(skip_all)]
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let presented = SessionCookies::from_headers(&headers);
    state
        .sessions()
        .revoke(presented.access.as_deref(), presented.refresh.as_deref())
        .await;

    let mut response = Json(SuccessResponse { success: true }).into_response();
    cookies::append_cleared(response.headers_mut(), state.session_config().secure_cookies);
    response
}
