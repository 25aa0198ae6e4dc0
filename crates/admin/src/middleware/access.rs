//! Gatekeeper for the `/admin` area.
//!
//! Every request under the prefix must carry a session that verifies
//! (silently refreshing an expired access credential when the refresh
//! credential is still good). On success the verified [`CurrentAdmin`] is
//! placed in the request extensions for handlers and permission extractors.
//! On any failure the credentials are cleared and the client is sent to the
//! login page with a reason it can display.
//!
//! This layer never writes to the administrator directory.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::error::set_sentry_user;
use crate::middleware::cookies::{self, SessionCookies};
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Login page that rejected requests are sent to.
pub const LOGIN_PATH: &str = "/login";

/// Reasons shown on the login page.
pub mod reasons {
    pub const SIGN_IN_REQUIRED: &str = "Please sign in to continue";
    pub const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";
    pub const AUTHENTICATION_ERROR: &str = "Authentication error. Please sign in again.";
    pub const VERIFICATION_FAILED: &str = "Could not verify your session. Please try again.";
}

fn redirect_to_login(reason: &str, clear: Option<bool>) -> Response {
    let location = format!("{LOGIN_PATH}?error={}", urlencoding::encode(reason));
    let mut response = Redirect::to(&location).into_response();
    if let Some(secure) = clear {
        cookies::append_cleared(response.headers_mut(), secure);
    }
    response
}

/// Require a verified admin session.
pub async fn require_admin_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let presented = SessionCookies::from_headers(request.headers());
    if presented.is_empty() {
        return redirect_to_login(reasons::SIGN_IN_REQUIRED, None);
    }

    let secure = state.session_config().secure_cookies;
    let verified = match state
        .sessions()
        .authenticate(presented.access.as_deref(), presented.refresh.as_deref())
        .await
    {
        Ok(verified) => verified,
        Err(e) if e.is_expired() => {
            tracing::info!(path = %request.uri().path(), "Admin session expired");
            return redirect_to_login(reasons::SESSION_EXPIRED, Some(secure));
        }
        Err(e) if e.is_internal() => {
            tracing::error!(error = %e, "Admin session verification failed");
            return redirect_to_login(reasons::VERIFICATION_FAILED, Some(secure));
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %request.uri().path(), "Admin session rejected");
            return redirect_to_login(reasons::AUTHENTICATION_ERROR, Some(secure));
        }
    };

    set_sentry_user(verified.admin.email.as_str());
    request.extensions_mut().insert::<CurrentAdmin>(verified.admin);

    let mut response = next.run(request).await;
    if let Some(access) = &verified.refreshed {
        cookies::append_access(response.headers_mut(), access, secure);
    }
    response
}
