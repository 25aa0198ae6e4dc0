//! Site settings routes.
//!
//! The public client reads the registration and maintenance flags without
//! a session. Only super admins may change them.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, put},
};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireSuperAdmin;
use crate::models::SiteSettings;
use crate::state::AppState;

/// Public settings routes.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/api/settings", get(show))
}

/// Settings routes mounted under the gated `/admin` prefix.
pub fn admin_router() -> Router<AppState> {
    Router::new().route("/api/settings", put(update))
}

/// Current site settings.
///
/// Falls back to the defaults when none are stored or the store is
/// unavailable, so the public client keeps working.
///
/// GET /api/settings
#[instrument(skip_all)]
async fn show(State(state): State<AppState>) -> Json<SiteSettings> {
    let settings = state.settings().current().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load site settings, using defaults");
        SiteSettings::default()
    });
    Json(settings)
}

/// Replace the site settings.
///
/// PUT /admin/api/settings
#[instrument(skip_all)]
async fn update(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Json(settings): Json<SiteSettings>,
) -> Result<Json<SiteSettings>, AppError> {
    state.settings().put(settings).await?;
    tracing::info!(
        admin = %admin.email,
        allow_registration = settings.allow_registration,
        maintenance_mode = settings.maintenance_mode,
        "Site settings updated"
    );
    Ok(Json(settings))
}
