//! Administrator management routes.
//!
//! Listing, provisioning and editing administrators requires
//! `manage_admins`. Handing out the super-admin role, or editing an
//! administrator who already holds it, additionally requires the caller to
//! be a super admin.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
};
use tracing::instrument;

use aula_core::{AdminRole, Email};

use crate::db::DirectoryError;
use crate::error::AppError;
use crate::middleware::AuthenticatedAdmin;
use crate::middleware::RequirePermission;
use crate::middleware::permission::ManageAdmins;
use crate::models::{AdminRecord, AdminUpdate, CurrentAdmin, NewAdmin};
use crate::state::AppState;

/// Build the administrator router (mounted under `/admin`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(me))
        .route("/api/admins", get(list).post(create))
        .route("/api/admins/{email}", patch(update))
}

fn directory_error(err: DirectoryError) -> AppError {
    match err {
        DirectoryError::NotFound => AppError::NotFound("Administrator".to_string()),
        DirectoryError::Conflict(message) => AppError::Conflict(message),
        other => AppError::Directory(other),
    }
}

fn ensure_can_grant(caller: &CurrentAdmin, role: Option<AdminRole>) -> Result<(), AppError> {
    if role.is_some_and(AdminRole::is_super_admin) && !caller.role.is_super_admin() {
        tracing::warn!(email = %caller.email, "Non super admin tried to grant super_admin");
        return Err(AppError::forbidden(
            "Only super admins can grant the super_admin role",
        ));
    }
    Ok(())
}

fn ensure_can_modify(caller: &CurrentAdmin, target: &AdminRecord) -> Result<(), AppError> {
    if target.role.is_super_admin() && !caller.role.is_super_admin() {
        tracing::warn!(
            email = %caller.email,
            target = %target.email,
            "Non super admin tried to modify a super admin"
        );
        return Err(AppError::forbidden(
            "Only super admins can modify a super admin",
        ));
    }
    Ok(())
}

/// The administrator making the request.
///
/// GET /admin/api/me
async fn me(AuthenticatedAdmin(admin): AuthenticatedAdmin) -> Json<CurrentAdmin> {
    Json(admin)
}

/// All administrators, newest first.
///
/// GET /admin/api/admins
#[instrument(skip_all)]
async fn list(
    State(state): State<AppState>,
    _admin: RequirePermission<ManageAdmins>,
) -> Result<Json<Vec<AdminRecord>>, AppError> {
    let admins = state.directory().list().await.map_err(directory_error)?;
    Ok(Json(admins))
}

/// Provision an administrator.
///
/// POST /admin/api/admins
#[instrument(skip_all)]
async fn create(
    State(state): State<AppState>,
    RequirePermission { admin: caller, .. }: RequirePermission<ManageAdmins>,
    Json(new_admin): Json<NewAdmin>,
) -> Result<(StatusCode, Json<AdminRecord>), AppError> {
    ensure_can_grant(&caller, Some(new_admin.role))?;

    let record = state
        .directory()
        .insert(new_admin, state.clock().now())
        .await
        .map_err(directory_error)?;

    tracing::info!(
        by = %caller.email,
        email = %record.email,
        role = %record.role,
        "Administrator created"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// Change role, permissions or active flag.
///
/// PATCH /admin/api/admins/{email}
#[instrument(skip_all)]
async fn update(
    State(state): State<AppState>,
    RequirePermission { admin: caller, .. }: RequirePermission<ManageAdmins>,
    Path(email): Path<String>,
    Json(update): Json<AdminUpdate>,
) -> Result<Json<AdminRecord>, AppError> {
    let email =
        Email::parse(&email).map_err(|e| AppError::Validation(format!("Invalid email: {e}")))?;
    if update.is_empty() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }
    ensure_can_grant(&caller, update.role)?;

    let target = state
        .directory()
        .find(&email)
        .await
        .map_err(directory_error)?
        .ok_or_else(|| AppError::NotFound("Administrator".to_string()))?;
    ensure_can_modify(&caller, &target)?;

    let record = state
        .directory()
        .update(&email, &update, state.clock().now())
        .await
        .map_err(directory_error)?;

    tracing::info!(
        by = %caller.email,
        email = %record.email,
        role = %record.role,
        active = record.active,
        "Administrator updated"
    );
    Ok(Json(record))
}
