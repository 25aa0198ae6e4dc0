//! Per-handler capability checks.
//!
//! Handlers declare what they need through their extractor:
//!
//! ```rust,ignore
//! async fn list_admins(
//!     RequirePermission { admin, .. }: RequirePermission<ManageAdmins>,
//! ) -> impl IntoResponse { ... }
//! ```
//!
//! The checks are data driven: a super admin gets no capability that is not
//! in their permission set. Only operations documented as super-admin-only
//! use [`RequireSuperAdmin`].
//!
//! There is one marker per [`Permission`]. This crate's own routes only
//! need [`ManageAdmins`]; the others are exported for content handlers
//! (users, courses, blog, matriculas) built on this crate.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use aula_core::Permission;

use crate::error::AppError;
use crate::models::CurrentAdmin;

/// A capability a handler requires.
pub trait RequiredPermission: Send + Sync + 'static {
    const PERMISSION: Permission;
}

macro_rules! permission_markers {
    ($($(#[$doc:meta])* $marker:ident => $permission:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy)]
            pub struct $marker;

            impl RequiredPermission for $marker {
                const PERMISSION: Permission = Permission::$permission;
            }
        )*
    };
}

permission_markers! {
    /// Requires `manage_users`.
    ManageUsers => ManageUsers,
    /// Requires `manage_courses`.
    ManageCourses => ManageCourses,
    /// Requires `manage_blog`.
    ManageBlog => ManageBlog,
    /// Requires `manage_admins`.
    ManageAdmins => ManageAdmins,
    /// Requires `manage_matriculas`.
    ManageMatriculas => ManageMatriculas,
}

fn current_admin(parts: &Parts) -> Result<CurrentAdmin, AppError> {
    parts
        .extensions
        .get::<CurrentAdmin>()
        .cloned()
        .ok_or_else(|| AppError::unauthenticated("Not authenticated"))
}

/// Extractor for any verified administrator.
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin(pub CurrentAdmin);

impl<S> FromRequestParts<S> for AuthenticatedAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_admin(parts).map(Self)
    }
}

/// Extractor that requires the capability named by `P`.
///
/// Missing session is a 401; a session without the capability is a 403.
#[derive(Debug, Clone)]
pub struct RequirePermission<P> {
    pub admin: CurrentAdmin,
    _permission: PhantomData<fn() -> P>,
}

impl<S, P> FromRequestParts<S> for RequirePermission<P>
where
    S: Send + Sync,
    P: RequiredPermission,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = current_admin(parts)?;
        if !admin.can(P::PERMISSION) {
            tracing::warn!(
                email = %admin.email,
                permission = %P::PERMISSION,
                "Admin lacks required permission"
            );
            return Err(AppError::forbidden(format!(
                "Insufficient permission: {} required",
                P::PERMISSION
            )));
        }
        Ok(Self {
            admin,
            _permission: PhantomData,
        })
    }
}

/// Extractor for super-admin-only operations.
#[derive(Debug, Clone)]
pub struct RequireSuperAdmin(pub CurrentAdmin);

impl<S> FromRequestParts<S> for RequireSuperAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = current_admin(parts)?;
        if !admin.role.is_super_admin() {
            return Err(AppError::forbidden(
                "Only super admins can perform this operation",
            ));
        }
        Ok(Self(admin))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use aula_core::{AdminRole, Email, Permissions};
    use axum::http::{Request, StatusCode};
    use chrono::Utc;

    fn parts_with(admin: Option<CurrentAdmin>) -> Parts {
        let (mut parts, ()) = Request::builder().uri("/admin/api/x").body(()).unwrap().into_parts();
        if let Some(admin) = admin {
            parts.extensions.insert(admin);
        }
        parts
    }

    fn admin(role: AdminRole, permissions: Permissions) -> CurrentAdmin {
        CurrentAdmin {
            email: Email::parse("ana@aula.dev").unwrap(),
            role,
            permissions,
            expires_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_missing_session_is_unauthenticated() {
        let mut parts = parts_with(None);
        let err = RequirePermission::<ManageUsers>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_capability_is_forbidden() {
        let mut parts = parts_with(Some(admin(
            AdminRole::Admin,
            Permissions::none().with(Permission::ManageBlog),
        )));
        let err = RequirePermission::<ManageUsers>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let ok = RequirePermission::<ManageBlog>::from_request_parts(&mut parts, &()).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_super_admin_gets_no_implicit_capability() {
        let mut parts = parts_with(Some(admin(AdminRole::SuperAdmin, Permissions::none())));
        let err = RequirePermission::<ManageAdmins>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert!(RequireSuperAdmin::from_request_parts(&mut parts, &()).await.is_ok());
    }

    #[tokio::test]
    async fn test_super_admin_only() {
        let mut parts = parts_with(Some(admin(AdminRole::Admin, Permissions::all())));
        let err = RequireSuperAdmin::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
