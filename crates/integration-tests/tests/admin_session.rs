//! Session lifecycle: verify, silent refresh, explicit refresh, logout.

#![allow(clippy::unwrap_used)]

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{TimeDelta, Utc};

use aula_admin::db::AdminDirectory;
use aula_admin::models::AdminUpdate;
use aula_core::{Email, Permission, Permissions};
use aula_integration_tests::{
    EDITOR, ROOT, TestApp, body_json, cookie_header, get_with_cookie, set_cookie, set_cookies,
};

fn post_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

/// Keep only the named cookie from a `Cookie` header.
fn only(cookie: &str, name: &str) -> String {
    cookie
        .split("; ")
        .find(|pair| pair.starts_with(&format!("{name}=")))
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_login_then_verify() {
    let app = TestApp::new().await;
    let cookie = app.session_for(ROOT).await;

    let response = app.send(get_with_cookie("/api/auth/verify", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());

    let body = body_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["email"], ROOT);
    assert_eq!(body["role"], "super_admin");
    assert_eq!(body["permissions"]["manage_admins"], true);
}

#[tokio::test]
async fn test_verify_without_cookie() {
    let app = TestApp::new().await;
    let response = app
        .send(Request::get("/api/auth/verify").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Not authenticated");
}

#[tokio::test]
async fn test_verify_rejects_tampered_cookie() {
    let app = TestApp::new().await;
    let cookie = only(&app.session_for(ROOT).await, "aula_admin_session");
    let tampered = format!("{cookie}x");

    let response = app.send(get_with_cookie("/api/auth/verify", &tampered)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid session");
}

#[tokio::test]
async fn test_refresh_cookie_is_not_an_access_cookie() {
    let app = TestApp::new().await;
    let refresh = only(&app.session_for(ROOT).await, "aula_admin_refresh");
    let value = refresh.trim_start_matches("aula_admin_refresh=");
    let swapped = format!("aula_admin_session={value}");

    let response = app.send(get_with_cookie("/api/auth/verify", &swapped)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deactivation_revokes_live_session() {
    let app = TestApp::new().await;
    let cookie = app.session_for(EDITOR).await;

    app.directory
        .update(
            &Email::parse(EDITOR).unwrap(),
            &AdminUpdate {
                active: Some(false),
                ..AdminUpdate::default()
            },
            Utc::now(),
        )
        .await
        .unwrap();

    let response = app.send(get_with_cookie("/api/auth/verify", &cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["error"],
        "Administrator account is disabled"
    );
}

#[tokio::test]
async fn test_removed_administrator_is_forbidden() {
    let app = TestApp::new().await;
    let cookie = app.session_for(EDITOR).await;
    app.directory.remove(&Email::parse(EDITOR).unwrap()).await.unwrap();

    let response = app.send(get_with_cookie("/api/auth/verify", &cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "Administrator not found");
}

#[tokio::test]
async fn test_verify_reports_live_permissions() {
    let app = TestApp::new().await;
    let cookie = app.session_for(EDITOR).await;

    app.directory
        .update(
            &Email::parse(EDITOR).unwrap(),
            &AdminUpdate {
                permissions: Some(Permissions::none().with(Permission::ManageCourses)),
                ..AdminUpdate::default()
            },
            Utc::now(),
        )
        .await
        .unwrap();

    let body = body_json(app.send(get_with_cookie("/api/auth/verify", &cookie)).await).await;
    assert_eq!(body["permissions"]["manage_courses"], true);
    assert_eq!(body["permissions"]["manage_blog"], false);
}

#[tokio::test]
async fn test_logout_clears_and_revokes() {
    let app = TestApp::new().await;
    let cookie = app.session_for(ROOT).await;

    let response = app.send(post_with_cookie("/api/auth/logout", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    for name in ["aula_admin_session", "aula_admin_refresh"] {
        let cleared = set_cookie(&response, name).unwrap();
        assert!(cleared.starts_with(&format!("{name}=;")));
        assert!(cleared.contains("Max-Age=0"));
    }
    assert_eq!(body_json(response).await["success"], true);

    let access_only = only(&cookie, "aula_admin_session");
    let response = app.send(get_with_cookie("/api/auth/verify", &access_only)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The revoked refresh credential cannot mint a new session either.
    let response = app.send(get_with_cookie("/api/auth/verify", &cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_session_succeeds() {
    let app = TestApp::new().await;
    let response = app
        .send(Request::post("/api/auth/logout").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookies(&response).len(), 2);
}

#[tokio::test]
async fn test_silent_refresh_after_access_expiry() {
    let app = TestApp::new().await;
    let cookie = app.session_for(ROOT).await;
    app.advance(TimeDelta::minutes(61));

    let response = app.send(get_with_cookie("/api/auth/verify", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let renewed = set_cookie(&response, "aula_admin_session").unwrap();
    assert!(renewed.contains("Max-Age=3600"));
    assert!(set_cookie(&response, "aula_admin_refresh").is_none());

    // The renewed access cookie verifies on its own.
    let renewed = cookie_header(&response);
    let response = app.send(get_with_cookie("/api/auth/verify", &renewed)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_expired_access_without_refresh() {
    let app = TestApp::new().await;
    let access_only = only(&app.session_for(ROOT).await, "aula_admin_session");
    app.advance(TimeDelta::minutes(61));

    let response = app.send(get_with_cookie("/api/auth/verify", &access_only)).await;
    assert_eq!(response.status().as_u16(), 440);
    assert_eq!(body_json(response).await["error"], "Session expired");
}

#[tokio::test]
async fn test_both_credentials_expired() {
    let app = TestApp::new().await;
    let cookie = app.session_for(ROOT).await;
    app.advance(TimeDelta::days(8));

    let response = app.send(get_with_cookie("/api/auth/verify", &cookie)).await;
    assert_eq!(response.status().as_u16(), 440);
}

#[tokio::test]
async fn test_explicit_refresh() {
    let app = TestApp::new().await;
    let cookie = app.session_for(ROOT).await;
    let before = app
        .directory
        .find(&Email::parse(ROOT).unwrap())
        .await
        .unwrap()
        .unwrap();
    app.advance(TimeDelta::minutes(30));

    let refresh_only = only(&cookie, "aula_admin_refresh");
    let response = app.send(post_with_cookie("/api/auth/refresh", &refresh_only)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, "aula_admin_session").is_some());

    let after = app
        .directory
        .find(&Email::parse(ROOT).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(after.last_login > before.last_login);
    assert_eq!(after.last_login_ip, before.last_login_ip);
}

#[tokio::test]
async fn test_explicit_refresh_requires_refresh_cookie() {
    let app = TestApp::new().await;
    let access_only = only(&app.session_for(ROOT).await, "aula_admin_session");

    let response = app.send(post_with_cookie("/api/auth/refresh", &access_only)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
