//! Session cookie reading and writing.
//!
//! Both credentials travel as `HttpOnly`, `SameSite=Strict` cookies scoped
//! to `/`. `Secure` is set whenever the admin is served over HTTPS.

use std::time::Duration;

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, SET_COOKIE},
};

use crate::models::cookies;
use crate::services::{IssuedSession, IssuedToken};

/// Session credentials presented by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCookies {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl SessionCookies {
    /// Read both credentials from the request's `Cookie` headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            access: read_cookie(headers, cookies::ACCESS),
            refresh: read_cookie(headers, cookies::REFRESH),
        }
    }

    /// Whether no credential was presented at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

/// Find a non-empty cookie value by name.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn cookie(name: &str, value: &str, max_age: Duration, secure: bool) -> Option<HeaderValue> {
    let mut cookie = format!(
        "{name}={value}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        max_age.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

fn expired_cookie(name: &str, secure: bool) -> Option<HeaderValue> {
    let mut cookie = format!(
        "{name}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

/// Append the access credential cookie.
pub fn append_access(headers: &mut HeaderMap, token: &IssuedToken, secure: bool) {
    if let Some(value) = cookie(cookies::ACCESS, &token.value, token.max_age, secure) {
        headers.append(SET_COOKIE, value);
    }
}

/// Append both credential cookies for a new session.
pub fn append_session(headers: &mut HeaderMap, session: &IssuedSession, secure: bool) {
    append_access(headers, &session.access, secure);
    if let Some(value) = cookie(
        cookies::REFRESH,
        &session.refresh.value,
        session.refresh.max_age,
        secure,
    ) {
        headers.append(SET_COOKIE, value);
    }
}

/// Append cookies that make the client drop both credentials.
pub fn append_cleared(headers: &mut HeaderMap, secure: bool) {
    for name in [cookies::ACCESS, cookies::REFRESH] {
        if let Some(value) = expired_cookie(name, secure) {
            headers.append(SET_COOKIE, value);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_read_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; aula_admin_session=abc.def"));
        headers.append(COOKIE, HeaderValue::from_static("aula_admin_refresh=r1.r2"));

        let cookies = SessionCookies::from_headers(&headers);
        assert_eq!(cookies.access.as_deref(), Some("abc.def"));
        assert_eq!(cookies.refresh.as_deref(), Some("r1.r2"));
    }

    #[test]
    fn test_empty_cookie_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("aula_admin_session="));
        assert!(SessionCookies::from_headers(&headers).is_empty());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let token = IssuedToken {
            value: "tok".to_string(),
            expires_at: Utc::now(),
            max_age: Duration::from_secs(3600),
        };
        let mut headers = HeaderMap::new();
        append_access(&mut headers, &token, true);

        let value = headers[SET_COOKIE].to_str().unwrap();
        assert_eq!(
            value,
            "aula_admin_session=tok; Path=/; HttpOnly; SameSite=Strict; Max-Age=3600; Secure"
        );
    }

    #[test]
    fn test_cleared_cookies_expire_in_the_past() {
        let mut headers = HeaderMap::new();
        append_cleared(&mut headers, false);

        let values: Vec<_> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(values.len(), 2);
        for value in values {
            assert!(value.contains("Max-Age=0"));
            assert!(value.contains("Expires=Thu, 01 Jan 1970"));
        }
    }
}
