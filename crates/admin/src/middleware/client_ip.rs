//! Client identification for login rate limiting.
//!
//! Behind Cloudflare and Fly.io the socket peer is the proxy, so the real
//! client address comes from proxy headers. Those headers are attacker
//! controlled unless a proxy overwrites them, so they are only read when
//! `TRUST_PROXY_HEADERS` is set.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

use crate::services::ClientKey;
use crate::state::AppState;

/// Key used when no address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

/// Resolve the client address.
///
/// With trusted proxy headers, checks `CF-Connecting-IP`, the first hop of
/// `X-Forwarded-For`, `X-Real-IP` and `Fly-Client-IP` in that order before
/// falling back to the socket peer.
#[must_use]
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> ClientKey {
    let from_headers = trust_proxy
        .then(|| {
            ["cf-connecting-ip", "x-forwarded-for", "x-real-ip", "fly-client-ip"]
                .into_iter()
                .find_map(|name| header_ip(headers, name))
        })
        .flatten();

    let ip = from_headers.or_else(|| peer.map(|addr| addr.ip()));
    ClientKey {
        key: ip.map_or_else(|| UNKNOWN_CLIENT.to_string(), |ip| ip.to_string()),
        ip,
    }
}

/// Extractor yielding the [`ClientKey`] for the request.
#[derive(Debug, Clone)]
pub struct ClientAddr(pub ClientKey);

impl FromRequestParts<AppState> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self(client_key(&parts.headers, peer, state.trust_proxy_headers())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let h = headers(&[
            ("x-forwarded-for", "10.0.0.1, 10.0.0.2"),
            ("cf-connecting-ip", "203.0.113.5"),
        ]);
        assert_eq!(client_key(&h, None, true).key, "203.0.113.5");
    }

    #[test]
    fn test_first_forwarded_hop() {
        let h = headers(&[("x-forwarded-for", "198.51.100.7, 10.0.0.2")]);
        assert_eq!(client_key(&h, None, true).key, "198.51.100.7");
    }

    #[test]
    fn test_headers_ignored_unless_trusted() {
        let h = headers(&[("cf-connecting-ip", "203.0.113.5")]);
        let peer: SocketAddr = "192.0.2.10:4242".parse().unwrap();
        let key = client_key(&h, Some(peer), false);
        assert_eq!(key.key, "192.0.2.10");
        assert_eq!(key.ip, Some(peer.ip()));
    }

    #[test]
    fn test_unknown_without_address() {
        let key = client_key(&HeaderMap::new(), None, true);
        assert_eq!(key.key, UNKNOWN_CLIENT);
        assert!(key.ip.is_none());
    }
}
