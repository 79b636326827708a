//! Client IP extraction for provenance and rate limiting.
//!
//! Checks standard proxy headers (`CF-Connecting-IP`, `X-Real-IP`,
//! `X-Forwarded-For`) and falls back to the socket peer address from
//! `ConnectInfo`.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use http::request::Parts;

/// Header priority for IP extraction (highest to lowest).
const IP_HEADERS: &[&str] = &[
    "cf-connecting-ip", // Cloudflare
    "x-real-ip",        // Nginx
    "x-forwarded-for",  // Standard proxy header (first IP in chain)
];

/// Client IP address extracted from the request.
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub Option<IpAddr>);

impl ClientIp {
    /// Get the IP address if available.
    #[inline]
    #[must_use]
    pub const fn ip(&self) -> Option<IpAddr> {
        self.0
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(extract_client_ip(parts)))
    }
}

fn extract_client_ip(parts: &Parts) -> Option<IpAddr> {
    for header in IP_HEADERS {
        let ip = parts
            .headers
            .get(*header)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .and_then(|ip_str| ip_str.parse::<IpAddr>().ok());

        if ip.is_some() {
            return ip;
        }
    }

    // Set by axum's into_make_service_with_connect_info for direct connections
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;

    fn parts_with(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).expect("valid request").into_parts().0
    }

    #[test]
    fn extracts_x_forwarded_for_first_in_chain() {
        let parts = parts_with(&[("x-forwarded-for", "203.0.113.195, 70.41.3.18")]);
        assert_eq!(
            extract_client_ip(&parts),
            Some("203.0.113.195".parse::<IpAddr>().expect("valid ip"))
        );
    }

    #[test]
    fn extracts_x_real_ip() {
        let parts = parts_with(&[("x-real-ip", "192.0.2.1")]);
        assert_eq!(
            extract_client_ip(&parts),
            Some("192.0.2.1".parse::<IpAddr>().expect("valid ip"))
        );
    }

    #[test]
    fn prefers_cloudflare_header() {
        let parts = parts_with(&[
            ("cf-connecting-ip", "198.51.100.1"),
            ("x-forwarded-for", "203.0.113.1"),
        ]);
        assert_eq!(
            extract_client_ip(&parts),
            Some("198.51.100.1".parse::<IpAddr>().expect("valid ip"))
        );
    }

    #[test]
    fn missing_headers_yield_none() {
        let parts = parts_with(&[]);
        assert!(extract_client_ip(&parts).is_none());
    }

    #[test]
    fn invalid_ip_yields_none() {
        let parts = parts_with(&[("x-forwarded-for", "not-an-ip")]);
        assert!(extract_client_ip(&parts).is_none());
    }

    #[test]
    fn handles_ipv6() {
        let parts = parts_with(&[("x-forwarded-for", "2001:db8::1")]);
        assert_eq!(
            extract_client_ip(&parts),
            Some("2001:db8::1".parse::<IpAddr>().expect("valid ip"))
        );
    }
}
