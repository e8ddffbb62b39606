//! CORS configuration for the HTTP server
//!
//! The default layer only allows localhost origins; the permissive variant
//! mirrors the wide-open policy the streaming endpoint historically served
//! and is meant for development only.

use http::{header::HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Standard allowed headers
pub const ALLOWED_HEADERS: [http::header::HeaderName; 1] = [http::header::CONTENT_TYPE];

/// Standard allowed methods
pub const ALLOWED_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

/// Default max age for preflight cache (1 hour)
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

/// Strict CORS layer that only allows localhost origins
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin, _| {
            is_localhost_origin(origin)
        }))
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(ALLOWED_HEADERS)
        .max_age(Duration::from_secs(DEFAULT_MAX_AGE_SECS))
}

/// Permissive CORS layer for development and testing.
///
/// Not suitable for production; it allows every origin.
pub fn cors_layer_permissive() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Check whether an origin header points at localhost on any port
fn is_localhost_origin(origin: &HeaderValue) -> bool {
    let Ok(origin_str) = origin.to_str() else {
        return false;
    };

    let Some(rest) = origin_str
        .strip_prefix("http://")
        .or_else(|| origin_str.strip_prefix("https://"))
    else {
        return false;
    };

    let host = rest.split(':').next().unwrap_or(rest);
    host == "localhost" || host == "127.0.0.1" || host == "[::1]"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(s: &str) -> HeaderValue {
        HeaderValue::from_str(s).unwrap()
    }

    #[test]
    fn test_localhost_origins_allowed() {
        assert!(is_localhost_origin(&origin("http://localhost:3000")));
        assert!(is_localhost_origin(&origin("http://127.0.0.1:8080")));
        assert!(is_localhost_origin(&origin("https://localhost")));
    }

    #[test]
    fn test_external_origins_blocked() {
        assert!(!is_localhost_origin(&origin("https://example.com")));
        assert!(!is_localhost_origin(&origin("http://192.168.1.5:3000")));
        assert!(!is_localhost_origin(&origin("ftp://localhost")));
    }

    #[test]
    fn test_localhost_in_path_not_matched() {
        assert!(!is_localhost_origin(&origin("https://evil.com/localhost")));
    }
}
