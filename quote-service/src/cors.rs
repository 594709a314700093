//! Partner origin policy for the `/api` routes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, Method, StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ORIGIN,
        },
    },
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{debug, warn};

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Origins are accepted when they end with one of the configured suffixes.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    suffixes: Arc<[String]>,
}

impl OriginPolicy {
    pub fn new(suffixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            suffixes: suffixes.into_iter().collect(),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.suffixes.iter().any(|suffix| origin.ends_with(suffix.as_str()))
    }
}

/// Rejects foreign origins with 403, answers preflight requests directly and
/// stamps the CORS headers on everything else.
pub async fn origin_policy(
    State(policy): State<OriginPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(ORIGIN)
        .filter(|origin| origin.to_str().is_ok_and(|origin| policy.allows(origin)))
        .cloned();

    let Some(origin) = origin else {
        warn!(
            origin = ?request.headers().get(ORIGIN),
            path = %request.uri().path(),
            "Rejected request from disallowed origin"
        );
        return (StatusCode::FORBIDDEN, Json(json!({ "error": "Forbidden" }))).into_response();
    };

    if request.method() == Method::OPTIONS {
        debug!(path = %request.uri().path(), "Answering preflight request");
        let mut response = StatusCode::OK.into_response();
        let headers = response.headers_mut();
        apply_cors_headers(headers, origin);
        headers.insert(
            ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(PREFLIGHT_MAX_AGE),
        );
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut(), origin);
    response
}

fn apply_cors_headers(headers: &mut HeaderMap, origin: HeaderValue) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_origin_suffixes() {
        let policy = OriginPolicy::new([".gohighlevel.com".to_string()]);
        assert!(policy.allows("https://app.gohighlevel.com"));
        assert!(!policy.allows("https://gohighlevel.com.evil.io"));
        assert!(!policy.allows("https://example.com"));
        assert!(!policy.allows(""));
    }

    #[test]
    fn any_configured_suffix_is_enough() {
        let policy = OriginPolicy::new([".a.test".to_string(), ".b.test".to_string()]);
        assert!(policy.allows("https://x.b.test"));
    }
}
