//! HTTP routes for Lantern
//!
//! Handlers return `Result<HttpResponse>`; [`error_response`] turns a
//! [`SiteError`] into a JSON error body with the matching status code.

pub mod admin;
pub mod editor;
pub mod gallery;
pub mod health;
pub mod public;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::types::{Result, SiteError};

pub use admin::handle_admin_request;
pub use health::health_check;
pub use public::{handle_public_request, serve_object};

pub type HttpResponse = Response<Full<Bytes>>;

/// Response with a body and content type
pub fn bytes_response(status: StatusCode, content_type: &'static str, body: Bytes) -> HttpResponse {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
        .headers_mut()
        .insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    response
}

/// JSON response for any serializable value
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(body) => bytes_response(status, "application/json", Bytes::from(body)),
        Err(e) => error_response(&SiteError::Json(e)),
    }
}

pub fn ok_json<T: Serialize>(value: &T) -> Result<HttpResponse> {
    Ok(json_response(StatusCode::OK, value))
}

/// JSON error body: `{"error": "...", "code": "..."}`
pub fn error_response(err: &SiteError) -> HttpResponse {
    let status = err.status_code();
    if status.is_server_error() {
        error!(code = err.code(), "Request failed: {}", err);
    } else {
        warn!(code = err.code(), "Request rejected: {}", err);
    }
    let body = serde_json::json!({
        "error": err.to_string(),
        "code": err.code(),
    });
    bytes_response(status, "application/json", Bytes::from(body.to_string()))
}

pub fn not_found_response(path: &str) -> HttpResponse {
    error_response(&SiteError::NotFound(format!("No route for {}", path)))
}

pub fn method_not_allowed() -> HttpResponse {
    bytes_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "application/json",
        Bytes::from_static(br#"{"error":"Method Not Allowed","code":"METHOD_NOT_ALLOWED"}"#),
    )
}

/// CORS preflight response
pub fn preflight_response() -> HttpResponse {
    let mut response = bytes_response(StatusCode::OK, "text/plain", Bytes::new());
    let headers = response.headers_mut();
    headers.insert("Access-Control-Allow-Headers", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    response
}

/// Decode a JSON request body
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| SiteError::InvalidInput(format!("Invalid request body: {}", e)))
}

/// Decode a query string (missing query parses as empty)
pub fn parse_query<T: DeserializeOwned>(query: Option<&str>) -> Result<T> {
    serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| SiteError::InvalidInput(format!("Invalid query string: {}", e)))
}

/// Non-empty path segments after `prefix`, percent-decoded
pub fn path_segments(path: &str, prefix: &str) -> Result<Vec<String>> {
    path.strip_prefix(prefix)
        .unwrap_or("")
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .map_err(|e| SiteError::InvalidInput(format!("Bad path segment {}: {}", s, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_status() {
        let resp = error_response(&SiteError::Forbidden("nope".into()));
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            resp.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_path_segments() {
        let segments = path_segments("/admin/gallery/groups/g%201/photos", "/admin/").unwrap();
        assert_eq!(segments, vec!["gallery", "groups", "g 1", "photos"]);
        assert!(path_segments("/admin", "/admin/").unwrap().is_empty());
    }

    #[test]
    fn test_parse_query_defaults() {
        #[derive(serde::Deserialize)]
        struct Q {
            #[serde(default)]
            group: Option<String>,
        }
        let q: Q = parse_query(None).unwrap();
        assert!(q.group.is_none());
    }
}
