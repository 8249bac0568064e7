//! Admin routes
//!
//! Every `/admin/*` request must carry a bearer token whose email is on the
//! admin allowlist (dev mode treats every caller as an admin).
//!
//! - `GET /admin/me`, `GET /admin/overview`
//! - `/admin/sessions/*`: edit sessions and their editors (see [`super::editor`])
//! - `/admin/gallery/*`: gallery management (see [`super::gallery`])
//! - `GET|DELETE /admin/uploads`: upload progress

use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Body;
use hyper::header::AUTHORIZATION;
use hyper::{Method, Request};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{editor, gallery, not_found_response, ok_json, parse_query, path_segments, HttpResponse};
use crate::render::admin_overview;
use crate::server::AppState;
use crate::types::{Result, SiteError};

#[derive(Debug, Default, Deserialize)]
struct UploadsQuery {
    #[serde(default)]
    group: Option<String>,
}

/// Read a request body, refusing anything over `limit` bytes
pub async fn read_body<B>(body: B, limit: usize) -> Result<Bytes>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    Limited::new(body, limit)
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| SiteError::InvalidInput(format!("Failed to read request body: {}", e)))
}

pub async fn handle_admin_request<B>(state: Arc<AppState>, req: Request<B>) -> Result<HttpResponse>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let identity = state.identity.resolve(auth_header)?;
    let user = identity.require_admin()?.clone();

    let body = if matches!(parts.method, Method::POST | Method::PUT) {
        read_body(body, state.args.max_body_bytes).await?
    } else {
        Bytes::new()
    };

    let path = parts.uri.path();
    let query = parts.uri.query();
    let segments = path_segments(path, "/admin/")?;
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

    match (&parts.method, segments.as_slice()) {
        (&Method::GET, ["me"]) => ok_json(&identity),
        (&Method::GET, ["overview"]) => ok_json(&admin_overview(state.store.as_ref()).await),
        (method, ["sessions", rest @ ..]) => {
            editor::handle_session_request(&state, &user, method, rest, &body).await
        }
        (method, ["gallery", rest @ ..]) => {
            gallery::handle_gallery_request(&state, method, rest, query, &body).await
        }
        (&Method::GET, ["uploads"]) => {
            let q: UploadsQuery = parse_query(query)?;
            ok_json(&state.gallery.uploads().list(q.group.as_deref()))
        }
        (&Method::DELETE, ["uploads"]) => {
            let cleared = state.gallery.uploads().clear_finished();
            ok_json(&json!({ "cleared": cleared }))
        }
        _ => Ok(not_found_response(path)),
    }
}
