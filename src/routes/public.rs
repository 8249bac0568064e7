//! Public read-only routes
//!
//! - `GET /api/home`
//! - `GET /api/pages/{key}`
//! - `GET /api/gallery/{groupId}`
//! - `GET /objects/{path}`

use bytes::Bytes;
use hyper::header::{HeaderValue, CACHE_CONTROL};
use hyper::StatusCode;

use super::{bytes_response, not_found_response, ok_json, path_segments, HttpResponse};
use crate::content::pages::PageKey;
use crate::objects::content_type_for;
use crate::render::{content_page_view, gallery_group_view, home_view};
use crate::server::AppState;
use crate::types::Result;

pub async fn handle_public_request(state: &AppState, path: &str) -> Result<HttpResponse> {
    let segments = path_segments(path, "/api/")?;
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
    let store = state.store.as_ref();

    match segments.as_slice() {
        ["home"] => ok_json(&home_view(store).await?),
        ["pages", key] => {
            let key: PageKey = key.parse()?;
            ok_json(&content_page_view(store, key).await?)
        }
        ["gallery", group_id] => ok_json(&gallery_group_view(store, group_id).await?),
        _ => Ok(not_found_response(path)),
    }
}

/// Serve a stored photo file
pub async fn serve_object(state: &AppState, path: &str) -> Result<HttpResponse> {
    let object_path = path_segments(path, "/objects/")?.join("/");
    let data = state.objects.get(&object_path).await?;

    let mut response = bytes_response(StatusCode::OK, content_type_for(&object_path), Bytes::from(data));
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400"));
    Ok(response)
}
