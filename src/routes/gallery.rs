//! Gallery admin routes
//!
//! - `GET|POST /admin/gallery/groups` (`?sort=title|date|size&dir=asc|desc`)
//! - `GET|PUT|DELETE /admin/gallery/groups/{gid}`
//! - `GET|POST /admin/gallery/groups/{gid}/photos` (POST uploads a batch)
//! - `PUT /admin/gallery/groups/{gid}/photos/order`
//! - `PUT|DELETE /admin/gallery/groups/{gid}/photos/{pid}`
//! - `GET /admin/gallery/catalog`

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use hyper::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{json_response, ok_json, parse_json, parse_query, HttpResponse};
use crate::content::gallery::{
    GroupMeta, GroupSort, GroupSortField, NewGroup, PhotoMeta, UploadFile,
};
use crate::server::AppState;
use crate::store::Direction;
use crate::types::{Result, SiteError};

#[derive(Debug, Default, Deserialize)]
struct GroupListQuery {
    #[serde(default)]
    sort: Option<GroupSortField>,
    #[serde(default)]
    dir: Option<Direction>,
}

impl GroupListQuery {
    fn into_sort(self) -> Option<GroupSort> {
        self.sort.map(|sort| GroupSort {
            sort,
            dir: self.dir.unwrap_or(Direction::Asc),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadBody {
    file_name: String,
    data_base64: String,
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    files: Vec<UploadBody>,
}

impl UploadRequest {
    fn decode(self) -> Result<Vec<UploadFile>> {
        self.files
            .into_iter()
            .map(|file| {
                let data = BASE64.decode(file.data_base64.as_bytes()).map_err(|e| {
                    SiteError::InvalidInput(format!("{} is not valid base64: {}", file.file_name, e))
                })?;
                Ok(UploadFile {
                    file_name: file.file_name,
                    data,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct PhotoOrder {
    ids: Vec<String>,
}

pub async fn handle_gallery_request(
    state: &AppState,
    method: &Method,
    segments: &[&str],
    query: Option<&str>,
    body: &Bytes,
) -> Result<HttpResponse> {
    let gallery = &state.gallery;

    match (method, segments) {
        (&Method::GET, ["groups"]) => {
            let q: GroupListQuery = parse_query(query)?;
            ok_json(&gallery.list_groups(q.into_sort()).await?)
        }
        (&Method::POST, ["groups"]) => {
            let new_group: NewGroup = parse_json(body)?;
            Ok(json_response(StatusCode::CREATED, &gallery.create_group(new_group).await?))
        }
        (&Method::GET, ["groups", gid]) => ok_json(&gallery.get_group(gid).await?),
        (&Method::PUT, ["groups", gid]) => {
            let meta: GroupMeta = parse_json(body)?;
            ok_json(&gallery.save_group_meta(gid, meta).await?)
        }
        (&Method::DELETE, ["groups", gid]) => ok_json(&gallery.remove_group(gid).await?),
        (&Method::GET, ["groups", gid, "photos"]) => ok_json(&gallery.load_photos(gid).await?),
        (&Method::POST, ["groups", gid, "photos"]) => {
            let request: UploadRequest = parse_json(body)?;
            let files = request.decode()?;
            if files.is_empty() {
                return Err(SiteError::InvalidInput("No files to upload".into()));
            }
            ok_json(&gallery.upload_photos(gid, files).await?)
        }
        (&Method::PUT, ["groups", gid, "photos", "order"]) => {
            let order: PhotoOrder = parse_json(body)?;
            gallery.save_photo_order(gid, &order.ids).await?;
            ok_json(&json!({ "saved": order.ids.len() }))
        }
        (&Method::PUT, ["groups", gid, "photos", pid]) => {
            let meta: PhotoMeta = parse_json(body)?;
            gallery.save_photo(gid, pid, meta).await?;
            ok_json(&json!({ "saved": true }))
        }
        (&Method::DELETE, ["groups", gid, "photos", pid]) => {
            gallery.remove_photo(gid, pid).await?;
            ok_json(&json!({ "removed": true }))
        }
        (&Method::GET, ["catalog"]) => ok_json(&gallery.photo_catalog().await?),
        _ => Err(SiteError::NotFound("Unknown gallery route".into())),
    }
}
