//! Edit session routes
//!
//! - `POST /admin/sessions`: open a session
//! - `GET|DELETE /admin/sessions/{sid}`
//! - `GET|POST /admin/sessions/{sid}/collections/{name}`
//! - `GET|POST /admin/sessions/{sid}/pages/{key}`
//!
//! POST bodies are tagged operations, e.g. `{"op": "reorder", "from": 0, "to": 2}`.

use bytes::Bytes;
use hyper::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::{json_response, method_not_allowed, ok_json, parse_json, HttpResponse};
use crate::auth::User;
use crate::content::pages::PageKey;
use crate::server::AppState;
use crate::sessions::{CollectionName, CollectionOp, PageOp};
use crate::types::{Result, SiteError};

fn parse_session_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| SiteError::InvalidInput(format!("Invalid session id: {}", raw)))
}

pub async fn handle_session_request(
    state: &AppState,
    user: &User,
    method: &Method,
    segments: &[&str],
    body: &Bytes,
) -> Result<HttpResponse> {
    let store = state.store.as_ref();

    match (method, segments) {
        (&Method::POST, []) => {
            let session = state.sessions.open(user.clone());
            Ok(json_response(StatusCode::CREATED, &session.info()))
        }
        (&Method::GET, [sid]) => {
            let session = state.sessions.get(parse_session_id(sid)?, user)?;
            ok_json(&json!({
                "session": session.info(),
                "unsavedEdits": session.has_unsaved_edits().await,
            }))
        }
        (&Method::DELETE, [sid]) => {
            state.sessions.close(parse_session_id(sid)?, user)?;
            ok_json(&json!({ "closed": true }))
        }
        (method, [sid, "collections", name]) => {
            let session = state.sessions.get(parse_session_id(sid)?, user)?;
            let name: CollectionName = name.parse()?;
            match *method {
                Method::GET => ok_json(&session.collection_view(name).await?),
                Method::POST => {
                    let op: CollectionOp = parse_json(body)?;
                    ok_json(&session.collection_op(store, name, op).await?)
                }
                _ => Ok(method_not_allowed()),
            }
        }
        (method, [sid, "pages", key]) => {
            let session = state.sessions.get(parse_session_id(sid)?, user)?;
            let key: PageKey = key.parse()?;
            match *method {
                Method::GET => ok_json(&session.page_view(key).await?),
                Method::POST => {
                    let op: PageOp = parse_json(body)?;
                    ok_json(&session.page_op(store, key, op).await?)
                }
                _ => Ok(method_not_allowed()),
            }
        }
        _ => Err(SiteError::NotFound("Unknown session route".into())),
    }
}
