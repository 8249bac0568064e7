//! Health endpoint

use hyper::StatusCode;
use serde::Serialize;

use super::{json_response, HttpResponse};
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub mode: &'static str,
    pub store: &'static str,
    pub uptime_secs: u64,
    pub edit_sessions: usize,
}

/// Liveness probe: always 200 while the service is running
pub fn health_check(state: &AppState) -> HttpResponse {
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        mode: if state.args.dev_mode { "development" } else { "production" },
        store: state.store_kind,
        uptime_secs: state.started_at.elapsed().as_secs(),
        edit_sessions: state.sessions.len(),
    };
    json_response(StatusCode::OK, &response)
}
