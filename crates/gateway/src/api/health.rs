//! `GET /v1/health` — unauthenticated liveness probe.

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
