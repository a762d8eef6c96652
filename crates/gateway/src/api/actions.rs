//! `POST /v1/actions/{webhook,code,format}`: verify signature,
//! parse the envelope, dispatch, always answer 200 with `outputFields`
//! unless the signature itself failed to verify.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use serde_json::json;

use ax_domain::trace::TraceEvent;
use ax_domain::types::{ActionEnvelope, ActionKind};

use crate::api::auth::verify_inbound;
use crate::dispatch;
use crate::state::AppState;

pub async fn webhook(state: State<AppState>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    handle(state, headers, body, ActionKind::Webhook, "/v1/actions/webhook").await
}

pub async fn code(state: State<AppState>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    handle(state, headers, body, ActionKind::Code, "/v1/actions/code").await
}

pub async fn format(state: State<AppState>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    handle(state, headers, body, ActionKind::Format, "/v1/actions/format").await
}

async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
    kind: ActionKind,
    path: &str,
) -> axum::response::Response {
    let client_secret = state.boot.oauth_client_secret.as_bytes();
    if let Err(e) = verify_inbound(&state, &headers, "POST", path, &body, client_secret) {
        TraceEvent::SignatureRejected {
            scheme: kind.as_str(),
            reason: "verification failed",
        }
        .emit();
        tracing::warn!(error = %e, action_kind = kind.as_str(), "inbound signature rejected");
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "signature verification failed"}))).into_response();
    }

    let envelope: ActionEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "malformed action envelope");
            return (
                StatusCode::OK,
                Json(dispatch::malformed_envelope_response(&state, kind)),
            )
                .into_response();
        }
    };

    let response = dispatch::run(&state, kind, envelope).await;
    (StatusCode::OK, Json(response)).into_response()
}
