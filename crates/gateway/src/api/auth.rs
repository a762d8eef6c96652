//! Inbound signature verification wiring: pulls the three
//! `X-Hubspot-Signature*` headers off the request, reconstructs the
//! externally-visible URL, and checks it against the tenant's OAuth
//! client secret. Only this check produces a non-200 response.

use axum::http::HeaderMap;

use ax_signature::{verify, SignatureError, SignatureVersion, VerifyRequest};

use crate::state::AppState;

pub fn verify_inbound(
    state: &AppState,
    headers: &HeaderMap,
    method: &str,
    path: &str,
    body: &[u8],
    client_secret: &[u8],
) -> Result<(), SignatureError> {
    let version_header = headers
        .get("X-Hubspot-Signature-Version")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if state.config.server.allow_dev_signature_bypass && version_header == "dev" {
        return Ok(());
    }

    let version = SignatureVersion::parse(version_header)
        .ok_or_else(|| SignatureError::UnsupportedVersion(version_header.to_string()))?;

    let signature = headers
        .get("X-Hubspot-Signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let timestamp_ms = headers
        .get("X-Hubspot-Request-Timestamp")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok());

    let full_uri = format!("{}{}", state.boot.public_base_url, path);
    let req = VerifyRequest {
        method,
        full_uri: &full_uri,
        body,
        signature,
        timestamp_ms,
    };

    verify(version, client_secret, &req, chrono::Utc::now().timestamp_millis())
}
