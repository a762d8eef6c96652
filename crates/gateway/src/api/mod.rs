//! HTTP surface: router assembly, CORS and per-IP rate limiting, and the
//! `/v1/actions/*` + `/v1/health` handlers.

pub mod actions;
pub mod auth;
pub mod health;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use ax_domain::config::CorsConfig;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.cors);

    let router = Router::new()
        .route("/v1/health", get(health::health))
        .route("/v1/actions/webhook", post(actions::webhook))
        .route("/v1/actions/code", post(actions::code))
        .route("/v1/actions/format", post(actions::format))
        .layer(cors_layer);

    match build_governor_layer(&state) {
        Some(gov) => router.layer(gov).with_state(state),
        None => router.with_state(state),
    }
}

fn build_governor_layer(state: &AppState) -> Option<tower_governor::GovernorLayer> {
    use tower_governor::governor::GovernorConfigBuilder;
    use tower_governor::GovernorLayer;

    let rl = state.config.server.rate_limit.as_ref()?;
    let gov_config = GovernorConfigBuilder::default()
        .per_second(rl.requests_per_second)
        .burst_size(rl.burst_size)
        .finish()
        .expect("rate_limit: requests_per_second and burst_size must be > 0");

    tracing::info!(
        requests_per_second = rl.requests_per_second,
        burst_size = rl.burst_size,
        "per-IP rate limiting enabled"
    );

    Some(GovernorLayer {
        config: std::sync::Arc::new(gov_config),
    })
}

/// Build a [`CorsLayer`] from the configured allowed origins. A literal
/// `"*"` allows all origins; anything else is matched exactly.
fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                HeaderValue::from_static("x-hubspot-signature"),
                HeaderValue::from_static("x-hubspot-signature-version"),
                HeaderValue::from_static("x-hubspot-request-timestamp"),
            ]);
    }

    let exact: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(_) => {
                tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(exact))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderValue::from_static("x-hubspot-signature"),
            HeaderValue::from_static("x-hubspot-signature-version"),
            HeaderValue::from_static("x-hubspot-request-timestamp"),
        ])
        .allow_credentials(false)
}
