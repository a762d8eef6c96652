//! Boots a real `AppState` behind a real `TcpListener` and exercises the
//! three `/v1/actions/*` routes plus `/v1/health` over actual HTTP, the
//! way `node-sdk`'s protocol loop test drives a real socket rather than
//! calling handlers directly.

use std::sync::Arc;

use ax_domain::config::{BootSecrets, Config};
use ax_domain::types::{Tenant, TenantCaps, TenantStatus};
use ax_gateway::api;
use ax_gateway::state::AppState;
use ax_store::InProcessStore;
use serde_json::{json, Value};

fn set_boot_env() {
    std::env::set_var("DATABASE_URL", "postgres://localhost/test");
    std::env::set_var("OAUTH_CLIENT_ID", "test-client");
    std::env::set_var("OAUTH_CLIENT_SECRET", "test-secret");
    std::env::set_var("JWT_SIGNING_SECRET", "test-jwt-secret");
    std::env::set_var("PUBLIC_BASE_URL", "https://example.test");
    std::env::set_var("ENCRYPTION_KEY", "11".repeat(32));
}

fn tenant() -> Tenant {
    Tenant {
        tenant_id: "1".into(),
        status: TenantStatus::Active,
        oauth_tokens_ciphertext: Vec::new(),
        oauth_tokens_iv: Vec::new(),
        oauth_tokens_tag: Vec::new(),
        caps: TenantCaps {
            webhook_timeout_ms: 5_000,
            code_timeout_ms: 5_000,
            max_snippets: 50,
            max_secrets: 50,
        },
        last_activity: None,
    }
}

/// Boots the full router on an ephemeral port and returns its base URL.
/// The dev signature bypass is enabled so tests can exercise dispatch
/// without hand-rolling an HMAC signature for every request.
async fn spawn_server() -> String {
    set_boot_env();

    let mut config = Config::default();
    config.server.allow_dev_signature_bypass = true;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = InProcessStore::open(dir.path().to_path_buf(), 300)
        .await
        .expect("open store");
    std::mem::forget(dir);
    store.seed_tenant(tenant()).await.expect("seed tenant");

    let state = AppState {
        config: Arc::new(config),
        boot: Arc::new(BootSecrets::from_env().expect("boot secrets from test env")),
        tenants: store.clone(),
        snippets: store.clone(),
        secrets: store.clone(),
        executions: store.clone(),
        usage: store,
    };

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    format!("http://{addr}")
}

async fn post_action(base: &str, path: &str, envelope: Value) -> Value {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base}{path}"))
        .header("X-Hubspot-Signature-Version", "dev")
        .json(&envelope)
        .send()
        .await
        .expect("request sent");
    assert_eq!(response.status().as_u16(), 200);
    response.json::<Value>().await.expect("json body")
}

fn envelope(input_fields: Value) -> Value {
    json!({
        "callbackId": "cb1",
        "origin": { "portalId": 1 },
        "context": {},
        "object": { "objectType": "contact", "objectId": "42", "properties": {} },
        "inputFields": input_fields,
    })
}

#[tokio::test]
async fn health_route_reports_ok() {
    let base = spawn_server().await;
    let response = reqwest::get(format!("{base}/v1/health")).await.expect("health request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn format_route_evaluates_a_formula_end_to_end() {
    let base = spawn_server().await;
    let body = post_action(
        &base,
        "/v1/actions/format",
        envelope(json!({ "formula": "2+3" })),
    )
    .await;
    assert_eq!(body["outputFields"]["result"], json!("5"));
    assert_eq!(body["outputFields"]["result_number"], json!(5.0));
}

#[tokio::test]
async fn code_route_runs_a_snippet_end_to_end() {
    let base = spawn_server().await;
    let body = post_action(
        &base,
        "/v1/actions/code",
        envelope(json!({ "source": "return 2 + 2;" })),
    )
    .await;
    assert_eq!(body["outputFields"]["action_success"], json!(true));
    assert_eq!(body["outputFields"]["output_1"], json!("4"));
}

#[tokio::test]
async fn webhook_route_rejects_a_loopback_target_end_to_end() {
    let base = spawn_server().await;
    let body = post_action(
        &base,
        "/v1/actions/webhook",
        envelope(json!({ "url": "http://127.0.0.1:1/", "method": "GET" })),
    )
    .await;
    assert_eq!(body["outputFields"]["action_success"], json!(false));
    assert!(body["outputFields"]["action_error"]
        .as_str()
        .unwrap_or_default()
        .contains("blocked"));
}

#[tokio::test]
async fn unknown_tenant_gets_a_fixed_shape_failure_not_an_http_error() {
    let base = spawn_server().await;
    let mut env = envelope(json!({ "formula": "1+1" }));
    env["origin"]["portalId"] = json!(999);
    let body = post_action(&base, "/v1/actions/format", env).await;
    assert_eq!(body["outputFields"]["action_success"], json!(false));
    assert_eq!(body["outputFields"]["action_error"], json!("tenant not found"));
}
