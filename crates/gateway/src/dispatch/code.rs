//! Code Executor dispatch glue: resolves the snippet source,
//! resolves only the secrets the source textually references, and runs
//! the sandbox worker on a blocking thread (it blocks on
//! `std::sync::mpsc::Receiver::recv_timeout` internally, so it must never
//! run directly on a Tokio worker thread).

use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};

use ax_domain::types::{ActionEnvelope, ExecutionStatus, OutputFields, Tenant, MAX_SNIPPET_SOURCE_BYTES};
use ax_sandbox::{SandboxJob, SandboxOutcome};
use ax_webhook::response::truncate_bytes;

use crate::dispatch::DispatchOutcome;
use crate::secrets::resolve_secrets;
use crate::state::AppState;

pub async fn execute(
    state: &AppState,
    tenant: &Tenant,
    envelope: &ActionEnvelope,
    prefix: &str,
) -> DispatchOutcome {
    let input_fields = &envelope.input_fields;

    let source = match resolve_source(state, &tenant.tenant_id, input_fields).await {
        Ok(source) => source,
        Err(message) => return validation_failure(prefix, &message),
    };
    if source.len() > MAX_SNIPPET_SOURCE_BYTES {
        return validation_failure(prefix, "snippet source exceeds the 50 KiB limit");
    }

    let (secrets_value, used_secret_names) = resolve_secrets(
        state.secrets.as_ref(),
        &state.boot.encryption_key,
        &tenant.tenant_id,
        &source,
    )
    .await;
    if !used_secret_names.is_empty() {
        if let Err(e) = state
            .secrets
            .bulk_increment_usage(&tenant.tenant_id, &used_secret_names, Utc::now())
            .await
        {
            tracing::warn!(error = %e, "secret usage counter update failed (best-effort)");
        }
    }

    let inputs_value = input_fields.get("inputs").cloned().unwrap_or_else(|| json!({}));
    let requested_ms = input_fields.get("timeout_ms").and_then(Value::as_u64);
    let deadline_ms = tenant.caps.effective_code_timeout_ms(requested_ms);

    let job = SandboxJob {
        source,
        inputs: inputs_value,
        secrets: secrets_value,
        context: envelope.context.clone(),
        deadline: Duration::from_millis(deadline_ms),
    };
    let sandbox_cfg = state.config.sandbox.clone();

    let outcome = match tokio::task::spawn_blocking(move || ax_sandbox::run_job(job, &sandbox_cfg)).await {
        Ok(outcome) => outcome,
        Err(_) => SandboxOutcome {
            status: ExecutionStatus::Error,
            outputs: Default::default(),
            console_lines: Vec::new(),
            error: Some("sandbox worker task panicked".to_string()),
        },
    };

    shape(prefix, &source_snapshot(&outcome), outcome)
}

fn source_snapshot(outcome: &SandboxOutcome) -> String {
    truncate_bytes(&format!("console_lines={}", outcome.console_lines.len()), 10 * 1024)
}

fn shape(prefix: &str, snapshot: &str, outcome: SandboxOutcome) -> DispatchOutcome {
    let success = outcome.status == ExecutionStatus::Success;
    let mut outputs = OutputFields::new();
    outputs.insert(format!("{prefix}_success"), json!(success));
    outputs.insert(
        format!("{prefix}_error"),
        outcome.error.clone().map(Value::String).unwrap_or(Value::Null),
    );
    for (name, value) in &outcome.outputs {
        outputs.insert(name.clone(), json!(value));
    }

    DispatchOutcome {
        output_fields: outputs,
        execution_status: outcome.status,
        error: outcome.error,
        attempts: Vec::new(),
        request_snapshot: Some(snapshot.to_string()),
        response_snapshot: None,
    }
}

fn validation_failure(prefix: &str, message: &str) -> DispatchOutcome {
    let mut outputs = OutputFields::new();
    outputs.insert(format!("{prefix}_success"), json!(false));
    outputs.insert(format!("{prefix}_error"), json!(message));
    DispatchOutcome {
        output_fields: outputs,
        execution_status: ExecutionStatus::Error,
        error: Some(message.to_string()),
        attempts: Vec::new(),
        request_snapshot: None,
        response_snapshot: None,
    }
}

/// A code action's source comes either from a stored snippet (looked up
/// by id, which also increments its usage counter) or an inline
/// `source` string for ad-hoc, unsaved scripts.
async fn resolve_source(state: &AppState, tenant_id: &str, input_fields: &Value) -> Result<String, String> {
    if let Some(snippet_id) = input_fields.get("snippetId").and_then(Value::as_str) {
        let snippet = state
            .snippets
            .get(tenant_id, snippet_id)
            .await
            .ok_or("snippet not found")?;
        if let Err(e) = state.snippets.increment_usage(tenant_id, snippet_id, Utc::now()).await {
            tracing::warn!(error = %e, "snippet usage counter update failed (best-effort)");
        }
        Ok(snippet.source)
    } else if let Some(source) = input_fields.get("source").and_then(Value::as_str) {
        Ok(source.to_string())
    } else {
        Err("missing snippetId or source".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use ax_domain::types::{Origin, TenantCaps, TenantStatus};

    fn envelope(input_fields: Value) -> ActionEnvelope {
        ActionEnvelope {
            callback_id: "cb1".into(),
            origin: Origin { portal_id: 1 },
            context: json!({}),
            object: Default::default(),
            input_fields,
        }
    }

    fn caps() -> TenantCaps {
        TenantCaps {
            webhook_timeout_ms: 30_000,
            code_timeout_ms: 10_000,
            max_snippets: 50,
            max_secrets: 50,
        }
    }

    fn tenant() -> Tenant {
        Tenant {
            tenant_id: "1".into(),
            status: TenantStatus::Active,
            oauth_tokens_ciphertext: Vec::new(),
            oauth_tokens_iv: Vec::new(),
            oauth_tokens_tag: Vec::new(),
            caps: caps(),
            last_activity: None,
        }
    }

    #[tokio::test]
    async fn inline_source_returns_shaped_output() {
        let state = test_state().await;
        let env = envelope(json!({ "source": "return 2 + 2;" }));
        let outcome = execute(&state, &tenant(), &env, "action").await;
        assert_eq!(outcome.execution_status, ExecutionStatus::Success);
        assert_eq!(outcome.output_fields.get("output_1"), Some(&json!("4")));
    }

    #[tokio::test]
    async fn stored_snippet_is_looked_up_by_id() {
        let state = test_state().await;
        let snippet = state
            .snippets
            .create("1", "return inputs.x;".to_string(), &caps())
            .await
            .expect("create snippet");
        let env = envelope(json!({ "snippetId": snippet.snippet_id, "inputs": {"x": "hi"} }));
        let outcome = execute(&state, &tenant(), &env, "action").await;
        assert_eq!(outcome.execution_status, ExecutionStatus::Success);
        assert_eq!(outcome.output_fields.get("output_1"), Some(&json!("hi")));
    }

    #[tokio::test]
    async fn missing_snippet_and_source_is_a_validation_failure() {
        let state = test_state().await;
        let env = envelope(json!({}));
        let outcome = execute(&state, &tenant(), &env, "action").await;
        assert_eq!(outcome.execution_status, ExecutionStatus::Error);
        assert_eq!(outcome.output_fields.get("action_success"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn oversize_source_is_rejected_before_running() {
        let state = test_state().await;
        let env = envelope(json!({ "source": "a".repeat(MAX_SNIPPET_SOURCE_BYTES + 1) }));
        let outcome = execute(&state, &tenant(), &env, "action").await;
        assert_eq!(outcome.execution_status, ExecutionStatus::Error);
        assert_eq!(
            outcome.output_fields.get("action_error"),
            Some(&json!("snippet source exceeds the 50 KiB limit"))
        );
    }
}
