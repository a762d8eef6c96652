//! Webhook Executor dispatch glue: parses the action's
//! `inputFields` into a `WebhookSpec`, substitutes placeholders against
//! the triggering object's properties and the numbered `inputs`, and
//! hands the rest to `ax_webhook::execute` (SSRF guard, retry engine,
//! response shaping).

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{json, Value};

use ax_domain::types::{ActionEnvelope, ExecutionStatus, OutputFields, Tenant};
use ax_template::TemplateContext;
use ax_webhook::{HttpMethod, RetryPolicy, WebhookSpec};

use crate::dispatch::{ordered_inputs, value_to_input_string, DispatchOutcome};
use crate::state::AppState;

pub async fn execute(
    state: &AppState,
    tenant: &Tenant,
    envelope: &ActionEnvelope,
    prefix: &str,
) -> DispatchOutcome {
    let input_fields = &envelope.input_fields;

    let spec = match parse_spec(input_fields) {
        Ok(spec) => spec,
        Err(message) => return validation_failure(prefix, &message),
    };

    let inputs = ordered_inputs(input_fields);
    let ctx = TemplateContext {
        properties: &envelope.object.properties,
        inputs: &inputs,
    };

    let requested_ms = input_fields.get("timeout_ms").and_then(Value::as_u64);
    let deadline_ms = tenant.caps.effective_webhook_timeout_ms(requested_ms);
    let policy = RetryPolicy::from(&state.config.webhook);

    let outcome = ax_webhook::execute(
        &spec,
        &ctx,
        &policy,
        &state.config.webhook.user_agent,
        state.config.webhook.audit_snapshot_bytes,
        state.config.webhook.output_snapshot_bytes,
        state.config.webhook.max_response_bytes,
        Duration::from_millis(deadline_ms),
    )
    .await;

    let mut outputs = OutputFields::new();
    outputs.insert(format!("{prefix}_success"), json!(outcome.success));
    outputs.insert(
        format!("{prefix}_status_code"),
        outcome.status_code.map(|c| json!(c)).unwrap_or(Value::Null),
    );
    outputs.insert(format!("{prefix}_retries_used"), json!(outcome.retries_used));
    outputs.insert(
        format!("{prefix}_error"),
        outcome.error.clone().map(Value::String).unwrap_or(Value::Null),
    );

    let execution_status = if outcome.success {
        ExecutionStatus::Success
    } else if outcome.error.as_deref().map(|e| e.contains("deadline")).unwrap_or(false) {
        ExecutionStatus::Timeout
    } else {
        ExecutionStatus::Error
    };

    DispatchOutcome {
        output_fields: outputs,
        execution_status,
        error: outcome.error,
        attempts: outcome.attempts,
        request_snapshot: Some(outcome.request_snapshot),
        response_snapshot: outcome.response_snapshot,
    }
}

fn validation_failure(prefix: &str, message: &str) -> DispatchOutcome {
    let mut outputs = OutputFields::new();
    outputs.insert(format!("{prefix}_success"), json!(false));
    outputs.insert(format!("{prefix}_status_code"), Value::Null);
    outputs.insert(format!("{prefix}_retries_used"), json!(0));
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

fn parse_spec(input_fields: &Value) -> Result<WebhookSpec, String> {
    let url_template = input_fields
        .get("url")
        .or_else(|| input_fields.get("webhookUrl"))
        .and_then(Value::as_str)
        .ok_or("missing webhook url")?
        .to_string();

    let method_raw = input_fields.get("method").and_then(Value::as_str).unwrap_or("POST");
    let method = HttpMethod::parse(method_raw).ok_or_else(|| format!("unsupported method: {method_raw}"))?;

    let mut headers_template = BTreeMap::new();
    if let Some(Value::Object(map)) = input_fields.get("headers") {
        for (k, v) in map {
            headers_template.insert(k.clone(), value_to_input_string(v));
        }
    }

    let body_template = input_fields.get("body").cloned();
    let retry_on_failure = input_fields.get("retry_on_failure").and_then(Value::as_bool).unwrap_or(false);
    let max_retries = input_fields.get("max_retries").and_then(Value::as_u64).map(|n| n as u32);
    let initial_delay_ms = input_fields.get("initial_delay_ms").and_then(Value::as_u64);
    let max_delay_ms = input_fields.get("max_delay_ms").and_then(Value::as_u64);

    Ok(WebhookSpec {
        method,
        url_template,
        headers_template,
        body_template,
        retry_on_failure,
        max_retries,
        initial_delay_ms,
        max_delay_ms,
    })
}
