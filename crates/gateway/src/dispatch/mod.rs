//! Dispatcher: parses the verified envelope, loads the Tenant,
//! derives the effective per-action deadline, and runs the handler
//! selected by the route's action kind. This is the single place the
//! always-200 `{"outputFields": {...}}` contract is assembled — handler
//! failures are converted to fixed-shape `{prefix}_success`/`{prefix}_error`
//! fields rather than an HTTP error status.

mod code;
mod format;
mod webhook;

use std::time::Instant;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use ax_domain::sanitize::sanitize_error;
use ax_domain::trace::TraceEvent;
use ax_domain::types::{ActionEnvelope, ActionKind, ExecutionStatus, OutputFields, Attempt};

use crate::recorder;
use crate::state::AppState;

/// What one action handler produced, before it is merged into the
/// caller-visible response and written to the Execution Record.
pub struct DispatchOutcome {
    pub output_fields: OutputFields,
    pub execution_status: ExecutionStatus,
    pub error: Option<String>,
    pub attempts: Vec<Attempt>,
    pub request_snapshot: Option<String>,
    pub response_snapshot: Option<String>,
}

impl DispatchOutcome {
    fn user_error(prefix: &str, kind: ActionKind, message: &str) -> Self {
        DispatchOutcome {
            output_fields: fixed_failure_outputs(prefix, kind, message),
            execution_status: ExecutionStatus::Error,
            error: Some(message.to_string()),
            attempts: Vec::new(),
            request_snapshot: None,
            response_snapshot: None,
        }
    }
}

/// Per-action output-field names are fixed; a failure that never
/// reaches the action-specific executor (tenant rejected, bad envelope)
/// still has to produce the right shape for whichever action kind was
/// requested.
fn fixed_failure_outputs(prefix: &str, kind: ActionKind, message: &str) -> OutputFields {
    let mut outputs = OutputFields::new();
    outputs.insert(format!("{prefix}_success"), json!(false));
    outputs.insert(format!("{prefix}_error"), json!(message));
    match kind {
        ActionKind::Webhook => {
            outputs.insert(format!("{prefix}_status_code"), Value::Null);
            outputs.insert(format!("{prefix}_retries_used"), json!(0));
        }
        ActionKind::Code => {}
        ActionKind::Format => {
            outputs.insert("result".into(), Value::Null);
            outputs.insert("result_number".into(), Value::Null);
        }
    }
    outputs
}

/// Coerce one element of an `inputFields.inputs` array into the plain
/// string the template/formula engines substitute for `[[inputN]]`.
pub(crate) fn value_to_input_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub(crate) fn ordered_inputs(input_fields: &Value) -> Vec<String> {
    input_fields
        .get("inputs")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(value_to_input_string).collect())
        .unwrap_or_default()
}

/// A request body that fails to parse as an `ActionEnvelope` never
/// reaches `run`; the caller still owes the fixed-shape response.
pub fn malformed_envelope_response(state: &AppState, action_kind: ActionKind) -> Value {
    let prefix = state.config.action.output_prefix.clone();
    let outputs = fixed_failure_outputs(&prefix, action_kind, "malformed request body");
    json!({ "outputFields": outputs })
}

/// Run the full verify-already-done dispatch pipeline for one inbound
/// action request: tenant load → handler → record.
pub async fn run(state: &AppState, action_kind: ActionKind, envelope: ActionEnvelope) -> Value {
    let tenant_id = envelope.tenant_id();
    let workflow_id = envelope.workflow_id();
    let object_ref = envelope.object_ref();
    let execution_id = Uuid::new_v4().to_string();
    let prefix = state.config.action.output_prefix.clone();
    let started = Instant::now();

    TraceEvent::ActionDispatched {
        tenant_id: tenant_id.clone(),
        action_kind: action_kind.as_str(),
        workflow_id: workflow_id.clone(),
    }
    .emit();

    let tenant = state.tenants.find(&tenant_id).await;
    let outcome = match &tenant {
        None => DispatchOutcome::user_error(&prefix, action_kind, "tenant not found"),
        Some(t) if !t.is_active() => {
            DispatchOutcome::user_error(&prefix, action_kind, "tenant is suspended")
        }
        Some(t) => {
            if let Err(e) = state.tenants.touch_last_activity(&tenant_id, Utc::now()).await {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    error = %sanitize_error(&e.to_string()),
                    "last-activity touch failed (best-effort)"
                );
            }
            match action_kind {
                ActionKind::Webhook => webhook::execute(state, t, &envelope, &prefix).await,
                ActionKind::Code => code::execute(state, t, &envelope, &prefix).await,
                ActionKind::Format => format::execute(state, t, &envelope, &prefix).await,
            }
        }
    };

    let duration_ms = started.elapsed().as_millis() as u64;
    recorder::record(
        state,
        &execution_id,
        &tenant_id,
        action_kind,
        workflow_id,
        object_ref,
        &outcome,
        duration_ms,
    )
    .await;

    json!({ "outputFields": outcome.output_fields })
}
