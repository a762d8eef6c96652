use serde::Serialize;

/// Structured trace events emitted across the action execution core.
///
/// These are logged (never persisted) via [`TraceEvent::emit`], which
/// writes a single JSON-encoded `tracing::info!` line. They exist
/// alongside normal `tracing` spans/fields for the handful of events
/// operators want to grep for without reconstructing them from scattered
/// field names.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ActionDispatched {
        tenant_id: String,
        action_kind: &'static str,
        workflow_id: Option<String>,
    },
    SignatureRejected {
        scheme: &'static str,
        reason: &'static str,
    },
    SsrfRejected {
        reason: String,
    },
    WebhookAttempt {
        attempt_index: u32,
        status_code: Option<u16>,
        duration_ms: u64,
        retried: bool,
    },
    SandboxExecuted {
        execution_status: &'static str,
        duration_ms: u64,
        secrets_resolved: usize,
    },
    ExecutionRecorded {
        execution_id: String,
        status: &'static str,
    },
    UsageUpsertFailed {
        tenant_id: String,
        day: String,
        error: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ax_event");
    }
}
