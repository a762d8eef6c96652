//! Execution Recorder: writes one audit record per dispatch and
//! folds the same execution into its tenant/day usage counter. Both
//! writes are best-effort — a storage failure here must never turn into
//! a failed response for an action that actually ran.

use chrono::Utc;

use ax_domain::sanitize::sanitize_error;
use ax_domain::trace::TraceEvent;
use ax_domain::types::{ActionKind, ExecutionRecord, ExecutionStatus, UsageDelta};

use crate::dispatch::DispatchOutcome;
use crate::state::AppState;

fn status_str(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Success => "success",
        ExecutionStatus::Error => "error",
        ExecutionStatus::Timeout => "timeout",
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn record(
    state: &AppState,
    execution_id: &str,
    tenant_id: &str,
    action_kind: ActionKind,
    workflow_id: Option<String>,
    object_ref: String,
    outcome: &DispatchOutcome,
    duration_ms: u64,
) {
    let now = Utc::now();

    let record = ExecutionRecord {
        execution_id: execution_id.to_string(),
        tenant_id: tenant_id.to_string(),
        action_kind,
        workflow_id: workflow_id.clone(),
        object_ref,
        status: outcome.execution_status,
        duration_ms,
        request_snapshot: outcome.request_snapshot.clone(),
        response_snapshot: outcome.response_snapshot.clone(),
        attempts: outcome.attempts.clone(),
        error: outcome.error.clone(),
        created_at: now,
    };

    if let Err(e) = state.executions.insert_execution(record).await {
        tracing::error!(
            execution_id = %execution_id,
            error = %sanitize_error(&e.to_string()),
            "execution record insert failed (best-effort)"
        );
    } else {
        TraceEvent::ExecutionRecorded {
            execution_id: execution_id.to_string(),
            status: status_str(outcome.execution_status),
        }
        .emit();
    }

    let day = now.format("%Y-%m-%d").to_string();
    let delta = UsageDelta {
        kind: action_kind,
        status: status_str(outcome.execution_status).to_string(),
        duration_ms,
        workflow_id,
    };
    if let Err(e) = state.usage.upsert_usage(tenant_id, &day, &delta).await {
        TraceEvent::UsageUpsertFailed {
            tenant_id: tenant_id.to_string(),
            day,
            error: sanitize_error(&e.to_string()),
        }
        .emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use ax_domain::types::OutputFields;

    fn success_outcome() -> DispatchOutcome {
        DispatchOutcome {
            output_fields: OutputFields::new(),
            execution_status: ExecutionStatus::Success,
            error: None,
            attempts: Vec::new(),
            request_snapshot: Some("req".into()),
            response_snapshot: Some("resp".into()),
        }
    }

    #[tokio::test]
    async fn records_execution_and_upserts_usage() {
        let state = test_state().await;
        record(
            &state,
            "exec-1",
            "1",
            ActionKind::Webhook,
            Some("wf-1".into()),
            "contact:42".into(),
            &success_outcome(),
            12,
        )
        .await;

        let day = Utc::now().format("%Y-%m-%d").to_string();
        let counter = state
            .usage
            .upsert_usage(
                "1",
                &day,
                &UsageDelta {
                    kind: ActionKind::Webhook,
                    status: "success".into(),
                    duration_ms: 0,
                    workflow_id: None,
                },
            )
            .await
            .expect("usage upsert");
        assert_eq!(counter.count_by_kind.get("webhook"), Some(&2));
    }

    #[tokio::test]
    async fn inserting_the_same_execution_id_twice_is_idempotent() {
        let state = test_state().await;
        for _ in 0..2 {
            record(
                &state,
                "exec-dup",
                "1",
                ActionKind::Format,
                None,
                "deal:1".into(),
                &success_outcome(),
                5,
            )
            .await;
        }
    }
}
