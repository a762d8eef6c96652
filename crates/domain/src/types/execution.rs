use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ActionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Error,
    Timeout,
}

/// A single outbound HTTP attempt, recorded by the Retry Engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub attempt_index: u32,
    pub status: ExecutionStatus,
    pub status_code: Option<u16>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// One audit record per dispatch. Writes are
/// idempotent per `execution_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub execution_id: String,
    pub tenant_id: String,
    pub action_kind: ActionKind,
    pub workflow_id: Option<String>,
    pub object_ref: String,
    pub status: ExecutionStatus,
    pub duration_ms: u64,
    /// Truncated, redacted request snapshot (never raw secret material).
    pub request_snapshot: Option<String>,
    pub response_snapshot: Option<String>,
    pub attempts: Vec<Attempt>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}
