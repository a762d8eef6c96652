use serde::{Deserialize, Serialize};

/// Retry engine defaults. Per-request overrides come from
/// `inputFields`; these are the fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
    #[serde(default = "d_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "d_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "d_multiplier")]
    pub multiplier: f64,
    /// Hard per-attempt HTTP timeout ceiling.
    #[serde(default = "d_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Response body capture cap before truncation.
    #[serde(default = "d_max_response_bytes")]
    pub max_response_bytes: usize,
    #[serde(default = "d_audit_snapshot_bytes")]
    pub audit_snapshot_bytes: usize,
    #[serde(default = "d_output_snapshot_bytes")]
    pub output_snapshot_bytes: usize,
    #[serde(default = "d_user_agent")]
    pub user_agent: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            max_retries: d_max_retries(),
            initial_delay_ms: d_initial_delay_ms(),
            max_delay_ms: d_max_delay_ms(),
            multiplier: d_multiplier(),
            attempt_timeout_ms: d_attempt_timeout_ms(),
            max_response_bytes: d_max_response_bytes(),
            audit_snapshot_bytes: d_audit_snapshot_bytes(),
            output_snapshot_bytes: d_output_snapshot_bytes(),
            user_agent: d_user_agent(),
        }
    }
}

fn d_max_retries() -> u32 {
    3
}
fn d_initial_delay_ms() -> u64 {
    1_000
}
fn d_max_delay_ms() -> u64 {
    10_000
}
fn d_multiplier() -> f64 {
    2.0
}
fn d_attempt_timeout_ms() -> u64 {
    30_000
}
fn d_max_response_bytes() -> usize {
    100 * 1024
}
fn d_audit_snapshot_bytes() -> usize {
    10 * 1024
}
fn d_output_snapshot_bytes() -> usize {
    500
}
fn d_user_agent() -> String {
    "action-execution-core/1.0".into()
}
