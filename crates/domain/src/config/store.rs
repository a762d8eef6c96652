use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the reference store implementation (`ax-store`) persists its
/// JSON snapshots. In a production deployment this config's collaborator
/// is a real database instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "d_state_dir")]
    pub state_dir: PathBuf,
    /// TTL for Execution Records, in days.
    #[serde(default = "d_execution_ttl_days")]
    pub execution_ttl_days: i64,
    /// TTL for Usage Counters, in days.
    #[serde(default = "d_usage_ttl_days")]
    pub usage_ttl_days: i64,
    /// Minimum interval between `last-activity` writes on a Tenant.
    #[serde(default = "d_last_activity_throttle_secs")]
    pub last_activity_throttle_secs: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            state_dir: d_state_dir(),
            execution_ttl_days: d_execution_ttl_days(),
            usage_ttl_days: d_usage_ttl_days(),
            last_activity_throttle_secs: d_last_activity_throttle_secs(),
        }
    }
}

fn d_state_dir() -> PathBuf {
    PathBuf::from("./state")
}
fn d_execution_ttl_days() -> i64 {
    30
}
fn d_usage_ttl_days() -> i64 {
    90
}
fn d_last_activity_throttle_secs() -> i64 {
    300
}
