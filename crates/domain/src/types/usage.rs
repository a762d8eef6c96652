use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::ActionKind;

/// JSON map keys must be strings; action kinds are keyed by their
/// lowercase name (`ActionKind::as_str`).

/// `(tenant-id, yyyy-mm-dd)` keyed aggregate.
///
/// All derived fields (`avg_duration_ms`, `unique_workflow_count`) are
/// recomputed from the running totals inside the same atomic update that
/// applies a delta — see `ax_store::usage::UsageStore::apply_delta` — so
/// there is no read-modify-write window in which two concurrent
/// executions for the same tenant/day can race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageCounter {
    pub tenant_id: String,
    pub day: String,
    pub count_by_kind: HashMap<String, u64>,
    pub count_by_status: HashMap<String, u64>,
    pub total_duration_ms: u64,
    pub max_duration_ms: u64,
    pub workflow_ids: HashSet<String>,
}

impl UsageCounter {
    pub fn new(tenant_id: String, day: String) -> Self {
        Self {
            tenant_id,
            day,
            count_by_kind: HashMap::new(),
            count_by_status: HashMap::new(),
            total_duration_ms: 0,
            max_duration_ms: 0,
            workflow_ids: HashSet::new(),
        }
    }

    pub fn total_count(&self) -> u64 {
        self.count_by_kind.values().sum()
    }

    pub fn record(&mut self, delta: &UsageDelta) {
        *self
            .count_by_kind
            .entry(delta.kind.as_str().to_string())
            .or_insert(0) += 1;
        *self
            .count_by_status
            .entry(delta.status.clone())
            .or_insert(0) += 1;
        self.total_duration_ms += delta.duration_ms;
        self.max_duration_ms = self.max_duration_ms.max(delta.duration_ms);
        if let Some(wf) = &delta.workflow_id {
            self.workflow_ids.insert(wf.clone());
        }
    }

    pub fn avg_duration_ms(&self) -> f64 {
        let n = self.total_count();
        if n == 0 {
            0.0
        } else {
            self.total_duration_ms as f64 / n as f64
        }
    }
}

/// The delta applied by a single execution to its tenant/day bucket.
#[derive(Debug, Clone)]
pub struct UsageDelta {
    pub kind: ActionKind,
    pub status: String,
    pub duration_ms: u64,
    pub workflow_id: Option<String>,
}
