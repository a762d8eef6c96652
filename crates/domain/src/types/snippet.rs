use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored, named piece of user source code, scoped to a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub snippet_id: String,
    pub tenant_id: String,
    pub source: String,
    pub execution_count: u64,
    pub last_execution: Option<DateTime<Utc>>,
}

/// Source text is capped at 50 KiB.
pub const MAX_SNIPPET_SOURCE_BYTES: usize = 50 * 1024;
