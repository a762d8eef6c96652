use serde::{Deserialize, Serialize};

use crate::config::TenantCapsConfig;

/// Per-tenant caps. Stored on the `Tenant` record itself so a tenant
/// can have a non-default allotment; falls back to `ActionConfig::default_caps`
/// when absent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TenantCaps {
    pub webhook_timeout_ms: u64,
    pub code_timeout_ms: u64,
    pub max_snippets: u32,
    pub max_secrets: u32,
}

impl From<&TenantCapsConfig> for TenantCaps {
    fn from(c: &TenantCapsConfig) -> Self {
        Self {
            webhook_timeout_ms: c.webhook_timeout_ms,
            code_timeout_ms: c.code_timeout_ms,
            max_snippets: c.max_snippets,
            max_secrets: c.max_secrets,
        }
    }
}

impl TenantCaps {
    /// Effective per-action timeout: `min(input-specified, tenant-cap)`.
    pub fn effective_webhook_timeout_ms(&self, requested_ms: Option<u64>) -> u64 {
        requested_ms
            .map(|r| r.min(self.webhook_timeout_ms))
            .unwrap_or(self.webhook_timeout_ms)
    }

    pub fn effective_code_timeout_ms(&self, requested_ms: Option<u64>) -> u64 {
        requested_ms
            .map(|r| r.min(self.code_timeout_ms))
            .unwrap_or(self.code_timeout_ms)
    }
}
