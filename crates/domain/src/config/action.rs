use serde::{Deserialize, Serialize};

/// Defaults applied to a [`crate::types::Tenant`] that does not override
/// them, and the per-action knobs that are not tenant-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Opaque output-field prefix. Configurable rather than a hard-coded
    /// constant, since different tenants' workflows expect different
    /// prefixes on the same action kind.
    #[serde(default = "d_prefix")]
    pub output_prefix: String,

    /// Default per-tenant caps, used when a `Tenant` record doesn't carry
    /// its own override.
    #[serde(default)]
    pub default_caps: TenantCapsConfig,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            output_prefix: d_prefix(),
            default_caps: TenantCapsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantCapsConfig {
    #[serde(default = "d_webhook_timeout_ms")]
    pub webhook_timeout_ms: u64,
    #[serde(default = "d_code_timeout_ms")]
    pub code_timeout_ms: u64,
    #[serde(default = "d_max_snippets")]
    pub max_snippets: u32,
    #[serde(default = "d_max_secrets")]
    pub max_secrets: u32,
}

impl Default for TenantCapsConfig {
    fn default() -> Self {
        Self {
            webhook_timeout_ms: d_webhook_timeout_ms(),
            code_timeout_ms: d_code_timeout_ms(),
            max_snippets: d_max_snippets(),
            max_secrets: d_max_secrets(),
        }
    }
}

fn d_prefix() -> String {
    "action".into()
}
fn d_webhook_timeout_ms() -> u64 {
    30_000
}
fn d_code_timeout_ms() -> u64 {
    10_000
}
fn d_max_snippets() -> u32 {
    50
}
fn d_max_secrets() -> u32 {
    50
}
