use async_trait::async_trait;
use chrono::{DateTime, Utc};

use ax_crypto::Ciphertext;
use ax_domain::types::{ExecutionRecord, Secret, Snippet, Tenant, TenantCaps, UsageCounter, UsageDelta};

use crate::error::Result;

/// Tenant lookup and OAuth token refresh.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find(&self, tenant_id: &str) -> Option<Tenant>;

    async fn update_tokens(&self, tenant_id: &str, tokens: Ciphertext) -> Result<()>;

    /// Throttled: only actually written if `>= 5 minutes` elapsed since
    /// the last write for this tenant, to avoid write amplification
    /// under hot-portal traffic. Returns `true` if the write happened.
    async fn touch_last_activity(&self, tenant_id: &str, now: DateTime<Utc>) -> Result<bool>;
}

/// Stored code snippet lookup, usage tracking, and creation. Creation
/// enforces `max-snippets` against the tenant's caps.
#[async_trait]
pub trait SnippetStore: Send + Sync {
    async fn get(&self, tenant_id: &str, snippet_id: &str) -> Option<Snippet>;

    async fn increment_usage(&self, tenant_id: &str, snippet_id: &str, now: DateTime<Utc>) -> Result<()>;

    async fn create(&self, tenant_id: &str, source: String, caps: &TenantCaps) -> Result<Snippet>;
}

/// Encrypted secret listing and creation. Creation enforces `max-secrets`
/// and the name format against the tenant's caps.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn list(&self, tenant_id: &str) -> Vec<Secret>;

    /// Single bulk write for all secrets resolved by one execution,
    /// rather than one write per secret.
    async fn bulk_increment_usage(&self, tenant_id: &str, names: &[String], now: DateTime<Utc>) -> Result<()>;

    async fn create(&self, tenant_id: &str, name: String, ciphertext: Ciphertext, caps: &TenantCaps) -> Result<Secret>;
}

/// Audit record insertion. Writes are idempotent per `execution-id`:
/// inserting the same id twice is a no-op, not a duplicate record.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn insert_execution(&self, record: ExecutionRecord) -> Result<()>;
}

/// Per-tenant, per-day usage aggregation. The implementation must
/// recompute count/sum/avg/max/workflow-id-set inside one atomic
/// critical section — never read, compute in the caller, then write
/// back, which would race under concurrent executions.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn upsert_usage(&self, tenant_id: &str, day: &str, delta: &UsageDelta) -> Result<UsageCounter>;
}
