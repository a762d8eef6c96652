//! Reference implementation of the store interfaces.
//!
//! This is the boundary a real database-backed collaborator sits behind
//! in production; durable entity CRUD is out of scope here, so this
//! gives the core something to run against standalone. The entire table
//! set lives behind a single `tokio::sync::RwLock`, snapshotted to one
//! JSON file on every mutation.
//!
//! Holding one lock across the whole snapshot is what makes
//! [`UsageStore::upsert_usage`] race-free: the read, the
//! `UsageCounter::record` mutation, and the write all happen while the
//! single writer guard is held, so two concurrent executions for the
//! same tenant/day can never interleave a lost update.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use ax_crypto::Ciphertext;
use ax_domain::types::{
    is_valid_secret_name, ExecutionRecord, Secret, Snippet, Tenant, TenantCaps, UsageCounter, UsageDelta,
};

use crate::error::{Result, StoreError};
use crate::traits::{ExecutionStore, SecretStore, SnippetStore, TenantStore, UsageStore};

fn snippet_key(tenant_id: &str, snippet_id: &str) -> String {
    format!("{tenant_id}:{snippet_id}")
}

fn secret_key(tenant_id: &str, name: &str) -> String {
    format!("{tenant_id}:{name}")
}

fn usage_key(tenant_id: &str, day: &str) -> String {
    format!("{tenant_id}:{day}")
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    tenants: HashMap<String, Tenant>,
    snippets: HashMap<String, Snippet>,
    secrets: HashMap<String, Secret>,
    executions: HashMap<String, ExecutionRecord>,
    usage: HashMap<String, UsageCounter>,
    last_activity_writes: HashMap<String, DateTime<Utc>>,
}

pub struct InProcessStore {
    state_dir: PathBuf,
    last_activity_throttle: ChronoDuration,
    inner: RwLock<Snapshot>,
}

impl InProcessStore {
    /// Load a snapshot from `state_dir/store.json` if present, otherwise
    /// start empty. `state_dir` is created if missing.
    pub async fn open(state_dir: PathBuf, last_activity_throttle_secs: i64) -> Result<Arc<Self>> {
        tokio::fs::create_dir_all(&state_dir).await?;
        let snapshot_path = state_dir.join("store.json");
        let snapshot = match tokio::fs::read(&snapshot_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Arc::new(Self {
            state_dir,
            last_activity_throttle: ChronoDuration::seconds(last_activity_throttle_secs),
            inner: RwLock::new(snapshot),
        }))
    }

    /// Seed a tenant directly.
    pub async fn seed_tenant(&self, tenant: Tenant) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard.tenants.insert(tenant.tenant_id.clone(), tenant);
        drop(guard);
        self.flush().await
    }

    async fn flush(&self) -> Result<()> {
        let guard = self.inner.read().await;
        let bytes = serde_json::to_vec_pretty(&*guard)?;
        drop(guard);
        let tmp = self.state_dir.join("store.json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, self.state_dir.join("store.json")).await?;
        Ok(())
    }

    /// TTL sweep for Execution Records and Usage Counters. Intended to
    /// be called periodically by the host process, not on every request.
    pub async fn prune_expired(&self, now: DateTime<Utc>, execution_ttl_days: i64, usage_ttl_days: i64) -> Result<()> {
        let mut guard = self.inner.write().await;
        let execution_cutoff = now - ChronoDuration::days(execution_ttl_days);
        guard.executions.retain(|_, rec| rec.created_at >= execution_cutoff);

        let usage_cutoff_date = (now - ChronoDuration::days(usage_ttl_days)).date_naive();
        guard.usage.retain(|_, counter| {
            chrono::NaiveDate::parse_from_str(&counter.day, "%Y-%m-%d")
                .map(|d| d >= usage_cutoff_date)
                .unwrap_or(true)
        });
        drop(guard);
        self.flush().await
    }
}

#[async_trait]
impl TenantStore for InProcessStore {
    async fn find(&self, tenant_id: &str) -> Option<Tenant> {
        self.inner.read().await.tenants.get(tenant_id).cloned()
    }

    async fn update_tokens(&self, tenant_id: &str, tokens: Ciphertext) -> Result<()> {
        let mut guard = self.inner.write().await;
        let tenant = guard
            .tenants
            .get_mut(tenant_id)
            .ok_or_else(|| StoreError::TenantNotFound(tenant_id.to_string()))?;
        tenant.oauth_tokens_ciphertext = tokens.ciphertext;
        tenant.oauth_tokens_iv = tokens.iv;
        tenant.oauth_tokens_tag = tokens.tag;
        drop(guard);
        self.flush().await
    }

    async fn touch_last_activity(&self, tenant_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut guard = self.inner.write().await;
        if !guard.tenants.contains_key(tenant_id) {
            return Err(StoreError::TenantNotFound(tenant_id.to_string()));
        }
        if let Some(last) = guard.last_activity_writes.get(tenant_id) {
            if now - *last < self.last_activity_throttle {
                return Ok(false);
            }
        }
        guard.last_activity_writes.insert(tenant_id.to_string(), now);
        if let Some(tenant) = guard.tenants.get_mut(tenant_id) {
            tenant.last_activity = Some(now);
        }
        drop(guard);
        self.flush().await?;
        Ok(true)
    }
}

#[async_trait]
impl SnippetStore for InProcessStore {
    async fn get(&self, tenant_id: &str, snippet_id: &str) -> Option<Snippet> {
        self.inner.read().await.snippets.get(&snippet_key(tenant_id, snippet_id)).cloned()
    }

    async fn increment_usage(&self, tenant_id: &str, snippet_id: &str, now: DateTime<Utc>) -> Result<()> {
        let mut guard = self.inner.write().await;
        if let Some(snippet) = guard.snippets.get_mut(&snippet_key(tenant_id, snippet_id)) {
            snippet.execution_count += 1;
            snippet.last_execution = Some(now);
        }
        drop(guard);
        self.flush().await
    }

    async fn create(&self, tenant_id: &str, source: String, caps: &TenantCaps) -> Result<Snippet> {
        let mut guard = self.inner.write().await;
        let current = guard.snippets.values().filter(|s| s.tenant_id == tenant_id).count() as u32;
        if current >= caps.max_snippets {
            return Err(StoreError::SnippetCapExceeded { current, max: caps.max_snippets });
        }
        let snippet = Snippet {
            snippet_id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            source,
            execution_count: 0,
            last_execution: None,
        };
        guard
            .snippets
            .insert(snippet_key(tenant_id, &snippet.snippet_id), snippet.clone());
        drop(guard);
        self.flush().await?;
        Ok(snippet)
    }
}

#[async_trait]
impl SecretStore for InProcessStore {
    async fn list(&self, tenant_id: &str) -> Vec<Secret> {
        self.inner
            .read()
            .await
            .secrets
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    async fn bulk_increment_usage(&self, tenant_id: &str, names: &[String], now: DateTime<Utc>) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let mut guard = self.inner.write().await;
        for name in names {
            if let Some(secret) = guard.secrets.get_mut(&secret_key(tenant_id, name)) {
                secret.usage_count += 1;
                secret.last_used = Some(now);
            }
        }
        drop(guard);
        self.flush().await
    }

    async fn create(&self, tenant_id: &str, name: String, ciphertext: Ciphertext, caps: &TenantCaps) -> Result<Secret> {
        if !is_valid_secret_name(&name) {
            return Err(StoreError::InvalidSecretName(name));
        }
        let mut guard = self.inner.write().await;
        let current = guard.secrets.values().filter(|s| s.tenant_id == tenant_id).count() as u32;
        if current >= caps.max_secrets {
            return Err(StoreError::SecretCapExceeded { current, max: caps.max_secrets });
        }
        let secret = Secret {
            secret_id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name: name.clone(),
            ciphertext: ciphertext.ciphertext,
            iv: ciphertext.iv,
            tag: ciphertext.tag,
            usage_count: 0,
            last_used: None,
        };
        guard.secrets.insert(secret_key(tenant_id, &name), secret.clone());
        drop(guard);
        self.flush().await?;
        Ok(secret)
    }
}

#[async_trait]
impl ExecutionStore for InProcessStore {
    async fn insert_execution(&self, record: ExecutionRecord) -> Result<()> {
        let mut guard = self.inner.write().await;
        // Idempotent per execution-id: a retry of the same insert
        // (e.g. a recorder retry after a transient flush failure) must
        // not produce a second record.
        if guard.executions.contains_key(&record.execution_id) {
            return Ok(());
        }
        guard.executions.insert(record.execution_id.clone(), record);
        drop(guard);
        self.flush().await
    }
}

#[async_trait]
impl UsageStore for InProcessStore {
    async fn upsert_usage(&self, tenant_id: &str, day: &str, delta: &UsageDelta) -> Result<UsageCounter> {
        let mut guard = self.inner.write().await;
        let key = usage_key(tenant_id, day);
        let counter = guard
            .usage
            .entry(key)
            .or_insert_with(|| UsageCounter::new(tenant_id.to_string(), day.to_string()));
        counter.record(delta);
        let snapshot = counter.clone();
        drop(guard);
        self.flush().await?;
        Ok(snapshot)
    }
}
