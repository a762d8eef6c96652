//! Process startup: load config and boot secrets, validate, open the
//! store, and assemble the shared [`AppState`].

use std::sync::Arc;

use anyhow::Context;

use ax_domain::config::{BootSecrets, Config};
use ax_store::InProcessStore;

use crate::state::AppState;

pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let boot = BootSecrets::from_env().context("loading boot secrets from the environment")?;

    let store = InProcessStore::open(
        config.store.state_dir.clone(),
        config.store.last_activity_throttle_secs,
    )
    .await
    .context("opening store")?;

    spawn_ttl_pruner(store.clone(), config.store.execution_ttl_days, config.store.usage_ttl_days);

    Ok(AppState {
        config: Arc::new(config),
        boot: Arc::new(boot),
        tenants: store.clone(),
        snippets: store.clone(),
        secrets: store.clone(),
        executions: store.clone(),
        usage: store,
    })
}

/// Prune expired execution records and usage counters on a fixed tick,
/// the same way a hot-path-adjacent background task is run elsewhere.
fn spawn_ttl_pruner(store: Arc<InProcessStore>, execution_ttl_days: i64, usage_ttl_days: i64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            if let Err(e) = store.prune_expired(chrono::Utc::now(), execution_ttl_days, usage_ttl_days).await {
                tracing::warn!(error = %e, "ttl pruning pass failed");
            }
        }
    });
    tracing::info!("ttl pruner started (1h tick)");
}
