//! Process-wide, frozen-after-boot state shared across every request:
//! the loaded configuration, boot secrets, and the store handles.
//! Everything else lives per-request.

use std::sync::Arc;

use ax_domain::config::Config;
use ax_domain::config::BootSecrets;
use ax_store::{ExecutionStore, SecretStore, SnippetStore, TenantStore, UsageStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub boot: Arc<BootSecrets>,
    pub tenants: Arc<dyn TenantStore>,
    pub snippets: Arc<dyn SnippetStore>,
    pub secrets: Arc<dyn SecretStore>,
    pub executions: Arc<dyn ExecutionStore>,
    pub usage: Arc<dyn UsageStore>,
}
