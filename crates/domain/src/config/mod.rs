mod action;
mod boot;
mod formula;
mod sandbox;
mod server;
mod store;
mod webhook;

pub use action::*;
pub use boot::*;
pub use formula::*;
pub use sandbox::*;
pub use server::*;
pub use store::*;
pub use webhook::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config (non-secret, file-backed)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub action: ActionConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub formula: FormulaConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the non-secret configuration and return a list of issues.
    /// Boot secrets are validated separately by
    /// [`BootSecrets::from_env`] since their absence is a distinct failure
    /// mode (missing env var vs. malformed TOML).
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }
        if self.action.output_prefix.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "action.output_prefix".into(),
                message: "output_prefix must not be empty".into(),
            });
        }
        if self.webhook.multiplier <= 1.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "webhook.multiplier".into(),
                message: "multiplier <= 1.0 makes backoff non-increasing".into(),
            });
        }
        if self.webhook.max_delay_ms < self.webhook.initial_delay_ms {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "webhook.max_delay_ms".into(),
                message: "max_delay_ms is smaller than initial_delay_ms".into(),
            });
        }
        if self.webhook.attempt_timeout_ms > 30_000 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "webhook.attempt_timeout_ms".into(),
                message: "exceeds the documented 30s outbound ceiling".into(),
            });
        }
        if self.sandbox.max_output_fields == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sandbox.max_output_fields".into(),
                message: "must allow at least one output field".into(),
            });
        }
        if self.formula.max_iterations == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "formula.max_iterations".into(),
                message: "must be > 0 or reduction can never converge".into(),
            });
        }

        errors
    }
}
