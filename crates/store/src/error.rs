/// Errors from the store layer. These are internal-failure kind
/// errors: storage failures are logged by the caller (the Execution
/// Recorder, the dispatcher's cap checks) but never surfaced verbatim
/// to the calling workflow.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("tenant {0} not found")]
    TenantNotFound(String),
    #[error("snippet cap exceeded: tenant already has {current}/{max} snippets")]
    SnippetCapExceeded { current: u32, max: u32 },
    #[error("secret cap exceeded: tenant already has {current}/{max} secrets")]
    SecretCapExceeded { current: u32, max: u32 },
    #[error("invalid secret name: {0}")]
    InvalidSecretName(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
