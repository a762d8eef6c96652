//! Reference implementations of the store interfaces the core depends
//! on but does not own: Tenant, Snippet, and Secret CRUD belongs to a
//! portal that sits outside this core; this crate gives the core
//! something to run against in a standalone binary and in tests.

pub mod error;
pub mod in_process;
pub mod traits;

pub use error::{Result, StoreError};
pub use in_process::InProcessStore;
pub use traits::{ExecutionStore, SecretStore, SnippetStore, TenantStore, UsageStore};
