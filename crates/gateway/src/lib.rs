//! The Workflow Action Execution Core's HTTP surface: the dispatcher that
//! ties the signature verifier, the three action executors, the secret
//! resolver, and the execution recorder together behind `/v1/actions/*`.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod dispatch;
pub mod recorder;
pub mod secrets;
pub mod state;

pub use state::AppState;
