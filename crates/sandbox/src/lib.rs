//! Code Executor sandbox: an isolated, allow-listed JS evaluator
//! run in a dedicated OS worker, the secret-reference pre-scan that
//! limits decryption to secrets the source actually names, and the
//! result-shaping rule that turns a return value into `output_N` fields.

pub mod result;
pub mod scan;
pub mod worker;

pub use result::shape_output;
pub use scan::referenced_secret_names;
pub use worker::{run_job, SandboxJob, SandboxOutcome};
