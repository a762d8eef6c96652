use serde::{Deserialize, Serialize};

/// Code Executor sandbox limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Extra grace period added on top of the request deadline before the
    /// host forcibly terminates the worker thread.
    #[serde(default = "d_deadline_grace_ms")]
    pub deadline_grace_ms: u64,
    /// Loop-iteration ceiling enforced by the in-worker watchdog
    /// (`boa_engine::context::RuntimeLimits::loop_iteration_limit`).
    #[serde(default = "d_loop_iteration_limit")]
    pub loop_iteration_limit: u64,
    /// Recursion depth ceiling for the sandbox evaluator.
    #[serde(default = "d_recursion_limit")]
    pub recursion_limit: usize,
    /// Console line cap.
    #[serde(default = "d_console_line_cap")]
    pub console_line_cap: usize,
    /// Max named `output` values taken from a returned object.
    #[serde(default = "d_max_output_fields")]
    pub max_output_fields: usize,
    /// Byte ceiling on any single string/array-growing operation inside
    /// the sandbox (`String.prototype.repeat`/`padStart`/`padEnd`,
    /// `new Array(n)`). The engine itself exposes no heap-size hook, so
    /// this is enforced at the harness boundary rather than inside
    /// `boa_engine`'s allocator.
    #[serde(default = "d_memory_limit_bytes")]
    pub memory_limit_bytes: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            deadline_grace_ms: d_deadline_grace_ms(),
            loop_iteration_limit: d_loop_iteration_limit(),
            recursion_limit: d_recursion_limit(),
            console_line_cap: d_console_line_cap(),
            max_output_fields: d_max_output_fields(),
            memory_limit_bytes: d_memory_limit_bytes(),
        }
    }
}

fn d_deadline_grace_ms() -> u64 {
    500
}
fn d_loop_iteration_limit() -> u64 {
    5_000_000
}
fn d_recursion_limit() -> usize {
    256
}
fn d_console_line_cap() -> usize {
    100
}
fn d_max_output_fields() -> usize {
    5
}
fn d_memory_limit_bytes() -> u64 {
    16 * 1024 * 1024
}
