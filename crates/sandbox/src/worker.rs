//! Sandbox worker.
//!
//! User code runs in a dedicated OS thread, communicating with the host
//! via a single inbound job and a single outbound result sent over a
//! `std::sync::mpsc` channel. The host never shares the `boa_engine::Context`
//! across the thread boundary and enforces a hard wall-clock deadline
//! independent of whatever the in-worker watchdog (`RuntimeLimits`)
//! manages to catch.
//!
//! Rust has no safe way to forcibly kill a running OS thread, so a worker
//! that outlives its deadline is not joined — it is left to either hit its
//! own `loop_iteration_limit`/recursion cap and exit, or to run to
//! completion and quietly drop its result on the floor when the receiver
//! is gone. The host thread does not wait for either outcome; it returns
//! a timeout the moment the deadline elapses and keeps serving other
//! requests — a hostile sandbox action must not take the server down
//! with it.
//!
//! `boa_engine` exposes no heap byte budget of its own, so
//! `SandboxConfig::memory_limit_bytes` is enforced at the harness
//! boundary instead: the single-call allocators a hostile script would
//! actually reach for (`String.prototype.repeat`/`padStart`/`padEnd`,
//! `new Array(n)`) are wrapped to throw once their requested size alone
//! would exceed the budget, rather than relying on the host OOM killer.

use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use ax_domain::config::SandboxConfig;
use ax_domain::sanitize::sanitize_error;
use ax_domain::types::ExecutionStatus;
use serde::Deserialize;
use serde_json::Value;

use crate::result::shape_output;

/// Worker stack size. Large enough for a reasonably deep user call stack
/// before boa's own `recursion_limit` trips; small enough that a fleet of
/// concurrent sandbox workers doesn't blow the host's address space.
const WORKER_STACK_BYTES: usize = 8 * 1024 * 1024;

pub struct SandboxJob {
    pub source: String,
    pub inputs: Value,
    pub secrets: Value,
    pub context: Value,
    /// Deadline for the user code itself, i.e. `deadline-ms` from the job
    /// message. The host adds `SandboxConfig::deadline_grace_ms` on top
    /// before giving up on the worker.
    pub deadline: Duration,
}

#[derive(Debug)]
pub struct SandboxOutcome {
    pub status: ExecutionStatus,
    pub outputs: std::collections::BTreeMap<String, String>,
    pub console_lines: Vec<String>,
    pub error: Option<String>,
}

/// Run `job` to completion, timeout, or worker failure.
pub fn run_job(job: SandboxJob, cfg: &SandboxConfig) -> SandboxOutcome {
    let (tx, rx) = std_mpsc::channel::<SandboxOutcome>();
    let cfg_for_worker = cfg.clone();
    let job_deadline = job.deadline;

    let spawned = thread::Builder::new()
        .name("ax-sandbox-worker".into())
        .stack_size(WORKER_STACK_BYTES)
        .spawn(move || {
            let outcome = execute_in_engine(
                &job.source,
                &job.inputs,
                &job.secrets,
                &job.context,
                &cfg_for_worker,
            );
            // The receiver may already be gone (host timed out and moved
            // on); a failed send here is not an error worth reporting.
            let _ = tx.send(outcome);
        });

    if spawned.is_err() {
        return SandboxOutcome {
            status: ExecutionStatus::Error,
            outputs: Default::default(),
            console_lines: Vec::new(),
            error: Some("failed to spawn sandbox worker thread".to_string()),
        };
    }

    let wait = job_wait_budget(job_deadline, cfg);
    match rx.recv_timeout(wait) {
        Ok(outcome) => outcome,
        Err(std_mpsc::RecvTimeoutError::Timeout) => SandboxOutcome {
            status: ExecutionStatus::Timeout,
            outputs: Default::default(),
            console_lines: Vec::new(),
            error: Some(format!(
                "sandbox execution exceeded its {}ms deadline",
                wait.as_millis()
            )),
        },
        Err(std_mpsc::RecvTimeoutError::Disconnected) => SandboxOutcome {
            status: ExecutionStatus::Error,
            outputs: Default::default(),
            console_lines: Vec::new(),
            error: Some("sandbox worker terminated unexpectedly".to_string()),
        },
    }
}

fn job_wait_budget(job_deadline: Duration, cfg: &SandboxConfig) -> Duration {
    job_deadline + Duration::from_millis(cfg.deadline_grace_ms)
}

fn execute_in_engine(
    source: &str,
    inputs: &Value,
    secrets: &Value,
    context: &Value,
    cfg: &SandboxConfig,
) -> SandboxOutcome {
    use boa_engine::{Context, Source};

    let mut engine = Context::default();
    engine
        .runtime_limits_mut()
        .set_loop_iteration_limit(cfg.loop_iteration_limit);
    engine
        .runtime_limits_mut()
        .set_recursion_limit(cfg.recursion_limit);

    let harness = build_harness(
        source,
        inputs,
        secrets,
        context,
        cfg.console_line_cap,
        cfg.memory_limit_bytes,
    );

    match engine.eval(Source::from_bytes(harness.as_bytes())) {
        Ok(value) => match value.as_string().map(|s| s.to_std_string_escaped()) {
            Some(json_text) => parse_harness_result(&json_text, cfg.max_output_fields),
            None => SandboxOutcome {
                status: ExecutionStatus::Error,
                outputs: Default::default(),
                console_lines: Vec::new(),
                error: Some("sandbox harness did not return a JSON string".to_string()),
            },
        },
        // A script-level error here means the harness itself faulted
        // (e.g. `loop_iteration_limit` tripped) rather than the user's
        // own try/catch inside it — still a contained, non-escaping
        // failure, just one the harness couldn't report through its own
        // JSON envelope.
        Err(err) => SandboxOutcome {
            status: ExecutionStatus::Error,
            outputs: Default::default(),
            console_lines: Vec::new(),
            error: Some(sanitize_error(&err.to_string())),
        },
    }
}

#[derive(Deserialize)]
struct HarnessResult {
    status: String,
    error: Option<String>,
    result: Value,
    logs: Vec<String>,
}

fn parse_harness_result(json_text: &str, max_fields: usize) -> SandboxOutcome {
    match serde_json::from_str::<HarnessResult>(json_text) {
        Ok(hr) => {
            let status = match hr.status.as_str() {
                "success" => ExecutionStatus::Success,
                _ => ExecutionStatus::Error,
            };
            let outputs = if status == ExecutionStatus::Success {
                shape_output(&hr.result, max_fields)
            } else {
                Default::default()
            };
            SandboxOutcome {
                status,
                outputs,
                console_lines: hr.logs,
                error: hr.error.map(|e| sanitize_error(&e)),
            }
        }
        Err(e) => SandboxOutcome {
            status: ExecutionStatus::Error,
            outputs: Default::default(),
            console_lines: Vec::new(),
            error: Some(format!("sandbox harness produced a malformed result: {e}")),
        },
    }
}

/// Build the harness script run inside the engine.
///
/// The user's `source` is never textually concatenated into this
/// template — it is embedded as a JSON string *literal* (escaped by
/// `serde_json`, which is a strict subset of valid JS string-literal
/// escaping) and only ever touches the script as the body argument to a
/// single `new Function(...)` call. The
/// allow-listed globals (`inputs`, `secrets`, `context`, `output`,
/// `console`, `setTimeout`, `clearTimeout`) are passed to that call as
/// explicit parameters rather than relying on lexical scope, so the user
/// function body cannot see anything this harness doesn't hand it.
///
/// `Function.prototype.constructor` is overwritten with `undefined`
/// before the user function ever runs: every intrinsic's `.constructor`
/// (`Promise.resolve().constructor`, `({}).constructor`, ...) ultimately
/// bottoms out at a `Function` instance whose own `.constructor` is
/// inherited from `Function.prototype`, so this single assignment closes
/// both the `this.constructor.constructor(...)` and
/// `Promise.resolve().constructor.constructor(...)` escape patterns at
/// once.
fn build_harness(
    source: &str,
    inputs: &Value,
    secrets: &Value,
    context: &Value,
    console_cap: usize,
    memory_limit_bytes: u64,
) -> String {
    let inputs_lit = js_literal(inputs);
    let secrets_lit = js_literal(secrets);
    let context_lit = js_literal(context);
    let source_lit = js_literal(&Value::String(source.to_string()));

    format!(
        r#"(function() {{
  "use strict";
  Function.prototype.constructor = undefined;

  var __memoryLimitBytes = {memory_limit_bytes};
  (function __installMemoryGuard() {{
    var MemoryLimitError = function(msg) {{ this.message = msg; }};
    MemoryLimitError.prototype = Object.create(Error.prototype);

    var origRepeat = String.prototype.repeat;
    String.prototype.repeat = function(count) {{
      var n = Number(count) || 0;
      if (this.length * n > __memoryLimitBytes) {{
        throw new MemoryLimitError("String.prototype.repeat exceeds the sandbox memory limit");
      }}
      return origRepeat.call(this, count);
    }};

    var origPadStart = String.prototype.padStart;
    String.prototype.padStart = function(targetLength, padString) {{
      if (Number(targetLength) > __memoryLimitBytes) {{
        throw new MemoryLimitError("String.prototype.padStart exceeds the sandbox memory limit");
      }}
      return origPadStart.call(this, targetLength, padString);
    }};

    var origPadEnd = String.prototype.padEnd;
    String.prototype.padEnd = function(targetLength, padString) {{
      if (Number(targetLength) > __memoryLimitBytes) {{
        throw new MemoryLimitError("String.prototype.padEnd exceeds the sandbox memory limit");
      }}
      return origPadEnd.call(this, targetLength, padString);
    }};

    var OrigArray = Array;
    Array = function(arg) {{
      if (arguments.length === 1 && typeof arg === "number" && arg * 8 > __memoryLimitBytes) {{
        throw new MemoryLimitError("Array(n) exceeds the sandbox memory limit");
      }}
      return OrigArray.apply(this, arguments);
    }};
    Array.prototype = OrigArray.prototype;
    Array.isArray = OrigArray.isArray;
    Array.from = OrigArray.from;
    Array.of = OrigArray.of;
  }})();

  function __deepFreeze(o) {{
    if (o && typeof o === "object" && !Object.isFrozen(o)) {{
      Object.freeze(o);
      for (var k in o) {{
        if (Object.prototype.hasOwnProperty.call(o, k)) {{ __deepFreeze(o[k]); }}
      }}
    }}
    return o;
  }}

  var __inputs = __deepFreeze({inputs_lit});
  var __secrets = __deepFreeze({secrets_lit});
  var __context = __deepFreeze({context_lit});
  var output = {{}};

  var __logCap = {console_cap};
  var __logs = [];
  var console = {{
    log: function() {{
      if (__logs.length < __logCap) {{
        var parts = [];
        for (var i = 0; i < arguments.length; i++) {{ parts.push(String(arguments[i])); }}
        __logs.push(parts.join(" "));
      }}
    }}
  }};

  var __timers = [];
  var __timerSeq = 0;
  var setTimeout = function(fn, _delay) {{
    var id = ++__timerSeq;
    __timers.push({{ id: id, fn: fn }});
    return id;
  }};
  var clearTimeout = function(id) {{
    for (var i = 0; i < __timers.length; i++) {{
      if (__timers[i].id === id) {{ __timers.splice(i, 1); break; }}
    }}
  }};

  var __status = "success";
  var __error = null;
  var __result = undefined;
  try {{
    var __userFn = new Function(
      "inputs", "secrets", "context", "output", "console", "setTimeout", "clearTimeout",
      {source_lit}
    );
    var __returned = __userFn(__inputs, __secrets, __context, output, console, setTimeout, clearTimeout);
    while (__timers.length > 0) {{
      var __t = __timers.shift();
      try {{ __t.fn(); }} catch (__te) {{}}
    }}
    __result = (typeof __returned !== "undefined") ? __returned : output;
  }} catch (e) {{
    __status = "error";
    __error = (e && typeof e.message !== "undefined") ? String(e.message) : String(e);
  }}

  return JSON.stringify({{ status: __status, error: __error, result: __result, logs: __logs }});
}})()
"#,
    )
}

/// Serialize `value` the way `JSON.stringify` would, escaping the two
/// code points (U+2028, U+2029) that are valid JSON but were only made
/// legal unescaped inside JS string literals as of ES2019 — escaping
/// them here costs nothing and keeps the harness correct even if the
/// engine's parser predates that change.
fn js_literal(value: &Value) -> String {
    let raw = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    raw.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cfg() -> SandboxConfig {
        SandboxConfig {
            deadline_grace_ms: 2_000,
            loop_iteration_limit: 200_000,
            recursion_limit: 256,
            console_line_cap: 100,
            max_output_fields: 5,
            memory_limit_bytes: 16 * 1024 * 1024,
        }
    }

    fn job(source: &str, inputs: Value) -> SandboxJob {
        SandboxJob {
            source: source.to_string(),
            inputs,
            secrets: json!({}),
            context: json!({}),
            deadline: Duration::from_millis(500),
        }
    }

    #[test]
    fn populates_output_object() {
        let outcome = run_job(
            job("output.n = (inputs.a|0) + (inputs.b|0);", json!({"a": "2", "b": "3"})),
            &cfg(),
        );
        assert_eq!(outcome.status, ExecutionStatus::Success);
        assert_eq!(outcome.outputs.get("output_1"), Some(&"5".to_string()));
    }

    #[test]
    fn explicit_return_of_a_scalar_becomes_output_1() {
        let outcome = run_job(job("return 42;", json!({})), &cfg());
        assert_eq!(outcome.status, ExecutionStatus::Success);
        assert_eq!(outcome.outputs.get("output_1"), Some(&"42".to_string()));
    }

    #[test]
    fn uncaught_throw_is_contained_as_an_error() {
        let outcome = run_job(job("throw new Error('boom');", json!({})), &cfg());
        assert_eq!(outcome.status, ExecutionStatus::Error);
        assert_eq!(outcome.error.as_deref(), Some("boom"));
    }

    #[test]
    fn constructor_escape_is_blocked() {
        let outcome = run_job(
            job("return this.constructor.constructor('return 1')();", json!({})),
            &cfg(),
        );
        assert_eq!(outcome.status, ExecutionStatus::Error);
    }

    #[test]
    fn promise_constructor_chain_escape_is_blocked() {
        let outcome = run_job(
            job("return Promise.resolve().constructor.constructor('return 1')();", json!({})),
            &cfg(),
        );
        assert_eq!(outcome.status, ExecutionStatus::Error);
    }

    #[test]
    fn undeclared_host_globals_are_simply_unavailable() {
        let outcome = run_job(job("return require('fs');", json!({})), &cfg());
        assert_eq!(outcome.status, ExecutionStatus::Error);
    }

    #[test]
    fn infinite_loop_is_bounded_by_the_loop_iteration_limit() {
        let mut limited = cfg();
        limited.loop_iteration_limit = 10_000;
        let outcome = run_job(job("while (true) {}", json!({})), &limited);
        assert_ne!(outcome.status, ExecutionStatus::Success);
    }

    #[test]
    fn console_log_lines_are_captured_up_to_the_cap() {
        let mut limited = cfg();
        limited.console_line_cap = 2;
        let outcome = run_job(
            job("console.log('a'); console.log('b'); console.log('c'); output.done = true;", json!({})),
            &limited,
        );
        assert_eq!(outcome.console_lines.len(), 2);
    }

    #[test]
    fn secrets_are_visible_only_when_passed_in() {
        let mut j = job("output.v = secrets.API_KEY;", json!({}));
        j.secrets = json!({"API_KEY": "shh"});
        let outcome = run_job(j, &cfg());
        assert_eq!(outcome.outputs.get("output_1"), Some(&"shh".to_string()));
    }

    #[test]
    fn allocating_a_gigabyte_string_is_killed_by_the_memory_limiter() {
        let mut limited = cfg();
        limited.memory_limit_bytes = 1_000_000;
        let outcome = run_job(job("return 'a'.repeat(1000000000);", json!({})), &limited);
        assert_eq!(outcome.status, ExecutionStatus::Error);
        assert!(outcome
            .error
            .as_deref()
            .unwrap_or("")
            .contains("memory limit"));
    }

    #[test]
    fn oversized_array_allocation_is_rejected() {
        let mut limited = cfg();
        limited.memory_limit_bytes = 1_000_000;
        let outcome = run_job(job("return new Array(1000000000);", json!({})), &limited);
        assert_eq!(outcome.status, ExecutionStatus::Error);
    }

    #[test]
    fn modest_string_growth_stays_within_the_default_budget() {
        let outcome = run_job(job("return 'ab'.repeat(1000);", json!({})), &cfg());
        assert_eq!(outcome.status, ExecutionStatus::Success);
        assert_eq!(outcome.outputs.get("output_1").map(|s| s.len()), Some(2000));
    }
}
