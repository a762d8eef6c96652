//! Formula Evaluator dispatch glue: substitutes placeholders and
//! reduces the formula string to its final display text; `result_number`
//! is populated whenever that text happens to parse as a number.

use ax_domain::types::{ActionEnvelope, ExecutionStatus, OutputFields, Tenant};
use ax_domain::sanitize::sanitize_error;
use ax_formula::FormulaContext;
use serde_json::{json, Value};

use crate::dispatch::{ordered_inputs, DispatchOutcome};
use crate::state::AppState;

pub async fn execute(
    _state: &AppState,
    _tenant: &Tenant,
    envelope: &ActionEnvelope,
    prefix: &str,
) -> DispatchOutcome {
    let input_fields = &envelope.input_fields;

    let Some(formula) = input_fields.get("formula").and_then(Value::as_str) else {
        return failure(prefix, "missing formula");
    };

    let inputs = ordered_inputs(input_fields);
    let ctx = FormulaContext {
        properties: &envelope.object.properties,
        inputs: &inputs,
    };

    match ax_formula::evaluate(formula, &ctx) {
        Ok(text) => {
            let mut outputs = OutputFields::new();
            outputs.insert(format!("{prefix}_success"), json!(true));
            outputs.insert(format!("{prefix}_error"), Value::Null);
            outputs.insert("result".into(), json!(text));
            outputs.insert(
                "result_number".into(),
                text.parse::<f64>().ok().map(|n| json!(n)).unwrap_or(Value::Null),
            );
            DispatchOutcome {
                output_fields: outputs,
                execution_status: ExecutionStatus::Success,
                error: None,
                attempts: Vec::new(),
                request_snapshot: Some(formula.to_string()),
                response_snapshot: Some(text),
            }
        }
        Err(e) => failure(prefix, &sanitize_error(&e.to_string())),
    }
}

fn failure(prefix: &str, message: &str) -> DispatchOutcome {
    let mut outputs = OutputFields::new();
    outputs.insert(format!("{prefix}_success"), json!(false));
    outputs.insert(format!("{prefix}_error"), json!(message));
    outputs.insert("result".into(), Value::Null);
    outputs.insert("result_number".into(), Value::Null);
    DispatchOutcome {
        output_fields: outputs,
        execution_status: ExecutionStatus::Error,
        error: Some(message.to_string()),
        attempts: Vec::new(),
        request_snapshot: None,
        response_snapshot: None,
    }
}
