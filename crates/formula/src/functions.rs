//! The fixed function set the formula language exposes, plus infix arithmetic.

use crate::value::{format_number, Value};
use crate::FormulaError;

pub const FUNCTION_NAMES: &[&str] = &[
    "concat", "upper", "lower", "trim", "trimall", "capitalize", "substring", "replace", "length",
    "if", "default", "round", "floor", "ceil", "abs",
];

pub fn is_known_function(name: &str) -> bool {
    FUNCTION_NAMES.contains(&name)
}

pub fn call(name: &str, args: Vec<Value>) -> Result<Value, FormulaError> {
    match name {
        "concat" => Ok(Value::Text(args.iter().map(Value::as_text).collect())),
        "upper" => Ok(Value::Text(arg_text(&args, 0)?.to_uppercase())),
        "lower" => Ok(Value::Text(arg_text(&args, 0)?.to_lowercase())),
        "trim" => Ok(Value::Text(arg_text(&args, 0)?.trim().to_string())),
        "trimall" => Ok(Value::Text(
            arg_text(&args, 0)?.chars().filter(|c| !c.is_whitespace()).collect(),
        )),
        "capitalize" => Ok(Value::Text(capitalize(&arg_text(&args, 0)?))),
        "substring" => substring(&args),
        "replace" => {
            let text = arg_text(&args, 0)?;
            let search = arg_text(&args, 1)?;
            let replacement = arg_text(&args, 2)?;
            if search.is_empty() {
                Ok(Value::Text(text))
            } else {
                Ok(Value::Text(text.replace(&search, &replacement)))
            }
        }
        "length" => Ok(Value::Number(arg_text(&args, 0)?.chars().count() as f64)),
        "if" => {
            let cond = args.first().ok_or(FormulaError::WrongArgCount("if"))?;
            let then_branch = args.get(1).cloned().unwrap_or(Value::Text(String::new()));
            let else_branch = args.get(2).cloned().unwrap_or(Value::Text(String::new()));
            Ok(if !cond.is_falsy() { then_branch } else { else_branch })
        }
        "default" => {
            let primary = args.first().ok_or(FormulaError::WrongArgCount("default"))?;
            let fallback = args.get(1).cloned().unwrap_or(Value::Text(String::new()));
            Ok(if primary.as_text().is_empty() { fallback } else { primary.clone() })
        }
        "round" => {
            let value = arg_number(&args, 0)?;
            let decimals = args.get(1).map(Value::as_number).unwrap_or(0.0).max(0.0) as usize;
            if !value.is_finite() {
                Ok(Value::Text(format_number(value)))
            } else {
                Ok(Value::Text(format!("{value:.decimals$}")))
            }
        }
        "floor" => Ok(Value::Number(arg_number(&args, 0)?.floor())),
        "ceil" => Ok(Value::Number(arg_number(&args, 0)?.ceil())),
        "abs" => Ok(Value::Number(arg_number(&args, 0)?.abs())),
        other => Err(FormulaError::UnknownFunction(other.to_string())),
    }
}

fn arg_text(args: &[Value], idx: usize) -> Result<String, FormulaError> {
    Ok(args.get(idx).map(Value::as_text).unwrap_or_default())
}

fn arg_number(args: &[Value], idx: usize) -> Result<f64, FormulaError> {
    Ok(args.get(idx).map(Value::as_number).unwrap_or(f64::NAN))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn substring(args: &[Value]) -> Result<Value, FormulaError> {
    let text = arg_text(args, 0)?;
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let start = args.get(1).map(Value::as_number).unwrap_or(0.0).max(0.0) as usize;
    let start = start.min(len);
    let end = match args.get(2) {
        Some(v) => (v.as_number().max(0.0) as usize).min(len),
        None => len,
    };
    if start >= end {
        return Ok(Value::Text(String::new()));
    }
    Ok(Value::Text(chars[start..end].iter().collect()))
}

pub fn apply_binary_op(op: char, lhs: f64, rhs: f64) -> f64 {
    match op {
        '+' => lhs + rhs,
        '-' => lhs - rhs,
        '*' => lhs * rhs,
        '/' => lhs / rhs,
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn if_selects_then_branch_for_truthy_condition() {
        let result = call(
            "if",
            vec![
                Value::Text("yes".into()),
                Value::Text("a".into()),
                Value::Text("b".into()),
            ],
        )
            .unwrap();
        assert_eq!(result, Value::Text("a".into()));
    }

    #[test]
    fn if_treats_zero_and_false_as_falsy() {
        for falsy in ["0", "false", "null", "undefined", ""] {
            let result = call(
                "if",
                vec![Value::Text(falsy.into()), Value::Text("a".into()), Value::Text("b".into())],
            )
            .unwrap();
            assert_eq!(result, Value::Text("b".into()), "input {falsy:?}");
        }
    }

    #[test]
    fn round_formats_with_fixed_decimals() {
        let result = call("round", vec![Value::Number(11800.0), Value::Number(2.0)]).unwrap();
        assert_eq!(result, Value::Text("11800.00".into()));
    }

    #[test]
    fn substring_clamps_out_of_range_indices() {
        let result = call(
            "substring",
            vec![Value::Text("hello".into()), Value::Number(2.0), Value::Number(999.0)],
        )
            .unwrap();
        assert_eq!(result, Value::Text("llo".into()));
    }

    #[test]
    fn division_by_zero_yields_sentinel() {
        assert!(apply_binary_op('/', 10.0, 0.0).is_infinite());
        assert_eq!(format_number(apply_binary_op('/', 10.0, 0.0)), "NaN");
        assert_eq!(format_number(apply_binary_op('/', 0.0, 0.0)), "NaN");
    }
}
