//! Formula Evaluator — a pure string/number transformation DSL.
//!
//! Placeholders are substituted first, then the expression is reduced
//! via a depth-capped descent (see [`parser`] for why this realizes the
//! "innermost-first, iteration-capped" semantics). The evaluator never
//! runs host code, so it carries none of the sandbox's isolation
//! machinery — its output is still untrusted string data, handled the
//! same as any other user-controlled text downstream.

mod functions;
mod lexer;
mod parser;
mod value;

pub use value::Value;

use lexer::{LexError, OPAQUE_CLOSE, OPAQUE_OPEN};
use serde_json::Value as Json;

pub const MAX_FORMULA_CHARS: usize = 5_000;
pub const MAX_INPUT_CHARS: usize = 10_000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormulaError {
    #[error("formula exceeds {MAX_FORMULA_CHARS} characters")]
    FormulaTooLong,
    #[error("input exceeds {MAX_INPUT_CHARS} characters")]
    InputTooLong,
    #[error("{0}")]
    Lex(#[from] LexError),
    #[error("nesting depth exceeds the evaluation cap")]
    TooDeep,
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("wrong number of arguments for {0}")]
    WrongArgCount(&'static str),
    #[error("unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("trailing tokens after a complete expression")]
    TrailingTokens,
}

/// Same substitution inputs as [`ax_template`]'s `TemplateContext`, kept
/// as a separate type so this crate has no dependency on that one — the
/// two placeholder families are small enough to duplicate rather than
/// share a crate boundary across what are conceptually distinct engines.
pub struct FormulaContext<'a> {
    pub properties: &'a Json,
    pub inputs: &'a [String],
}

/// Evaluate `formula` against `ctx`, returning the final display string.
pub fn evaluate(formula: &str, ctx: &FormulaContext<'_>) -> Result<String, FormulaError> {
    if formula.chars().count() > MAX_FORMULA_CHARS {
        return Err(FormulaError::FormulaTooLong);
    }
    for input in ctx.inputs {
        if input.chars().count() > MAX_INPUT_CHARS {
            return Err(FormulaError::InputTooLong);
        }
    }

    let (tokenized_source, literals) = substitute_to_tokens(formula, ctx);
    let tokens = lexer::lex(&tokenized_source)?;
    let mut parser = parser::Parser::new(&tokens, &literals);
    let value = parser.parse_expr_at_top()?;
    Ok(value.as_text())
}

/// Replace every `{{path}}` / `[[inputN]]` placeholder with an opaque
/// `\u{E000}<idx>\u{E001}` marker and return the resolved literal table
/// indexed by `idx`. The literal text itself never re-enters the source
/// that gets lexed, so it cannot be mistaken for a function name.
fn substitute_to_tokens(formula: &str, ctx: &FormulaContext<'_>) -> (String, Vec<String>) {
    let mut out = String::with_capacity(formula.len());
    let mut literals = Vec::new();
    let bytes = formula.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if let Some((inner, consumed)) = match_delim(formula, i, "{{", "}}") {
            let resolved = resolve_property_path(ctx.properties, inner.trim());
            push_literal(&mut out, &mut literals, resolved);
            i += consumed;
        } else if let Some((inner, consumed)) = match_delim(formula, i, "[[", "]]") {
            let resolved = resolve_input_ref(ctx.inputs, inner.trim());
            push_literal(&mut out, &mut literals, resolved);
            i += consumed;
        } else {
            let ch = formula[i..].chars().next().unwrap();
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    (out, literals)
}

fn push_literal(out: &mut String, literals: &mut Vec<String>, value: String) {
    let idx = literals.len();
    literals.push(value);
    out.push(OPAQUE_OPEN);
    out.push_str(&idx.to_string());
    out.push(OPAQUE_CLOSE);
}

fn match_delim<'a>(text: &'a str, pos: usize, open: &str, close: &str) -> Option<(&'a str, usize)> {
    let rest = &text[pos..];
    let inner_start = rest.strip_prefix(open)?;
    let close_at = inner_start.find(close)?;
    let inner = &inner_start[..close_at];
    if inner.contains(open) {
        return None;
    }
    Some((inner, open.len() + inner.len() + close.len()))
}

const BLOCKED_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];
const MAX_PATH_DEPTH: usize = 20;

fn resolve_input_ref(inputs: &[String], raw: &str) -> String {
    let Some(n) = raw.strip_prefix("input") else {
        return String::new();
    };
    match n.parse::<usize>() {
        Ok(idx) if idx >= 1 => inputs.get(idx - 1).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

fn resolve_property_path(properties: &Json, path: &str) -> String {
    let mut segments: Vec<PathSeg> = Vec::new();
    for dot_part in path.split('.') {
        let mut rest = dot_part;
        let key_end = rest.find('[').unwrap_or(rest.len());
        let key = &rest[..key_end];
        if !key.is_empty() {
            if BLOCKED_KEYS.contains(&key) {
                return String::new();
            }
            segments.push(PathSeg::Key(key.to_string()));
        }
        rest = &rest[key_end..];
        while let Some(stripped) = rest.strip_prefix('[') {
            let Some(close) = stripped.find(']') else { return String::new() };
            let Ok(idx) = stripped[..close].parse::<usize>() else { return String::new() };
            segments.push(PathSeg::Index(idx));
            rest = &stripped[close + 1..];
        }
        if !rest.is_empty() {
            return String::new();
        }
    }
    if segments.is_empty() || segments.len() > MAX_PATH_DEPTH {
        return String::new();
    }

    let mut current = properties;
    for seg in &segments {
        let next = match (seg, current) {
            (PathSeg::Key(k), Json::Object(map)) => map.get(k),
            (PathSeg::Index(i), Json::Array(arr)) => arr.get(*i),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return String::new(),
        }
    }
    match current {
        Json::String(s) => s.clone(),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}

enum PathSeg {
    Key(String),
    Index(usize),
}
