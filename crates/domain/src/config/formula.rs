use serde::{Deserialize, Serialize};

/// Formula Evaluator length caps and iteration bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormulaConfig {
    #[serde(default = "d_max_formula_chars")]
    pub max_formula_chars: usize,
    #[serde(default = "d_max_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "d_max_iterations")]
    pub max_iterations: usize,
}

impl Default for FormulaConfig {
    fn default() -> Self {
        Self {
            max_formula_chars: d_max_formula_chars(),
            max_input_chars: d_max_input_chars(),
            max_iterations: d_max_iterations(),
        }
    }
}

fn d_max_formula_chars() -> usize {
    5_000
}
fn d_max_input_chars() -> usize {
    10_000
}
fn d_max_iterations() -> usize {
    50
}
