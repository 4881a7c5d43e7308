//! # Validation Results and Evaluation Outcomes
//!
//! The per-check result record produced by the compliance evaluator and
//! the aggregate outcome the workflow commits to a shipment. Malformed
//! shipment data is reported *inside* these records as `failed` results —
//! the evaluator never surfaces it as an error, so a caller always
//! receives a complete, inspectable verdict.

use serde::{Deserialize, Serialize};

/// The five independent check categories run per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckCategory {
    /// Import/export rule constraints (value and weight ceilings).
    Rules,
    /// Banned/blocked product detection.
    Product,
    /// HS/HTS code format validation.
    HsCode,
    /// Quantity, weight and value sanity constraints.
    Constraints,
    /// Documentation completeness.
    Documentation,
}

impl std::fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Rules => "rules",
            Self::Product => "product",
            Self::HsCode => "hscode",
            Self::Constraints => "constraints",
            Self::Documentation => "documentation",
        };
        f.write_str(s)
    }
}

/// The outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// The check found no issue.
    Passed,
    /// The check found a soft violation that lowers the score.
    Warning,
    /// The check found a hard violation; the shipment cannot be approved.
    Failed,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Passed => "passed",
            Self::Warning => "warning",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The result of one compliance check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Which check produced this result.
    pub category: CheckCategory,
    /// The check outcome.
    pub status: CheckStatus,
    /// Short human-readable title of the check.
    pub title: String,
    /// What the check found.
    pub description: String,
    /// Remediation hint, when the check can suggest one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Structured context for consumers (matched rule id, computed
    /// ratios, missing-document lists). Opaque to the state machine.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

/// The aggregate verdict of one evaluation run.
///
/// `score` and `approved` are derived from `results` by the binding
/// formula in the engine; they are stored here so the committed shipment
/// snapshot carries the full verdict without recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    /// Per-check results, in fixed category order.
    pub results: Vec<ValidationResult>,
    /// Weighted compliance score, 0–100.
    pub score: u8,
    /// Whether the automated pass approved the shipment.
    pub approved: bool,
}

impl EvaluationOutcome {
    /// Number of results with the given status.
    pub fn count(&self, status: CheckStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}
