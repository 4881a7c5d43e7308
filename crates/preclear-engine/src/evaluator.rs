//! # Compliance Evaluator
//!
//! Runs the five independent compliance checks against a shipment
//! snapshot and an optional matched import/export rule, producing a
//! scored [`EvaluationOutcome`].
//!
//! ## Checks
//!
//! 1. **Rules** — value/weight ceilings of the matched rule; violation
//!    is a `warning`.
//! 2. **Product** — case-insensitive banned-term screening of the
//!    product description; a hit is a `failed`.
//! 3. **HS code** — format must be `dddd.dd.dd`; mismatch is a `failed`.
//! 4. **Constraints** — quantity, weight and value must be positive;
//!    value-per-kg outside `(1, 10000)` is a `warning`.
//! 5. **Documentation** — every resolved required document must be
//!    uploaded; anything missing is a `failed` with an upload suggestion.
//!
//! ## Scoring (binding contract)
//!
//! `score = round((passed*100 + warning*70) / total)` and
//! `approved = failed == 0 && score >= 85`.
//!
//! ## Determinism
//!
//! `evaluate` is a pure function: no I/O, no clock, no randomness.
//! Malformed shipment data (non-positive amounts) is reported as a
//! `failed` check result inside the outcome — the evaluator never
//! returns an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use preclear_core::{
    CheckCategory, CheckStatus, EvaluationOutcome, ImportExportRule, ValidationResult,
};
use preclear_state::Shipment;

use crate::documents::DocumentRequirementResolver;

/// Required HS code shape: four digits, dot, two digits, dot, two digits.
static HS_CODE_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}\.\d{2}\.\d{2}$").expect("HS code pattern is valid"));

/// Value-per-kg band considered unremarkable (exclusive bounds).
const VALUE_PER_KG_MIN: f64 = 1.0;
const VALUE_PER_KG_MAX: f64 = 10_000.0;

/// Score at or above which a shipment with no failed checks is approved.
const APPROVAL_THRESHOLD: u8 = 85;

/// Stateless five-check compliance evaluator.
#[derive(Debug, Clone, Copy)]
pub struct ComplianceEvaluator;

impl ComplianceEvaluator {
    /// Evaluate a shipment snapshot against an optional matched rule.
    ///
    /// A rule that does not actually cover the shipment's destination
    /// and HS range contributes no constraint — the rules and product
    /// checks treat it as absent.
    pub fn evaluate(shipment: &Shipment, matched_rule: Option<&ImportExportRule>) -> EvaluationOutcome {
        let rule = matched_rule
            .filter(|r| r.matches(&shipment.destination_country, &shipment.hs_code));

        let results = vec![
            check_rules(shipment, rule),
            check_banned_products(shipment, rule),
            check_hs_code_format(shipment),
            check_constraints(shipment),
            check_documentation(shipment, rule),
        ];

        let passed = count(&results, CheckStatus::Passed);
        let warning = count(&results, CheckStatus::Warning);
        let failed = count(&results, CheckStatus::Failed);

        let score = (((passed * 100 + warning * 70) as f64) / results.len() as f64).round() as u8;
        let approved = failed == 0 && score >= APPROVAL_THRESHOLD;

        EvaluationOutcome {
            results,
            score,
            approved,
        }
    }
}

fn count(results: &[ValidationResult], status: CheckStatus) -> usize {
    results.iter().filter(|r| r.status == status).count()
}

// ─── Check 1: Import/Export Rules ────────────────────────────────────

fn check_rules(shipment: &Shipment, rule: Option<&ImportExportRule>) -> ValidationResult {
    let title = "Import/Export Rules Validation".to_string();

    let Some(rule) = rule else {
        return ValidationResult {
            category: CheckCategory::Rules,
            status: CheckStatus::Passed,
            title,
            description: "No import/export rule constraints apply to this destination and HS range"
                .to_string(),
            suggestion: None,
            details: serde_json::Value::Null,
        };
    };

    let mut findings = Vec::new();
    if let Some(max_value) = rule.max_value {
        if shipment.declared_value > max_value {
            findings.push(format!(
                "declared value {} exceeds maximum {max_value}",
                shipment.declared_value
            ));
        }
    }
    if let Some(max_weight) = rule.max_weight {
        if shipment.weight_kg > max_weight {
            findings.push(format!(
                "weight {}kg exceeds maximum {max_weight}kg",
                shipment.weight_kg
            ));
        }
    }

    let details = json!({
        "rule_id": rule.id.to_string(),
        "max_value": rule.max_value,
        "max_weight": rule.max_weight,
    });

    if findings.is_empty() {
        ValidationResult {
            category: CheckCategory::Rules,
            status: CheckStatus::Passed,
            title,
            description: format!(
                "Matched rule for {}; value and weight within limits",
                rule.country_code
            ),
            suggestion: None,
            details,
        }
    } else {
        ValidationResult {
            category: CheckCategory::Rules,
            status: CheckStatus::Warning,
            title,
            description: findings.join("; "),
            suggestion: Some("Review shipment value and weight constraints".to_string()),
            details,
        }
    }
}

// ─── Check 2: Banned/Blocked Products ────────────────────────────────

fn check_banned_products(shipment: &Shipment, rule: Option<&ImportExportRule>) -> ValidationResult {
    let title = "Banned/Blocked Product Detection".to_string();

    let banned_terms = rule
        .map(|r| &r.banned_product_terms)
        .filter(|terms| !terms.is_empty());

    let Some(terms) = banned_terms else {
        return ValidationResult {
            category: CheckCategory::Product,
            status: CheckStatus::Passed,
            title,
            description: "No banned product restrictions for this category".to_string(),
            suggestion: None,
            details: serde_json::Value::Null,
        };
    };

    let description_lower = shipment.product_description.to_lowercase();
    let hit = terms
        .iter()
        .filter(|term| !term.trim().is_empty())
        .find(|term| description_lower.contains(&term.to_lowercase()));

    match hit {
        Some(term) => ValidationResult {
            category: CheckCategory::Product,
            status: CheckStatus::Failed,
            title,
            description: "Product matches banned items list".to_string(),
            suggestion: Some(
                "This product cannot be shipped to the destination country".to_string(),
            ),
            details: json!({ "matched_term": term }),
        },
        None => ValidationResult {
            category: CheckCategory::Product,
            status: CheckStatus::Passed,
            title,
            description: "No banned or restricted products detected".to_string(),
            suggestion: None,
            details: serde_json::Value::Null,
        },
    }
}

// ─── Check 3: HS/HTS Code Format ─────────────────────────────────────

fn check_hs_code_format(shipment: &Shipment) -> ValidationResult {
    let title = "HS/HTS Code Validation".to_string();
    let valid = HS_CODE_FORMAT.is_match(&shipment.hs_code);

    if valid {
        ValidationResult {
            category: CheckCategory::HsCode,
            status: CheckStatus::Passed,
            title,
            description: format!("HS code {} is correctly formatted", shipment.hs_code),
            suggestion: Some(format!("Verified: {}", shipment.hs_code)),
            details: serde_json::Value::Null,
        }
    } else {
        ValidationResult {
            category: CheckCategory::HsCode,
            status: CheckStatus::Failed,
            title,
            description: format!("HS code {:?} is not correctly formatted", shipment.hs_code),
            suggestion: Some("Suggested format: XXXX.XX.XX".to_string()),
            details: serde_json::Value::Null,
        }
    }
}

// ─── Check 4: Quantity, Weight & Value Constraints ───────────────────

fn check_constraints(shipment: &Shipment) -> ValidationResult {
    let title = "Quantity, Weight & Value Constraints".to_string();
    let quantity = shipment.quantity;
    let weight = shipment.weight_kg;
    let value = shipment.declared_value;

    let malformed = quantity == 0
        || !weight.is_finite()
        || weight <= 0.0
        || !value.is_finite()
        || value <= 0.0;
    if malformed {
        return ValidationResult {
            category: CheckCategory::Constraints,
            status: CheckStatus::Failed,
            title,
            description: "Invalid quantity, weight, or value detected".to_string(),
            suggestion: Some("Quantity, weight, and value must all be positive".to_string()),
            details: json!({
                "quantity": quantity,
                "weight_kg": weight,
                "declared_value": value,
            }),
        };
    }

    let value_per_kg = value / weight;
    let details = json!({
        "quantity": quantity,
        "weight_kg": weight,
        "declared_value": value,
        "value_per_kg": (value_per_kg * 100.0).round() / 100.0,
    });

    if value_per_kg > VALUE_PER_KG_MIN && value_per_kg < VALUE_PER_KG_MAX {
        ValidationResult {
            category: CheckCategory::Constraints,
            status: CheckStatus::Passed,
            title,
            description: "Quantity, weight, and value are within normal ranges".to_string(),
            suggestion: None,
            details,
        }
    } else {
        let description = if value_per_kg >= VALUE_PER_KG_MAX {
            "Unusually high value-to-weight ratio detected".to_string()
        } else {
            "Unusually low value-to-weight ratio detected".to_string()
        };
        ValidationResult {
            category: CheckCategory::Constraints,
            status: CheckStatus::Warning,
            title,
            description,
            suggestion: Some("Verify the declared value and weight".to_string()),
            details,
        }
    }
}

// ─── Check 5: Documentation Completeness ─────────────────────────────

fn check_documentation(shipment: &Shipment, rule: Option<&ImportExportRule>) -> ValidationResult {
    let title = "Documentation Completeness".to_string();
    let required = DocumentRequirementResolver::resolve(shipment, rule);
    let missing: Vec<_> = required
        .iter()
        .filter(|key| !shipment.uploaded_documents.contains_key(*key))
        .collect();

    let required_names: Vec<_> = required.iter().map(|k| k.as_str()).collect();
    let uploaded_names: Vec<_> = shipment.uploaded_documents.keys().map(|k| k.as_str()).collect();
    let missing_names: Vec<_> = missing.iter().map(|k| k.as_str()).collect();
    let details = json!({
        "required": required_names,
        "uploaded": uploaded_names,
        "missing": missing_names,
    });

    if missing.is_empty() {
        ValidationResult {
            category: CheckCategory::Documentation,
            status: CheckStatus::Passed,
            title,
            description: format!(
                "All {} required documents are uploaded",
                required.len()
            ),
            suggestion: None,
            details,
        }
    } else {
        ValidationResult {
            category: CheckCategory::Documentation,
            status: CheckStatus::Failed,
            title,
            description: format!("Missing {} required documents", missing.len()),
            suggestion: Some(format!("Please upload: {}", missing_names.join(", "))),
            details,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
