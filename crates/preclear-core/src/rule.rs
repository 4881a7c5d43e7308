//! # Import/Export Rule Model
//!
//! A rule is a country- and HS-range-scoped policy record: value/weight
//! ceilings, banned product terms, and the documents the destination
//! authority requires. Rules are external data — the `RuleCatalog`
//! collaborator looks them up; this module only defines the record and
//! its matching semantics.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::document::DocumentKey;
use crate::identity::{CountryCode, RuleId};

/// An HS-code range, expressed as digit-string prefixes.
///
/// A code matches when its digits start with `start`, or — for banded
/// rules such as `9018`–`9022` — when its leading digits fall between
/// `start` and `end` inclusive. Dots in the code are ignored; the
/// comparison is on digits only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsCodeRange {
    /// Leading digits of the first code in the range, e.g. `"8518"`.
    pub start: String,
    /// Leading digits of the last code in the range, if the rule spans a
    /// band rather than a single prefix.
    pub end: Option<String>,
}

impl HsCodeRange {
    /// A single-prefix range.
    pub fn prefix(start: &str) -> Self {
        Self {
            start: start.to_string(),
            end: None,
        }
    }

    /// A banded range, e.g. `9018`–`9022`.
    pub fn band(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: Some(end.to_string()),
        }
    }

    /// Whether `hs_code` falls in this range. Non-digit characters in the
    /// code (the `.` separators) are ignored.
    pub fn contains(&self, hs_code: &str) -> bool {
        let digits: String = hs_code.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() || self.start.is_empty() {
            return false;
        }
        if digits.starts_with(&self.start) {
            return true;
        }
        match self.end.as_deref() {
            Some(end) if !end.is_empty() => {
                let width = self.start.len().max(end.len());
                if digits.len() < width {
                    return false;
                }
                let prefix = &digits[..width];
                // Pad the low bound with '0' and the high bound with '9' so
                // "85" <= prefix <= "8599" style bands compare correctly.
                let lo = pad_with(&self.start, width, '0');
                let hi = pad_with(end, width, '9');
                lo.as_str() <= prefix && prefix <= hi.as_str()
            }
            _ => false,
        }
    }
}

fn pad_with(digits: &str, width: usize, fill: char) -> String {
    let mut out = digits.to_string();
    while out.len() < width {
        out.push(fill);
    }
    out
}

/// A country- and HS-range-scoped import/export policy record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportExportRule {
    /// Unique rule identifier.
    pub id: RuleId,
    /// Destination country this rule applies to.
    pub country_code: CountryCode,
    /// The HS-code range this rule covers.
    pub hs_range: HsCodeRange,
    /// Documents the destination authority requires for this range.
    pub required_documents: BTreeSet<DocumentKey>,
    /// Product terms that may not be shipped under this rule.
    pub banned_product_terms: BTreeSet<String>,
    /// Maximum declared value, if the rule caps it.
    pub max_value: Option<f64>,
    /// Maximum weight in kilograms, if the rule caps it.
    pub max_weight: Option<f64>,
    /// Inactive rules never match.
    pub active: bool,
}

impl ImportExportRule {
    /// Whether this rule applies to the given destination and HS code.
    pub fn matches(&self, country_code: &CountryCode, hs_code: &str) -> bool {
        self.active && self.country_code == *country_code && self.hs_range.contains(hs_code)
    }
}
