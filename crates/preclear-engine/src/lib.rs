//! # preclear-engine — Compliance Evaluation and Token Issuance
//!
//! The deterministic half of the PreClear stack. Everything in this
//! crate is a pure function of its inputs (the token issuer's entropy
//! draw excepted):
//!
//! - **[`ComplianceEvaluator`]** runs the five compliance checks against
//!   a shipment snapshot and an optional matched rule and produces a
//!   scored [`EvaluationOutcome`](preclear_core::EvaluationOutcome).
//!   Given identical inputs it returns identical output — malformed data
//!   becomes a `failed` check result, never an error.
//!
//! - **[`DocumentRequirementResolver`]** derives the required-document
//!   set from the shipment's attributes and the matched rule.
//!
//! - **[`TokenIssuer`]** mints unique pre-clearance tokens once dual
//!   approval is held, with a collision registry and the 30-day expiry
//!   invariant.
//!
//! The evaluator performs no I/O: the workflow coordinator looks up the
//! matched rule through the `RuleCatalog` collaborator and hands it in.

pub mod documents;
pub mod evaluator;
pub mod token;

pub use documents::{DocumentRequirementResolver, BASELINE_DOCUMENTS, CERTIFICATE_OF_ORIGIN};
pub use evaluator::ComplianceEvaluator;
pub use token::{TokenIssuer, TOKEN_PREFIX, TOKEN_SUFFIX_LEN};
