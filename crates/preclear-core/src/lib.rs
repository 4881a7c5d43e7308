//! # preclear-core — Foundational Types for the PreClear Stack
//!
//! This crate is the bedrock of the PreClear workspace. It defines the
//! type-system primitives shared by the evaluation engine, the approval
//! state machine, and the workflow coordinator. Every other crate in the
//! workspace depends on `preclear-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `ShipmentId`, `RuleId`,
//!    `CountryCode`, `DocumentKey` — validated constructors, no bare
//!    strings for identifiers.
//!
//! 2. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision, so serialized lifecycles and token
//!    expiries are deterministic.
//!
//! 3. **Strict enums for check outcomes.** `CheckCategory` and
//!    `CheckStatus` are exhaustive enums — a validation result cannot
//!    carry a category or status the engine does not know about.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `preclear-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement `Serialize`/`Deserialize`.

pub mod document;
pub mod error;
pub mod identity;
pub mod rule;
pub mod temporal;
pub mod token;
pub mod validation;

// Re-export primary types for ergonomic imports.
pub use document::{DocumentKey, DocumentMetadata};
pub use error::CoreError;
pub use identity::{CountryCode, RuleId, ShipmentId};
pub use rule::{HsCodeRange, ImportExportRule};
pub use temporal::Timestamp;
pub use token::{Token, TOKEN_VALIDITY_DAYS};
pub use validation::{CheckCategory, CheckStatus, EvaluationOutcome, ValidationResult};
