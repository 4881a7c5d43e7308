//! # Core Error Types
//!
//! Failures from validated constructors in this crate. Higher layers
//! define their own error enums (`StateConflictError` in
//! `preclear-state`, `WorkflowError` in `preclear-workflow`) and wrap
//! these where needed. All errors use `thiserror` for derive-based
//! `Display` and `Error` implementations.

use thiserror::Error;

/// Errors produced by `preclear-core` constructors and parsers.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A country code was not two ASCII letters.
    #[error("invalid country code {0:?}: expected two ASCII letters")]
    InvalidCountryCode(String),

    /// A timestamp string could not be parsed under the UTC-only policy.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The offending input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A document key was empty or whitespace-only.
    #[error("invalid document key: must be non-empty")]
    InvalidDocumentKey,
}
