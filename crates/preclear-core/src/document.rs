//! # Document Types
//!
//! The key under which a clearance document is required/uploaded, and
//! the metadata recorded when a shipper uploads one. Keys are ordered
//! (`Ord`) so that required-document sets and missing-document listings
//! are deterministic.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::temporal::Timestamp;

/// The name of a clearance document, e.g. `"Commercial Invoice"`.
///
/// Keys compare case-sensitively; the resolver and the upload path both
/// produce canonical names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// Validate and construct a document key.
    pub fn new(name: &str) -> Result<Self, CoreError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidDocumentKey);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The document name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata recorded for an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// The document category as declared by the uploader (e.g. `"invoice"`).
    pub document_type: String,
    /// Original file name of the upload.
    pub file_name: String,
    /// When the upload was recorded.
    pub uploaded_at: Timestamp,
}
