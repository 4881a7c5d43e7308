//! # Workflow Error Types
//!
//! The error taxonomy surfaced by the public operations. State-machine
//! conflicts pass through unchanged via `#[from]`; repository and
//! collaborator failures are mapped into the variants here. Every error
//! leaves the stored shipment unchanged — there are no partial writes.

use thiserror::Error;

use preclear_core::{DocumentKey, ShipmentId};
use preclear_state::StateConflictError;

/// Errors returned by [`WorkflowCoordinator`](crate::WorkflowCoordinator)
/// operations.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// No shipment with the given id exists.
    #[error("shipment not found: {0}")]
    NotFound(ShipmentId),

    /// An illegal lifecycle transition was attempted.
    #[error(transparent)]
    StateConflict(#[from] StateConflictError),

    /// The shipment changed between load and save. Reload and retry.
    #[error("concurrent modification of {shipment_id}: expected version {expected}, stored {actual}")]
    Concurrency {
        /// The shipment that was concurrently modified.
        shipment_id: ShipmentId,
        /// The version the operation loaded.
        expected: u64,
        /// The version actually stored.
        actual: u64,
    },

    /// An upload was recorded for a document the store does not hold.
    #[error("document {key:?} is not present in the document store for {shipment_id}")]
    DocumentMissing {
        /// The shipment the upload was for.
        shipment_id: ShipmentId,
        /// The missing document key.
        key: DocumentKey,
    },

    /// The shipment left `awaiting-ai` while its evaluation ran; the
    /// result was discarded without committing.
    #[error("evaluation for {0} was superseded before it could commit")]
    EvaluationDiscarded(ShipmentId),

    /// A collaborator failed (catalog, store, repository backend).
    #[error("collaborator failure: {0}")]
    Collaborator(String),
}
