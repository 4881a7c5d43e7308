//! # Collaborator Capability Traits
//!
//! The seams between the core and everything it deliberately excludes:
//! rule data, file storage, notification delivery, and persistence.
//! All traits are object-safe and async; the coordinator holds them as
//! `Arc<dyn Trait>`.
//!
//! The `RuleCatalog` lookup and `DocumentStore::exists` are the only
//! I/O suspension points in the workflow — everything else the
//! coordinator does between load and save is pure computation.

use async_trait::async_trait;

use preclear_core::{CountryCode, DocumentKey, ImportExportRule, ShipmentId};
use preclear_state::{DomainEvent, Shipment};

use crate::error::WorkflowError;

/// Read-only lookup of import/export rules.
#[async_trait]
pub trait RuleCatalog: Send + Sync {
    /// The rule covering the destination and HS code, if any.
    ///
    /// When several rules could apply, the catalog decides precedence;
    /// the coordinator treats the returned rule as authoritative.
    async fn matching_rule(
        &self,
        country_code: &CountryCode,
        hs_code: &str,
    ) -> Result<Option<ImportExportRule>, WorkflowError>;
}

/// File storage for uploaded clearance documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether the store holds a document under this shipment and key.
    async fn exists(
        &self,
        shipment_id: &ShipmentId,
        key: &DocumentKey,
    ) -> Result<bool, WorkflowError>;
}

/// Fire-and-forget notification delivery.
///
/// Delivery is at-least-once: the same event may be published more than
/// once, and consumers deduplicate on `event.id`.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one event. Failures are the sink's concern — the
    /// coordinator never awaits or inspects delivery.
    async fn publish(&self, event: DomainEvent);
}

/// Persistence for shipment aggregates with optimistic concurrency.
#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    /// Store a new shipment. Fails if the id is already taken.
    async fn insert(&self, shipment: Shipment) -> Result<(), WorkflowError>;

    /// Load the current snapshot of a shipment.
    async fn load(&self, id: &ShipmentId) -> Result<Shipment, WorkflowError>;

    /// Store a mutated shipment if the persisted version still equals
    /// `expected_version`. Returns the new version on success and
    /// [`WorkflowError::Concurrency`] on a mismatch — never a merge.
    async fn save(&self, shipment: &Shipment, expected_version: u64) -> Result<u64, WorkflowError>;
}
