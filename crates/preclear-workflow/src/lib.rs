//! # preclear-workflow — Shipment Workflow Coordination
//!
//! Orchestrates the PreClear components per shipment: loads the
//! aggregate through the repository collaborator, validates the
//! transition against the state machine, applies the pure computation
//! from the engine, commits with an optimistic version check, and
//! publishes domain events after the commit.
//!
//! ## Collaborators
//!
//! Everything outside the core is a capability trait ([`contracts`]):
//! rule lookup (`RuleCatalog`), document storage (`DocumentStore`),
//! notification delivery (`NotificationSink`), and persistence
//! (`ShipmentRepository`). In-memory implementations for tests live in
//! [`memory`].
//!
//! ## Concurrency Model
//!
//! - Writes to a shipment are linearized by the repository's version
//!   check; no two operations commit on the same pre-write version.
//! - At most one evaluation is in flight per shipment: concurrent
//!   `evaluate` calls coalesce onto the in-flight run and all receive
//!   its outcome.
//! - No locks are held across I/O. The in-flight registry uses a
//!   synchronous mutex held only for map access.
//! - Notification dispatch is fire-and-forget and happens only after a
//!   successful commit.

pub mod config;
pub mod contracts;
pub mod coordinator;
pub mod error;
pub mod memory;

pub use config::WorkflowConfig;
pub use contracts::{DocumentStore, NotificationSink, RuleCatalog, ShipmentRepository};
pub use coordinator::WorkflowCoordinator;
pub use error::WorkflowError;
pub use memory::{
    CollectingSink, InMemoryDocumentStore, InMemoryRuleCatalog, InMemoryShipmentRepository,
};
