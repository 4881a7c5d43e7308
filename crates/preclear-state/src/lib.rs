//! # preclear-state — The Dual-Approval Shipment State Machine
//!
//! Implements the shipment lifecycle of the PreClear stack: a shipment
//! must pass the automated compliance evaluation, then a human broker
//! review, before a clearance token can be issued.
//!
//! ## States
//!
//! ```text
//! draft ──documents complete──▶ documents-uploaded ──evaluate──▶ awaiting-ai
//!                                                                    │
//!                                          ┌─────────────────────────┤
//!                                          ▼                         ▼
//!                                  ai-review (approved)      ai-review (rejected,
//!                                          │                  remediate + re-evaluate)
//!                              request broker review
//!                                          │
//!                                          ▼
//!                                  awaiting-broker ──approve──▶ (token eligible)
//!                                     │        │                      │
//!                          request documents   reject           generate token
//!                                     │        │                      │
//!                                     ▼        ▼                      ▼
//!                          document-requested  awaiting-broker   token-generated
//!                           (re-evaluate or     (re-request          (terminal)
//!                            resend to broker)   after remediation)
//!
//! any non-terminal state ──cancel──▶ cancelled (terminal)
//! ```
//!
//! ## Design
//!
//! The state is an enum with validated transitions rather than typestate
//! types: the lifecycle has two approval axes (`AiApproval`,
//! `BrokerApproval`) layered over the status, and the legal moves depend
//! on combinations of both. An enum model with `require`-style guards
//! rejects every illegal combination at runtime with a structured
//! [`StateConflictError`], and keeps the aggregate serializable for the
//! repository collaborator.
//!
//! Every transition appends to an ordered audit log and yields
//! [`DomainEvent`]s for the coordinator to publish after commit — the
//! machine never holds subscriber lists itself.

pub mod events;
pub mod shipment;

// ─── Shipment re-exports ────────────────────────────────────────────

pub use shipment::{
    AiApproval, BrokerApproval, BrokerDecision, Shipment, ShipmentDraft, ShipmentStatus,
    ShipmentType, StateConflictError, TransitionRecord,
};

// ─── Event re-exports ───────────────────────────────────────────────

pub use events::{DomainEvent, DomainEventKind, RecipientRole};
