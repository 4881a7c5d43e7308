//! # Domain Events
//!
//! Events emitted by shipment lifecycle transitions, published to the
//! `NotificationSink` collaborator after a successful commit.
//!
//! Delivery is at-least-once, so event ids are content-derived: SHA-256
//! over the event kind, the shipment id, and the transition sequence
//! number at emission. Re-delivery of the same commit reproduces the
//! same id, and consumers deduplicate on it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use preclear_core::{ShipmentId, Timestamp};

/// The kinds of domain event the shipment lifecycle emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainEventKind {
    /// A document was uploaded for the shipment.
    DocumentUploaded,
    /// All required documents are now uploaded.
    DocumentsComplete,
    /// An automated evaluation started.
    EvaluationStarted,
    /// The automated evaluation approved the shipment.
    AiApproved,
    /// The automated evaluation rejected the shipment.
    AiRejected,
    /// The shipper requested a broker review.
    BrokerReviewRequested,
    /// The broker approved the shipment.
    BrokerApproved,
    /// The broker rejected the shipment.
    BrokerRejected,
    /// The broker requested additional documents.
    DocumentsRequested,
    /// A pre-clearance token was issued.
    TokenGenerated,
    /// The shipment was cancelled.
    ShipmentCancelled,
}

impl DomainEventKind {
    /// The canonical string name of this kind (e.g. `"broker-approved"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentUploaded => "document-uploaded",
            Self::DocumentsComplete => "documents-complete",
            Self::EvaluationStarted => "evaluation-started",
            Self::AiApproved => "ai-approved",
            Self::AiRejected => "ai-rejected",
            Self::BrokerReviewRequested => "broker-review-requested",
            Self::BrokerApproved => "broker-approved",
            Self::BrokerRejected => "broker-rejected",
            Self::DocumentsRequested => "documents-requested",
            Self::TokenGenerated => "token-generated",
            Self::ShipmentCancelled => "shipment-cancelled",
        }
    }
}

impl std::fmt::Display for DomainEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which party a notification addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientRole {
    /// The shipper who owns the shipment.
    Shipper,
    /// The broker reviewing the shipment.
    Broker,
}

/// A notification event with a content-derived, deduplicable id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Content-derived id: identical for re-deliveries of the same commit.
    pub id: String,
    /// What happened.
    pub kind: DomainEventKind,
    /// The shipment this event concerns.
    pub shipment_id: ShipmentId,
    /// Who should be notified.
    pub recipient: RecipientRole,
    /// Human-readable summary for the notification surface.
    pub message: String,
    /// When the event was emitted.
    pub timestamp: Timestamp,
}

impl DomainEvent {
    /// Build an event for the given transition sequence number.
    ///
    /// The sequence number is the length of the shipment's transition log
    /// at emission, which makes the id stable across re-deliveries of the
    /// same commit and distinct across distinct commits.
    pub fn new(
        kind: DomainEventKind,
        shipment_id: ShipmentId,
        sequence: u64,
        recipient: RecipientRole,
        message: String,
    ) -> Self {
        let id = derive_event_id(kind, &shipment_id, sequence);
        Self {
            id,
            kind,
            shipment_id,
            recipient,
            message,
            timestamp: Timestamp::now(),
        }
    }
}

/// SHA-256 over `kind | shipment id | sequence`, rendered as 32 hex chars.
fn derive_event_id(kind: DomainEventKind, shipment_id: &ShipmentId, sequence: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(shipment_id.as_uuid().as_bytes());
    hasher.update(b"|");
    hasher.update(sequence.to_be_bytes());
    let digest = hasher.finalize();
    digest.iter().take(16).map(|b| format!("{b:02x}")).collect()
}
