//! # Shipment Aggregate and Approval State Machine
//!
//! The shipment carries two approval axes over its status: the automated
//! (`AiApproval`) and the human (`BrokerApproval`) verdicts. Transitions
//! are methods that validate the current status/approval combination and
//! reject everything else with a structured [`StateConflictError`] —
//! an illegal request is never silently corrected.
//!
//! ## Invariants
//!
//! - `BrokerApproval::Pending` is reachable only while
//!   `AiApproval::Approved` holds.
//! - `token` is non-empty only when both approvals are `Approved`, and
//!   `token-generated` status implies a token is present.
//! - Every state change appends a [`TransitionRecord`] to an ordered
//!   audit log.
//!
//! ## Concurrency
//!
//! The aggregate itself is synchronous. The `version` field is the
//! optimistic-concurrency guard: the repository collaborator refuses a
//! save whose expected version does not match the stored one, which
//! linearizes all writes to a shipment. Emitted event ids incorporate
//! the version the pending commit will produce, so re-delivery after an
//! at-least-once publish carries the same id.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use preclear_core::{
    CountryCode, DocumentKey, DocumentMetadata, EvaluationOutcome, ShipmentId, Timestamp, Token,
    ValidationResult,
};

use crate::events::{DomainEvent, DomainEventKind, RecipientRole};

// ─── Status Enums ────────────────────────────────────────────────────

/// The lifecycle status of a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShipmentStatus {
    /// Created; documents still being uploaded.
    Draft,
    /// All required documents are uploaded; ready for evaluation.
    DocumentsUploaded,
    /// An automated evaluation is in flight.
    AwaitingAi,
    /// The automated verdict is recorded; remediation or broker request next.
    AiReview,
    /// A broker review was requested and is pending or decided.
    AwaitingBroker,
    /// The broker asked for additional documents.
    DocumentRequested,
    /// A pre-clearance token has been issued (terminal).
    TokenGenerated,
    /// The shipment was cancelled (terminal).
    Cancelled,
}

impl ShipmentStatus {
    /// Whether this status is terminal.
    ///
    /// `token-generated` is terminal for the approval flow; whether it is
    /// also cancel-proof is a workflow policy, not a property of the status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TokenGenerated | Self::Cancelled)
    }

    /// The canonical string name of this status (e.g. `"awaiting-ai"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::DocumentsUploaded => "documents-uploaded",
            Self::AwaitingAi => "awaiting-ai",
            Self::AiReview => "ai-review",
            Self::AwaitingBroker => "awaiting-broker",
            Self::DocumentRequested => "document-requested",
            Self::TokenGenerated => "token-generated",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The automated approval axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AiApproval {
    /// No evaluation has run yet.
    NotStarted,
    /// An evaluation is in flight.
    Pending,
    /// The last evaluation approved the shipment.
    Approved,
    /// The last evaluation rejected the shipment.
    Rejected,
}

impl std::fmt::Display for AiApproval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not-started",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// The human approval axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrokerApproval {
    /// No broker review has been requested yet.
    NotStarted,
    /// A broker review is pending.
    Pending,
    /// The broker approved the shipment.
    Approved,
    /// The broker rejected the shipment.
    Rejected,
    /// The broker asked for additional documents.
    DocumentsRequested,
}

impl std::fmt::Display for BrokerApproval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not-started",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::DocumentsRequested => "documents-requested",
        };
        f.write_str(s)
    }
}

/// Domestic shipments skip the origin-certification requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentType {
    /// Within one customs territory.
    Domestic,
    /// Cross-border.
    International,
}

/// A broker's decision on a pending review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrokerDecision {
    /// Approve the shipment for token issuance.
    Approve,
    /// Reject the shipment.
    Reject,
    /// Ask the shipper for additional documents.
    RequestDocuments,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised when an illegal lifecycle transition is attempted.
///
/// Every variant aborts the operation with no partial mutation of the
/// aggregate.
#[derive(Error, Debug)]
pub enum StateConflictError {
    /// The transition is not allowed from the current status.
    #[error("invalid shipment transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Attempted target.
        to: String,
    },

    /// Broker review requested while the automated approval is not held.
    #[error("broker review requires automated approval; current ai approval: {ai_approval}")]
    BrokerReviewGate {
        /// The automated approval at the time of the request.
        ai_approval: String,
    },

    /// Token issuance requested without dual approval.
    #[error("token issuance requires dual approval (ai: {ai_approval}, broker: {broker_approval})")]
    DualApprovalGate {
        /// The automated approval at the time of the request.
        ai_approval: String,
        /// The broker approval at the time of the request.
        broker_approval: String,
    },

    /// The shipment is in a terminal status.
    #[error("shipment {shipment_id} is in terminal status {status}")]
    Terminal {
        /// The shipment identifier.
        shipment_id: String,
        /// The terminal status.
        status: String,
    },
}

// ─── Transition Record ───────────────────────────────────────────────

/// Record of a single lifecycle change, kept in an ordered audit log.
///
/// Approval changes that leave the status in place (a broker approval,
/// for example) are logged too — `from_status == to_status` with the
/// reason carrying what changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Status before the change.
    pub from_status: ShipmentStatus,
    /// Status after the change.
    pub to_status: ShipmentStatus,
    /// When the change occurred.
    pub timestamp: Timestamp,
    /// Why the change occurred.
    pub reason: String,
}

// ─── Shipment ────────────────────────────────────────────────────────

/// Attributes supplied when a shipment is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentDraft {
    /// Caller-facing reference, e.g. `"SHIP-2026-00042"`.
    pub reference_id: String,
    /// Destination country.
    pub destination_country: CountryCode,
    /// Declared HS code, expected as `dddd.dd.dd`.
    pub hs_code: String,
    /// Domestic or international.
    pub shipment_type: ShipmentType,
    /// Declared customs value.
    pub declared_value: f64,
    /// Gross weight in kilograms.
    pub weight_kg: f64,
    /// Number of units.
    pub quantity: u32,
    /// Free-text product description, screened against banned terms.
    pub product_description: String,
}

/// The shipment aggregate with its lifecycle state and audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    /// Unique shipment identifier.
    pub id: ShipmentId,
    /// Caller-facing reference.
    pub reference_id: String,
    /// Destination country.
    pub destination_country: CountryCode,
    /// Declared HS code.
    pub hs_code: String,
    /// Domestic or international.
    pub shipment_type: ShipmentType,
    /// Declared customs value.
    pub declared_value: f64,
    /// Gross weight in kilograms.
    pub weight_kg: f64,
    /// Number of units.
    pub quantity: u32,
    /// Free-text product description.
    pub product_description: String,
    /// Documents the shipment must carry, refreshed before each evaluation.
    pub required_documents: BTreeSet<DocumentKey>,
    /// Documents uploaded so far.
    pub uploaded_documents: BTreeMap<DocumentKey, DocumentMetadata>,
    /// Automated approval axis.
    pub ai_approval: AiApproval,
    /// Score of the last evaluation, if one has run.
    pub ai_score: Option<u8>,
    /// Per-check results of the last evaluation.
    pub ai_results: Vec<ValidationResult>,
    /// Human approval axis.
    pub broker_approval: BrokerApproval,
    /// Notes recorded with the last broker decision.
    pub broker_notes: Option<String>,
    /// Lifecycle status.
    pub status: ShipmentStatus,
    /// Issued pre-clearance token value, if any.
    pub token: Option<String>,
    /// When the token was issued.
    pub token_generated_at: Option<Timestamp>,
    /// Optimistic-concurrency guard; bumped by the repository on save.
    pub version: u64,
    /// When the shipment was created.
    pub created_at: Timestamp,
    /// Ordered log of all lifecycle changes.
    pub transitions: Vec<TransitionRecord>,
}

impl Shipment {
    /// Create a new shipment in `draft`.
    pub fn create(id: ShipmentId, draft: ShipmentDraft) -> Self {
        Self {
            id,
            reference_id: draft.reference_id,
            destination_country: draft.destination_country,
            hs_code: draft.hs_code,
            shipment_type: draft.shipment_type,
            declared_value: draft.declared_value,
            weight_kg: draft.weight_kg,
            quantity: draft.quantity,
            product_description: draft.product_description,
            required_documents: BTreeSet::new(),
            uploaded_documents: BTreeMap::new(),
            ai_approval: AiApproval::NotStarted,
            ai_score: None,
            ai_results: Vec::new(),
            broker_approval: BrokerApproval::NotStarted,
            broker_notes: None,
            status: ShipmentStatus::Draft,
            token: None,
            token_generated_at: None,
            version: 0,
            created_at: Timestamp::now(),
            transitions: Vec::new(),
        }
    }

    /// Replace the required-document set.
    ///
    /// Called by the coordinator with the resolver's output before an
    /// upload is assessed or an evaluation runs. Not a lifecycle
    /// transition — nothing is logged.
    pub fn set_required_documents(&mut self, documents: BTreeSet<DocumentKey>) {
        self.required_documents = documents;
    }

    /// Whether every required document has been uploaded.
    ///
    /// An empty required set means the set has not been resolved yet and
    /// does not count as complete.
    pub fn documents_complete(&self) -> bool {
        !self.required_documents.is_empty()
            && self
                .required_documents
                .iter()
                .all(|key| self.uploaded_documents.contains_key(key))
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Record a document upload.
    ///
    /// Legal while drafting, after an automated rejection (remediation),
    /// and after a broker document request. If the upload completes the
    /// required set of a `draft` shipment, the status advances to
    /// `documents-uploaded`.
    pub fn record_document_upload(
        &mut self,
        key: DocumentKey,
        metadata: DocumentMetadata,
    ) -> Result<Vec<DomainEvent>, StateConflictError> {
        self.require_status(
            &[
                ShipmentStatus::Draft,
                ShipmentStatus::DocumentsUploaded,
                ShipmentStatus::DocumentRequested,
                ShipmentStatus::AiReview,
            ],
            "document upload",
        )?;

        let recipient = if self.status == ShipmentStatus::DocumentRequested {
            RecipientRole::Broker
        } else {
            RecipientRole::Shipper
        };
        let mut events = vec![self.emit(
            DomainEventKind::DocumentUploaded,
            recipient,
            format!("Document uploaded: {key}"),
        )];

        self.uploaded_documents.insert(key, metadata);

        if self.status == ShipmentStatus::Draft && self.documents_complete() {
            self.do_transition(
                ShipmentStatus::DocumentsUploaded,
                "all required documents uploaded",
            );
            events.push(self.emit(
                DomainEventKind::DocumentsComplete,
                RecipientRole::Shipper,
                "All required documents are uploaded; ready for evaluation".to_string(),
            ));
        }

        Ok(events)
    }

    /// Mark an automated evaluation as in flight.
    ///
    /// Legal from `documents-uploaded`, from `ai-review` (re-run after
    /// remediation), and from `document-requested` (resubmission path
    /// that re-runs the evaluator).
    pub fn begin_evaluation(&mut self) -> Result<Vec<DomainEvent>, StateConflictError> {
        self.require_status(
            &[
                ShipmentStatus::DocumentsUploaded,
                ShipmentStatus::AiReview,
                ShipmentStatus::DocumentRequested,
            ],
            ShipmentStatus::AwaitingAi.as_str(),
        )?;

        self.ai_approval = AiApproval::Pending;
        self.do_transition(ShipmentStatus::AwaitingAi, "evaluation requested");
        Ok(vec![self.emit(
            DomainEventKind::EvaluationStarted,
            RecipientRole::Shipper,
            "Automated compliance evaluation started".to_string(),
        )])
    }

    /// Record the verdict of a completed evaluation.
    ///
    /// Requires that the shipment is still `awaiting-ai`: if it was
    /// cancelled while the evaluation ran, this returns a conflict and
    /// the caller discards the result.
    pub fn record_evaluation(
        &mut self,
        outcome: &EvaluationOutcome,
    ) -> Result<Vec<DomainEvent>, StateConflictError> {
        self.require_status(&[ShipmentStatus::AwaitingAi], ShipmentStatus::AiReview.as_str())?;

        self.ai_score = Some(outcome.score);
        self.ai_results = outcome.results.clone();
        self.ai_approval = if outcome.approved {
            AiApproval::Approved
        } else {
            AiApproval::Rejected
        };

        let (kind, message) = if outcome.approved {
            (
                DomainEventKind::AiApproved,
                format!("Automated evaluation approved (score {})", outcome.score),
            )
        } else {
            (
                DomainEventKind::AiRejected,
                format!("Automated evaluation rejected (score {})", outcome.score),
            )
        };

        self.do_transition(
            ShipmentStatus::AiReview,
            &format!("evaluation completed: score {}", outcome.score),
        );
        Ok(vec![self.emit(kind, RecipientRole::Shipper, message)])
    }

    /// Request a human broker review.
    ///
    /// **Gate:** the automated approval must be held — requesting a
    /// review on an unevaluated or rejected shipment is a conflict,
    /// never a silent correction. Legal from `ai-review`, from
    /// `document-requested` (resubmission path that goes straight back
    /// to the broker), and from `awaiting-broker` after a broker
    /// rejection (re-request following remediation).
    pub fn request_broker_review(&mut self) -> Result<Vec<DomainEvent>, StateConflictError> {
        self.check_not_terminal()?;

        if self.ai_approval != AiApproval::Approved {
            return Err(StateConflictError::BrokerReviewGate {
                ai_approval: self.ai_approval.to_string(),
            });
        }

        let re_request = self.status == ShipmentStatus::AwaitingBroker
            && self.broker_approval == BrokerApproval::Rejected;
        if !matches!(
            self.status,
            ShipmentStatus::AiReview | ShipmentStatus::DocumentRequested
        ) && !re_request
        {
            return Err(StateConflictError::InvalidTransition {
                from: self.status.to_string(),
                to: ShipmentStatus::AwaitingBroker.to_string(),
            });
        }

        self.broker_approval = BrokerApproval::Pending;
        self.do_transition(ShipmentStatus::AwaitingBroker, "broker review requested");
        Ok(vec![self.emit(
            DomainEventKind::BrokerReviewRequested,
            RecipientRole::Broker,
            format!("Shipment {} awaits broker review", self.reference_id),
        )])
    }

    /// Record the broker's decision on a pending review.
    pub fn record_broker_decision(
        &mut self,
        decision: BrokerDecision,
        notes: Option<String>,
    ) -> Result<Vec<DomainEvent>, StateConflictError> {
        self.require_status(&[ShipmentStatus::AwaitingBroker], "broker decision")?;
        if self.broker_approval != BrokerApproval::Pending {
            return Err(StateConflictError::InvalidTransition {
                from: format!("broker approval {}", self.broker_approval),
                to: "broker decision".to_string(),
            });
        }

        self.broker_notes = notes;
        let event = match decision {
            BrokerDecision::Approve => {
                self.broker_approval = BrokerApproval::Approved;
                self.do_transition(ShipmentStatus::AwaitingBroker, "broker approved");
                self.emit(
                    DomainEventKind::BrokerApproved,
                    RecipientRole::Shipper,
                    "Broker approved the shipment; token can be generated".to_string(),
                )
            }
            BrokerDecision::Reject => {
                self.broker_approval = BrokerApproval::Rejected;
                self.do_transition(ShipmentStatus::AwaitingBroker, "broker rejected");
                self.emit(
                    DomainEventKind::BrokerRejected,
                    RecipientRole::Shipper,
                    "Broker rejected the shipment".to_string(),
                )
            }
            BrokerDecision::RequestDocuments => {
                self.broker_approval = BrokerApproval::DocumentsRequested;
                self.do_transition(
                    ShipmentStatus::DocumentRequested,
                    "broker requested documents",
                );
                self.emit(
                    DomainEventKind::DocumentsRequested,
                    RecipientRole::Shipper,
                    "Broker requested additional documents".to_string(),
                )
            }
        };
        Ok(vec![event])
    }

    /// Record an issued pre-clearance token.
    ///
    /// **Gate:** both approvals must be held. Idempotent — recording on
    /// an already-tokenized shipment changes nothing and emits nothing.
    pub fn record_token(&mut self, token: &Token) -> Result<Vec<DomainEvent>, StateConflictError> {
        if self.status == ShipmentStatus::Cancelled {
            return Err(StateConflictError::Terminal {
                shipment_id: self.id.to_string(),
                status: self.status.to_string(),
            });
        }

        if self.token.is_some() {
            if self.status == ShipmentStatus::TokenGenerated {
                return Ok(Vec::new());
            }
            return Err(StateConflictError::InvalidTransition {
                from: self.status.to_string(),
                to: ShipmentStatus::TokenGenerated.to_string(),
            });
        }

        if self.ai_approval != AiApproval::Approved
            || self.broker_approval != BrokerApproval::Approved
        {
            return Err(StateConflictError::DualApprovalGate {
                ai_approval: self.ai_approval.to_string(),
                broker_approval: self.broker_approval.to_string(),
            });
        }

        self.token = Some(token.value.clone());
        self.token_generated_at = Some(token.issued_at);
        self.do_transition(ShipmentStatus::TokenGenerated, "pre-clearance token issued");
        Ok(vec![self.emit(
            DomainEventKind::TokenGenerated,
            RecipientRole::Shipper,
            format!("Pre-clearance token issued: {}", token.value),
        )])
    }

    /// Cancel the shipment.
    ///
    /// Legal from any non-terminal status. Whether a tokenized shipment
    /// may still be cancelled is the caller's policy (`allow_after_token`).
    pub fn cancel(&mut self, allow_after_token: bool) -> Result<Vec<DomainEvent>, StateConflictError> {
        match self.status {
            ShipmentStatus::Cancelled => Err(StateConflictError::Terminal {
                shipment_id: self.id.to_string(),
                status: self.status.to_string(),
            }),
            ShipmentStatus::TokenGenerated if !allow_after_token => {
                Err(StateConflictError::Terminal {
                    shipment_id: self.id.to_string(),
                    status: self.status.to_string(),
                })
            }
            _ => {
                self.do_transition(ShipmentStatus::Cancelled, "shipment cancelled");
                Ok(vec![self.emit(
                    DomainEventKind::ShipmentCancelled,
                    RecipientRole::Broker,
                    format!("Shipment {} was cancelled", self.reference_id),
                )])
            }
        }
    }

    // ── Guards and helpers ───────────────────────────────────────────

    /// Reject the operation if the shipment is terminal.
    fn check_not_terminal(&self) -> Result<(), StateConflictError> {
        if self.status.is_terminal() {
            return Err(StateConflictError::Terminal {
                shipment_id: self.id.to_string(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Validate that the status is one of `allowed`.
    fn require_status(
        &self,
        allowed: &[ShipmentStatus],
        target: &str,
    ) -> Result<(), StateConflictError> {
        self.check_not_terminal()?;
        if !allowed.contains(&self.status) {
            return Err(StateConflictError::InvalidTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        Ok(())
    }

    /// Record a lifecycle change in the audit log and apply it.
    fn do_transition(&mut self, to: ShipmentStatus, reason: &str) {
        self.transitions.push(TransitionRecord {
            from_status: self.status,
            to_status: to,
            timestamp: Timestamp::now(),
            reason: reason.to_string(),
        });
        self.status = to;
    }

    /// Build an event whose id is stable for the pending commit.
    ///
    /// `self.version` is the loaded version; the commit this operation
    /// produces will be `version + 1`, which uniquely identifies it.
    fn emit(&self, kind: DomainEventKind, recipient: RecipientRole, message: String) -> DomainEvent {
        DomainEvent::new(kind, self.id.clone(), self.version + 1, recipient, message)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
