//! # Workflow Coordinator
//!
//! The public operations on a shipment. Every operation follows the
//! same shape:
//!
//! 1. load the current shipment and version,
//! 2. validate the transition through the state machine,
//! 3. apply the pure computation (evaluator / resolver / issuer),
//! 4. save conditioned on the unchanged version,
//! 5. publish the emitted domain events, fire-and-forget, after the
//!    commit succeeded.
//!
//! ## In-Flight Evaluation
//!
//! `evaluate` is the only slow operation. The coordinator keeps a
//! per-shipment registry of in-flight evaluations: the first caller
//! runs the evaluation and broadcasts the outcome on a `watch` channel;
//! concurrent callers await that channel and receive the same outcome.
//! If the run does not commit (the shipment was cancelled while the
//! evaluation was in flight, or the verdict write lost a version race),
//! the channel closes without a value and waiters observe the discard.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use preclear_core::{DocumentKey, DocumentMetadata, EvaluationOutcome, ShipmentId, Token};
use preclear_engine::{ComplianceEvaluator, DocumentRequirementResolver, TokenIssuer};
use preclear_state::{BrokerDecision, DomainEvent, Shipment, ShipmentDraft, ShipmentStatus};

use crate::config::WorkflowConfig;
use crate::contracts::{DocumentStore, NotificationSink, RuleCatalog, ShipmentRepository};
use crate::error::WorkflowError;

type OutcomeChannel = watch::Receiver<Option<EvaluationOutcome>>;

/// Coordinates the pre-clearance workflow for shipments.
pub struct WorkflowCoordinator {
    repository: Arc<dyn ShipmentRepository>,
    rules: Arc<dyn RuleCatalog>,
    documents: Arc<dyn DocumentStore>,
    notifications: Arc<dyn NotificationSink>,
    issuer: TokenIssuer,
    config: WorkflowConfig,
    in_flight: Mutex<HashMap<ShipmentId, OutcomeChannel>>,
}

impl WorkflowCoordinator {
    /// Build a coordinator over its collaborators.
    pub fn new(
        repository: Arc<dyn ShipmentRepository>,
        rules: Arc<dyn RuleCatalog>,
        documents: Arc<dyn DocumentStore>,
        notifications: Arc<dyn NotificationSink>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            repository,
            rules,
            documents,
            notifications,
            issuer: TokenIssuer::new(),
            config,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    // ── Public operations ────────────────────────────────────────────

    /// Create a new shipment in `draft`.
    pub async fn create_shipment(&self, draft: ShipmentDraft) -> Result<ShipmentId, WorkflowError> {
        let shipment = Shipment::create(ShipmentId::new(), draft);
        let id = shipment.id.clone();
        self.repository.insert(shipment).await?;
        tracing::info!(shipment_id = %id, "shipment created");
        Ok(id)
    }

    /// Run (or join) the automated compliance evaluation for a shipment.
    ///
    /// At most one evaluation is in flight per shipment. A call that
    /// finds one already running awaits its outcome instead of starting
    /// a second run.
    pub async fn evaluate(&self, id: &ShipmentId) -> Result<EvaluationOutcome, WorkflowError> {
        // Register as owner or join the in-flight run. The registry lock
        // is synchronous and never held across an await.
        enum Entry {
            Owner(watch::Sender<Option<EvaluationOutcome>>),
            Joiner(OutcomeChannel),
        }
        let entry = {
            let mut in_flight = self.in_flight.lock();
            if let Some(rx) = in_flight.get(id) {
                Entry::Joiner(rx.clone())
            } else {
                let (tx, rx) = watch::channel(None);
                in_flight.insert(id.clone(), rx);
                Entry::Owner(tx)
            }
        };

        let sender = match entry {
            Entry::Joiner(rx) => {
                tracing::debug!(shipment_id = %id, "joining in-flight evaluation");
                return Self::await_outcome(id, rx).await;
            }
            Entry::Owner(tx) => tx,
        };

        let result = self.run_evaluation(id).await;
        self.in_flight.lock().remove(id);
        match &result {
            Ok(outcome) => {
                // Waiters that joined before removal receive the outcome;
                // the channel keeps the value until every receiver is gone.
                let _ = sender.send(Some(outcome.clone()));
            }
            Err(error) => {
                tracing::warn!(shipment_id = %id, %error, "evaluation did not commit");
                drop(sender);
            }
        }
        result
    }

    /// Request a human broker review for an AI-approved shipment.
    pub async fn request_broker_review(&self, id: &ShipmentId) -> Result<(), WorkflowError> {
        let mut shipment = self.repository.load(id).await?;
        let events = shipment.request_broker_review()?;
        self.repository.save(&shipment, shipment.version).await?;
        tracing::info!(shipment_id = %id, "broker review requested");
        self.dispatch(events);
        Ok(())
    }

    /// Record the broker's decision on a pending review.
    pub async fn record_broker_decision(
        &self,
        id: &ShipmentId,
        decision: BrokerDecision,
        notes: Option<String>,
    ) -> Result<(), WorkflowError> {
        let mut shipment = self.repository.load(id).await?;
        let events = shipment.record_broker_decision(decision, notes)?;
        self.repository.save(&shipment, shipment.version).await?;
        tracing::info!(shipment_id = %id, ?decision, "broker decision recorded");
        self.dispatch(events);
        Ok(())
    }

    /// Record a document upload.
    ///
    /// The document must already be present in the document store; the
    /// shipment's required-document set is refreshed from the resolver
    /// before completeness is assessed.
    pub async fn upload_document(
        &self,
        id: &ShipmentId,
        key: DocumentKey,
        metadata: DocumentMetadata,
    ) -> Result<(), WorkflowError> {
        if !self.documents.exists(id, &key).await? {
            return Err(WorkflowError::DocumentMissing {
                shipment_id: id.clone(),
                key,
            });
        }

        let mut shipment = self.repository.load(id).await?;
        let rule = self
            .rules
            .matching_rule(&shipment.destination_country, &shipment.hs_code)
            .await?;
        shipment.set_required_documents(DocumentRequirementResolver::resolve(
            &shipment,
            rule.as_ref(),
        ));

        let events = shipment.record_document_upload(key, metadata)?;
        self.repository.save(&shipment, shipment.version).await?;
        self.dispatch(events);
        Ok(())
    }

    /// Generate the pre-clearance token for a dual-approved shipment.
    ///
    /// Idempotent: a second call returns the already-issued token
    /// without writing or notifying.
    pub async fn generate_token(&self, id: &ShipmentId) -> Result<Token, WorkflowError> {
        let mut shipment = self.repository.load(id).await?;
        if let (Some(value), Some(issued_at)) = (&shipment.token, shipment.token_generated_at) {
            return Ok(Token::new(value.clone(), issued_at));
        }

        let token = self.issuer.issue(&shipment)?;
        let events = shipment.record_token(&token)?;
        self.repository.save(&shipment, shipment.version).await?;
        tracing::info!(shipment_id = %id, token = %token.value, "pre-clearance token issued");
        self.dispatch(events);
        Ok(token)
    }

    /// Cancel a shipment.
    ///
    /// Allowed from any non-terminal status; whether a tokenized
    /// shipment may still be cancelled follows the configured policy.
    pub async fn cancel_shipment(&self, id: &ShipmentId) -> Result<(), WorkflowError> {
        let mut shipment = self.repository.load(id).await?;
        let events = shipment.cancel(self.config.allow_cancel_after_token)?;
        self.repository.save(&shipment, shipment.version).await?;
        tracing::info!(shipment_id = %id, "shipment cancelled");
        self.dispatch(events);
        Ok(())
    }

    // ── Evaluation internals ─────────────────────────────────────────

    /// The owner path: mark the shipment, run the checks, commit the
    /// verdict if the shipment is still awaiting it.
    async fn run_evaluation(&self, id: &ShipmentId) -> Result<EvaluationOutcome, WorkflowError> {
        // Phase 1: mark the evaluation in flight and commit the marker.
        let mut shipment = self.repository.load(id).await?;
        let started = shipment.begin_evaluation()?;
        self.repository.save(&shipment, shipment.version).await?;
        self.dispatch(started);

        // Phase 2: the only I/O of the run, then pure computation on the
        // snapshot just committed.
        let rule = self
            .rules
            .matching_rule(&shipment.destination_country, &shipment.hs_code)
            .await?;
        shipment.set_required_documents(DocumentRequirementResolver::resolve(
            &shipment,
            rule.as_ref(),
        ));
        let outcome = ComplianceEvaluator::evaluate(&shipment, rule.as_ref());

        // Phase 3: reload and commit the verdict. If the shipment moved
        // on (cancelled mid-flight), the result is discarded on arrival.
        let mut current = self.repository.load(id).await?;
        if current.status != ShipmentStatus::AwaitingAi {
            tracing::warn!(
                shipment_id = %id,
                status = %current.status,
                "shipment left awaiting-ai during evaluation; discarding result"
            );
            return Err(WorkflowError::EvaluationDiscarded(id.clone()));
        }
        current.set_required_documents(shipment.required_documents.clone());
        let events = current.record_evaluation(&outcome)?;
        self.repository.save(&current, current.version).await?;
        tracing::info!(
            shipment_id = %id,
            score = outcome.score,
            approved = outcome.approved,
            "evaluation committed"
        );
        self.dispatch(events);
        Ok(outcome)
    }

    /// The joiner path: wait for the in-flight run to broadcast.
    async fn await_outcome(
        id: &ShipmentId,
        mut rx: OutcomeChannel,
    ) -> Result<EvaluationOutcome, WorkflowError> {
        loop {
            let current = rx.borrow().clone();
            if let Some(outcome) = current {
                return Ok(outcome);
            }
            if rx.changed().await.is_err() {
                // Sender dropped. Either the outcome landed just before
                // the drop, or the run was discarded.
                let last = rx.borrow().clone();
                return match last {
                    Some(outcome) => Ok(outcome),
                    None => Err(WorkflowError::EvaluationDiscarded(id.clone())),
                };
            }
        }
    }

    // ── Notification dispatch ────────────────────────────────────────

    /// Publish events fire-and-forget. Called only after a successful
    /// commit; delivery is at-least-once and consumers deduplicate by
    /// event id.
    fn dispatch(&self, events: Vec<DomainEvent>) {
        for event in events {
            tracing::debug!(event_id = %event.id, kind = %event.kind, "dispatching notification");
            let sink = Arc::clone(&self.notifications);
            tokio::spawn(async move {
                sink.publish(event).await;
            });
        }
    }
}
