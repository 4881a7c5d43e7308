//! Concurrency tests: at-most-one evaluation in flight per shipment
//! (coalescing), discard of results that arrive after cancellation, and
//! post-commit-only notification dispatch.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};

use common::{draft, harness_with_catalog, upload_all, INTERNATIONAL_DOCS};
use preclear_core::{CountryCode, ImportExportRule};
use preclear_state::{AiApproval, DomainEventKind, ShipmentStatus};
use preclear_workflow::{RuleCatalog, ShipmentRepository, WorkflowConfig, WorkflowError};

/// A catalog that blocks each lookup until the test releases a permit,
/// counting calls. Lets the test hold an evaluation "in flight".
struct GatedCatalog {
    gate: Semaphore,
    calls: AtomicUsize,
}

impl GatedCatalog {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn release_one(&self) {
        self.gate.add_permits(1);
    }

    async fn wait_for_call(&self, n: usize) {
        timeout(Duration::from_secs(5), async {
            while self.calls() < n {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("catalog was never called");
    }
}

#[async_trait]
impl RuleCatalog for GatedCatalog {
    async fn matching_rule(
        &self,
        _country_code: &CountryCode,
        _hs_code: &str,
    ) -> Result<Option<ImportExportRule>, WorkflowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        Ok(None)
    }
}

#[tokio::test]
async fn concurrent_evaluations_coalesce_onto_one_run() {
    let catalog = GatedCatalog::new();
    let h = harness_with_catalog(catalog.clone(), WorkflowConfig::default());
    let id = h.coordinator.create_shipment(draft()).await.unwrap();
    upload_all(&h, &id, &INTERNATIONAL_DOCS).await;
    let version_before = h.repository.load(&id).await.unwrap().version;

    let owner = tokio::spawn({
        let coordinator = h.coordinator.clone();
        let id = id.clone();
        async move { coordinator.evaluate(&id).await }
    });
    catalog.wait_for_call(1).await;

    // The second caller must join the in-flight run, not start another.
    let joiner = tokio::spawn({
        let coordinator = h.coordinator.clone();
        let id = id.clone();
        async move { coordinator.evaluate(&id).await }
    });
    sleep(Duration::from_millis(20)).await;
    assert_eq!(catalog.calls(), 1);

    catalog.release_one();
    let first = owner.await.unwrap().unwrap();
    let second = joiner.await.unwrap().unwrap();

    // One run, one outcome, no divergent commits.
    assert_eq!(first, second);
    assert_eq!(catalog.calls(), 1);

    let shipment = h.repository.load(&id).await.unwrap();
    // Exactly two commits for the single run: the marker and the verdict.
    assert_eq!(shipment.version, version_before + 2);
    let runs = shipment
        .transitions
        .iter()
        .filter(|t| t.to_status == ShipmentStatus::AwaitingAi)
        .count();
    assert_eq!(runs, 1);
}

#[tokio::test]
async fn sequential_evaluations_run_fresh() {
    let catalog = GatedCatalog::new();
    let h = harness_with_catalog(catalog.clone(), WorkflowConfig::default());
    let id = h.coordinator.create_shipment(draft()).await.unwrap();
    upload_all(&h, &id, &INTERNATIONAL_DOCS).await;

    catalog.release_one();
    h.coordinator.evaluate(&id).await.unwrap();

    // After the first run committed, a new call is a fresh run.
    catalog.release_one();
    h.coordinator.evaluate(&id).await.unwrap();
    assert_eq!(catalog.calls(), 2);
}

#[tokio::test]
async fn cancellation_mid_evaluation_discards_the_result() {
    let catalog = GatedCatalog::new();
    let h = harness_with_catalog(catalog.clone(), WorkflowConfig::default());
    let id = h.coordinator.create_shipment(draft()).await.unwrap();
    upload_all(&h, &id, &INTERNATIONAL_DOCS).await;

    let owner = tokio::spawn({
        let coordinator = h.coordinator.clone();
        let id = id.clone();
        async move { coordinator.evaluate(&id).await }
    });
    catalog.wait_for_call(1).await;

    // A joiner waiting on the same run must observe the discard too.
    let joiner = tokio::spawn({
        let coordinator = h.coordinator.clone();
        let id = id.clone();
        async move { coordinator.evaluate(&id).await }
    });
    // Let the joiner attach to the in-flight run before cancelling.
    sleep(Duration::from_millis(20)).await;

    // The marker committed, so the shipment is awaiting-ai and cancellable.
    h.coordinator.cancel_shipment(&id).await.unwrap();
    catalog.release_one();

    let owner_result = owner.await.unwrap();
    assert!(matches!(
        owner_result,
        Err(WorkflowError::EvaluationDiscarded(_))
    ));
    let joiner_result = joiner.await.unwrap();
    assert!(matches!(
        joiner_result,
        Err(WorkflowError::EvaluationDiscarded(_))
    ));

    // The late result was discarded on arrival: no verdict was committed.
    let shipment = h.repository.load(&id).await.unwrap();
    assert_eq!(shipment.status, ShipmentStatus::Cancelled);
    assert!(shipment.ai_results.is_empty());
    assert!(shipment.ai_score.is_none());
    assert_ne!(shipment.ai_approval, AiApproval::Approved);
}

#[tokio::test]
async fn no_verdict_notification_without_a_commit() {
    let catalog = GatedCatalog::new();
    let h = harness_with_catalog(catalog.clone(), WorkflowConfig::default());
    let id = h.coordinator.create_shipment(draft()).await.unwrap();
    upload_all(&h, &id, &INTERNATIONAL_DOCS).await;

    let owner = tokio::spawn({
        let coordinator = h.coordinator.clone();
        let id = id.clone();
        async move { coordinator.evaluate(&id).await }
    });
    catalog.wait_for_call(1).await;
    h.coordinator.cancel_shipment(&id).await.unwrap();
    catalog.release_one();
    let _ = owner.await.unwrap();

    // Committed operations notified; the discarded verdict did not.
    // 3 uploads + documents-complete + evaluation-started + cancelled.
    h.sink.wait_for(6).await;
    sleep(Duration::from_millis(20)).await;
    let kinds: Vec<_> = h.sink.events().iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&DomainEventKind::EvaluationStarted));
    assert!(kinds.contains(&DomainEventKind::ShipmentCancelled));
    assert!(!kinds.contains(&DomainEventKind::AiApproved));
    assert!(!kinds.contains(&DomainEventKind::AiRejected));
}

#[tokio::test]
async fn evaluations_on_different_shipments_run_concurrently() {
    let catalog = GatedCatalog::new();
    let h = harness_with_catalog(catalog.clone(), WorkflowConfig::default());

    let id_a = h.coordinator.create_shipment(draft()).await.unwrap();
    let id_b = h.coordinator.create_shipment(draft()).await.unwrap();
    upload_all(&h, &id_a, &INTERNATIONAL_DOCS).await;
    upload_all(&h, &id_b, &INTERNATIONAL_DOCS).await;

    let task_a = tokio::spawn({
        let coordinator = h.coordinator.clone();
        let id = id_a.clone();
        async move { coordinator.evaluate(&id).await }
    });
    let task_b = tokio::spawn({
        let coordinator = h.coordinator.clone();
        let id = id_b.clone();
        async move { coordinator.evaluate(&id).await }
    });

    // Both runs reach the catalog without waiting on each other.
    catalog.wait_for_call(2).await;
    catalog.release_one();
    catalog.release_one();

    assert!(task_a.await.unwrap().unwrap().approved);
    assert!(task_b.await.unwrap().unwrap().approved);
}
