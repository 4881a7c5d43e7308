//! # In-Memory Collaborators
//!
//! Reference implementations of the capability traits, backed by plain
//! maps behind synchronous mutexes. They exist for tests and local
//! development; production deployments supply their own catalog, store,
//! sink, and repository.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use preclear_core::{CountryCode, DocumentKey, ImportExportRule, ShipmentId};
use preclear_state::{DomainEvent, Shipment};

use crate::contracts::{DocumentStore, NotificationSink, RuleCatalog, ShipmentRepository};
use crate::error::WorkflowError;

// ─── Rule Catalog ────────────────────────────────────────────────────

/// A fixed rule set; the first matching rule wins.
#[derive(Debug, Default)]
pub struct InMemoryRuleCatalog {
    rules: Vec<ImportExportRule>,
}

impl InMemoryRuleCatalog {
    /// Build a catalog over a fixed rule set.
    pub fn new(rules: Vec<ImportExportRule>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl RuleCatalog for InMemoryRuleCatalog {
    async fn matching_rule(
        &self,
        country_code: &CountryCode,
        hs_code: &str,
    ) -> Result<Option<ImportExportRule>, WorkflowError> {
        Ok(self
            .rules
            .iter()
            .find(|rule| rule.matches(country_code, hs_code))
            .cloned())
    }
}

// ─── Document Store ──────────────────────────────────────────────────

/// Tracks which (shipment, key) pairs hold an uploaded file.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    objects: Mutex<HashSet<(ShipmentId, DocumentKey)>>,
}

impl InMemoryDocumentStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a file was stored for the shipment under this key.
    pub fn put(&self, shipment_id: ShipmentId, key: DocumentKey) {
        self.objects.lock().insert((shipment_id, key));
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn exists(
        &self,
        shipment_id: &ShipmentId,
        key: &DocumentKey,
    ) -> Result<bool, WorkflowError> {
        Ok(self
            .objects
            .lock()
            .contains(&(shipment_id.clone(), key.clone())))
    }
}

// ─── Notification Sink ───────────────────────────────────────────────

/// Collects published events, deduplicating by event id as the
/// at-least-once contract asks of consumers.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<DomainEvent>>,
    seen: Mutex<HashSet<String>>,
}

impl CollectingSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A shareable empty sink.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Snapshot of the deduplicated events, in arrival order.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }

    /// Number of deduplicated events received so far.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no events have arrived.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Await at least `count` deduplicated events.
    ///
    /// Dispatch is fire-and-forget, so tests poll rather than assume the
    /// spawned publishes have already run.
    pub async fn wait_for(&self, count: usize) {
        while self.len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl NotificationSink for CollectingSink {
    async fn publish(&self, event: DomainEvent) {
        if self.seen.lock().insert(event.id.clone()) {
            self.events.lock().push(event);
        }
    }
}

// ─── Shipment Repository ─────────────────────────────────────────────

/// Map-backed repository enforcing the optimistic version check.
#[derive(Debug, Default)]
pub struct InMemoryShipmentRepository {
    shipments: Mutex<HashMap<ShipmentId, Shipment>>,
}

impl InMemoryShipmentRepository {
    /// An empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShipmentRepository for InMemoryShipmentRepository {
    async fn insert(&self, shipment: Shipment) -> Result<(), WorkflowError> {
        let mut shipments = self.shipments.lock();
        if shipments.contains_key(&shipment.id) {
            return Err(WorkflowError::Collaborator(format!(
                "shipment {} already exists",
                shipment.id
            )));
        }
        shipments.insert(shipment.id.clone(), shipment);
        Ok(())
    }

    async fn load(&self, id: &ShipmentId) -> Result<Shipment, WorkflowError> {
        self.shipments
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(id.clone()))
    }

    async fn save(&self, shipment: &Shipment, expected_version: u64) -> Result<u64, WorkflowError> {
        let mut shipments = self.shipments.lock();
        let stored = shipments
            .get_mut(&shipment.id)
            .ok_or_else(|| WorkflowError::NotFound(shipment.id.clone()))?;

        if stored.version != expected_version {
            return Err(WorkflowError::Concurrency {
                shipment_id: shipment.id.clone(),
                expected: expected_version,
                actual: stored.version,
            });
        }

        let mut next = shipment.clone();
        next.version = expected_version + 1;
        let new_version = next.version;
        *stored = next;
        Ok(new_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preclear_state::{DomainEventKind, RecipientRole, ShipmentDraft, ShipmentType};

    fn make_shipment() -> Shipment {
        Shipment::create(
            ShipmentId::new(),
            ShipmentDraft {
                reference_id: "SHIP-1".to_string(),
                destination_country: CountryCode::new("US").unwrap(),
                hs_code: "8518.30.20".to_string(),
                shipment_type: ShipmentType::International,
                declared_value: 1_000.0,
                weight_kg: 10.0,
                quantity: 5,
                product_description: "Speakers".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_insert_then_load() {
        let repo = InMemoryShipmentRepository::new();
        let shipment = make_shipment();
        let id = shipment.id.clone();
        repo.insert(shipment).await.unwrap();
        let loaded = repo.load(&id).await.unwrap();
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.version, 0);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let repo = InMemoryShipmentRepository::new();
        let shipment = make_shipment();
        repo.insert(shipment.clone()).await.unwrap();
        assert!(repo.insert(shipment).await.is_err());
    }

    #[tokio::test]
    async fn test_load_unknown_is_not_found() {
        let repo = InMemoryShipmentRepository::new();
        assert!(matches!(
            repo.load(&ShipmentId::new()).await,
            Err(WorkflowError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_save_bumps_version() {
        let repo = InMemoryShipmentRepository::new();
        let shipment = make_shipment();
        let id = shipment.id.clone();
        repo.insert(shipment).await.unwrap();

        let loaded = repo.load(&id).await.unwrap();
        let new_version = repo.save(&loaded, loaded.version).await.unwrap();
        assert_eq!(new_version, 1);
        assert_eq!(repo.load(&id).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_stale_save_is_concurrency_error() {
        // Two operations load the same version; only the first commits.
        let repo = InMemoryShipmentRepository::new();
        let shipment = make_shipment();
        let id = shipment.id.clone();
        repo.insert(shipment).await.unwrap();

        let first = repo.load(&id).await.unwrap();
        let second = repo.load(&id).await.unwrap();
        repo.save(&first, first.version).await.unwrap();

        match repo.save(&second, second.version).await {
            Err(WorkflowError::Concurrency {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("expected Concurrency, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sink_deduplicates_by_event_id() {
        let sink = CollectingSink::new();
        let event = DomainEvent::new(
            DomainEventKind::AiApproved,
            ShipmentId::new(),
            1,
            RecipientRole::Shipper,
            "Automated evaluation approved".to_string(),
        );
        sink.publish(event.clone()).await;
        sink.publish(event).await;
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_document_store_roundtrip() {
        let store = InMemoryDocumentStore::new();
        let id = ShipmentId::new();
        let key = DocumentKey::new("Commercial Invoice").unwrap();
        assert!(!store.exists(&id, &key).await.unwrap());
        store.put(id.clone(), key.clone());
        assert!(store.exists(&id, &key).await.unwrap());
    }

    #[tokio::test]
    async fn test_catalog_first_match_wins() {
        use preclear_core::{HsCodeRange, RuleId};
        use std::collections::BTreeSet;

        let us = CountryCode::new("US").unwrap();
        let rule = |prefix: &str, max_value: Option<f64>| ImportExportRule {
            id: RuleId::new(),
            country_code: us.clone(),
            hs_range: HsCodeRange::prefix(prefix),
            required_documents: BTreeSet::new(),
            banned_product_terms: BTreeSet::new(),
            max_value,
            max_weight: None,
            active: true,
        };
        let catalog =
            InMemoryRuleCatalog::new(vec![rule("8518", Some(100.0)), rule("85", Some(200.0))]);

        let matched = catalog.matching_rule(&us, "8518.30.20").await.unwrap().unwrap();
        assert_eq!(matched.max_value, Some(100.0));

        let matched = catalog.matching_rule(&us, "8507.60.00").await.unwrap().unwrap();
        assert_eq!(matched.max_value, Some(200.0));

        assert!(catalog
            .matching_rule(&us, "9018.00.00")
            .await
            .unwrap()
            .is_none());
    }
}
