//! Shared fixtures for the workflow integration tests.
#![allow(dead_code)] // each test binary uses a different subset

use std::sync::Arc;

use preclear_core::{CountryCode, DocumentKey, DocumentMetadata, ImportExportRule, ShipmentId, Timestamp};
use preclear_state::{ShipmentDraft, ShipmentType};
use preclear_workflow::{
    CollectingSink, InMemoryDocumentStore, InMemoryRuleCatalog, InMemoryShipmentRepository,
    RuleCatalog, WorkflowConfig, WorkflowCoordinator,
};

pub struct TestHarness {
    pub coordinator: Arc<WorkflowCoordinator>,
    pub repository: Arc<InMemoryShipmentRepository>,
    pub documents: Arc<InMemoryDocumentStore>,
    pub sink: Arc<CollectingSink>,
}

/// Harness over the in-memory collaborators with a fixed rule set.
pub fn harness(rules: Vec<ImportExportRule>, config: WorkflowConfig) -> TestHarness {
    harness_with_catalog(Arc::new(InMemoryRuleCatalog::new(rules)), config)
}

/// Harness with a caller-supplied rule catalog (for gated/blocking catalogs).
pub fn harness_with_catalog(catalog: Arc<dyn RuleCatalog>, config: WorkflowConfig) -> TestHarness {
    // RUST_LOG=debug surfaces the coordinator's tracing in test output.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let repository = Arc::new(InMemoryShipmentRepository::new());
    let documents = Arc::new(InMemoryDocumentStore::new());
    let sink = CollectingSink::shared();

    let coordinator = Arc::new(WorkflowCoordinator::new(
        repository.clone(),
        catalog,
        documents.clone(),
        sink.clone(),
        config,
    ));

    TestHarness {
        coordinator,
        repository,
        documents,
        sink,
    }
}

/// An international shipment draft with sane numbers (300 value/kg).
pub fn draft() -> ShipmentDraft {
    ShipmentDraft {
        reference_id: "SHIP-2026-00042".to_string(),
        destination_country: CountryCode::new("US").unwrap(),
        hs_code: "8518.30.20".to_string(),
        shipment_type: ShipmentType::International,
        declared_value: 12_000.0,
        weight_kg: 40.0,
        quantity: 200,
        product_description: "Wired headphones".to_string(),
    }
}

pub fn metadata() -> DocumentMetadata {
    DocumentMetadata {
        document_type: "pdf".to_string(),
        file_name: "upload.pdf".to_string(),
        uploaded_at: Timestamp::now(),
    }
}

/// Put each document into the store and record its upload.
pub async fn upload_all(harness: &TestHarness, id: &ShipmentId, names: &[&str]) {
    for name in names {
        let key = DocumentKey::new(name).unwrap();
        harness.documents.put(id.clone(), key.clone());
        harness
            .coordinator
            .upload_document(id, key, metadata())
            .await
            .unwrap();
    }
}

/// The baseline international document set.
pub const INTERNATIONAL_DOCS: [&str; 3] =
    ["Commercial Invoice", "Packing List", "Certificate of Origin"];
