//! # Document Requirement Resolver
//!
//! Derives the set of documents a shipment must carry: the universal
//! baseline, whatever the matched import/export rule demands, and the
//! origin certification for international shipments.
//!
//! The resolver is deterministic and side-effect free. It runs twice in
//! a shipment's life: before an evaluation (to refresh the shipment's
//! `required_documents`) and inside the documentation-completeness
//! check, so the two can never disagree.

use std::collections::BTreeSet;

use preclear_core::{DocumentKey, ImportExportRule};
use preclear_state::{Shipment, ShipmentType};

/// Documents every shipment must carry, regardless of rule or route.
pub const BASELINE_DOCUMENTS: [&str; 2] = ["Commercial Invoice", "Packing List"];

/// Required in addition for international shipments.
pub const CERTIFICATE_OF_ORIGIN: &str = "Certificate of Origin";

/// Stateless resolver for a shipment's required-document set.
#[derive(Debug, Clone, Copy)]
pub struct DocumentRequirementResolver;

impl DocumentRequirementResolver {
    /// Resolve the required-document set for a shipment.
    ///
    /// The returned set is ordered, so listings derived from it
    /// (missing-document suggestions, notification messages) are
    /// deterministic.
    pub fn resolve(
        shipment: &Shipment,
        matched_rule: Option<&ImportExportRule>,
    ) -> BTreeSet<DocumentKey> {
        let mut required: BTreeSet<DocumentKey> = BASELINE_DOCUMENTS
            .iter()
            .map(|name| DocumentKey::new(name).expect("baseline document names are non-empty"))
            .collect();

        if let Some(rule) = matched_rule {
            required.extend(rule.required_documents.iter().cloned());
        }

        if shipment.shipment_type == ShipmentType::International {
            required.insert(
                DocumentKey::new(CERTIFICATE_OF_ORIGIN)
                    .expect("origin certificate name is non-empty"),
            );
        }

        required
    }

    /// The required documents the shipment has not uploaded yet, in order.
    pub fn missing(
        shipment: &Shipment,
        matched_rule: Option<&ImportExportRule>,
    ) -> Vec<DocumentKey> {
        Self::resolve(shipment, matched_rule)
            .into_iter()
            .filter(|key| !shipment.uploaded_documents.contains_key(key))
            .collect()
    }
}
