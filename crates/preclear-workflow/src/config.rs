//! # Workflow Configuration
//!
//! Policy knobs the product deliberately left open, carried as explicit
//! configuration rather than hard-coded behavior.

/// Configuration for a [`WorkflowCoordinator`](crate::WorkflowCoordinator).
#[derive(Debug, Clone, Default)]
pub struct WorkflowConfig {
    /// Whether a shipment may still be cancelled after its pre-clearance
    /// token was generated. Off by default: a tokenized shipment is
    /// treated as terminal unless the deployment opts in.
    pub allow_cancel_after_token: bool,
}
