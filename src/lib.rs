//! Tax Profile Wizard
//!
//! A financial intake wizard that:
//! - Walks a filer through Profile → Income → Deductions → Review
//! - Persists the whole profile on every edit and restores it on activation
//! - Builds the canonical profile payload the tax backend expects
//! - Drives three independent backend analyses (interpretation, tax, checklist)
//!
//! FLOW:
//! EDIT → COMMIT → REVIEW → INTERPRET | COMPUTE TAX | CHECKLIST

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod fields;
pub mod models;
pub mod orchestrator;
pub mod payload;
pub mod render;
pub mod state;
pub mod steps;
pub mod validation;
pub mod wizard;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use orchestrator::AnalysisOrchestrator;
pub use payload::{build, CanonicalProfilePayload};
pub use steps::{Step, StepController};
pub use wizard::FinancialWizard;
