//! Analysis orchestrator
//!
//! Runs the three Review-step actions against the backend. Each action owns
//! one result slot and one status entry; a failed call stores a fixed
//! fallback instead of surfacing an error.

use crate::backend::{AnalysisBackend, TaxComputationRequest};
use crate::models::{AnalysisKind, AnalysisResults, OperationStatus, ProfileState, TaxSummary};
use crate::payload::build;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const INTERPRET_FALLBACK: &str =
    "Could not reach backend for AI analysis. Check FastAPI/Ollama are running.";
pub const TAX_FALLBACK: &str =
    "Could not reach backend for tax computation. Check FastAPI/Ollama are running.";
pub const CHECKLIST_FALLBACK: &str =
    "Could not contact backend for checklist generation. Please verify FastAPI/Ollama are running.";

/// Sentence sent to the interpretation endpoint. Built from the raw profile
/// fields rather than the canonical payload.
pub fn interpretation_text(profile: &ProfileState) -> String {
    let income = &profile.income;
    let deductions = &profile.deductions;

    let mut text = format!(
        "For FY {}, I am {} years old, {}, with salary income of ₹{}, business income ₹{}, \
         interest ₹{}, rental ₹{}, capital gains ₹{}, other income ₹{}. \
         I invest ₹{} under 80C, pay ₹{} under 80D, home loan interest ₹{}, NPS ₹{}, \
         and other deductions ₹{}.",
        profile.financial_year,
        profile.age,
        profile.resident_status,
        income.salary,
        income.business,
        income.interest,
        income.rental,
        income.capital_gains,
        income.other,
        deductions.section_80c,
        deductions.section_80d,
        deductions.section_24b,
        deductions.nps_80ccd1b,
        deductions.other,
    );

    match profile.regime_preference {
        Some(regime) => text.push_str(&format!(" I prefer the {} regime.", regime)),
        None => text.push_str(" I have no regime preference."),
    }

    text
}

/// Runs in flight for one action plus the outcome of the last one to finish.
#[derive(Debug, Clone, Copy, Default)]
struct OperationSlot {
    in_flight: usize,
    last: OperationStatus,
}

impl OperationSlot {
    fn status(&self) -> OperationStatus {
        if self.in_flight > 0 {
            OperationStatus::Running
        } else {
            self.last
        }
    }
}

pub struct AnalysisOrchestrator {
    backend: Arc<dyn AnalysisBackend>,
    results: RwLock<AnalysisResults>,
    status: RwLock<HashMap<AnalysisKind, OperationSlot>>,
}

impl AnalysisOrchestrator {
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        Self {
            backend,
            results: RwLock::new(AnalysisResults::default()),
            status: RwLock::new(HashMap::new()),
        }
    }

    /// Run one action by kind.
    pub async fn run(&self, kind: AnalysisKind, profile: &ProfileState) {
        match kind {
            AnalysisKind::Interpret => {
                self.interpret(profile).await;
            }
            AnalysisKind::ComputeTax => {
                self.compute_tax(profile).await;
            }
            AnalysisKind::Checklist => {
                self.generate_checklist(profile).await;
            }
        }
    }

    /// AI interpretation. Starting a run clears any previous checklist.
    pub async fn interpret(&self, profile: &ProfileState) -> Option<String> {
        let kind = AnalysisKind::Interpret;
        self.begin(kind).await;
        self.results.write().await.checklist = None;

        let raw_text = interpretation_text(profile);
        let started = Instant::now();

        let (explanation, outcome) = match self.backend.analyze_financials(&raw_text).await {
            Ok(response) => (response.explanation, OperationStatus::Succeeded),
            Err(e) => {
                warn!(%kind, error = %e, "Interpretation failed, storing fallback");
                (Some(INTERPRET_FALLBACK.to_string()), OperationStatus::Failed)
            }
        };

        self.results.write().await.interpretation = explanation.clone();
        self.finish(kind, outcome, started).await;
        explanation
    }

    /// Tax computation for both regimes. The filer's regime preference is
    /// not forwarded: the backend always compares.
    pub async fn compute_tax(&self, profile: &ProfileState) -> TaxSummary {
        let kind = AnalysisKind::ComputeTax;
        self.begin(kind).await;

        let request = TaxComputationRequest {
            profile: build(profile),
            regime: None,
        };
        let started = Instant::now();

        let (summary, outcome) = match self.backend.calculate_tax(&request).await {
            Ok(response) => (
                TaxSummary {
                    old: response.old_regime,
                    new: response.new_regime,
                    warnings: response.warnings,
                },
                OperationStatus::Succeeded,
            ),
            Err(e) => {
                warn!(%kind, error = %e, "Tax computation failed, storing fallback");
                (
                    TaxSummary {
                        old: None,
                        new: None,
                        warnings: vec![TAX_FALLBACK.to_string()],
                    },
                    OperationStatus::Failed,
                )
            }
        };

        self.results.write().await.tax_summary = Some(summary.clone());
        self.finish(kind, outcome, started).await;
        summary
    }

    pub async fn generate_checklist(&self, profile: &ProfileState) -> Option<String> {
        let kind = AnalysisKind::Checklist;
        self.begin(kind).await;

        let payload = build(profile);
        let started = Instant::now();

        let (checklist, outcome) = match self.backend.filing_checklist(&payload).await {
            Ok(response) => (response.checklist_text, OperationStatus::Succeeded),
            Err(e) => {
                warn!(%kind, error = %e, "Checklist generation failed, storing fallback");
                (Some(CHECKLIST_FALLBACK.to_string()), OperationStatus::Failed)
            }
        };

        self.results.write().await.checklist = checklist.clone();
        self.finish(kind, outcome, started).await;
        checklist
    }

    pub async fn results(&self) -> AnalysisResults {
        self.results.read().await.clone()
    }

    pub async fn status(&self, kind: AnalysisKind) -> OperationStatus {
        self.status
            .read()
            .await
            .get(&kind)
            .map(OperationSlot::status)
            .unwrap_or_default()
    }

    pub async fn statuses(&self) -> HashMap<AnalysisKind, OperationStatus> {
        let status = self.status.read().await;
        AnalysisKind::ALL
            .iter()
            .map(|kind| {
                let current = status.get(kind).map(OperationSlot::status).unwrap_or_default();
                (*kind, current)
            })
            .collect()
    }

    /// Unified spinner view over all actions.
    pub async fn any_running(&self) -> bool {
        self.status
            .read()
            .await
            .values()
            .any(|slot| slot.in_flight > 0)
    }

    async fn begin(&self, kind: AnalysisKind) {
        info!(%kind, "Analysis started");
        self.status.write().await.entry(kind).or_default().in_flight += 1;
    }

    async fn finish(&self, kind: AnalysisKind, outcome: OperationStatus, started: Instant) {
        let remaining = {
            let mut status = self.status.write().await;
            let slot = status.entry(kind).or_default();
            slot.in_flight = slot.in_flight.saturating_sub(1);
            slot.last = outcome;
            slot.in_flight
        };
        info!(
            %kind,
            status = ?outcome,
            still_running = remaining,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis finished"
        );
    }
}

//
// ================= Tests =================
//
