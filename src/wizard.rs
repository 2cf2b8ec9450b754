//! Financial profile wizard
//!
//! Owns the profile, the step position and the persistence handle. Every
//! edit goes through `update`, which commits the full snapshot before
//! returning.

use crate::fields::FieldKey;
use crate::models::{AnalysisKind, ProfileState, TaxSummary};
use crate::orchestrator::AnalysisOrchestrator;
use crate::payload::{build, CanonicalProfilePayload};
use crate::state::PersistenceAdapter;
use crate::steps::{Step, StepController};
use crate::validation::{validate, Violation};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub struct FinancialWizard {
    profile: ProfileState,
    steps: StepController,
    persistence: PersistenceAdapter,
    orchestrator: Arc<AnalysisOrchestrator>,
}

impl FinancialWizard {
    /// Hydrate from storage and start on the Profile step.
    pub fn activate(persistence: PersistenceAdapter, orchestrator: Arc<AnalysisOrchestrator>) -> Self {
        let profile = persistence.hydrate();
        info!(key = %persistence.key(), fy = %profile.financial_year, "Wizard activated");

        Self {
            profile,
            steps: StepController::new(),
            persistence,
            orchestrator,
        }
    }

    pub fn profile(&self) -> &ProfileState {
        &self.profile
    }

    /// Mutate the profile and commit the whole snapshot.
    pub fn update<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut ProfileState),
    {
        edit(&mut self.profile);
        self.commit()
    }

    /// Apply raw input for one field, then commit.
    pub fn set_field(&mut self, field: FieldKey, raw: &str) -> Result<()> {
        field.apply(&mut self.profile, raw)?;
        debug!(field = field.name(), "Field edited");
        self.commit()
    }

    /// Write the current profile through to storage.
    pub fn commit(&self) -> Result<()> {
        self.persistence.persist(&self.profile)
    }

    pub fn current_step(&self) -> Step {
        self.steps.current()
    }

    pub fn step_index(&self) -> usize {
        self.steps.index()
    }

    pub fn next(&mut self) -> Step {
        self.steps.next()
    }

    pub fn back(&mut self) -> Step {
        self.steps.back()
    }

    /// Fresh canonical payload for the Review step.
    pub fn payload(&self) -> CanonicalProfilePayload {
        build(&self.profile)
    }

    pub fn warnings(&self) -> Vec<Violation> {
        validate(&self.profile)
    }

    pub fn orchestrator(&self) -> Arc<AnalysisOrchestrator> {
        self.orchestrator.clone()
    }

    pub async fn run(&self, kind: AnalysisKind) {
        self.orchestrator.run(kind, &self.profile).await
    }

    pub async fn interpret(&self) -> Option<String> {
        self.orchestrator.interpret(&self.profile).await
    }

    pub async fn compute_tax(&self) -> TaxSummary {
        self.orchestrator.compute_tax(&self.profile).await
    }

    pub async fn generate_checklist(&self) -> Option<String> {
        self.orchestrator.generate_checklist(&self.profile).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        AnalysisBackend, AnalyzeFinancialsResponse, FilingChecklistResponse,
        TaxComputationRequest, TaxComputationResponse,
    };
    use crate::error::WizardError;
    use crate::models::{OperationStatus, ResidentStatus, TaxRegime};
    use crate::orchestrator::CHECKLIST_FALLBACK;
    use crate::state::{FileSnapshotStore, InMemorySnapshotStore, SnapshotStore};

    const KEY: &str = "tax-assistant-wizard-state-v1";

    struct OfflineBackend;

    #[async_trait::async_trait]
    impl AnalysisBackend for OfflineBackend {
        async fn analyze_financials(&self, _raw_text: &str) -> Result<AnalyzeFinancialsResponse> {
            Err(WizardError::StorageError("offline".into()))
        }

        async fn calculate_tax(
            &self,
            _request: &TaxComputationRequest,
        ) -> Result<TaxComputationResponse> {
            Err(WizardError::StorageError("offline".into()))
        }

        async fn filing_checklist(
            &self,
            _profile: &CanonicalProfilePayload,
        ) -> Result<FilingChecklistResponse> {
            Err(WizardError::StorageError("offline".into()))
        }
    }

    fn offline() -> Arc<AnalysisOrchestrator> {
        Arc::new(AnalysisOrchestrator::new(Arc::new(OfflineBackend)))
    }

    /// Shares one in-memory map between the wizard and the test.
    #[derive(Clone, Default)]
    struct SharedStore(Arc<InMemorySnapshotStore>);

    impl SnapshotStore for SharedStore {
        fn load(&self, key: &str) -> Result<Option<String>> {
            self.0.load(key)
        }

        fn save(&self, key: &str, value: &str) -> Result<()> {
            self.0.save(key, value)
        }
    }

    #[test]
    fn test_activation_does_not_write() {
        let store = SharedStore::default();
        let wizard = FinancialWizard::activate(
            PersistenceAdapter::new(Box::new(store.clone()), KEY),
            offline(),
        );

        assert_eq!(wizard.current_step(), Step::Profile);
        assert_eq!(wizard.profile(), &ProfileState::default());
        assert_eq!(store.load(KEY).unwrap(), None);
    }

    #[test]
    fn test_every_edit_persists_full_snapshot() {
        let store = SharedStore::default();
        let mut wizard = FinancialWizard::activate(
            PersistenceAdapter::new(Box::new(store.clone()), KEY),
            offline(),
        );

        wizard.set_field(FieldKey::Salary, "950000").unwrap();
        let first: serde_json::Value =
            serde_json::from_str(&store.load(KEY).unwrap().unwrap()).unwrap();
        assert_eq!(first["salary"], 950_000.0);
        assert_eq!(first["fy"], "2024-25");
        assert_eq!(first.as_object().unwrap().len(), 15);

        wizard
            .update(|p| p.regime_preference = Some(TaxRegime::Old))
            .unwrap();
        let second: serde_json::Value =
            serde_json::from_str(&store.load(KEY).unwrap().unwrap()).unwrap();
        assert_eq!(second["regimePref"], "old");
        assert_eq!(second["salary"], 950_000.0);
    }

    #[test]
    fn test_session_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileSnapshotStore::open(dir.path()).unwrap();
            let mut wizard =
                FinancialWizard::activate(PersistenceAdapter::new(Box::new(store), KEY), offline());
            wizard.set_field(FieldKey::Age, "52").unwrap();
            wizard
                .set_field(FieldKey::ResidentStatus, "non-resident")
                .unwrap();
            wizard.set_field(FieldKey::Section80d, "25000").unwrap();
            wizard.next();
            wizard.next();
        }

        let store = FileSnapshotStore::open(dir.path()).unwrap();
        let wizard =
            FinancialWizard::activate(PersistenceAdapter::new(Box::new(store), KEY), offline());

        assert_eq!(wizard.current_step(), Step::Profile);
        assert_eq!(wizard.profile().age, 52);
        assert_eq!(wizard.profile().resident_status, ResidentStatus::NonResident);
        assert_eq!(wizard.profile().deductions.section_80d, 25_000.0);
    }

    #[test]
    fn test_rejected_select_value_leaves_profile_untouched() {
        let store = SharedStore::default();
        let mut wizard = FinancialWizard::activate(
            PersistenceAdapter::new(Box::new(store.clone()), KEY),
            offline(),
        );

        assert!(wizard.set_field(FieldKey::ResidentStatus, "citizen").is_err());
        assert_eq!(wizard.profile().resident_status, ResidentStatus::Resident);
        assert_eq!(store.load(KEY).unwrap(), None);
    }

    #[test]
    fn test_warnings_do_not_block_payload() {
        let mut wizard = FinancialWizard::activate(
            PersistenceAdapter::new(Box::new(InMemorySnapshotStore::new()), KEY),
            offline(),
        );
        wizard.set_field(FieldKey::Rental, "-5000").unwrap();

        assert_eq!(wizard.warnings().len(), 1);
        assert_eq!(wizard.payload().income.rental, -5_000.0);
    }

    #[tokio::test]
    async fn test_actions_fall_back_when_offline() {
        let wizard = FinancialWizard::activate(
            PersistenceAdapter::new(Box::new(InMemorySnapshotStore::new()), KEY),
            offline(),
        );

        assert_eq!(wizard.generate_checklist().await.as_deref(), Some(CHECKLIST_FALLBACK));
        wizard.run(AnalysisKind::ComputeTax).await;

        let orchestrator = wizard.orchestrator();
        assert_eq!(
            orchestrator.status(AnalysisKind::ComputeTax).await,
            OperationStatus::Failed
        );
        assert!(orchestrator.results().await.tax_summary.is_some());
        assert!(!orchestrator.any_running().await);
    }
}
