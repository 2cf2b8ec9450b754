use tax_profile_wizard::{
    backend::HttpBackend,
    config::WizardConfig,
    orchestrator::AnalysisOrchestrator,
    render::{render_results, review_json},
    state::{FileSnapshotStore, PersistenceAdapter},
    wizard::FinancialWizard,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dotenv::dotenv().ok();
    let config = WizardConfig::from_env();

    // Create components
    let backend = Arc::new(HttpBackend::new(&config.backend_url, config.backend_timeout)?);
    let orchestrator = Arc::new(AnalysisOrchestrator::new(backend));
    let store = FileSnapshotStore::open(&config.storage_dir)?;
    let persistence = PersistenceAdapter::new(Box::new(store), config.storage_key.clone());
    let mut wizard = FinancialWizard::activate(persistence, orchestrator);

    while !matches!(wizard.current_step(), tax_profile_wizard::Step::Review) {
        wizard.next();
    }

    for violation in wizard.warnings() {
        warn!(rule = %violation.rule, "{}", violation.message);
    }

    println!("\n=== REVIEW PAYLOAD ===");
    println!("{}", review_json(&wizard.payload())?);

    info!(backend = %config.backend_url, "Running analyses");
    wizard.interpret().await;
    wizard.compute_tax().await;
    wizard.generate_checklist().await;

    println!("\n=== ANALYSIS ===");
    println!("{}", render_results(&wizard.orchestrator().results().await));

    Ok(())
}
