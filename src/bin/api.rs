use tax_profile_wizard::{
    api::{start_server, ApiState},
    backend::HttpBackend,
    config::WizardConfig,
    orchestrator::AnalysisOrchestrator,
    state::{FileSnapshotStore, PersistenceAdapter},
    wizard::FinancialWizard,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();
    let config = WizardConfig::from_env();

    info!("Tax Profile Wizard - API Server");
    info!("Port: {}", config.port);
    info!("Backend: {}", config.backend_url);

    // Create components
    let backend = HttpBackend::new(&config.backend_url, config.backend_timeout)?;
    let orchestrator = Arc::new(AnalysisOrchestrator::new(Arc::new(backend.clone())));
    let store = FileSnapshotStore::open(&config.storage_dir)?;
    let persistence = PersistenceAdapter::new(Box::new(store), config.storage_key.clone());
    let wizard = FinancialWizard::activate(persistence, orchestrator);

    info!("Wizard initialized");

    start_server(ApiState::new(wizard, backend), config.port).await?;

    Ok(())
}
