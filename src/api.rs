//! REST host for the wizard
//!
//! Exposes one wizard instance to the browser page that renders it, plus
//! pass-throughs for the peer screens.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::backend::{ChatRequest, HttpBackend};
use crate::error::WizardError;
use crate::fields::{fields_for, FieldKey};
use crate::models::{AnalysisKind, AnalysisResults, OperationStatus};
use crate::orchestrator::AnalysisOrchestrator;
use crate::payload::CanonicalProfilePayload;
use crate::steps::Step;
use crate::validation::Violation;
use crate::wizard::FinancialWizard;

/// =============================
/// Request / View Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct FieldEdit {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct FieldView {
    pub key: FieldKey,
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct WizardView {
    pub step: Step,
    pub step_index: usize,
    pub fields: Vec<FieldView>,
    pub payload: CanonicalProfilePayload,
    pub warnings: Vec<Violation>,
    pub results: AnalysisResults,
    pub status: HashMap<AnalysisKind, OperationStatus>,
    pub busy: bool,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub wizard: Arc<RwLock<FinancialWizard>>,
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub peers: Arc<HttpBackend>,
}

impl ApiState {
    pub fn new(wizard: FinancialWizard, peers: HttpBackend) -> Self {
        let orchestrator = wizard.orchestrator();
        Self {
            wizard: Arc::new(RwLock::new(wizard)),
            orchestrator,
            peers: Arc::new(peers),
        }
    }
}

async fn view(state: &ApiState) -> WizardView {
    let (step, step_index, fields, payload, warnings) = {
        let wizard = state.wizard.read().await;
        let step = wizard.current_step();
        let fields: Vec<FieldView> = fields_for(step)
            .iter()
            .map(|key| FieldView {
                key: *key,
                label: key.label(),
                value: key.display_value(wizard.profile()),
            })
            .collect();
        (
            step,
            wizard.step_index(),
            fields,
            wizard.payload(),
            wizard.warnings(),
        )
    };

    WizardView {
        step,
        step_index,
        fields,
        payload,
        warnings,
        results: state.orchestrator.results().await,
        status: state.orchestrator.statuses().await,
        busy: state.orchestrator.any_running().await,
    }
}

fn ok<T: Serialize>(data: T) -> ApiResult {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Wizard Endpoints
/// =============================

async fn get_wizard(State(state): State<ApiState>) -> ApiResult {
    ok(view(&state).await)
}

async fn edit_field(State(state): State<ApiState>, Json(req): Json<FieldEdit>) -> ApiResult {
    let outcome = match req.field.parse::<FieldKey>() {
        Ok(field) => state.wizard.write().await.set_field(field, &req.value),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(()) => ok(view(&state).await),
        Err(e @ (WizardError::UnknownField(_) | WizardError::InvalidValue { .. })) => {
            warn!(field = %req.field, error = %e, "Rejected field edit");
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string())))
        }
        Err(e) => {
            warn!(field = %req.field, error = %e, "Snapshot commit failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Could not save wizard state: {}", e))),
            )
        }
    }
}

async fn next_step(State(state): State<ApiState>) -> ApiResult {
    state.wizard.write().await.next();
    ok(view(&state).await)
}

async fn previous_step(State(state): State<ApiState>) -> ApiResult {
    state.wizard.write().await.back();
    ok(view(&state).await)
}

/// Snapshot the profile, release the lock, then run. The action runs on its
/// own task so a dropped request cannot cancel it between start and finish.
async fn run_action(state: &ApiState, kind: AnalysisKind) -> ApiResult {
    let profile = state.wizard.read().await.profile().clone();
    info!(%kind, "Action requested");

    let orchestrator = state.orchestrator.clone();
    let task = tokio::spawn(async move { orchestrator.run(kind, &profile).await });

    match task.await {
        Ok(()) => ok(view(state).await),
        Err(e) => {
            warn!(%kind, error = %e, "Action task aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Action {} did not complete", kind))),
            )
        }
    }
}

async fn interpret(State(state): State<ApiState>) -> ApiResult {
    run_action(&state, AnalysisKind::Interpret).await
}

async fn compute_tax(State(state): State<ApiState>) -> ApiResult {
    run_action(&state, AnalysisKind::ComputeTax).await
}

async fn checklist(State(state): State<ApiState>) -> ApiResult {
    run_action(&state, AnalysisKind::Checklist).await
}

/// =============================
/// Peer Screens
/// =============================

fn peer_failure(message: &str, e: WizardError) -> ApiResult {
    warn!(error = %e, "Peer request failed");
    (StatusCode::BAD_GATEWAY, Json(ApiResponse::error(message.to_string())))
}

async fn deductions(
    State(state): State<ApiState>,
    Json(profile): Json<CanonicalProfilePayload>,
) -> ApiResult {
    match state.peers.suggest_deductions(&profile).await {
        Ok(response) => ok(response),
        Err(e) => peer_failure(
            "Could not fetch suggestions. Check profile JSON and backend connectivity.",
            e,
        ),
    }
}

async fn form_preview(
    State(state): State<ApiState>,
    Json(profile): Json<CanonicalProfilePayload>,
) -> ApiResult {
    match state.peers.fill_form(&profile).await {
        Ok(response) => ok(response),
        Err(e) => peer_failure(
            "Could not fetch form preview. Check profile JSON and backend connectivity.",
            e,
        ),
    }
}

async fn chat(State(state): State<ApiState>, Json(req): Json<ChatRequest>) -> ApiResult {
    if req.user_input.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("No user message found".into())),
        );
    }
    match state.peers.chat(&req).await {
        Ok(response) => ok(response),
        Err(e) => peer_failure("Could not reach the assistant backend.", e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/wizard", get(get_wizard))
        .route("/api/wizard/fields", patch(edit_field))
        .route("/api/wizard/next", post(next_step))
        .route("/api/wizard/back", post(previous_step))
        .route("/api/wizard/interpret", post(interpret))
        .route("/api/wizard/compute_tax", post(compute_tax))
        .route("/api/wizard/checklist", post(checklist))
        .route("/api/deductions", post(deductions))
        .route("/api/form_preview", post(form_preview))
        .route("/api/chat", post(chat))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("Wizard host listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        AnalysisBackend, AnalyzeFinancialsResponse, FilingChecklistResponse,
        TaxComputationRequest, TaxComputationResponse,
    };
    use crate::orchestrator::TAX_FALLBACK;
    use crate::state::{InMemorySnapshotStore, PersistenceAdapter};
    use crate::Result;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt; // for `oneshot`

    struct ExplainingBackend;

    #[async_trait::async_trait]
    impl AnalysisBackend for ExplainingBackend {
        async fn analyze_financials(&self, _raw_text: &str) -> Result<AnalyzeFinancialsResponse> {
            Ok(AnalyzeFinancialsResponse {
                explanation: Some("Salaried resident, FY 2024-25.".to_string()),
                structured_financial_info: None,
            })
        }

        async fn calculate_tax(
            &self,
            _request: &TaxComputationRequest,
        ) -> Result<TaxComputationResponse> {
            Err(WizardError::MalformedResponse("/api/v1/calculate_tax".into()))
        }

        async fn filing_checklist(
            &self,
            _profile: &CanonicalProfilePayload,
        ) -> Result<FilingChecklistResponse> {
            Ok(FilingChecklistResponse::default())
        }
    }

    /// Answers the interpretation call only after a delay.
    struct SlowBackend {
        delay: std::time::Duration,
    }

    #[async_trait::async_trait]
    impl AnalysisBackend for SlowBackend {
        async fn analyze_financials(&self, raw_text: &str) -> Result<AnalyzeFinancialsResponse> {
            tokio::time::sleep(self.delay).await;
            ExplainingBackend.analyze_financials(raw_text).await
        }

        async fn calculate_tax(
            &self,
            request: &TaxComputationRequest,
        ) -> Result<TaxComputationResponse> {
            ExplainingBackend.calculate_tax(request).await
        }

        async fn filing_checklist(
            &self,
            profile: &CanonicalProfilePayload,
        ) -> Result<FilingChecklistResponse> {
            ExplainingBackend.filing_checklist(profile).await
        }
    }

    fn test_app() -> Router {
        app_with(Arc::new(ExplainingBackend))
    }

    fn app_with(backend: Arc<dyn AnalysisBackend>) -> Router {
        let orchestrator = Arc::new(AnalysisOrchestrator::new(backend));
        let wizard = FinancialWizard::activate(
            PersistenceAdapter::new(Box::new(InMemorySnapshotStore::new()), "test-key"),
            orchestrator,
        );
        let peers = HttpBackend::new("http://127.0.0.1:9", None).unwrap();
        create_router(ApiState::new(wizard, peers))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_get_wizard_starts_on_profile() {
        let app = test_app();
        let (status, body) = call(&app, "GET", "/api/wizard", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["step"], "profile");
        assert_eq!(body["data"]["fields"].as_array().unwrap().len(), 4);
        assert_eq!(body["data"]["payload"]["fy"], "2024-25");
        assert_eq!(body["data"]["busy"], false);
        assert_eq!(body["data"]["status"]["interpret"], "idle");
    }

    #[tokio::test]
    async fn test_field_edit_and_navigation() {
        let app = test_app();

        let (status, body) = call(
            &app,
            "PATCH",
            "/api/wizard/fields",
            Some(json!({"field": "section_80c", "value": "200000"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["payload"]["deductions"]["section_80c"], 200_000.0);
        assert_eq!(body["data"]["warnings"][0]["rule"], "deduction_caps");

        for _ in 0..5 {
            call(&app, "POST", "/api/wizard/next", None).await;
        }
        let (_, body) = call(&app, "GET", "/api/wizard", None).await;
        assert_eq!(body["data"]["step"], "review");
        assert_eq!(body["data"]["step_index"], 3);
        assert!(body["data"]["fields"].as_array().unwrap().is_empty());

        let (_, body) = call(&app, "POST", "/api/wizard/back", None).await;
        assert_eq!(body["data"]["step"], "deductions");
    }

    #[tokio::test]
    async fn test_bad_field_edits_are_rejected() {
        let app = test_app();

        let (status, body) = call(
            &app,
            "PATCH",
            "/api/wizard/fields",
            Some(json!({"field": "bonus", "value": "1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = call(
            &app,
            "PATCH",
            "/api/wizard/fields",
            Some(json!({"field": "regime_preference", "value": "flat"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_actions_fill_their_own_slots() {
        let app = test_app();

        let (status, body) = call(&app, "POST", "/api/wizard/compute_tax", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["results"]["tax_summary"]["old_regime"], Value::Null);
        assert_eq!(body["data"]["results"]["tax_summary"]["warnings"][0], TAX_FALLBACK);
        assert_eq!(body["data"]["status"]["compute_tax"], "failed");

        let (_, body) = call(&app, "POST", "/api/wizard/interpret", None).await;
        assert_eq!(
            body["data"]["results"]["interpretation"],
            "Salaried resident, FY 2024-25."
        );
        assert_eq!(body["data"]["status"]["interpret"], "succeeded");
        assert_eq!(body["data"]["busy"], false);

        let (_, body) = call(&app, "POST", "/api/wizard/checklist", None).await;
        assert_eq!(body["data"]["results"]["checklist"], Value::Null);
        assert_eq!(body["data"]["status"]["checklist"], "succeeded");
    }

    #[tokio::test]
    async fn test_chat_requires_input() {
        let app = test_app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/chat",
            Some(json!({"history": [], "user_input": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No user message found");
    }

    #[tokio::test]
    async fn test_action_survives_dropped_request() {
        let app = app_with(Arc::new(SlowBackend {
            delay: std::time::Duration::from_millis(300),
        }));

        let req = Request::builder()
            .method("POST")
            .uri("/api/wizard/interpret")
            .body(Body::empty())
            .unwrap();
        let gave_up = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            app.clone().oneshot(req),
        )
        .await;
        assert!(gave_up.is_err());

        let (_, body) = call(&app, "GET", "/api/wizard", None).await;
        assert_eq!(body["data"]["busy"], true);
        assert_eq!(body["data"]["status"]["interpret"], "running");

        tokio::time::sleep(std::time::Duration::from_millis(600)).await;

        let (_, body) = call(&app, "GET", "/api/wizard", None).await;
        assert_eq!(body["data"]["busy"], false);
        assert_eq!(body["data"]["status"]["interpret"], "succeeded");
        assert_eq!(
            body["data"]["results"]["interpretation"],
            "Salaried resident, FY 2024-25."
        );
    }
}
