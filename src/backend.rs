//! Tax backend client
//!
//! Typed HTTP/JSON calls to the analysis service. Uses a long-lived
//! reqwest::Client for connection pooling. Response fields the wizard
//! reads are optional so a partial body never fails the call.

use crate::error::WizardError;
use crate::models::{RegimeResult, TaxRegime};
use crate::payload::CanonicalProfilePayload;
use crate::Result;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info};

pub const ANALYZE_PATH: &str = "/api/v1/analyze_financials";
pub const CALCULATE_TAX_PATH: &str = "/api/v1/calculate_tax";
pub const CHECKLIST_PATH: &str = "/api/v1/filing_checklist";
pub const SUGGEST_DEDUCTIONS_PATH: &str = "/api/v1/suggest_deductions";
pub const FILL_FORM_PATH: &str = "/api/v1/fill_form";
pub const CHAT_PATH: &str = "/api/v1/chat";
pub const HEALTH_PATH: &str = "/health";

//
// ================= Wire types =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeFinancialsRequest {
    pub raw_text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeFinancialsResponse {
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub structured_financial_info: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxComputationRequest {
    pub profile: CanonicalProfilePayload,
    /// Always serialized; `null` asks for both regimes.
    pub regime: Option<TaxRegime>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxComputationResponse {
    #[serde(default)]
    pub old_regime: Option<RegimeResult>,
    #[serde(default)]
    pub new_regime: Option<RegimeResult>,
    #[serde(default)]
    pub recommended_regime: Option<TaxRegime>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRequest {
    pub profile: CanonicalProfilePayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilingChecklistResponse {
    #[serde(default)]
    pub checklist_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeductionSuggestion {
    pub section: String,
    pub label: String,
    pub potential_amount: f64,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeductionSuggestionResponse {
    #[serde(default)]
    pub suggestions: Vec<DeductionSuggestion>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormPreviewResponse {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    pub user_input: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub reply: String,
}

//
// ================= Backend seam =================
//

/// The three calls the analysis orchestrator depends on.
#[async_trait::async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn analyze_financials(&self, raw_text: &str) -> Result<AnalyzeFinancialsResponse>;
    async fn calculate_tax(&self, request: &TaxComputationRequest) -> Result<TaxComputationResponse>;
    async fn filing_checklist(
        &self,
        profile: &CanonicalProfilePayload,
    ) -> Result<FilingChecklistResponse>;
}

/// HTTP client for the tax backend (connection-pooled)
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// `timeout` of `None` keeps the transport default.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(path, error = %e, "Backend request failed");
                WizardError::HttpError(e)
            })?;

        Self::decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(path, status = status.as_u16(), "Backend error response");
            return Err(WizardError::Backend {
                status: status.as_u16(),
                path: path.to_string(),
                body,
            });
        }

        response.json::<T>().await.map_err(|e| {
            error!(path, error = %e, "Failed to parse backend response");
            WizardError::MalformedResponse(path.to_string())
        })
    }

    /// Peer screen: rule-based deduction ideas for a profile.
    pub async fn suggest_deductions(
        &self,
        profile: &CanonicalProfilePayload,
    ) -> Result<DeductionSuggestionResponse> {
        let request = ProfileRequest {
            profile: profile.clone(),
        };
        self.post_json(SUGGEST_DEDUCTIONS_PATH, &request).await
    }

    /// Peer screen: ITR-style form fields. The profile is the whole body here.
    pub async fn fill_form(&self, profile: &CanonicalProfilePayload) -> Result<FormPreviewResponse> {
        self.post_json(FILL_FORM_PATH, profile).await
    }

    /// Peer screen: one chat turn with prior history.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.post_json(CHAT_PATH, request).await
    }

    pub async fn health(&self) -> Result<Value> {
        let url = format!("{}{}", self.base_url, HEALTH_PATH);
        let response = self.client.get(url).send().await?;
        Self::decode(HEALTH_PATH, response).await
    }
}

#[async_trait::async_trait]
impl AnalysisBackend for HttpBackend {
    async fn analyze_financials(&self, raw_text: &str) -> Result<AnalyzeFinancialsResponse> {
        info!(chars = raw_text.chars().count(), "Requesting AI interpretation");
        let request = AnalyzeFinancialsRequest {
            raw_text: raw_text.to_string(),
        };
        self.post_json(ANALYZE_PATH, &request).await
    }

    async fn calculate_tax(&self, request: &TaxComputationRequest) -> Result<TaxComputationResponse> {
        info!(regime = ?request.regime, "Requesting tax computation");
        self.post_json(CALCULATE_TAX_PATH, request).await
    }

    async fn filing_checklist(
        &self,
        profile: &CanonicalProfilePayload,
    ) -> Result<FilingChecklistResponse> {
        info!(fy = %profile.fy, "Requesting filing checklist");
        let request = ProfileRequest {
            profile: profile.clone(),
        };
        self.post_json(CHECKLIST_PATH, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileState;
    use crate::payload::build;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fake_backend() -> Router {
        Router::new()
            .route("/health", get(|| async { Json(json!({"status": "ok"})) }))
            .route(
                ANALYZE_PATH,
                post(|Json(body): Json<Value>| async move {
                    Json(json!({
                        "structured_financial_info": {},
                        "explanation": format!("echo: {}", body["raw_text"].as_str().unwrap_or("")),
                    }))
                }),
            )
            .route(
                CALCULATE_TAX_PATH,
                post(|Json(body): Json<Value>| async move {
                    let compared = body.get("regime") == Some(&Value::Null);
                    Json(json!({
                        "old_regime": {
                            "regime": "old",
                            "gross_total_income": body["profile"]["income"]["salary"],
                            "deductions": 0.0,
                            "taxable_income": 0.0,
                            "tax_before_cess": 0.0,
                            "cess": 0.0,
                            "total_tax": 0.0,
                            "effective_rate_percent": 0.0
                        },
                        "warnings": [format!("compared={}", compared)]
                    }))
                }),
            )
            .route(CHECKLIST_PATH, post(|| async { Json(json!({})) }))
            .route(
                FILL_FORM_PATH,
                post(|Json(body): Json<Value>| async move {
                    Json(json!({"fields": {"financial_year": body["fy"]}}))
                }),
            )
            .route(
                SUGGEST_DEDUCTIONS_PATH,
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "rules file missing") }),
            )
    }

    #[tokio::test]
    async fn test_analyze_financials_round_trip() {
        let base = spawn_backend(fake_backend()).await;
        let backend = HttpBackend::new(&format!("{}/", base), None).unwrap();

        let response = backend.analyze_financials("I am 30 years old").await.unwrap();
        assert_eq!(response.explanation.as_deref(), Some("echo: I am 30 years old"));
    }

    #[tokio::test]
    async fn test_calculate_tax_sends_null_regime() {
        let base = spawn_backend(fake_backend()).await;
        let backend = HttpBackend::new(&base, Some(Duration::from_secs(5))).unwrap();

        let request = TaxComputationRequest {
            profile: build(&ProfileState::default()),
            regime: None,
        };
        let response = backend.calculate_tax(&request).await.unwrap();

        assert_eq!(response.warnings, vec!["compared=true".to_string()]);
        let old = response.old_regime.unwrap();
        assert_eq!(old.regime, TaxRegime::Old);
        assert_eq!(old.gross_total_income, 1_200_000.0);
        assert!(response.new_regime.is_none());
    }

    #[tokio::test]
    async fn test_missing_fields_default() {
        let base = spawn_backend(fake_backend()).await;
        let backend = HttpBackend::new(&base, None).unwrap();

        let response = backend
            .filing_checklist(&build(&ProfileState::default()))
            .await
            .unwrap();
        assert!(response.checklist_text.is_none());
    }

    #[tokio::test]
    async fn test_error_status_surfaces() {
        let base = spawn_backend(fake_backend()).await;
        let backend = HttpBackend::new(&base, None).unwrap();

        let err = backend
            .suggest_deductions(&build(&ProfileState::default()))
            .await
            .unwrap_err();
        match err {
            WizardError::Backend { status, path, body } => {
                assert_eq!(status, 500);
                assert_eq!(path, SUGGEST_DEDUCTIONS_PATH);
                assert_eq!(body, "rules file missing");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_peer_calls() {
        let base = spawn_backend(fake_backend()).await;
        let backend = HttpBackend::new(&base, None).unwrap();

        let form = backend.fill_form(&build(&ProfileState::default())).await.unwrap();
        assert_eq!(form.fields.get("financial_year"), Some(&json!("2024-25")));

        let health = backend.health().await.unwrap();
        assert_eq!(health["status"], "ok");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_http_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new(&format!("http://{}", addr), None).unwrap();
        let err = backend.analyze_financials("hello").await.unwrap_err();
        assert!(matches!(err, WizardError::HttpError(_)));
    }
}
