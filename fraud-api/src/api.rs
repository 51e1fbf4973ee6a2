//! Fraud control API endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use fraud_core::{Analysis, FraudAnalyzer, FraudError, ModelInfo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Application state
pub struct AppState {
    pub analyzer: Arc<FraudAnalyzer>,
    /// Upper bound on messages per batch request
    pub max_batch: usize,
}

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }
    }
}

/// Message submitted for analysis
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub message: String,
}

/// Single analysis result
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub request_id: Uuid,
    pub checked_at: DateTime<Utc>,
    #[serde(flatten)]
    pub analysis: Analysis,
}

/// Batch entry; `verdict` is `fraud`, `legitimate`, `unknown` or `error`
#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub message: String,
    pub verdict: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch result
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub request_id: Uuid,
    pub checked_at: DateTime<Utc>,
    pub results: Vec<BatchItem>,
}

/// Error returned by handlers
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    unknown: bool,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            unknown: false,
        }
    }
}

impl From<FraudError> for ApiError {
    fn from(err: FraudError) -> Self {
        let (status, unknown) = match &err {
            FraudError::UntrainedModel | FraudError::IncompatibleArtifact(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, false)
            }
            FraudError::NoSignal => (StatusCode::UNPROCESSABLE_ENTITY, true),
            FraudError::SequenceLength { .. } => (StatusCode::BAD_REQUEST, false),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, false),
        };

        if err.is_request_scoped() {
            warn!("Request rejected: {}", err);
        } else {
            error!("Request failed: {}", err);
        }

        Self {
            status,
            message: err.to_string(),
            unknown,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = ApiResponse::<serde_json::Value>::error(&self.message);
        if self.unknown {
            body.data = Some(serde_json::json!({ "verdict": "unknown" }));
        }
        (self.status, Json(body)).into_response()
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/api/fraudcontrol/check", post(check_handler))
        .route("/api/fraudcontrol/analyze", post(analyze_handler))
        .route("/api/model", get(model_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let model_loaded = state.analyzer.store().is_loaded().await;
    Json(serde_json::json!({
        "status": "healthy",
        "service": "fraud-api",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": model_loaded,
    }))
}

/// POST /api/fraudcontrol/check
async fn check_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CheckResponse>>, ApiError> {
    let Json(request) = payload?;
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }

    let request_id = Uuid::new_v4();
    info!("📥 Check request {} ({} chars)", request_id, request.message.len());

    let analysis = state.analyzer.analyze(&request.message).await?;
    info!(
        "📤 Check {}: {} ({:.0}%) in {} ms",
        request_id, analysis.risk_level, analysis.fraud_percent, analysis.elapsed_ms
    );

    Ok(Json(ApiResponse::success(CheckResponse {
        request_id,
        checked_at: Utc::now(),
        analysis,
    })))
}

/// POST /api/fraudcontrol/analyze
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Vec<CheckRequest>>, JsonRejection>,
) -> Result<Json<ApiResponse<BatchResponse>>, ApiError> {
    let Json(requests) = payload?;
    if requests.is_empty() {
        return Err(ApiError::bad_request("at least one message is required"));
    }
    if requests.len() > state.max_batch {
        return Err(ApiError::bad_request(format!(
            "batch of {} messages exceeds the limit of {}",
            requests.len(),
            state.max_batch
        )));
    }

    let request_id = Uuid::new_v4();
    info!("📥 Batch request {} ({} messages)", request_id, requests.len());

    let outcomes = state
        .analyzer
        .analyze_batch(requests.into_iter().map(|r| r.message))
        .await;

    let results = outcomes
        .into_iter()
        .map(|outcome| match outcome.outcome {
            Ok(analysis) => BatchItem {
                message: outcome.message,
                verdict: if analysis.verdict.is_fraud {
                    "fraud"
                } else {
                    "legitimate"
                },
                analysis: Some(analysis),
                error: None,
            },
            Err(FraudError::NoSignal) => BatchItem {
                message: outcome.message,
                verdict: "unknown",
                analysis: None,
                error: Some(FraudError::NoSignal.to_string()),
            },
            Err(e) => BatchItem {
                message: outcome.message,
                verdict: "error",
                analysis: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    Ok(Json(ApiResponse::success(BatchResponse {
        request_id,
        checked_at: Utc::now(),
        results,
    })))
}

/// GET /api/model
async fn model_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<ModelInfo>>, ApiError> {
    let model = state.analyzer.store().snapshot().await?;
    Ok(Json(ApiResponse::success(model.info())))
}
