use crate::infra::AppState;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_staffing::error::AppError;
use tower_staffing::relay::{ImageRequest, VisionRelay};
use tower_staffing::workflows::import::{parse_model_text, CandidateBatch, ImportPreviewRow};
use tower_staffing::workflows::roster::{roster_router, RosterService, RosterStore};
use tracing::{info, warn};

/// Base64 phone screenshots routinely exceed axum's 2 MB default.
pub(crate) const MAX_SCREENSHOT_BODY_BYTES: usize = 15 * 1024 * 1024;

pub(crate) struct AnalyzeState<S> {
    pub(crate) service: Arc<RosterService<S>>,
    pub(crate) relay: Arc<dyn VisionRelay>,
}

/// Screenshot sent by the client; the default extraction prompt is used when `prompt` is blank.
#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeRequest {
    pub(crate) base64_data: String,
    pub(crate) media_type: String,
    #[serde(default)]
    pub(crate) prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnalyzeResponse {
    pub(crate) residents: CandidateBatch,
    pub(crate) preview: Vec<ImportPreviewRow>,
}

pub(crate) fn with_service_routes<S>(
    service: Arc<RosterService<S>>,
    relay: Arc<dyn VisionRelay>,
) -> Router
where
    S: RosterStore + 'static,
{
    let analyze = Router::new()
        .route("/api/v1/import/analyze", post(analyze_endpoint::<S>))
        .layer(DefaultBodyLimit::max(MAX_SCREENSHOT_BODY_BYTES))
        .with_state(Arc::new(AnalyzeState {
            service: service.clone(),
            relay,
        }));

    roster_router(service)
        .merge(analyze)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Sends the screenshot to the vision model and previews the parsed residents without saving.
pub(crate) async fn analyze_endpoint<S>(
    State(state): State<Arc<AnalyzeState<S>>>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError>
where
    S: RosterStore + 'static,
{
    let AnalyzeRequest {
        base64_data,
        media_type,
        prompt,
    } = payload;

    let mut request = ImageRequest::resident_scan(base64_data, media_type);
    if let Some(prompt) = prompt.filter(|prompt| !prompt.trim().is_empty()) {
        request.prompt = prompt;
    }

    let text = state.relay.analyze(&request).await.map_err(|err| {
        warn!(error = %err, rate_limited = err.is_rate_limited(), "screenshot analysis failed");
        err
    })?;
    let residents = parse_model_text(&text)?;
    let preview = state.service.preview(&residents)?;
    info!(candidates = residents.len(), "screenshot analyzed");

    Ok(Json(AnalyzeResponse { residents, preview }))
}
