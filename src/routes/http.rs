// HTTP handlers: version, model, diagnosis, remediation

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::atomic::Ordering;

use super::AppState;
use crate::error::DiagnosisError;
use crate::models::{Label, RemediationOutcome, RemediationState};
use crate::remediation::{self, RemediationAction};

/// Package version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name (from Cargo.toml).
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// JSON `{ "error": ... }` with a status code.
pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<DiagnosisError> for ApiError {
    fn from(e: DiagnosisError) -> Self {
        let status = match e {
            DiagnosisError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, e.to_string())
    }
}

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/status: model readiness, open diagnosis streams and per-label remediation states.
pub(super) async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let remediation: serde_json::Map<String, serde_json::Value> = state
        .service
        .dispatcher()
        .states()
        .into_iter()
        .map(|(label, s)| (label.slug(), serde_json::json!(s)))
        .collect();
    Json(serde_json::json!({
        "modelLoaded": state.service.classifier().is_loaded(),
        "wsClients": state.ws_connections.load(Ordering::Relaxed),
        "remediation": remediation,
    }))
}

/// GET /api/model: loaded model identity and its frozen columns.
pub(super) async fn model_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.classifier().info()?))
}

/// POST /api/diagnosis: samples a full window, so this takes `sampling.duration_secs`.
pub(super) async fn diagnosis_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.service.run_diagnosis().await?;
    Ok(Json(report))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RemediationEntry {
    #[serde(flatten)]
    action: RemediationAction,
    state: RemediationState,
}

/// GET /api/remediation: the catalogue with each label's current state.
pub(super) async fn remediation_list_handler(State(state): State<AppState>) -> impl IntoResponse {
    let dispatcher = state.service.dispatcher();
    let entries: Vec<RemediationEntry> = remediation::catalogue()
        .into_iter()
        .map(|action| RemediationEntry {
            state: dispatcher.state(action.label),
            action,
        })
        .collect();
    Json(entries)
}

/// GET /api/remediation/{label}
pub(super) async fn remediation_state_handler(
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let label = parse_label(&label)?;
    Ok(Json(RemediationEntry {
        action: remediation::action_for(label),
        state: state.service.dispatcher().state(label),
    }))
}

/// POST /api/remediation/{label}: 409 while the same label is still running.
pub(super) async fn remediation_dispatch_handler(
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> Result<Response, ApiError> {
    let label = parse_label(&label)?;
    let outcome = state.service.dispatch_remediation(label).await;
    let status = match outcome {
        RemediationOutcome::AlreadyRunning { .. } => StatusCode::CONFLICT,
        _ => StatusCode::OK,
    };
    Ok((status, Json(outcome)).into_response())
}

fn parse_label(raw: &str) -> Result<Label, ApiError> {
    raw.parse::<Label>()
        .map_err(|e| ApiError(StatusCode::BAD_REQUEST, e.to_string()))
}
