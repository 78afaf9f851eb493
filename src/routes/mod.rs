// HTTP + WebSocket routes

mod http;
mod ws;

pub use http::{NAME, VERSION};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use crate::models::DiagnosisEvent;
use crate::pipeline::SharedService;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) service: SharedService,
    pub(crate) events_tx: broadcast::Sender<DiagnosisEvent>,
    pub(crate) ws_connections: Arc<AtomicUsize>,
}

pub fn app(
    service: SharedService,
    events_tx: broadcast::Sender<DiagnosisEvent>,
    ws_connections: Arc<AtomicUsize>,
) -> Router {
    let state = AppState {
        service,
        events_tx,
        ws_connections,
    };
    Router::new()
        .route("/", get(|| async { "netdiag: network diagnosis service" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/status", get(http::status_handler)) // GET /api/status
        .route("/api/model", get(http::model_handler)) // GET /api/model
        .route("/api/diagnosis", post(http::diagnosis_handler)) // POST /api/diagnosis
        .route("/api/remediation", get(http::remediation_list_handler)) // GET /api/remediation
        .route(
            "/api/remediation/{label}",
            get(http::remediation_state_handler).post(http::remediation_dispatch_handler),
        ) // GET, POST /api/remediation/{label}
        .route("/ws/diagnosis", get(ws::ws_diagnosis)) // WS /ws/diagnosis
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
