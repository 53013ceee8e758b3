// HTTP + WebSocket routes for the rendering layer

mod http;
mod pins;
mod ws;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::dashboard::{DashboardState, DashboardUpdate};
use crate::pin_repo::PinRepo;
use crate::pins::PinRegistry;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) dashboard: Arc<DashboardState>,
    pub(crate) pins: Arc<PinRegistry>,
    pub(crate) pin_repo: Option<Arc<PinRepo>>,
    pub(crate) updates_tx: broadcast::Sender<DashboardUpdate>,
    pub(crate) refresh_tx: mpsc::Sender<()>,
    pub(crate) config: AppConfig,
}

/// Shared handles the router needs.
pub struct AppDeps {
    pub dashboard: Arc<DashboardState>,
    pub pins: Arc<PinRegistry>,
    /// Pins are flushed here after every change; `None` keeps them in memory only.
    pub pin_repo: Option<Arc<PinRepo>>,
    pub updates_tx: broadcast::Sender<DashboardUpdate>,
    pub refresh_tx: mpsc::Sender<()>,
}

pub fn app(deps: AppDeps, config: AppConfig) -> Router {
    let state = AppState {
        dashboard: deps.dashboard,
        pins: deps.pins,
        pin_repo: deps.pin_repo,
        updates_tx: deps.updates_tx,
        refresh_tx: deps.refresh_tx,
        config,
    };
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/systems", get(http::systems_handler)) // GET /api/systems
        .route("/api/systems/{id}/host", get(http::host_chart_handler))
        .route(
            "/api/systems/{id}/entities/stacked",
            get(http::entity_stack_handler),
        )
        .route(
            "/api/systems/{id}/entities/lines",
            get(http::entity_lines_handler),
        )
        .route(
            "/api/systems/{id}/entities/summary",
            get(http::entity_summary_handler),
        )
        .route("/api/refresh", post(http::refresh_handler)) // POST /api/refresh
        .route("/api/pins", get(pins::list_handler).delete(pins::clear_all_handler))
        .route("/api/pins/toggle", post(pins::toggle_handler))
        .route("/api/pins/systems/{id}", delete(pins::clear_system_handler))
        .route("/ws/updates", get(ws::ws_updates)) // WS /ws/updates
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

/// Error body: `{"error": "..."}`.
#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<crate::error::AnalyticsError> for ApiError {
    fn from(e: crate::error::AnalyticsError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}
