// GET handlers: version, system status, chart views; POST refresh

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::TimeDelta;
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::aggregate::{DomainOrder, MetricSelector};
use crate::downsample::{self, Reducer};
use crate::error::AnalyticsError;
use crate::version::{NAME, VERSION};

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/systems: per-system status of the last applied cycle.
pub(super) async fn systems_handler(State(state): State<AppState>) -> impl IntoResponse {
    let dashboard = &state.dashboard;
    Json(serde_json::json!({
        "instance": state.config.instance.id,
        "cycle": dashboard.cycle().await,
        "fetchedAt": dashboard.fetched_at().await,
        "systems": dashboard.statuses().await,
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct HostChartQuery {
    bucket_secs: Option<i64>,
    reducer: Option<String>,
}

/// GET /api/systems/{id}/host: host series, downsampled to `bucket_secs` or to the point budget.
pub(super) async fn host_chart_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<HostChartQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let reducer = match q.reducer.as_deref() {
        Some(r) => r.parse::<Reducer>()?,
        None => state.config.charts.reducer,
    };
    let bucket = match q.bucket_secs {
        Some(secs) => Some(TimeDelta::try_seconds(secs).ok_or_else(|| {
            AnalyticsError::InvalidParameter {
                name: "bucket_secs",
                reason: format!("out of range: {}", secs),
            }
        })?),
        None => state
            .dashboard
            .host_span(&id)
            .await
            .and_then(|span| downsample::bucket_width_for(span, state.config.charts.max_points)),
    };
    let points = state
        .dashboard
        .host_chart(&id, bucket, reducer)
        .await?
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(serde_json::json!({
        "systemId": id,
        "bucketSecs": bucket.map(|b| b.num_seconds()),
        "points": points,
    })))
}

#[derive(Debug, Deserialize)]
pub(super) struct EntityQuery {
    metric: Option<String>,
    order: Option<String>,
}

impl EntityQuery {
    fn metric(&self) -> Result<MetricSelector, ApiError> {
        Ok(match self.metric.as_deref() {
            Some(m) => m.parse()?,
            None => MetricSelector::default(),
        })
    }

    fn order(&self, default: DomainOrder) -> Result<DomainOrder, ApiError> {
        Ok(match self.order.as_deref() {
            Some(o) => o.parse()?,
            None => default,
        })
    }
}

/// GET /api/systems/{id}/entities/stacked: domain + stacked bands.
pub(super) async fn entity_stack_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<EntityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let metric = q.metric()?;
    let order = q.order(state.config.charts.domain_order)?;
    let chart = state
        .dashboard
        .entity_stack(&id, metric, order)
        .await
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(chart))
}

/// GET /api/systems/{id}/entities/lines: one scalar per entity and timestamp.
pub(super) async fn entity_lines_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<EntityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let metric = q.metric()?;
    let order = q.order(state.config.charts.domain_order)?;
    let lines = state
        .dashboard
        .entity_lines(&id, metric, order)
        .await
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(lines))
}

/// GET /api/systems/{id}/entities/summary: latest / average / peak per entity.
pub(super) async fn entity_summary_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<EntityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let metric = q.metric()?;
    let summary = state
        .dashboard
        .entity_summary(&id, metric)
        .await
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(summary))
}

/// POST /api/refresh: queue a refresh cycle; a pending request absorbs duplicates.
pub(super) async fn refresh_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.refresh_tx.try_send(()) {
        Ok(()) | Err(tokio::sync::mpsc::error::TrySendError::Full(())) => StatusCode::ACCEPTED,
        Err(tokio::sync::mpsc::error::TrySendError::Closed(())) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("no data for system {}", id))
}
