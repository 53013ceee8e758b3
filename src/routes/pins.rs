// Pin registry handlers. Every change is flushed to the pin repo when one is configured.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::models::PinnedItem;

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    instance: Option<String>,
}

/// GET /api/pins?instance=: pins of one instance (active instance by default).
pub(super) async fn list_handler(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> impl IntoResponse {
    let instance = q.instance.unwrap_or_else(|| state.pins.active_instance());
    let pins = state.pins.all_pins_for_instance(&instance);
    Json(serde_json::json!({
        "instance": instance,
        "pins": pins,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ToggleBody {
    system_id: String,
    item: PinnedItem,
}

/// POST /api/pins/toggle: flip one pin; returns the new state.
pub(super) async fn toggle_handler(
    State(state): State<AppState>,
    Json(body): Json<ToggleBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.system_id.is_empty() {
        return Err(ApiError::BadRequest("systemId must be non-empty".into()));
    }
    if body.item.entity_name().is_some_and(str::is_empty) {
        return Err(ApiError::BadRequest("entity name must be non-empty".into()));
    }
    let pinned = state.pins.toggle(body.item.clone(), &body.system_id);
    tracing::debug!(system_id = %body.system_id, item = %body.item, pinned, "pin toggled");
    flush(&state).await;
    Ok(Json(serde_json::json!({
        "systemId": body.system_id,
        "item": body.item,
        "pinned": pinned,
    })))
}

/// DELETE /api/pins/systems/{id}: drop the active instance's pins for one system.
pub(super) async fn clear_system_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let removed = state.pins.clear_for_system(&id);
    flush(&state).await;
    Json(serde_json::json!({ "removed": removed }))
}

/// DELETE /api/pins: drop every pin of the active instance.
pub(super) async fn clear_all_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.pins.clear_all();
    flush(&state).await;
    axum::http::StatusCode::NO_CONTENT
}

async fn flush(state: &AppState) {
    let Some(repo) = &state.pin_repo else {
        return;
    };
    if let Err(e) = repo.save(&state.pins.snapshot()).await {
        tracing::warn!(error = %e, operation = "save_pins", "Failed to persist pins");
    }
}
