use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use rapture_common::ApiEnvelope;
use std::sync::Arc;

use super::cms_error_response;

/// GET /api/events
#[tracing::instrument(skip(state))]
pub async fn list_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.cms.list_events().await {
        Ok(events) => {
            let meta = events
                .meta
                .as_ref()
                .and_then(|m| serde_json::to_value(m).ok());
            Json(ApiEnvelope::ok(events.data).with_meta(meta)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to fetch events: {}", e);
            cms_error_response(e)
        }
    }
}

/// GET /api/events/{id}
#[tracing::instrument(skip(state))]
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.cms.get_event(&id).await {
        Ok(event) => Json(ApiEnvelope::ok(event)).into_response(),
        Err(e) => cms_error_response(e),
    }
}
