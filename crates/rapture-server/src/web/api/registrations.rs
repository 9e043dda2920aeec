use crate::gate;
use crate::state::AppState;
use crate::web::api::middleware::AuthUser;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rapture_cms::{NewRegistration, RegistrationPatch};
use rapture_common::ApiEnvelope;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::{bad_request, cms_error_response, denial_response, unauthorized};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default, rename = "eventId")]
    pub event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub physical_address: String,
    #[serde(default)]
    pub number_of_participants: i64,
    #[serde(default)]
    pub event: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub physical_address: Option<String>,
    #[serde(default)]
    pub number_of_participants: Option<i64>,
}

fn caller_id(auth: &AuthUser) -> Option<i64> {
    auth.0.subject().and_then(|s| s.parse::<i64>().ok())
}

/// GET /api/event-registrations?eventId=...
///
/// Always scoped to the caller's own registrations; the user filter comes
/// from the token, never from the query.
#[tracing::instrument(skip(state, auth))]
pub async fn list_registrations(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let user_id = match caller_id(&auth) {
        Some(id) => id,
        None => return unauthorized("Unauthorized - no user ID in token"),
    };

    let event_id = match query.event_id.as_deref() {
        Some(id) if !id.is_empty() => id,
        _ => return bad_request("Event ID is required"),
    };

    match state.cms.list_registrations(event_id, user_id).await {
        Ok(registrations) => {
            let meta = registrations
                .meta
                .as_ref()
                .and_then(|m| serde_json::to_value(m).ok());
            Json(ApiEnvelope::ok(registrations.data).with_meta(meta)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to fetch registrations: {}", e);
            cms_error_response(e)
        }
    }
}

/// POST /api/event-registrations
#[tracing::instrument(skip(state, auth, req))]
pub async fn create_registration(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<CreateRequest>,
) -> impl IntoResponse {
    let user_id = match caller_id(&auth) {
        Some(id) => id,
        None => return unauthorized("Unauthorized - no user ID in token"),
    };

    if req.phone.is_empty() || req.physical_address.is_empty() || req.event.is_none() {
        return bad_request("All fields including event are required");
    }
    if req.number_of_participants < 1 {
        return bad_request("Number of participants must be at least 1");
    }

    let registration = NewRegistration {
        phone: req.phone,
        physical_address: req.physical_address,
        number_of_participants: req.number_of_participants,
        event: req.event.unwrap_or(Value::Null),
        // Owner comes from the token; a client-supplied user id is ignored.
        owner: user_id,
    };

    match state.cms.create_registration(&registration).await {
        Ok(created) => (StatusCode::CREATED, Json(ApiEnvelope::ok(created))).into_response(),
        Err(e) => {
            tracing::error!("Failed to create registration: {}", e);
            cms_error_response(e)
        }
    }
}

/// GET /api/event-registrations/{id}
#[tracing::instrument(skip(state))]
pub async fn get_registration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.cms.get_registration(&id).await {
        Ok(registration) => Json(ApiEnvelope::ok(registration)).into_response(),
        Err(e) => cms_error_response(e),
    }
}

/// PATCH /api/event-registrations/{id} -- owner only
#[tracing::instrument(skip(state, auth, req))]
pub async fn update_registration(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> impl IntoResponse {
    let patch = RegistrationPatch {
        phone: req.phone.filter(|s| !s.is_empty()),
        physical_address: req.physical_address.filter(|s| !s.is_empty()),
        number_of_participants: req.number_of_participants,
    };
    if patch.is_empty() {
        return bad_request("At least one field must be provided");
    }

    if let Err(denial) = gate::authorize_owner(&state.cms, &auth.0, &id).await {
        return denial_response(denial);
    }

    match state.cms.update_registration(&id, &patch).await {
        Ok(updated) => Json(ApiEnvelope::ok(updated)).into_response(),
        Err(e) => {
            tracing::error!("Failed to update registration {}: {}", id, e);
            cms_error_response(e)
        }
    }
}

/// DELETE /api/event-registrations/{id} -- owner only
#[tracing::instrument(skip(state, auth))]
pub async fn delete_registration(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err(denial) = gate::authorize_owner(&state.cms, &auth.0, &id).await {
        return denial_response(denial);
    }

    match state.cms.delete_registration(&id).await {
        Ok(()) => Json(ApiEnvelope::ok(Value::Null)).into_response(),
        Err(e) => {
            tracing::error!("Failed to delete registration {}: {}", id, e);
            cms_error_response(e)
        }
    }
}
