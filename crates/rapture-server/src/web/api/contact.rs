use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rapture_common::ApiEnvelope;
use serde::Deserialize;
use std::sync::Arc;

use super::{bad_request, cms_error_response};

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

/// POST /api/contact
#[tracing::instrument(skip(state, req))]
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ContactRequest>,
) -> impl IntoResponse {
    if req.email.is_empty() || req.message.is_empty() {
        return bad_request("Email and message are required");
    }
    if !req.email.contains('@') {
        return bad_request("Please provide a valid email address");
    }
    if req.message.trim().is_empty() {
        return bad_request("Message cannot be empty");
    }

    match state.cms.create_contact(&req.email, &req.message).await {
        Ok(data) => (
            StatusCode::CREATED,
            Json(ApiEnvelope::ok_with_message(
                data,
                "Your message has been sent successfully!",
            )),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to store contact message: {}", e);
            cms_error_response(e)
        }
    }
}
