use crate::session::{self, OAuthProfile, public_user};
use crate::state::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use rapture_common::ApiEnvelope;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{bad_request, cms_error_response};

/// Profile fields posted by the OAuth sign-in flow.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCallbackRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub google_id: String,
}

/// POST /api/auth/oauth/google/callback
///
/// Bridges a Google profile to a CMS user: finds or provisions the
/// record, then returns the normalized session.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn google_callback(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoogleCallbackRequest>,
) -> impl IntoResponse {
    if req.email.is_empty() {
        return bad_request("Email is required");
    }
    if req.google_id.is_empty() {
        return bad_request("Google account id is required");
    }

    let profile = OAuthProfile {
        email: req.email,
        first_name: req.first_name.filter(|s| !s.is_empty()),
        last_name: req.last_name.filter(|s| !s.is_empty()),
        image: req.image,
        subject: req.google_id,
    };

    match session::bridge_oauth_profile(&state.cms, &state.issuer, &profile).await {
        Ok(identity) => Json(ApiEnvelope::ok(json!({
            "user": public_user(&identity.user),
            "jwt": identity.token.as_str(),
            "name": identity.name,
        })))
        .into_response(),
        Err(e) => {
            tracing::error!("OAuth bridging failed: {}", e);
            cms_error_response(e)
        }
    }
}
