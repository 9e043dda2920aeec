pub mod auth;
pub mod contact;
pub mod events;
pub mod middleware;
pub mod oauth;
pub mod registrations;

use crate::gate::Denial;
use crate::state::AppState;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get, routing::post};
use rapture_cms::CmsError;
use rapture_common::ApiEnvelope;
use serde_json::Value;
use std::sync::Arc;

/// Mirror a CMS failure to the caller: upstream status, reduced message.
pub(crate) fn cms_error_response(e: CmsError) -> Response {
    let status =
        StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ApiEnvelope::<Value>::err(e.to_string()))).into_response()
}

pub(crate) fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiEnvelope::<Value>::err(message)),
    )
        .into_response()
}

pub(crate) fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiEnvelope::<Value>::err(message)),
    )
        .into_response()
}

pub(crate) fn denial_response(denial: Denial) -> Response {
    match denial {
        Denial::Unauthorized(msg) => unauthorized(&msg),
        Denial::Forbidden(msg) => (
            StatusCode::FORBIDDEN,
            Json(ApiEnvelope::<Value>::err(msg)),
        )
            .into_response(),
        Denial::Upstream(e) => cms_error_response(e),
    }
}

pub fn build_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Auth routes
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/oauth/google/callback", post(oauth::google_callback))
        // Event routes (public, read-only)
        .route("/events", get(events::list_events))
        .route("/events/{id}", get(events::get_event))
        // Registration routes
        .route(
            "/event-registrations",
            get(registrations::list_registrations).post(registrations::create_registration),
        )
        .route(
            "/event-registrations/{id}",
            get(registrations::get_registration)
                .patch(registrations::update_registration)
                .delete(registrations::delete_registration),
        )
        // Contact form
        .route("/contact", post(contact::submit_contact))
        .with_state(state)
}
