use crate::auth::generate_reset_token;
use crate::config::ServerConfig;
use crate::session::{self, public_user};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{Duration, Utc};
use rapture_cms::EmailPayload;
use rapture_common::ApiEnvelope;
use rapture_common::models::auth::User;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{bad_request, cms_error_response};

const RESET_SENT_MESSAGE: &str =
    "If an account exists with this email, a reset link has been sent";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/auth/login
#[tracing::instrument(skip(state, req))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    if req.email.is_empty() || req.password.is_empty() {
        return bad_request("Email and password are required");
    }

    match session::login_with_credentials(&state.cms, &req.email, &req.password).await {
        Ok(identity) => Json(ApiEnvelope::ok(json!({
            "jwt": identity.token.as_str(),
            "user": public_user(&identity.user),
            "name": identity.name,
        })))
        .into_response(),
        Err(e) => {
            tracing::warn!("Login failed for {}: {}", req.email, e);
            cms_error_response(e)
        }
    }
}

/// POST /api/auth/register
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    if req.email.is_empty()
        || req.password.is_empty()
        || req.first_name.is_empty()
        || req.last_name.is_empty()
    {
        return bad_request("All fields are required");
    }
    if req.password.len() < 6 {
        return bad_request("Password must be at least 6 characters");
    }

    let username = req.email.split('@').next().unwrap_or(&req.email);
    let auth = match state
        .cms
        .register_local(&req.email, &req.password, username)
        .await
    {
        Ok(auth) => auth,
        Err(e) => {
            tracing::warn!("Registration failed for {}: {}", req.email, e);
            return cms_error_response(e);
        }
    };

    // Profile fields live outside the registration payload; attach them
    // through the admin update, best effort.
    let user = match state
        .cms
        .update_user(
            auth.user.id,
            &json!({
                "firstName": req.first_name,
                "lastName": req.last_name,
            }),
        )
        .await
    {
        Ok(updated) => updated,
        Err(e) => {
            tracing::error!("Failed to set profile fields for new user: {}", e);
            auth.user
        }
    };

    (
        StatusCode::CREATED,
        Json(ApiEnvelope::ok(json!({
            "jwt": auth.jwt,
            "user": public_user(&user),
        }))),
    )
        .into_response()
}

/// POST /api/auth/forgot-password
///
/// Always answers with the same generic success, whether or not the
/// account exists.
#[tracing::instrument(skip(state, req))]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> impl IntoResponse {
    if req.email.is_empty() {
        return bad_request("Email is required");
    }

    let generic = Json(ApiEnvelope::<Value>::message(RESET_SENT_MESSAGE)).into_response();

    let user = match state.cms.find_user_by_email(&req.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return generic,
        Err(e) => {
            tracing::error!("User lookup during forgot-password failed: {}", e);
            return generic;
        }
    };

    let token = generate_reset_token();
    let expiry = Utc::now() + Duration::hours(1);

    if let Err(e) = state
        .cms
        .update_user(
            user.id,
            &json!({
                "resetPasswordToken": token,
                "resetPasswordTokenExpiry": expiry.to_rfc3339(),
            }),
        )
        .await
    {
        tracing::error!("Failed to store reset token: {}", e);
        // Continue anyway; the generic response must not change.
    }

    let email = reset_email(&state.config, &user, &req.email, &token);
    if let Err(e) = state.cms.send_email(&email).await {
        tracing::error!("Failed to send reset email: {}", e);
    }

    generic
}

/// POST /api/auth/reset-password
#[tracing::instrument(skip(state, req))]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> impl IntoResponse {
    if req.token.is_empty() || req.password.is_empty() {
        return bad_request("Token and password are required");
    }
    if req.password.len() < 6 {
        return bad_request("Password must be at least 6 characters");
    }

    let user = match state.cms.find_user_by_reset_token(&req.token).await {
        Ok(Some(user)) => user,
        Ok(None) => return bad_request("Invalid or expired reset token"),
        Err(e) => {
            tracing::error!("Reset token lookup failed: {}", e);
            return bad_request("Invalid or expired reset token");
        }
    };

    match user.reset_password_token_expiry {
        Some(expiry) if expiry >= Utc::now() => {}
        _ => return bad_request("Reset token has expired"),
    }

    // New password and token clearing travel in one update; the CMS is
    // the system of record for their atomicity.
    if let Err(e) = state
        .cms
        .update_user(
            user.id,
            &json!({
                "password": req.password,
                "resetPasswordToken": null,
                "resetPasswordTokenExpiry": null,
            }),
        )
        .await
    {
        tracing::error!("Failed to reset password for user {}: {}", user.id, e);
        return bad_request("Failed to reset password");
    }

    Json(ApiEnvelope::<Value>::message(
        "Password has been reset successfully. You can now log in with your new password.",
    ))
    .into_response()
}

fn reset_email(config: &ServerConfig, user: &User, to: &str, token: &str) -> EmailPayload {
    let link = format!("{}/reset-password?token={}", config.base_url, token);
    let greeting = user.first_name.as_deref().unwrap_or("User");
    EmailPayload {
        to: to.to_string(),
        from: config.mail.from.clone(),
        reply_to: config.mail.reply_to.clone(),
        subject: "Password Reset Request - Talent Rapture".to_string(),
        text: format!(
            "Hi {greeting},\n\n\
             You requested a password reset. Click the link below to reset your password:\n\n\
             {link}\n\n\
             This link will expire in 1 hour.\n\n\
             If you didn't request this, please ignore this email.\n\n\
             Best regards,\nTalent Rapture Team"
        ),
        html: format!(
            "<h2>Password Reset Request</h2>\
             <p>Hi {greeting},</p>\
             <p>You requested a password reset. Click the link below to reset your password:</p>\
             <p><a href=\"{link}\">Reset Password</a></p>\
             <p><strong>This link will expire in 1 hour.</strong></p>\
             <p>If you didn't request this, please ignore this email.</p>\
             <p>Best regards,<br/>Talent Rapture Team</p>"
        ),
    }
}
