use crate::state::AppState;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::Response,
};
use rapture_common::models::auth::Claims;
use std::sync::Arc;

use super::unauthorized;

/// Extractor that validates a Bearer session token and provides the
/// claims. Use `AuthUser` directly for required auth.
#[derive(Debug)]
pub struct AuthUser(pub Claims);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = match auth_header {
            Some(val) => match val.strip_prefix("Bearer ") {
                Some(t) => t,
                None => return Err(unauthorized("Invalid authorization header format")),
            },
            None => return Err(unauthorized("Unauthorized - no token provided")),
        };

        match state.issuer.validate(token) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(_) => Err(unauthorized("Unauthorized - invalid token")),
        }
    }
}
