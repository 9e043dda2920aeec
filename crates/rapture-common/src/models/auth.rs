use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User record as mirrored from the CMS (users-permissions collection).
///
/// The reset-token fields are deserialize-only: they must never appear in
/// a response this service produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(default, skip_serializing)]
    pub reset_password_token_expiry: Option<DateTime<Utc>>,
}

/// CMS response from `POST /api/auth/local` and `POST /api/auth/local/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub jwt: String,
    pub user: User,
}

/// JWT claims for session tokens.
///
/// Self-signed tokens carry both `sub` and `id`; CMS-issued tokens carry
/// only the numeric `id`, so both spellings are accepted on decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// The caller's user identifier, whichever claim spelling is present.
    pub fn subject(&self) -> Option<String> {
        self.sub
            .clone()
            .or_else(|| self.id.map(|id| id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_prefers_sub() {
        let claims = Claims {
            sub: Some("7".to_string()),
            id: Some(9),
            email: Some("a@b.com".to_string()),
            username: None,
            iat: 0,
            exp: 0,
        };
        assert_eq!(claims.subject().as_deref(), Some("7"));
    }

    #[test]
    fn test_subject_falls_back_to_numeric_id() {
        let claims = Claims {
            sub: None,
            id: Some(42),
            email: Some("a@b.com".to_string()),
            username: None,
            iat: 0,
            exp: 0,
        };
        assert_eq!(claims.subject().as_deref(), Some("42"));
    }

    #[test]
    fn test_subject_absent() {
        let claims = Claims {
            sub: None,
            id: None,
            email: Some("a@b.com".to_string()),
            username: None,
            iat: 0,
            exp: 0,
        };
        assert!(claims.subject().is_none());
    }

    #[test]
    fn test_user_reset_fields_never_serialized() {
        let user = User {
            id: 1,
            email: "ana@example.com".to_string(),
            username: Some("ana".to_string()),
            first_name: Some("Ana".to_string()),
            last_name: Some("Lovelace".to_string()),
            confirmed: true,
            blocked: false,
            provider: None,
            google_id: None,
            profile_image: None,
            reset_password_token: Some("secret-token".to_string()),
            reset_password_token_expiry: Some(Utc::now()),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-token"));
        assert!(!json.contains("resetPasswordToken"));
    }

    #[test]
    fn test_user_deserializes_cms_shape() {
        let json = serde_json::json!({
            "id": 3,
            "email": "ana@example.com",
            "username": "ana",
            "firstName": "Ana",
            "lastName": "Lovelace",
            "confirmed": true,
            "blocked": false
        });
        let user: User = serde_json::from_value(json).unwrap();
        assert_eq!(user.id, 3);
        assert_eq!(user.first_name.as_deref(), Some("Ana"));
        assert!(user.reset_password_token.is_none());
    }
}
