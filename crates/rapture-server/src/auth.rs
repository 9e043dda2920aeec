use anyhow::{Context, Result};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use rand::rngs::OsRng;
use rapture_common::models::auth::{Claims, User};

/// A credential the site hands to the browser for subsequent requests.
///
/// Two issuance paths exist: the CMS issues a token on credential login
/// and registration, but has no OAuth-native issuance path, so returning
/// OAuth users get a token signed with the application secret instead.
#[derive(Debug, Clone)]
pub enum SessionToken {
    BackendIssued(String),
    SelfSigned(String),
}

impl SessionToken {
    pub fn as_str(&self) -> &str {
        match self {
            Self::BackendIssued(t) => t,
            Self::SelfSigned(t) => t,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::BackendIssued(t) => t,
            Self::SelfSigned(t) => t,
        }
    }
}

/// Signs and validates session tokens with the application secret.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl_days: i64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            secret: secret.to_string(),
            ttl_days,
        }
    }

    /// Prefer the CMS-issued token; fall back to self-signing when the
    /// flow produced none.
    pub fn adopt_or_sign(&self, backend_jwt: Option<String>, user: &User) -> Result<SessionToken> {
        match backend_jwt {
            Some(jwt) => Ok(SessionToken::BackendIssued(jwt)),
            None => Ok(SessionToken::SelfSigned(self.self_sign(user)?)),
        }
    }

    /// Sign a minimal claim set over the user's identity.
    pub fn self_sign(&self, user: &User) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Some(user.id.to_string()),
            id: Some(user.id),
            email: Some(user.email.clone()),
            username: user.username.clone(),
            iat: now,
            exp: now + self.ttl_days * 24 * 60 * 60,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to sign session token")
    }

    /// Validate a session token and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        // CMS-issued tokens carry only {id, iat, exp}
        validation.required_spec_claims.clear();
        validation.validate_exp = true;

        let token_data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .context("Invalid session token")?;
        Ok(token_data.claims)
    }
}

/// Generate a password-reset token: 32 random bytes, hex encoded.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(id: i64) -> User {
        User {
            id,
            email: "ana@example.com".to_string(),
            username: Some("ana".to_string()),
            first_name: Some("Ana".to_string()),
            last_name: Some("Lovelace".to_string()),
            confirmed: true,
            blocked: false,
            provider: None,
            google_id: None,
            profile_image: None,
            reset_password_token: None,
            reset_password_token_expiry: None,
        }
    }

    #[test]
    fn test_self_sign_and_validate() {
        let issuer = TokenIssuer::new("test-secret", 30);
        let token = issuer.self_sign(&test_user(7)).unwrap();
        let claims = issuer.validate(&token).unwrap();
        assert_eq!(claims.subject().as_deref(), Some("7"));
        assert_eq!(claims.email.as_deref(), Some("ana@example.com"));
    }

    #[test]
    fn test_validate_wrong_secret_fails() {
        let issuer = TokenIssuer::new("secret-1", 30);
        let token = issuer.self_sign(&test_user(1)).unwrap();
        let other = TokenIssuer::new("secret-2", 30);
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn test_validate_expired_token_fails() {
        let issuer = TokenIssuer::new("test-secret", -1);
        let token = issuer.self_sign(&test_user(1)).unwrap();
        assert!(issuer.validate(&token).is_err());
    }

    #[test]
    fn test_adopt_prefers_backend_token() {
        let issuer = TokenIssuer::new("test-secret", 30);
        let token = issuer
            .adopt_or_sign(Some("cms-jwt".to_string()), &test_user(1))
            .unwrap();
        assert!(matches!(token, SessionToken::BackendIssued(ref t) if t == "cms-jwt"));
    }

    #[test]
    fn test_adopt_falls_back_to_self_signed() {
        let issuer = TokenIssuer::new("test-secret", 30);
        let token = issuer.adopt_or_sign(None, &test_user(9)).unwrap();
        match token {
            SessionToken::SelfSigned(t) => {
                let claims = issuer.validate(&t).unwrap();
                assert_eq!(claims.subject().as_deref(), Some("9"));
            }
            SessionToken::BackendIssued(_) => panic!("Expected self-signed token"),
        }
    }

    #[test]
    fn test_reset_token_format() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64, "32 bytes hex encoded");
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_reset_token_uniqueness() {
        assert_ne!(generate_reset_token(), generate_reset_token());
    }
}
