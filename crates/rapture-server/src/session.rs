use rapture_cms::{CmsClient, CmsError};
use rapture_common::models::auth::User;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::{SessionToken, TokenIssuer};

/// Identity fields handed over by the OAuth provider.
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image: Option<String>,
    /// Provider subject id (`sub`), stable per account.
    pub subject: String,
}

/// Normalized application session: CMS user fields plus the credential
/// for subsequent authorized requests.
#[derive(Debug)]
pub struct BridgedIdentity {
    pub user: User,
    pub name: String,
    pub token: SessionToken,
}

/// Display name: trimmed `first last`, falling back to the email when
/// both parts are blank.
pub fn display_name(first: Option<&str>, last: Option<&str>, email: &str) -> String {
    let joined = format!("{} {}", first.unwrap_or(""), last.unwrap_or(""));
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        email.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Client-safe projection of a CMS user record.
pub fn public_user(user: &User) -> Value {
    json!({
        "id": user.id,
        "email": user.email,
        "username": user.username,
        "firstName": user.first_name.as_deref().unwrap_or(""),
        "lastName": user.last_name.as_deref().unwrap_or(""),
        "profileImage": user.profile_image,
        "confirmed": user.confirmed,
        "blocked": user.blocked,
    })
}

/// Exchange email+password for a backend token and a normalized session.
///
/// The auth endpoint's user object lacks profile fields, so the full
/// record is fetched with the fresh token; if that fetch fails the auth
/// response's user is used as-is.
#[tracing::instrument(skip(cms, password))]
pub async fn login_with_credentials(
    cms: &CmsClient,
    email: &str,
    password: &str,
) -> Result<BridgedIdentity, CmsError> {
    let auth = cms.login_local(email, password).await?;

    let user = match cms.me(&auth.jwt).await {
        Ok(full) => full,
        Err(e) => {
            tracing::warn!("Profile fetch after login failed, using auth user: {}", e);
            auth.user
        }
    };

    let name = display_name(
        user.first_name.as_deref(),
        user.last_name.as_deref(),
        &user.email,
    );

    Ok(BridgedIdentity {
        user,
        name,
        token: SessionToken::BackendIssued(auth.jwt),
    })
}

/// Bridge an OAuth profile to a CMS user and session token.
///
/// 1. Look up an existing user by provider subject id.
/// 2. Absent: register with a provider-derived placeholder password, then
///    tag the record with provider metadata. A registration rejected as
///    "already taken" falls back to lookup by email.
/// 3. Returning users get their provider fields refreshed (best effort)
///    and a self-signed token, since the CMS cannot issue one without a
///    password exchange.
#[tracing::instrument(skip(cms, issuer), fields(email = %profile.email))]
pub async fn bridge_oauth_profile(
    cms: &CmsClient,
    issuer: &TokenIssuer,
    profile: &OAuthProfile,
) -> Result<BridgedIdentity, CmsError> {
    let mut backend_jwt: Option<String> = None;

    let mut user = cms.find_user_by_google_id(&profile.subject).await?;

    if user.is_none() {
        let username = oauth_username(&profile.email);
        let placeholder_password = format!("google_{}", profile.subject);

        match cms
            .register_local(&profile.email, &placeholder_password, &username)
            .await
        {
            Ok(auth) => {
                tracing::info!("Registered new user {} via OAuth", auth.user.id);
                backend_jwt = Some(auth.jwt);
                let tagged = cms
                    .update_user(
                        auth.user.id,
                        &json!({
                            "firstName": profile.first_name.as_deref().unwrap_or("Google"),
                            "lastName": profile.last_name.as_deref().unwrap_or("User"),
                            "googleId": profile.subject,
                            "provider": "google",
                        }),
                    )
                    .await;
                user = Some(match tagged {
                    Ok(updated) => updated,
                    Err(e) => {
                        tracing::error!("Failed to tag new OAuth user: {}", e);
                        auth.user
                    }
                });
            }
            Err(e) if e.is_already_taken() => {
                tracing::info!("Email {} already registered, linking", profile.email);
                user = Some(
                    cms.find_user_by_email(&profile.email)
                        .await?
                        .ok_or_else(|| CmsError::upstream(400, "User not found in database"))?,
                );
            }
            Err(e) => return Err(e),
        }
    }

    let user = user.ok_or_else(|| CmsError::upstream(400, "Failed to create or retrieve user"))?;

    // Returning user: refresh provider fields, best effort.
    let user = if backend_jwt.is_none() {
        match cms
            .update_user(
                user.id,
                &json!({
                    "provider": "google",
                    "googleId": profile.subject,
                    "firstName": profile
                        .first_name
                        .as_deref()
                        .or(user.first_name.as_deref())
                        .unwrap_or("Google"),
                    "lastName": profile
                        .last_name
                        .as_deref()
                        .or(user.last_name.as_deref())
                        .unwrap_or("User"),
                    "profileImage": profile.image.as_deref().or(user.profile_image.as_deref()),
                    "confirmed": true,
                }),
            )
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                tracing::error!("Failed to refresh returning OAuth user: {}", e);
                user
            }
        }
    } else {
        user
    };

    let token = issuer
        .adopt_or_sign(backend_jwt, &user)
        .map_err(|e| CmsError::upstream(500, e.to_string()))?;

    let name = display_name(
        user.first_name.as_deref(),
        user.last_name.as_deref(),
        &user.email,
    );

    Ok(BridgedIdentity { user, name, token })
}

/// Username for OAuth registration: email local part plus a random suffix
/// to dodge collisions.
fn oauth_username(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}", local, &suffix[..5])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_concatenates_and_trims() {
        assert_eq!(
            display_name(Some("Ana"), Some("Lovelace"), "ana@example.com"),
            "Ana Lovelace"
        );
    }

    #[test]
    fn test_display_name_single_part() {
        assert_eq!(display_name(Some("Ana"), None, "ana@example.com"), "Ana");
        assert_eq!(
            display_name(None, Some("Lovelace"), "ana@example.com"),
            "Lovelace"
        );
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        assert_eq!(display_name(None, None, "ana@example.com"), "ana@example.com");
        assert_eq!(
            display_name(Some(""), Some(""), "ana@example.com"),
            "ana@example.com"
        );
    }

    #[test]
    fn test_oauth_username_shape() {
        let name = oauth_username("ana@example.com");
        assert!(name.starts_with("ana"));
        assert_eq!(name.len(), "ana".len() + 5);

        let other = oauth_username("ana@example.com");
        assert_ne!(name, other);
    }

    #[test]
    fn test_public_user_omits_private_fields() {
        let user = User {
            id: 3,
            email: "ana@example.com".to_string(),
            username: Some("ana".to_string()),
            first_name: None,
            last_name: Some("Lovelace".to_string()),
            confirmed: true,
            blocked: false,
            provider: Some("google".to_string()),
            google_id: Some("g-123".to_string()),
            profile_image: None,
            reset_password_token: Some("token".to_string()),
            reset_password_token_expiry: None,
        };
        let value = public_user(&user);
        assert_eq!(value["firstName"], json!(""));
        assert_eq!(value["lastName"], json!("Lovelace"));
        assert!(value.get("resetPasswordToken").is_none());
        assert!(value.get("googleId").is_none());
    }
}
