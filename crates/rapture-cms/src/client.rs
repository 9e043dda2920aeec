use std::sync::Arc;

use rapture_common::models::auth::{AuthResponse, User};
use rapture_common::models::event::{Collection, Event, EventRegistration, Single};
use serde::Serialize;
use serde_json::Value;

use crate::error::CmsError;

/// HTTP client for the content backend.
///
/// The CMS is the system of record for users, events, registrations and
/// contact messages; this client only translates between the site's needs
/// and the CMS's REST conventions. The admin token, when configured, is
/// attached to operations the public API role is not allowed to perform
/// (user updates, registration writes).
#[derive(Clone)]
pub struct CmsClient {
    client: reqwest::Client,
    base_url: Arc<str>,
    admin_token: Option<Arc<str>>,
}

/// Payload for `POST /api/event-registrations`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRegistration {
    pub phone: String,
    pub physical_address: String,
    pub number_of_participants: i64,
    pub event: Value,
    #[serde(rename = "users_permissions_user")]
    pub owner: i64,
}

/// Partial update for a registration. The owning-user relation is never
/// part of a patch.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_participants: Option<i64>,
}

impl RegistrationPatch {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none()
            && self.physical_address.is_none()
            && self.number_of_participants.is_none()
    }
}

/// Payload for the CMS mail capability (`POST /api/email/send`).
#[derive(Debug, Serialize)]
pub struct EmailPayload {
    pub to: String,
    pub from: String,
    #[serde(rename = "replyTo")]
    pub reply_to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl CmsClient {
    pub fn new(base_url: &str, admin_token: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Arc::from(base_url.trim_end_matches('/')),
            admin_token: admin_token.map(Arc::from),
        }
    }

    fn with_admin(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.admin_token {
            Some(token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }

    /// POST /api/auth/local -- local-auth credential exchange
    #[tracing::instrument(skip(self, password))]
    pub async fn login_local(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<AuthResponse, CmsError> {
        let url = format!("{}/api/auth/local", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "identifier": identifier,
                "password": password,
            }))
            .send()
            .await?;
        let response = ok_or_upstream(response).await?;
        Ok(response.json().await?)
    }

    /// POST /api/auth/local/register -- create a user, returns its token
    #[tracing::instrument(skip(self, password))]
    pub async fn register_local(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<AuthResponse, CmsError> {
        let url = format!("{}/api/auth/local/register", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "username": username,
            }))
            .send()
            .await?;
        let response = ok_or_upstream(response).await?;
        Ok(response.json().await?)
    }

    /// GET /api/users/me -- full profile for the bearer of `token`
    #[tracing::instrument(skip(self, token))]
    pub async fn me(&self, token: &str) -> Result<User, CmsError> {
        let url = format!("{}/api/users/me", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;
        let response = ok_or_upstream(response).await?;
        Ok(response.json().await?)
    }

    async fn find_user(&self, field: &str, value: &str) -> Result<Option<User>, CmsError> {
        let url = format!("{}/api/users", self.base_url);
        let filter = format!("filters[{}][$eq]", field);
        let response = self
            .with_admin(self.client.get(&url).query(&[(filter.as_str(), value)]))
            .send()
            .await?;
        let response = ok_or_upstream(response).await?;
        let body: Value = response.json().await?;
        Ok(users_from_response(body).into_iter().next())
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, CmsError> {
        self.find_user("email", email).await
    }

    pub async fn find_user_by_google_id(&self, google_id: &str) -> Result<Option<User>, CmsError> {
        self.find_user("googleId", google_id).await
    }

    pub async fn find_user_by_reset_token(&self, token: &str) -> Result<Option<User>, CmsError> {
        self.find_user("resetPasswordToken", token).await
    }

    /// PUT /api/users/{id} -- profile update through the admin token
    #[tracing::instrument(skip(self, fields))]
    pub async fn update_user(&self, user_id: i64, fields: &Value) -> Result<User, CmsError> {
        let url = format!("{}/api/users/{}", self.base_url, user_id);
        let response = self
            .with_admin(self.client.put(&url).json(fields))
            .send()
            .await?;
        let response = ok_or_upstream(response).await?;
        Ok(response.json().await?)
    }

    /// GET /api/events -- published events with media populated, newest first
    #[tracing::instrument(skip(self))]
    pub async fn list_events(&self) -> Result<Collection<Event>, CmsError> {
        let url = format!("{}/api/events", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("populate[image][fields][0]", "url"),
                ("populate[image][fields][1]", "name"),
                ("populate[flyer][fields][0]", "url"),
                ("populate[flyer][fields][1]", "name"),
                ("sort", "date:desc"),
            ])
            .send()
            .await?;
        let response = ok_or_upstream(response).await?;
        Ok(response.json().await?)
    }

    /// GET /api/events/{id}
    #[tracing::instrument(skip(self))]
    pub async fn get_event(&self, id: &str) -> Result<Event, CmsError> {
        let url = format!("{}/api/events/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("populate[image][fields][0]", "url"),
                ("populate[image][fields][1]", "name"),
                ("populate[flyer][fields][0]", "url"),
                ("populate[flyer][fields][1]", "name"),
            ])
            .send()
            .await?;
        let response = ok_or_upstream(response).await?;
        let single: Single<Event> = response.json().await?;
        Ok(single.data)
    }

    /// GET /api/event-registrations -- one user's registrations for one event.
    ///
    /// The user filter is always applied here, server-side; callers cannot
    /// widen the scope.
    #[tracing::instrument(skip(self))]
    pub async fn list_registrations(
        &self,
        event_id: &str,
        owner_id: i64,
    ) -> Result<Collection<EventRegistration>, CmsError> {
        let url = format!("{}/api/event-registrations", self.base_url);
        let owner = owner_id.to_string();
        let response = self
            .with_admin(self.client.get(&url).query(&[
                ("filters[event][documentId][$eq]", event_id),
                ("filters[users_permissions_user][id][$eq]", owner.as_str()),
                ("populate[event][fields][0]", "title"),
                ("populate[users_permissions_user][fields][0]", "email"),
                ("sort", "createdAt:desc"),
            ]))
            .send()
            .await?;
        let response = ok_or_upstream(response).await?;
        Ok(response.json().await?)
    }

    /// GET /api/event-registrations/{id} with the owning user populated
    #[tracing::instrument(skip(self))]
    pub async fn get_registration(&self, id: &str) -> Result<EventRegistration, CmsError> {
        let url = format!("{}/api/event-registrations/{}", self.base_url, id);
        let response = self
            .with_admin(self.client.get(&url).query(&[
                ("populate[event][fields][0]", "title"),
                ("populate[users_permissions_user][fields][0]", "email"),
            ]))
            .send()
            .await?;
        let response = ok_or_upstream(response).await?;
        let single: Single<EventRegistration> = response.json().await?;
        Ok(single.data)
    }

    /// POST /api/event-registrations
    #[tracing::instrument(skip(self, registration))]
    pub async fn create_registration(
        &self,
        registration: &NewRegistration,
    ) -> Result<EventRegistration, CmsError> {
        let url = format!("{}/api/event-registrations", self.base_url);
        let response = self
            .with_admin(
                self.client
                    .post(&url)
                    .json(&serde_json::json!({ "data": registration })),
            )
            .send()
            .await?;
        let response = ok_or_upstream(response).await?;
        let single: Single<EventRegistration> = response.json().await?;
        Ok(single.data)
    }

    /// PUT /api/event-registrations/{id}
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_registration(
        &self,
        id: &str,
        patch: &RegistrationPatch,
    ) -> Result<EventRegistration, CmsError> {
        let url = format!("{}/api/event-registrations/{}", self.base_url, id);
        let response = self
            .with_admin(
                self.client
                    .put(&url)
                    .json(&serde_json::json!({ "data": patch })),
            )
            .send()
            .await?;
        let response = ok_or_upstream(response).await?;
        let single: Single<EventRegistration> = response.json().await?;
        Ok(single.data)
    }

    /// DELETE /api/event-registrations/{id}
    #[tracing::instrument(skip(self))]
    pub async fn delete_registration(&self, id: &str) -> Result<(), CmsError> {
        let url = format!("{}/api/event-registrations/{}", self.base_url, id);
        let response = self.with_admin(self.client.delete(&url)).send().await?;
        ok_or_upstream(response).await?;
        Ok(())
    }

    /// POST /api/contacts -- store a contact-form message
    #[tracing::instrument(skip(self, message))]
    pub async fn create_contact(&self, email: &str, message: &str) -> Result<Value, CmsError> {
        let url = format!("{}/api/contacts", self.base_url);
        let response = self
            .with_admin(self.client.post(&url).json(&serde_json::json!({
                "data": { "email": email, "message": message },
            })))
            .send()
            .await?;
        let response = ok_or_upstream(response).await?;
        let body: Value = response.json().await?;
        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }

    /// POST /api/email/send -- outbound mail through the CMS
    #[tracing::instrument(skip(self, payload))]
    pub async fn send_email(&self, payload: &EmailPayload) -> Result<(), CmsError> {
        let url = format!("{}/api/email/send", self.base_url);
        let response = self.client.post(&url).json(payload).send().await?;
        ok_or_upstream(response).await?;
        Ok(())
    }
}

async fn ok_or_upstream(response: reqwest::Response) -> Result<reqwest::Response, CmsError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    Err(CmsError::upstream(status, reduce_error_message(&body)))
}

/// Reduce a CMS error payload to a single human-readable string.
///
/// The CMS emits several shapes: `{error: {message}}`, `{messages: [...]}`
/// and the legacy `{data: [{messages: [...]}]}` nesting.
pub fn reduce_error_message(body: &Value) -> String {
    let error = match body.get("error") {
        Some(e) if !e.is_null() => e,
        _ => body,
    };

    if let Some(message) = error.get("message").and_then(Value::as_str) {
        return message.to_string();
    }

    if let Some(messages) = error.get("messages").and_then(Value::as_array) {
        let joined: Vec<String> = messages
            .iter()
            .map(|m| {
                m.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| m.to_string())
            })
            .collect();
        if !joined.is_empty() {
            return joined.join(", ");
        }
    }

    if let Some(items) = error.get("data").and_then(Value::as_array) {
        let joined: Vec<String> = items
            .iter()
            .map(|item| {
                item.pointer("/messages/0/message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| item.to_string())
            })
            .collect();
        if !joined.is_empty() {
            return joined.join(", ");
        }
    }

    "An error occurred".to_string()
}

/// The users-permissions list endpoint returns either a bare array or a
/// `{data: [...]}` wrapper depending on CMS version.
fn users_from_response(body: Value) -> Vec<User> {
    let entries = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reduce_error_nested_message() {
        let body = json!({"error": {"status": 400, "message": "Invalid identifier or password"}});
        assert_eq!(
            reduce_error_message(&body),
            "Invalid identifier or password"
        );
    }

    #[test]
    fn test_reduce_error_top_level_message() {
        let body = json!({"message": "Not Found"});
        assert_eq!(reduce_error_message(&body), "Not Found");
    }

    #[test]
    fn test_reduce_error_messages_array() {
        let body = json!({"messages": [{"message": "Email is invalid"}, {"message": "Too short"}]});
        assert_eq!(reduce_error_message(&body), "Email is invalid, Too short");
    }

    #[test]
    fn test_reduce_error_legacy_data_nesting() {
        let body = json!({"data": [{"messages": [{"message": "Email is already taken"}]}]});
        assert_eq!(reduce_error_message(&body), "Email is already taken");
    }

    #[test]
    fn test_reduce_error_fallback() {
        assert_eq!(reduce_error_message(&json!({})), "An error occurred");
        assert_eq!(reduce_error_message(&Value::Null), "An error occurred");
    }

    #[test]
    fn test_users_from_bare_array() {
        let body = json!([{"id": 1, "email": "a@b.com"}]);
        let users = users_from_response(body);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, 1);
    }

    #[test]
    fn test_users_from_data_wrapper() {
        let body = json!({"data": [{"id": 2, "email": "c@d.com"}]});
        let users = users_from_response(body);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "c@d.com");
    }

    #[test]
    fn test_users_from_unexpected_shape() {
        assert!(users_from_response(json!("nope")).is_empty());
        assert!(users_from_response(json!({"data": {}})).is_empty());
    }

    #[test]
    fn test_registration_patch_skips_absent_fields() {
        let patch = RegistrationPatch {
            phone: Some("555-0100".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({"phone": "555-0100"}));
        assert!(!patch.is_empty());
        assert!(RegistrationPatch::default().is_empty());
    }

    #[test]
    fn test_new_registration_owner_relation_field() {
        let reg = NewRegistration {
            phone: "555-0100".to_string(),
            physical_address: "1 Art Way".to_string(),
            number_of_participants: 3,
            event: json!("evt123"),
            owner: 7,
        };
        let value = serde_json::to_value(&reg).unwrap();
        assert_eq!(value["users_permissions_user"], json!(7));
        assert_eq!(value["physicalAddress"], json!("1 Art Way"));
        assert_eq!(value["numberOfParticipants"], json!(3));
    }
}
