use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auth::User;

/// Uploaded media reference, trimmed to the fields the site populates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Event as published by the CMS. Read-only from this service's side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    #[serde(default)]
    pub document_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image: Option<Media>,
    #[serde(default)]
    pub flyer: Option<Media>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A user's registration for one event.
///
/// The owning-user relation is set at creation and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRegistration {
    pub id: i64,
    #[serde(default)]
    pub document_id: Option<String>,
    pub phone: String,
    pub physical_address: String,
    pub number_of_participants: i64,
    #[serde(default)]
    pub event: Option<Event>,
    #[serde(default, rename = "users_permissions_user")]
    pub owner: Option<User>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Pagination block inside CMS collection responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub page_count: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// CMS collection response: `{data: [...], meta: {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection<T> {
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// CMS single-entry response: `{data: {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Single<T> {
    pub data: T,
}
