use serde::{Deserialize, Serialize};

/// Uniform response envelope for every route this service exposes.
///
/// Shape: `{success, data?, error?, message?, meta?}` -- `meta` carries
/// CMS pagination through list endpoints untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            meta: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: Some(message.into()),
            meta: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            message: Some(message.into()),
            meta: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Option<serde_json::Value>) -> Self {
        self.meta = meta;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_ok_envelope_shape() {
        let env = ApiEnvelope::ok(json!({"id": 1}));
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value, json!({"success": true, "data": {"id": 1}}));
    }

    #[test]
    fn test_err_envelope_shape() {
        let env: ApiEnvelope<Value> = ApiEnvelope::err("Event ID is required");
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(
            value,
            json!({"success": false, "error": "Event ID is required"})
        );
    }

    #[test]
    fn test_message_only_envelope() {
        let env: ApiEnvelope<Value> =
            ApiEnvelope::message("If an account exists with this email, a reset link has been sent");
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["success"], json!(true));
        assert!(value.get("data").is_none());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_meta_passthrough() {
        let meta = json!({"pagination": {"page": 1, "pageSize": 25, "pageCount": 1, "total": 2}});
        let env = ApiEnvelope::ok(json!([])).with_meta(Some(meta.clone()));
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["meta"], meta);
    }
}
