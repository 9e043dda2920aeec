use serde::{Deserialize, Serialize};

/// Content backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmsConfig {
    pub url: String,
    /// Token for operations the public API role cannot perform
    /// (user updates, registration writes). Optional in development.
    pub admin_token: Option<String>,
}

/// Session and reset-token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub session_secret: String,
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
}

fn default_session_ttl_days() -> i64 {
    30
}

/// Sender identity for password-reset mail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_mail_from")]
    pub from: String,
    #[serde(default = "default_mail_reply_to")]
    pub reply_to: String,
}

fn default_mail_from() -> String {
    "noreply@talentrapture.com".to_string()
}

fn default_mail_reply_to() -> String {
    "support@talentrapture.com".to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: default_mail_from(),
            reply_to: default_mail_reply_to(),
        }
    }
}

/// Server configuration - loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen: String, // "0.0.0.0:8080"
    /// Public base URL of this site, used in reset links
    pub base_url: String,
    pub cms: CmsConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

/// Load server config from a YAML file with RAPTURE__ env var overrides.
pub fn load_config(path: &str) -> anyhow::Result<ServerConfig> {
    use anyhow::Context;
    let config: ServerConfig = config::Config::builder()
        .add_source(config::File::new(path, config::FileFormat::Yaml))
        .add_source(
            config::Environment::with_prefix("RAPTURE")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .with_context(|| format!("Failed to build config from: {}", path))?
        .try_deserialize()
        .with_context(|| format!("Failed to deserialize config from: {}", path))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
listen: "0.0.0.0:8080"
base_url: "https://talentrapture.com"
cms:
  url: "http://localhost:1337"
auth:
  session_secret: "session-secret-123"
"#;
        let config: ServerConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.cms.url, "http://localhost:1337");
        assert!(config.cms.admin_token.is_none());
        assert_eq!(config.auth.session_secret, "session-secret-123");
        assert_eq!(config.auth.session_ttl_days, 30); // default
        assert_eq!(config.mail.from, "noreply@talentrapture.com"); // default
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
listen: "127.0.0.1:3000"
base_url: "https://talentrapture.com"
cms:
  url: "https://cms.talentrapture.com"
  admin_token: "cms-admin-token"
auth:
  session_secret: "secret"
  session_ttl_days: 7
mail:
  from: "hello@talentrapture.com"
  reply_to: "team@talentrapture.com"
"#;
        let config: ServerConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.cms.admin_token.as_deref(), Some("cms-admin-token"));
        assert_eq!(config.auth.session_ttl_days, 7);
        assert_eq!(config.mail.from, "hello@talentrapture.com");
        assert_eq!(config.mail.reply_to, "team@talentrapture.com");
    }

    #[test]
    fn test_parse_missing_cms_url_fails() {
        let yaml = r#"
listen: "0.0.0.0:8080"
base_url: "https://talentrapture.com"
cms: {}
auth:
  session_secret: "secret"
"#;
        let result = serde_yml::from_str::<ServerConfig>(yaml);
        assert!(result.is_err(), "Config without cms.url should fail");
    }

    #[test]
    fn test_parse_missing_session_secret_fails() {
        let yaml = r#"
listen: "0.0.0.0:8080"
base_url: "https://talentrapture.com"
cms:
  url: "http://localhost:1337"
auth: {}
"#;
        let result = serde_yml::from_str::<ServerConfig>(yaml);
        assert!(result.is_err(), "Config without session_secret should fail");
    }

    /// Serialize access to env vars in tests to avoid races between parallel tests
    static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn test_env_override_cms_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let yaml = r#"
listen: "0.0.0.0:8080"
base_url: "https://talentrapture.com"
cms:
  url: "http://placeholder:1337"
auth:
  session_secret: "yaml-secret"
"#;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, yaml.as_bytes()).unwrap();
        std::io::Write::flush(&mut file).unwrap();

        // SAFETY: test-only, serialized by ENV_MUTEX
        unsafe {
            std::env::set_var("RAPTURE__CMS__URL", "http://overridden:1337");
            std::env::set_var("RAPTURE__AUTH__SESSION_SECRET", "env-secret");
        }

        let config = load_config(file.path().to_str().unwrap()).unwrap();

        unsafe {
            std::env::remove_var("RAPTURE__CMS__URL");
            std::env::remove_var("RAPTURE__AUTH__SESSION_SECRET");
        }

        assert_eq!(config.cms.url, "http://overridden:1337");
        assert_eq!(config.auth.session_secret, "env-secret");
        // Non-overridden values preserved from YAML
        assert_eq!(config.listen, "0.0.0.0:8080");
    }

    #[test]
    fn test_env_override_listen() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let yaml = r#"
listen: "0.0.0.0:8080"
base_url: "https://talentrapture.com"
cms:
  url: "http://localhost:1337"
auth:
  session_secret: "secret"
"#;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, yaml.as_bytes()).unwrap();
        std::io::Write::flush(&mut file).unwrap();

        // SAFETY: test-only, serialized by ENV_MUTEX
        unsafe {
            std::env::set_var("RAPTURE__LISTEN", "0.0.0.0:9090");
        }

        let config = load_config(file.path().to_str().unwrap()).unwrap();

        unsafe {
            std::env::remove_var("RAPTURE__LISTEN");
        }

        assert_eq!(config.listen, "0.0.0.0:9090");
    }
}
