use std::sync::Arc;

use rapture_cms::CmsClient;

use crate::auth::TokenIssuer;
use crate::config::ServerConfig;

/// Shared application state.
///
/// Nothing here is mutable across requests: the CMS holds all persisted
/// state, this service only carries its client and configuration.
#[derive(Clone)]
pub struct AppState {
    pub cms: CmsClient,
    pub issuer: TokenIssuer,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let cms = CmsClient::new(&config.cms.url, config.cms.admin_token.as_deref());
        let issuer = TokenIssuer::new(&config.auth.session_secret, config.auth.session_ttl_days);
        Self {
            cms,
            issuer,
            config: Arc::new(config),
        }
    }
}
