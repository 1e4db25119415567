//! Upstream OAuth 1.0a provider configuration.

use crate::config::TrelloConfig;

/// Consumer credentials and endpoints of the upstream authorization server.
#[derive(Clone)]
pub struct OAuthProvider {
    pub consumer_key: String,
    pub consumer_secret: String,
    /// Registered redirect URI sent as `oauth_callback`
    pub callback_url: String,
    pub request_token_url: String,
    pub access_token_url: String,
    pub authorize_url: String,
    pub app_name: String,
    pub scope: String,
    pub expiration: String,
}

impl OAuthProvider {
    /// Build the upstream authorize-page URL for a request token.
    pub fn build_authorize_url(&self, oauth_token: &str) -> String {
        format!(
            "{}?oauth_token={}&name={}&scope={}&expiration={}",
            self.authorize_url,
            urlencoding::encode(oauth_token),
            urlencoding::encode(&self.app_name),
            urlencoding::encode(&self.scope),
            urlencoding::encode(&self.expiration)
        )
    }
}

impl From<&TrelloConfig> for OAuthProvider {
    fn from(config: &TrelloConfig) -> Self {
        Self {
            consumer_key: config.consumer_key.clone(),
            consumer_secret: config.consumer_secret.clone(),
            callback_url: config.callback_url.clone(),
            request_token_url: config.request_token_url.clone(),
            access_token_url: config.access_token_url.clone(),
            authorize_url: config.authorize_url.clone(),
            app_name: config.app_name.clone(),
            scope: config.scope.clone(),
            expiration: config.expiration.clone(),
        }
    }
}
