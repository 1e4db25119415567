mod env;
pub use env::apply_env_overrides;

use crate::credentials::CredentialTtls;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Complete bridge configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub trello: TrelloConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Upstream OAuth consumer and endpoint configuration
#[derive(Clone, Deserialize)]
pub struct TrelloConfig {
    #[serde(default)]
    pub consumer_key: String,
    #[serde(default)]
    pub consumer_secret: String,
    /// Where the upstream sends the user back after authorization
    #[serde(default = "default_callback_url")]
    pub callback_url: String,
    #[serde(default = "default_request_token_url")]
    pub request_token_url: String,
    #[serde(default = "default_access_token_url")]
    pub access_token_url: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    /// Base URL of the resource API the proxy forwards to
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Application name shown on the authorize page
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_expiration")]
    pub expiration: String,
}

fn default_callback_url() -> String {
    "http://localhost:3000/api/callback".to_string()
}

fn default_request_token_url() -> String {
    "https://trello.com/1/OAuthGetRequestToken".to_string()
}

fn default_access_token_url() -> String {
    "https://trello.com/1/OAuthGetAccessToken".to_string()
}

fn default_authorize_url() -> String {
    "https://trello.com/1/OAuthAuthorizeToken".to_string()
}

fn default_api_base_url() -> String {
    "https://api.trello.com/1".to_string()
}

fn default_app_name() -> String {
    "Trello Bridge".to_string()
}

fn default_scope() -> String {
    "read,write".to_string()
}

fn default_expiration() -> String {
    "never".to_string()
}

impl Default for TrelloConfig {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            callback_url: default_callback_url(),
            request_token_url: default_request_token_url(),
            access_token_url: default_access_token_url(),
            authorize_url: default_authorize_url(),
            api_base_url: default_api_base_url(),
            app_name: default_app_name(),
            scope: default_scope(),
            expiration: default_expiration(),
        }
    }
}

impl std::fmt::Debug for TrelloConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrelloConfig")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("callback_url", &self.callback_url)
            .field("request_token_url", &self.request_token_url)
            .field("access_token_url", &self.access_token_url)
            .field("authorize_url", &self.authorize_url)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Frontend origin allowed by CORS (credentials included)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Frontend page that receives the handoff code after the callback
    #[serde(default = "default_app_home_url")]
    pub app_home_url: String,
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_app_home_url() -> String {
    "http://localhost:5173/home".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            cors_origin: default_cors_origin(),
            app_home_url: default_app_home_url(),
        }
    }
}

/// Credential lifetimes and sweep cadence
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_temporary_ttl")]
    pub temporary_ttl_seconds: i64,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: i64,
    #[serde(default = "default_handoff_ttl")]
    pub handoff_ttl_seconds: i64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

/// Upper bound for any credential TTL (one year).
const MAX_TTL_SECONDS: i64 = 365 * 24 * 3600;

fn default_temporary_ttl() -> i64 {
    600
}

fn default_session_ttl() -> i64 {
    30 * 24 * 3600
}

fn default_handoff_ttl() -> i64 {
    120
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            temporary_ttl_seconds: default_temporary_ttl(),
            session_ttl_seconds: default_session_ttl(),
            handoff_ttl_seconds: default_handoff_ttl(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl CredentialsConfig {
    pub fn ttls(&self) -> CredentialTtls {
        CredentialTtls {
            temporary: chrono::Duration::seconds(self.temporary_ttl_seconds),
            session: chrono::Duration::seconds(self.session_ttl_seconds),
            handoff: chrono::Duration::seconds(self.handoff_ttl_seconds),
        }
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    10
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl BridgeConfig {
    /// Reject configurations the OAuth flow cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.trello.consumer_key.trim().is_empty() {
            bail!("consumer key is not configured (set TRELLO_CONSUMER_KEY)");
        }
        if self.trello.consumer_secret.trim().is_empty() {
            bail!("consumer secret is not configured (set TRELLO_CONSUMER_SECRET)");
        }
        if self.upstream.timeout_seconds == 0 {
            bail!("upstream timeout must be at least one second");
        }
        if self.credentials.sweep_interval_seconds == 0 {
            bail!("credential sweep interval must be at least one second");
        }
        for (name, seconds) in [
            ("temporary_ttl_seconds", self.credentials.temporary_ttl_seconds),
            ("session_ttl_seconds", self.credentials.session_ttl_seconds),
            ("handoff_ttl_seconds", self.credentials.handoff_ttl_seconds),
        ] {
            if !(1..=MAX_TTL_SECONDS).contains(&seconds) {
                bail!(
                    "credentials.{} must be between 1 and {} seconds (got {})",
                    name,
                    MAX_TTL_SECONDS,
                    seconds
                );
            }
        }
        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<BridgeConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
    let config: BridgeConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config {}", path))?;
    Ok(config)
}

/// Build the effective configuration: optional TOML file, then environment overrides.
pub fn from_env() -> Result<BridgeConfig> {
    let mut config = match std::env::var("BRIDGE_CONFIG") {
        Ok(path) => load_config(&path)?,
        Err(_) => BridgeConfig::default(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}
