//! Outbound HTTP transport to the upstream service.
//!
//! One shared `reqwest::Client` with a hard timeout. The OAuth legs use
//! [`UpstreamClient::post_signed`]; the resource proxy uses
//! [`UpstreamClient::forward`]. Nothing here retries.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Credential pair returned by the request-token and access-token endpoints.
#[derive(Clone, PartialEq)]
pub struct TokenPair {
    pub token: String,
    pub secret: String,
    /// `oauth_callback_confirmed`, only sent by the request-token endpoint
    pub callback_confirmed: Option<bool>,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("token", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("callback_confirmed", &self.callback_confirmed)
            .finish()
    }
}

/// Raw form of a token endpoint response (`application/x-www-form-urlencoded`)
#[derive(Deserialize, Debug)]
struct TokenResponse {
    #[serde(default)]
    oauth_token: Option<String>,
    #[serde(default)]
    oauth_token_secret: Option<String>,
    #[serde(default)]
    oauth_callback_confirmed: Option<String>,
}

/// Parse a token endpoint body, requiring both `oauth_token` and `oauth_token_secret`.
pub fn parse_token_response(body: &str) -> Result<TokenPair, UpstreamError> {
    let response: TokenResponse = serde_urlencoded::from_str(body.trim())
        .map_err(|e| UpstreamError::MalformedResponse(format!("not form-encoded: {}", e)))?;

    let token = response
        .oauth_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| UpstreamError::MalformedResponse("missing oauth_token".to_string()))?;
    let secret = response
        .oauth_token_secret
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            UpstreamError::MalformedResponse("missing oauth_token_secret".to_string())
        })?;

    Ok(TokenPair {
        token,
        secret,
        callback_confirmed: response.oauth_callback_confirmed.map(|v| v == "true"),
    })
}

/// Response relayed back by the resource proxy
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    /// Build a client whose every request gives up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build upstream HTTP client")?;
        Ok(Self { http })
    }

    /// POST to an OAuth token endpoint with a signed `Authorization` header.
    pub async fn post_signed(&self, url: &str, authorization: &str) -> Result<TokenPair, UpstreamError> {
        tracing::debug!(url = %url, "Sending signed token request");

        let response = self
            .http
            .post(url)
            .header("Authorization", authorization)
            .body("")
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_token_response(&body)
    }

    /// Forward a resource request and relay whatever the upstream answers.
    ///
    /// Non-2xx statuses are not errors here; only transport failures are.
    pub async fn forward(
        &self,
        method: &str,
        url: &str,
        query: &[(String, String)],
        body: Option<serde_json::Value>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|e| UpstreamError::Transport(format!("invalid method: {}", e)))?;

        let mut request = self.http.request(method, url).query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?
            .to_vec();

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Upstream call failures
#[derive(Debug, PartialEq, Clone)]
pub enum UpstreamError {
    /// Connection failure, timeout or unreadable body
    Transport(String),
    /// Non-2xx response
    Status { status: u16, body: String },
    /// 2xx response without the expected fields
    MalformedResponse(String),
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamError::Transport(msg) => write!(f, "Upstream request failed: {}", msg),
            UpstreamError::Status { status, body } => {
                write!(f, "Upstream returned status {}: {}", status, body)
            }
            UpstreamError::MalformedResponse(msg) => {
                write!(f, "Malformed upstream response: {}", msg)
            }
        }
    }
}

impl std::error::Error for UpstreamError {}
