//! OAuth 1.0a protocol primitives.
//!
//! [`signature`] holds the pure signing functions. [`OAuthParams`] collects
//! the protocol parameters of one outbound request and turns them into a
//! signed `Authorization: OAuth ...` header value.

pub mod signature;

pub use signature::{
    authorization_header, percent_decode, percent_encode, sign, signing_key, SignatureError,
};

use chrono::Utc;
use uuid::Uuid;

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const VERSION: &str = "1.0";

/// Protocol parameters for a single signed request.
///
/// Insertion order is preserved for the header; signing sorts on its own.
#[derive(Clone, Debug)]
pub struct OAuthParams {
    params: Vec<(&'static str, String)>,
}

impl OAuthParams {
    /// Start a parameter set with the fields every request carries.
    pub fn new(consumer_key: &str, nonce: String, timestamp: String) -> Self {
        Self {
            params: vec![
                ("oauth_consumer_key", consumer_key.to_string()),
                ("oauth_nonce", nonce),
                ("oauth_signature_method", SIGNATURE_METHOD.to_string()),
                ("oauth_timestamp", timestamp),
                ("oauth_version", VERSION.to_string()),
            ],
        }
    }

    /// Same as [`OAuthParams::new`] with a fresh nonce and the current time.
    pub fn fresh(consumer_key: &str) -> Self {
        Self::new(consumer_key, generate_nonce(), unix_timestamp())
    }

    /// Add an extra protocol parameter (`oauth_callback`, `oauth_token`, ...).
    pub fn with(mut self, key: &'static str, value: &str) -> Self {
        self.params.push((key, value.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sign the parameters for `method url` and render the header value.
    pub fn authorization(
        &self,
        method: &str,
        url: &str,
        secret: &str,
    ) -> Result<String, SignatureError> {
        let signature = sign(
            method,
            url,
            self.params.iter().map(|(k, v)| (*k, Some(v.as_str()))),
            secret,
        )?;

        Ok(authorization_header(
            self.params.iter().map(|(k, v)| (*k, v.as_str())),
            &signature,
        ))
    }
}

/// Per-request nonce: 32 hex chars from a v4 UUID (OS CSPRNG).
pub fn generate_nonce() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Current Unix time in whole seconds.
pub fn unix_timestamp() -> String {
    Utc::now().timestamp().to_string()
}
