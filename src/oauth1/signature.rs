//! HMAC-SHA1 request signing (OAuth 1.0a, RFC 5849 section 3.4).
//!
//! Everything here is pure: nonce and timestamp are supplied by the caller,
//! so the same inputs always produce the same signature.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters: A-Z a-z 0-9 - . _ ~
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a string the way the upstream authorization server expects.
///
/// Every byte outside the unreserved set is escaped as `%XX` with uppercase
/// hex digits, including `&`, `=`, `+`, `*` and space (`%20`, never `+`).
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, OAUTH_ENCODE_SET).to_string()
}

/// Inverse of [`percent_encode`].
pub fn percent_decode(input: &str) -> Result<String, SignatureError> {
    percent_decode_str(input)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| SignatureError::InvalidEncoding(input.to_string()))
}

/// Build the HMAC key from the consumer secret and the (possibly empty) token secret.
pub fn signing_key(consumer_secret: &str, token_secret: &str) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    )
}

/// Normalized parameter string: encoded pairs sorted by key, then value.
///
/// Pairs whose value is `None` are dropped before encoding.
pub fn parameter_string<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let mut pairs: Vec<(String, String)> = params
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (percent_encode(k), percent_encode(v))))
        .collect();
    pairs.sort();

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Signature base string: `METHOD&enc(url)&enc(parameter_string)`.
pub fn base_string<'a, I>(method: &str, url: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&parameter_string(params))
    )
}

/// Compute the Base64 HMAC-SHA1 signature of a request.
///
/// `secret` is the full signing key, usually built with [`signing_key`].
pub fn sign<'a, I>(method: &str, url: &str, params: I, secret: &str) -> Result<String, SignatureError>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let base = base_string(method, url, params);

    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    mac.update(base.as_bytes());

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Render an `Authorization` header value: `OAuth k="v", k2="v2"`.
///
/// Parameters appear in the order given; `oauth_signature` is appended last.
pub fn authorization_header<'a, I>(params: I, signature: &'a str) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let parts: Vec<String> = params
        .into_iter()
        .chain(std::iter::once(("oauth_signature", signature)))
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect();

    format!("OAuth {}", parts.join(", "))
}

/// Signature computation errors.
///
/// Neither variant is reachable with validated inputs; seeing one means a bug.
#[derive(Debug, PartialEq, Clone)]
pub enum SignatureError {
    /// HMAC could not be keyed
    InvalidKey(String),
    /// Percent-encoded input did not decode to UTF-8
    InvalidEncoding(String),
}

impl std::fmt::Display for SignatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureError::InvalidKey(msg) => write!(f, "Invalid signing key: {}", msg),
            SignatureError::InvalidEncoding(input) => {
                write!(f, "Invalid percent-encoding: {}", input)
            }
        }
    }
}

impl std::error::Error for SignatureError {}
