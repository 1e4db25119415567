use axum::http::HeaderMap;


/// Name of the cookie carrying the opaque session id
pub const SESSION_COOKIE: &str = "trello_session";

/// Extract the caller's session id.
///
/// Browsers send the `trello_session` cookie; other clients may send
/// `Authorization: Bearer <session_id>`. The cookie wins when both are present.
pub fn extract_session_id(headers: &HeaderMap) -> Result<String, TokenError> {
    if let Some(session_id) = session_from_cookie(headers) {
        return Ok(session_id);
    }
    extract_bearer_token(headers)
}

/// Extract bearer token from HTTP Authorization header
///
/// Expected format: "Authorization: Bearer <token>"
/// Returns the token string if present and valid.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, TokenError> {
    let auth_header = headers
        .get("authorization")
        .ok_or(TokenError::Missing)?
        .to_str()
        .map_err(|_| TokenError::InvalidFormat)?;

    parse_bearer_token(auth_header)
}

/// Find the session cookie among all `Cookie` headers.
fn session_from_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all("cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Parse bearer token from Authorization header value
///
/// Internal helper for extract_bearer_token
fn parse_bearer_token(header_value: &str) -> Result<String, TokenError> {
    let parts: Vec<&str> = header_value.splitn(2, ' ').collect();

    if parts.len() != 2 {
        return Err(TokenError::InvalidFormat);
    }

    if parts[0].to_lowercase() != "bearer" {
        return Err(TokenError::InvalidFormat);
    }

    let token = parts[1].trim();

    if token.is_empty() {
        return Err(TokenError::Empty);
    }

    Ok(token.to_string())
}

/// `Set-Cookie` value establishing a session.
///
/// HttpOnly and SameSite=Lax always; Secure when the app is served over https.
pub fn session_cookie(session_id: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, session_id, max_age_seconds
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

/// Session id extraction errors
#[derive(Debug, PartialEq, Clone)]
pub enum TokenError {
    /// Neither a session cookie nor an Authorization header
    Missing,
    /// Invalid format (not "Bearer <token>")
    InvalidFormat,
    /// Token is empty string
    Empty,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Missing => write!(f, "Session not provided"),
            TokenError::InvalidFormat => write!(f, "Invalid authorization format"),
            TokenError::Empty => write!(f, "Session token is empty"),
        }
    }
}

impl std::error::Error for TokenError {}
