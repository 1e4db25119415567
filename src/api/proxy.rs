//! Resource proxy.
//!
//! `ANY /api/proxy/*path` is forwarded to `<api_base_url>/<path>` with the
//! consumer key and the session's access token attached as `key`/`token`
//! query parameters. Status and body are relayed unchanged.

use super::{AppError, AppState};
use crate::auth::extract_session_id;
use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Create resource proxy router
pub fn create_proxy_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/proxy/*path", any(forward))
        .with_state(state)
}

/// Caller query pairs plus credentials; caller-supplied `key`/`token` are dropped.
fn build_query(
    raw: Option<&str>,
    consumer_key: &str,
    access_token: &str,
) -> Result<Vec<(String, String)>, AppError> {
    let mut query: Vec<(String, String)> = match raw {
        Some(raw) if !raw.is_empty() => serde_urlencoded::from_str(raw)
            .map_err(|_| AppError::BadRequest("Invalid query string".to_string()))?,
        _ => Vec::new(),
    };

    query.retain(|(k, _)| k != "key" && k != "token");
    query.push(("key".to_string(), consumer_key.to_string()));
    query.push(("token".to_string(), access_token.to_string()));
    Ok(query)
}

/// Reject paths that could escape the API base or smuggle a query/fragment.
fn validate_path(path: &str) -> Result<(), AppError> {
    if path.is_empty()
        || path.contains(['?', '#'])
        || path.split('/').any(|segment| segment == ".." || segment == ".")
    {
        return Err(AppError::BadRequest("Invalid resource path".to_string()));
    }
    Ok(())
}

async fn forward(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    validate_path(&path)?;

    let credential = extract_session_id(&headers)
        .ok()
        .and_then(|id| state.controller.current_access_token(&id))
        .ok_or_else(|| AppError::Unauthorized("No access token".to_string()))?;

    let json_body = if body.is_empty() {
        None
    } else {
        Some(
            serde_json::from_slice::<serde_json::Value>(&body)
                .map_err(|_| AppError::BadRequest("Request body must be JSON".to_string()))?,
        )
    };

    let query = build_query(
        raw_query.as_deref(),
        &state.controller.provider().consumer_key,
        &credential.token,
    )?;
    let url = format!("{}/{}", state.api_base_url.trim_end_matches('/'), path);

    debug!(method = %method, path = %path, "Forwarding resource request");

    let upstream = state
        .controller
        .upstream()
        .forward(method.as_str(), &url, &query, json_body)
        .await
        .map_err(|e| {
            error!(path = %path, error = %e, "Resource request failed");
            AppError::BadGateway("Upstream request failed".to_string())
        })?;

    if upstream.status >= 400 {
        warn!(path = %path, status = upstream.status, "Upstream rejected resource request");
    }

    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .content_type
        .unwrap_or_else(|| "application/json".to_string());

    Ok((status, [(header::CONTENT_TYPE, content_type)], upstream.body).into_response())
}
