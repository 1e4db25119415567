// HTTP API: OAuth flow, session handoff, resource proxy

pub mod oauth;
pub mod proxy;
pub mod session;

pub use oauth::create_oauth_router;
pub use proxy::create_proxy_router;
pub use session::create_session_router;

use crate::oauth::OAuthFlowController;
use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state for every API router
#[derive(Clone)]
pub struct AppState {
    pub controller: OAuthFlowController,
    /// Frontend page receiving `?code=<handoff>` after the callback
    pub app_home_url: String,
    /// Base URL the resource proxy forwards to
    pub api_base_url: String,
    /// Session cookie lifetime, matching the session TTL
    pub session_ttl_seconds: i64,
}

impl AppState {
    /// Mark cookies `Secure` when the frontend is served over https.
    pub(crate) fn secure_cookies(&self) -> bool {
        self.app_home_url.starts_with("https://")
    }
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Application error types for API endpoints
pub(crate) enum AppError {
    BadRequest(String),
    Unauthorized(String),
    ServerError(String),
    BadGateway(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::ServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// All API routes, without CORS
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health))
        .merge(create_oauth_router(Arc::clone(&state)))
        .merge(create_session_router(Arc::clone(&state)))
        .merge(create_proxy_router(state))
}

/// CORS policy letting the frontend origin call the API with its cookie.
pub fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let origin: HeaderValue = origin
        .parse()
        .with_context(|| format!("Invalid CORS origin: {}", origin))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}
