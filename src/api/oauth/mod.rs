//! OAuth flow endpoints.
//!
//! `GET /api/request_token` starts the flow, `GET /api/callback` is the
//! registered `oauth_callback` the upstream redirects back to.

use super::{AppError, AppState};
use crate::oauth::FlowError;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Response of GET /api/request_token
#[derive(Serialize)]
pub struct RequestTokenResponse {
    pub oauth_token: String,
    /// Upstream authorize page the browser should navigate to
    pub authorize_url: String,
}

/// OAuth callback query parameters
#[derive(Deserialize)]
pub struct OAuthCallback {
    oauth_token: Option<String>,
    oauth_verifier: Option<String>,
    /// Set by some providers instead of a verifier when the user declines
    denied: Option<String>,
}

/// Create OAuth API router
pub fn create_oauth_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/request_token", get(request_token))
        .route("/api/callback", get(oauth_callback))
        .with_state(state)
}

/// Map a flow failure to a client-safe response.
///
/// Upstream and signing details stay in the log; the client only sees `public_message`.
fn flow_error(err: FlowError, public_message: &str) -> AppError {
    match err {
        FlowError::MissingParameter(_) | FlowError::UnknownToken | FlowError::AuthorizationDenied => {
            AppError::BadRequest(err.to_string())
        }
        FlowError::UpstreamAuth(_) => AppError::ServerError(public_message.to_string()),
        FlowError::Signature(e) => {
            error!(error = %e, "Signature computation failed");
            AppError::ServerError("Internal error".to_string())
        }
    }
}

/// GET /api/request_token
///
/// Obtains a request token from the upstream and returns it together with
/// the authorize URL the browser must visit.
async fn request_token(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RequestTokenResponse>, AppError> {
    debug!("Request token requested");

    let token = state
        .controller
        .acquire_temporary_credential()
        .await
        .map_err(|e| flow_error(e, "Failed to get request token"))?;

    info!("Redirecting user to upstream authorization");

    Ok(Json(RequestTokenResponse {
        oauth_token: token.oauth_token,
        authorize_url: token.authorize_url,
    }))
}

/// GET /api/callback
///
/// Exchanges the authorized request token for an access credential and
/// redirects to the frontend with a one-time handoff code.
///
/// # Security
/// - Request token is single-use and expires
/// - Unknown, expired and replayed tokens produce the same response
/// - The access token never appears in the redirect URL
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Query(callback): Query<OAuthCallback>,
) -> Result<Response, AppError> {
    debug!(
        has_token = callback.oauth_token.is_some(),
        has_verifier = callback.oauth_verifier.is_some(),
        "OAuth callback received"
    );

    if callback.denied.is_some() {
        // The pending request token is left for the sweep; the callback is unauthenticated.
        warn!("User declined authorization");
        return Err(flow_error(FlowError::AuthorizationDenied, ""));
    }

    let session = state
        .controller
        .complete_authorization(
            callback.oauth_token.as_deref(),
            callback.oauth_verifier.as_deref(),
        )
        .await
        .map_err(|e| flow_error(e, "Failed to get access token"))?;

    let location = format!(
        "{}?code={}",
        state.app_home_url,
        urlencoding::encode(&session.handoff_code)
    );

    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, location),
            (header::REFERRER_POLICY, "no-referrer".to_string()),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
    )
        .into_response())
}
