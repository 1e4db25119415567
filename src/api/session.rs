//! Session handoff endpoints.
//!
//! The callback redirect carries a one-time code. The frontend posts it
//! here and receives the HttpOnly session cookie in exchange.

use super::{AppError, AppState};
use crate::auth::{clear_session_cookie, extract_session_id, session_cookie};
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Request body for POST /api/session
#[derive(Deserialize)]
pub struct RedeemRequest {
    pub code: String,
}

/// Response for the session endpoints
#[derive(Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
}

/// Create session API router
pub fn create_session_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/session",
            get(session_status).post(redeem_handoff).delete(logout),
        )
        .with_state(state)
}

/// POST /api/session - Trade a handoff code for the session cookie
async fn redeem_handoff(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RedeemRequest>,
) -> Result<Response, AppError> {
    let session_id = state
        .controller
        .store()
        .sessions
        .redeem_handoff(&request.code)
        .ok_or_else(|| {
            warn!("Unknown or expired handoff code");
            AppError::BadRequest("Unknown or expired code".to_string())
        })?;

    info!("Session established");

    let cookie = session_cookie(
        &session_id,
        state.session_ttl_seconds,
        state.secure_cookies(),
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SessionStatus {
            authenticated: true,
        }),
    )
        .into_response())
}

/// GET /api/session - Whether the caller holds a live session
async fn session_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<SessionStatus> {
    let authenticated = extract_session_id(&headers)
        .ok()
        .and_then(|id| state.controller.current_access_token(&id))
        .is_some();

    Json(SessionStatus { authenticated })
}

/// DELETE /api/session - Forget the session and clear the cookie
async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Ok(session_id) = extract_session_id(&headers) {
        let existed = state.controller.store().sessions.remove(&session_id);
        debug!(existed, "Session removed");
    }

    (
        [(header::SET_COOKIE, clear_session_cookie(state.secure_cookies()))],
        Json(SessionStatus {
            authenticated: false,
        }),
    )
        .into_response()
}
