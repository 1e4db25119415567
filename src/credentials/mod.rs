//! In-memory credential storage for the OAuth 1.0a flow.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │       CredentialStore                    │
//! │  - cloneable handle shared by handlers   │
//! └──────────────────────────────────────────┘
//!          │                      │
//! ┌──────────────────────┐ ┌─────────────────────────┐
//! │ TemporaryCredential- │ │ SessionStore            │
//! │ Store                │ │ - session id → access   │
//! │ - request token →    │ │   credential            │
//! │   secret, issued_at  │ │ - one-time handoff codes│
//! │ - single-use, TTL    │ │ - TTL                   │
//! └──────────────────────┘ └─────────────────────────┘
//! ```
//!
//! Nothing is persisted: a restart drops every pending flow and session.
//! All maps are `DashMap`s, so flows from different users interleave freely.

use chrono::{DateTime, Duration, Utc};

mod session;
mod temporary;

pub use session::SessionStore;
pub use temporary::{TemporaryCredential, TemporaryCredentialStore};

/// Long-lived credential obtained from the access-token exchange.
///
/// The secret is retained so post-handshake requests can be signed; the
/// resource proxy currently only needs the token.
#[derive(Clone, PartialEq)]
pub struct AccessCredential {
    pub token: String,
    pub secret: String,
    pub obtained_at: DateTime<Utc>,
}

impl AccessCredential {
    pub fn new(token: &str, secret: &str) -> Self {
        Self {
            token: token.to_string(),
            secret: secret.to_string(),
            obtained_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessCredential")
            .field("token", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Expiry windows for each kind of stored credential.
#[derive(Clone, Copy, Debug)]
pub struct CredentialTtls {
    pub temporary: Duration,
    pub session: Duration,
    pub handoff: Duration,
}

impl Default for CredentialTtls {
    fn default() -> Self {
        Self {
            temporary: Duration::minutes(10),
            session: Duration::days(30),
            handoff: Duration::minutes(2),
        }
    }
}

/// Process-wide credential storage (cheap to clone).
#[derive(Clone)]
pub struct CredentialStore {
    pub temporary: TemporaryCredentialStore,
    pub sessions: SessionStore,
}

impl CredentialStore {
    pub fn new(ttls: CredentialTtls) -> Self {
        Self {
            temporary: TemporaryCredentialStore::with_ttl(ttls.temporary),
            sessions: SessionStore::new(ttls.session, ttls.handoff),
        }
    }

    /// Access credential of a session, if the session is live.
    pub fn current_access_token(&self, session_id: &str) -> Option<AccessCredential> {
        self.sessions.get(session_id)
    }

    pub fn cleanup_expired(&self) -> usize {
        self.temporary.cleanup_expired() + self.sessions.cleanup_expired()
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(CredentialTtls::default())
    }
}

/// Background task to periodically evict expired credentials
pub async fn run_credential_sweep(store: CredentialStore, interval_seconds: u64) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds));

    loop {
        interval.tick().await;
        let removed = store.cleanup_expired();
        tracing::debug!(
            removed,
            pending_request_tokens = store.temporary.count(),
            sessions = store.sessions.count(),
            "Credential sweep complete"
        );
    }
}
