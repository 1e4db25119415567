//! Per-session access credentials and one-time handoff codes.
//!
//! After the token exchange the access credential is bound to an opaque
//! session id. The browser never sees the token itself: it receives a
//! short-lived handoff code, which it redeems once for the session cookie.

use super::AccessCredential;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use uuid::Uuid;

const HANDOFF_CODE_LEN: usize = 32;

struct SessionEntry {
    credential: AccessCredential,
    created_at: DateTime<Utc>,
}

struct HandoffEntry {
    session_id: String,
    issued_at: DateTime<Utc>,
}

/// Session store with expiring sessions and single-use handoff codes.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, SessionEntry>>,
    handoffs: Arc<DashMap<String, HandoffEntry>>,
    session_ttl: Duration,
    handoff_ttl: Duration,
}

impl SessionStore {
    pub fn new(session_ttl: Duration, handoff_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            handoffs: Arc::new(DashMap::new()),
            session_ttl,
            handoff_ttl,
        }
    }

    /// Bind an access credential to a new session and return its id (UUID v4).
    pub fn create(&self, credential: AccessCredential) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.sessions.insert(
            session_id.clone(),
            SessionEntry {
                credential,
                created_at: Utc::now(),
            },
        );
        session_id
    }

    pub fn get(&self, session_id: &str) -> Option<AccessCredential> {
        let entry = self.sessions.get(session_id)?;
        if Utc::now() - entry.created_at > self.session_ttl {
            return None;
        }
        Some(entry.credential.clone())
    }

    /// Forget a session. Returns whether it existed.
    pub fn remove(&self, session_id: &str) -> bool {
        self.handoffs.retain(|_, h| h.session_id != session_id);
        self.sessions.remove(session_id).is_some()
    }

    /// Issue a one-time code the browser can trade for `session_id`.
    pub fn issue_handoff(&self, session_id: &str) -> String {
        let code = generate_handoff_code();
        self.handoffs.insert(
            code.clone(),
            HandoffEntry {
                session_id: session_id.to_string(),
                issued_at: Utc::now(),
            },
        );
        code
    }

    /// Redeem a handoff code (single-use).
    ///
    /// Returns the session id if the code is known, unexpired and its session still exists.
    pub fn redeem_handoff(&self, code: &str) -> Option<String> {
        let (_, entry) = self.handoffs.remove(code)?;
        if Utc::now() - entry.issued_at > self.handoff_ttl {
            return None;
        }
        self.get(&entry.session_id)?;
        Some(entry.session_id)
    }

    /// Drop expired sessions and handoff codes. Returns how many entries went away.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.sessions.len() + self.handoffs.len();
        let now = Utc::now();

        self.sessions
            .retain(|_, entry| now - entry.created_at <= self.session_ttl);
        self.handoffs
            .retain(|_, entry| now - entry.issued_at <= self.handoff_ttl);

        before.saturating_sub(self.sessions.len() + self.handoffs.len())
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn pending_handoffs(&self) -> usize {
        self.handoffs.len()
    }
}

fn generate_handoff_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(HANDOFF_CODE_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(token: &str) -> AccessCredential {
        AccessCredential::new(token, "secret")
    }

    fn store() -> SessionStore {
        SessionStore::new(Duration::days(30), Duration::seconds(120))
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = store();
        let alice = store.create(credential("ACCESS_ALICE"));
        let bob = store.create(credential("ACCESS_BOB"));

        assert_ne!(alice, bob);
        assert_eq!(store.get(&alice).unwrap().token, "ACCESS_ALICE");
        assert_eq!(store.get(&bob).unwrap().token, "ACCESS_BOB");
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_remove_session() {
        let store = store();
        let id = store.create(credential("ACCESS1"));

        assert!(store.remove(&id));
        assert!(store.get(&id).is_none());
        assert!(!store.remove(&id));
    }

    #[test]
    fn test_handoff_is_single_use() {
        let store = store();
        let id = store.create(credential("ACCESS1"));
        let code = store.issue_handoff(&id);

        assert_eq!(code.len(), HANDOFF_CODE_LEN);
        assert_eq!(store.redeem_handoff(&code), Some(id));
        assert_eq!(store.redeem_handoff(&code), None);
    }

    #[test]
    fn test_handoff_for_removed_session_fails() {
        let store = store();
        let id = store.create(credential("ACCESS1"));
        let code = store.issue_handoff(&id);
        store.remove(&id);

        assert_eq!(store.redeem_handoff(&code), None);
    }

    #[test]
    fn test_expired_handoff_rejected() {
        let store = SessionStore::new(Duration::days(30), Duration::seconds(1));
        let id = store.create(credential("ACCESS1"));
        let code = store.issue_handoff(&id);

        std::thread::sleep(std::time::Duration::from_secs(2));

        assert_eq!(store.redeem_handoff(&code), None);
        assert!(store.get(&id).is_some());
    }

    #[test]
    fn test_cleanup_removes_expired_sessions_and_codes() {
        let store = SessionStore::new(Duration::seconds(1), Duration::seconds(1));
        let id = store.create(credential("ACCESS1"));
        store.issue_handoff(&id);
        assert_eq!(store.pending_handoffs(), 1);

        std::thread::sleep(std::time::Duration::from_secs(2));

        assert_eq!(store.cleanup_expired(), 2);
        assert_eq!(store.count(), 0);
        assert_eq!(store.pending_handoffs(), 0);
    }
}
