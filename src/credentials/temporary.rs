//! Temporary (request-token) credential storage.
//!
//! Holds the secret of every request token issued by the upstream until the
//! user comes back through the callback. Entries are single-use and expire.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Request token issued in the first leg, waiting for its callback.
#[derive(Clone)]
pub struct TemporaryCredential {
    pub identifier: String,
    pub secret: String,
    pub issued_at: DateTime<Utc>,
}

impl std::fmt::Debug for TemporaryCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryCredential")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Request-token secrets keyed by token identifier, with automatic expiration.
#[derive(Clone)]
pub struct TemporaryCredentialStore {
    entries: Arc<DashMap<String, TemporaryCredential>>,
    expiry_duration: Duration,
}

impl TemporaryCredentialStore {
    /// Create a new store
    ///
    /// # Arguments
    /// * `expiry_duration` - How long request tokens remain usable (default: 10 minutes)
    pub fn with_ttl(expiry_duration: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            expiry_duration,
        }
    }

    /// Remember the secret paired with a freshly issued request token.
    ///
    /// Re-issuing the same identifier replaces the old secret and restarts its clock.
    pub fn put(&self, identifier: &str, secret: &str) {
        self.entries.insert(
            identifier.to_string(),
            TemporaryCredential {
                identifier: identifier.to_string(),
                secret: secret.to_string(),
                issued_at: Utc::now(),
            },
        );
    }

    /// Look up the secret for a request token without consuming it.
    pub fn get(&self, identifier: &str) -> Option<String> {
        let entry = self.entries.get(identifier)?;
        if self.is_expired(&entry) {
            return None;
        }
        Some(entry.secret.clone())
    }

    /// Remove and return a request token (single-use).
    ///
    /// Expired entries are removed too, and reported as absent.
    pub fn take(&self, identifier: &str) -> Option<TemporaryCredential> {
        let (_, entry) = self.entries.remove(identifier)?;
        if self.is_expired(&entry) {
            return None;
        }
        Some(entry)
    }

    /// Drop every expired request token.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.entries.len();
        let now = Utc::now();
        self.entries
            .retain(|_, entry| now - entry.issued_at <= self.expiry_duration);
        before.saturating_sub(self.entries.len())
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    fn is_expired(&self, entry: &TemporaryCredential) -> bool {
        Utc::now() - entry.issued_at > self.expiry_duration
    }
}
