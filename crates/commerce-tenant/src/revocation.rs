//! Token revocation list
//!
//! Replaces the legacy in-process set of "currently valid" refresh
//! tokens, which was lost on restart and invisible to sibling instances.
//! Inverted here into a denylist of revoked token ids kept in the shared
//! store: a token is good until its own expiry unless its `jti` appears
//! here. Entries become garbage once the token would have expired anyway
//! and are dropped by the periodic purge.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Revoked-token record keyed by token id (`jti`).
pub struct TokenRevocationList {
    revoked: DashMap<String, DateTime<Utc>>,
}

impl TokenRevocationList {
    pub fn new() -> Self {
        Self {
            revoked: DashMap::new(),
        }
    }

    /// Revoke a token until it would have expired on its own.
    pub fn revoke(&self, jti: &str, token_expires_at: DateTime<Utc>) {
        self.revoked.insert(jti.to_string(), token_expires_at);
    }

    /// Whether a token id has been revoked.
    pub fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.contains_key(jti)
    }

    /// Drop records for tokens that have expired anyway. Returns how many
    /// were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.revoked.len();
        self.revoked.retain(|_, expires_at| *expires_at > now);
        before - self.revoked.len()
    }
}

impl Default for TokenRevocationList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn revoked_token_is_rejected() {
        let list = TokenRevocationList::new();
        list.revoke("jti-1", Utc::now() + Duration::hours(1));
        assert!(list.is_revoked("jti-1"));
        assert!(!list.is_revoked("jti-2"));
    }

    #[test]
    fn purge_drops_only_expired_records() {
        let list = TokenRevocationList::new();
        let now = Utc::now();
        list.revoke("old", now - Duration::minutes(5));
        list.revoke("live", now + Duration::minutes(5));

        assert_eq!(list.purge_expired(now), 1);
        assert!(!list.is_revoked("old"));
        assert!(list.is_revoked("live"));
    }
}
