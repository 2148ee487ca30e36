//! Server-side registry of currently valid bearer tokens.
//!
//! A signed token alone is not enough: it must also be registered here and
//! not yet revoked. Lookups take a shared lock; register, revoke and purge
//! take the exclusive one.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::jwt::JwtCodec;
use crate::domain::Claims;

#[derive(Debug, Clone)]
struct TokenEntry {
    subject: Uuid,
    expires_at: DateTime<Utc>,
}

impl TokenEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

pub struct TokenRegistry {
    codec: Arc<JwtCodec>,
    entries: RwLock<HashMap<String, TokenEntry>>,
}

impl TokenRegistry {
    pub fn new(codec: Arc<JwtCodec>) -> Self {
        Self {
            codec,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Record `token` as issued to `subject` until `expires_at`.
    ///
    /// Returns false, leaving the registry untouched, if the token is
    /// already registered for a different subject.
    pub fn register(&self, token: &str, subject: Uuid, expires_at: DateTime<Utc>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = entries.get(token) {
            if existing.subject != subject {
                tracing::warn!(%subject, owner = %existing.subject, "token already registered to another subject");
                return false;
            }
        }

        entries.insert(token.to_string(), TokenEntry { subject, expires_at });
        true
    }

    /// True iff the token is registered, unexpired and its signature verifies.
    pub fn is_valid(&self, token: &str) -> bool {
        self.validate(token).is_some()
    }

    /// Verified claims of a registered, live token. Unknown, expired,
    /// revoked and forged tokens all yield `None`.
    pub fn validate(&self, token: &str) -> Option<Claims> {
        let entry = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries.get(token).cloned()
        }?;

        if !entry.is_live(Utc::now()) {
            return None;
        }

        let claims = self.codec.decode(token)?;
        if claims.sub != entry.subject {
            return None;
        }
        Some(claims)
    }

    /// Forget a token. Returns whether it was present; revoking an absent
    /// token is not an error.
    pub fn revoke(&self, token: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Purge expired entries every `interval` until the task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = registry.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, remaining = registry.len(), "expired tokens purged");
                }
            }
        })
    }
}
