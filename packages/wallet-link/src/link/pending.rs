//! Pending link attempts.
//!
//! Each OAuth round-trip started through `/discord/start` gets an opaque
//! state token. The wallet address stays server-side, keyed by that token,
//! until the callback consumes it.
//!
//! Consumed and expired tokens are remembered for `SPENT_STATE_TTL_SECS`
//! so a replayed token is recognised as ours instead of being mistaken for
//! something else.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::config::{PENDING_LINK_TTL_SECS, SPENT_STATE_TTL_SECS};

/// A link attempt waiting for its OAuth callback.
#[derive(Debug, Clone)]
pub struct PendingLink {
    /// Opaque state token sent to Discord.
    pub state: String,
    /// Normalized wallet address the attempt will link.
    pub address: String,
    /// When the attempt started.
    pub created_at: DateTime<Utc>,
}

impl PendingLink {
    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }
}

/// What [`PendingLinks::take`] found for a state.
#[derive(Debug, Clone)]
pub enum Taken {
    /// A live attempt, now consumed.
    Live(PendingLink),
    /// Issued here, but already consumed.
    Spent,
    /// Issued here, but too old.
    Expired,
    /// Never issued here (or forgotten long ago).
    Unknown,
}

/// Registry of pending link attempts.
#[derive(Clone)]
pub struct PendingLinks {
    by_state: Arc<DashMap<String, PendingLink>>,
    /// State → when it stopped being usable.
    spent: Arc<DashMap<String, DateTime<Utc>>>,
    ttl: Duration,
    spent_ttl: Duration,
}

impl PendingLinks {
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(PENDING_LINK_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            by_state: Arc::new(DashMap::new()),
            spent: Arc::new(DashMap::new()),
            ttl,
            spent_ttl: Duration::seconds(SPENT_STATE_TTL_SECS),
        }
    }

    /// Register an attempt for an already-normalized address.
    pub fn begin(&self, address: String) -> PendingLink {
        self.prune_expired();

        let pending = PendingLink {
            state: Uuid::new_v4().to_string(),
            address,
            created_at: Utc::now(),
        };
        self.by_state.insert(pending.state.clone(), pending.clone());

        tracing::debug!(
            state = pending.state.as_str(),
            pending = self.by_state.len(),
            "Pending link registered"
        );
        pending
    }

    /// Consume the attempt for `state`.
    pub fn take(&self, state: &str) -> Taken {
        let now = Utc::now();

        if let Some((_, pending)) = self.by_state.remove(state) {
            self.spent.insert(pending.state.clone(), now);
            if pending.is_expired(now, self.ttl) {
                tracing::warn!(state = state, "Pending link expired");
                return Taken::Expired;
            }
            return Taken::Live(pending);
        }

        if self.spent.contains_key(state) {
            tracing::warn!(state = state, "Pending link replayed");
            return Taken::Spent;
        }

        Taken::Unknown
    }

    /// Retire attempts older than the TTL and forget old spent states.
    pub fn prune_expired(&self) {
        let now = Utc::now();
        let expired: Vec<String> = self
            .by_state
            .iter()
            .filter(|r| r.is_expired(now, self.ttl))
            .map(|r| r.key().clone())
            .collect();

        for state in expired {
            if self.by_state.remove(&state).is_some() {
                self.spent.insert(state, now);
            }
        }

        self.spent.retain(|_, at| now - *at <= self.spent_ttl);
    }

    pub fn len(&self) -> usize {
        self.by_state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_state.is_empty()
    }
}

impl Default for PendingLinks {
    fn default() -> Self {
        Self::new()
    }
}
