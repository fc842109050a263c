//! Drives a single link attempt from OAuth callback to stored mapping.
//!
//! An attempt moves through start → token exchange → identity fetch →
//! conflict check → commit, and stops at the first failure. Nothing is
//! retried; the wallet client starts a new attempt instead.

use std::sync::Arc;

use uuid::Uuid;

use super::oauth::discord::DiscordClient;
use super::oauth::CallbackQuery;
use super::{normalize_address, LinkConfig, LinkOutcome, MappingStore, PendingLinks, Taken};
use crate::error::{LinkError, Result};

/// A committed link.
#[derive(Debug, Clone)]
pub struct Linked {
    pub address: String,
    pub identity: String,
    pub outcome: LinkOutcome,
}

/// Owns everything a link attempt touches.
#[derive(Clone)]
pub struct Linker {
    store: MappingStore,
    pending: PendingLinks,
    discord: DiscordClient,
    config: Arc<LinkConfig>,
}

impl Linker {
    pub fn new(
        store: MappingStore,
        pending: PendingLinks,
        discord: DiscordClient,
        config: Arc<LinkConfig>,
    ) -> Self {
        Self {
            store,
            pending,
            discord,
            config,
        }
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    pub fn pending(&self) -> &PendingLinks {
        &self.pending
    }

    /// Run the attempt described by an OAuth callback.
    pub async fn complete(&self, query: &CallbackQuery) -> Result<Linked> {
        let code = non_empty(&query.code);
        let state = non_empty(&query.state);

        let (code, state) = match (code, state) {
            (Some(code), Some(state)) => (code, state),
            _ => {
                let message = match query.error_description.as_ref().or(query.error.as_ref()) {
                    Some(reason) => format!("Discord authorization failed: {}", reason),
                    None => "Missing code or state".to_string(),
                };
                return Err(LinkError::BadRequest(message));
            }
        };

        let address = self.resolve_address(state)?;

        let access_token = self.discord.exchange_code(code).await?;
        let user = self.discord.fetch_user(&access_token).await?;
        let identity = user.display_name().ok_or_else(|| {
            LinkError::Upstream("Discord account has no display name or username".to_string())
        })?;

        tracing::debug!(
            address = address.as_str(),
            discord_user_id = user.id.as_str(),
            "Discord identity resolved"
        );

        let outcome = self.store.link(&address, &identity)?;
        Ok(Linked {
            address,
            identity,
            outcome,
        })
    }

    /// Wallet address an OAuth state stands for.
    ///
    /// A live pending token wins. A token we issued that is spent or
    /// expired is refused. Otherwise, in legacy mode, the state is the
    /// address itself, unless it looks like one of our tokens.
    fn resolve_address(&self, state: &str) -> Result<String> {
        match self.pending.take(state) {
            Taken::Live(pending) => return Ok(pending.address),
            Taken::Spent | Taken::Expired => return Err(LinkError::InvalidState),
            Taken::Unknown => {}
        }

        if !self.config.legacy_state_address || Uuid::parse_str(state.trim()).is_ok() {
            return Err(LinkError::InvalidState);
        }

        normalize_address(state).ok_or(LinkError::InvalidState)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
