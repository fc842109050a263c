//! Shared application state.

use std::sync::Arc;

use reqwest::Client;

use crate::chat::ChatLog;
use crate::link::oauth::discord::DiscordClient;
use crate::link::{LinkConfig, Linker, MappingStore, PendingLinks};

/// State handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<LinkConfig>,
    pub linker: Linker,
    pub chat: ChatLog,
}

impl AppState {
    pub fn new(config: LinkConfig, store: MappingStore, http: Client) -> Self {
        let config = Arc::new(config);
        let discord = DiscordClient::new(http, config.clone());
        let linker = Linker::new(store, PendingLinks::new(), discord, config.clone());
        Self {
            config,
            linker,
            chat: ChatLog::new(),
        }
    }
}
