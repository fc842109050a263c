//! Discord OAuth2 implementation.
//!
//! Handles the Discord OAuth2 flow for wallet linking.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use reqwest::Client;
use serde::Deserialize;

use super::{frontend_redirect, CallbackQuery, StartLinkQuery, StartLinkResponse};
use crate::error::{LinkError, Result};
use crate::link::{normalize_address, LinkConfig};
use crate::state::AppState;

/// Discord user response from API.
#[derive(Debug, Deserialize)]
pub struct DiscordUser {
    #[serde(default)]
    pub id: String,
    pub username: Option<String>,
    pub global_name: Option<String>,
}

impl DiscordUser {
    /// Display identity: the global display name, else the username.
    pub fn display_name(&self) -> Option<String> {
        [&self.global_name, &self.username]
            .into_iter()
            .flatten()
            .map(|name| name.trim())
            .find(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// Discord token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Thin client for the two Discord calls the link flow makes.
#[derive(Clone)]
pub struct DiscordClient {
    http: Client,
    config: Arc<LinkConfig>,
}

impl DiscordClient {
    pub fn new(http: Client, config: Arc<LinkConfig>) -> Self {
        Self { http, config }
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let (client_id, client_secret) = match (
            self.config.discord_client_id.as_ref(),
            self.config.discord_client_secret.as_ref(),
        ) {
            (Some(id), Some(secret)) => (id, secret),
            _ => return Err(LinkError::Upstream("Discord OAuth not configured".to_string())),
        };

        let response = self
            .http
            .post(self.config.discord_token_url())
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.discord_redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Discord token request failed: {}", e);
                LinkError::Upstream(transport_error(&e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Discord token exchange failed: {} - {}", status, body);
            return Err(LinkError::Upstream(format!(
                "token exchange rejected ({})",
                status.as_u16()
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Discord token response: {}", e);
            LinkError::Upstream("failed to parse token response".to_string())
        })?;

        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LinkError::Upstream("failed to obtain access token".to_string()))
    }

    /// Fetch the user behind an access token.
    pub async fn fetch_user(&self, access_token: &str) -> Result<DiscordUser> {
        let response = self
            .http
            .get(self.config.discord_user_url())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Discord user request failed: {}", e);
                LinkError::Upstream(transport_error(&e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Discord user fetch failed: {} - {}", status, body);
            return Err(LinkError::Upstream(format!(
                "user lookup rejected ({})",
                status.as_u16()
            )));
        }

        response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Discord user response: {}", e);
            LinkError::Upstream("failed to parse user info".to_string())
        })
    }
}

fn transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Discord did not answer in time".to_string()
    } else {
        "failed to connect to Discord".to_string()
    }
}

/// Start Discord OAuth2 flow.
///
/// GET /discord/start?address=0x...
///
/// Returns the Discord authorization URL and the state token bound to the
/// address.
pub async fn start(
    State(state): State<AppState>,
    Query(query): Query<StartLinkQuery>,
) -> Response {
    if !state.config.discord_enabled() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "Discord OAuth not configured" })),
        )
            .into_response();
    }

    let Some(address) = query.address.as_deref().and_then(normalize_address) else {
        return LinkError::BadRequest("Address is required".to_string()).into_response();
    };

    let pending = state.linker.pending().begin(address);
    match state.config.discord_auth_url(&pending.state) {
        Some(redirect_url) => Json(StartLinkResponse {
            redirect_url,
            state: pending.state,
        })
        .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "Discord OAuth not configured" })),
        )
            .into_response(),
    }
}

/// Handle Discord OAuth2 callback.
///
/// GET /discord/callback?code=...&state=...
///
/// Missing parameters get a 400. Every other outcome sends the browser
/// back to the frontend with `linked=true` or `linked=false&reason=...`.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    match state.linker.complete(&query).await {
        Ok(linked) => {
            tracing::info!(
                address = linked.address.as_str(),
                discord_id = linked.identity.as_str(),
                outcome = ?linked.outcome,
                "Discord account linked"
            );
            Redirect::to(&frontend_redirect(&state.config.frontend_url, true, None)).into_response()
        }
        Err(e @ LinkError::BadRequest(_)) => {
            tracing::warn!(error = %e, "Rejected Discord callback");
            e.into_response()
        }
        Err(e) => {
            match &e {
                LinkError::Conflict { .. } | LinkError::InvalidState => {
                    tracing::warn!(error = %e, "Discord link refused")
                }
                _ => tracing::error!(error = %e, "Error in Discord callback"),
            }
            Redirect::to(&frontend_redirect(
                &state.config.frontend_url,
                false,
                Some(e.reason()),
            ))
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spawn_fake_discord, test_config};

    fn user(username: Option<&str>, global_name: Option<&str>) -> DiscordUser {
        DiscordUser {
            id: "123".to_string(),
            username: username.map(str::to_string),
            global_name: global_name.map(str::to_string),
        }
    }

    #[test]
    fn test_discord_user_display_name() {
        assert_eq!(user(Some("testuser"), None).display_name().as_deref(), Some("testuser"));
        assert_eq!(
            user(Some("testuser"), Some("Test User")).display_name().as_deref(),
            Some("Test User")
        );
        assert_eq!(
            user(Some("testuser"), Some("  ")).display_name().as_deref(),
            Some("testuser")
        );
        assert!(user(None, None).display_name().is_none());
    }

    async fn client() -> DiscordClient {
        let base = spawn_fake_discord().await;
        DiscordClient::new(Client::new(), Arc::new(test_config(&base)))
    }

    #[tokio::test]
    async fn test_exchange_and_fetch() {
        let discord = client().await;
        let token = discord.exchange_code("alice").await.unwrap();
        let user = discord.fetch_user(&token).await.unwrap();
        assert_eq!(user.display_name().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_rejected_code_is_upstream_error() {
        let discord = client().await;
        assert!(matches!(
            discord.exchange_code("bad").await,
            Err(LinkError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_token_is_upstream_error() {
        let discord = client().await;
        assert!(matches!(
            discord.exchange_code("empty-token").await,
            Err(LinkError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_discord_is_upstream_error() {
        let discord = DiscordClient::new(
            Client::new(),
            Arc::new(test_config("http://127.0.0.1:1")),
        );
        assert!(matches!(
            discord.exchange_code("alice").await,
            Err(LinkError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_client_is_upstream_error() {
        let base = spawn_fake_discord().await;
        let mut config = test_config(&base);
        config.discord_client_secret = None;
        let discord = DiscordClient::new(Client::new(), Arc::new(config));
        assert!(matches!(
            discord.exchange_code("alice").await,
            Err(LinkError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_upstream_error() {
        let base = spawn_fake_discord().await;
        let http = Client::builder()
            .timeout(std::time::Duration::from_millis(50))
            .build()
            .unwrap();
        let discord = DiscordClient::new(http, Arc::new(test_config(&base)));
        assert!(matches!(
            discord.exchange_code("hang").await,
            Err(LinkError::Upstream(_))
        ));
    }
}
