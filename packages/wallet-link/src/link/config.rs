//! Linking service configuration.
//!
//! Discord OAuth2 client settings and the frontend redirect target, loaded
//! from environment variables with baked-in defaults.

use std::env;

/// Default redirect URI registered with the Discord application.
pub const DEFAULT_REDIRECT_URI: &str =
    "https://treasure-hunt-frontend-livid.vercel.app/discord/callback";

/// Default frontend page the callback sends the browser back to.
pub const DEFAULT_FRONTEND_URL: &str = "https://treasure-hunt-frontend-livid.vercel.app";

/// Discord OAuth2 scopes required to read the account's name.
pub const DISCORD_SCOPES: &[&str] = &["identify"];

/// Pending link TTL in seconds (10 minutes).
pub const PENDING_LINK_TTL_SECS: i64 = 600;

/// How long a consumed or expired state token is remembered (24 hours).
pub const SPENT_STATE_TTL_SECS: i64 = 24 * 3600;

/// Linking service configuration.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Discord OAuth2 client ID.
    pub discord_client_id: Option<String>,
    /// Discord OAuth2 client secret.
    pub discord_client_secret: Option<String>,
    /// Redirect URI sent in both the authorize and token requests.
    pub discord_redirect_uri: String,
    /// Discord REST base URL (token + user endpoints hang off it).
    pub discord_api_url: String,
    /// Discord authorization page.
    pub discord_authorize_url: String,
    /// Where the browser lands after the callback.
    pub frontend_url: String,
    /// Accept a raw wallet address as the OAuth `state` when no pending
    /// link matches it. Older wallet clients start the flow this way.
    pub legacy_state_address: bool,
}

impl LinkConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            discord_client_id: non_empty_var("DISCORD_CLIENT_ID"),
            discord_client_secret: non_empty_var("DISCORD_CLIENT_SECRET"),
            discord_redirect_uri: non_empty_var("DISCORD_REDIRECT_URI")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            discord_api_url: non_empty_var("DISCORD_API_URL")
                .unwrap_or_else(|| "https://discord.com/api/v10".to_string()),
            discord_authorize_url: non_empty_var("DISCORD_AUTHORIZE_URL")
                .unwrap_or_else(|| "https://discord.com/oauth2/authorize".to_string()),
            frontend_url: non_empty_var("FRONTEND_URL")
                .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
            legacy_state_address: env::var("LEGACY_STATE_ADDRESS")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(true),
        }
    }

    /// Check if Discord OAuth2 is configured.
    pub fn discord_enabled(&self) -> bool {
        self.discord_client_id.is_some() && self.discord_client_secret.is_some()
    }

    /// Discord OAuth2 token URL.
    pub fn discord_token_url(&self) -> String {
        format!("{}/oauth2/token", self.discord_api_url.trim_end_matches('/'))
    }

    /// Discord current-user URL.
    pub fn discord_user_url(&self) -> String {
        format!("{}/users/@me", self.discord_api_url.trim_end_matches('/'))
    }

    /// Build the Discord authorization URL for a state token.
    pub fn discord_auth_url(&self, state: &str) -> Option<String> {
        let client_id = self.discord_client_id.as_ref()?;
        Some(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.discord_authorize_url,
            urlencoding::encode(client_id),
            urlencoding::encode(&self.discord_redirect_uri),
            DISCORD_SCOPES.join("%20"),
            urlencoding::encode(state),
        ))
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LinkConfig {
        LinkConfig {
            discord_client_id: Some("client-123".to_string()),
            discord_client_secret: Some("secret".to_string()),
            discord_redirect_uri: "http://localhost:3000/discord/callback".to_string(),
            discord_api_url: "http://127.0.0.1:9/api/".to_string(),
            discord_authorize_url: "https://discord.com/oauth2/authorize".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            legacy_state_address: true,
        }
    }

    #[test]
    fn test_endpoint_urls() {
        let config = test_config();
        assert_eq!(config.discord_token_url(), "http://127.0.0.1:9/api/oauth2/token");
        assert_eq!(config.discord_user_url(), "http://127.0.0.1:9/api/users/@me");
    }

    #[test]
    fn test_auth_url_encodes_redirect() {
        let url = test_config().discord_auth_url("abc-123").unwrap();
        assert!(url.starts_with("https://discord.com/oauth2/authorize?client_id=client-123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fdiscord%2Fcallback"));
        assert!(url.contains("scope=identify"));
        assert!(url.ends_with("state=abc-123"));
    }

    #[test]
    fn test_disabled_without_credentials() {
        let mut config = test_config();
        assert!(config.discord_enabled());
        config.discord_client_secret = None;
        assert!(!config.discord_enabled());
        config.discord_client_id = None;
        assert!(config.discord_auth_url("x").is_none());
    }
}
