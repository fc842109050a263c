//! OAuth2 handlers for wallet ↔ Discord linking.

pub mod discord;

use serde::{Deserialize, Serialize};

/// Query parameters for starting a link.
#[derive(Debug, Deserialize)]
pub struct StartLinkQuery {
    /// Wallet address to link.
    pub address: Option<String>,
}

/// Response for starting a link.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartLinkResponse {
    /// Discord authorization page to send the user to.
    pub redirect_url: String,
    /// Opaque state token bound to the address.
    pub state: String,
}

/// Query parameters for the OAuth callback.
///
/// Every field is optional so a missing one is reported as a bad request
/// rather than rejected by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code from Discord.
    pub code: Option<String>,
    /// Pending link token, or the wallet address itself for older clients.
    pub state: Option<String>,
    /// Set by Discord when the user denied access.
    pub error: Option<String>,
    /// Human-readable companion to `error`.
    pub error_description: Option<String>,
}

/// Frontend URL with the link outcome appended to its query string.
pub fn frontend_redirect(frontend_url: &str, linked: bool, reason: Option<&str>) -> String {
    let separator = if frontend_url.contains('?') { '&' } else { '?' };
    let mut url = format!("{}{}linked={}", frontend_url, separator, linked);
    if let Some(reason) = reason {
        url.push_str("&reason=");
        url.push_str(&urlencoding::encode(reason));
    }
    url
}
