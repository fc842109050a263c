//! Helpers shared by the unit tests: a fake Discord API and prebuilt state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;

use crate::link::oauth::discord::DiscordClient;
use crate::link::{LinkConfig, Linker, MappingStore, PendingLinks};
use crate::state::AppState;

pub const TEST_FRONTEND_URL: &str = "http://frontend.test";

pub fn test_config(discord_api_url: &str) -> LinkConfig {
    LinkConfig {
        discord_client_id: Some("client-123".to_string()),
        discord_client_secret: Some("secret".to_string()),
        discord_redirect_uri: "http://localhost:3000/discord/callback".to_string(),
        discord_api_url: discord_api_url.to_string(),
        discord_authorize_url: "https://discord.com/oauth2/authorize".to_string(),
        frontend_url: TEST_FRONTEND_URL.to_string(),
        legacy_state_address: true,
    }
}

/// Start a fake Discord API on a random local port and return its base URL.
///
/// The authorization code picks the behavior:
/// - `bad`: token endpoint answers 400
/// - `empty-token`: token endpoint returns an empty access token
/// - `user-error`: user endpoint answers 500
/// - `nameless`: user has neither username nor global name
/// - `name|Global`: username `name`, global name `Global`
/// - `slow-*`: token endpoint stalls briefly
/// - `hang`: token endpoint stalls for two seconds
/// - anything else: username equal to the code
pub async fn spawn_fake_discord() -> String {
    let app = Router::new()
        .route("/oauth2/token", post(fake_token))
        .route("/users/@me", get(fake_user));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn fake_token(Form(form): Form<HashMap<String, String>>) -> Response {
    if form.get("client_id").map(String::as_str) != Some("client-123")
        || form.get("grant_type").map(String::as_str) != Some("authorization_code")
    {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid_client" }))).into_response();
    }

    let code = form.get("code").cloned().unwrap_or_default();
    if code.starts_with("slow-") {
        tokio::time::sleep(Duration::from_millis(50)).await;
    } else if code == "hang" {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    match code.as_str() {
        "bad" => (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" }))).into_response(),
        "empty-token" => Json(json!({ "access_token": "" })).into_response(),
        _ => Json(json!({
            "access_token": format!("tok-{}", code),
            "token_type": "Bearer",
            "expires_in": 604800,
            "scope": "identify",
        }))
        .into_response(),
    }
}

async fn fake_user(headers: HeaderMap) -> Response {
    let code = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer tok-"));

    match code {
        None => StatusCode::UNAUTHORIZED.into_response(),
        Some("user-error") => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        Some("nameless") => Json(json!({ "id": "1" })).into_response(),
        Some(code) => match code.split_once('|') {
            Some((username, global_name)) => Json(json!({
                "id": "1",
                "username": username,
                "global_name": global_name,
            }))
            .into_response(),
            None => Json(json!({ "id": "1", "username": code, "global_name": null })).into_response(),
        },
    }
}

/// Linker backed by a fresh mappings file in a temp dir.
pub fn test_linker(discord_api_url: &str, legacy_state_address: bool) -> (tempfile::TempDir, Linker) {
    test_linker_with_http(discord_api_url, legacy_state_address, reqwest::Client::new())
}

/// Same as [`test_linker`], with a caller-built HTTP client.
pub fn test_linker_with_http(
    discord_api_url: &str,
    legacy_state_address: bool,
    http: reqwest::Client,
) -> (tempfile::TempDir, Linker) {
    let dir = tempfile::tempdir().unwrap();
    let store = MappingStore::open(dir.path().join("discordMappings.json"));
    let mut config = test_config(discord_api_url);
    config.legacy_state_address = legacy_state_address;
    let config = Arc::new(config);
    let discord = DiscordClient::new(http, config.clone());
    let linker = Linker::new(store, PendingLinks::new(), discord, config);
    (dir, linker)
}

/// Full application state backed by a temp dir.
pub fn test_state(discord_api_url: &str) -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let store = MappingStore::open(dir.path().join("discordMappings.json"));
    let state = AppState::new(test_config(discord_api_url), store, reqwest::Client::new());
    (dir, state)
}
