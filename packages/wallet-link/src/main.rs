//! Wallet Link Server
//!
//! A small HTTP backend that provides:
//!
//! 1. **Discord linking**: a wallet client sends its user through Discord's
//!    OAuth2 consent page; the callback binds the wallet address to the
//!    Discord display name in a JSON mappings file.
//!
//! 2. **Lookup and unlink**: read the name linked to an address, or drop
//!    the link (administrative).
//!
//! 3. **Chat**: an in-memory message log that resets on restart.

mod chat;
mod error;
mod link;
mod state;
#[cfg(test)]
mod test_support;

use std::time::Duration;

use axum::{
    extract::State,
    http::Method,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use link::{oauth::discord, LinkConfig, MappingStore};
use state::AppState;

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "wallet-link", version, about = "Wallet ↔ Discord link server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "PORT")]
    port: u16,

    /// JSON file holding address → Discord name mappings
    #[arg(long, default_value = "discordMappings.json", env = "MAPPINGS_FILE")]
    mappings_file: String,

    /// Timeout for calls to Discord, in seconds
    #[arg(long, default_value_t = 15, env = "UPSTREAM_TIMEOUT_SECS")]
    upstream_timeout_secs: u64,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false, env = "LOG_JSON")]
    log_json: bool,
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wallet_link=info,tower_http=info".into());
    if args.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = LinkConfig::from_env();
    if !config.discord_enabled() {
        tracing::warn!("DISCORD_CLIENT_ID / DISCORD_CLIENT_SECRET not set, linking will fail");
    }
    if config.legacy_state_address {
        tracing::info!("Accepting wallet addresses as OAuth state");
    }

    let store = MappingStore::open(&args.mappings_file);

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.upstream_timeout_secs))
        .build()
        .expect("Failed to build HTTP client");

    let app = router(AppState::new(config, store, http));

    let addr = format!("0.0.0.0:{}", args.port);
    tracing::info!("Wallet link server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server error");
}

/// Build the application router.
fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/discord/start", get(discord::start))
        .route("/discord/callback", get(discord::callback))
        .route("/discord/forgive", post(link::api::forgive))
        .route("/discord/:address", get(link::api::lookup))
        .route("/api/chat", get(chat::api::list).post(chat::api::post))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Route Handlers ────────────────────────────────────────────────────────────

/// Health check endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "wallet-link",
        "version": env!("CARGO_PKG_VERSION"),
        "mappings": state.linker.store().len(),
        "pending_links": state.linker.pending().len(),
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
