//! Lookup and unlink endpoints.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::LinkError;
use crate::state::AppState;

/// Lookup response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordIdResponse {
    pub discord_id: String,
}

/// Body for the unlink endpoint.
#[derive(Debug, Deserialize)]
pub struct ForgiveRequest {
    pub address: Option<String>,
}

/// Get the Discord identity linked to an address.
///
/// GET /discord/:address
pub async fn lookup(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<DiscordIdResponse>, LinkError> {
    state
        .linker
        .store()
        .get(&address)
        .map(|discord_id| Json(DiscordIdResponse { discord_id }))
        .ok_or_else(|| LinkError::NotFound("Discord ID not found for this address".to_string()))
}

/// Remove the link for an address.
///
/// POST /discord/forgive
/// Body: { "address": "0x..." }
///
/// Administrative; callers are trusted.
pub async fn forgive(
    State(state): State<AppState>,
    body: Option<Json<ForgiveRequest>>,
) -> Result<impl IntoResponse, LinkError> {
    let address = body
        .and_then(|Json(request)| request.address)
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| LinkError::BadRequest("Address is required".to_string()))?;

    if state.linker.store().delete(&address)? {
        tracing::info!(address = address.as_str(), "Discord link forgiven");
        Ok(Json(serde_json::json!({ "message": "User forgiven" })))
    } else {
        Err(LinkError::NotFound(
            "No Discord ID found for this address".to_string(),
        ))
    }
}
