//! Chat endpoints.
//!
//! - `GET /api/chat`: all messages, oldest first
//! - `POST /api/chat`: post a message

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;

use crate::error::LinkError;
use crate::state::AppState;

/// Body for posting a message.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub user: Option<String>,
    pub text: Option<String>,
}

/// GET /api/chat
pub async fn list(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.chat.list().await)
}

/// POST /api/chat
/// Body: { "user": "...", "text": "..." }
pub async fn post(
    State(state): State<AppState>,
    body: Option<Json<PostMessageRequest>>,
) -> Result<impl IntoResponse, LinkError> {
    let (user, text) = match body {
        Some(Json(PostMessageRequest {
            user: Some(user),
            text: Some(text),
        })) => (user, text),
        _ => {
            return Err(LinkError::BadRequest(
                "User and text are required".to_string(),
            ))
        }
    };

    let message = state.chat.append(&user, &text).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
