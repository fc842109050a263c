//! Error type shared by the store, the linker, and the HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Result type alias for linking operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Every way a request against the service can fail.
#[derive(Error, Debug)]
pub enum LinkError {
    /// A required parameter was missing or empty.
    #[error("{0}")]
    BadRequest(String),

    /// The OAuth state matched no pending link and is not usable as an address.
    #[error("Invalid or expired state. Please try again.")]
    InvalidState,

    /// Discord rejected the code, returned no token, or no usable identity.
    #[error("Discord request failed: {0}")]
    Upstream(String),

    /// The identity is already bound to another address.
    #[error("Discord account is already linked to {existing_address}")]
    Conflict { existing_address: String },

    /// No mapping exists for the address.
    #[error("{0}")]
    NotFound(String),

    /// The mappings document could not be written.
    #[error("Failed to persist mappings: {0}")]
    Io(#[from] std::io::Error),

    /// The mappings document could not be encoded.
    #[error("Failed to encode mappings: {0}")]
    Encode(#[from] serde_json::Error),
}

impl LinkError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            LinkError::BadRequest(_) | LinkError::InvalidState => StatusCode::BAD_REQUEST,
            LinkError::Upstream(_) => StatusCode::BAD_GATEWAY,
            LinkError::Conflict { .. } => StatusCode::CONFLICT,
            LinkError::NotFound(_) => StatusCode::NOT_FOUND,
            LinkError::Io(_) | LinkError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable reason, used in frontend redirects.
    pub fn reason(&self) -> &'static str {
        match self {
            LinkError::BadRequest(_) => "bad_request",
            LinkError::InvalidState => "invalid_state",
            LinkError::Upstream(_) => "upstream",
            LinkError::Conflict { .. } => "conflict",
            LinkError::NotFound(_) => "not_found",
            LinkError::Io(_) | LinkError::Encode(_) => "storage",
        }
    }
}

impl IntoResponse for LinkError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
