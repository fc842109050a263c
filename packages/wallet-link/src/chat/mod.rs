//! Volatile chat log.
//!
//! Messages live in memory only and are gone after a restart.

pub mod api;

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{LinkError, Result};

/// A posted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author: String,
    pub text: String,
    /// RFC 3339 UTC, millisecond precision.
    pub timestamp: String,
}

/// Append-only message list shared across requests.
#[derive(Clone, Default)]
pub struct ChatLog {
    messages: Arc<RwLock<Vec<ChatMessage>>>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message stamped with the current time.
    pub async fn append(&self, author: &str, text: &str) -> Result<ChatMessage> {
        if author.trim().is_empty() || text.trim().is_empty() {
            return Err(LinkError::BadRequest(
                "User and text are required".to_string(),
            ));
        }

        let message = ChatMessage {
            author: author.to_string(),
            text: text.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    /// All messages in the order they were appended.
    pub async fn list(&self) -> Vec<ChatMessage> {
        self.messages.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn test_append_keeps_order() {
        let log = ChatLog::new();
        for i in 0..5 {
            log.append("alice", &format!("message {}", i)).await.unwrap();
        }

        let messages = log.list().await;
        assert_eq!(messages.len(), 5);
        for (i, message) in messages.iter().enumerate() {
            assert_eq!(message.text, format!("message {}", i));
            assert!(DateTime::parse_from_rfc3339(&message.timestamp).is_ok());
            assert!(message.timestamp.ends_with('Z'));
        }
    }

    #[tokio::test]
    async fn test_blank_fields_rejected() {
        let log = ChatLog::new();
        assert!(log.append("", "hi").await.is_err());
        assert!(log.append("alice", "   ").await.is_err());
        assert_eq!(log.len().await, 0);
    }
}
