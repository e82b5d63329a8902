//! Conversation types.

use clipsage_core::ids::now_millis;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Unix millis.
    pub timestamp: i64,
    /// Chunk ids the answer drew from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    /// The backend served a cached answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_used: Option<bool>,
}

impl ChatMessage {
    pub fn user(id: String, content: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            content: content.into(),
            timestamp: now_millis(),
            sources: None,
            cache_used: None,
        }
    }

    pub fn assistant(
        id: String,
        content: impl Into<String>,
        sources: Vec<String>,
        cache_used: Option<bool>,
    ) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: content.into(),
            timestamp: now_millis(),
            sources: Some(sources),
            cache_used,
        }
    }
}
