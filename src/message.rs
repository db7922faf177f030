//! Chat messages as received from the conversation transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt.
    System,
    /// User message. Content is always literal text.
    User,
    /// Assistant response. Content is a JSON payload.
    Assistant,
    /// Tool response.
    Tool,
}

impl MessageRole {
    /// Whether content from this role is a structured payload.
    #[must_use]
    pub fn carries_payload(self) -> bool {
        !matches!(self, Self::User)
    }

    /// Lowercase role name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A single transcript message.
///
/// Messages are immutable once received; the pipeline only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message identity, used to derive stable segment keys.
    #[serde(default)]
    pub id: String,
    /// Role of the message author.
    pub role: MessageRole,
    /// Raw content: literal text for users, a JSON payload otherwise.
    pub content: String,
    /// When the message was created, if the transcript records it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Create a message with a fresh identity.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Some(Utc::now()),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Replace the identity of this message.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}
