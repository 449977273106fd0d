//! Chat transcript types

use serde::{Deserialize, Serialize};

/// Speaker of a transcript entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Image attached to a user turn.
///
/// `url` is either an inline `data:` URL or a link returned by the blob store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageAttachment {
    pub url: String,
}

impl ImageAttachment {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// True when the image travels inside the request as a data URL
    pub fn is_inline(&self) -> bool {
        self.url.starts_with("data:")
    }
}

/// One entry of a conversation transcript
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<ImageAttachment>,
    /// Set when an assistant turn stopped before the provider finished it
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub incomplete: bool,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>, attachment: Option<ImageAttachment>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attachment,
            incomplete: false,
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            attachment: None,
            incomplete: false,
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}
