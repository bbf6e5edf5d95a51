//! Channel Types
//!
//! Core types shared by both platform channels.

use serde::{Deserialize, Serialize};

/// Platform identifier
///
/// The relay always runs between exactly two platforms, so every platform
/// has a well-defined opposite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Gateway-driven platform (websocket events, REST sends)
    Discord,
    /// Webhook-driven platform (HTTP callbacks, bot posts)
    GroupMe,
}

impl Platform {
    /// The platform messages from this one are relayed to
    pub fn other(self) -> Self {
        match self {
            Self::Discord => Self::GroupMe,
            Self::GroupMe => Self::Discord,
        }
    }

    /// Display name for logs and replies
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Discord => "Discord",
            Self::GroupMe => "GroupMe",
        }
    }

    pub fn all() -> [Platform; 2] {
        [Self::Discord, Self::GroupMe]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Outbound message to a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Conversation identifier (Discord channel ID, GroupMe bot ID)
    pub conversation_id: String,
    /// Plain text content
    pub content: String,
}

impl OutboundMessage {
    pub fn new(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_other_is_involution() {
        for platform in Platform::all() {
            assert_ne!(platform.other(), platform);
            assert_eq!(platform.other().other(), platform);
        }
    }

    #[test]
    fn test_platform_display_name() {
        assert_eq!(Platform::Discord.display_name(), "Discord");
        assert_eq!(Platform::GroupMe.to_string(), "GroupMe");
    }

    #[test]
    fn test_outbound_message_new() {
        let msg = OutboundMessage::new("chan-1", "hello");
        assert_eq!(msg.conversation_id, "chan-1");
        assert_eq!(msg.content, "hello");
    }
}
