//! Inbound event shapes and their normalization.
//!
//! Both platforms deliver different payloads; everything past this module works
//! on [`InboundMessage`] and its [`Platform`] tag only.

use serde::{Deserialize, Serialize};

use crate::channel::Platform;

/// GroupMe `sender_type` for messages written by people
pub const GROUPME_USER_SENDER: &str = "user";

/// Normalized inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
    /// Raw platform identity (Discord nickname or username, GroupMe name)
    pub username: String,
    pub platform: Platform,
}

impl InboundMessage {
    pub fn new(platform: Platform, username: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            username: username.into(),
            platform,
        }
    }
}

/// Message event delivered by the Discord gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEvent {
    pub text: String,
    pub username: String,
    /// Channel the message was posted in
    pub channel_id: String,
    /// `MESSAGE_UPDATE` rather than `MESSAGE_CREATE`
    pub is_edit: bool,
    pub is_bot: bool,
}

impl GatewayEvent {
    pub fn to_inbound(&self) -> InboundMessage {
        InboundMessage::new(Platform::Discord, &self.username, &self.text)
    }
}

/// GroupMe bot callback body
///
/// GroupMe sends many more fields; only the ones the relay reads are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "senderType")]
    pub sender_type: String,
}

impl WebhookPayload {
    /// Whether the payload was written by a person (not a bot or the system)
    pub fn is_from_user(&self) -> bool {
        self.sender_type == GROUPME_USER_SENDER
    }

    pub fn to_inbound(&self) -> InboundMessage {
        InboundMessage::new(
            Platform::GroupMe,
            &self.name,
            self.text.clone().unwrap_or_default(),
        )
    }
}
