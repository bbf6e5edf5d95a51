//! Channel Router - Per-platform outbound routing
//!
//! Holds one channel per platform together with its default conversation
//! (the platform's sync endpoint).

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::traits::Channel;
use super::types::{OutboundMessage, Platform};

/// Registry of platform channels for outbound messages
///
/// # Example
///
/// ```ignore
/// let mut router = ChannelRouter::new();
/// router.register_with_default(discord, "sync-channel-id");
/// router.register_with_default(groupme, "bot-id");
///
/// router.send_to_default(Platform::GroupMe, "[alice]: hi").await?;
/// ```
#[derive(Default)]
pub struct ChannelRouter {
    channels: HashMap<Platform, Arc<dyn Channel>>,
    default_conversations: HashMap<Platform, String>,
}

impl ChannelRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel
    ///
    /// If a channel for the same platform already exists, it will be replaced.
    pub fn register(&mut self, channel: Arc<dyn Channel>) {
        let platform = channel.platform();
        info!("Registering channel: {}", channel.name());
        self.channels.insert(platform, channel);
    }

    /// Register a channel with the conversation used for sync traffic
    pub fn register_with_default(
        &mut self,
        channel: Arc<dyn Channel>,
        default_conversation: impl Into<String>,
    ) {
        self.default_conversations
            .insert(channel.platform(), default_conversation.into());
        self.register(channel);
    }

    pub fn get(&self, platform: Platform) -> Option<&Arc<dyn Channel>> {
        self.channels.get(&platform)
    }

    pub fn default_conversation(&self, platform: Platform) -> Option<&str> {
        self.default_conversations.get(&platform).map(String::as_str)
    }

    /// Send message to a specific platform
    pub async fn send_to(&self, platform: Platform, message: OutboundMessage) -> Result<()> {
        let channel = self
            .get(platform)
            .ok_or_else(|| anyhow!("Channel {} not registered", platform))?;

        if !channel.is_configured() {
            return Err(anyhow!("Channel {} not configured", platform));
        }

        debug!(
            "Sending message to {} (conversation={})",
            platform, message.conversation_id
        );
        channel.send(message).await
    }

    /// Send text to the default conversation of a platform.
    pub async fn send_to_default(&self, platform: Platform, content: &str) -> Result<()> {
        let conversation_id = self
            .default_conversation(platform)
            .ok_or_else(|| anyhow!("No default conversation configured for {}", platform))?;

        let message = OutboundMessage::new(conversation_id, content);
        self.send_to(platform, message).await
    }

    /// Send text to the default conversation of every platform.
    ///
    /// Returns one (platform, result) pair per platform, in `Platform::all()`
    /// order, so callers can report each failure individually.
    pub async fn broadcast(&self, content: &str) -> Vec<(Platform, Result<()>)> {
        let mut results = Vec::with_capacity(2);
        for platform in Platform::all() {
            let result = self.send_to_default(platform, content).await;
            results.push((platform, result));
        }
        results
    }

    /// Close every registered channel, logging failures.
    pub async fn close_all(&self) {
        for channel in self.channels.values() {
            if let Err(e) = channel.close().await {
                warn!("Failed to close {} channel: {}", channel.name(), e);
            }
        }
    }
}
