//! Platform sessions.
//!
//! A [`LiveSession`] pairs a config snapshot with the channels built from it.
//! Reload builds a complete replacement through a [`SessionConnector`] before
//! swapping it in, so nothing ever observes a half-connected session.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::channel::{ChannelRouter, DiscordChannel, GroupMeChannel, Platform};
use crate::config::RelayConfig;
use crate::relay::GatewayEvent;

/// Builds fully established platform channels for a config.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// Connect both platforms. The returned router has each platform's sync
    /// conversation registered as its default.
    async fn connect(&self, config: &RelayConfig) -> Result<ChannelRouter>;
}

/// Config snapshot and the channels built from it
#[derive(Clone)]
pub struct LiveSession {
    pub config: Arc<RelayConfig>,
    pub channels: Arc<ChannelRouter>,
}

impl LiveSession {
    pub fn new(config: RelayConfig, channels: ChannelRouter) -> Self {
        Self {
            config: Arc::new(config),
            channels: Arc::new(channels),
        }
    }
}

/// Connector for the real platforms
///
/// Every Discord session it opens feeds the same event queue, so the consumer
/// keeps working across reloads. A session that drops on its own cancels
/// `lost`.
pub struct PlatformConnector {
    events: mpsc::Sender<GatewayEvent>,
    lost: CancellationToken,
}

impl PlatformConnector {
    pub fn new(events: mpsc::Sender<GatewayEvent>, lost: CancellationToken) -> Self {
        Self { events, lost }
    }
}

#[async_trait]
impl SessionConnector for PlatformConnector {
    async fn connect(&self, config: &RelayConfig) -> Result<ChannelRouter> {
        let discord = Arc::new(DiscordChannel::with_token(&config.discord.bot_token));
        discord
            .open(self.events.clone(), self.lost.clone())
            .await
            .context("Failed to open Discord session")?;

        let groupme = Arc::new(GroupMeChannel::new(&config.groupme_bot_token));

        let mut channels = ChannelRouter::new();
        channels.register_with_default(discord, config.sync_conversation(Platform::Discord));
        channels.register_with_default(groupme, config.sync_conversation(Platform::GroupMe));

        info!(
            "Platform session ready (sync={}, admin={})",
            config.discord.sync_channel_id, config.discord.admin_channel_id
        );
        Ok(channels)
    }
}
