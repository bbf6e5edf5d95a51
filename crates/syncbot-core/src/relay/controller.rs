//! Relay controller: pause flag, outbound relay and config hot-reload.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channel::{OutboundMessage, Platform};
use crate::config::RelayConfig;
use crate::session::{LiveSession, SessionConnector};

use super::message::InboundMessage;

/// Format a relayed message the way it appears on the other platform.
pub fn format_relay(display_name: &str, text: &str, is_edit: bool) -> String {
    if is_edit {
        format!("[{}]*EDIT*: {}", display_name, text)
    } else {
        format!("[{}]: {}", display_name, text)
    }
}

/// Owns the pause flag and the live session
pub struct RelayController {
    paused: bool,
    live: LiveSession,
    connector: Arc<dyn SessionConnector>,
    /// Cancelled when the bot can no longer report its own failures
    fatal: CancellationToken,
}

impl RelayController {
    pub fn new(
        live: LiveSession,
        connector: Arc<dyn SessionConnector>,
        fatal: CancellationToken,
    ) -> Self {
        Self {
            paused: false,
            live,
            connector,
            fatal,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn live(&self) -> &LiveSession {
        &self.live
    }

    pub fn config(&self) -> &Arc<RelayConfig> {
        &self.live.config
    }

    /// Stop relaying plain messages.
    pub async fn pause(&mut self) -> String {
        if self.paused {
            return "Syncing already paused".to_string();
        }

        self.paused = true;
        info!("Syncing paused");
        let text = "Syncing has been paused";
        self.announce(text).await;
        text.to_string()
    }

    /// Resume relaying plain messages.
    pub async fn unpause(&mut self) -> String {
        if !self.paused {
            return "Syncing already not paused".to_string();
        }

        self.paused = false;
        info!("Syncing unpaused");
        let text = "Syncing has been unpaused";
        self.announce(text).await;
        text.to_string()
    }

    /// Forward a plain message to the opposite platform's sync conversation.
    ///
    /// Callers check [`is_paused`](Self::is_paused) first.
    pub async fn relay(&self, msg: &InboundMessage, display_name: &str, is_edit: bool) {
        let target = msg.platform.other();
        let text = format_relay(display_name, &msg.text, is_edit);
        debug!("Relaying {} -> {}: {}", msg.platform, target, text);
        self.send_or_report(target, &text).await;
    }

    /// Send to `platform`'s sync conversation, reporting failures.
    pub async fn send_or_report(&self, platform: Platform, text: &str) -> bool {
        match self.live.channels.send_to_default(platform, text).await {
            Ok(()) => true,
            Err(e) => {
                self.report_failure(&format!("Failed to send to {}", platform), &e)
                    .await;
                false
            }
        }
    }

    /// Send to a specific conversation on `platform`, reporting failures.
    pub async fn send_to_or_report(&self, platform: Platform, conversation_id: &str, text: &str) {
        let message = OutboundMessage::new(conversation_id, text);
        if let Err(e) = self.live.channels.send_to(platform, message).await {
            self.report_failure(&format!("Failed to send to {}", platform), &e)
                .await;
        }
    }

    /// Send `text` to both sync conversations.
    pub async fn announce(&self, text: &str) {
        for platform in Platform::all() {
            self.send_or_report(platform, text).await;
        }
    }

    /// Log a send failure to the troubleshooting channel.
    ///
    /// When the troubleshooting channel itself cannot be reached the fatal
    /// token is cancelled and the process is expected to stop.
    pub async fn report_failure(&self, context: &str, err: &anyhow::Error) {
        warn!("{}: {:#}", context, err);

        let Some(channel_id) = self.live.config.troubleshooting_channel() else {
            return;
        };

        let report = OutboundMessage::new(channel_id, format!("{}: {:#}", context, err));
        if let Err(report_err) = self.live.channels.send_to(Platform::Discord, report).await {
            error!(
                "Failed to report to troubleshooting channel {}: {:#}",
                channel_id, report_err
            );
            self.fatal.cancel();
        }
    }

    /// Re-read the config file and reconnect.
    ///
    /// The new session is fully connected before it replaces the old one. On
    /// any failure the previous config and session stay in place.
    pub async fn reload(&mut self) -> String {
        let filename = self.live.config.filename.clone();
        info!("Reloading config from {}", filename.display());

        let config = match RelayConfig::load(&filename) {
            Ok(config) => config,
            Err(e) => {
                warn!("Config reload failed: {}", e);
                return format!("Failed to read config: {}", e);
            }
        };

        let channels = match self.connector.connect(&config).await {
            Ok(channels) => channels,
            Err(e) => {
                warn!("Session reconnect failed: {:#}", e);
                return format!("Failed to update config: {:#}", e);
            }
        };

        let previous = std::mem::replace(&mut self.live, LiveSession::new(config, channels));
        previous.channels.close_all().await;

        info!("Config reloaded");
        "Updated config".to_string()
    }
}
