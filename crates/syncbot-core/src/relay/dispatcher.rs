//! Inbound dispatch.
//!
//! Entry points for the Discord gateway pump and the GroupMe webhook server.
//! Each inbound event is mapped to a command mode by its origin, routed, and
//! either answered, relayed or dropped.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::channel::Platform;
use crate::config::RelayConfig;
use crate::session::{LiveSession, SessionConnector};

use super::commands::{self, CommandMode, RouteDecision};
use super::controller::RelayController;
use super::message::{GatewayEvent, InboundMessage, WebhookPayload};
use super::state::RelayState;

/// What happened to an inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Bot-authored, non-user or from a channel the relay does not watch
    Ignored,
    /// Consumed as a command
    Handled,
    /// Mirrored to the other platform
    Relayed,
    /// Plain message dropped because syncing is paused
    Paused,
}

/// The relay bot
///
/// Both inbound sources serialize on a single lock, so commands and relays
/// observe the state in the order they arrive.
pub struct SyncBot {
    state: Mutex<RelayState>,
}

impl SyncBot {
    pub fn new(
        live: LiveSession,
        connector: Arc<dyn SessionConnector>,
        fatal: CancellationToken,
    ) -> Self {
        let controller = RelayController::new(live, connector, fatal);
        Self {
            state: Mutex::new(RelayState::new(controller)),
        }
    }

    /// Handle a message event from the Discord gateway.
    pub async fn on_gateway_event(&self, event: &GatewayEvent) -> DispatchOutcome {
        if event.is_bot {
            return DispatchOutcome::Ignored;
        }

        let mut state = self.state.lock().await;
        let mode = {
            let config = state.controller.config();
            if event.channel_id == config.discord.sync_channel_id {
                CommandMode::Sync
            } else if event.channel_id == config.discord.admin_channel_id {
                CommandMode::Admin
            } else {
                return DispatchOutcome::Ignored;
            }
        };

        let msg = event.to_inbound();

        if event.is_edit {
            if mode != CommandMode::Sync {
                return DispatchOutcome::Ignored;
            }
            return relay_unless_paused(&state, &msg, true).await;
        }

        match commands::route(&mut state, mode, &msg).await {
            RouteDecision::Handled { reply } => {
                if let Some(reply) = reply {
                    state
                        .controller
                        .send_to_or_report(Platform::Discord, &event.channel_id, &reply)
                        .await;
                }
                DispatchOutcome::Handled
            }
            // Plain chatter in the admin channel stays there.
            RouteDecision::Relay if mode == CommandMode::Admin => DispatchOutcome::Ignored,
            RouteDecision::Relay => relay_unless_paused(&state, &msg, false).await,
        }
    }

    /// Handle a GroupMe bot callback.
    ///
    /// The bot is only ever attached to the sync group, so every payload is
    /// routed in sync mode.
    pub async fn on_webhook_payload(&self, payload: &WebhookPayload) -> DispatchOutcome {
        if !payload.is_from_user() {
            debug!(
                "Discarding GroupMe callback from {} sender '{}'",
                payload.sender_type, payload.name
            );
            return DispatchOutcome::Ignored;
        }

        let msg = payload.to_inbound();
        let mut state = self.state.lock().await;

        match commands::route(&mut state, CommandMode::Sync, &msg).await {
            RouteDecision::Handled { reply } => {
                if let Some(reply) = reply {
                    state
                        .controller
                        .send_or_report(Platform::GroupMe, &reply)
                        .await;
                }
                DispatchOutcome::Handled
            }
            RouteDecision::Relay => relay_unless_paused(&state, &msg, false).await,
        }
    }

    /// Send a lifecycle announcement to both sync conversations.
    ///
    /// Failures are logged only; they never escalate.
    pub async fn announce_lifecycle(&self, text: &str) {
        let state = self.state.lock().await;
        for (platform, result) in state.controller.live().channels.broadcast(text).await {
            if let Err(e) = result {
                warn!("Failed to announce on {}: {:#}", platform, e);
            }
        }
    }

    /// Announce the configured startup message.
    pub async fn announce_startup(&self) {
        let text = self.config().await.startup_message.clone();
        self.announce_lifecycle(&text).await;
    }

    /// Announce the configured shutdown message and close the live session.
    pub async fn shutdown(&self) {
        let text = self.config().await.shutdown_message.clone();
        self.announce_lifecycle(&text).await;

        let state = self.state.lock().await;
        state.controller.live().channels.close_all().await;
    }

    pub async fn is_paused(&self) -> bool {
        self.state.lock().await.controller.is_paused()
    }

    /// Snapshot of the active config
    pub async fn config(&self) -> Arc<RelayConfig> {
        self.state.lock().await.controller.config().clone()
    }
}

async fn relay_unless_paused(state: &RelayState, msg: &InboundMessage, is_edit: bool) -> DispatchOutcome {
    if state.controller.is_paused() {
        debug!("Syncing paused, dropping message from {}", msg.username);
        return DispatchOutcome::Paused;
    }
    let display_name = state.display_name(msg);
    state.controller.relay(msg, &display_name, is_edit).await;
    DispatchOutcome::Relayed
}
