//! Discord channel implementation.
//!
//! Uses the Discord Gateway WebSocket for receiving messages and REST API for sending.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::chunk::chunk_text;
use super::traits::Channel;
use super::types::{OutboundMessage, Platform};
use crate::relay::GatewayEvent;

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const DISCORD_MAX_MESSAGE_LEN: usize = 2000;
const DEFAULT_HEARTBEAT_MS: u64 = 41250;

/// Intents: GUILDS (1) | GUILD_MESSAGES (512) | MESSAGE_CONTENT (32768)
const GATEWAY_INTENTS: u64 = 1 | 512 | 32768;

/// Discord channel configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub bot_token: String,
}

/// Discord channel that receives via Gateway WebSocket and sends via REST API.
pub struct DiscordChannel {
    config: DiscordConfig,
    client: Client,
    polling: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            polling: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_token(token: &str) -> Self {
        Self::new(DiscordConfig {
            bot_token: token.to_string(),
        })
    }

    /// Send a message to a Discord channel via REST API.
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<()> {
        for chunk in chunk_text(text, DISCORD_MAX_MESSAGE_LEN) {
            let resp = self
                .client
                .post(format!(
                    "{}/channels/{}/messages",
                    DISCORD_API_BASE, channel_id
                ))
                .header("Authorization", format!("Bot {}", self.config.bot_token))
                .json(&json!({ "content": chunk }))
                .send()
                .await
                .context("Failed to reach Discord")?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("Discord send failed ({}): {}", status, body);
            }
        }
        Ok(())
    }

    /// Establish the Gateway session.
    ///
    /// Returns once the websocket is connected and Identify has been sent, so a
    /// bad token or unreachable gateway surfaces as an error here. Events are
    /// pushed into `events` by a background task until [`Channel::close`].
    ///
    /// If the session ends any other way (socket closed, Reconnect or Invalid
    /// Session from Discord) `lost` is cancelled.
    pub async fn open(
        &self,
        events: mpsc::Sender<GatewayEvent>,
        lost: CancellationToken,
    ) -> Result<()> {
        if self.polling.swap(true, Ordering::SeqCst) {
            anyhow::bail!("Discord gateway already running");
        }
        let reset_on_failure = scopeguard::guard(self.polling.clone(), |polling| {
            polling.store(false, Ordering::SeqCst);
        });

        let gateway_url = Self::fetch_gateway_url(&self.client, &self.config.bot_token).await?;
        info!("Connecting to Discord Gateway: {}", gateway_url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&gateway_url)
            .await
            .context("Failed to connect to Discord Gateway")?;
        let (mut ws_write, mut ws_read) = ws_stream.split();

        // Read Hello (opcode 10) to get heartbeat interval
        let heartbeat_interval = match ws_read.next().await {
            Some(Ok(msg)) => {
                let text = msg.to_text().unwrap_or("{}");
                let payload: Value = serde_json::from_str(text).unwrap_or_default();
                if payload["op"].as_u64() == Some(10) {
                    payload["d"]["heartbeat_interval"]
                        .as_u64()
                        .unwrap_or(DEFAULT_HEARTBEAT_MS)
                } else {
                    warn!("Expected Hello (op 10), got: {}", text);
                    DEFAULT_HEARTBEAT_MS
                }
            }
            Some(Err(e)) => return Err(e).context("Discord Gateway closed before Hello"),
            None => anyhow::bail!("No Hello from Discord Gateway"),
        };
        debug!("Discord heartbeat interval: {}ms", heartbeat_interval);

        let identify = json!({
            "op": 2,
            "d": {
                "token": self.config.bot_token,
                "intents": GATEWAY_INTENTS,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "syncbot",
                    "device": "syncbot"
                }
            }
        });
        ws_write
            .send(WsMessage::Text(identify.to_string().into()))
            .await
            .context("Failed to send Identify")?;

        // Session is established; from here on the background tasks own the flag.
        let _ = scopeguard::ScopeGuard::into_inner(reset_on_failure);

        let sequence = Arc::new(AtomicI64::new(-1));
        let writer = Arc::new(tokio::sync::Mutex::new(ws_write));

        // Ends with the read loop or with close().
        let session = self.cancel.child_token();

        let hb_writer = writer.clone();
        let hb_sequence = sequence.clone();
        let hb_session = session.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_millis(heartbeat_interval));
            loop {
                tokio::select! {
                    _ = hb_session.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let heartbeat = heartbeat_payload(hb_sequence.load(Ordering::SeqCst));
                let mut writer = hb_writer.lock().await;
                if let Err(e) = writer
                    .send(WsMessage::Text(heartbeat.to_string().into()))
                    .await
                {
                    warn!("Discord heartbeat failed: {}", e);
                    break;
                }
            }
        });

        let polling = self.polling.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let _guard = scopeguard::guard((), |_| {
                polling.store(false, Ordering::SeqCst);
            });

            loop {
                let msg_result = tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = ws_read.next() => match next {
                        Some(result) => result,
                        None => break,
                    },
                };

                let msg = match msg_result {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("Discord WebSocket error: {}", e);
                        break;
                    }
                };

                let Ok(text) = msg.to_text() else {
                    continue;
                };
                let Ok(payload) = serde_json::from_str::<Value>(text) else {
                    continue;
                };

                if let Some(seq) = payload["s"].as_i64() {
                    sequence.store(seq, Ordering::SeqCst);
                }

                match parse_control(&payload) {
                    Some(GatewayControl::HeartbeatRequest) => {
                        let heartbeat = heartbeat_payload(sequence.load(Ordering::SeqCst));
                        let mut writer = writer.lock().await;
                        if let Err(e) = writer
                            .send(WsMessage::Text(heartbeat.to_string().into()))
                            .await
                        {
                            warn!("Discord heartbeat failed: {}", e);
                            break;
                        }
                        continue;
                    }
                    Some(GatewayControl::Reconnect) => {
                        warn!("Discord requested a gateway reconnect");
                        break;
                    }
                    Some(GatewayControl::InvalidSession) => {
                        warn!("Discord invalidated the gateway session");
                        break;
                    }
                    None => {}
                }

                let Some(event) = parse_dispatch(&payload) else {
                    continue;
                };

                if events.send(event).await.is_err() {
                    debug!("Discord event queue closed");
                    break;
                }
            }

            session.cancel();
            let mut writer = writer.lock().await;
            if let Err(e) = writer.close().await {
                debug!("Discord websocket close: {}", e);
            }
            finish_session(&cancel, &lost);
        });

        Ok(())
    }

    async fn fetch_gateway_url(client: &Client, token: &str) -> Result<String> {
        let resp = client
            .get(format!("{}/gateway/bot", DISCORD_API_BASE))
            .header("Authorization", format!("Bot {}", token))
            .send()
            .await
            .context("Failed to get Discord gateway URL")?;

        if !resp.status().is_success() {
            anyhow::bail!("Discord rejected bot token ({})", resp.status());
        }

        let body: Value = resp.json().await?;
        let url = body["url"]
            .as_str()
            .context("Missing 'url' in gateway response")?;
        Ok(format!("{}/?v=10&encoding=json", url))
    }
}

/// Gateway opcodes the read loop must act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatewayControl {
    /// op 1: send a heartbeat now
    HeartbeatRequest,
    /// op 7
    Reconnect,
    /// op 9
    InvalidSession,
}

fn parse_control(payload: &Value) -> Option<GatewayControl> {
    match payload["op"].as_u64()? {
        1 => Some(GatewayControl::HeartbeatRequest),
        7 => Some(GatewayControl::Reconnect),
        9 => Some(GatewayControl::InvalidSession),
        _ => None,
    }
}

fn heartbeat_payload(sequence: i64) -> Value {
    if sequence < 0 {
        json!({"op": 1, "d": null})
    } else {
        json!({"op": 1, "d": sequence})
    }
}

/// Report how the read loop ended. Returns whether the session was lost.
///
/// A session that ends without `closed` being cancelled no longer delivers
/// Discord messages, so `lost` is cancelled for the process to stop.
fn finish_session(closed: &CancellationToken, lost: &CancellationToken) -> bool {
    if closed.is_cancelled() {
        info!("Discord gateway connection closed");
        return false;
    }
    error!("Discord gateway connection lost, no more Discord messages will be received");
    lost.cancel();
    true
}

/// Turn a gateway dispatch payload into a [`GatewayEvent`].
///
/// Only `MESSAGE_CREATE` and `MESSAGE_UPDATE` carry chat text. Updates without
/// content (embed unfurls) and payloads without an author are skipped.
fn parse_dispatch(payload: &Value) -> Option<GatewayEvent> {
    let is_edit = match payload["t"].as_str()? {
        "MESSAGE_CREATE" => false,
        "MESSAGE_UPDATE" => true,
        _ => return None,
    };

    let data = &payload["d"];
    let author = data.get("author")?;
    let text = data["content"].as_str()?;
    if text.is_empty() {
        return None;
    }

    let nick = data["member"]["nick"].as_str().filter(|n| !n.is_empty());
    let username = nick.or_else(|| author["username"].as_str())?;

    Some(GatewayEvent {
        text: text.to_string(),
        username: username.to_string(),
        channel_id: data["channel_id"].as_str().unwrap_or_default().to_string(),
        is_edit,
        is_bot: author["bot"].as_bool().unwrap_or(false),
    })
}

#[async_trait]
impl Channel for DiscordChannel {
    fn platform(&self) -> Platform {
        Platform::Discord
    }

    fn is_configured(&self) -> bool {
        !self.config.bot_token.is_empty()
    }

    async fn send(&self, message: OutboundMessage) -> Result<()> {
        self.send_message(&message.conversation_id, &message.content)
            .await
    }

    async fn close(&self) -> Result<()> {
        if !self.cancel.is_cancelled() {
            info!("Closing Discord gateway session");
        }
        self.cancel.cancel();
        Ok(())
    }
}

impl Drop for DiscordChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch(t: &str, d: Value) -> Value {
        json!({ "op": 0, "s": 3, "t": t, "d": d })
    }

    #[test]
    fn test_discord_channel_is_configured() {
        assert!(DiscordChannel::with_token("test-token").is_configured());
        assert!(!DiscordChannel::with_token("").is_configured());
    }

    #[test]
    fn test_discord_platform() {
        let channel = DiscordChannel::with_token("test");
        assert_eq!(channel.platform(), Platform::Discord);
        assert!(!channel.polling.load(Ordering::SeqCst));
    }

    #[test]
    fn test_parse_control_opcodes() {
        assert_eq!(
            parse_control(&json!({ "op": 1, "d": null })),
            Some(GatewayControl::HeartbeatRequest)
        );
        assert_eq!(
            parse_control(&json!({ "op": 7, "d": null })),
            Some(GatewayControl::Reconnect)
        );
        assert_eq!(
            parse_control(&json!({ "op": 9, "d": false })),
            Some(GatewayControl::InvalidSession)
        );
        assert_eq!(parse_control(&json!({ "op": 11 })), None);
        assert_eq!(parse_control(&dispatch("MESSAGE_CREATE", json!({}))), None);
    }

    #[test]
    fn test_heartbeat_payload_carries_sequence() {
        assert_eq!(heartbeat_payload(-1), json!({ "op": 1, "d": null }));
        assert_eq!(heartbeat_payload(42), json!({ "op": 1, "d": 42 }));
    }

    #[test]
    fn test_unexpected_session_end_signals_lost() {
        let closed = CancellationToken::new();
        let lost = CancellationToken::new();

        assert!(finish_session(&closed, &lost));
        assert!(lost.is_cancelled());
    }

    #[test]
    fn test_closed_session_end_is_quiet() {
        let closed = CancellationToken::new();
        let lost = CancellationToken::new();
        closed.cancel();

        assert!(!finish_session(&closed, &lost));
        assert!(!lost.is_cancelled());
    }

    #[test]
    fn test_gateway_intents() {
        assert_eq!(GATEWAY_INTENTS & 512, 512);
        assert_eq!(GATEWAY_INTENTS & 32768, 32768);
    }

    #[test]
    fn test_parse_message_create_prefers_nickname() {
        let payload = dispatch(
            "MESSAGE_CREATE",
            json!({
                "channel_id": "sync",
                "content": "hi there",
                "author": { "username": "bob", "bot": false },
                "member": { "nick": "Bobby" }
            }),
        );

        let event = parse_dispatch(&payload).unwrap();
        assert_eq!(event.username, "Bobby");
        assert_eq!(event.text, "hi there");
        assert_eq!(event.channel_id, "sync");
        assert!(!event.is_edit);
        assert!(!event.is_bot);
    }

    #[test]
    fn test_parse_message_falls_back_to_username() {
        let payload = dispatch(
            "MESSAGE_CREATE",
            json!({
                "channel_id": "sync",
                "content": "hi",
                "author": { "username": "bob" },
                "member": { "nick": null }
            }),
        );
        assert_eq!(parse_dispatch(&payload).unwrap().username, "bob");
    }

    #[test]
    fn test_parse_message_update_is_edit() {
        let payload = dispatch(
            "MESSAGE_UPDATE",
            json!({
                "channel_id": "sync",
                "content": "fixed typo",
                "author": { "username": "bob", "bot": true }
            }),
        );
        let event = parse_dispatch(&payload).unwrap();
        assert!(event.is_edit);
        assert!(event.is_bot);
    }

    #[test]
    fn test_parse_skips_other_events_and_empty_content() {
        assert!(parse_dispatch(&dispatch("GUILD_CREATE", json!({}))).is_none());
        assert!(parse_dispatch(&json!({ "op": 11 })).is_none());

        let embed_update = dispatch(
            "MESSAGE_UPDATE",
            json!({ "channel_id": "sync", "embeds": [] }),
        );
        assert!(parse_dispatch(&embed_update).is_none());

        let empty = dispatch(
            "MESSAGE_CREATE",
            json!({ "channel_id": "sync", "content": "", "author": { "username": "a" } }),
        );
        assert!(parse_dispatch(&empty).is_none());
    }

    #[tokio::test]
    async fn test_gateway_prevents_double_open() {
        let ch = DiscordChannel::with_token("t");
        ch.polling.store(true, Ordering::SeqCst);

        let (tx, _rx) = mpsc::channel(1);
        let err = ch.open(tx, CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("already running"));
    }

    #[tokio::test]
    async fn test_close_cancels_session() {
        let ch = DiscordChannel::with_token("t");
        ch.close().await.unwrap();
        assert!(ch.cancel.is_cancelled());
    }
}
