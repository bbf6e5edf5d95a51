//! Channel Trait Definitions
//!
//! Defines the send-side interface both platforms implement.

use anyhow::Result;
use async_trait::async_trait;

use super::types::{OutboundMessage, Platform};

/// Outbound side of a chat platform
///
/// Inbound traffic does not go through this trait: the gateway pushes
/// [`GatewayEvent`](crate::relay::GatewayEvent)s into a queue and the webhook
/// server hands payloads straight to the dispatcher.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Platform this channel talks to
    fn platform(&self) -> Platform;

    /// Get channel display name
    fn name(&self) -> &str {
        self.platform().display_name()
    }

    /// Check if channel is properly configured
    fn is_configured(&self) -> bool;

    /// Send a message to the channel
    async fn send(&self, message: OutboundMessage) -> Result<()>;

    /// Release the underlying connection, if any
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use mock::MockChannel;

    #[tokio::test]
    async fn test_mock_channel_send() {
        let channel = MockChannel::new(Platform::GroupMe);

        channel
            .send(OutboundMessage::new("bot-1", "Hello"))
            .await
            .unwrap();

        let sent = channel.get_sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, "Hello");
    }

    #[tokio::test]
    async fn test_mock_channel_unconfigured() {
        let channel = MockChannel::unconfigured(Platform::Discord);
        assert!(!channel.is_configured());
    }

    #[tokio::test]
    async fn test_channel_defaults() {
        let channel = MockChannel::new(Platform::Discord);
        assert_eq!(channel.name(), "Discord");
        assert!(channel.close().await.is_ok());
        assert_eq!(channel.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_mock_records_nothing() {
        let channel = MockChannel::new(Platform::GroupMe);
        channel.set_failing(true);

        let result = channel.send(OutboundMessage::new("bot", "lost")).await;
        assert!(result.is_err());
        assert!(channel.get_sent_messages().await.is_empty());
    }
}
