//! GroupMe channel implementation.
//!
//! Sends through the bot post API. Receiving happens through the callback URL
//! configured on the bot, served by [`crate::webhook`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::chunk::chunk_text;
use super::traits::Channel;
use super::types::{OutboundMessage, Platform};

const GROUPME_BOT_POST_URL: &str = "https://api.groupme.com/v3/bots/post";
const GROUPME_MAX_MESSAGE_LEN: usize = 1000;
/// Default timeout for GroupMe API calls (seconds)
const API_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct BotPost<'a> {
    bot_id: &'a str,
    text: &'a str,
}

/// GroupMe bot channel
///
/// A GroupMe bot is bound to a single group, so the conversation id of every
/// outbound message is the bot id itself.
pub struct GroupMeChannel {
    bot_id: String,
    client: Client,
    post_url: String,
}

impl GroupMeChannel {
    pub fn new(bot_id: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
            client: Client::new(),
            post_url: GROUPME_BOT_POST_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_post_url(mut self, url: impl Into<String>) -> Self {
        self.post_url = url.into();
        self
    }

    async fn post_bot_message(&self, bot_id: &str, text: &str) -> Result<()> {
        for chunk in chunk_text(text, GROUPME_MAX_MESSAGE_LEN) {
            let resp = self
                .client
                .post(&self.post_url)
                .json(&BotPost {
                    bot_id,
                    text: &chunk,
                })
                .timeout(Duration::from_secs(API_TIMEOUT_SECS))
                .send()
                .await
                .context("Failed to reach GroupMe")?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("GroupMe post failed ({}): {}", status, body);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Channel for GroupMeChannel {
    fn platform(&self) -> Platform {
        Platform::GroupMe
    }

    fn is_configured(&self) -> bool {
        !self.bot_id.is_empty()
    }

    async fn send(&self, message: OutboundMessage) -> Result<()> {
        let bot_id = if message.conversation_id.is_empty() {
            self.bot_id.as_str()
        } else {
            message.conversation_id.as_str()
        };
        self.post_bot_message(bot_id, &message.content).await
    }
}
