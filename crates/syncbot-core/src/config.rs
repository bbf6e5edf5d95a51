//! Relay configuration file support
//!
//! The config is a JSON document:
//!
//! ```json
//! {
//!   "GroupMeBotToken": "...",
//!   "Discord": {
//!     "BotToken": "...",
//!     "SyncChannelID": "...",
//!     "AdminChannelID": "...",
//!     "TroubleshootingChannelID": "..."
//!   },
//!   "StartupMessage": "<--- Started listening --->",
//!   "ShutdownMessage": "<--- Stopped listening --->",
//!   "Server": { "ListenAddr": "0.0.0.0:8000", "WebhookPath": "/GroupMeEvents" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::channel::Platform;

/// Errors that can occur when loading a config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full relay configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// File this config was read from; reload re-reads the same file
    #[serde(skip)]
    pub filename: PathBuf,

    /// GroupMe bot ID used for posting
    #[serde(rename = "GroupMeBotToken", alias = "groupme_bot_token")]
    pub groupme_bot_token: String,

    #[serde(rename = "Discord", alias = "discord")]
    pub discord: DiscordSettings,

    #[serde(
        rename = "StartupMessage",
        alias = "startup_message",
        default = "default_startup_message"
    )]
    pub startup_message: String,

    #[serde(
        rename = "ShutdownMessage",
        alias = "shutdown_message",
        default = "default_shutdown_message"
    )]
    pub shutdown_message: String,

    #[serde(rename = "Server", alias = "server", default)]
    pub server: ServerSettings,
}

/// Discord credentials and channel identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordSettings {
    #[serde(rename = "BotToken", alias = "bot_token")]
    pub bot_token: String,

    /// Channel whose plain messages are mirrored
    #[serde(rename = "SyncChannelID", alias = "sync_channel_id")]
    pub sync_channel_id: String,

    /// Channel accepting pause/unpause/reload
    #[serde(rename = "AdminChannelID", alias = "admin_channel_id")]
    pub admin_channel_id: String,

    /// Channel receiving operator-visible send failures
    #[serde(
        rename = "TroubleshootingChannelID",
        alias = "troubleshooting_channel_id",
        default
    )]
    pub troubleshooting_channel_id: String,
}

/// Webhook listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(rename = "ListenAddr", alias = "listen_addr", default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(
        rename = "WebhookPath",
        alias = "webhook_path",
        default = "default_webhook_path"
    )]
    pub webhook_path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            webhook_path: default_webhook_path(),
        }
    }
}

fn default_startup_message() -> String {
    "<--- Started listening --->".to_string()
}

fn default_shutdown_message() -> String {
    "<--- Stopped listening --->".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_webhook_path() -> String {
    "/GroupMeEvents".to_string()
}

impl RelayConfig {
    /// Read and validate the config file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: RelayConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.filename = path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Check that every identifier the relay cannot run without is present
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("GroupMeBotToken", &self.groupme_bot_token),
            ("Discord.BotToken", &self.discord.bot_token),
            ("Discord.SyncChannelID", &self.discord.sync_channel_id),
            ("Discord.AdminChannelID", &self.discord.admin_channel_id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
            }
        }

        if !self.server.webhook_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "Server.WebhookPath must start with '/': {}",
                self.server.webhook_path
            )));
        }
        if self.server.webhook_path == "/health" {
            return Err(ConfigError::Invalid(
                "Server.WebhookPath must not be /health".to_string(),
            ));
        }
        Ok(())
    }

    /// The conversation plain messages are mirrored into on `platform`
    pub fn sync_conversation(&self, platform: Platform) -> &str {
        match platform {
            Platform::Discord => &self.discord.sync_channel_id,
            Platform::GroupMe => &self.groupme_bot_token,
        }
    }

    pub fn troubleshooting_channel(&self) -> Option<&str> {
        let id = self.discord.troubleshooting_channel_id.trim();
        (!id.is_empty()).then_some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID: &str = r#"{
        "GroupMeBotToken": "gm-bot",
        "Discord": {
            "BotToken": "dc-token",
            "SyncChannelID": "sync",
            "AdminChannelID": "admin",
            "TroubleshootingChannelID": "trouble"
        },
        "StartupMessage": "hello",
        "ShutdownMessage": "bye"
    }"#;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(VALID);
        let config = RelayConfig::load(file.path()).unwrap();

        assert_eq!(config.filename, file.path());
        assert_eq!(config.groupme_bot_token, "gm-bot");
        assert_eq!(config.discord.sync_channel_id, "sync");
        assert_eq!(config.discord.admin_channel_id, "admin");
        assert_eq!(config.troubleshooting_channel(), Some("trouble"));
        assert_eq!(config.startup_message, "hello");
        assert_eq!(config.server, ServerSettings::default());
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let file = write_config(
            r#"{
                "GroupMeBotToken": "gm",
                "Discord": { "BotToken": "t", "SyncChannelID": "s", "AdminChannelID": "a" }
            }"#,
        );
        let config = RelayConfig::load(file.path()).unwrap();

        assert_eq!(config.startup_message, "<--- Started listening --->");
        assert_eq!(config.shutdown_message, "<--- Stopped listening --->");
        assert_eq!(config.troubleshooting_channel(), None);
        assert_eq!(config.server.listen_addr, "0.0.0.0:8000");
        assert_eq!(config.server.webhook_path, "/GroupMeEvents");
    }

    #[test]
    fn test_snake_case_aliases() {
        let file = write_config(
            r#"{
                "groupme_bot_token": "gm",
                "discord": { "bot_token": "t", "sync_channel_id": "s", "admin_channel_id": "a" },
                "server": { "listen_addr": "127.0.0.1:9000" }
            }"#,
        );
        let config = RelayConfig::load(file.path()).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.server.webhook_path, "/GroupMeEvents");
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = RelayConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let file = write_config("{ not json");
        let err = RelayConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_empty_required_field_is_invalid() {
        let file = write_config(&VALID.replace("\"gm-bot\"", "\"  \""));
        let err = RelayConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("GroupMeBotToken"));
    }

    #[test]
    fn test_webhook_path_must_be_absolute() {
        let mut config: RelayConfig = serde_json::from_str(VALID).unwrap();
        config.server.webhook_path = "events".to_string();
        assert!(config.validate().is_err());

        config.server.webhook_path = "/health".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sync_conversation_per_platform() {
        let config: RelayConfig = serde_json::from_str(VALID).unwrap();
        assert_eq!(config.sync_conversation(Platform::Discord), "sync");
        assert_eq!(config.sync_conversation(Platform::GroupMe), "gm-bot");
    }
}
