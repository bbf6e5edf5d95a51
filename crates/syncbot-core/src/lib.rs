pub mod app;
pub mod channel;
pub mod config;
pub mod relay;
pub mod session;
pub mod webhook;

pub use app::SyncBotApp;
pub use config::{ConfigError, RelayConfig};
pub use relay::{DispatchOutcome, GatewayEvent, SyncBot, WebhookPayload};
pub use session::{LiveSession, PlatformConnector, SessionConnector};
