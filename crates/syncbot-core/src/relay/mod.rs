//! Relay Core
//!
//! Everything between "a message arrived" and "a message was sent":
//! normalization, display names, account links, commands, and the pause and
//! reload controls.
//!
//! # Flow
//!
//! ```text
//! gateway event ─┐
//!                ├─► SyncBot ──► commands::route ──► reply
//! webhook body ──┘                    │
//!                                     └─► RelayController::relay ──► other platform
//! ```

pub mod commands;
pub mod controller;
mod dispatcher;
pub mod links;
pub mod message;
pub mod names;
mod state;

pub use commands::{CommandMode, RouteDecision};
pub use controller::{RelayController, format_relay};
pub use dispatcher::{DispatchOutcome, SyncBot};
pub use links::{Link, LinkConflict, LinkRegistry};
pub use message::{GatewayEvent, InboundMessage, WebhookPayload};
pub use names::NameDirectory;
pub use state::RelayState;
