//! Platform Channel Layer
//!
//! Outbound plumbing for the two relayed platforms.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            ChannelRouter                │
//! │  - One channel per platform             │
//! │  - Default (sync) conversation each     │
//! └─────────────────────────────────────────┘
//!              │
//!              ▼
//! ┌─────────────────────────────────────────┐
//! │         trait Channel                   │
//! │  - send(message)                        │
//! │  - close()                              │
//! └─────────────────────────────────────────┘
//!              │
//!        ┌─────┴─────┐
//!        ▼           ▼
//!     Discord     GroupMe
//! ```
//!
//! Discord additionally owns a gateway session ([`DiscordChannel::open`]) that
//! feeds inbound events into the relay's event queue.

mod chunk;
pub mod discord;
pub mod groupme;
mod router;
mod traits;
mod types;

pub use chunk::chunk_text;
pub use discord::{DiscordChannel, DiscordConfig};
pub use groupme::GroupMeChannel;
pub use router::ChannelRouter;
pub use traits::Channel;
pub use types::{OutboundMessage, Platform};

#[cfg(test)]
pub use traits::mock;
