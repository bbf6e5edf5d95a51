//! Mutable relay state.

use super::controller::RelayController;
use super::links::LinkRegistry;
use super::message::InboundMessage;
use super::names::NameDirectory;

/// Everything the routing decision reads or writes
///
/// Held behind one lock by [`SyncBot`](super::SyncBot); both inbound sources
/// serialize on it.
pub struct RelayState {
    pub names: NameDirectory,
    pub links: LinkRegistry,
    pub controller: RelayController,
}

impl RelayState {
    pub fn new(controller: RelayController) -> Self {
        Self {
            names: NameDirectory::new(),
            links: LinkRegistry::new(),
            controller,
        }
    }

    pub fn display_name(&self, msg: &InboundMessage) -> String {
        self.names.resolve(msg, &self.links)
    }
}
