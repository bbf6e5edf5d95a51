//! Display-name resolution.

use std::collections::HashMap;

use crate::channel::Platform;

use super::links::LinkRegistry;
use super::message::InboundMessage;

/// Per-platform display-name overrides
#[derive(Debug, Default)]
pub struct NameDirectory {
    discord: HashMap<String, String>,
    groupme: HashMap<String, String>,
}

impl NameDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, platform: Platform) -> &HashMap<String, String> {
        match platform {
            Platform::Discord => &self.discord,
            Platform::GroupMe => &self.groupme,
        }
    }

    fn table_mut(&mut self, platform: Platform) -> &mut HashMap<String, String> {
        match platform {
            Platform::Discord => &mut self.discord,
            Platform::GroupMe => &mut self.groupme,
        }
    }

    pub fn override_for(&self, platform: Platform, username: &str) -> Option<&str> {
        self.table(platform).get(username).map(String::as_str)
    }

    /// Name shown for the sender of `msg`: active link, then override, then
    /// the raw platform identity.
    pub fn resolve(&self, msg: &InboundMessage, links: &LinkRegistry) -> String {
        if let Some(link) = links.active_for(msg) {
            return link.shared_name.clone();
        }
        self.override_for(msg.platform, &msg.username)
            .unwrap_or(&msg.username)
            .to_string()
    }

    /// Change the sender's display name.
    ///
    /// A linked sender renames the link, which changes the name on both
    /// platforms; otherwise only this platform's override table is written.
    pub fn set_override(&mut self, msg: &InboundMessage, new_name: &str, links: &mut LinkRegistry) {
        if let Some(link) = links.active_for_mut(msg) {
            link.shared_name = new_name.to_string();
            return;
        }
        self.table_mut(msg.platform)
            .insert(msg.username.clone(), new_name.to_string());
    }
}
