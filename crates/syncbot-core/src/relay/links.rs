//! Cross-platform account links.
//!
//! A link ties one Discord identity to one GroupMe identity under a shared
//! display name. Links start out pending and become active once the target
//! accepts.
//!
//! Matching always takes the first entry in list order whose slot for the
//! message's platform equals the sender. `init` refuses to create a link for a
//! username that is already part of a pending or active link, so in practice
//! at most one entry can match.

use crate::channel::Platform;

use super::message::InboundMessage;

/// Identity equivalence between the two platforms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub discord_username: String,
    pub groupme_username: String,
    pub shared_name: String,
}

impl Link {
    /// Build a link from the initiator's side.
    pub fn new(
        initiator_platform: Platform,
        initiator: impl Into<String>,
        target: impl Into<String>,
        shared_name: impl Into<String>,
    ) -> Self {
        let (initiator, target) = (initiator.into(), target.into());
        let (discord_username, groupme_username) = match initiator_platform {
            Platform::Discord => (initiator, target),
            Platform::GroupMe => (target, initiator),
        };
        Self {
            discord_username,
            groupme_username,
            shared_name: shared_name.into(),
        }
    }

    pub fn username_for(&self, platform: Platform) -> &str {
        match platform {
            Platform::Discord => &self.discord_username,
            Platform::GroupMe => &self.groupme_username,
        }
    }

    /// Whether `msg` was sent by this link's party on the message's platform
    pub fn covers(&self, msg: &InboundMessage) -> bool {
        self.username_for(msg.platform) == msg.username
    }
}

/// Why a link request was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConflict {
    pub username: String,
}

/// Pending and active links
#[derive(Debug, Default)]
pub struct LinkRegistry {
    pending: Vec<Link>,
    active: Vec<Link>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[Link] {
        &self.pending
    }

    pub fn active(&self) -> &[Link] {
        &self.active
    }

    /// Active link covering the sender of `msg`
    pub fn active_for(&self, msg: &InboundMessage) -> Option<&Link> {
        self.active.iter().find(|link| link.covers(msg))
    }

    pub fn active_for_mut(&mut self, msg: &InboundMessage) -> Option<&mut Link> {
        self.active.iter_mut().find(|link| link.covers(msg))
    }

    /// Check that neither party of `candidate` is already linked or pending.
    pub fn check_available(&self, candidate: &Link) -> Result<(), LinkConflict> {
        for platform in Platform::all() {
            let username = candidate.username_for(platform);
            let taken = self
                .pending
                .iter()
                .chain(self.active.iter())
                .any(|link| link.username_for(platform) == username);
            if taken {
                return Err(LinkConflict {
                    username: username.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Record a new pending link.
    pub fn init(&mut self, link: Link) -> Result<(), LinkConflict> {
        self.check_available(&link)?;
        self.pending.push(link);
        Ok(())
    }

    /// Move the first pending link addressed to the sender into the active list.
    pub fn accept(&mut self, msg: &InboundMessage) -> Option<Link> {
        let index = self.pending.iter().position(|link| link.covers(msg))?;
        let link = self.pending.remove(index);
        self.active.push(link.clone());
        Some(link)
    }

    /// Delete the first link involving the sender, active before pending.
    pub fn remove(&mut self, msg: &InboundMessage) -> Option<Link> {
        if let Some(index) = self.active.iter().position(|link| link.covers(msg)) {
            return Some(self.active.remove(index));
        }
        let index = self.pending.iter().position(|link| link.covers(msg))?;
        Some(self.pending.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discord(username: &str) -> InboundMessage {
        InboundMessage::new(Platform::Discord, username, "")
    }

    fn groupme(username: &str) -> InboundMessage {
        InboundMessage::new(Platform::GroupMe, username, "")
    }

    #[test]
    fn test_link_slots_follow_initiator_platform() {
        let from_discord = Link::new(Platform::Discord, "alice#1", "Alice G", "Alice");
        assert_eq!(from_discord.discord_username, "alice#1");
        assert_eq!(from_discord.groupme_username, "Alice G");

        let from_groupme = Link::new(Platform::GroupMe, "Alice G", "alice#1", "Alice");
        assert_eq!(from_groupme, from_discord);
    }

    #[test]
    fn test_accept_moves_pending_to_active() {
        let mut registry = LinkRegistry::new();
        registry
            .init(Link::new(Platform::Discord, "A", "b", "shared"))
            .unwrap();

        let accepted = registry.accept(&groupme("b")).unwrap();
        assert_eq!(accepted.shared_name, "shared");
        assert!(registry.pending().is_empty());
        assert_eq!(registry.active().len(), 1);
        assert!(registry.active_for(&discord("A")).is_some());
        assert!(registry.active_for(&groupme("b")).is_some());
    }

    #[test]
    fn test_accept_without_match_leaves_pending() {
        let mut registry = LinkRegistry::new();
        registry
            .init(Link::new(Platform::Discord, "A", "b", "shared"))
            .unwrap();

        // Same name but wrong platform does not match.
        assert!(registry.accept(&discord("b")).is_none());
        assert!(registry.accept(&groupme("c")).is_none());
        assert_eq!(registry.pending().len(), 1);
        assert!(registry.active().is_empty());
    }

    #[test]
    fn test_initiator_can_accept_own_request() {
        // Matching is per-platform slot only; the initiator's slot matches too.
        let mut registry = LinkRegistry::new();
        registry
            .init(Link::new(Platform::Discord, "A", "b", "shared"))
            .unwrap();
        assert!(registry.accept(&discord("A")).is_some());
    }

    #[test]
    fn test_remove_prefers_active_over_pending() {
        let mut registry = LinkRegistry::new();
        registry
            .init(Link::new(Platform::Discord, "A", "b", "one"))
            .unwrap();
        registry.accept(&groupme("b")).unwrap();
        registry
            .init(Link::new(Platform::Discord, "C", "d", "two"))
            .unwrap();

        let removed = registry.remove(&discord("A")).unwrap();
        assert_eq!(removed.shared_name, "one");
        assert!(registry.active().is_empty());
        assert_eq!(registry.pending().len(), 1);

        let removed = registry.remove(&groupme("d")).unwrap();
        assert_eq!(removed.shared_name, "two");
        assert!(registry.pending().is_empty());
    }

    #[test]
    fn test_remove_without_match_mutates_nothing() {
        let mut registry = LinkRegistry::new();
        registry
            .init(Link::new(Platform::Discord, "A", "b", "one"))
            .unwrap();

        assert!(registry.remove(&discord("nobody")).is_none());
        assert_eq!(registry.pending().len(), 1);
    }

    #[test]
    fn test_init_rejects_party_already_pending_or_active() {
        let mut registry = LinkRegistry::new();
        registry
            .init(Link::new(Platform::Discord, "A", "b", "one"))
            .unwrap();

        let conflict = registry
            .init(Link::new(Platform::GroupMe, "b", "Z", "two"))
            .unwrap_err();
        assert_eq!(conflict.username, "b");

        registry.accept(&groupme("b")).unwrap();
        let conflict = registry
            .init(Link::new(Platform::Discord, "A", "y", "three"))
            .unwrap_err();
        assert_eq!(conflict.username, "A");
        assert!(registry.pending().is_empty());
    }

    #[test]
    fn test_same_name_on_different_platforms_is_not_a_conflict() {
        let mut registry = LinkRegistry::new();
        registry
            .init(Link::new(Platform::Discord, "sam", "x", "one"))
            .unwrap();
        // "sam" on GroupMe is a different identity from "sam" on Discord.
        assert!(
            registry
                .init(Link::new(Platform::GroupMe, "sam", "y", "two"))
                .is_ok()
        );
    }
}
