//! Inbound message as delivered by the chat session

use serde::{Deserialize, Serialize};

use crate::lock::Actor;
use crate::permissions::Permissions;

/// A channel message plus what the engine needs to know about its author.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    /// Owner of the guild the channel belongs to; `None` in DMs.
    pub guild_owner_id: Option<u64>,
    pub content: String,
    /// Author's effective permissions in the channel.
    pub author_permissions: Permissions,
    pub author_role_ids: Vec<u64>,
}

impl InboundMessage {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.author_id,
            permissions: self.author_permissions,
            role_ids: self.author_role_ids.clone(),
            is_owner: self.guild_owner_id == Some(self.author_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_owner() {
        let msg = InboundMessage {
            author_id: 5,
            guild_owner_id: Some(5),
            ..InboundMessage::default()
        };
        assert!(msg.actor().is_owner);
    }

    #[test]
    fn test_actor_dm_is_not_owner() {
        let msg = InboundMessage {
            author_id: 5,
            guild_owner_id: None,
            author_role_ids: vec![1, 2],
            ..InboundMessage::default()
        };
        let actor = msg.actor();
        assert!(!actor.is_owner);
        assert_eq!(actor.role_ids, vec![1, 2]);
        assert_eq!(actor.user_id, 5);
    }
}
