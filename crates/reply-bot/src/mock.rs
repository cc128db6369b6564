//! In-memory outbound for unit testing without a Discord connection.

use std::sync::{Arc, Mutex};

use crate::outbound::{Outbound, OutboundError};

/// One captured outbound call, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Message {
        channel_id: u64,
        text: String,
    },
    Reaction {
        channel_id: u64,
        message_id: u64,
        emoji: String,
    },
}

/// Records every send and reaction attempt. Reactions whose emoji was
/// registered with [`MockOutbound::reject_emoji`] fail with `InvalidEmoji`
/// after being recorded.
#[derive(Clone, Default)]
pub struct MockOutbound {
    sent: Arc<Mutex<Vec<Sent>>>,
    rejected_emojis: Arc<Mutex<Vec<String>>>,
}

impl MockOutbound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_emoji(&self, emoji: &str) {
        self.rejected_emojis.lock().unwrap().push(emoji.to_string());
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Message { text, .. } => Some(text),
                Sent::Reaction { .. } => None,
            })
            .collect()
    }

    pub fn reactions(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Reaction { emoji, .. } => Some(emoji),
                Sent::Message { .. } => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Outbound for MockOutbound {
    async fn send_message(&self, channel_id: u64, text: &str) -> Result<(), OutboundError> {
        self.sent.lock().unwrap().push(Sent::Message {
            channel_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<(), OutboundError> {
        self.sent.lock().unwrap().push(Sent::Reaction {
            channel_id,
            message_id,
            emoji: emoji.to_string(),
        });
        if self.rejected_emojis.lock().unwrap().iter().any(|e| e == emoji) {
            return Err(OutboundError::InvalidEmoji(emoji.to_string()));
        }
        Ok(())
    }
}
