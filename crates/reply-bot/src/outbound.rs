//! Outbound side: sending replies and reactions to Discord.

use std::sync::Arc;

use serenity::http::Http;
use serenity::model::channel::ReactionType;
use serenity::model::id::{ChannelId, EmojiId, MessageId};
use thiserror::Error;

use crate::errors;

/// Discord rejects messages longer than this many characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OutboundError {
    /// The platform does not accept this emoji string as a reaction.
    #[error("Invalid emoji: {0}")]
    InvalidEmoji(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Discord rejected request (HTTP {status} / code {code}): {message}")]
    Rejected {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),
}

/// Sending half of the chat session.
/// Implemented by `SerenityOutbound` (Discord HTTP) and `MockOutbound` (tests).
#[allow(async_fn_in_trait)]
pub trait Outbound {
    async fn send_message(&self, channel_id: u64, text: &str) -> Result<(), OutboundError>;

    async fn add_reaction(
        &self,
        channel_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<(), OutboundError>;
}

pub struct SerenityOutbound {
    http: Arc<Http>,
}

impl SerenityOutbound {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

impl Outbound for SerenityOutbound {
    async fn send_message(&self, channel_id: u64, text: &str) -> Result<(), OutboundError> {
        ChannelId::new(channel_id)
            .say(&*self.http, text)
            .await
            .map(|_| ())
            .map_err(|e| errors::classify(&e))
    }

    async fn add_reaction(
        &self,
        channel_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<(), OutboundError> {
        let reaction = parse_reaction_type(emoji)?;
        self.http
            .create_reaction(ChannelId::new(channel_id), MessageId::new(message_id), &reaction)
            .await
            .map_err(|e| errors::classify_reaction(emoji, &e))
    }
}

/// Accepts a unicode emoji, `name:id`, or the `<:name:id>` / `<a:name:id>`
/// forms Discord renders custom emojis as.
pub(crate) fn parse_reaction_type(emoji: &str) -> Result<ReactionType, OutboundError> {
    let trimmed = emoji.trim();
    if trimmed.is_empty() {
        return Err(OutboundError::InvalidEmoji(emoji.to_string()));
    }

    let (animated, body) = match trimmed
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
    {
        Some(inner) => match inner.strip_prefix("a:") {
            Some(rest) => (true, rest),
            None => (false, inner.strip_prefix(':').unwrap_or(inner)),
        },
        None => (false, trimmed),
    };

    if let Some((name, id_str)) = body.rsplit_once(':') {
        return match id_str.parse::<u64>() {
            Ok(id) if id != 0 => Ok(ReactionType::Custom {
                animated,
                id: EmojiId::new(id),
                name: Some(name.to_string()),
            }),
            _ => Err(OutboundError::InvalidEmoji(emoji.to_string())),
        };
    }

    Ok(ReactionType::Unicode(trimmed.to_string()))
}

/// Split `text` into chunks of at most `limit` characters, preferring to
/// break after a newline.
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 {
        return vec![];
    }
    let mut chunks = Vec::new();
    let mut remaining = text;

    while let Some((cut, _)) = remaining.char_indices().nth(limit) {
        let slice = &remaining[..cut];
        let break_pos = match slice.rfind('\n') {
            Some(p) if p > 0 => p + 1,
            _ => cut,
        };
        chunks.push(remaining[..break_pos].to_string());
        remaining = &remaining[break_pos..];
    }

    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unicode() {
        assert_eq!(
            parse_reaction_type("🍟").unwrap(),
            ReactionType::Unicode("🍟".to_string())
        );
    }

    #[test]
    fn test_parse_name_id() {
        match parse_reaction_type("party:123").unwrap() {
            ReactionType::Custom { animated, id, name } => {
                assert!(!animated);
                assert_eq!(id.get(), 123);
                assert_eq!(name.as_deref(), Some("party"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_rendered_custom_emoji() {
        match parse_reaction_type("<a:dance:456>").unwrap() {
            ReactionType::Custom { animated, id, name } => {
                assert!(animated);
                assert_eq!(id.get(), 456);
                assert_eq!(name.as_deref(), Some("dance"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            parse_reaction_type("<:wave:789>").unwrap(),
            ReactionType::Custom { animated: false, .. }
        ));
    }

    #[test]
    fn test_parse_bad_custom_id() {
        assert_eq!(
            parse_reaction_type("party:abc"),
            Err(OutboundError::InvalidEmoji("party:abc".to_string()))
        );
        assert!(parse_reaction_type("   ").is_err());
    }

    #[test]
    fn test_chunk_short_text() {
        assert_eq!(chunk_text("hello", 100), vec!["hello"]);
    }

    #[test]
    fn test_chunk_empty() {
        assert!(chunk_text("", 100).is_empty());
    }

    #[test]
    fn test_chunk_prefers_newline() {
        let chunks = chunk_text("line1\nline2\nline3", 12);
        assert_eq!(chunks, vec!["line1\nline2\n", "line3"]);
    }

    #[test]
    fn test_chunk_hard_split_without_newline() {
        let chunks = chunk_text("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_chunk_counts_chars() {
        let text = "é".repeat(5);
        let chunks = chunk_text(&text, 2);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn test_chunk_exact_limit_no_split() {
        assert_eq!(chunk_text("abcd", 4), vec!["abcd"]);
    }
}
