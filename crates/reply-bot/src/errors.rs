//! Discord-specific error handling for the bot.
//!
//! Converts serenity errors into `OutboundError`s and provides a `log_error`
//! helper that logs at the correct level based on whether the error is
//! permanent, transient, or a rate-limit.

use serenity::http::HttpError;
use tracing::{debug, error, warn};

use crate::outbound::OutboundError;

/// JSON error code 10014: Unknown Emoji.
const UNKNOWN_EMOJI: i64 = 10014;

/// JSON error code 50035: Invalid Form Body (reaction endpoint uses it for
/// malformed emoji strings).
const INVALID_FORM_BODY: i64 = 50035;

/// Permanent JSON error codes: retrying the same request cannot succeed.
const PERMANENT_CODES: &[i64] = &[
    10003, // Unknown channel
    10008, // Unknown message
    50001, // Missing access
    50006, // Cannot send an empty message
    50007, // Cannot send messages to this user
    50013, // Missing permissions
    INVALID_FORM_BODY,
];

/// Classify a serenity `Error` from a send.
pub fn classify(err: &serenity::Error) -> OutboundError {
    match err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) => {
            let status = resp.status_code.as_u16();
            if status == 429 {
                return OutboundError::RateLimited;
            }
            OutboundError::Rejected {
                status,
                code: resp.error.code as i64,
                message: resp.error.message.clone(),
            }
        }
        _ => {
            debug!("Non-API serenity error: {}", err);
            OutboundError::Network(err.to_string())
        }
    }
}

/// Classify a serenity `Error` from a reaction; an emoji the API refuses
/// becomes `OutboundError::InvalidEmoji`.
pub fn classify_reaction(emoji: &str, err: &serenity::Error) -> OutboundError {
    match classify(err) {
        OutboundError::Rejected { code, status, .. }
            if code == UNKNOWN_EMOJI || (code == INVALID_FORM_BODY && status == 400) =>
        {
            OutboundError::InvalidEmoji(emoji.to_string())
        }
        other => other,
    }
}

impl OutboundError {
    pub fn is_permanent(&self) -> bool {
        match self {
            OutboundError::InvalidEmoji(_) => true,
            OutboundError::Rejected { code, .. } => PERMANENT_CODES.contains(code),
            OutboundError::RateLimited | OutboundError::Network(_) => false,
        }
    }
}

/// Log an outbound error at the appropriate level.
///
/// - Permanent errors → `error!`
/// - Rate-limited / transient errors → `warn!`
pub fn log_error(context: &str, err: &OutboundError) {
    if err.is_permanent() {
        error!("{}: {}", context, err);
    } else {
        warn!("{}: {}", context, err);
    }
}
