//! Response table rows

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Number of fields in a response table row.
pub const RESPONSE_FIELDS: usize = 4;

/// One persisted auto-reply row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRow {
    pub pattern: String,
    pub message: String,
    pub require_mention: bool,
    /// Empty when no reaction should be added.
    pub react_emoji: String,
}

impl ResponseRow {
    /// Build a row from raw CSV fields.
    ///
    /// Returns `None` unless there are exactly four fields and the mention
    /// flag is a digit string.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Option<Self> {
        if fields.len() != RESPONSE_FIELDS {
            return None;
        }
        let require_mention = parse_flag(fields[2].as_ref())?;
        Some(Self {
            pattern: fields[0].as_ref().to_string(),
            message: fields[1].as_ref().to_string(),
            require_mention,
            react_emoji: fields[3].as_ref().to_string(),
        })
    }

    pub fn to_fields(&self) -> [String; RESPONSE_FIELDS] {
        [
            self.pattern.clone(),
            self.message.clone(),
            if self.require_mention { "1" } else { "0" }.to_string(),
            self.react_emoji.clone(),
        ]
    }
}

/// Parse a mention flag: a non-empty ASCII digit string, true when non-zero.
pub fn parse_flag(field: &str) -> Option<bool> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(field.chars().any(|c| c != '0'))
}

/// Compile a stored pattern the way the registry matches it.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}
