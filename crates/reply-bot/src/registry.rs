//! Reply registry: the ordered set of entries a message is matched against.
//!
//! A registry is built in one pass from the store and never mutated
//! structurally afterwards; a reload builds a fresh one. Rotation position
//! and the cleared-emoji marker are atomics so a shared snapshot can be
//! advanced while it is being read.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use indexmap::map::Entry as MapEntry;
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use reply_store::ResponseStore;
use reply_types::{compile_pattern, AdminCommand, LockSpec, ResponseRow};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Store(#[from] reply_store::Error),

    #[error("Invalid pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A canned auto-reply.
#[derive(Debug)]
pub struct ReplyEntry {
    messages: Vec<String>,
    rotation: AtomicUsize,
    react_emoji: String,
    emoji_cleared: AtomicBool,
}

impl ReplyEntry {
    fn new(message: String, react_emoji: String) -> Self {
        Self {
            messages: vec![message],
            rotation: AtomicUsize::new(0),
            react_emoji,
            emoji_cleared: AtomicBool::new(false),
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Index of the message the next match will send.
    pub fn rotation(&self) -> usize {
        self.rotation.load(Ordering::Relaxed)
    }

    /// Return the current message and advance the rotation.
    pub fn next_message(&self) -> &str {
        let len = self.messages.len();
        let current = self
            .rotation
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |i| Some((i + 1) % len))
            .unwrap_or_else(|i| i);
        &self.messages[current]
    }

    /// Emoji to react with, if any and not rejected earlier.
    pub fn reaction(&self) -> Option<&str> {
        if self.react_emoji.is_empty() || self.emoji_cleared.load(Ordering::Relaxed) {
            None
        } else {
            Some(&self.react_emoji)
        }
    }

    /// Stop reacting for the lifetime of this entry. Not persisted.
    pub fn clear_reaction(&self) {
        self.emoji_cleared.store(true, Ordering::Relaxed);
    }
}

/// A privileged admin command bound to its slot's lock.
#[derive(Debug)]
pub struct CommandEntry {
    pub command: AdminCommand,
    pub lock: LockSpec,
}

#[derive(Debug)]
pub enum EntryKind {
    Reply(ReplyEntry),
    Command(CommandEntry),
}

#[derive(Debug)]
pub struct Entry {
    pub pattern: Regex,
    pub require_mention: bool,
    pub kind: EntryKind,
}

/// Entries keyed by pattern string, in insertion order: admin commands in
/// slot order, then response patterns in order of first appearance.
#[derive(Debug, Default)]
pub struct Registry {
    entries: IndexMap<String, Entry>,
}

impl Registry {
    /// Build a registry from the store's locks and response rows.
    pub fn load<S: ResponseStore + ?Sized>(store: &S) -> Result<Self, RegistryError> {
        let locks = store.get_locks()?;
        let rows = store.rows()?;
        Self::build(&locks, rows)
    }

    pub fn build(locks: &[LockSpec], rows: Vec<ResponseRow>) -> Result<Self, RegistryError> {
        let mut entries = IndexMap::new();

        for command in AdminCommand::ALL {
            let pattern = RegexBuilder::new(command.pattern())
                .case_insensitive(true)
                .dot_matches_new_line(true)
                .build()
                .map_err(|source| RegistryError::InvalidPattern {
                    pattern: command.pattern().to_string(),
                    source,
                })?;
            let lock = locks.get(command.slot()).cloned().unwrap_or_default();
            entries.insert(
                command.pattern().to_string(),
                Entry {
                    pattern,
                    require_mention: false,
                    kind: EntryKind::Command(CommandEntry { command, lock }),
                },
            );
        }

        for row in rows {
            if row.message.trim().is_empty() {
                warn!("Ignoring response row for '{}' with an empty message", row.pattern);
                continue;
            }
            match entries.entry(row.pattern) {
                MapEntry::Occupied(mut existing) => match &mut existing.get_mut().kind {
                    EntryKind::Reply(reply) => reply.messages.push(row.message),
                    EntryKind::Command(cmd) => {
                        warn!(
                            "Ignoring response row that reuses the {} command pattern",
                            cmd.command
                        );
                    }
                },
                MapEntry::Vacant(slot) => {
                    let pattern = compile_pattern(slot.key()).map_err(|source| {
                        RegistryError::InvalidPattern {
                            pattern: slot.key().clone(),
                            source,
                        }
                    })?;
                    slot.insert(Entry {
                        pattern,
                        require_mention: row.require_mention,
                        kind: EntryKind::Reply(ReplyEntry::new(row.message, row.react_emoji)),
                    });
                }
            }
        }

        debug!("Built registry with {} entries", entries.len());
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in match order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, pattern: &str) -> Option<&Entry> {
        self.entries.get(pattern)
    }

    /// Lock currently guarding `command`.
    pub fn lock_for(&self, command: AdminCommand) -> Option<&LockSpec> {
        self.get(command.pattern()).and_then(|e| match &e.kind {
            EntryKind::Command(cmd) => Some(&cmd.lock),
            EntryKind::Reply(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reply_types::COMMAND_COUNT;

    fn row(pattern: &str, message: &str, mention: bool, emoji: &str) -> ResponseRow {
        ResponseRow {
            pattern: pattern.to_string(),
            message: message.to_string(),
            require_mention: mention,
            react_emoji: emoji.to_string(),
        }
    }

    fn reply<'a>(registry: &'a Registry, pattern: &str) -> &'a ReplyEntry {
        match &registry.get(pattern).expect("entry").kind {
            EntryKind::Reply(r) => r,
            EntryKind::Command(_) => panic!("expected reply entry"),
        }
    }

    fn sample_rows() -> Vec<ResponseRow> {
        vec![
            row(r"\bfries\b", "Fries?", false, "🍟"),
            row(r"tell.*joke", "Knock knock.", true, ""),
            row(r"\bfries\b", "Large fries?", true, "x"),
        ]
    }

    #[test]
    fn test_commands_come_first_in_slot_order() {
        let registry = Registry::build(&[], sample_rows()).unwrap();
        let keys: Vec<&str> = registry.iter().map(|(k, _)| k).collect();
        for (i, cmd) in AdminCommand::ALL.iter().enumerate() {
            assert_eq!(keys[i], cmd.pattern());
        }
        assert_eq!(keys[COMMAND_COUNT], r"\bfries\b");
        assert_eq!(keys[COMMAND_COUNT + 1], r"tell.*joke");
        assert_eq!(registry.len(), COMMAND_COUNT + 2);
    }

    #[test]
    fn test_duplicate_patterns_collapse_in_first_seen_order() {
        let registry = Registry::build(&[], sample_rows()).unwrap();
        let fries = reply(&registry, r"\bfries\b");
        assert_eq!(fries.messages(), ["Fries?", "Large fries?"]);
    }

    #[test]
    fn test_first_row_wins_for_mention_and_emoji() {
        let registry = Registry::build(&[], sample_rows()).unwrap();
        let entry = registry.get(r"\bfries\b").unwrap();
        assert!(!entry.require_mention);
        assert_eq!(reply(&registry, r"\bfries\b").reaction(), Some("🍟"));
    }

    #[test]
    fn test_rotation_is_cyclic() {
        let registry = Registry::build(
            &[],
            vec![row("hi", "first", false, ""), row("hi", "second", false, "")],
        )
        .unwrap();
        let entry = reply(&registry, "hi");
        assert_eq!(entry.next_message(), "first");
        assert_eq!(entry.next_message(), "second");
        assert_eq!(entry.next_message(), "first");
        assert_eq!(entry.rotation(), 1);
    }

    #[test]
    fn test_single_message_rotation_stays_zero() {
        let registry = Registry::build(&[], vec![row("hi", "only", false, "")]).unwrap();
        let entry = reply(&registry, "hi");
        assert_eq!(entry.next_message(), "only");
        assert_eq!(entry.next_message(), "only");
        assert_eq!(entry.rotation(), 0);
    }

    #[test]
    fn test_clear_reaction() {
        let registry = Registry::build(&[], sample_rows()).unwrap();
        let entry = reply(&registry, r"\bfries\b");
        entry.clear_reaction();
        assert_eq!(entry.reaction(), None);
    }

    #[test]
    fn test_empty_emoji_means_no_reaction() {
        let registry = Registry::build(&[], sample_rows()).unwrap();
        assert_eq!(reply(&registry, r"tell.*joke").reaction(), None);
    }

    #[test]
    fn test_empty_message_rows_are_skipped() {
        let rows = vec![
            row("blank", "", false, "x"),
            row("blank", "  ", false, ""),
            row("hi", "", false, ""),
            row("hi", "hello", false, ""),
        ];
        let registry = Registry::build(&[], rows).unwrap();
        assert!(registry.get("blank").is_none());
        assert_eq!(reply(&registry, "hi").messages(), ["hello"]);
        assert_eq!(registry.len(), COMMAND_COUNT + 1);
    }

    #[test]
    fn test_invalid_pattern_fails_build() {
        let err = Registry::build(&[], vec![row("(unclosed", "m", false, "")]).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn test_locks_bound_by_slot() {
        let mut locks = vec![LockSpec::default(); COMMAND_COUNT];
        locks[AdminCommand::List.slot()] = LockSpec::from_fields("", "", "42");
        let registry = Registry::build(&locks, vec![]).unwrap();
        assert_eq!(
            registry.lock_for(AdminCommand::List),
            Some(&LockSpec::from_fields("", "", "42"))
        );
        assert_eq!(
            registry.lock_for(AdminCommand::Add),
            Some(&LockSpec::default())
        );
    }

    #[test]
    fn test_missing_locks_default() {
        let registry = Registry::build(&[], vec![]).unwrap();
        for cmd in AdminCommand::ALL {
            assert_eq!(registry.lock_for(cmd), Some(&LockSpec::default()));
        }
    }

    #[test]
    fn test_row_reusing_command_pattern_is_ignored() {
        let rows = vec![row(AdminCommand::Reload.pattern(), "nope", false, "")];
        let registry = Registry::build(&[], rows).unwrap();
        assert_eq!(registry.len(), COMMAND_COUNT);
        assert!(matches!(
            registry.get(AdminCommand::Reload.pattern()).unwrap().kind,
            EntryKind::Command(_)
        ));
    }

    #[test]
    fn test_command_patterns_case_insensitive() {
        let registry = Registry::build(&[], vec![]).unwrap();
        let add = registry.get(AdminCommand::Add.pattern()).unwrap();
        assert!(add.pattern.is_match("!ADD a,b,1,c"));
        assert!(!add.pattern.is_match("!add"));
        let reload = registry.get(AdminCommand::Reload.pattern()).unwrap();
        assert!(reload.pattern.is_match("!Reload"));
        assert!(!reload.pattern.is_match("!reload now"));
    }

    #[test]
    fn test_load_twice_is_identical() {
        let dir = tempfile::TempDir::new().unwrap();
        let responses = dir.path().join("replies.csv");
        std::fs::write(&responses, "a,one,0,\nb,two,1,\na,three,0,\n").unwrap();
        let store = reply_store::CsvStore::new(responses, dir.path().join("locks.csv"));

        let first = Registry::load(&store).unwrap();
        let second = Registry::load(&store).unwrap();
        let shape = |r: &Registry| {
            r.iter()
                .map(|(k, e)| {
                    let messages = match &e.kind {
                        EntryKind::Reply(reply) => reply.messages().to_vec(),
                        EntryKind::Command(_) => vec![],
                    };
                    (k.to_string(), e.require_mention, messages)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&first), shape(&second));
    }

    #[test]
    fn test_load_missing_table_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = reply_store::CsvStore::new(
            dir.path().join("missing.csv"),
            dir.path().join("locks.csv"),
        );
        assert!(matches!(
            Registry::load(&store).unwrap_err(),
            RegistryError::Store(_)
        ));
    }
}
