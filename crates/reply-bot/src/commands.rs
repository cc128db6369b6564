//! Admin command handlers.
//!
//! Each handler turns the free-text arguments of a command into store calls
//! and returns the text sent back to the channel. Everything but a long
//! `!list` table is a single message.

#[path = "commands_tests.rs"]
mod commands_tests;

use reply_store::ResponseStore;
use reply_types::{AdminCommand, LockSpec};
use tracing::{error, info};

use crate::dispatch::Dispatcher;
use crate::outbound::DISCORD_MESSAGE_LIMIT;

/// Opening and closing fence around each `!list` table message.
const FENCE_OPEN: &str = "```\n";
const FENCE_CLOSE: &str = "\n```";

/// Argument to `!lock` that restores the default lock everywhere.
const RESET_KEYWORD: &str = "reset";

/// Labels for the detailed `!list <index>` view, in field order.
const FIELD_LABELS: [&str; 4] = ["pattern", "message", "require_mention", "react_emoji"];

impl<S: ResponseStore> Dispatcher<S> {
    /// Run `command` and return the messages to send, in order.
    pub(crate) fn run_command(&self, command: AdminCommand, args: &str) -> Vec<String> {
        info!("Running {} with args '{}'", command, args);
        match command {
            AdminCommand::Add => vec![self.add_response(args)],
            AdminCommand::Delete => vec![self.delete_response(args)],
            AdminCommand::List => self.list_responses(args),
            AdminCommand::Lock => vec![self.update_lock(args)],
            AdminCommand::Reload => vec![self.reload_responses()],
        }
    }

    fn add_response(&self, args: &str) -> String {
        let id = self.store().identifier();
        match self.store().add(args) {
            Ok(true) => format!("Added \"{}\" to {}.", args, id),
            Ok(false) => format!(
                "Unable to add \"{}\" to {}; expected pattern,message,require_mention(0/1),emoji.",
                args, id
            ),
            Err(e) => failure("Add", e),
        }
    }

    fn delete_response(&self, args: &str) -> String {
        let Ok(index) = args.parse::<usize>() else {
            return format!("\"{}\" is not a valid index.", args);
        };
        match self.store().delete(index) {
            Ok(true) => format!("Removed index {} from {}.", index, self.store().identifier()),
            Ok(false) => format!("Index {} not found.", index),
            Err(e) => failure("Delete", e),
        }
    }

    fn list_responses(&self, args: &str) -> Vec<String> {
        if let Ok(index) = args.parse::<usize>() {
            let detail = match self.store().list(false, Some(index)) {
                Ok(rows) => match rows.first() {
                    Some(row) => {
                        let mut out = format!("Index {}", row.index);
                        for (label, value) in FIELD_LABELS.iter().zip(&row.fields) {
                            out.push_str(&format!("\n{}: {}", label, value));
                        }
                        out
                    }
                    None => format!("Index {} not found.", index),
                },
                Err(e) => failure("List", e),
            };
            return vec![detail];
        }

        match self.store().list(true, None) {
            Ok(rows) if rows.is_empty() => vec!["No responses stored.".to_string()],
            Ok(rows) => fenced_blocks(
                rows.iter()
                    .map(|row| format!("{:>3} | {}", row.index, row.fields.join(" | "))),
            ),
            Err(e) => vec![failure("List", e)],
        }
    }

    fn update_lock(&self, args: &str) -> String {
        if args.eq_ignore_ascii_case(RESET_KEYWORD) {
            return match self.store().set_locks("", true) {
                Ok(_) => self.apply_locks("Locks reset for all commands", AdminCommand::Lock),
                Err(e) => failure("Lock", e),
            };
        }

        let target = args
            .split_once(char::is_whitespace)
            .and_then(|(name, rest)| AdminCommand::from_name(name).map(|cmd| (cmd, rest.trim())))
            .filter(|(_, rest)| !rest.is_empty());

        let (result, slot_command, label) = match target {
            Some((command, spec)) => (
                self.store().set_lock(command.slot(), spec),
                command,
                format!("Lock set for {}", command),
            ),
            None => (
                self.store().set_locks(args, false),
                AdminCommand::Lock,
                "Lock set for all commands".to_string(),
            ),
        };

        match result {
            Ok(true) => self.apply_locks(&label, slot_command),
            Ok(false) => {
                let current = self
                    .registry()
                    .lock_for(slot_command)
                    .map(LockSpec::describe)
                    .unwrap_or_else(|| LockSpec::default().describe());
                format!(
                    "Unexpected format \"{}\"; lock remains {}. Use permissions,role_ids,user_ids or {}.",
                    args, current, RESET_KEYWORD
                )
            }
            Err(e) => failure("Lock", e),
        }
    }

    /// Reload so a written lock takes effect, then describe the lock now
    /// stored for `command`.
    fn apply_locks(&self, label: &str, command: AdminCommand) -> String {
        let effective = match self.store().get_locks() {
            Ok(locks) => locks
                .get(command.slot())
                .cloned()
                .unwrap_or_default()
                .describe(),
            Err(e) => return failure("Lock", e),
        };
        match self.reload() {
            Ok(_) => format!("{}: {}", label, effective),
            Err(e) => {
                error!("Reload after lock update failed: {}", e);
                format!(
                    "{}: {} (saved, but reload failed: {}; use !reload once fixed)",
                    label, effective, e
                )
            }
        }
    }

    fn reload_responses(&self) -> String {
        let id = self.store().identifier();
        match self.reload() {
            Ok(len) => format!("{} reloaded ({} entries).", id, len),
            Err(e) => {
                error!("Reload of {} failed: {}", id, e);
                format!(
                    "Unable to reload {}: {}. Keeping previous responses.",
                    id, e
                )
            }
        }
    }
}

/// Pack table lines into code blocks that each fit in one Discord message.
/// A line never straddles two blocks.
fn fenced_blocks(lines: impl Iterator<Item = String>) -> Vec<String> {
    let budget = DISCORD_MESSAGE_LIMIT - FENCE_OPEN.len() - FENCE_CLOSE.len();
    let mut blocks = Vec::new();
    let mut body = String::new();
    let mut body_chars = 0;

    for line in lines {
        let line_chars = line.chars().count();
        let needed = if body.is_empty() { line_chars } else { line_chars + 1 };
        if !body.is_empty() && body_chars + needed > budget {
            blocks.push(format!("{}{}{}", FENCE_OPEN, body, FENCE_CLOSE));
            body.clear();
            body_chars = 0;
        }
        if !body.is_empty() {
            body.push('\n');
            body_chars += 1;
        }
        body.push_str(&line);
        body_chars += line_chars;
    }
    if !body.is_empty() {
        blocks.push(format!("{}{}{}", FENCE_OPEN, body, FENCE_CLOSE));
    }
    blocks
}

fn failure(action: &str, err: reply_store::Error) -> String {
    error!("{} failed: {}", action, err);
    format!("{} failed: {}", action, err)
}
