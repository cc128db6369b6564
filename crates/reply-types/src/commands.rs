//! Administrative command slots.
//!
//! Every slot owns one row of the lock table, so the declaration order here
//! is also the on-disk row order.

use serde::{Deserialize, Serialize};

/// One of the fixed admin commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminCommand {
    Add,
    Delete,
    List,
    Lock,
    Reload,
}

/// Number of admin command slots (rows in the lock table).
pub const COMMAND_COUNT: usize = AdminCommand::ALL.len();

impl AdminCommand {
    /// All commands in slot order.
    pub const ALL: [AdminCommand; 5] = [
        AdminCommand::Add,
        AdminCommand::Delete,
        AdminCommand::List,
        AdminCommand::Lock,
        AdminCommand::Reload,
    ];

    /// Position of this command's lock in the lock table.
    pub fn slot(self) -> usize {
        match self {
            AdminCommand::Add => 0,
            AdminCommand::Delete => 1,
            AdminCommand::List => 2,
            AdminCommand::Lock => 3,
            AdminCommand::Reload => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AdminCommand::Add => "add",
            AdminCommand::Delete => "delete",
            AdminCommand::List => "list",
            AdminCommand::Lock => "lock",
            AdminCommand::Reload => "reload",
        }
    }

    /// Parse a command name, with or without the leading `!`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let name = name.strip_prefix('!').unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.name().eq_ignore_ascii_case(name))
    }

    /// Pattern that triggers this command. Arguments, when the command takes
    /// any, are captured in the `args` group.
    pub fn pattern(self) -> &'static str {
        match self {
            AdminCommand::Add => r"^!add\s+(?P<args>.+)$",
            AdminCommand::Delete => r"^!delete\s+(?P<args>.+)$",
            AdminCommand::List => r"^!list(?:\s+(?P<args>.*))?$",
            AdminCommand::Lock => r"^!lock\s+(?P<args>.+)$",
            AdminCommand::Reload => r"^!reload\s*$",
        }
    }
}

impl std::fmt::Display for AdminCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "!{}", self.name())
    }
}
