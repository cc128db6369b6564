//! Permission locks guarding admin commands

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::permissions::Permissions;

/// Privileges required to run one admin command.
///
/// An empty set in any dimension means that dimension does not restrict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSpec {
    pub permissions: Permissions,
    pub roles: BTreeSet<u64>,
    pub users: BTreeSet<u64>,
}

impl Default for LockSpec {
    fn default() -> Self {
        Self {
            permissions: Permissions::ADMINISTRATOR,
            roles: BTreeSet::new(),
            users: BTreeSet::new(),
        }
    }
}

/// The user attempting to run a command, as seen in one channel.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub user_id: u64,
    pub permissions: Permissions,
    pub role_ids: Vec<u64>,
    pub is_owner: bool,
}

impl LockSpec {
    /// Parse the three comma-joined lock table fields.
    ///
    /// Unknown permission names and non-numeric ids are dropped.
    pub fn from_fields(permissions: &str, roles: &str, users: &str) -> Self {
        Self {
            permissions: Permissions::from_names(permissions.split(',')),
            roles: parse_ids(roles),
            users: parse_ids(users),
        }
    }

    /// The three lock table fields for this spec.
    pub fn to_fields(&self) -> [String; 3] {
        [
            self.permissions.names().join(","),
            join_ids(&self.roles),
            join_ids(&self.users),
        ]
    }

    /// Owners always pass; everyone else must satisfy every restricting
    /// dimension.
    pub fn permits(&self, actor: &Actor) -> bool {
        if actor.is_owner {
            return true;
        }
        let has_permissions = actor.permissions.contains(self.permissions);
        let has_role =
            self.roles.is_empty() || actor.role_ids.iter().any(|r| self.roles.contains(r));
        let is_user = self.users.is_empty() || self.users.contains(&actor.user_id);
        has_permissions && has_role && is_user
    }

    /// One-line description for chat output.
    pub fn describe(&self) -> String {
        let permissions = if self.permissions.is_empty() {
            "none".to_string()
        } else {
            self.permissions.names().join(", ")
        };
        let roles = describe_ids(&self.roles, "<@&", ">");
        let users = describe_ids(&self.users, "<@", ">");
        format!(
            "permissions: {}; roles: {}; users: {}",
            permissions, roles, users
        )
    }
}

/// True for an empty field or a comma-joined list of digit strings.
///
/// Separators are ignored when checking, so `"1,,2"` is accepted while a
/// bare `","` is not.
pub fn is_id_list(field: &str) -> bool {
    if field.is_empty() {
        return true;
    }
    let digits: String = field.chars().filter(|c| *c != ',').collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn parse_ids(field: &str) -> BTreeSet<u64> {
    field
        .split(',')
        .map(str::trim)
        .filter_map(|x| x.parse::<u64>().ok())
        .collect()
}

fn join_ids(ids: &BTreeSet<u64>) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn describe_ids(ids: &BTreeSet<u64>, open: &str, close: &str) -> String {
    if ids.is_empty() {
        return "any".to_string();
    }
    ids.iter()
        .map(|id| format!("{}{}{}", open, id, close))
        .collect::<Vec<_>>()
        .join(", ")
}
