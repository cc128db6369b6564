//! Channel permission flags that can gate an admin command.
//!
//! Bit values match Discord's permission bitfield so a serenity
//! `Permissions` converts with `Permissions::from_bits_truncate(p.bits())`.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::debug;

bitflags! {
    /// Set of channel permissions held by a user or required by a lock.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Permissions: u64 {
        const CREATE_INSTANT_INVITE = 1 << 0;
        const KICK_MEMBERS = 1 << 1;
        const BAN_MEMBERS = 1 << 2;
        const ADMINISTRATOR = 1 << 3;
        const MANAGE_CHANNELS = 1 << 4;
        const MANAGE_GUILD = 1 << 5;
        const ADD_REACTIONS = 1 << 6;
        const VIEW_AUDIT_LOG = 1 << 7;
        const PRIORITY_SPEAKER = 1 << 8;
        const STREAM = 1 << 9;
        const VIEW_CHANNEL = 1 << 10;
        const SEND_MESSAGES = 1 << 11;
        const SEND_TTS_MESSAGES = 1 << 12;
        const MANAGE_MESSAGES = 1 << 13;
        const EMBED_LINKS = 1 << 14;
        const ATTACH_FILES = 1 << 15;
        const READ_MESSAGE_HISTORY = 1 << 16;
        const MENTION_EVERYONE = 1 << 17;
        const USE_EXTERNAL_EMOJIS = 1 << 18;
        const VIEW_GUILD_INSIGHTS = 1 << 19;
        const CONNECT = 1 << 20;
        const SPEAK = 1 << 21;
        const MUTE_MEMBERS = 1 << 22;
        const DEAFEN_MEMBERS = 1 << 23;
        const MOVE_MEMBERS = 1 << 24;
        const USE_VAD = 1 << 25;
        const CHANGE_NICKNAME = 1 << 26;
        const MANAGE_NICKNAMES = 1 << 27;
        const MANAGE_ROLES = 1 << 28;
        const MANAGE_WEBHOOKS = 1 << 29;
        const MANAGE_EMOJIS = 1 << 30;
        const USE_APPLICATION_COMMANDS = 1 << 31;
        const REQUEST_TO_SPEAK = 1 << 32;
        const MANAGE_EVENTS = 1 << 33;
        const MANAGE_THREADS = 1 << 34;
        const CREATE_PUBLIC_THREADS = 1 << 35;
        const CREATE_PRIVATE_THREADS = 1 << 36;
        const USE_EXTERNAL_STICKERS = 1 << 37;
        const SEND_MESSAGES_IN_THREADS = 1 << 38;
        const USE_EMBEDDED_ACTIVITIES = 1 << 39;
        const MODERATE_MEMBERS = 1 << 40;
    }
}

/// Name → flag lookup. The first name listed for a flag is its canonical
/// spelling; later entries are accepted aliases.
const NAMED: &[(&str, Permissions)] = &[
    ("create_instant_invite", Permissions::CREATE_INSTANT_INVITE),
    ("kick_members", Permissions::KICK_MEMBERS),
    ("ban_members", Permissions::BAN_MEMBERS),
    ("administrator", Permissions::ADMINISTRATOR),
    ("manage_channels", Permissions::MANAGE_CHANNELS),
    ("manage_guild", Permissions::MANAGE_GUILD),
    ("add_reactions", Permissions::ADD_REACTIONS),
    ("view_audit_log", Permissions::VIEW_AUDIT_LOG),
    ("priority_speaker", Permissions::PRIORITY_SPEAKER),
    ("stream", Permissions::STREAM),
    ("view_channel", Permissions::VIEW_CHANNEL),
    ("read_messages", Permissions::VIEW_CHANNEL),
    ("send_messages", Permissions::SEND_MESSAGES),
    ("send_tts_messages", Permissions::SEND_TTS_MESSAGES),
    ("manage_messages", Permissions::MANAGE_MESSAGES),
    ("embed_links", Permissions::EMBED_LINKS),
    ("attach_files", Permissions::ATTACH_FILES),
    ("read_message_history", Permissions::READ_MESSAGE_HISTORY),
    ("mention_everyone", Permissions::MENTION_EVERYONE),
    ("use_external_emojis", Permissions::USE_EXTERNAL_EMOJIS),
    ("external_emojis", Permissions::USE_EXTERNAL_EMOJIS),
    ("view_guild_insights", Permissions::VIEW_GUILD_INSIGHTS),
    ("connect", Permissions::CONNECT),
    ("speak", Permissions::SPEAK),
    ("mute_members", Permissions::MUTE_MEMBERS),
    ("deafen_members", Permissions::DEAFEN_MEMBERS),
    ("move_members", Permissions::MOVE_MEMBERS),
    ("use_voice_activation", Permissions::USE_VAD),
    ("use_vad", Permissions::USE_VAD),
    ("change_nickname", Permissions::CHANGE_NICKNAME),
    ("manage_nicknames", Permissions::MANAGE_NICKNAMES),
    ("manage_roles", Permissions::MANAGE_ROLES),
    ("manage_permissions", Permissions::MANAGE_ROLES),
    ("manage_webhooks", Permissions::MANAGE_WEBHOOKS),
    ("manage_emojis", Permissions::MANAGE_EMOJIS),
    ("manage_emojis_and_stickers", Permissions::MANAGE_EMOJIS),
    ("use_application_commands", Permissions::USE_APPLICATION_COMMANDS),
    ("request_to_speak", Permissions::REQUEST_TO_SPEAK),
    ("manage_events", Permissions::MANAGE_EVENTS),
    ("manage_threads", Permissions::MANAGE_THREADS),
    ("create_public_threads", Permissions::CREATE_PUBLIC_THREADS),
    ("create_private_threads", Permissions::CREATE_PRIVATE_THREADS),
    ("use_external_stickers", Permissions::USE_EXTERNAL_STICKERS),
    ("external_stickers", Permissions::USE_EXTERNAL_STICKERS),
    ("send_messages_in_threads", Permissions::SEND_MESSAGES_IN_THREADS),
    ("use_embedded_activities", Permissions::USE_EMBEDDED_ACTIVITIES),
    ("moderate_members", Permissions::MODERATE_MEMBERS),
];

impl Permissions {
    /// Look up a single flag by its snake_case name (case-insensitive).
    pub fn from_snake_name(name: &str) -> Option<Self> {
        let name = name.trim();
        NAMED
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, flag)| *flag)
    }

    /// Build a set from a list of names. Unknown and empty names are skipped.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = Self::empty();
        for name in names {
            if name.trim().is_empty() {
                continue;
            }
            match Self::from_snake_name(name) {
                Some(flag) => set |= flag,
                None => debug!("Ignoring unknown permission name '{}'", name.trim()),
            }
        }
        set
    }

    /// Canonical names of every flag in the set, in bit order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        let mut seen = Self::empty();
        for &(name, flag) in NAMED {
            if self.contains(flag) && !seen.contains(flag) {
                names.push(name);
                seen |= flag;
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_snake_name_known() {
        assert_eq!(
            Permissions::from_snake_name("administrator"),
            Some(Permissions::ADMINISTRATOR)
        );
        assert_eq!(
            Permissions::from_snake_name("Manage_Messages"),
            Some(Permissions::MANAGE_MESSAGES)
        );
    }

    #[test]
    fn test_from_snake_name_alias() {
        assert_eq!(
            Permissions::from_snake_name("read_messages"),
            Permissions::from_snake_name("view_channel")
        );
    }

    #[test]
    fn test_snake_name_lookup_is_separate_from_flag_names() {
        // bitflags' own lookup uses the constant names
        assert_eq!(
            Permissions::from_name("MANAGE_MESSAGES"),
            Some(Permissions::MANAGE_MESSAGES)
        );
        assert_eq!(Permissions::from_name("read_messages"), None);
        assert_eq!(
            Permissions::from_snake_name("read_messages"),
            Some(Permissions::VIEW_CHANNEL)
        );
    }

    #[test]
    fn test_from_snake_name_unknown() {
        assert_eq!(Permissions::from_snake_name("fly"), None);
    }

    #[test]
    fn test_from_names_skips_unknown_and_empty() {
        let set = Permissions::from_names(["kick_members", "", "nope", "ban_members"]);
        assert_eq!(set, Permissions::KICK_MEMBERS | Permissions::BAN_MEMBERS);
    }

    #[test]
    fn test_from_names_unknown_only_is_empty_not_all() {
        let set = Permissions::from_names(["everything"]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_names_canonical_order() {
        let set = Permissions::MANAGE_MESSAGES | Permissions::ADMINISTRATOR | Permissions::VIEW_CHANNEL;
        assert_eq!(
            set.names(),
            vec!["administrator", "view_channel", "manage_messages"]
        );
    }

    #[test]
    fn test_bits_match_discord() {
        assert_eq!(Permissions::ADMINISTRATOR.bits(), 0x8);
        assert_eq!(Permissions::MANAGE_MESSAGES.bits(), 0x2000);
        assert_eq!(Permissions::MODERATE_MEMBERS.bits(), 1 << 40);
    }
}
