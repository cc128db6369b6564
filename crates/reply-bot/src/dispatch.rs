//! Dispatch engine: routes each inbound message to at most one registry entry.

#[path = "dispatch_tests.rs"]
mod dispatch_tests;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use regex::Regex;
use reply_store::{CsvStore, ResponseStore};
use reply_types::{AdminCommand, InboundMessage};
use tracing::{debug, error, info, warn};

use crate::errors;
use crate::outbound::{chunk_text, Outbound, OutboundError, DISCORD_MESSAGE_LIMIT};
use crate::registry::{EntryKind, Registry, RegistryError};

/// Dispatcher over the production CSV store.
pub type BotDispatcher = Dispatcher<CsvStore>;

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Authored by the bot itself.
    Ignored,
    /// No entry matched; nothing was sent.
    Unmatched,
    /// A canned reply was sent for the entry keyed by `pattern`.
    Replied { pattern: String },
    /// An admin command ran and its confirmation was sent.
    Command(AdminCommand),
}

pub struct Dispatcher<S> {
    store: Arc<S>,
    registry: ArcSwap<Registry>,
    mention: ArcSwapOption<Regex>,
    bot_user_id: AtomicU64,
}

impl<S: ResponseStore> Dispatcher<S> {
    /// Load the registry from `store`. Fails when the response table cannot
    /// be read or holds an invalid row.
    pub fn load(store: Arc<S>) -> Result<Self, RegistryError> {
        let registry = Registry::load(store.as_ref())?;
        info!(
            "{} loaded ({} entries)",
            store.identifier(),
            registry.len()
        );
        Ok(Self {
            store,
            registry: ArcSwap::from_pointee(registry),
            mention: ArcSwapOption::empty(),
            bot_user_id: AtomicU64::new(0),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current registry snapshot.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.load_full()
    }

    /// Rebuild the registry from the store and swap it in. On failure the
    /// previous registry stays live.
    pub fn reload(&self) -> Result<usize, RegistryError> {
        let registry = Registry::load(self.store.as_ref())?;
        let len = registry.len();
        self.registry.store(Arc::new(registry));
        info!("{} reloaded ({} entries)", self.store.identifier(), len);
        Ok(len)
    }

    /// Store the bot's own user ID (called from the ready handler)
    pub fn set_bot_user_id(&self, id: u64) {
        self.bot_user_id.store(id, Ordering::Relaxed);
        match Regex::new(&format!(r"<@[!&]?{}>", id)) {
            Ok(re) => self.mention.store(Some(Arc::new(re))),
            Err(e) => warn!("Failed to build mention pattern for {}: {}", id, e),
        }
    }

    pub fn bot_user_id(&self) -> Option<u64> {
        match self.bot_user_id.load(Ordering::Relaxed) {
            0 => None,
            id => Some(id),
        }
    }

    /// True if `content` mentions the bot. Always false before the bot ID
    /// is known.
    pub fn mentions_bot(&self, content: &str) -> bool {
        self.mention
            .load()
            .as_ref()
            .is_some_and(|re| re.is_match(content))
    }
}

impl<S: ResponseStore + 'static> Dispatcher<S> {
    pub async fn dispatch<O: Outbound>(
        self: &Arc<Self>,
        msg: &InboundMessage,
        outbound: &O,
    ) -> Result<DispatchOutcome, OutboundError> {
        if self.bot_user_id() == Some(msg.author_id) {
            return Ok(DispatchOutcome::Ignored);
        }

        let registry = self.registry();
        let mentioned = self.mentions_bot(&msg.content);
        let actor = msg.actor();

        for (key, entry) in registry.iter() {
            if entry.require_mention && !mentioned {
                continue;
            }

            match &entry.kind {
                EntryKind::Command(cmd) => {
                    let Some(args) = entry.pattern.captures(&msg.content).map(|caps| {
                        caps.name("args")
                            .map_or(String::new(), |m| m.as_str().trim().to_string())
                    }) else {
                        continue;
                    };
                    if !cmd.lock.permits(&actor) {
                        info!(
                            "User {} lacks the lock for {} in channel {}",
                            msg.author_id, cmd.command, msg.channel_id
                        );
                        continue;
                    }
                    debug!("Running {} for user {}", cmd.command, msg.author_id);
                    let command = cmd.command;
                    let this = Arc::clone(self);
                    // Store access is blocking file I/O
                    let replies =
                        match tokio::task::spawn_blocking(move || this.run_command(command, &args))
                            .await
                        {
                            Ok(replies) => replies,
                            Err(e) => {
                                error!("{} task failed: {}", command, e);
                                vec![format!("{} failed: {}", command, e)]
                            }
                        };
                    for reply in &replies {
                        send_text(outbound, msg.channel_id, reply).await?;
                    }
                    return Ok(DispatchOutcome::Command(command));
                }
                EntryKind::Reply(reply) => {
                    if !entry.pattern.is_match(&msg.content) {
                        continue;
                    }
                    debug!(
                        "Message {} matched '{}' (reply {}/{})",
                        msg.message_id,
                        key,
                        reply.rotation() + 1,
                        reply.messages().len()
                    );
                    send_text(outbound, msg.channel_id, reply.next_message()).await?;

                    if let Some(emoji) = reply.reaction() {
                        match outbound
                            .add_reaction(msg.channel_id, msg.message_id, emoji)
                            .await
                        {
                            Ok(()) => {}
                            Err(OutboundError::InvalidEmoji(_)) => {
                                warn!("Emoji '{}' for '{}' was rejected; clearing it", emoji, key);
                                reply.clear_reaction();
                            }
                            Err(e) => errors::log_error("Failed to add reaction", &e),
                        }
                    }
                    return Ok(DispatchOutcome::Replied {
                        pattern: key.to_string(),
                    });
                }
            }
        }

        Ok(DispatchOutcome::Unmatched)
    }
}

/// Send `text`, split to fit Discord's message limit.
async fn send_text<O: Outbound>(
    outbound: &O,
    channel_id: u64,
    text: &str,
) -> Result<(), OutboundError> {
    for chunk in chunk_text(text, DISCORD_MESSAGE_LIMIT) {
        outbound.send_message(channel_id, &chunk).await?;
    }
    Ok(())
}
