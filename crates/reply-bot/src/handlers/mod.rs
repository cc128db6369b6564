//! Serenity event handler implementation

use std::sync::Arc;

use reply_types::{InboundMessage, Permissions};
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tracing::{debug, error, info};

use crate::dispatch::{BotDispatcher, DispatchOutcome};
use crate::errors;
use crate::health::AppState;
use crate::outbound::SerenityOutbound;

impl TypeMapKey for BotDispatcher {
    type Value = Arc<BotDispatcher>;
}

pub struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            "Discord bot connected as {}#{:04}",
            ready.user.name,
            ready.user.discriminator.map_or(0, |d| d.get())
        );

        let data = ctx.data.read().await;
        match data.get::<BotDispatcher>() {
            Some(dispatcher) => dispatcher.set_bot_user_id(ready.user.id.get()),
            None => error!("Dispatcher not found in context data"),
        }
        if let Some(state) = data.get::<AppState>() {
            state.set_bot_username(ready.user.name.clone()).await;
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let dispatcher = {
            let data = ctx.data.read().await;
            match data.get::<BotDispatcher>() {
                Some(d) => d.clone(),
                None => {
                    error!("Dispatcher not found in context data");
                    return;
                }
            }
        };

        let inbound = inbound_message(&ctx, &msg);
        let outbound = SerenityOutbound::new(ctx.http.clone());
        match dispatcher.dispatch(&inbound, &outbound).await {
            Ok(DispatchOutcome::Command(command)) => {
                info!(
                    "User {} ran {} in channel {}",
                    inbound.author_id, command, inbound.channel_id
                );
            }
            Ok(outcome) => debug!("Message {}: {:?}", inbound.message_id, outcome),
            Err(e) => errors::log_error("Failed to send reply", &e),
        }
    }
}

/// Snapshot the fields dispatch needs. Direct messages carry no guild
/// permissions or roles and have no owner.
fn inbound_message(ctx: &Context, msg: &Message) -> InboundMessage {
    let guild_owner_id = msg.guild(&ctx.cache).map(|guild| guild.owner_id.get());
    let author_permissions = if msg.guild_id.is_some() {
        msg.author_permissions(&ctx.cache)
            .map(|p| Permissions::from_bits_truncate(p.bits()))
            .unwrap_or_default()
    } else {
        Permissions::empty()
    };
    let author_role_ids = msg
        .member
        .as_ref()
        .map(|m| m.roles.iter().map(|r| r.get()).collect())
        .unwrap_or_default();

    InboundMessage {
        message_id: msg.id.get(),
        channel_id: msg.channel_id.get(),
        author_id: msg.author.id.get(),
        guild_owner_id,
        content: msg.content.clone(),
        author_permissions,
        author_role_ids,
    }
}
