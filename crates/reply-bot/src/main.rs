//! Regex auto-reply bot for Discord
//!
//! Answers messages that match a stored pattern with a rotating canned reply
//! and an optional reaction. Guild admins curate the response table from
//! chat with permission-locked `!add`, `!delete`, `!list`, `!lock` and
//! `!reload` commands.

mod commands;
mod config;
mod dispatch;
mod errors;
mod handlers;
mod health;
#[cfg(test)]
mod mock;
mod outbound;
mod registry;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use reply_store::CsvStore;
use serenity::model::gateway::GatewayIntents;
use serenity::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::dispatch::{BotDispatcher, Dispatcher};
use crate::handlers::Handler;
use crate::health::AppState;

/// Regex auto-reply bot CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/reply-bot.toml")]
    config: String,

    /// Discord bot token (overrides config file)
    #[arg(long, env = "DISCORD_BOT_TOKEN")]
    bot_token: Option<String>,

    /// Response table path (overrides config file)
    #[arg(long, env = "REPLY_BOT_RESPONSES")]
    responses: Option<PathBuf>,

    /// Lock table path (overrides config file)
    #[arg(long, env = "REPLY_BOT_LOCKS")]
    locks: Option<PathBuf>,

    /// Health check server port
    #[arg(long, env = "HEALTH_CHECK_PORT", default_value = "3001")]
    health_port: u16,
}

impl Args {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(bot_token) = &self.bot_token {
            config.discord.bot_token = bot_token.clone();
        }
        if let Some(responses) = &self.responses {
            config.storage.responses = responses.clone();
        }
        if let Some(locks) = &self.locks {
            config.storage.locks = locks.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reply_bot=debug,reply_store=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting reply bot");

    let args = Args::parse();

    let mut config = if std::path::Path::new(&args.config).exists() {
        info!("Loading config from file: {}", args.config);
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, loading from environment");
        Config::from_env()
    };
    args.apply_overrides(&mut config);
    config.validate()?;

    info!(
        "Responses: {}, locks: {}",
        config.storage.responses.display(),
        config.storage.locks.display()
    );

    let store = CsvStore::new(config.storage.responses.clone(), config.storage.locks.clone());
    let dispatcher: Arc<BotDispatcher> = Arc::new(Dispatcher::load(Arc::new(store)).with_context(
        || {
            format!(
                "Failed to load responses from {}",
                config.storage.responses.display()
            )
        },
    )?);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord.bot_token, intents)
        .event_handler(Handler)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Discord client: {}", e))?;

    let health_state = AppState::new(dispatcher.clone());

    {
        let mut data = client.data.write().await;
        data.insert::<BotDispatcher>(dispatcher);
        data.insert::<AppState>(health_state.clone());
    }

    let health_port = args.health_port;
    tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_state, health_port).await {
            error!("Health server error: {}", e);
        }
    });

    // Graceful shutdown: close all shards on SIGTERM or Ctrl+C.
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        info!("Shutdown signal received, stopping Discord client...");
        shard_manager.shutdown_all().await;
    });

    info!("Starting Discord gateway connection...");

    client
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("Discord client error: {}", e))?;

    info!("Reply bot stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
}
