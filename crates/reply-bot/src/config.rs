//! Configuration management for reply-bot

#[path = "config_tests.rs"]
mod config_tests;

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use reply_store::{DEFAULT_LOCKS_FILE, DEFAULT_RESPONSES_FILE};
use serde::{Deserialize, Serialize};

/// Environment variable read for the bot token.
pub const BOT_TOKEN_VAR: &str = "DISCORD_BOT_TOKEN";
pub const RESPONSES_VAR: &str = "REPLY_BOT_RESPONSES";
pub const LOCKS_VAR: &str = "REPLY_BOT_LOCKS";

/// Source of environment variables.
pub trait ReadEnv {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
pub struct SystemEnv;

impl ReadEnv for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Complete bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub discord: DiscordBotConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Discord bot specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordBotConfig {
    /// Bot token from the Discord developer portal
    #[serde(default)]
    pub bot_token: String,
}

/// Locations of the response and lock tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_responses")]
    pub responses: PathBuf,
    #[serde(default = "default_locks")]
    pub locks: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            responses: default_responses(),
            locks: default_locks(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_env_with(&SystemEnv)
    }

    /// Load configuration from `env`. Missing variables fall back to
    /// defaults; a missing token is caught by [`Config::validate`].
    pub fn from_env_with<E: ReadEnv>(env: &E) -> Self {
        let non_empty = |key: &str| env.var(key).filter(|v| !v.trim().is_empty());

        Config {
            discord: DiscordBotConfig {
                bot_token: env.var(BOT_TOKEN_VAR).unwrap_or_default(),
            },
            storage: StorageConfig {
                responses: non_empty(RESPONSES_VAR)
                    .map(PathBuf::from)
                    .unwrap_or_else(default_responses),
                locks: non_empty(LOCKS_VAR)
                    .map(PathBuf::from)
                    .unwrap_or_else(default_locks),
            },
        }
    }

    /// Reject configuration the bot cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.discord.bot_token.trim().is_empty() {
            bail!(
                "Discord bot token is empty; set {} or [discord] bot_token with the token \
                 from the Discord developer portal",
                BOT_TOKEN_VAR
            );
        }
        Ok(())
    }
}

fn default_responses() -> PathBuf {
    PathBuf::from(DEFAULT_RESPONSES_FILE)
}

fn default_locks() -> PathBuf {
    PathBuf::from(DEFAULT_LOCKS_FILE)
}
