//! musterbot - reaction-synchronized recruiting posts, polls, and role
//! panels for Discord guilds.

mod cache;
mod config;
mod db;
mod engine;
mod error;
mod gateway;
mod platform;
mod render;
mod setup;
mod tokens;

use crate::cache::ServerCache;
use crate::config::Config;
use crate::db::Database;
use crate::engine::Engine;
use crate::gateway::Handler;
use crate::platform::discord::DiscordPlatform;
use crate::setup::Setup;
use serenity::http::Http;
use serenity::prelude::*;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    // The token never lives in the config file, only its variable name does.
    let token = std::env::var(&config.bot.token_env).map_err(|_| {
        error!(var = %config.bot.token_env, "Bot token variable is not set");
        anyhow::anyhow!("missing bot token in ${}", config.bot.token_env)
    })?;

    info!(db = %config.database.path, "Starting musterbot");

    let db = Database::new(&config.database.path).await?;

    let http = Arc::new(Http::new(&token));
    let platform = Arc::new(DiscordPlatform::new(http));
    let servers = Arc::new(ServerCache::new());
    let engine = Engine::new(db.clone(), platform.clone(), servers.clone());
    let setup = Setup::new(db, platform, servers);
    let handler = Handler::new(engine, setup, config.bot.status.clone());

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .await?;

    client.start().await?;

    Ok(())
}
