//! Chat platform interface.
//!
//! The engine talks to Discord through this narrow capability trait; tests
//! substitute [`stub::StubPlatform`]. Everything is expressed in raw
//! snowflake ids so nothing outside `discord.rs` depends on client types.

pub mod discord;
#[cfg(test)]
pub mod stub;

use crate::error::PlatformError;
use crate::tokens::TokenKey;
use async_trait::async_trait;

/// A rendered message body, ready to publish or compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePayload {
    pub title: String,
    pub description: String,
    /// Name/value pairs rendered as embed fields, in order.
    pub fields: Vec<(String, String)>,
}

/// A user currently holding a reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reactor {
    pub id: u64,
    pub display_name: String,
}

/// The platform capabilities the engine needs. Nothing more.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Publish a message; returns its id.
    async fn send_message(
        &self,
        channel_id: u64,
        payload: &MessagePayload,
    ) -> Result<u64, PlatformError>;

    /// Replace the rendered body of a message.
    async fn edit_message(
        &self,
        channel_id: u64,
        message_id: u64,
        payload: &MessagePayload,
    ) -> Result<(), PlatformError>;

    /// Delete a message.
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), PlatformError>;

    /// Seed marker reactions in order, as the bot.
    async fn add_reaction_markers(
        &self,
        channel_id: u64,
        message_id: u64,
        tokens: &[TokenKey],
    ) -> Result<(), PlatformError>;

    /// Remove the bot's own marker reaction for a token.
    async fn remove_reaction_marker(
        &self,
        channel_id: u64,
        message_id: u64,
        token: &TokenKey,
    ) -> Result<(), PlatformError>;

    /// Everyone currently reacting with `token`, bots excluded.
    async fn get_reactors(
        &self,
        channel_id: u64,
        message_id: u64,
        token: &TokenKey,
    ) -> Result<Vec<Reactor>, PlatformError>;

    /// Grant a role to a guild member.
    async fn grant_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), PlatformError>;

    /// Revoke a role from a guild member.
    async fn revoke_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), PlatformError>;
}
