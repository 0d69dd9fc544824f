//! Discord implementation of [`ChatPlatform`] over the serenity HTTP client.

use super::{ChatPlatform, MessagePayload, Reactor};
use crate::error::PlatformError;
use crate::tokens::TokenKey;
use async_trait::async_trait;
use serenity::builder::{CreateEmbed, CreateMessage, EditMessage};
use serenity::http::Http;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::sync::Arc;
use tracing::debug;

/// Reaction-user pages are capped by the API.
const REACTOR_PAGE: u8 = 100;

/// Discord-backed platform.
pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    fn build_embed(payload: &MessagePayload) -> CreateEmbed {
        let mut embed = CreateEmbed::new()
            .title(&payload.title)
            .description(&payload.description);
        for (name, value) in &payload.fields {
            embed = embed.field(name, value, false);
        }
        embed
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn send_message(
        &self,
        channel_id: u64,
        payload: &MessagePayload,
    ) -> Result<u64, PlatformError> {
        let builder = CreateMessage::new().embed(Self::build_embed(payload));
        let message = ChannelId::new(channel_id)
            .send_message(&*self.http, builder)
            .await?;
        Ok(message.id.get())
    }

    async fn edit_message(
        &self,
        channel_id: u64,
        message_id: u64,
        payload: &MessagePayload,
    ) -> Result<(), PlatformError> {
        let builder = EditMessage::new().embed(Self::build_embed(payload));
        ChannelId::new(channel_id)
            .edit_message(&*self.http, MessageId::new(message_id), builder)
            .await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), PlatformError> {
        ChannelId::new(channel_id)
            .delete_message(&*self.http, MessageId::new(message_id))
            .await?;
        Ok(())
    }

    async fn add_reaction_markers(
        &self,
        channel_id: u64,
        message_id: u64,
        tokens: &[TokenKey],
    ) -> Result<(), PlatformError> {
        let channel = ChannelId::new(channel_id);
        let message = MessageId::new(message_id);
        for token in tokens {
            let Some(reaction) = token.to_reaction() else {
                debug!(token = %token.label(), "Skipping marker with inexpressible token");
                continue;
            };
            self.http.create_reaction(channel, message, &reaction).await?;
        }
        Ok(())
    }

    async fn remove_reaction_marker(
        &self,
        channel_id: u64,
        message_id: u64,
        token: &TokenKey,
    ) -> Result<(), PlatformError> {
        let Some(reaction) = token.to_reaction() else {
            return Ok(());
        };
        self.http
            .delete_reaction_me(ChannelId::new(channel_id), MessageId::new(message_id), &reaction)
            .await?;
        Ok(())
    }

    async fn get_reactors(
        &self,
        channel_id: u64,
        message_id: u64,
        token: &TokenKey,
    ) -> Result<Vec<Reactor>, PlatformError> {
        let Some(reaction) = token.to_reaction() else {
            return Ok(Vec::new());
        };

        let channel = ChannelId::new(channel_id);
        let message = MessageId::new(message_id);
        let mut reactors = Vec::new();
        let mut after: Option<u64> = None;

        // Page through with an `after` cursor until a short page.
        loop {
            let page = self
                .http
                .get_reaction_users(channel, message, &reaction, REACTOR_PAGE, after)
                .await?;
            let page_len = page.len();
            after = page.last().map(|u| u.id.get());

            reactors.extend(page.into_iter().filter(|u| !u.bot).map(|u| Reactor {
                id: u.id.get(),
                display_name: u
                    .global_name
                    .as_deref()
                    .unwrap_or(&u.name)
                    .to_string(),
            }));

            if page_len < REACTOR_PAGE as usize {
                break;
            }
        }

        Ok(reactors)
    }

    async fn grant_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), PlatformError> {
        self.http
            .add_member_role(
                GuildId::new(guild_id),
                UserId::new(user_id),
                RoleId::new(role_id),
                Some("reaction role panel"),
            )
            .await?;
        Ok(())
    }

    async fn revoke_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), PlatformError> {
        self.http
            .remove_member_role(
                GuildId::new(guild_id),
                UserId::new(user_id),
                RoleId::new(role_id),
                Some("reaction role panel"),
            )
            .await?;
        Ok(())
    }
}
