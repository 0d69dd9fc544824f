//! Recruiting channel designation and recruit post creation.

use super::Setup;
use crate::db::{RecruitChannel, RecruitPost};
use crate::error::{SetupError, SetupResult};
use crate::render;
use crate::tokens::recruit_markers;
use tracing::info;

impl Setup {
    /// Designate (or move) the guild's recruiting channel.
    ///
    /// Moving the channel keeps existing posts attached; they simply stop
    /// receiving events because the engine only watches the current channel.
    pub async fn designate_recruit_channel(
        &self,
        guild_id: u64,
        channel_id: u64,
    ) -> SetupResult<RecruitChannel> {
        let server = self.require_server(guild_id).await?;
        let rc = self
            .db
            .recruits()
            .designate_channel(server.id, channel_id as i64)
            .await?;
        info!(
            guild = guild_id,
            channel = channel_id,
            "Recruiting channel designated"
        );
        Ok(rc)
    }

    /// Post a recruit message into the designated channel and persist its
    /// record. The send happens first; its message id keys the row.
    pub async fn create_recruit_post(
        &self,
        guild_id: u64,
        author_id: u64,
        description: Option<&str>,
        event_date: Option<&str>,
    ) -> SetupResult<RecruitPost> {
        let server = self.require_server(guild_id).await?;
        let Some(rc) = self.db.recruits().channel_for_server(server.id).await? else {
            return Err(SetupError::NoRecruitChannel);
        };

        // Draft only feeds the initial render; the stored row carries the
        // message id the send returns.
        let draft = RecruitPost {
            id: 0,
            recruit_channel_id: rc.id,
            message_id: 0,
            author_id: author_id as i64,
            description: description.map(str::to_string),
            event_date: event_date.map(str::to_string),
            closed: false,
            projection: None,
            created_at: 0,
            updated_at: 0,
            closed_at: None,
        };
        let payload = render::recruit_post(&draft, &[], false);
        let channel = rc.channel_id as u64;
        let message_id = self.platform.send_message(channel, &payload).await?;
        self.platform
            .add_reaction_markers(channel, message_id, &recruit_markers())
            .await?;

        let post = self
            .db
            .recruits()
            .create_post(
                rc.id,
                message_id as i64,
                author_id as i64,
                description,
                event_date,
            )
            .await?;
        info!(
            guild = guild_id,
            post = post.id,
            message = message_id,
            "Recruit post created"
        );
        Ok(post)
    }
}
