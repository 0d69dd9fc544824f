//! Poll creation.

use super::Setup;
use crate::db::Poll;
use crate::error::{SetupError, SetupResult};
use crate::render;
use crate::tokens::{MAX_POLL_CHOICES, poll_markers};
use tracing::info;

impl Setup {
    /// Post a poll into the invoking channel and persist its record.
    pub async fn create_poll(
        &self,
        guild_id: u64,
        channel_id: u64,
        author_id: u64,
        description: Option<&str>,
        choices: &[String],
    ) -> SetupResult<Poll> {
        let server = self.require_server(guild_id).await?;
        if choices.is_empty() || choices.len() > MAX_POLL_CHOICES {
            return Err(SetupError::InvalidChoiceCount {
                got: choices.len(),
                max: MAX_POLL_CHOICES,
            });
        }

        let draft = Poll {
            id: 0,
            server_id: server.id,
            channel_id: channel_id as i64,
            message_id: 0,
            author_id: author_id as i64,
            description: description.map(str::to_string),
            choices: choices.to_vec(),
            closed: false,
            projection: None,
            created_at: 0,
            updated_at: 0,
            closed_at: None,
        };
        let payload = render::poll(&draft, &[], false);
        let message_id = self.platform.send_message(channel_id, &payload).await?;
        self.platform
            .add_reaction_markers(channel_id, message_id, &poll_markers(choices.len()))
            .await?;

        let poll = self
            .db
            .polls()
            .create(
                server.id,
                channel_id as i64,
                message_id as i64,
                author_id as i64,
                description,
                choices,
            )
            .await?;
        info!(
            guild = guild_id,
            poll = poll.id,
            choices = choices.len(),
            "Poll created"
        );
        Ok(poll)
    }
}
