//! Reaction reconciliation engine.
//!
//! The pipeline for every gateway reaction event:
//! 1. normalize: drop bot reactions and events without a resolvable guild
//!    or actor; nothing here is an error.
//! 2. locate: resolve the registered server (through the cache), then the
//!    zero-or-one tracked record behind (channel, message): recruit post,
//!    poll, or role panel. Unknown messages and unrecognized tokens are the
//!    common decorative case and drop silently.
//! 3. reconcile: per-kind transaction that re-fetches the record, re-queries
//!    live reaction membership, and converges store + rendered message onto
//!    it. Delivery order, duplication, and lost events all wash out because
//!    nothing is incremented; state is always re-derived from live truth.

mod panel;
mod poll;
mod recruit;

use crate::cache::ServerCache;
use crate::db::{Database, DbError};
use crate::error::EngineError;
use crate::platform::{ChatPlatform, Reactor};
use crate::tokens::{PollToken, RecruitToken, TokenKey};
use serde::Serialize;
use std::sync::Arc;
use tracing::trace;

/// Which way a reaction event went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Added,
    Removed,
}

/// A reaction event as the gateway delivers it, before normalization.
#[derive(Debug, Clone)]
pub struct RawReactionEvent {
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub message_id: u64,
    pub user_id: Option<u64>,
    pub user_is_bot: bool,
    pub token: TokenKey,
    pub direction: Direction,
}

/// A normalized reaction event: guild-scoped, human actor.
#[derive(Debug, Clone)]
pub(crate) struct ReactionEvent {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    pub user_id: u64,
    pub token: TokenKey,
    pub direction: Direction,
}

/// Discard events the engine must never act on. Returns `None` for bot
/// actors, unattributed events, and messages outside a guild.
pub(crate) fn normalize(raw: RawReactionEvent) -> Option<ReactionEvent> {
    if raw.user_is_bot {
        trace!(message = raw.message_id, "Dropping bot reaction");
        return None;
    }
    let Some(user_id) = raw.user_id else {
        trace!(message = raw.message_id, "Dropping unattributed reaction");
        return None;
    };
    let Some(guild_id) = raw.guild_id else {
        trace!(message = raw.message_id, "Dropping non-guild reaction");
        return None;
    };
    Some(ReactionEvent {
        guild_id,
        channel_id: raw.channel_id,
        message_id: raw.message_id,
        user_id,
        token: raw.token,
        direction: raw.direction,
    })
}

/// The reconciliation engine. Cheap to clone; shared by the gateway tasks.
#[derive(Clone)]
pub struct Engine {
    db: Database,
    platform: Arc<dyn ChatPlatform>,
    servers: Arc<ServerCache>,
}

impl Engine {
    pub fn new(db: Database, platform: Arc<dyn ChatPlatform>, servers: Arc<ServerCache>) -> Self {
        Self {
            db,
            platform,
            servers,
        }
    }

    /// Handle one gateway reaction event end to end.
    ///
    /// Ok(()) covers both "reconciled" and "not ours"; an Err means a
    /// platform or store failure aborted the pass. The caller logs and
    /// drops it; the next event on the message re-converges.
    pub async fn handle_event(&self, raw: RawReactionEvent) -> Result<(), EngineError> {
        let Some(event) = normalize(raw) else {
            return Ok(());
        };

        let Some(server) = self
            .servers
            .get_or_load(&self.db, event.guild_id as i64)
            .await?
        else {
            trace!(guild = event.guild_id, "Reaction in unregistered guild");
            return Ok(());
        };

        // Recruit posts live only in the designated channel.
        if let Some(rc) = self.db.recruits().channel_for_server(server.id).await?
            && rc.channel_id as u64 == event.channel_id
            && let Some(post) = self
                .db
                .recruits()
                .find_post(rc.id, event.message_id as i64)
                .await?
        {
            let Some(token) = RecruitToken::resolve(&event.token) else {
                trace!(message = event.message_id, token = %event.token.label(), "Unrecognized token on recruit post");
                return Ok(());
            };
            return recruit::reconcile(&self.db, self.platform.as_ref(), post.id, token, &event)
                .await;
        }

        if let Some(poll_row) = self
            .db
            .polls()
            .find_by_message(server.id, event.message_id as i64)
            .await?
        {
            let Some(token) = PollToken::resolve(&event.token, poll_row.choices.len()) else {
                trace!(message = event.message_id, token = %event.token.label(), "Unrecognized token on poll");
                return Ok(());
            };
            return poll::reconcile(&self.db, self.platform.as_ref(), poll_row.id, token, &event)
                .await;
        }

        if let Some(panel_row) = self
            .db
            .panels()
            .find_by_message(server.id, event.message_id as i64)
            .await?
        {
            return panel::reconcile(&self.db, self.platform.as_ref(), panel_row.id, &event).await;
        }

        trace!(message = event.message_id, "Reaction on untracked message");
        Ok(())
    }
}

/// Sort by id and drop duplicate reactors so membership has one canonical
/// form regardless of query order.
pub(crate) fn canonical_roster(mut reactors: Vec<Reactor>) -> Vec<Reactor> {
    reactors.sort_by_key(|r| r.id);
    reactors.dedup_by_key(|r| r.id);
    reactors
}

#[derive(Serialize)]
struct ProjectionRepr<'a> {
    closed: bool,
    rosters: &'a [Vec<u64>],
}

/// Canonical encoding of derived state, compared against the stored copy
/// to decide whether this pass changes anything.
pub(crate) fn projection(closed: bool, rosters: &[Vec<u64>]) -> Result<String, DbError> {
    Ok(serde_json::to_string(&ProjectionRepr { closed, rosters })?)
}

/// Roster ids in canonical order.
pub(crate) fn roster_ids(reactors: &[Reactor]) -> Vec<u64> {
    reactors.iter().map(|r| r.id).collect()
}
