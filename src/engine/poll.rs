//! Poll reconciliation.

use super::{ReactionEvent, canonical_roster, projection, roster_ids};
use crate::db::{Database, fetch_poll_for_update, persist_poll_reconciliation};
use crate::error::EngineError;
use crate::platform::ChatPlatform;
use crate::render;
use crate::tokens::{CHOICE_EMOJI, CLOSE, PollToken, TokenKey};
use tracing::{info, trace};

/// Converge one poll onto live reaction membership, one roster per choice.
pub(crate) async fn reconcile(
    db: &Database,
    platform: &dyn ChatPlatform,
    poll_id: i64,
    token: PollToken,
    event: &ReactionEvent,
) -> Result<(), EngineError> {
    let mut tx = db.pool().begin().await?;

    let Some(poll) = fetch_poll_for_update(&mut tx, poll_id).await? else {
        return Ok(());
    };

    // A closed poll only listens for its close marker.
    if poll.closed && matches!(token, PollToken::Choice(_)) {
        trace!(poll = poll.id, "Vote event on closed poll");
        return Ok(());
    }

    let mut rosters = Vec::with_capacity(poll.choices.len());
    for emoji in CHOICE_EMOJI.iter().take(poll.choices.len()) {
        let members = canonical_roster(
            platform
                .get_reactors(event.channel_id, event.message_id, &TokenKey::unicode(emoji))
                .await?,
        );
        rosters.push(members);
    }
    let closers = platform
        .get_reactors(event.channel_id, event.message_id, &TokenKey::unicode(CLOSE))
        .await?;
    let closed = !closers.is_empty();

    let ids: Vec<Vec<u64>> = rosters.iter().map(|r| roster_ids(r)).collect();
    let derived = projection(closed, &ids)?;
    if poll.projection.as_deref() == Some(derived.as_str()) {
        trace!(poll = poll.id, "Already converged");
        return Ok(());
    }

    let now = chrono::Utc::now().timestamp();
    let closed_at = match (poll.closed, closed) {
        (false, true) => Some(now),
        (true, false) => None,
        _ => poll.closed_at,
    };
    persist_poll_reconciliation(&mut tx, poll.id, closed, closed_at, &derived, now).await?;

    let payload = render::poll(&poll, &rosters, closed);
    platform
        .edit_message(event.channel_id, event.message_id, &payload)
        .await?;

    tx.commit().await?;

    info!(poll = poll.id, closed, "Poll reconciled");
    Ok(())
}
