//! Recruit post reconciliation.

use super::{ReactionEvent, canonical_roster, projection, roster_ids};
use crate::db::{Database, fetch_post_for_update, persist_post_reconciliation};
use crate::error::EngineError;
use crate::platform::ChatPlatform;
use crate::render;
use crate::tokens::{CLOSE, PARTICIPATE, RecruitToken, TokenKey};
use tracing::{info, trace};

/// Converge one recruit post onto live reaction membership.
pub(crate) async fn reconcile(
    db: &Database,
    platform: &dyn ChatPlatform,
    post_id: i64,
    token: RecruitToken,
    event: &ReactionEvent,
) -> Result<(), EngineError> {
    let mut tx = db.pool().begin().await?;

    // Record may have changed (or vanished) since the locator ran.
    let Some(post) = fetch_post_for_update(&mut tx, post_id).await? else {
        return Ok(());
    };

    // A closed post only listens for its close marker.
    if post.closed && token == RecruitToken::Participate {
        trace!(post = post.id, "Participation event on closed post");
        return Ok(());
    }

    let participants = canonical_roster(
        platform
            .get_reactors(
                event.channel_id,
                event.message_id,
                &TokenKey::unicode(PARTICIPATE),
            )
            .await?,
    );
    let closers = platform
        .get_reactors(event.channel_id, event.message_id, &TokenKey::unicode(CLOSE))
        .await?;
    let closed = !closers.is_empty();

    let rosters = [roster_ids(&participants)];
    let derived = projection(closed, &rosters)?;
    if post.projection.as_deref() == Some(derived.as_str()) {
        trace!(post = post.id, "Already converged");
        return Ok(());
    }

    let now = chrono::Utc::now().timestamp();
    let closed_at = match (post.closed, closed) {
        (false, true) => Some(now),
        (true, false) => None,
        _ => post.closed_at,
    };
    persist_post_reconciliation(&mut tx, post.id, closed, closed_at, &derived, now).await?;

    let payload = render::recruit_post(&post, &participants, closed);
    platform
        .edit_message(event.channel_id, event.message_id, &payload)
        .await?;

    tx.commit().await?;

    info!(
        post = post.id,
        closed,
        participants = participants.len(),
        "Recruit post reconciled"
    );
    Ok(())
}
