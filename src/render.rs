//! Deterministic rendering of records into message payloads.
//!
//! Pure functions of (record, membership, closed): no I/O, no clock, no
//! randomness. Reconciliation compares its derived state before editing, so
//! two renders of the same state must be byte-identical.

use crate::db::{Poll, RecruitPost, RoleBinding, RolePanel};
use crate::platform::{MessagePayload, Reactor};
use crate::tokens::{CLOSE, DECLINE, PARTICIPATE, choice_emoji};

const EMPTY: &str = "(none)";

/// Render a recruit post with its current participant roster.
pub fn recruit_post(post: &RecruitPost, participants: &[Reactor], closed: bool) -> MessagePayload {
    let title = if closed {
        "[CLOSED] Party recruitment".to_string()
    } else {
        "Party recruitment".to_string()
    };

    // Display names, like the poll tally. Canonical roster order is by id,
    // so the text is stable across renders.
    let roster = if participants.is_empty() {
        EMPTY.to_string()
    } else {
        participants
            .iter()
            .map(|r| r.display_name.clone())
            .collect::<Vec<_>>()
            .join(", ")
    };

    MessagePayload {
        title,
        description: format!("Recruiting by <@{}>", post.author_id),
        fields: vec![
            (
                "Description".to_string(),
                post.description
                    .clone()
                    .unwrap_or_else(|| "(no description)".to_string()),
            ),
            (
                "When".to_string(),
                post.event_date
                    .clone()
                    .unwrap_or_else(|| "(date TBD)".to_string()),
            ),
            ("Participants".to_string(), roster),
            (
                "How to join".to_string(),
                format!(
                    "React {} to join, {} to pass. React {} to close recruiting.",
                    PARTICIPATE, DECLINE, CLOSE
                ),
            ),
        ],
    }
}

/// Render a poll with one roster per choice, in choice order.
pub fn poll(poll: &Poll, rosters: &[Vec<Reactor>], closed: bool) -> MessagePayload {
    let title = if closed {
        "[CLOSED] Poll".to_string()
    } else {
        "Poll".to_string()
    };

    let mut description = format!("Poll by <@{}>", poll.author_id);
    if let Some(text) = &poll.description {
        description.push_str("\n\n");
        description.push_str(text);
    }

    let mut fields = Vec::with_capacity(poll.choices.len() + 1);
    for (i, label) in poll.choices.iter().enumerate() {
        let voters = match rosters.get(i) {
            Some(list) if !list.is_empty() => list
                .iter()
                .map(|r| r.display_name.clone())
                .collect::<Vec<_>>()
                .join(", "),
            _ => EMPTY.to_string(),
        };
        fields.push((format!("{} {}", choice_emoji(i).unwrap_or("•"), label), voters));
    }
    fields.push((
        "How to vote".to_string(),
        format!(
            "React with a choice letter to vote. React {} to close the poll.",
            CLOSE
        ),
    ));

    MessagePayload {
        title,
        description,
        fields,
    }
}

/// Render a role panel with its binding list.
pub fn role_panel(panel: &RolePanel, bindings: &[RoleBinding]) -> MessagePayload {
    let mut description = String::new();
    if let Some(text) = &panel.description {
        description.push_str(text);
        description.push_str("\n\n");
    }

    if bindings.is_empty() {
        description.push_str("(no roles bound yet)");
    } else {
        let lines = bindings
            .iter()
            .map(|b| match &b.description {
                Some(note) => format!("{} : <@&{}> ({})", b.token_label, b.role_id, note),
                None => format!("{} : <@&{}>", b.token_label, b.role_id),
            })
            .collect::<Vec<_>>()
            .join("\n");
        description.push_str(&lines);
    }

    MessagePayload {
        title: panel.title.clone(),
        description,
        fields: Vec::new(),
    }
}
