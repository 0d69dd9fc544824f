//! Reaction token registry.
//!
//! Every reaction the engine cares about is resolved here, in one place:
//! the fixed recruit-post markers, the positional poll choice alphabet, and
//! the per-panel role bindings (whose keys are produced here and matched in
//! the store).
//!
//! A token has two faces: `key` is its byte identity (UTF-8 emoji bytes, or
//! `custom:<id>` for guild emotes) used for storage and comparison; `label`
//! is the display form used only in logs and error text. The two are never
//! mixed: display strings for custom emotes are not stable identities.

use serenity::model::channel::ReactionType;
use serenity::model::id::EmojiId;

/// Marker for joining a recruit post.
pub const PARTICIPATE: &str = "🙆";
/// Marker for bowing out. Seeded for readers, never triggers reconciliation.
pub const DECLINE: &str = "🙅";
/// Marker for closing (and reopening) a recruit post or poll.
pub const CLOSE: &str = "🚫";

/// Positional poll choice alphabet (regional indicators A..S).
pub const CHOICE_EMOJI: [&str; MAX_POLL_CHOICES] = [
    "🇦", "🇧", "🇨", "🇩", "🇪", "🇫", "🇬", "🇭", "🇮", "🇯", "🇰", "🇱", "🇲", "🇳", "🇴",
    "🇵", "🇶", "🇷", "🇸",
];

/// A message carries at most 20 distinct reactions; one slot is reserved
/// for the close marker.
pub const MAX_POLL_CHOICES: usize = 19;

/// The byte identity of a reaction token, plus its display label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenKey {
    key: Vec<u8>,
    label: String,
}

impl TokenKey {
    /// Token for a plain unicode emoji.
    pub fn unicode(emoji: &str) -> Self {
        Self {
            key: emoji.as_bytes().to_vec(),
            label: emoji.to_string(),
        }
    }

    /// Token identity of an incoming reaction.
    pub fn from_reaction(reaction: &ReactionType) -> Self {
        match reaction {
            ReactionType::Unicode(s) => Self::unicode(s),
            ReactionType::Custom { id, name, .. } => Self {
                key: format!("custom:{}", id).into_bytes(),
                label: match name {
                    Some(n) => format!(":{}:", n),
                    None => format!("custom:{}", id),
                },
            },
            // Future reaction kinds: opaque, matches nothing we registered.
            _ => Self {
                key: b"opaque".to_vec(),
                label: "?".to_string(),
            },
        }
    }

    /// Rebuild the platform reaction for this token, if the key is one we
    /// know how to express.
    pub fn to_reaction(&self) -> Option<ReactionType> {
        if let Some(id) = self
            .key
            .strip_prefix(b"custom:")
            .and_then(|rest| std::str::from_utf8(rest).ok())
            .and_then(|rest| rest.parse::<u64>().ok())
        {
            return Some(ReactionType::Custom {
                animated: false,
                id: EmojiId::new(id),
                name: None,
            });
        }
        std::str::from_utf8(&self.key)
            .ok()
            .map(|s| ReactionType::Unicode(s.to_string()))
    }

    /// Byte identity, as stored in `role_bindings.token_key`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Display form for logs and error text.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Tokens recognized on a recruit post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecruitToken {
    Participate,
    Close,
}

impl RecruitToken {
    /// Resolve an incoming token. The decline marker deliberately resolves
    /// to nothing: it is informational and must not cause an edit.
    pub fn resolve(key: &TokenKey) -> Option<Self> {
        if key.as_bytes() == PARTICIPATE.as_bytes() {
            Some(Self::Participate)
        } else if key.as_bytes() == CLOSE.as_bytes() {
            Some(Self::Close)
        } else {
            None
        }
    }
}

/// Tokens recognized on a poll with a known choice count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollToken {
    Choice(usize),
    Close,
}

impl PollToken {
    /// Resolve an incoming token against a poll's choice count.
    pub fn resolve(key: &TokenKey, choice_count: usize) -> Option<Self> {
        if key.as_bytes() == CLOSE.as_bytes() {
            return Some(Self::Close);
        }
        CHOICE_EMOJI
            .iter()
            .take(choice_count.min(MAX_POLL_CHOICES))
            .position(|e| e.as_bytes() == key.as_bytes())
            .map(Self::Choice)
    }
}

/// The choice emoji at a position, if any.
pub fn choice_emoji(index: usize) -> Option<&'static str> {
    CHOICE_EMOJI.get(index).copied()
}

/// Markers seeded on a fresh recruit post, in display order.
pub fn recruit_markers() -> [TokenKey; 3] {
    [
        TokenKey::unicode(PARTICIPATE),
        TokenKey::unicode(DECLINE),
        TokenKey::unicode(CLOSE),
    ]
}

/// Markers seeded on a fresh poll: one per choice, then the close marker.
pub fn poll_markers(choice_count: usize) -> Vec<TokenKey> {
    let mut markers: Vec<TokenKey> = CHOICE_EMOJI
        .iter()
        .take(choice_count.min(MAX_POLL_CHOICES))
        .map(|e| TokenKey::unicode(e))
        .collect();
    markers.push(TokenKey::unicode(CLOSE));
    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recruit_tokens_resolve() {
        assert_eq!(
            RecruitToken::resolve(&TokenKey::unicode(PARTICIPATE)),
            Some(RecruitToken::Participate)
        );
        assert_eq!(
            RecruitToken::resolve(&TokenKey::unicode(CLOSE)),
            Some(RecruitToken::Close)
        );
        // Decline is a marker, not a trigger.
        assert_eq!(RecruitToken::resolve(&TokenKey::unicode(DECLINE)), None);
        assert_eq!(RecruitToken::resolve(&TokenKey::unicode("👍")), None);
    }

    #[test]
    fn poll_tokens_respect_choice_count() {
        let b = TokenKey::unicode("🇧");
        assert_eq!(PollToken::resolve(&b, 3), Some(PollToken::Choice(1)));
        // Same token, narrower poll: out of range resolves to nothing.
        assert_eq!(PollToken::resolve(&b, 1), None);
        assert_eq!(
            PollToken::resolve(&TokenKey::unicode(CLOSE), 1),
            Some(PollToken::Close)
        );
        assert_eq!(PollToken::resolve(&TokenKey::unicode("👍"), 19), None);
    }

    #[test]
    fn custom_emotes_key_on_id_not_name() {
        let renamed_a = ReactionType::Custom {
            animated: false,
            id: EmojiId::new(112233),
            name: Some("raid_a".to_string()),
        };
        let renamed_b = ReactionType::Custom {
            animated: false,
            id: EmojiId::new(112233),
            name: Some("raid_b".to_string()),
        };

        let key_a = TokenKey::from_reaction(&renamed_a);
        let key_b = TokenKey::from_reaction(&renamed_b);
        assert_eq!(key_a.as_bytes(), key_b.as_bytes());
        assert_eq!(key_a.as_bytes(), b"custom:112233");
        assert_eq!(key_a.label(), ":raid_a:");

        match key_a.to_reaction() {
            Some(ReactionType::Custom { id, .. }) => assert_eq!(id.get(), 112233),
            other => panic!("expected custom reaction, got {:?}", other),
        }
    }

    #[test]
    fn unicode_round_trip() {
        let key = TokenKey::unicode("🙆");
        assert_eq!(
            key.to_reaction(),
            Some(ReactionType::Unicode("🙆".to_string()))
        );
    }

    #[test]
    fn poll_markers_end_with_close() {
        let markers = poll_markers(2);
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0], TokenKey::unicode("🇦"));
        assert_eq!(markers[2], TokenKey::unicode(CLOSE));

        // The alphabet is finite; oversized requests clamp.
        assert_eq!(poll_markers(50).len(), MAX_POLL_CHOICES + 1);
    }
}
