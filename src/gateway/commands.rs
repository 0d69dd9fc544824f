//! Hand-rolled prefix command parser.
//!
//! One fixed prefix, one subcommand word, then positional arguments.
//! Segments that carry free text are separated by `|` so descriptions can
//! contain spaces. Anything recognizably ours but malformed parses to
//! [`Command::Help`] so the caller replies with usage instead of silence.

use crate::tokens::TokenKey;
use serenity::model::channel::ReactionType;
use serenity::model::id::EmojiId;

pub const PREFIX: &str = "!muster";

const USAGE: &str = "\
Commands:
  !muster register
  !muster recruit-channel <#channel>
  !muster recruit [description [| date]]
  !muster poll [description] | choice [| choice ...]
  !muster panel <title> [| description]
  !muster panels
  !muster panel-remove <panel-id>
  !muster bind <panel-id> <emoji> <@&role> [note]
  !muster unbind <panel-id> <emoji>";

/// A parsed admin command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register,
    RecruitChannel {
        channel_id: u64,
    },
    Recruit {
        description: Option<String>,
        event_date: Option<String>,
    },
    Poll {
        description: Option<String>,
        choices: Vec<String>,
    },
    Panel {
        title: String,
        description: Option<String>,
    },
    Panels,
    PanelRemove {
        panel_id: i64,
    },
    Bind {
        panel_id: i64,
        token: TokenKey,
        role_id: u64,
        note: Option<String>,
    },
    Unbind {
        panel_id: i64,
        token: TokenKey,
    },
    Help,
}

/// Usage text sent in reply to `help` and malformed commands.
pub fn usage() -> &'static str {
    USAGE
}

/// Parse a message into a command. `None` means the message is not
/// addressed to the bot at all.
pub fn parse(content: &str) -> Option<Command> {
    let rest = content.trim().strip_prefix(PREFIX)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim();
    let (sub, args) = match rest.split_once(char::is_whitespace) {
        Some((sub, args)) => (sub, args.trim()),
        None => (rest, ""),
    };

    let command = match sub {
        "register" => Command::Register,
        "recruit-channel" => match args.split_whitespace().next().and_then(parse_channel) {
            Some(channel_id) => Command::RecruitChannel { channel_id },
            None => Command::Help,
        },
        "recruit" => {
            let segments = split_segments(args);
            match segments.len() {
                0 | 1 => Command::Recruit {
                    description: segments.into_iter().next().flatten(),
                    event_date: None,
                },
                2 => {
                    let mut it = segments.into_iter();
                    Command::Recruit {
                        description: it.next().flatten(),
                        event_date: it.next().flatten(),
                    }
                }
                _ => Command::Help,
            }
        }
        "poll" => {
            let mut segments = split_segments(args);
            if segments.is_empty() {
                Command::Help
            } else {
                let description = segments.remove(0);
                Command::Poll {
                    description,
                    choices: segments.into_iter().flatten().collect(),
                }
            }
        }
        "panel" => {
            let segments = split_segments(args);
            match segments.first() {
                Some(Some(title)) if segments.len() <= 2 => Command::Panel {
                    title: title.clone(),
                    description: segments.get(1).cloned().flatten(),
                },
                _ => Command::Help,
            }
        }
        "panels" => Command::Panels,
        "panel-remove" => match args.split_whitespace().next().and_then(|w| w.parse().ok()) {
            Some(panel_id) => Command::PanelRemove { panel_id },
            None => Command::Help,
        },
        "bind" => {
            let mut words = args.split_whitespace();
            match (
                words.next().and_then(|w| w.parse::<i64>().ok()),
                words.next().map(parse_token),
                words.next().and_then(parse_role),
            ) {
                (Some(panel_id), Some(token), Some(role_id)) => {
                    let note = words.collect::<Vec<_>>().join(" ");
                    Command::Bind {
                        panel_id,
                        token,
                        role_id,
                        note: (!note.is_empty()).then_some(note),
                    }
                }
                _ => Command::Help,
            }
        }
        "unbind" => {
            let mut words = args.split_whitespace();
            match (
                words.next().and_then(|w| w.parse::<i64>().ok()),
                words.next().map(parse_token),
            ) {
                (Some(panel_id), Some(token)) => Command::Unbind { panel_id, token },
                _ => Command::Help,
            }
        }
        _ => Command::Help,
    };
    Some(command)
}

/// Split `|`-separated free-text segments; empty segments become `None` so
/// `poll | a | b` reads as a poll with no description.
fn split_segments(args: &str) -> Vec<Option<String>> {
    if args.is_empty() {
        return Vec::new();
    }
    args.split('|')
        .map(|s| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        })
        .collect()
}

fn parse_channel(word: &str) -> Option<u64> {
    let body = word
        .strip_prefix("<#")
        .and_then(|w| w.strip_suffix('>'))
        .unwrap_or(word);
    body.parse().ok()
}

fn parse_role(word: &str) -> Option<u64> {
    let body = word
        .strip_prefix("<@&")
        .and_then(|w| w.strip_suffix('>'))
        .unwrap_or(word);
    body.parse().ok()
}

/// A reaction token as typed in chat: either a guild emote mention
/// (`<:name:id>`, `<a:name:id>`) or a literal unicode emoji.
fn parse_token(word: &str) -> TokenKey {
    if let Some(body) = word
        .strip_prefix("<a:")
        .or_else(|| word.strip_prefix("<:"))
        .and_then(|w| w.strip_suffix('>'))
        && let Some((name, id)) = body.rsplit_once(':')
        && let Ok(id) = id.parse::<u64>()
    {
        return TokenKey::from_reaction(&ReactionType::Custom {
            animated: word.starts_with("<a:"),
            id: EmojiId::new(id),
            name: Some(name.to_string()),
        });
    }
    TokenKey::unicode(word)
}
