//! Discord gateway wiring: reaction events in, command replies out.

pub mod commands;

use crate::engine::{Direction, Engine, RawReactionEvent};
use crate::setup::Setup;
use crate::tokens::TokenKey;
use commands::Command;
use serenity::async_trait;
use serenity::gateway::ActivityData;
use serenity::model::channel::{Message, Reaction};
use serenity::model::gateway::Ready;
use serenity::prelude::{Context, EventHandler};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, warn};

/// Serenity event handler. Reaction events feed the engine; prefix commands
/// feed the setup operations and get a text reply either way.
pub struct Handler {
    engine: Engine,
    setup: Setup,
    status: Option<String>,
    // Learned at ready; used to drop our own marker reactions early.
    bot_id: AtomicU64,
}

impl Handler {
    pub fn new(engine: Engine, setup: Setup, status: Option<String>) -> Self {
        Self {
            engine,
            setup,
            status,
            bot_id: AtomicU64::new(0),
        }
    }

    /// Feed one reaction event to the engine. Failures are logged and
    /// dropped; the next event on the message re-converges.
    async fn relay(&self, reaction: Reaction, direction: Direction) {
        let bot_id = self.bot_id.load(Ordering::SeqCst);
        let user_is_bot = reaction.user_id.map(|u| u.get()) == Some(bot_id)
            || reaction.member.as_ref().is_some_and(|m| m.user.bot);

        let raw = RawReactionEvent {
            guild_id: reaction.guild_id.map(|g| g.get()),
            channel_id: reaction.channel_id.get(),
            message_id: reaction.message_id.get(),
            user_id: reaction.user_id.map(|u| u.get()),
            user_is_bot,
            token: TokenKey::from_reaction(&reaction.emoji),
            direction,
        };
        if let Err(e) = self.engine.handle_event(raw).await {
            error!(
                code = e.error_code(),
                message = reaction.message_id.get(),
                error = %e,
                "Reconciliation pass failed"
            );
        }
    }

    /// Run one parsed command and produce the reply text.
    async fn dispatch(&self, guild: u64, channel: u64, author: u64, command: Command) -> String {
        let outcome = match command {
            Command::Register => self
                .setup
                .register_server(guild)
                .await
                .map(|_| "This server is now registered.".to_string()),
            Command::RecruitChannel { channel_id } => self
                .setup
                .designate_recruit_channel(guild, channel_id)
                .await
                .map(|_| format!("Recruiting channel set to <#{channel_id}>.")),
            Command::Recruit {
                description,
                event_date,
            } => self
                .setup
                .create_recruit_post(guild, author, description.as_deref(), event_date.as_deref())
                .await
                .map(|_| "Recruiting post is up.".to_string()),
            Command::Poll {
                description,
                choices,
            } => self
                .setup
                .create_poll(guild, channel, author, description.as_deref(), &choices)
                .await
                .map(|_| "Poll is up.".to_string()),
            Command::Panel { title, description } => self
                .setup
                .create_panel(guild, channel, &title, description.as_deref())
                .await
                .map(|p| format!("Role panel created, panel id {}.", p.id)),
            Command::Panels => self.setup.list_panels(guild).await.map(|panels| {
                if panels.is_empty() {
                    "No role panels on this server.".to_string()
                } else {
                    panels
                        .iter()
                        .map(|p| format!("{} : {}", p.id, p.title))
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }),
            Command::PanelRemove { panel_id } => self
                .setup
                .remove_panel(guild, panel_id)
                .await
                .map(|_| format!("Panel {panel_id} removed.")),
            Command::Bind {
                panel_id,
                token,
                role_id,
                note,
            } => self
                .setup
                .add_binding(guild, panel_id, token.clone(), role_id, note.as_deref())
                .await
                .map(|_| format!("Bound {} to <@&{role_id}>.", token.label())),
            Command::Unbind { panel_id, token } => self
                .setup
                .remove_binding(guild, panel_id, &token)
                .await
                .map(|_| format!("Unbound {}.", token.label())),
            Command::Help => return commands::usage().to_string(),
        };

        match outcome {
            Ok(reply) => reply,
            Err(e) if e.is_user_error() => {
                warn!(guild, code = e.error_code(), "Command rejected");
                e.to_string()
            }
            Err(e) => {
                error!(guild, code = e.error_code(), error = %e, "Command failed");
                "Something went wrong, try again later.".to_string()
            }
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        self.bot_id.store(ready.user.id.get(), Ordering::SeqCst);
        if let Some(status) = &self.status {
            ctx.set_activity(Some(ActivityData::custom(status)));
        }
        info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            "Gateway session ready"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };
        let Some(command) = commands::parse(&msg.content) else {
            return;
        };

        let reply = self
            .dispatch(
                guild_id.get(),
                msg.channel_id.get(),
                msg.author.id.get(),
                command,
            )
            .await;
        if let Err(e) = msg.channel_id.say(&ctx.http, reply).await {
            warn!(channel = msg.channel_id.get(), error = %e, "Reply could not be sent");
        }
    }

    async fn reaction_add(&self, _ctx: Context, reaction: Reaction) {
        self.relay(reaction, Direction::Added).await;
    }

    async fn reaction_remove(&self, _ctx: Context, reaction: Reaction) {
        self.relay(reaction, Direction::Removed).await;
    }
}
