//! Role panel reconciliation.
//!
//! Panels carry no projection: the side effect (grant or revoke) is gated on
//! live membership instead, so a stale or duplicated event either matches
//! what the platform already shows or gets skipped.

use super::{Direction, ReactionEvent};
use crate::db::{Database, fetch_panel_for_update, find_binding_for_update, touch_panel};
use crate::error::EngineError;
use crate::platform::ChatPlatform;
use tracing::{info, trace};

/// Apply one reaction event against a panel's bindings.
pub(crate) async fn reconcile(
    db: &Database,
    platform: &dyn ChatPlatform,
    panel_id: i64,
    event: &ReactionEvent,
) -> Result<(), EngineError> {
    let mut tx = db.pool().begin().await?;

    let Some(panel) = fetch_panel_for_update(&mut tx, panel_id).await? else {
        return Ok(());
    };
    let Some(binding) = find_binding_for_update(&mut tx, panel.id, event.token.as_bytes()).await?
    else {
        trace!(panel = panel.id, token = %event.token.label(), "Reaction on unbound token");
        return Ok(());
    };

    let members = platform
        .get_reactors(event.channel_id, event.message_id, &event.token)
        .await?;
    let actor_holds = members.iter().any(|r| r.id == event.user_id);

    // Only act when the live membership still backs the event; the audit
    // write goes first so a failed role call rolls it back too.
    let now = chrono::Utc::now().timestamp();
    match event.direction {
        Direction::Added if actor_holds => {
            touch_panel(&mut tx, panel.id, now).await?;
            platform
                .grant_role(event.guild_id, event.user_id, binding.role_id as u64)
                .await?;
            tx.commit().await?;
            info!(
                panel = panel.id,
                user = event.user_id,
                role = binding.role_id,
                "Role granted"
            );
        }
        Direction::Removed if !actor_holds => {
            touch_panel(&mut tx, panel.id, now).await?;
            platform
                .revoke_role(event.guild_id, event.user_id, binding.role_id as u64)
                .await?;
            tx.commit().await?;
            info!(
                panel = panel.id,
                user = event.user_id,
                role = binding.role_id,
                "Role revoked"
            );
        }
        _ => {
            trace!(
                panel = panel.id,
                user = event.user_id,
                "Event contradicts live membership, skipping"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cache::ServerCache;
    use crate::db::{Database, RolePanel};
    use crate::engine::{Direction, Engine, RawReactionEvent};
    use crate::platform::stub::{RoleCall, StubPlatform};
    use crate::setup::Setup;
    use crate::tokens::TokenKey;
    use std::sync::Arc;

    struct Fixture {
        db: Database,
        stub: Arc<StubPlatform>,
        engine: Engine,
        panel: RolePanel,
        token: TokenKey,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(":memory:").await.unwrap();
        let stub = Arc::new(StubPlatform::new());
        let cache = Arc::new(ServerCache::new());
        let setup = Setup::new(db.clone(), stub.clone(), cache.clone());
        let engine = Engine::new(db.clone(), stub.clone(), cache.clone());

        setup.register_server(1).await.unwrap();
        let panel = setup
            .create_panel(1, 300, "Pick your squad", None)
            .await
            .unwrap();
        let token = TokenKey::unicode("🟥");
        setup
            .add_binding(1, panel.id, token.clone(), 501, Some("raiders"))
            .await
            .unwrap();

        Fixture {
            db,
            stub,
            engine,
            panel,
            token,
        }
    }

    fn event(fx: &Fixture, user: u64, token: &TokenKey, direction: Direction) -> RawReactionEvent {
        RawReactionEvent {
            guild_id: Some(1),
            channel_id: 300,
            message_id: fx.panel.message_id as u64,
            user_id: Some(user),
            user_is_bot: false,
            token: token.clone(),
            direction,
        }
    }

    #[tokio::test]
    async fn grants_when_live_membership_confirms() {
        let fx = fixture().await;
        let msg = fx.panel.message_id as u64;

        fx.stub.set_reactors(msg, &fx.token, &[(3, "ash")]);
        fx.engine
            .handle_event(event(&fx, 3, &fx.token, Direction::Added))
            .await
            .unwrap();

        assert_eq!(
            fx.stub.role_calls(),
            vec![RoleCall::Grant {
                guild: 1,
                user: 3,
                role: 501
            }]
        );
    }

    #[tokio::test]
    async fn revokes_when_the_reaction_is_gone() {
        let fx = fixture().await;
        let msg = fx.panel.message_id as u64;

        fx.stub.set_reactors(msg, &fx.token, &[]);
        fx.engine
            .handle_event(event(&fx, 3, &fx.token, Direction::Removed))
            .await
            .unwrap();

        assert_eq!(
            fx.stub.role_calls(),
            vec![RoleCall::Revoke {
                guild: 1,
                user: 3,
                role: 501
            }]
        );
    }

    #[tokio::test]
    async fn stale_events_are_skipped() {
        let fx = fixture().await;
        let msg = fx.panel.message_id as u64;

        // Added, but the user already un-reacted.
        fx.stub.set_reactors(msg, &fx.token, &[]);
        fx.engine
            .handle_event(event(&fx, 3, &fx.token, Direction::Added))
            .await
            .unwrap();

        // Removed, but the user re-reacted meanwhile.
        fx.stub.set_reactors(msg, &fx.token, &[(3, "ash")]);
        fx.engine
            .handle_event(event(&fx, 3, &fx.token, Direction::Removed))
            .await
            .unwrap();

        assert!(fx.stub.role_calls().is_empty());
    }

    #[tokio::test]
    async fn unbound_tokens_do_nothing() {
        let fx = fixture().await;
        let msg = fx.panel.message_id as u64;
        let other = TokenKey::unicode("🟩");

        fx.stub.set_reactors(msg, &other, &[(3, "ash")]);
        fx.engine
            .handle_event(event(&fx, 3, &other, Direction::Added))
            .await
            .unwrap();

        assert!(fx.stub.role_calls().is_empty());
    }

    #[tokio::test]
    async fn failed_grant_rolls_back_the_audit_write() {
        let fx = fixture().await;
        let msg = fx.panel.message_id as u64;

        sqlx::query("UPDATE role_panels SET updated_at = 12345 WHERE id = ?")
            .bind(fx.panel.id)
            .execute(fx.db.pool())
            .await
            .unwrap();

        fx.stub.set_reactors(msg, &fx.token, &[(3, "ash")]);
        fx.stub.fail_role_ops(true);
        let err = fx
            .engine
            .handle_event(event(&fx, 3, &fx.token, Direction::Added))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "platform_error");

        let row = fx
            .db
            .panels()
            .find_by_message(fx.panel.server_id, fx.panel.message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.updated_at, 12345);

        // Retry after recovery lands both the grant and the audit write.
        fx.stub.fail_role_ops(false);
        fx.engine
            .handle_event(event(&fx, 3, &fx.token, Direction::Added))
            .await
            .unwrap();
        assert_eq!(fx.stub.role_calls().len(), 1);
        let row = fx
            .db
            .panels()
            .find_by_message(fx.panel.server_id, fx.panel.message_id)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(row.updated_at, 12345);
    }
}
