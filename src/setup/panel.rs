//! Role panel management: panels, bindings, redraws.

use super::Setup;
use crate::db::{RoleBinding, RolePanel};
use crate::error::{SetupError, SetupResult};
use crate::render;
use crate::tokens::TokenKey;
use tracing::{info, warn};

impl Setup {
    /// Post a role panel message and persist its record.
    pub async fn create_panel(
        &self,
        guild_id: u64,
        channel_id: u64,
        title: &str,
        description: Option<&str>,
    ) -> SetupResult<RolePanel> {
        let server = self.require_server(guild_id).await?;

        let draft = RolePanel {
            id: 0,
            server_id: server.id,
            channel_id: channel_id as i64,
            message_id: 0,
            title: title.to_string(),
            description: description.map(str::to_string),
            created_at: 0,
            updated_at: 0,
        };
        let payload = render::role_panel(&draft, &[]);
        let message_id = self.platform.send_message(channel_id, &payload).await?;

        let panel = self
            .db
            .panels()
            .create_panel(
                server.id,
                channel_id as i64,
                message_id as i64,
                title,
                description,
            )
            .await?;
        info!(guild = guild_id, panel = panel.id, "Role panel created");
        Ok(panel)
    }

    /// Delete a panel, its bindings, and its rendered message.
    pub async fn remove_panel(&self, guild_id: u64, panel_id: i64) -> SetupResult<RolePanel> {
        let server = self.require_server(guild_id).await?;
        let Some(panel) = self.db.panels().find_by_id(server.id, panel_id).await? else {
            return Err(SetupError::NoSuchPanel(panel_id));
        };

        self.db.panels().delete_panel(panel.id).await?;
        // Rows are gone; from here the message is cosmetic.
        if let Err(e) = self
            .platform
            .delete_message(panel.channel_id as u64, panel.message_id as u64)
            .await
        {
            warn!(panel = panel.id, error = %e, "Panel message could not be deleted");
        }
        info!(guild = guild_id, panel = panel.id, "Role panel removed");
        Ok(panel)
    }

    /// List a server's panels, oldest first. This is how admins find the
    /// panel ids that remove/bind/unbind take.
    pub async fn list_panels(&self, guild_id: u64) -> SetupResult<Vec<RolePanel>> {
        let server = self.require_server(guild_id).await?;
        Ok(self.db.panels().list_panels(server.id).await?)
    }

    /// Bind a reaction token to a role on a panel.
    pub async fn add_binding(
        &self,
        guild_id: u64,
        panel_id: i64,
        token: TokenKey,
        role_id: u64,
        description: Option<&str>,
    ) -> SetupResult<RoleBinding> {
        let server = self.require_server(guild_id).await?;
        let Some(panel) = self.db.panels().find_by_id(server.id, panel_id).await? else {
            return Err(SetupError::NoSuchPanel(panel_id));
        };

        let binding = self
            .db
            .panels()
            .add_binding(
                panel.id,
                role_id as i64,
                token.as_bytes(),
                token.label(),
                description,
            )
            .await?;

        self.refresh_panel(&panel).await;
        if let Err(e) = self
            .platform
            .add_reaction_markers(
                panel.channel_id as u64,
                panel.message_id as u64,
                std::slice::from_ref(&token),
            )
            .await
        {
            warn!(panel = panel.id, error = %e, "Binding marker could not be seeded");
        }
        info!(
            guild = guild_id,
            panel = panel.id,
            role = role_id,
            token = %token.label(),
            "Role bound"
        );
        Ok(binding)
    }

    /// Remove the binding for a token from a panel.
    pub async fn remove_binding(
        &self,
        guild_id: u64,
        panel_id: i64,
        token: &TokenKey,
    ) -> SetupResult<RoleBinding> {
        let server = self.require_server(guild_id).await?;
        let Some(panel) = self.db.panels().find_by_id(server.id, panel_id).await? else {
            return Err(SetupError::NoSuchPanel(panel_id));
        };
        let Some(binding) = self
            .db
            .panels()
            .remove_binding(panel.id, token.as_bytes())
            .await?
        else {
            return Err(SetupError::NoSuchBinding(token.label().to_string()));
        };

        self.refresh_panel(&panel).await;
        if let Err(e) = self
            .platform
            .remove_reaction_marker(panel.channel_id as u64, panel.message_id as u64, token)
            .await
        {
            warn!(panel = panel.id, error = %e, "Binding marker could not be cleared");
        }
        info!(
            guild = guild_id,
            panel = panel.id,
            token = %token.label(),
            "Role unbound"
        );
        Ok(binding)
    }

    /// Redraw a panel message after its bindings changed. The rows are
    /// already committed, so failures here only warn; the next successful
    /// change redraws everything anyway.
    async fn refresh_panel(&self, panel: &RolePanel) {
        let bindings = match self.db.panels().bindings_for_panel(panel.id).await {
            Ok(b) => b,
            Err(e) => {
                warn!(panel = panel.id, error = %e, "Bindings could not be reloaded for redraw");
                return;
            }
        };
        let payload = render::role_panel(panel, &bindings);
        if let Err(e) = self
            .platform
            .edit_message(panel.channel_id as u64, panel.message_id as u64, &payload)
            .await
        {
            warn!(panel = panel.id, error = %e, "Panel message could not be redrawn");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Setup;
    use crate::cache::ServerCache;
    use crate::db::Database;
    use crate::error::SetupError;
    use crate::platform::stub::StubPlatform;
    use crate::tokens::TokenKey;
    use std::sync::Arc;

    async fn fixture() -> (Setup, Arc<StubPlatform>) {
        let db = Database::new(":memory:").await.unwrap();
        let stub = Arc::new(StubPlatform::new());
        let setup = Setup::new(db, stub.clone(), Arc::new(ServerCache::new()));
        setup.register_server(1).await.unwrap();
        (setup, stub)
    }

    #[tokio::test]
    async fn binding_redraws_the_panel_and_seeds_the_marker() {
        let (setup, stub) = fixture().await;
        let panel = setup
            .create_panel(1, 300, "Pick your squad", None)
            .await
            .unwrap();
        let msg = panel.message_id as u64;

        let token = TokenKey::unicode("🟥");
        setup
            .add_binding(1, panel.id, token.clone(), 501, Some("raiders"))
            .await
            .unwrap();

        let payload = stub.last_edit(msg).unwrap();
        assert_eq!(payload.description, "🟥 : <@&501> (raiders)");
        assert_eq!(stub.markers_for(msg), vec![token]);
    }

    #[tokio::test]
    async fn duplicate_bindings_are_rejected() {
        let (setup, _) = fixture().await;
        let panel = setup.create_panel(1, 300, "Squads", None).await.unwrap();

        let red = TokenKey::unicode("🟥");
        setup
            .add_binding(1, panel.id, red.clone(), 501, None)
            .await
            .unwrap();

        let err = setup
            .add_binding(1, panel.id, red.clone(), 502, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::DuplicateToken(_)));

        let err = setup
            .add_binding(1, panel.id, TokenKey::unicode("🟦"), 501, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::DuplicateRole(501)));
    }

    #[tokio::test]
    async fn unbinding_redraws_and_clears_the_marker() {
        let (setup, stub) = fixture().await;
        let panel = setup.create_panel(1, 300, "Squads", None).await.unwrap();
        let msg = panel.message_id as u64;

        let token = TokenKey::unicode("🟥");
        setup
            .add_binding(1, panel.id, token.clone(), 501, None)
            .await
            .unwrap();
        setup.remove_binding(1, panel.id, &token).await.unwrap();

        let payload = stub.last_edit(msg).unwrap();
        assert_eq!(payload.description, "(no roles bound yet)");
        assert_eq!(stub.removed_markers(), vec![(msg, token.clone())]);

        let err = setup
            .remove_binding(1, panel.id, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::NoSuchBinding(_)));
    }

    #[tokio::test]
    async fn redraw_failures_do_not_fail_the_binding() {
        let (setup, stub) = fixture().await;
        let panel = setup.create_panel(1, 300, "Squads", None).await.unwrap();

        stub.fail_edits(true);
        setup
            .add_binding(1, panel.id, TokenKey::unicode("🟥"), 501, None)
            .await
            .unwrap();
        assert_eq!(stub.edit_count(panel.message_id as u64), 0);
    }

    #[tokio::test]
    async fn listing_shows_only_this_servers_panels() {
        let (setup, _) = fixture().await;
        setup.register_server(2).await.unwrap();

        let first = setup.create_panel(1, 300, "Squads", None).await.unwrap();
        let second = setup.create_panel(1, 300, "Colors", None).await.unwrap();
        setup.create_panel(2, 400, "Elsewhere", None).await.unwrap();

        let panels = setup.list_panels(1).await.unwrap();
        assert_eq!(
            panels.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
        assert_eq!(panels[0].title, "Squads");
        assert_eq!(panels[1].title, "Colors");
    }

    #[tokio::test]
    async fn removing_a_panel_deletes_rows_and_message() {
        let (setup, stub) = fixture().await;
        let panel = setup.create_panel(1, 300, "Squads", None).await.unwrap();
        setup
            .add_binding(1, panel.id, TokenKey::unicode("🟥"), 501, None)
            .await
            .unwrap();

        setup.remove_panel(1, panel.id).await.unwrap();
        assert_eq!(
            stub.deleted(),
            vec![(300, panel.message_id as u64)]
        );

        let err = setup.remove_panel(1, panel.id).await.unwrap_err();
        assert!(matches!(err, SetupError::NoSuchPanel(_)));
    }
}
