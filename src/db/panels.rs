//! Role panel repository.
//!
//! A panel is a message whose reactions assign roles; each binding maps one
//! reaction token to one role. Per-panel uniqueness of both the token and
//! the role is enforced here, inside the insert transaction, so concurrent
//! setup calls cannot race past the check.

use super::DbError;
use sqlx::{SqliteConnection, SqlitePool};

/// A published role panel.
#[derive(Debug, Clone)]
pub struct RolePanel {
    pub id: i64,
    pub server_id: i64,
    pub channel_id: i64,
    pub message_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A token-to-role binding on a panel.
///
/// `token_key` is the byte identity of the reaction token; `token_label` is
/// the display form kept for diagnostics.
#[derive(Debug, Clone)]
pub struct RoleBinding {
    pub id: i64,
    pub panel_id: i64,
    pub role_id: i64,
    pub token_key: Vec<u8>,
    pub token_label: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Repository for role panels and bindings.
pub struct PanelRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PanelRepository<'a> {
    /// Create a new panel repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a panel after its message has been published.
    pub async fn create_panel(
        &self,
        server_id: i64,
        channel_id: i64,
        message_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> Result<RolePanel, DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO role_panels
                (server_id, channel_id, message_id, title, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(server_id)
        .bind(channel_id)
        .bind(message_id)
        .bind(title)
        .bind(description)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(RolePanel {
            id: result.last_insert_rowid(),
            server_id,
            channel_id,
            message_id,
            title: title.to_string(),
            description: description.map(String::from),
            created_at: now,
            updated_at: now,
        })
    }

    /// Find a panel by its rendered message.
    pub async fn find_by_message(
        &self,
        server_id: i64,
        message_id: i64,
    ) -> Result<Option<RolePanel>, DbError> {
        let row = sqlx::query_as::<_, PanelRow>(
            r#"
            SELECT id, server_id, channel_id, message_id, title, description,
                   created_at, updated_at
            FROM role_panels
            WHERE server_id = ? AND message_id = ?
            "#,
        )
        .bind(server_id)
        .bind(message_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(RolePanel::from))
    }

    /// Find a panel by id, scoped to a server.
    pub async fn find_by_id(
        &self,
        server_id: i64,
        panel_id: i64,
    ) -> Result<Option<RolePanel>, DbError> {
        let row = sqlx::query_as::<_, PanelRow>(
            r#"
            SELECT id, server_id, channel_id, message_id, title, description,
                   created_at, updated_at
            FROM role_panels
            WHERE server_id = ? AND id = ?
            "#,
        )
        .bind(server_id)
        .bind(panel_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(RolePanel::from))
    }

    /// List every panel of a server, oldest first.
    pub async fn list_panels(&self, server_id: i64) -> Result<Vec<RolePanel>, DbError> {
        let rows = sqlx::query_as::<_, PanelRow>(
            r#"
            SELECT id, server_id, channel_id, message_id, title, description,
                   created_at, updated_at
            FROM role_panels
            WHERE server_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(server_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(RolePanel::from).collect())
    }

    /// Delete a panel; bindings go with it via CASCADE.
    pub async fn delete_panel(&self, panel_id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM role_panels WHERE id = ?")
            .bind(panel_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bind a reaction token to a role on a panel.
    ///
    /// Runs in a transaction: the duplicate checks and the insert must be
    /// atomic because the schema carries no unique constraint for them.
    pub async fn add_binding(
        &self,
        panel_id: i64,
        role_id: i64,
        token_key: &[u8],
        token_label: &str,
        description: Option<&str>,
    ) -> Result<RoleBinding, DbError> {
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, (Vec<u8>, i64)>(
            r#"
            SELECT token_key, role_id
            FROM role_bindings
            WHERE panel_id = ?
            "#,
        )
        .bind(panel_id)
        .fetch_all(&mut *tx)
        .await?;

        for (key, role) in &existing {
            if key.as_slice() == token_key {
                return Err(DbError::DuplicateBindingToken(token_label.to_string()));
            }
            if *role == role_id {
                return Err(DbError::DuplicateBindingRole(role_id));
            }
        }

        let result = sqlx::query(
            r#"
            INSERT INTO role_bindings
                (panel_id, role_id, token_key, token_label, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(panel_id)
        .bind(role_id)
        .bind(token_key)
        .bind(token_label)
        .bind(description)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RoleBinding {
            id: result.last_insert_rowid(),
            panel_id,
            role_id,
            token_key: token_key.to_vec(),
            token_label: token_label.to_string(),
            description: description.map(String::from),
            created_at: now,
            updated_at: now,
        })
    }

    /// Remove the binding for a token; returns the removed row, if any.
    pub async fn remove_binding(
        &self,
        panel_id: i64,
        token_key: &[u8],
    ) -> Result<Option<RoleBinding>, DbError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BindingRow>(
            r#"
            SELECT id, panel_id, role_id, token_key, token_label, description,
                   created_at, updated_at
            FROM role_bindings
            WHERE panel_id = ? AND token_key = ?
            "#,
        )
        .bind(panel_id)
        .bind(token_key)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM role_bindings WHERE id = ?")
            .bind(row.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(RoleBinding::from(row)))
    }

    /// All bindings of a panel, in binding order.
    pub async fn bindings_for_panel(&self, panel_id: i64) -> Result<Vec<RoleBinding>, DbError> {
        let rows = sqlx::query_as::<_, BindingRow>(
            r#"
            SELECT id, panel_id, role_id, token_key, token_label, description,
                   created_at, updated_at
            FROM role_bindings
            WHERE panel_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(panel_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(RoleBinding::from).collect())
    }

}

/// Re-fetch a panel inside an open reconciliation transaction.
pub(crate) async fn fetch_panel_for_update(
    conn: &mut SqliteConnection,
    panel_id: i64,
) -> Result<Option<RolePanel>, DbError> {
    let row = sqlx::query_as::<_, PanelRow>(
        r#"
        SELECT id, server_id, channel_id, message_id, title, description,
               created_at, updated_at
        FROM role_panels
        WHERE id = ?
        "#,
    )
    .bind(panel_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(RolePanel::from))
}

/// Look up a token binding inside an open reconciliation transaction.
pub(crate) async fn find_binding_for_update(
    conn: &mut SqliteConnection,
    panel_id: i64,
    token_key: &[u8],
) -> Result<Option<RoleBinding>, DbError> {
    let row = sqlx::query_as::<_, BindingRow>(
        r#"
        SELECT id, panel_id, role_id, token_key, token_label, description,
               created_at, updated_at
        FROM role_bindings
        WHERE panel_id = ? AND token_key = ?
        "#,
    )
    .bind(panel_id)
    .bind(token_key)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(RoleBinding::from))
}

/// Audit a panel store write inside an open transaction. Runs before the
/// role side effect so an aborted grant also discards the audit.
pub(crate) async fn touch_panel(
    conn: &mut SqliteConnection,
    panel_id: i64,
    now: i64,
) -> Result<(), DbError> {
    sqlx::query("UPDATE role_panels SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(panel_id)
        .execute(conn)
        .await?;

    Ok(())
}

type PanelRow = (i64, i64, i64, i64, String, Option<String>, i64, i64);

impl From<PanelRow> for RolePanel {
    fn from(
        (id, server_id, channel_id, message_id, title, description, created_at, updated_at): PanelRow,
    ) -> Self {
        RolePanel {
            id,
            server_id,
            channel_id,
            message_id,
            title,
            description,
            created_at,
            updated_at,
        }
    }
}

type BindingRow = (i64, i64, i64, Vec<u8>, String, Option<String>, i64, i64);

impl From<BindingRow> for RoleBinding {
    fn from(
        (id, panel_id, role_id, token_key, token_label, description, created_at, updated_at): BindingRow,
    ) -> Self {
        RoleBinding {
            id,
            panel_id,
            role_id,
            token_key,
            token_label,
            description,
            created_at,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, DbError};

    async fn panel_fixture(db: &Database) -> i64 {
        let server = db.servers().register(1).await.unwrap();
        let panel = db
            .panels()
            .create_panel(server.id, 10, 900, "Pick your squad", None)
            .await
            .unwrap();
        panel.id
    }

    #[tokio::test]
    async fn binding_uniqueness_is_per_panel() {
        let db = Database::new(":memory:").await.unwrap();
        let panel_id = panel_fixture(&db).await;

        db.panels()
            .add_binding(panel_id, 501, "🟥".as_bytes(), "🟥", None)
            .await
            .unwrap();

        // Same token, different role.
        let err = db
            .panels()
            .add_binding(panel_id, 502, "🟥".as_bytes(), "🟥", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::DuplicateBindingToken(_)));

        // Different token, same role.
        let err = db
            .panels()
            .add_binding(panel_id, 501, "🟦".as_bytes(), "🟦", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::DuplicateBindingRole(501)));

        // Both fresh.
        db.panels()
            .add_binding(panel_id, 502, "🟦".as_bytes(), "🟦", None)
            .await
            .unwrap();

        let bindings = db.panels().bindings_for_panel(panel_id).await.unwrap();
        assert_eq!(bindings.len(), 2);
    }

    #[tokio::test]
    async fn remove_binding_returns_the_row() {
        let db = Database::new(":memory:").await.unwrap();
        let panel_id = panel_fixture(&db).await;

        db.panels()
            .add_binding(panel_id, 501, b"custom:123", "pro gamer", None)
            .await
            .unwrap();

        let removed = db
            .panels()
            .remove_binding(panel_id, b"custom:123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(removed.role_id, 501);

        assert!(db
            .panels()
            .remove_binding(panel_id, b"custom:123")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn deleting_a_panel_cascades_to_bindings() {
        let db = Database::new(":memory:").await.unwrap();
        let panel_id = panel_fixture(&db).await;

        db.panels()
            .add_binding(panel_id, 501, "🟥".as_bytes(), "🟥", None)
            .await
            .unwrap();

        assert!(db.panels().delete_panel(panel_id).await.unwrap());
        assert!(db
            .panels()
            .bindings_for_panel(panel_id)
            .await
            .unwrap()
            .is_empty());
        assert!(!db.panels().delete_panel(panel_id).await.unwrap());
    }
}
