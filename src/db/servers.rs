//! Server repository.
//!
//! A server row is the registration anchor for everything else: recruiting
//! channels, polls, and role panels all hang off it. Registration is
//! explicit; an unregistered guild is invisible to the reconciler.

use super::DbError;
use sqlx::SqlitePool;

/// A registered server (guild).
#[derive(Debug, Clone)]
pub struct ServerRecord {
    pub id: i64,
    pub guild_id: i64,
    pub created_at: i64,
}

/// Repository for server registration.
pub struct ServerRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ServerRepository<'a> {
    /// Create a new server repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a guild.
    pub async fn register(&self, guild_id: i64) -> Result<ServerRecord, DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO servers (guild_id, created_at)
            VALUES (?, ?)
            "#,
        )
        .bind(guild_id)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            // Convert UNIQUE constraint violation to ServerExists error
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::ServerExists(guild_id);
            }
            DbError::from(e)
        })?;

        Ok(ServerRecord {
            id: result.last_insert_rowid(),
            guild_id,
            created_at: now,
        })
    }

    /// Find a server by guild id.
    pub async fn find_by_guild(&self, guild_id: i64) -> Result<Option<ServerRecord>, DbError> {
        let row = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT id, guild_id, created_at
            FROM servers
            WHERE guild_id = ?
            "#,
        )
        .bind(guild_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id, guild_id, created_at)| ServerRecord {
            id,
            guild_id,
            created_at,
        }))
    }
}
