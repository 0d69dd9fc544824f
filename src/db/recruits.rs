//! Recruiting repository.
//!
//! Handles the per-server designated recruiting channel and the recruit
//! posts published into it.

use super::DbError;
use sqlx::{SqliteConnection, SqlitePool};

/// The designated recruiting channel of a server.
#[derive(Debug, Clone)]
pub struct RecruitChannel {
    pub id: i64,
    pub server_id: i64,
    pub channel_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A published recruit post.
#[derive(Debug, Clone)]
pub struct RecruitPost {
    pub id: i64,
    pub recruit_channel_id: i64,
    pub message_id: i64,
    pub author_id: i64,
    pub description: Option<String>,
    pub event_date: Option<String>,
    pub closed: bool,
    pub projection: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub closed_at: Option<i64>,
}

/// Repository for recruiting channels and posts.
pub struct RecruitRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RecruitRepository<'a> {
    /// Create a new recruiting repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Designate (or re-designate) the recruiting channel for a server.
    ///
    /// Upserts in place so existing recruit posts keep their parent row.
    pub async fn designate_channel(
        &self,
        server_id: i64,
        channel_id: i64,
    ) -> Result<RecruitChannel, DbError> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO recruit_channels (server_id, channel_id, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(server_id) DO UPDATE
            SET channel_id = excluded.channel_id, updated_at = excluded.updated_at
            "#,
        )
        .bind(server_id)
        .bind(channel_id)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        self.channel_for_server(server_id).await?.ok_or_else(|| {
            DbError::Internal(format!("recruit channel upsert lost for server {}", server_id))
        })
    }

    /// Get the designated recruiting channel of a server, if any.
    pub async fn channel_for_server(
        &self,
        server_id: i64,
    ) -> Result<Option<RecruitChannel>, DbError> {
        let row = sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
            r#"
            SELECT id, server_id, channel_id, created_at, updated_at
            FROM recruit_channels
            WHERE server_id = ?
            "#,
        )
        .bind(server_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(
            |(id, server_id, channel_id, created_at, updated_at)| RecruitChannel {
                id,
                server_id,
                channel_id,
                created_at,
                updated_at,
            },
        ))
    }

    /// Insert a recruit post after its message has been published.
    pub async fn create_post(
        &self,
        recruit_channel_id: i64,
        message_id: i64,
        author_id: i64,
        description: Option<&str>,
        event_date: Option<&str>,
    ) -> Result<RecruitPost, DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO recruit_posts
                (recruit_channel_id, message_id, author_id, description, event_date,
                 closed, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(recruit_channel_id)
        .bind(message_id)
        .bind(author_id)
        .bind(description)
        .bind(event_date)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(RecruitPost {
            id: result.last_insert_rowid(),
            recruit_channel_id,
            message_id,
            author_id,
            description: description.map(String::from),
            event_date: event_date.map(String::from),
            closed: false,
            projection: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        })
    }

    /// Find a recruit post by its rendered message.
    pub async fn find_post(
        &self,
        recruit_channel_id: i64,
        message_id: i64,
    ) -> Result<Option<RecruitPost>, DbError> {
        let row = sqlx::query_as::<_, RecruitPostRow>(
            r#"
            SELECT id, recruit_channel_id, message_id, author_id, description, event_date,
                   closed, projection, created_at, updated_at, closed_at
            FROM recruit_posts
            WHERE recruit_channel_id = ? AND message_id = ?
            "#,
        )
        .bind(recruit_channel_id)
        .bind(message_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(RecruitPost::from))
    }
}

/// Re-fetch a post inside an open reconciliation transaction.
pub(crate) async fn fetch_post_for_update(
    conn: &mut SqliteConnection,
    post_id: i64,
) -> Result<Option<RecruitPost>, DbError> {
    let row = sqlx::query_as::<_, RecruitPostRow>(
        r#"
        SELECT id, recruit_channel_id, message_id, author_id, description, event_date,
               closed, projection, created_at, updated_at, closed_at
        FROM recruit_posts
        WHERE id = ?
        "#,
    )
    .bind(post_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(RecruitPost::from))
}

/// Write the reconciled state of a post inside an open transaction.
pub(crate) async fn persist_reconciliation(
    conn: &mut SqliteConnection,
    post_id: i64,
    closed: bool,
    closed_at: Option<i64>,
    projection: &str,
    now: i64,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        UPDATE recruit_posts
        SET closed = ?, closed_at = ?, projection = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(closed)
    .bind(closed_at)
    .bind(projection)
    .bind(now)
    .bind(post_id)
    .execute(conn)
    .await?;

    Ok(())
}

type RecruitPostRow = (
    i64,
    i64,
    i64,
    i64,
    Option<String>,
    Option<String>,
    bool,
    Option<String>,
    i64,
    i64,
    Option<i64>,
);

impl From<RecruitPostRow> for RecruitPost {
    fn from(
        (
            id,
            recruit_channel_id,
            message_id,
            author_id,
            description,
            event_date,
            closed,
            projection,
            created_at,
            updated_at,
            closed_at,
        ): RecruitPostRow,
    ) -> Self {
        RecruitPost {
            id,
            recruit_channel_id,
            message_id,
            author_id,
            description,
            event_date,
            closed,
            projection,
            created_at,
            updated_at,
            closed_at,
        }
    }
}
