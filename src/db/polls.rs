//! Poll repository.
//!
//! A poll row carries its choice labels as a JSON array column; choice
//! tokens are positional, so the stored order is the rendered order.

use super::DbError;
use sqlx::{SqliteConnection, SqlitePool};

/// A published poll.
#[derive(Debug, Clone)]
pub struct Poll {
    pub id: i64,
    pub server_id: i64,
    pub channel_id: i64,
    pub message_id: i64,
    pub author_id: i64,
    pub description: Option<String>,
    pub choices: Vec<String>,
    pub closed: bool,
    pub projection: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub closed_at: Option<i64>,
}

/// Repository for poll operations.
pub struct PollRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PollRepository<'a> {
    /// Create a new poll repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a poll after its message has been published.
    pub async fn create(
        &self,
        server_id: i64,
        channel_id: i64,
        message_id: i64,
        author_id: i64,
        description: Option<&str>,
        choices: &[String],
    ) -> Result<Poll, DbError> {
        let now = chrono::Utc::now().timestamp();
        let choices_json = serde_json::to_string(choices)?;

        let result = sqlx::query(
            r#"
            INSERT INTO polls
                (server_id, channel_id, message_id, author_id, description, choices,
                 closed, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(server_id)
        .bind(channel_id)
        .bind(message_id)
        .bind(author_id)
        .bind(description)
        .bind(&choices_json)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(Poll {
            id: result.last_insert_rowid(),
            server_id,
            channel_id,
            message_id,
            author_id,
            description: description.map(String::from),
            choices: choices.to_vec(),
            closed: false,
            projection: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        })
    }

    /// Find a poll by its rendered message.
    pub async fn find_by_message(
        &self,
        server_id: i64,
        message_id: i64,
    ) -> Result<Option<Poll>, DbError> {
        let row = sqlx::query_as::<_, PollRow>(
            r#"
            SELECT id, server_id, channel_id, message_id, author_id, description, choices,
                   closed, projection, created_at, updated_at, closed_at
            FROM polls
            WHERE server_id = ? AND message_id = ?
            "#,
        )
        .bind(server_id)
        .bind(message_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Poll::try_from).transpose()
    }
}

/// Re-fetch a poll inside an open reconciliation transaction.
pub(crate) async fn fetch_poll_for_update(
    conn: &mut SqliteConnection,
    poll_id: i64,
) -> Result<Option<Poll>, DbError> {
    let row = sqlx::query_as::<_, PollRow>(
        r#"
        SELECT id, server_id, channel_id, message_id, author_id, description, choices,
               closed, projection, created_at, updated_at, closed_at
        FROM polls
        WHERE id = ?
        "#,
    )
    .bind(poll_id)
    .fetch_optional(conn)
    .await?;

    row.map(Poll::try_from).transpose()
}

/// Write the reconciled state of a poll inside an open transaction.
pub(crate) async fn persist_reconciliation(
    conn: &mut SqliteConnection,
    poll_id: i64,
    closed: bool,
    closed_at: Option<i64>,
    projection: &str,
    now: i64,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        UPDATE polls
        SET closed = ?, closed_at = ?, projection = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(closed)
    .bind(closed_at)
    .bind(projection)
    .bind(now)
    .bind(poll_id)
    .execute(conn)
    .await?;

    Ok(())
}

type PollRow = (
    i64,
    i64,
    i64,
    i64,
    i64,
    Option<String>,
    String,
    bool,
    Option<String>,
    i64,
    i64,
    Option<i64>,
);

impl TryFrom<PollRow> for Poll {
    type Error = DbError;

    fn try_from(
        (
            id,
            server_id,
            channel_id,
            message_id,
            author_id,
            description,
            choices_json,
            closed,
            projection,
            created_at,
            updated_at,
            closed_at,
        ): PollRow,
    ) -> Result<Self, DbError> {
        let choices: Vec<String> = serde_json::from_str(&choices_json)?;
        Ok(Poll {
            id,
            server_id,
            channel_id,
            message_id,
            author_id,
            description,
            choices,
            closed,
            projection,
            created_at,
            updated_at,
            closed_at,
        })
    }
}
