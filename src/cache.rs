//! Read-through cache of registered servers.
//!
//! Every reaction event starts with a guild lookup; this keeps the hot path
//! off the database. The cache is a convenience, not a correctness
//! mechanism: reconciliation transactions re-read whatever they mutate.

use crate::db::{Database, DbError, ServerRecord};
use dashmap::DashMap;

/// Guild-id keyed cache over the `servers` table.
pub struct ServerCache {
    map: DashMap<i64, ServerRecord>,
}

impl ServerCache {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Cached lookup, falling back to the store and memoizing a hit.
    pub async fn get_or_load(
        &self,
        db: &Database,
        guild_id: i64,
    ) -> Result<Option<ServerRecord>, DbError> {
        if let Some(hit) = self.map.get(&guild_id) {
            return Ok(Some(hit.clone()));
        }

        match db.servers().find_by_guild(guild_id).await? {
            Some(record) => {
                self.map.insert(guild_id, record.clone());
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Memoize a freshly registered server.
    pub fn store(&self, record: &ServerRecord) {
        self.map.insert(record.guild_id, record.clone());
    }
}

impl Default for ServerCache {
    fn default() -> Self {
        Self::new()
    }
}
