//! Guild registration.

use super::Setup;
use crate::db::ServerRecord;
use crate::error::SetupResult;
use tracing::info;

impl Setup {
    /// Register a guild so the engine starts tracking its records.
    ///
    /// Registering twice is rejected; every other operation requires the
    /// guild to be registered first.
    pub async fn register_server(&self, guild_id: u64) -> SetupResult<ServerRecord> {
        let record = self.db.servers().register(guild_id as i64).await?;
        self.servers.store(&record);
        info!(guild = guild_id, server = record.id, "Server registered");
        Ok(record)
    }
}
