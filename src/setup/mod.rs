//! Administrative operations: registration, record creation, bindings.
//!
//! Every operation here runs on behalf of an explicit command and reports
//! failures back to the caller. Platform sends a record depends on happen
//! before the row is written and fail the operation; visual refreshes after
//! the row is committed are best-effort and only warn.

mod panel;
mod poll;
mod recruit;
mod server;

use crate::cache::ServerCache;
use crate::db::{Database, ServerRecord};
use crate::error::{SetupError, SetupResult};
use crate::platform::ChatPlatform;
use std::sync::Arc;

/// Administrative operations over the record store and the platform.
/// Cheap to clone; shared with the gateway command handler.
#[derive(Clone)]
pub struct Setup {
    db: Database,
    platform: Arc<dyn ChatPlatform>,
    servers: Arc<ServerCache>,
}

impl Setup {
    pub fn new(db: Database, platform: Arc<dyn ChatPlatform>, servers: Arc<ServerCache>) -> Self {
        Self {
            db,
            platform,
            servers,
        }
    }

    /// Resolve a guild to its server record or reject the operation.
    async fn require_server(&self, guild_id: u64) -> SetupResult<ServerRecord> {
        self.servers
            .get_or_load(&self.db, guild_id as i64)
            .await?
            .ok_or(SetupError::NotRegistered(guild_id as i64))
    }
}
