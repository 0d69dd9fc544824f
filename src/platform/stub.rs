//! Scripted in-memory platform for engine and setup tests.
//!
//! Live reaction membership is whatever the test scripted last; every
//! outbound call is recorded so tests can assert exactly what the engine
//! did (and, for idempotence, what it did not do).

use super::{ChatPlatform, MessagePayload, Reactor};
use crate::error::PlatformError;
use crate::tokens::TokenKey;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A recorded role side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleCall {
    Grant { guild: u64, user: u64, role: u64 },
    Revoke { guild: u64, user: u64, role: u64 },
}

/// Test double for [`ChatPlatform`].
pub struct StubPlatform {
    next_message_id: AtomicU64,
    reactors: DashMap<(u64, Vec<u8>), Vec<Reactor>>,
    sent: Mutex<Vec<(u64, u64, MessagePayload)>>,
    edits: Mutex<Vec<(u64, u64, MessagePayload)>>,
    deleted: Mutex<Vec<(u64, u64)>>,
    markers: Mutex<Vec<(u64, TokenKey)>>,
    removed_markers: Mutex<Vec<(u64, TokenKey)>>,
    role_calls: Mutex<Vec<RoleCall>>,
    fail_role_ops: AtomicBool,
    fail_edits: AtomicBool,
}

impl StubPlatform {
    pub fn new() -> Self {
        Self {
            next_message_id: AtomicU64::new(1000),
            reactors: DashMap::new(),
            sent: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            markers: Mutex::new(Vec::new()),
            removed_markers: Mutex::new(Vec::new()),
            role_calls: Mutex::new(Vec::new()),
            fail_role_ops: AtomicBool::new(false),
            fail_edits: AtomicBool::new(false),
        }
    }

    /// Script the live membership for a token on a message.
    pub fn set_reactors(&self, message_id: u64, token: &TokenKey, users: &[(u64, &str)]) {
        let list = users
            .iter()
            .map(|(id, name)| Reactor {
                id: *id,
                display_name: name.to_string(),
            })
            .collect();
        self.reactors
            .insert((message_id, token.as_bytes().to_vec()), list);
    }

    /// Make role operations fail until turned off again.
    pub fn fail_role_ops(&self, fail: bool) {
        self.fail_role_ops.store(fail, Ordering::SeqCst);
    }

    /// Make message edits fail until turned off again.
    pub fn fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    /// Messages sent so far, as (channel, message, payload).
    pub fn sent(&self) -> Vec<(u64, u64, MessagePayload)> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of edits applied to a message.
    pub fn edit_count(&self, message_id: u64) -> usize {
        self.edits
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m, _)| *m == message_id)
            .count()
    }

    /// The last payload a message was edited to.
    pub fn last_edit(&self, message_id: u64) -> Option<MessagePayload> {
        self.edits
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(_, m, _)| *m == message_id)
            .map(|(_, _, p)| p.clone())
    }

    /// Marker tokens seeded on a message, in seeding order.
    pub fn markers_for(&self, message_id: u64) -> Vec<TokenKey> {
        self.markers
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| *m == message_id)
            .map(|(_, t)| t.clone())
            .collect()
    }

    /// Marker tokens the bot removed, as (message, token).
    pub fn removed_markers(&self) -> Vec<(u64, TokenKey)> {
        self.removed_markers.lock().unwrap().clone()
    }

    /// Deleted messages, as (channel, message).
    pub fn deleted(&self) -> Vec<(u64, u64)> {
        self.deleted.lock().unwrap().clone()
    }

    /// Role side effects, in call order.
    pub fn role_calls(&self) -> Vec<RoleCall> {
        self.role_calls.lock().unwrap().clone()
    }
}

impl Default for StubPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatPlatform for StubPlatform {
    async fn send_message(
        &self,
        channel_id: u64,
        payload: &MessagePayload,
    ) -> Result<u64, PlatformError> {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.sent
            .lock()
            .unwrap()
            .push((channel_id, id, payload.clone()));
        Ok(id)
    }

    async fn edit_message(
        &self,
        channel_id: u64,
        message_id: u64,
        payload: &MessagePayload,
    ) -> Result<(), PlatformError> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(PlatformError::Unavailable("edit scripted to fail".into()));
        }
        self.edits
            .lock()
            .unwrap()
            .push((channel_id, message_id, payload.clone()));
        Ok(())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), PlatformError> {
        self.deleted.lock().unwrap().push((channel_id, message_id));
        Ok(())
    }

    async fn add_reaction_markers(
        &self,
        _channel_id: u64,
        message_id: u64,
        tokens: &[TokenKey],
    ) -> Result<(), PlatformError> {
        let mut markers = self.markers.lock().unwrap();
        for token in tokens {
            markers.push((message_id, token.clone()));
        }
        Ok(())
    }

    async fn remove_reaction_marker(
        &self,
        _channel_id: u64,
        message_id: u64,
        token: &TokenKey,
    ) -> Result<(), PlatformError> {
        self.removed_markers
            .lock()
            .unwrap()
            .push((message_id, token.clone()));
        Ok(())
    }

    async fn get_reactors(
        &self,
        _channel_id: u64,
        message_id: u64,
        token: &TokenKey,
    ) -> Result<Vec<Reactor>, PlatformError> {
        Ok(self
            .reactors
            .get(&(message_id, token.as_bytes().to_vec()))
            .map(|r| r.clone())
            .unwrap_or_default())
    }

    async fn grant_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), PlatformError> {
        if self.fail_role_ops.load(Ordering::SeqCst) {
            return Err(PlatformError::Unavailable("role op scripted to fail".into()));
        }
        self.role_calls.lock().unwrap().push(RoleCall::Grant {
            guild: guild_id,
            user: user_id,
            role: role_id,
        });
        Ok(())
    }

    async fn revoke_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), PlatformError> {
        if self.fail_role_ops.load(Ordering::SeqCst) {
            return Err(PlatformError::Unavailable("role op scripted to fail".into()));
        }
        self.role_calls.lock().unwrap().push(RoleCall::Revoke {
            guild: guild_id,
            user: user_id,
            role: role_id,
        });
        Ok(())
    }
}
