// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock, broadcast};

use super::{RoomDefaults, RoomStore, hub::RoomHub};
use crate::{
    error::AppError,
    models::{
        question::QuestionRecord,
        room::{RoomPatch, RoomState},
    },
};

/// Process-local store. Used when no `DATABASE_URL` is configured and in tests.
pub struct MemoryStore {
    defaults: RoomDefaults,
    rooms: Mutex<HashMap<String, RoomState>>,
    pool: RwLock<Vec<QuestionRecord>>,
    hub: RoomHub,
}

impl MemoryStore {
    pub fn new(defaults: RoomDefaults, events_capacity: usize) -> Self {
        Self {
            defaults,
            rooms: Mutex::new(HashMap::new()),
            pool: RwLock::new(Vec::new()),
            hub: RoomHub::new(events_capacity),
        }
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn load(&self, room: &str) -> Result<RoomState, AppError> {
        let rooms = self.rooms.lock().await;
        Ok(rooms
            .get(room)
            .cloned()
            .unwrap_or_else(|| self.defaults.new_room()))
    }

    async fn write(
        &self,
        room: &str,
        mut patch: RoomPatch,
        expected_version: Option<u64>,
    ) -> Result<RoomState, AppError> {
        let mut rooms = self.rooms.lock().await;
        let state = rooms
            .entry(room.to_string())
            .or_insert_with(|| self.defaults.new_room());

        if expected_version.is_some_and(|v| v != state.version) {
            return Err(AppError::VersionConflict(room.to_string()));
        }

        patch.updated_at = Some(Utc::now());
        patch.merge_into(state);
        state.version += 1;
        let snapshot = state.clone();

        // Published under the lock so subscribers see commits in version order.
        self.hub.publish(room, &snapshot);
        Ok(snapshot)
    }

    fn subscribe(&self, room: &str) -> broadcast::Receiver<RoomState> {
        self.hub.subscribe(room)
    }

    async fn read_pool(&self) -> Result<Vec<QuestionRecord>, AppError> {
        Ok(self.pool.read().await.clone())
    }

    async fn replace_pool(&self, records: Vec<QuestionRecord>) -> Result<usize, AppError> {
        let count = records.len();
        *self.pool.write().await = records;
        Ok(count)
    }
}
