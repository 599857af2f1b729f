// src/store/mod.rs

pub mod hub;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{
    error::AppError,
    models::{
        question::QuestionRecord,
        room::{GameMode, RoomPatch, RoomState},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Values used when a room is first accessed.
#[derive(Debug, Clone, Copy)]
pub struct RoomDefaults {
    pub mode: GameMode,
    pub time_per_round: u32,
}

impl RoomDefaults {
    pub fn new_room(&self) -> RoomState {
        RoomState::new(self.mode, self.time_per_round)
    }
}

/// Shared room document plus the read-only question pool.
///
/// `write` merges only the fields present in the patch. With
/// `expected_version` it becomes a compare-and-set that fails with
/// `AppError::VersionConflict` when another writer got there first.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Current snapshot. An unknown room reads as a fresh one (version 0);
    /// it is only stored once something is written to it.
    async fn load(&self, room: &str) -> Result<RoomState, AppError>;

    async fn write(
        &self,
        room: &str,
        patch: RoomPatch,
        expected_version: Option<u64>,
    ) -> Result<RoomState, AppError>;

    /// Every committed snapshot of `room`, starting after the call.
    fn subscribe(&self, room: &str) -> broadcast::Receiver<RoomState>;

    async fn read_pool(&self) -> Result<Vec<QuestionRecord>, AppError>;

    /// Replaces the pool wholesale. Returns the new record count.
    async fn replace_pool(&self, records: Vec<QuestionRecord>) -> Result<usize, AppError>;
}

/// Read-modify-write with optimistic retry.
///
/// `update` runs against a copy of the latest snapshot and must be
/// repeatable, since it runs again after a lost race. Only the fields it
/// changed are written. Returns whether it applied and the resulting snapshot.
pub async fn transact<F>(
    store: &dyn RoomStore,
    room: &str,
    max_retries: u32,
    mut update: F,
) -> Result<(bool, RoomState), AppError>
where
    F: FnMut(&mut RoomState) -> Result<bool, AppError> + Send,
{
    let mut attempt = 0;
    loop {
        let current = store.load(room).await?;
        let mut next = current.clone();
        if !update(&mut next)? {
            return Ok((false, current));
        }

        let patch = RoomPatch::diff(&current, &next);
        if patch.is_empty() {
            return Ok((true, current));
        }

        match store.write(room, patch, Some(current.version)).await {
            Ok(committed) => return Ok((true, committed)),
            Err(AppError::VersionConflict(_)) if attempt < max_retries => {
                attempt += 1;
                tracing::debug!("Room {} write raced (attempt {}), retrying", room, attempt);
            }
            Err(e) => {
                if matches!(e, AppError::VersionConflict(_)) {
                    tracing::warn!("Room {} still contended after {} retries", room, attempt);
                }
                return Err(e);
            }
        }
    }
}
