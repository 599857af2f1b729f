// src/store/postgres.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};
use tokio::sync::broadcast;

use super::{RoomDefaults, RoomStore, hub::RoomHub};
use crate::{
    error::AppError,
    models::{
        question::QuestionRecord,
        room::{RoomPatch, RoomState},
    },
};

/// Rows per INSERT statement when replacing the pool.
const POOL_INSERT_CHUNK: usize = 500;

/// Helper struct for reading a room row.
#[derive(sqlx::FromRow)]
struct RoomRow {
    state: Json<RoomState>,
    version: i64,
}

impl RoomRow {
    fn into_state(self) -> RoomState {
        let mut state = self.state.0;
        state.version = self.version as u64;
        state
    }
}

/// PostgreSQL-backed store. Room documents live in `rooms.state` (JSONB);
/// a patch is merged with the `||` operator, so disjoint fields never clobber
/// each other, and `rooms.version` provides the compare-and-set.
pub struct PgStore {
    pool: PgPool,
    defaults: RoomDefaults,
    hub: RoomHub,
}

impl PgStore {
    pub fn new(pool: PgPool, defaults: RoomDefaults, events_capacity: usize) -> Self {
        Self {
            pool,
            defaults,
            hub: RoomHub::new(events_capacity),
        }
    }

    /// Inserts the default document for `room`. Returns whether a row was created.
    async fn ensure_room(&self, room: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO rooms (id, state, version)
            VALUES ($1, $2, 0)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(room)
        .bind(Json(self.defaults.new_room()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create room {}: {:?}", room, e);
            AppError::InternalServerError(e.to_string())
        })?;
        Ok(result.rows_affected() == 1)
    }

    async fn try_write(
        &self,
        room: &str,
        patch: &RoomPatch,
        expected_version: Option<u64>,
    ) -> Result<Option<RoomRow>, AppError> {
        sqlx::query_as::<_, RoomRow>(
            r#"
            UPDATE rooms
            SET state = state || $2::JSONB,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
              AND ($3::BIGINT IS NULL OR version = $3)
            RETURNING state, version
            "#,
        )
        .bind(room)
        .bind(Json(patch))
        .bind(expected_version.map(|v| v as i64))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to write room {}: {:?}", room, e);
            AppError::InternalServerError(e.to_string())
        })
    }
}

#[async_trait]
impl RoomStore for PgStore {
    async fn load(&self, room: &str) -> Result<RoomState, AppError> {
        let row = sqlx::query_as::<_, RoomRow>("SELECT state, version FROM rooms WHERE id = $1")
            .bind(room)
            .fetch_optional(&self.pool)
            .await?;

        // Unknown rooms read as fresh ones; the row appears with the first write.
        Ok(row.map_or_else(|| self.defaults.new_room(), RoomRow::into_state))
    }

    async fn write(
        &self,
        room: &str,
        mut patch: RoomPatch,
        expected_version: Option<u64>,
    ) -> Result<RoomState, AppError> {
        patch.updated_at = Some(Utc::now());

        let mut row = self.try_write(room, &patch, expected_version).await?;
        if row.is_none() && self.ensure_room(room).await? {
            row = self.try_write(room, &patch, expected_version).await?;
        }
        let row = row.ok_or_else(|| AppError::VersionConflict(room.to_string()))?;

        let snapshot = row.into_state();
        self.hub.publish(room, &snapshot);
        Ok(snapshot)
    }

    fn subscribe(&self, room: &str) -> broadcast::Receiver<RoomState> {
        self.hub.subscribe(room)
    }

    async fn read_pool(&self) -> Result<Vec<QuestionRecord>, AppError> {
        let records = sqlx::query_as::<_, QuestionRecord>(
            "SELECT id, term, book, category, keywords FROM question_pool ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch question pool: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(records)
    }

    async fn replace_pool(&self, records: Vec<QuestionRecord>) -> Result<usize, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        sqlx::query("DELETE FROM question_pool")
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        for chunk in records.chunks(POOL_INSERT_CHUNK) {
            let mut query_builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO question_pool (id, term, book, category, keywords) ",
            );
            query_builder.push_values(chunk, |mut row, q| {
                row.push_bind(q.id)
                    .push_bind(&q.term)
                    .push_bind(&q.book)
                    .push_bind(&q.category)
                    .push_bind(&q.keywords);
            });
            query_builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to insert question pool rows: {:?}", e);
                    AppError::InternalServerError(e.to_string())
                })?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(records.len())
    }
}
