//! `PostgreSQL` archive of room history chunks and side-channel payloads.
//!
//! Tables (see `migrations/`):
//!
//! - `room_history` -- one row per `(room, base_tick)` chunk
//! - `room_event_logs` -- one row per `(room, tick)` event log
//! - `room_map_views` -- latest map view per room

use chrono::{DateTime, Utc};
use hive_types::RoomName;
use serde_json::Value;
use sqlx::PgPool;

use crate::error::DbError;
use crate::store::{HistoryChunk, HistoryStore, SideChannelStore};

fn tick_to_db(tick: u64) -> i64 {
    i64::try_from(tick).unwrap_or(i64::MAX)
}

/// History and side-channel persistence backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PostgresHistoryStore {
    pool: PgPool,
}

impl PostgresHistoryStore {
    /// Bind to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read back one history chunk.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::KeyNotFound`] if no chunk exists.
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn load_history_chunk(&self, room: &RoomName, base: u64) -> Result<HistoryChunk, DbError> {
        let row: Option<(Value,)> = sqlx::query_as(
            r"SELECT data FROM room_history WHERE room = $1 AND base_tick = $2",
        )
        .bind(room.as_str())
        .bind(tick_to_db(base))
        .fetch_optional(&self.pool)
        .await?;

        let (data,) = row.ok_or_else(|| DbError::KeyNotFound(format!("history:{room}:{base}")))?;
        Ok(serde_json::from_value(data)?)
    }
}

impl HistoryStore for PostgresHistoryStore {
    async fn save_history_chunk(&self, chunk: HistoryChunk) -> Result<(), DbError> {
        let recorded_at = DateTime::<Utc>::from_timestamp_millis(chunk.timestamp).unwrap_or_default();
        let room = chunk.room.clone();
        let base = chunk.base;
        let data = serde_json::to_value(&chunk)?;

        sqlx::query(
            r"INSERT INTO room_history (room, base_tick, recorded_at, data)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (room, base_tick) DO UPDATE SET
                recorded_at = EXCLUDED.recorded_at,
                data = EXCLUDED.data",
        )
        .bind(room.as_str())
        .bind(tick_to_db(base))
        .bind(recorded_at)
        .bind(data)
        .execute(&self.pool)
        .await?;

        tracing::debug!(room = %room, base, "Saved history chunk");
        Ok(())
    }
}

impl SideChannelStore for PostgresHistoryStore {
    async fn save_event_log(&self, room: &RoomName, tick: u64, payload: Value) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO room_event_logs (room, tick, data)
              VALUES ($1, $2, $3)
              ON CONFLICT (room, tick) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(room.as_str())
        .bind(tick_to_db(tick))
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_map_view(&self, room: &RoomName, tick: u64, payload: Value) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO room_map_views (room, tick, data)
              VALUES ($1, $2, $3)
              ON CONFLICT (room) DO UPDATE SET
                tick = EXCLUDED.tick,
                data = EXCLUDED.data",
        )
        .bind(room.as_str())
        .bind(tick_to_db(tick))
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
