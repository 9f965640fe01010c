//! Persistence collaborator interfaces.
//!
//! The tick engine depends only on these traits, never on a storage
//! engine's query language. Implementations:
//!
//! | Trait | [`MemoryStore`] | [`DragonflyStore`] | [`PostgresHistoryStore`] |
//! |-------|:---:|:---:|:---:|
//! | [`DocumentStore`] | x | x | |
//! | [`WorldDataSource`] | x | x | |
//! | [`IntentStore`] | x | x | |
//! | [`SideChannelStore`] | x | x | x |
//! | [`HistoryStore`] | x | | x |
//! | [`EnvironmentStore`] | x | x | |
//!
//! [`MemoryStore`]: crate::memory::MemoryStore
//! [`DragonflyStore`]: crate::dragonfly::DragonflyStore
//! [`PostgresHistoryStore`]: crate::history_store::PostgresHistoryStore

use std::collections::BTreeMap;
use std::future::Future;

use hive_types::RoomName;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bulk::BulkBatch;
use crate::error::DbError;

// ---------------------------------------------------------------------------
// Raw documents
// ---------------------------------------------------------------------------

/// Raw documents of one room, as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomDocuments {
    /// Room metadata document.
    pub room_info: Option<Value>,
    /// Object documents.
    pub objects: Vec<Value>,
    /// Documents of users owning objects in the room.
    pub users: Vec<Value>,
    /// Encoded terrain string.
    pub terrain: Option<String>,
    /// Flag documents.
    pub flags: Vec<Value>,
    /// Power creeps spawned in the room.
    pub power_creeps: Vec<Value>,
    /// Raw intents submitted for the room.
    pub intents: Option<Value>,
}

/// Raw documents read by the global pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalDocuments {
    /// Objects with a pending `interRoom` move.
    pub inter_room_creeps: Vec<Value>,
    /// All room metadata documents.
    pub rooms: Vec<Value>,
    /// Power banks and other globally processed objects.
    pub special_objects: Vec<Value>,
    /// Market orders.
    pub orders: Vec<Value>,
    /// Users.
    pub users: Vec<Value>,
    /// Power creeps.
    pub power_creeps: Vec<Value>,
    /// Raw global user intents.
    pub user_intents: Option<Value>,
}

/// A completed history chunk of one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryChunk {
    /// Room the chunk belongs to.
    pub room: RoomName,
    /// First tick of the chunk.
    pub base: u64,
    /// Wall-clock time the chunk was closed, epoch ms.
    pub timestamp: i64,
    /// Per-tick payloads: full state at `base`, diffs afterwards.
    pub ticks: BTreeMap<u64, Value>,
}

// ---------------------------------------------------------------------------
// Environment keys
// ---------------------------------------------------------------------------

/// Well-known environment keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvKey {
    /// Current game time.
    GameTime,
    /// Pause flag for the driving loop.
    MainLoopPaused,
    /// Duration of the last tick in ms.
    TickDuration,
    /// CPU limit per tick.
    CpuMaxPerTick,
    /// CPU bucket size.
    CpuBucketSize,
}

impl EnvKey {
    /// Stored key name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GameTime => "gameTime",
            Self::MainLoopPaused => "mainLoopPaused",
            Self::TickDuration => "tickDuration",
            Self::CpuMaxPerTick => "cpuMaxPerTick",
            Self::CpuBucketSize => "cpuBucketSize",
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Applies flushed bulk batches.
pub trait DocumentStore: Send + Sync {
    /// Execute every operation of `batch`.
    fn apply_bulk(&self, batch: BulkBatch) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// Reads the documents snapshot builders assemble.
pub trait WorldDataSource: Send + Sync {
    /// Load everything stored for `room`.
    fn load_room(
        &self,
        room: &RoomName,
    ) -> impl Future<Output = Result<RoomDocuments, DbError>> + Send;

    /// Load the cross-room documents.
    fn load_global(&self) -> impl Future<Output = Result<GlobalDocuments, DbError>> + Send;

    /// Rooms to process this tick, sorted.
    fn list_active_rooms(&self) -> impl Future<Output = Result<Vec<RoomName>, DbError>> + Send;
}

/// Stores and clears raw intent payloads.
pub trait IntentStore: Send + Sync {
    /// Replace the raw intents of `room`.
    fn save_room_intents(
        &self,
        room: &RoomName,
        intents: Value,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Replace the raw global user intents.
    fn save_user_intents(&self, intents: Value) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Drop the processed intents of `room`.
    fn clear_room_intents(&self, room: &RoomName)
    -> impl Future<Output = Result<(), DbError>> + Send;

    /// Drop the processed global intents.
    fn clear_user_intents(&self) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// Persists side-channel payloads tagged with room and tick.
pub trait SideChannelStore: Send + Sync {
    /// Store the event log of `room` at `tick`.
    fn save_event_log(
        &self,
        room: &RoomName,
        tick: u64,
        payload: Value,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Store the map view of `room` at `tick`.
    fn save_map_view(
        &self,
        room: &RoomName,
        tick: u64,
        payload: Value,
    ) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// Persists completed history chunks.
pub trait HistoryStore: Send + Sync {
    /// Store one chunk.
    fn save_history_chunk(
        &self,
        chunk: HistoryChunk,
    ) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// Simple key-value environment settings.
pub trait EnvironmentStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: EnvKey) -> impl Future<Output = Result<Option<String>, DbError>> + Send;

    /// Write a value.
    fn set(&self, key: EnvKey, value: String) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// Everything the tick engine needs from one backing store.
pub trait WorldStore:
    DocumentStore + WorldDataSource + IntentStore + SideChannelStore + EnvironmentStore
{
}

impl<T> WorldStore for T where
    T: DocumentStore + WorldDataSource + IntentStore + SideChannelStore + EnvironmentStore
{
}
