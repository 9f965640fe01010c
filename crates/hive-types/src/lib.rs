//! Shared type definitions for the Hive tick engine.
//!
//! This crate is the single source of truth for the world model every
//! other crate in the workspace reads and writes: identifiers, enums,
//! immutable snapshots, typed intents, and sparse patches.
//!
//! # Modules
//!
//! - [`ids`] -- String-backed identifier newtypes and room coordinates
//! - [`enums`] -- Object types, body parts, directions, market enums
//! - [`position`] -- In-room tile coordinates
//! - [`resources`] -- Resource name constants
//! - [`snapshot`] -- Immutable room and global snapshots
//! - [`intents`] -- Typed intent records and indexes
//! - [`patches`] -- Sparse patch types and storage-neutral field changes

pub mod enums;
pub mod ids;
pub mod intents;
pub mod patches;
pub mod position;
pub mod resources;
pub mod snapshot;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

// Re-export all public types at crate root for convenience.
pub use enums::{
    BodyPartType, Direction, MoneyLogType, ObjectType, OrderType, PowerClass, RoomStatus,
    TerrainType,
};
pub use ids::{ObjectId, OrderId, RoomName, UserId};
pub use intents::{
    GlobalUserIntent, IntentArgument, IntentFieldValue, IntentIndex, IntentRecord, ObjectIntent,
    RoomIntentSnapshot,
};
pub use patches::{
    FieldChanges, MarketLogDetails, MarketOrderPatch, MoneyLogEntry, PowerCreepPatch,
    RoomInfoPatch, RoomObjectPatch, UserPatch,
};
pub use position::{Position, ROOM_SIZE};
pub use snapshot::{
    BodyPart, Effect, FlagSnapshot, GlobalMarketSnapshot, GlobalSnapshot, InterRoom,
    MarketOrderSnapshot, PowerCreepSnapshot, PowerLevel, Reservation, RoomInfoSnapshot,
    RoomObjectSnapshot, RoomSnapshot, RoomTerrain, Sign, SpawningState, UserState,
};
