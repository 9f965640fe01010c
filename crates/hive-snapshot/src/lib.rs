//! Immutable per-tick snapshots for the Hive tick engine.
//!
//! A snapshot is everything one partition (a room, or the global pass)
//! reads during a tick. Builders assemble snapshots from raw documents;
//! providers cache them per key and game time and rebuild after
//! invalidation.
//!
//! # Modules
//!
//! - [`provider`] -- Generic cached provider and the builder trait
//! - [`room`] -- Room snapshot builder
//! - [`global`] -- Global snapshot builder
//! - [`typing`] -- Raw intent JSON to typed intent records
//! - [`error`] -- Snapshot build errors

pub mod error;
pub mod global;
pub mod provider;
pub mod room;
pub mod typing;

pub use error::SnapshotError;
pub use global::{GlobalSnapshotBuilder, assemble_global};
pub use provider::{SnapshotBuilder, SnapshotProvider};
pub use room::{RoomSnapshotBuilder, assemble_room};
pub use typing::{type_room_intents, type_user_intents};

/// Cached room snapshots keyed by room name.
pub type RoomSnapshotProvider<S> = SnapshotProvider<RoomSnapshotBuilder<S>>;

/// Cached global snapshot, one per game time.
pub type GlobalSnapshotProvider<S> = SnapshotProvider<GlobalSnapshotBuilder<S>>;
