//! Error types for the `hive-snapshot` crate.

use hive_db::{DbError, DocumentKind};
use hive_types::{ObjectId, RoomName};

/// Errors raised while building a snapshot.
///
/// Every variant is fatal for the partition being built: the provider
/// leaves its cache slot empty and the tick for that partition aborts.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The backing store failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// A room object document could not be deserialized.
    #[error("malformed object {object_id} in room {room} at tick {tick}: {reason}")]
    MalformedObject {
        /// Room being built.
        room: RoomName,
        /// Tick being built.
        tick: u64,
        /// Offending object.
        object_id: ObjectId,
        /// Deserializer message.
        reason: String,
    },

    /// Any other document could not be deserialized.
    #[error("malformed {kind} document {id} at tick {tick}: {reason}")]
    MalformedDocument {
        /// Document collection.
        kind: DocumentKind,
        /// Document id, or `<missing>`.
        id: String,
        /// Tick being built.
        tick: u64,
        /// Deserializer message.
        reason: String,
    },

    /// The stored terrain string is not a 50x50 grid.
    #[error("invalid terrain for room {room}")]
    InvalidTerrain {
        /// Room being built.
        room: RoomName,
    },
}
