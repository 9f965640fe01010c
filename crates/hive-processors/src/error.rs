//! Error types for the processing steps.

use hive_types::RoomName;

/// Pathfinding failures. An incomplete path is not an error.
#[derive(Debug, thiserror::Error)]
pub enum PathFinderError {
    /// No terrain is loaded for the room the search starts in.
    #[error("pathfinding unavailable: no terrain for room {room}")]
    Unavailable {
        /// Origin room.
        room: RoomName,
    },
}

/// Errors that abort processing of the current partition.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// Overlaying pending writes onto snapshot state failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Pathfinding could not run.
    #[error("pathfinding error: {0}")]
    PathFinder(#[from] PathFinderError),

    /// A step failed; wraps the cause with the step name.
    #[error("step {step} failed: {source}")]
    Step {
        /// Step name.
        step: &'static str,
        /// Underlying failure.
        source: Box<ProcessorError>,
    },
}
