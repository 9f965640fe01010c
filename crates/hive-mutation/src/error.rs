//! Error types for mutation dispatch and history recording.

use hive_db::DbError;

/// Errors raised while lowering or persisting mutation batches.
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// The persistence layer rejected a write.
    #[error("storage error: {0}")]
    Db(#[from] DbError),

    /// A staged document could not be converted to or from JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
