//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: hive_core::ConfigError,
    },

    /// A storage backend could not be reached or prepared.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying storage error.
        #[from]
        source: hive_db::DbError,
    },

    /// The driving loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: hive_core::RunnerError,
    },
}
