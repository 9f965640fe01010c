//! Persistence layer for the Hive tick engine.
//!
//! The tick engine talks to storage only through the traits in [`store`].
//! Writes are staged per document kind in a [`BulkWriter`], which folds
//! every logical operation on one document into a single physical write.
//!
//! # Architecture
//!
//! ```text
//! Tick Execution
//!     |
//!     +-- Snapshot reads ------> WorldDataSource  (Memory | Dragonfly)
//!     |
//!     +-- Mutation flush ------> BulkWriter -> DocumentStore
//!     |                          SideChannelStore (event log, map view)
//!     |
//!     +-- History listener ----> HistoryStore     (Memory | PostgreSQL)
//! ```
//!
//! # Modules
//!
//! - [`document`] -- Document kinds and combined update operations
//! - [`bulk`] -- Per-kind bulk writer and flushed batches
//! - [`store`] -- Persistence traits and raw document bundles
//! - [`memory`] -- In-memory implementation of every trait
//! - [`dragonfly`] -- `Dragonfly` hot world store
//! - [`postgres`] -- `PostgreSQL` connection pool
//! - [`history_store`] -- `PostgreSQL` history and side-channel archive
//! - [`error`] -- Shared error types

pub mod bulk;
pub mod document;
pub mod dragonfly;
pub mod error;
pub mod history_store;
pub mod memory;
pub mod postgres;
pub mod store;

// Re-export primary types for convenience.
pub use bulk::{BulkBatch, BulkOperation, BulkWriter};
pub use document::{DocumentKind, DocumentUpdate};
pub use dragonfly::DragonflyStore;
pub use error::DbError;
pub use history_store::PostgresHistoryStore;
pub use memory::MemoryStore;
pub use postgres::{PostgresConfig, PostgresPool};
pub use store::{
    DocumentStore, EnvKey, EnvironmentStore, GlobalDocuments, HistoryChunk, HistoryStore,
    IntentStore, RoomDocuments, SideChannelStore, WorldDataSource, WorldStore,
};
