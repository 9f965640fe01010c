//! Mutation staging and persistence for the Hive tick engine.
//!
//! Steps never write to storage directly. They stage changes in a
//! [`RoomMutationBatch`] (one per room per tick) or the shared
//! [`GlobalMutationBuffer`], read their own pending writes back through
//! [`Pending`], and the [`MutationDispatcher`] lowers the finished batch
//! into one bulk write per document kind.
//!
//! # Modules
//!
//! - [`room`] -- Room batch and the [`RoomMutationWriter`] interface
//! - [`global`] -- Global batch, writer interface and shared buffer
//! - [`overlay`] -- Pending state laid over snapshot documents
//! - [`dispatch`] -- Batch to bulk-write lowering
//! - [`history`] -- Chunked replay history with per-tick diffs
//! - [`error`] -- Error types

pub mod dispatch;
pub mod error;
pub mod global;
pub mod history;
pub mod overlay;
pub mod room;

pub use dispatch::{DispatchSummary, MutationDispatcher};
pub use error::MutationError;
pub use global::{DocumentChanges, GlobalMutationBatch, GlobalMutationBuffer, GlobalMutationWriter};
pub use history::{RoomHistoryRecorder, project_objects};
pub use overlay::{Overlay, Pending};
pub use room::{RoomMutationBatch, RoomMutationWriter};
