//! Room and global processing steps for the Hive tick engine.
//!
//! A tick runs every room's [`RoomProcessor`] in parallel, then one
//! [`GlobalProcessor`] pass. Steps read snapshots and validated intents and
//! stage writes; nothing here touches storage.
//!
//! # Modules
//!
//! - [`room`] -- The ordered room pipeline and its steps (spawning, creep
//!   store actions, harvesting, controllers, towers, links, labs,
//!   factories, power spawns, nukers, movement, decay and the event log)
//! - [`global`] -- Market orders, power creeps, inter-room transit and
//!   power bank decay
//! - [`context`] -- [`RoomProcessorContext`]: overlay reads, staged writes
//!   and shared effects such as creep death and structure destruction
//! - [`activation`] -- Which structures count as active at the room's
//!   controller level
//! - [`energy`] -- Energy draws across spawns and extensions
//! - [`pathfinder`] -- The [`PathFinder`] interface and its grid search
//! - [`events`] -- Room event log entries
//! - [`stats`] -- Per-user statistics counters
//! - [`notify`] -- Player notifications
//! - [`error`] -- Error types

pub mod activation;
pub mod context;
pub mod energy;
pub mod error;
pub mod events;
pub mod global;
pub mod notify;
pub mod pathfinder;
pub mod room;
pub mod stats;

pub use activation::ActiveStructures;
pub use context::{RoomProcessorContext, RoomServices, body_for_hits, creep_lifetime};
pub use energy::{EnergyAllocator, EnergyPlan};
pub use error::{PathFinderError, ProcessorError};
pub use events::RoomEvent;
pub use global::{GlobalProcessor, GlobalProcessorContext, GlobalProcessorStep};
pub use notify::{Notification, NotificationBuffer, NotificationSink};
pub use pathfinder::{GridPathFinder, PathFinder};
pub use room::{RoomProcessor, RoomProcessorStep};
pub use stats::{ProcessorStatistics, ProcessorStatsSink};
