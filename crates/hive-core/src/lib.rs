//! Configuration, operator controls and tick orchestration for the Hive
//! tick engine.
//!
//! This crate wires snapshots, validation, processing and mutation
//! dispatch into the tick that drives the world forward.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `hive-config.yaml` into
//!   strongly-typed structs.
//! - [`events`] -- Broadcast bus for loop-stage events.
//! - [`operator`] -- Pause, resume, speed and stop controls.
//! - [`runner`] -- The driving loop around [`TickEngine::run_tick`].
//! - [`tick`] -- One tick: every room in parallel, then the global pass.

pub mod config;
pub mod events;
pub mod operator;
pub mod runner;
pub mod tick;

pub use config::{ConfigError, EngineConfig};
pub use events::{EngineEvent, EventBus, Subscription};
pub use operator::{EngineStatus, EngineStopReason, OperatorState};
pub use runner::{
    EngineRunResult, NoOpListener, RunnerError, TickListener, log_engine_end, run_engine,
    seed_environment,
};
pub use tick::{RoomOutcome, TickEngine, TickEngineOptions, TickError, TickSummary};
