//! Intent validation for the Hive tick engine.
//!
//! Validators are small rules that each answer one question about one
//! intent. A [`ValidationPipeline`] runs them in registration order and
//! keeps only the intents that pass every rule, recording outcomes into a
//! shared [`ValidationStatisticsSink`].
//!
//! # Modules
//!
//! - [`result`] -- Error codes and validation outcomes
//! - [`pipeline`] -- Validator trait and the ordered pipeline
//! - [`schema`] -- Intent catalogue and argument shapes
//! - [`room`] -- Standard room validators
//! - [`global`] -- Standard market and power creep validators
//! - [`stats`] -- Lock-protected statistics sink

pub mod global;
pub mod pipeline;
pub mod result;
pub mod room;
pub mod schema;
pub mod stats;

pub use global::{
    GlobalIntentSchemaValidator, MarketFundsValidator, MarketOrderValidator, PowerCreepValidator,
    free_power_levels, intent_fee_millis,
};
pub use pipeline::{IntentSource, IntentValidator, NamedIntent, ValidationPipeline, ValidationRun};
pub use result::{ErrorCode, ValidationResult};
pub use room::{
    ActorValidator, EnergyValidator, IntentSchemaValidator, OwnershipValidator,
    SafeModeValidator, TargetValidator,
};
pub use stats::{ValidationStatistics, ValidationStatisticsSink};

/// Validates the intents of one room snapshot.
pub type RoomValidationPipeline =
    ValidationPipeline<hive_types::ObjectIntent, hive_types::RoomSnapshot>;

/// Validates the global user intents.
pub type GlobalValidationPipeline =
    ValidationPipeline<hive_types::GlobalUserIntent, hive_types::GlobalSnapshot>;
