//! Room step pipeline.
//!
//! Every room runs the same fixed sequence of steps. Each step reads the
//! snapshot plus everything earlier steps staged, and stages its own
//! writes through the context. A failing step aborts the room's tick with
//! the step name attached.

pub mod controller;
pub mod creep_store;
pub mod event_log;
pub mod harvest;
pub mod movement;
pub mod spawn;
pub mod structures;
pub mod tower;
pub mod upkeep;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::BTreeSet;

use hive_blueprints::constants::LAB_MINERAL_CAPACITY;
use hive_types::resources::ENERGY;
use hive_types::{ObjectIntent, ObjectType, Position, RoomObjectSnapshot, UserId};

use crate::context::RoomProcessorContext;
use crate::error::ProcessorError;

/// One stage of room processing.
pub trait RoomProcessorStep: Send + Sync {
    /// Stable step name, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Process the room.
    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError>;
}

/// Ordered list of room steps.
pub struct RoomProcessor {
    steps: Vec<Box<dyn RoomProcessorStep>>,
}

impl RoomProcessor {
    /// The standard pipeline.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(spawn::SpawnIntentsStep),
            Box::new(creep_store::CreepStoreStep),
            Box::new(harvest::HarvestStep),
            Box::new(controller::UpgradeControllerStep),
            Box::new(structures::LinkStep),
            Box::new(tower::TowerStep),
            Box::new(structures::LabStep),
            Box::new(structures::FactoryStep),
            Box::new(structures::PowerSpawnStep),
            Box::new(structures::NukerStep),
            Box::new(movement::MovementStep),
            Box::new(spawn::SpawningStep),
            Box::new(upkeep::SourceRegenerationStep),
            Box::new(controller::ControllerStep),
            Box::new(upkeep::DecayStep),
            Box::new(event_log::EventLogStep),
        ])
    }

    /// A pipeline running `steps` in the given order.
    pub fn new(steps: Vec<Box<dyn RoomProcessorStep>>) -> Self {
        Self { steps }
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step over one room.
    pub fn process(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        for step in &self.steps {
            tracing::trace!(
                room = %ctx.room(),
                tick = ctx.game_time(),
                step = step.name(),
                "Running room step"
            );
            if let Err(source) = step.run(ctx) {
                tracing::error!(
                    room = %ctx.room(),
                    tick = ctx.game_time(),
                    step = step.name(),
                    error = %source,
                    "Room step failed"
                );
                return Err(ProcessorError::Step {
                    step: step.name(),
                    source: Box::new(source),
                });
            }
        }
        Ok(())
    }
}

impl Default for RoomProcessor {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by several steps
// ---------------------------------------------------------------------------

/// The acting creep of `intent`, when it still exists, is a creep and has
/// left its spawn.
pub(crate) fn acting_creep(
    ctx: &RoomProcessorContext<'_>,
    intent: &ObjectIntent,
) -> Result<Option<RoomObjectSnapshot>, ProcessorError> {
    Ok(ctx.object(&intent.object_id)?.filter(|o| {
        o.object_type == ObjectType::Creep
            && o.spawning != Some(true)
            && o.is_owned_by(&intent.user)
    }))
}

/// The acting structure of `intent` of `object_type`, when it exists, is
/// owned by the issuer and passes the activation rule.
pub(crate) fn acting_structure(
    ctx: &RoomProcessorContext<'_>,
    intent: &ObjectIntent,
    object_type: ObjectType,
) -> Result<Option<RoomObjectSnapshot>, ProcessorError> {
    Ok(ctx.object(&intent.object_id)?.filter(|o| {
        o.object_type == object_type && o.is_owned_by(&intent.user) && ctx.is_active(o)
    }))
}

/// The non-energy resource a lab holds, if any.
pub(crate) fn lab_mineral(lab: &RoomObjectSnapshot) -> Option<(&str, i64)> {
    lab.store
        .iter()
        .find(|(resource, amount)| resource.as_str() != ENERGY && **amount > 0)
        .map(|(resource, amount)| (resource.as_str(), *amount))
}

/// Free space `target` has for `resource`.
///
/// Labs take a single mineral up to their mineral capacity on top of their
/// energy store.
pub(crate) fn free_capacity(target: &RoomObjectSnapshot, resource: &str) -> i64 {
    if target.object_type == ObjectType::Lab && resource != ENERGY {
        return match lab_mineral(target) {
            Some((held, amount)) if held == resource => {
                LAB_MINERAL_CAPACITY.saturating_sub(amount).max(0)
            }
            Some(_) => 0,
            None => LAB_MINERAL_CAPACITY,
        };
    }
    target.store_free_capacity(resource)
}

/// Tiles no creep of `user` may enter: obstacle structures and ramparts
/// that are neither public nor the user's own.
pub(crate) fn obstacle_tiles(
    objects: &[RoomObjectSnapshot],
    user: Option<&UserId>,
) -> BTreeSet<Position> {
    objects
        .iter()
        .filter(|o| {
            o.object_type.is_obstacle()
                || (o.object_type == ObjectType::Rampart
                    && o.is_public != Some(true)
                    && o.user.as_ref() != user)
        })
        .map(RoomObjectSnapshot::position)
        .collect()
}

/// Tiles taken by creeps and power creeps.
pub(crate) fn creep_tiles(objects: &[RoomObjectSnapshot]) -> BTreeSet<Position> {
    objects
        .iter()
        .filter(|o| matches!(o.object_type, ObjectType::Creep | ObjectType::PowerCreep))
        .map(RoomObjectSnapshot::position)
        .collect()
}
