//! End-of-tick upkeep: source regeneration and decay.

use hive_blueprints::blueprint::blueprint;
use hive_blueprints::constants::{
    CONTAINER_DECAY_TIME_OWNED, ENERGY_DECAY, SOURCE_ENERGY_CAPACITY,
    SOURCE_ENERGY_NEUTRAL_CAPACITY,
};
use hive_types::{ObjectId, ObjectType, RoomObjectPatch, RoomObjectSnapshot};

use super::RoomProcessorStep;
use crate::context::RoomProcessorContext;
use crate::error::ProcessorError;
use crate::stats;

/// Refills sources whose regeneration time has come.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceRegenerationStep;

impl RoomProcessorStep for SourceRegenerationStep {
    fn name(&self) -> &'static str {
        "source-regeneration"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        let capacity = match ctx.snapshot().controller() {
            Some(c) if c.user.is_none() && c.reservation.is_none() => {
                SOURCE_ENERGY_NEUTRAL_CAPACITY
            }
            _ => SOURCE_ENERGY_CAPACITY,
        };
        let game_time = ctx.game_time();
        for source in ctx.objects_of_type(ObjectType::Source)? {
            let mut patch = RoomObjectPatch::default();
            if source.energy_capacity != Some(capacity) {
                patch.energy_capacity = Some(capacity);
            }
            if source.next_regeneration_time.is_some_and(|t| t <= game_time) {
                patch.energy = Some(capacity);
                patch.next_regeneration_time = Some(None);
            }
            if patch.has_changes() {
                ctx.patch(&source.id, patch);
            }
        }
        Ok(())
    }
}

/// Wears down roads, containers and ramparts, clears out expired
/// tombstones and ruins, evaporates dropped resources and retires creeps
/// at the end of their life.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecayStep;

impl RoomProcessorStep for DecayStep {
    fn name(&self) -> &'static str {
        "decay"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        let owned_room = ctx
            .snapshot()
            .controller()
            .is_some_and(|c| c.user.is_some());
        let ids: Vec<ObjectId> = ctx.snapshot().objects.keys().cloned().collect();
        for id in ids {
            // Earlier decay in this pass may already have removed it.
            let Some(object) = ctx.object(&id)? else {
                continue;
            };
            match object.object_type {
                ObjectType::Road | ObjectType::Container | ObjectType::Rampart => {
                    wear(ctx, &object, owned_room);
                }
                ObjectType::Tombstone | ObjectType::Ruin => expire_remains(ctx, &object)?,
                ObjectType::Resource => evaporate(ctx, &object),
                ObjectType::Creep => retire_creep(ctx, &object),
                _ => {}
            }
        }
        Ok(())
    }
}

fn wear(ctx: &mut RoomProcessorContext<'_>, structure: &RoomObjectSnapshot, owned_room: bool) {
    let Some(decay) = blueprint(structure.object_type).decay else {
        return;
    };
    let interval = if structure.object_type == ObjectType::Container && owned_room {
        CONTAINER_DECAY_TIME_OWNED
    } else {
        decay.interval
    };
    let game_time = ctx.game_time();
    match structure.next_decay_time {
        None => ctx.patch(
            &structure.id,
            RoomObjectPatch {
                next_decay_time: Some(game_time.saturating_add(interval)),
                ..RoomObjectPatch::default()
            },
        ),
        Some(due) if due <= game_time => {
            let hits = structure.hits.unwrap_or(0).saturating_sub(decay.amount);
            if hits <= 0 {
                ctx.destroy_structure(structure);
            } else {
                ctx.patch(
                    &structure.id,
                    RoomObjectPatch {
                        hits: Some(hits),
                        next_decay_time: Some(game_time.saturating_add(interval)),
                        ..RoomObjectPatch::default()
                    },
                );
            }
        }
        Some(_) => {}
    }
}

fn expire_remains(
    ctx: &mut RoomProcessorContext<'_>,
    remains: &RoomObjectSnapshot,
) -> Result<(), ProcessorError> {
    if !remains.decay_time.is_some_and(|t| t <= ctx.game_time()) {
        return Ok(());
    }
    ctx.remove(&remains.id);
    for (resource, amount) in &remains.store {
        ctx.drop_resource(remains.position(), resource, *amount)?;
    }
    Ok(())
}

fn evaporate(ctx: &mut RoomProcessorContext<'_>, pile: &RoomObjectSnapshot) {
    let amount = pile.amount.unwrap_or(0);
    let loss = amount
        .saturating_add(ENERGY_DECAY.saturating_sub(1))
        .checked_div(ENERGY_DECAY)
        .unwrap_or(0);
    let left = amount.saturating_sub(loss);
    if left <= 0 {
        ctx.remove(&pile.id);
    } else {
        ctx.patch(
            &pile.id,
            RoomObjectPatch {
                amount: Some(left),
                ..RoomObjectPatch::default()
            },
        );
    }
}

fn retire_creep(ctx: &mut RoomProcessorContext<'_>, creep: &RoomObjectSnapshot) {
    if creep.spawning == Some(true) || !creep.age_time.is_some_and(|t| t <= ctx.game_time()) {
        return;
    }
    tracing::debug!(
        room = %ctx.room(),
        tick = ctx.game_time(),
        object_id = %creep.id,
        "Creep died of old age"
    );
    ctx.kill_creep(creep, 0);
    if let Some(owner) = &creep.user {
        ctx.record_stat(owner, stats::CREEPS_LOST, 1);
    }
}
