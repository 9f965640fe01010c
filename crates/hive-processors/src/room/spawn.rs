//! Spawn intents (`spawn-intents`) and spawn completion (`spawning`).
//!
//! A spawn handles at most one `createCreep` per tick; later creates in the
//! same tick are ignored. Energy comes from the [`EnergyAllocator`] and is
//! drawn only when the whole cost is covered. The new creep is upserted
//! immediately, inside the spawn and flagged `spawning`, and is placed on
//! an adjacent tile by the `spawning` step once its spawn time is reached.

use hive_blueprints::body_cost;
use hive_blueprints::constants::{
    BODYPART_HITS, CARRY_CAPACITY, CREEP_LIFE_TIME, CREEP_SPAWN_TIME, MAX_CREEP_SIZE,
};
use hive_types::intents::names;
use hive_types::resources::ENERGY;
use hive_types::{
    BodyPart, BodyPartType, Direction, IntentArgument, ObjectId, ObjectType, Position,
    RoomObjectPatch, RoomObjectSnapshot, SpawningState, TerrainType, UserId,
};

use super::{RoomProcessorStep, creep_tiles, obstacle_tiles};
use crate::context::{RoomProcessorContext, creep_lifetime};
use crate::energy::{EnergyAllocator, EnergyPlan};
use crate::error::ProcessorError;
use crate::stats;

/// Figures derived from a requested body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyAnalysis {
    /// Parts in order.
    pub parts: Vec<BodyPartType>,
    /// Energy cost.
    pub cost: i64,
    /// Ticks to spawn.
    pub spawn_time: u64,
    /// Maximum hit points.
    pub hits_max: i64,
    /// Store capacity from CARRY parts.
    pub carry_capacity: i64,
}

impl BodyAnalysis {
    /// Analyse `parts`; `None` for an empty or oversized body.
    pub fn new(parts: &[BodyPartType]) -> Option<Self> {
        if parts.is_empty() || parts.len() > MAX_CREEP_SIZE {
            return None;
        }
        let count = u64::try_from(parts.len()).ok()?;
        let carry = parts.iter().filter(|p| **p == BodyPartType::Carry).count();
        Some(Self {
            parts: parts.to_vec(),
            cost: body_cost(parts.iter().copied()),
            spawn_time: CREEP_SPAWN_TIME.saturating_mul(count),
            hits_max: BODYPART_HITS.saturating_mul(i64::try_from(count).ok()?),
            carry_capacity: CARRY_CAPACITY.saturating_mul(i64::try_from(carry).ok()?),
        })
    }
}

/// A parsed `createCreep` argument.
#[derive(Debug, Clone)]
struct CreateCreep {
    name: String,
    body: Vec<BodyPartType>,
    energy_structures: Vec<ObjectId>,
    directions: Option<Vec<Direction>>,
}

impl CreateCreep {
    fn parse(argument: &IntentArgument) -> Option<Self> {
        Some(Self {
            name: argument.text("name")?.to_owned(),
            body: argument.body_parts("body")?.to_vec(),
            energy_structures: argument
                .text_array("energyStructures")
                .unwrap_or_default()
                .iter()
                .map(|id| ObjectId::from(id.as_str()))
                .collect(),
            directions: argument.directions("directions"),
        })
    }
}

/// Everything one spawn was asked to do this tick.
#[derive(Debug, Default)]
struct SpawnEnvelope {
    create: Option<CreateCreep>,
    renew: Option<ObjectId>,
    recycle: Option<ObjectId>,
    directions: Option<Vec<Direction>>,
}

impl SpawnEnvelope {
    fn parse(ctx: &RoomProcessorContext<'_>, spawn: &ObjectId) -> Self {
        let first = |name: &str| {
            ctx.intents()
                .find(spawn, name)
                .and_then(|intent| intent.record.first())
        };
        Self {
            create: first(names::CREATE_CREEP).and_then(CreateCreep::parse),
            renew: first(names::RENEW_CREEP).and_then(|a| a.object_id("id")),
            recycle: first(names::RECYCLE_CREEP).and_then(|a| a.object_id("id")),
            directions: first(names::SET_SPAWN_DIRECTIONS)
                .and_then(|a| a.directions("directions")),
        }
    }

    const fn is_empty(&self) -> bool {
        self.create.is_none()
            && self.renew.is_none()
            && self.recycle.is_none()
            && self.directions.is_none()
    }
}

/// Draw `cost` energy for `owner`, staging one store patch per drawn
/// structure. `None` when the room cannot cover it.
fn draw_energy(
    ctx: &mut RoomProcessorContext<'_>,
    owner: &UserId,
    cost: i64,
    preferred: &[ObjectId],
) -> Result<Option<EnergyPlan>, ProcessorError> {
    let objects = ctx.objects()?;
    let plan = EnergyAllocator::new(owner, &objects, ctx.active()).allocate(cost, preferred);
    match plan {
        Ok(plan) => {
            for draw in &plan.draws {
                ctx.patch(&draw.id, RoomObjectPatch::store_entry(ENERGY, draw.remaining));
            }
            Ok(Some(plan))
        }
        Err(shortfall) => {
            tracing::debug!(
                room = %ctx.room(),
                tick = ctx.game_time(),
                user_id = %owner,
                needed = shortfall.needed,
                available = shortfall.available,
                "Not enough energy"
            );
            Ok(None)
        }
    }
}

/// An own creep next to `spawn` that has left its spawn.
fn adjacent_creep(
    ctx: &RoomProcessorContext<'_>,
    spawn: &RoomObjectSnapshot,
    id: &ObjectId,
) -> Result<Option<RoomObjectSnapshot>, ProcessorError> {
    Ok(ctx.object(id)?.filter(|creep| {
        creep.object_type == ObjectType::Creep
            && creep.user.is_some()
            && creep.user == spawn.user
            && creep.spawning != Some(true)
            && creep.position().in_range(spawn.position(), 1)
    }))
}

// ---------------------------------------------------------------------------
// spawn-intents
// ---------------------------------------------------------------------------

/// Handles `createCreep`, `renewCreep`, `recycleCreep` and
/// `setSpawnDirections`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnIntentsStep;

impl RoomProcessorStep for SpawnIntentsStep {
    fn name(&self) -> &'static str {
        "spawn-intents"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        let spawns: Vec<ObjectId> = ctx
            .snapshot()
            .objects_of_type(ObjectType::Spawn)
            .map(|s| s.id.clone())
            .collect();

        for id in spawns {
            let envelope = SpawnEnvelope::parse(ctx, &id);
            if envelope.is_empty() {
                continue;
            }
            let Some(spawn) = ctx.object(&id)? else {
                continue;
            };
            if !ctx.is_active(&spawn) {
                continue;
            }

            if let Some(create) = envelope.create {
                create_creep(ctx, &spawn, create)?;
            }
            if let Some(target) = &envelope.renew {
                renew_creep(ctx, &id, target)?;
            }
            if let Some(target) = &envelope.recycle {
                recycle_creep(ctx, &id, target)?;
            }
            if let Some(directions) = envelope.directions {
                set_spawn_directions(ctx, &id, directions)?;
            }
        }
        Ok(())
    }
}

fn create_creep(
    ctx: &mut RoomProcessorContext<'_>,
    spawn: &RoomObjectSnapshot,
    create: CreateCreep,
) -> Result<(), ProcessorError> {
    if spawn.spawning_state.is_some() {
        return Ok(());
    }
    let Some(owner) = spawn.user.clone() else {
        return Ok(());
    };
    let Some(body) = BodyAnalysis::new(&create.body) else {
        tracing::debug!(
            room = %ctx.room(),
            tick = ctx.game_time(),
            object_id = %spawn.id,
            parts = create.body.len(),
            "Rejected creep body"
        );
        return Ok(());
    };
    let name_taken = ctx.objects_of_type(ObjectType::Creep)?.iter().any(|c| {
        c.is_owned_by(&owner) && c.name.as_deref() == Some(create.name.as_str())
    });
    if name_taken {
        return Ok(());
    }

    if draw_energy(ctx, &owner, body.cost, &create.energy_structures)?.is_none() {
        return Ok(());
    }

    let game_time = ctx.game_time();
    ctx.patch(
        &spawn.id,
        RoomObjectPatch {
            spawning_state: Some(Some(SpawningState {
                name: create.name.clone(),
                need_time: body.spawn_time,
                spawn_time: game_time.saturating_add(body.spawn_time),
                directions: create.directions,
            })),
            ..RoomObjectPatch::default()
        },
    );

    let id = ctx.next_object_id();
    let mut creep =
        RoomObjectSnapshot::new(id, ObjectType::Creep, ctx.room().clone(), spawn.x, spawn.y);
    creep.user = Some(owner.clone());
    creep.name = Some(create.name);
    creep.body = body.parts.iter().copied().map(BodyPart::new).collect();
    creep.hits = Some(body.hits_max);
    creep.hits_max = Some(body.hits_max);
    creep.store_capacity = Some(body.carry_capacity);
    creep.fatigue = Some(0);
    creep.spawning = Some(true);
    creep.notify_when_attacked = Some(true);
    tracing::debug!(
        room = %ctx.room(),
        tick = game_time,
        object_id = %creep.id,
        user_id = %owner,
        cost = body.cost,
        "Creep spawning"
    );
    ctx.upsert(creep);
    ctx.record_stat(&owner, stats::ENERGY_CREEPS, body.cost);
    Ok(())
}

fn renew_creep(
    ctx: &mut RoomProcessorContext<'_>,
    spawn_id: &ObjectId,
    target: &ObjectId,
) -> Result<(), ProcessorError> {
    let Some(spawn) = ctx.object(spawn_id)? else {
        return Ok(());
    };
    let Some(owner) = spawn.user.clone() else {
        return Ok(());
    };
    if spawn.spawning_state.is_some() {
        return Ok(());
    }
    let Some(creep) = adjacent_creep(ctx, &spawn, target)? else {
        return Ok(());
    };
    let parts = u64::try_from(creep.body.len()).unwrap_or(0);
    if parts == 0 || creep.body.iter().any(|p| p.part == BodyPartType::Claim) {
        return Ok(());
    }

    // 1.2 x lifetime / spawn time, spread over the body.
    let added = CREEP_LIFE_TIME
        .saturating_mul(6)
        .checked_div(CREEP_SPAWN_TIME.saturating_mul(5).saturating_mul(parts))
        .unwrap_or(0);
    let game_time = ctx.game_time();
    let ttl = creep.ticks_to_live(game_time).unwrap_or(0);
    if ttl.saturating_add(added) > CREEP_LIFE_TIME {
        return Ok(());
    }

    let body_cost = body_cost(creep.body.iter().map(|p| p.part));
    let divisor = i64::try_from(CREEP_SPAWN_TIME.saturating_mul(5).saturating_mul(parts))
        .unwrap_or(i64::MAX);
    let numerator = body_cost.saturating_mul(6);
    let cost = numerator
        .checked_add(divisor.saturating_sub(1))
        .and_then(|n| n.checked_div(divisor))
        .unwrap_or(0);

    if draw_energy(ctx, &owner, cost, &[])?.is_none() {
        return Ok(());
    }
    ctx.patch(
        &creep.id,
        RoomObjectPatch {
            age_time: Some(game_time.saturating_add(ttl).saturating_add(added)),
            ..RoomObjectPatch::default()
        },
    );
    ctx.record_stat(&owner, stats::ENERGY_CREEPS, cost);
    Ok(())
}

fn recycle_creep(
    ctx: &mut RoomProcessorContext<'_>,
    spawn_id: &ObjectId,
    target: &ObjectId,
) -> Result<(), ProcessorError> {
    let Some(spawn) = ctx.object(spawn_id)? else {
        return Ok(());
    };
    let Some(creep) = adjacent_creep(ctx, &spawn, target)? else {
        return Ok(());
    };
    let lifetime = i64::try_from(creep_lifetime(&creep.body)).unwrap_or(i64::MAX);
    let ttl = i64::try_from(creep.ticks_to_live(ctx.game_time()).unwrap_or(0)).unwrap_or(0);
    let reclaimed = body_cost(creep.body.iter().map(|p| p.part))
        .saturating_mul(ttl)
        .checked_div(lifetime)
        .unwrap_or(0);
    ctx.kill_creep(&creep, reclaimed);
    Ok(())
}

fn set_spawn_directions(
    ctx: &mut RoomProcessorContext<'_>,
    spawn_id: &ObjectId,
    directions: Vec<Direction>,
) -> Result<(), ProcessorError> {
    let Some(state) = ctx.object(spawn_id)?.and_then(|s| s.spawning_state) else {
        return Ok(());
    };
    ctx.patch(
        spawn_id,
        RoomObjectPatch {
            spawning_state: Some(Some(SpawningState {
                directions: Some(directions),
                ..state
            })),
            ..RoomObjectPatch::default()
        },
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// spawning
// ---------------------------------------------------------------------------

/// Places finished creeps next to their spawn.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawningStep;

impl RoomProcessorStep for SpawningStep {
    fn name(&self) -> &'static str {
        "spawning"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        let game_time = ctx.game_time();
        for spawn in ctx.objects_of_type(ObjectType::Spawn)? {
            let Some(state) = &spawn.spawning_state else {
                continue;
            };
            if state.spawn_time > game_time {
                continue;
            }

            let creep = ctx.objects_of_type(ObjectType::Creep)?.into_iter().find(|c| {
                c.spawning == Some(true)
                    && c.user == spawn.user
                    && c.name.as_deref() == Some(state.name.as_str())
            });
            let Some(creep) = creep else {
                ctx.patch(&spawn.id, clear_spawning());
                continue;
            };

            let Some(tile) = free_adjacent_tile(ctx, &spawn, state.directions.as_deref())? else {
                tracing::debug!(
                    room = %ctx.room(),
                    tick = game_time,
                    object_id = %spawn.id,
                    "Spawn exit blocked"
                );
                continue;
            };

            ctx.patch(
                &creep.id,
                RoomObjectPatch {
                    x: Some(tile.x),
                    y: Some(tile.y),
                    spawning: Some(false),
                    age_time: Some(game_time.saturating_add(creep_lifetime(&creep.body))),
                    ..RoomObjectPatch::default()
                },
            );
            ctx.patch(&spawn.id, clear_spawning());
            if let Some(owner) = &creep.user {
                ctx.record_stat(owner, stats::CREEPS_PRODUCED, 1);
            }
        }
        Ok(())
    }
}

fn clear_spawning() -> RoomObjectPatch {
    RoomObjectPatch {
        spawning_state: Some(None),
        ..RoomObjectPatch::default()
    }
}

/// First free tile around `spawn`, trying `preferred` directions first.
fn free_adjacent_tile(
    ctx: &RoomProcessorContext<'_>,
    spawn: &RoomObjectSnapshot,
    preferred: Option<&[Direction]>,
) -> Result<Option<Position>, ProcessorError> {
    let objects = ctx.objects()?;
    let blocked = obstacle_tiles(&objects, spawn.user.as_ref());
    let occupied = creep_tiles(&objects);
    let snapshot = ctx.snapshot();
    let candidates = preferred
        .unwrap_or_default()
        .iter()
        .chain(Direction::ALL.iter())
        .filter_map(|d| spawn.position().offset(*d));
    for tile in candidates {
        if snapshot.terrain_at(tile) == TerrainType::Wall
            || blocked.contains(&tile)
            || occupied.contains(&tile)
        {
            continue;
        }
        return Ok(Some(tile));
    }
    Ok(None)
}
