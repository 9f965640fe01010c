//! Creep movement: `move` and `moveTo`.
//!
//! Every rested creep first picks the tile it wants. Moves are then
//! resolved together: a creep may enter a tile another creep leaves this
//! tick, of two creeps heading for the same tile the lower id wins, and a
//! creep whose move fails holds its tile against everyone behind it.
//! Fatigue is charged for the terrain entered and recovered by MOVE parts.

use std::collections::{BTreeMap, BTreeSet};

use hive_types::intents::names;
use hive_types::{
    BodyPartType, InterRoom, ObjectId, ObjectIntent, ObjectType, Position, RoomName,
    RoomObjectPatch, RoomObjectSnapshot, TerrainType,
};

use super::{RoomProcessorStep, acting_creep, creep_tiles, obstacle_tiles};
use crate::context::RoomProcessorContext;
use crate::error::ProcessorError;
use crate::events::RoomEvent;
use crate::pathfinder::{CostMatrix, PathGoal, RoomPosition, SearchOptions};

/// Fatigue per non-MOVE part for the terrain entered.
const fn terrain_fatigue(terrain: TerrainType, road: bool) -> i64 {
    if road {
        return 1;
    }
    match terrain {
        TerrainType::Swamp => 10,
        TerrainType::Plain | TerrainType::Wall => 2,
    }
}

/// Fatigue each MOVE part removes per tick.
const MOVE_RECOVERY: i64 = 2;

/// Moves creeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementStep;

impl RoomProcessorStep for MovementStep {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        let objects = ctx.objects()?;
        let roads: BTreeSet<Position> = objects
            .iter()
            .filter(|o| o.object_type == ObjectType::Road)
            .map(RoomObjectSnapshot::position)
            .collect();

        let creeps: Vec<&RoomObjectSnapshot> = objects
            .iter()
            .filter(|o| o.object_type == ObjectType::Creep)
            .collect();
        let mut wanted = BTreeMap::new();
        for creep in &creeps {
            if let Some(to) = desired_tile(ctx, creep, &objects)?
                && !blocked(ctx, creep, to, &objects)
            {
                wanted.insert(creep.id.clone(), to);
            }
        }
        let moves = resolve_moves(&objects, wanted);

        for creep in creeps {
            let mut fatigue = creep.fatigue.unwrap_or(0);
            let mut patch = RoomObjectPatch::default();

            if let Some(&to) = moves.get(&creep.id) {
                patch.x = Some(to.x);
                patch.y = Some(to.y);
                let per_part = terrain_fatigue(ctx.snapshot().terrain_at(to), roads.contains(&to));
                fatigue = fatigue.saturating_add(heavy_parts(creep).saturating_mul(per_part));
                if let Some(inter_room) = exit_destination(ctx, to) {
                    ctx.log_event(RoomEvent::Exit {
                        object_id: creep.id.clone(),
                        room: inter_room.room.clone(),
                        x: inter_room.x,
                        y: inter_room.y,
                    });
                    patch.inter_room = Some(Some(inter_room));
                }
            }

            let recovered = fatigue
                .saturating_sub(
                    i64::from(creep.active_parts(BodyPartType::Move)).saturating_mul(MOVE_RECOVERY),
                )
                .max(0);
            if Some(recovered) != creep.fatigue {
                patch.fatigue = Some(recovered);
            }
            if patch.has_changes() {
                ctx.patch(&creep.id, patch);
            }
        }
        Ok(())
    }
}

/// Body parts other than MOVE that still have hit points.
fn heavy_parts(creep: &RoomObjectSnapshot) -> i64 {
    let count = creep
        .body
        .iter()
        .filter(|p| p.part != BodyPartType::Move && p.hits > 0)
        .count();
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// The move intent a creep acts on: `move` wins over `moveTo`.
fn move_intent<'a>(
    ctx: &RoomProcessorContext<'a>,
    creep: &RoomObjectSnapshot,
) -> Option<&'a ObjectIntent> {
    let intents = ctx.intents();
    intents
        .find(&creep.id, names::MOVE)
        .or_else(|| intents.find(&creep.id, names::MOVE_TO))
}

/// The tile a creep asks to step onto this tick.
fn desired_tile(
    ctx: &RoomProcessorContext<'_>,
    creep: &RoomObjectSnapshot,
    objects: &[RoomObjectSnapshot],
) -> Result<Option<Position>, ProcessorError> {
    let Some(intent) = move_intent(ctx, creep) else {
        return Ok(None);
    };
    if acting_creep(ctx, intent)?.is_none()
        || creep.fatigue.unwrap_or(0) > 0
        || creep.active_parts(BodyPartType::Move) == 0
    {
        return Ok(None);
    }
    let Some(argument) = intent.record.first() else {
        return Ok(None);
    };

    if intent.record.name == names::MOVE {
        return Ok(argument
            .direction("direction")
            .and_then(|d| creep.position().offset(d)));
    }

    let coordinate = |field: &str| argument.integer(field).and_then(|v| u8::try_from(v).ok());
    let Some(target) = coordinate("x")
        .zip(coordinate("y"))
        .and_then(|(x, y)| Position::from_i32(i32::from(x), i32::from(y)))
    else {
        return Ok(None);
    };
    if target == creep.position() {
        return Ok(None);
    }
    next_step(ctx, creep, target, objects)
}

/// First tile of a path toward `target`, or `None` when the search comes
/// up short.
fn next_step(
    ctx: &RoomProcessorContext<'_>,
    creep: &RoomObjectSnapshot,
    target: Position,
    objects: &[RoomObjectSnapshot],
) -> Result<Option<Position>, ProcessorError> {
    let room = ctx.room().clone();
    let mut matrix = CostMatrix::new();
    for tile in obstacle_tiles(objects, creep.user.as_ref()) {
        matrix.block(tile);
    }
    for tile in creep_tiles(objects) {
        if tile != creep.position() && tile != target {
            matrix.block(tile);
        }
    }
    let callback = |name: &RoomName| (*name == room).then(|| matrix.clone());
    let options = SearchOptions {
        max_rooms: 1,
        room_callback: Some(&callback),
        ..SearchOptions::default()
    };
    let origin = RoomPosition::new(room.clone(), creep.position());
    let goal = PathGoal {
        target: RoomPosition::new(room.clone(), target),
        range: 0,
    };
    let result = ctx.path_finder().search(&origin, &[goal], &options)?;
    if result.incomplete {
        return Ok(None);
    }
    Ok(result
        .path
        .first()
        .filter(|step| step.room == room)
        .map(|step| step.pos))
}

/// Whether terrain or a structure keeps `creep` off `to`.
fn blocked(
    ctx: &RoomProcessorContext<'_>,
    creep: &RoomObjectSnapshot,
    to: Position,
    objects: &[RoomObjectSnapshot],
) -> bool {
    ctx.snapshot().terrain_at(to) == TerrainType::Wall
        || obstacle_tiles(objects, creep.user.as_ref()).contains(&to)
}

/// Settle the wanted moves against each other.
///
/// Creeps that do not move keep their tiles. Each round drops the moves
/// into a kept tile and every contested move but the lowest id; a dropped
/// move keeps its creep in place, so rounds repeat until nothing changes.
fn resolve_moves(
    objects: &[RoomObjectSnapshot],
    mut wanted: BTreeMap<ObjectId, Position>,
) -> BTreeMap<ObjectId, Position> {
    loop {
        let kept: BTreeSet<Position> = objects
            .iter()
            .filter(|o| matches!(o.object_type, ObjectType::Creep | ObjectType::PowerCreep))
            .filter(|o| !wanted.contains_key(&o.id))
            .map(RoomObjectSnapshot::position)
            .collect();
        let mut claimed = BTreeSet::new();
        let dropped: Vec<ObjectId> = wanted
            .iter()
            .filter(|(_, to)| kept.contains(*to) || !claimed.insert(**to))
            .map(|(id, _)| id.clone())
            .collect();
        if dropped.is_empty() {
            return wanted;
        }
        for id in &dropped {
            wanted.remove(id);
        }
    }
}

/// Where a creep standing on exit tile `to` continues next tick.
fn exit_destination(ctx: &RoomProcessorContext<'_>, to: Position) -> Option<InterRoom> {
    let (direction, landing) = to.exit_crossing()?;
    let room = ctx.room().neighbor(direction)?;
    Some(InterRoom {
        room,
        x: landing.x,
        y: landing.y,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_types::test_support::{self, RoomFixture, intent, number, owner, rival};
    use hive_types::{Direction, IntentRecord, RoomTerrain};

    use super::*;
    use crate::room::testing::run_steps;

    fn walker(id: &str, x: u8, y: u8) -> RoomObjectSnapshot {
        test_support::creep(id, &owner(), x, y, &[BodyPartType::Work, BodyPartType::Move])
    }

    fn step(direction: Direction) -> IntentRecord {
        intent(names::MOVE, vec![("direction", number(i32::from(direction.number())))])
    }

    fn move_to(x: i32, y: i32) -> IntentRecord {
        intent(names::MOVE_TO, vec![("x", number(x)), ("y", number(y))])
    }

    #[test]
    fn move_charges_terrain_fatigue_then_recovers() {
        let mut terrain = RoomTerrain::plain();
        terrain.set(Position::new(11, 10), TerrainType::Swamp);
        let snapshot = RoomFixture::new(10)
            .with_terrain(terrain)
            .with(walker("c1", 10, 10))
            .with_intent(&owner(), "c1", step(Direction::Right))
            .build();
        let run = run_steps(&snapshot, &[&MovementStep]);
        let patch = run.patch("c1");
        assert_eq!((patch.x, patch.y), (Some(11), Some(10)));
        // One WORK part on swamp, minus one MOVE part of recovery.
        assert_eq!(patch.fatigue, Some(8));
    }

    #[test]
    fn tired_creep_only_recovers() {
        let mut creep = walker("c1", 10, 10);
        creep.fatigue = Some(3);
        let snapshot = RoomFixture::new(10)
            .with(creep)
            .with_intent(&owner(), "c1", step(Direction::Right))
            .build();
        let run = run_steps(&snapshot, &[&MovementStep]);
        let patch = run.patch("c1");
        assert_eq!(patch.x, None);
        assert_eq!(patch.fatigue, Some(1));
    }

    #[test]
    fn lower_id_wins_a_contested_tile() {
        let snapshot = RoomFixture::new(10)
            .with(walker("a", 10, 10))
            .with(walker("b", 12, 10))
            .with_intent(&owner(), "a", step(Direction::Right))
            .with_intent(&owner(), "b", step(Direction::Left))
            .build();
        let run = run_steps(&snapshot, &[&MovementStep]);
        assert_eq!(run.patch("a").x, Some(11));
        assert!(!run.touched("b"));
    }

    #[test]
    fn follower_steps_into_a_vacated_tile() {
        let snapshot = RoomFixture::new(10)
            .with(walker("a", 10, 10))
            .with(walker("b", 11, 10))
            .with(walker("c", 12, 10))
            .with_intent(&owner(), "a", step(Direction::Right))
            .with_intent(&owner(), "b", step(Direction::Right))
            .with_intent(&owner(), "c", step(Direction::Right))
            .build();
        let run = run_steps(&snapshot, &[&MovementStep]);
        assert_eq!(run.patch("a").x, Some(11));
        assert_eq!(run.patch("b").x, Some(12));
        assert_eq!(run.patch("c").x, Some(13));
    }

    #[test]
    fn blocked_leader_holds_the_queue() {
        let mut terrain = RoomTerrain::plain();
        terrain.set(Position::new(13, 10), TerrainType::Wall);
        let snapshot = RoomFixture::new(10)
            .with_terrain(terrain)
            .with(walker("a", 10, 10))
            .with(walker("b", 11, 10))
            .with(walker("c", 12, 10))
            .with_intent(&owner(), "a", step(Direction::Right))
            .with_intent(&owner(), "b", step(Direction::Right))
            .with_intent(&owner(), "c", step(Direction::Right))
            .build();
        let run = run_steps(&snapshot, &[&MovementStep]);
        assert!(!run.touched("a"));
        assert!(!run.touched("b"));
        assert!(!run.touched("c"));
    }

    #[test]
    fn creeps_may_swap_tiles() {
        let snapshot = RoomFixture::new(10)
            .with(walker("a", 10, 10))
            .with(walker("b", 11, 10))
            .with_intent(&owner(), "a", step(Direction::Right))
            .with_intent(&owner(), "b", step(Direction::Left))
            .build();
        let run = run_steps(&snapshot, &[&MovementStep]);
        assert_eq!(run.patch("a").x, Some(11));
        assert_eq!(run.patch("b").x, Some(10));
    }

    #[test]
    fn walls_and_foreign_ramparts_block() {
        let mut terrain = RoomTerrain::plain();
        terrain.set(Position::new(10, 9), TerrainType::Wall);
        let snapshot = RoomFixture::new(10)
            .with_terrain(terrain)
            .with(walker("c1", 10, 10))
            .with(walker("c2", 20, 20))
            .with(test_support::structure("ramp", ObjectType::Rampart, &rival(), 21, 20, 0, 0))
            .with_intent(&owner(), "c1", step(Direction::Top))
            .with_intent(&owner(), "c2", step(Direction::Right))
            .build();
        let run = run_steps(&snapshot, &[&MovementStep]);
        assert!(!run.touched("c1"));
        assert!(!run.touched("c2"));
    }

    #[test]
    fn move_wins_over_move_to() {
        let snapshot = RoomFixture::new(10)
            .with(walker("c1", 10, 10))
            .with_intent(&owner(), "c1", move_to(10, 20))
            .with_intent(&owner(), "c1", step(Direction::Top))
            .build();
        let run = run_steps(&snapshot, &[&MovementStep]);
        assert_eq!(run.patch("c1").y, Some(9));
    }

    #[test]
    fn move_to_takes_the_first_path_step() {
        let snapshot = RoomFixture::new(10)
            .with(walker("c1", 10, 10))
            .with_intent(&owner(), "c1", move_to(10, 20))
            .build();
        let run = run_steps(&snapshot, &[&MovementStep]);
        let patch = run.patch("c1");
        assert_eq!(patch.y, Some(11));
        assert!(patch.x.unwrap().abs_diff(10) <= 1);
    }

    #[test]
    fn unreachable_move_to_is_a_no_op() {
        let mut terrain = RoomTerrain::plain();
        for pos in Direction::ALL
            .iter()
            .filter_map(|d| Position::new(10, 20).offset(*d))
        {
            terrain.set(pos, TerrainType::Wall);
        }
        let snapshot = RoomFixture::new(10)
            .with_terrain(terrain)
            .with(walker("c1", 10, 10))
            .with_intent(&owner(), "c1", move_to(10, 20))
            .build();
        let run = run_steps(&snapshot, &[&MovementStep]);
        assert!(!run.touched("c1"));
    }

    #[test]
    fn stepping_onto_an_exit_stages_inter_room() {
        let snapshot = RoomFixture::new(10)
            .with(walker("c1", 48, 25))
            .with_intent(&owner(), "c1", step(Direction::Right))
            .build();
        let run = run_steps(&snapshot, &[&MovementStep]);
        let inter_room = run.patch("c1").inter_room.clone().unwrap().unwrap();
        assert_eq!(inter_room.room, RoomName::from("W0N1"));
        assert_eq!((inter_room.x, inter_room.y), (0, 25));
        assert_eq!(run.events.len(), 1);
    }
}
