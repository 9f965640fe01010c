//! World-level upkeep: creeps crossing room borders and power bank decay.

use hive_types::{ObjectType, RoomObjectPatch};

use super::{GlobalProcessorContext, GlobalProcessorStep};
use crate::error::ProcessorError;

/// Lands creeps that stepped onto an exit tile last tick in their
/// destination room.
///
/// A creep headed for a room that is not accessible stays where it is and
/// loses the pending move.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterRoomTransitStep;

impl GlobalProcessorStep for InterRoomTransitStep {
    fn name(&self) -> &'static str {
        "inter-room-transit"
    }

    fn run(&self, ctx: &mut GlobalProcessorContext<'_>) -> Result<(), ProcessorError> {
        let snapshot = ctx.snapshot();
        for creep in &snapshot.inter_room_creeps {
            let Some(destination) = &creep.inter_room else {
                continue;
            };
            let mut patch = RoomObjectPatch {
                inter_room: Some(None),
                ..RoomObjectPatch::default()
            };
            if snapshot.accessible_rooms.contains_key(&destination.room) {
                patch.room = Some(destination.room.clone());
                patch.x = Some(destination.x);
                patch.y = Some(destination.y);
                tracing::trace!(
                    tick = ctx.game_time(),
                    object_id = %creep.id,
                    from = %creep.room,
                    to = %destination.room,
                    "Creep changed rooms"
                );
            } else {
                tracing::debug!(
                    tick = ctx.game_time(),
                    object_id = %creep.id,
                    to = %destination.room,
                    "Inter-room move into inaccessible room dropped"
                );
            }
            ctx.writer().patch_room_object(&creep.id, patch);
        }
        Ok(())
    }
}

/// Removes power banks whose lifetime has run out.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerBankDecayStep;

impl GlobalProcessorStep for PowerBankDecayStep {
    fn name(&self) -> &'static str {
        "power-bank-decay"
    }

    fn run(&self, ctx: &mut GlobalProcessorContext<'_>) -> Result<(), ProcessorError> {
        let game_time = ctx.game_time();
        let expired = ctx.snapshot().special_objects.iter().filter(|o| {
            o.object_type == ObjectType::PowerBank && o.decay_time.is_some_and(|t| t <= game_time)
        });
        for bank in expired {
            tracing::debug!(tick = game_time, object_id = %bank.id, room = %bank.room, "Power bank decayed");
            ctx.writer().remove_room_object(&bank.id);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_types::test_support::{self, owner};
    use hive_types::{
        BodyPartType, GlobalSnapshot, InterRoom, ObjectId, RoomInfoSnapshot, RoomName,
        RoomObjectSnapshot,
    };

    use super::*;
    use crate::global::testing::run_global;

    fn traveller(id: &str, to: &str) -> RoomObjectSnapshot {
        let mut creep = test_support::creep(id, &owner(), 0, 25, &[BodyPartType::Move]);
        creep.inter_room = Some(InterRoom {
            room: RoomName::from(to),
            x: 49,
            y: 25,
        });
        creep
    }

    #[test]
    fn creeps_land_in_accessible_rooms_only() {
        let mut snapshot = GlobalSnapshot {
            game_time: 30,
            ..GlobalSnapshot::default()
        };
        snapshot
            .accessible_rooms
            .insert(RoomName::from("W2N1"), RoomInfoSnapshot::new(RoomName::from("W2N1")));
        snapshot.inter_room_creeps = vec![traveller("a", "W2N1"), traveller("b", "W9N9")];

        let batch = run_global(&snapshot, &[&InterRoomTransitStep]);
        let landed = batch.room_objects.patches.get(&ObjectId::from("a")).unwrap();
        assert_eq!(landed.room, Some(RoomName::from("W2N1")));
        assert_eq!((landed.x, landed.y), (Some(49), Some(25)));
        assert_eq!(landed.inter_room, Some(None));

        let stranded = batch.room_objects.patches.get(&ObjectId::from("b")).unwrap();
        assert_eq!(stranded.room, None);
        assert_eq!(stranded.inter_room, Some(None));
    }

    #[test]
    fn expired_power_banks_are_removed() {
        let mut expired = test_support::object("pb1", ObjectType::PowerBank, 20, 20);
        expired.decay_time = Some(30);
        let mut fresh = test_support::object("pb2", ObjectType::PowerBank, 20, 20);
        fresh.decay_time = Some(31);
        let snapshot = GlobalSnapshot {
            game_time: 30,
            special_objects: vec![expired, fresh],
            ..GlobalSnapshot::default()
        };
        let batch = run_global(&snapshot, &[&PowerBankDecayStep]);
        assert!(batch.room_objects.removals.contains(&ObjectId::from("pb1")));
        assert!(!batch.room_objects.removals.contains(&ObjectId::from("pb2")));
    }
}
