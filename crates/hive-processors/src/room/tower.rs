//! Tower `attack`, `heal` and `repair`.
//!
//! Each tower performs at most one action per tick, the first of its
//! intents in submission order. Every action costs the same energy and
//! weakens linearly with range beyond the optimal distance.

use hive_blueprints::constants::{
    TOWER_ENERGY_COST, TOWER_FALLOFF_PERCENT, TOWER_FALLOFF_RANGE, TOWER_OPTIMAL_RANGE,
    TOWER_POWER_ATTACK, TOWER_POWER_HEAL, TOWER_POWER_REPAIR,
};
use hive_types::intents::names;
use hive_types::resources::ENERGY;
use hive_types::{ObjectId, ObjectType, RoomObjectPatch, RoomObjectSnapshot};

use super::{RoomProcessorStep, acting_structure};
use crate::context::{RoomProcessorContext, body_for_hits};
use crate::error::ProcessorError;
use crate::events::RoomEvent;
use crate::stats;

/// Power left after range falloff.
pub fn tower_power(base: i64, range: u8) -> i64 {
    if range <= TOWER_OPTIMAL_RANGE {
        return base;
    }
    let span = i64::from(TOWER_FALLOFF_RANGE.saturating_sub(TOWER_OPTIMAL_RANGE));
    let distance = i64::from(range.min(TOWER_FALLOFF_RANGE).saturating_sub(TOWER_OPTIMAL_RANGE));
    let reduction = base
        .saturating_mul(TOWER_FALLOFF_PERCENT)
        .saturating_mul(distance)
        .checked_div(span.saturating_mul(100))
        .unwrap_or(0);
    base.saturating_sub(reduction)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TowerAction {
    Attack,
    Heal,
    Repair,
}

impl TowerAction {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            names::ATTACK => Some(Self::Attack),
            names::HEAL => Some(Self::Heal),
            names::REPAIR => Some(Self::Repair),
            _ => None,
        }
    }
}

/// Runs tower actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TowerStep;

impl RoomProcessorStep for TowerStep {
    fn name(&self) -> &'static str {
        "tower"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        let towers: Vec<ObjectId> = ctx
            .snapshot()
            .objects_of_type(ObjectType::Tower)
            .map(|t| t.id.clone())
            .collect();
        for id in towers {
            let Some((intent, action)) = ctx
                .intents()
                .for_object(&id)
                .iter()
                .find_map(|i| TowerAction::from_name(&i.record.name).map(|a| (i, a)))
            else {
                continue;
            };
            let Some(tower) = acting_structure(ctx, intent, ObjectType::Tower)? else {
                continue;
            };
            let energy = tower.store_amount(ENERGY);
            if energy < TOWER_ENERGY_COST {
                continue;
            }
            let Some(target_id) = intent.record.first().and_then(|a| a.object_id("id")) else {
                continue;
            };
            let Some(target) = ctx.object(&target_id)? else {
                continue;
            };
            let range = tower.position().range_to(target.position());

            let acted = match action {
                TowerAction::Attack => attack(ctx, &tower, &target, range)?,
                TowerAction::Heal => heal(ctx, &tower, &target, range),
                TowerAction::Repair => repair(ctx, &tower, &target, range),
            };
            if acted {
                ctx.patch(
                    &tower.id,
                    RoomObjectPatch::store_entry(ENERGY, energy.saturating_sub(TOWER_ENERGY_COST)),
                );
            }
        }
        Ok(())
    }
}

fn attack(
    ctx: &mut RoomProcessorContext<'_>,
    tower: &RoomObjectSnapshot,
    target: &RoomObjectSnapshot,
    range: u8,
) -> Result<bool, ProcessorError> {
    let Some(hits) = target.hits else {
        return Ok(false);
    };
    let damage = tower_power(TOWER_POWER_ATTACK, range);
    let remaining = hits.saturating_sub(damage);
    ctx.log_event(RoomEvent::Attack {
        object_id: tower.id.clone(),
        target_id: target.id.clone(),
        damage,
    });
    if let Some(owner) = &target.user
        && target.notify_when_attacked != Some(false)
        && target.user != tower.user
    {
        ctx.notify(
            owner,
            format!("Your {} {} was attacked by a tower", target.object_type, target.id),
        );
    }

    match target.object_type {
        ObjectType::Creep if remaining <= 0 => {
            ctx.kill_creep(target, 0);
            if let Some(owner) = &target.user {
                ctx.record_stat(owner, stats::CREEPS_LOST, 1);
            }
        }
        ObjectType::Creep => ctx.patch(
            &target.id,
            RoomObjectPatch {
                hits: Some(remaining),
                body: Some(body_for_hits(&target.body, remaining)),
                ..RoomObjectPatch::default()
            },
        ),
        _ if remaining <= 0 => ctx.destroy_structure(target),
        _ => ctx.patch(
            &target.id,
            RoomObjectPatch {
                hits: Some(remaining),
                ..RoomObjectPatch::default()
            },
        ),
    }
    Ok(true)
}

fn heal(
    ctx: &mut RoomProcessorContext<'_>,
    tower: &RoomObjectSnapshot,
    target: &RoomObjectSnapshot,
    range: u8,
) -> bool {
    if target.object_type != ObjectType::Creep {
        return false;
    }
    let (Some(hits), Some(hits_max)) = (target.hits, target.hits_max) else {
        return false;
    };
    let amount = tower_power(TOWER_POWER_HEAL, range).min(hits_max.saturating_sub(hits));
    if amount > 0 {
        let healed = hits.saturating_add(amount);
        ctx.patch(
            &target.id,
            RoomObjectPatch {
                hits: Some(healed),
                body: Some(body_for_hits(&target.body, healed)),
                ..RoomObjectPatch::default()
            },
        );
    }
    ctx.log_event(RoomEvent::Heal {
        object_id: tower.id.clone(),
        target_id: target.id.clone(),
        amount,
    });
    true
}

fn repair(
    ctx: &mut RoomProcessorContext<'_>,
    tower: &RoomObjectSnapshot,
    target: &RoomObjectSnapshot,
    range: u8,
) -> bool {
    if matches!(target.object_type, ObjectType::Creep | ObjectType::PowerCreep) {
        return false;
    }
    let (Some(hits), Some(hits_max)) = (target.hits, target.hits_max) else {
        return false;
    };
    let amount = tower_power(TOWER_POWER_REPAIR, range).min(hits_max.saturating_sub(hits));
    if amount <= 0 {
        return false;
    }
    ctx.patch(
        &target.id,
        RoomObjectPatch {
            hits: Some(hits.saturating_add(amount)),
            ..RoomObjectPatch::default()
        },
    );
    ctx.log_event(RoomEvent::Repair {
        object_id: tower.id.clone(),
        target_id: target.id.clone(),
        amount,
    });
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_types::test_support::{self, RoomFixture, intent, owner, rival, text};
    use hive_types::{BodyPartType, IntentRecord};

    use super::*;
    use crate::room::testing::run_steps;

    fn order(name: &str, target: &str) -> IntentRecord {
        intent(name, vec![("id", text(target))])
    }

    fn tower_room() -> RoomFixture {
        RoomFixture::new(10)
            .with(test_support::controller("ctrl", 3, Some(&owner())))
            .with(test_support::structure("t1", ObjectType::Tower, &owner(), 10, 10, 500, 1000))
    }

    #[test]
    fn power_falls_off_linearly() {
        assert_eq!(tower_power(TOWER_POWER_ATTACK, 5), 600);
        assert_eq!(tower_power(TOWER_POWER_ATTACK, 20), 150);
        assert_eq!(tower_power(TOWER_POWER_ATTACK, 40), 150);
        assert_eq!(tower_power(TOWER_POWER_ATTACK, 10), 450);
    }

    #[test]
    fn attack_wears_body_from_the_front() {
        let snapshot = tower_room()
            .with(test_support::creep(
                "foe",
                &rival(),
                12,
                10,
                &[BodyPartType::Tough; 10],
            ))
            .with_intent(&owner(), "t1", order(names::ATTACK, "foe"))
            .build();
        let run = run_steps(&snapshot, &[&TowerStep]);
        let patch = run.patch("foe");
        assert_eq!(patch.hits, Some(400));
        let body = patch.body.as_ref().unwrap();
        assert_eq!(body.first().unwrap().hits, 0);
        assert_eq!(body.last().unwrap().hits, 100);
        assert_eq!(run.patch("t1").store.as_ref().unwrap().get(ENERGY), Some(&490));
        assert_eq!(run.notifications.len(), 1);
    }

    #[test]
    fn lethal_attack_leaves_a_tombstone() {
        let snapshot = tower_room()
            .with(test_support::creep("foe", &rival(), 12, 10, &[BodyPartType::Move]))
            .with_intent(&owner(), "t1", order(names::ATTACK, "foe"))
            .build();
        let run = run_steps(&snapshot, &[&TowerStep]);
        assert!(run.batch.removals.contains(&ObjectId::from("foe")));
        assert_eq!(
            run.batch.upserts.values().next().unwrap().object_type,
            ObjectType::Tombstone
        );
        assert_eq!(run.stats.get(&rival(), stats::CREEPS_LOST), 1);
    }

    #[test]
    fn one_action_per_tower() {
        let mut road = test_support::object("road", ObjectType::Road, 11, 11);
        road.hits = Some(1000);
        road.hits_max = Some(5000);
        let mut hurt = test_support::creep("ally", &owner(), 9, 9, &[BodyPartType::Move; 5]);
        hurt.hits = Some(100);
        let snapshot = tower_room()
            .with(road)
            .with(hurt)
            .with_intent(&owner(), "t1", order(names::REPAIR, "road"))
            .with_intent(&owner(), "t1", order(names::HEAL, "ally"))
            .build();
        let run = run_steps(&snapshot, &[&TowerStep]);
        assert_eq!(run.patch("road").hits, Some(1800));
        assert!(!run.touched("ally"));
    }

    #[test]
    fn inactive_tower_does_nothing() {
        let snapshot = RoomFixture::new(10)
            .with(test_support::controller("ctrl", 2, Some(&owner())))
            .with(test_support::structure("t1", ObjectType::Tower, &owner(), 10, 10, 500, 1000))
            .with(test_support::creep("foe", &rival(), 12, 10, &[BodyPartType::Move]))
            .with_intent(&owner(), "t1", order(names::ATTACK, "foe"))
            .build();
        let run = run_steps(&snapshot, &[&TowerStep]);
        assert!(run.batch.patches.is_empty());
        assert!(run.batch.upserts.is_empty());
        assert!(run.batch.removals.is_empty());
    }
}
