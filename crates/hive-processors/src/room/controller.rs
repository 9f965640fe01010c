//! Controller upgrades (`upgrade-controller`) and controller upkeep
//! (`controller`): downgrades, loss of ownership, safe mode and
//! reservation expiry.

use hive_blueprints::constants::{
    CONTROLLER_DOWNGRADE_RESTORE, CONTROLLER_MAX_UPGRADE_PER_TICK, UPGRADE_CONTROLLER_POWER,
};
use hive_blueprints::controller::{MAX_LEVEL, downgrade_ticks, progress_to_next_level};
use hive_types::intents::names;
use hive_types::resources::ENERGY;
use hive_types::{BodyPartType, ObjectId, ObjectType, RoomInfoPatch, RoomObjectPatch, UserId};

use super::{RoomProcessorStep, acting_creep};
use crate::context::RoomProcessorContext;
use crate::error::ProcessorError;
use crate::events::RoomEvent;
use crate::stats;

/// Global user counter credited by upgrades.
const GCL_FIELD: &str = "gcl";

/// Spends creep energy on controller progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpgradeControllerStep;

impl RoomProcessorStep for UpgradeControllerStep {
    fn name(&self) -> &'static str {
        "upgrade-controller"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        let mut upgraded_this_tick: i64 = 0;
        for intent in ctx.intents().named(names::UPGRADE_CONTROLLER) {
            let Some(creep) = acting_creep(ctx, intent)? else {
                continue;
            };
            let Some(target_id) = intent.record.first().and_then(|a| a.object_id("id")) else {
                continue;
            };
            let Some(controller) = ctx.object(&target_id)?.filter(|c| {
                c.object_type == ObjectType::Controller
                    && c.is_owned_by(&intent.user)
                    && c.level.unwrap_or(0) >= 1
            }) else {
                continue;
            };
            if !creep.position().in_range(controller.position(), 3) {
                continue;
            }

            let level = controller.level.unwrap_or(0);
            let energy = creep.store_amount(ENERGY);
            let mut amount = i64::from(creep.active_parts(BodyPartType::Work))
                .saturating_mul(UPGRADE_CONTROLLER_POWER)
                .min(energy);
            if level >= MAX_LEVEL {
                amount = amount.min(
                    CONTROLLER_MAX_UPGRADE_PER_TICK.saturating_sub(upgraded_this_tick),
                );
            }
            if amount <= 0 {
                continue;
            }
            upgraded_this_tick = upgraded_this_tick.saturating_add(amount);

            ctx.patch(
                &creep.id,
                RoomObjectPatch::store_entry(ENERGY, energy.saturating_sub(amount)),
            );

            let mut new_level = level;
            let mut progress = controller.progress.unwrap_or(0);
            if level < MAX_LEVEL {
                progress = progress.saturating_add(amount);
                while let Some(needed) = progress_to_next_level(new_level) {
                    if progress < needed {
                        break;
                    }
                    progress = progress.saturating_sub(needed);
                    new_level = new_level.saturating_add(1);
                }
            }

            let game_time = ctx.game_time();
            let restored = controller
                .downgrade_time
                .unwrap_or(game_time)
                .saturating_add(
                    CONTROLLER_DOWNGRADE_RESTORE.saturating_mul(amount.unsigned_abs()),
                )
                .min(game_time.saturating_add(downgrade_ticks(new_level)));
            ctx.patch(
                &controller.id,
                RoomObjectPatch {
                    level: (new_level != level).then_some(new_level),
                    progress: Some(progress),
                    downgrade_time: Some(restored),
                    ..RoomObjectPatch::default()
                },
            );

            if new_level != level {
                ctx.set_room_info_patch(RoomInfoPatch {
                    controller_level: Some(new_level),
                    ..RoomInfoPatch::default()
                });
                ctx.notify(
                    &intent.user,
                    format!("Your controller in room {} reached level {new_level}", ctx.room()),
                );
            }

            ctx.record_stat(&intent.user, stats::ENERGY_CONTROL, amount);
            if let Some(global) = ctx.global() {
                global.increment_user(&intent.user, GCL_FIELD, amount);
            }
            ctx.log_event(RoomEvent::UpgradeController {
                object_id: creep.id.clone(),
                target_id: controller.id.clone(),
                amount,
            });
        }
        Ok(())
    }
}

/// Expires safe mode and reservations, and downgrades neglected
/// controllers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerStep;

impl RoomProcessorStep for ControllerStep {
    fn name(&self) -> &'static str {
        "controller"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        let Some(id) = ctx.snapshot().controller().map(|c| c.id.clone()) else {
            return Ok(());
        };
        let Some(controller) = ctx.object(&id)? else {
            return Ok(());
        };
        let game_time = ctx.game_time();
        let mut patch = RoomObjectPatch::default();
        let mut info = RoomInfoPatch::default();

        if controller.safe_mode.is_some_and(|end| end <= game_time) {
            patch.safe_mode = Some(None);
            info.safe_mode = Some(None);
        }
        if controller
            .reservation
            .as_ref()
            .is_some_and(|r| r.end_time <= game_time)
        {
            patch.reservation = Some(None);
        }

        let level = controller.level.unwrap_or(0);
        let expired = controller.downgrade_time.is_some_and(|t| t <= game_time);
        if let Some(owner) = controller.user.clone().filter(|_| level >= 1 && expired) {
            downgrade(ctx, &id, level, &owner, &mut patch, &mut info);
        }

        if patch.has_changes() {
            ctx.patch(&id, patch);
        }
        if info.has_changes() {
            ctx.set_room_info_patch(info);
        }
        Ok(())
    }
}

fn downgrade(
    ctx: &RoomProcessorContext<'_>,
    id: &ObjectId,
    level: u32,
    owner: &UserId,
    patch: &mut RoomObjectPatch,
    info: &mut RoomInfoPatch,
) {
    let game_time = ctx.game_time();
    let new_level = level.saturating_sub(1);
    patch.level = Some(new_level);
    info.controller_level = Some(new_level);

    if new_level == 0 {
        patch.user = Some(None);
        patch.progress = Some(0);
        patch.safe_mode = Some(None);
        info.owner = Some(None);
        info.safe_mode = Some(None);
        tracing::info!(
            room = %ctx.room(),
            tick = game_time,
            object_id = %id,
            user_id = %owner,
            "Controller lost"
        );
        ctx.notify(owner, format!("You lost control of room {}", ctx.room()));
        return;
    }

    // A downgraded controller keeps 90% of the lower level's threshold.
    let progress = progress_to_next_level(new_level)
        .unwrap_or(0)
        .saturating_mul(9)
        .checked_div(10)
        .unwrap_or(0);
    patch.progress = Some(progress);
    patch.downgrade_time = Some(game_time.saturating_add(downgrade_ticks(new_level)));
    ctx.notify(
        owner,
        format!("Your controller in room {} downgraded to level {new_level}", ctx.room()),
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_types::test_support::{self, RoomFixture, intent, owner, text};
    use hive_types::{Reservation, RoomObjectSnapshot};

    use super::*;
    use crate::room::testing::{run_steps, run_steps_isolated};

    fn upgrader(work: usize, energy: i64) -> RoomObjectSnapshot {
        let mut body = vec![BodyPartType::Work; work];
        body.push(BodyPartType::Carry);
        let mut creep = test_support::creep("c1", &owner(), 24, 24, &body);
        creep.store_capacity = Some(1000);
        creep.store.insert(ENERGY.into(), energy);
        creep
    }

    fn upgrade_room(level: u32, progress: i64, creep: RoomObjectSnapshot) -> RoomFixture {
        let mut controller = test_support::controller("ctrl", level, Some(&owner()));
        controller.progress = Some(progress);
        controller.downgrade_time = Some(1_000);
        RoomFixture::new(900).with(controller).with(creep).with_intent(
            &owner(),
            "c1",
            intent(names::UPGRADE_CONTROLLER, vec![("id", text("ctrl"))]),
        )
    }

    #[test]
    fn upgrade_levels_up_and_restores_downgrade_timer() {
        let snapshot = upgrade_room(1, 195, upgrader(10, 8)).build();
        let run = run_steps(&snapshot, &[&UpgradeControllerStep]);
        let patch = run.patch("ctrl");
        assert_eq!(patch.level, Some(2));
        assert_eq!(patch.progress, Some(3));
        // 1000 + 800, capped at 900 + 10000 for level 2.
        assert_eq!(patch.downgrade_time, Some(1_800));
        assert_eq!(run.batch.room_info_patch.as_ref().unwrap().controller_level, Some(2));
        assert_eq!(run.stats.get(&owner(), stats::ENERGY_CONTROL), 8);
        assert_eq!(
            run.global.user_increments.get(&owner()).unwrap().get(GCL_FIELD),
            Some(&8)
        );
        assert_eq!(run.notifications.len(), 1);
    }

    #[test]
    fn level_eight_is_capped_per_tick() {
        let snapshot = upgrade_room(8, 0, upgrader(20, 100)).build();
        let run = run_steps_isolated(&snapshot, &[&UpgradeControllerStep]);
        assert_eq!(run.patch("c1").store.as_ref().unwrap().get(ENERGY), Some(&85));
        assert_eq!(run.patch("ctrl").progress, Some(0));
        assert!(run.global.is_empty());
    }

    #[test]
    fn expired_timer_downgrades_one_level() {
        let mut controller = test_support::controller("ctrl", 3, Some(&owner()));
        controller.downgrade_time = Some(500);
        let snapshot = RoomFixture::new(500).with(controller).build();
        let run = run_steps(&snapshot, &[&ControllerStep]);
        let patch = run.patch("ctrl");
        assert_eq!(patch.level, Some(2));
        assert_eq!(patch.progress, Some(40_500));
        assert_eq!(patch.downgrade_time, Some(10_500));
        assert_eq!(run.notifications.len(), 1);
    }

    #[test]
    fn level_one_downgrade_loses_ownership() {
        let mut controller = test_support::controller("ctrl", 1, Some(&owner()));
        controller.downgrade_time = Some(500);
        let snapshot = RoomFixture::new(600).with(controller).build();
        let run = run_steps(&snapshot, &[&ControllerStep]);
        let patch = run.patch("ctrl");
        assert_eq!(patch.level, Some(0));
        assert_eq!(patch.user, Some(None));
        let info = run.batch.room_info_patch.as_ref().unwrap();
        assert_eq!(info.owner, Some(None));
    }

    #[test]
    fn expired_safe_mode_and_reservation_are_cleared() {
        let mut controller = test_support::controller("ctrl", 0, None);
        controller.safe_mode = Some(100);
        controller.reservation = Some(Reservation {
            user: owner(),
            end_time: 90,
        });
        let snapshot = RoomFixture::new(100).with(controller).build();
        let run = run_steps(&snapshot, &[&ControllerStep]);
        let patch = run.patch("ctrl");
        assert_eq!(patch.safe_mode, Some(None));
        assert_eq!(patch.reservation, Some(None));
        assert_eq!(patch.level, None);
    }
}
