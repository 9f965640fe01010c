//! Power creep lifecycle: creation, renaming, upgrades and deletion.
//!
//! Every power creep costs one global power level plus one per level it
//! holds. Free levels are recomputed from the running state, so two
//! creations in the same tick cannot share the last level.

use hive_blueprints::constants::{
    POWER_CREEP_DELETE_COOLDOWN_MS, POWER_CREEP_MAX_LEVEL, POWER_CREEP_NAME_MAX_LENGTH,
};
use hive_blueprints::power_level;
use hive_types::intents::names;
use hive_types::{
    GlobalUserIntent, ObjectId, PowerClass, PowerCreepPatch, PowerCreepSnapshot, PowerLevel,
    UserId,
};

use super::{GlobalProcessorContext, GlobalProcessorStep};
use crate::error::ProcessorError;

/// Id partition for new power creeps.
const POWER_CREEP_PARTITION: &str = "power-creeps";

/// Applies `createPowerCreep`, `renamePowerCreep`, `deletePowerCreep` and
/// `upgradePowerCreep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerCreepIntentsStep;

impl GlobalProcessorStep for PowerCreepIntentsStep {
    fn name(&self) -> &'static str {
        "power-creep-intents"
    }

    fn run(&self, ctx: &mut GlobalProcessorContext<'_>) -> Result<(), ProcessorError> {
        for intent in ctx.named(names::CREATE_POWER_CREEP) {
            create(ctx, intent)?;
        }
        for intent in ctx.named(names::RENAME_POWER_CREEP) {
            rename(ctx, intent)?;
        }
        for intent in ctx.named(names::DELETE_POWER_CREEP) {
            delete(ctx, intent)?;
        }
        for intent in ctx.named(names::UPGRADE_POWER_CREEP) {
            upgrade(ctx, intent)?;
        }
        Ok(())
    }
}

/// Global power levels `user` has not spent on power creeps yet.
fn free_levels(ctx: &GlobalProcessorContext<'_>, user: &UserId) -> Result<u32, ProcessorError> {
    let Some(state) = ctx.user(user)? else {
        return Ok(0);
    };
    let spent = ctx
        .power_creeps_of(user)?
        .iter()
        .fold(0_u32, |acc, pc| acc.saturating_add(pc.level).saturating_add(1));
    Ok(power_level(state.power).saturating_sub(spent))
}

fn valid_name(name: &str) -> bool {
    !name.trim().is_empty() && name.chars().count() <= POWER_CREEP_NAME_MAX_LENGTH
}

fn name_taken(
    ctx: &GlobalProcessorContext<'_>,
    user: &UserId,
    name: &str,
) -> Result<bool, ProcessorError> {
    Ok(ctx.power_creeps_of(user)?.iter().any(|pc| pc.name == name))
}

/// The power creep an intent's `id` names, when it belongs to the issuer.
fn owned(
    ctx: &GlobalProcessorContext<'_>,
    intent: &GlobalUserIntent,
) -> Result<Option<PowerCreepSnapshot>, ProcessorError> {
    let Some(id) = intent.record.first().and_then(|a| a.object_id("id")) else {
        return Ok(None);
    };
    Ok(ctx.power_creep(&id)?.filter(|pc| pc.user == intent.user))
}

fn create(
    ctx: &mut GlobalProcessorContext<'_>,
    intent: &GlobalUserIntent,
) -> Result<(), ProcessorError> {
    let Some(argument) = intent.record.first() else {
        return Ok(());
    };
    let (Some(name), Some(class_name)) = (
        argument.text("name").filter(|n| valid_name(n)),
        argument.text("className").and_then(PowerClass::parse),
    ) else {
        return Ok(());
    };
    if free_levels(ctx, &intent.user)? == 0 || name_taken(ctx, &intent.user, name)? {
        return Ok(());
    }

    let sequence = ctx.next_sequence();
    let creep = PowerCreepSnapshot {
        id: ObjectId::derive(POWER_CREEP_PARTITION, ctx.game_time(), sequence),
        user: intent.user.clone(),
        name: name.to_owned(),
        class_name,
        level: 0,
        powers: Default::default(),
        room: None,
        spawn_cooldown_time: None,
        delete_time: None,
    };
    tracing::info!(
        tick = ctx.game_time(),
        user_id = %creep.user,
        power_creep_id = %creep.id,
        name = %creep.name,
        "Power creep created"
    );
    ctx.writer().upsert_power_creep(creep);
    Ok(())
}

fn rename(
    ctx: &mut GlobalProcessorContext<'_>,
    intent: &GlobalUserIntent,
) -> Result<(), ProcessorError> {
    let Some(name) = intent
        .record
        .first()
        .and_then(|a| a.text("name"))
        .filter(|n| valid_name(n))
    else {
        return Ok(());
    };
    let Some(creep) = owned(ctx, intent)? else {
        return Ok(());
    };
    if creep.is_spawned() || name_taken(ctx, &intent.user, name)? {
        return Ok(());
    }
    ctx.writer().patch_power_creep(
        &creep.id,
        PowerCreepPatch {
            name: Some(name.to_owned()),
            ..PowerCreepPatch::default()
        },
    );
    Ok(())
}

fn delete(
    ctx: &mut GlobalProcessorContext<'_>,
    intent: &GlobalUserIntent,
) -> Result<(), ProcessorError> {
    let Some(creep) = owned(ctx, intent)? else {
        return Ok(());
    };
    if creep.is_spawned() {
        return Ok(());
    }
    let writer = ctx.writer();

    let experimenting = ctx
        .user(&intent.user)?
        .and_then(|u| u.power_experimentation_time)
        .is_some_and(|until| until > ctx.now_ms());
    if experimenting {
        tracing::info!(
            tick = ctx.game_time(),
            user_id = %intent.user,
            power_creep_id = %creep.id,
            "Power creep deleted during experimentation"
        );
        writer.remove_power_creep(&creep.id);
        return Ok(());
    }

    let cancel = intent
        .record
        .first()
        .and_then(|a| a.boolean("cancel"))
        .unwrap_or(false);
    if cancel {
        if creep.delete_time.is_some() {
            writer.patch_power_creep(
                &creep.id,
                PowerCreepPatch {
                    delete_time: Some(None),
                    ..PowerCreepPatch::default()
                },
            );
        }
    } else if creep.delete_time.is_none() {
        writer.patch_power_creep(
            &creep.id,
            PowerCreepPatch {
                delete_time: Some(Some(
                    ctx.now_ms().saturating_add(POWER_CREEP_DELETE_COOLDOWN_MS),
                )),
                ..PowerCreepPatch::default()
            },
        );
    }
    Ok(())
}

fn upgrade(
    ctx: &mut GlobalProcessorContext<'_>,
    intent: &GlobalUserIntent,
) -> Result<(), ProcessorError> {
    let Some(power) = intent.record.first().and_then(|a| a.text("power")) else {
        return Ok(());
    };
    let Some(creep) = owned(ctx, intent)? else {
        return Ok(());
    };
    if creep.level >= POWER_CREEP_MAX_LEVEL || free_levels(ctx, &intent.user)? == 0 {
        return Ok(());
    }
    let mut powers = creep.powers.clone();
    let entry = powers
        .entry(power.to_owned())
        .or_insert(PowerLevel { level: 0 });
    entry.level = entry.level.saturating_add(1);
    ctx.writer().patch_power_creep(
        &creep.id,
        PowerCreepPatch {
            level: Some(creep.level.saturating_add(1)),
            powers: Some(powers),
            ..PowerCreepPatch::default()
        },
    );
    Ok(())
}

/// Removes power creeps whose deletion time has passed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerCreepDeletionStep;

impl GlobalProcessorStep for PowerCreepDeletionStep {
    fn name(&self) -> &'static str {
        "power-creep-deletion"
    }

    fn run(&self, ctx: &mut GlobalProcessorContext<'_>) -> Result<(), ProcessorError> {
        for id in ctx.snapshot().market.power_creeps.keys() {
            let Some(creep) = ctx.power_creep(id)? else {
                continue;
            };
            if creep.delete_time.is_some_and(|t| t <= ctx.now_ms()) {
                tracing::debug!(
                    tick = ctx.game_time(),
                    power_creep_id = %id,
                    "Power creep deleted"
                );
                ctx.writer().remove_power_creep(id);
            }
        }
        Ok(())
    }
}
