//! `harvest` on sources and minerals.

use hive_blueprints::constants::{
    ENERGY_REGEN_TIME, EXTRACTOR_COOLDOWN, HARVEST_MINERAL_POWER, HARVEST_POWER,
};
use hive_types::intents::names;
use hive_types::resources::ENERGY;
use hive_types::{BodyPartType, ObjectIntent, ObjectType, RoomObjectPatch, RoomObjectSnapshot};

use super::{RoomProcessorStep, acting_creep};
use crate::context::RoomProcessorContext;
use crate::error::ProcessorError;
use crate::events::RoomEvent;
use crate::stats;

/// Harvests sources and minerals into creep stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarvestStep;

impl RoomProcessorStep for HarvestStep {
    fn name(&self) -> &'static str {
        "harvest"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        for intent in ctx.intents().named(names::HARVEST) {
            let Some(creep) = acting_creep(ctx, intent)? else {
                continue;
            };
            let Some(target_id) = intent.record.first().and_then(|a| a.object_id("id")) else {
                continue;
            };
            let Some(target) = ctx.object(&target_id)? else {
                continue;
            };
            if !creep.position().in_range(target.position(), 1) {
                continue;
            }
            match target.object_type {
                ObjectType::Source => harvest_source(ctx, intent, &creep, &target)?,
                ObjectType::Mineral => harvest_mineral(ctx, &creep, &target)?,
                _ => {}
            }
        }
        Ok(())
    }
}

fn work_parts(creep: &RoomObjectSnapshot) -> i64 {
    i64::from(creep.active_parts(BodyPartType::Work))
}

/// Add `amount` of `resource` to the creep, dropping what does not fit.
fn gain(
    ctx: &mut RoomProcessorContext<'_>,
    creep: &RoomObjectSnapshot,
    resource: &str,
    amount: i64,
) -> Result<(), ProcessorError> {
    let kept = amount.min(creep.store_free_capacity(resource));
    if kept > 0 {
        ctx.patch(
            &creep.id,
            RoomObjectPatch::store_entry(
                resource,
                creep.store_amount(resource).saturating_add(kept),
            ),
        );
    }
    ctx.drop_resource(creep.position(), resource, amount.saturating_sub(kept))
}

fn harvest_source(
    ctx: &mut RoomProcessorContext<'_>,
    intent: &ObjectIntent,
    creep: &RoomObjectSnapshot,
    source: &RoomObjectSnapshot,
) -> Result<(), ProcessorError> {
    let available = source.energy.unwrap_or(0);
    let amount = work_parts(creep)
        .saturating_mul(HARVEST_POWER)
        .min(available);
    if amount <= 0 {
        return Ok(());
    }

    let mut patch = RoomObjectPatch {
        energy: Some(available.saturating_sub(amount)),
        ..RoomObjectPatch::default()
    };
    let full = source.energy_capacity.is_some_and(|cap| available >= cap);
    if full && source.next_regeneration_time.is_none() {
        patch.next_regeneration_time = Some(Some(ctx.game_time().saturating_add(ENERGY_REGEN_TIME)));
    }
    ctx.patch(&source.id, patch);

    gain(ctx, creep, ENERGY, amount)?;
    ctx.record_stat(&intent.user, stats::ENERGY_HARVESTED, amount);
    ctx.log_event(RoomEvent::Harvest {
        object_id: creep.id.clone(),
        target_id: source.id.clone(),
        amount,
    });
    Ok(())
}

fn harvest_mineral(
    ctx: &mut RoomProcessorContext<'_>,
    creep: &RoomObjectSnapshot,
    mineral: &RoomObjectSnapshot,
) -> Result<(), ProcessorError> {
    let Some(resource) = mineral.mineral_type.as_deref() else {
        return Ok(());
    };
    let game_time = ctx.game_time();
    let extractor = ctx.objects_at(mineral.position())?.into_iter().find(|o| {
        o.object_type == ObjectType::Extractor
            && o.user.is_some()
            && o.user == creep.user
            && ctx.is_active(o)
            && !o.on_cooldown(game_time)
    });
    let Some(extractor) = extractor else {
        return Ok(());
    };

    let available = mineral.mineral_amount.unwrap_or(0);
    let amount = work_parts(creep)
        .saturating_mul(HARVEST_MINERAL_POWER)
        .min(available);
    if amount <= 0 {
        return Ok(());
    }
    ctx.patch(
        &mineral.id,
        RoomObjectPatch {
            mineral_amount: Some(available.saturating_sub(amount)),
            ..RoomObjectPatch::default()
        },
    );
    ctx.patch(
        &extractor.id,
        RoomObjectPatch {
            cooldown_time: Some(game_time.saturating_add(EXTRACTOR_COOLDOWN)),
            ..RoomObjectPatch::default()
        },
    );
    gain(ctx, creep, resource, amount)?;
    ctx.log_event(RoomEvent::Harvest {
        object_id: creep.id.clone(),
        target_id: mineral.id.clone(),
        amount,
    });
    Ok(())
}
