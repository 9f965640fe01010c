//! Structure intents: links, labs, factories, power spawns and nukers.
//!
//! A structure acts at most once per tick. The cooldown each action sets
//! is visible through the context overlay, so a second intent against the
//! same structure finds it cooling down and is skipped.

use hive_blueprints::constants::{
    LAB_MINERAL_CAPACITY, LAB_REACTION_AMOUNT, LAB_REACTION_RANGE, LINK_LOSS_RATIO_PERCENT,
    NUKE_LAND_TIME, NUKE_RANGE, NUKER_COOLDOWN, NUKER_ENERGY_CAPACITY, NUKER_GHODIUM_CAPACITY,
    POWER_SPAWN_ENERGY_RATIO,
};
use hive_blueprints::recipes::{factory_recipe, reaction_product, reaction_time};
use hive_types::intents::{names, target_room};
use hive_types::resources::{ENERGY, GHODIUM, POWER};
use hive_types::{ObjectId, ObjectIntent, ObjectType, RoomObjectPatch, RoomObjectSnapshot};

use super::{RoomProcessorStep, acting_structure, lab_mineral};
use crate::context::RoomProcessorContext;
use crate::error::ProcessorError;
use crate::events::RoomEvent;
use crate::stats;

/// Global user counter credited by processed power.
const POWER_FIELD: &str = "power";

/// The acting structure of `intent` when it is also off cooldown.
fn ready_structure(
    ctx: &RoomProcessorContext<'_>,
    intent: &ObjectIntent,
    object_type: ObjectType,
) -> Result<Option<RoomObjectSnapshot>, ProcessorError> {
    let game_time = ctx.game_time();
    Ok(acting_structure(ctx, intent, object_type)?.filter(|s| !s.on_cooldown(game_time)))
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Sends energy between links in the same room.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkStep;

impl RoomProcessorStep for LinkStep {
    fn name(&self) -> &'static str {
        "link"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        for intent in ctx.intents().named(names::TRANSFER_ENERGY) {
            let Some(argument) = intent.record.first() else {
                continue;
            };
            let Some(target_id) = argument.object_id("id") else {
                continue;
            };
            let Some(link) = ready_structure(ctx, intent, ObjectType::Link)? else {
                continue;
            };
            let Some(target) = ctx.object(&target_id)?.filter(|t| {
                t.object_type == ObjectType::Link && t.id != link.id && t.user == link.user
            }) else {
                continue;
            };

            let held = link.store_amount(ENERGY);
            let amount = argument
                .integer("amount")
                .unwrap_or(held)
                .min(held)
                .min(target.store_free_capacity(ENERGY));
            if amount <= 0 {
                continue;
            }
            let loss = ceil_div(amount.saturating_mul(LINK_LOSS_RATIO_PERCENT), 100);
            let received = amount.saturating_sub(loss);
            let range = link.position().range_to(target.position());

            ctx.patch(
                &link.id,
                RoomObjectPatch {
                    cooldown_time: Some(ctx.game_time().saturating_add(u64::from(range))),
                    ..RoomObjectPatch::store_entry(ENERGY, held.saturating_sub(amount))
                },
            );
            ctx.patch(
                &target.id,
                RoomObjectPatch::store_entry(
                    ENERGY,
                    target.store_amount(ENERGY).saturating_add(received),
                ),
            );
            ctx.log_event(RoomEvent::Transfer {
                object_id: link.id.clone(),
                target_id: target.id.clone(),
                resource_type: ENERGY.to_owned(),
                amount: received,
            });
        }
        Ok(())
    }
}

fn ceil_div(value: i64, divisor: i64) -> i64 {
    let quotient = value.checked_div(divisor).unwrap_or(0);
    if value.checked_rem(divisor).unwrap_or(0) > 0 {
        quotient.saturating_add(1)
    } else {
        quotient
    }
}

// ---------------------------------------------------------------------------
// Labs
// ---------------------------------------------------------------------------

/// Runs lab reactions into the acting lab.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabStep;

impl RoomProcessorStep for LabStep {
    fn name(&self) -> &'static str {
        "lab"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        for intent in ctx.intents().named(names::RUN_REACTION) {
            let Some(argument) = intent.record.first() else {
                continue;
            };
            let (Some(first_id), Some(second_id)) =
                (argument.object_id("lab1"), argument.object_id("lab2"))
            else {
                continue;
            };
            let Some(output) = ready_structure(ctx, intent, ObjectType::Lab)? else {
                continue;
            };
            let Some(first) = reagent_lab(ctx, &output, &first_id)? else {
                continue;
            };
            let Some(second) = reagent_lab(ctx, &output, &second_id)? else {
                continue;
            };
            if first.id == second.id {
                continue;
            }
            let (Some((first_mineral, first_amount)), Some((second_mineral, second_amount))) =
                (lab_mineral(&first), lab_mineral(&second))
            else {
                continue;
            };
            if first_amount < LAB_REACTION_AMOUNT || second_amount < LAB_REACTION_AMOUNT {
                continue;
            }
            let Some(product) = reaction_product(first_mineral, second_mineral) else {
                continue;
            };
            let produced = match lab_mineral(&output) {
                None => LAB_REACTION_AMOUNT,
                Some((held, amount)) if held == product => {
                    amount.saturating_add(LAB_REACTION_AMOUNT)
                }
                Some(_) => continue,
            };
            if produced > LAB_MINERAL_CAPACITY {
                continue;
            }

            let cooldown = reaction_time(product).unwrap_or(0);
            ctx.patch(
                &first.id,
                RoomObjectPatch::store_entry(
                    first_mineral,
                    first_amount.saturating_sub(LAB_REACTION_AMOUNT),
                ),
            );
            ctx.patch(
                &second.id,
                RoomObjectPatch::store_entry(
                    second_mineral,
                    second_amount.saturating_sub(LAB_REACTION_AMOUNT),
                ),
            );
            ctx.patch(
                &output.id,
                RoomObjectPatch {
                    cooldown_time: Some(ctx.game_time().saturating_add(cooldown)),
                    ..RoomObjectPatch::store_entry(product, produced)
                },
            );
        }
        Ok(())
    }
}

fn reagent_lab(
    ctx: &RoomProcessorContext<'_>,
    output: &RoomObjectSnapshot,
    id: &ObjectId,
) -> Result<Option<RoomObjectSnapshot>, ProcessorError> {
    Ok(ctx.object(id)?.filter(|lab| {
        lab.object_type == ObjectType::Lab
            && lab.id != output.id
            && lab.user == output.user
            && ctx.is_active(lab)
            && lab.position().in_range(output.position(), LAB_REACTION_RANGE)
    }))
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

/// Produces commodities from factory recipes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FactoryStep;

impl RoomProcessorStep for FactoryStep {
    fn name(&self) -> &'static str {
        "factory"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        for intent in ctx.intents().named(names::PRODUCE) {
            let Some(recipe) = intent
                .record
                .first()
                .and_then(|a| a.text("resourceType"))
                .and_then(factory_recipe)
            else {
                continue;
            };
            let Some(factory) = ready_structure(ctx, intent, ObjectType::Factory)? else {
                continue;
            };
            let has_components = recipe
                .components
                .iter()
                .all(|(resource, amount)| factory.store_amount(resource) >= *amount);
            if !has_components {
                continue;
            }
            let consumed = recipe
                .components
                .iter()
                .fold(0_i64, |acc, (_, amount)| acc.saturating_add(*amount));
            let room = factory.store_free_capacity(recipe.product).saturating_add(consumed);
            if room < recipe.amount {
                continue;
            }

            let mut patch = RoomObjectPatch {
                cooldown_time: Some(ctx.game_time().saturating_add(recipe.cooldown)),
                ..RoomObjectPatch::default()
            };
            for (resource, amount) in recipe.components {
                patch.set_store(*resource, factory.store_amount(resource).saturating_sub(*amount));
            }
            patch.set_store(
                recipe.product,
                factory.store_amount(recipe.product).saturating_add(recipe.amount),
            );
            ctx.patch(&factory.id, patch);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Power spawns
// ---------------------------------------------------------------------------

/// Burns power for the owner's global power total.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerSpawnStep;

impl RoomProcessorStep for PowerSpawnStep {
    fn name(&self) -> &'static str {
        "power-spawn"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        for intent in ctx.intents().named(names::PROCESS_POWER) {
            let Some(spawn) = acting_structure(ctx, intent, ObjectType::PowerSpawn)? else {
                continue;
            };
            let power = spawn.store_amount(POWER);
            let energy = spawn.store_amount(ENERGY);
            if power < 1 || energy < POWER_SPAWN_ENERGY_RATIO {
                continue;
            }
            let Some(global) = ctx.global() else {
                tracing::warn!(
                    room = %ctx.room(),
                    tick = ctx.game_time(),
                    object_id = %spawn.id,
                    "No global writer, skipping processPower"
                );
                continue;
            };

            let mut patch = RoomObjectPatch::store_entry(POWER, power.saturating_sub(1));
            patch.set_store(ENERGY, energy.saturating_sub(POWER_SPAWN_ENERGY_RATIO));
            ctx.patch(&spawn.id, patch);
            global.increment_user(&intent.user, POWER_FIELD, 1);
            ctx.record_stat(&intent.user, stats::POWER_PROCESSED, 1);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Nukers
// ---------------------------------------------------------------------------

/// Launches nukes at other rooms.
#[derive(Debug, Clone, Copy, Default)]
pub struct NukerStep;

impl RoomProcessorStep for NukerStep {
    fn name(&self) -> &'static str {
        "nuker"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        for intent in ctx.intents().named(names::LAUNCH_NUKE) {
            let Some(argument) = intent.record.first() else {
                continue;
            };
            let Some(target) = target_room(argument) else {
                continue;
            };
            let coordinate = |field: &str| argument.integer(field).and_then(|v| u8::try_from(v).ok());
            let (Some(x), Some(y)) = (coordinate("x"), coordinate("y")) else {
                continue;
            };
            let Some(nuker) = ready_structure(ctx, intent, ObjectType::Nuker)? else {
                continue;
            };
            let energy = nuker.store_amount(ENERGY);
            let ghodium = nuker.store_amount(GHODIUM);
            if energy < NUKER_ENERGY_CAPACITY || ghodium < NUKER_GHODIUM_CAPACITY {
                continue;
            }
            if !ctx
                .room()
                .linear_distance(&target)
                .is_some_and(|d| d <= NUKE_RANGE)
            {
                continue;
            }
            let Some(global) = ctx.global() else {
                tracing::warn!(
                    room = %ctx.room(),
                    tick = ctx.game_time(),
                    object_id = %nuker.id,
                    "No global writer, skipping launchNuke"
                );
                continue;
            };

            let game_time = ctx.game_time();
            let mut patch = RoomObjectPatch {
                cooldown_time: Some(game_time.saturating_add(NUKER_COOLDOWN)),
                ..RoomObjectPatch::store_entry(
                    ENERGY,
                    energy.saturating_sub(NUKER_ENERGY_CAPACITY),
                )
            };
            patch.set_store(GHODIUM, ghodium.saturating_sub(NUKER_GHODIUM_CAPACITY));
            ctx.patch(&nuker.id, patch);

            let id = ctx.next_object_id();
            let mut nuke = RoomObjectSnapshot::new(id, ObjectType::Nuke, target.clone(), x, y);
            nuke.user = Some(intent.user.clone());
            nuke.land_time = Some(game_time.saturating_add(NUKE_LAND_TIME));
            nuke.launch_room_name = Some(ctx.room().clone());
            global.upsert_room_object(nuke);
            tracing::info!(
                room = %ctx.room(),
                tick = game_time,
                user_id = %intent.user,
                target_room = %target,
                "Nuke launched"
            );
        }
        Ok(())
    }
}
