//! Creep resource handling: `transfer`, `withdraw`, `pickup` and `drop`.
//!
//! Amounts are clamped to what the giver holds and what the receiver can
//! take. A request that clamps to zero does nothing.

use hive_types::intents::names;
use hive_types::{ObjectIntent, ObjectType, RoomObjectPatch, RoomObjectSnapshot};

use super::{RoomProcessorStep, acting_creep, free_capacity};
use crate::context::RoomProcessorContext;
use crate::error::ProcessorError;
use crate::events::RoomEvent;

/// Moves resources between creeps, structures and the ground.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreepStoreStep;

impl RoomProcessorStep for CreepStoreStep {
    fn name(&self) -> &'static str {
        "creep-store"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        let intents = ctx.intents();
        for intent in intents.named(names::TRANSFER) {
            transfer(ctx, intent)?;
        }
        for intent in intents.named(names::WITHDRAW) {
            withdraw(ctx, intent)?;
        }
        for intent in intents.named(names::PICKUP) {
            pickup(ctx, intent)?;
        }
        for intent in intents.named(names::DROP) {
            drop_resource(ctx, intent)?;
        }
        Ok(())
    }
}

/// Clamp a requested amount to `held` and `room`.
fn clamp(requested: Option<i64>, held: i64, room: i64) -> i64 {
    requested.unwrap_or(held).min(held).min(room).max(0)
}

fn store_patch(object: &RoomObjectSnapshot, resource: &str, delta: i64) -> RoomObjectPatch {
    RoomObjectPatch::store_entry(resource, object.store_amount(resource).saturating_add(delta))
}

fn transfer(
    ctx: &mut RoomProcessorContext<'_>,
    intent: &ObjectIntent,
) -> Result<(), ProcessorError> {
    let Some(argument) = intent.record.first() else {
        return Ok(());
    };
    let (Some(target_id), Some(resource)) = (argument.object_id("id"), argument.text("resourceType"))
    else {
        return Ok(());
    };
    let Some(creep) = acting_creep(ctx, intent)? else {
        return Ok(());
    };
    let Some(target) = ctx.object(&target_id)? else {
        return Ok(());
    };
    if target.id == creep.id || !creep.position().in_range(target.position(), 1) {
        return Ok(());
    }
    if target.object_type.is_owned_structure() && !ctx.is_active(&target) {
        return Ok(());
    }

    let amount = clamp(
        argument.integer("amount"),
        creep.store_amount(resource),
        free_capacity(&target, resource),
    );
    if amount == 0 {
        return Ok(());
    }
    ctx.patch(&creep.id, store_patch(&creep, resource, amount.saturating_neg()));
    ctx.patch(&target.id, store_patch(&target, resource, amount));
    ctx.log_event(RoomEvent::Transfer {
        object_id: creep.id.clone(),
        target_id: target.id.clone(),
        resource_type: resource.to_owned(),
        amount,
    });
    Ok(())
}

fn withdraw(
    ctx: &mut RoomProcessorContext<'_>,
    intent: &ObjectIntent,
) -> Result<(), ProcessorError> {
    let Some(argument) = intent.record.first() else {
        return Ok(());
    };
    let (Some(target_id), Some(resource)) = (argument.object_id("id"), argument.text("resourceType"))
    else {
        return Ok(());
    };
    let Some(creep) = acting_creep(ctx, intent)? else {
        return Ok(());
    };
    let Some(target) = ctx.object(&target_id)? else {
        return Ok(());
    };
    let withdrawable = target.object_type.is_owned_structure()
        || matches!(
            target.object_type,
            ObjectType::Container | ObjectType::Tombstone | ObjectType::Ruin
        );
    if !withdrawable || !creep.position().in_range(target.position(), 1) {
        return Ok(());
    }

    let amount = clamp(
        argument.integer("amount"),
        target.store_amount(resource),
        creep.store_free_capacity(resource),
    );
    if amount == 0 {
        return Ok(());
    }
    ctx.patch(&target.id, store_patch(&target, resource, amount.saturating_neg()));
    ctx.patch(&creep.id, store_patch(&creep, resource, amount));
    ctx.log_event(RoomEvent::Transfer {
        object_id: target.id.clone(),
        target_id: creep.id.clone(),
        resource_type: resource.to_owned(),
        amount,
    });
    Ok(())
}

fn pickup(ctx: &mut RoomProcessorContext<'_>, intent: &ObjectIntent) -> Result<(), ProcessorError> {
    let Some(pile_id) = intent.record.first().and_then(|a| a.object_id("id")) else {
        return Ok(());
    };
    let Some(creep) = acting_creep(ctx, intent)? else {
        return Ok(());
    };
    let Some(pile) = ctx
        .object(&pile_id)?
        .filter(|o| o.object_type == ObjectType::Resource)
    else {
        return Ok(());
    };
    let Some(resource) = pile.resource_type.as_deref() else {
        return Ok(());
    };
    if !creep.position().in_range(pile.position(), 1) {
        return Ok(());
    }

    let available = pile.amount.unwrap_or(0);
    let amount = clamp(None, available, creep.store_free_capacity(resource));
    if amount == 0 {
        return Ok(());
    }
    ctx.patch(&creep.id, store_patch(&creep, resource, amount));
    if amount >= available {
        ctx.remove(&pile.id);
    } else {
        ctx.patch(
            &pile.id,
            RoomObjectPatch {
                amount: Some(available.saturating_sub(amount)),
                ..RoomObjectPatch::default()
            },
        );
    }
    Ok(())
}

fn drop_resource(
    ctx: &mut RoomProcessorContext<'_>,
    intent: &ObjectIntent,
) -> Result<(), ProcessorError> {
    let Some(argument) = intent.record.first() else {
        return Ok(());
    };
    let Some(resource) = argument.text("resourceType") else {
        return Ok(());
    };
    let Some(creep) = acting_creep(ctx, intent)? else {
        return Ok(());
    };
    let held = creep.store_amount(resource);
    let amount = clamp(argument.integer("amount"), held, held);
    if amount == 0 {
        return Ok(());
    }
    ctx.patch(&creep.id, store_patch(&creep, resource, amount.saturating_neg()));
    ctx.drop_resource(creep.position(), resource, amount)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_types::resources::ENERGY;
    use hive_types::test_support::{self, RoomFixture, intent, number, owner, text};
    use hive_types::{BodyPartType, ObjectId};

    use super::*;
    use crate::room::testing::run_steps;

    fn hauler(energy: i64) -> RoomObjectSnapshot {
        let mut creep = test_support::creep(
            "c1",
            &owner(),
            10,
            10,
            &[BodyPartType::Carry, BodyPartType::Carry, BodyPartType::Move],
        );
        creep.store.insert(ENERGY.into(), energy);
        creep
    }

    fn base() -> RoomFixture {
        RoomFixture::new(50).with(test_support::controller("ctrl", 2, Some(&owner())))
    }

    fn store(run: &crate::room::testing::StepRun, id: &str) -> i64 {
        *run.patch(id).store.as_ref().unwrap().get(ENERGY).unwrap()
    }

    #[test]
    fn transfer_is_clamped_to_free_capacity() {
        let snapshot = base()
            .with(hauler(100))
            .with(test_support::extension("e1", &owner(), 11, 10, 20))
            .with_intent(
                &owner(),
                "c1",
                intent(names::TRANSFER, vec![("id", text("e1")), ("resourceType", text(ENERGY))]),
            )
            .build();
        let run = run_steps(&snapshot, &[&CreepStoreStep]);
        assert_eq!(store(&run, "c1"), 70);
        assert_eq!(store(&run, "e1"), 50);
        assert_eq!(run.events.len(), 1);
    }

    #[test]
    fn withdraw_respects_requested_amount() {
        let mut container = test_support::object("box", ObjectType::Container, 10, 11);
        container.store_capacity = Some(2000);
        container.store.insert(ENERGY.into(), 500);
        let snapshot = base()
            .with(hauler(0))
            .with(container)
            .with_intent(
                &owner(),
                "c1",
                intent(
                    names::WITHDRAW,
                    vec![
                        ("id", text("box")),
                        ("resourceType", text(ENERGY)),
                        ("amount", number(30)),
                    ],
                ),
            )
            .build();
        let run = run_steps(&snapshot, &[&CreepStoreStep]);
        assert_eq!(store(&run, "c1"), 30);
        assert_eq!(store(&run, "box"), 470);
    }

    #[test]
    fn pickup_removes_an_emptied_pile() {
        let mut pile = test_support::object("pile", ObjectType::Resource, 10, 10);
        pile.resource_type = Some(ENERGY.into());
        pile.amount = Some(40);
        let snapshot = base()
            .with(hauler(0))
            .with(pile)
            .with_intent(&owner(), "c1", intent(names::PICKUP, vec![("id", text("pile"))]))
            .build();
        let run = run_steps(&snapshot, &[&CreepStoreStep]);
        assert_eq!(store(&run, "c1"), 40);
        assert!(run.batch.removals.contains(&ObjectId::from("pile")));
    }

    #[test]
    fn drop_creates_a_pile_under_the_creep() {
        let snapshot = base()
            .with(hauler(60))
            .with_intent(
                &owner(),
                "c1",
                intent(names::DROP, vec![("resourceType", text(ENERGY))]),
            )
            .build();
        let run = run_steps(&snapshot, &[&CreepStoreStep]);
        assert_eq!(store(&run, "c1"), 0);
        let pile = run.batch.upserts.values().next().unwrap();
        assert_eq!(pile.amount, Some(60));
        assert_eq!(pile.position(), hive_types::Position::new(10, 10));
    }
}
