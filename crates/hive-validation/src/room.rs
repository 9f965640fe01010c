//! Standard room intent validators.
//!
//! Registered by [`ValidationPipeline::room_default`] in this order:
//!
//! 1. [`IntentSchemaValidator`] -- known intent for the actor type, fields
//!    of the right kind
//! 2. [`ActorValidator`] -- actor exists, is not spawning, has the body
//!    parts and is not tired or cooling down
//! 3. [`OwnershipValidator`] -- actor belongs to the submitting user
//! 4. [`TargetValidator`] -- target exists, has the right type and is in
//!    range
//! 5. [`SafeModeValidator`] -- hostile intents are blocked under another
//!    user's safe mode
//! 6. [`EnergyValidator`] -- fixed energy and resource preconditions
//!
//! [`ValidationPipeline::room_default`]: crate::ValidationPipeline::room_default

use hive_blueprints::constants::{
    LAB_REACTION_RANGE, NUKE_RANGE, NUKER_ENERGY_CAPACITY, NUKER_GHODIUM_CAPACITY,
    POWER_SPAWN_ENERGY_RATIO, TOWER_ENERGY_COST,
};
use hive_types::intents::names;
use hive_types::resources::{ENERGY, GHODIUM, POWER};
use hive_types::{
    BodyPartType, IntentArgument, ObjectIntent, ObjectType, Position, RoomName,
    RoomObjectSnapshot, RoomSnapshot, intents::target_room,
};

use crate::pipeline::{IntentValidator, ValidationPipeline};
use crate::result::{ErrorCode, ValidationResult};
use crate::schema::room_schema;

/// Intents that harm another user.
const HOSTILE_INTENTS: &[&str] = &[names::ATTACK, names::WITHDRAW];

fn actor<'a>(
    intent: &ObjectIntent,
    snapshot: &'a RoomSnapshot,
) -> Result<&'a RoomObjectSnapshot, ErrorCode> {
    snapshot
        .objects
        .get(&intent.object_id)
        .ok_or(ErrorCode::ActorNotFound)
}

fn target<'a>(
    snapshot: &'a RoomSnapshot,
    argument: &IntentArgument,
    field: &str,
) -> Result<&'a RoomObjectSnapshot, ErrorCode> {
    let id = argument.object_id(field).ok_or(ErrorCode::InvalidArgs)?;
    snapshot.objects.get(&id).ok_or(ErrorCode::TargetNotFound)
}

fn in_range(a: &RoomObjectSnapshot, b: &RoomObjectSnapshot, range: u8) -> Result<(), ErrorCode> {
    if a.position().in_range(b.position(), range) {
        Ok(())
    } else {
        Err(ErrorCode::NotInRange)
    }
}

const fn require(condition: bool, code: ErrorCode) -> Result<(), ErrorCode> {
    if condition { Ok(()) } else { Err(code) }
}

fn tile(argument: &IntentArgument) -> Option<Position> {
    let x = i32::try_from(argument.integer("x")?).ok()?;
    let y = i32::try_from(argument.integer("y")?).ok()?;
    Position::from_i32(x, y)
}

/// Run `check` over every argument of the intent.
fn each_argument(
    intent: &ObjectIntent,
    check: impl FnMut(&IntentArgument) -> Result<(), ErrorCode>,
) -> ValidationResult {
    intent.record.arguments.iter().try_for_each(check).into()
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// The intent exists, the actor type may issue it, and every argument
/// carries its required fields with the right kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentSchemaValidator;

impl IntentValidator<ObjectIntent, RoomSnapshot> for IntentSchemaValidator {
    fn name(&self) -> &'static str {
        "intent-schema"
    }

    fn validate(&self, intent: &ObjectIntent, snapshot: &RoomSnapshot) -> ValidationResult {
        let Some(schema) = room_schema(&intent.record.name) else {
            return ValidationResult::Failure(ErrorCode::UnknownIntent);
        };
        if let Some(actor) = snapshot.objects.get(&intent.object_id) {
            if !schema.allows(actor.object_type) {
                return ValidationResult::Failure(ErrorCode::UnknownIntent);
            }
        }
        schema.check_arguments(&intent.record)
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The actor exists and is able to act this tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActorValidator;

impl ActorValidator {
    fn check(intent: &ObjectIntent, snapshot: &RoomSnapshot) -> Result<(), ErrorCode> {
        let actor = actor(intent, snapshot)?;
        let name = intent.record.name.as_str();

        if actor.object_type == ObjectType::Creep {
            require(actor.spawning != Some(true), ErrorCode::Busy)?;
            let needed = match name {
                names::HARVEST | names::UPGRADE_CONTROLLER => Some(BodyPartType::Work),
                names::MOVE | names::MOVE_TO => Some(BodyPartType::Move),
                names::TRANSFER | names::WITHDRAW | names::PICKUP => Some(BodyPartType::Carry),
                _ => None,
            };
            if let Some(part) = needed {
                require(actor.active_parts(part) > 0, ErrorCode::NoBodyPart)?;
            }
            if matches!(name, names::MOVE | names::MOVE_TO) {
                require(actor.fatigue.unwrap_or(0) <= 0, ErrorCode::Tired)?;
            }
        }

        match name {
            names::TRANSFER_ENERGY | names::RUN_REACTION | names::PRODUCE | names::LAUNCH_NUKE => {
                require(!actor.on_cooldown(snapshot.game_time), ErrorCode::Busy)
            }
            names::CREATE_CREEP => require(actor.spawning_state.is_none(), ErrorCode::Busy),
            _ => Ok(()),
        }
    }
}

impl IntentValidator<ObjectIntent, RoomSnapshot> for ActorValidator {
    fn name(&self) -> &'static str {
        "actor"
    }

    fn validate(&self, intent: &ObjectIntent, snapshot: &RoomSnapshot) -> ValidationResult {
        Self::check(intent, snapshot).into()
    }
}

// ---------------------------------------------------------------------------
// Ownership
// ---------------------------------------------------------------------------

/// The actor belongs to the submitting user.
#[derive(Debug, Default, Clone, Copy)]
pub struct OwnershipValidator;

impl IntentValidator<ObjectIntent, RoomSnapshot> for OwnershipValidator {
    fn name(&self) -> &'static str {
        "ownership"
    }

    fn validate(&self, intent: &ObjectIntent, snapshot: &RoomSnapshot) -> ValidationResult {
        actor(intent, snapshot)
            .and_then(|a| require(a.is_owned_by(&intent.user), ErrorCode::NotOwner))
            .into()
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// Targets exist, have a type the intent accepts, and are in range.
#[derive(Debug, Default, Clone, Copy)]
pub struct TargetValidator;

impl TargetValidator {
    #[allow(clippy::too_many_lines)]
    fn check_argument(
        intent: &ObjectIntent,
        actor: &RoomObjectSnapshot,
        argument: &IntentArgument,
        snapshot: &RoomSnapshot,
    ) -> Result<(), ErrorCode> {
        match intent.record.name.as_str() {
            names::TRANSFER => {
                let target = target(snapshot, argument, "id")?;
                require(target.id != actor.id, ErrorCode::InvalidTarget)?;
                in_range(actor, target, 1)?;
                let resource = argument.text("resourceType").ok_or(ErrorCode::InvalidArgs)?;
                require(target.store_capacity_for(resource) > 0, ErrorCode::InvalidTarget)?;
                require(target.store_free_capacity(resource) > 0, ErrorCode::Full)
            }
            names::WITHDRAW => {
                let target = target(snapshot, argument, "id")?;
                require(
                    target.object_type != ObjectType::Creep && target.id != actor.id,
                    ErrorCode::InvalidTarget,
                )?;
                in_range(actor, target, 1)?;
                if let Some(owner) = &target.user {
                    require(*owner == intent.user, ErrorCode::NotOwner)?;
                }
                let resource = argument.text("resourceType").ok_or(ErrorCode::InvalidArgs)?;
                require(target.store_amount(resource) > 0, ErrorCode::NotEnoughResources)
            }
            names::PICKUP => {
                let target = target(snapshot, argument, "id")?;
                require(target.object_type == ObjectType::Resource, ErrorCode::InvalidTarget)?;
                in_range(actor, target, 1)
            }
            names::HARVEST => {
                let target = target(snapshot, argument, "id")?;
                let available = match target.object_type {
                    ObjectType::Source => target.energy.unwrap_or(0),
                    ObjectType::Mineral => target.mineral_amount.unwrap_or(0),
                    _ => return Err(ErrorCode::InvalidTarget),
                };
                in_range(actor, target, 1)?;
                require(available > 0, ErrorCode::NotEnoughResources)
            }
            names::UPGRADE_CONTROLLER => {
                let target = target(snapshot, argument, "id")?;
                require(target.object_type == ObjectType::Controller, ErrorCode::InvalidTarget)?;
                require(target.is_owned_by(&intent.user), ErrorCode::NotOwner)?;
                in_range(actor, target, 3)
            }
            names::RENEW_CREEP | names::RECYCLE_CREEP => {
                let target = target(snapshot, argument, "id")?;
                require(target.object_type == ObjectType::Creep, ErrorCode::InvalidTarget)?;
                require(target.is_owned_by(&intent.user), ErrorCode::NotOwner)?;
                require(target.spawning != Some(true), ErrorCode::Busy)?;
                in_range(actor, target, 1)
            }
            names::TRANSFER_ENERGY => {
                let target = target(snapshot, argument, "id")?;
                require(
                    target.object_type == ObjectType::Link && target.id != actor.id,
                    ErrorCode::InvalidTarget,
                )?;
                require(target.store_free_capacity(ENERGY) > 0, ErrorCode::Full)
            }
            names::ATTACK => {
                let target = target(snapshot, argument, "id")?;
                require(target.hits.is_some(), ErrorCode::InvalidTarget)
            }
            names::HEAL => {
                let target = target(snapshot, argument, "id")?;
                require(target.object_type == ObjectType::Creep, ErrorCode::InvalidTarget)
            }
            names::REPAIR => {
                let target = target(snapshot, argument, "id")?;
                require(
                    target.object_type != ObjectType::Creep && target.hits_max.is_some(),
                    ErrorCode::InvalidTarget,
                )
            }
            names::RUN_REACTION => {
                for field in ["lab1", "lab2"] {
                    let lab = target(snapshot, argument, field)?;
                    require(
                        lab.object_type == ObjectType::Lab && lab.id != actor.id,
                        ErrorCode::InvalidTarget,
                    )?;
                    in_range(actor, lab, LAB_REACTION_RANGE)?;
                }
                Ok(())
            }
            names::MOVE => argument
                .direction("direction")
                .map(|_| ())
                .ok_or(ErrorCode::InvalidArgs),
            names::MOVE_TO => tile(argument).map(|_| ()).ok_or(ErrorCode::InvalidTarget),
            names::LAUNCH_NUKE => {
                tile(argument).ok_or(ErrorCode::InvalidTarget)?;
                let destination = target_room(argument).ok_or(ErrorCode::InvalidArgs)?;
                require(in_nuke_range(&snapshot.room_name, &destination), ErrorCode::NotInRange)
            }
            _ => Ok(()),
        }
    }
}

impl IntentValidator<ObjectIntent, RoomSnapshot> for TargetValidator {
    fn name(&self) -> &'static str {
        "target"
    }

    fn validate(&self, intent: &ObjectIntent, snapshot: &RoomSnapshot) -> ValidationResult {
        let actor = match actor(intent, snapshot) {
            Ok(a) => a,
            Err(code) => return ValidationResult::Failure(code),
        };
        each_argument(intent, |argument| {
            Self::check_argument(intent, actor, argument, snapshot)
        })
    }
}

// ---------------------------------------------------------------------------
// Safe mode
// ---------------------------------------------------------------------------

/// Hostile intents fail while another user's safe mode is active.
#[derive(Debug, Default, Clone, Copy)]
pub struct SafeModeValidator;

impl SafeModeValidator {
    /// Owner of the active safe mode in `snapshot`, if any.
    pub fn safe_mode_owner(snapshot: &RoomSnapshot) -> Option<&hive_types::UserId> {
        let controller = snapshot.controller()?;
        let until = controller.safe_mode.or(snapshot.info.safe_mode)?;
        if until > snapshot.game_time {
            controller.user.as_ref()
        } else {
            None
        }
    }
}

impl IntentValidator<ObjectIntent, RoomSnapshot> for SafeModeValidator {
    fn name(&self) -> &'static str {
        "safe-mode"
    }

    fn validate(&self, intent: &ObjectIntent, snapshot: &RoomSnapshot) -> ValidationResult {
        if !HOSTILE_INTENTS.contains(&intent.record.name.as_str()) {
            return ValidationResult::Success;
        }
        match Self::safe_mode_owner(snapshot) {
            Some(owner) if *owner != intent.user => {
                ValidationResult::Failure(ErrorCode::SafeModeActive)
            }
            _ => ValidationResult::Success,
        }
    }
}

// ---------------------------------------------------------------------------
// Energy
// ---------------------------------------------------------------------------

/// Fixed energy and resource preconditions.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnergyValidator;

impl EnergyValidator {
    fn check(intent: &ObjectIntent, snapshot: &RoomSnapshot) -> Result<(), ErrorCode> {
        let actor = actor(intent, snapshot)?;
        let energy = actor.store_amount(ENERGY);

        match intent.record.name.as_str() {
            names::ATTACK | names::HEAL | names::REPAIR => {
                require(energy >= TOWER_ENERGY_COST, ErrorCode::NotEnoughEnergy)
            }
            names::UPGRADE_CONTROLLER => require(energy > 0, ErrorCode::NotEnoughEnergy),
            names::TRANSFER_ENERGY => {
                let argument = intent.record.first().ok_or(ErrorCode::InvalidArgs)?;
                let amount = argument.integer("amount").unwrap_or(energy);
                require(amount > 0, ErrorCode::InvalidArgs)?;
                require(amount <= energy, ErrorCode::NotEnoughEnergy)
            }
            names::TRANSFER | names::DROP => {
                let argument = intent.record.first().ok_or(ErrorCode::InvalidArgs)?;
                let resource = argument.text("resourceType").ok_or(ErrorCode::InvalidArgs)?;
                let held = actor.store_amount(resource);
                let code = if resource == ENERGY {
                    ErrorCode::NotEnoughEnergy
                } else {
                    ErrorCode::NotEnoughResources
                };
                require(held > 0, code)?;
                if let Some(amount) = argument.integer("amount") {
                    require(amount > 0, ErrorCode::InvalidArgs)?;
                    require(amount <= held, code)?;
                }
                Ok(())
            }
            names::PROCESS_POWER => {
                require(actor.store_amount(POWER) >= 1, ErrorCode::NotEnoughResources)?;
                require(energy >= POWER_SPAWN_ENERGY_RATIO, ErrorCode::NotEnoughEnergy)
            }
            names::LAUNCH_NUKE => {
                require(energy >= NUKER_ENERGY_CAPACITY, ErrorCode::NotEnoughEnergy)?;
                require(
                    actor.store_amount(GHODIUM) >= NUKER_GHODIUM_CAPACITY,
                    ErrorCode::NotEnoughResources,
                )
            }
            _ => Ok(()),
        }
    }
}

impl IntentValidator<ObjectIntent, RoomSnapshot> for EnergyValidator {
    fn name(&self) -> &'static str {
        "energy"
    }

    fn validate(&self, intent: &ObjectIntent, snapshot: &RoomSnapshot) -> ValidationResult {
        Self::check(intent, snapshot).into()
    }
}

impl ValidationPipeline<ObjectIntent, RoomSnapshot> {
    /// The standard room pipeline.
    pub fn room_default() -> Self {
        Self::new()
            .with(IntentSchemaValidator)
            .with(ActorValidator)
            .with(OwnershipValidator)
            .with(TargetValidator)
            .with(SafeModeValidator)
            .with(EnergyValidator)
    }
}

/// Whether `room` is within nuke range of `origin`.
pub fn in_nuke_range(origin: &RoomName, room: &RoomName) -> bool {
    origin
        .linear_distance(room)
        .is_some_and(|d| d <= NUKE_RANGE)
}
