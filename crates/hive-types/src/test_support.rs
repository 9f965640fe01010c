//! Fixtures shared by the test suites of downstream crates.
//!
//! Enabled for this crate's own tests and, through the `test-support`
//! feature, for other crates' dev-dependencies.

#![allow(clippy::missing_const_for_fn)]

use rust_decimal::Decimal;

use crate::enums::{BodyPartType, ObjectType};
use crate::ids::{ObjectId, RoomName, UserId};
use crate::intents::{IntentArgument, IntentFieldValue, IntentRecord, RoomIntentSnapshot};
use crate::snapshot::{BodyPart, RoomObjectSnapshot, RoomSnapshot, RoomTerrain, UserState};

/// Room every fixture lives in.
pub const ROOM: &str = "W1N1";
/// Default owner.
pub const OWNER: &str = "user1";
/// A second, hostile user.
pub const RIVAL: &str = "user2";

/// The fixture room name.
pub fn room() -> RoomName {
    RoomName::from(ROOM)
}

/// The default owner id.
pub fn owner() -> UserId {
    UserId::from(OWNER)
}

/// The rival id.
pub fn rival() -> UserId {
    UserId::from(RIVAL)
}

/// A bare object in the fixture room.
pub fn object(id: &str, object_type: ObjectType, x: u8, y: u8) -> RoomObjectSnapshot {
    RoomObjectSnapshot::new(ObjectId::from(id), object_type, room(), x, y)
}

/// A controller at `level` owned by `user`.
pub fn controller(id: &str, level: u32, user: Option<&UserId>) -> RoomObjectSnapshot {
    let mut obj = object(id, ObjectType::Controller, 25, 25);
    obj.level = Some(level);
    obj.user = user.cloned();
    obj.progress = Some(0);
    obj.downgrade_time = Some(20_000);
    obj
}

/// An owned spawn holding `energy`.
pub fn spawn(id: &str, user: &UserId, x: u8, y: u8, energy: i64) -> RoomObjectSnapshot {
    let mut obj = object(id, ObjectType::Spawn, x, y);
    obj.user = Some(user.clone());
    obj.name = Some(id.to_owned());
    obj.hits = Some(5000);
    obj.hits_max = Some(5000);
    obj.store.insert("energy".into(), energy);
    obj.store_capacity_resource.insert("energy".into(), 300);
    obj
}

/// An owned extension holding `energy` (capacity 50).
pub fn extension(id: &str, user: &UserId, x: u8, y: u8, energy: i64) -> RoomObjectSnapshot {
    let mut obj = object(id, ObjectType::Extension, x, y);
    obj.user = Some(user.clone());
    obj.hits = Some(1000);
    obj.hits_max = Some(1000);
    obj.store.insert("energy".into(), energy);
    obj.store_capacity_resource.insert("energy".into(), 50);
    obj
}

/// An owned structure of any type with an energy store.
pub fn structure(
    id: &str,
    object_type: ObjectType,
    user: &UserId,
    x: u8,
    y: u8,
    energy: i64,
    capacity: i64,
) -> RoomObjectSnapshot {
    let mut obj = object(id, object_type, x, y);
    obj.user = Some(user.clone());
    obj.hits = Some(1000);
    obj.hits_max = Some(1000);
    obj.store.insert("energy".into(), energy);
    obj.store_capacity_resource.insert("energy".into(), capacity);
    obj
}

/// A live creep with `body`, carry capacity derived from CARRY parts.
pub fn creep(id: &str, user: &UserId, x: u8, y: u8, body: &[BodyPartType]) -> RoomObjectSnapshot {
    let mut obj = object(id, ObjectType::Creep, x, y);
    obj.user = Some(user.clone());
    obj.name = Some(id.to_owned());
    obj.body = body.iter().copied().map(BodyPart::new).collect();
    let parts = i64::try_from(body.len()).unwrap_or(0);
    obj.hits = Some(parts.saturating_mul(100));
    obj.hits_max = Some(parts.saturating_mul(100));
    let carry = body.iter().filter(|p| **p == BodyPartType::Carry).count();
    obj.store_capacity = Some(i64::try_from(carry).unwrap_or(0).saturating_mul(50));
    obj.fatigue = Some(0);
    obj.age_time = Some(1500);
    obj.spawning = Some(false);
    obj
}

/// A full energy source.
pub fn source(id: &str, x: u8, y: u8) -> RoomObjectSnapshot {
    let mut obj = object(id, ObjectType::Source, x, y);
    obj.energy = Some(3000);
    obj.energy_capacity = Some(3000);
    obj
}

/// A user with `money` credits.
pub fn user(id: &UserId, money: Decimal) -> UserState {
    let mut state = UserState::new(id.clone(), id.as_str());
    state.money = money;
    state
}

/// An intent record with one argument built from `(field, value)` pairs.
pub fn intent(name: &str, fields: Vec<(&str, IntentFieldValue)>) -> IntentRecord {
    let argument = fields
        .into_iter()
        .fold(IntentArgument::new(), |arg, (field, value)| arg.with(field, value));
    IntentRecord::single(name, argument)
}

/// Text value shorthand.
pub fn text(value: &str) -> IntentFieldValue {
    IntentFieldValue::Text(value.to_owned())
}

/// Number value shorthand.
pub fn number(value: i32) -> IntentFieldValue {
    IntentFieldValue::Number(f64::from(value))
}

/// Builder for room snapshots used across test suites.
#[derive(Debug, Clone)]
pub struct RoomFixture {
    snapshot: RoomSnapshot,
}

impl RoomFixture {
    /// Empty plain-terrain room at `game_time`.
    pub fn new(game_time: u64) -> Self {
        let mut snapshot = RoomSnapshot::empty(room(), game_time);
        snapshot.terrain = Some(RoomTerrain::plain());
        Self { snapshot }
    }

    /// Add an object.
    #[must_use]
    pub fn with(mut self, object: RoomObjectSnapshot) -> Self {
        self.snapshot.objects.insert(object.id.clone(), object);
        self
    }

    /// Add a user.
    #[must_use]
    pub fn with_user(mut self, state: UserState) -> Self {
        self.snapshot.users.insert(state.id.clone(), state);
        self
    }

    /// Add an intent issued by `user` to `object_id`.
    #[must_use]
    pub fn with_intent(mut self, user: &UserId, object_id: &str, record: IntentRecord) -> Self {
        self.snapshot
            .intents
            .get_or_insert_with(RoomIntentSnapshot::default)
            .push(user.clone(), ObjectId::from(object_id), record);
        self
    }

    /// Replace the terrain.
    #[must_use]
    pub fn with_terrain(mut self, terrain: RoomTerrain) -> Self {
        self.snapshot.terrain = Some(terrain);
        self
    }

    /// Finish the snapshot.
    pub fn build(self) -> RoomSnapshot {
        self.snapshot
    }
}
