//! Typed intent records.
//!
//! Player code submits loosely-typed JSON. The snapshot builder converts it
//! exactly once into the closed [`IntentFieldValue`] variant so every
//! validator and processor step can pattern match instead of probing types
//! at runtime.

use std::collections::BTreeMap;

use crate::enums::{BodyPartType, Direction};
use crate::ids::{ObjectId, RoomName, UserId};

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// A single typed intent argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum IntentFieldValue {
    /// A string.
    Text(String),
    /// A number. All JSON numbers arrive as `f64`.
    Number(f64),
    /// A boolean.
    Boolean(bool),
    /// An array of strings.
    TextArray(Vec<String>),
    /// An array of numbers.
    NumberArray(Vec<f64>),
    /// A creep body, every entry a known part.
    BodyPartArray(Vec<BodyPartType>),
}

impl IntentFieldValue {
    /// Short name of the variant, used in logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::TextArray(_) => "text-array",
            Self::NumberArray(_) => "number-array",
            Self::BodyPartArray(_) => "body-part-array",
        }
    }
}

/// Convert a finite, integral-valued float into an `i64`.
#[allow(clippy::cast_possible_truncation)]
fn float_to_i64(value: f64) -> Option<i64> {
    // 2^63 as f64; larger magnitudes do not fit.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if !value.is_finite() {
        return None;
    }
    let rounded = value.trunc();
    if rounded >= LIMIT || rounded < -LIMIT {
        return None;
    }
    Some(rounded as i64)
}

// ---------------------------------------------------------------------------
// Arguments and records
// ---------------------------------------------------------------------------

/// One argument object of an intent: field name to typed value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntentArgument {
    /// Typed fields.
    pub fields: BTreeMap<String, IntentFieldValue>,
}

impl IntentArgument {
    /// An empty argument.
    pub const fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: IntentFieldValue) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    /// Raw access to a field.
    pub fn get(&self, field: &str) -> Option<&IntentFieldValue> {
        self.fields.get(field)
    }

    /// A text field.
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field)? {
            IntentFieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// A numeric field as a float.
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.fields.get(field)? {
            IntentFieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// A numeric field truncated to an integer.
    pub fn integer(&self, field: &str) -> Option<i64> {
        self.number(field).and_then(float_to_i64)
    }

    /// A boolean field.
    pub fn boolean(&self, field: &str) -> Option<bool> {
        match self.fields.get(field)? {
            IntentFieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// A text array field.
    pub fn text_array(&self, field: &str) -> Option<&[String]> {
        match self.fields.get(field)? {
            IntentFieldValue::TextArray(v) => Some(v),
            _ => None,
        }
    }

    /// A number array field.
    pub fn number_array(&self, field: &str) -> Option<&[f64]> {
        match self.fields.get(field)? {
            IntentFieldValue::NumberArray(v) => Some(v),
            _ => None,
        }
    }

    /// A body part array field.
    pub fn body_parts(&self, field: &str) -> Option<&[BodyPartType]> {
        match self.fields.get(field)? {
            IntentFieldValue::BodyPartArray(v) => Some(v),
            _ => None,
        }
    }

    /// A text field parsed as an object id.
    pub fn object_id(&self, field: &str) -> Option<ObjectId> {
        self.text(field).map(ObjectId::from)
    }

    /// A numeric field parsed as a direction.
    pub fn direction(&self, field: &str) -> Option<Direction> {
        let n = self.integer(field)?;
        Direction::from_number(u8::try_from(n).ok()?)
    }

    /// A number array parsed as directions; any invalid entry fails.
    pub fn directions(&self, field: &str) -> Option<Vec<Direction>> {
        self.number_array(field)?
            .iter()
            .map(|n| {
                let n = float_to_i64(*n)?;
                Direction::from_number(u8::try_from(n).ok()?)
            })
            .collect()
    }
}

/// One named intent with its argument list.
///
/// Most intents carry exactly one argument object. A room object acts once
/// per intent name per tick, so room steps read [`IntentRecord::first`];
/// global intents given as an array are split into one record per entry
/// when they are typed.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentRecord {
    /// Intent name, e.g. `createCreep`.
    pub name: String,
    /// Ordered arguments.
    pub arguments: Vec<IntentArgument>,
}

impl IntentRecord {
    /// A record with a single argument.
    pub fn single(name: impl Into<String>, argument: IntentArgument) -> Self {
        Self {
            name: name.into(),
            arguments: vec![argument],
        }
    }

    /// The first argument, if any.
    pub fn first(&self) -> Option<&IntentArgument> {
        self.arguments.first()
    }

    /// One single-argument record per argument, in order.
    pub fn split(self) -> impl Iterator<Item = Self> {
        let Self { name, arguments } = self;
        arguments
            .into_iter()
            .map(move |argument| Self::single(name.clone(), argument))
    }
}

// ---------------------------------------------------------------------------
// Intent units
// ---------------------------------------------------------------------------

/// The unit of room intent validation: one record issued to one object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectIntent {
    /// Issuing user.
    pub user: UserId,
    /// Acting object.
    pub object_id: ObjectId,
    /// The intent.
    pub record: IntentRecord,
}

/// The unit of global intent validation.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalUserIntent {
    /// Issuing user.
    pub user: UserId,
    /// The intent.
    pub record: IntentRecord,
}

/// All intents submitted for one room and tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoomIntentSnapshot {
    /// Intents grouped by user, then by acting object.
    pub users: BTreeMap<UserId, BTreeMap<ObjectId, Vec<IntentRecord>>>,
}

impl RoomIntentSnapshot {
    /// Flatten into validation units in deterministic (user, object,
    /// submission) order.
    pub fn flatten(&self) -> Vec<ObjectIntent> {
        self.users
            .iter()
            .flat_map(|(user, objects)| {
                objects.iter().flat_map(move |(object_id, records)| {
                    records.iter().map(move |record| ObjectIntent {
                        user: user.clone(),
                        object_id: object_id.clone(),
                        record: record.clone(),
                    })
                })
            })
            .collect()
    }

    /// Add one intent.
    pub fn push(&mut self, user: UserId, object_id: ObjectId, record: IntentRecord) {
        self.users
            .entry(user)
            .or_default()
            .entry(object_id)
            .or_default()
            .push(record);
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.users
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Whether no intents were submitted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validated intents of one room, indexed by acting object.
#[derive(Debug, Clone, Default)]
pub struct IntentIndex {
    by_object: BTreeMap<ObjectId, Vec<ObjectIntent>>,
}

impl IntentIndex {
    /// Index validated intents, keeping their order per object.
    pub fn new(intents: Vec<ObjectIntent>) -> Self {
        let mut by_object: BTreeMap<ObjectId, Vec<ObjectIntent>> = BTreeMap::new();
        for intent in intents {
            by_object
                .entry(intent.object_id.clone())
                .or_default()
                .push(intent);
        }
        Self { by_object }
    }

    /// Intents of one object.
    pub fn for_object(&self, id: &ObjectId) -> &[ObjectIntent] {
        self.by_object.get(id).map_or(&[], Vec::as_slice)
    }

    /// Every `(object, intent)` whose name is `name`, in object id order.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ObjectIntent> + 'a {
        self.by_object
            .values()
            .flatten()
            .filter(move |i| i.record.name == name)
    }

    /// The first intent called `name` issued to `id`.
    pub fn find(&self, id: &ObjectId, name: &str) -> Option<&ObjectIntent> {
        self.for_object(id).iter().find(|i| i.record.name == name)
    }

    /// Total number of indexed intents.
    pub fn len(&self) -> usize {
        self.by_object.values().map(Vec::len).sum()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.by_object.is_empty()
    }
}

/// Room an intent refers to when it names a remote target (nukes,
/// observers).
pub fn target_room(argument: &IntentArgument) -> Option<RoomName> {
    argument.text("roomName").map(RoomName::from)
}

/// Intent names understood by the engine.
pub mod names {
    /// Spawn: build a new creep.
    pub const CREATE_CREEP: &str = "createCreep";
    /// Spawn: extend an adjacent creep's life.
    pub const RENEW_CREEP: &str = "renewCreep";
    /// Spawn: recycle an adjacent creep.
    pub const RECYCLE_CREEP: &str = "recycleCreep";
    /// Spawn: change exit directions of the creep being spawned.
    pub const SET_SPAWN_DIRECTIONS: &str = "setSpawnDirections";
    /// Creep: move resources into a target.
    pub const TRANSFER: &str = "transfer";
    /// Creep: take resources out of a target.
    pub const WITHDRAW: &str = "withdraw";
    /// Creep: pick up a dropped resource.
    pub const PICKUP: &str = "pickup";
    /// Creep: drop carried resources.
    pub const DROP: &str = "drop";
    /// Creep: harvest a source or mineral.
    pub const HARVEST: &str = "harvest";
    /// Creep: upgrade a controller.
    pub const UPGRADE_CONTROLLER: &str = "upgradeController";
    /// Creep: step in a direction.
    pub const MOVE: &str = "move";
    /// Creep: step toward a tile.
    pub const MOVE_TO: &str = "moveTo";
    /// Link: send energy to another link.
    pub const TRANSFER_ENERGY: &str = "transferEnergy";
    /// Tower: damage a target.
    pub const ATTACK: &str = "attack";
    /// Tower: heal a creep.
    pub const HEAL: &str = "heal";
    /// Tower: repair a structure.
    pub const REPAIR: &str = "repair";
    /// Lab: combine two source labs.
    pub const RUN_REACTION: &str = "runReaction";
    /// Factory: produce a commodity.
    pub const PRODUCE: &str = "produce";
    /// Power spawn: process one unit of power.
    pub const PROCESS_POWER: &str = "processPower";
    /// Nuker: launch at a remote tile.
    pub const LAUNCH_NUKE: &str = "launchNuke";

    /// Market: list a new order.
    pub const CREATE_ORDER: &str = "createOrder";
    /// Market: change the price of an order.
    pub const CHANGE_ORDER_PRICE: &str = "changeOrderPrice";
    /// Market: cancel an order.
    pub const CANCEL_ORDER: &str = "cancelOrder";
    /// Market: add amount to an order.
    pub const EXTEND_ORDER: &str = "extendOrder";
    /// Power creeps: create a new power creep.
    pub const CREATE_POWER_CREEP: &str = "createPowerCreep";
    /// Power creeps: rename an unspawned power creep.
    pub const RENAME_POWER_CREEP: &str = "renamePowerCreep";
    /// Power creeps: schedule or cancel deletion.
    pub const DELETE_POWER_CREEP: &str = "deletePowerCreep";
    /// Power creeps: raise the level by one.
    pub const UPGRADE_POWER_CREEP: &str = "upgradePowerCreep";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accessors_match_variants_only() {
        let arg = IntentArgument::new()
            .with("id", IntentFieldValue::Text("abc".into()))
            .with("amount", IntentFieldValue::Number(42.7))
            .with("directions", IntentFieldValue::NumberArray(vec![1.0, 5.0]));
        assert_eq!(arg.text("id"), Some("abc"));
        assert_eq!(arg.integer("amount"), Some(42));
        assert_eq!(arg.text("amount"), None);
        assert_eq!(
            arg.directions("directions").unwrap(),
            vec![Direction::Top, Direction::Bottom]
        );
    }

    #[test]
    fn invalid_direction_entries_fail_whole_array() {
        let arg = IntentArgument::new()
            .with("directions", IntentFieldValue::NumberArray(vec![1.0, 12.0]));
        assert!(arg.directions("directions").is_none());
    }

    #[test]
    fn flatten_is_ordered_by_user_then_object() {
        let mut snap = RoomIntentSnapshot::default();
        let rec = |n: &str| IntentRecord::single(n, IntentArgument::new());
        snap.push(UserId::from("u2"), ObjectId::from("a"), rec("move"));
        snap.push(UserId::from("u1"), ObjectId::from("b"), rec("harvest"));
        snap.push(UserId::from("u1"), ObjectId::from("a"), rec("drop"));
        let names: Vec<_> = snap
            .flatten()
            .into_iter()
            .map(|i| i.record.name)
            .collect();
        assert_eq!(names, vec!["drop", "harvest", "move"]);
        assert_eq!(snap.len(), 3);
    }

    #[test]
    fn index_groups_by_object() {
        let intent = |obj: &str, name: &str| ObjectIntent {
            user: UserId::from("u1"),
            object_id: ObjectId::from(obj),
            record: IntentRecord::single(name, IntentArgument::new()),
        };
        let index = IntentIndex::new(vec![
            intent("a", "move"),
            intent("b", "move"),
            intent("a", "harvest"),
        ]);
        assert_eq!(index.for_object(&ObjectId::from("a")).len(), 2);
        assert_eq!(index.named("move").count(), 2);
        assert!(index.find(&ObjectId::from("b"), "harvest").is_none());
        assert!(index.for_object(&ObjectId::from("zz")).is_empty());
    }
}
