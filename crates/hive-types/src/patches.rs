//! Sparse patch types for every persisted document kind.
//!
//! A patch carries only the fields a step wants to change. Each field is
//! independently optional and [`has_changes`] is the OR of every field
//! being present, so an all-absent patch is recognised as a no-op and never
//! reaches the dispatcher.
//!
//! Three field flavours exist:
//!
//! - **set** fields (`Option<T>`): present means "write this value".
//! - **clear** fields (`Option<Option<T>>`): `Some(None)` removes the field
//!   from the stored document.
//! - **merge** fields (`Option<BTreeMap<String, i64>>`): per-key entries
//!   merged into a map such as `store`, written as dotted paths so two
//!   patches touching different resources never overwrite each other.
//!
//! [`has_changes`]: RoomObjectPatch::has_changes

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::enums::{MoneyLogType, OrderType, RoomStatus};
use crate::ids::{ObjectId, OrderId, RoomName, UserId};
use crate::snapshot::{BodyPart, Effect, InterRoom, PowerLevel, Reservation, Sign, SpawningState};

// ---------------------------------------------------------------------------
// Field changes
// ---------------------------------------------------------------------------

/// Storage-neutral description of a patch: dotted paths to set or unset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldChanges {
    /// Paths to overwrite with a value.
    pub set: Map<String, Value>,
    /// Paths to remove.
    pub unset: Vec<String>,
}

impl FieldChanges {
    /// Whether nothing would be written.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    /// Fold `other` into `self`; later paths win.
    pub fn merge(&mut self, other: Self) {
        for path in other.unset {
            self.set.remove(&path);
            if !self.unset.contains(&path) {
                self.unset.push(path);
            }
        }
        for (path, value) in other.set {
            self.unset.retain(|p| p != &path);
            self.set.insert(path, value);
        }
    }

    /// Apply the changes to a JSON document in place.
    pub fn apply_to_value(&self, document: &mut Value) {
        for path in &self.unset {
            unset_path(document, path);
        }
        for (path, value) in &self.set {
            set_path(document, path, value.clone());
        }
    }

    /// Apply the changes to a typed document, round-tripping through JSON.
    pub fn apply_to<T>(&self, target: &T) -> Result<T, serde_json::Error>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut value = serde_json::to_value(target)?;
        self.apply_to_value(&mut value);
        serde_json::from_value(value)
    }
}

fn set_path(document: &mut Value, path: &str, value: Value) {
    let mut current = document;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_owned(), value);
            return;
        }
        current = map
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

fn unset_path(document: &mut Value, path: &str) {
    let mut current = document;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.remove(segment);
            return;
        }
        match map.get_mut(segment) {
            Some(next) => current = next,
            None => return,
        }
    }
}

// ---------------------------------------------------------------------------
// Patch macro
// ---------------------------------------------------------------------------

/// Generates a sparse patch struct with `has_changes`, `merge` and
/// `to_field_changes`.
macro_rules! define_patch {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            set {
                $( $(#[$sdoc:meta])* $sfield:ident : $sty:ty => $skey:literal, )*
            }
            clear {
                $( $(#[$cdoc:meta])* $cfield:ident : $cty:ty => $ckey:literal, )*
            }
            merge {
                $( $(#[$mdoc:meta])* $mfield:ident => $mkey:literal, )*
            }
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct $name {
            $( $(#[$sdoc])* pub $sfield: Option<$sty>, )*
            $( $(#[$cdoc])* pub $cfield: Option<Option<$cty>>, )*
            $( $(#[$mdoc])* pub $mfield: Option<BTreeMap<String, i64>>, )*
        }

        impl $name {
            /// Whether any field is present.
            pub const fn has_changes(&self) -> bool {
                false
                    $( || self.$sfield.is_some() )*
                    $( || self.$cfield.is_some() )*
                    $( || self.$mfield.is_some() )*
            }

            /// Fold a later patch into this one. Present fields of `other`
            /// win; map entries merge per key.
            pub fn merge(&mut self, other: Self) {
                $(
                    if other.$sfield.is_some() {
                        self.$sfield = other.$sfield;
                    }
                )*
                $(
                    if other.$cfield.is_some() {
                        self.$cfield = other.$cfield;
                    }
                )*
                $(
                    if let Some(entries) = other.$mfield {
                        self.$mfield.get_or_insert_with(BTreeMap::new).extend(entries);
                    }
                )*
            }

            /// Lower the patch into storage-neutral field changes.
            pub fn to_field_changes(&self) -> Result<FieldChanges, serde_json::Error> {
                let mut changes = FieldChanges::default();
                $(
                    if let Some(value) = &self.$sfield {
                        changes.set.insert($skey.to_owned(), serde_json::to_value(value)?);
                    }
                )*
                $(
                    match &self.$cfield {
                        Some(Some(value)) => {
                            changes.set.insert($ckey.to_owned(), serde_json::to_value(value)?);
                        }
                        Some(None) => changes.unset.push($ckey.to_owned()),
                        None => {}
                    }
                )*
                $(
                    if let Some(entries) = &self.$mfield {
                        for (key, amount) in entries {
                            changes
                                .set
                                .insert(format!("{}.{key}", $mkey), Value::from(*amount));
                        }
                    }
                )*
                Ok(changes)
            }

            /// Apply the patch to a typed document.
            pub fn apply_to<T>(&self, target: &T) -> Result<T, serde_json::Error>
            where
                T: Serialize + DeserializeOwned,
            {
                self.to_field_changes()?.apply_to(target)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Patch types
// ---------------------------------------------------------------------------

define_patch! {
    /// Sparse update of a room object.
    pub struct RoomObjectPatch {
        set {
            /// Room (after an inter-room move).
            room: RoomName => "room",
            /// Column.
            x: u8 => "x",
            /// Row.
            y: u8 => "y",
            /// Name.
            name: String => "name",
            /// Hit points.
            hits: i64 => "hits",
            /// Maximum hit points.
            hits_max: i64 => "hitsMax",
            /// Shared store capacity.
            store_capacity: i64 => "storeCapacity",
            /// Creep body.
            body: Vec<BodyPart> => "body",
            /// Fatigue.
            fatigue: i64 => "fatigue",
            /// Death-by-age time.
            age_time: u64 => "ageTime",
            /// Whether the creep is still spawning.
            spawning: bool => "spawning",
            /// Controller level.
            level: u32 => "level",
            /// Controller progress.
            progress: i64 => "progress",
            /// Controller downgrade time.
            downgrade_time: u64 => "downgradeTime",
            /// Safe mode activations left.
            safe_mode_available: u32 => "safeModeAvailable",
            /// Cooldown end.
            cooldown_time: u64 => "cooldownTime",
            /// Source energy.
            energy: i64 => "energy",
            /// Source capacity.
            energy_capacity: i64 => "energyCapacity",
            /// Mineral amount.
            mineral_amount: i64 => "mineralAmount",
            /// Next decay hit.
            next_decay_time: u64 => "nextDecayTime",
            /// Disappearance time.
            decay_time: u64 => "decayTime",
            /// Dropped pile amount.
            amount: i64 => "amount",
            /// Power bank power.
            power: i64 => "power",
            /// Active effects.
            effects: Vec<Effect> => "effects",
        }
        clear {
            /// Owner.
            user: UserId => "user",
            /// Spawn production state.
            spawning_state: SpawningState => "spawningState",
            /// Safe mode end.
            safe_mode: u64 => "safeMode",
            /// Controller reservation.
            reservation: Reservation => "reservation",
            /// Controller sign.
            sign: Sign => "sign",
            /// Pending cross-room move.
            inter_room: InterRoom => "interRoom",
            /// Source refill time.
            next_regeneration_time: u64 => "nextRegenerationTime",
        }
        merge {
            /// Store entries keyed by resource.
            store => "store",
            /// Per-resource capacities.
            store_capacity_resource => "storeCapacityResource",
        }
    }
}

impl RoomObjectPatch {
    /// Set one store entry.
    pub fn set_store(&mut self, resource: impl Into<String>, amount: i64) {
        self.store
            .get_or_insert_with(BTreeMap::new)
            .insert(resource.into(), amount);
    }

    /// A patch that only sets one store entry.
    pub fn store_entry(resource: impl Into<String>, amount: i64) -> Self {
        let mut patch = Self::default();
        patch.set_store(resource, amount);
        patch
    }
}

define_patch! {
    /// Sparse update of a room's metadata.
    pub struct RoomInfoPatch {
        set {
            /// Lifecycle status.
            status: RoomStatus => "status",
            /// Controller level.
            controller_level: u32 => "controllerLevel",
            /// Activity flag.
            active: bool => "active",
        }
        clear {
            /// Controller owner.
            owner: UserId => "owner",
            /// Safe mode end.
            safe_mode: u64 => "safeMode",
        }
        merge {}
    }
}

define_patch! {
    /// Sparse update of a user. `money` is the absolute new balance.
    pub struct UserPatch {
        set {
            /// Credit balance.
            money: Decimal => "money",
            /// Processed power total.
            power: i64 => "power",
            /// Power experimentations left.
            power_experimentations: u32 => "powerExperimentations",
        }
        clear {
            /// Power experimentation window end.
            power_experimentation_time: i64 => "powerExperimentationTime",
        }
        merge {}
    }
}

define_patch! {
    /// Sparse update of a market order.
    pub struct MarketOrderPatch {
        set {
            /// Listing flag.
            active: bool => "active",
            /// Unit price in milli-credits.
            price: i64 => "price",
            /// Available amount.
            amount: i64 => "amount",
            /// Remaining amount.
            remaining_amount: i64 => "remainingAmount",
            /// Total amount.
            total_amount: i64 => "totalAmount",
        }
        clear {}
        merge {}
    }
}

define_patch! {
    /// Sparse update of a power creep.
    pub struct PowerCreepPatch {
        set {
            /// Name.
            name: String => "name",
            /// Level.
            level: u32 => "level",
            /// Learned powers.
            powers: BTreeMap<String, PowerLevel> => "powers",
        }
        clear {
            /// Scheduled deletion time.
            delete_time: i64 => "deleteTime",
            /// Spawn cooldown end.
            spawn_cooldown_time: i64 => "spawnCooldownTime",
        }
        merge {}
    }
}

// ---------------------------------------------------------------------------
// Ledger records
// ---------------------------------------------------------------------------

/// Order details attached to a market money log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketLogDetails {
    /// Order the entry refers to.
    pub order_id: OrderId,
    /// Order side.
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Traded resource.
    pub resource_type: String,
    /// Terminal room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_name: Option<RoomName>,
    /// Unit price in credits.
    pub price: Decimal,
    /// Amount the fee was charged on.
    pub amount: i64,
}

/// One row of the per-user money ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyLogEntry {
    /// Entry id.
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Wall-clock time in epoch ms.
    pub date: i64,
    /// Game time.
    pub tick: u64,
    /// User whose balance changed.
    pub user: UserId,
    /// Entry type.
    #[serde(rename = "type")]
    pub log_type: MoneyLogType,
    /// Balance after the change.
    pub balance: Decimal,
    /// Signed change.
    pub change: Decimal,
    /// Market details, for market entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<MarketLogDetails>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::enums::ObjectType;
    use crate::snapshot::RoomObjectSnapshot;

    #[test]
    fn empty_patch_has_no_changes() {
        assert!(!RoomObjectPatch::default().has_changes());
        assert!(!UserPatch::default().has_changes());
        assert!(!MarketOrderPatch::default().has_changes());
        assert!(!PowerCreepPatch::default().has_changes());
        assert!(!RoomInfoPatch::default().has_changes());
        assert!(
            RoomObjectPatch::default()
                .to_field_changes()
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn any_single_field_counts_as_change() {
        let patch = RoomObjectPatch {
            spawning_state: Some(None),
            ..RoomObjectPatch::default()
        };
        assert!(patch.has_changes());
        let patch = RoomObjectPatch::store_entry("energy", 0);
        assert!(patch.has_changes());
    }

    #[test]
    fn merge_keeps_both_fields() {
        let mut first = RoomObjectPatch {
            hits: Some(100),
            ..RoomObjectPatch::default()
        };
        first.merge(RoomObjectPatch::store_entry("energy", 50));
        assert_eq!(first.hits, Some(100));
        assert_eq!(first.store.as_ref().unwrap().get("energy"), Some(&50));

        let changes = first.to_field_changes().unwrap();
        assert_eq!(changes.set.get("hits"), Some(&json!(100)));
        assert_eq!(changes.set.get("store.energy"), Some(&json!(50)));
    }

    #[test]
    fn later_patch_wins_and_store_merges_per_resource() {
        let mut patch = RoomObjectPatch::store_entry("energy", 10);
        patch.hits = Some(5);
        let mut later = RoomObjectPatch::store_entry("H", 3);
        later.hits = Some(7);
        patch.merge(later);
        let store = patch.store.unwrap();
        assert_eq!(store.get("energy"), Some(&10));
        assert_eq!(store.get("H"), Some(&3));
        assert_eq!(patch.hits, Some(7));
    }

    #[test]
    fn clear_fields_unset_paths() {
        let patch = RoomObjectPatch {
            spawning_state: Some(None),
            ..RoomObjectPatch::default()
        };
        let changes = patch.to_field_changes().unwrap();
        assert_eq!(changes.unset, vec!["spawningState".to_owned()]);
    }

    #[test]
    fn apply_to_typed_object() {
        let mut spawn = RoomObjectSnapshot::new(
            ObjectId::from("s1"),
            ObjectType::Spawn,
            RoomName::from("W1N1"),
            5,
            5,
        );
        spawn.store.insert("energy".into(), 200);
        spawn.spawning_state = Some(SpawningState {
            name: "c".into(),
            need_time: 9,
            spawn_time: 10,
            directions: None,
        });
        let mut patch = RoomObjectPatch::store_entry("energy", 0);
        patch.spawning_state = Some(None);
        let updated = patch.apply_to(&spawn).unwrap();
        assert_eq!(updated.store_amount("energy"), 0);
        assert!(updated.spawning_state.is_none());
    }

    #[test]
    fn field_change_merge_resolves_set_unset_conflicts() {
        let mut a = FieldChanges::default();
        a.unset.push("deleteTime".into());
        let mut b = FieldChanges::default();
        b.set.insert("deleteTime".into(), json!(5));
        a.merge(b);
        assert!(a.unset.is_empty());
        assert_eq!(a.set.get("deleteTime"), Some(&json!(5)));
    }

    #[test]
    fn dotted_paths_create_nested_objects() {
        let mut doc = json!({"_id": "x"});
        let mut changes = FieldChanges::default();
        changes.set.insert("store.energy".into(), json!(12));
        changes.apply_to_value(&mut doc);
        assert_eq!(doc, json!({"_id": "x", "store": {"energy": 12}}));
    }
}
