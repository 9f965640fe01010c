//! Immutable point-in-time views of world state.
//!
//! Snapshots are built once per tick by the snapshot builders and are never
//! mutated afterwards. Every room object shares the single flat
//! [`RoomObjectSnapshot`] shape: fields that do not apply to an object's
//! type are simply absent, which lets one generic patch/merge algorithm
//! serve every object kind.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{BodyPartType, Direction, ObjectType, OrderType, PowerClass, RoomStatus, TerrainType};
use crate::ids::{ObjectId, OrderId, RoomName, UserId};
use crate::intents::{GlobalUserIntent, RoomIntentSnapshot};
use crate::position::{Position, ROOM_SIZE};

// ---------------------------------------------------------------------------
// Sub-records
// ---------------------------------------------------------------------------

/// One body part of a creep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyPart {
    /// Part type.
    #[serde(rename = "type")]
    pub part: BodyPartType,
    /// Remaining hit points of this part (0..=100).
    pub hits: i64,
    /// Boost compound applied to the part, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<String>,
}

impl BodyPart {
    /// A fresh, unboosted part at full health.
    pub const fn new(part: BodyPartType) -> Self {
        Self {
            part,
            hits: 100,
            boost: None,
        }
    }
}

/// State of a spawn that is currently producing a creep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawningState {
    /// Name of the creep being spawned.
    pub name: String,
    /// Total ticks the spawn takes.
    pub need_time: u64,
    /// Game time at which spawning completes.
    pub spawn_time: u64,
    /// Preferred exit directions for the new creep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directions: Option<Vec<Direction>>,
}

/// Controller reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Reserving user.
    pub user: UserId,
    /// Game time the reservation ends.
    pub end_time: u64,
}

/// Controller sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sign {
    /// Signing user.
    pub user: UserId,
    /// Sign text.
    pub text: String,
    /// Game time of signing.
    pub time: u64,
    /// Wall-clock time of signing in epoch milliseconds.
    pub datetime: i64,
}

/// An active power effect on an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    /// Power (or natural effect) identifier.
    pub power: u32,
    /// Effect level.
    pub level: u32,
    /// Game time the effect expires.
    pub end_time: u64,
}

/// Destination of a creep crossing into another room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterRoom {
    /// Destination room.
    pub room: RoomName,
    /// Landing column.
    pub x: u8,
    /// Landing row.
    pub y: u8,
}

// ---------------------------------------------------------------------------
// Room objects
// ---------------------------------------------------------------------------

/// One simulated entity in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomObjectSnapshot {
    /// Stable object id.
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Declared object type.
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    /// Room the object is in.
    pub room: RoomName,
    /// Column.
    pub x: u8,
    /// Row.
    pub y: u8,
    /// Owning user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserId>,
    /// Creep or spawn name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Current hit points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hits: Option<i64>,
    /// Maximum hit points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hits_max: Option<i64>,
    /// Stored resources keyed by resource name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub store: BTreeMap<String, i64>,
    /// Total store capacity shared by all resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_capacity: Option<i64>,
    /// Per-resource store capacities (spawns, extensions, labs...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub store_capacity_resource: BTreeMap<String, i64>,
    /// Creep body.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<BodyPart>,
    /// Creep fatigue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatigue: Option<i64>,
    /// Game time at which a creep dies of old age.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_time: Option<u64>,
    /// Whether a creep is still inside its spawn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawning: Option<bool>,
    /// Spawn production state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawning_state: Option<SpawningState>,
    /// Controller level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    /// Controller upgrade progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    /// Game time at which the controller loses a level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downgrade_time: Option<u64>,
    /// Game time at which safe mode ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_mode: Option<u64>,
    /// Safe mode activations left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_mode_available: Option<u32>,
    /// Controller reservation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation: Option<Reservation>,
    /// Controller sign.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign: Option<Sign>,
    /// Game time at which the structure may act again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_time: Option<u64>,
    /// Energy held by a source or power bank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<i64>,
    /// Energy capacity of a source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_capacity: Option<i64>,
    /// Mineral resource name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mineral_type: Option<String>,
    /// Remaining mineral amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mineral_amount: Option<i64>,
    /// Mineral density class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<u32>,
    /// Game time a source refills.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_regeneration_time: Option<u64>,
    /// Game time of the next decay hit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_decay_time: Option<u64>,
    /// Game time at which the object disappears (power banks, ruins).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay_time: Option<u64>,
    /// Game time a tombstone's creep died.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_time: Option<u64>,
    /// Game time a nuke lands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub land_time: Option<u64>,
    /// Room a nuke was launched from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_room_name: Option<RoomName>,
    /// Resource type of a dropped pile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Amount of a dropped pile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    /// Active power effects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
    /// Pending cross-room move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inter_room: Option<InterRoom>,
    /// Id of the creep a tombstone belonged to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creep_id: Option<ObjectId>,
    /// Name of the creep a tombstone belonged to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creep_name: Option<String>,
    /// Remaining life of the creep at death.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creep_ticks_to_live: Option<u64>,
    /// Power held by a power bank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<i64>,
    /// Whether a rampart lets anyone through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    /// Whether the owner is notified when the object is attacked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_when_attacked: Option<bool>,
}

impl RoomObjectSnapshot {
    /// A bare object with only identity, type and position set.
    pub const fn new(id: ObjectId, object_type: ObjectType, room: RoomName, x: u8, y: u8) -> Self {
        Self {
            id,
            object_type,
            room,
            x,
            y,
            user: None,
            name: None,
            hits: None,
            hits_max: None,
            store: BTreeMap::new(),
            store_capacity: None,
            store_capacity_resource: BTreeMap::new(),
            body: Vec::new(),
            fatigue: None,
            age_time: None,
            spawning: None,
            spawning_state: None,
            level: None,
            progress: None,
            downgrade_time: None,
            safe_mode: None,
            safe_mode_available: None,
            reservation: None,
            sign: None,
            cooldown_time: None,
            energy: None,
            energy_capacity: None,
            mineral_type: None,
            mineral_amount: None,
            density: None,
            next_regeneration_time: None,
            next_decay_time: None,
            decay_time: None,
            death_time: None,
            land_time: None,
            launch_room_name: None,
            resource_type: None,
            amount: None,
            effects: Vec::new(),
            inter_room: None,
            creep_id: None,
            creep_name: None,
            creep_ticks_to_live: None,
            power: None,
            is_public: None,
            notify_when_attacked: None,
        }
    }

    /// Tile position.
    pub const fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    /// Whether the object belongs to `user`.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.user.as_ref() == Some(user)
    }

    /// Amount of `resource` in the store.
    pub fn store_amount(&self, resource: &str) -> i64 {
        self.store.get(resource).copied().unwrap_or(0)
    }

    /// Total amount of all stored resources.
    pub fn store_used(&self) -> i64 {
        self.store.values().fold(0_i64, |acc, v| acc.saturating_add(*v))
    }

    /// Capacity available to `resource`.
    ///
    /// A per-resource capacity wins over the shared capacity. Objects with
    /// neither have no store.
    pub fn store_capacity_for(&self, resource: &str) -> i64 {
        if let Some(cap) = self.store_capacity_resource.get(resource) {
            return *cap;
        }
        if self.store_capacity_resource.is_empty() {
            return self.store_capacity.unwrap_or(0);
        }
        0
    }

    /// Free space left for `resource`.
    pub fn store_free_capacity(&self, resource: &str) -> i64 {
        let free = if self.store_capacity_resource.contains_key(resource) {
            self.store_capacity_for(resource)
                .saturating_sub(self.store_amount(resource))
        } else {
            self.store_capacity_for(resource)
                .saturating_sub(self.store_used())
        };
        free.max(0)
    }

    /// Number of body parts of `part` that still have hit points.
    pub fn active_parts(&self, part: BodyPartType) -> u32 {
        let count = self
            .body
            .iter()
            .filter(|p| p.part == part && p.hits > 0)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Ticks until a creep dies of old age.
    pub fn ticks_to_live(&self, game_time: u64) -> Option<u64> {
        self.age_time.map(|age| age.saturating_sub(game_time))
    }

    /// Whether a structure is currently cooling down.
    pub fn on_cooldown(&self, game_time: u64) -> bool {
        self.cooldown_time.is_some_and(|t| t > game_time)
    }
}

// ---------------------------------------------------------------------------
// Room metadata and terrain
// ---------------------------------------------------------------------------

/// Lightweight per-room information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfoSnapshot {
    /// Room name.
    #[serde(rename = "_id")]
    pub room: RoomName,
    /// Lifecycle status.
    #[serde(default)]
    pub status: RoomStatus,
    /// Controller level, if the room is owned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_level: Option<u32>,
    /// Controller owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserId>,
    /// Epoch ms until which the room is a novice area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub novice: Option<i64>,
    /// Epoch ms until which the room is a respawn area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respawn_area: Option<i64>,
    /// Game time at which the active safe mode ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_mode: Option<u64>,
    /// Whether the room had any activity last tick.
    #[serde(default)]
    pub active: bool,
}

impl RoomInfoSnapshot {
    /// Info for an unowned, normal room.
    pub const fn new(room: RoomName) -> Self {
        Self {
            room,
            status: RoomStatus::Normal,
            controller_level: None,
            owner: None,
            novice: None,
            respawn_area: None,
            safe_mode: None,
            active: true,
        }
    }
}

/// 50x50 terrain grid of one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomTerrain {
    /// Row-major tiles.
    tiles: Vec<TerrainType>,
}

impl RoomTerrain {
    /// An all-plain room.
    pub fn plain() -> Self {
        let size = usize::from(ROOM_SIZE).saturating_mul(usize::from(ROOM_SIZE));
        Self {
            tiles: vec![TerrainType::Plain; size],
        }
    }

    /// Decode the stored digit string: `0` plain, `1` wall, `2` swamp,
    /// `3` wall (wall over swamp).
    pub fn decode(encoded: &str) -> Option<Self> {
        let size = usize::from(ROOM_SIZE).saturating_mul(usize::from(ROOM_SIZE));
        if encoded.len() != size {
            return None;
        }
        let tiles = encoded
            .chars()
            .map(|c| match c {
                '0' => Some(TerrainType::Plain),
                '1' | '3' => Some(TerrainType::Wall),
                '2' => Some(TerrainType::Swamp),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { tiles })
    }

    /// Encode back into the stored digit string.
    pub fn encode(&self) -> String {
        self.tiles
            .iter()
            .map(|t| match t {
                TerrainType::Plain => '0',
                TerrainType::Wall => '1',
                TerrainType::Swamp => '2',
            })
            .collect()
    }

    /// Terrain at `pos`; outside the grid reads as wall.
    pub fn get(&self, pos: Position) -> TerrainType {
        self.tiles
            .get(pos.index())
            .copied()
            .unwrap_or(TerrainType::Wall)
    }

    /// Overwrite one tile.
    pub fn set(&mut self, pos: Position, terrain: TerrainType) {
        if let Some(tile) = self.tiles.get_mut(pos.index()) {
            *tile = terrain;
        }
    }
}

/// A player flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagSnapshot {
    /// Flag name, unique per user.
    pub name: String,
    /// Owning user.
    pub user: UserId,
    /// Column.
    pub x: u8,
    /// Row.
    pub y: u8,
    /// Primary color.
    pub color: u8,
    /// Secondary color.
    pub secondary_color: u8,
}

// ---------------------------------------------------------------------------
// Users, power creeps, market
// ---------------------------------------------------------------------------

/// Per-user state visible to the tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    /// User id.
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub username: String,
    /// Credit balance; may be negative.
    #[serde(default)]
    pub money: Decimal,
    /// CPU limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<i64>,
    /// Global control level points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcl: Option<i64>,
    /// Total processed power.
    #[serde(default)]
    pub power: i64,
    /// Power experimentations left.
    #[serde(default)]
    pub power_experimentations: u32,
    /// Epoch ms until which a power experimentation window is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_experimentation_time: Option<i64>,
}

impl UserState {
    /// A user with zero balance.
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            money: Decimal::ZERO,
            cpu: None,
            gcl: None,
            power: 0,
            power_experimentations: 0,
            power_experimentation_time: None,
        }
    }
}

/// Level of one power on a power creep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerLevel {
    /// Power level.
    pub level: u32,
}

/// A power creep, spawned or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerCreepSnapshot {
    /// Power creep id.
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Owning user.
    pub user: UserId,
    /// Name, unique per user.
    pub name: String,
    /// Class.
    pub class_name: PowerClass,
    /// Level.
    #[serde(default)]
    pub level: u32,
    /// Learned powers keyed by power id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub powers: BTreeMap<String, PowerLevel>,
    /// Room the creep is spawned in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomName>,
    /// Epoch ms until the creep may spawn again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_cooldown_time: Option<i64>,
    /// Epoch ms at which the creep is deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_time: Option<i64>,
}

impl PowerCreepSnapshot {
    /// Whether the creep is currently spawned in a room.
    pub const fn is_spawned(&self) -> bool {
        self.room.is_some()
    }
}

/// A market order. Prices are in milli-credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOrderSnapshot {
    /// Order id.
    #[serde(rename = "_id")]
    pub id: OrderId,
    /// Game time of creation.
    pub created: u64,
    /// Wall-clock creation time in epoch ms.
    #[serde(default)]
    pub created_timestamp: i64,
    /// Owning user.
    pub user: UserId,
    /// Whether the order is listed.
    #[serde(default)]
    pub active: bool,
    /// Buy or sell.
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Terminal room of the order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_name: Option<RoomName>,
    /// Traded resource.
    pub resource_type: String,
    /// Unit price in milli-credits.
    pub price: i64,
    /// Amount currently available for dealing.
    pub amount: i64,
    /// Amount left to trade.
    pub remaining_amount: i64,
    /// Total amount ever listed.
    pub total_amount: i64,
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Everything the room processor reads for one room and tick.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    /// Room name.
    pub room_name: RoomName,
    /// Tick this snapshot describes.
    pub game_time: u64,
    /// Room metadata.
    pub info: RoomInfoSnapshot,
    /// Objects keyed by id.
    pub objects: BTreeMap<ObjectId, RoomObjectSnapshot>,
    /// Users owning anything in the room.
    pub users: BTreeMap<UserId, UserState>,
    /// Terrain, if known.
    pub terrain: Option<RoomTerrain>,
    /// Flags placed in the room.
    pub flags: Vec<FlagSnapshot>,
    /// Power creeps spawned in the room.
    pub power_creeps: BTreeMap<ObjectId, PowerCreepSnapshot>,
    /// Intents submitted for this tick.
    pub intents: Option<RoomIntentSnapshot>,
}

impl RoomSnapshot {
    /// An empty snapshot for `room` at `game_time`.
    pub fn empty(room: RoomName, game_time: u64) -> Self {
        Self {
            info: RoomInfoSnapshot::new(room.clone()),
            room_name: room,
            game_time,
            objects: BTreeMap::new(),
            users: BTreeMap::new(),
            terrain: None,
            flags: Vec::new(),
            power_creeps: BTreeMap::new(),
            intents: None,
        }
    }

    /// The room controller, if any.
    pub fn controller(&self) -> Option<&RoomObjectSnapshot> {
        self.objects
            .values()
            .find(|o| o.object_type == ObjectType::Controller)
    }

    /// All objects of `object_type`, in id order.
    pub fn objects_of_type(
        &self,
        object_type: ObjectType,
    ) -> impl Iterator<Item = &RoomObjectSnapshot> {
        self.objects
            .values()
            .filter(move |o| o.object_type == object_type)
    }

    /// All objects on the tile `pos`.
    pub fn objects_at(&self, pos: Position) -> impl Iterator<Item = &RoomObjectSnapshot> {
        self.objects.values().filter(move |o| o.position() == pos)
    }

    /// Terrain at `pos`, plain when terrain is unknown.
    pub fn terrain_at(&self, pos: Position) -> TerrainType {
        self.terrain
            .as_ref()
            .map_or(TerrainType::Plain, |t| t.get(pos))
    }
}

/// Market slice of the global snapshot.
#[derive(Debug, Clone, Default)]
pub struct GlobalMarketSnapshot {
    /// Orders keyed by id.
    pub orders: BTreeMap<OrderId, MarketOrderSnapshot>,
    /// Users keyed by id.
    pub users: BTreeMap<UserId, UserState>,
    /// Power creeps keyed by id.
    pub power_creeps: BTreeMap<ObjectId, PowerCreepSnapshot>,
    /// Global intents submitted for this tick.
    pub user_intents: Vec<GlobalUserIntent>,
}

/// Cross-room state read by the global processor.
#[derive(Debug, Clone, Default)]
pub struct GlobalSnapshot {
    /// Tick this snapshot describes.
    pub game_time: u64,
    /// Creeps with a pending `interRoom` move.
    pub inter_room_creeps: Vec<RoomObjectSnapshot>,
    /// Info for every accessible room.
    pub accessible_rooms: BTreeMap<RoomName, RoomInfoSnapshot>,
    /// Singleton objects processed globally (power banks).
    pub special_objects: Vec<RoomObjectSnapshot>,
    /// Market state.
    pub market: GlobalMarketSnapshot,
}
