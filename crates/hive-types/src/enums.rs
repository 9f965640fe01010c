//! Enumeration types shared by every crate in the tick engine.
//!
//! Wire names match the persisted documents exactly (`constructedWall`,
//! `ranged_attack`, `market.fee`), so these enums round-trip through the
//! document store without translation tables.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Object types
// ---------------------------------------------------------------------------

/// The declared type of a room object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    // --- Units ---
    /// A player-controlled unit built from body parts.
    Creep,
    /// A power creep currently present in a room.
    PowerCreep,

    // --- Owned structures ---
    /// Produces creeps.
    Spawn,
    /// Extra energy storage for spawning.
    Extension,
    /// Instant energy transfer between links in the same room.
    Link,
    /// Large resource storage.
    Storage,
    /// Room defense: attack, heal, repair.
    Tower,
    /// Reveals a distant room.
    Observer,
    /// Processes power into the owner's power total.
    PowerSpawn,
    /// Enables mineral harvesting.
    Extractor,
    /// Runs mineral reactions.
    Lab,
    /// Cross-room resource trade endpoint.
    Terminal,
    /// Launches nukes at rooms in range.
    Nuker,
    /// Produces commodities from recipes.
    Factory,
    /// Blocks hostile movement, protects whatever stands on it.
    Rampart,

    // --- Neutral structures ---
    /// Lowers movement fatigue.
    Road,
    /// Player-built wall.
    #[serde(rename = "constructedWall")]
    ConstructedWall,
    /// Unowned storage box.
    Container,
    /// The room controller.
    Controller,
    /// Source keeper spawner.
    KeeperLair,
    /// Inter-room or inter-shard teleport.
    Portal,
    /// Neutral power deposit.
    PowerBank,
    /// NPC stronghold core.
    InvaderCore,

    // --- Natural objects ---
    /// Regenerating energy source.
    Source,
    /// Harvestable mineral deposit.
    Mineral,
    /// Commodity deposit in highway rooms.
    Deposit,
    /// Dropped resource pile.
    Resource,
    /// Remains of a dead creep.
    Tombstone,
    /// Remains of a destroyed structure.
    Ruin,
    /// Planned structure under construction.
    ConstructionSite,
    /// An incoming nuke.
    Nuke,
}

impl ObjectType {
    /// Whether the type is a structure that can be owned and therefore
    /// takes part in the activation rule.
    pub const fn is_owned_structure(self) -> bool {
        matches!(
            self,
            Self::Spawn
                | Self::Extension
                | Self::Link
                | Self::Storage
                | Self::Tower
                | Self::Observer
                | Self::PowerSpawn
                | Self::Extractor
                | Self::Lab
                | Self::Terminal
                | Self::Nuker
                | Self::Factory
                | Self::Rampart
        )
    }

    /// Whether the type blocks movement onto its tile.
    ///
    /// Ramparts are handled separately since they only block non-owners.
    pub const fn is_obstacle(self) -> bool {
        matches!(
            self,
            Self::Spawn
                | Self::Extension
                | Self::Link
                | Self::Storage
                | Self::Tower
                | Self::Observer
                | Self::PowerSpawn
                | Self::Extractor
                | Self::Lab
                | Self::Terminal
                | Self::Nuker
                | Self::Factory
                | Self::ConstructedWall
                | Self::Controller
                | Self::KeeperLair
                | Self::PowerBank
                | Self::InvaderCore
                | Self::Source
                | Self::Mineral
                | Self::Deposit
        )
    }

    /// The wire name of this type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Creep => "creep",
            Self::PowerCreep => "powerCreep",
            Self::Spawn => "spawn",
            Self::Extension => "extension",
            Self::Link => "link",
            Self::Storage => "storage",
            Self::Tower => "tower",
            Self::Observer => "observer",
            Self::PowerSpawn => "powerSpawn",
            Self::Extractor => "extractor",
            Self::Lab => "lab",
            Self::Terminal => "terminal",
            Self::Nuker => "nuker",
            Self::Factory => "factory",
            Self::Rampart => "rampart",
            Self::Road => "road",
            Self::ConstructedWall => "constructedWall",
            Self::Container => "container",
            Self::Controller => "controller",
            Self::KeeperLair => "keeperLair",
            Self::Portal => "portal",
            Self::PowerBank => "powerBank",
            Self::InvaderCore => "invaderCore",
            Self::Source => "source",
            Self::Mineral => "mineral",
            Self::Deposit => "deposit",
            Self::Resource => "resource",
            Self::Tombstone => "tombstone",
            Self::Ruin => "ruin",
            Self::ConstructionSite => "constructionSite",
            Self::Nuke => "nuke",
        }
    }
}

impl core::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Body parts
// ---------------------------------------------------------------------------

/// A creep body part type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPartType {
    /// Reduces fatigue.
    Move,
    /// Harvests, builds, repairs, upgrades.
    Work,
    /// Adds 50 carry capacity.
    Carry,
    /// Melee attack.
    Attack,
    /// Ranged attack.
    RangedAttack,
    /// Heals creeps.
    Heal,
    /// Cheap hit points.
    Tough,
    /// Claims and reserves controllers.
    Claim,
}

impl BodyPartType {
    /// Every body part type, in canonical order.
    pub const ALL: [Self; 8] = [
        Self::Move,
        Self::Work,
        Self::Carry,
        Self::Attack,
        Self::RangedAttack,
        Self::Heal,
        Self::Tough,
        Self::Claim,
    ];

    /// Parse a wire name such as `ranged_attack`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "move" => Some(Self::Move),
            "work" => Some(Self::Work),
            "carry" => Some(Self::Carry),
            "attack" => Some(Self::Attack),
            "ranged_attack" => Some(Self::RangedAttack),
            "heal" => Some(Self::Heal),
            "tough" => Some(Self::Tough),
            "claim" => Some(Self::Claim),
            _ => None,
        }
    }

    /// The wire name of this part.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Work => "work",
            Self::Carry => "carry",
            Self::Attack => "attack",
            Self::RangedAttack => "ranged_attack",
            Self::Heal => "heal",
            Self::Tough => "tough",
            Self::Claim => "claim",
        }
    }
}

// ---------------------------------------------------------------------------
// Directions
// ---------------------------------------------------------------------------

/// One of the eight compass directions, numbered 1 (top) clockwise to 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Direction {
    /// y - 1
    Top,
    /// x + 1, y - 1
    TopRight,
    /// x + 1
    Right,
    /// x + 1, y + 1
    BottomRight,
    /// y + 1
    Bottom,
    /// x - 1, y + 1
    BottomLeft,
    /// x - 1
    Left,
    /// x - 1, y - 1
    TopLeft,
}

impl Direction {
    /// All directions in numeric order.
    pub const ALL: [Self; 8] = [
        Self::Top,
        Self::TopRight,
        Self::Right,
        Self::BottomRight,
        Self::Bottom,
        Self::BottomLeft,
        Self::Left,
        Self::TopLeft,
    ];

    /// The `(dx, dy)` step for this direction.
    pub const fn offset(self) -> (i8, i8) {
        match self {
            Self::Top => (0, -1),
            Self::TopRight => (1, -1),
            Self::Right => (1, 0),
            Self::BottomRight => (1, 1),
            Self::Bottom => (0, 1),
            Self::BottomLeft => (-1, 1),
            Self::Left => (-1, 0),
            Self::TopLeft => (-1, -1),
        }
    }

    /// The numeric wire value (1..=8).
    pub const fn number(self) -> u8 {
        match self {
            Self::Top => 1,
            Self::TopRight => 2,
            Self::Right => 3,
            Self::BottomRight => 4,
            Self::Bottom => 5,
            Self::BottomLeft => 6,
            Self::Left => 7,
            Self::TopLeft => 8,
        }
    }

    /// Parse a numeric wire value.
    pub const fn from_number(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Top),
            2 => Some(Self::TopRight),
            3 => Some(Self::Right),
            4 => Some(Self::BottomRight),
            5 => Some(Self::Bottom),
            6 => Some(Self::BottomLeft),
            7 => Some(Self::Left),
            8 => Some(Self::TopLeft),
            _ => None,
        }
    }

    /// The direction from one tile to an adjacent one, if they differ.
    pub const fn between(dx: i32, dy: i32) -> Option<Self> {
        match (dx.signum(), dy.signum()) {
            (0, -1) => Some(Self::Top),
            (1, -1) => Some(Self::TopRight),
            (1, 0) => Some(Self::Right),
            (1, 1) => Some(Self::BottomRight),
            (0, 1) => Some(Self::Bottom),
            (-1, 1) => Some(Self::BottomLeft),
            (-1, 0) => Some(Self::Left),
            (-1, -1) => Some(Self::TopLeft),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_number(value).ok_or_else(|| format!("invalid direction {value}"))
    }
}

impl From<Direction> for u8 {
    fn from(value: Direction) -> Self {
        value.number()
    }
}

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

/// Terrain of a single room tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainType {
    /// Walkable, normal movement cost.
    #[default]
    Plain,
    /// Walkable, five times the movement cost.
    Swamp,
    /// Impassable.
    Wall,
}

// ---------------------------------------------------------------------------
// Rooms, market, power
// ---------------------------------------------------------------------------

/// Lifecycle status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoomStatus {
    /// Playable room.
    #[default]
    Normal,
    /// Room outside the world borders.
    OutOfBorders,
}

/// Side of a market order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// The owner sells resources.
    Sell,
    /// The owner buys resources.
    Buy,
}

impl OrderType {
    /// Parse a wire name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sell" => Some(Self::Sell),
            "buy" => Some(Self::Buy),
            _ => None,
        }
    }
}

/// Type tag of a money ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoneyLogType {
    /// Listing fee for creating or extending an order.
    #[serde(rename = "market.fee")]
    MarketFee,
    /// Credits spent buying from an order.
    #[serde(rename = "market.buy")]
    MarketBuy,
    /// Credits earned selling to an order.
    #[serde(rename = "market.sell")]
    MarketSell,
}

/// Class of a power creep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerClass {
    /// The operator class, the only one available.
    Operator,
}

impl PowerClass {
    /// Parse a wire name.
    pub fn parse(name: &str) -> Option<Self> {
        (name == "operator").then_some(Self::Operator)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn object_type_wire_names() {
        let json = serde_json::to_string(&ObjectType::ConstructedWall).unwrap();
        assert_eq!(json, "\"constructedWall\"");
        let parsed: ObjectType = serde_json::from_str("\"powerSpawn\"").unwrap();
        assert_eq!(parsed, ObjectType::PowerSpawn);
        assert_eq!(ObjectType::PowerSpawn.as_str(), "powerSpawn");
    }

    #[test]
    fn body_parts_parse_snake_case() {
        for part in BodyPartType::ALL {
            assert_eq!(BodyPartType::parse(part.as_str()), Some(part));
        }
        assert_eq!(BodyPartType::parse("laser"), None);
        let json = serde_json::to_string(&BodyPartType::RangedAttack).unwrap();
        assert_eq!(json, "\"ranged_attack\"");
    }

    #[test]
    fn directions_serialize_as_numbers() {
        assert_eq!(serde_json::to_string(&Direction::BottomLeft).unwrap(), "6");
        let parsed: Direction = serde_json::from_str("8").unwrap();
        assert_eq!(parsed, Direction::TopLeft);
        assert!(serde_json::from_str::<Direction>("9").is_err());
    }

    #[test]
    fn direction_between_adjacent_tiles() {
        assert_eq!(Direction::between(1, 0), Some(Direction::Right));
        assert_eq!(Direction::between(-3, 2), Some(Direction::BottomLeft));
        assert_eq!(Direction::between(0, 0), None);
    }

    #[test]
    fn money_log_type_uses_dotted_names() {
        let json = serde_json::to_string(&MoneyLogType::MarketFee).unwrap();
        assert_eq!(json, "\"market.fee\"");
    }
}
