//! Game rule constants.
//!
//! Grouped by the subsystem that consumes them. Times are in ticks unless
//! the name says otherwise.

// ---------------------------------------------------------------------------
// Creeps and spawning
// ---------------------------------------------------------------------------

/// Ticks needed to spawn one body part.
pub const CREEP_SPAWN_TIME: u64 = 3;
/// Maximum number of body parts.
pub const MAX_CREEP_SIZE: usize = 50;
/// Lifetime of a creep without CLAIM parts.
pub const CREEP_LIFE_TIME: u64 = 1500;
/// Lifetime of a creep with CLAIM parts.
pub const CREEP_CLAIM_LIFE_TIME: u64 = 600;
/// Hit points per body part.
pub const BODYPART_HITS: i64 = 100;
/// Carry capacity per CARRY part.
pub const CARRY_CAPACITY: i64 = 50;
/// Energy-to-ticks ratio used by `renewCreep`.
pub const SPAWN_RENEW_RATIO: f64 = 1.2;
/// Ticks per body part a tombstone lasts.
pub const TOMBSTONE_DECAY_PER_PART: u64 = 5;
/// Fraction of body cost a recycled creep leaves behind, at full life.
pub const CREEP_CORPSE_RATE: f64 = 0.2;

// ---------------------------------------------------------------------------
// Harvesting
// ---------------------------------------------------------------------------

/// Energy harvested per WORK part.
pub const HARVEST_POWER: i64 = 2;
/// Mineral harvested per WORK part.
pub const HARVEST_MINERAL_POWER: i64 = 1;
/// Extractor cooldown after a mineral harvest.
pub const EXTRACTOR_COOLDOWN: u64 = 5;
/// Capacity of a source in an owned or reserved room.
pub const SOURCE_ENERGY_CAPACITY: i64 = 3000;
/// Capacity of a source in a neutral room.
pub const SOURCE_ENERGY_NEUTRAL_CAPACITY: i64 = 1500;
/// Ticks between source refills.
pub const ENERGY_REGEN_TIME: u64 = 300;

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Progress gained per WORK part per tick.
pub const UPGRADE_CONTROLLER_POWER: i64 = 1;
/// Upgrade cap per tick at level 8.
pub const CONTROLLER_MAX_UPGRADE_PER_TICK: i64 = 15;
/// Downgrade timer restored per upgrade point.
pub const CONTROLLER_DOWNGRADE_RESTORE: u64 = 100;
/// Hostile ticks blocked from upgrading after a downgrade attack.
pub const CONTROLLER_DOWNGRADE_SAFEMODE_THRESHOLD: u64 = 5000;
/// Safe mode duration.
pub const SAFE_MODE_DURATION: u64 = 20_000;

// ---------------------------------------------------------------------------
// Links and towers
// ---------------------------------------------------------------------------

/// Link energy capacity.
pub const LINK_CAPACITY: i64 = 800;
/// Percentage of transferred energy lost.
pub const LINK_LOSS_RATIO_PERCENT: i64 = 3;

/// Tower energy capacity.
pub const TOWER_CAPACITY: i64 = 1000;
/// Energy per tower action.
pub const TOWER_ENERGY_COST: i64 = 10;
/// Damage at optimal range.
pub const TOWER_POWER_ATTACK: i64 = 600;
/// Heal at optimal range.
pub const TOWER_POWER_HEAL: i64 = 400;
/// Repair at optimal range.
pub const TOWER_POWER_REPAIR: i64 = 800;
/// Range up to which full power applies.
pub const TOWER_OPTIMAL_RANGE: u8 = 5;
/// Range at which maximum falloff applies.
pub const TOWER_FALLOFF_RANGE: u8 = 20;
/// Falloff at maximum range, in percent of power removed.
pub const TOWER_FALLOFF_PERCENT: i64 = 75;

// ---------------------------------------------------------------------------
// Labs, nukers, power
// ---------------------------------------------------------------------------

/// Units produced per reaction.
pub const LAB_REACTION_AMOUNT: i64 = 5;
/// Maximum distance between a lab and its source labs.
pub const LAB_REACTION_RANGE: u8 = 2;
/// Lab mineral capacity.
pub const LAB_MINERAL_CAPACITY: i64 = 3000;
/// Lab energy capacity.
pub const LAB_ENERGY_CAPACITY: i64 = 2000;

/// Nuker energy requirement.
pub const NUKER_ENERGY_CAPACITY: i64 = 300_000;
/// Nuker ghodium requirement.
pub const NUKER_GHODIUM_CAPACITY: i64 = 5000;
/// Nuker cooldown.
pub const NUKER_COOLDOWN: u64 = 100_000;
/// Ticks a nuke takes to land.
pub const NUKE_LAND_TIME: u64 = 50_000;
/// Nuke range in rooms.
pub const NUKE_RANGE: u64 = 10;

/// Power spawn energy capacity.
pub const POWER_SPAWN_ENERGY_CAPACITY: i64 = 5000;
/// Power spawn power capacity.
pub const POWER_SPAWN_POWER_CAPACITY: i64 = 100;
/// Energy consumed per power unit processed.
pub const POWER_SPAWN_ENERGY_RATIO: i64 = 50;

/// Ticks a power bank lives.
pub const POWER_BANK_DECAY: u64 = 5000;

// ---------------------------------------------------------------------------
// Decay
// ---------------------------------------------------------------------------

/// Hits a road loses per decay.
pub const ROAD_DECAY_AMOUNT: i64 = 100;
/// Ticks between road decays.
pub const ROAD_DECAY_TIME: u64 = 1000;
/// Road hit points.
pub const ROAD_HITS: i64 = 5000;
/// Hits a container loses per decay.
pub const CONTAINER_DECAY: i64 = 5000;
/// Ticks between container decays in unowned rooms.
pub const CONTAINER_DECAY_TIME: u64 = 100;
/// Ticks between container decays in owned rooms.
pub const CONTAINER_DECAY_TIME_OWNED: u64 = 500;
/// Hits a rampart loses per decay.
pub const RAMPART_DECAY_AMOUNT: i64 = 300;
/// Ticks between rampart decays.
pub const RAMPART_DECAY_TIME: u64 = 100;
/// Ticks a ruin lasts.
pub const RUIN_DECAY: u64 = 500;
/// Divisor of a dropped pile's per-tick decay: `ceil(amount / 1000)`.
pub const ENERGY_DECAY: i64 = 1000;

// ---------------------------------------------------------------------------
// Market and power creeps
// ---------------------------------------------------------------------------

/// Market listing fee in basis points (5%).
pub const MARKET_FEE_BASIS_POINTS: i64 = 500;
/// Basis point denominator.
pub const BASIS_POINTS: i64 = 10_000;
/// Milli-credits per credit.
pub const MILLIS_PER_CREDIT: i64 = 1000;
/// Maximum active orders per user.
pub const MARKET_MAX_ORDERS: usize = 300;

/// Delay before a power creep deletion takes effect, in milliseconds.
pub const POWER_CREEP_DELETE_COOLDOWN_MS: i64 = 86_400_000;
/// Maximum power creep level.
pub const POWER_CREEP_MAX_LEVEL: u32 = 25;
/// Maximum power creep name length.
pub const POWER_CREEP_NAME_MAX_LENGTH: usize = 50;
/// Power needed for the first global power level. Level `n` needs
/// `n^2` times this amount.
pub const POWER_LEVEL_MULTIPLY: i64 = 1000;
