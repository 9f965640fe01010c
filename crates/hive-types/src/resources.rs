//! Resource names as they appear in object stores.
//!
//! Stores are keyed by these plain strings rather than an enum so that
//! resources the engine does not model (commodities, boosts) still survive
//! a load/save round trip untouched.

/// Energy.
pub const ENERGY: &str = "energy";
/// Power.
pub const POWER: &str = "power";
/// Operations resource for power creeps.
pub const OPS: &str = "ops";

// --- Base minerals ---

/// Hydrogen.
pub const HYDROGEN: &str = "H";
/// Oxygen.
pub const OXYGEN: &str = "O";
/// Utrium.
pub const UTRIUM: &str = "U";
/// Lemergium.
pub const LEMERGIUM: &str = "L";
/// Keanium.
pub const KEANIUM: &str = "K";
/// Zynthium.
pub const ZYNTHIUM: &str = "Z";
/// Catalyst.
pub const CATALYST: &str = "X";

// --- Compounds ---

/// Hydroxide.
pub const HYDROXIDE: &str = "OH";
/// Zynthium keanite.
pub const ZYNTHIUM_KEANITE: &str = "ZK";
/// Utrium lemergite.
pub const UTRIUM_LEMERGITE: &str = "UL";
/// Ghodium.
pub const GHODIUM: &str = "G";
/// Utrium hydride.
pub const UTRIUM_HYDRIDE: &str = "UH";
/// Utrium oxide.
pub const UTRIUM_OXIDE: &str = "UO";
/// Keanium hydride.
pub const KEANIUM_HYDRIDE: &str = "KH";
/// Keanium oxide.
pub const KEANIUM_OXIDE: &str = "KO";
/// Lemergium hydride.
pub const LEMERGIUM_HYDRIDE: &str = "LH";
/// Lemergium oxide.
pub const LEMERGIUM_OXIDE: &str = "LO";
/// Zynthium hydride.
pub const ZYNTHIUM_HYDRIDE: &str = "ZH";
/// Zynthium oxide.
pub const ZYNTHIUM_OXIDE: &str = "ZO";
/// Ghodium hydride.
pub const GHODIUM_HYDRIDE: &str = "GH";
/// Ghodium oxide.
pub const GHODIUM_OXIDE: &str = "GO";

// --- Commodities ---

/// Compressed energy.
pub const BATTERY: &str = "battery";
/// Compressed utrium.
pub const UTRIUM_BAR: &str = "utrium_bar";
/// Compressed lemergium.
pub const LEMERGIUM_BAR: &str = "lemergium_bar";
/// Compressed zynthium.
pub const ZYNTHIUM_BAR: &str = "zynthium_bar";
/// Compressed keanium.
pub const KEANIUM_BAR: &str = "keanium_bar";
/// Compressed oxygen.
pub const OXIDANT: &str = "oxidant";
/// Compressed hydrogen.
pub const REDUCTANT: &str = "reductant";
/// Compressed catalyst.
pub const PURIFIER: &str = "purifier";
/// Compressed ghodium.
pub const GHODIUM_MELT: &str = "ghodium_melt";

/// Whether `name` is a base mineral an extractor can harvest.
pub fn is_mineral(name: &str) -> bool {
    matches!(
        name,
        HYDROGEN | OXYGEN | UTRIUM | LEMERGIUM | KEANIUM | ZYNTHIUM | CATALYST
    )
}
