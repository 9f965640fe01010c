//! Lab reactions and factory recipes.

use hive_types::resources::{
    BATTERY, ENERGY, GHODIUM, GHODIUM_HYDRIDE, GHODIUM_MELT, GHODIUM_OXIDE, HYDROGEN, HYDROXIDE,
    KEANIUM, KEANIUM_BAR, KEANIUM_HYDRIDE, KEANIUM_OXIDE, LEMERGIUM, LEMERGIUM_BAR,
    LEMERGIUM_HYDRIDE, LEMERGIUM_OXIDE, OXIDANT, OXYGEN, PURIFIER, CATALYST, REDUCTANT, UTRIUM,
    UTRIUM_BAR, UTRIUM_HYDRIDE, UTRIUM_LEMERGITE, UTRIUM_OXIDE, ZYNTHIUM, ZYNTHIUM_BAR,
    ZYNTHIUM_HYDRIDE, ZYNTHIUM_KEANITE, ZYNTHIUM_OXIDE,
};

// ---------------------------------------------------------------------------
// Lab reactions
// ---------------------------------------------------------------------------

/// `(reagent, reagent, product, cooldown)`.
const REACTIONS: &[(&str, &str, &str, u64)] = &[
    (OXYGEN, HYDROGEN, HYDROXIDE, 20),
    (ZYNTHIUM, KEANIUM, ZYNTHIUM_KEANITE, 5),
    (UTRIUM, LEMERGIUM, UTRIUM_LEMERGITE, 5),
    (ZYNTHIUM_KEANITE, UTRIUM_LEMERGITE, GHODIUM, 5),
    (UTRIUM, HYDROGEN, UTRIUM_HYDRIDE, 10),
    (UTRIUM, OXYGEN, UTRIUM_OXIDE, 10),
    (KEANIUM, HYDROGEN, KEANIUM_HYDRIDE, 10),
    (KEANIUM, OXYGEN, KEANIUM_OXIDE, 10),
    (LEMERGIUM, HYDROGEN, LEMERGIUM_HYDRIDE, 15),
    (LEMERGIUM, OXYGEN, LEMERGIUM_OXIDE, 10),
    (ZYNTHIUM, HYDROGEN, ZYNTHIUM_HYDRIDE, 20),
    (ZYNTHIUM, OXYGEN, ZYNTHIUM_OXIDE, 10),
    (GHODIUM, HYDROGEN, GHODIUM_HYDRIDE, 10),
    (GHODIUM, OXYGEN, GHODIUM_OXIDE, 10),
];

/// Product of reacting `a` with `b`, in either order.
pub fn reaction_product(a: &str, b: &str) -> Option<&'static str> {
    REACTIONS
        .iter()
        .find(|(x, y, _, _)| (*x == a && *y == b) || (*x == b && *y == a))
        .map(|(_, _, product, _)| *product)
}

/// Lab cooldown after producing `product`.
pub fn reaction_time(product: &str) -> Option<u64> {
    REACTIONS
        .iter()
        .find(|(_, _, p, _)| *p == product)
        .map(|(_, _, _, time)| *time)
}

// ---------------------------------------------------------------------------
// Factory recipes
// ---------------------------------------------------------------------------

/// One factory recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactoryRecipe {
    /// Produced resource.
    pub product: &'static str,
    /// Units produced per run.
    pub amount: i64,
    /// Factory cooldown after a run.
    pub cooldown: u64,
    /// Consumed components.
    pub components: &'static [(&'static str, i64)],
}

const FACTORY_RECIPES: &[FactoryRecipe] = &[
    FactoryRecipe {
        product: UTRIUM_BAR,
        amount: 100,
        cooldown: 20,
        components: &[(UTRIUM, 500), (ENERGY, 200)],
    },
    FactoryRecipe {
        product: LEMERGIUM_BAR,
        amount: 100,
        cooldown: 20,
        components: &[(LEMERGIUM, 500), (ENERGY, 200)],
    },
    FactoryRecipe {
        product: ZYNTHIUM_BAR,
        amount: 100,
        cooldown: 20,
        components: &[(ZYNTHIUM, 500), (ENERGY, 200)],
    },
    FactoryRecipe {
        product: KEANIUM_BAR,
        amount: 100,
        cooldown: 20,
        components: &[(KEANIUM, 500), (ENERGY, 200)],
    },
    FactoryRecipe {
        product: GHODIUM_MELT,
        amount: 100,
        cooldown: 20,
        components: &[(GHODIUM, 500), (ENERGY, 200)],
    },
    FactoryRecipe {
        product: OXIDANT,
        amount: 100,
        cooldown: 20,
        components: &[(OXYGEN, 500), (ENERGY, 200)],
    },
    FactoryRecipe {
        product: REDUCTANT,
        amount: 100,
        cooldown: 20,
        components: &[(HYDROGEN, 500), (ENERGY, 200)],
    },
    FactoryRecipe {
        product: PURIFIER,
        amount: 100,
        cooldown: 20,
        components: &[(CATALYST, 500), (ENERGY, 200)],
    },
    FactoryRecipe {
        product: BATTERY,
        amount: 50,
        cooldown: 10,
        components: &[(ENERGY, 600)],
    },
    FactoryRecipe {
        product: ENERGY,
        amount: 500,
        cooldown: 10,
        components: &[(BATTERY, 50)],
    },
];

/// The recipe producing `product`.
pub fn factory_recipe(product: &str) -> Option<&'static FactoryRecipe> {
    FACTORY_RECIPES.iter().find(|r| r.product == product)
}
