//! Blueprint registry and game rule constants.
//!
//! Pure data with no I/O: snapshot builders use it to fill defaults,
//! validators and processor steps use it for costs, ranges and cooldowns.
//!
//! # Modules
//!
//! - [`blueprint`] -- Default attributes per object type and body pricing
//! - [`constants`] -- Game rule constants
//! - [`controller`] -- Controller level tables
//! - [`economy`] -- Market fees and global power levels
//! - [`recipes`] -- Lab reactions and factory recipes

pub mod blueprint;
pub mod constants;
pub mod controller;
pub mod economy;
pub mod recipes;

pub use blueprint::{Blueprint, Decay, blueprint, body_cost, enrich, part_cost};
pub use economy::{credits_to_millis, market_fee_millis, millis_to_credits, power_level};
pub use recipes::{FactoryRecipe, factory_recipe, reaction_product, reaction_time};
