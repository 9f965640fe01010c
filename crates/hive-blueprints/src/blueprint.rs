//! Canonical default attributes per object type.
//!
//! - [`blueprint`] returns the static blueprint for each [`ObjectType`]
//! - [`enrich`] fills absent defaults on a freshly loaded object
//! - [`part_cost`] / [`body_cost`] price creep bodies

use hive_types::resources::{ENERGY, GHODIUM, POWER};
use hive_types::{BodyPartType, ObjectType, RoomObjectSnapshot};

use crate::constants::{
    LAB_ENERGY_CAPACITY, LINK_CAPACITY, NUKER_ENERGY_CAPACITY, NUKER_GHODIUM_CAPACITY,
    POWER_SPAWN_ENERGY_CAPACITY, POWER_SPAWN_POWER_CAPACITY, RAMPART_DECAY_AMOUNT,
    RAMPART_DECAY_TIME, ROAD_DECAY_AMOUNT, ROAD_DECAY_TIME, ROAD_HITS, CONTAINER_DECAY,
    CONTAINER_DECAY_TIME, SOURCE_ENERGY_CAPACITY, TOWER_CAPACITY,
};
use crate::controller::{extension_capacity, rampart_hits_max};

/// Periodic hit point loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decay {
    /// Hits lost per decay event.
    pub amount: i64,
    /// Ticks between decay events.
    pub interval: u64,
}

/// Static default attributes of one object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blueprint {
    /// The type described.
    pub object_type: ObjectType,
    /// Default maximum hit points.
    pub hits_max: Option<i64>,
    /// Shared store capacity.
    pub store_capacity: Option<i64>,
    /// Per-resource store capacities.
    pub store_capacity_resource: &'static [(&'static str, i64)],
    /// Energy capacity of natural energy holders.
    pub energy_capacity: Option<i64>,
    /// Decay rule.
    pub decay: Option<Decay>,
}

impl Blueprint {
    const fn bare(object_type: ObjectType) -> Self {
        Self {
            object_type,
            hits_max: None,
            store_capacity: None,
            store_capacity_resource: &[],
            energy_capacity: None,
            decay: None,
        }
    }

    const fn hits(mut self, hits: i64) -> Self {
        self.hits_max = Some(hits);
        self
    }

    const fn store(mut self, capacity: i64) -> Self {
        self.store_capacity = Some(capacity);
        self
    }

    const fn per_resource(mut self, entries: &'static [(&'static str, i64)]) -> Self {
        self.store_capacity_resource = entries;
        self
    }

    const fn decays(mut self, amount: i64, interval: u64) -> Self {
        self.decay = Some(Decay { amount, interval });
        self
    }
}

/// Return the canonical blueprint for `object_type`.
pub const fn blueprint(object_type: ObjectType) -> Blueprint {
    let base = Blueprint::bare(object_type);
    match object_type {
        ObjectType::Spawn => base.hits(5000).per_resource(&[(ENERGY, 300)]),
        ObjectType::Extension => base.hits(1000).per_resource(&[(ENERGY, 50)]),
        ObjectType::Link => base.hits(1000).per_resource(&[(ENERGY, LINK_CAPACITY)]),
        ObjectType::Storage => base.hits(10_000).store(1_000_000),
        ObjectType::Tower => base.hits(3000).per_resource(&[(ENERGY, TOWER_CAPACITY)]),
        ObjectType::Observer | ObjectType::Extractor => base.hits(500),
        ObjectType::PowerSpawn => base.hits(5000).per_resource(&[
            (ENERGY, POWER_SPAWN_ENERGY_CAPACITY),
            (POWER, POWER_SPAWN_POWER_CAPACITY),
        ]),
        ObjectType::Lab => base.hits(500).per_resource(&[(ENERGY, LAB_ENERGY_CAPACITY)]),
        ObjectType::Terminal => base.hits(3000).store(300_000),
        ObjectType::Nuker => base.hits(1000).per_resource(&[
            (ENERGY, NUKER_ENERGY_CAPACITY),
            (GHODIUM, NUKER_GHODIUM_CAPACITY),
        ]),
        ObjectType::Factory => base.hits(1000).store(50_000),
        ObjectType::Container => base
            .hits(250_000)
            .store(2000)
            .decays(CONTAINER_DECAY, CONTAINER_DECAY_TIME),
        ObjectType::Road => base.hits(ROAD_HITS).decays(ROAD_DECAY_AMOUNT, ROAD_DECAY_TIME),
        ObjectType::Rampart => base.decays(RAMPART_DECAY_AMOUNT, RAMPART_DECAY_TIME),
        ObjectType::ConstructedWall => base.hits(300_000_000),
        ObjectType::Source => Blueprint {
            energy_capacity: Some(SOURCE_ENERGY_CAPACITY),
            ..base
        },
        ObjectType::PowerBank => base.hits(2_000_000),
        _ => base,
    }
}

/// Fill absent defaults on `object` from its blueprint.
///
/// `controller_level` tunes level-dependent defaults (extension capacity,
/// rampart hit cap). Present fields are never overwritten.
pub fn enrich(object: &mut RoomObjectSnapshot, controller_level: u32) {
    let bp = blueprint(object.object_type);

    if object.hits_max.is_none() {
        object.hits_max = match object.object_type {
            ObjectType::Rampart => Some(rampart_hits_max(controller_level)),
            _ => bp.hits_max,
        };
    }

    let has_store_shape = object.store_capacity.is_some() || !object.store_capacity_resource.is_empty();
    if !has_store_shape {
        object.store_capacity = bp.store_capacity;
        for (resource, capacity) in bp.store_capacity_resource {
            let capacity = if object.object_type == ObjectType::Extension {
                extension_capacity(controller_level)
            } else {
                *capacity
            };
            object
                .store_capacity_resource
                .insert((*resource).to_owned(), capacity);
        }
    }

    if object.energy_capacity.is_none() {
        object.energy_capacity = bp.energy_capacity;
    }
}

// ---------------------------------------------------------------------------
// Body pricing
// ---------------------------------------------------------------------------

/// Energy cost of one body part.
pub const fn part_cost(part: BodyPartType) -> i64 {
    match part {
        BodyPartType::Move | BodyPartType::Carry => 50,
        BodyPartType::Work => 100,
        BodyPartType::Attack => 80,
        BodyPartType::RangedAttack => 150,
        BodyPartType::Heal => 250,
        BodyPartType::Tough => 10,
        BodyPartType::Claim => 600,
    }
}

/// Energy cost of a whole body.
pub fn body_cost(parts: impl IntoIterator<Item = BodyPartType>) -> i64 {
    parts
        .into_iter()
        .fold(0_i64, |acc, p| acc.saturating_add(part_cost(p)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_types::test_support;

    use super::*;

    #[test]
    fn body_cost_sums_part_costs() {
        let cost = body_cost([BodyPartType::Move, BodyPartType::Work, BodyPartType::Carry]);
        assert_eq!(cost, 200);
        assert_eq!(part_cost(BodyPartType::Claim), 600);
    }

    #[test]
    fn enrich_fills_only_missing_fields() {
        let mut spawn = test_support::object("s1", ObjectType::Spawn, 1, 1);
        enrich(&mut spawn, 1);
        assert_eq!(spawn.hits_max, Some(5000));
        assert_eq!(spawn.store_capacity_resource.get("energy"), Some(&300));

        let mut custom = test_support::object("s2", ObjectType::Spawn, 1, 1);
        custom.hits_max = Some(1);
        enrich(&mut custom, 1);
        assert_eq!(custom.hits_max, Some(1));
    }

    #[test]
    fn extension_capacity_depends_on_level() {
        let mut ext = test_support::object("e1", ObjectType::Extension, 1, 1);
        enrich(&mut ext, 8);
        assert_eq!(ext.store_capacity_resource.get("energy"), Some(&200));
    }

    #[test]
    fn source_and_decay_defaults() {
        let mut source = test_support::object("src", ObjectType::Source, 1, 1);
        enrich(&mut source, 0);
        assert_eq!(source.energy_capacity, Some(3000));
        assert_eq!(
            blueprint(ObjectType::Road).decay,
            Some(Decay {
                amount: 100,
                interval: 1000
            })
        );
        assert!(blueprint(ObjectType::Creep).hits_max.is_none());
    }
}
