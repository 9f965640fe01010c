//! Energy allocation for spawning.
//!
//! Draws come from the caller's preferred structures first, then from
//! every remaining spawn and extension in id order. Allocation is
//! all-or-nothing: either the full cost is covered by the returned plan or
//! nothing is drawn at all.

use std::collections::{BTreeMap, BTreeSet};

use hive_types::resources::ENERGY;
use hive_types::{ObjectId, ObjectType, RoomObjectSnapshot, UserId};

use crate::activation::ActiveStructures;

/// Energy taken from one structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyDraw {
    /// Structure drawn from.
    pub id: ObjectId,
    /// Amount taken.
    pub amount: i64,
    /// Energy left in the structure afterwards.
    pub remaining: i64,
}

/// A complete set of draws covering a cost.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnergyPlan {
    /// Draws in the order they were taken.
    pub draws: Vec<EnergyDraw>,
    /// Sum of all draws.
    pub total: i64,
}

/// The eligible structures cannot cover the cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("insufficient energy: need {needed}, {available} available")]
pub struct InsufficientEnergy {
    /// Requested cost.
    pub needed: i64,
    /// Energy the eligible structures hold.
    pub available: i64,
}

/// Plans energy draws from one user's spawns and extensions.
#[derive(Debug)]
pub struct EnergyAllocator<'a> {
    user: &'a UserId,
    structures: BTreeMap<&'a ObjectId, &'a RoomObjectSnapshot>,
    active: &'a ActiveStructures,
}

impl<'a> EnergyAllocator<'a> {
    /// An allocator over the current state of the room's objects.
    pub fn new(
        user: &'a UserId,
        objects: &'a [RoomObjectSnapshot],
        active: &'a ActiveStructures,
    ) -> Self {
        let structures = objects
            .iter()
            .filter(|o| matches!(o.object_type, ObjectType::Spawn | ObjectType::Extension))
            .map(|o| (&o.id, o))
            .collect();
        Self {
            user,
            structures,
            active,
        }
    }

    fn eligible(&self, object: &RoomObjectSnapshot) -> bool {
        object.is_owned_by(self.user)
            && self.active.is_active(object)
            && object.store_amount(ENERGY) > 0
    }

    /// Plan draws covering `cost`, trying `preferred` first.
    ///
    /// Duplicate, missing, foreign and inactive entries of `preferred` are
    /// skipped.
    pub fn allocate(
        &self,
        cost: i64,
        preferred: &[ObjectId],
    ) -> Result<EnergyPlan, InsufficientEnergy> {
        let mut plan = EnergyPlan::default();
        if cost <= 0 {
            return Ok(plan);
        }

        let mut seen: BTreeSet<&ObjectId> = BTreeSet::new();
        let preferred = preferred
            .iter()
            .filter_map(|id| self.structures.get(id).copied());
        let order = preferred.chain(self.structures.values().copied());

        let mut outstanding = cost;
        for structure in order {
            if outstanding == 0 {
                break;
            }
            if !seen.insert(&structure.id) || !self.eligible(structure) {
                continue;
            }
            let held = structure.store_amount(ENERGY);
            let amount = held.min(outstanding);
            outstanding = outstanding.saturating_sub(amount);
            plan.total = plan.total.saturating_add(amount);
            plan.draws.push(EnergyDraw {
                id: structure.id.clone(),
                amount,
                remaining: held.saturating_sub(amount),
            });
        }

        if outstanding > 0 {
            return Err(InsufficientEnergy {
                needed: cost,
                available: plan.total,
            });
        }
        Ok(plan)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_types::test_support::{self, RoomFixture, owner, rival};

    use super::*;

    fn room_objects() -> (Vec<RoomObjectSnapshot>, ActiveStructures) {
        let snapshot = RoomFixture::new(1)
            .with(test_support::controller("ctrl", 2, Some(&owner())))
            .with(test_support::spawn("s1", &owner(), 25, 20, 100))
            .with(test_support::extension("e1", &owner(), 24, 24, 50))
            .with(test_support::extension("e2", &owner(), 26, 24, 50))
            .with(test_support::extension("foreign", &rival(), 27, 24, 50))
            .build();
        let active = ActiveStructures::compute(&snapshot);
        (snapshot.objects.into_values().collect(), active)
    }

    fn ids(plan: &EnergyPlan) -> Vec<&str> {
        plan.draws.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn preferred_structures_are_drained_first() {
        let (objects, active) = room_objects();
        let user = owner();
        let allocator = EnergyAllocator::new(&user, &objects, &active);
        let preferred = [
            ObjectId::from("e2"),
            ObjectId::from("e2"),
            ObjectId::from("missing"),
            ObjectId::from("foreign"),
        ];
        let plan = allocator.allocate(120, &preferred).unwrap();
        assert_eq!(ids(&plan), vec!["e2", "e1", "s1"]);
        assert_eq!(plan.total, 120);
        assert_eq!(plan.draws.last().unwrap().remaining, 80);
    }

    #[test]
    fn id_order_without_preference() {
        let (objects, active) = room_objects();
        let user = owner();
        let plan = EnergyAllocator::new(&user, &objects, &active)
            .allocate(60, &[])
            .unwrap();
        assert_eq!(ids(&plan), vec!["e1", "e2"]);
    }

    #[test]
    fn shortfall_draws_nothing() {
        let (objects, active) = room_objects();
        let user = owner();
        let err = EnergyAllocator::new(&user, &objects, &active)
            .allocate(201, &[])
            .unwrap_err();
        assert_eq!(
            err,
            InsufficientEnergy {
                needed: 201,
                available: 200
            }
        );
    }

    #[test]
    fn inactive_structures_are_not_drawn() {
        let (objects, _) = room_objects();
        let user = owner();
        let nothing_active = ActiveStructures::default();
        let err = EnergyAllocator::new(&user, &objects, &nothing_active)
            .allocate(10, &[])
            .unwrap_err();
        assert_eq!(err.available, 0);
    }
}
