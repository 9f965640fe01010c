//! Structure activation.
//!
//! An owned structure acts only while the room's controller supports it:
//! the controller must be owned by the structure's owner, at level 1 or
//! higher, and the level must permit the structure's type. When a room
//! holds more structures of a type than the level allows, the ones closest
//! to the controller win, ties broken by id.
//!
//! Inactive structures are skipped without any error, exactly as if no
//! intent had been issued to them.

use std::collections::{BTreeMap, BTreeSet};

use hive_blueprints::controller::{is_multi_instance, structure_allowance};
use hive_types::{ObjectId, ObjectType, RoomObjectSnapshot, RoomSnapshot};

/// The owned structures of a room that may act this tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveStructures {
    active: BTreeSet<ObjectId>,
}

impl ActiveStructures {
    /// Evaluate the activation rule over a snapshot.
    pub fn compute(snapshot: &RoomSnapshot) -> Self {
        let mut active = BTreeSet::new();
        let Some(controller) = snapshot.controller() else {
            return Self { active };
        };
        let level = controller.level.unwrap_or(0);
        let owner = match &controller.user {
            Some(owner) if level >= 1 => owner,
            _ => return Self { active },
        };

        let mut ranked: BTreeMap<ObjectType, Vec<(u8, &ObjectId)>> = BTreeMap::new();
        let candidates = snapshot
            .objects
            .values()
            .filter(|o| o.object_type.is_owned_structure() && o.is_owned_by(owner));
        for object in candidates {
            if structure_allowance(object.object_type, level) == 0 {
                continue;
            }
            if is_multi_instance(object.object_type) {
                let distance = object.position().range_to(controller.position());
                ranked
                    .entry(object.object_type)
                    .or_default()
                    .push((distance, &object.id));
            } else {
                active.insert(object.id.clone());
            }
        }

        for (object_type, mut entries) in ranked {
            entries.sort();
            let allowance = usize::try_from(structure_allowance(object_type, level))
                .unwrap_or(usize::MAX);
            active.extend(entries.into_iter().take(allowance).map(|(_, id)| id.clone()));
        }

        Self { active }
    }

    /// Whether `object` may act. Objects outside the rule always may.
    pub fn is_active(&self, object: &RoomObjectSnapshot) -> bool {
        !object.object_type.is_owned_structure() || self.active.contains(&object.id)
    }

    /// Number of active owned structures.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no owned structure is active.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_types::test_support::{self, RoomFixture, owner, rival};

    use super::*;

    fn object<'a>(snapshot: &'a RoomSnapshot, id: &str) -> &'a RoomObjectSnapshot {
        snapshot.objects.get(&ObjectId::from(id)).unwrap()
    }

    #[test]
    fn no_controller_means_nothing_is_active() {
        let snapshot = RoomFixture::new(1)
            .with(test_support::spawn("s1", &owner(), 10, 10, 300))
            .build();
        let active = ActiveStructures::compute(&snapshot);
        assert!(active.is_empty());
        assert!(!active.is_active(object(&snapshot, "s1")));
    }

    #[test]
    fn controller_owner_and_level_gate_activation() {
        let snapshot = RoomFixture::new(1)
            .with(test_support::controller("ctrl", 1, Some(&owner())))
            .with(test_support::spawn("mine", &owner(), 10, 10, 300))
            .with(test_support::spawn("theirs", &rival(), 12, 10, 300))
            .with(test_support::structure("tower", ObjectType::Tower, &owner(), 20, 20, 0, 1000))
            .build();
        let active = ActiveStructures::compute(&snapshot);
        assert!(active.is_active(object(&snapshot, "mine")));
        assert!(!active.is_active(object(&snapshot, "theirs")));
        assert!(!active.is_active(object(&snapshot, "tower")));

        let unowned = RoomFixture::new(1)
            .with(test_support::controller("ctrl", 0, Some(&owner())))
            .with(test_support::spawn("mine", &owner(), 10, 10, 300))
            .build();
        assert!(ActiveStructures::compute(&unowned).is_empty());
    }

    #[test]
    fn closest_structures_win_ties_broken_by_id() {
        // Level 2 permits five extensions; six exist.
        let mut fixture = RoomFixture::new(1)
            .with(test_support::controller("ctrl", 2, Some(&owner())));
        for (id, x) in [("e1", 20), ("e2", 21), ("e3", 22), ("e4", 23), ("e5b", 30), ("e5a", 30)] {
            fixture = fixture.with(test_support::extension(id, &owner(), x, 25, 0));
        }
        let snapshot = fixture.build();
        let active = ActiveStructures::compute(&snapshot);
        assert_eq!(active.len(), 5);
        assert!(active.is_active(object(&snapshot, "e4")));
        assert!(active.is_active(object(&snapshot, "e5a")));
        assert!(!active.is_active(object(&snapshot, "e5b")));
    }

    #[test]
    fn unowned_types_are_outside_the_rule() {
        let snapshot = RoomFixture::new(1)
            .with(test_support::source("src", 5, 5))
            .build();
        let active = ActiveStructures::compute(&snapshot);
        assert!(active.is_active(object(&snapshot, "src")));
    }
}
