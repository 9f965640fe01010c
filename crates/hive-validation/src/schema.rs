//! Intent catalogue: which intents exist, who may issue them, and which
//! fields they carry.

use hive_types::intents::names;
use hive_types::{IntentFieldValue, IntentRecord, ObjectType};

use crate::result::{ErrorCode, ValidationResult};

/// Expected variant of an intent field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A string.
    Text,
    /// A number.
    Number,
    /// A boolean.
    Boolean,
    /// An array of strings.
    TextArray,
    /// An array of numbers.
    NumberArray,
    /// A creep body.
    BodyParts,
}

impl FieldKind {
    /// Whether `value` has this kind.
    pub const fn matches(self, value: &IntentFieldValue) -> bool {
        matches!(
            (self, value),
            (Self::Text, IntentFieldValue::Text(_))
                | (Self::Number, IntentFieldValue::Number(_))
                | (Self::Boolean, IntentFieldValue::Boolean(_))
                | (Self::TextArray, IntentFieldValue::TextArray(_))
                | (Self::NumberArray, IntentFieldValue::NumberArray(_))
                | (Self::BodyParts, IntentFieldValue::BodyPartArray(_))
        )
    }
}

/// One field of an intent argument.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Field name.
    pub field: &'static str,
    /// Expected kind.
    pub kind: FieldKind,
    /// Whether the field must be present.
    pub required: bool,
}

const fn req(field: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule {
        field,
        kind,
        required: true,
    }
}

const fn opt(field: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule {
        field,
        kind,
        required: false,
    }
}

/// Shape of one intent.
#[derive(Debug, Clone, Copy)]
pub struct IntentSchema {
    /// Intent name.
    pub name: &'static str,
    /// Object types allowed to issue it. Empty for global intents.
    pub actors: &'static [ObjectType],
    /// Argument fields.
    pub fields: &'static [FieldRule],
}

impl IntentSchema {
    /// Check every argument of `record` against the field rules.
    pub fn check_arguments(&self, record: &IntentRecord) -> ValidationResult {
        if record.arguments.is_empty() {
            return ValidationResult::Failure(ErrorCode::InvalidArgs);
        }
        let valid = record.arguments.iter().all(|argument| {
            self.fields.iter().all(|rule| match argument.get(rule.field) {
                Some(value) => rule.kind.matches(value),
                None => !rule.required,
            })
        });
        ValidationResult::check(valid, ErrorCode::InvalidArgs)
    }

    /// Whether an object of `object_type` may issue this intent.
    pub fn allows(&self, object_type: ObjectType) -> bool {
        self.actors.contains(&object_type)
    }
}

use FieldKind::{BodyParts, Boolean, Number, NumberArray, Text, TextArray};

const CREEP: &[ObjectType] = &[ObjectType::Creep];

/// Every intent a room object can issue.
pub const ROOM_INTENTS: &[IntentSchema] = &[
    IntentSchema {
        name: names::CREATE_CREEP,
        actors: &[ObjectType::Spawn],
        fields: &[
            req("name", Text),
            req("body", BodyParts),
            opt("energyStructures", TextArray),
            opt("directions", NumberArray),
        ],
    },
    IntentSchema {
        name: names::RENEW_CREEP,
        actors: &[ObjectType::Spawn],
        fields: &[req("id", Text)],
    },
    IntentSchema {
        name: names::RECYCLE_CREEP,
        actors: &[ObjectType::Spawn],
        fields: &[req("id", Text)],
    },
    IntentSchema {
        name: names::SET_SPAWN_DIRECTIONS,
        actors: &[ObjectType::Spawn],
        fields: &[req("directions", NumberArray)],
    },
    IntentSchema {
        name: names::TRANSFER,
        actors: CREEP,
        fields: &[req("id", Text), req("resourceType", Text), opt("amount", Number)],
    },
    IntentSchema {
        name: names::WITHDRAW,
        actors: CREEP,
        fields: &[req("id", Text), req("resourceType", Text), opt("amount", Number)],
    },
    IntentSchema {
        name: names::PICKUP,
        actors: CREEP,
        fields: &[req("id", Text)],
    },
    IntentSchema {
        name: names::DROP,
        actors: CREEP,
        fields: &[req("resourceType", Text), opt("amount", Number)],
    },
    IntentSchema {
        name: names::HARVEST,
        actors: CREEP,
        fields: &[req("id", Text)],
    },
    IntentSchema {
        name: names::UPGRADE_CONTROLLER,
        actors: CREEP,
        fields: &[req("id", Text)],
    },
    IntentSchema {
        name: names::MOVE,
        actors: CREEP,
        fields: &[req("direction", Number)],
    },
    IntentSchema {
        name: names::MOVE_TO,
        actors: CREEP,
        fields: &[req("x", Number), req("y", Number)],
    },
    IntentSchema {
        name: names::TRANSFER_ENERGY,
        actors: &[ObjectType::Link],
        fields: &[req("id", Text), opt("amount", Number)],
    },
    IntentSchema {
        name: names::ATTACK,
        actors: &[ObjectType::Tower],
        fields: &[req("id", Text)],
    },
    IntentSchema {
        name: names::HEAL,
        actors: &[ObjectType::Tower],
        fields: &[req("id", Text)],
    },
    IntentSchema {
        name: names::REPAIR,
        actors: &[ObjectType::Tower],
        fields: &[req("id", Text)],
    },
    IntentSchema {
        name: names::RUN_REACTION,
        actors: &[ObjectType::Lab],
        fields: &[req("lab1", Text), req("lab2", Text)],
    },
    IntentSchema {
        name: names::PRODUCE,
        actors: &[ObjectType::Factory],
        fields: &[req("resourceType", Text)],
    },
    IntentSchema {
        name: names::PROCESS_POWER,
        actors: &[ObjectType::PowerSpawn],
        fields: &[],
    },
    IntentSchema {
        name: names::LAUNCH_NUKE,
        actors: &[ObjectType::Nuker],
        fields: &[req("roomName", Text), req("x", Number), req("y", Number)],
    },
];

/// Every global user intent.
pub const GLOBAL_INTENTS: &[IntentSchema] = &[
    IntentSchema {
        name: names::CREATE_ORDER,
        actors: &[],
        fields: &[
            req("type", Text),
            req("resourceType", Text),
            req("price", Number),
            req("totalAmount", Number),
            opt("roomName", Text),
        ],
    },
    IntentSchema {
        name: names::CHANGE_ORDER_PRICE,
        actors: &[],
        fields: &[req("orderId", Text), req("newPrice", Number)],
    },
    IntentSchema {
        name: names::CANCEL_ORDER,
        actors: &[],
        fields: &[req("orderId", Text)],
    },
    IntentSchema {
        name: names::EXTEND_ORDER,
        actors: &[],
        fields: &[req("orderId", Text), req("addAmount", Number)],
    },
    IntentSchema {
        name: names::CREATE_POWER_CREEP,
        actors: &[],
        fields: &[req("name", Text), req("className", Text)],
    },
    IntentSchema {
        name: names::RENAME_POWER_CREEP,
        actors: &[],
        fields: &[req("id", Text), req("name", Text)],
    },
    IntentSchema {
        name: names::DELETE_POWER_CREEP,
        actors: &[],
        fields: &[req("id", Text), opt("cancel", Boolean)],
    },
    IntentSchema {
        name: names::UPGRADE_POWER_CREEP,
        actors: &[],
        fields: &[req("id", Text), req("power", Text)],
    },
];

/// Schema of a room intent.
pub fn room_schema(name: &str) -> Option<&'static IntentSchema> {
    ROOM_INTENTS.iter().find(|s| s.name == name)
}

/// Schema of a global intent.
pub fn global_schema(name: &str) -> Option<&'static IntentSchema> {
    GLOBAL_INTENTS.iter().find(|s| s.name == name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_types::test_support::{intent, number, text};

    use super::*;

    #[test]
    fn required_fields_must_be_present_with_kind() {
        let schema = room_schema(names::TRANSFER).unwrap();
        let ok = intent(
            names::TRANSFER,
            vec![("id", text("s1")), ("resourceType", text("energy"))],
        );
        assert!(schema.check_arguments(&ok).is_success());

        let missing = intent(names::TRANSFER, vec![("id", text("s1"))]);
        assert_eq!(
            schema.check_arguments(&missing),
            ValidationResult::Failure(ErrorCode::InvalidArgs)
        );

        let wrong_kind = intent(
            names::TRANSFER,
            vec![("id", number(4)), ("resourceType", text("energy"))],
        );
        assert!(!schema.check_arguments(&wrong_kind).is_success());
    }

    #[test]
    fn actors_are_restricted() {
        let schema = room_schema(names::ATTACK).unwrap();
        assert!(schema.allows(ObjectType::Tower));
        assert!(!schema.allows(ObjectType::Creep));
    }

    #[test]
    fn catalogues_have_unique_names() {
        for catalogue in [ROOM_INTENTS, GLOBAL_INTENTS] {
            let mut names: Vec<&str> = catalogue.iter().map(|s| s.name).collect();
            names.sort_unstable();
            let before = names.len();
            names.dedup();
            assert_eq!(names.len(), before);
        }
    }
}
