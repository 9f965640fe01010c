//! Intent typing boundary.
//!
//! Raw intents arrive as loosely-typed JSON written by the player-script
//! runtime. They are converted here, once per snapshot build, into
//! [`IntentRecord`]s whose fields are a closed [`IntentFieldValue`]
//! variant. Values that fit no variant (nulls, nested objects, mixed
//! arrays) are dropped with a `debug` log.
//!
//! Room layout:
//!
//! ```text
//! {"users": {"<user>": {"objects": {"<object>": {"<intent>": args | [args, ...]}}}}}
//! ```
//!
//! Global layout:
//!
//! ```text
//! [{"user": "<user>", "intents": {"<intent>": args | [args, ...]}}, ...]
//! ```
//!
//! Each entry of a global array becomes a record of its own, so every entry
//! is validated and processed on its own.

use hive_types::{
    BodyPartType, GlobalUserIntent, IntentArgument, IntentFieldValue, IntentRecord, ObjectId,
    RoomIntentSnapshot, UserId,
};
use serde_json::{Map, Value};

/// Field whose string arrays are read as creep bodies.
const BODY_FIELD: &str = "body";

/// Type one raw field value.
pub fn type_field(field: &str, value: &Value) -> Option<IntentFieldValue> {
    match value {
        Value::String(s) => Some(IntentFieldValue::Text(s.clone())),
        Value::Number(n) => n.as_f64().map(IntentFieldValue::Number),
        Value::Bool(b) => Some(IntentFieldValue::Boolean(*b)),
        Value::Array(items) => type_array(field, items),
        Value::Null | Value::Object(_) => None,
    }
}

fn type_array(field: &str, items: &[Value]) -> Option<IntentFieldValue> {
    if items.iter().all(Value::is_string) {
        let texts: Vec<String> = items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect();
        if field == BODY_FIELD && !texts.is_empty() {
            let parts: Option<Vec<BodyPartType>> =
                texts.iter().map(|t| BodyPartType::parse(t)).collect();
            if let Some(parts) = parts {
                return Some(IntentFieldValue::BodyPartArray(parts));
            }
        }
        return Some(IntentFieldValue::TextArray(texts));
    }
    if items.iter().all(Value::is_number) {
        return Some(IntentFieldValue::NumberArray(
            items.iter().filter_map(Value::as_f64).collect(),
        ));
    }
    None
}

/// Type one argument object.
pub fn type_argument(raw: &Map<String, Value>) -> IntentArgument {
    let mut argument = IntentArgument::new();
    for (field, value) in raw {
        match type_field(field, value) {
            Some(typed) => {
                argument.fields.insert(field.clone(), typed);
            }
            None => {
                tracing::debug!(field = %field, "Dropped untypable intent field");
            }
        }
    }
    argument
}

/// Type `args | [args, ...]` under one intent name.
fn type_record(name: &str, raw: &Value) -> Option<IntentRecord> {
    let arguments: Vec<IntentArgument> = match raw {
        Value::Object(map) => vec![type_argument(map)],
        Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| {
                let map = entry.as_object();
                if map.is_none() {
                    tracing::debug!(intent = %name, "Dropped non-object intent argument");
                }
                map.map(type_argument)
            })
            .collect(),
        _ => {
            tracing::debug!(intent = %name, "Dropped intent with non-object arguments");
            return None;
        }
    };
    if arguments.is_empty() {
        return None;
    }
    Some(IntentRecord {
        name: name.to_owned(),
        arguments,
    })
}

fn type_records(raw: &Map<String, Value>) -> Vec<IntentRecord> {
    raw.iter()
        .filter_map(|(name, args)| type_record(name, args))
        .collect()
}

/// Type the raw intents of one room.
pub fn type_room_intents(raw: &Value) -> RoomIntentSnapshot {
    let mut snapshot = RoomIntentSnapshot::default();
    let Some(users) = raw.get("users").and_then(Value::as_object) else {
        return snapshot;
    };

    for (user, entry) in users {
        let Some(objects) = entry.get("objects").and_then(Value::as_object) else {
            continue;
        };
        for (object_id, intents) in objects {
            let Some(intents) = intents.as_object() else {
                continue;
            };
            for record in type_records(intents) {
                snapshot.push(
                    UserId::from(user.as_str()),
                    ObjectId::from(object_id.as_str()),
                    record,
                );
            }
        }
    }
    snapshot
}

/// Type the raw global user intents.
pub fn type_user_intents(raw: &Value) -> Vec<GlobalUserIntent> {
    let Some(entries) = raw.as_array() else {
        return Vec::new();
    };

    let mut typed = Vec::new();
    for entry in entries {
        let (Some(user), Some(intents)) = (
            entry.get("user").and_then(Value::as_str),
            entry.get("intents").and_then(Value::as_object),
        ) else {
            tracing::debug!("Dropped malformed user intent entry");
            continue;
        };
        typed.extend(
            type_records(intents)
                .into_iter()
                .flat_map(IntentRecord::split)
                .map(|record| GlobalUserIntent {
                    user: UserId::from(user),
                    record,
                }),
        );
    }
    typed
}
