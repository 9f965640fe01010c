//! End-of-tick side channels: the room event log and the map view.

use std::collections::BTreeMap;

use hive_types::{ObjectType, RoomObjectSnapshot};
use serde_json::Value;

use super::RoomProcessorStep;
use crate::context::RoomProcessorContext;
use crate::error::ProcessorError;

/// Map view categories for unowned terrain features, always present.
const FEATURE_KEYS: [&str; 8] = ["w", "r", "pb", "p", "s", "c", "m", "k"];

fn feature_key(object_type: ObjectType) -> Option<&'static str> {
    match object_type {
        ObjectType::ConstructedWall => Some("w"),
        ObjectType::Road => Some("r"),
        ObjectType::PowerBank => Some("pb"),
        ObjectType::Portal => Some("p"),
        ObjectType::Source => Some("s"),
        ObjectType::Controller => Some("c"),
        ObjectType::Mineral => Some("m"),
        ObjectType::KeeperLair => Some("k"),
        _ => None,
    }
}

/// Compact per-room map: feature positions plus the positions of creeps
/// and owned structures under their owner's id.
pub fn map_view(objects: &[RoomObjectSnapshot]) -> Value {
    let mut view: BTreeMap<String, Vec<[u8; 2]>> = FEATURE_KEYS
        .iter()
        .map(|key| ((*key).to_owned(), Vec::new()))
        .collect();
    for object in objects {
        let shown_by_owner = object.object_type.is_owned_structure()
            || matches!(object.object_type, ObjectType::Creep | ObjectType::PowerCreep);
        let key = match (feature_key(object.object_type), &object.user) {
            (Some(key), _) => key.to_owned(),
            (None, Some(user)) if shown_by_owner => user.to_string(),
            _ => continue,
        };
        view.entry(key).or_default().push([object.x, object.y]);
    }
    serde_json::json!(view)
}

/// Publishes the accumulated event log and the map view.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventLogStep;

impl RoomProcessorStep for EventLogStep {
    fn name(&self) -> &'static str {
        "event-log"
    }

    fn run(&self, ctx: &mut RoomProcessorContext<'_>) -> Result<(), ProcessorError> {
        let events = serde_json::to_value(ctx.take_events())?;
        let view = map_view(&ctx.objects()?);
        let writer = ctx.writer();
        writer.set_event_log(events);
        writer.set_map_view(view);
        Ok(())
    }
}
