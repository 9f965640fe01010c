//! Room snapshot builder.

use std::collections::BTreeMap;
use std::sync::Arc;

use hive_blueprints::enrich;
use hive_db::{DocumentKind, RoomDocuments, WorldDataSource};
use hive_types::{
    FlagSnapshot, ObjectId, ObjectType, PowerCreepSnapshot, RoomInfoSnapshot, RoomIntentSnapshot,
    RoomName, RoomObjectSnapshot, RoomSnapshot, RoomTerrain, UserState,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SnapshotError;
use crate::provider::SnapshotBuilder;
use crate::typing::type_room_intents;

/// Placeholder used in errors for documents without an `_id`.
const MISSING_ID: &str = "<missing>";

fn document_id(document: &Value) -> &str {
    document
        .get("_id")
        .and_then(Value::as_str)
        .unwrap_or(MISSING_ID)
}

/// Deserialize a non-object document, naming it on failure.
pub(crate) fn parse_document<T: DeserializeOwned>(
    kind: DocumentKind,
    tick: u64,
    document: Value,
) -> Result<T, SnapshotError> {
    let id = document_id(&document).to_owned();
    serde_json::from_value(document).map_err(|e| SnapshotError::MalformedDocument {
        kind,
        id,
        tick,
        reason: e.to_string(),
    })
}

/// Deserialize an object document, naming room, tick and id on failure.
pub(crate) fn parse_object(
    room: &RoomName,
    tick: u64,
    document: Value,
) -> Result<RoomObjectSnapshot, SnapshotError> {
    let object_id = ObjectId::from(document_id(&document));
    serde_json::from_value(document).map_err(|e| {
        tracing::error!(room = %room, tick, object_id = %object_id, error = %e, "Malformed room object");
        SnapshotError::MalformedObject {
            room: room.clone(),
            tick,
            object_id,
            reason: e.to_string(),
        }
    })
}

/// Assemble a room snapshot from raw documents.
///
/// Objects are enriched from the blueprint registry using the level of
/// the room's controller (0 when there is none).
pub fn assemble_room(
    room: &RoomName,
    game_time: u64,
    documents: RoomDocuments,
) -> Result<RoomSnapshot, SnapshotError> {
    let mut objects = documents
        .objects
        .into_iter()
        .map(|doc| parse_object(room, game_time, doc))
        .collect::<Result<Vec<_>, _>>()?;

    let controller_level = objects
        .iter()
        .find(|o| o.object_type == ObjectType::Controller)
        .and_then(|c| c.level)
        .unwrap_or(0);
    for object in &mut objects {
        enrich(object, controller_level);
    }

    let info = match documents.room_info {
        Some(doc) => parse_document::<RoomInfoSnapshot>(DocumentKind::Rooms, game_time, doc)?,
        None => RoomInfoSnapshot::new(room.clone()),
    };

    let users = documents
        .users
        .into_iter()
        .map(|doc| {
            parse_document::<UserState>(DocumentKind::Users, game_time, doc)
                .map(|u| (u.id.clone(), u))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    let terrain = documents
        .terrain
        .map(|encoded| {
            RoomTerrain::decode(&encoded).ok_or_else(|| SnapshotError::InvalidTerrain {
                room: room.clone(),
            })
        })
        .transpose()?;

    let flags = documents
        .flags
        .into_iter()
        .map(serde_json::from_value::<FlagSnapshot>)
        .filter_map(|parsed| {
            parsed
                .map_err(|e| tracing::debug!(room = %room, error = %e, "Skipped malformed flag"))
                .ok()
        })
        .collect();

    let power_creeps = documents
        .power_creeps
        .into_iter()
        .map(|doc| {
            parse_document::<PowerCreepSnapshot>(DocumentKind::PowerCreeps, game_time, doc)
                .map(|pc| (pc.id.clone(), pc))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    let intents = documents.intents.as_ref().map(type_room_intents);

    Ok(RoomSnapshot {
        room_name: room.clone(),
        game_time,
        info,
        objects: objects.into_iter().map(|o| (o.id.clone(), o)).collect(),
        users,
        terrain,
        flags,
        power_creeps,
        intents,
    })
}

/// Builds [`RoomSnapshot`]s from a [`WorldDataSource`].
pub struct RoomSnapshotBuilder<S> {
    source: Arc<S>,
}

impl<S> RoomSnapshotBuilder<S> {
    /// Read from `source`.
    pub const fn new(source: Arc<S>) -> Self {
        Self { source }
    }
}

impl<S: WorldDataSource> SnapshotBuilder for RoomSnapshotBuilder<S> {
    type Key = RoomName;
    type Snapshot = RoomSnapshot;

    async fn build(&self, room: &RoomName, game_time: u64) -> Result<RoomSnapshot, SnapshotError> {
        let documents = self.source.load_room(room).await?;
        let snapshot = assemble_room(room, game_time, documents)?;
        tracing::debug!(
            room = %room,
            tick = game_time,
            objects = snapshot.objects.len(),
            intents = snapshot.intents.as_ref().map_or(0, RoomIntentSnapshot::len),
            "Assembled room snapshot"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_db::MemoryStore;
    use hive_types::test_support::{ROOM, room};
    use serde_json::json;

    use super::*;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_room(&room()).unwrap();
        store
            .put_document(
                DocumentKind::RoomObjects,
                json!({"_id": "ctrl", "type": "controller", "room": ROOM, "x": 25, "y": 25, "level": 7, "user": "user1"}),
            )
            .unwrap();
        store
            .put_document(
                DocumentKind::RoomObjects,
                json!({"_id": "ext1", "type": "extension", "room": ROOM, "x": 10, "y": 10, "user": "user1", "store": {"energy": 5}}),
            )
            .unwrap();
        store
    }

    #[tokio::test]
    async fn builds_enriched_objects() {
        let builder = RoomSnapshotBuilder::new(Arc::new(seeded()));
        let snapshot = builder.build(&room(), 10).await.unwrap();

        assert_eq!(snapshot.game_time, 10);
        let ext = snapshot.objects.get(&ObjectId::from("ext1")).unwrap();
        assert_eq!(ext.store_capacity_for("energy"), 100);
        assert!(ext.hits_max.is_some());
        assert!(snapshot.intents.is_none());
    }

    #[tokio::test]
    async fn malformed_object_names_room_tick_and_id() {
        let store = seeded();
        store
            .put_document(
                DocumentKind::RoomObjects,
                json!({"_id": "bad", "type": "creep", "room": ROOM, "x": "nope", "y": 1}),
            )
            .unwrap();
        let builder = RoomSnapshotBuilder::new(Arc::new(store));
        let err = builder.build(&room(), 3).await.unwrap_err();
        match err {
            SnapshotError::MalformedObject {
                room: r,
                tick,
                object_id,
                ..
            } => {
                assert_eq!(r, room());
                assert_eq!(tick, 3);
                assert_eq!(object_id, ObjectId::from("bad"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_terrain_is_rejected() {
        let documents = RoomDocuments {
            terrain: Some("012".into()),
            ..RoomDocuments::default()
        };
        assert!(matches!(
            assemble_room(&room(), 1, documents),
            Err(SnapshotError::InvalidTerrain { .. })
        ));
    }

    #[test]
    fn intents_are_typed() {
        let documents = RoomDocuments {
            intents: Some(json!({"users": {"user1": {"objects": {"c1": {"move": {"direction": 3}}}}}})),
            ..RoomDocuments::default()
        };
        let snapshot = assemble_room(&room(), 1, documents).unwrap();
        assert_eq!(snapshot.intents.unwrap().len(), 1);
    }
}
