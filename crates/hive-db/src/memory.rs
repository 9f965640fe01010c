//! In-memory implementation of every persistence trait.
//!
//! Used by the test suites and for offline runs. All state lives behind one
//! [`std::sync::Mutex`]; no lock is ever held across an `.await`.
//!
//! The store counts physical writes per document so tests can assert the
//! bulk writer's at-most-one-write-per-document guarantee.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hive_types::RoomName;
use serde_json::{Value, json};

use crate::bulk::{BulkBatch, BulkOperation};
use crate::document::DocumentKind;
use crate::error::DbError;
use crate::store::{
    DocumentStore, EnvKey, EnvironmentStore, GlobalDocuments, HistoryChunk, HistoryStore,
    IntentStore, RoomDocuments, SideChannelStore, WorldDataSource,
};

#[derive(Debug, Default)]
struct MemoryState {
    documents: BTreeMap<DocumentKind, BTreeMap<String, Value>>,
    terrain: BTreeMap<RoomName, String>,
    flags: BTreeMap<RoomName, Vec<Value>>,
    room_intents: BTreeMap<RoomName, Value>,
    user_intents: Option<Value>,
    event_logs: BTreeMap<(RoomName, u64), Value>,
    map_views: BTreeMap<(RoomName, u64), Value>,
    history: Vec<HistoryChunk>,
    environment: BTreeMap<&'static str, String>,
    write_counts: BTreeMap<(DocumentKind, String), u64>,
    bulk_flushes: u64,
}

impl MemoryState {
    fn collection(&self, kind: DocumentKind) -> impl Iterator<Item = &Value> {
        self.documents.get(&kind).into_iter().flat_map(BTreeMap::values)
    }

    fn count_write(&mut self, kind: DocumentKind, id: &str) {
        let count = self.write_counts.entry((kind, id.to_owned())).or_insert(0);
        *count = count.saturating_add(1);
    }
}

fn field_is(document: &Value, field: &str, expected: &str) -> bool {
    document.get(field).and_then(Value::as_str) == Some(expected)
}

/// Thread-safe in-memory world store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Insert or replace a document directly, bypassing write counting.
    pub fn put_document(&self, kind: DocumentKind, document: Value) -> Result<(), DbError> {
        let id = document
            .get("_id")
            .and_then(Value::as_str)
            .ok_or(DbError::MissingId {
                kind: kind.as_str(),
            })?
            .to_owned();
        self.lock()
            .documents
            .entry(kind)
            .or_default()
            .insert(id, document);
        Ok(())
    }

    /// Register an active room with default metadata.
    pub fn add_room(&self, room: &RoomName) -> Result<(), DbError> {
        self.put_document(
            DocumentKind::Rooms,
            json!({"_id": room.as_str(), "status": "normal", "active": true}),
        )
    }

    /// Store the encoded terrain of `room`.
    pub fn set_terrain(&self, room: &RoomName, encoded: impl Into<String>) {
        self.lock().terrain.insert(room.clone(), encoded.into());
    }

    /// Store the flags of `room`.
    pub fn set_flags(&self, room: &RoomName, flags: Vec<Value>) {
        self.lock().flags.insert(room.clone(), flags);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// A stored document.
    pub fn document(&self, kind: DocumentKind, id: &str) -> Option<Value> {
        self.lock()
            .documents
            .get(&kind)
            .and_then(|c| c.get(id))
            .cloned()
    }

    /// All documents of `kind`, in id order.
    pub fn documents(&self, kind: DocumentKind) -> Vec<Value> {
        self.lock().collection(kind).cloned().collect()
    }

    /// Physical writes performed on one document.
    pub fn write_count(&self, kind: DocumentKind, id: &str) -> u64 {
        self.lock()
            .write_counts
            .get(&(kind, id.to_owned()))
            .copied()
            .unwrap_or(0)
    }

    /// Number of non-empty bulk batches applied.
    pub fn bulk_flushes(&self) -> u64 {
        self.lock().bulk_flushes
    }

    /// Stored event log of `room` at `tick`.
    pub fn event_log(&self, room: &RoomName, tick: u64) -> Option<Value> {
        self.lock().event_logs.get(&(room.clone(), tick)).cloned()
    }

    /// Stored map view of `room` at `tick`.
    pub fn map_view(&self, room: &RoomName, tick: u64) -> Option<Value> {
        self.lock().map_views.get(&(room.clone(), tick)).cloned()
    }

    /// Every saved history chunk.
    pub fn history_chunks(&self) -> Vec<HistoryChunk> {
        self.lock().history.clone()
    }

    /// Raw intents currently stored for `room`.
    pub fn room_intents(&self, room: &RoomName) -> Option<Value> {
        self.lock().room_intents.get(room).cloned()
    }
}

// =============================================================================
// Trait implementations
// =============================================================================

impl DocumentStore for MemoryStore {
    async fn apply_bulk(&self, batch: BulkBatch) -> Result<(), DbError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut state = self.lock();
        let kind = batch.kind;
        for operation in batch.operations {
            let id = operation.id().to_owned();
            match operation {
                BulkOperation::Insert { document, .. } => {
                    state.documents.entry(kind).or_default().insert(id.clone(), document);
                }
                BulkOperation::Update { update, .. } => {
                    let document = state
                        .documents
                        .entry(kind)
                        .or_default()
                        .entry(id.clone())
                        .or_insert_with(|| json!({"_id": id.as_str()}));
                    update.apply_to(document);
                }
                BulkOperation::Remove { .. } => {
                    if let Some(collection) = state.documents.get_mut(&kind) {
                        collection.remove(&id);
                    }
                }
            }
            state.count_write(kind, &id);
        }
        state.bulk_flushes = state.bulk_flushes.saturating_add(1);
        Ok(())
    }
}

impl WorldDataSource for MemoryStore {
    async fn load_room(&self, room: &RoomName) -> Result<RoomDocuments, DbError> {
        let state = self.lock();
        let room_name = room.as_str();

        let objects: Vec<Value> = state
            .collection(DocumentKind::RoomObjects)
            .filter(|o| field_is(o, "room", room_name))
            .cloned()
            .collect();
        let users: Vec<Value> = state
            .collection(DocumentKind::Users)
            .filter(|u| {
                let id = u.get("_id").and_then(Value::as_str).unwrap_or_default();
                objects.iter().any(|o| field_is(o, "user", id))
            })
            .cloned()
            .collect();

        Ok(RoomDocuments {
            room_info: state
                .documents
                .get(&DocumentKind::Rooms)
                .and_then(|c| c.get(room_name))
                .cloned(),
            users,
            terrain: state.terrain.get(room).cloned(),
            flags: state.flags.get(room).cloned().unwrap_or_default(),
            power_creeps: state
                .collection(DocumentKind::PowerCreeps)
                .filter(|p| field_is(p, "room", room_name))
                .cloned()
                .collect(),
            intents: state.room_intents.get(room).cloned(),
            objects,
        })
    }

    async fn load_global(&self) -> Result<GlobalDocuments, DbError> {
        let state = self.lock();
        Ok(GlobalDocuments {
            inter_room_creeps: state
                .collection(DocumentKind::RoomObjects)
                .filter(|o| o.get("interRoom").is_some_and(|v| !v.is_null()))
                .cloned()
                .collect(),
            rooms: state.collection(DocumentKind::Rooms).cloned().collect(),
            special_objects: state
                .collection(DocumentKind::RoomObjects)
                .filter(|o| field_is(o, "type", "powerBank"))
                .cloned()
                .collect(),
            orders: state.collection(DocumentKind::MarketOrders).cloned().collect(),
            users: state.collection(DocumentKind::Users).cloned().collect(),
            power_creeps: state.collection(DocumentKind::PowerCreeps).cloned().collect(),
            user_intents: state.user_intents.clone(),
        })
    }

    async fn list_active_rooms(&self) -> Result<Vec<RoomName>, DbError> {
        let state = self.lock();
        Ok(state
            .collection(DocumentKind::Rooms)
            .filter(|r| r.get("active").and_then(Value::as_bool) != Some(false))
            .filter_map(|r| r.get("_id").and_then(Value::as_str).map(RoomName::from))
            .collect())
    }
}

impl IntentStore for MemoryStore {
    async fn save_room_intents(&self, room: &RoomName, intents: Value) -> Result<(), DbError> {
        self.lock().room_intents.insert(room.clone(), intents);
        Ok(())
    }

    async fn save_user_intents(&self, intents: Value) -> Result<(), DbError> {
        self.lock().user_intents = Some(intents);
        Ok(())
    }

    async fn clear_room_intents(&self, room: &RoomName) -> Result<(), DbError> {
        self.lock().room_intents.remove(room);
        Ok(())
    }

    async fn clear_user_intents(&self) -> Result<(), DbError> {
        self.lock().user_intents = None;
        Ok(())
    }
}

impl SideChannelStore for MemoryStore {
    async fn save_event_log(&self, room: &RoomName, tick: u64, payload: Value) -> Result<(), DbError> {
        self.lock().event_logs.insert((room.clone(), tick), payload);
        Ok(())
    }

    async fn save_map_view(&self, room: &RoomName, tick: u64, payload: Value) -> Result<(), DbError> {
        self.lock().map_views.insert((room.clone(), tick), payload);
        Ok(())
    }
}

impl HistoryStore for MemoryStore {
    async fn save_history_chunk(&self, chunk: HistoryChunk) -> Result<(), DbError> {
        self.lock().history.push(chunk);
        Ok(())
    }
}

impl EnvironmentStore for MemoryStore {
    async fn get(&self, key: EnvKey) -> Result<Option<String>, DbError> {
        Ok(self.lock().environment.get(key.as_str()).cloned())
    }

    async fn set(&self, key: EnvKey, value: String) -> Result<(), DbError> {
        self.lock().environment.insert(key.as_str(), value);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bulk::BulkWriter;
    use crate::document::DocumentUpdate;

    fn room() -> RoomName {
        RoomName::from("W1N1")
    }

    #[tokio::test]
    async fn load_room_filters_by_room_and_owner() {
        let store = MemoryStore::new();
        store.add_room(&room()).unwrap();
        store
            .put_document(
                DocumentKind::RoomObjects,
                json!({"_id": "a", "type": "creep", "room": "W1N1", "x": 1, "y": 1, "user": "u1"}),
            )
            .unwrap();
        store
            .put_document(
                DocumentKind::RoomObjects,
                json!({"_id": "b", "type": "source", "room": "W2N1", "x": 1, "y": 1}),
            )
            .unwrap();
        store
            .put_document(DocumentKind::Users, json!({"_id": "u1", "username": "one"}))
            .unwrap();
        store
            .put_document(DocumentKind::Users, json!({"_id": "u2", "username": "two"}))
            .unwrap();

        let docs = store.load_room(&room()).await.unwrap();
        assert_eq!(docs.objects.len(), 1);
        assert_eq!(docs.users.len(), 1);
        assert!(docs.room_info.is_some());
        assert_eq!(store.list_active_rooms().await.unwrap(), vec![room()]);
    }

    #[tokio::test]
    async fn bulk_apply_counts_one_write_per_document() {
        let store = MemoryStore::new();
        store
            .put_document(DocumentKind::RoomObjects, json!({"_id": "a", "hits": 1}))
            .unwrap();

        let mut writer = BulkWriter::new(DocumentKind::RoomObjects);
        let mut first = DocumentUpdate::default();
        first.set.insert("hits".into(), json!(100));
        let mut second = DocumentUpdate::default();
        second.set.insert("store.energy".into(), json!(50));
        writer.update("a", first);
        writer.update("a", second);
        store.apply_bulk(writer.finish()).await.unwrap();

        let doc = store.document(DocumentKind::RoomObjects, "a").unwrap();
        assert_eq!(doc["hits"], 100);
        assert_eq!(doc["store"]["energy"], 50);
        assert_eq!(store.write_count(DocumentKind::RoomObjects, "a"), 1);
    }

    #[tokio::test]
    async fn environment_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get(EnvKey::MainLoopPaused).await.unwrap(), None);
        store
            .set(EnvKey::MainLoopPaused, "1".to_owned())
            .await
            .unwrap();
        assert_eq!(
            store.get(EnvKey::MainLoopPaused).await.unwrap().as_deref(),
            Some("1")
        );
    }

    #[tokio::test]
    async fn intents_are_cleared_per_room() {
        let store = MemoryStore::new();
        store
            .save_room_intents(&room(), json!({"users": {}}))
            .await
            .unwrap();
        assert!(store.room_intents(&room()).is_some());
        store.clear_room_intents(&room()).await.unwrap();
        assert!(store.room_intents(&room()).is_none());
    }
}
