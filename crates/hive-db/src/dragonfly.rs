//! `Dragonfly` (Redis-compatible) world store.
//!
//! `Dragonfly` holds the hot world state the tick engine reads and writes.
//! Every document is stored as a JSON string; sets index documents per
//! kind and room objects per room.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `{kind}:{id}` | JSON | One document of a kind (`rooms.objects:abc`) |
//! | `{kind}:ids` | Set | Ids of every document of a kind |
//! | `rooms.objects:room:{room}` | Set | Object ids in a room |
//! | `rooms.terrain:{room}` | String | Encoded terrain |
//! | `rooms.flags:{room}` | JSON | Flag documents of a room |
//! | `rooms.intents:{room}` | JSON | Raw room intents |
//! | `users.intents` | JSON | Raw global intents |
//! | `rooms.eventLog:{room}:{tick}` | JSON | Event log payload |
//! | `rooms.mapView:{room}:{tick}` | JSON | Map view payload |
//! | `env:{key}` | String | Environment values |

use fred::prelude::*;
use hive_types::RoomName;
use serde_json::{Value, json};

use crate::bulk::{BulkBatch, BulkOperation};
use crate::document::DocumentKind;
use crate::error::DbError;
use crate::store::{
    DocumentStore, EnvKey, EnvironmentStore, GlobalDocuments, IntentStore, RoomDocuments,
    SideChannelStore, WorldDataSource,
};

/// Seconds side-channel payloads are kept.
const SIDE_CHANNEL_TTL_SECS: i64 = 24 * 60 * 60;

fn document_key(kind: DocumentKind, id: &str) -> String {
    format!("{kind}:{id}")
}

fn ids_key(kind: DocumentKind) -> String {
    format!("{kind}:ids")
}

fn room_index_key(room: &str) -> String {
    format!("rooms.objects:room:{room}")
}

fn room_of(document: &Value) -> Option<String> {
    document.get("room").and_then(Value::as_str).map(str::to_owned)
}

/// Connection handle to a `Dragonfly` instance implementing the world
/// store traits.
#[derive(Clone)]
pub struct DragonflyStore {
    client: Client,
}

impl DragonflyStore {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    // =========================================================================
    // Generic JSON get/set/delete
    // =========================================================================

    async fn get_value(&self, key: &str) -> Result<Option<Value>, DbError> {
        let raw: Option<String> = self.client.get(key).await?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    async fn set_value(&self, key: &str, value: &Value) -> Result<(), DbError> {
        let json = serde_json::to_string(value)?;
        let _: () = self.client.set(key, json.as_str(), None, None, false).await?;
        Ok(())
    }

    async fn set_value_expiring(&self, key: &str, value: &Value) -> Result<(), DbError> {
        let json = serde_json::to_string(value)?;
        let _: () = self
            .client
            .set(
                key,
                json.as_str(),
                Some(Expiration::EX(SIDE_CHANNEL_TTL_SECS)),
                None,
                false,
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DbError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }

    async fn load_documents(&self, kind: DocumentKind, ids: &[String]) -> Result<Vec<Value>, DbError> {
        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.get_value(&document_key(kind, id)).await? {
                documents.push(doc);
            }
        }
        Ok(documents)
    }

    async fn load_kind(&self, kind: DocumentKind) -> Result<Vec<Value>, DbError> {
        let mut ids: Vec<String> = self.client.smembers(ids_key(kind)).await?;
        ids.sort();
        self.load_documents(kind, &ids).await
    }

    // =========================================================================
    // Document writes
    // =========================================================================

    async fn write_document(&self, kind: DocumentKind, id: &str, document: &Value) -> Result<(), DbError> {
        let key = document_key(kind, id);
        if kind == DocumentKind::RoomObjects {
            let previous = self.get_value(&key).await?;
            let old_room = previous.as_ref().and_then(room_of);
            let new_room = room_of(document);
            if old_room != new_room {
                if let Some(old) = old_room {
                    let _: u32 = self.client.srem(room_index_key(&old), id).await?;
                }
                if let Some(new) = new_room {
                    let _: u32 = self.client.sadd(room_index_key(&new), id).await?;
                }
            }
        }
        self.set_value(&key, document).await?;
        let _: u32 = self.client.sadd(ids_key(kind), id).await?;
        Ok(())
    }

    async fn remove_document(&self, kind: DocumentKind, id: &str) -> Result<(), DbError> {
        let key = document_key(kind, id);
        if kind == DocumentKind::RoomObjects {
            if let Some(room) = self.get_value(&key).await?.as_ref().and_then(room_of) {
                let _: u32 = self.client.srem(room_index_key(&room), id).await?;
            }
        }
        self.delete(&key).await?;
        let _: u32 = self.client.srem(ids_key(kind), id).await?;
        Ok(())
    }

    /// Insert or replace a document outside a bulk batch (seeding).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::MissingId`] if the document has no `_id`.
    pub async fn put_document(&self, kind: DocumentKind, document: &Value) -> Result<(), DbError> {
        let id = document
            .get("_id")
            .and_then(Value::as_str)
            .ok_or(DbError::MissingId {
                kind: kind.as_str(),
            })?;
        self.write_document(kind, id, document).await
    }

    /// Store the encoded terrain of `room`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the write fails.
    pub async fn set_terrain(&self, room: &RoomName, encoded: &str) -> Result<(), DbError> {
        let _: () = self
            .client
            .set(format!("rooms.terrain:{room}"), encoded, None, None, false)
            .await?;
        Ok(())
    }

    /// Flush all keys from the `Dragonfly` instance.
    ///
    /// **WARNING:** This deletes all data. Only use for testing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the flush fails.
    pub async fn flush_all(&self) -> Result<(), DbError> {
        let _: () = self.client.flushall(false).await?;
        Ok(())
    }
}

// =============================================================================
// Trait implementations
// =============================================================================

impl DocumentStore for DragonflyStore {
    async fn apply_bulk(&self, batch: BulkBatch) -> Result<(), DbError> {
        let kind = batch.kind;
        let writes = batch.len();
        for operation in batch.operations {
            match operation {
                BulkOperation::Insert { id, document } => {
                    self.write_document(kind, &id, &document).await?;
                }
                BulkOperation::Update { id, update } => {
                    let mut document = self
                        .get_value(&document_key(kind, &id))
                        .await?
                        .unwrap_or_else(|| json!({"_id": id.as_str()}));
                    update.apply_to(&mut document);
                    self.write_document(kind, &id, &document).await?;
                }
                BulkOperation::Remove { id } => {
                    self.remove_document(kind, &id).await?;
                }
            }
        }
        tracing::trace!(kind = kind.as_str(), writes, "Applied bulk batch");
        Ok(())
    }
}

impl WorldDataSource for DragonflyStore {
    async fn load_room(&self, room: &RoomName) -> Result<RoomDocuments, DbError> {
        let mut ids: Vec<String> = self.client.smembers(room_index_key(room.as_str())).await?;
        ids.sort();
        let objects = self.load_documents(DocumentKind::RoomObjects, &ids).await?;

        let mut user_ids: Vec<String> = objects
            .iter()
            .filter_map(|o| o.get("user").and_then(Value::as_str).map(str::to_owned))
            .collect();
        user_ids.sort();
        user_ids.dedup();
        let users = self.load_documents(DocumentKind::Users, &user_ids).await?;

        let power_creeps = self
            .load_kind(DocumentKind::PowerCreeps)
            .await?
            .into_iter()
            .filter(|p| p.get("room").and_then(Value::as_str) == Some(room.as_str()))
            .collect();

        let terrain: Option<String> = self.client.get(format!("rooms.terrain:{room}")).await?;
        let flags = match self.get_value(&format!("rooms.flags:{room}")).await? {
            Some(Value::Array(flags)) => flags,
            _ => Vec::new(),
        };

        Ok(RoomDocuments {
            room_info: self
                .get_value(&document_key(DocumentKind::Rooms, room.as_str()))
                .await?,
            objects,
            users,
            terrain,
            flags,
            power_creeps,
            intents: self.get_value(&format!("rooms.intents:{room}")).await?,
        })
    }

    async fn load_global(&self) -> Result<GlobalDocuments, DbError> {
        let objects = self.load_kind(DocumentKind::RoomObjects).await?;
        let (inter_room_creeps, special_objects) = objects.into_iter().fold(
            (Vec::new(), Vec::new()),
            |(mut transit, mut special), object| {
                if object.get("interRoom").is_some_and(|v| !v.is_null()) {
                    transit.push(object);
                } else if object.get("type").and_then(Value::as_str) == Some("powerBank") {
                    special.push(object);
                }
                (transit, special)
            },
        );

        Ok(GlobalDocuments {
            inter_room_creeps,
            rooms: self.load_kind(DocumentKind::Rooms).await?,
            special_objects,
            orders: self.load_kind(DocumentKind::MarketOrders).await?,
            users: self.load_kind(DocumentKind::Users).await?,
            power_creeps: self.load_kind(DocumentKind::PowerCreeps).await?,
            user_intents: self.get_value("users.intents").await?,
        })
    }

    async fn list_active_rooms(&self) -> Result<Vec<RoomName>, DbError> {
        Ok(self
            .load_kind(DocumentKind::Rooms)
            .await?
            .iter()
            .filter(|r| r.get("active").and_then(Value::as_bool) != Some(false))
            .filter_map(|r| r.get("_id").and_then(Value::as_str).map(RoomName::from))
            .collect())
    }
}

impl IntentStore for DragonflyStore {
    async fn save_room_intents(&self, room: &RoomName, intents: Value) -> Result<(), DbError> {
        self.set_value(&format!("rooms.intents:{room}"), &intents).await
    }

    async fn save_user_intents(&self, intents: Value) -> Result<(), DbError> {
        self.set_value("users.intents", &intents).await
    }

    async fn clear_room_intents(&self, room: &RoomName) -> Result<(), DbError> {
        self.delete(&format!("rooms.intents:{room}")).await
    }

    async fn clear_user_intents(&self) -> Result<(), DbError> {
        self.delete("users.intents").await
    }
}

impl SideChannelStore for DragonflyStore {
    async fn save_event_log(&self, room: &RoomName, tick: u64, payload: Value) -> Result<(), DbError> {
        self.set_value_expiring(&format!("rooms.eventLog:{room}:{tick}"), &payload)
            .await
    }

    async fn save_map_view(&self, room: &RoomName, tick: u64, payload: Value) -> Result<(), DbError> {
        self.set_value_expiring(&format!("rooms.mapView:{room}:{tick}"), &payload)
            .await
    }
}

impl EnvironmentStore for DragonflyStore {
    async fn get(&self, key: EnvKey) -> Result<Option<String>, DbError> {
        let value: Option<String> = self.client.get(format!("env:{}", key.as_str())).await?;
        Ok(value)
    }

    async fn set(&self, key: EnvKey, value: String) -> Result<(), DbError> {
        let _: () = self
            .client
            .set(format!("env:{}", key.as_str()), value, None, None, false)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout() {
        assert_eq!(document_key(DocumentKind::RoomObjects, "abc"), "rooms.objects:abc");
        assert_eq!(ids_key(DocumentKind::MarketOrders), "market.orders:ids");
        assert_eq!(room_index_key("W1N1"), "rooms.objects:room:W1N1");
        assert_eq!(room_of(&json!({"room": "W2N2"})).as_deref(), Some("W2N2"));
    }
}
