//! Per-room replay history.
//!
//! History is kept in chunks of `chunk_size` consecutive ticks aligned to
//! multiples of the chunk size. The first tick recorded in a chunk holds
//! every object in full; later ticks hold only what changed since the
//! previous tick, with removed objects and fields written as `null`.
//!
//! ```text
//! base=100  {"100": {<id>: {full object}, ...},
//!            "101": {<id>: {"x": 12}, <gone>: null},
//!            ...
//!            "119": {...}}
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hive_db::HistoryChunk;
use hive_types::{ObjectId, RoomName, RoomObjectSnapshot};
use serde_json::{Map, Value};

use crate::error::MutationError;
use crate::room::RoomMutationBatch;

/// Room objects as they stand once `batch` is applied to `objects`.
pub fn project_objects(
    objects: &BTreeMap<ObjectId, RoomObjectSnapshot>,
    batch: &RoomMutationBatch,
) -> Result<Map<String, Value>, MutationError> {
    let mut projected = Map::new();
    for (id, object) in objects {
        projected.insert(id.as_str().to_owned(), serde_json::to_value(object)?);
    }
    for (id, object) in &batch.upserts {
        projected.insert(id.as_str().to_owned(), serde_json::to_value(object)?);
    }
    for (id, patch) in &batch.patches {
        if let Some(document) = projected.get_mut(id.as_str()) {
            patch.to_field_changes()?.apply_to_value(document);
        }
    }
    for id in &batch.removals {
        projected.remove(id.as_str());
    }
    Ok(projected)
}

/// Difference between two JSON values, `None` when equal.
fn diff_value(old: &Value, new: &Value) -> Option<Value> {
    if old == new {
        return None;
    }
    match (old, new) {
        (Value::Object(old), Value::Object(new)) => Some(Value::Object(diff_map(old, new))),
        _ => Some(new.clone()),
    }
}

fn diff_map(old: &Map<String, Value>, new: &Map<String, Value>) -> Map<String, Value> {
    let mut diff = Map::new();
    for (key, value) in new {
        match old.get(key) {
            Some(previous) => {
                if let Some(changed) = diff_value(previous, value) {
                    diff.insert(key.clone(), changed);
                }
            }
            None => {
                diff.insert(key.clone(), value.clone());
            }
        }
    }
    for key in old.keys().filter(|k| !new.contains_key(*k)) {
        diff.insert(key.clone(), Value::Null);
    }
    diff
}

#[derive(Debug)]
struct OpenChunk {
    base: u64,
    last: Map<String, Value>,
    ticks: BTreeMap<u64, Value>,
}

impl OpenChunk {
    fn close(self, room: RoomName) -> HistoryChunk {
        HistoryChunk {
            room,
            base: self.base,
            timestamp: chrono::Utc::now().timestamp_millis(),
            ticks: self.ticks,
        }
    }
}

/// Accumulates per-room history and hands out completed chunks.
#[derive(Debug)]
pub struct RoomHistoryRecorder {
    chunk_size: u64,
    rooms: Mutex<BTreeMap<RoomName, OpenChunk>>,
}

impl RoomHistoryRecorder {
    /// Record chunks of `chunk_size` ticks (at least one).
    pub fn new(chunk_size: u64) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            rooms: Mutex::new(BTreeMap::new()),
        }
    }

    /// Configured chunk length.
    pub const fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<RoomName, OpenChunk>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// First tick of the chunk containing `tick`.
    pub fn chunk_base(&self, tick: u64) -> u64 {
        tick.saturating_sub(tick.checked_rem(self.chunk_size).unwrap_or(0))
    }

    /// Record the post-tick objects of `room`.
    ///
    /// Returns the chunks this call completed: the current chunk when
    /// `tick` is its last tick, plus an earlier chunk left open by a gap
    /// in the recorded ticks.
    pub fn record(
        &self,
        room: &RoomName,
        tick: u64,
        objects: Map<String, Value>,
    ) -> Vec<HistoryChunk> {
        let base = self.chunk_base(tick);
        let last_tick = base.saturating_add(self.chunk_size.saturating_sub(1));
        let mut completed = Vec::new();
        let mut rooms = self.lock();

        let open = match rooms.remove(room) {
            Some(mut open) if open.base == base => {
                let diff = diff_map(&open.last, &objects);
                open.ticks.insert(tick, Value::Object(diff));
                open.last = objects;
                open
            }
            stale => {
                if let Some(stale) = stale {
                    completed.push(stale.close(room.clone()));
                }
                let mut ticks = BTreeMap::new();
                ticks.insert(tick, Value::Object(objects.clone()));
                OpenChunk {
                    base,
                    last: objects,
                    ticks,
                }
            }
        };

        if tick >= last_tick {
            completed.push(open.close(room.clone()));
        } else {
            rooms.insert(room.clone(), open);
        }
        completed
    }

    /// Close every open chunk, e.g. on shutdown.
    pub fn flush(&self) -> Vec<HistoryChunk> {
        std::mem::take(&mut *self.lock())
            .into_iter()
            .map(|(room, open)| open.close(room))
            .collect()
    }
}
