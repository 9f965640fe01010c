//! Room mutation batch and its writer interface.

use std::collections::{BTreeMap, BTreeSet};

use hive_types::{ObjectId, RoomInfoPatch, RoomName, RoomObjectPatch, RoomObjectSnapshot};
use serde_json::Value;

use crate::overlay::Pending;

/// Staging interface the room steps write through.
///
/// Writes never touch storage; they accumulate until the dispatcher
/// consumes the batch. The read-back methods let later steps observe
/// what earlier steps staged in the same tick.
pub trait RoomMutationWriter: Send {
    /// Stage a full object write, replacing anything staged earlier for the
    /// id. Later patches still apply on top of it.
    fn upsert(&mut self, object: RoomObjectSnapshot);

    /// Stage a sparse update. All-absent patches are dropped; repeated
    /// patches to one id merge with later fields winning.
    fn patch(&mut self, id: &ObjectId, patch: RoomObjectPatch);

    /// Stage a removal, discarding anything else staged for the id.
    fn remove(&mut self, id: &ObjectId);

    /// Stage a room metadata update, merged into any earlier one.
    fn set_room_info_patch(&mut self, patch: RoomInfoPatch);

    /// Set the event log payload for the tick.
    fn set_event_log(&mut self, payload: Value);

    /// Set the map view payload for the tick.
    fn set_map_view(&mut self, payload: Value);

    /// Everything staged for `id`.
    fn pending(&self, id: &ObjectId) -> Pending<RoomObjectSnapshot, RoomObjectPatch>;

    /// Ids of objects created by upsert this tick.
    fn upserted_ids(&self) -> Vec<ObjectId>;

    /// The staged room metadata update.
    fn pending_room_info_patch(&self) -> Option<&RoomInfoPatch>;

    /// Whether anything at all is staged.
    fn has_changes(&self) -> bool;
}

/// Mutations produced by one room for one tick.
///
/// Created empty, populated by the steps, consumed exactly once by
/// [`MutationDispatcher::dispatch_room`](crate::MutationDispatcher::dispatch_room).
#[derive(Debug, Clone, PartialEq)]
pub struct RoomMutationBatch {
    /// Room the batch belongs to.
    pub room: RoomName,
    /// Tick the batch was produced in.
    pub game_time: u64,
    /// Full object writes.
    pub upserts: BTreeMap<ObjectId, RoomObjectSnapshot>,
    /// Sparse object updates.
    pub patches: BTreeMap<ObjectId, RoomObjectPatch>,
    /// Objects to delete.
    pub removals: BTreeSet<ObjectId>,
    /// Room metadata update.
    pub room_info_patch: Option<RoomInfoPatch>,
    /// Event log side-channel payload.
    pub event_log: Option<Value>,
    /// Map view side-channel payload.
    pub map_view: Option<Value>,
}

impl RoomMutationBatch {
    /// An empty batch for `room` at `game_time`.
    pub const fn new(room: RoomName, game_time: u64) -> Self {
        Self {
            room,
            game_time,
            upserts: BTreeMap::new(),
            patches: BTreeMap::new(),
            removals: BTreeSet::new(),
            room_info_patch: None,
            event_log: None,
            map_view: None,
        }
    }

    /// Number of staged document writes, side channels excluded.
    pub fn document_writes(&self) -> usize {
        self.upserts
            .len()
            .saturating_add(self.patches.len())
            .saturating_add(self.removals.len())
            .saturating_add(usize::from(self.room_info_patch.is_some()))
    }
}

impl RoomMutationWriter for RoomMutationBatch {
    fn upsert(&mut self, object: RoomObjectSnapshot) {
        self.removals.remove(&object.id);
        self.patches.remove(&object.id);
        self.upserts.insert(object.id.clone(), object);
    }

    fn patch(&mut self, id: &ObjectId, patch: RoomObjectPatch) {
        if !patch.has_changes() || self.removals.contains(id) {
            return;
        }
        match self.patches.get_mut(id) {
            Some(existing) => existing.merge(patch),
            None => {
                self.patches.insert(id.clone(), patch);
            }
        }
    }

    fn remove(&mut self, id: &ObjectId) {
        self.upserts.remove(id);
        self.patches.remove(id);
        self.removals.insert(id.clone());
    }

    fn set_room_info_patch(&mut self, patch: RoomInfoPatch) {
        if !patch.has_changes() {
            return;
        }
        match &mut self.room_info_patch {
            Some(existing) => existing.merge(patch),
            None => self.room_info_patch = Some(patch),
        }
    }

    fn set_event_log(&mut self, payload: Value) {
        self.event_log = Some(payload);
    }

    fn set_map_view(&mut self, payload: Value) {
        self.map_view = Some(payload);
    }

    fn pending(&self, id: &ObjectId) -> Pending<RoomObjectSnapshot, RoomObjectPatch> {
        Pending {
            upsert: self.upserts.get(id).cloned(),
            patch: self.patches.get(id).cloned(),
            removed: self.removals.contains(id),
        }
    }

    fn upserted_ids(&self) -> Vec<ObjectId> {
        self.upserts.keys().cloned().collect()
    }

    fn pending_room_info_patch(&self) -> Option<&RoomInfoPatch> {
        self.room_info_patch.as_ref()
    }

    fn has_changes(&self) -> bool {
        self.document_writes() > 0 || self.event_log.is_some() || self.map_view.is_some()
    }
}
