//! Global mutation batch and the shared buffer that collects it.
//!
//! Some room steps reach outside the room (power totals, nukes landing
//! elsewhere), so the global writer takes `&self` and serializes writes
//! behind a lock. Each room stages into a buffer of its own; a room whose
//! batch was persisted hands it to the tick's buffer with
//! [`GlobalMutationBuffer::absorb`], and the global pass drains that with
//! [`GlobalMutationBuffer::take`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use hive_types::{
    MarketOrderPatch, MarketOrderSnapshot, MoneyLogEntry, ObjectId, OrderId, PowerCreepPatch,
    PowerCreepSnapshot, RoomInfoPatch, RoomName, RoomObjectPatch, RoomObjectSnapshot, UserId,
    UserPatch,
};

use crate::overlay::Pending;

/// Upserts, patches and removals for one document kind.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChanges<K: Ord, T, P> {
    /// Full writes.
    pub upserts: BTreeMap<K, T>,
    /// Sparse updates.
    pub patches: BTreeMap<K, P>,
    /// Deletions.
    pub removals: BTreeSet<K>,
}

impl<K: Ord, T, P> Default for DocumentChanges<K, T, P> {
    fn default() -> Self {
        Self {
            upserts: BTreeMap::new(),
            patches: BTreeMap::new(),
            removals: BTreeSet::new(),
        }
    }
}

impl<K: Ord + Clone, T: Clone, P: Clone> DocumentChanges<K, T, P> {
    fn upsert(&mut self, key: K, value: T) {
        self.removals.remove(&key);
        self.patches.remove(&key);
        self.upserts.insert(key, value);
    }

    fn patch(&mut self, key: &K, patch: P, merge: impl FnOnce(&mut P, P)) {
        if self.removals.contains(key) {
            return;
        }
        match self.patches.get_mut(key) {
            Some(existing) => merge(existing, patch),
            None => {
                self.patches.insert(key.clone(), patch);
            }
        }
    }

    fn remove(&mut self, key: &K) {
        self.upserts.remove(key);
        self.patches.remove(key);
        self.removals.insert(key.clone());
    }

    /// Replay `other` on top of these changes.
    fn absorb(&mut self, other: Self, merge: impl Fn(&mut P, P)) {
        for key in &other.removals {
            self.remove(key);
        }
        for (key, value) in other.upserts {
            self.upsert(key, value);
        }
        for (key, patch) in other.patches {
            self.patch(&key, patch, &merge);
        }
    }

    fn pending(&self, key: &K) -> Pending<T, P> {
        Pending {
            upsert: self.upserts.get(key).cloned(),
            patch: self.patches.get(key).cloned(),
            removed: self.removals.contains(key),
        }
    }

    /// Number of staged writes.
    pub fn len(&self) -> usize {
        self.upserts
            .len()
            .saturating_add(self.patches.len())
            .saturating_add(self.removals.len())
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutations produced by the global pass (and cross-room room steps) for
/// one tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlobalMutationBatch {
    /// Tick the batch was produced in.
    pub game_time: u64,
    /// Market orders.
    pub orders: DocumentChanges<OrderId, MarketOrderSnapshot, MarketOrderPatch>,
    /// Absolute user field updates.
    pub user_patches: BTreeMap<UserId, UserPatch>,
    /// Relative user counter updates, by field path.
    pub user_increments: BTreeMap<UserId, BTreeMap<String, i64>>,
    /// Money ledger rows, in staging order.
    pub money_log: Vec<MoneyLogEntry>,
    /// Power creeps.
    pub power_creeps: DocumentChanges<ObjectId, PowerCreepSnapshot, PowerCreepPatch>,
    /// Room objects written outside their room's own batch.
    pub room_objects: DocumentChanges<ObjectId, RoomObjectSnapshot, RoomObjectPatch>,
    /// Room metadata updates keyed by room.
    pub room_info_patches: BTreeMap<RoomName, RoomInfoPatch>,
}

impl GlobalMutationBatch {
    /// An empty batch for `game_time`.
    pub fn new(game_time: u64) -> Self {
        Self {
            game_time,
            ..Self::default()
        }
    }

    /// Number of staged document writes.
    pub fn document_writes(&self) -> usize {
        [
            self.orders.len(),
            self.user_patches.len(),
            self.user_increments.len(),
            self.money_log.len(),
            self.power_creeps.len(),
            self.room_objects.len(),
            self.room_info_patches.len(),
        ]
        .into_iter()
        .fold(0_usize, usize::saturating_add)
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.document_writes() == 0
    }
}

/// Staging interface for writes outside a single room.
pub trait GlobalMutationWriter: Send + Sync {
    /// Stage a new or replaced market order.
    fn upsert_order(&self, order: MarketOrderSnapshot);
    /// Stage a market order update.
    fn patch_order(&self, id: &OrderId, patch: MarketOrderPatch);
    /// Stage a market order deletion.
    fn remove_order(&self, id: &OrderId);
    /// Stage absolute user field writes.
    fn patch_user(&self, user: &UserId, patch: UserPatch);
    /// Stage a relative change of a numeric user field.
    fn increment_user(&self, user: &UserId, field: &str, by: i64);
    /// Append a money ledger row.
    fn log_money(&self, entry: MoneyLogEntry);
    /// Stage a new or replaced power creep.
    fn upsert_power_creep(&self, creep: PowerCreepSnapshot);
    /// Stage a power creep update.
    fn patch_power_creep(&self, id: &ObjectId, patch: PowerCreepPatch);
    /// Stage a power creep deletion.
    fn remove_power_creep(&self, id: &ObjectId);
    /// Stage a room object write in any room.
    fn upsert_room_object(&self, object: RoomObjectSnapshot);
    /// Stage a room object update in any room.
    fn patch_room_object(&self, id: &ObjectId, patch: RoomObjectPatch);
    /// Stage a room object deletion in any room.
    fn remove_room_object(&self, id: &ObjectId);
    /// Stage a room metadata update for `room`.
    fn patch_room_info(&self, room: &RoomName, patch: RoomInfoPatch);

    /// Merged user patch staged so far.
    fn pending_user(&self, user: &UserId) -> Option<UserPatch>;
    /// Everything staged for an order.
    fn pending_order(&self, id: &OrderId) -> Pending<MarketOrderSnapshot, MarketOrderPatch>;
    /// Everything staged for a power creep.
    fn pending_power_creep(&self, id: &ObjectId) -> Pending<PowerCreepSnapshot, PowerCreepPatch>;
    /// Power creeps upserted so far.
    fn upserted_power_creeps(&self) -> Vec<PowerCreepSnapshot>;
    /// Orders upserted so far.
    fn upserted_orders(&self) -> Vec<MarketOrderSnapshot>;
}

/// Lock-protected [`GlobalMutationBatch`] shared between room tasks and the
/// global pass.
#[derive(Debug, Default)]
pub struct GlobalMutationBuffer {
    batch: Mutex<GlobalMutationBatch>,
}

impl GlobalMutationBuffer {
    /// An empty buffer for `game_time`.
    pub fn new(game_time: u64) -> Self {
        Self {
            batch: Mutex::new(GlobalMutationBatch::new(game_time)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GlobalMutationBatch> {
        self.batch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tick the buffer collects for.
    pub fn game_time(&self) -> u64 {
        self.lock().game_time
    }

    /// Drain the staged batch, leaving an empty one for the same tick.
    pub fn take(&self) -> GlobalMutationBatch {
        let mut batch = self.lock();
        let game_time = batch.game_time;
        std::mem::replace(&mut *batch, GlobalMutationBatch::new(game_time))
    }

    /// Stage every write of `staged` as if it had been written here.
    ///
    /// Room tasks collect their cross-room writes in a buffer of their own
    /// and hand them over once the room's batch is persisted.
    pub fn absorb(&self, staged: GlobalMutationBatch) {
        let mut batch = self.lock();
        batch.orders.absorb(staged.orders, MarketOrderPatch::merge);
        for (user, patch) in staged.user_patches {
            match batch.user_patches.get_mut(&user) {
                Some(existing) => existing.merge(patch),
                None => {
                    batch.user_patches.insert(user, patch);
                }
            }
        }
        for (user, fields) in staged.user_increments {
            let counters = batch.user_increments.entry(user).or_default();
            for (field, by) in fields {
                let entry = counters.entry(field).or_insert(0);
                *entry = entry.saturating_add(by);
            }
        }
        batch.money_log.extend(staged.money_log);
        batch
            .power_creeps
            .absorb(staged.power_creeps, PowerCreepPatch::merge);
        batch
            .room_objects
            .absorb(staged.room_objects, RoomObjectPatch::merge);
        for (room, patch) in staged.room_info_patches {
            match batch.room_info_patches.get_mut(&room) {
                Some(existing) => existing.merge(patch),
                None => {
                    batch.room_info_patches.insert(room, patch);
                }
            }
        }
    }
}

impl GlobalMutationWriter for GlobalMutationBuffer {
    fn upsert_order(&self, order: MarketOrderSnapshot) {
        self.lock().orders.upsert(order.id.clone(), order);
    }

    fn patch_order(&self, id: &OrderId, patch: MarketOrderPatch) {
        if patch.has_changes() {
            self.lock().orders.patch(id, patch, MarketOrderPatch::merge);
        }
    }

    fn remove_order(&self, id: &OrderId) {
        self.lock().orders.remove(id);
    }

    fn patch_user(&self, user: &UserId, patch: UserPatch) {
        if !patch.has_changes() {
            return;
        }
        let mut batch = self.lock();
        match batch.user_patches.get_mut(user) {
            Some(existing) => existing.merge(patch),
            None => {
                batch.user_patches.insert(user.clone(), patch);
            }
        }
    }

    fn increment_user(&self, user: &UserId, field: &str, by: i64) {
        if by == 0 {
            return;
        }
        let mut batch = self.lock();
        let entry = batch
            .user_increments
            .entry(user.clone())
            .or_default()
            .entry(field.to_owned())
            .or_insert(0);
        *entry = entry.saturating_add(by);
    }

    fn log_money(&self, entry: MoneyLogEntry) {
        self.lock().money_log.push(entry);
    }

    fn upsert_power_creep(&self, creep: PowerCreepSnapshot) {
        self.lock().power_creeps.upsert(creep.id.clone(), creep);
    }

    fn patch_power_creep(&self, id: &ObjectId, patch: PowerCreepPatch) {
        if patch.has_changes() {
            self.lock()
                .power_creeps
                .patch(id, patch, PowerCreepPatch::merge);
        }
    }

    fn remove_power_creep(&self, id: &ObjectId) {
        self.lock().power_creeps.remove(id);
    }

    fn upsert_room_object(&self, object: RoomObjectSnapshot) {
        self.lock().room_objects.upsert(object.id.clone(), object);
    }

    fn patch_room_object(&self, id: &ObjectId, patch: RoomObjectPatch) {
        if patch.has_changes() {
            self.lock()
                .room_objects
                .patch(id, patch, RoomObjectPatch::merge);
        }
    }

    fn remove_room_object(&self, id: &ObjectId) {
        self.lock().room_objects.remove(id);
    }

    fn patch_room_info(&self, room: &RoomName, patch: RoomInfoPatch) {
        if !patch.has_changes() {
            return;
        }
        let mut batch = self.lock();
        match batch.room_info_patches.get_mut(room) {
            Some(existing) => existing.merge(patch),
            None => {
                batch.room_info_patches.insert(room.clone(), patch);
            }
        }
    }

    fn pending_user(&self, user: &UserId) -> Option<UserPatch> {
        self.lock().user_patches.get(user).cloned()
    }

    fn pending_order(&self, id: &OrderId) -> Pending<MarketOrderSnapshot, MarketOrderPatch> {
        self.lock().orders.pending(id)
    }

    fn pending_power_creep(&self, id: &ObjectId) -> Pending<PowerCreepSnapshot, PowerCreepPatch> {
        self.lock().power_creeps.pending(id)
    }

    fn upserted_power_creeps(&self) -> Vec<PowerCreepSnapshot> {
        self.lock().power_creeps.upserts.values().cloned().collect()
    }

    fn upserted_orders(&self) -> Vec<MarketOrderSnapshot> {
        self.lock().orders.upserts.values().cloned().collect()
    }
}
