//! Room processing context.
//!
//! # Architecture
//!
//! ```text
//! RoomSnapshot (read-only) --+
//! IntentIndex (validated) ---+--> RoomProcessorContext --> step 1 .. step N
//! RoomMutationWriter --------+         |
//! RoomServices (stats, notifications, pathfinder, global writer)
//! ```
//!
//! Steps never mutate the snapshot. Reads go through [`RoomProcessorContext::object`],
//! which lays everything earlier steps staged over the snapshot value, so
//! a harvest that drained a source is visible to every later step of the
//! same tick. The full overlay is built once and kept until the next write.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::sync::Arc;

use hive_blueprints::constants::{
    BODYPART_HITS, CREEP_CLAIM_LIFE_TIME, CREEP_LIFE_TIME, RUIN_DECAY, TOMBSTONE_DECAY_PER_PART,
};
use hive_mutation::{GlobalMutationWriter, RoomMutationWriter};
use hive_types::resources::ENERGY;
use hive_types::{
    BodyPart, BodyPartType, IntentIndex, ObjectId, ObjectType, Position, RoomInfoPatch, RoomName,
    RoomObjectPatch, RoomObjectSnapshot, RoomSnapshot, UserId,
};

use crate::activation::ActiveStructures;
use crate::error::ProcessorError;
use crate::events::RoomEvent;
use crate::notify::{Notification, NotificationSink};
use crate::pathfinder::PathFinder;
use crate::stats::{self, ProcessorStatsSink};

/// Shared services a room's steps report to.
#[derive(Clone, Copy)]
pub struct RoomServices<'a> {
    /// Per-user counters.
    pub stats: &'a ProcessorStatsSink,
    /// Player notifications.
    pub notifications: &'a dyn NotificationSink,
    /// Pathfinding for `moveTo`.
    pub path_finder: &'a dyn PathFinder,
    /// Writer for cross-room effects. Without one, steps that need it
    /// skip their work.
    pub global: Option<&'a dyn GlobalMutationWriter>,
}

/// Everything one room's steps read and write during a tick.
pub struct RoomProcessorContext<'a> {
    snapshot: &'a RoomSnapshot,
    intents: &'a IntentIndex,
    writer: &'a mut dyn RoomMutationWriter,
    services: RoomServices<'a>,
    active: ActiveStructures,
    events: Vec<RoomEvent>,
    sequence: u64,
    overlay: RefCell<Option<Arc<[RoomObjectSnapshot]>>>,
}

impl<'a> RoomProcessorContext<'a> {
    /// A context over one room's snapshot and validated intents.
    pub fn new(
        snapshot: &'a RoomSnapshot,
        intents: &'a IntentIndex,
        writer: &'a mut dyn RoomMutationWriter,
        services: RoomServices<'a>,
    ) -> Self {
        Self {
            active: ActiveStructures::compute(snapshot),
            snapshot,
            intents,
            writer,
            services,
            events: Vec::new(),
            sequence: 0,
            overlay: RefCell::new(None),
        }
    }

    /// The room snapshot.
    pub const fn snapshot(&self) -> &'a RoomSnapshot {
        self.snapshot
    }

    /// The validated intents.
    pub const fn intents(&self) -> &'a IntentIndex {
        self.intents
    }

    /// Tick being processed.
    pub const fn game_time(&self) -> u64 {
        self.snapshot.game_time
    }

    /// Room being processed.
    pub const fn room(&self) -> &'a RoomName {
        &self.snapshot.room_name
    }

    /// Whether `object` passes the activation rule.
    pub fn is_active(&self, object: &RoomObjectSnapshot) -> bool {
        self.active.is_active(object)
    }

    /// Structures passing the activation rule.
    pub const fn active(&self) -> &ActiveStructures {
        &self.active
    }

    /// Current state of an object: the snapshot value with pending writes
    /// applied. `None` once removed.
    pub fn object(&self, id: &ObjectId) -> Result<Option<RoomObjectSnapshot>, ProcessorError> {
        Ok(self.writer.pending(id).resolve(self.snapshot.objects.get(id))?)
    }

    /// Current state of every object, created ones included, in id order.
    pub fn objects(&self) -> Result<Arc<[RoomObjectSnapshot]>, ProcessorError> {
        if let Some(cached) = self.overlay.borrow().as_ref() {
            return Ok(Arc::clone(cached));
        }
        let built: Arc<[RoomObjectSnapshot]> = self.build_overlay()?.into();
        *self.overlay.borrow_mut() = Some(Arc::clone(&built));
        Ok(built)
    }

    fn build_overlay(&self) -> Result<Vec<RoomObjectSnapshot>, ProcessorError> {
        let ids: BTreeSet<ObjectId> = self
            .snapshot
            .objects
            .keys()
            .cloned()
            .chain(self.writer.upserted_ids())
            .collect();
        let mut out = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(object) = self.object(id)? {
                out.push(object);
            }
        }
        Ok(out)
    }

    /// Current objects of one type.
    pub fn objects_of_type(
        &self,
        object_type: ObjectType,
    ) -> Result<Vec<RoomObjectSnapshot>, ProcessorError> {
        Ok(self
            .objects()?
            .iter()
            .filter(|o| o.object_type == object_type)
            .cloned()
            .collect())
    }

    /// Current objects standing on `pos`.
    pub fn objects_at(&self, pos: Position) -> Result<Vec<RoomObjectSnapshot>, ProcessorError> {
        Ok(self
            .objects()?
            .iter()
            .filter(|o| o.position() == pos)
            .cloned()
            .collect())
    }

    /// Stage a full object write.
    pub fn upsert(&mut self, object: RoomObjectSnapshot) {
        self.overlay.get_mut().take();
        self.writer.upsert(object);
    }

    /// Stage a sparse update.
    pub fn patch(&mut self, id: &ObjectId, patch: RoomObjectPatch) {
        self.overlay.get_mut().take();
        self.writer.patch(id, patch);
    }

    /// Stage a removal.
    pub fn remove(&mut self, id: &ObjectId) {
        self.overlay.get_mut().take();
        self.writer.remove(id);
    }

    /// Stage a room metadata update.
    pub fn set_room_info_patch(&mut self, patch: RoomInfoPatch) {
        self.writer.set_room_info_patch(patch);
    }

    /// Direct access to the writer, for side-channel payloads.
    pub fn writer(&mut self) -> &mut dyn RoomMutationWriter {
        self.overlay.get_mut().take();
        &mut *self.writer
    }

    /// A fresh deterministic id for an object created this tick.
    pub fn next_object_id(&mut self) -> ObjectId {
        let id = ObjectId::derive(
            self.snapshot.room_name.as_str(),
            self.game_time(),
            self.sequence,
        );
        self.sequence = self.sequence.saturating_add(1);
        id
    }

    /// Append to the room event log.
    pub fn log_event(&mut self, event: RoomEvent) {
        self.events.push(event);
    }

    /// Events logged so far.
    pub fn events(&self) -> &[RoomEvent] {
        &self.events
    }

    /// Hand over the event log.
    pub fn take_events(&mut self) -> Vec<RoomEvent> {
        std::mem::take(&mut self.events)
    }

    /// Add to a per-user counter.
    pub fn record_stat(&self, user: &UserId, stat: &'static str, amount: i64) {
        self.services.stats.record(user, stat, amount);
    }

    /// Notify `user` about something in this room.
    pub fn notify(&self, user: &UserId, message: impl Into<String>) {
        self.services.notifications.notify(Notification {
            user: user.clone(),
            room: self.snapshot.room_name.clone(),
            tick: self.game_time(),
            message: message.into(),
        });
    }

    /// The pathfinder.
    pub const fn path_finder(&self) -> &'a dyn PathFinder {
        self.services.path_finder
    }

    /// The cross-room writer, when the tick has one.
    pub const fn global(&self) -> Option<&'a dyn GlobalMutationWriter> {
        self.services.global
    }

    // -----------------------------------------------------------------------
    // Shared effects
    // -----------------------------------------------------------------------

    /// Put `amount` of `resource` on the ground at `pos`, merging into an
    /// existing pile of the same resource.
    pub fn drop_resource(
        &mut self,
        pos: Position,
        resource: &str,
        amount: i64,
    ) -> Result<(), ProcessorError> {
        if amount <= 0 {
            return Ok(());
        }
        let existing = self.objects_at(pos)?.into_iter().find(|o| {
            o.object_type == ObjectType::Resource && o.resource_type.as_deref() == Some(resource)
        });
        match existing {
            Some(pile) => {
                let total = pile.amount.unwrap_or(0).saturating_add(amount);
                self.patch(
                    &pile.id,
                    RoomObjectPatch {
                        amount: Some(total),
                        ..RoomObjectPatch::default()
                    },
                );
            }
            None => {
                let id = self.next_object_id();
                let mut pile = RoomObjectSnapshot::new(
                    id,
                    ObjectType::Resource,
                    self.snapshot.room_name.clone(),
                    pos.x,
                    pos.y,
                );
                pile.resource_type = Some(resource.to_owned());
                pile.amount = Some(amount);
                self.upsert(pile);
            }
        }
        Ok(())
    }

    /// Remove a creep and leave a tombstone holding its store plus
    /// `reclaimed` energy.
    pub fn kill_creep(&mut self, creep: &RoomObjectSnapshot, reclaimed: i64) {
        let game_time = self.game_time();
        let parts = u64::try_from(creep.body.len()).unwrap_or(0);
        let id = self.next_object_id();

        let mut tombstone = RoomObjectSnapshot::new(
            id,
            ObjectType::Tombstone,
            creep.room.clone(),
            creep.x,
            creep.y,
        );
        tombstone.user.clone_from(&creep.user);
        tombstone.creep_id = Some(creep.id.clone());
        tombstone.creep_name.clone_from(&creep.name);
        tombstone.creep_ticks_to_live = creep.ticks_to_live(game_time);
        tombstone.death_time = Some(game_time);
        tombstone.decay_time =
            Some(game_time.saturating_add(TOMBSTONE_DECAY_PER_PART.saturating_mul(parts.max(1))));
        tombstone.store = creep
            .store
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(resource, amount)| (resource.clone(), *amount))
            .collect();
        if reclaimed > 0 {
            let energy = tombstone.store.entry(ENERGY.to_owned()).or_insert(0);
            *energy = energy.saturating_add(reclaimed);
        }

        self.remove(&creep.id);
        self.upsert(tombstone);
        self.log_event(RoomEvent::ObjectDestroyed {
            object_id: creep.id.clone(),
            object_type: ObjectType::Creep,
        });
    }

    /// Remove a destroyed structure, leaving a ruin for anything it stored.
    pub fn destroy_structure(&mut self, structure: &RoomObjectSnapshot) {
        let game_time = self.game_time();
        self.remove(&structure.id);
        if structure.store_used() > 0 {
            let id = self.next_object_id();
            let mut ruin = RoomObjectSnapshot::new(
                id,
                ObjectType::Ruin,
                structure.room.clone(),
                structure.x,
                structure.y,
            );
            ruin.user.clone_from(&structure.user);
            ruin.store = structure.store.clone();
            ruin.decay_time = Some(game_time.saturating_add(RUIN_DECAY));
            self.upsert(ruin);
        }
        self.log_event(RoomEvent::ObjectDestroyed {
            object_id: structure.id.clone(),
            object_type: structure.object_type,
        });
        if let Some(owner) = &structure.user {
            self.record_stat(owner, stats::STRUCTURES_LOST, 1);
        }
    }
}

/// Natural lifetime of a creep with `body`.
pub fn creep_lifetime(body: &[BodyPart]) -> u64 {
    if body.iter().any(|p| p.part == BodyPartType::Claim) {
        CREEP_CLAIM_LIFE_TIME
    } else {
        CREEP_LIFE_TIME
    }
}

/// Body part hit points for a creep at `hits` total.
///
/// Damage wears parts down from the front of the body, so the parts at
/// the back are the last to lose hit points.
pub fn body_for_hits(body: &[BodyPart], hits: i64) -> Vec<BodyPart> {
    let mut remaining = hits.max(0);
    let mut out: Vec<BodyPart> = body
        .iter()
        .rev()
        .map(|part| {
            let part_hits = remaining.min(BODYPART_HITS);
            remaining = remaining.saturating_sub(part_hits);
            BodyPart {
                hits: part_hits,
                ..part.clone()
            }
        })
        .collect();
    out.reverse();
    out
}
