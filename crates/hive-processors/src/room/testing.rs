//! Harness running room steps over fixture snapshots.

#![allow(clippy::unwrap_used)]

use hive_mutation::{
    GlobalMutationBatch, GlobalMutationBuffer, GlobalMutationWriter, RoomMutationBatch,
};
use hive_types::{IntentIndex, ObjectId, RoomIntentSnapshot, RoomObjectPatch, RoomSnapshot};

use super::RoomProcessorStep;
use crate::context::{RoomProcessorContext, RoomServices};
use crate::events::RoomEvent;
use crate::notify::{Notification, NotificationBuffer};
use crate::pathfinder::GridPathFinder;
use crate::stats::ProcessorStatsSink;

/// Everything a run staged or reported.
pub(crate) struct StepRun {
    pub batch: RoomMutationBatch,
    pub stats: ProcessorStatsSink,
    pub notifications: Vec<Notification>,
    pub global: GlobalMutationBatch,
    pub events: Vec<RoomEvent>,
}

impl StepRun {
    /// The merged patch staged for `id`.
    pub fn patch(&self, id: &str) -> &RoomObjectPatch {
        self.batch.patches.get(&ObjectId::from(id)).unwrap()
    }

    /// Whether anything at all was staged for `id`.
    pub fn touched(&self, id: &str) -> bool {
        let id = ObjectId::from(id);
        self.batch.patches.contains_key(&id)
            || self.batch.upserts.contains_key(&id)
            || self.batch.removals.contains(&id)
    }
}

/// Run `steps` with a global writer attached.
pub(crate) fn run_steps(snapshot: &RoomSnapshot, steps: &[&dyn RoomProcessorStep]) -> StepRun {
    run(snapshot, steps, true)
}

/// Run `steps` without a global writer.
pub(crate) fn run_steps_isolated(
    snapshot: &RoomSnapshot,
    steps: &[&dyn RoomProcessorStep],
) -> StepRun {
    run(snapshot, steps, false)
}

fn run(snapshot: &RoomSnapshot, steps: &[&dyn RoomProcessorStep], with_global: bool) -> StepRun {
    let intents = IntentIndex::new(
        snapshot
            .intents
            .as_ref()
            .map(RoomIntentSnapshot::flatten)
            .unwrap_or_default(),
    );
    let mut batch = RoomMutationBatch::new(snapshot.room_name.clone(), snapshot.game_time);
    let stats = ProcessorStatsSink::new();
    let notifications = NotificationBuffer::new();
    let global = GlobalMutationBuffer::new(snapshot.game_time);
    let mut finder = GridPathFinder::new();
    if let Some(terrain) = &snapshot.terrain {
        finder.insert_room(snapshot.room_name.clone(), terrain.clone());
    }

    let events = {
        let global_writer: &dyn GlobalMutationWriter = &global;
        let services = RoomServices {
            stats: &stats,
            notifications: &notifications,
            path_finder: &finder,
            global: with_global.then_some(global_writer),
        };
        let mut ctx = RoomProcessorContext::new(snapshot, &intents, &mut batch, services);
        for step in steps {
            step.run(&mut ctx).unwrap();
        }
        ctx.take_events()
    };

    StepRun {
        batch,
        stats,
        notifications: notifications.drain(),
        global: global.take(),
        events,
    }
}
