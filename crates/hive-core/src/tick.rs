//! One tick of the world: every active room in parallel, then the global
//! pass.
//!
//! Per room, in order:
//!
//! 1. **Snapshot** -- fetch the cached [`RoomSnapshot`] for the tick.
//! 2. **Validate** -- run the room validation pipeline over its intents.
//! 3. **Process** -- run the room step pipeline into a fresh
//!    [`RoomMutationBatch`]. Cross-room effects are staged in a
//!    [`GlobalMutationBuffer`] owned by the room.
//! 4. **Flush** -- dispatch the batch, hand the staged cross-room writes
//!    to the tick's shared buffer, clear the room's intents and invalidate
//!    its snapshot.
//! 5. **History** -- record the post-tick objects. Failures here are
//!    logged and never abort the room.
//!
//! A failing room aborts only its own tick: its staged cross-room writes
//! are dropped and its intents are cleared, so nothing is retried on the
//! next tick. A panicking room task counts as a failed room. Once every
//! room is done the
//! global snapshot is built (so it sees this tick's room writes), the
//! global intents are validated and processed, and the shared buffer is
//! dispatched in one pass. A global failure aborts the tick.
//!
//! [`RoomSnapshot`]: hive_types::RoomSnapshot

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use hive_db::{DbError, HistoryStore, WorldStore};
use hive_mutation::{
    GlobalMutationBuffer, GlobalMutationWriter, MutationDispatcher, MutationError,
    RoomHistoryRecorder, RoomMutationBatch, project_objects,
};
use hive_processors::{
    GlobalProcessor, GlobalProcessorContext, GridPathFinder, Notification, NotificationBuffer,
    ProcessorError, ProcessorStatistics, ProcessorStatsSink, RoomProcessor, RoomProcessorContext,
    RoomServices,
};
use hive_snapshot::{
    GlobalSnapshotBuilder, GlobalSnapshotProvider, RoomSnapshotBuilder, RoomSnapshotProvider,
    SnapshotError, SnapshotProvider,
};
use hive_types::{IntentIndex, RoomName, RoomSnapshot};
use hive_validation::{
    GlobalValidationPipeline, RoomValidationPipeline, ValidationStatistics,
    ValidationStatisticsSink,
};
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};

use crate::config::EngineConfig;
use crate::events::{EngineEvent, EventBus};

/// Errors that abort a room's tick or the global pass.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A snapshot could not be built.
    #[error("snapshot error: {source}")]
    Snapshot {
        /// The underlying snapshot error.
        #[from]
        source: SnapshotError,
    },

    /// A processing step failed.
    #[error("processor error: {source}")]
    Processor {
        /// The underlying step error.
        #[from]
        source: ProcessorError,
    },

    /// A mutation batch could not be persisted.
    #[error("mutation error: {source}")]
    Mutation {
        /// The underlying dispatch error.
        #[from]
        source: MutationError,
    },

    /// The store failed outside of a dispatch.
    #[error("storage error: {source}")]
    Db {
        /// The underlying storage error.
        #[from]
        source: DbError,
    },

    /// A room task panicked or was cancelled.
    #[error("room task failed: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}

/// Knobs of the tick engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEngineOptions {
    /// Rooms processed concurrently.
    pub room_concurrency: usize,
    /// Ticks per history chunk.
    pub history_chunk_size: u64,
    /// Reject market fees the balance cannot cover.
    pub reject_negative_balances: bool,
}

impl Default for TickEngineOptions {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for TickEngineOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            room_concurrency: config.engine.room_concurrency,
            history_chunk_size: config.engine.history_chunk_size,
            reject_negative_balances: config.validation.reject_negative_balances,
        }
    }
}

/// What one room's tick produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomOutcome {
    /// Room.
    pub room: RoomName,
    /// Intents that passed validation.
    pub accepted_intents: usize,
    /// Document writes flushed.
    pub writes: usize,
    /// History chunks completed and saved.
    pub history_chunks: usize,
}

/// Summary of a single tick.
#[derive(Debug, Clone, Default)]
pub struct TickSummary {
    /// The tick that was processed.
    pub tick: u64,
    /// Rooms processed successfully, in room order.
    pub rooms: Vec<RoomOutcome>,
    /// Rooms whose tick was aborted, in room order.
    pub failed_rooms: Vec<RoomName>,
    /// Document writes flushed by the global pass.
    pub global_writes: usize,
    /// Validation counters for the tick.
    pub validation: ValidationStatistics,
    /// Per-user counters raised by the steps.
    pub statistics: ProcessorStatistics,
    /// Notifications raised for players.
    pub notifications: Vec<Notification>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl TickSummary {
    /// Document writes across every room and the global pass.
    pub fn total_writes(&self) -> usize {
        self.rooms
            .iter()
            .map(|r| r.writes)
            .fold(self.global_writes, usize::saturating_add)
    }
}

/// A finished room task: the room and how its tick went.
type RoomResult = (RoomName, Result<RoomOutcome, TickError>);

/// Per-room machinery shared by the room tasks.
struct RoomStage<S: WorldStore, H> {
    store: Arc<S>,
    history_store: Option<Arc<H>>,
    snapshots: RoomSnapshotProvider<S>,
    validation: RoomValidationPipeline,
    processor: RoomProcessor,
    dispatcher: MutationDispatcher<S>,
    recorder: RoomHistoryRecorder,
    stats: ProcessorStatsSink,
    notifications: NotificationBuffer,
    events: EventBus,
}

impl<S: WorldStore, H: HistoryStore> RoomStage<S, H> {
    async fn process_room(
        &self,
        room: &RoomName,
        tick: u64,
        global: &GlobalMutationBuffer,
    ) -> Result<RoomOutcome, TickError> {
        let snapshot = self.snapshots.get_snapshot(room, tick).await?;
        let intents = IntentIndex::new(self.validation.validate(&snapshot));
        let accepted_intents = intents.len();

        let staged = GlobalMutationBuffer::new(tick);
        let batch = self.run_steps(&snapshot, &intents, &staged)?;
        let projected = match self.history_store {
            Some(_) => Some(project_objects(&snapshot.objects, &batch)?),
            None => None,
        };

        let dispatched = self.dispatcher.dispatch_room(batch).await?;
        global.absorb(staged.take());
        self.store.clear_room_intents(room).await?;
        self.snapshots.invalidate(room);

        let history_chunks = match (projected, &self.history_store) {
            (Some(objects), Some(history)) => {
                self.save_history(history, room, tick, objects).await
            }
            _ => 0,
        };

        tracing::debug!(
            room = %room,
            tick,
            intents = accepted_intents,
            writes = dispatched.writes,
            "Room processed"
        );
        self.events.publish(EngineEvent::RoomProcessed {
            room: room.clone(),
            tick,
            writes: dispatched.writes,
        });
        Ok(RoomOutcome {
            room: room.clone(),
            accepted_intents,
            writes: dispatched.writes,
            history_chunks,
        })
    }

    fn run_steps(
        &self,
        snapshot: &RoomSnapshot,
        intents: &IntentIndex,
        global: &GlobalMutationBuffer,
    ) -> Result<RoomMutationBatch, ProcessorError> {
        let mut batch = RoomMutationBatch::new(snapshot.room_name.clone(), snapshot.game_time);
        let mut path_finder = GridPathFinder::new();
        if let Some(terrain) = &snapshot.terrain {
            path_finder.insert_room(snapshot.room_name.clone(), terrain.clone());
        }
        {
            let services = RoomServices {
                stats: &self.stats,
                notifications: &self.notifications,
                path_finder: &path_finder,
                global: Some(global as &dyn GlobalMutationWriter),
            };
            let mut ctx = RoomProcessorContext::new(snapshot, intents, &mut batch, services);
            self.processor.process(&mut ctx)?;
        }
        Ok(batch)
    }

    /// Drop what is left of a failed room's tick so it is not replayed.
    async fn discard_room(&self, room: &RoomName, tick: u64) {
        if let Err(error) = self.store.clear_room_intents(room).await {
            tracing::warn!(
                room = %room,
                tick,
                error = %error,
                "Failed to clear intents of a failed room"
            );
        }
        self.snapshots.invalidate(room);
    }

    /// Record the room's objects and save any completed chunks.
    async fn save_history(
        &self,
        history: &H,
        room: &RoomName,
        tick: u64,
        objects: serde_json::Map<String, serde_json::Value>,
    ) -> usize {
        let mut saved = 0_usize;
        for chunk in self.recorder.record(room, tick, objects) {
            let base = chunk.base;
            match history.save_history_chunk(chunk).await {
                Ok(()) => saved = saved.saturating_add(1),
                Err(error) => tracing::warn!(
                    room = %room,
                    tick,
                    base,
                    error = %error,
                    "Failed to save history chunk"
                ),
            }
        }
        saved
    }
}

/// Runs ticks against a world store.
///
/// `S` holds the world documents; `H` receives history chunks. Without a
/// history store no history is recorded.
pub struct TickEngine<S: WorldStore, H> {
    rooms: Arc<RoomStage<S, H>>,
    global_snapshots: GlobalSnapshotProvider<S>,
    global_validation: GlobalValidationPipeline,
    global_processor: GlobalProcessor,
    validation_stats: Arc<ValidationStatisticsSink>,
    room_concurrency: usize,
}

impl<S, H> TickEngine<S, H>
where
    S: WorldStore + 'static,
    H: HistoryStore + 'static,
{
    /// An engine over `store` with the standard pipelines.
    pub fn new(
        store: Arc<S>,
        history_store: Option<Arc<H>>,
        options: TickEngineOptions,
        events: EventBus,
    ) -> Self {
        let validation_stats = Arc::new(ValidationStatisticsSink::new());
        let rooms = RoomStage {
            snapshots: SnapshotProvider::new(RoomSnapshotBuilder::new(Arc::clone(&store))),
            validation: RoomValidationPipeline::room_default()
                .with_statistics(Arc::clone(&validation_stats)),
            processor: RoomProcessor::standard(),
            dispatcher: MutationDispatcher::new(Arc::clone(&store)),
            recorder: RoomHistoryRecorder::new(options.history_chunk_size),
            stats: ProcessorStatsSink::new(),
            notifications: NotificationBuffer::new(),
            events,
            history_store,
            store: Arc::clone(&store),
        };
        Self {
            rooms: Arc::new(rooms),
            global_snapshots: SnapshotProvider::new(GlobalSnapshotBuilder::new(store)),
            global_validation: GlobalValidationPipeline::global(options.reject_negative_balances)
                .with_statistics(Arc::clone(&validation_stats)),
            global_processor: GlobalProcessor::standard(),
            validation_stats,
            room_concurrency: options.room_concurrency.max(1),
        }
    }

    /// The world store.
    pub fn store(&self) -> &Arc<S> {
        &self.rooms.store
    }

    /// The event bus stage events are published on.
    pub fn events(&self) -> &EventBus {
        &self.rooms.events
    }

    /// Process `tick` for every active room and the global partition.
    pub async fn run_tick(&self, tick: u64) -> Result<TickSummary, TickError> {
        let started = Instant::now();
        let rooms = self.rooms.store.list_active_rooms().await?;
        tracing::debug!(tick, rooms = rooms.len(), "Tick started");
        self.rooms.events.publish(EngineEvent::TickStarted {
            tick,
            rooms: rooms.len(),
        });

        let global = Arc::new(GlobalMutationBuffer::new(tick));
        let limit = Arc::new(Semaphore::new(self.room_concurrency));
        let mut tasks = JoinSet::new();
        let mut names = HashMap::with_capacity(rooms.len());
        for room in rooms {
            let stage = Arc::clone(&self.rooms);
            let global = Arc::clone(&global);
            let limit = Arc::clone(&limit);
            let name = room.clone();
            let handle = tasks.spawn(async move {
                // The semaphore is never closed.
                let _permit = limit.acquire_owned().await.ok();
                let result = stage.process_room(&room, tick, &global).await;
                (room, result)
            });
            names.insert(handle.id(), name);
        }

        let mut summary = TickSummary {
            tick,
            ..TickSummary::default()
        };
        for (room, result) in drain_rooms(tasks, &names).await {
            match result {
                Ok(outcome) => summary.rooms.push(outcome),
                Err(error) => {
                    tracing::error!(room = %room, tick, error = %error, "Room tick aborted");
                    self.rooms.discard_room(&room, tick).await;
                    self.rooms.events.publish(EngineEvent::RoomFailed {
                        room: room.clone(),
                        tick,
                        error: error.to_string(),
                    });
                    summary.failed_rooms.push(room);
                }
            }
        }
        summary.rooms.sort_by(|a, b| a.room.cmp(&b.room));
        summary.failed_rooms.sort();

        summary.global_writes = self.run_global(tick, &global).await?;
        summary.validation = self.validation_stats.statistics();
        self.validation_stats.reset();
        summary.statistics = self.rooms.stats.take();
        summary.notifications = self.rooms.notifications.drain();
        summary.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::info!(
            tick,
            rooms = summary.rooms.len(),
            failed_rooms = summary.failed_rooms.len(),
            writes = summary.total_writes(),
            rejected = summary.validation.rejected,
            duration_ms = summary.duration_ms,
            "Tick processed"
        );
        self.rooms
            .events
            .publish(EngineEvent::TickCompleted(Arc::new(summary.clone())));
        Ok(summary)
    }

    async fn run_global(&self, tick: u64, buffer: &GlobalMutationBuffer) -> Result<usize, TickError> {
        let snapshot = self.global_snapshots.get_snapshot(&(), tick).await?;
        let intents = self.global_validation.validate(&snapshot);
        {
            let now_ms = chrono::Utc::now().timestamp_millis();
            let mut ctx = GlobalProcessorContext::new(&snapshot, &intents, buffer, now_ms);
            self.global_processor.process(&mut ctx)?;
        }

        let dispatched = self.rooms.dispatcher.dispatch_global(buffer.take()).await?;
        self.rooms.store.clear_user_intents().await?;
        self.global_snapshots.invalidate(&());

        self.rooms.events.publish(EngineEvent::GlobalProcessed {
            tick,
            writes: dispatched.writes,
        });
        Ok(dispatched.writes)
    }

    /// Close and save every open history chunk. Called on shutdown.
    pub async fn flush_history(&self) -> usize {
        let Some(history) = &self.rooms.history_store else {
            return 0;
        };
        let mut saved = 0_usize;
        for chunk in self.rooms.recorder.flush() {
            let room = chunk.room.clone();
            match history.save_history_chunk(chunk).await {
                Ok(()) => saved = saved.saturating_add(1),
                Err(error) => {
                    tracing::warn!(room = %room, error = %error, "Failed to save history chunk");
                }
            }
        }
        saved
    }
}

/// Wait for every room task. A task that panicked or was cancelled is
/// reported as a failure of its room; the other tasks keep running.
async fn drain_rooms(
    mut tasks: JoinSet<RoomResult>,
    names: &HashMap<Id, RoomName>,
) -> Vec<RoomResult> {
    let mut results = Vec::with_capacity(names.len());
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, result)) => results.push(result),
            Err(error) => match names.get(&error.id()) {
                Some(room) => results.push((room.clone(), Err(TickError::from(error)))),
                None => tracing::error!(error = %error, "Unknown room task failed"),
            },
        }
    }
    results
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_db::{DocumentKind, IntentStore, MemoryStore};
    use serde_json::json;

    use super::*;

    fn seeded() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.add_room(&RoomName::from("W1N1")).unwrap();
        store.add_room(&RoomName::from("W2N1")).unwrap();
        Arc::new(store)
    }

    fn engine(store: &Arc<MemoryStore>, history: bool) -> TickEngine<MemoryStore, MemoryStore> {
        TickEngine::new(
            Arc::clone(store),
            history.then(|| Arc::clone(store)),
            TickEngineOptions {
                history_chunk_size: 4,
                ..TickEngineOptions::default()
            },
            EventBus::default(),
        )
    }

    #[test]
    fn options_follow_config() {
        let mut config = EngineConfig::default();
        config.engine.room_concurrency = 3;
        config.validation.reject_negative_balances = false;
        let options = TickEngineOptions::from(&config);
        assert_eq!(options.room_concurrency, 3);
        assert_eq!(options.history_chunk_size, 20);
        assert!(!options.reject_negative_balances);
    }

    #[test]
    fn total_writes_adds_rooms_and_global() {
        let summary = TickSummary {
            rooms: vec![
                RoomOutcome {
                    room: RoomName::from("W1N1"),
                    accepted_intents: 0,
                    writes: 2,
                    history_chunks: 0,
                },
                RoomOutcome {
                    room: RoomName::from("W2N1"),
                    accepted_intents: 0,
                    writes: 3,
                    history_chunks: 0,
                },
            ],
            global_writes: 1,
            ..TickSummary::default()
        };
        assert_eq!(summary.total_writes(), 6);
    }

    #[tokio::test]
    async fn empty_world_ticks_cleanly() {
        let store = seeded();
        let engine = engine(&store, false);
        let summary = engine.run_tick(1).await.unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.rooms.len(), 2);
        assert!(summary.failed_rooms.is_empty());
        assert_eq!(summary.validation.validated, 0);
    }

    #[tokio::test]
    async fn malformed_room_fails_alone() {
        let store = seeded();
        store
            .put_document(
                DocumentKind::RoomObjects,
                json!({"_id": "bad", "type": "creep", "room": "W2N1", "x": "nope", "y": 1}),
            )
            .unwrap();
        store
            .save_room_intents(&RoomName::from("W2N1"), json!({"users": {}}))
            .await
            .unwrap();
        let engine = engine(&store, false);
        let mut events = engine.events().subscribe();

        let summary = engine.run_tick(7).await.unwrap();

        assert_eq!(summary.failed_rooms, vec![RoomName::from("W2N1")]);
        assert_eq!(summary.rooms.len(), 1);
        assert_eq!(summary.rooms.first().unwrap().room, RoomName::from("W1N1"));
        // A failed room's intents are not replayed on the next tick.
        assert!(store.room_intents(&RoomName::from("W2N1")).is_none());

        let mut failed = false;
        while let Some(event) = events.try_recv() {
            if let EngineEvent::RoomFailed { room, tick, .. } = event {
                assert_eq!(room, RoomName::from("W2N1"));
                assert_eq!(tick, 7);
                failed = true;
            }
        }
        assert!(failed);
    }

    fn outcome(room: &str) -> RoomResult {
        let room = RoomName::from(room);
        let outcome = RoomOutcome {
            room: room.clone(),
            accepted_intents: 0,
            writes: 0,
            history_chunks: 0,
        };
        (room, Ok(outcome))
    }

    #[allow(clippy::panic)]
    async fn exploding_room() -> RoomResult {
        panic!("room task blew up")
    }

    #[tokio::test]
    async fn panicked_room_task_fails_only_its_room() {
        let mut tasks = JoinSet::new();
        let mut names = HashMap::new();
        let handle = tasks.spawn(async {
            tokio::task::yield_now().await;
            outcome("W1N1")
        });
        names.insert(handle.id(), RoomName::from("W1N1"));
        let handle = tasks.spawn(exploding_room());
        names.insert(handle.id(), RoomName::from("W2N1"));
        let handle = tasks.spawn(async { outcome("W3N1") });
        names.insert(handle.id(), RoomName::from("W3N1"));

        let mut results = drain_rooms(tasks, &names).await;
        results.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(results.len(), 3);
        let failed: Vec<&RoomName> = results
            .iter()
            .filter(|(_, result)| result.is_err())
            .map(|(room, _)| room)
            .collect();
        assert_eq!(failed, vec![&RoomName::from("W2N1")]);
        assert!(matches!(
            results.get(1).unwrap().1,
            Err(TickError::Join { .. })
        ));
    }

    #[tokio::test]
    async fn history_chunk_closes_on_its_last_tick() {
        let store = seeded();
        store
            .put_document(
                DocumentKind::RoomObjects,
                json!({"_id": "src", "type": "source", "room": "W1N1", "x": 5, "y": 5, "energy": 3000, "energyCapacity": 3000}),
            )
            .unwrap();
        let engine = engine(&store, true);

        for tick in 4..8 {
            engine.run_tick(tick).await.unwrap();
        }

        let chunks = store.history_chunks();
        let chunk = chunks
            .iter()
            .find(|c| c.room == RoomName::from("W1N1"))
            .unwrap();
        assert_eq!(chunk.base, 4);
        assert_eq!(chunk.ticks.len(), 4);
        assert!(chunk.ticks.get(&4).unwrap().get("src").is_some());
    }

    #[tokio::test]
    async fn flush_closes_open_chunks() {
        let store = seeded();
        let engine = engine(&store, true);
        engine.run_tick(1).await.unwrap();
        assert!(store.history_chunks().is_empty());
        assert_eq!(engine.flush_history().await, 2);
        assert_eq!(store.history_chunks().len(), 2);
        assert_eq!(engine.flush_history().await, 0);
    }
}
