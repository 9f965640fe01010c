//! Turns mutation batches into bulk storage writes.
//!
//! # Architecture
//!
//! ```text
//! RoomMutationBatch ---+                  +--> DocumentStore::apply_bulk (per kind)
//!                      +--> BulkWriter ---+
//! GlobalMutationBatch -+   (one per kind) +--> SideChannelStore (event log, map view)
//! ```
//!
//! Every batch is lowered into one [`BulkWriter`] per document kind, which
//! folds all operations on a document id into a single physical write.
//! Kinds are flushed in [`DocumentKind`] order so repeated runs issue the
//! same writes in the same sequence.

use std::collections::BTreeMap;
use std::sync::Arc;

use hive_db::{BulkWriter, DocumentKind, DocumentStore, DocumentUpdate, SideChannelStore};
use serde::Serialize;

use crate::error::MutationError;
use crate::global::{DocumentChanges, GlobalMutationBatch};
use crate::room::RoomMutationBatch;

/// What a dispatch wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchSummary {
    /// Bulk batches flushed, one per touched document kind.
    pub flushes: usize,
    /// Physical document writes across all flushes.
    pub writes: usize,
    /// Side-channel payloads saved.
    pub side_channels: usize,
}

/// Lower a sparse patch into a storage update.
trait IntoUpdate {
    fn into_update(self) -> Result<DocumentUpdate, serde_json::Error>;
}

macro_rules! impl_into_update {
    ($($patch:ty),+ $(,)?) => {
        $(
            impl IntoUpdate for $patch {
                fn into_update(self) -> Result<DocumentUpdate, serde_json::Error> {
                    self.to_field_changes().map(DocumentUpdate::from)
                }
            }
        )+
    };
}

impl_into_update!(
    hive_types::RoomObjectPatch,
    hive_types::RoomInfoPatch,
    hive_types::UserPatch,
    hive_types::MarketOrderPatch,
    hive_types::PowerCreepPatch,
);

#[derive(Debug, Default)]
struct KindWriters {
    writers: BTreeMap<DocumentKind, BulkWriter>,
}

impl KindWriters {
    fn writer(&mut self, kind: DocumentKind) -> &mut BulkWriter {
        self.writers
            .entry(kind)
            .or_insert_with(|| BulkWriter::new(kind))
    }

    fn stage<K, T, P>(
        &mut self,
        kind: DocumentKind,
        changes: DocumentChanges<K, T, P>,
    ) -> Result<(), MutationError>
    where
        K: Ord + AsRef<str>,
        T: Serialize,
        P: IntoUpdate,
    {
        let writer = self.writer(kind);
        for document in changes.upserts.values() {
            writer.insert(serde_json::to_value(document)?)?;
        }
        for (id, patch) in changes.patches {
            writer.update(id.as_ref(), patch.into_update()?);
        }
        for id in changes.removals {
            writer.remove(id.as_ref());
        }
        Ok(())
    }

    async fn flush<S: DocumentStore>(
        self,
        store: &S,
        summary: &mut DispatchSummary,
    ) -> Result<(), MutationError> {
        for writer in self.writers.into_values() {
            let batch = writer.finish();
            if batch.is_empty() {
                continue;
            }
            summary.flushes = summary.flushes.saturating_add(1);
            summary.writes = summary.writes.saturating_add(batch.len());
            store.apply_bulk(batch).await?;
        }
        Ok(())
    }
}

/// Persists mutation batches through a [`DocumentStore`] and
/// [`SideChannelStore`].
pub struct MutationDispatcher<S> {
    store: Arc<S>,
}

impl<S> MutationDispatcher<S> {
    /// Dispatch into `store`.
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: DocumentStore + SideChannelStore> MutationDispatcher<S> {
    /// Persist one room's batch, consuming it.
    pub async fn dispatch_room(
        &self,
        batch: RoomMutationBatch,
    ) -> Result<DispatchSummary, MutationError> {
        let RoomMutationBatch {
            room,
            game_time,
            upserts,
            patches,
            removals,
            room_info_patch,
            event_log,
            map_view,
        } = batch;

        let mut writers = KindWriters::default();
        writers.stage(
            DocumentKind::RoomObjects,
            DocumentChanges {
                upserts,
                patches,
                removals,
            },
        )?;
        if let Some(patch) = room_info_patch {
            writers
                .writer(DocumentKind::Rooms)
                .update(room.as_str(), patch.into_update()?);
        }

        let mut summary = DispatchSummary::default();
        writers.flush(self.store.as_ref(), &mut summary).await?;

        if let Some(payload) = event_log {
            self.store.save_event_log(&room, game_time, payload).await?;
            summary.side_channels = summary.side_channels.saturating_add(1);
        }
        if let Some(payload) = map_view {
            self.store.save_map_view(&room, game_time, payload).await?;
            summary.side_channels = summary.side_channels.saturating_add(1);
        }

        tracing::debug!(
            room = %room,
            tick = game_time,
            flushes = summary.flushes,
            writes = summary.writes,
            "Dispatched room mutations"
        );
        Ok(summary)
    }

    /// Persist the global batch, consuming it.
    pub async fn dispatch_global(
        &self,
        batch: GlobalMutationBatch,
    ) -> Result<DispatchSummary, MutationError> {
        let GlobalMutationBatch {
            game_time,
            orders,
            user_patches,
            user_increments,
            money_log,
            power_creeps,
            room_objects,
            room_info_patches,
        } = batch;

        let mut writers = KindWriters::default();
        writers.stage(DocumentKind::MarketOrders, orders)?;
        writers.stage(DocumentKind::PowerCreeps, power_creeps)?;
        writers.stage(DocumentKind::RoomObjects, room_objects)?;

        for (room, patch) in room_info_patches {
            writers
                .writer(DocumentKind::Rooms)
                .update(room.as_str(), patch.into_update()?);
        }
        for (user, patch) in user_patches {
            writers
                .writer(DocumentKind::Users)
                .update(user.as_str(), patch.into_update()?);
        }
        for (user, counters) in user_increments {
            let mut update = DocumentUpdate::default();
            update.inc.extend(counters);
            writers
                .writer(DocumentKind::Users)
                .update(user.as_str(), update);
        }
        for entry in &money_log {
            writers
                .writer(DocumentKind::UsersMoney)
                .insert(serde_json::to_value(entry)?)?;
        }

        let mut summary = DispatchSummary::default();
        writers.flush(self.store.as_ref(), &mut summary).await?;

        tracing::debug!(
            tick = game_time,
            flushes = summary.flushes,
            writes = summary.writes,
            money_log = money_log.len(),
            "Dispatched global mutations"
        );
        Ok(summary)
    }
}
