//! Cached, per-key snapshot providers.
//!
//! A provider owns at most one snapshot per key, tagged with the game time
//! it was built for. Each key has its own async mutex: concurrent first
//! requests for one key wait for a single build, while other keys build
//! independently.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::SnapshotError;

/// Builds one immutable snapshot from the backing store.
pub trait SnapshotBuilder: Send + Sync {
    /// Partition key (a room name, or `()` for the global snapshot).
    type Key: Clone + Ord + Debug + Send + Sync;
    /// The snapshot produced.
    type Snapshot: Send + Sync;

    /// Build the snapshot of `key` at `game_time`.
    fn build(
        &self,
        key: &Self::Key,
        game_time: u64,
    ) -> impl Future<Output = Result<Self::Snapshot, SnapshotError>> + Send;
}

/// Cached build result of one key.
type Slot<S> = Arc<tokio::sync::Mutex<Option<(u64, Arc<S>)>>>;

/// Serves cached snapshots, rebuilding on a new game time or after
/// [`invalidate`](Self::invalidate).
pub struct SnapshotProvider<B: SnapshotBuilder> {
    builder: B,
    slots: Mutex<BTreeMap<B::Key, Slot<B::Snapshot>>>,
}

impl<B: SnapshotBuilder> SnapshotProvider<B> {
    /// Wrap `builder` with an empty cache.
    pub fn new(builder: B) -> Self {
        Self {
            builder,
            slots: Mutex::new(BTreeMap::new()),
        }
    }

    /// The wrapped builder.
    pub const fn builder(&self) -> &B {
        &self.builder
    }

    fn slot(&self, key: &B::Key) -> Slot<B::Snapshot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// The snapshot of `key` at `game_time`.
    ///
    /// Returns the cached instance when it was built for exactly this game
    /// time. A failed build leaves the slot empty and propagates the error.
    pub async fn get_snapshot(
        &self,
        key: &B::Key,
        game_time: u64,
    ) -> Result<Arc<B::Snapshot>, SnapshotError> {
        let slot = self.slot(key);
        let mut cached = slot.lock().await;

        if let Some((_, snapshot)) = cached.as_ref().filter(|(t, _)| *t == game_time) {
            tracing::trace!(key = ?key, tick = game_time, "Snapshot cache hit");
            return Ok(Arc::clone(snapshot));
        }

        *cached = None;
        let snapshot = Arc::new(self.builder.build(key, game_time).await?);
        *cached = Some((game_time, Arc::clone(&snapshot)));
        tracing::debug!(key = ?key, tick = game_time, "Built snapshot");
        Ok(snapshot)
    }

    /// Force the next request for `key` to rebuild, even for the same game
    /// time.
    pub fn invalidate(&self, key: &B::Key) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.remove(key).is_some() {
            tracing::trace!(key = ?key, "Snapshot invalidated");
        }
    }

    /// Drop every cached snapshot.
    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
