//! Per-user processing statistics.
//!
//! Steps record counters such as energy spent on creeps or harvested from
//! sources. One sink is shared by every room task of a tick.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use hive_types::UserId;

/// Energy spent spawning and renewing creeps.
pub const ENERGY_CREEPS: &str = "energyCreeps";
/// Energy harvested from sources.
pub const ENERGY_HARVESTED: &str = "energyHarvested";
/// Energy put into controllers.
pub const ENERGY_CONTROL: &str = "energyControl";
/// Creeps that finished spawning.
pub const CREEPS_PRODUCED: &str = "creepsProduced";
/// Creeps that died.
pub const CREEPS_LOST: &str = "creepsLost";
/// Structures destroyed.
pub const STRUCTURES_LOST: &str = "structuresLost";
/// Power processed by power spawns.
pub const POWER_PROCESSED: &str = "powerProcessed";

/// Counters per user, then per stat name.
pub type ProcessorStatistics = BTreeMap<UserId, BTreeMap<&'static str, i64>>;

/// Lock-protected statistics collector.
#[derive(Debug, Default)]
pub struct ProcessorStatsSink {
    inner: Mutex<ProcessorStatistics>,
}

impl ProcessorStatsSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to `stat` of `user`.
    pub fn record(&self, user: &UserId, stat: &'static str, amount: i64) {
        if amount == 0 {
            return;
        }
        let mut stats = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = stats
            .entry(user.clone())
            .or_default()
            .entry(stat)
            .or_insert(0);
        *counter = counter.saturating_add(amount);
    }

    /// Current value of one counter.
    pub fn get(&self, user: &UserId, stat: &str) -> i64 {
        let stats = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        stats
            .get(user)
            .and_then(|counters| counters.get(stat))
            .copied()
            .unwrap_or(0)
    }

    /// Copy of all counters.
    pub fn snapshot(&self) -> ProcessorStatistics {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return all counters and start over.
    pub fn take(&self) -> ProcessorStatistics {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
