//! Tick listener that reports what each tick did for players.
//!
//! Notifications are logged as they arrive. Per-user counters are summed
//! over the whole run and logged once on shutdown.

use hive_core::{TickListener, TickSummary};
use hive_processors::ProcessorStatistics;
use tracing::{debug, info};

/// Logs notifications and accumulates per-user statistics.
#[derive(Debug, Default)]
pub struct StatsListener {
    totals: ProcessorStatistics,
    notifications: u64,
}

impl StatsListener {
    /// An empty listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters summed over every tick seen so far.
    pub const fn totals(&self) -> &ProcessorStatistics {
        &self.totals
    }

    /// Log the run totals.
    pub fn log_totals(&self) {
        info!(
            users = self.totals.len(),
            notifications = self.notifications,
            "Run statistics"
        );
        for (user, counters) in &self.totals {
            for (stat, value) in counters {
                info!(user_id = %user, stat, value, "User statistic");
            }
        }
    }
}

impl TickListener for StatsListener {
    fn on_tick(&mut self, summary: &TickSummary) {
        for (user, counters) in &summary.statistics {
            let totals = self.totals.entry(user.clone()).or_default();
            for (stat, value) in counters {
                let total = totals.entry(*stat).or_insert(0);
                *total = total.saturating_add(*value);
            }
        }
        for notification in &summary.notifications {
            info!(
                user_id = %notification.user,
                room = %notification.room,
                tick = notification.tick,
                message = %notification.message,
                "Player notification"
            );
        }
        self.notifications = self
            .notifications
            .saturating_add(u64::try_from(summary.notifications.len()).unwrap_or(u64::MAX));
        debug!(
            tick = summary.tick,
            rejected = summary.validation.rejected,
            "Tick statistics recorded"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use hive_processors::Notification;
    use hive_processors::stats::{ENERGY_CREEPS, ENERGY_HARVESTED};
    use hive_types::{RoomName, UserId};

    use super::*;

    fn summary(tick: u64, harvested: i64) -> TickSummary {
        let mut counters = BTreeMap::new();
        counters.insert(ENERGY_HARVESTED, harvested);
        let mut statistics = ProcessorStatistics::new();
        statistics.insert(UserId::from("user1"), counters);
        TickSummary {
            tick,
            statistics,
            notifications: vec![Notification {
                user: UserId::from("user1"),
                room: RoomName::from("W1N1"),
                tick,
                message: "Your spawn is under attack".to_owned(),
            }],
            ..TickSummary::default()
        }
    }

    #[test]
    fn counters_accumulate_across_ticks() {
        let mut listener = StatsListener::new();
        listener.on_tick(&summary(1, 10));
        listener.on_tick(&summary(2, 4));

        let user = listener.totals().get(&UserId::from("user1")).unwrap();
        assert_eq!(user.get(ENERGY_HARVESTED), Some(&14));
        assert_eq!(user.get(ENERGY_CREEPS), None);
        assert_eq!(listener.notifications, 2);
    }
}
