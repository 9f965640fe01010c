//! Loop-stage event bus.
//!
//! One [`EventBus`] is created with the engine and handed out by
//! reference. Subscribers hold a [`Subscription`]; dropping it
//! unsubscribes. Publishing never blocks and never fails: events sent
//! while nobody listens are discarded, and a subscriber that falls more
//! than the bus capacity behind skips ahead.

use std::sync::Arc;

use hive_types::RoomName;
use tokio::sync::broadcast;

use crate::tick::TickSummary;

/// Events buffered per subscriber before the slowest one skips ahead.
pub const DEFAULT_CAPACITY: usize = 256;

/// A stage of the tick loop.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Processing of `tick` began.
    TickStarted {
        /// Tick number.
        tick: u64,
        /// Rooms that will be processed.
        rooms: usize,
    },
    /// One room was processed and flushed.
    RoomProcessed {
        /// Room.
        room: RoomName,
        /// Tick number.
        tick: u64,
        /// Document writes flushed.
        writes: usize,
    },
    /// One room's tick was aborted.
    RoomFailed {
        /// Room.
        room: RoomName,
        /// Tick number.
        tick: u64,
        /// Error message.
        error: String,
    },
    /// The global pass was flushed.
    GlobalProcessed {
        /// Tick number.
        tick: u64,
        /// Document writes flushed.
        writes: usize,
    },
    /// The whole tick completed.
    TickCompleted(Arc<TickSummary>),
    /// The loop was paused before `tick`.
    Paused {
        /// Tick that is waiting.
        tick: u64,
    },
}

/// Broadcast channel for [`EngineEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// A bus buffering `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send `event` to every current subscriber.
    pub fn publish(&self, event: EngineEvent) {
        // An error only means there are no subscribers.
        let _ = self.sender.send(event);
    }

    /// Start receiving events published from now on.
    pub fn subscribe(&self) -> Subscription {
        tracing::trace!(
            subscribers = self.sender.receiver_count().saturating_add(1),
            "Event bus subscription opened"
        );
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A live subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<EngineEvent>,
}

impl Subscription {
    /// The next event, or `None` once the bus is gone.
    ///
    /// A subscriber that lagged behind skips the missed events.
    pub async fn recv(&mut self) -> Option<EngineEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event bus subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// The next event if one is already waiting.
    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        tracing::trace!("Event bus subscription closed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_in_order() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe();
        bus.publish(EngineEvent::TickStarted { tick: 1, rooms: 0 });
        bus.publish(EngineEvent::GlobalProcessed { tick: 1, writes: 3 });
        assert!(matches!(
            sub.recv().await,
            Some(EngineEvent::TickStarted { tick: 1, .. })
        ));
        assert!(matches!(
            sub.recv().await,
            Some(EngineEvent::GlobalProcessed { writes: 3, .. })
        ));
    }

    #[test]
    fn dropping_the_guard_unsubscribes() {
        let bus = EventBus::default();
        let first = bus.subscribe();
        let second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
        drop(first);
        assert_eq!(bus.subscriber_count(), 1);
        drop(second);
        assert_eq!(bus.subscriber_count(), 0);
        // Publishing without subscribers is fine.
        bus.publish(EngineEvent::Paused { tick: 9 });
    }

    #[test]
    fn lagging_subscriber_skips_ahead() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();
        for tick in 1..=5 {
            bus.publish(EngineEvent::Paused { tick });
        }
        assert!(matches!(sub.try_recv(), Some(EngineEvent::Paused { tick: 4 })));
        assert!(matches!(sub.try_recv(), Some(EngineEvent::Paused { tick: 5 })));
        assert!(sub.try_recv().is_none());
    }
}
