//! Validation statistics.
//!
//! One sink is shared by every room task of a tick. Recording takes a
//! short lock, so interleaved recording from many rooms never loses
//! counts.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::result::{ErrorCode, ValidationResult};

/// Counters accumulated since the last reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStatistics {
    /// Intents checked.
    pub validated: u64,
    /// Intents that passed every validator.
    pub accepted: u64,
    /// Intents rejected.
    pub rejected: u64,
    /// Rejections per error code.
    pub rejections_by_code: BTreeMap<ErrorCode, u64>,
    /// Rejections per intent name.
    pub rejections_by_intent: BTreeMap<String, u64>,
}

/// Lock-protected statistics collector.
#[derive(Debug, Default)]
pub struct ValidationStatisticsSink {
    inner: Mutex<ValidationStatistics>,
}

impl ValidationStatisticsSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one intent.
    pub fn record(&self, intent_name: &str, result: ValidationResult) {
        let mut stats = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        stats.validated = stats.validated.saturating_add(1);
        match result {
            ValidationResult::Success => {
                stats.accepted = stats.accepted.saturating_add(1);
            }
            ValidationResult::Failure(code) => {
                stats.rejected = stats.rejected.saturating_add(1);
                let by_code = stats.rejections_by_code.entry(code).or_insert(0);
                *by_code = by_code.saturating_add(1);
                let by_intent = stats
                    .rejections_by_intent
                    .entry(intent_name.to_owned())
                    .or_insert(0);
                *by_intent = by_intent.saturating_add(1);
            }
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) =
            ValidationStatistics::default();
    }

    /// An independent copy of the current counters.
    pub fn statistics(&self) -> ValidationStatistics {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn records_totals_and_breakdowns() {
        let sink = ValidationStatisticsSink::new();
        sink.record("move", ValidationResult::Success);
        sink.record("move", ValidationResult::Failure(ErrorCode::Tired));
        sink.record("harvest", ValidationResult::Failure(ErrorCode::NotInRange));

        let stats = sink.statistics();
        assert_eq!(stats.validated, 3);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.rejections_by_code.get(&ErrorCode::Tired), Some(&1));
        assert_eq!(stats.rejections_by_intent.get("harvest"), Some(&1));
    }

    #[test]
    fn snapshot_is_independent_of_later_records() {
        let sink = ValidationStatisticsSink::new();
        sink.record("move", ValidationResult::Success);
        let before = sink.statistics();
        sink.record("move", ValidationResult::Success);
        assert_eq!(before.validated, 1);
        assert_eq!(sink.statistics().validated, 2);
    }

    #[test]
    fn reset_zeroes_everything() {
        let sink = ValidationStatisticsSink::new();
        sink.record("move", ValidationResult::Failure(ErrorCode::Tired));
        sink.reset();
        assert_eq!(sink.statistics(), ValidationStatistics::default());
    }

    #[test]
    fn concurrent_recording_keeps_every_count() {
        let sink = Arc::new(ValidationStatisticsSink::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        sink.record("transfer", ValidationResult::Failure(ErrorCode::Full));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let stats = sink.statistics();
        assert_eq!(stats.rejected, 800);
        assert_eq!(stats.rejections_by_intent.get("transfer"), Some(&800));
    }
}
