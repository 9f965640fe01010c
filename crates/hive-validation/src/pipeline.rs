//! The ordered validator pipeline.
//!
//! Each intent runs through the validators in registration order. The
//! first failure drops the intent and skips the remaining validators for
//! that intent only. Accepted intents keep their relative order.
//!
//! A [`ValidationRun`] lives for one [`ValidationPipeline::validate`] call.
//! Validators that budget a balance across intents read what earlier
//! accepted intents committed and record their own commitment once the
//! intent has passed every validator.

use std::collections::BTreeMap;
use std::sync::Arc;

use hive_types::{GlobalSnapshot, GlobalUserIntent, ObjectIntent, RoomSnapshot, UserId};
use rust_decimal::Decimal;

use crate::result::ValidationResult;
use crate::stats::ValidationStatisticsSink;

/// One validation rule over an intent type `I` and snapshot type `S`.
pub trait IntentValidator<I, S>: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Check `intent` against `snapshot`.
    fn validate(&self, intent: &I, snapshot: &S) -> ValidationResult;

    /// Check `intent` given what earlier accepted intents of the same run
    /// committed to.
    fn validate_in_run(&self, intent: &I, snapshot: &S, _run: &ValidationRun) -> ValidationResult {
        self.validate(intent, snapshot)
    }

    /// Record what an accepted intent commits to.
    fn commit(&self, _intent: &I, _snapshot: &S, _run: &mut ValidationRun) {}
}

/// Commitments of the intents accepted so far in one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationRun {
    spent: BTreeMap<UserId, Decimal>,
}

impl ValidationRun {
    /// An empty run.
    pub const fn new() -> Self {
        Self {
            spent: BTreeMap::new(),
        }
    }

    /// Credits already committed by `user`.
    pub fn spent(&self, user: &UserId) -> Decimal {
        self.spent.get(user).copied().unwrap_or_default()
    }

    /// Commit `amount` more credits for `user`.
    pub fn spend(&mut self, user: &UserId, amount: Decimal) {
        let total = self.spent.entry(user.clone()).or_default();
        *total = total.saturating_add(amount);
    }
}

/// A snapshot that carries the intents to validate.
pub trait IntentSource {
    /// The unit of validation.
    type Intent;

    /// The submitted intents, or `None` when the snapshot has no intents
    /// section.
    fn intents(&self) -> Option<Vec<Self::Intent>>;
}

impl IntentSource for RoomSnapshot {
    type Intent = ObjectIntent;

    fn intents(&self) -> Option<Vec<ObjectIntent>> {
        self.intents.as_ref().map(hive_types::RoomIntentSnapshot::flatten)
    }
}

impl IntentSource for GlobalSnapshot {
    type Intent = GlobalUserIntent;

    fn intents(&self) -> Option<Vec<GlobalUserIntent>> {
        Some(self.market.user_intents.clone())
    }
}

/// An intent that has a name for statistics.
pub trait NamedIntent {
    /// The intent name.
    fn intent_name(&self) -> &str;
}

impl NamedIntent for ObjectIntent {
    fn intent_name(&self) -> &str {
        &self.record.name
    }
}

impl NamedIntent for GlobalUserIntent {
    fn intent_name(&self) -> &str {
        &self.record.name
    }
}

/// Ordered list of validators plus an optional statistics sink.
pub struct ValidationPipeline<I, S> {
    validators: Vec<Box<dyn IntentValidator<I, S>>>,
    statistics: Option<Arc<ValidationStatisticsSink>>,
}

impl<I, S> Default for ValidationPipeline<I, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, S> ValidationPipeline<I, S> {
    /// A pipeline with no validators: every intent passes.
    pub const fn new() -> Self {
        Self {
            validators: Vec::new(),
            statistics: None,
        }
    }

    /// Append a validator.
    #[must_use]
    pub fn with(mut self, validator: impl IntentValidator<I, S> + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Record every outcome into `sink`.
    #[must_use]
    pub fn with_statistics(mut self, sink: Arc<ValidationStatisticsSink>) -> Self {
        self.statistics = Some(sink);
        self
    }

    /// Validator names in execution order.
    pub fn validator_names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Run every validator against one intent, stopping at the first
    /// failure.
    pub fn check(&self, intent: &I, snapshot: &S) -> ValidationResult {
        self.check_in_run(intent, snapshot, &ValidationRun::new())
    }

    /// [`ValidationPipeline::check`] against the commitments of `run`.
    pub fn check_in_run(&self, intent: &I, snapshot: &S, run: &ValidationRun) -> ValidationResult {
        for validator in &self.validators {
            let result = validator.validate_in_run(intent, snapshot, run);
            if !result.is_success() {
                return result;
            }
        }
        ValidationResult::Success
    }
}

impl<I: NamedIntent, S: IntentSource<Intent = I>> ValidationPipeline<I, S> {
    /// The subset of the snapshot's intents that pass, in submission
    /// order.
    pub fn validate(&self, snapshot: &S) -> Vec<I> {
        let Some(intents) = snapshot.intents() else {
            return Vec::new();
        };

        let mut run = ValidationRun::new();
        intents
            .into_iter()
            .filter(|intent| {
                let result = self.check_in_run(intent, snapshot, &run);
                if let Some(sink) = &self.statistics {
                    sink.record(intent.intent_name(), result);
                }
                match result {
                    ValidationResult::Success => {
                        for validator in &self.validators {
                            validator.commit(intent, snapshot, &mut run);
                        }
                    }
                    ValidationResult::Failure(code) => tracing::debug!(
                        intent = intent.intent_name(),
                        code = %code,
                        "Intent rejected"
                    ),
                }
                result.is_success()
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hive_types::test_support::{RoomFixture, creep, intent, owner, text};
    use hive_types::{BodyPartType, ObjectId};

    use super::*;
    use crate::result::ErrorCode;

    struct RejectNamed(&'static str, ErrorCode);

    impl IntentValidator<ObjectIntent, RoomSnapshot> for RejectNamed {
        fn name(&self) -> &'static str {
            "reject-named"
        }

        fn validate(&self, intent: &ObjectIntent, _snapshot: &RoomSnapshot) -> ValidationResult {
            ValidationResult::check(intent.record.name != self.0, self.1)
        }
    }

    struct Counting(Arc<AtomicUsize>);

    impl IntentValidator<ObjectIntent, RoomSnapshot> for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn validate(&self, _intent: &ObjectIntent, _snapshot: &RoomSnapshot) -> ValidationResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            ValidationResult::Success
        }
    }

    fn snapshot() -> RoomSnapshot {
        let user = owner();
        RoomFixture::new(1)
            .with(creep("c1", &user, 10, 10, &[BodyPartType::Move]))
            .with_intent(&user, "c1", intent("move", vec![("direction", text("1"))]))
            .with_intent(&user, "c1", intent("drop", vec![("resourceType", text("energy"))]))
            .with_intent(&user, "c1", intent("pickup", vec![("id", text("r1"))]))
            .build()
    }

    #[test]
    fn empty_pipeline_passes_everything() {
        let pipeline = ValidationPipeline::<ObjectIntent, RoomSnapshot>::new();
        assert_eq!(pipeline.validate(&snapshot()).len(), 3);
    }

    #[test]
    fn no_intents_section_yields_nothing() {
        let pipeline = ValidationPipeline::<ObjectIntent, RoomSnapshot>::new();
        let mut snap = snapshot();
        snap.intents = None;
        assert!(pipeline.validate(&snap).is_empty());
    }

    /// Accepts each intent name once per run.
    struct OncePerName;

    impl IntentValidator<ObjectIntent, RoomSnapshot> for OncePerName {
        fn name(&self) -> &'static str {
            "once-per-name"
        }

        fn validate(&self, _intent: &ObjectIntent, _snapshot: &RoomSnapshot) -> ValidationResult {
            ValidationResult::Success
        }

        fn validate_in_run(
            &self,
            _intent: &ObjectIntent,
            _snapshot: &RoomSnapshot,
            run: &ValidationRun,
        ) -> ValidationResult {
            ValidationResult::check(run.spent(&owner()).is_zero(), ErrorCode::Busy)
        }

        fn commit(&self, _intent: &ObjectIntent, _snapshot: &RoomSnapshot, run: &mut ValidationRun) {
            run.spend(&owner(), Decimal::ONE);
        }
    }

    #[test]
    fn commitments_carry_across_one_run_only() {
        let pipeline = ValidationPipeline::new().with(OncePerName);
        let snap = snapshot();
        assert_eq!(pipeline.validate(&snap).len(), 1);
        assert_eq!(pipeline.validate(&snap).len(), 1);
        // A lone check starts from an empty run.
        let first = snap.intents().unwrap().into_iter().next().unwrap();
        assert!(pipeline.check(&first, &snap).is_success());
    }

    #[test]
    fn first_failure_short_circuits_that_intent_only() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(ValidationStatisticsSink::new());
        let pipeline = ValidationPipeline::new()
            .with(RejectNamed("drop", ErrorCode::Busy))
            .with(Counting(Arc::clone(&calls)))
            .with_statistics(Arc::clone(&sink));

        let accepted = pipeline.validate(&snapshot());
        let names: Vec<&str> = accepted.iter().map(|i| i.record.name.as_str()).collect();
        assert_eq!(names, vec!["move", "pickup"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(accepted.iter().all(|i| i.object_id == ObjectId::from("c1")));

        let stats = sink.statistics();
        assert_eq!(stats.validated, 3);
        assert_eq!(stats.rejections_by_code.get(&ErrorCode::Busy), Some(&1));
        assert_eq!(pipeline.validator_names(), vec!["reject-named", "counting"]);
    }
}
