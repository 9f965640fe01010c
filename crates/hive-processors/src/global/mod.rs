//! Global step pipeline.
//!
//! Runs once per tick after every room has been processed. Steps read the
//! [`GlobalSnapshot`] and stage writes on the shared
//! [`GlobalMutationWriter`], the same buffer room steps used for their
//! cross-room effects. Read-backs through the context see everything
//! staged earlier in the tick.

pub mod market;
pub mod power_creeps;
pub mod world;

use hive_mutation::GlobalMutationWriter;
use hive_types::{
    GlobalSnapshot, GlobalUserIntent, MarketOrderSnapshot, ObjectId, OrderId, PowerCreepSnapshot,
    UserId, UserState,
};

use crate::error::ProcessorError;

/// Everything the global steps read and write during a tick.
pub struct GlobalProcessorContext<'a> {
    snapshot: &'a GlobalSnapshot,
    intents: &'a [GlobalUserIntent],
    writer: &'a dyn GlobalMutationWriter,
    now_ms: i64,
    sequence: u64,
}

impl<'a> GlobalProcessorContext<'a> {
    /// A context over the global snapshot and its validated intents.
    ///
    /// `now_ms` is the wall-clock time of the tick in epoch milliseconds,
    /// used for power creep deletion windows and ledger dates.
    pub const fn new(
        snapshot: &'a GlobalSnapshot,
        intents: &'a [GlobalUserIntent],
        writer: &'a dyn GlobalMutationWriter,
        now_ms: i64,
    ) -> Self {
        Self {
            snapshot,
            intents,
            writer,
            now_ms,
            sequence: 0,
        }
    }

    /// The global snapshot.
    pub const fn snapshot(&self) -> &'a GlobalSnapshot {
        self.snapshot
    }

    /// The tick being processed.
    pub const fn game_time(&self) -> u64 {
        self.snapshot.game_time
    }

    /// Wall-clock time of the tick in epoch milliseconds.
    pub const fn now_ms(&self) -> i64 {
        self.now_ms
    }

    /// The writer.
    pub const fn writer(&self) -> &'a dyn GlobalMutationWriter {
        self.writer
    }

    /// Validated intents named `name`, in submission order.
    pub fn named(&self, name: &'a str) -> impl Iterator<Item = &'a GlobalUserIntent> + use<'a> {
        let intents = self.intents;
        intents.iter().filter(move |i| i.record.name == name)
    }

    /// Next value of the per-tick sequence used to derive new ids.
    pub fn next_sequence(&mut self) -> u64 {
        let current = self.sequence;
        self.sequence = self.sequence.saturating_add(1);
        current
    }

    /// Current state of a user, pending patches applied.
    pub fn user(&self, id: &UserId) -> Result<Option<UserState>, ProcessorError> {
        let Some(base) = self.snapshot.market.users.get(id) else {
            return Ok(None);
        };
        match self.writer.pending_user(id) {
            Some(patch) => Ok(Some(patch.apply_to(base)?)),
            None => Ok(Some(base.clone())),
        }
    }

    /// Current state of a market order.
    pub fn order(&self, id: &OrderId) -> Result<Option<MarketOrderSnapshot>, ProcessorError> {
        Ok(self
            .writer
            .pending_order(id)
            .resolve(self.snapshot.market.orders.get(id))?)
    }

    /// Current state of a power creep.
    pub fn power_creep(
        &self,
        id: &ObjectId,
    ) -> Result<Option<PowerCreepSnapshot>, ProcessorError> {
        Ok(self
            .writer
            .pending_power_creep(id)
            .resolve(self.snapshot.market.power_creeps.get(id))?)
    }

    /// Current power creeps of `user`, created ones included, in id order.
    pub fn power_creeps_of(&self, user: &UserId) -> Result<Vec<PowerCreepSnapshot>, ProcessorError> {
        let mut ids: Vec<ObjectId> = self
            .snapshot
            .market
            .power_creeps
            .values()
            .filter(|pc| pc.user == *user)
            .map(|pc| pc.id.clone())
            .collect();
        ids.extend(
            self.writer
                .upserted_power_creeps()
                .into_iter()
                .filter(|pc| pc.user == *user)
                .map(|pc| pc.id),
        );
        ids.sort();
        ids.dedup();

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(creep) = self.power_creep(&id)? {
                out.push(creep);
            }
        }
        Ok(out)
    }
}

/// One stage of global processing.
pub trait GlobalProcessorStep: Send + Sync {
    /// Stable step name, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Process the tick's global state.
    fn run(&self, ctx: &mut GlobalProcessorContext<'_>) -> Result<(), ProcessorError>;
}

/// Ordered list of global steps.
pub struct GlobalProcessor {
    steps: Vec<Box<dyn GlobalProcessorStep>>,
}

impl GlobalProcessor {
    /// The standard pipeline.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(world::InterRoomTransitStep),
            Box::new(market::MarketIntentsStep),
            Box::new(market::MarketActivationStep),
            Box::new(power_creeps::PowerCreepIntentsStep),
            Box::new(power_creeps::PowerCreepDeletionStep),
            Box::new(world::PowerBankDecayStep),
        ])
    }

    /// A pipeline running `steps` in the given order.
    pub fn new(steps: Vec<Box<dyn GlobalProcessorStep>>) -> Self {
        Self { steps }
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step.
    pub fn process(&self, ctx: &mut GlobalProcessorContext<'_>) -> Result<(), ProcessorError> {
        for step in &self.steps {
            tracing::trace!(tick = ctx.game_time(), step = step.name(), "Running global step");
            if let Err(source) = step.run(ctx) {
                tracing::error!(
                    tick = ctx.game_time(),
                    step = step.name(),
                    error = %source,
                    "Global step failed"
                );
                return Err(ProcessorError::Step {
                    step: step.name(),
                    source: Box::new(source),
                });
            }
        }
        Ok(())
    }
}

impl Default for GlobalProcessor {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Harness running global steps over fixture snapshots.

    #![allow(clippy::unwrap_used)]

    use hive_mutation::{GlobalMutationBatch, GlobalMutationBuffer};
    use hive_types::GlobalSnapshot;

    use super::{GlobalProcessorContext, GlobalProcessorStep};

    /// Fixed wall clock for global step tests.
    pub(crate) const NOW_MS: i64 = 1_700_000_000_000;

    /// Run `steps` over `snapshot` and its market intents.
    pub(crate) fn run_global(
        snapshot: &GlobalSnapshot,
        steps: &[&dyn GlobalProcessorStep],
    ) -> GlobalMutationBatch {
        let buffer = GlobalMutationBuffer::new(snapshot.game_time);
        let mut ctx = GlobalProcessorContext::new(
            snapshot,
            &snapshot.market.user_intents,
            &buffer,
            NOW_MS,
        );
        for step in steps {
            step.run(&mut ctx).unwrap();
        }
        buffer.take()
    }
}
