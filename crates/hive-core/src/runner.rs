//! Driving loop with operator controls.
//!
//! [`run_engine`] advances the stored game time once per tick and wraps
//! [`TickEngine::run_tick`] with:
//!
//! - **Pause/resume**: operator pause, or the `mainLoopPaused` environment
//!   key set by an external tool
//! - **Bounded runs**: stop after `max_ticks`
//! - **Variable tick speed**: the interval is a floor on tick length and is
//!   adjustable at runtime
//! - **Clean shutdown**: open history chunks are flushed on the way out
//!
//! Game time lives in the environment store so a restarted engine
//! continues where it stopped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hive_db::{DbError, EnvKey, EnvironmentStore, HistoryStore, WorldStore};
use tracing::{info, warn};

use crate::config::EngineSection;
use crate::events::EngineEvent;
use crate::operator::{EngineStopReason, OperatorState};
use crate::tick::{TickEngine, TickError, TickSummary};

/// Errors that end the driving loop.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick could not be completed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },

    /// The environment store failed.
    #[error("environment error: {source}")]
    Environment {
        /// The underlying storage error.
        #[from]
        source: DbError,
    },
}

/// How the loop ended.
#[derive(Debug)]
pub struct EngineRunResult {
    /// Why the loop stopped.
    pub stop_reason: EngineStopReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Ticks processed by this run.
    pub total_ticks: u64,
}

/// Callback invoked after each completed tick.
pub trait TickListener: Send {
    /// Called with the summary of the tick that just completed.
    fn on_tick(&mut self, summary: &TickSummary);
}

/// A listener that ignores every tick.
pub struct NoOpListener;

impl TickListener for NoOpListener {
    fn on_tick(&mut self, _summary: &TickSummary) {}
}

/// Publish the CPU limits and make sure a game time exists.
///
/// Returns the game time the next tick will process.
pub async fn seed_environment<S: EnvironmentStore>(
    store: &S,
    engine: &EngineSection,
) -> Result<u64, DbError> {
    store
        .set(EnvKey::CpuMaxPerTick, engine.cpu_max_per_tick.to_string())
        .await?;
    store
        .set(EnvKey::CpuBucketSize, engine.cpu_bucket_size.to_string())
        .await?;
    match read_game_time(store).await? {
        Some(tick) => Ok(tick),
        None => {
            store.set(EnvKey::GameTime, "1".to_owned()).await?;
            Ok(1)
        }
    }
}

async fn read_game_time<S: EnvironmentStore>(store: &S) -> Result<Option<u64>, DbError> {
    let raw = store.get(EnvKey::GameTime).await?;
    Ok(raw.and_then(|value| match value.trim().parse::<u64>() {
        Ok(tick) => Some(tick),
        Err(_) => {
            warn!(value = %value, "Ignoring unparsable game time");
            None
        }
    }))
}

/// Whether an external tool paused the loop through the environment.
async fn paused_by_environment<S: EnvironmentStore>(store: &S) -> Result<bool, DbError> {
    let flag = store.get(EnvKey::MainLoopPaused).await?;
    Ok(matches!(flag.as_deref().map(str::trim), Some("1" | "true")))
}

/// Run ticks until the operator stops the loop or the tick limit is hit.
///
/// # Errors
///
/// Returns [`RunnerError`] when a tick's global pass fails or the
/// environment store is unreachable. Failing rooms do not end the loop.
pub async fn run_engine<S, H>(
    engine: &TickEngine<S, H>,
    operator: &Arc<OperatorState>,
    listener: &mut dyn TickListener,
) -> Result<EngineRunResult, RunnerError>
where
    S: WorldStore + 'static,
    H: HistoryStore + 'static,
{
    let store = engine.store();
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        max_ticks = operator.max_ticks(),
        tick_interval_ms = operator.tick_interval_ms(),
        "Engine starting"
    );

    let stop_reason = loop {
        let started = Instant::now();
        let tick = read_game_time(store.as_ref()).await?.unwrap_or(1);

        // --- Check pause ---
        if operator.is_paused() {
            info!(tick, "Engine paused, waiting for resume...");
            engine.events().publish(EngineEvent::Paused { tick });
            operator.wait_if_paused().await;
            info!(tick, "Engine resumed");
        }

        // --- Check stop request (before tick) ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            break EngineStopReason::OperatorStop;
        }

        if paused_by_environment(store.as_ref()).await? {
            tracing::debug!(tick, "Main loop paused by environment");
            sleep_remaining(started, operator.tick_interval_ms()).await;
            continue;
        }

        // --- Execute tick ---
        let summary = engine.run_tick(tick).await?;
        store
            .set(EnvKey::GameTime, tick.saturating_add(1).to_string())
            .await?;
        store
            .set(EnvKey::TickDuration, summary.duration_ms.to_string())
            .await?;
        operator.record_tick(tick);
        total_ticks = total_ticks.saturating_add(1);

        listener.on_tick(&summary);
        last_summary = Some(summary);

        // --- Check tick limit (after tick) ---
        if operator.tick_limit_reached(total_ticks) {
            info!(tick, max_ticks = operator.max_ticks(), "Tick limit reached");
            break EngineStopReason::MaxTicksReached;
        }

        sleep_remaining(started, operator.tick_interval_ms()).await;
    };

    operator.set_stop_reason(stop_reason).await;
    let flushed = engine.flush_history().await;
    if flushed > 0 {
        info!(chunks = flushed, "Flushed open history chunks");
    }
    Ok(EngineRunResult {
        stop_reason,
        final_summary: last_summary,
        total_ticks,
    })
}

/// Sleep out whatever is left of a tick that started at `started`.
async fn sleep_remaining(started: Instant, interval_ms: u64) {
    let remaining = Duration::from_millis(interval_ms).saturating_sub(started.elapsed());
    if !remaining.is_zero() {
        tokio::time::sleep(remaining).await;
    }
}

/// Log the end of a run.
pub fn log_engine_end(result: &EngineRunResult) {
    info!(
        reason = ?result.stop_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Engine stopped"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            rooms = summary.rooms.len(),
            failed_rooms = summary.failed_rooms.len(),
            writes = summary.total_writes(),
            "Final tick summary"
        );
    } else {
        warn!("Engine stopped with no ticks executed");
    }
}
