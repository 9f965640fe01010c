//! Tick engine binary for Hive.
//!
//! Loads configuration, connects the configured storage, and runs the
//! driving loop until the tick limit is reached or the process is
//! interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `hive-config.yaml` (or the path given as
//!    the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Connect storage: in-memory, or Dragonfly plus `PostgreSQL` history
//! 4. Publish CPU limits and the starting game time
//! 5. Run the driving loop; Ctrl-C requests a clean stop
//! 6. Log the result

mod error;
mod listener;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hive_core::config::{EngineConfig, LogFormat, StorageBackend};
use hive_core::{
    EventBus, OperatorState, TickEngine, TickEngineOptions, log_engine_end, run_engine,
    seed_environment,
};
use hive_db::{
    DragonflyStore, HistoryStore, MemoryStore, PostgresConfig, PostgresHistoryStore,
    PostgresPool, WorldStore,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::listener::StatsListener;

/// Default configuration path, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "hive-config.yaml";

/// Application entry point for the tick engine.
///
/// # Errors
///
/// Returns an error if configuration, storage or the driving loop fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, found) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config);
    info!("hive-engine starting");
    if found {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        storage = ?config.infrastructure.storage,
        tick_interval_ms = config.engine.tick_interval_ms,
        max_ticks = config.engine.max_ticks,
        room_concurrency = config.engine.room_concurrency,
        "Engine configuration"
    );

    // 3. Connect storage and run.
    match config.infrastructure.storage {
        StorageBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            let history = Arc::clone(&store);
            drive(&config, store, history).await?;
        }
        StorageBackend::Dragonfly => {
            let store = Arc::new(DragonflyStore::connect(&config.infrastructure.dragonfly_url).await?);
            info!("Dragonfly document store connected");

            let pool = PostgresPool::connect(&PostgresConfig::new(&config.infrastructure.postgres_url))
                .await?;
            pool.run_migrations().await?;
            let history = Arc::new(PostgresHistoryStore::new(pool.pool().clone()));
            drive(&config, store, history).await?;
        }
    }

    info!("hive-engine shutdown complete");
    Ok(())
}

/// Run the driving loop over one storage combination.
async fn drive<S, H>(config: &EngineConfig, store: Arc<S>, history: Arc<H>) -> Result<(), EngineError>
where
    S: WorldStore + 'static,
    H: HistoryStore + 'static,
{
    // 4. Publish CPU limits and the starting game time.
    let next_tick = seed_environment(store.as_ref(), &config.engine).await?;
    info!(next_tick, "Environment seeded");

    let engine = TickEngine::new(
        store,
        Some(history),
        TickEngineOptions::from(config),
        EventBus::default(),
    );
    let operator = Arc::new(OperatorState::new(
        config.engine.tick_interval_ms,
        config.engine.max_ticks,
    ));

    // 5. Ctrl-C requests a stop after the current tick.
    {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, stopping after the current tick");
                    operator.request_stop();
                }
                Err(e) => warn!(error = %e, "Failed to listen for interrupt"),
            }
        });
    }

    let mut listener = StatsListener::new();
    let result = run_engine(&engine, &operator, &mut listener).await?;

    // 6. Log results.
    log_engine_end(&result);
    listener.log_totals();
    Ok(())
}

/// Load the engine configuration, falling back to defaults when the file
/// does not exist. The flag reports whether the file was found.
fn load_config(path: &Path) -> Result<(EngineConfig, bool), EngineError> {
    if path.exists() {
        Ok((EngineConfig::from_file(path)?, true))
    } else {
        Ok((EngineConfig::parse("")?, false))
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}
