//! Headless engine for the Deskbound office simulation.
//!
//! Loads configuration, builds the office, plays the scripted scenario and
//! runs the paced loop until a limit is reached or the process receives
//! Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `DESKBOUND_CONFIG` (default `deskbound-config.yaml`)
//! 3. Build the simulation
//! 4. Create operator state from the run boundaries
//! 5. Apply scenario steps due before the first tick
//! 6. Run the loop, logging every event
//! 7. Log the result and the wallet totals

mod error;
mod event_log;
mod scenario;

use std::path::PathBuf;
use std::sync::Arc;

use deskbound_core::{OperatorState, Simulation, SimulationConfig, log_simulation_end, run_simulation};
use deskbound_ledger::EntryKind;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::event_log::EventLogCallback;
use crate::scenario::ScenarioConfig;

/// Environment variable naming the config file.
const CONFIG_ENV: &str = "DESKBOUND_CONFIG";

/// Config file used when [`CONFIG_ENV`] is unset.
const DEFAULT_CONFIG_PATH: &str = "deskbound-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, simulation setup or the run fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("deskbound-engine starting");

    // 2. Load configuration.
    let config_path = config_path();
    let config = load_config(&config_path)?;
    let mut scenario = ScenarioConfig::load(&config_path)?;
    info!(
        path = %config_path.display(),
        grid_width = config.grid.width,
        grid_height = config.grid.height,
        tick_ms = config.time.tick_ms,
        scenario_steps = scenario.steps.len(),
        "configuration loaded"
    );

    // 3. Build the simulation.
    let mut sim = Simulation::new(&config).map_err(EngineError::from)?;

    // 4. Create operator state.
    let operator = Arc::new(OperatorState::new(&config.simulation));
    if operator.max_ticks() == 0 && operator.max_real_time_seconds() == 0 {
        warn!("no tick or time limit configured, running until Ctrl-C");
    }
    tokio::spawn({
        let operator = Arc::clone(&operator);
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, stopping");
                operator.request_stop();
            }
        }
    });

    // 5. Apply scenario steps due before the first tick.
    for command in scenario.take_due(0) {
        command.apply(&mut sim);
    }

    // 6. Run.
    let mut callback = EventLogCallback::new(Arc::clone(&operator), scenario);
    for event in sim.drain_events() {
        callback.log_event(0, &event);
    }
    let result = run_simulation(&mut sim, &operator, &mut callback)
        .await
        .map_err(EngineError::from)?;

    // 7. Log results.
    log_simulation_end(&result);
    let status = operator.status(&sim).await;
    let wallet = sim.wallet();
    info!(
        tick = status.tick,
        simulated_ms = status.simulated_ms,
        elapsed_seconds = status.elapsed_seconds,
        end_reason = ?status.end_reason,
        balance = status.balance,
        earned = wallet.total(EntryKind::Earn),
        spent = wallet.total(EntryKind::Spend),
        refunded = wallet.total(EntryKind::Refund),
        employees = status.employees,
        resources = status.resources,
        events_logged = callback.events_logged(),
        "deskbound-engine shutdown complete"
    );
    info!(
        status = %serde_json::to_string(&status).unwrap_or_default(),
        "final status"
    );

    Ok(())
}

/// Config path from the environment, or the default next to the binary's
/// working directory.
fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load the configuration, falling back to defaults when the file is absent.
fn load_config(path: &std::path::Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        info!(path = %path.display(), "config file not found, using defaults");
        Ok(SimulationConfig::default())
    }
}
