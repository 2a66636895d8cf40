//! Real-time run loop with operator controls.
//!
//! [`run_simulation`] drives [`Simulation::step`] at the operator's pacing
//! interval until a boundary is hit:
//!
//! - **Bounded runs**: stop after `max_ticks` steps or `max_real_time_seconds`
//! - **Pause/resume**: the loop sleeps until the operator resumes
//! - **Variable pacing**: the interval is re-read before every sleep
//! - **Queued commands**: applied right before the step that follows them
//! - **Operator stop**: clean stop between two steps

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::operator::{OperatorState, SimulationEndReason};
use crate::simulation::{Simulation, SimulationError, StepSummary};

/// Errors that end a run early.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A step failed.
    #[error("step failed: {source}")]
    Step {
        /// The underlying simulation error.
        #[from]
        source: SimulationError,
    },
}

/// Outcome of a run.
#[derive(Debug)]
pub struct RunResult {
    /// Why the run ended.
    pub end_reason: SimulationEndReason,
    /// The last step summary, if any step ran.
    pub final_summary: Option<StepSummary>,
    /// Number of steps executed by this run.
    pub total_ticks: u64,
    /// Wallet balance at the end.
    pub final_balance: u64,
}

/// Observer invoked after every step.
pub trait StepCallback: Send {
    /// Called with each completed step and the simulation after it.
    fn on_step(&mut self, summary: &StepSummary, sim: &Simulation);
}

/// A callback that ignores every step.
pub struct NoOpCallback;

impl StepCallback for NoOpCallback {
    fn on_step(&mut self, _summary: &StepSummary, _sim: &Simulation) {}
}

/// Run the simulation until a boundary or an operator stop.
///
/// # Errors
///
/// Returns [`RunnerError`] if a step fails. Failed operator commands are
/// logged and do not end the run.
pub async fn run_simulation(
    sim: &mut Simulation,
    operator: &Arc<OperatorState>,
    callback: &mut dyn StepCallback,
) -> Result<RunResult, RunnerError> {
    let mut last_summary: Option<StepSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        tick_interval_ms = operator.tick_interval_ms(),
        "run starting"
    );

    let end_reason = loop {
        if operator.is_paused() {
            info!("run paused, waiting for resume");
            operator.wait_if_paused().await;
            info!("run resumed");
        }

        if operator.is_stop_requested() {
            info!("operator stop requested");
            break SimulationEndReason::OperatorStop;
        }

        if operator.time_limit_reached() {
            info!(
                max_seconds = operator.max_real_time_seconds(),
                elapsed = operator.elapsed_seconds(),
                "real-time limit reached"
            );
            break SimulationEndReason::MaxRealTimeReached;
        }

        for command in operator.drain_commands().await {
            command.apply(sim);
        }

        let summary = sim.step()?;
        total_ticks = total_ticks.saturating_add(1);
        callback.on_step(&summary, sim);

        let limit_hit = operator.tick_limit_reached(summary.tick);
        let tick = summary.tick;
        last_summary = Some(summary);
        if limit_hit {
            info!(tick, max_ticks = operator.max_ticks(), "tick limit reached");
            break SimulationEndReason::MaxTicksReached;
        }

        let interval_ms = operator.tick_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        } else {
            tokio::task::yield_now().await;
        }
    };

    operator.set_end_reason(end_reason.clone()).await;
    Ok(RunResult {
        end_reason,
        final_summary: last_summary,
        total_ticks,
        final_balance: sim.balance(),
    })
}

/// Log the end of a run.
pub fn log_simulation_end(result: &RunResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_balance = result.final_balance,
        "run ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            simulated_ms = summary.now_ms,
            employees = summary.employees,
            working = summary.working,
            free_resources = summary.free_resources,
            "final step summary"
        );
    } else {
        warn!("run ended with no steps executed");
    }
}
