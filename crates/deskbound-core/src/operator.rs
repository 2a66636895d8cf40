//! Operator control state for a running office.
//!
//! [`OperatorState`] is shared between the run loop and whoever drives it
//! from outside (a scripted scenario, a debug console, a test). The
//! operator can pause and resume, change the real-time pacing, queue
//! player commands for the next step and request a clean stop, all
//! without touching the [`Simulation`] directly.
//!
//! Flags and the pacing interval are atomics so the loop reads them
//! without locking. Only the command queue and the end reason sit behind
//! a [`tokio::sync::Mutex`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use deskbound_types::{GridCell, ResourceId, Tier};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tracing::{info, warn};

use crate::config::SimulationBoundsConfig;
use crate::simulation::Simulation;

/// Longest accepted pacing interval.
pub const MAX_TICK_INTERVAL_MS: u64 = 60_000;

/// Reason why the run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// Reached the configured `max_real_time_seconds` limit.
    MaxRealTimeReached,
    /// An operator issued a stop command.
    OperatorStop,
}

/// A player command queued by the operator and applied before the next
/// step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OperatorCommand {
    /// Buy a placeable shop item and commit it at a cell.
    Place {
        /// Shop item name.
        item: String,
        /// Anchor cell.
        cell: GridCell,
        /// Quarter turns applied before placing.
        #[serde(default)]
        quarter_turns: u8,
    },
    /// Hire an employee.
    Hire {
        /// Tier to hire.
        tier: Tier,
    },
    /// Tear a placed resource down.
    Demolish {
        /// Resource to remove.
        resource: ResourceId,
    },
}

impl OperatorCommand {
    /// Apply the command. Failures are logged and skipped; a command the
    /// office cannot honour (no money, blocked cells) never ends the run.
    ///
    /// Returns whether the command succeeded.
    pub fn apply(&self, sim: &mut Simulation) -> bool {
        let outcome = match self {
            Self::Place {
                item,
                cell,
                quarter_turns,
            } => sim.buy_and_place(item, *cell, *quarter_turns).map(drop),
            Self::Hire { tier } => sim.hire(*tier).map(drop),
            Self::Demolish { resource } => sim.demolish(*resource),
        };
        match outcome {
            Ok(()) => {
                info!(command = ?self, "operator command applied");
                true
            }
            Err(err) => {
                warn!(command = ?self, error = %err, "operator command failed");
                false
            }
        }
    }
}

/// Shared operator control state.
///
/// Wrapped in [`Arc`](std::sync::Arc) and shared between the run loop and
/// its drivers.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether the run is currently paused.
    paused: AtomicBool,

    /// Notification used to wake the loop when resumed.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Real-time milliseconds between steps (runtime-adjustable).
    tick_interval_ms: AtomicU64,

    /// Wall-clock time when the run started.
    started_at: DateTime<Utc>,

    /// Maximum number of steps (0 = unlimited).
    max_ticks: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    max_real_time_seconds: u64,

    /// Commands awaiting the next step.
    commands: Mutex<Vec<OperatorCommand>>,

    /// Reason the run ended, if it has.
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl OperatorState {
    /// Create operator state from the run boundaries.
    pub fn new(bounds: &SimulationBoundsConfig) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(bounds.tick_interval_ms),
            started_at: Utc::now(),
            max_ticks: bounds.max_ticks,
            max_real_time_seconds: bounds.max_real_time_seconds,
            commands: Mutex::new(Vec::new()),
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Whether the run is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the run. The loop sleeps until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume the run and wake the loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until the run is no longer paused. Returns at once if it is
    /// not paused; a stop request also wakes the waiter.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() {
            self.resume_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record the reason the run ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// The reason the run ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        self.end_reason.lock().await.clone()
    }

    // -----------------------------------------------------------------------
    // Pacing
    // -----------------------------------------------------------------------

    /// Current pacing interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Change the pacing interval. Zero runs steps back to back.
    ///
    /// Returns the previous interval, or `None` if `ms` exceeds
    /// [`MAX_TICK_INTERVAL_MS`].
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms > MAX_TICK_INTERVAL_MS {
            return None;
        }
        Some(self.tick_interval_ms.swap(ms, Ordering::AcqRel))
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Whether `max_ticks > 0` and `current_tick >= max_ticks`.
    pub const fn tick_limit_reached(&self, current_tick: u64) -> bool {
        self.max_ticks > 0 && current_tick >= self.max_ticks
    }

    /// Whether `max_real_time_seconds > 0` and that many wall-clock seconds
    /// have passed since start.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wall-clock seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now().signed_duration_since(self.started_at).num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Configured max steps.
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Configured max wall-clock seconds.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Queue a command for the next step.
    pub async fn queue_command(&self, command: OperatorCommand) {
        self.commands.lock().await.push(command);
    }

    /// Queue a command from synchronous code, such as a step callback.
    ///
    /// Hands the command back if the queue is locked at the moment.
    pub fn try_queue_command(&self, command: OperatorCommand) -> Result<(), OperatorCommand> {
        match self.commands.try_lock() {
            Ok(mut queue) => {
                queue.push(command);
                Ok(())
            }
            Err(_contended) => Err(command),
        }
    }

    /// Take every queued command, oldest first.
    pub async fn drain_commands(&self) -> Vec<OperatorCommand> {
        std::mem::take(&mut *self.commands.lock().await)
    }

    /// Snapshot of the run for status reporting.
    pub async fn status(&self, sim: &Simulation) -> SimulationStatus {
        SimulationStatus {
            tick: sim.clock().tick(),
            simulated_ms: sim.clock().now_ms(),
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            tick_interval_ms: self.tick_interval_ms(),
            elapsed_seconds: self.elapsed_seconds(),
            max_ticks: self.max_ticks,
            max_real_time_seconds: self.max_real_time_seconds,
            employees: sim.roster().len(),
            resources: sim.pool().len(),
            balance: sim.balance(),
            end_reason: self.end_reason().await,
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

/// JSON-serializable status of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationStatus {
    /// Current tick number.
    pub tick: u64,
    /// Simulated milliseconds since start.
    pub simulated_ms: u64,
    /// Whether the run is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Current pacing interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Configured max steps (0 = unlimited).
    pub max_ticks: u64,
    /// Configured max wall-clock seconds (0 = unlimited).
    pub max_real_time_seconds: u64,
    /// Hired employees.
    pub employees: usize,
    /// Registered resources.
    pub resources: usize,
    /// Wallet balance.
    pub balance: u64,
    /// Why the run ended, if it has.
    pub end_reason: Option<SimulationEndReason>,
    /// RFC 3339 timestamp of the start.
    pub started_at: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::config::SimulationConfig;

    fn bounds(max_ticks: u64) -> SimulationBoundsConfig {
        SimulationBoundsConfig {
            max_ticks,
            max_real_time_seconds: 0,
            tick_interval_ms: 1000,
        }
    }

    #[test]
    fn initial_state_is_running() {
        let state = OperatorState::new(&bounds(0));
        assert!(!state.is_paused());
        assert!(!state.is_stop_requested());
        assert_eq!(state.tick_interval_ms(), 1000);
    }

    #[test]
    fn pause_and_resume() {
        let state = OperatorState::new(&bounds(0));
        state.pause();
        assert!(state.is_paused());
        state.resume();
        assert!(!state.is_paused());
    }

    #[test]
    fn set_tick_interval() {
        let state = OperatorState::new(&bounds(0));
        assert_eq!(state.set_tick_interval_ms(0), Some(1000));
        assert_eq!(state.tick_interval_ms(), 0);
        assert!(state.set_tick_interval_ms(MAX_TICK_INTERVAL_MS + 1).is_none());
        assert_eq!(state.tick_interval_ms(), 0);
    }

    #[test]
    fn tick_limits() {
        let unlimited = OperatorState::new(&bounds(0));
        assert!(!unlimited.tick_limit_reached(999_999));
        assert!(!unlimited.time_limit_reached());

        let limited = OperatorState::new(&bounds(100));
        assert!(!limited.tick_limit_reached(99));
        assert!(limited.tick_limit_reached(100));
    }

    #[tokio::test]
    async fn queue_and_drain_commands() {
        let state = OperatorState::new(&bounds(0));
        state.queue_command(OperatorCommand::Hire { tier: Tier::Junior }).await;
        state
            .queue_command(OperatorCommand::Place {
                item: String::from("table"),
                cell: GridCell::new(1, 1),
                quarter_turns: 0,
            })
            .await;
        assert!(state.try_queue_command(OperatorCommand::Hire { tier: Tier::Mid }).is_ok());
        let commands = state.drain_commands().await;
        assert_eq!(commands.len(), 3);
        assert!(state.drain_commands().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn resume_wakes_waiter() {
        let state = Arc::new(OperatorState::new(&bounds(0)));
        state.pause();
        let waiter = tokio::spawn({
            let state = Arc::clone(&state);
            async move { state.wait_if_paused().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        state.resume();
        waiter.await.unwrap();
    }

    #[test]
    fn commands_apply_to_simulation() {
        let mut config = SimulationConfig::default();
        config.economy.starting_money = 200;
        let mut sim = Simulation::new(&config).unwrap();

        assert!(OperatorCommand::Hire { tier: Tier::Intern }.apply(&mut sim));
        assert!(
            OperatorCommand::Place {
                item: String::from("table"),
                cell: GridCell::new(0, 0),
                quarter_turns: 0,
            }
            .apply(&mut sim)
        );
        assert!(
            !OperatorCommand::Place {
                item: String::from("table"),
                cell: GridCell::new(0, 0),
                quarter_turns: 0,
            }
            .apply(&mut sim)
        );
        assert!(
            !OperatorCommand::Demolish {
                resource: ResourceId::new()
            }
            .apply(&mut sim)
        );
        assert_eq!(sim.roster().len(), 1);
        assert_eq!(sim.pool().len(), 1);
        assert_eq!(sim.balance(), 200);
    }

    #[tokio::test]
    async fn status_reports_run_and_office_counts() {
        let mut config = SimulationConfig::default();
        config.economy.starting_money = 200;
        let mut sim = Simulation::new(&config).unwrap();
        let state = OperatorState::new(&bounds(50));
        assert!(OperatorCommand::Hire { tier: Tier::Intern }.apply(&mut sim));
        assert!(OperatorCommand::Hire { tier: Tier::Intern }.apply(&mut sim));
        assert!(
            OperatorCommand::Place {
                item: String::from("table"),
                cell: GridCell::new(0, 0),
                quarter_turns: 0,
            }
            .apply(&mut sim)
        );
        sim.step().unwrap();
        sim.step().unwrap();
        state.pause();
        state.set_end_reason(SimulationEndReason::OperatorStop).await;

        let status = state.status(&sim).await;
        assert_eq!(status.tick, 2);
        assert_eq!(status.simulated_ms, sim.clock().now_ms());
        assert_eq!(status.employees, 2);
        assert_eq!(status.resources, 1);
        assert_eq!(status.balance, sim.balance());
        assert_eq!(status.max_ticks, 50);
        assert!(status.paused);
        assert!(!status.stop_requested);
        assert_eq!(status.end_reason, Some(SimulationEndReason::OperatorStop));
    }

    #[test]
    fn command_yaml_shape() {
        let command: OperatorCommand =
            serde_yml::from_str("action: place\nitem: table\ncell: { x: 2, y: 3 }\n").unwrap();
        assert_eq!(
            command,
            OperatorCommand::Place {
                item: String::from("table"),
                cell: GridCell::new(2, 3),
                quarter_turns: 0,
            }
        );
    }
}
