//! Configuration, simulated time and orchestration for the Deskbound office.
//!
//! This crate wires the grid, placement, ledger and agent crates into one
//! [`Simulation`] with an explicit per-tick scheduler, and wraps it in an
//! async run loop with operator controls.
//!
//! # Modules
//!
//! - [`clock`] -- Fixed-step simulated clock.
//! - [`config`] -- Configuration loading from `deskbound-config.yaml` into
//!   strongly-typed structs.
//! - [`navigator`] -- [`KinematicNavigator`], a straight-line navigator.
//! - [`operator`] -- Shared pause/resume/stop state and queued commands.
//! - [`runner`] -- [`run_simulation`], the paced run loop.
//! - [`simulation`] -- [`Simulation`], player commands and the scheduler.
//!
//! [`KinematicNavigator`]: navigator::KinematicNavigator
//! [`run_simulation`]: runner::run_simulation
//! [`Simulation`]: simulation::Simulation

pub mod clock;
pub mod config;
pub mod navigator;
pub mod operator;
pub mod runner;
pub mod simulation;

pub use clock::{ClockError, SimClock};
pub use config::{ConfigError, SimulationConfig};
pub use navigator::KinematicNavigator;
pub use operator::{OperatorCommand, OperatorState, SimulationEndReason, SimulationStatus};
pub use runner::{NoOpCallback, RunResult, RunnerError, StepCallback, log_simulation_end, run_simulation};
pub use simulation::{PlacementResult, Simulation, SimulationError, StepSummary};
