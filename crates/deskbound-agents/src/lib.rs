//! Resource assignment and employee tasks for the Deskbound simulation.
//!
//! This crate matches mobile employees to scarce, mutually exclusive
//! resources (tables) and drives each employee through its
//! seek/travel/work cycle. It performs no I/O; travel is delegated to a
//! [`Navigator`] and payouts to a [`Ledger`](deskbound_ledger::Ledger).
//!
//! # Modules
//!
//! - [`agent`] -- [`Employee`] records and the [`AgentRoster`].
//! - [`error`] -- Error types ([`PoolError`], [`TaskError`], [`AgentError`]).
//! - [`navigation`] -- The [`Navigator`] travel contract.
//! - [`pool`] -- [`ResourcePool`]: registry, free set, nearest claim.
//! - [`task`] -- [`AgentTask`], the per-employee state machine.
//! - [`tier`] -- Work interval and payout per tier ([`TierTable`]).

pub mod agent;
pub mod error;
pub mod navigation;
pub mod pool;
pub mod task;
pub mod tier;

pub use agent::{AgentRoster, Employee};
pub use error::{AgentError, PoolError, TaskError};
pub use navigation::{Navigator, has_arrived};
pub use pool::{Claim, ResourcePool, ResourceRecord};
pub use task::{AgentTask, TaskContext, TaskState, WORK_STYLE_COUNT};
pub use tier::{TierProfile, TierTable};
