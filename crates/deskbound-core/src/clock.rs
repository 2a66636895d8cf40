//! Simulated time for the office.
//!
//! The clock is the single source of truth for time inside the core. Every
//! scheduler step advances it by a fixed number of simulated milliseconds;
//! work intervals, seek retries and navigation all read from it. Wall-clock
//! time never enters the simulation.

use crate::config::TimeConfig;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter or simulated time would overflow.
    #[error("clock overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Invalid time configuration.
    #[error("invalid time configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Fixed-step simulated clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimClock {
    /// Number of completed steps.
    tick: u64,
    /// Simulated milliseconds since start.
    now_ms: u64,
    /// Milliseconds added per step.
    tick_ms: u64,
}

impl SimClock {
    /// A clock at time zero.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `tick_ms` is zero.
    pub fn new(config: &TimeConfig) -> Result<Self, ClockError> {
        Self::from_parts(0, 0, config.tick_ms)
    }

    /// A clock at an explicit point in time.
    pub fn from_parts(tick: u64, now_ms: u64, tick_ms: u64) -> Result<Self, ClockError> {
        if tick_ms == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "tick_ms must be at least 1".to_owned(),
            });
        }
        Ok(Self { tick, now_ms, tick_ms })
    }

    /// Advance by one step. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if either counter would wrap.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        let tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        let now_ms = self.now_ms.checked_add(self.tick_ms).ok_or(ClockError::TickOverflow)?;
        self.tick = tick;
        self.now_ms = now_ms;
        Ok(tick)
    }

    /// Current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated milliseconds since start.
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Step length in milliseconds.
    pub const fn tick_ms(&self) -> u64 {
        self.tick_ms
    }
}
