//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and the run so
//! `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: deskbound_core::ConfigError,
    },

    /// Building the simulation failed.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: deskbound_core::SimulationError,
    },

    /// The run loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: deskbound_core::RunnerError,
    },

    /// The scenario section could not be read.
    #[error("scenario error: {message}")]
    Scenario {
        /// Description of the failure.
        message: String,
    },
}
