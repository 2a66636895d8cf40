//! Error types for the `deskbound-agents` crate.
//!
//! Resource starvation and resource loss are normal task transitions, not
//! errors. What remains is misuse (unknown ids, double registration) and a
//! ledger that refuses a payout.

use deskbound_ledger::LedgerError;
use deskbound_types::{AgentId, ResourceId};

/// Errors raised by [`ResourcePool`](crate::ResourcePool) operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// No resource with this id is registered.
    #[error("resource not registered: {resource}")]
    UnknownResource {
        /// The requested resource.
        resource: ResourceId,
    },

    /// A resource with this id is already registered.
    #[error("resource already registered: {resource}")]
    DuplicateResource {
        /// The repeated resource.
        resource: ResourceId,
    },
}

/// Errors raised while stepping an agent's task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The ledger rejected a work payout.
    #[error("payout for agent {agent} failed: {source}")]
    Payout {
        /// The working agent.
        agent: AgentId,
        /// The ledger's refusal.
        #[source]
        source: LedgerError,
    },
}

/// Errors raised by roster operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// No agent with this id is on the roster.
    #[error("agent not found: {agent}")]
    UnknownAgent {
        /// The requested agent.
        agent: AgentId,
    },

    /// A task step failed.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// A pool operation failed.
    #[error(transparent)]
    Pool(#[from] PoolError),
}
