//! The navigation contract.
//!
//! Path-finding lives outside the simulation core. The core only asks a
//! [`Navigator`] where an agent is, whether it stands on the navmesh, and
//! how far it still has to go; and it hands out destinations.

use deskbound_types::{AgentId, WorldPoint};

/// Travel oracle for mobile agents.
pub trait Navigator {
    /// Whether the agent has been placed on the navmesh. No destination is
    /// issued before this is true.
    fn is_on_navmesh(&self, agent: AgentId) -> bool;

    /// Whether a path request for the agent is still being computed.
    fn is_path_pending(&self, agent: AgentId) -> bool;

    /// Distance left along the current path.
    fn remaining_distance(&self, agent: AgentId) -> f64;

    /// Distance at which the agent counts as arrived.
    fn stopping_distance(&self, agent: AgentId) -> f64;

    /// Start moving the agent towards `point`. Returns `false` if the agent
    /// is unknown to the navigator.
    fn set_destination(&mut self, agent: AgentId, point: WorldPoint) -> bool;

    /// Current world position of the agent.
    fn position(&self, agent: AgentId) -> Option<WorldPoint>;
}

/// Arrival test: on the navmesh, no path pending, within stopping distance.
pub fn has_arrived(navigator: &dyn Navigator, agent: AgentId) -> bool {
    navigator.is_on_navmesh(agent)
        && !navigator.is_path_pending(agent)
        && navigator.remaining_distance(agent) <= navigator.stopping_distance(agent)
}
