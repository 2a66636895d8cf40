//! Straight-line reference navigator.
//!
//! [`KinematicNavigator`] satisfies the [`Navigator`] contract without any
//! pathfinding: agents walk in a straight line at a fixed speed. A new
//! destination leaves the path pending until the next [`advance`], and a
//! freshly spawned agent only joins the navmesh after a configured number
//! of advances. Both delays exist so tasks exercise their waiting states.
//!
//! [`advance`]: KinematicNavigator::advance

use std::collections::BTreeMap;

use deskbound_agents::Navigator;
use deskbound_types::{AgentId, WorldPoint};
use tracing::debug;

use crate::config::NavigationConfig;

const MS_PER_SECOND: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Walker {
    position: WorldPoint,
    destination: Option<WorldPoint>,
    path_pending: bool,
    steps_until_ready: u32,
}

/// Deterministic navigator moving agents in straight lines.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicNavigator {
    speed: f64,
    stopping_distance: f64,
    ready_after: u32,
    walkers: BTreeMap<AgentId, Walker>,
}

impl KinematicNavigator {
    /// A navigator with no agents.
    pub const fn new(config: &NavigationConfig) -> Self {
        Self {
            speed: config.agent_speed,
            stopping_distance: config.stopping_distance,
            ready_after: config.navmesh_ready_ticks,
            walkers: BTreeMap::new(),
        }
    }

    /// Put an agent into the world at `at`.
    pub fn spawn(&mut self, agent: AgentId, at: WorldPoint) {
        self.walkers.insert(
            agent,
            Walker {
                position: at,
                destination: None,
                path_pending: false,
                steps_until_ready: self.ready_after,
            },
        );
    }

    /// Number of agents the navigator tracks.
    pub fn len(&self) -> usize {
        self.walkers.len()
    }

    /// Whether no agents are tracked.
    pub fn is_empty(&self) -> bool {
        self.walkers.is_empty()
    }

    /// Move every agent forward by `dt_ms` simulated milliseconds.
    ///
    /// Agents still joining the navmesh count down; pending paths resolve
    /// without moving; everyone else walks toward their destination and
    /// stops exactly on it.
    pub fn advance(&mut self, dt_ms: u64) {
        let seconds = u32::try_from(dt_ms).map_or(f64::from(u32::MAX), f64::from) / MS_PER_SECOND;
        let reach = self.speed * seconds;
        for (agent, walker) in &mut self.walkers {
            if walker.steps_until_ready > 0 {
                walker.steps_until_ready = walker.steps_until_ready.saturating_sub(1);
                if walker.steps_until_ready == 0 {
                    debug!(agent_id = %agent, "agent joined navmesh");
                }
                continue;
            }
            if walker.path_pending {
                walker.path_pending = false;
                continue;
            }
            let Some(destination) = walker.destination else {
                continue;
            };
            let to_go = destination.minus(walker.position);
            let distance = to_go.length();
            walker.position = if distance <= reach {
                destination
            } else {
                walker.position.plus(to_go.scaled(reach / distance))
            };
        }
    }
}

impl Navigator for KinematicNavigator {
    fn is_on_navmesh(&self, agent: AgentId) -> bool {
        self.walkers.get(&agent).is_some_and(|w| w.steps_until_ready == 0)
    }

    fn is_path_pending(&self, agent: AgentId) -> bool {
        self.walkers.get(&agent).is_some_and(|w| w.path_pending)
    }

    fn remaining_distance(&self, agent: AgentId) -> f64 {
        self.walkers
            .get(&agent)
            .and_then(|w| w.destination.map(|dest| w.position.distance(dest)))
            .unwrap_or(0.0)
    }

    fn stopping_distance(&self, _agent: AgentId) -> f64 {
        self.stopping_distance
    }

    fn set_destination(&mut self, agent: AgentId, point: WorldPoint) -> bool {
        let Some(walker) = self.walkers.get_mut(&agent) else {
            return false;
        };
        walker.destination = Some(point);
        walker.path_pending = true;
        true
    }

    fn position(&self, agent: AgentId) -> Option<WorldPoint> {
        self.walkers.get(&agent).map(|w| w.position)
    }
}
