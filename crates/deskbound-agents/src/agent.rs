//! Employee records and the roster that steps them.
//!
//! The [`AgentRoster`] owns every spawned [`Employee`] in spawn order and
//! steps their tasks in that order, so a run with the same inputs always
//! produces the same event sequence.

use std::collections::BTreeMap;

use deskbound_types::{AgentId, CoreEvent, TaskPhase, Tier};
use tracing::{info, warn};

use crate::error::AgentError;
use crate::pool::ResourcePool;
use crate::task::{AgentTask, TaskContext};
use crate::tier::TierProfile;

/// A hired employee.
#[derive(Debug, Clone)]
pub struct Employee {
    /// Identity.
    pub id: AgentId,
    /// Seniority, fixed at hire time.
    pub tier: Tier,
    /// Simulated time of the spawn.
    pub spawned_at_ms: u64,
    /// The employee's task state machine.
    pub task: AgentTask,
}

impl Employee {
    /// Coarse phase of the employee's task.
    pub const fn phase(&self) -> TaskPhase {
        self.task.state().phase()
    }
}

/// All employees, in spawn order.
#[derive(Debug, Default)]
pub struct AgentRoster {
    employees: Vec<Employee>,
    index: BTreeMap<AgentId, usize>,
}

impl AgentRoster {
    /// An empty roster.
    pub const fn new() -> Self {
        Self {
            employees: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    /// Add an employee of `tier` whose task starts waiting for the navmesh.
    pub fn spawn(&mut self, tier: Tier, profile: TierProfile, now_ms: u64) -> AgentId {
        let id = AgentId::new();
        self.index.insert(id, self.employees.len());
        self.employees.push(Employee {
            id,
            tier,
            spawned_at_ms: now_ms,
            task: AgentTask::new(id, profile),
        });
        info!(
            agent_id = %id,
            tier = %tier,
            work_interval_ms = profile.work_interval_ms,
            money_per_tick = profile.money_per_tick,
            "employee spawned"
        );
        id
    }

    /// Look up an employee.
    pub fn get(&self, agent: AgentId) -> Option<&Employee> {
        self.index.get(&agent).and_then(|i| self.employees.get(*i))
    }

    /// Interrupt one employee's task.
    pub fn interrupt(&mut self, agent: AgentId, pool: &ResourcePool) -> Result<CoreEvent, AgentError> {
        let employee = self
            .index
            .get(&agent)
            .and_then(|i| self.employees.get_mut(*i))
            .ok_or(AgentError::UnknownAgent { agent })?;
        Ok(employee.task.interrupt(pool))
    }

    /// Step every task once, in spawn order, appending their events to
    /// `events`.
    ///
    /// A failing task does not stop the others. The first failure is
    /// returned after everyone has been stepped.
    pub fn step_all(&mut self, ctx: &mut TaskContext<'_>, events: &mut Vec<CoreEvent>) -> Result<(), AgentError> {
        let mut first_error = None;
        for employee in &mut self.employees {
            if let Err(err) = employee.task.step(ctx, events) {
                warn!(agent_id = %employee.id, error = %err, "task step failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), |err| Err(err.into()))
    }

    /// Employees in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Employee> {
        self.employees.iter()
    }

    /// Number of employees.
    pub const fn len(&self) -> usize {
        self.employees.len()
    }

    /// Whether nobody has been hired.
    pub const fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }

    /// Number of employees currently in `phase`.
    pub fn count_in(&self, phase: TaskPhase) -> usize {
        self.employees.iter().filter(|e| e.phase() == phase).count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use deskbound_ledger::{Ledger, Wallet};
    use deskbound_types::{Footprint, FootprintSize, GridCell, ResourceId, WorldPoint};
    use deskbound_world::{GridTransform, OccupancyGrid};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::error::TaskError;
    use crate::navigation::Navigator;
    use crate::pool::ResourceRecord;
    use crate::task::TaskState;

    /// Every agent stands at the origin and arrives the moment it is sent.
    struct StandStill;

    impl Navigator for StandStill {
        fn is_on_navmesh(&self, _agent: AgentId) -> bool {
            true
        }
        fn is_path_pending(&self, _agent: AgentId) -> bool {
            false
        }
        fn remaining_distance(&self, _agent: AgentId) -> f64 {
            0.0
        }
        fn stopping_distance(&self, _agent: AgentId) -> f64 {
            0.1
        }
        fn set_destination(&mut self, _agent: AgentId, _point: WorldPoint) -> bool {
            true
        }
        fn position(&self, _agent: AgentId) -> Option<WorldPoint> {
            Some(WorldPoint::ORIGIN)
        }
    }

    fn table(pool: &ResourcePool, x: f64) {
        pool.register(ResourceRecord::new(
            ResourceId::new(),
            Footprint::new(GridCell::new(0, 0), FootprintSize::new(1, 1)),
            WorldPoint::new(x, 0.0),
            Vec::new(),
        ))
        .unwrap();
    }

    #[test]
    fn spawn_keeps_order_and_lookup() {
        let mut roster = AgentRoster::new();
        let a = roster.spawn(Tier::Intern, TierProfile::new(4000, 5), 0);
        let b = roster.spawn(Tier::Senior, TierProfile::new(1000, 60), 100);
        let order: Vec<_> = roster.iter().map(|e| e.id).collect();
        assert_eq!(order, vec![a, b]);
        assert_eq!(roster.get(b).map(|e| e.tier), Some(Tier::Senior));
        assert_eq!(roster.count_in(TaskPhase::AwaitingNavmesh), 2);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn interrupting_unknown_agent_is_an_error() {
        let mut roster = AgentRoster::new();
        let pool = ResourcePool::new();
        assert!(matches!(
            roster.interrupt(AgentId::new(), &pool),
            Err(AgentError::UnknownAgent { .. })
        ));
    }

    #[test]
    fn interrupt_while_awaiting_navmesh_keeps_waiting() {
        let mut roster = AgentRoster::new();
        let pool = ResourcePool::new();
        pool.register(ResourceRecord::new(
            ResourceId::new(),
            Footprint::new(GridCell::new(0, 0), FootprintSize::new(1, 1)),
            WorldPoint::ORIGIN,
            Vec::new(),
        ))
        .unwrap();
        let a = roster.spawn(Tier::Mid, TierProfile::new(2000, 30), 0);
        let event = roster.interrupt(a, &pool).unwrap();
        assert!(matches!(event, CoreEvent::Interrupted { resource: None, .. }));
        assert_eq!(roster.get(a).map(|e| e.task.state()), Some(TaskState::AwaitingNavmesh));
    }

    #[test]
    fn failed_payout_does_not_stop_later_employees() {
        let mut roster = AgentRoster::new();
        let pool = ResourcePool::new();
        table(&pool, 1.0);
        table(&pool, 2.0);
        let grid = OccupancyGrid::new(10, 10, GridTransform::axis_aligned(1.0).unwrap()).unwrap();
        let wallet = Wallet::new(u64::MAX.saturating_sub(10));
        let mut rng = StdRng::seed_from_u64(3);
        let mut nav = StandStill;
        let senior = roster.spawn(Tier::Senior, TierProfile::new(1000, 60), 0);
        let intern = roster.spawn(Tier::Intern, TierProfile::new(4000, 5), 0);

        let mut step = |now_ms: u64, events: &mut Vec<CoreEvent>| {
            let mut ctx = TaskContext {
                now_ms,
                retry_interval_ms: 1000,
                pool: &pool,
                grid: &grid,
                navigator: &mut nav,
                ledger: &wallet,
                rng: &mut rng,
            };
            roster.step_all(&mut ctx, events)
        };

        let mut events = Vec::new();
        step(0, &mut events).unwrap();
        assert_eq!(
            events.iter().filter(|e| e.kind() == "started_working").count(),
            2
        );

        // The senior's payout overflows; the intern after it still gets paid.
        let mut events = Vec::new();
        let result = step(4000, &mut events);
        assert!(matches!(
            result,
            Err(AgentError::Task(TaskError::Payout { agent, .. })) if agent == senior
        ));
        assert!(events.iter().any(|e| matches!(
            e,
            CoreEvent::WorkTick { agent, amount: 5, .. } if *agent == intern
        )));
        assert_eq!(wallet.balance(), u64::MAX.saturating_sub(5));
        assert!(wallet.add_money(10).is_err());
    }
}
