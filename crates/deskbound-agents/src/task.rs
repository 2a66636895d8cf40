//! The per-employee task state machine.
//!
//! ```text
//! AwaitingNavmesh ──► Seeking ──► Traveling ──► Working ─┐
//!                      ▲  │ (retry)                 ▲    │ tick
//!                      │  └──────┘                  └────┘
//!                      └──────── interrupt (any state)
//! ```
//!
//! Every suspension is an explicit state carrying its resume condition:
//! a retry deadline, an arrival predicate, or the next payout deadline.
//! [`AgentTask::step`] is called once per scheduler step and advances as
//! far as the conditions allow. [`AgentTask::interrupt`] drops whatever the
//! task was waiting for, so no payout can fire after a hand-off.

use deskbound_ledger::Ledger;
use deskbound_types::{AgentId, CoreEvent, ResourceId, TaskPhase, WorldPoint};
use deskbound_world::OccupancyGrid;
use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::error::TaskError;
use crate::navigation::{Navigator, has_arrived};
use crate::pool::ResourcePool;
use crate::tier::TierProfile;

/// Number of cosmetic work animations to pick from on arrival.
pub const WORK_STYLE_COUNT: u8 = 2;

/// Facing used when the agent stands exactly on its interaction point.
const DEFAULT_FACING: WorldPoint = WorldPoint::new(0.0, 1.0);

/// Where an agent's task currently is, with its resume condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskState {
    /// Waiting for the navigator to put the agent on the navmesh.
    AwaitingNavmesh,
    /// Looking for a free resource.
    Seeking {
        /// Earliest time of the next claim attempt; `None` means now.
        retry_at_ms: Option<u64>,
    },
    /// Walking to a claimed resource.
    Traveling {
        /// The claimed resource.
        resource: ResourceId,
        /// The interaction point being walked to.
        destination: WorldPoint,
    },
    /// Sitting at a resource, paying out on a fixed interval.
    Working {
        /// The resource in use.
        resource: ResourceId,
        /// Time of the next payout.
        next_tick_ms: u64,
    },
}

impl TaskState {
    /// Coarse phase for observers.
    pub const fn phase(&self) -> TaskPhase {
        match self {
            Self::AwaitingNavmesh => TaskPhase::AwaitingNavmesh,
            Self::Seeking { .. } => TaskPhase::Seeking,
            Self::Traveling { .. } => TaskPhase::Traveling,
            Self::Working { .. } => TaskPhase::Working,
        }
    }

    /// The resource this state refers to, if any.
    pub const fn resource(&self) -> Option<ResourceId> {
        match self {
            Self::Traveling { resource, .. } | Self::Working { resource, .. } => Some(*resource),
            Self::AwaitingNavmesh | Self::Seeking { .. } => None,
        }
    }
}

/// Everything a task needs for one step.
pub struct TaskContext<'a> {
    /// Current simulated time.
    pub now_ms: u64,
    /// Delay between failed claim attempts.
    pub retry_interval_ms: u64,
    /// Shared resource registry.
    pub pool: &'a ResourcePool,
    /// Occupancy, for picking an unblocked interaction point.
    pub grid: &'a OccupancyGrid,
    /// Travel oracle.
    pub navigator: &'a mut dyn Navigator,
    /// Receiver of payouts.
    pub ledger: &'a dyn Ledger,
    /// Source of cosmetic randomness.
    pub rng: &'a mut StdRng,
}

/// One employee's seek/travel/work cycle.
#[derive(Debug, Clone)]
pub struct AgentTask {
    agent: AgentId,
    profile: TierProfile,
    state: TaskState,
    ticks_paid: u64,
    earned: u64,
}

impl AgentTask {
    /// A task for a freshly spawned agent.
    pub const fn new(agent: AgentId, profile: TierProfile) -> Self {
        Self {
            agent,
            profile,
            state: TaskState::AwaitingNavmesh,
            ticks_paid: 0,
            earned: 0,
        }
    }

    /// The agent running this task.
    pub const fn agent(&self) -> AgentId {
        self.agent
    }

    /// Work rate fixed at hire time.
    pub const fn profile(&self) -> TierProfile {
        self.profile
    }

    /// Current state.
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Payouts made so far.
    pub const fn ticks_paid(&self) -> u64 {
        self.ticks_paid
    }

    /// Coins earned so far.
    pub const fn earned(&self) -> u64 {
        self.earned
    }

    /// Advance the task as far as its resume conditions allow at
    /// `ctx.now_ms`, appending the events produced to `events` in order.
    ///
    /// Events pushed before a failed payout stay in `events`.
    pub fn step(&mut self, ctx: &mut TaskContext<'_>, events: &mut Vec<CoreEvent>) -> Result<(), TaskError> {
        if self.state == TaskState::AwaitingNavmesh {
            if !ctx.navigator.is_on_navmesh(self.agent) {
                return Ok(());
            }
            debug!(agent_id = %self.agent, "agent on navmesh");
            self.state = TaskState::Seeking { retry_at_ms: None };
        }

        if let TaskState::Seeking { retry_at_ms } = self.state {
            if retry_at_ms.is_some_and(|at| ctx.now_ms < at) {
                return Ok(());
            }
            self.seek(ctx, events);
        }

        if let TaskState::Traveling {
            resource,
            destination,
        } = self.state
        {
            self.travel(ctx, resource, destination, events);
        }

        if matches!(self.state, TaskState::Working { .. }) {
            self.work(ctx, events)?;
        }

        Ok(())
    }

    /// Abandon the current resource and go back to seeking.
    ///
    /// The resource is released only if this agent still holds it, so an
    /// already-unregistered or reassigned resource is never freed twice.
    /// An agent still waiting for the navmesh keeps waiting.
    pub fn interrupt(&mut self, pool: &ResourcePool) -> CoreEvent {
        let resource = self.state.resource();
        if let Some(id) = resource {
            pool.release_held_by(id, self.agent);
        }
        if self.state != TaskState::AwaitingNavmesh {
            self.state = TaskState::Seeking { retry_at_ms: None };
        }
        info!(
            agent_id = %self.agent,
            resource_id = ?resource,
            "task interrupted, seeking again"
        );
        CoreEvent::Interrupted {
            agent: self.agent,
            resource,
        }
    }

    fn seek(&mut self, ctx: &mut TaskContext<'_>, events: &mut Vec<CoreEvent>) {
        let claim = ctx
            .navigator
            .position(self.agent)
            .and_then(|from| ctx.pool.claim_nearest(self.agent, from));
        let Some(claim) = claim else {
            let retry_at = ctx.now_ms.saturating_add(ctx.retry_interval_ms);
            debug!(agent_id = %self.agent, retry_at_ms = retry_at, "no free resource");
            self.state = TaskState::Seeking {
                retry_at_ms: Some(retry_at),
            };
            return;
        };

        // Ranked by primary point; the walk target may be another candidate.
        let destination = ctx
            .pool
            .interaction_point_for(claim.resource, ctx.grid)
            .unwrap_or(claim.point);
        if !ctx.navigator.set_destination(self.agent, destination) {
            warn!(agent_id = %self.agent, "navigator rejected destination");
        }
        info!(
            agent_id = %self.agent,
            resource_id = %claim.resource,
            distance = claim.distance,
            "claimed resource, traveling"
        );
        self.state = TaskState::Traveling {
            resource: claim.resource,
            destination,
        };
        events.push(CoreEvent::ResourceClaimed {
            agent: self.agent,
            resource: claim.resource,
            destination,
        });
    }

    fn travel(
        &mut self,
        ctx: &mut TaskContext<'_>,
        resource: ResourceId,
        destination: WorldPoint,
        events: &mut Vec<CoreEvent>,
    ) {
        if !ctx.pool.is_held_by(resource, self.agent) {
            events.push(self.interrupt(ctx.pool));
            return;
        }
        if !has_arrived(&*ctx.navigator, self.agent) {
            return;
        }

        let here = ctx.navigator.position(self.agent).unwrap_or(destination);
        let facing = destination.minus(here).normalized_or(DEFAULT_FACING);
        let work_style = ctx.rng.random_range(0..WORK_STYLE_COUNT);
        let next_tick_ms = ctx.now_ms.saturating_add(self.profile.work_interval_ms);
        info!(
            agent_id = %self.agent,
            resource_id = %resource,
            work_style,
            next_tick_ms,
            "arrived, working"
        );
        self.state = TaskState::Working {
            resource,
            next_tick_ms,
        };
        events.push(CoreEvent::StartedWorking {
            agent: self.agent,
            resource,
            facing,
            work_style,
        });
    }

    fn work(&mut self, ctx: &TaskContext<'_>, events: &mut Vec<CoreEvent>) -> Result<(), TaskError> {
        let interval = self.profile.work_interval_ms.max(1);
        let amount = self.profile.money_per_tick;
        while let TaskState::Working {
            resource,
            next_tick_ms,
        } = self.state
        {
            if ctx.now_ms < next_tick_ms {
                break;
            }
            let ledger = ctx.ledger;
            let Some(paid) = ctx.pool.while_held(resource, self.agent, || ledger.add_money(amount)) else {
                events.push(self.interrupt(ctx.pool));
                break;
            };
            let balance = paid.map_err(|source| TaskError::Payout {
                agent: self.agent,
                source,
            })?;
            self.ticks_paid = self.ticks_paid.saturating_add(1);
            self.earned = self.earned.saturating_add(amount);
            self.state = TaskState::Working {
                resource,
                next_tick_ms: next_tick_ms.saturating_add(interval),
            };
            debug!(agent_id = %self.agent, amount, balance, at_ms = next_tick_ms, "work tick");
            events.push(CoreEvent::WorkTick {
                agent: self.agent,
                resource,
                amount,
            });
            events.push(CoreEvent::MoneyChanged { balance });
        }
        Ok(())
    }
}
