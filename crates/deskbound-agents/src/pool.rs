//! The shared registry of assignable resources.
//!
//! [`ResourcePool`] keeps every registered resource and the subset that is
//! free. Both live behind one mutex, so claim and release are linearizable:
//! two agents racing for the last free table never both get it.
//!
//! The free set is never edited from outside. Membership changes only in
//! [`register`], [`unregister`], [`claim_nearest`] and the release methods,
//! and after each of them the pool checks (in debug builds) that a resource
//! is in the free set iff it has no assigned agent.
//!
//! Unregistering an occupied resource queues its agent on an interrupt list;
//! the scheduler drains it with [`take_interrupts`] before stepping agents.
//!
//! [`register`]: ResourcePool::register
//! [`unregister`]: ResourcePool::unregister
//! [`claim_nearest`]: ResourcePool::claim_nearest
//! [`take_interrupts`]: ResourcePool::take_interrupts

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use deskbound_types::{AgentId, Footprint, ResourceId, WorldPoint};
use deskbound_world::OccupancyGrid;
use tracing::{debug, info};

use crate::error::PoolError;

/// A placed resource (a table) as the pool sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    /// Resource identity.
    pub id: ResourceId,
    /// Cells the resource covers.
    pub footprint: Footprint,
    /// World position of the resource.
    pub position: WorldPoint,
    /// Candidate interaction points, in preference order.
    pub interaction_points: Vec<WorldPoint>,
    /// Agent currently using the resource.
    pub assigned: Option<AgentId>,
}

impl ResourceRecord {
    /// A free resource.
    pub const fn new(
        id: ResourceId,
        footprint: Footprint,
        position: WorldPoint,
        interaction_points: Vec<WorldPoint>,
    ) -> Self {
        Self {
            id,
            footprint,
            position,
            interaction_points,
            assigned: None,
        }
    }

    /// The point distances are measured to: the first interaction point, or
    /// the resource position when there is none.
    pub fn primary_point(&self) -> WorldPoint {
        self.interaction_points.first().copied().unwrap_or(self.position)
    }
}

/// A successful claim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Claim {
    /// The claimed resource.
    pub resource: ResourceId,
    /// Its primary interaction point.
    pub point: WorldPoint,
    /// Distance from the query position to `point`.
    pub distance: f64,
}

#[derive(Debug, Default)]
struct PoolState {
    next_seq: u64,
    records: BTreeMap<u64, ResourceRecord>,
    seq_by_id: BTreeMap<ResourceId, u64>,
    free: BTreeSet<u64>,
    interrupts: Vec<AgentId>,
}

impl PoolState {
    fn record(&self, id: ResourceId) -> Result<(u64, &ResourceRecord), PoolError> {
        self.seq_by_id
            .get(&id)
            .and_then(|seq| self.records.get(seq).map(|record| (*seq, record)))
            .ok_or(PoolError::UnknownResource { resource: id })
    }

    fn record_mut(&mut self, id: ResourceId) -> Result<(u64, &mut ResourceRecord), PoolError> {
        let seq = *self
            .seq_by_id
            .get(&id)
            .ok_or(PoolError::UnknownResource { resource: id })?;
        self.records
            .get_mut(&seq)
            .map(|record| (seq, record))
            .ok_or(PoolError::UnknownResource { resource: id })
    }

    fn is_consistent(&self) -> bool {
        self.records.len() == self.seq_by_id.len()
            && self
                .seq_by_id
                .iter()
                .all(|(id, seq)| self.records.get(seq).is_some_and(|record| record.id == *id))
            && self.free.iter().all(|seq| self.records.contains_key(seq))
            && self
                .records
                .iter()
                .all(|(seq, record)| record.assigned.is_none() == self.free.contains(seq))
    }
}

/// Process-wide registry of resources and their assignment state.
#[derive(Debug, Default)]
pub struct ResourcePool {
    state: Mutex<PoolState>,
}

impl ResourcePool {
    /// An empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource. It joins the free set unless it is already assigned.
    pub fn register(&self, record: ResourceRecord) -> Result<(), PoolError> {
        let mut state = self.lock();
        if state.seq_by_id.contains_key(&record.id) {
            return Err(PoolError::DuplicateResource { resource: record.id });
        }
        let seq = state.next_seq;
        state.next_seq = seq.saturating_add(1);
        let id = record.id;
        if record.assigned.is_none() {
            state.free.insert(seq);
        }
        state.seq_by_id.insert(id, seq);
        state.records.insert(seq, record);
        debug_assert!(state.is_consistent(), "pool desync after register");
        info!(resource_id = %id, free = state.free.len(), "resource registered");
        Ok(())
    }

    /// Remove a resource from both sets. If an agent was using it, that agent
    /// is queued for interruption.
    pub fn unregister(&self, id: ResourceId) -> Result<ResourceRecord, PoolError> {
        let mut state = self.lock();
        let seq = state
            .seq_by_id
            .remove(&id)
            .ok_or(PoolError::UnknownResource { resource: id })?;
        state.free.remove(&seq);
        let record = state
            .records
            .remove(&seq)
            .ok_or(PoolError::UnknownResource { resource: id })?;
        if let Some(agent) = record.assigned {
            state.interrupts.push(agent);
            info!(resource_id = %id, agent_id = %agent, "occupied resource unregistered");
        } else {
            info!(resource_id = %id, "resource unregistered");
        }
        debug_assert!(state.is_consistent(), "pool desync after unregister");
        Ok(record)
    }

    /// Atomically take the free resource nearest to `from` for `agent`.
    ///
    /// Distance is measured to each resource's primary point. Equal
    /// distances go to the earliest registered resource.
    ///
    /// The ranking point is not necessarily where the agent walks: the task
    /// asks [`interaction_point_for`](Self::interaction_point_for) for its
    /// destination afterwards, which skips blocked candidates.
    pub fn claim_nearest(&self, agent: AgentId, from: WorldPoint) -> Option<Claim> {
        let mut state = self.lock();
        let mut best: Option<(u64, WorldPoint, f64)> = None;
        for seq in &state.free {
            let Some(record) = state.records.get(seq) else {
                continue;
            };
            let point = record.primary_point();
            let distance = from.distance(point);
            if best.is_none_or(|(_, _, best_distance)| distance.total_cmp(&best_distance).is_lt()) {
                best = Some((*seq, point, distance));
            }
        }
        let (seq, point, distance) = best?;
        state.free.remove(&seq);
        let record = state.records.get_mut(&seq)?;
        record.assigned = Some(agent);
        let resource = record.id;
        debug_assert!(state.is_consistent(), "pool desync after claim");
        debug!(agent_id = %agent, resource_id = %resource, distance, "resource claimed");
        Some(Claim {
            resource,
            point,
            distance,
        })
    }

    /// Mark a resource free. Returns `false` if it already was.
    pub fn release(&self, id: ResourceId) -> Result<bool, PoolError> {
        let mut state = self.lock();
        let (seq, record) = state.record_mut(id)?;
        let Some(agent) = record.assigned.take() else {
            return Ok(false);
        };
        state.free.insert(seq);
        debug_assert!(state.is_consistent(), "pool desync after release");
        debug!(resource_id = %id, agent_id = %agent, "resource released");
        Ok(true)
    }

    /// Release `id` only if `agent` still holds it. Unknown resources and
    /// resources held by someone else are left alone.
    pub fn release_held_by(&self, id: ResourceId, agent: AgentId) -> bool {
        let mut state = self.lock();
        let Ok((seq, record)) = state.record_mut(id) else {
            return false;
        };
        if record.assigned != Some(agent) {
            return false;
        }
        record.assigned = None;
        state.free.insert(seq);
        debug_assert!(state.is_consistent(), "pool desync after release");
        debug!(resource_id = %id, agent_id = %agent, "resource released by holder");
        true
    }

    /// Run `f` while holding the pool lock, but only if `agent` still holds
    /// `id`. Returns `None` without running `f` otherwise.
    ///
    /// `f` must not call back into the pool.
    pub fn while_held<T>(&self, id: ResourceId, agent: AgentId, f: impl FnOnce() -> T) -> Option<T> {
        let state = self.lock();
        let held = state
            .record(id)
            .is_ok_and(|(_, record)| record.assigned == Some(agent));
        held.then(f)
    }

    /// Whether `agent` currently holds `id`.
    pub fn is_held_by(&self, id: ResourceId, agent: AgentId) -> bool {
        self.while_held(id, agent, || ()).is_some()
    }

    /// The agent assigned to `id`, if any.
    pub fn holder(&self, id: ResourceId) -> Result<Option<AgentId>, PoolError> {
        self.lock().record(id).map(|(_, record)| record.assigned)
    }

    /// Where an agent should stand to use `id`.
    ///
    /// The first candidate whose grid cell is free wins. If every candidate
    /// is blocked the first one is returned anyway; reachability is the
    /// navigator's problem. A resource without candidates uses its position.
    pub fn interaction_point_for(&self, id: ResourceId, grid: &OccupancyGrid) -> Result<WorldPoint, PoolError> {
        let state = self.lock();
        let (_, record) = state.record(id)?;
        let Some(first) = record.interaction_points.first().copied() else {
            return Ok(record.position);
        };
        Ok(record
            .interaction_points
            .iter()
            .copied()
            .find(|point| grid.is_free(grid.world_to_cell(*point)))
            .unwrap_or(first))
    }

    /// Copy of a resource record.
    pub fn record(&self, id: ResourceId) -> Option<ResourceRecord> {
        self.lock().record(id).ok().map(|(_, record)| record.clone())
    }

    /// Registered resource ids, oldest first.
    pub fn ids(&self) -> Vec<ResourceId> {
        self.lock().records.values().map(|record| record.id).collect()
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Whether no resource is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Number of free resources.
    pub fn free_count(&self) -> usize {
        self.lock().free.len()
    }

    /// Agents displaced by [`unregister`](Self::unregister) since the last
    /// call, in order.
    pub fn take_interrupts(&self) -> Vec<AgentId> {
        std::mem::take(&mut self.lock().interrupts)
    }

    /// Whether the free set matches assignment state exactly.
    pub fn check_invariants(&self) -> bool {
        self.lock().is_consistent()
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use deskbound_types::{FootprintSize, GridCell};
    use deskbound_world::GridTransform;

    use super::*;

    fn table_at(x: f64, z: f64) -> ResourceRecord {
        ResourceRecord::new(
            ResourceId::new(),
            Footprint::new(GridCell::new(0, 0), FootprintSize::new(1, 1)),
            WorldPoint::new(x, z),
            Vec::new(),
        )
    }

    #[test]
    fn claims_nearest_free_resource() {
        let pool = ResourcePool::new();
        let far = table_at(3.0, 0.0);
        let near = table_at(0.0, 1.0);
        let farther = table_at(-5.0, 0.0);
        let near_id = near.id;
        for record in [far, near, farther] {
            pool.register(record).unwrap();
        }
        let claim = pool.claim_nearest(AgentId::new(), WorldPoint::ORIGIN).unwrap();
        assert_eq!(claim.resource, near_id);
        assert!((claim.distance - 1.0).abs() < 1e-9);
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn equal_distance_goes_to_first_registered() {
        let pool = ResourcePool::new();
        let first = table_at(2.0, 0.0);
        let first_id = first.id;
        pool.register(first).unwrap();
        pool.register(table_at(-2.0, 0.0)).unwrap();
        pool.register(table_at(0.0, 2.0)).unwrap();
        let claim = pool.claim_nearest(AgentId::new(), WorldPoint::ORIGIN).unwrap();
        assert_eq!(claim.resource, first_id);
    }

    #[test]
    fn empty_free_set_yields_none() {
        let pool = ResourcePool::new();
        assert!(pool.claim_nearest(AgentId::new(), WorldPoint::ORIGIN).is_none());
        let record = table_at(0.0, 0.0);
        pool.register(record).unwrap();
        assert!(pool.claim_nearest(AgentId::new(), WorldPoint::ORIGIN).is_some());
        assert!(pool.claim_nearest(AgentId::new(), WorldPoint::ORIGIN).is_none());
    }

    #[test]
    fn release_is_idempotent() {
        let pool = ResourcePool::new();
        let record = table_at(0.0, 0.0);
        let id = record.id;
        pool.register(record).unwrap();
        let agent = AgentId::new();
        pool.claim_nearest(agent, WorldPoint::ORIGIN).unwrap();
        assert_eq!(pool.holder(id).unwrap(), Some(agent));
        assert!(pool.release(id).unwrap());
        assert!(!pool.release(id).unwrap());
        assert_eq!(pool.free_count(), 1);
        assert!(pool.check_invariants());
        assert!(matches!(
            pool.release(ResourceId::new()),
            Err(PoolError::UnknownResource { .. })
        ));
    }

    #[test]
    fn release_held_by_ignores_other_agents() {
        let pool = ResourcePool::new();
        let record = table_at(0.0, 0.0);
        let id = record.id;
        pool.register(record).unwrap();
        let owner = AgentId::new();
        pool.claim_nearest(owner, WorldPoint::ORIGIN).unwrap();
        assert!(!pool.release_held_by(id, AgentId::new()));
        assert!(pool.is_held_by(id, owner));
        assert!(pool.release_held_by(id, owner));
        assert!(!pool.release_held_by(id, owner));
    }

    #[test]
    fn assigned_record_registers_outside_free_set() {
        let pool = ResourcePool::new();
        let mut record = table_at(0.0, 0.0);
        record.assigned = Some(AgentId::new());
        pool.register(record.clone()).unwrap();
        assert_eq!(pool.free_count(), 0);
        assert!(matches!(
            pool.register(record),
            Err(PoolError::DuplicateResource { .. })
        ));
    }

    #[test]
    fn unregister_queues_displaced_agent() {
        let pool = ResourcePool::new();
        let busy = table_at(0.0, 0.0);
        let idle = table_at(9.0, 9.0);
        let (busy_id, idle_id) = (busy.id, idle.id);
        pool.register(busy).unwrap();
        pool.register(idle).unwrap();
        let agent = AgentId::new();
        pool.claim_nearest(agent, WorldPoint::ORIGIN).unwrap();

        pool.unregister(idle_id).unwrap();
        assert!(pool.take_interrupts().is_empty());

        let removed = pool.unregister(busy_id).unwrap();
        assert_eq!(removed.assigned, Some(agent));
        assert_eq!(pool.take_interrupts(), vec![agent]);
        assert!(pool.take_interrupts().is_empty());
        assert!(pool.is_empty());
        assert!(!pool.is_held_by(busy_id, agent));
    }

    #[test]
    fn while_held_runs_only_for_holder() {
        let pool = ResourcePool::new();
        let record = table_at(0.0, 0.0);
        let id = record.id;
        pool.register(record).unwrap();
        let agent = AgentId::new();
        assert_eq!(pool.while_held(id, agent, || 5), None);
        pool.claim_nearest(agent, WorldPoint::ORIGIN).unwrap();
        assert_eq!(pool.while_held(id, agent, || 5), Some(5));
        pool.release(id).unwrap();
        assert_eq!(pool.while_held(id, agent, || 5), None);
    }

    #[test]
    fn racing_claims_for_last_resource_have_one_winner() {
        for _round in 0..50 {
            let pool = Arc::new(ResourcePool::new());
            let record = table_at(0.0, 0.0);
            let id = record.id;
            pool.register(record).unwrap();
            let winners = AtomicUsize::new(0);

            std::thread::scope(|scope| {
                for _ in 0..8 {
                    scope.spawn(|| {
                        if pool.claim_nearest(AgentId::new(), WorldPoint::ORIGIN).is_some() {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }
            });
            assert_eq!(winners.load(Ordering::SeqCst), 1);

            pool.release(id).unwrap();
            let after_release = AtomicUsize::new(0);
            std::thread::scope(|scope| {
                for _ in 0..8 {
                    scope.spawn(|| {
                        if pool.claim_nearest(AgentId::new(), WorldPoint::ORIGIN).is_some() {
                            after_release.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }
            });
            assert_eq!(after_release.load(Ordering::SeqCst), 1);
            assert!(pool.check_invariants());
        }
    }

    #[test]
    fn interaction_point_skips_blocked_cells() {
        let mut grid = OccupancyGrid::new(10, 10, GridTransform::axis_aligned(1.0).unwrap()).unwrap();
        let blocked = WorldPoint::new(2.5, 2.5);
        let open = WorldPoint::new(4.5, 2.5);
        let record = ResourceRecord::new(
            ResourceId::new(),
            Footprint::new(GridCell::new(3, 2), FootprintSize::new(1, 1)),
            WorldPoint::new(3.5, 2.5),
            vec![blocked, open],
        );
        let id = record.id;
        let pool = pool_with(&record);
        assert_eq!(pool.interaction_point_for(id, &grid).unwrap(), blocked);

        grid.occupy(&Footprint::new(GridCell::new(2, 2), FootprintSize::new(1, 1)));
        assert_eq!(pool.interaction_point_for(id, &grid).unwrap(), open);

        grid.occupy(&Footprint::new(GridCell::new(4, 2), FootprintSize::new(1, 1)));
        assert_eq!(pool.interaction_point_for(id, &grid).unwrap(), blocked);
    }

    #[test]
    fn resource_without_candidates_uses_its_position() {
        let grid = OccupancyGrid::new(4, 4, GridTransform::axis_aligned(1.0).unwrap()).unwrap();
        let record = table_at(1.5, 1.5);
        let id = record.id;
        let pool = pool_with(&record);
        assert_eq!(pool.interaction_point_for(id, &grid).unwrap(), WorldPoint::new(1.5, 1.5));
    }

    fn pool_with(record: &ResourceRecord) -> ResourcePool {
        let pool = ResourcePool::new();
        pool.register(record.clone()).unwrap();
        pool
    }
}
