//! The office simulation: every subsystem wired together behind one
//! explicit scheduler.
//!
//! [`Simulation`] owns the grid, the placement controller, the resource
//! pool, the employee roster, the navigator, the wallet and the shop.
//! Player commands (buy, place, hire, demolish) are plain method calls;
//! [`Simulation::step`] advances simulated time by one tick:
//!
//! 1. advance the clock;
//! 2. advance the navigator by the same delta;
//! 3. interrupt every employee whose resource disappeared;
//! 4. step every employee task in spawn order.
//!
//! Interrupts are drained before any task runs, so a displaced employee
//! makes its first new claim attempt in the same step.

use std::sync::Arc;

use deskbound_agents::{
    AgentError, AgentRoster, PoolError, ResourcePool, ResourceRecord, TaskContext, TierTable,
};
use deskbound_ledger::{Ledger, LedgerError, Shop, ShopOffer, Wallet};
use deskbound_types::{
    AgentId, CoreEvent, Footprint, GridCell, PlacedObject, ResourceId, SessionId, ShopItemKind,
    QUARTER_TURNS_PER_REVOLUTION, TaskPhase, Tier, WorldPoint,
};
use deskbound_world::{
    ConfirmOutcome, GridTransform, OccupancyGrid, PendingPurchase, PlacementController,
    PlacementError, PointerInput, PrefabDef, WorldError,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{ClockError, SimClock};
use crate::config::{ConfigError, SimulationConfig};
use crate::navigator::KinematicNavigator;

/// Errors raised by simulation commands and steps.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The clock could not advance.
    #[error(transparent)]
    Clock(#[from] ClockError),

    /// The grid could not be built.
    #[error(transparent)]
    World(#[from] WorldError),

    /// A placement command was not valid in the current session state.
    #[error(transparent)]
    Placement(#[from] PlacementError),

    /// A money or shop operation failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A resource pool operation failed.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// A roster operation failed.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// The wallet cannot cover the price.
    #[error("cannot afford `{item}`: price {price}, balance {balance}")]
    InsufficientFunds {
        /// Shop item being bought.
        item: String,
        /// Its current price.
        price: u64,
        /// Wallet balance at the time.
        balance: u64,
    },

    /// The shop item delivers something else than the command expects.
    #[error("shop item `{item}` is not a {expected:?} item")]
    WrongItemKind {
        /// Shop item being bought.
        item: String,
        /// Kind the command needed.
        expected: ShopItemKind,
    },

    /// No prefab with this name is configured.
    #[error("unknown prefab `{prefab}`")]
    UnknownPrefab {
        /// The requested prefab.
        prefab: String,
    },
}

/// What happened during one [`Simulation::step`].
#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    /// Tick number after the step.
    pub tick: u64,
    /// Simulated milliseconds after the step.
    pub now_ms: u64,
    /// Wallet balance after the step.
    pub balance: u64,
    /// Number of hired employees.
    pub employees: usize,
    /// Employees currently working.
    pub working: usize,
    /// Resources nobody holds.
    pub free_resources: usize,
    /// Events since the previous step, oldest first. Includes events from
    /// commands issued between steps.
    pub events: Vec<CoreEvent>,
}

/// Outcome of confirming a locked placement.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementResult {
    /// The object was committed to the grid.
    Placed {
        /// The committed object.
        object: PlacedObject,
        /// Pool id when the object is a resource.
        resource: Option<ResourceId>,
    },
    /// The footprint was taken since locking; the session stays locked.
    Rejected {
        /// Locked anchor cell.
        cell: GridCell,
    },
}

/// The whole office.
#[derive(Debug)]
pub struct Simulation {
    clock: SimClock,
    retry_interval_ms: u64,
    grid: OccupancyGrid,
    placement: PlacementController,
    prefabs: Vec<PrefabDef>,
    pool: Arc<ResourcePool>,
    roster: AgentRoster,
    tiers: TierTable,
    navigator: KinematicNavigator,
    spawn_point: WorldPoint,
    wallet: Arc<Wallet>,
    shop: Shop,
    rng: StdRng,
    events: Vec<CoreEvent>,
}

impl Simulation {
    /// Build a simulation from a validated configuration.
    ///
    /// Obstacles are occupied before anything else so no placement can
    /// overlap them.
    pub fn new(config: &SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        let grid_config = &config.grid;
        let transform = GridTransform::new(
            WorldPoint::new(grid_config.origin_x, grid_config.origin_z),
            grid_config.rotation_degrees,
            grid_config.cell_size,
        )?;
        let mut grid = OccupancyGrid::new(grid_config.width, grid_config.height, transform)?;
        for obstacle in &grid_config.obstacles {
            let occupied = grid.occupy(&Footprint::new(obstacle.origin(), obstacle.size()));
            debug!(cell = %obstacle.origin(), occupied, "obstacle occupied");
        }

        let mut shop = Shop::new();
        for item in &config.shop {
            shop.add_item(&item.name, item.offer.clone(), item.costs.clone())?;
        }

        info!(
            width = grid.width(),
            height = grid.height(),
            obstacles = grid.occupied_count(),
            shop_items = config.shop.len(),
            starting_money = config.economy.starting_money,
            seed = config.seed,
            "simulation built"
        );

        Ok(Self {
            clock: SimClock::new(&config.time)?,
            retry_interval_ms: config.time.seek_retry_ms,
            grid,
            placement: PlacementController::new(),
            prefabs: config.prefabs.clone(),
            pool: Arc::new(ResourcePool::new()),
            roster: AgentRoster::new(),
            tiers: config.tiers,
            navigator: KinematicNavigator::new(&config.navigation),
            spawn_point: config.navigation.spawn_point,
            wallet: Arc::new(Wallet::new(config.economy.starting_money)),
            shop,
            rng: StdRng::seed_from_u64(config.seed),
            events: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    /// Pay for a placeable shop item and start placing it.
    ///
    /// A session already in progress is cancelled and refunded first.
    pub fn buy_placeable(&mut self, item: &str) -> Result<SessionId, SimulationError> {
        let prefab_name = match &self.shop.item(item)?.offer {
            ShopOffer::Placeable { prefab } => prefab.clone(),
            ShopOffer::Employee { .. } => {
                return Err(SimulationError::WrongItemKind {
                    item: item.to_owned(),
                    expected: ShopItemKind::Placeable,
                });
            }
        };
        let prefab = self.prefab(&prefab_name)?.clone();
        let price = self.charge(item)?;
        let started = self.placement.start(
            prefab,
            PendingPurchase {
                item: Some(item.to_owned()),
                cost: price,
            },
        );
        self.absorb_placement_events()?;
        Ok(started?)
    }

    /// Start placing a prefab without paying for it.
    pub fn place_prefab(&mut self, prefab: &str) -> Result<SessionId, SimulationError> {
        let prefab = self.prefab(prefab)?.clone();
        let started = self.placement.start(prefab, PendingPurchase::free());
        self.absorb_placement_events()?;
        Ok(started?)
    }

    /// Apply one frame of pointer input to the active session.
    pub fn handle_pointer(&mut self, input: &PointerInput) -> Result<(), SimulationError> {
        let handled = self.placement.handle_input(input, &self.grid);
        self.absorb_placement_events()?;
        Ok(handled?)
    }

    /// Move the free-floating ghost. Returns the new validity.
    pub fn update_pointer(&mut self, point: WorldPoint) -> Result<bool, SimulationError> {
        let valid = self.placement.update_pointer(point, &self.grid);
        self.absorb_placement_events()?;
        Ok(valid?)
    }

    /// Rotate the ghost a quarter turn. Returns the new validity.
    pub fn rotate_placement(&mut self) -> Result<bool, SimulationError> {
        let valid = self.placement.rotate(&self.grid);
        self.absorb_placement_events()?;
        Ok(valid?)
    }

    /// Lock the ghost at its current cell.
    pub fn lock_placement(&mut self) -> Result<GridCell, SimulationError> {
        let cell = self.placement.confirm_lock(&self.grid);
        self.absorb_placement_events()?;
        Ok(cell?)
    }

    /// Commit the locked ghost. A placed resource joins the pool at once.
    pub fn confirm_placement(&mut self) -> Result<PlacementResult, SimulationError> {
        let outcome = self.placement.confirm(&mut self.grid);
        let resource = self.absorb_placement_events()?;
        Ok(match outcome? {
            ConfirmOutcome::Placed(object) => PlacementResult::Placed { object, resource },
            ConfirmOutcome::Rejected { cell } => PlacementResult::Rejected { cell },
        })
    }

    /// Abandon the active session. Returns the refunded amount.
    pub fn cancel_placement(&mut self) -> Result<u64, SimulationError> {
        let refund = self.placement.cancel();
        self.absorb_placement_events()?;
        Ok(refund?)
    }

    /// Buy a placeable and commit it at `cell` after `quarter_turns`
    /// rotations, in one go.
    ///
    /// If the footprint does not fit, the session is cancelled (and the
    /// price refunded) before the error is returned.
    pub fn buy_and_place(
        &mut self,
        item: &str,
        cell: GridCell,
        quarter_turns: u8,
    ) -> Result<PlacementResult, SimulationError> {
        self.buy_placeable(item)?;
        self.commit_at(cell, quarter_turns)
    }

    /// Place a prefab for free at `cell` after `quarter_turns` rotations.
    pub fn place_prefab_at(
        &mut self,
        prefab: &str,
        cell: GridCell,
        quarter_turns: u8,
    ) -> Result<PlacementResult, SimulationError> {
        self.place_prefab(prefab)?;
        self.commit_at(cell, quarter_turns)
    }

    // -----------------------------------------------------------------------
    // Employees and resources
    // -----------------------------------------------------------------------

    /// Pay for an employee of `tier` and spawn them at the spawn point.
    pub fn hire(&mut self, tier: Tier) -> Result<AgentId, SimulationError> {
        let item = self
            .shop
            .items()
            .find(|item| item.offer == ShopOffer::Employee { tier })
            .map(|item| item.name.clone())
            .ok_or_else(|| LedgerError::UnknownItem {
                item: tier.as_str().to_owned(),
            })?;
        let price = self.charge(&item)?;
        let agent = self.spawn_agent(tier);
        self.shop.confirm_purchase(&item)?;
        self.events.push(CoreEvent::PurchaseConfirmed { item, price });
        Ok(agent)
    }

    /// Spawn an employee of `tier` at the spawn point without paying.
    pub fn spawn_agent(&mut self, tier: Tier) -> AgentId {
        let agent = self
            .roster
            .spawn(tier, self.tiers.profile(tier), self.clock.now_ms());
        self.navigator.spawn(agent, self.spawn_point);
        self.events.push(CoreEvent::AgentSpawned { agent, tier });
        agent
    }

    /// Tear a placed resource down: unregister it, free its cells and
    /// queue an interrupt for whoever was using it.
    pub fn demolish(&mut self, resource: ResourceId) -> Result<(), SimulationError> {
        let record = self.pool.unregister(resource)?;
        let freed = self.grid.free(&record.footprint);
        info!(
            resource_id = %resource,
            freed,
            displaced = ?record.assigned,
            "resource demolished"
        );
        self.events.push(CoreEvent::ResourceRemoved {
            resource,
            displaced: record.assigned,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Scheduler
    // -----------------------------------------------------------------------

    /// Advance simulated time by one tick and run every task.
    pub fn step(&mut self) -> Result<StepSummary, SimulationError> {
        let tick = self.clock.advance()?;
        self.wallet.set_tick(tick);
        self.navigator.advance(self.clock.tick_ms());

        for agent in self.pool.take_interrupts() {
            match self.roster.interrupt(agent, &self.pool) {
                Ok(event) => self.events.push(event),
                Err(AgentError::UnknownAgent { agent }) => {
                    warn!(agent_id = %agent, "interrupt for agent not on the roster");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let mut ctx = TaskContext {
            now_ms: self.clock.now_ms(),
            retry_interval_ms: self.retry_interval_ms,
            pool: &self.pool,
            grid: &self.grid,
            navigator: &mut self.navigator,
            ledger: &*self.wallet,
            rng: &mut self.rng,
        };
        // Events from tasks stepped before a failure stay queued for the
        // next summary or drain.
        self.roster.step_all(&mut ctx, &mut self.events)?;

        Ok(StepSummary {
            tick,
            now_ms: self.clock.now_ms(),
            balance: self.wallet.balance(),
            employees: self.roster.len(),
            working: self.roster.count_in(TaskPhase::Working),
            free_resources: self.pool.free_count(),
            events: std::mem::take(&mut self.events),
        })
    }

    /// Take the events queued by commands since the last step or drain.
    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The simulated clock.
    pub const fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// The occupancy grid.
    pub const fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    /// The placement controller.
    pub const fn placement(&self) -> &PlacementController {
        &self.placement
    }

    /// The shared resource pool.
    pub const fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    /// The employee roster.
    pub const fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    /// The navigator.
    pub const fn navigator(&self) -> &KinematicNavigator {
        &self.navigator
    }

    /// The shared wallet.
    pub const fn wallet(&self) -> &Arc<Wallet> {
        &self.wallet
    }

    /// The shop.
    pub const fn shop(&self) -> &Shop {
        &self.shop
    }

    /// Current wallet balance.
    pub fn balance(&self) -> u64 {
        self.wallet.balance()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn prefab(&self, name: &str) -> Result<&PrefabDef, SimulationError> {
        self.prefabs
            .iter()
            .find(|prefab| prefab.name == name)
            .ok_or_else(|| SimulationError::UnknownPrefab {
                prefab: name.to_owned(),
            })
    }

    fn commit_at(&mut self, cell: GridCell, quarter_turns: u8) -> Result<PlacementResult, SimulationError> {
        for _ in 0..quarter_turns % QUARTER_TURNS_PER_REVOLUTION {
            self.rotate_placement()?;
        }
        self.update_pointer(self.grid.cell_center(cell))?;
        match self.lock_placement() {
            Ok(_) => self.confirm_placement(),
            Err(err) => {
                self.cancel_placement()?;
                Err(err)
            }
        }
    }

    /// Spend the current price of `item`. Returns the price paid.
    fn charge(&mut self, item: &str) -> Result<u64, SimulationError> {
        let price = self.shop.price(item)?;
        if !self.wallet.try_spend_money(price) {
            return Err(SimulationError::InsufficientFunds {
                item: item.to_owned(),
                price,
                balance: self.wallet.balance(),
            });
        }
        if price > 0 {
            self.events.push(CoreEvent::MoneyChanged {
                balance: self.wallet.balance(),
            });
        }
        Ok(price)
    }

    /// Move placement events into the queue and settle their side effects:
    /// refunds for cancelled sessions, pool registration and purchase
    /// confirmation for placed objects. Returns the registered resource.
    ///
    /// Every drained event is queued even when settling one of them fails;
    /// the first failure is returned afterwards.
    fn absorb_placement_events(&mut self) -> Result<Option<ResourceId>, SimulationError> {
        let mut registered = None;
        let mut first_error = None;
        for event in self.placement.drain_events() {
            let at = self.events.len();
            if let Err(err) = self.settle_placement_event(&event, &mut registered) {
                warn!(kind = event.kind(), error = %err, "placement side effect failed");
                first_error.get_or_insert(err);
            }
            self.events.insert(at, event);
        }
        first_error.map_or(Ok(registered), Err)
    }

    /// Apply the side effects of one placement event, queueing follow-up
    /// events as each one lands.
    fn settle_placement_event(
        &mut self,
        event: &CoreEvent,
        registered: &mut Option<ResourceId>,
    ) -> Result<(), SimulationError> {
        match event {
            CoreEvent::PlacementCancelled { refund, .. } if *refund > 0 => {
                let balance = self.wallet.refund_money(*refund)?;
                self.events.push(CoreEvent::MoneyChanged { balance });
            }
            CoreEvent::Placed { object } => {
                if object.is_resource {
                    let id = ResourceId::new();
                    self.pool.register(ResourceRecord::new(
                        id,
                        object.footprint,
                        object.transform.position,
                        object.interaction_points.clone(),
                    ))?;
                    *registered = Some(id);
                    self.events.push(CoreEvent::ResourceRegistered {
                        resource: id,
                        position: object.transform.position,
                    });
                }
                if let Some(item) = &object.shop_item {
                    self.shop.confirm_purchase(item)?;
                    self.events.push(CoreEvent::PurchaseConfirmed {
                        item: item.clone(),
                        price: object.paid,
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }
}
