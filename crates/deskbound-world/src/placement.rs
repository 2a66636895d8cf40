//! Interactive placement sessions.
//!
//! A session moves a ghost footprint around the grid (free-float), anchors
//! it at a cell (locked) and finally commits it (confirm) or throws it away
//! (cancel). The [`PlacementController`] owns at most one session; starting
//! a new one force-cancels the old one.
//!
//! The controller never touches money. Every session that ends without
//! placing emits exactly one [`CoreEvent::PlacementCancelled`] carrying the
//! pending cost, and the caller turns that into a refund.

use deskbound_types::{
    CancelReason, CoreEvent, Footprint, FootprintSize, GridCell, PlacedObject, PlacementMode,
    QUARTER_TURNS_PER_REVOLUTION, SessionId, WorldPoint, WorldTransform,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::PlacementError;
use crate::grid::{GridTransform, OccupancyGrid};

/// A placeable object definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabDef {
    /// Unique prefab name.
    pub name: String,
    /// Footprint at the default orientation. `None` marks a broken prefab.
    #[serde(default)]
    pub footprint: Option<FootprintSize>,
    /// Where an employee stands to use the object, relative to the footprint
    /// centre at the default orientation.
    #[serde(default)]
    pub interaction_offsets: Vec<WorldPoint>,
    /// Whether a placed instance becomes an assignable resource.
    #[serde(default)]
    pub resource: bool,
}

impl PrefabDef {
    /// The footprint size, if present and at least one cell in each direction.
    pub fn valid_footprint(&self) -> Option<FootprintSize> {
        self.footprint.filter(|size| size.is_valid())
    }
}

/// A purchase paid up front and settled when the session ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingPurchase {
    /// Shop item that was bought, `None` for free placements.
    pub item: Option<String>,
    /// Coins already spent; refunded if the session ends without placing.
    pub cost: u64,
}

impl PendingPurchase {
    /// A placement that was not bought from the shop.
    pub const fn free() -> Self {
        Self { item: None, cost: 0 }
    }
}

/// One frame of pointer input, already projected onto the ground plane.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerInput {
    /// Ground point under the pointer, if the pointer hits the floor.
    pub ground_point: Option<WorldPoint>,
    /// Primary button pressed this frame.
    pub primary_click: bool,
    /// Secondary button pressed this frame.
    pub secondary_click: bool,
    /// Scroll wheel movement this frame.
    pub scroll_delta: f64,
}

/// Result of a confirm attempt on a locked session.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    /// The footprint was committed and the session ended.
    Placed(PlacedObject),
    /// The footprint is no longer free; the session stays locked.
    Rejected {
        /// The locked anchor cell.
        cell: GridCell,
    },
}

/// One in-progress placement.
#[derive(Debug, Clone)]
pub struct PlacementSession {
    id: SessionId,
    prefab: PrefabDef,
    size: FootprintSize,
    quarter_turns: u8,
    mode: PlacementMode,
    cell: Option<GridCell>,
    valid: bool,
    announced: bool,
    pending: PendingPurchase,
}

impl PlacementSession {
    /// Session identifier.
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// The prefab being placed.
    pub const fn prefab(&self) -> &PrefabDef {
        &self.prefab
    }

    /// Free-float or locked.
    pub const fn mode(&self) -> PlacementMode {
        self.mode
    }

    /// Quarter turns applied so far (0..=3).
    pub const fn quarter_turns(&self) -> u8 {
        self.quarter_turns
    }

    /// Current footprint size, after rotation.
    pub const fn size(&self) -> FootprintSize {
        self.size
    }

    /// Last validity result for the renderer.
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// The purchase this session settles.
    pub const fn pending(&self) -> &PendingPurchase {
        &self.pending
    }

    /// Anchor cell: the locked cell, or the last cell under the pointer.
    pub const fn cell(&self) -> Option<GridCell> {
        self.cell
    }

    /// Footprint at the anchor cell, if the pointer has been seen.
    pub fn footprint(&self) -> Option<Footprint> {
        self.cell.map(|cell| Footprint::new(cell, self.size))
    }

    /// Snapped world position of the ghost.
    pub fn ghost_position(&self, transform: &GridTransform) -> Option<WorldPoint> {
        self.footprint().map(|fp| transform.footprint_center(&fp))
    }

    /// Re-run the area check. Returns `true` if a validity event is due:
    /// the first check with a cell, or any later change.
    fn revalidate(&mut self, grid: &OccupancyGrid) -> bool {
        let valid = self.footprint().is_some_and(|fp| grid.is_area_free(&fp));
        let first = !self.announced && self.cell.is_some();
        let changed = first || valid != self.valid;
        self.valid = valid;
        self.announced |= self.cell.is_some();
        changed
    }

    fn validity_event(&self) -> Option<CoreEvent> {
        self.cell.map(|cell| CoreEvent::PlacementValidityChanged {
            session: self.id,
            cell,
            valid: self.valid,
        })
    }

    fn placed_object(&self, footprint: Footprint, transform: &GridTransform) -> PlacedObject {
        let local_center = transform.footprint_local_center(&footprint);
        let interaction_points = self
            .prefab
            .interaction_offsets
            .iter()
            .map(|offset| {
                transform.local_to_world(local_center.plus(offset.rotated_quarter_turns(self.quarter_turns)))
            })
            .collect();
        PlacedObject {
            session: self.id,
            prefab: self.prefab.name.clone(),
            footprint,
            transform: WorldTransform {
                position: transform.local_to_world(local_center),
                quarter_turns: self.quarter_turns,
            },
            is_resource: self.prefab.resource,
            interaction_points,
            shop_item: self.pending.item.clone(),
            paid: self.pending.cost,
        }
    }
}

/// Owner of the single active placement session.
#[derive(Debug, Default)]
pub struct PlacementController {
    session: Option<PlacementSession>,
    events: Vec<CoreEvent>,
}

impl PlacementController {
    /// A controller with no active session.
    pub const fn new() -> Self {
        Self {
            session: None,
            events: Vec::new(),
        }
    }

    /// The active session, if any.
    pub const fn session(&self) -> Option<&PlacementSession> {
        self.session.as_ref()
    }

    /// Whether a session is in progress.
    pub const fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Begin placing `prefab`.
    ///
    /// An active session is cancelled first as superseded. A prefab without a
    /// valid footprint aborts immediately with a cancellation event carrying
    /// the refund.
    pub fn start(&mut self, prefab: PrefabDef, pending: PendingPurchase) -> Result<SessionId, PlacementError> {
        if self.session.is_some() {
            self.end_unplaced(CancelReason::Superseded);
        }

        let Some(size) = prefab.valid_footprint() else {
            let session = SessionId::new();
            warn!(session_id = %session, prefab = %prefab.name, "prefab has no valid footprint");
            self.events.push(CoreEvent::PlacementCancelled {
                session,
                reason: CancelReason::MalformedPrefab,
                item: pending.item,
                refund: pending.cost,
            });
            return Err(PlacementError::MalformedPrefab { prefab: prefab.name });
        };

        let id = SessionId::new();
        info!(session_id = %id, prefab = %prefab.name, cost = pending.cost, "placement started");
        self.session = Some(PlacementSession {
            id,
            prefab,
            size,
            quarter_turns: 0,
            mode: PlacementMode::FreeFloat,
            cell: None,
            valid: false,
            announced: false,
            pending,
        });
        Ok(id)
    }

    /// Move the free-floating ghost to the cell under `point`.
    ///
    /// Returns the new validity. Emits a validity event for the first
    /// position of the session and after that only on change.
    pub fn update_pointer(&mut self, point: WorldPoint, grid: &OccupancyGrid) -> Result<bool, PlacementError> {
        let session = self.session.as_mut().ok_or(PlacementError::NoActiveSession)?;
        if let (PlacementMode::Locked, Some(cell)) = (session.mode, session.cell) {
            return Err(PlacementError::AlreadyLocked {
                session: session.id,
                cell,
            });
        }
        let cell = grid.world_to_cell(point);
        let moved = session.cell != Some(cell);
        session.cell = Some(cell);
        if session.revalidate(grid) {
            self.events.extend(session.validity_event());
        }
        if moved {
            debug!(session_id = %session.id, %cell, valid = session.valid, "ghost moved");
        }
        Ok(session.valid)
    }

    /// Rotate the ghost a quarter turn.
    ///
    /// Width and height swap. The anchor cell stays fixed in both states, so
    /// a locked ghost never drifts. Returns the new validity.
    pub fn rotate(&mut self, grid: &OccupancyGrid) -> Result<bool, PlacementError> {
        let session = self.session.as_mut().ok_or(PlacementError::NoActiveSession)?;
        session.size = session.size.rotated();
        session.quarter_turns = session
            .quarter_turns
            .checked_add(1)
            .map_or(0, |turns| turns % QUARTER_TURNS_PER_REVOLUTION);
        if session.revalidate(grid) {
            self.events.extend(session.validity_event());
        }
        debug!(
            session_id = %session.id,
            quarter_turns = session.quarter_turns,
            valid = session.valid,
            "ghost rotated"
        );
        Ok(session.valid)
    }

    /// Anchor the ghost at its current cell. Only allowed while valid.
    pub fn confirm_lock(&mut self, grid: &OccupancyGrid) -> Result<GridCell, PlacementError> {
        let session = self.session.as_mut().ok_or(PlacementError::NoActiveSession)?;
        if let (PlacementMode::Locked, Some(cell)) = (session.mode, session.cell) {
            return Err(PlacementError::AlreadyLocked {
                session: session.id,
                cell,
            });
        }
        if session.revalidate(grid) {
            self.events.extend(session.validity_event());
        }
        let cell = match session.cell {
            Some(cell) if session.valid => cell,
            _ => return Err(PlacementError::InvalidPosition { session: session.id }),
        };
        session.mode = PlacementMode::Locked;
        info!(session_id = %session.id, %cell, "placement locked");
        self.events.push(CoreEvent::PlacementLocked {
            session: session.id,
            cell,
        });
        Ok(cell)
    }

    /// Commit a locked session.
    ///
    /// Re-checks the area first. If another object took any of the cells
    /// since locking, the session stays locked and [`ConfirmOutcome::Rejected`]
    /// is returned; nothing is refunded.
    pub fn confirm(&mut self, grid: &mut OccupancyGrid) -> Result<ConfirmOutcome, PlacementError> {
        let session = self.session.as_mut().ok_or(PlacementError::NoActiveSession)?;
        let (PlacementMode::Locked, Some(cell)) = (session.mode, session.cell) else {
            return Err(PlacementError::NotLocked { session: session.id });
        };
        if session.revalidate(grid) {
            self.events.extend(session.validity_event());
        }
        if !session.valid {
            info!(session_id = %session.id, %cell, "placement rejected, area no longer free");
            self.events.push(CoreEvent::PlacementRejected {
                session: session.id,
                cell,
            });
            return Ok(ConfirmOutcome::Rejected { cell });
        }

        let footprint = Footprint::new(cell, session.size);
        grid.occupy(&footprint);
        let object = session.placed_object(footprint, grid.transform());
        info!(
            session_id = %session.id,
            prefab = %object.prefab,
            %cell,
            quarter_turns = object.transform.quarter_turns,
            "placement confirmed"
        );
        self.events.push(CoreEvent::Placed {
            object: object.clone(),
        });
        self.session = None;
        Ok(ConfirmOutcome::Placed(object))
    }

    /// Abandon the active session from either state. The grid is untouched.
    ///
    /// Returns the pending cost to refund.
    pub fn cancel(&mut self) -> Result<u64, PlacementError> {
        if self.session.is_none() {
            return Err(PlacementError::NoActiveSession);
        }
        Ok(self.end_unplaced(CancelReason::Explicit))
    }

    /// Apply one frame of pointer input.
    ///
    /// Scroll rotates in either state; a secondary click cancels; while
    /// free-floating, the ground point moves the ghost and a primary click
    /// over a valid position locks it. Does nothing without a session.
    pub fn handle_input(&mut self, input: &PointerInput, grid: &OccupancyGrid) -> Result<(), PlacementError> {
        let Some(mode) = self.session.as_ref().map(PlacementSession::mode) else {
            return Ok(());
        };
        if input.scroll_delta.abs() > f64::EPSILON {
            self.rotate(grid)?;
        }
        if input.secondary_click {
            self.cancel()?;
            return Ok(());
        }
        if mode == PlacementMode::Locked {
            return Ok(());
        }
        if let Some(point) = input.ground_point {
            let valid = self.update_pointer(point, grid)?;
            if input.primary_click && valid {
                self.confirm_lock(grid)?;
            }
        }
        Ok(())
    }

    /// Take all events emitted since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        std::mem::take(&mut self.events)
    }

    fn end_unplaced(&mut self, reason: CancelReason) -> u64 {
        let Some(session) = self.session.take() else {
            return 0;
        };
        info!(
            session_id = %session.id,
            reason = ?reason,
            refund = session.pending.cost,
            "placement cancelled"
        );
        let refund = session.pending.cost;
        self.events.push(CoreEvent::PlacementCancelled {
            session: session.id,
            reason,
            item: session.pending.item,
            refund,
        });
        refund
    }
}
