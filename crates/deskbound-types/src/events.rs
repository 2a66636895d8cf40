//! Observable events emitted by the simulation core.
//!
//! Every state change a presentation layer might react to is published as a
//! [`CoreEvent`]. Events are collected in order during a step and handed out
//! in batches; nothing in the core depends on them being consumed.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{CancelReason, Tier};
use crate::geometry::{Footprint, GridCell, WorldPoint, WorldTransform};
use crate::ids::{AgentId, ResourceId, SessionId};

/// An object committed to the grid by a successful placement confirm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlacedObject {
    /// Session that produced the object.
    pub session: SessionId,
    /// Name of the prefab that was placed.
    pub prefab: String,
    /// Cells the object now occupies.
    pub footprint: Footprint,
    /// Final world position and orientation.
    pub transform: WorldTransform,
    /// Whether the object is an assignable resource (a table).
    pub is_resource: bool,
    /// World-space interaction points, already rotated with the object.
    pub interaction_points: Vec<WorldPoint>,
    /// Shop item whose purchase this placement completes, if any.
    pub shop_item: Option<String>,
    /// Coins paid up front for the shop item.
    pub paid: u64,
}

/// A single observable change in the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum CoreEvent {
    /// The free-floating ghost changed between valid and invalid.
    PlacementValidityChanged {
        /// Active session.
        session: SessionId,
        /// Cell the ghost is anchored at.
        cell: GridCell,
        /// Whether the footprint at `cell` is placeable.
        valid: bool,
    },
    /// The ghost was locked at a cell and awaits confirmation.
    PlacementLocked {
        /// Active session.
        session: SessionId,
        /// Locked anchor cell.
        cell: GridCell,
    },
    /// A placement was confirmed and committed to the grid.
    Placed {
        /// The committed object.
        object: PlacedObject,
    },
    /// A confirm was refused because the footprint is no longer free.
    PlacementRejected {
        /// Session that stays locked.
        session: SessionId,
        /// Locked anchor cell.
        cell: GridCell,
    },
    /// A session ended without placing anything.
    PlacementCancelled {
        /// The ended session.
        session: SessionId,
        /// Why it ended.
        reason: CancelReason,
        /// Shop item that had been paid for, if any.
        item: Option<String>,
        /// Coins returned to the wallet.
        refund: u64,
    },
    /// A placed table became available to employees.
    ResourceRegistered {
        /// New resource.
        resource: ResourceId,
        /// World position of the table.
        position: WorldPoint,
    },
    /// A table was demolished and its record dropped.
    ResourceRemoved {
        /// Removed resource.
        resource: ResourceId,
        /// Agent that was assigned to it at removal time.
        displaced: Option<AgentId>,
    },
    /// An employee entered the world.
    AgentSpawned {
        /// New agent.
        agent: AgentId,
        /// Its seniority tier.
        tier: Tier,
    },
    /// An employee claimed a free table and started walking to it.
    ResourceClaimed {
        /// Claiming agent.
        agent: AgentId,
        /// Claimed table.
        resource: ResourceId,
        /// Interaction point the agent walks to.
        destination: WorldPoint,
    },
    /// An employee arrived at its table and sat down.
    StartedWorking {
        /// Working agent.
        agent: AgentId,
        /// Table in use.
        resource: ResourceId,
        /// Unit vector from the agent towards the table.
        facing: WorldPoint,
        /// Cosmetic work animation index.
        work_style: u8,
    },
    /// One completed work interval paid out.
    WorkTick {
        /// Working agent.
        agent: AgentId,
        /// Table in use.
        resource: ResourceId,
        /// Coins credited.
        amount: u64,
    },
    /// An employee's task was interrupted and it went back to seeking.
    Interrupted {
        /// Interrupted agent.
        agent: AgentId,
        /// Table it had been assigned, if any.
        resource: Option<ResourceId>,
    },
    /// The wallet balance changed.
    MoneyChanged {
        /// Balance after the change.
        balance: u64,
    },
    /// A paid shop item was delivered and its price step advanced.
    PurchaseConfirmed {
        /// Shop item name.
        item: String,
        /// Price that was paid.
        price: u64,
    },
}

impl CoreEvent {
    /// Short event name for log lines.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PlacementValidityChanged { .. } => "placement_validity_changed",
            Self::PlacementLocked { .. } => "placement_locked",
            Self::Placed { .. } => "placed",
            Self::PlacementRejected { .. } => "placement_rejected",
            Self::PlacementCancelled { .. } => "placement_cancelled",
            Self::ResourceRegistered { .. } => "resource_registered",
            Self::ResourceRemoved { .. } => "resource_removed",
            Self::AgentSpawned { .. } => "agent_spawned",
            Self::ResourceClaimed { .. } => "resource_claimed",
            Self::StartedWorking { .. } => "started_working",
            Self::WorkTick { .. } => "work_tick",
            Self::Interrupted { .. } => "interrupted",
            Self::MoneyChanged { .. } => "money_changed",
            Self::PurchaseConfirmed { .. } => "purchase_confirmed",
        }
    }
}
