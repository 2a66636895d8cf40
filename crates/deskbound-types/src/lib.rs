//! Shared type definitions for the Deskbound office simulation.
//!
//! Identifiers, enumerations, grid and world geometry, and the event stream
//! used by every other crate in the workspace. Types flow to `TypeScript`
//! via `ts-rs` for a presentation layer.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for agents, resources and sessions
//! - [`enums`] -- Tiers, task phases, placement modes, cancel reasons
//! - [`geometry`] -- Grid cells, footprints, world points and transforms
//! - [`events`] -- The [`CoreEvent`] stream and placed-object payload

pub mod enums;
pub mod events;
pub mod geometry;
pub mod ids;

pub use enums::{CancelReason, PlacementMode, ShopItemKind, TaskPhase, Tier};
pub use events::{CoreEvent, PlacedObject};
pub use geometry::{
    Footprint, FootprintSize, GridCell, QUARTER_TURNS_PER_REVOLUTION, WorldPoint, WorldTransform,
};
pub use ids::{AgentId, ResourceId, SessionId};
