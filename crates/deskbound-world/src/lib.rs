//! Spatial bookkeeping and interactive placement for the Deskbound simulation.
//!
//! # Modules
//!
//! - [`error`] -- Error types for grid construction and placement misuse.
//! - [`grid`] -- [`OccupancyGrid`], the boolean cell map, and
//!   [`GridTransform`], the world/grid coordinate mapping.
//! - [`placement`] -- [`PlacementController`] and the single
//!   [`PlacementSession`] it owns: free-float preview, lock, rotate,
//!   confirm, cancel.

pub mod error;
pub mod grid;
pub mod placement;

pub use error::{PlacementError, WorldError};
pub use grid::{GridTransform, OccupancyGrid};
pub use placement::{
    ConfirmOutcome, PendingPurchase, PlacementController, PlacementSession, PointerInput, PrefabDef,
};
