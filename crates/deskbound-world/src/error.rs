//! Error types for the `deskbound-world` crate.
//!
//! Grid construction problems surface as [`WorldError`]; misuse of the
//! placement controller surfaces as [`PlacementError`]. An invalid position
//! during free-float preview is not an error: it is a validity flag.

use deskbound_types::{GridCell, SessionId};

/// Errors raised while building the occupancy grid or its transform.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The grid must have at least one row and one column.
    #[error("grid dimensions must be non-zero, got {width}x{height}")]
    EmptyGrid {
        /// Requested width in cells.
        width: u32,
        /// Requested height in cells.
        height: u32,
    },

    /// Width times height does not fit in memory addressing.
    #[error("grid of {width}x{height} cells is too large")]
    GridTooLarge {
        /// Requested width in cells.
        width: u32,
        /// Requested height in cells.
        height: u32,
    },

    /// The cell size must be a finite, strictly positive number.
    #[error("cell size must be finite and positive, got {cell_size}")]
    InvalidCellSize {
        /// Rejected cell size.
        cell_size: f64,
    },

    /// The grid origin or rotation is not a finite number.
    #[error("grid transform contains a non-finite value")]
    NonFiniteTransform,
}

/// Errors raised by [`PlacementController`](crate::PlacementController)
/// operations called in the wrong state.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    /// The operation needs an active session and there is none.
    #[error("no placement session is active")]
    NoActiveSession,

    /// Confirm was called before the ghost was locked.
    #[error("session {session} is not locked")]
    NotLocked {
        /// The free-floating session.
        session: SessionId,
    },

    /// Pointer updates and lock requests are ignored once locked.
    #[error("session {session} is already locked at {cell}")]
    AlreadyLocked {
        /// The locked session.
        session: SessionId,
        /// The locked anchor cell.
        cell: GridCell,
    },

    /// Lock was requested while the ghost is over an invalid position.
    #[error("session {session} cannot lock: position is not placeable")]
    InvalidPosition {
        /// The active session.
        session: SessionId,
    },

    /// The prefab has no usable footprint; the session was aborted.
    #[error("prefab `{prefab}` has no valid footprint")]
    MalformedPrefab {
        /// Name of the rejected prefab.
        prefab: String,
    },
}
