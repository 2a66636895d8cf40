//! Grid and world-space value types.
//!
//! Grid cells are integer pairs; world points live on the ground plane
//! (`x`, `z`) in floating-point units. The conversion between the two is
//! owned by the world crate's grid transform, not by these types.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Number of quarter turns in a full revolution.
pub const QUARTER_TURNS_PER_REVOLUTION: u8 = 4;

/// An integer grid coordinate. May lie outside any particular grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GridCell {
    /// Column index.
    pub x: i32,
    /// Row index.
    pub y: i32,
}

impl GridCell {
    /// Create a grid cell.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset this cell by unsigned deltas. Returns `None` on overflow.
    pub fn offset(self, dx: u32, dy: u32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add_unsigned(dx)?,
            y: self.y.checked_add_unsigned(dy)?,
        })
    }
}

impl core::fmt::Display for GridCell {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Width and height of a footprint, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FootprintSize {
    /// Extent along the grid's x axis.
    pub width: u32,
    /// Extent along the grid's y axis.
    pub height: u32,
}

impl FootprintSize {
    /// Create a size. Zero extents are representable; [`is_valid`] rejects them.
    ///
    /// [`is_valid`]: FootprintSize::is_valid
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A footprint must cover at least one cell in each direction.
    pub const fn is_valid(self) -> bool {
        self.width >= 1 && self.height >= 1
    }

    /// The size after a quarter turn: width and height swap.
    pub const fn rotated(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}

/// The rectangle `[origin.x, origin.x + width) x [origin.y, origin.y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Footprint {
    /// Lowest-index corner cell.
    pub origin: GridCell,
    /// Extent of the rectangle.
    pub size: FootprintSize,
}

impl Footprint {
    /// Create a footprint at `origin` with the given size.
    pub const fn new(origin: GridCell, size: FootprintSize) -> Self {
        Self { origin, size }
    }

    /// Number of cells covered.
    pub const fn cell_count(&self) -> u64 {
        // u32 * u32 always fits in u64.
        (self.size.width as u64).saturating_mul(self.size.height as u64)
    }

    /// Whether `cell` lies inside the rectangle.
    pub fn contains(&self, cell: GridCell) -> bool {
        let dx = i64::from(cell.x).saturating_sub(i64::from(self.origin.x));
        let dy = i64::from(cell.y).saturating_sub(i64::from(self.origin.y));
        (0..i64::from(self.size.width)).contains(&dx) && (0..i64::from(self.size.height)).contains(&dy)
    }

    /// Whether two footprints share at least one cell.
    pub fn overlaps(&self, other: &Self) -> bool {
        let a_x0 = i64::from(self.origin.x);
        let a_y0 = i64::from(self.origin.y);
        let b_x0 = i64::from(other.origin.x);
        let b_y0 = i64::from(other.origin.y);
        let a_x1 = a_x0.saturating_add(i64::from(self.size.width));
        let a_y1 = a_y0.saturating_add(i64::from(self.size.height));
        let b_x1 = b_x0.saturating_add(i64::from(other.size.width));
        let b_y1 = b_y0.saturating_add(i64::from(other.size.height));
        a_x0 < b_x1 && b_x0 < a_x1 && a_y0 < b_y1 && b_y0 < a_y1
    }

    /// Iterate every covered cell, row by row. Cells whose coordinates would
    /// overflow `i32` are skipped.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        (0..self.size.height).flat_map(move |dy| {
            (0..self.size.width).filter_map(move |dx| self.origin.offset(dx, dy))
        })
    }
}

/// A point on the world ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldPoint {
    /// World x coordinate.
    pub x: f64,
    /// World z coordinate (the ground plane's second axis).
    pub z: f64,
}

impl WorldPoint {
    /// The world origin.
    pub const ORIGIN: Self = Self { x: 0.0, z: 0.0 };

    /// Create a world point.
    pub const fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.z - self.z)
    }

    /// Component-wise sum.
    pub const fn plus(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.z + other.z)
    }

    /// Component-wise difference `self - other`.
    pub const fn minus(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.z - other.z)
    }

    /// Scale both components.
    pub const fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.z * factor)
    }

    /// Length of the vector from the origin.
    pub fn length(self) -> f64 {
        self.x.hypot(self.z)
    }

    /// The unit vector in this direction, or `fallback` for a (near) zero vector.
    pub fn normalized_or(self, fallback: Self) -> Self {
        let length = self.length();
        if length <= f64::EPSILON {
            fallback
        } else {
            self.scaled(length.recip())
        }
    }

    /// Rotate clockwise (seen from above) by `turns` quarter turns.
    pub const fn rotated_quarter_turns(self, turns: u8) -> Self {
        match turns % QUARTER_TURNS_PER_REVOLUTION {
            0 => self,
            1 => Self::new(self.z, -self.x),
            2 => Self::new(-self.x, -self.z),
            _ => Self::new(-self.z, self.x),
        }
    }
}

/// Final world placement of an object: position of its footprint centre and
/// its orientation in quarter turns (0..=3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldTransform {
    /// World position of the footprint's visual centre.
    pub position: WorldPoint,
    /// Clockwise quarter turns applied since the prefab's default orientation.
    pub quarter_turns: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn footprint_contains_its_rectangle_only() {
        let fp = Footprint::new(GridCell::new(5, 5), FootprintSize::new(2, 2));
        assert!(fp.contains(GridCell::new(5, 5)));
        assert!(fp.contains(GridCell::new(6, 6)));
        assert!(!fp.contains(GridCell::new(7, 5)));
        assert!(!fp.contains(GridCell::new(4, 5)));
        assert_eq!(fp.cells().count(), 4);
        assert_eq!(fp.cell_count(), 4);
    }

    #[test]
    fn overlap_is_exclusive_at_edges() {
        let a = Footprint::new(GridCell::new(0, 0), FootprintSize::new(2, 1));
        let touching = Footprint::new(GridCell::new(2, 0), FootprintSize::new(1, 1));
        let crossing = Footprint::new(GridCell::new(1, 0), FootprintSize::new(1, 3));
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&crossing));
        assert!(crossing.overlaps(&a));
    }

    #[test]
    fn rotated_size_swaps_extents() {
        let size = FootprintSize::new(2, 1);
        assert_eq!(size.rotated(), FootprintSize::new(1, 2));
        assert!(!FootprintSize::new(0, 3).is_valid());
    }

    #[test]
    fn quarter_turns_cycle() {
        let p = WorldPoint::new(1.0, 0.0);
        let once = p.rotated_quarter_turns(1);
        assert!(close(once.x, 0.0) && close(once.z, -1.0));
        let full = p.rotated_quarter_turns(4);
        assert!(close(full.x, 1.0) && close(full.z, 0.0));
    }

    #[test]
    fn zero_vector_normalizes_to_fallback() {
        let fallback = WorldPoint::new(0.0, 1.0);
        let n = WorldPoint::ORIGIN.normalized_or(fallback);
        assert!(close(n.x, 0.0) && close(n.z, 1.0));
        let unit = WorldPoint::new(3.0, 4.0).normalized_or(fallback);
        assert!(close(unit.length(), 1.0));
    }
}
