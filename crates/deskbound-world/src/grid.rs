//! The occupancy grid and its world-space transform.
//!
//! [`OccupancyGrid`] is a fixed-size boolean map: a cell is occupied iff a
//! committed footprint covers it. Only two paths mutate it: a confirmed
//! placement ([`OccupancyGrid::occupy`]) and resource teardown
//! ([`OccupancyGrid::free`]).
//!
//! [`GridTransform`] maps ground-plane world points to cells by flooring the
//! local coordinate divided by the cell size, and maps cells back to the
//! world-space centre of the cell. The two directions are exact inverses on
//! cell centres.

use deskbound_types::{Footprint, GridCell, WorldPoint};

use crate::error::WorldError;

/// Floor a local coordinate to a cell index, saturating at the `i32` range.
#[allow(clippy::cast_possible_truncation)]
fn floor_to_index(value: f64) -> i32 {
    // NaN casts to 0; the clamp keeps the cast in range for everything else.
    value
        .floor()
        .clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

/// Placement of the grid in the world: origin, rotation and cell size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTransform {
    origin: WorldPoint,
    sin: f64,
    cos: f64,
    cell_size: f64,
}

impl GridTransform {
    /// Build a transform.
    ///
    /// `rotation_degrees` turns the grid counter-clockwise in the `x`/`z`
    /// plane around `origin`.
    pub fn new(origin: WorldPoint, rotation_degrees: f64, cell_size: f64) -> Result<Self, WorldError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(WorldError::InvalidCellSize { cell_size });
        }
        if !origin.x.is_finite() || !origin.z.is_finite() || !rotation_degrees.is_finite() {
            return Err(WorldError::NonFiniteTransform);
        }
        let (sin, cos) = rotation_degrees.to_radians().sin_cos();
        Ok(Self {
            origin,
            sin,
            cos,
            cell_size,
        })
    }

    /// An axis-aligned transform at the world origin.
    pub fn axis_aligned(cell_size: f64) -> Result<Self, WorldError> {
        Self::new(WorldPoint::ORIGIN, 0.0, cell_size)
    }

    /// Edge length of one cell in world units.
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Convert a world point into the grid's local frame.
    pub fn world_to_local(&self, point: WorldPoint) -> WorldPoint {
        let d = point.minus(self.origin);
        WorldPoint::new(
            d.x.mul_add(self.cos, d.z * self.sin),
            d.z.mul_add(self.cos, -(d.x * self.sin)),
        )
    }

    /// Convert a point in the grid's local frame into world space.
    pub fn local_to_world(&self, local: WorldPoint) -> WorldPoint {
        WorldPoint::new(
            local.x.mul_add(self.cos, -(local.z * self.sin)),
            local.x.mul_add(self.sin, local.z * self.cos),
        )
        .plus(self.origin)
    }

    /// The cell containing `point`. The result may lie outside any grid.
    pub fn world_to_cell(&self, point: WorldPoint) -> GridCell {
        let local = self.world_to_local(point);
        GridCell::new(
            floor_to_index(local.x / self.cell_size),
            floor_to_index(local.z / self.cell_size),
        )
    }

    /// World-space centre of `cell`.
    pub fn cell_center(&self, cell: GridCell) -> WorldPoint {
        self.local_to_world(WorldPoint::new(
            (f64::from(cell.x) + 0.5) * self.cell_size,
            (f64::from(cell.y) + 0.5) * self.cell_size,
        ))
    }

    /// Local-frame centre of a footprint's rectangle.
    pub fn footprint_local_center(&self, footprint: &Footprint) -> WorldPoint {
        let half_w = f64::from(footprint.size.width) / 2.0;
        let half_h = f64::from(footprint.size.height) / 2.0;
        WorldPoint::new(
            (f64::from(footprint.origin.x) + half_w) * self.cell_size,
            (f64::from(footprint.origin.y) + half_h) * self.cell_size,
        )
    }

    /// World-space visual centre of a footprint.
    ///
    /// For an even extent the centre falls on a grid line, for an odd extent
    /// on the middle cell's centre.
    pub fn footprint_center(&self, footprint: &Footprint) -> WorldPoint {
        self.local_to_world(self.footprint_local_center(footprint))
    }
}

/// Fixed-size occupancy map over `[0, width) x [0, height)`.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    width: u32,
    height: u32,
    cells: Vec<bool>,
    transform: GridTransform,
}

impl OccupancyGrid {
    /// Create an empty grid.
    pub fn new(width: u32, height: u32, transform: GridTransform) -> Result<Self, WorldError> {
        if width == 0 || height == 0 {
            return Err(WorldError::EmptyGrid { width, height });
        }
        let len = usize::try_from(u64::from(width).saturating_mul(u64::from(height)))
            .map_err(|_overflow| WorldError::GridTooLarge { width, height })?;
        Ok(Self {
            width,
            height,
            cells: vec![false; len],
            transform,
        })
    }

    /// Number of columns.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// The world/grid transform.
    pub const fn transform(&self) -> &GridTransform {
        &self.transform
    }

    /// Shorthand for [`GridTransform::world_to_cell`].
    pub fn world_to_cell(&self, point: WorldPoint) -> GridCell {
        self.transform.world_to_cell(point)
    }

    /// Shorthand for [`GridTransform::cell_center`].
    pub fn cell_center(&self, cell: GridCell) -> WorldPoint {
        self.transform.cell_center(cell)
    }

    /// Whether `cell` lies inside the grid.
    pub fn in_bounds(&self, cell: GridCell) -> bool {
        self.index(cell).is_some()
    }

    /// Free iff in bounds and not occupied.
    pub fn is_free(&self, cell: GridCell) -> bool {
        self.index(cell)
            .and_then(|i| self.cells.get(i))
            .is_some_and(|occupied| !occupied)
    }

    /// True iff every cell of the rectangle is in bounds and free.
    pub fn is_area_free(&self, footprint: &Footprint) -> bool {
        let far_corner = footprint.origin.offset(
            footprint.size.width.saturating_sub(1),
            footprint.size.height.saturating_sub(1),
        );
        far_corner.is_some() && footprint.cells().all(|cell| self.is_free(cell))
    }

    /// Mark every in-bounds cell of the rectangle occupied. Out-of-bounds
    /// cells are skipped. Returns how many cells changed state.
    pub fn occupy(&mut self, footprint: &Footprint) -> usize {
        self.set_area(footprint, true)
    }

    /// Clear every in-bounds cell of the rectangle. Out-of-bounds cells are
    /// skipped. Returns how many cells changed state.
    pub fn free(&mut self, footprint: &Footprint) -> usize {
        self.set_area(footprint, false)
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|occupied| **occupied).count()
    }

    fn set_area(&mut self, footprint: &Footprint, occupied: bool) -> usize {
        let mut changed: usize = 0;
        for cell in footprint.cells() {
            let Some(slot) = self.index(cell).and_then(|i| self.cells.get_mut(i)) else {
                continue;
            };
            if *slot != occupied {
                *slot = occupied;
                changed = changed.saturating_add(1);
            }
        }
        changed
    }

    fn index(&self, cell: GridCell) -> Option<usize> {
        let x = u32::try_from(cell.x).ok()?;
        let y = u32::try_from(cell.y).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        let row = usize::try_from(y).ok()?.checked_mul(usize::try_from(self.width).ok()?)?;
        row.checked_add(usize::try_from(x).ok()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use deskbound_types::FootprintSize;

    use super::*;

    fn grid(width: u32, height: u32) -> OccupancyGrid {
        OccupancyGrid::new(width, height, GridTransform::axis_aligned(1.0).unwrap()).unwrap()
    }

    fn rect(x: i32, y: i32, w: u32, h: u32) -> Footprint {
        Footprint::new(GridCell::new(x, y), FootprintSize::new(w, h))
    }

    #[test]
    fn rejects_empty_grid_and_bad_cell_size() {
        let transform = GridTransform::axis_aligned(1.0).unwrap();
        assert!(matches!(
            OccupancyGrid::new(0, 4, transform),
            Err(WorldError::EmptyGrid { .. })
        ));
        assert!(matches!(
            GridTransform::axis_aligned(0.0),
            Err(WorldError::InvalidCellSize { .. })
        ));
        assert!(matches!(
            GridTransform::axis_aligned(f64::NAN),
            Err(WorldError::InvalidCellSize { .. })
        ));
    }

    #[test]
    fn out_of_bounds_is_never_free() {
        let g = grid(10, 10);
        assert!(g.is_free(GridCell::new(0, 0)));
        assert!(g.is_free(GridCell::new(9, 9)));
        assert!(!g.is_free(GridCell::new(10, 0)));
        assert!(!g.is_free(GridCell::new(-1, 3)));
        assert!(!g.is_area_free(&rect(9, 9, 2, 1)));
    }

    #[test]
    fn occupancy_exclusivity() {
        let mut g = grid(10, 10);
        let [desk, shelf, block] = [rect(0, 0, 2, 2), rect(3, 1, 1, 3), rect(6, 6, 4, 4)];
        let placed = [desk, shelf, block];
        for fp in &placed {
            assert!(g.is_area_free(fp));
            g.occupy(fp);
        }
        for fp in &placed {
            assert!(!g.is_area_free(fp));
            for cell in fp.cells() {
                assert!(!g.is_area_free(&Footprint::new(cell, FootprintSize::new(1, 1))));
            }
        }
        assert!(g.is_area_free(&rect(0, 5, 3, 3)));
        assert!(g.is_area_free(&rect(4, 0, 2, 6)));

        g.free(&desk);
        assert!(g.is_area_free(&desk));
        assert!(!g.is_area_free(&shelf));
        assert_eq!(g.occupied_count(), 3 + 16);
    }

    #[test]
    fn occupy_skips_cells_off_the_edge() {
        let mut g = grid(4, 4);
        assert_eq!(g.occupy(&rect(3, 3, 2, 2)), 1);
        assert_eq!(g.occupied_count(), 1);
        assert_eq!(g.free(&rect(-1, -1, 10, 10)), 1);
        assert_eq!(g.occupied_count(), 0);
    }

    #[test]
    fn coordinate_round_trip_axis_aligned() {
        let g = OccupancyGrid::new(12, 7, GridTransform::axis_aligned(1.5).unwrap()).unwrap();
        for x in -3..15 {
            for y in -3..10 {
                let cell = GridCell::new(x, y);
                assert_eq!(g.world_to_cell(g.cell_center(cell)), cell);
            }
        }
    }

    #[test]
    fn coordinate_round_trip_rotated_and_offset() {
        let transform = GridTransform::new(WorldPoint::new(-4.25, 10.0), 37.0, 0.8).unwrap();
        for x in -5..20 {
            for y in -5..20 {
                let cell = GridCell::new(x, y);
                assert_eq!(transform.world_to_cell(transform.cell_center(cell)), cell);
            }
        }
    }

    #[test]
    fn footprint_center_shifts_half_a_cell_for_even_sizes() {
        let t = GridTransform::axis_aligned(2.0).unwrap();
        let even = t.footprint_center(&rect(5, 5, 2, 2));
        assert!((even.x - 12.0).abs() < 1e-9 && (even.z - 12.0).abs() < 1e-9);
        let odd = t.footprint_center(&rect(5, 5, 1, 3));
        let cell = t.cell_center(GridCell::new(5, 6));
        assert!((odd.x - cell.x).abs() < 1e-9 && (odd.z - cell.z).abs() < 1e-9);
    }
}
