// Dense 3D cell array.
//
// Cells are stored in a flat `Vec<Cell>` indexed by
// `x + z * size_x + y * size_x * size_z`, giving O(1) lookup. The array is
// allocated once from `GridConfig` and never resized; cells are mutated in
// place by classification, occupation and overrides.
//
// Out-of-range coordinates are a normal outcome, never a panic: `get`
// returns `None`, area queries clip to the grid, and degenerate query
// parameters return an empty result with a debug log entry.
//
// See also: `cell.rs` for the per-cell record, `classify.rs` for the pass
// that fills in terrain flags, `nav_grid.rs` which owns the `CellGrid`.

use crate::cell::{Cell, CellFlags};
use crate::config::GridConfig;
use crate::types::{CellCoord, WorldPos};
use tacgrid_prng::GridRng;

/// World-space bounds of one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellVolume {
    pub min: WorldPos,
    pub max: WorldPos,
}

impl CellVolume {
    pub fn center(&self) -> WorldPos {
        self.min.lerp(self.max, 0.5)
    }

    pub fn size(&self) -> f32 {
        self.max.x - self.min.x
    }
}

/// Fixed-size grid of cells.
#[derive(Clone, Debug)]
pub struct CellGrid {
    cells: Vec<Cell>,
    size_x: u32,
    size_y: u32,
    size_z: u32,
    cell_size: f32,
    origin: WorldPos,
}

impl CellGrid {
    /// Allocate every cell as empty air with its anchor on the cell floor.
    /// Assumes a validated config.
    pub fn new(config: &GridConfig) -> Self {
        let (size_x, size_y, size_z) = config.dimensions;
        let total = config.cell_count().unwrap_or(0);
        let mut grid = Self {
            cells: Vec::with_capacity(total),
            size_x,
            size_y,
            size_z,
            cell_size: config.cell_size,
            origin: config.origin,
        };
        for i in 0..total {
            let coord = grid.coord_of(i);
            let volume = grid.volume_unchecked(coord);
            let floor_center = WorldPos::new(
                (volume.min.x + volume.max.x) * 0.5,
                volume.min.y,
                (volume.min.z + volume.max.z) * 0.5,
            );
            grid.cells.push(Cell::new(coord, floor_center));
        }
        grid
    }

    pub fn dimensions(&self) -> (u32, u32, u32) {
        (self.size_x, self.size_y, self.size_z)
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn origin(&self) -> WorldPos {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn in_bounds(&self, coord: CellCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && coord.z >= 0
            && (coord.x as u32) < self.size_x
            && (coord.y as u32) < self.size_y
            && (coord.z as u32) < self.size_z
    }

    /// Flat index of a coordinate, `None` if out of bounds.
    pub fn index_of(&self, coord: CellCoord) -> Option<usize> {
        if !self.in_bounds(coord) {
            return None;
        }
        let sx = self.size_x as usize;
        let sz = self.size_z as usize;
        Some(coord.x as usize + coord.z as usize * sx + coord.y as usize * sx * sz)
    }

    /// Inverse of `index_of`. Only meaningful for `index < len()`.
    pub fn coord_of(&self, index: usize) -> CellCoord {
        let sx = self.size_x as usize;
        let sz = self.size_z as usize;
        let x = index % sx;
        let z = (index / sx) % sz;
        let y = index / (sx * sz);
        CellCoord::new(x as i32, y as i32, z as i32)
    }

    pub fn get(&self, coord: CellCoord) -> Option<&Cell> {
        self.index_of(coord).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, coord: CellCoord) -> Option<&mut Cell> {
        self.index_of(coord).map(move |i| &mut self.cells[i])
    }

    /// Passable = exists, is ground, is not obstructed.
    pub fn is_passable(&self, coord: CellCoord) -> bool {
        self.get(coord).is_some_and(Cell::is_passable)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// World-space bounds of a cell, `None` if out of bounds.
    pub fn cell_volume(&self, coord: CellCoord) -> Option<CellVolume> {
        self.in_bounds(coord).then(|| self.volume_unchecked(coord))
    }

    fn volume_unchecked(&self, coord: CellCoord) -> CellVolume {
        let cs = self.cell_size;
        let min = WorldPos::new(
            self.origin.x + coord.x as f32 * cs,
            self.origin.y + coord.y as f32 * cs,
            self.origin.z + coord.z as f32 * cs,
        );
        CellVolume {
            min,
            max: min + WorldPos::new(cs, cs, cs),
        }
    }

    /// Geometric centre of a cell. Defined for any coordinate, including
    /// ones outside the grid.
    pub fn cell_center(&self, coord: CellCoord) -> WorldPos {
        self.volume_unchecked(coord).center()
    }

    /// The cell containing a world position, `None` outside the grid.
    pub fn world_to_cell(&self, pos: WorldPos) -> Option<CellCoord> {
        let local = (pos - self.origin) * (1.0 / self.cell_size);
        if !(local.x.is_finite() && local.y.is_finite() && local.z.is_finite()) {
            return None;
        }
        let coord = CellCoord::new(
            local.x.floor() as i32,
            local.y.floor() as i32,
            local.z.floor() as i32,
        );
        self.in_bounds(coord).then_some(coord)
    }

    // -----------------------------------------------------------------------
    // Area queries
    // -----------------------------------------------------------------------

    /// All in-bounds cells whose coordinate lies within `radius` cells
    /// (Euclidean, inclusive) of `center`. Sorted by flat index.
    pub fn cells_in_radius(&self, center: CellCoord, radius: f32) -> Vec<CellCoord> {
        if !radius.is_finite() || radius <= 0.0 {
            log::debug!("cells_in_radius: degenerate radius {radius} around {center}");
            return Vec::new();
        }
        let reach = radius.floor() as i64;
        let r2 = f64::from(radius) * f64::from(radius);
        let span = |v: i32| {
            let clamp = |w: i64| w.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
            let v = i64::from(v);
            (clamp(v.saturating_sub(reach)), clamp(v.saturating_add(reach)))
        };
        let ((x0, x1), (y0, y1), (z0, z1)) = (span(center.x), span(center.y), span(center.z));
        let min = CellCoord::new(x0, y0, z0);
        let max = CellCoord::new(x1, y1, z1);
        self.cells_in_box(min, max)
            .into_iter()
            .filter(|&c| {
                let d2: f64 = [(c.x, center.x), (c.y, center.y), (c.z, center.z)]
                    .into_iter()
                    .map(|(a, b)| {
                        let d = f64::from(a) - f64::from(b);
                        d * d
                    })
                    .sum();
                d2 <= r2
            })
            .collect()
    }

    /// All in-bounds cells in the inclusive box `[min, max]`, clipped to the
    /// grid. An inverted box is degenerate and yields nothing.
    pub fn cells_in_box(&self, min: CellCoord, max: CellCoord) -> Vec<CellCoord> {
        if min.x > max.x || min.y > max.y || min.z > max.z {
            log::debug!("cells_in_box: inverted box {min}..{max}");
            return Vec::new();
        }
        let lo = CellCoord::new(min.x.max(0), min.y.max(0), min.z.max(0));
        let hi = CellCoord::new(
            max.x.min(last_index(self.size_x)),
            max.y.min(last_index(self.size_y)),
            max.z.min(last_index(self.size_z)),
        );
        let mut out = Vec::new();
        for y in lo.y..=hi.y {
            for z in lo.z..=hi.z {
                for x in lo.x..=hi.x {
                    out.push(CellCoord::new(x, y, z));
                }
            }
        }
        out
    }

    /// Uniformly pick one cell satisfying `filter`. `None` if none match.
    pub fn random_cell_matching<F>(&self, rng: &mut GridRng, filter: F) -> Option<CellCoord>
    where
        F: Fn(&Cell) -> bool,
    {
        let candidates: Vec<CellCoord> = self
            .cells
            .iter()
            .filter(|c| filter(c))
            .map(|c| c.coord)
            .collect();
        if candidates.is_empty() {
            log::debug!("random_cell_matching: no cell satisfies the filter");
        }
        rng.choose(&candidates).copied()
    }

    /// Count cells whose live state contains all of `flags`.
    pub fn count_with(&self, flags: CellFlags) -> usize {
        self.cells.iter().filter(|c| c.state.contains(flags)).count()
    }
}

/// Highest coordinate along an axis of `size` cells.
fn last_index(size: u32) -> i32 {
    i32::try_from(size.saturating_sub(1)).unwrap_or(i32::MAX)
}
