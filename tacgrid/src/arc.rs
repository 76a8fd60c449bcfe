// Arc trajectory sampler for thrown and lobbed effects.
//
// A parabola is laid between two world positions:
//
//     p(t) = lerp(from, to, t) + UP * 4h * t * (1 - t),   t in [0, 1]
//
// so it leaves `from`, peaks `h` above the straight line at `t = 0.5` and
// lands on `to`. Each attempt samples `samples + 1` evenly spaced points,
// resolves them to cells and rejects the attempt if any sampled cell other
// than the origin and target cells is obstructed. Points outside the grid
// are ignored. Attempts raise the apex by `height_step` each time and the
// first clear one wins.
//
// This is a bounded retry, not a search: it can miss an arc that exists at a
// height it never tries.
//
// See also: `nav_grid.rs` which exposes this as a query.

use crate::config::ArcConfig;
use crate::grid::CellGrid;
use crate::types::{CellCoord, WorldPos};

/// A clear arc found by `sample_arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct ArcTrajectory {
    /// Sampled curve points, `from` first and `to` last.
    pub points: Vec<WorldPos>,
    /// In-grid cells the samples fall in, consecutive duplicates removed.
    pub cells: Vec<CellCoord>,
    /// Apex height above the straight line, world units.
    pub apex_height: f32,
    /// Zero-based index of the attempt that succeeded.
    pub attempt: u32,
}

/// Point at parameter `t` of an arc with apex height `h`.
pub fn arc_point(from: WorldPos, to: WorldPos, h: f32, t: f32) -> WorldPos {
    from.lerp(to, t) + WorldPos::UP * (4.0 * h * t * (1.0 - t))
}

/// Try arcs of increasing height and return the first one whose sampled
/// cells are all unobstructed.
pub fn sample_arc(
    grid: &CellGrid,
    from: WorldPos,
    to: WorldPos,
    config: &ArcConfig,
) -> Option<ArcTrajectory> {
    if config.attempts == 0 || config.samples == 0 {
        log::debug!(
            "sample_arc: degenerate config ({} attempts, {} samples)",
            config.attempts,
            config.samples
        );
        return None;
    }
    let origin = grid.world_to_cell(from);
    let target = grid.world_to_cell(to);

    for attempt in 0..config.attempts {
        let h = config.base_height + attempt as f32 * config.height_step;
        if let Some(arc) = try_arc(grid, from, to, h, config.samples, origin, target) {
            return Some(ArcTrajectory { attempt, ..arc });
        }
    }
    log::debug!(
        "sample_arc: no clear arc from {from:?} to {to:?} in {} attempts",
        config.attempts
    );
    None
}

fn try_arc(
    grid: &CellGrid,
    from: WorldPos,
    to: WorldPos,
    h: f32,
    samples: u32,
    origin: Option<CellCoord>,
    target: Option<CellCoord>,
) -> Option<ArcTrajectory> {
    let mut points = Vec::with_capacity(samples as usize + 1);
    let mut cells: Vec<CellCoord> = Vec::new();
    for k in 0..=samples {
        let p = arc_point(from, to, h, k as f32 / samples as f32);
        points.push(p);
        let Some(cell) = grid.world_to_cell(p) else {
            continue;
        };
        if cells.last() == Some(&cell) {
            continue;
        }
        let endpoint = Some(cell) == origin || Some(cell) == target;
        if !endpoint && grid.get(cell).is_some_and(|c| c.is_obstructed()) {
            return None;
        }
        cells.push(cell);
    }
    Some(ArcTrajectory {
        points,
        cells,
        apex_height: h,
        attempt: 0,
    })
}
