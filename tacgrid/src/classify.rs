// Ground classification: decide which cells have walkable ground.
//
// Each cell is probed straight down from the top of its volume through its
// full height. The centre probe is cast first; only if it misses are the
// four corner probes (inset from the walls) tried, in fixed order, and the
// first hit wins. Most cells are decided by one probe that way.
//
// A hit marks the cell `GROUND` and moves its anchor onto the hit surface.
// A surface whose normal is steeper than the slope tolerance is still
// `GROUND` but also carries `STEEP`. A miss marks the cell `AIR`; that is
// ordinary data, not an error.
//
// The per-cell work is independent, so `classify_grid` computes results into
// a preallocated vector (one slot per cell, optionally with rayon) and only
// then writes them back to the grid. No cell reads another's result.
//
// See also: `terrain.rs` for `SolidField`, a voxel-backed classifier,
// `nav_grid.rs` which runs this pass before building the graph.

use crate::cell::CellFlags;
use crate::grid::{CellGrid, CellVolume};
use crate::types::WorldPos;
use rayon::prelude::*;

/// A downward probe: start at `origin`, travel at most `max_distance`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundProbe {
    pub origin: WorldPos,
    pub max_distance: f32,
}

/// Where a probe hit ground.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundHit {
    pub point: WorldPos,
    /// Unit surface normal at the hit.
    pub normal: WorldPos,
}

/// Injected capability that answers ground probes (physics raycast,
/// heightmap lookup, voxel column scan, test fake...).
pub trait GroundClassifier: Sync {
    fn probe(&self, probe: &GroundProbe) -> Option<GroundHit>;
}

/// Outcome of classifying one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub flags: CellFlags,
    /// Anchor height to store; the cell floor on a miss.
    pub anchor_y: f32,
}

/// Counts from a full classification pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassificationReport {
    pub ground: usize,
    pub steep: usize,
    pub air: usize,
}

/// Fraction of the cell size that corner probes are kept away from the
/// cell walls, so they do not graze a neighbouring column.
const CORNER_INSET: f32 = 0.1;

/// Classify a single cell volume.
pub fn classify_cell(
    volume: &CellVolume,
    classifier: &dyn GroundClassifier,
    slope_cos: f32,
) -> Classification {
    let size = volume.size();
    let center = volume.center();
    let top = volume.max.y;
    let probe_at = |x: f32, z: f32| GroundProbe {
        origin: WorldPos::new(x, top, z),
        max_distance: size,
    };

    let inset = size * CORNER_INSET;
    let (x0, x1) = (volume.min.x + inset, volume.max.x - inset);
    let (z0, z1) = (volume.min.z + inset, volume.max.z - inset);
    let corners = [(x0, z0), (x1, z0), (x1, z1), (x0, z1)];

    let hit = classifier.probe(&probe_at(center.x, center.z)).or_else(|| {
        corners
            .iter()
            .find_map(|&(x, z)| classifier.probe(&probe_at(x, z)))
    });

    match hit {
        Some(hit) => {
            let mut flags = CellFlags::GROUND;
            if hit.normal.y < slope_cos {
                flags |= CellFlags::STEEP;
            }
            Classification {
                flags,
                anchor_y: hit.point.y,
            }
        }
        None => Classification {
            flags: CellFlags::AIR,
            anchor_y: volume.min.y,
        },
    }
}

/// Classify every cell of the grid and write the results back.
pub fn classify_grid(
    grid: &mut CellGrid,
    classifier: &dyn GroundClassifier,
    slope_cos: f32,
    parallel: bool,
) -> ClassificationReport {
    let volumes: Vec<CellVolume> = grid
        .cells()
        .iter()
        .filter_map(|c| grid.cell_volume(c.coord))
        .collect();

    let results: Vec<Classification> = if parallel {
        volumes
            .par_iter()
            .map(|v| classify_cell(v, classifier, slope_cos))
            .collect()
    } else {
        volumes
            .iter()
            .map(|v| classify_cell(v, classifier, slope_cos))
            .collect()
    };

    let mut report = ClassificationReport::default();
    for (cell, result) in grid.cells_mut().iter_mut().zip(&results) {
        cell.apply_classification(result.flags, result.anchor_y);
        if result.flags.contains(CellFlags::GROUND) {
            report.ground += 1;
            if result.flags.contains(CellFlags::STEEP) {
                report.steep += 1;
            }
        } else {
            report.air += 1;
        }
    }
    log::info!(
        "classified {} cells: {} ground ({} steep), {} air",
        results.len(),
        report.ground,
        report.steep,
        report.air
    );
    report
}
