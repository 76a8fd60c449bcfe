// Connectivity graph builder: derive each cell's edge set from cell state.
//
// For a cell `c` the neighbour set is computed as follows:
//
// 1. A cell that is not passable (not ground, or obstructed) has no edges.
// 2. Each of the 26 offsets is classified as orthogonal, planar diagonal or
//    spatial diagonal (`StepKind`).
// 3. Diagonals are skipped entirely when `allow_diagonals` is off.
// 4. The neighbour must exist and be passable.
// 5. With `prevent_corner_cutting`, a diagonal step also needs every
//    orthogonal intermediate to be passable and corridor-clear. The
//    intermediates are `lo + e_i` for each non-zero axis `e_i` of the step,
//    where `lo` is the lower endpoint of the pair, so the answer for the
//    edge is the same whichever endpoint is being processed.
// 6. The straight corridor between the two cell centres must be clear.
// 7. Whatever survives is the new neighbour set.
//
// The new set is then applied with `ConnectivityGraph::apply_neighbor_set`,
// a symmetric diff against the old one. Full rebuild, single-cell updates
// and neighbourhood updates all share that one routine.
//
// Corridor tests are always issued from the lower coordinate to the higher
// one. Together with the lower-endpoint corner check this makes every edge
// decision a pure function of the unordered pair, which is what lets a
// rebuild be idempotent and lets incremental updates agree with a full
// rebuild regardless of processing order.
//
// The corridor query is a scratch value owned by the builder and reused for
// every test; a builder must not be shared between concurrent builds. The
// tester itself is only ever called from the building thread.
//
// See also: `graph.rs` for the edge store, `corridor.rs` for the clearance
// capability, `nav_grid.rs` which owns the grid and drives rebuilds and
// updates.

use crate::config::GridConfig;
use crate::corridor::{CorridorQuery, CorridorTester};
use crate::edge::StepKind;
use crate::graph::ConnectivityGraph;
use crate::grid::CellGrid;
use crate::types::{CellCoord, NEIGHBOR_OFFSETS};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Neighbour set computed for one cell (at most 26 entries).
pub type NeighborSet = SmallVec<[CellCoord; 26]>;

/// Summary of a full rebuild.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Edge count after the rebuild.
    pub edges: usize,
    /// Cells carrying the `GROUND` flag.
    pub ground_cells: usize,
    /// Passable ground cells that ended up with no edges at all.
    pub isolated: Vec<CellCoord>,
    pub added: usize,
    pub removed: usize,
}

/// Edge churn caused by an incremental update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub added: usize,
    pub removed: usize,
}

impl UpdateReport {
    fn absorb(&mut self, (added, removed): (usize, usize)) {
        self.added += added;
        self.removed += removed;
    }

    /// True if the update changed nothing.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Derives neighbour sets for cells of one grid.
pub struct GraphBuilder<'a> {
    grid: &'a CellGrid,
    tester: &'a dyn CorridorTester,
    config: &'a GridConfig,
    scratch: CorridorQuery,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        grid: &'a CellGrid,
        tester: &'a dyn CorridorTester,
        config: &'a GridConfig,
    ) -> Self {
        Self {
            grid,
            tester,
            config,
            scratch: CorridorQuery::from_config(&config.corridor, grid.cell_size()),
        }
    }

    /// The edge set `c` should have given current cell state.
    pub fn compute_neighbor_set(&mut self, c: CellCoord) -> NeighborSet {
        let mut out = NeighborSet::new();
        if !self.grid.is_passable(c) {
            return out;
        }
        for &(dx, dy, dz) in &NEIGHBOR_OFFSETS {
            let n = c.offset(dx, dy, dz);
            let Some(kind) = StepKind::between(c, n) else {
                continue;
            };
            if kind.is_diagonal() && !self.config.allow_diagonals {
                continue;
            }
            if !self.grid.is_passable(n) {
                continue;
            }
            if kind.is_diagonal()
                && self.config.prevent_corner_cutting
                && !self.corners_clear(c, n, (dx, dy, dz))
            {
                continue;
            }
            if !self.corridor_clear(c, n) {
                continue;
            }
            out.push(n);
        }
        out
    }

    /// Every orthogonal intermediate of the diagonal step `c -> n` is
    /// passable and reachable by a clear corridor. Intermediates are taken
    /// from the lower endpoint of the pair.
    fn corners_clear(
        &mut self,
        c: CellCoord,
        n: CellCoord,
        (dx, dy, dz): (i32, i32, i32),
    ) -> bool {
        let (lo, sign) = if c < n { (c, 1) } else { (n, -1) };
        let axes = [(dx, 0, 0), (0, dy, 0), (0, 0, dz)];
        for (ax, ay, az) in axes {
            if (ax, ay, az) == (0, 0, 0) {
                continue;
            }
            let mid = lo.offset(sign * ax, sign * ay, sign * az);
            if !self.grid.is_passable(mid) || !self.corridor_clear(lo, mid) {
                return false;
            }
        }
        true
    }

    /// Corridor test between two cell centres, lower coordinate first.
    fn corridor_clear(&mut self, p: CellCoord, q: CellCoord) -> bool {
        let (lo, hi) = if p < q { (p, q) } else { (q, p) };
        self.scratch.from = self.grid.cell_center(lo);
        self.scratch.to = self.grid.cell_center(hi);
        self.tester.is_clear(&self.scratch)
    }

    /// Recompute and apply the edge set of exactly one cell.
    pub fn update_cell(&mut self, graph: &mut ConnectivityGraph, c: CellCoord) -> UpdateReport {
        let set = self.compute_neighbor_set(c);
        let mut report = UpdateReport::default();
        report.absorb(graph.apply_neighbor_set(c, &set));
        report
    }

    /// Recompute `c` and its 26 neighbours. A state change at `c` can
    /// affect any edge that touches `c` or uses it as a corner
    /// intermediate, and both endpoints of such an edge lie in this
    /// neighbourhood.
    pub fn update_neighborhood(
        &mut self,
        graph: &mut ConnectivityGraph,
        c: CellCoord,
    ) -> UpdateReport {
        let mut report = UpdateReport::default();
        for cell in std::iter::once(c).chain(c.neighbors()) {
            if self.grid.in_bounds(cell) {
                report.absorb(self.apply(graph, cell));
            }
        }
        report
    }

    /// Recompute the neighbourhoods of a batch of changed cells, visiting
    /// each affected cell once, in coordinate order.
    pub fn update_region(
        &mut self,
        graph: &mut ConnectivityGraph,
        changed: &[CellCoord],
    ) -> UpdateReport {
        let mut affected: FxHashSet<CellCoord> = FxHashSet::default();
        for &c in changed {
            affected.extend(
                std::iter::once(c)
                    .chain(c.neighbors())
                    .filter(|&n| self.grid.in_bounds(n)),
            );
        }
        let mut ordered: Vec<CellCoord> = affected.into_iter().collect();
        ordered.sort_unstable();

        let mut report = UpdateReport::default();
        for cell in ordered {
            report.absorb(self.apply(graph, cell));
        }
        report
    }

    /// Re-derive every cell of the grid, then run the isolated-cell
    /// diagnostic.
    pub fn rebuild_all(&mut self, graph: &mut ConnectivityGraph) -> BuildReport {
        let mut churn = UpdateReport::default();
        for i in 0..self.grid.len() {
            let c = self.grid.coord_of(i);
            churn.absorb(self.apply(graph, c));
        }
        let isolated = find_isolated(self.grid, graph);
        let report = BuildReport {
            edges: graph.edge_count(),
            ground_cells: self.grid.cells().iter().filter(|c| c.is_ground()).count(),
            isolated,
            added: churn.added,
            removed: churn.removed,
        };
        log::info!(
            "graph rebuilt: {} edges over {} ground cells, {} isolated (+{} -{})",
            report.edges,
            report.ground_cells,
            report.isolated.len(),
            report.added,
            report.removed
        );
        report
    }

    fn apply(&mut self, graph: &mut ConnectivityGraph, c: CellCoord) -> (usize, usize) {
        let set = self.compute_neighbor_set(c);
        graph.apply_neighbor_set(c, &set)
    }
}

/// Passable ground cells with no edges. Informational: these are usually
/// unreachable pockets of the map.
pub fn find_isolated(grid: &CellGrid, graph: &ConnectivityGraph) -> Vec<CellCoord> {
    let isolated: Vec<CellCoord> = grid
        .cells()
        .iter()
        .filter(|cell| cell.is_passable() && !graph.has_any_edge(cell.coord))
        .map(|cell| cell.coord)
        .collect();
    for c in &isolated {
        log::debug!("isolated ground cell at {c}");
    }
    isolated
}
