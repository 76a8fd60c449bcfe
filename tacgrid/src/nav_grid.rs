// The grid manager: one owned object holding cells, graph and oracles.
//
// `NavGrid` owns the validated `GridConfig`, the `CellGrid`, the
// `ConnectivityGraph` and the boxed `CorridorTester`. It is an ordinary
// value passed by reference to whatever needs it; there is no global
// instance.
//
// ## Lifecycle
//
// 1. `new(config, tester)` validates the config and allocates every cell
//    as empty air. The graph starts empty.
// 2. `classify(classifier)` runs the ground pass (see `classify.rs`).
// 3. `rebuild_graph()` derives every edge (see `builder.rs`).
//
// After that the grid is kept current incrementally. The mutation helpers
// here (`set_obstructed`, `occupy`, `vacate`, `apply_area_override`) change
// cell state *and* run the matching graph update, so callers that stick to
// them never see a stale graph. `cell_mut` is the escape hatch for raw state
// edits: whoever uses it must call `update_cell` / `update_neighborhood`
// afterwards, otherwise the graph keeps reflecting the last update (stale,
// but never structurally corrupt).
//
// Every effective graph mutation bumps `generation()`. `shared.rs` uses it to
// tell answers computed against an older graph apart from current ones.
//
// See also: `shared.rs` for the thread-safe wrapper with background
// searches, `map.rs` which builds a ready-to-query `NavGrid` from a map file.

use crate::arc::{ArcTrajectory, sample_arc};
use crate::builder::{BuildReport, GraphBuilder, UpdateReport, find_isolated};
use crate::cell::{Cell, CellFlags};
use crate::classify::{ClassificationReport, GroundClassifier, classify_grid};
use crate::config::GridConfig;
use crate::corridor::CorridorTester;
use crate::error::GridError;
use crate::graph::ConnectivityGraph;
use crate::grid::CellGrid;
use crate::pathfinding::{self, CancelToken, SearchOutcome};
use crate::types::{CellCoord, OccupantId, WorldPos};
use tacgrid_prng::GridRng;

/// Cells, connectivity graph and corridor oracle of one map.
pub struct NavGrid {
    config: GridConfig,
    grid: CellGrid,
    graph: ConnectivityGraph,
    tester: Box<dyn CorridorTester>,
}

impl NavGrid {
    pub fn new(config: GridConfig, tester: Box<dyn CorridorTester>) -> Result<Self, GridError> {
        config.validate()?;
        let grid = CellGrid::new(&config);
        log::debug!(
            "allocated {}x{}x{} grid ({} cells, cell size {})",
            config.dimensions.0,
            config.dimensions.1,
            config.dimensions.2,
            grid.len(),
            config.cell_size
        );
        Ok(Self {
            config,
            grid,
            graph: ConnectivityGraph::new(),
            tester,
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    pub fn graph(&self) -> &ConnectivityGraph {
        &self.graph
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Run the ground classification pass. Does not touch the graph; call
    /// `rebuild_graph` afterwards.
    pub fn classify(&mut self, classifier: &dyn GroundClassifier) -> ClassificationReport {
        classify_grid(
            &mut self.grid,
            classifier,
            self.config.slope_cos(),
            self.config.parallel_classification,
        )
    }

    /// Re-derive every edge from current cell state.
    pub fn rebuild_graph(&mut self) -> BuildReport {
        let mut builder = GraphBuilder::new(&self.grid, self.tester.as_ref(), &self.config);
        builder.rebuild_all(&mut self.graph)
    }

    /// Passable ground cells with no edges, as of the current graph.
    pub fn isolated_cells(&self) -> Vec<CellCoord> {
        find_isolated(&self.grid, &self.graph)
    }

    // -----------------------------------------------------------------------
    // Incremental update API
    // -----------------------------------------------------------------------

    /// Recompute the edges of exactly one cell.
    pub fn update_cell(&mut self, c: CellCoord) -> UpdateReport {
        let mut builder = GraphBuilder::new(&self.grid, self.tester.as_ref(), &self.config);
        builder.update_cell(&mut self.graph, c)
    }

    /// Recompute `c` and its 26 neighbours.
    pub fn update_neighborhood(&mut self, c: CellCoord) -> UpdateReport {
        let mut builder = GraphBuilder::new(&self.grid, self.tester.as_ref(), &self.config);
        builder.update_neighborhood(&mut self.graph, c)
    }

    /// Recompute the neighbourhoods of a batch of changed cells.
    pub fn update_region(&mut self, changed: &[CellCoord]) -> UpdateReport {
        let mut builder = GraphBuilder::new(&self.grid, self.tester.as_ref(), &self.config);
        builder.update_region(&mut self.graph, changed)
    }

    /// Connect two adjacent in-grid cells directly, bypassing the builder.
    /// The next rebuild or update of either cell re-derives the edge.
    pub fn add_edge(&mut self, a: CellCoord, b: CellCoord) -> bool {
        self.grid.in_bounds(a) && self.grid.in_bounds(b) && self.graph.add_edge(a, b)
    }

    pub fn remove_edge(&mut self, a: CellCoord, b: CellCoord) -> bool {
        self.graph.remove_edge(a, b)
    }

    pub fn clear_edges_for(&mut self, c: CellCoord) -> usize {
        self.graph.clear_edges_for(c)
    }

    pub fn are_connected(&self, a: CellCoord, b: CellCoord) -> bool {
        self.graph.are_connected(a, b)
    }

    pub fn has_any_edge(&self, c: CellCoord) -> bool {
        self.graph.has_any_edge(c)
    }

    pub fn neighbors(&self, c: CellCoord) -> &[CellCoord] {
        self.graph.neighbors(c)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn generation(&self) -> u64 {
        self.graph.generation()
    }

    // -----------------------------------------------------------------------
    // Obstruction notifications
    // -----------------------------------------------------------------------

    /// Open or close a cell (a door panel, destroyed cover) and update the
    /// graph around it. `None` if the cell does not exist.
    pub fn set_obstructed(&mut self, c: CellCoord, obstructed: bool) -> Option<UpdateReport> {
        self.grid.get_mut(c)?.set_obstructed(obstructed);
        Some(self.update_neighborhood(c))
    }

    /// Place an occupant. A blocking occupant obstructs the cell and the
    /// graph is updated; a non-blocking one leaves connectivity alone.
    /// `false` if the cell does not exist or is already occupied.
    pub fn occupy(&mut self, c: CellCoord, occupant: OccupantId, blocking: bool) -> bool {
        let Some(cell) = self.grid.get_mut(c) else {
            return false;
        };
        let was_passable = cell.is_passable();
        if !cell.occupy(occupant, blocking) {
            return false;
        }
        if cell.is_passable() != was_passable {
            self.update_neighborhood(c);
        }
        true
    }

    /// Remove the occupant of `c`, restoring its baseline state.
    pub fn vacate(&mut self, c: CellCoord) -> Option<OccupantId> {
        let cell = self.grid.get_mut(c)?;
        let was_passable = cell.is_passable();
        let occupant = cell.vacate()?;
        if cell.is_passable() != was_passable {
            self.update_neighborhood(c);
        }
        Some(occupant)
    }

    /// Force `flags` onto every cell of the box `[min, max]` (clipped to the
    /// grid) and update the affected region in one batch.
    pub fn apply_area_override(
        &mut self,
        min: CellCoord,
        max: CellCoord,
        flags: CellFlags,
    ) -> UpdateReport {
        let cells = self.grid.cells_in_box(min, max);
        for &c in &cells {
            if let Some(cell) = self.grid.get_mut(c) {
                cell.force_state(flags);
            }
        }
        self.update_region(&cells)
    }

    // -----------------------------------------------------------------------
    // Cell queries
    // -----------------------------------------------------------------------

    pub fn cell(&self, c: CellCoord) -> Option<&Cell> {
        self.grid.get(c)
    }

    /// Raw mutable access. The caller must run `update_cell` or
    /// `update_neighborhood` after any change that can affect
    /// passability, or the graph goes stale.
    pub fn cell_mut(&mut self, c: CellCoord) -> Option<&mut Cell> {
        self.grid.get_mut(c)
    }

    pub fn cells_in_radius(&self, center: CellCoord, radius: f32) -> Vec<CellCoord> {
        self.grid.cells_in_radius(center, radius)
    }

    pub fn cells_in_box(&self, min: CellCoord, max: CellCoord) -> Vec<CellCoord> {
        self.grid.cells_in_box(min, max)
    }

    pub fn random_cell_matching<F>(&self, rng: &mut GridRng, filter: F) -> Option<CellCoord>
    where
        F: Fn(&Cell) -> bool,
    {
        self.grid.random_cell_matching(rng, filter)
    }

    pub fn world_to_cell(&self, pos: WorldPos) -> Option<CellCoord> {
        self.grid.world_to_cell(pos)
    }

    // -----------------------------------------------------------------------
    // Path and arc queries
    // -----------------------------------------------------------------------

    pub fn find_path(
        &self,
        start: CellCoord,
        goal: CellCoord,
        adjacent_is_valid: bool,
    ) -> Vec<CellCoord> {
        pathfinding::find_path(&self.grid, &self.graph, start, goal, adjacent_is_valid)
    }

    pub fn is_path_possible(
        &self,
        start: CellCoord,
        goal: CellCoord,
        adjacent_is_valid: bool,
    ) -> bool {
        pathfinding::is_path_possible(&self.grid, &self.graph, start, goal, adjacent_is_valid)
    }

    /// `find_path` polling `cancel` every `cancel_poll_interval` expansions.
    pub fn find_path_cancellable(
        &self,
        start: CellCoord,
        goal: CellCoord,
        adjacent_is_valid: bool,
        cancel: &CancelToken,
    ) -> SearchOutcome {
        pathfinding::find_path_cancellable(
            &self.grid,
            &self.graph,
            start,
            goal,
            adjacent_is_valid,
            cancel,
            self.config.cancel_poll_interval,
        )
    }

    pub fn is_path_possible_cancellable(
        &self,
        start: CellCoord,
        goal: CellCoord,
        adjacent_is_valid: bool,
        cancel: &CancelToken,
    ) -> Result<bool, GridError> {
        pathfinding::is_path_possible_cancellable(
            &self.grid,
            &self.graph,
            start,
            goal,
            adjacent_is_valid,
            cancel,
            self.config.cancel_poll_interval,
        )
    }

    pub fn path_cost(&self, path: &[CellCoord]) -> f32 {
        pathfinding::path_cost(path)
    }

    /// Lob arc between two world positions using the configured attempts.
    pub fn sample_arc(&self, from: WorldPos, to: WorldPos) -> Option<ArcTrajectory> {
        sample_arc(&self.grid, from, to, &self.config.arc)
    }
}
