// A* pathfinding over the connectivity graph.
//
// Implements standard A* using a `BinaryHeap` (min-heap via reversed
// ordering). Scores, came-from links and the closed set are `Vec`s indexed
// by the grid's flat cell index for O(1) access and deterministic behaviour
// (no `HashMap` iteration anywhere in the search itself).
//
// Expansion reads only `ConnectivityGraph::neighbors`: the search never
// re-derives geometry, so its answers are exactly as current as the graph.
// Step cost is a pure function of the coordinate delta (1, sqrt 2, sqrt 3),
// and the heuristic is the 3D octile distance built from the same step
// costs, which keeps it admissible and consistent by construction.
//
// A query has a *terminal set* rather than a single goal. Without
// `adjacent_is_valid` it is `{goal}` (if the goal is passable); with it, it
// is every passable cell in the goal's 26-neighbourhood. The heuristic is
// the minimum over all terminals. An empty terminal set fails fast.
//
// The cancellable variant checks its token before doing any work and then
// every `poll_interval` expansions.
//
// See also: `graph.rs` for the graph being searched, `nav_grid.rs` and
// `shared.rs` which expose these queries.
//
// **Critical constraint: determinism.** A search is a pure function of grid
// state, graph state and its arguments. Heap ties are broken by coordinate
// so equal-cost alternatives always resolve the same way.

use crate::edge::{ORTHOGONAL_COST, PLANAR_DIAGONAL_COST, SPATIAL_DIAGONAL_COST, step_cost};
use crate::error::GridError;
use crate::graph::ConnectivityGraph;
use crate::grid::CellGrid;
use crate::types::CellCoord;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

/// Cooperative cancellation flag shared between a caller and a search.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Acquire)
    }
}

/// Result of a cancellable search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Vec<CellCoord>),
    NoPath,
    Cancelled,
}

impl SearchOutcome {
    /// Collapse to the plain `find_path` shape: a path, or empty for no
    /// path. Cancellation becomes an error.
    pub fn into_path(self) -> Result<Vec<CellCoord>, GridError> {
        match self {
            SearchOutcome::Found(path) => Ok(path),
            SearchOutcome::NoPath => Ok(Vec::new()),
            SearchOutcome::Cancelled => Err(GridError::Cancelled),
        }
    }
}

/// Admissible 3D octile distance: as many spatial diagonals as the
/// smallest axis delta, then planar diagonals, then straight steps.
pub fn octile_distance(a: CellCoord, b: CellCoord) -> f32 {
    let mut d = [a.x.abs_diff(b.x), a.y.abs_diff(b.y), a.z.abs_diff(b.z)];
    d.sort_unstable();
    let [lo, mid, hi] = d.map(|v| v as f32);
    SPATIAL_DIAGONAL_COST * lo + PLANAR_DIAGONAL_COST * (mid - lo) + ORTHOGONAL_COST * (hi - mid)
}

/// Total step cost along a path. Infinite for an empty path (and for any
/// path containing a non-adjacent pair).
pub fn path_cost(path: &[CellCoord]) -> f32 {
    if path.is_empty() {
        return f32::INFINITY;
    }
    path.windows(2).map(|w| step_cost(w[0], w[1])).sum()
}

/// Cells that satisfy a query for `goal`.
pub fn terminal_set(
    grid: &CellGrid,
    goal: CellCoord,
    adjacent_is_valid: bool,
) -> FxHashSet<CellCoord> {
    if adjacent_is_valid {
        goal.neighbors().filter(|&n| grid.is_passable(n)).collect()
    } else {
        std::iter::once(goal)
            .filter(|&g| grid.is_passable(g))
            .collect()
    }
}

/// Find a minimum-cost path from `start` to the terminal set of `goal`.
/// Empty if no path exists.
pub fn find_path(
    grid: &CellGrid,
    graph: &ConnectivityGraph,
    start: CellCoord,
    goal: CellCoord,
    adjacent_is_valid: bool,
) -> Vec<CellCoord> {
    match plan(grid, start, goal, adjacent_is_valid) {
        Plan::Trivial => vec![start],
        Plan::Impossible => Vec::new(),
        Plan::Search(terminals) => {
            let mut search = Search::new(grid, graph, terminals);
            match search.run(start, None) {
                Ok(Some(end)) => search.path_to(start, end),
                Ok(None) | Err(Interrupted) => Vec::new(),
            }
        }
    }
}

/// Same search as `find_path`, stopping as soon as any terminal is popped.
pub fn is_path_possible(
    grid: &CellGrid,
    graph: &ConnectivityGraph,
    start: CellCoord,
    goal: CellCoord,
    adjacent_is_valid: bool,
) -> bool {
    match plan(grid, start, goal, adjacent_is_valid) {
        Plan::Trivial => true,
        Plan::Impossible => false,
        Plan::Search(terminals) => {
            matches!(Search::new(grid, graph, terminals).run(start, None), Ok(Some(_)))
        }
    }
}

/// `find_path` that observes `cancel` before starting and every
/// `poll_interval` expansions.
pub fn find_path_cancellable(
    grid: &CellGrid,
    graph: &ConnectivityGraph,
    start: CellCoord,
    goal: CellCoord,
    adjacent_is_valid: bool,
    cancel: &CancelToken,
    poll_interval: u32,
) -> SearchOutcome {
    if cancel.is_cancelled() {
        log::debug!("path search {start} -> {goal} cancelled before start");
        return SearchOutcome::Cancelled;
    }
    match plan(grid, start, goal, adjacent_is_valid) {
        Plan::Trivial => SearchOutcome::Found(vec![start]),
        Plan::Impossible => SearchOutcome::NoPath,
        Plan::Search(terminals) => {
            let mut search = Search::new(grid, graph, terminals);
            match search.run(start, Some((cancel, poll_interval))) {
                Ok(Some(end)) => SearchOutcome::Found(search.path_to(start, end)),
                Ok(None) => SearchOutcome::NoPath,
                Err(Interrupted) => {
                    log::debug!(
                        "path search {start} -> {goal} cancelled after {} expansions",
                        search.expansions
                    );
                    SearchOutcome::Cancelled
                }
            }
        }
    }
}

/// `is_path_possible` with the same cancellation behaviour as
/// `find_path_cancellable`.
pub fn is_path_possible_cancellable(
    grid: &CellGrid,
    graph: &ConnectivityGraph,
    start: CellCoord,
    goal: CellCoord,
    adjacent_is_valid: bool,
    cancel: &CancelToken,
    poll_interval: u32,
) -> Result<bool, GridError> {
    if cancel.is_cancelled() {
        log::debug!("reachability check {start} -> {goal} cancelled before start");
        return Err(GridError::Cancelled);
    }
    match plan(grid, start, goal, adjacent_is_valid) {
        Plan::Trivial => Ok(true),
        Plan::Impossible => Ok(false),
        Plan::Search(terminals) => {
            let mut search = Search::new(grid, graph, terminals);
            match search.run(start, Some((cancel, poll_interval))) {
                Ok(found) => Ok(found.is_some()),
                Err(Interrupted) => {
                    log::debug!("reachability check {start} -> {goal} cancelled mid-search");
                    Err(GridError::Cancelled)
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Search internals
// ---------------------------------------------------------------------------

enum Plan {
    Trivial,
    Impossible,
    Search(FxHashSet<CellCoord>),
}

/// Fail-fast and short-circuit rules shared by every query shape.
fn plan(grid: &CellGrid, start: CellCoord, goal: CellCoord, adjacent_is_valid: bool) -> Plan {
    if !grid.in_bounds(start) {
        log::debug!("path query from {start}: start is outside the grid");
        return Plan::Impossible;
    }
    if start == goal {
        return Plan::Trivial;
    }
    let terminals = terminal_set(grid, goal, adjacent_is_valid);
    if terminals.is_empty() {
        log::debug!(
            "path query {start} -> {goal} (adjacent: {adjacent_is_valid}): no passable terminal"
        );
        return Plan::Impossible;
    }
    if terminals.contains(&start) {
        return Plan::Trivial;
    }
    Plan::Search(terminals)
}

/// The search observed its cancel token.
struct Interrupted;

/// Entry in the A* open set (min-heap via reversed ordering).
struct OpenEntry {
    coord: CellCoord,
    f_score: f32,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest f_score is "greatest".
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.coord.cmp(&self.coord))
    }
}

struct Search<'a> {
    grid: &'a CellGrid,
    graph: &'a ConnectivityGraph,
    terminals: FxHashSet<CellCoord>,
    /// Terminals in coordinate order, for the heuristic.
    targets: Vec<CellCoord>,
    g_score: Vec<f32>,
    came_from: Vec<Option<CellCoord>>,
    expansions: u64,
}

impl<'a> Search<'a> {
    fn new(
        grid: &'a CellGrid,
        graph: &'a ConnectivityGraph,
        terminals: FxHashSet<CellCoord>,
    ) -> Self {
        let mut targets: Vec<CellCoord> = terminals.iter().copied().collect();
        targets.sort_unstable();
        Self {
            grid,
            graph,
            terminals,
            targets,
            g_score: vec![f32::INFINITY; grid.len()],
            came_from: vec![None; grid.len()],
            expansions: 0,
        }
    }

    fn heuristic(&self, c: CellCoord) -> f32 {
        self.targets
            .iter()
            .map(|&t| octile_distance(c, t))
            .fold(f32::INFINITY, f32::min)
    }

    /// Run until a terminal is popped (`Some(terminal)`), the open set is
    /// exhausted (`None`), or the token fires.
    fn run(
        &mut self,
        start: CellCoord,
        cancel: Option<(&CancelToken, u32)>,
    ) -> Result<Option<CellCoord>, Interrupted> {
        let Some(si) = self.grid.index_of(start) else {
            return Ok(None);
        };
        let mut closed = vec![false; self.grid.len()];
        self.g_score[si] = 0.0;

        let mut open = BinaryHeap::new();
        open.push(OpenEntry {
            coord: start,
            f_score: self.heuristic(start),
        });

        while let Some(current) = open.pop() {
            let Some(ci) = self.grid.index_of(current.coord) else {
                continue;
            };
            if self.terminals.contains(&current.coord) {
                return Ok(Some(current.coord));
            }
            if closed[ci] {
                continue;
            }
            closed[ci] = true;

            self.expansions += 1;
            if let Some((token, interval)) = cancel {
                let due = self.expansions % u64::from(interval.max(1)) == 0;
                if due && token.is_cancelled() {
                    return Err(Interrupted);
                }
            }

            let current_g = self.g_score[ci];
            for &neighbor in self.graph.neighbors(current.coord) {
                let Some(ni) = self.grid.index_of(neighbor) else {
                    continue;
                };
                if closed[ni] {
                    continue;
                }
                let tentative_g = current_g + step_cost(current.coord, neighbor);
                if tentative_g < self.g_score[ni] {
                    self.g_score[ni] = tentative_g;
                    self.came_from[ni] = Some(current.coord);
                    open.push(OpenEntry {
                        coord: neighbor,
                        f_score: tentative_g + self.heuristic(neighbor),
                    });
                }
            }
        }

        Ok(None)
    }

    /// Reconstruct the path from came-from links.
    fn path_to(&self, start: CellCoord, end: CellCoord) -> Vec<CellCoord> {
        let mut path = vec![end];
        let mut current = end;
        while current != start {
            match self.grid.index_of(current).and_then(|i| self.came_from[i]) {
                Some(prev) => {
                    path.push(prev);
                    current = prev;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::cell::CellFlags;
    use crate::config::GridConfig;
    use crate::corridor::NoObstacles;
    use crate::edge::StepKind;

    fn c(x: i32, y: i32, z: i32) -> CellCoord {
        CellCoord::new(x, y, z)
    }

    /// Flat single-layer grid with the given cells obstructed, graph built.
    fn world(sx: u32, sz: u32, blocked: &[CellCoord]) -> (CellGrid, ConnectivityGraph) {
        let config = GridConfig::with_dimensions(sx, 1, sz);
        let mut grid = CellGrid::new(&config);
        for i in 0..grid.len() {
            let coord = grid.coord_of(i);
            let cell = grid.get_mut(coord).unwrap();
            cell.apply_classification(CellFlags::GROUND, 0.0);
            if blocked.contains(&coord) {
                cell.set_obstructed(true);
            }
        }
        let mut graph = ConnectivityGraph::new();
        GraphBuilder::new(&grid, &NoObstacles, &config).rebuild_all(&mut graph);
        (grid, graph)
    }

    fn assert_well_formed(graph: &ConnectivityGraph, path: &[CellCoord], start: CellCoord) {
        assert_eq!(path.first(), Some(&start));
        for w in path.windows(2) {
            assert!(graph.are_connected(w[0], w[1]), "{} -/- {}", w[0], w[1]);
        }
    }

    #[test]
    fn octile_matches_step_mix() {
        assert_eq!(octile_distance(c(0, 0, 0), c(0, 0, 0)), 0.0);
        assert_eq!(octile_distance(c(0, 0, 0), c(3, 0, 0)), 3.0);
        let planar = octile_distance(c(0, 0, 0), c(2, 0, 3));
        assert!((planar - (2.0 * PLANAR_DIAGONAL_COST + 1.0)).abs() < 1e-5);
        let spatial = octile_distance(c(0, 0, 0), c(1, -2, 3));
        let expected = SPATIAL_DIAGONAL_COST + PLANAR_DIAGONAL_COST + 1.0;
        assert!((spatial - expected).abs() < 1e-5);
        assert_eq!(octile_distance(c(1, 2, 3), c(4, 4, 4)), octile_distance(c(4, 4, 4), c(1, 2, 3)));
    }

    #[test]
    fn path_cost_sums_steps() {
        assert_eq!(path_cost(&[]), f32::INFINITY);
        assert_eq!(path_cost(&[c(0, 0, 0)]), 0.0);
        let cost = path_cost(&[c(0, 0, 0), c(1, 0, 0), c(2, 0, 1)]);
        assert!((cost - (1.0 + PLANAR_DIAGONAL_COST)).abs() < 1e-6);
        assert_eq!(path_cost(&[c(0, 0, 0), c(5, 0, 0)]), f32::INFINITY);
    }

    #[test]
    fn trivial_path() {
        let (grid, graph) = world(3, 3, &[]);
        assert_eq!(find_path(&grid, &graph, c(1, 0, 1), c(1, 0, 1), false), vec![c(1, 0, 1)]);
        assert_eq!(find_path(&grid, &graph, c(1, 0, 1), c(1, 0, 1), true), vec![c(1, 0, 1)]);
        assert!(is_path_possible(&grid, &graph, c(1, 0, 1), c(1, 0, 1), false));
    }

    #[test]
    fn straight_line_across_open_floor() {
        let (grid, graph) = world(5, 1, &[]);
        let path = find_path(&grid, &graph, c(0, 0, 0), c(4, 0, 0), false);
        assert_eq!(path, (0..5).map(|x| c(x, 0, 0)).collect::<Vec<_>>());
        assert_eq!(path_cost(&path), 4.0);
    }

    #[test]
    fn diagonal_shortcut_is_taken() {
        let (grid, graph) = world(4, 4, &[]);
        let path = find_path(&grid, &graph, c(0, 0, 0), c(3, 0, 3), false);
        assert_eq!(path.len(), 4);
        assert!((path_cost(&path) - 3.0 * PLANAR_DIAGONAL_COST).abs() < 1e-5);
    }

    #[test]
    fn blocked_row_has_no_path() {
        let (grid, graph) = world(3, 1, &[c(1, 0, 0)]);
        assert!(find_path(&grid, &graph, c(0, 0, 0), c(2, 0, 0), false).is_empty());
        assert!(!is_path_possible(&grid, &graph, c(0, 0, 0), c(2, 0, 0), false));
    }

    #[test]
    fn detour_around_obstruction() {
        let (grid, graph) = world(3, 3, &[c(1, 0, 1)]);
        let path = find_path(&grid, &graph, c(0, 0, 1), c(2, 0, 1), false);
        assert_well_formed(&graph, &path, c(0, 0, 1));
        assert_eq!(path.last(), Some(&c(2, 0, 1)));
        assert!(!path.contains(&c(1, 0, 1)));
        // Corner rule forbids the diagonals past the blocked centre, so the
        // detour is four straight steps.
        assert_eq!(path.len(), 5);
        assert_eq!(path_cost(&path), 4.0);
        let kinds: Vec<_> = path
            .windows(2)
            .filter_map(|w| StepKind::between(w[0], w[1]))
            .collect();
        assert!(kinds.iter().all(|k| *k == StepKind::Orthogonal));
    }

    #[test]
    fn obstructed_goal_fails_fast() {
        let (grid, graph) = world(3, 1, &[c(2, 0, 0)]);
        assert!(find_path(&grid, &graph, c(0, 0, 0), c(2, 0, 0), false).is_empty());
        // Adjacent mode accepts the cell next to it.
        let path = find_path(&grid, &graph, c(0, 0, 0), c(2, 0, 0), true);
        assert_eq!(path, vec![c(0, 0, 0), c(1, 0, 0)]);
    }

    #[test]
    fn adjacent_mode_stops_next_to_goal() {
        let (grid, graph) = world(5, 5, &[]);
        let goal = c(4, 0, 4);
        let path = find_path(&grid, &graph, c(0, 0, 0), goal, true);
        let end = *path.last().unwrap();
        assert!(end.is_adjacent(goal));
        assert_eq!(end, c(3, 0, 3));
        assert_well_formed(&graph, &path, c(0, 0, 0));
        // Starting beside the goal is already done.
        assert_eq!(find_path(&grid, &graph, c(3, 0, 4), goal, true), vec![c(3, 0, 4)]);
    }

    #[test]
    fn adjacent_mode_with_no_passable_neighbour() {
        let (grid, graph) = world(3, 1, &[c(0, 0, 0), c(1, 0, 0)]);
        assert!(terminal_set(&grid, c(0, 0, 0), true).is_empty());
        assert!(find_path(&grid, &graph, c(2, 0, 0), c(0, 0, 0), true).is_empty());
    }

    #[test]
    fn out_of_grid_start_or_goal() {
        let (grid, graph) = world(3, 3, &[]);
        assert!(find_path(&grid, &graph, c(-1, 0, 0), c(2, 0, 2), false).is_empty());
        assert!(find_path(&grid, &graph, c(0, 0, 0), c(9, 0, 9), false).is_empty());
        assert!(!is_path_possible(&grid, &graph, c(0, 0, 0), c(0, 5, 0), false));
    }

    #[test]
    fn cancelled_before_start() {
        let (grid, graph) = world(4, 4, &[]);
        let token = CancelToken::new();
        token.cancel();
        let outcome = find_path_cancellable(&grid, &graph, c(0, 0, 0), c(3, 0, 3), false, &token, 1);
        assert_eq!(outcome, SearchOutcome::Cancelled);
        assert!(matches!(outcome.into_path(), Err(GridError::Cancelled)));
        assert!(matches!(
            is_path_possible_cancellable(&grid, &graph, c(0, 0, 0), c(3, 0, 3), false, &token, 1),
            Err(GridError::Cancelled)
        ));
    }

    #[test]
    fn token_is_polled_on_the_interval() {
        let (grid, graph) = world(6, 6, &[]);
        let token = CancelToken::new();
        token.cancel();
        let terminals = terminal_set(&grid, c(5, 0, 5), false);
        let mut search = Search::new(&grid, &graph, terminals);
        let result = search.run(c(0, 0, 0), Some((&token, 3)));
        assert!(matches!(result, Err(Interrupted)));
        assert_eq!(search.expansions, 3);
    }

    #[test]
    fn uncancelled_search_matches_plain() {
        let (grid, graph) = world(5, 5, &[c(2, 0, 1), c(2, 0, 2), c(2, 0, 3)]);
        let token = CancelToken::new();
        let plain = find_path(&grid, &graph, c(0, 0, 2), c(4, 0, 2), false);
        let outcome = find_path_cancellable(&grid, &graph, c(0, 0, 2), c(4, 0, 2), false, &token, 2);
        assert_eq!(outcome, SearchOutcome::Found(plain));
        let walled = find_path_cancellable(&grid, &graph, c(0, 0, 0), c(9, 0, 0), false, &token, 2);
        assert_eq!(walled, SearchOutcome::NoPath);
    }

    #[test]
    fn search_is_deterministic() {
        let (grid, graph) = world(6, 6, &[c(3, 0, 3)]);
        let a = find_path(&grid, &graph, c(0, 0, 0), c(5, 0, 5), false);
        let b = find_path(&grid, &graph, c(0, 0, 0), c(5, 0, 5), false);
        assert_eq!(a, b);
    }
}
