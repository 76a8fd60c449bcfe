// Randomized property checks of the graph builder and pathfinder.
//
// Worlds are tiny (at most 5x1x5 or 3x3x3) with a random mix of air,
// obstructed ground and open ground, and random diagonal / corner-cutting
// settings. Corridors are always clear here, so the graph is a pure
// function of cell flags and every property can be checked exhaustively.
//
// Path optimality is checked against an independent Bellman-Ford relaxation
// over `are_connected`, which shares nothing with the A* code but the step
// cost table.

use proptest::prelude::*;
use tacgrid::corridor::NoObstacles;
use tacgrid::edge::{CellEdge, StepKind};
use tacgrid::types::NEIGHBOR_OFFSETS;
use tacgrid::{CellCoord, CellFlags, GridConfig, NavGrid};

/// Per-cell contents: 0 = air, 1 = obstructed ground, anything else = open
/// ground.
#[derive(Clone, Debug)]
struct World {
    dims: (u32, u32, u32),
    cells: Vec<u8>,
    allow_diagonals: bool,
    prevent_corner_cutting: bool,
}

impl World {
    fn coords(&self) -> Vec<CellCoord> {
        let (sx, sy, sz) = self.dims;
        let mut out = Vec::new();
        for y in 0..sy as i32 {
            for z in 0..sz as i32 {
                for x in 0..sx as i32 {
                    out.push(CellCoord::new(x, y, z));
                }
            }
        }
        out
    }

    fn nav(&self) -> NavGrid {
        let (sx, sy, sz) = self.dims;
        let config = GridConfig {
            allow_diagonals: self.allow_diagonals,
            prevent_corner_cutting: self.prevent_corner_cutting,
            ..GridConfig::with_dimensions(sx, sy, sz)
        };
        let mut nav = NavGrid::new(config, Box::new(NoObstacles)).unwrap();
        for (i, coord) in self.coords().into_iter().enumerate() {
            let cell = nav.cell_mut(coord).unwrap();
            match self.cells[i] {
                0 => {}
                1 => {
                    cell.apply_classification(CellFlags::GROUND, 0.0);
                    cell.set_obstructed(true);
                }
                _ => cell.apply_classification(CellFlags::GROUND, 0.0),
            }
        }
        nav.rebuild_graph();
        nav
    }
}

fn flat_world() -> impl Strategy<Value = World> {
    (1u32..=5, 1u32..=5).prop_flat_map(|(sx, sz)| {
        let n = (sx * sz) as usize;
        (
            prop::collection::vec(0u8..4, n),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(move |(cells, allow_diagonals, prevent_corner_cutting)| World {
                dims: (sx, 1, sz),
                cells,
                allow_diagonals,
                prevent_corner_cutting,
            })
    })
}

fn cube_world() -> impl Strategy<Value = World> {
    (1u32..=3, 1u32..=3, 1u32..=3).prop_flat_map(|(sx, sy, sz)| {
        let n = (sx * sy * sz) as usize;
        (prop::collection::vec(0u8..4, n), any::<bool>()).prop_map(
            move |(cells, prevent_corner_cutting)| World {
                dims: (sx, sy, sz),
                cells,
                allow_diagonals: true,
                prevent_corner_cutting,
            },
        )
    })
}

fn edge_list(nav: &NavGrid) -> Vec<CellEdge> {
    nav.graph().edges().copied().collect()
}

/// Cheapest cost from `start` to every cell, by exhaustive relaxation.
fn brute_force_costs(nav: &NavGrid, start: CellCoord) -> Vec<f32> {
    let cells: Vec<CellCoord> = nav.grid().cells().iter().map(|c| c.coord).collect();
    let index = |c: CellCoord| nav.grid().index_of(c);
    let mut dist = vec![f32::INFINITY; cells.len()];
    if let Some(i) = index(start) {
        dist[i] = 0.0;
    }
    for _ in 0..cells.len() {
        let mut changed = false;
        for &a in &cells {
            let Some(ai) = index(a) else { continue };
            if dist[ai].is_infinite() {
                continue;
            }
            for &(dx, dy, dz) in &NEIGHBOR_OFFSETS {
                let b = a.offset(dx, dy, dz);
                let Some(bi) = index(b) else { continue };
                if !nav.are_connected(a, b) {
                    continue;
                }
                let cost = StepKind::between(a, b).unwrap().cost();
                if dist[ai] + cost < dist[bi] - 1e-6 {
                    dist[bi] = dist[ai] + cost;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    dist
}

fn check_graph_invariants(world: &World) -> Result<(), TestCaseError> {
    let nav = world.nav();
    prop_assert!(nav.graph().is_consistent());
    for a in world.coords() {
        prop_assert!(!nav.are_connected(a, a));
        for b in a.neighbors() {
            prop_assert_eq!(nav.are_connected(a, b), nav.are_connected(b, a));
        }
    }
    for edge in nav.graph().edges() {
        let (a, b) = (edge.a(), edge.b());
        prop_assert!(nav.cell(a).unwrap().is_passable());
        prop_assert!(nav.cell(b).unwrap().is_passable());
        let kind = edge.kind();
        prop_assert!(world.allow_diagonals || kind == StepKind::Orthogonal);
        if kind.is_diagonal() && world.prevent_corner_cutting {
            let (dx, dy, dz) = a.delta_to(b);
            for (ax, ay, az) in [(dx, 0, 0), (0, dy, 0), (0, 0, dz)] {
                if (ax, ay, az) == (0, 0, 0) {
                    continue;
                }
                // `a` is the lower endpoint.
                prop_assert!(nav.grid().is_passable(a.offset(ax, ay, az)));
            }
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn flat_graph_invariants(world in flat_world()) {
        check_graph_invariants(&world)?;
    }

    #[test]
    fn cube_graph_invariants(world in cube_world()) {
        check_graph_invariants(&world)?;
    }

    #[test]
    fn rebuild_is_idempotent(world in cube_world()) {
        let mut nav = world.nav();
        let before = edge_list(&nav);
        let report = nav.rebuild_graph();
        prop_assert_eq!(edge_list(&nav), before);
        prop_assert_eq!((report.added, report.removed), (0, 0));
    }

    #[test]
    fn neighborhood_update_matches_rebuild(world in cube_world(), pick in any::<prop::sample::Index>()) {
        let mut nav = world.nav();
        let coords = world.coords();
        let target = *pick.get(&coords);
        let i = pick.index(coords.len());

        let obstructed = nav.cell(target).unwrap().is_obstructed();
        nav.cell_mut(target).unwrap().set_obstructed(!obstructed);
        nav.update_neighborhood(target);

        let mut toggled = world.clone();
        toggled.cells[i] = match (world.cells[i], obstructed) {
            // Air with the flag toggled stays impassable either way.
            (0, _) => 0,
            (_, true) => 2,
            (_, false) => 1,
        };
        let fresh = toggled.nav();
        prop_assert_eq!(edge_list(&nav), edge_list(&fresh));
    }

    #[test]
    fn paths_are_optimal(
        world in flat_world(),
        s in any::<prop::sample::Index>(),
        g in any::<prop::sample::Index>(),
    ) {
        let nav = world.nav();
        let coords = world.coords();
        let (start, goal) = (*s.get(&coords), *g.get(&coords));
        let dist = brute_force_costs(&nav, start);
        let best = dist[nav.grid().index_of(goal).unwrap()];
        let path = nav.find_path(start, goal, false);

        if start == goal {
            prop_assert_eq!(path, vec![start]);
        } else if best.is_infinite() {
            prop_assert!(path.is_empty());
            prop_assert!(!nav.is_path_possible(start, goal, false));
        } else {
            prop_assert_eq!(path.first(), Some(&start));
            prop_assert_eq!(path.last(), Some(&goal));
            for w in path.windows(2) {
                prop_assert!(nav.are_connected(w[0], w[1]));
            }
            prop_assert!((nav.path_cost(&path) - best).abs() < 1e-3);
            prop_assert!(nav.is_path_possible(start, goal, false));
        }
    }

    #[test]
    fn adjacent_paths_end_beside_goal(
        world in cube_world(),
        s in any::<prop::sample::Index>(),
        g in any::<prop::sample::Index>(),
    ) {
        let nav = world.nav();
        let coords = world.coords();
        let (start, goal) = (*s.get(&coords), *g.get(&coords));
        let path = nav.find_path(start, goal, true);

        if start == goal {
            prop_assert_eq!(path, vec![start]);
            return Ok(());
        }
        let dist = brute_force_costs(&nav, start);
        let best = goal
            .neighbors()
            .filter(|&n| nav.grid().is_passable(n))
            .filter_map(|n| nav.grid().index_of(n))
            .map(|i| dist[i])
            .fold(f32::INFINITY, f32::min);

        if best.is_infinite() {
            prop_assert!(path.is_empty());
        } else {
            let end = *path.last().unwrap();
            prop_assert!(end.is_adjacent(goal));
            prop_assert!(nav.cell(end).unwrap().is_passable());
            prop_assert_eq!(path.first(), Some(&start));
            prop_assert!((nav.path_cost(&path) - best).abs() < 1e-3);
        }
    }
}
