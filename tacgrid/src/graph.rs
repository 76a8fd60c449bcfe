// Connectivity graph: which neighbouring cells a unit can step between.
//
// Two views of the same edge set are kept in lockstep:
//
// - `edges`: the canonical `BTreeSet<CellEdge>`, for counting, iteration and
//   diagnostics. Each undirected edge appears once.
// - `adjacency`: a per-coordinate neighbour list, for O(1) neighbour queries
//   from the pathfinder. Lists hold at most 26 entries and usually far
//   fewer, so they are `SmallVec`s searched linearly.
//
// Every mutation funnels through `add_edge` / `remove_edge`, which update
// both views for both endpoints together. That is what keeps the symmetry
// invariant (edge (a, b) present <=> b in adj(a) and a in adj(b)) from ever
// being violated by a partial update. Self-loops and pairs that are not
// 26-neighbours are refused at the door by `CellEdge::new`.
//
// `generation` is bumped on every effective mutation so readers holding an
// answer can tell whether the graph moved underneath them (see `shared.rs`).
//
// Ordered collections keep iteration deterministic: two builds from the same
// state produce identical edge sets in identical order.
//
// See also: `builder.rs` which derives edge sets from cell state,
// `pathfinding.rs` which only ever reads `neighbors()`.

use crate::edge::CellEdge;
use crate::types::CellCoord;
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

/// Neighbour list of one cell.
pub type NeighborList = SmallVec<[CellCoord; 8]>;

/// Canonical edge set plus adjacency mirror.
#[derive(Clone, Debug, Default)]
pub struct ConnectivityGraph {
    edges: BTreeSet<CellEdge>,
    adjacency: BTreeMap<CellCoord, NeighborList>,
    generation: u64,
}

impl ConnectivityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect `a` and `b`. Returns `false` if the edge already exists or is
    /// not a legal edge (self-loop, not adjacent).
    pub fn add_edge(&mut self, a: CellCoord, b: CellCoord) -> bool {
        let Some(edge) = CellEdge::new(a, b) else {
            return false;
        };
        if !self.edges.insert(edge) {
            return false;
        }
        self.adjacency.entry(a).or_default().push(b);
        self.adjacency.entry(b).or_default().push(a);
        self.generation += 1;
        true
    }

    /// Disconnect `a` and `b`. Returns `false` if they were not connected.
    pub fn remove_edge(&mut self, a: CellCoord, b: CellCoord) -> bool {
        let Some(edge) = CellEdge::new(a, b) else {
            return false;
        };
        if !self.edges.remove(&edge) {
            return false;
        }
        self.detach(a, b);
        self.detach(b, a);
        self.generation += 1;
        true
    }

    /// Drop `to` from `from`'s list, and the list itself once empty.
    fn detach(&mut self, from: CellCoord, to: CellCoord) {
        if let Some(list) = self.adjacency.get_mut(&from) {
            if let Some(pos) = list.iter().position(|&n| n == to) {
                list.swap_remove(pos);
            }
            if list.is_empty() {
                self.adjacency.remove(&from);
            }
        }
    }

    /// Remove every edge touching `c`. Returns how many were removed.
    pub fn clear_edges_for(&mut self, c: CellCoord) -> usize {
        let neighbors: NeighborList = self.neighbors(c).iter().copied().collect();
        neighbors
            .into_iter()
            .filter(|&n| self.remove_edge(c, n))
            .count()
    }

    /// Replace `c`'s neighbour set with `new_set` by symmetric diff: edges in
    /// the old set but not the new one are removed, edges in the new set but
    /// not the old one are added. Returns `(added, removed)`.
    pub fn apply_neighbor_set(&mut self, c: CellCoord, new_set: &[CellCoord]) -> (usize, usize) {
        let old: NeighborList = self.neighbors(c).iter().copied().collect();
        let removed = old
            .iter()
            .filter(|n| !new_set.contains(n))
            .filter(|&&n| self.remove_edge(c, n))
            .count();
        let added = new_set
            .iter()
            .filter(|n| !old.contains(n))
            .filter(|&&n| self.add_edge(c, n))
            .count();
        (added, removed)
    }

    pub fn are_connected(&self, a: CellCoord, b: CellCoord) -> bool {
        CellEdge::new(a, b).is_some_and(|e| self.edges.contains(&e))
    }

    pub fn has_any_edge(&self, c: CellCoord) -> bool {
        self.adjacency.contains_key(&c)
    }

    /// Neighbours of `c`; empty for unknown or isolated coordinates.
    pub fn neighbors(&self, c: CellCoord) -> &[CellCoord] {
        self.adjacency.get(&c).map_or(&[], |list| list.as_slice())
    }

    pub fn degree(&self, c: CellCoord) -> usize {
        self.neighbors(c).len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Canonical edges in sorted order.
    pub fn edges(&self) -> impl Iterator<Item = &CellEdge> {
        self.edges.iter()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Remove every edge.
    pub fn clear(&mut self) {
        if !self.edges.is_empty() {
            self.edges.clear();
            self.adjacency.clear();
            self.generation += 1;
        }
    }

    /// Check both views agree. Used by tests and debug assertions.
    pub fn is_consistent(&self) -> bool {
        let mirrored: usize = self.adjacency.values().map(|l| l.len()).sum();
        mirrored == 2 * self.edges.len()
            && self.adjacency.iter().all(|(&a, list)| {
                !list.is_empty()
                    && list.iter().all(|&b| {
                        self.are_connected(a, b) && self.neighbors(b).contains(&a)
                    })
            })
    }
}
