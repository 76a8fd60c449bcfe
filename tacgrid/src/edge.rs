// Undirected cell connections and the step cost model.
//
// An edge is an unordered pair of adjacent coordinates stored canonically
// (smaller coordinate first), so `(a, b)` and `(b, a)` hash and compare as
// the same edge. Edges carry no weight: the cost of a step is a pure
// function of the coordinate delta, which keeps it consistent with the A*
// heuristic in `pathfinding.rs`.

use crate::types::CellCoord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cost of an axis-aligned step.
pub const ORTHOGONAL_COST: f32 = 1.0;
/// Cost of a step along two axes at once.
pub const PLANAR_DIAGONAL_COST: f32 = std::f32::consts::SQRT_2;
/// Cost of a step along all three axes at once (sqrt 3).
pub const SPATIAL_DIAGONAL_COST: f32 = 1.732_050_8;

/// Classification of a single step by how many axes change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    Orthogonal,
    Planar,
    Spatial,
}

impl StepKind {
    /// Classify a step between two adjacent coordinates. `None` if the
    /// coordinates are equal or not adjacent.
    pub fn between(a: CellCoord, b: CellCoord) -> Option<Self> {
        if !a.is_adjacent(b) {
            return None;
        }
        match a.manhattan_distance(b) {
            1 => Some(Self::Orthogonal),
            2 => Some(Self::Planar),
            3 => Some(Self::Spatial),
            _ => None,
        }
    }

    pub fn cost(self) -> f32 {
        match self {
            Self::Orthogonal => ORTHOGONAL_COST,
            Self::Planar => PLANAR_DIAGONAL_COST,
            Self::Spatial => SPATIAL_DIAGONAL_COST,
        }
    }

    pub fn is_diagonal(self) -> bool {
        self != Self::Orthogonal
    }
}

/// Cost of moving from `a` to `b`. Infinite for anything that is not a
/// single step to one of the 26 neighbours.
pub fn step_cost(a: CellCoord, b: CellCoord) -> f32 {
    StepKind::between(a, b).map_or(f32::INFINITY, StepKind::cost)
}

/// Canonical undirected edge between two adjacent cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellEdge {
    a: CellCoord,
    b: CellCoord,
}

impl CellEdge {
    /// Build the canonical edge for `p`-`q`. Self-loops and pairs that are
    /// not neighbours are refused.
    pub fn new(p: CellCoord, q: CellCoord) -> Option<Self> {
        if !p.is_adjacent(q) {
            return None;
        }
        let (a, b) = if p < q { (p, q) } else { (q, p) };
        Some(Self { a, b })
    }

    /// The smaller endpoint.
    pub fn a(&self) -> CellCoord {
        self.a
    }

    /// The larger endpoint.
    pub fn b(&self) -> CellCoord {
        self.b
    }

    pub fn kind(&self) -> StepKind {
        match self.a.manhattan_distance(self.b) {
            1 => StepKind::Orthogonal,
            2 => StepKind::Planar,
            _ => StepKind::Spatial,
        }
    }

    pub fn cost(&self) -> f32 {
        self.kind().cost()
    }

    /// The endpoint opposite `c`, if `c` is an endpoint.
    pub fn other(&self, c: CellCoord) -> Option<CellCoord> {
        if c == self.a {
            Some(self.b)
        } else if c == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

impl fmt::Display for CellEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.a, self.b)
    }
}
