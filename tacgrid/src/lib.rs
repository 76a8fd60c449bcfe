// tacgrid: voxel connectivity graph and A* pathfinding for tactical grids.
//
// This crate turns a dense 3D grid of cells into a graph of which cells a
// unit can step between, keeps that graph current as doors open and units
// move, and answers path queries over it. Physics is not a dependency: ground
// probes and corridor sweeps are injected capabilities, with a voxel-backed
// implementation (`terrain.rs`) for headless use and tests.
//
// Module overview:
// - `types.rs`:       CellCoord, WorldPos, OccupantId, the 26 neighbour offsets.
// - `cell.rs`:        Cell record and its CellFlags attribute set.
// - `edge.rs`:        Canonical undirected CellEdge, step kinds and costs.
// - `grid.rs`:        Dense CellGrid plus radius/box/random-cell queries.
// - `graph.rs`:       ConnectivityGraph: edge set + adjacency mirror + generation.
// - `classify.rs`:    Ground classification pass (GroundClassifier capability).
// - `corridor.rs`:    Corridor clearance query (CorridorTester capability).
// - `terrain.rs`:     SolidField voxel oracle implementing both capabilities.
// - `builder.rs`:     Per-cell edge derivation, full rebuild, incremental updates.
// - `pathfinding.rs`: A* with terminal sets, cancellation, path cost.
// - `arc.rs`:         Bounded-retry parabolic arc sampler.
// - `nav_grid.rs`:    NavGrid, the owned manager tying it all together.
// - `shared.rs`:      SharedNavGrid, RwLock front end with background searches.
// - `map.rs`:         JSON map definitions (config + ASCII voxel layers).
// - `config.rs`:      GridConfig and nested tunables, serde-loadable.
// - `error.rs`:       GridError.
// - `prng`:           Re-exported from `tacgrid_prng`: xoshiro256++ PRNG with SplitMix64 seeding.
//
// **Critical constraint: determinism.** Given the same cell state, graph
// builds and path queries produce identical results: ordered collections
// for everything that is iterated, coordinate tie-breaks in the open set,
// and a seeded PRNG for random-cell queries.

pub mod arc;
pub mod builder;
pub mod cell;
pub mod classify;
pub mod config;
pub mod corridor;
pub mod edge;
pub mod error;
pub mod graph;
pub mod grid;
pub mod map;
pub mod nav_grid;
pub mod pathfinding;
pub use tacgrid_prng as prng;
pub mod shared;
pub mod terrain;
pub mod types;

pub use cell::{Cell, CellFlags};
pub use config::GridConfig;
pub use error::GridError;
pub use nav_grid::NavGrid;
pub use pathfinding::{CancelToken, SearchOutcome};
pub use shared::{PathAnswer, PathTask, SharedNavGrid};
pub use types::{CellCoord, OccupantId, WorldPos};
