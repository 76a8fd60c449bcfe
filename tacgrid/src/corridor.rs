// Corridor clearance: is the straight path between two cell centres
// physically open?
//
// The graph builder sweeps an oriented box (a fraction of the cell size wide
// and tall, trimmed at both ends) from one centre to the other and asks an
// injected `CorridorTester` whether anything obstacle-like is in the way.
// The tester is a narrow capability so the graph core does not depend on any
// particular physics engine.
//
// See also: `terrain.rs` for a voxel-backed tester, `builder.rs` for where
// the query is built and reused.

use crate::config::CorridorConfig;
use crate::types::WorldPos;

/// One sweep request. Built by the builder and reused between calls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CorridorQuery {
    pub from: WorldPos,
    pub to: WorldPos,
    /// Half the box width, world units.
    pub half_width: f32,
    /// Half the box height, world units.
    pub half_height: f32,
    /// Length removed from each end of the sweep, world units.
    pub end_trim: f32,
}

impl CorridorQuery {
    /// Scale the configured proportions by the cell size. Endpoints start
    /// at the origin and are filled in per test.
    pub fn from_config(config: &CorridorConfig, cell_size: f32) -> Self {
        Self {
            from: WorldPos::ZERO,
            to: WorldPos::ZERO,
            half_width: config.width_factor * cell_size * 0.5,
            half_height: config.height_factor * cell_size * 0.5,
            end_trim: config.end_trim * cell_size,
        }
    }

    /// The sweep endpoints after trimming, or `None` if trimming consumes
    /// the whole segment.
    pub fn trimmed(&self) -> Option<(WorldPos, WorldPos)> {
        let delta = self.to - self.from;
        let len = delta.length();
        if len <= 2.0 * self.end_trim {
            return None;
        }
        let dir = delta * (1.0 / len);
        Some((self.from + dir * self.end_trim, self.to - dir * self.end_trim))
    }
}

/// Injected capability answering corridor sweeps. The builder always sweeps
/// from the smaller coordinate to the larger, so an implementation whose
/// answer depends on direction still yields a consistent graph.
pub trait CorridorTester: Send + Sync {
    fn is_clear(&self, query: &CorridorQuery) -> bool;
}

/// A tester for worlds with no obstacle geometry: every corridor is clear,
/// so the graph is driven purely by cell flags.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoObstacles;

impl CorridorTester for NoObstacles {
    fn is_clear(&self, _query: &CorridorQuery) -> bool {
        true
    }
}
