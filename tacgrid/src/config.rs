// Grid configuration.
//
// Everything tunable about a grid lives in `GridConfig`: dimensions, cell
// size, world origin, the diagonal/corner-cutting switches, slope tolerance,
// corridor box proportions and arc sampler parameters. It is loaded from
// JSON (every field has a default, so partial files work), validated once,
// and never mutated after the grid is built.
//
// See also: `nav_grid.rs` which takes a validated config at construction,
// `builder.rs` for how the corridor proportions are applied, `arc.rs` for
// the arc sampler parameters.

use crate::error::GridError;
use crate::types::WorldPos;
use serde::{Deserialize, Serialize};

/// Proportions of the box swept between two cell centres by the corridor
/// clearance test. Width and height are fractions of the cell size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorridorConfig {
    /// Box width as a fraction of the cell size.
    pub width_factor: f32,
    /// Box height as a fraction of the cell size.
    pub height_factor: f32,
    /// Distance (fraction of the cell size) trimmed off both ends of the
    /// sweep, so the box does not start inside geometry touching the cells.
    pub end_trim: f32,
}

impl Default for CorridorConfig {
    fn default() -> Self {
        Self {
            width_factor: 0.6,
            height_factor: 0.8,
            end_trim: 0.05,
        }
    }
}

/// Parameters of the bounded-retry arc sampler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcConfig {
    /// Number of arc heights tried before giving up.
    pub attempts: u32,
    /// Apex height (world units) of the first attempt.
    pub base_height: f32,
    /// Added to the apex height on each further attempt.
    pub height_step: f32,
    /// Number of segments the curve is divided into; `samples + 1` points
    /// are checked.
    pub samples: u32,
}

impl Default for ArcConfig {
    fn default() -> Self {
        Self {
            attempts: 4,
            base_height: 1.0,
            height_step: 1.0,
            samples: 16,
        }
    }
}

/// Top-level grid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Cell counts along (x, y, z).
    pub dimensions: (u32, u32, u32),
    /// Edge length of one cubic cell in world units.
    pub cell_size: f32,
    /// World position of the minimum corner of cell (0, 0, 0).
    pub origin: WorldPos,
    /// Allow planar and spatial diagonal edges.
    pub allow_diagonals: bool,
    /// Refuse diagonal edges whose orthogonal intermediates are blocked.
    pub prevent_corner_cutting: bool,
    /// Ground whose normal is steeper than this is flagged `STEEP`.
    pub max_walkable_slope_degrees: f32,
    pub corridor: CorridorConfig,
    pub arc: ArcConfig,
    /// Fan the classification pass out across the rayon pool.
    pub parallel_classification: bool,
    /// Node expansions between cancellation checks in background searches.
    pub cancel_poll_interval: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            dimensions: (16, 4, 16),
            cell_size: 1.0,
            origin: WorldPos::ZERO,
            allow_diagonals: true,
            prevent_corner_cutting: true,
            max_walkable_slope_degrees: 45.0,
            corridor: CorridorConfig::default(),
            arc: ArcConfig::default(),
            parallel_classification: true,
            cancel_poll_interval: 64,
        }
    }
}

impl GridConfig {
    /// Convenience constructor for the common case of a unit-sized grid.
    pub fn with_dimensions(x: u32, y: u32, z: u32) -> Self {
        Self {
            dimensions: (x, y, z),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, GridError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, GridError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Total number of cells, or `None` on overflow of the index space.
    pub fn cell_count(&self) -> Option<usize> {
        let (x, y, z) = self.dimensions;
        let total = (x as u64).checked_mul(y as u64)?.checked_mul(z as u64)?;
        if total > u32::MAX as u64 {
            None
        } else {
            Some(total as usize)
        }
    }

    /// Cosine of the slope tolerance: a surface normal whose `y` component
    /// is below this is too steep.
    pub fn slope_cos(&self) -> f32 {
        self.max_walkable_slope_degrees.to_radians().cos()
    }

    pub fn validate(&self) -> Result<(), GridError> {
        let (x, y, z) = self.dimensions;
        if x == 0 || y == 0 || z == 0 || self.cell_count().is_none() {
            return Err(GridError::InvalidDimensions { x, y, z });
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(GridError::InvalidCellSize(self.cell_size));
        }
        if !(0.0..=90.0).contains(&self.max_walkable_slope_degrees) {
            return Err(invalid(
                "max_walkable_slope_degrees",
                format!("{} is outside 0..=90", self.max_walkable_slope_degrees),
            ));
        }
        let c = &self.corridor;
        for (name, value) in [
            ("corridor.width_factor", c.width_factor),
            ("corridor.height_factor", c.height_factor),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(invalid(name, format!("{value} is outside 0..=1")));
            }
        }
        if !c.end_trim.is_finite() || !(0.0..0.5).contains(&c.end_trim) {
            return Err(invalid(
                "corridor.end_trim",
                format!("{} is outside 0..0.5", c.end_trim),
            ));
        }
        if !self.arc.base_height.is_finite() || !self.arc.height_step.is_finite() {
            return Err(invalid("arc", "heights must be finite".into()));
        }
        if self.cancel_poll_interval == 0 {
            return Err(invalid("cancel_poll_interval", "must be at least 1".into()));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: String) -> GridError {
    GridError::InvalidParameter { name, reason }
}
