// Map definitions: a grid config plus ASCII voxel layers in one JSON file.
//
// ```json
// {
//   "grid":    { "dimensions": [4, 1, 3], "cell_size": 1.0 },
//   "bedrock": true,
//   "layers":  [ ["....", "..#.", "...."] ]
// }
// ```
//
// `layers` is bottom-up; each layer is a list of z rows, each row a string
// of x columns, `#` for solid. `voxel_size` defaults to the grid's cell
// size and the terrain shares the grid origin. `build_nav_grid` turns the
// definition into a classified `NavGrid` with its graph built, using the
// resulting `SolidField` as both ground classifier and corridor tester.
//
// See also: `terrain.rs` for the voxel field, `tacgrid_cli` which loads
// these files.

use crate::config::GridConfig;
use crate::error::GridError;
use crate::nav_grid::NavGrid;
use crate::terrain::SolidField;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A loadable map: grid parameters plus terrain.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapDefinition {
    pub grid: GridConfig,
    /// Edge length of a terrain voxel; the grid cell size if absent.
    pub voxel_size: Option<f32>,
    /// Treat everything below the bottom layer as solid.
    pub bedrock: bool,
    pub layers: Vec<Vec<String>>,
}

impl MapDefinition {
    /// Parse and validate.
    pub fn from_json(json: &str) -> Result<Self, GridError> {
        let map: Self = serde_json::from_str(json)?;
        map.validate()?;
        Ok(map)
    }

    pub fn load(path: &Path) -> Result<Self, GridError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn voxel_size(&self) -> f32 {
        self.voxel_size.unwrap_or(self.grid.cell_size)
    }

    pub fn validate(&self) -> Result<(), GridError> {
        self.grid.validate()?;
        let voxel_size = self.voxel_size();
        if !voxel_size.is_finite() || voxel_size <= 0.0 {
            return Err(GridError::InvalidParameter {
                name: "voxel_size",
                reason: format!("{voxel_size} must be finite and positive"),
            });
        }
        // Parsing checks that the layers are rectangular.
        SolidField::from_layers(&self.layers).map(|_| ())
    }

    pub fn build_terrain(&self) -> Result<SolidField, GridError> {
        Ok(SolidField::from_layers(&self.layers)?
            .with_voxel_size(self.voxel_size())
            .with_origin(self.grid.origin)
            .with_bedrock(self.bedrock))
    }

    /// Classify against the terrain and build the graph.
    pub fn build_nav_grid(&self) -> Result<NavGrid, GridError> {
        self.validate()?;
        let terrain = self.build_terrain()?;
        let mut nav = NavGrid::new(self.grid.clone(), Box::new(terrain.clone()))?;
        nav.classify(&terrain);
        nav.rebuild_graph();
        Ok(nav)
    }
}
