// Voxel-backed terrain oracle.
//
// `SolidField` is a dense boolean voxel grid (solid / open) stored as a flat
// `Vec<bool>` indexed by `x + z * size_x + y * size_x * size_z`, the same
// layout as `CellGrid`. It answers both injected capabilities of the graph
// core, so a map can be built end to end without a physics engine:
//
// - `GroundClassifier`: scan the voxel column under the probe and report the
//   top face of the first solid voxel within range. Voxel tops are flat, so
//   the normal is always +Y.
// - `CorridorTester`: five parallel segment casts (the box centre line and
//   its four cross-section corners), each a 3D DDA voxel walk (Amanatides &
//   Woo). Any solid voxel touched blocks the corridor.
//
// Out-of-bounds voxels are open, except below y = 0 when `bedrock` is set,
// which lets the bottom cell layer stand on an implicit floor.
//
// See also: `map.rs` which builds a `SolidField` from ASCII layers,
// `classify.rs` and `corridor.rs` for the traits implemented here.

use crate::classify::{GroundClassifier, GroundHit, GroundProbe};
use crate::corridor::{CorridorQuery, CorridorTester};
use crate::error::GridError;
use crate::types::{CellCoord, WorldPos};

/// Dense solid/open voxel field.
#[derive(Clone, Debug, Default)]
pub struct SolidField {
    voxels: Vec<bool>,
    size_x: u32,
    size_y: u32,
    size_z: u32,
    voxel_size: f32,
    origin: WorldPos,
    bedrock: bool,
}

impl SolidField {
    /// An all-open field of unit voxels at the world origin.
    pub fn new(size_x: u32, size_y: u32, size_z: u32) -> Self {
        let total = (size_x as usize) * (size_y as usize) * (size_z as usize);
        Self {
            voxels: vec![false; total],
            size_x,
            size_y,
            size_z,
            voxel_size: 1.0,
            origin: WorldPos::ZERO,
            bedrock: false,
        }
    }

    pub fn with_voxel_size(mut self, voxel_size: f32) -> Self {
        self.voxel_size = voxel_size;
        self
    }

    pub fn with_origin(mut self, origin: WorldPos) -> Self {
        self.origin = origin;
        self
    }

    /// Treat everything below y = 0 as solid.
    pub fn with_bedrock(mut self, bedrock: bool) -> Self {
        self.bedrock = bedrock;
        self
    }

    /// Parse ASCII layers: one `Vec<String>` per y level (bottom first),
    /// one string per z row, one character per x column. `#` is solid,
    /// anything else is open. Rows and layers must be rectangular.
    pub fn from_layers(layers: &[Vec<String>]) -> Result<Self, GridError> {
        let size_y = layers.len();
        let size_z = layers.first().map_or(0, Vec::len);
        let size_x = layers
            .first()
            .and_then(|rows| rows.first())
            .map_or(0, |row| row.chars().count());
        if size_x == 0 || size_y == 0 || size_z == 0 {
            return Err(GridError::MalformedMap("map has no voxels".into()));
        }

        let mut field = Self::new(size_x as u32, size_y as u32, size_z as u32);
        for (y, rows) in layers.iter().enumerate() {
            if rows.len() != size_z {
                return Err(GridError::MalformedMap(format!(
                    "layer {y} has {} rows, expected {size_z}",
                    rows.len()
                )));
            }
            for (z, row) in rows.iter().enumerate() {
                if row.chars().count() != size_x {
                    return Err(GridError::MalformedMap(format!(
                        "layer {y} row {z} has {} columns, expected {size_x}",
                        row.chars().count()
                    )));
                }
                for (x, ch) in row.chars().enumerate() {
                    if ch == '#' {
                        field.set(CellCoord::new(x as i32, y as i32, z as i32), true);
                    }
                }
            }
        }
        Ok(field)
    }

    pub fn dimensions(&self) -> (u32, u32, u32) {
        (self.size_x, self.size_y, self.size_z)
    }

    fn index(&self, v: CellCoord) -> Option<usize> {
        let in_bounds = v.x >= 0
            && v.y >= 0
            && v.z >= 0
            && (v.x as u32) < self.size_x
            && (v.y as u32) < self.size_y
            && (v.z as u32) < self.size_z;
        in_bounds.then(|| {
            let sx = self.size_x as usize;
            let sz = self.size_z as usize;
            v.x as usize + v.z as usize * sx + v.y as usize * sx * sz
        })
    }

    pub fn is_solid(&self, v: CellCoord) -> bool {
        match self.index(v) {
            Some(i) => self.voxels[i],
            None => self.bedrock && v.y < 0,
        }
    }

    /// No-op outside the field.
    pub fn set(&mut self, v: CellCoord, solid: bool) {
        if let Some(i) = self.index(v) {
            self.voxels[i] = solid;
        }
    }

    /// Set every voxel in the inclusive box `[min, max]`.
    pub fn fill_box(&mut self, min: CellCoord, max: CellCoord, solid: bool) {
        for y in min.y..=max.y {
            for z in min.z..=max.z {
                for x in min.x..=max.x {
                    self.set(CellCoord::new(x, y, z), solid);
                }
            }
        }
    }

    /// World position to continuous voxel-space position.
    fn to_voxel_space(&self, p: WorldPos) -> [f32; 3] {
        let local = (p - self.origin) * (1.0 / self.voxel_size);
        local.to_array()
    }

    /// 3D DDA walk from `from` to `to` (world space). True if any solid voxel
    /// is touched, including the ones containing the endpoints.
    pub fn segment_hits_solid(&self, from: WorldPos, to: WorldPos) -> bool {
        let start = self.to_voxel_space(from);
        let end = self.to_voxel_space(to);
        let dir = [end[0] - start[0], end[1] - start[1], end[2] - start[2]];

        let mut voxel = start.map(|c| c.floor() as i32);
        let end_voxel = end.map(|c| c.floor() as i32);

        let mut step = [0i32; 3];
        let mut t_max = [f32::INFINITY; 3];
        let mut t_delta = [f32::INFINITY; 3];
        for axis in 0..3 {
            if dir[axis] > 0.0 {
                step[axis] = 1;
                t_delta[axis] = 1.0 / dir[axis];
                t_max[axis] = ((voxel[axis] as f32 + 1.0) - start[axis]) / dir[axis];
            } else if dir[axis] < 0.0 {
                step[axis] = -1;
                t_delta[axis] = -1.0 / dir[axis];
                t_max[axis] = (start[axis] - voxel[axis] as f32) / -dir[axis];
            }
        }

        loop {
            if self.is_solid(CellCoord::new(voxel[0], voxel[1], voxel[2])) {
                return true;
            }
            if voxel == end_voxel {
                return false;
            }
            let axis = if t_max[0] <= t_max[1] && t_max[0] <= t_max[2] {
                0
            } else if t_max[1] <= t_max[2] {
                1
            } else {
                2
            };
            if t_max[axis] > 1.0 {
                return false;
            }
            voxel[axis] += step[axis];
            t_max[axis] += t_delta[axis];
        }
    }
}

impl GroundClassifier for SolidField {
    fn probe(&self, probe: &GroundProbe) -> Option<GroundHit> {
        let [vx, vy, vz] = self.to_voxel_space(probe.origin);
        let (x, z) = (vx.floor() as i32, vz.floor() as i32);
        let reach = probe.max_distance / self.voxel_size;

        // Voxel j has its top face at height j + 1. Accept faces strictly
        // below the probe origin and no more than `reach` under it.
        let highest = vy.ceil() as i32 - 2;
        let lowest = (vy - reach).ceil() as i32 - 1;
        if self.is_solid(CellCoord::new(x, highest + 1, z)) {
            // Probe starts inside solid: the cell itself is filled.
            return None;
        }
        (lowest..=highest)
            .rev()
            .find(|&j| self.is_solid(CellCoord::new(x, j, z)))
            .map(|j| {
                let top = self.origin.y + (j + 1) as f32 * self.voxel_size;
                GroundHit {
                    point: WorldPos::new(probe.origin.x, top, probe.origin.z),
                    normal: WorldPos::UP,
                }
            })
    }
}

impl CorridorTester for SolidField {
    fn is_clear(&self, query: &CorridorQuery) -> bool {
        let Some((from, to)) = query.trimmed() else {
            return true;
        };
        let dir = to - from;
        let side = {
            let s = WorldPos::new(-dir.z, 0.0, dir.x).normalized();
            if s == WorldPos::ZERO { WorldPos::new(1.0, 0.0, 0.0) } else { s }
        };
        let w = side * query.half_width;
        let h = WorldPos::UP * query.half_height;
        let offsets = [WorldPos::ZERO, w + h, w - h, h - w, (w + h) * -1.0];
        offsets
            .iter()
            .all(|&o| !self.segment_hits_solid(from + o, to + o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorridorConfig;

    fn probe_cell(field: &SolidField, x: i32, y: i32, z: i32) -> Option<GroundHit> {
        field.probe(&GroundProbe {
            origin: WorldPos::new(x as f32 + 0.5, (y + 1) as f32, z as f32 + 0.5),
            max_distance: 1.0,
        })
    }

    fn corridor(field: &SolidField, a: CellCoord, b: CellCoord) -> bool {
        let mut q = CorridorQuery::from_config(&CorridorConfig::default(), 1.0);
        let center = |c: CellCoord| {
            WorldPos::new(c.x as f32 + 0.5, c.y as f32 + 0.5, c.z as f32 + 0.5)
        };
        q.from = center(a);
        q.to = center(b);
        field.is_clear(&q)
    }

    #[test]
    fn out_of_bounds_is_open_unless_bedrock() {
        let field = SolidField::new(4, 4, 4);
        assert!(!field.is_solid(CellCoord::new(0, -1, 0)));
        let field = field.with_bedrock(true);
        assert!(field.is_solid(CellCoord::new(0, -1, 0)));
        assert!(!field.is_solid(CellCoord::new(-1, 0, 0)));
        assert!(!field.is_solid(CellCoord::new(0, 9, 0)));
    }

    #[test]
    fn segment_hits_interior_voxel() {
        let mut field = SolidField::new(16, 16, 16);
        field.set(CellCoord::new(8, 4, 8), true);
        assert!(field.segment_hits_solid(
            WorldPos::new(0.5, 4.5, 8.5),
            WorldPos::new(15.5, 4.5, 8.5)
        ));
        assert!(!field.segment_hits_solid(
            WorldPos::new(0.5, 0.5, 0.5),
            WorldPos::new(15.5, 0.5, 0.5)
        ));
    }

    #[test]
    fn segment_includes_destination_voxel() {
        let mut field = SolidField::new(8, 8, 8);
        field.set(CellCoord::new(5, 1, 1), true);
        assert!(field.segment_hits_solid(
            WorldPos::new(1.5, 1.5, 1.5),
            WorldPos::new(5.5, 1.5, 1.5)
        ));
    }

    #[test]
    fn probe_finds_floor_under_cell() {
        let field = SolidField::new(3, 3, 3).with_bedrock(true);
        let hit = probe_cell(&field, 1, 0, 1).unwrap();
        assert_eq!(hit.point.y, 0.0);
        assert_eq!(hit.normal, WorldPos::UP);
        // One layer up there is nothing within reach.
        assert!(probe_cell(&field, 1, 1, 1).is_none());
    }

    #[test]
    fn probe_inside_solid_misses() {
        let mut field = SolidField::new(3, 3, 3).with_bedrock(true);
        field.set(CellCoord::new(1, 0, 1), true);
        assert!(probe_cell(&field, 1, 0, 1).is_none());
        // The cell above now stands on the raised voxel.
        assert_eq!(probe_cell(&field, 1, 1, 1).unwrap().point.y, 1.0);
    }

    #[test]
    fn wall_blocks_corridor() {
        let mut field = SolidField::new(3, 2, 3).with_bedrock(true);
        let a = CellCoord::new(0, 0, 1);
        let b = CellCoord::new(2, 0, 1);
        assert!(corridor(&field, a, CellCoord::new(1, 0, 1)));
        field.set(CellCoord::new(1, 0, 1), true);
        assert!(!corridor(&field, a, CellCoord::new(1, 0, 1)));
        assert!(!corridor(&field, a, b));
    }

    #[test]
    fn corridor_ignores_floor_below() {
        let field = SolidField::new(3, 1, 3).with_bedrock(true);
        assert!(corridor(&field, CellCoord::new(0, 0, 0), CellCoord::new(1, 0, 1)));
    }

    #[test]
    fn diagonal_corridor_clipped_by_corner_post() {
        let mut field = SolidField::new(3, 1, 3).with_bedrock(true);
        // Post on the x-axis intermediate of the (0,0,0) -> (1,0,1) diagonal.
        field.set(CellCoord::new(1, 0, 0), true);
        assert!(!corridor(&field, CellCoord::new(0, 0, 0), CellCoord::new(1, 0, 1)));
    }

    #[test]
    fn corridor_is_symmetric() {
        let mut field = SolidField::new(4, 2, 4).with_bedrock(true);
        field.set(CellCoord::new(2, 0, 1), true);
        for a in [CellCoord::new(1, 0, 1), CellCoord::new(1, 0, 2)] {
            for b in [CellCoord::new(2, 0, 2), CellCoord::new(3, 0, 1)] {
                assert_eq!(corridor(&field, a, b), corridor(&field, b, a));
            }
        }
    }

    #[test]
    fn layers_parse() {
        let layers = vec![
            vec!["###".to_string(), "#.#".to_string()],
            vec!["...".to_string(), ".#.".to_string()],
        ];
        let field = SolidField::from_layers(&layers).unwrap();
        assert_eq!(field.dimensions(), (3, 2, 2));
        assert!(field.is_solid(CellCoord::new(0, 0, 0)));
        assert!(!field.is_solid(CellCoord::new(1, 0, 1)));
        assert!(field.is_solid(CellCoord::new(1, 1, 1)));
    }

    #[test]
    fn ragged_layers_rejected() {
        let layers = vec![vec!["###".to_string(), "##".to_string()]];
        assert!(matches!(
            SolidField::from_layers(&layers),
            Err(GridError::MalformedMap(_))
        ));
        assert!(SolidField::from_layers(&[]).is_err());
    }
}
