// Cell records: one per voxel of the grid.
//
// A cell carries an attribute set of independent flags rather than a single
// enum, because the states overlap (ground that is also obstructed by a
// door, occupied ground, forced air, ...). Two masks are kept:
//
// - `state`: what the graph builder and pathfinder read right now.
// - `original_state`: the baseline to return to when an occupant leaves.
//
// Classification and door toggles change the baseline and the live state
// together. Occupation only touches the live state. Area overrides replace
// both.

use crate::types::{CellCoord, OccupantId, WorldPos};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Independent cell state attributes.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CellFlags: u16 {
        /// Solid ground found within the cell's vertical extent.
        const GROUND     = 1 << 0;
        /// No ground found.
        const AIR        = 1 << 1;
        /// Blocked for movement (door panel, blocking prop, override).
        const OBSTRUCTED = 1 << 2;
        /// Nothing occupies the cell.
        const EMPTY      = 1 << 3;
        /// Something occupies the cell.
        const OCCUPIED   = 1 << 4;
        /// Ground whose surface normal is outside the slope tolerance.
        /// Informational; the builder treats it like any other ground.
        const STEEP      = 1 << 5;
        /// State was forced by an area override.
        const FORCED     = 1 << 6;

        /// Bits owned by the classification pass.
        const TERRAIN = Self::GROUND.bits() | Self::AIR.bits() | Self::STEEP.bits();
    }
}

impl Default for CellFlags {
    fn default() -> Self {
        Self::AIR | Self::EMPTY
    }
}

/// One voxel of the grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub coord: CellCoord,
    /// Where a unit standing in this cell is placed. Its height follows the
    /// classified ground surface.
    pub anchor: WorldPos,
    pub state: CellFlags,
    pub original_state: CellFlags,
    pub occupant: Option<OccupantId>,
    /// The current occupant obstructs the cell.
    pub blocking: bool,
}

impl Cell {
    pub fn new(coord: CellCoord, anchor: WorldPos) -> Self {
        Self {
            coord,
            anchor,
            state: CellFlags::default(),
            original_state: CellFlags::default(),
            occupant: None,
            blocking: false,
        }
    }

    /// Ground and not obstructed: eligible as an edge endpoint and as a
    /// path terminal.
    pub fn is_passable(&self) -> bool {
        self.state.contains(CellFlags::GROUND) && !self.state.contains(CellFlags::OBSTRUCTED)
    }

    pub fn is_ground(&self) -> bool {
        self.state.contains(CellFlags::GROUND)
    }

    pub fn is_obstructed(&self) -> bool {
        self.state.contains(CellFlags::OBSTRUCTED)
    }

    /// Write the outcome of ground classification. Only the terrain bits
    /// are replaced; obstruction and occupancy survive a reclassification.
    pub fn apply_classification(&mut self, terrain: CellFlags, anchor_y: f32) {
        let terrain = terrain & CellFlags::TERRAIN;
        self.state = (self.state - CellFlags::TERRAIN) | terrain;
        self.original_state = (self.original_state - CellFlags::TERRAIN) | terrain;
        self.anchor.y = anchor_y;
    }

    /// Place an occupant. Returns `false` (and changes nothing) if the cell
    /// is already taken. A `blocking` occupant also obstructs the cell.
    pub fn occupy(&mut self, occupant: OccupantId, blocking: bool) -> bool {
        if self.occupant.is_some() {
            return false;
        }
        self.original_state = self.state;
        self.occupant = Some(occupant);
        self.blocking = blocking;
        self.state.remove(CellFlags::EMPTY);
        self.state.insert(CellFlags::OCCUPIED);
        self.refresh_obstruction();
        true
    }

    /// Remove the occupant and restore the pre-occupation baseline.
    pub fn vacate(&mut self) -> Option<OccupantId> {
        let occupant = self.occupant.take()?;
        self.blocking = false;
        self.state = self.original_state;
        Some(occupant)
    }

    /// Toggle the obstruction flag as a baseline change (doors, destroyed
    /// cover). Survives a later `vacate`. A blocking occupant keeps the cell
    /// obstructed while it stays.
    pub fn set_obstructed(&mut self, obstructed: bool) {
        self.original_state.set(CellFlags::OBSTRUCTED, obstructed);
        self.refresh_obstruction();
    }

    /// Replace the state wholesale (area override). Occupancy bits and a
    /// blocking occupant's obstruction are reapplied on top.
    pub fn force_state(&mut self, flags: CellFlags) {
        let mut forced = (flags | CellFlags::FORCED) - (CellFlags::EMPTY | CellFlags::OCCUPIED);
        self.original_state = forced | CellFlags::EMPTY;
        if self.occupant.is_some() {
            forced |= CellFlags::OCCUPIED;
        } else {
            forced |= CellFlags::EMPTY;
        }
        self.state = forced;
        self.refresh_obstruction();
    }

    /// Live obstruction is the baseline's or the blocking occupant's.
    fn refresh_obstruction(&mut self) {
        let blocked = self.original_state.contains(CellFlags::OBSTRUCTED)
            || (self.blocking && self.occupant.is_some());
        self.state.set(CellFlags::OBSTRUCTED, blocked);
    }
}
