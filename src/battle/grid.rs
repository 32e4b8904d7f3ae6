//! Battle grid with terrain, occupancy and line of sight
//!
//! Terrain never changes during a battle; occupancy tracks which living unit
//! stands where and is only updated through placement and movement.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::battle::constants::LOS_SAMPLES_PER_TILE;
use crate::battle::coord::GridCoord;
use crate::battle::terrain::TerrainCell;
use crate::core::error::{report_invariant, BattleError, InvariantViolation};
use crate::core::types::UnitId;

/// The full battle grid
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GridData")]
pub struct BattleGrid {
    pub width: u32,
    pub height: u32,
    cells: Vec<TerrainCell>,
    /// Rebuilt from unit positions when a battle starts
    #[serde(skip)]
    occupants: AHashMap<GridCoord, UnitId>,
}

/// Serialized grid shape, checked before it becomes a `BattleGrid`
#[derive(Deserialize)]
struct GridData {
    width: u32,
    height: u32,
    cells: Vec<TerrainCell>,
}

impl TryFrom<GridData> for BattleGrid {
    type Error = BattleError;

    fn try_from(data: GridData) -> Result<Self, Self::Error> {
        let grid = Self {
            width: data.width,
            height: data.height,
            cells: data.cells,
            occupants: AHashMap::new(),
        };
        grid.validate()?;
        Ok(grid)
    }
}

fn cell_count(width: u32, height: u32) -> Option<usize> {
    (width as usize).checked_mul(height as usize)
}

impl BattleGrid {
    /// Create a new grid of open floor
    pub fn new(width: u32, height: u32) -> Self {
        let cells = cell_count(width, height).unwrap_or(0);
        Self {
            width,
            height,
            cells: vec![TerrainCell::floor(); cells],
            occupants: AHashMap::new(),
        }
    }

    /// Dimensions must fit in signed coordinates and match the cell count
    pub fn validate(&self) -> Result<(), BattleError> {
        if self.width == 0 || self.height == 0 {
            return Err(BattleError::InvalidGrid("grid has no cells".into()));
        }
        if self.width > i32::MAX as u32 || self.height > i32::MAX as u32 {
            return Err(BattleError::InvalidGrid(format!(
                "{}x{} does not fit grid coordinates",
                self.width, self.height
            )));
        }
        match cell_count(self.width, self.height) {
            Some(expected) if expected == self.cells.len() => Ok(()),
            expected => Err(BattleError::InvalidGrid(format!(
                "{}x{} grid needs {} cells, found {}",
                self.width,
                self.height,
                expected.map_or_else(|| "too many".to_string(), |n| n.to_string()),
                self.cells.len()
            ))),
        }
    }

    /// Build a grid from ASCII rows (see `TerrainCell::from_glyph`)
    ///
    /// ```
    /// use grid_skirmish::battle::BattleGrid;
    /// let grid = BattleGrid::from_rows(&["..#", ".~.", "+.."]).unwrap();
    /// assert_eq!(grid.width, 3);
    /// ```
    pub fn from_rows(rows: &[&str]) -> Result<Self, BattleError> {
        let height = rows.len() as u32;
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0) as u32;
        if width == 0 || height == 0 {
            return Err(BattleError::InvalidGrid("grid has no cells".into()));
        }

        let mut grid = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() as u32 != width {
                return Err(BattleError::InvalidGrid(format!(
                    "row {} has length {}, expected {}",
                    y,
                    row.chars().count(),
                    width
                )));
            }
            for (x, glyph) in row.chars().enumerate() {
                let cell = TerrainCell::from_glyph(glyph).ok_or_else(|| {
                    BattleError::InvalidGrid(format!("unknown glyph '{glyph}' at ({x}, {y})"))
                })?;
                grid.set_cell(GridCoord::new(x as i32, y as i32), cell);
            }
        }
        Ok(grid)
    }

    fn index(&self, coord: GridCoord) -> Option<usize> {
        if self.in_bounds(coord) {
            Some(coord.y as usize * self.width as usize + coord.x as usize)
        } else {
            None
        }
    }

    /// Check if coordinate is within grid bounds
    pub fn in_bounds(&self, coord: GridCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < self.width as i32 && coord.y < self.height as i32
    }

    pub fn get_cell(&self, coord: GridCoord) -> Option<&TerrainCell> {
        self.index(coord).and_then(|i| self.cells.get(i))
    }

    /// Replace the terrain at a coordinate (setup only)
    pub fn set_cell(&mut self, coord: GridCoord, cell: TerrainCell) {
        if let Some(slot) = self.index(coord).and_then(|i| self.cells.get_mut(i)) {
            *slot = cell;
        }
    }

    /// Terrain allows standing here, ignoring occupancy
    pub fn is_passable(&self, coord: GridCoord) -> bool {
        self.get_cell(coord)
            .is_some_and(|cell| cell.walkable && !cell.obstacle)
    }

    /// False if occupied, obstacle, non-walkable or out of bounds
    pub fn is_walkable(&self, coord: GridCoord) -> bool {
        self.is_passable(coord) && !self.occupants.contains_key(&coord)
    }

    /// Does this cell stop a diagonal step from cutting past it?
    pub fn blocks_corner(&self, coord: GridCoord) -> bool {
        self.get_cell(coord).map_or(true, |cell| cell.blocks_corner())
    }

    pub fn is_hazard(&self, coord: GridCoord) -> bool {
        self.get_cell(coord).is_some_and(|cell| cell.hazard)
    }

    pub fn cover_at(&self, coord: GridCoord) -> i32 {
        self.get_cell(coord).map_or(0, |cell| cell.cover_bonus)
    }

    pub fn occupant_at(&self, coord: GridCoord) -> Option<UnitId> {
        self.occupants.get(&coord).copied()
    }

    /// Put a unit on a free tile (battle setup)
    pub fn place(&mut self, unit: UnitId, coord: GridCoord) -> Result<(), BattleError> {
        if !self.is_walkable(coord) {
            return Err(BattleError::InvalidPlacement { unit, coord });
        }
        self.occupants.insert(coord, unit);
        Ok(())
    }

    /// Free a tile (unit died or is about to move)
    pub fn vacate(&mut self, coord: GridCoord) -> Option<UnitId> {
        self.occupants.remove(&coord)
    }

    /// Move an occupant one tile; the destination must be walkable
    pub fn move_occupant(&mut self, from: GridCoord, to: GridCoord) -> bool {
        if let Some(incoming) = self.occupants.get(&from).copied() {
            if let Some(occupant) = self.occupant_at(to) {
                report_invariant(InvariantViolation::TileDoubleOccupied {
                    coord: to,
                    occupant,
                    incoming,
                });
                return false;
            }
            if !self.is_passable(to) {
                return false;
            }
            self.occupants.remove(&from);
            self.occupants.insert(to, incoming);
            return true;
        }
        false
    }

    pub fn clear_occupants(&mut self) {
        self.occupants.clear();
    }

    pub fn occupied_count(&self) -> usize {
        self.occupants.len()
    }

    /// Check line of sight between two cells by sampling along the ray
    /// between their centres. Obstacles strictly between the endpoints block.
    pub fn line_of_sight(&self, from: GridCoord, to: GridCoord) -> bool {
        let steps = from.chebyshev(&to) as i32 * LOS_SAMPLES_PER_TILE;
        if steps == 0 {
            return true;
        }

        let dx = (to.x - from.x) as f32;
        let dy = (to.y - from.y) as f32;
        for i in 1..steps {
            let t = i as f32 / steps as f32;
            let sample = GridCoord::new(
                (from.x as f32 + dx * t).round() as i32,
                (from.y as f32 + dy * t).round() as i32,
            );
            if sample == from || sample == to {
                continue;
            }
            if self.get_cell(sample).is_some_and(|cell| cell.blocks_los()) {
                return false;
            }
        }

        true
    }

    /// All walkable in-bounds cells, row-major
    pub fn walkable_cells(&self) -> Vec<GridCoord> {
        let mut cells = Vec::new();
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let coord = GridCoord::new(x, y);
                if self.is_walkable(coord) {
                    cells.push(coord);
                }
            }
        }
        cells
    }
}
