//! Terrain cells and their effects
//!
//! Terrain is static for the whole battle; units only ever reference coordinates.

use serde::{Deserialize, Serialize};

/// Static properties of one grid tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerrainCell {
    /// Units may stand here
    pub walkable: bool,
    /// Added to the defense of a unit standing here
    pub cover_bonus: i32,
    /// Entering deals flat hazard damage
    pub hazard: bool,
    /// Blocks movement, sight and diagonal corner cutting
    pub obstacle: bool,
}

impl Default for TerrainCell {
    fn default() -> Self {
        Self::floor()
    }
}

impl TerrainCell {
    pub fn floor() -> Self {
        Self {
            walkable: true,
            cover_bonus: 0,
            hazard: false,
            obstacle: false,
        }
    }

    /// Wall, pillar, boulder
    pub fn obstacle() -> Self {
        Self {
            walkable: false,
            cover_bonus: 0,
            hazard: false,
            obstacle: true,
        }
    }

    /// Fire, spikes, acid
    pub fn hazard() -> Self {
        Self {
            hazard: true,
            ..Self::floor()
        }
    }

    /// Low wall or rubble a unit can hide behind
    pub fn cover(bonus: i32) -> Self {
        Self {
            cover_bonus: bonus.max(0),
            ..Self::floor()
        }
    }

    /// Chasm or deep water: not walkable but sight passes over it
    pub fn pit() -> Self {
        Self {
            walkable: false,
            cover_bonus: 0,
            hazard: false,
            obstacle: false,
        }
    }

    /// Parse the ASCII glyph used by `BattleGrid::from_rows`
    pub fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '.' => Some(Self::floor()),
            '#' => Some(Self::obstacle()),
            '~' => Some(Self::hazard()),
            '+' => Some(Self::cover(2)),
            '_' => Some(Self::pit()),
            _ => None,
        }
    }

    /// Does this tile stop units from cutting a corner past it?
    pub fn blocks_corner(&self) -> bool {
        self.obstacle || !self.walkable
    }

    pub fn blocks_los(&self) -> bool {
        self.obstacle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_is_walkable() {
        let floor = TerrainCell::floor();
        assert!(floor.walkable);
        assert!(!floor.blocks_los());
    }

    #[test]
    fn test_obstacle_blocks_everything() {
        let wall = TerrainCell::obstacle();
        assert!(!wall.walkable);
        assert!(wall.blocks_los());
        assert!(wall.blocks_corner());
    }

    #[test]
    fn test_pit_blocks_corner_but_not_sight() {
        let pit = TerrainCell::pit();
        assert!(pit.blocks_corner());
        assert!(!pit.blocks_los());
    }

    #[test]
    fn test_glyphs() {
        assert_eq!(TerrainCell::from_glyph('+').map(|c| c.cover_bonus), Some(2));
        assert!(TerrainCell::from_glyph('~').is_some_and(|c| c.hazard));
        assert!(TerrainCell::from_glyph('?').is_none());
    }
}
