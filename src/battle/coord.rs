//! Square grid coordinates with 8-way adjacency
//!
//! Melee reach and movement use Chebyshev distance; ranged-only checks may use
//! Manhattan distance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cell coordinate on the battle grid
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// `max(|dx|, |dy|)`
    pub fn chebyshev(&self, other: &Self) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    /// `|dx| + |dy|`
    pub fn manhattan(&self, other: &Self) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    /// Straight-line distance between cell centres
    pub fn euclidean(&self, other: &Self) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_adjacent(&self, other: &Self) -> bool {
        self.chebyshev(other) == 1
    }

    pub fn offset(&self, direction: Direction8) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// All 8 neighbouring coordinates, in `Direction8::all()` order
    pub fn neighbors(&self) -> [GridCoord; 8] {
        Direction8::all().map(|d| self.offset(d))
    }

    /// Cell mirrored through `self` (the far side of `self` as seen from `other`)
    pub fn mirror_of(&self, other: &Self) -> Self {
        Self::new(2 * self.x - other.x, 2 * self.y - other.y)
    }

    /// All cells within Chebyshev `range` (inclusive), row-major order
    pub fn cells_in_range(&self, range: u32) -> Vec<GridCoord> {
        let range = range as i32;
        let mut results = Vec::with_capacity(((2 * range + 1) * (2 * range + 1)) as usize);
        for y in -range..=range {
            for x in -range..=range {
                results.push(GridCoord::new(self.x + x, self.y + y));
            }
        }
        results
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the eight step directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction8 {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction8 {
    /// Offset for this direction (y grows southward)
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction8::North => (0, -1),
            Direction8::NorthEast => (1, -1),
            Direction8::East => (1, 0),
            Direction8::SouthEast => (1, 1),
            Direction8::South => (0, 1),
            Direction8::SouthWest => (-1, 1),
            Direction8::West => (-1, 0),
            Direction8::NorthWest => (-1, -1),
        }
    }

    pub fn is_diagonal(&self) -> bool {
        let (dx, dy) = self.delta();
        dx != 0 && dy != 0
    }

    pub fn all() -> [Direction8; 8] {
        [
            Direction8::North,
            Direction8::NorthEast,
            Direction8::East,
            Direction8::SouthEast,
            Direction8::South,
            Direction8::SouthWest,
            Direction8::West,
            Direction8::NorthWest,
        ]
    }

    /// Direction of a single step between adjacent cells
    pub fn between(from: GridCoord, to: GridCoord) -> Option<Direction8> {
        let delta = (to.x - from.x, to.y - from.y);
        Direction8::all().into_iter().find(|d| d.delta() == delta)
    }
}
