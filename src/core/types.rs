//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a battle unit
///
/// Ids are supplied by the host when units are converted for battle.
/// Lower ids win every AI tie-break, so hosts control priority by ordering them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl UnitId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// Which side of the encounter a unit fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The player and their allies
    Player,
    Enemy,
}

impl Side {
    pub fn opposing(&self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }

    pub fn is_hostile_to(&self, other: Side) -> bool {
        *self != other
    }

    pub fn all() -> [Side; 2] {
        [Side::Player, Side::Enemy]
    }
}

/// Round counter (one round = every living unit acts once)
pub type Round = u32;
