use thiserror::Error;

use crate::battle::coord::GridCoord;
use crate::battle::skill::SkillId;
use crate::core::types::{Side, UnitId};

/// Errors raised while setting up a battle or loading data
#[derive(Error, Debug)]
pub enum BattleError {
    #[error("Side {0:?} has no living units")]
    EmptySide(Side),

    #[error("Duplicate unit id: {0}")]
    DuplicateUnitId(UnitId),

    #[error("Unit {unit} cannot be placed at {coord}")]
    InvalidPlacement { unit: UnitId, coord: GridCoord },

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Unit {unit} is malformed: {reason}")]
    InvalidUnit { unit: UnitId, reason: String },

    #[error("Unit {unit} references unknown skill {skill}")]
    UnknownSkill { unit: UnitId, skill: SkillId },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, BattleError>;

/// A submitted action was rejected; the battle state is untouched
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidActionError {
    #[error("No unit is waiting for player input")]
    NotAwaitingInput,

    #[error("The battle is already over")]
    BattleOver,

    #[error("Unknown skill: {0}")]
    UnknownSkill(SkillId),

    #[error("Skill {0} is not in the unit's loadout")]
    SkillNotInLoadout(SkillId),

    #[error("Skill {skill} is on cooldown for {turns} more turn(s)")]
    OnCooldown { skill: SkillId, turns: u32 },

    #[error("Not enough resources for {0}")]
    InsufficientResources(SkillId),

    #[error("Skill {0} is restricted to another class")]
    ClassRestricted(SkillId),

    #[error("Unit cannot guard while sundered")]
    CannotGuard,

    #[error("Skill {0} needs a target")]
    MissingTarget(SkillId),

    #[error("Target {0} is not valid for this skill")]
    InvalidTarget(UnitId),

    #[error("Target {0} is dead")]
    DeadTarget(UnitId),

    #[error("Target {target} is out of range ({distance} > {range})")]
    OutOfRange {
        target: UnitId,
        distance: u32,
        range: u32,
    },

    #[error("No line of sight to {0}")]
    NoLineOfSight(UnitId),

    #[error("Destination {0} cannot be reached this turn")]
    UnreachableDestination(GridCoord),
}

/// No route exists between two cells within the movement budget
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("No path from {from} to {to}")]
pub struct PathNotFound {
    pub from: GridCoord,
    pub to: GridCoord,
}

/// Internal defect signal: a state invariant was broken
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    #[error("{unit} hp {hp} outside 0..={max_hp}")]
    HpOutOfBounds { unit: UnitId, hp: i32, max_hp: i32 },

    #[error("{unit} resource {resource} at {current} exceeds max {max}")]
    ResourceOverflow {
        unit: UnitId,
        resource: &'static str,
        current: i32,
        max: i32,
    },

    #[error("Tile {coord} occupied by {occupant} while placing {incoming}")]
    TileDoubleOccupied {
        coord: GridCoord,
        occupant: UnitId,
        incoming: UnitId,
    },
}

/// Report a broken invariant.
///
/// Debug builds panic; release builds log and let the caller clamp.
pub fn report_invariant(violation: InvariantViolation) {
    debug_assert!(false, "invariant violation: {violation}");
    tracing::error!(%violation, "invariant violation");
}
