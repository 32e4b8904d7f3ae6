//! Battle system - turn-based tactical combat on a square grid
//!
//! One battle = a roster of units on a `BattleGrid`, driven round by round
//! by the scheduler until one side is wiped out.
//!
//! Key rules:
//! - 8-connected movement; diagonals cost more and never cut obstacle corners
//! - Every skill goes through one fixed damage pipeline with a single floor
//! - Statuses live in a bounded per-unit ledger and tick at turn start
//! - Enemy turns are decided by per-unit AI profiles; player turns suspend
//!   the battle until an action is submitted

pub mod action;
pub mod ai;
pub mod constants;
pub mod coord;
pub mod events;
pub mod execution;
pub mod grid;
pub mod pathfinding;
pub mod reactions;
pub mod resolution;
pub mod scheduler;
pub mod skill;
pub mod snapshot;
pub mod status;
pub mod terrain;
pub mod units;

// Re-exports for convenient access
pub use action::{validate_action, Action, PlannedAction};
pub use ai::{AIProfile, BattleState, Decision, Intent, Positioning};
pub use constants::*;
pub use coord::{Direction8, GridCoord};
pub use events::{BattleEvent, SkipReason};
pub use execution::{
    get_state, start_battle, start_battle_with, step, submit_player_action, BattleHandle,
};
pub use grid::BattleGrid;
pub use pathfinding::{find_path, path_cost, reachable_cells};
pub use reactions::{can_react, provoked_observers, resolve_reaction};
pub use resolution::{
    estimate_damage, resolve_attack, resolve_heal, resolve_support, AttackModifiers,
    AttackOutcome, StatusResult, SupportOutcome,
};
pub use scheduler::{check_terminal, BattleOutcome, FocusFire, Phase, Scheduler, TurnQueue};
pub use skill::{Skill, SkillCatalog, SkillEffect, SkillId, SkillTags, TargetMode};
pub use snapshot::{BattleStateSnapshot, StatusSnapshot, UnitSnapshot};
pub use status::{
    ApplyOutcome, Capabilities, ModifierAxis, StackingPolicy, StatusEffect, StatusKind,
    StatusLedger,
};
pub use terrain::TerrainCell;
pub use units::{BattleUnit, Perk, UnitSeed, UnitStats};
