//! Attacks of opportunity
//!
//! A unit that steps out of an enemy's reach provokes a basic attack from
//! every adjacent hostile observer that still has a reaction available.

use crate::battle::coord::GridCoord;
use crate::battle::resolution::{resolve_attack, AttackModifiers, AttackOutcome};
use crate::battle::skill::Skill;
use crate::battle::units::BattleUnit;
use crate::core::config::CombatConfig;
use crate::core::types::UnitId;
use rand::Rng;

/// Can `observer` react to `mover` stepping from `from` to `to`?
pub fn can_react(observer: &BattleUnit, mover: &BattleUnit, from: GridCoord, to: GridCoord) -> bool {
    observer.is_alive()
        && observer.id != mover.id
        && observer.is_hostile_to(mover)
        && observer.reaction_budget > 0
        && !observer.statuses.is_stunned()
        && observer.position.chebyshev(&from) == 1
        && observer.position.chebyshev(&to) > 1
}

/// Observers provoked by one movement step, ascending by id
pub fn provoked_observers(
    units: &[BattleUnit],
    mover: &BattleUnit,
    from: GridCoord,
    to: GridCoord,
) -> Vec<UnitId> {
    let mut observers: Vec<UnitId> = units
        .iter()
        .filter(|observer| can_react(observer, mover, from, to))
        .map(|observer| observer.id)
        .collect();
    observers.sort();
    observers
}

/// Resolve one attack of opportunity and spend the observer's reaction
pub fn resolve_reaction<R: Rng>(
    observer: &mut BattleUnit,
    mover: &mut BattleUnit,
    basic_attack: &Skill,
    mover_cover: i32,
    rng: &mut R,
    config: &CombatConfig,
) -> AttackOutcome {
    observer.reaction_budget = 0;
    tracing::debug!(
        observer = %observer.id,
        mover = %mover.id,
        "attack of opportunity"
    );
    resolve_attack(
        observer,
        mover,
        basic_attack,
        mover_cover,
        AttackModifiers::reaction(config.aoo_damage_multiplier),
        rng,
        config,
    )
}
