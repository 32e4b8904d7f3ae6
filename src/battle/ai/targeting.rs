//! Target selection helpers shared by every profile
//!
//! Every selector breaks ties on the lowest unit id, so results never depend
//! on roster order. Cell choices break ties on (x, y).

use std::cmp::Ordering;

use ordered_float::OrderedFloat;

use crate::battle::ai::context::BattleState;
use crate::battle::ai::AIProfile;
use crate::battle::coord::GridCoord;
use crate::battle::units::BattleUnit;
use crate::core::config::AiTuning;
use crate::core::types::{Side, UnitId};

/// How dangerous `candidate` looks to `observer`
///
/// offense × w_off + (1 − hp%) × w_wounded − debuffs × w_debuff − distance × w_distance
pub fn threat_value(candidate: &BattleUnit, observer: &BattleUnit, tuning: &AiTuning) -> f32 {
    let wounded = 1.0 - candidate.hp_fraction();
    let debuffs = candidate.statuses.debuff_count() as f32;
    let distance = candidate.distance_to(observer) as f32;

    candidate.offense() * tuning.threat_offense_weight + wounded * tuning.threat_wounded_weight
        - debuffs * tuning.threat_debuff_weight
        - distance * tuning.threat_distance_weight
}

/// Minimum by `key`, ties to the lowest id
fn min_by_key_then_id<'a, K, F>(candidates: &[&'a BattleUnit], key: F) -> Option<&'a BattleUnit>
where
    K: Ord,
    F: Fn(&BattleUnit) -> K,
{
    candidates
        .iter()
        .copied()
        .min_by(|a, b| key(a).cmp(&key(b)).then_with(|| a.id.cmp(&b.id)))
}

/// Maximum by `key`, ties to the lowest id
fn max_by_key_then_id<'a, K, F>(candidates: &[&'a BattleUnit], key: F) -> Option<&'a BattleUnit>
where
    K: Ord,
    F: Fn(&BattleUnit) -> K,
{
    candidates
        .iter()
        .copied()
        .min_by(|a, b| key(b).cmp(&key(a)).then_with(|| a.id.cmp(&b.id)))
}

pub fn select_lowest_hp<'a>(candidates: &[&'a BattleUnit]) -> Option<&'a BattleUnit> {
    min_by_key_then_id(candidates, |u| u.hp)
}

/// Lowest hp fraction (healing priority)
pub fn select_lowest_hp_fraction<'a>(candidates: &[&'a BattleUnit]) -> Option<&'a BattleUnit> {
    min_by_key_then_id(candidates, |u| OrderedFloat(u.hp_fraction()))
}

pub fn select_marked<'a>(candidates: &[&'a BattleUnit]) -> Option<&'a BattleUnit> {
    let marked: Vec<&BattleUnit> = candidates
        .iter()
        .copied()
        .filter(|u| u.statuses.is_marked())
        .collect();
    min_by_key_then_id(&marked, |u| u.hp)
}

pub fn select_highest_threat<'a>(
    candidates: &[&'a BattleUnit],
    observer: &BattleUnit,
    tuning: &AiTuning,
) -> Option<&'a BattleUnit> {
    max_by_key_then_id(candidates, |u| OrderedFloat(threat_value(u, observer, tuning)))
}

/// Most active debuffs; None unless at least one candidate is debuffed
pub fn select_most_debuffed<'a>(candidates: &[&'a BattleUnit]) -> Option<&'a BattleUnit> {
    max_by_key_then_id(candidates, |u| u.statuses.debuff_count())
        .filter(|u| u.statuses.debuff_count() > 0)
}

pub fn select_nearest<'a>(candidates: &[&'a BattleUnit], from: GridCoord) -> Option<&'a BattleUnit> {
    min_by_key_then_id(candidates, |u| {
        (u.position.chebyshev(&from), OrderedFloat(u.position.euclidean(&from)))
    })
}

pub fn select_highest_attack<'a>(candidates: &[&'a BattleUnit]) -> Option<&'a BattleUnit> {
    max_by_key_then_id(candidates, |u| OrderedFloat(u.offense()))
}

/// Enemies of `observer` with no living ally within `isolation_radius`
pub fn find_isolated_targets<'a>(observer: &BattleUnit, state: &BattleState<'a>) -> Vec<&'a BattleUnit> {
    let radius = state.config.ai.isolation_radius;
    state
        .enemies_of(observer)
        .into_iter()
        .filter(|enemy| {
            !state
                .allies_of(enemy)
                .iter()
                .any(|ally| ally.position.chebyshev(&enemy.position) <= radius)
        })
        .collect()
}

/// Cell next to `target` where `observer` could stand (free or its own)
fn is_standable(observer: &BattleUnit, coord: GridCoord, state: &BattleState) -> bool {
    coord == observer.position || state.grid.is_walkable(coord)
}

/// Cell adjacent to `target` opposite one of `observer`'s allies
///
/// Falls back to the free adjacent cell farthest from the target's own
/// allies. None when the target is fully surrounded.
pub fn find_flanking_position(
    observer: &BattleUnit,
    target: &BattleUnit,
    state: &BattleState,
) -> Option<GridCoord> {
    let mut allies = state.allies_of(observer);
    allies.sort_by_key(|a| a.id);
    for ally in allies {
        if !ally.position.is_adjacent(&target.position) {
            continue;
        }
        let opposite = target.position.mirror_of(&ally.position);
        if is_standable(observer, opposite, state) {
            return Some(opposite);
        }
    }

    let target_allies = state.allies_of(target);
    target
        .position
        .neighbors()
        .into_iter()
        .filter(|cell| is_standable(observer, *cell, state))
        .min_by(|a, b| {
            let spread = |cell: &GridCoord| {
                target_allies
                    .iter()
                    .map(|u| u.position.chebyshev(cell))
                    .min()
                    .unwrap_or(0)
            };
            spread(b).cmp(&spread(a)).then_with(|| a.cmp(b))
        })
}

/// Focus-fire target broadcast by a side's living commander, else tactician
pub fn focus_fire_target(side: Side, units: &[BattleUnit], tuning: &AiTuning) -> Option<UnitId> {
    let leader = [AIProfile::Commander, AIProfile::Tactician]
        .into_iter()
        .find_map(|profile| {
            units
                .iter()
                .filter(|u| u.is_alive() && u.side == side && u.profile == Some(profile))
                .min_by_key(|u| u.id)
        })?;

    let enemies: Vec<&BattleUnit> = units
        .iter()
        .filter(|u| u.is_alive() && u.side != side)
        .collect();
    select_highest_threat(&enemies, leader, tuning).map(|u| u.id)
}

/// Order helper for cells: lower score first, then (x, y)
pub fn compare_cells(a: (f32, GridCoord), b: (f32, GridCoord)) -> Ordering {
    OrderedFloat(a.0)
        .cmp(&OrderedFloat(b.0))
        .then_with(|| a.1.cmp(&b.1))
}
