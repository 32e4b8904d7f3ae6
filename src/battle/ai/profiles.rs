//! Per-profile target and skill policies
//!
//! Each profile turns the battle view into an `Intent`: who to act on, which
//! skill it would like to use and how to position. Turning the intent into
//! a legal move and skill is left to the shared planner in `ai::mod`.

use crate::battle::ai::context::BattleState;
use crate::battle::ai::positioning::Positioning;
use crate::battle::ai::skills::{
    ally_buffs, best_offense, best_raw_damage, buff_is_fresh, fresh_enemy_skill, heal_skill,
    self_skill, skill_applying,
};
use crate::battle::ai::targeting::{
    find_isolated_targets, select_highest_attack, select_highest_threat, select_lowest_hp,
    select_lowest_hp_fraction, select_marked, select_most_debuffed, select_nearest,
};
use crate::battle::ai::{AIProfile, Intent};
use crate::battle::skill::{Skill, SkillTags};
use crate::battle::status::ModifierAxis;
use crate::battle::units::BattleUnit;

use ordered_float::OrderedFloat;

/// Build the profile's intent for this turn
pub fn plan(profile: AIProfile, unit: &BattleUnit, state: &BattleState) -> Intent {
    match profile {
        AIProfile::Brute => brute(unit, state),
        AIProfile::Skirmisher => skirmisher(unit, state),
        AIProfile::Caster => caster(unit, state),
        AIProfile::Support => support(unit, state),
        AIProfile::Tactician => tactician(unit, state),
        AIProfile::Berserker => berserker(unit, state),
        AIProfile::Defender => defender(unit, state),
        AIProfile::Controller => controller(unit, state),
        AIProfile::Assassin => assassin(unit, state),
        AIProfile::Commander => commander(unit, state),
    }
}

/// Hold range for ranged skills, close in otherwise
fn range_aware(unit: &BattleUnit, skill: Option<&Skill>, state: &BattleState) -> Positioning {
    match skill {
        Some(skill) if unit.skill_range(skill) > 1 => Positioning::HoldRange {
            min: state.config.ai.caster_min_range,
        },
        _ => Positioning::Approach,
    }
}

fn attack_intent(unit: &BattleUnit, target: &BattleUnit, positioning: Positioning, state: &BattleState) -> Intent {
    let skill = best_offense(unit, target, state);
    Intent::new(Some(target.id), skill, positioning)
}

fn brute(unit: &BattleUnit, state: &BattleState) -> Intent {
    let enemies = state.enemies_of(unit);
    let target = select_marked(&enemies)
        .or_else(|| select_highest_threat(&enemies, unit, &state.config.ai));
    match target {
        Some(target) => attack_intent(unit, target, Positioning::Approach, state),
        None => Intent::idle(),
    }
}

fn skirmisher(unit: &BattleUnit, state: &BattleState) -> Intent {
    let enemies = state.enemies_of(unit);
    let Some(target) = select_marked(&enemies).or_else(|| select_lowest_hp(&enemies)) else {
        return Intent::idle();
    };

    if target.hp_fraction() < state.config.ai.low_hp_threshold {
        let debuff = skill_applying(unit, "crippled", state)
            .filter(|_| !target.statuses.has("crippled"))
            .or_else(|| fresh_enemy_skill(unit, target, SkillTags::DEBUFF, state));
        if let Some(skill) = debuff {
            return Intent::new(Some(target.id), Some(skill), Positioning::Flank);
        }
    }
    attack_intent(unit, target, Positioning::Flank, state)
}

fn caster(unit: &BattleUnit, state: &BattleState) -> Intent {
    let enemies = state.enemies_of(unit);
    let Some(target) = select_most_debuffed(&enemies).or_else(|| select_lowest_hp(&enemies)) else {
        return Intent::idle();
    };
    let hold = Positioning::HoldRange {
        min: state.config.ai.caster_min_range,
    };

    if target.statuses.debuff_count() == 0 {
        if let Some(skill) = fresh_enemy_skill(unit, target, SkillTags::DEBUFF, state) {
            return Intent::new(Some(target.id), Some(skill), hold);
        }
    }
    attack_intent(unit, target, hold, state)
}

fn support(unit: &BattleUnit, state: &BattleState) -> Intent {
    let team = state.team_of(unit);
    let threshold = state.config.ai.support_heal_threshold;

    if let Some(heal) = heal_skill(unit, state) {
        let wounded: Vec<&BattleUnit> = team
            .iter()
            .copied()
            .filter(|u| u.hp_fraction() < threshold)
            .collect();
        if let Some(patient) = select_lowest_hp_fraction(&wounded) {
            return Intent::new(Some(patient.id), Some(heal), Positioning::Approach);
        }
    }

    for buff in ally_buffs(unit, state) {
        let lacking: Vec<&BattleUnit> = team
            .iter()
            .copied()
            .filter(|ally| buff_is_fresh(buff, ally))
            .collect();
        if let Some(ally) = select_lowest_hp_fraction(&lacking) {
            return Intent::new(Some(ally.id), Some(buff), Positioning::Approach);
        }
    }

    let enemies = state.enemies_of(unit);
    match select_lowest_hp(&enemies) {
        Some(target) => {
            let skill = best_offense(unit, target, state);
            Intent::new(Some(target.id), skill, range_aware(unit, skill, state))
        }
        None => Intent::idle(),
    }
}

fn tactician(unit: &BattleUnit, state: &BattleState) -> Intent {
    let enemies = state.enemies_of(unit);
    let Some(target) = state
        .focus_target_for(unit)
        .or_else(|| select_highest_threat(&enemies, unit, &state.config.ai))
    else {
        return Intent::idle();
    };

    // Turn one marks, turn two cashes the mark in
    let skill = if !target.statuses.is_marked() {
        fresh_enemy_skill(unit, target, SkillTags::MARK, state)
    } else {
        fresh_enemy_skill(unit, target, SkillTags::COMBO, state)
    };
    match skill {
        Some(skill) => {
            let positioning = if unit.skill_range(skill) > 1 {
                Positioning::Approach
            } else {
                Positioning::Flank
            };
            Intent::new(Some(target.id), Some(skill), positioning)
        }
        None => attack_intent(unit, target, Positioning::Flank, state),
    }
}

fn berserker(unit: &BattleUnit, state: &BattleState) -> Intent {
    let enemies = state.enemies_of(unit);

    if unit.hp_fraction() < state.config.ai.berserk_hp_threshold {
        let Some(target) = select_nearest(&enemies, unit.position) else {
            return Intent::idle();
        };
        if let Some(rage) = self_skill(unit, SkillTags::BUFF, state) {
            return Intent::new(Some(target.id), Some(rage), Positioning::Approach);
        }
        let skill = best_raw_damage(unit, state);
        return Intent::new(Some(target.id), skill, Positioning::Approach);
    }

    match select_highest_attack(&enemies) {
        Some(target) => attack_intent(unit, target, Positioning::Approach, state),
        None => Intent::idle(),
    }
}

fn defender(unit: &BattleUnit, state: &BattleState) -> Intent {
    let enemies = state.enemies_of(unit);
    let threat_range = state.config.ai.defender_threat_range;

    let mut allies = state.allies_of(unit);
    allies.sort_by_key(|ally| (ally.effective_defense(), ally.id));
    for ally in allies {
        let threats: Vec<&BattleUnit> = enemies
            .iter()
            .copied()
            .filter(|e| e.position.chebyshev(&ally.position) <= threat_range)
            .collect();
        if let Some(threat) = select_nearest(&threats, ally.position) {
            return attack_intent(unit, threat, Positioning::Interpose { protect: ally.id }, state);
        }
    }

    let Some(nearest) = select_nearest(&enemies, unit.position) else {
        return Intent::idle();
    };
    if let Some(guard) = self_skill(unit, SkillTags::GUARD, state) {
        return Intent::new(Some(nearest.id), Some(guard), Positioning::Approach);
    }
    attack_intent(unit, nearest, Positioning::Approach, state)
}

fn controller(unit: &BattleUnit, state: &BattleState) -> Intent {
    let enemies = state.enemies_of(unit);
    let clean: Vec<&BattleUnit> = enemies
        .iter()
        .copied()
        .filter(|e| e.statuses.debuff_count() == 0)
        .collect();
    let tuning = &state.config.ai;
    let Some(target) = select_highest_threat(&clean, unit, tuning)
        .or_else(|| select_highest_threat(&enemies, unit, tuning))
    else {
        return Intent::idle();
    };

    let skill = fresh_enemy_skill(unit, target, SkillTags::CONTROL, state)
        .or_else(|| fresh_enemy_skill(unit, target, SkillTags::DEBUFF, state));
    match skill {
        Some(skill) => Intent::new(Some(target.id), Some(skill), range_aware(unit, Some(skill), state)),
        None => {
            let skill = best_offense(unit, target, state);
            Intent::new(Some(target.id), skill, range_aware(unit, skill, state))
        }
    }
}

fn assassin(unit: &BattleUnit, state: &BattleState) -> Intent {
    let isolated = find_isolated_targets(unit, state);
    if let Some(target) = select_lowest_hp(&isolated) {
        let finisher = fresh_enemy_skill(unit, target, SkillTags::BURST | SkillTags::DOT, state);
        if let Some(skill) = finisher {
            return Intent::new(Some(target.id), Some(skill), Positioning::Flank);
        }
        return attack_intent(unit, target, Positioning::Flank, state);
    }

    let enemies = state.enemies_of(unit);
    match select_lowest_hp(&enemies) {
        Some(target) => attack_intent(unit, target, Positioning::Flank, state),
        None => Intent::idle(),
    }
}

fn commander(unit: &BattleUnit, state: &BattleState) -> Intent {
    if state.round <= state.config.ai.commander_buff_rounds {
        let team = state.team_of(unit);
        for buff in ally_buffs(unit, state) {
            let recipient = team
                .iter()
                .copied()
                .filter(|ally| buff_is_fresh(buff, ally))
                .min_by(|a, b| {
                    let weakest = |u: &BattleUnit| OrderedFloat(u.statuses.multiplier(ModifierAxis::OutgoingDamage));
                    weakest(a).cmp(&weakest(b)).then_with(|| a.id.cmp(&b.id))
                });
            if let Some(ally) = recipient {
                return Intent::new(Some(ally.id), Some(buff), Positioning::Approach);
            }
        }
    }

    let enemies = state.enemies_of(unit);
    let target = state
        .focus_target_for(unit)
        .or_else(|| select_highest_threat(&enemies, unit, &state.config.ai));
    match target {
        Some(target) => attack_intent(unit, target, Positioning::Approach, state),
        None => Intent::idle(),
    }
}
