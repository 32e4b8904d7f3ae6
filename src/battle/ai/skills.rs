//! Skill choice for AI units
//!
//! Only skills that pass the same gating the dispatcher enforces are ever
//! considered: known, off cooldown, affordable, class-permitted and not a
//! guard skill while the unit cannot guard.

use ordered_float::OrderedFloat;

use crate::battle::action::check_usable;
use crate::battle::ai::context::BattleState;
use crate::battle::resolution::estimate_damage;
use crate::battle::skill::{Skill, SkillEffect, SkillTags, TargetMode};
use crate::battle::units::BattleUnit;

/// Usable skills in loadout order, basic attack last
pub fn usable_skills<'a>(unit: &BattleUnit, state: &BattleState<'a>) -> Vec<&'a Skill> {
    let mut skills: Vec<&'a Skill> = unit
        .loadout
        .iter()
        .filter_map(|slot| state.catalog.get(&slot.skill))
        .filter(|skill| check_usable(unit, skill).is_ok())
        .collect();
    if let Some(basic) = state.catalog.basic_attack() {
        if check_usable(unit, basic).is_ok() {
            skills.push(basic);
        }
    }
    skills
}

fn is_damage_skill(skill: &Skill) -> bool {
    skill.target_mode == TargetMode::Enemy && skill.effect == SkillEffect::Damage
}

/// Usable enemy-targeted damage skill with the best expected damage
///
/// Ties keep loadout order.
pub fn best_offense<'a>(unit: &BattleUnit, target: &BattleUnit, state: &BattleState<'a>) -> Option<&'a Skill> {
    let cover = state.cover_at(target.position);
    let combat = &state.config.combat;
    usable_skills(unit, state)
        .into_iter()
        .filter(|skill| is_damage_skill(skill))
        .enumerate()
        .max_by(|(ia, a), (ib, b)| {
            let da = OrderedFloat(estimate_damage(unit, target, a, cover, combat));
            let db = OrderedFloat(estimate_damage(unit, target, b, cover, combat));
            da.cmp(&db).then_with(|| ib.cmp(ia))
        })
        .map(|(_, skill)| skill)
}

/// Highest raw output, ignoring the target's defense and evasion
pub fn best_raw_damage<'a>(unit: &BattleUnit, state: &BattleState<'a>) -> Option<&'a Skill> {
    usable_skills(unit, state)
        .into_iter()
        .filter(|skill| is_damage_skill(skill))
        .enumerate()
        .max_by(|(ia, a), (ib, b)| {
            let raw = |s: &Skill| OrderedFloat(s.base_power * unit.scaling_value(s.scaling));
            raw(a).cmp(&raw(b)).then_with(|| ib.cmp(ia))
        })
        .map(|(_, skill)| skill)
}

/// First usable enemy skill carrying any of `tags` whose status the target
/// does not already have
pub fn fresh_enemy_skill<'a>(
    unit: &BattleUnit,
    target: &BattleUnit,
    tags: SkillTags,
    state: &BattleState<'a>,
) -> Option<&'a Skill> {
    usable_skills(unit, state).into_iter().find(|skill| {
        skill.targets_enemy()
            && skill.has_tag(tags)
            && skill
                .target_status
                .as_ref()
                .map_or(true, |status| !target.statuses.has(&status.name))
    })
}

/// First usable enemy skill applying the named status
pub fn skill_applying<'a>(
    unit: &BattleUnit,
    status_name: &str,
    state: &BattleState<'a>,
) -> Option<&'a Skill> {
    usable_skills(unit, state).into_iter().find(|skill| {
        skill.targets_enemy()
            && skill
                .target_status
                .as_ref()
                .is_some_and(|status| status.name == status_name)
    })
}

/// First usable heal skill
pub fn heal_skill<'a>(unit: &BattleUnit, state: &BattleState<'a>) -> Option<&'a Skill> {
    usable_skills(unit, state)
        .into_iter()
        .find(|skill| skill.effect == SkillEffect::Heal && skill.target_mode != TargetMode::Enemy)
}

/// Ally-targeted buffs in loadout order
pub fn ally_buffs<'a>(unit: &BattleUnit, state: &BattleState<'a>) -> Vec<&'a Skill> {
    usable_skills(unit, state)
        .into_iter()
        .filter(|skill| {
            skill.target_mode == TargetMode::Ally
                && skill.has_tag(SkillTags::BUFF)
                && skill.target_status.is_some()
        })
        .collect()
}

/// Does `ally` still lack the status `skill` would give it?
pub fn buff_is_fresh(skill: &Skill, ally: &BattleUnit) -> bool {
    skill
        .target_status
        .as_ref()
        .is_some_and(|status| !ally.statuses.has(&status.name))
}

/// First usable self skill with `tag` whose self status is not active
pub fn self_skill<'a>(unit: &BattleUnit, tag: SkillTags, state: &BattleState<'a>) -> Option<&'a Skill> {
    usable_skills(unit, state).into_iter().find(|skill| {
        skill.target_mode == TargetMode::SelfOnly
            && skill.has_tag(tag)
            && skill
                .self_status
                .as_ref()
                .map_or(true, |status| !unit.statuses.has(&status.name))
    })
}
