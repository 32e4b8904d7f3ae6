//! Combat resolution: damage, healing and status application
//!
//! Pipeline order for damaging skills is fixed:
//! evasion -> base damage -> crit -> reaction scale -> outgoing -> incoming
//! -> floor -> hp -> statuses. Rounding happens exactly once, at the end.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::constants::MIN_BASE_DAMAGE;
use crate::battle::skill::{Skill, SkillEffect};
use crate::battle::status::{ApplyOutcome, ModifierAxis, StatusEffect};
use crate::battle::units::BattleUnit;
use crate::core::config::CombatConfig;

/// Situational scaling supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackModifiers {
    /// 1.0 for normal attacks, the AoO multiplier for reactions
    pub reaction_scale: f32,
}

impl Default for AttackModifiers {
    fn default() -> Self {
        Self {
            reaction_scale: 1.0,
        }
    }
}

impl AttackModifiers {
    pub fn reaction(scale: f32) -> Self {
        Self {
            reaction_scale: scale,
        }
    }
}

/// A status that landed on a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedStatus {
    pub name: String,
    pub stacks: u32,
    pub duration: u32,
}

/// What happened to a status a skill tried to apply
#[derive(Debug, Clone, PartialEq)]
pub enum StatusResult {
    Applied(AppliedStatus),
    /// Blocked by a ward
    Resisted(String),
    /// Ledger full or already active with `IgnoreIfPresent`
    NoEffect,
}

impl StatusResult {
    pub fn applied(&self) -> Option<&AppliedStatus> {
        match self {
            StatusResult::Applied(status) => Some(status),
            _ => None,
        }
    }
}

/// Result of one attack (or enemy-targeted status skill)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttackOutcome {
    pub hit: bool,
    pub damage: i32,
    pub crit: bool,
    pub status: Option<StatusResult>,
    pub self_status: Option<StatusResult>,
    /// The defender dropped to 0 hp
    pub killed: bool,
}

/// Result of a heal or support skill
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SupportOutcome {
    pub healed: i32,
    pub status: Option<StatusResult>,
    pub self_status: Option<StatusResult>,
}

/// Roll against `chance`; certain outcomes never touch the RNG
pub fn roll<R: Rng>(rng: &mut R, chance: f32) -> bool {
    if chance <= 0.0 {
        false
    } else if chance >= 1.0 {
        true
    } else {
        rng.gen::<f32>() < chance
    }
}

/// Apply a status to `unit`, honouring wards on harmful statuses
pub fn apply_status(unit: &mut BattleUnit, status: &StatusEffect, max_stacks: u32) -> StatusResult {
    if status.is_harmful() && unit.statuses.is_warded() {
        return StatusResult::Resisted(status.name.clone());
    }
    match unit.statuses.apply(status.clone(), max_stacks) {
        ApplyOutcome::Ignored | ApplyOutcome::Dropped => StatusResult::NoEffect,
        _ => {
            let (stacks, duration) = unit
                .statuses
                .get(&status.name)
                .map_or((1, status.remaining_duration), |s| {
                    (s.stack_count, s.remaining_duration)
                });
            StatusResult::Applied(AppliedStatus {
                name: status.name.clone(),
                stacks,
                duration,
            })
        }
    }
}

fn apply_self_status(caster: &mut BattleUnit, skill: &Skill, config: &CombatConfig) -> Option<StatusResult> {
    if !caster.is_alive() {
        return None;
    }
    skill
        .self_status
        .as_ref()
        .map(|status| apply_status(caster, status, config.max_status_stacks))
}

/// Damage before crit and multipliers, floored at `MIN_BASE_DAMAGE`
pub fn base_damage(attacker: &BattleUnit, defender: &BattleUnit, skill: &Skill, defender_cover: i32) -> f32 {
    let marked_bonus = if defender.statuses.is_marked() {
        skill.marked_bonus
    } else {
        1.0
    };
    let raw = skill.base_power * attacker.scaling_value(skill.scaling) * marked_bonus;
    let effective_defense = (defender.effective_defense() + defender_cover).max(0);
    (raw - effective_defense as f32).max(MIN_BASE_DAMAGE as f32)
}

/// Reaction scale, then attacker outgoing, then defender incoming
fn scale_damage(damage: f32, attacker: &BattleUnit, defender: &BattleUnit, modifiers: AttackModifiers) -> f32 {
    damage
        * modifiers.reaction_scale
        * attacker.statuses.multiplier(ModifierAxis::OutgoingDamage)
        * defender.statuses.multiplier(ModifierAxis::IncomingDamage)
}

/// Resolve an enemy-targeted skill against `defender`
///
/// Costs, cooldowns, range and target validity are checked by the caller.
pub fn resolve_attack<R: Rng>(
    attacker: &mut BattleUnit,
    defender: &mut BattleUnit,
    skill: &Skill,
    defender_cover: i32,
    modifiers: AttackModifiers,
    rng: &mut R,
    config: &CombatConfig,
) -> AttackOutcome {
    let mut outcome = AttackOutcome::default();

    // 1. Evasion
    if roll(rng, defender.effective_dodge()) {
        outcome.self_status = apply_self_status(attacker, skill, config);
        return outcome;
    }
    outcome.hit = true;

    if skill.effect == SkillEffect::Damage {
        // 2. Base damage
        let mut damage = base_damage(attacker, defender, skill, defender_cover);

        // 3. Crit
        if roll(rng, attacker.effective_crit()) {
            damage *= config.crit_multiplier;
            outcome.crit = true;
        }

        // 4. Multipliers, single floor
        let damage = scale_damage(damage, attacker, defender, modifiers);
        let damage = (damage.floor() as i32).max(1);

        // 5. Hp
        outcome.damage = defender.take_damage(damage);
        outcome.killed = !defender.is_alive();
    }

    // 6. Statuses
    if !outcome.killed {
        outcome.status = skill
            .target_status
            .as_ref()
            .map(|status| apply_status(defender, status, config.max_status_stacks));
    }
    outcome.self_status = apply_self_status(attacker, skill, config);

    outcome
}

/// Heal amount before clamping: `floor(base_power × skill_power)`, at least 1
pub fn heal_amount(caster: &BattleUnit, skill: &Skill) -> i32 {
    let raw = skill.base_power * caster.scaling_value(skill.scaling);
    (raw.floor() as i32).max(1)
}

/// Resolve a heal on `target`, or on the caster when `target` is None
pub fn resolve_heal(
    caster: &mut BattleUnit,
    target: Option<&mut BattleUnit>,
    skill: &Skill,
    config: &CombatConfig,
) -> SupportOutcome {
    let amount = heal_amount(caster, skill);
    let max_stacks = config.max_status_stacks;
    let mut outcome = SupportOutcome::default();

    let recipient = match target {
        Some(target) => target,
        None => &mut *caster,
    };
    outcome.healed = recipient.heal(amount);
    outcome.status = skill
        .target_status
        .as_ref()
        .map(|status| apply_status(recipient, status, max_stacks));

    outcome.self_status = apply_self_status(caster, skill, config);
    outcome
}

/// Resolve a status-only ally or self skill
pub fn resolve_support(
    caster: &mut BattleUnit,
    target: Option<&mut BattleUnit>,
    skill: &Skill,
    config: &CombatConfig,
) -> SupportOutcome {
    let max_stacks = config.max_status_stacks;
    let mut outcome = SupportOutcome::default();

    if let Some(status) = skill.target_status.as_ref() {
        let recipient = match target {
            Some(target) => target,
            None => &mut *caster,
        };
        outcome.status = Some(apply_status(recipient, status, max_stacks));
    }

    outcome.self_status = apply_self_status(caster, skill, config);
    outcome
}

/// Expected damage of `skill` without rolling (AI scoring)
pub fn estimate_damage(
    attacker: &BattleUnit,
    defender: &BattleUnit,
    skill: &Skill,
    defender_cover: i32,
    config: &CombatConfig,
) -> f32 {
    if skill.effect != SkillEffect::Damage {
        return 0.0;
    }
    let hit_chance = 1.0 - defender.effective_dodge();
    let crit_factor = 1.0 + attacker.effective_crit() * (config.crit_multiplier - 1.0);
    let damage = base_damage(attacker, defender, skill, defender_cover) * crit_factor;
    let damage = scale_damage(damage, attacker, defender, AttackModifiers::default()).max(1.0);
    hit_chance * damage
}

/// Would a non-critical hit of `skill` finish `defender`?
pub fn can_kill(attacker: &BattleUnit, defender: &BattleUnit, skill: &Skill, defender_cover: i32) -> bool {
    if skill.effect != SkillEffect::Damage {
        return false;
    }
    let damage = base_damage(attacker, defender, skill, defender_cover);
    let damage = scale_damage(damage, attacker, defender, AttackModifiers::default());
    (damage.floor() as i32).max(1) >= defender.hp
}
