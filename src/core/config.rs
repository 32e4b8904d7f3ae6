//! Battle configuration with documented constants
//!
//! Every knob the simulation reads at runtime is collected here. Values can be
//! overridden from TOML; missing keys fall back to the defaults in
//! `battle::constants`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::battle::constants::*;
use crate::core::error::Result;

/// Numeric rules of the combat pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Cost of one diagonal step. Cardinal steps always cost 1.0.
    ///
    /// Must stay within [1.0, 2.0] for the Chebyshev heuristic to remain
    /// admissible and for diagonals to ever be worth taking.
    pub diagonal_movement_cost: f32,

    /// Damage scale applied to attacks of opportunity
    pub aoo_damage_multiplier: f32,

    /// Damage multiplier on a critical hit
    pub crit_multiplier: f32,

    /// Cap on `stack_count` for `Stack` policy statuses
    pub max_status_stacks: u32,

    /// Flat damage dealt when a unit steps onto a hazard tile
    pub hazard_damage: i32,

    /// Rounds after which an undecided battle is called a defeat
    pub max_rounds: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            diagonal_movement_cost: DIAGONAL_MOVEMENT_COST,
            aoo_damage_multiplier: AOO_DAMAGE_MULTIPLIER,
            crit_multiplier: CRIT_MULTIPLIER,
            max_status_stacks: MAX_STATUS_STACKS,
            hazard_damage: HAZARD_DAMAGE,
            max_rounds: MAX_ROUNDS,
        }
    }
}

/// Weights and thresholds read by the AI profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiTuning {
    /// HP fraction under which a target counts as "low" (skirmisher cripples)
    pub low_hp_threshold: f32,
    /// HP fraction under which a berserker switches to its frenzy policy
    pub berserk_hp_threshold: f32,
    /// Allies under this HP fraction need healing from a support unit
    pub support_heal_threshold: f32,
    /// A target with no ally within this radius is isolated
    pub isolation_radius: u32,
    /// Distance at which an enemy threatens an ally (defender profile)
    pub defender_threat_range: u32,
    /// Closest distance a caster accepts before backing off
    pub caster_min_range: u32,
    /// Rounds during which a commander prefers buffing allies
    pub commander_buff_rounds: u32,
    /// Chance a unit fumbles its plan and falls back to a basic attack
    pub mistake_chance: f32,
    /// `threat_value` weight for offensive stat
    pub threat_offense_weight: f32,
    /// `threat_value` weight for missing HP fraction
    pub threat_wounded_weight: f32,
    /// `threat_value` penalty per active debuff
    pub threat_debuff_weight: f32,
    /// `threat_value` penalty per tile of distance
    pub threat_distance_weight: f32,
    /// Score penalty for ending movement on a hazard tile
    pub hazard_avoidance_penalty: f32,
}

impl Default for AiTuning {
    fn default() -> Self {
        Self {
            low_hp_threshold: LOW_HP_THRESHOLD,
            berserk_hp_threshold: BERSERK_HP_THRESHOLD,
            support_heal_threshold: SUPPORT_HEAL_THRESHOLD,
            isolation_radius: ISOLATION_RADIUS,
            defender_threat_range: DEFENDER_THREAT_RANGE,
            caster_min_range: CASTER_MIN_RANGE,
            commander_buff_rounds: COMMANDER_BUFF_ROUNDS,
            mistake_chance: 0.0,
            threat_offense_weight: THREAT_OFFENSE_WEIGHT,
            threat_wounded_weight: THREAT_WOUNDED_WEIGHT,
            threat_debuff_weight: THREAT_DEBUFF_WEIGHT,
            threat_distance_weight: THREAT_DISTANCE_WEIGHT,
            hazard_avoidance_penalty: HAZARD_AVOIDANCE_PENALTY,
        }
    }
}

/// Complete battle configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleConfig {
    #[serde(default)]
    pub combat: CombatConfig,
    #[serde(default)]
    pub ai: AiTuning,
}

impl BattleConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: BattleConfig = toml::from_str(contents)?;
        Ok(config.sanitized())
    }

    /// Load a config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Clamp values into the ranges the simulation relies on
    ///
    /// Non-finite floats (TOML accepts `nan` and `inf`) fall back to their
    /// defaults before clamping.
    pub fn sanitized(mut self) -> Self {
        let base = BattleConfig::default();

        let combat = &mut self.combat;
        combat.diagonal_movement_cost =
            finite_or(combat.diagonal_movement_cost, base.combat.diagonal_movement_cost).clamp(1.0, 2.0);
        combat.aoo_damage_multiplier =
            finite_or(combat.aoo_damage_multiplier, base.combat.aoo_damage_multiplier).max(0.0);
        combat.crit_multiplier = finite_or(combat.crit_multiplier, base.combat.crit_multiplier).max(1.0);
        combat.max_status_stacks = combat.max_status_stacks.max(1);
        combat.hazard_damage = combat.hazard_damage.max(0);
        combat.max_rounds = combat.max_rounds.max(1);

        let ai = &mut self.ai;
        let tuning = base.ai;
        ai.mistake_chance = finite_or(ai.mistake_chance, tuning.mistake_chance).clamp(0.0, 1.0);
        ai.low_hp_threshold = finite_or(ai.low_hp_threshold, tuning.low_hp_threshold).clamp(0.0, 1.0);
        ai.berserk_hp_threshold = finite_or(ai.berserk_hp_threshold, tuning.berserk_hp_threshold).clamp(0.0, 1.0);
        ai.support_heal_threshold =
            finite_or(ai.support_heal_threshold, tuning.support_heal_threshold).clamp(0.0, 1.0);
        ai.threat_offense_weight = finite_or(ai.threat_offense_weight, tuning.threat_offense_weight);
        ai.threat_wounded_weight = finite_or(ai.threat_wounded_weight, tuning.threat_wounded_weight);
        ai.threat_debuff_weight = finite_or(ai.threat_debuff_weight, tuning.threat_debuff_weight);
        ai.threat_distance_weight = finite_or(ai.threat_distance_weight, tuning.threat_distance_weight);
        ai.hazard_avoidance_penalty = finite_or(ai.hazard_avoidance_penalty, tuning.hazard_avoidance_penalty);
        self
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
