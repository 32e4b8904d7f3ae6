//! Battle units: stats, resource pools, loadouts and lifecycle
//!
//! Units are built by the host either through `UnitSeed` (the serde
//! conversion boundary for party/enemy data) or the builder methods on
//! `BattleUnit`. Dead units stay in the roster; they are never removed.

use serde::{Deserialize, Serialize};

use crate::battle::ai::AIProfile;
use crate::battle::coord::GridCoord;
use crate::battle::skill::{ScalingStat, Skill, SkillId};
use crate::battle::status::{ModifierAxis, StatusLedger};
use crate::core::config::CombatConfig;
use crate::core::error::{report_invariant, BattleError, InvariantViolation};
use crate::core::types::{Side, UnitId};

/// Passive abilities granted by equipment or progression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perk {
    /// May strike enemies that disengage
    AttacksOfOpportunity,
}

/// Precomputed combat stats (equipment and perks already folded in)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStats {
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub skill_power: i32,
    /// Base chance in [0, 1]
    pub crit_chance: f32,
    /// Base chance in [0, 1]
    pub dodge_chance: f32,
    pub initiative: i32,
    /// Movement points per turn
    pub speed: f32,
    /// Reach of the basic attack
    pub basic_range: u32,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            max_hp: 20,
            attack: 5,
            defense: 0,
            skill_power: 0,
            crit_chance: 0.0,
            dodge_chance: 0.0,
            initiative: 10,
            speed: 4.0,
            basic_range: 1,
        }
    }
}

/// Integer resource (stamina, mana)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourcePool {
    pub current: i32,
    pub max: i32,
}

impl ResourcePool {
    pub fn full(max: i32) -> Self {
        let max = max.max(0);
        Self { current: max, max }
    }

    pub fn can_afford(&self, cost: i32) -> bool {
        cost <= 0 || self.current >= cost
    }

    /// Deduct `cost`; false (and unchanged) if unaffordable
    pub fn spend(&mut self, cost: i32) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.current -= cost.max(0);
        true
    }

    pub fn restore(&mut self, amount: i32) {
        self.current = (self.current + amount.max(0)).min(self.max);
    }
}

/// Fractional movement budget, refilled every turn
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MovementPool {
    pub current: f32,
    pub max: f32,
}

impl MovementPool {
    pub fn refill(&mut self, max: f32) {
        self.max = max.max(0.0);
        self.current = self.max;
    }

    pub fn spend(&mut self, cost: f32) {
        self.current = (self.current - cost).max(0.0);
    }
}

/// One loadout entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSlot {
    pub skill: SkillId,
    /// Own turns until usable again (0 = ready)
    pub cooldown: u32,
    /// Started this turn; the end-of-turn tick passes over it once
    #[serde(default)]
    pub just_used: bool,
}

/// A combatant on the grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleUnit {
    pub id: UnitId,
    pub name: String,
    /// Class tag checked by class-restricted skills
    pub class: String,
    pub side: Side,
    pub position: GridCoord,
    pub stats: UnitStats,
    pub hp: i32,
    pub stamina: ResourcePool,
    pub mana: ResourcePool,
    pub movement: MovementPool,
    pub stamina_regen: i32,
    pub mana_regen: i32,
    /// None = player-controlled
    pub profile: Option<AIProfile>,
    /// Loadout order matters: AI scans skills in this order
    pub loadout: Vec<SkillSlot>,
    pub statuses: StatusLedger,
    pub reaction_budget: u32,
    pub perks: Vec<Perk>,
    pub alive: bool,
}

impl BattleUnit {
    pub fn new(
        id: UnitId,
        name: impl Into<String>,
        side: Side,
        position: GridCoord,
        stats: UnitStats,
    ) -> Self {
        let max_hp = stats.max_hp.max(1);
        Self {
            id,
            name: name.into(),
            class: String::new(),
            side,
            position,
            stats: UnitStats { max_hp, ..stats },
            hp: max_hp,
            stamina: ResourcePool::full(10),
            mana: ResourcePool::default(),
            movement: MovementPool::default(),
            stamina_regen: 0,
            mana_regen: 0,
            profile: None,
            loadout: Vec::new(),
            statuses: StatusLedger::new(),
            reaction_budget: 0,
            perks: Vec::new(),
            alive: true,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    pub fn with_profile(mut self, profile: AIProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Append a skill to the loadout (duplicates ignored)
    pub fn with_skill(mut self, skill: impl Into<SkillId>) -> Self {
        let skill = skill.into();
        if !skill.is_basic_attack() && !self.loadout.iter().any(|slot| slot.skill == skill) {
            self.loadout.push(SkillSlot {
                skill,
                cooldown: 0,
                just_used: false,
            });
        }
        self
    }

    pub fn with_perk(mut self, perk: Perk) -> Self {
        if !self.perks.contains(&perk) {
            self.perks.push(perk);
        }
        self
    }

    pub fn with_resources(mut self, stamina: i32, mana: i32) -> Self {
        self.stamina = ResourcePool::full(stamina);
        self.mana = ResourcePool::full(mana);
        self
    }

    pub fn with_regen(mut self, stamina: i32, mana: i32) -> Self {
        self.stamina_regen = stamina.max(0);
        self.mana_regen = mana.max(0);
        self
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_player_controlled(&self) -> bool {
        self.profile.is_none()
    }

    pub fn is_hostile_to(&self, other: &BattleUnit) -> bool {
        self.side.is_hostile_to(other.side)
    }

    pub fn has_perk(&self, perk: Perk) -> bool {
        self.perks.contains(&perk)
    }

    pub fn hp_fraction(&self) -> f32 {
        self.hp as f32 / self.stats.max_hp.max(1) as f32
    }

    pub fn missing_hp(&self) -> i32 {
        self.stats.max_hp - self.hp
    }

    pub fn distance_to(&self, other: &BattleUnit) -> u32 {
        self.position.chebyshev(&other.position)
    }

    // === Loadout ===

    /// Every unit knows the basic attack
    pub fn knows_skill(&self, skill: &SkillId) -> bool {
        skill.is_basic_attack() || self.loadout.iter().any(|slot| &slot.skill == skill)
    }

    pub fn cooldown_of(&self, skill: &SkillId) -> u32 {
        self.loadout
            .iter()
            .find(|slot| &slot.skill == skill)
            .map_or(0, |slot| slot.cooldown)
    }

    pub fn start_cooldown(&mut self, skill: &Skill) {
        if let Some(slot) = self.loadout.iter_mut().find(|slot| slot.skill == skill.id) {
            slot.cooldown = skill.cooldown;
            slot.just_used = skill.cooldown > 0;
        }
    }

    /// End-of-turn cooldown decrement
    ///
    /// A skill used this turn keeps its full cooldown, so a cooldown of N
    /// blocks it for the owner's next N turns.
    pub fn tick_cooldowns(&mut self) {
        for slot in &mut self.loadout {
            if slot.just_used {
                slot.just_used = false;
            } else {
                slot.cooldown = slot.cooldown.saturating_sub(1);
            }
        }
    }

    pub fn can_afford(&self, skill: &Skill) -> bool {
        self.stamina.can_afford(skill.stamina_cost) && self.mana.can_afford(skill.mana_cost)
    }

    /// Deduct a skill's costs; false if either pool is short
    pub fn pay_for(&mut self, skill: &Skill) -> bool {
        if !self.can_afford(skill) {
            return false;
        }
        self.stamina.spend(skill.stamina_cost);
        self.mana.spend(skill.mana_cost);
        true
    }

    pub fn class_allows(&self, skill: &Skill) -> bool {
        skill
            .class_restriction
            .as_ref()
            .map_or(true, |class| class == &self.class)
    }

    /// Reach of a skill for this unit; the basic attack uses `basic_range`
    pub fn skill_range(&self, skill: &Skill) -> u32 {
        if skill.id.is_basic_attack() {
            self.stats.basic_range.max(1)
        } else {
            skill.range
        }
    }

    pub fn scaling_value(&self, scaling: ScalingStat) -> f32 {
        match scaling {
            ScalingStat::Attack => self.stats.attack as f32,
            ScalingStat::SkillPower => self.stats.skill_power as f32,
        }
    }

    // === Effective stats ===

    /// `floor(defense × Defense multiplier)`, never negative
    pub fn effective_defense(&self) -> i32 {
        let scaled = self.stats.defense as f32 * self.statuses.multiplier(ModifierAxis::Defense);
        (scaled.floor() as i32).max(0)
    }

    pub fn effective_dodge(&self) -> f32 {
        (self.stats.dodge_chance * self.statuses.multiplier(ModifierAxis::Dodge)).clamp(0.0, 1.0)
    }

    pub fn effective_crit(&self) -> f32 {
        (self.stats.crit_chance * self.statuses.multiplier(ModifierAxis::Crit)).clamp(0.0, 1.0)
    }

    /// Offensive weight used by threat assessment
    pub fn offense(&self) -> f32 {
        self.stats.attack.max(self.stats.skill_power) as f32
            * self.statuses.multiplier(ModifierAxis::OutgoingDamage)
    }

    // === Turn lifecycle ===

    /// Turn-start refresh: movement, reaction budget, regeneration
    ///
    /// Runs before the status tick, so a movement status that expires on
    /// this turn's tick still scales this turn's movement pool.
    pub fn begin_turn(&mut self, reaction_budget: u32) {
        let speed = self.stats.speed * self.statuses.multiplier(ModifierAxis::Movement);
        self.movement.refill(speed);
        self.reaction_budget = if self.has_perk(Perk::AttacksOfOpportunity) {
            reaction_budget
        } else {
            0
        };
        self.stamina.restore(self.stamina_regen);
        self.mana.restore(self.mana_regen);
    }

    /// Subtract hp, clamped at 0; returns damage actually taken
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        if !self.alive || amount <= 0 {
            return 0;
        }
        let taken = amount.min(self.hp);
        self.hp -= taken;
        if self.hp == 0 {
            self.alive = false;
        }
        self.check_invariants();
        taken
    }

    /// Restore hp up to max; returns hp actually restored
    pub fn heal(&mut self, amount: i32) -> i32 {
        if !self.alive || amount <= 0 {
            return 0;
        }
        let restored = amount.min(self.missing_hp());
        self.hp += restored;
        self.check_invariants();
        restored
    }

    /// Death bookkeeping on the unit side; the caller frees the tile
    pub fn mark_dead(&mut self) {
        self.alive = false;
        self.hp = 0;
        self.statuses.clear();
        self.reaction_budget = 0;
        self.movement.current = 0.0;
    }

    /// Reject a unit whose hp, life flag or pools are out of range
    ///
    /// Fields are public, so hand-built units are checked once at battle
    /// start instead of being clamped mid-battle.
    pub fn check_setup(&self) -> Result<(), BattleError> {
        let invalid = |reason: String| -> Result<(), BattleError> {
            Err(BattleError::InvalidUnit {
                unit: self.id,
                reason,
            })
        };
        if self.stats.max_hp < 1 {
            return invalid(format!("max_hp {} is below 1", self.stats.max_hp));
        }
        if self.hp < 0 || self.hp > self.stats.max_hp {
            return invalid(format!("hp {} outside 0..={}", self.hp, self.stats.max_hp));
        }
        if self.alive != (self.hp > 0) {
            return invalid(format!("alive={} with hp {}", self.alive, self.hp));
        }
        for (name, pool) in [("stamina", &self.stamina), ("mana", &self.mana)] {
            if pool.max < 0 || pool.current < 0 || pool.current > pool.max {
                return invalid(format!("{name} {} outside 0..={}", pool.current, pool.max));
            }
        }
        if !self.stats.speed.is_finite() || self.stats.speed < 0.0 {
            return invalid(format!("speed {} is not a non-negative number", self.stats.speed));
        }
        Ok(())
    }

    /// Report and clamp out-of-range hp or resources
    pub fn check_invariants(&mut self) {
        if self.hp < 0 || self.hp > self.stats.max_hp {
            report_invariant(InvariantViolation::HpOutOfBounds {
                unit: self.id,
                hp: self.hp,
                max_hp: self.stats.max_hp,
            });
            self.hp = self.hp.clamp(0, self.stats.max_hp);
        }
        for (name, pool) in [("stamina", &mut self.stamina), ("mana", &mut self.mana)] {
            if pool.current > pool.max {
                report_invariant(InvariantViolation::ResourceOverflow {
                    unit: self.id,
                    resource: name,
                    current: pool.current,
                    max: pool.max,
                });
                pool.current = pool.max;
            }
        }
    }
}

fn default_stamina() -> i32 {
    10
}

/// External descriptor converted into a `BattleUnit`
///
/// This is what the host's party/encounter code hands over; it carries
/// precomputed stats only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSeed {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub class: String,
    pub side: Side,
    pub position: GridCoord,
    #[serde(default)]
    pub stats: UnitStats,
    #[serde(default = "default_stamina")]
    pub stamina: i32,
    #[serde(default)]
    pub mana: i32,
    #[serde(default)]
    pub stamina_regen: i32,
    #[serde(default)]
    pub mana_regen: i32,
    #[serde(default)]
    pub profile: Option<AIProfile>,
    #[serde(default)]
    pub skills: Vec<SkillId>,
    #[serde(default)]
    pub perks: Vec<Perk>,
}

impl UnitSeed {
    pub fn into_unit(self) -> BattleUnit {
        let mut unit = BattleUnit::new(
            UnitId(self.id),
            self.name,
            self.side,
            self.position,
            self.stats,
        )
        .with_class(self.class)
        .with_resources(self.stamina, self.mana)
        .with_regen(self.stamina_regen, self.mana_regen);

        unit.profile = self.profile;
        for skill in self.skills {
            unit = unit.with_skill(skill);
        }
        for perk in self.perks {
            unit = unit.with_perk(perk);
        }
        unit
    }
}

impl From<UnitSeed> for BattleUnit {
    fn from(seed: UnitSeed) -> Self {
        seed.into_unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::skill::SkillCatalog;
    use crate::battle::status::StatusEffect;

    fn unit() -> BattleUnit {
        BattleUnit::new(
            UnitId(1),
            "Tester",
            Side::Player,
            GridCoord::new(0, 0),
            UnitStats {
                max_hp: 30,
                attack: 10,
                defense: 4,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_new_unit_starts_full() {
        let u = unit();
        assert_eq!(u.hp, 30);
        assert!(u.is_alive());
        assert!(u.is_player_controlled());
        assert!(u.knows_skill(&SkillId::basic_attack()));
    }

    #[test]
    fn test_take_damage_clamps_and_kills() {
        let mut u = unit();
        assert_eq!(u.take_damage(12), 12);
        assert_eq!(u.hp, 18);
        assert_eq!(u.take_damage(50), 18);
        assert_eq!(u.hp, 0);
        assert!(!u.is_alive());
        assert_eq!(u.take_damage(5), 0);
    }

    #[test]
    fn test_heal_clamps_at_max() {
        let mut u = unit();
        u.take_damage(5);
        assert_eq!(u.heal(20), 5);
        assert_eq!(u.hp, 30);
    }

    #[test]
    fn test_cooldowns() {
        let catalog = SkillCatalog::standard();
        let strike = catalog.get(&SkillId::new("power_strike")).unwrap();
        let mut u = unit().with_skill("power_strike");

        u.start_cooldown(strike);
        assert_eq!(u.cooldown_of(&strike.id), 2);
        // end of the turn of use
        u.tick_cooldowns();
        assert_eq!(u.cooldown_of(&strike.id), 2);
        u.tick_cooldowns();
        assert_eq!(u.cooldown_of(&strike.id), 1);
        u.tick_cooldowns();
        assert_eq!(u.cooldown_of(&strike.id), 0);
        u.tick_cooldowns();
        assert_eq!(u.cooldown_of(&strike.id), 0);
    }

    #[test]
    fn test_pay_for_skill() {
        let catalog = SkillCatalog::standard();
        let heal = catalog.get(&SkillId::new("heal")).unwrap();
        let mut u = unit().with_resources(5, 2);
        assert!(!u.can_afford(heal));
        assert!(!u.pay_for(heal));
        assert_eq!(u.mana.current, 2);

        let mut caster = unit().with_resources(5, 4);
        assert!(caster.pay_for(heal));
        assert_eq!(caster.mana.current, 1);
    }

    #[test]
    fn test_begin_turn_applies_movement_multiplier_and_perk() {
        let mut u = unit().with_perk(Perk::AttacksOfOpportunity);
        u.statuses.apply(StatusEffect::crippled(2), 5);
        u.begin_turn(1);
        assert_eq!(u.movement.current, 2.0);
        assert_eq!(u.reaction_budget, 1);

        let mut plain = unit();
        plain.begin_turn(1);
        assert_eq!(plain.reaction_budget, 0);
    }

    #[test]
    fn test_expiring_movement_status_still_scales_this_turn() {
        let mut u = unit();
        u.statuses.apply(StatusEffect::crippled(1), 5);
        u.begin_turn(1);
        let report = u.statuses.tick();
        assert_eq!(report.expired, vec!["crippled".to_string()]);
        assert_eq!(u.movement.current, 2.0);

        u.begin_turn(1);
        assert_eq!(u.movement.current, 4.0);
    }

    #[test]
    fn test_regen_never_exceeds_max() {
        let mut u = unit().with_resources(10, 0).with_regen(3, 0);
        u.stamina.spend(2);
        u.begin_turn(1);
        assert_eq!(u.stamina.current, 10);
    }

    #[test]
    fn test_effective_defense_uses_floor() {
        let mut u = unit();
        u.stats.defense = 5;
        u.statuses.apply(StatusEffect::exposed(2), 5);
        assert_eq!(u.effective_defense(), 2);
    }

    #[test]
    fn test_unit_seed_from_json() {
        let seed: UnitSeed = serde_json::from_str(
            r#"{
                "id": 7,
                "name": "Grukk",
                "side": "enemy",
                "position": {"x": 3, "y": 4},
                "stats": {"max_hp": 25, "attack": 6},
                "profile": "brute",
                "skills": ["power_strike"],
                "perks": ["attacks_of_opportunity"]
            }"#,
        )
        .unwrap();

        let unit = seed.into_unit();
        assert_eq!(unit.id, UnitId(7));
        assert_eq!(unit.hp, 25);
        assert_eq!(unit.stats.speed, 4.0);
        assert_eq!(unit.profile, Some(AIProfile::Brute));
        assert!(unit.knows_skill(&SkillId::new("power_strike")));
        assert!(unit.has_perk(Perk::AttacksOfOpportunity));
        assert_eq!(unit.stamina.current, 10);
    }

    #[test]
    fn test_mark_dead_clears_statuses() {
        let mut u = unit();
        u.statuses.apply(StatusEffect::poisoned(3, 1), 5);
        u.mark_dead();
        assert!(u.statuses.is_empty());
        assert!(!u.is_alive());
    }
}
