//! Skill definitions and the skill catalog
//!
//! Skills are immutable data. Units only hold ids plus cooldown counters;
//! the catalog resolves ids to definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use ahash::AHashMap;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::battle::status::StatusEffect;
use crate::core::error::Result;

/// Id of the attack every unit knows
pub const BASIC_ATTACK: &str = "basic_attack";

/// Unique skill identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(pub String);

impl SkillId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn basic_attack() -> Self {
        Self(BASIC_ATTACK.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_basic_attack(&self) -> bool {
        self.0 == BASIC_ATTACK
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SkillId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Who a skill may be aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    SelfOnly,
    /// Any living unit on the caster's side, the caster included
    Ally,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillEffect {
    Damage,
    Heal,
    /// Only applies statuses
    StatusOnly,
}

/// Stat multiplied by `base_power`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingStat {
    #[default]
    Attack,
    SkillPower,
}

bitflags! {
    /// Hints the AI profiles use to pick skills
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SkillTags: u16 {
        const OFFENSE = 1 << 0;
        const DEBUFF  = 1 << 1;
        const CONTROL = 1 << 2;
        const DOT     = 1 << 3;
        const BURST   = 1 << 4;
        const HEAL    = 1 << 5;
        const BUFF    = 1 << 6;
        const GUARD   = 1 << 7;
        const MARK    = 1 << 8;
        /// Pays off against marked targets
        const COMBO   = 1 << 9;
    }
}

fn default_marked_bonus() -> f32 {
    1.0
}

fn default_range() -> u32 {
    1
}

/// Immutable skill definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    pub target_mode: TargetMode,
    pub effect: SkillEffect,
    #[serde(default)]
    pub base_power: f32,
    #[serde(default)]
    pub scaling: ScalingStat,
    /// Chebyshev reach; above 1 also needs line of sight
    #[serde(default = "default_range")]
    pub range: u32,
    #[serde(default)]
    pub stamina_cost: i32,
    #[serde(default)]
    pub mana_cost: i32,
    /// Own turns before reuse
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default)]
    pub target_status: Option<StatusEffect>,
    #[serde(default)]
    pub self_status: Option<StatusEffect>,
    /// Only units of this class may use the skill
    #[serde(default)]
    pub class_restriction: Option<String>,
    #[serde(default)]
    pub tags: SkillTags,
    /// Power multiplier against a marked defender
    #[serde(default = "default_marked_bonus")]
    pub marked_bonus: f32,
}

impl Skill {
    pub fn new(id: &str, target_mode: TargetMode, effect: SkillEffect) -> Self {
        Self {
            id: SkillId::new(id),
            name: id.replace('_', " "),
            target_mode,
            effect,
            base_power: 0.0,
            scaling: ScalingStat::Attack,
            range: 1,
            stamina_cost: 0,
            mana_cost: 0,
            cooldown: 0,
            target_status: None,
            self_status: None,
            class_restriction: None,
            tags: SkillTags::empty(),
            marked_bonus: 1.0,
        }
    }

    pub fn with_power(mut self, base_power: f32, scaling: ScalingStat) -> Self {
        self.base_power = base_power;
        self.scaling = scaling;
        self
    }

    pub fn with_range(mut self, range: u32) -> Self {
        self.range = range;
        self
    }

    pub fn with_costs(mut self, stamina: i32, mana: i32) -> Self {
        self.stamina_cost = stamina.max(0);
        self.mana_cost = mana.max(0);
        self
    }

    pub fn with_cooldown(mut self, cooldown: u32) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_target_status(mut self, status: StatusEffect) -> Self {
        self.target_status = Some(status);
        self
    }

    pub fn with_self_status(mut self, status: StatusEffect) -> Self {
        self.self_status = Some(status);
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.class_restriction = Some(class.to_string());
        self
    }

    pub fn with_tags(mut self, tags: SkillTags) -> Self {
        self.tags |= tags;
        self
    }

    pub fn with_marked_bonus(mut self, bonus: f32) -> Self {
        self.marked_bonus = bonus.max(0.0);
        self
    }

    pub fn has_tag(&self, tag: SkillTags) -> bool {
        self.tags.intersects(tag)
    }

    pub fn is_guard(&self) -> bool {
        self.tags.contains(SkillTags::GUARD)
    }

    pub fn targets_enemy(&self) -> bool {
        self.target_mode == TargetMode::Enemy
    }

    /// Applies a harmful status to its target
    pub fn applies_debuff(&self) -> bool {
        self.target_status.as_ref().is_some_and(|s| s.is_harmful())
    }
}

/// Lookup table of skill definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillCatalog {
    skills: AHashMap<SkillId, Skill>,
}

/// On-disk layout: a list of `[[skill]]` tables
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "skill")]
    skills: Vec<Skill>,
}

impl Default for SkillCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl SkillCatalog {
    /// Catalog holding only `basic_attack`
    pub fn minimal() -> Self {
        let mut catalog = Self {
            skills: AHashMap::new(),
        };
        catalog.insert(basic_attack());
        catalog
    }

    /// The shipped content set
    pub fn standard() -> Self {
        let mut catalog = Self::minimal();
        for skill in standard_skills() {
            catalog.insert(skill);
        }
        catalog
    }

    /// Parse `[[skill]]` tables; `basic_attack` is added when missing
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(contents)?;
        let mut catalog = Self::minimal();
        for skill in file.skills {
            catalog.insert(skill);
        }
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Add or replace a definition
    pub fn insert(&mut self, skill: Skill) {
        self.skills.insert(skill.id.clone(), skill);
    }

    pub fn get(&self, id: &SkillId) -> Option<&Skill> {
        self.skills.get(id)
    }

    pub fn contains(&self, id: &SkillId) -> bool {
        self.skills.contains_key(id)
    }

    pub fn basic_attack(&self) -> Option<&Skill> {
        self.skills.get(&SkillId::basic_attack())
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Ids in sorted order
    pub fn ids(&self) -> Vec<SkillId> {
        let mut ids: Vec<SkillId> = self.skills.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn basic_attack() -> Skill {
    Skill::new(BASIC_ATTACK, TargetMode::Enemy, SkillEffect::Damage)
        .with_power(1.0, ScalingStat::Attack)
        .with_tags(SkillTags::OFFENSE)
}

fn standard_skills() -> Vec<Skill> {
    use SkillEffect::*;
    use TargetMode::*;

    vec![
        // Melee
        Skill::new("power_strike", Enemy, Damage)
            .with_power(1.5, ScalingStat::Attack)
            .with_costs(3, 0)
            .with_cooldown(2)
            .with_tags(SkillTags::OFFENSE | SkillTags::BURST),
        Skill::new("reckless_swing", Enemy, Damage)
            .with_power(1.8, ScalingStat::Attack)
            .with_costs(3, 0)
            .with_cooldown(1)
            .with_self_status(StatusEffect::vulnerable(2))
            .with_tags(SkillTags::OFFENSE | SkillTags::BURST),
        Skill::new("hamstring", Enemy, Damage)
            .with_power(0.7, ScalingStat::Attack)
            .with_costs(2, 0)
            .with_cooldown(2)
            .with_target_status(StatusEffect::crippled(2))
            .with_tags(SkillTags::OFFENSE | SkillTags::DEBUFF),
        Skill::new("shield_bash", Enemy, Damage)
            .with_power(0.6, ScalingStat::Attack)
            .with_costs(3, 0)
            .with_cooldown(3)
            .with_target_status(StatusEffect::stunned(2))
            .with_tags(SkillTags::OFFENSE | SkillTags::CONTROL),
        Skill::new("sunder", Enemy, Damage)
            .with_power(0.8, ScalingStat::Attack)
            .with_costs(2, 0)
            .with_cooldown(3)
            .with_target_status(StatusEffect::sundered(2))
            .with_tags(SkillTags::OFFENSE | SkillTags::DEBUFF),
        Skill::new("venom_blade", Enemy, Damage)
            .with_power(0.8, ScalingStat::Attack)
            .with_costs(2, 0)
            .with_cooldown(2)
            .with_target_status(StatusEffect::poisoned(3, 2))
            .with_tags(SkillTags::OFFENSE | SkillTags::DOT),
        Skill::new("backstab", Enemy, Damage)
            .with_power(2.0, ScalingStat::Attack)
            .with_costs(4, 0)
            .with_cooldown(3)
            .with_target_status(StatusEffect::bleeding(2, 2))
            .with_tags(SkillTags::OFFENSE | SkillTags::BURST | SkillTags::DOT),
        Skill::new("exploit_mark", Enemy, Damage)
            .with_power(1.0, ScalingStat::Attack)
            .with_costs(2, 0)
            .with_cooldown(1)
            .with_marked_bonus(1.75)
            .with_tags(SkillTags::OFFENSE | SkillTags::COMBO),
        // Ranged
        Skill::new("crippling_shot", Enemy, Damage)
            .with_power(0.8, ScalingStat::Attack)
            .with_range(4)
            .with_costs(2, 0)
            .with_cooldown(2)
            .with_target_status(StatusEffect::crippled(2))
            .with_tags(SkillTags::OFFENSE | SkillTags::DEBUFF),
        Skill::new("mark_target", Enemy, StatusOnly)
            .with_range(5)
            .with_costs(1, 0)
            .with_cooldown(2)
            .with_target_status(StatusEffect::marked(3))
            .with_tags(SkillTags::MARK | SkillTags::DEBUFF),
        Skill::new("firebolt", Enemy, Damage)
            .with_power(1.2, ScalingStat::SkillPower)
            .with_range(4)
            .with_costs(0, 3)
            .with_tags(SkillTags::OFFENSE),
        Skill::new("hex", Enemy, StatusOnly)
            .with_range(4)
            .with_costs(0, 2)
            .with_cooldown(3)
            .with_target_status(StatusEffect::weakened(3))
            .with_tags(SkillTags::DEBUFF),
        Skill::new("expose", Enemy, StatusOnly)
            .with_range(4)
            .with_costs(0, 2)
            .with_cooldown(3)
            .with_target_status(StatusEffect::exposed(3))
            .with_tags(SkillTags::DEBUFF),
        Skill::new("frost_snare", Enemy, Damage)
            .with_power(0.5, ScalingStat::SkillPower)
            .with_range(4)
            .with_costs(0, 3)
            .with_cooldown(3)
            .with_target_status(StatusEffect::stunned(2))
            .with_tags(SkillTags::CONTROL),
        // Support
        Skill::new("heal", Ally, Heal)
            .with_power(2.0, ScalingStat::SkillPower)
            .with_range(3)
            .with_costs(0, 3)
            .with_cooldown(1)
            .with_tags(SkillTags::HEAL),
        Skill::new("bless", Ally, StatusOnly)
            .with_range(3)
            .with_costs(0, 2)
            .with_cooldown(2)
            .with_target_status(StatusEffect::empowered(2))
            .with_tags(SkillTags::BUFF),
        Skill::new("ward", Ally, StatusOnly)
            .with_range(3)
            .with_costs(0, 2)
            .with_cooldown(3)
            .with_target_status(StatusEffect::warded(2))
            .with_tags(SkillTags::BUFF),
        Skill::new("battle_cry", Ally, StatusOnly)
            .with_range(4)
            .with_costs(2, 0)
            .with_cooldown(2)
            .with_target_status(StatusEffect::empowered(3))
            .with_tags(SkillTags::BUFF),
        // Self
        Skill::new("shield_wall", SelfOnly, StatusOnly)
            .with_costs(2, 0)
            .with_cooldown(2)
            .with_self_status(StatusEffect::guarded(2))
            .with_tags(SkillTags::GUARD),
        Skill::new("frenzy", SelfOnly, StatusOnly)
            .with_costs(2, 0)
            .with_cooldown(4)
            .with_self_status(StatusEffect::enraged(3))
            .with_tags(SkillTags::BUFF),
        Skill::new("sprint", SelfOnly, StatusOnly)
            .with_costs(1, 0)
            .with_cooldown(3)
            .with_self_status(StatusEffect::hasted(2))
            .with_tags(SkillTags::BUFF),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::status::StatusKind;

    #[test]
    fn test_standard_catalog_has_basic_attack() {
        let catalog = SkillCatalog::standard();
        let basic = catalog.basic_attack().unwrap();
        assert_eq!(basic.range, 1);
        assert_eq!(basic.cooldown, 0);
        assert!(basic.targets_enemy());
        assert!(catalog.len() > 10);
    }

    #[test]
    fn test_skill_tags() {
        let catalog = SkillCatalog::standard();
        let wall = catalog.get(&SkillId::new("shield_wall")).unwrap();
        assert!(wall.is_guard());
        let hex = catalog.get(&SkillId::new("hex")).unwrap();
        assert!(hex.applies_debuff());
        assert!(hex.has_tag(SkillTags::DEBUFF | SkillTags::CONTROL));
    }

    #[test]
    fn test_catalog_from_toml() {
        let catalog = SkillCatalog::from_toml_str(
            r#"
            [[skill]]
            id = "acid_splash"
            name = "Acid Splash"
            target_mode = "enemy"
            effect = "damage"
            base_power = 0.9
            scaling = "skill_power"
            range = 3
            mana_cost = 2
            tags = "OFFENSE | DOT"

            [skill.target_status]
            name = "poisoned"
            kind = "dot"
            duration = 2
            stacking_policy = "stack"
            damage_per_turn = 1
            "#,
        )
        .expect("valid catalog");

        assert!(catalog.basic_attack().is_some());
        let acid = catalog.get(&SkillId::new("acid_splash")).unwrap();
        assert_eq!(acid.scaling, ScalingStat::SkillPower);
        assert_eq!(acid.marked_bonus, 1.0);
        assert!(acid.has_tag(SkillTags::DOT));
        let status = acid.target_status.as_ref().unwrap();
        assert_eq!(status.kind, StatusKind::Dot);
        assert_eq!(status.stack_count, 1);
        assert_eq!(status.remaining_duration, 2);
    }

    #[test]
    fn test_catalog_rejects_bad_toml() {
        assert!(SkillCatalog::from_toml_str("[[skill]]\nid = 3").is_err());
    }

    #[test]
    fn test_skill_id_display() {
        assert_eq!(SkillId::basic_attack().to_string(), "basic_attack");
        assert!(SkillId::from("basic_attack").is_basic_attack());
    }
}
