//! AI decision layer
//!
//! Architecture: closed enum + shared planner
//! - `AIProfile` selects a policy (`profiles`) that produces an `Intent`
//! - the planner turns the intent into a legal `Decision`, re-checking range
//!   from the chosen destination and degrading to basic attack, move only,
//!   then pass
//! - `BattleState` is the read-only view every decision gets

pub mod context;
pub mod positioning;
pub mod profiles;
pub mod skills;
pub mod targeting;

pub use context::BattleState;
pub use positioning::Positioning;
pub use targeting::threat_value;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::action::{check_skill, skill_reaches, Action};
use crate::battle::ai::positioning::choose_destination;
use crate::battle::ai::targeting::{select_lowest_hp, select_nearest};
use crate::battle::coord::GridCoord;
use crate::battle::resolution::roll;
use crate::battle::skill::{Skill, SkillId, TargetMode};
use crate::battle::units::BattleUnit;
use crate::core::types::UnitId;

/// Behavioural profile of an AI-controlled unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AIProfile {
    Brute,
    Skirmisher,
    Caster,
    Support,
    Tactician,
    Berserker,
    Defender,
    Controller,
    Assassin,
    Commander,
}

impl AIProfile {
    pub fn all() -> [AIProfile; 10] {
        [
            AIProfile::Brute,
            AIProfile::Skirmisher,
            AIProfile::Caster,
            AIProfile::Support,
            AIProfile::Tactician,
            AIProfile::Berserker,
            AIProfile::Defender,
            AIProfile::Controller,
            AIProfile::Assassin,
            AIProfile::Commander,
        ]
    }

    /// Choose this turn's move and skill
    ///
    /// Deterministic for a given RNG state; the RNG is only drawn from when
    /// `mistake_chance` is strictly between 0 and 1.
    pub fn decide<R: Rng>(&self, unit: &BattleUnit, state: &BattleState, rng: &mut R) -> Decision {
        let mut intent = profiles::plan(*self, unit, state);

        if roll(rng, state.config.ai.mistake_chance) {
            tracing::debug!(unit = %unit.id, profile = ?self, "AI fumbled, falling back to basic attack");
            intent.skill = Some(SkillId::basic_attack());
        }

        realize(unit, &intent, state)
    }
}

/// What a profile wants to do, before legality is checked
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    /// Skill target, and the unit to move relative to
    pub target: Option<UnitId>,
    pub skill: Option<SkillId>,
    pub positioning: Positioning,
}

impl Intent {
    pub fn new(target: Option<UnitId>, skill: Option<&Skill>, positioning: Positioning) -> Self {
        Self {
            target,
            skill: skill.map(|s| s.id.clone()),
            positioning,
        }
    }

    /// Nothing to do (no enemies left)
    pub fn idle() -> Self {
        Self {
            target: None,
            skill: None,
            positioning: Positioning::Stay,
        }
    }
}

/// A legal turn plan
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Decision {
    pub move_target: Option<GridCoord>,
    pub skill_id: Option<SkillId>,
    pub skill_target: Option<UnitId>,
}

impl Decision {
    pub fn pass() -> Self {
        Self::default()
    }
}

impl From<Decision> for Action {
    fn from(decision: Decision) -> Self {
        Action {
            move_to: decision.move_target,
            skill: decision.skill_id,
            target: decision.skill_target,
        }
    }
}

/// Turn an intent into a decision that passes validation
fn realize(unit: &BattleUnit, intent: &Intent, state: &BattleState) -> Decision {
    let target = intent
        .target
        .and_then(|id| state.unit(id))
        .filter(|u| u.is_alive());
    let skill = intent.skill.as_ref().and_then(|id| state.catalog.get(id));
    let Some(basic) = state.catalog.basic_attack() else {
        return Decision::pass();
    };

    let enemies = state.enemies_of(unit);
    let anchor = target.or_else(|| select_nearest(&enemies, unit.position));
    let reach_skill = skill.unwrap_or(basic);
    let destination = match anchor {
        Some(anchor) => choose_destination(unit, anchor, reach_skill, intent.positioning, state),
        None => unit.position,
    };
    let move_target = (destination != unit.position).then_some(destination);

    // Intended skill from the destination
    if let Some(skill) = skill {
        let skill_target = match skill.target_mode {
            TargetMode::SelfOnly => None,
            TargetMode::Ally | TargetMode::Enemy => target.map(|t| t.id),
        };
        if let Ok((_, resolved)) =
            check_skill(unit, &skill.id, skill_target, destination, state.units, state.grid, state.catalog)
        {
            return Decision {
                move_target,
                skill_id: Some(skill.id.clone()),
                skill_target: resolved,
            };
        }
    }

    // Basic attack on the intended target, else the weakest enemy in reach
    let in_reach: Vec<&BattleUnit> = enemies
        .iter()
        .copied()
        .filter(|e| skill_reaches(unit, basic, destination, e, state.grid))
        .collect();
    let fallback = target
        .filter(|t| in_reach.iter().any(|e| e.id == t.id))
        .or_else(|| select_lowest_hp(&in_reach));
    if let Some(victim) = fallback {
        if check_skill(unit, &basic.id, Some(victim.id), destination, state.units, state.grid, state.catalog).is_ok() {
            return Decision {
                move_target,
                skill_id: Some(basic.id.clone()),
                skill_target: Some(victim.id),
            };
        }
    }

    Decision {
        move_target,
        skill_id: None,
        skill_target: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::grid::BattleGrid;
    use crate::battle::scheduler::FocusFire;
    use crate::battle::skill::SkillCatalog;
    use crate::battle::status::StatusEffect;
    use crate::battle::units::UnitStats;
    use crate::core::config::BattleConfig;
    use crate::core::types::Side;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Scene {
        units: Vec<BattleUnit>,
        grid: BattleGrid,
        catalog: SkillCatalog,
        config: BattleConfig,
        round: u32,
    }

    impl Scene {
        fn new(units: Vec<BattleUnit>) -> Self {
            let mut grid = BattleGrid::new(10, 10);
            let mut units = units;
            for u in &mut units {
                grid.place(u.id, u.position).unwrap();
                u.begin_turn(1);
            }
            Self {
                units,
                grid,
                catalog: SkillCatalog::standard(),
                config: BattleConfig::default(),
                round: 1,
            }
        }

        fn decide(&self, index: usize) -> Decision {
            let state = BattleState::new(&self.units, &self.grid, &self.catalog, &self.config, self.round, FocusFire::default());
            let unit = &self.units[index];
            let profile = unit.profile.unwrap_or(AIProfile::Brute);
            profile.decide(unit, &state, &mut ChaCha8Rng::seed_from_u64(11))
        }
    }

    fn unit(id: u32, side: Side, x: i32, y: i32) -> BattleUnit {
        BattleUnit::new(
            UnitId(id),
            format!("u{id}"),
            side,
            GridCoord::new(x, y),
            UnitStats {
                max_hp: 20,
                attack: 6,
                skill_power: 5,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_brute_prefers_marked_target() {
        let mut marked = unit(3, Side::Player, 5, 5);
        marked.statuses.apply(StatusEffect::marked(3), 5);
        let scene = Scene::new(vec![
            unit(1, Side::Enemy, 4, 4).with_profile(AIProfile::Brute),
            unit(2, Side::Player, 3, 3),
            marked,
        ]);
        let decision = scene.decide(0);
        assert_eq!(decision.skill_target, Some(UnitId(3)));
        assert_eq!(decision.skill_id, Some(SkillId::basic_attack()));
    }

    #[test]
    fn test_brute_moves_when_out_of_reach() {
        let scene = Scene::new(vec![
            unit(1, Side::Enemy, 0, 0).with_profile(AIProfile::Brute),
            unit(2, Side::Player, 3, 0),
        ]);
        let decision = scene.decide(0);
        assert_eq!(decision.move_target, Some(GridCoord::new(2, 0)));
        assert_eq!(decision.skill_target, Some(UnitId(2)));
    }

    #[test]
    fn test_nothing_in_reach_is_move_only() {
        let scene = Scene::new(vec![
            unit(1, Side::Enemy, 0, 0).with_profile(AIProfile::Brute),
            unit(2, Side::Player, 9, 9),
        ]);
        let decision = scene.decide(0);
        assert!(decision.move_target.is_some());
        assert!(decision.skill_id.is_none());
    }

    #[test]
    fn test_support_heals_wounded_ally_first() {
        let support = unit(1, Side::Enemy, 2, 2)
            .with_profile(AIProfile::Support)
            .with_skill("heal")
            .with_resources(5, 10);
        let mut hurt = unit(2, Side::Enemy, 3, 2);
        hurt.hp = 4;
        let scene = Scene::new(vec![support, hurt, unit(3, Side::Player, 1, 2)]);
        let decision = scene.decide(0);
        assert_eq!(decision.skill_id, Some(SkillId::new("heal")));
        assert_eq!(decision.skill_target, Some(UnitId(2)));
    }

    #[test]
    fn test_support_attacks_when_team_is_healthy() {
        let support = unit(1, Side::Enemy, 2, 2)
            .with_profile(AIProfile::Support)
            .with_skill("heal")
            .with_resources(5, 10);
        let scene = Scene::new(vec![support, unit(2, Side::Enemy, 3, 2), unit(3, Side::Player, 1, 2)]);
        let decision = scene.decide(0);
        assert_eq!(decision.skill_target, Some(UnitId(3)));
    }

    #[test]
    fn test_tactician_marks_then_combos() {
        let tactician = unit(1, Side::Enemy, 2, 2)
            .with_profile(AIProfile::Tactician)
            .with_skill("mark_target")
            .with_skill("exploit_mark");
        let mut scene = Scene::new(vec![tactician, unit(2, Side::Player, 3, 2)]);
        assert_eq!(scene.decide(0).skill_id, Some(SkillId::new("mark_target")));

        scene.units[1].statuses.apply(StatusEffect::marked(3), 5);
        assert_eq!(scene.decide(0).skill_id, Some(SkillId::new("exploit_mark")));
    }

    #[test]
    fn test_caster_debuffs_before_damage() {
        let mut caster = unit(1, Side::Enemy, 0, 0);
        caster.stats.skill_power = 8;
        let caster = caster
            .with_profile(AIProfile::Caster)
            .with_skill("firebolt")
            .with_skill("hex")
            .with_resources(0, 10);
        let mut scene = Scene::new(vec![caster, unit(2, Side::Player, 3, 0)]);
        let first = scene.decide(0);
        assert_eq!(first.skill_id, Some(SkillId::new("hex")));

        scene.units[1].statuses.apply(StatusEffect::weakened(3), 5);
        let second = scene.decide(0);
        assert_eq!(second.skill_id, Some(SkillId::new("firebolt")));
    }

    #[test]
    fn test_defender_guards_without_threat() {
        let defender = unit(1, Side::Enemy, 0, 0)
            .with_profile(AIProfile::Defender)
            .with_skill("shield_wall");
        let scene = Scene::new(vec![defender, unit(2, Side::Enemy, 1, 0), unit(3, Side::Player, 9, 9)]);
        let decision = scene.decide(0);
        assert_eq!(decision.skill_id, Some(SkillId::new("shield_wall")));
        assert_eq!(decision.skill_target, None);
    }

    #[test]
    fn test_defender_engages_threat_to_ally() {
        let defender = unit(1, Side::Enemy, 0, 0)
            .with_profile(AIProfile::Defender)
            .with_skill("shield_wall");
        let scene = Scene::new(vec![defender, unit(2, Side::Enemy, 3, 0), unit(3, Side::Player, 4, 0)]);
        let decision = scene.decide(0);
        assert_eq!(decision.skill_target, Some(UnitId(3)));
        assert_eq!(decision.move_target, Some(GridCoord::new(3, 1)));
    }

    #[test]
    fn test_berserker_frenzies_when_low() {
        let mut berserker = unit(1, Side::Enemy, 0, 0)
            .with_profile(AIProfile::Berserker)
            .with_skill("frenzy");
        berserker.hp = 5;
        let scene = Scene::new(vec![berserker, unit(2, Side::Player, 1, 0)]);
        let decision = scene.decide(0);
        assert_eq!(decision.skill_id, Some(SkillId::new("frenzy")));
    }

    #[test]
    fn test_commander_buffs_early() {
        let commander = unit(1, Side::Enemy, 0, 0)
            .with_profile(AIProfile::Commander)
            .with_skill("battle_cry");
        let mut scene = Scene::new(vec![commander, unit(2, Side::Enemy, 1, 0), unit(3, Side::Player, 9, 9)]);
        let early = scene.decide(0);
        assert_eq!(early.skill_id, Some(SkillId::new("battle_cry")));
        assert_eq!(early.skill_target, None);

        scene.round = 5;
        assert_ne!(scene.decide(0).skill_id, Some(SkillId::new("battle_cry")));
    }

    #[test]
    fn test_assassin_hunts_isolated() {
        let assassin = unit(1, Side::Enemy, 5, 5)
            .with_profile(AIProfile::Assassin)
            .with_skill("backstab");
        let mut grouped = unit(2, Side::Player, 4, 4);
        grouped.hp = 3;
        let scene = Scene::new(vec![
            assassin,
            grouped,
            unit(3, Side::Player, 4, 5),
            unit(4, Side::Player, 8, 8),
        ]);
        let decision = scene.decide(0);
        assert_eq!(decision.skill_target, Some(UnitId(4)));
        assert_eq!(decision.skill_id, Some(SkillId::new("backstab")));
    }

    #[test]
    fn test_every_profile_returns_legal_decision() {
        for profile in AIProfile::all() {
            let scene = Scene::new(vec![
                unit(1, Side::Enemy, 1, 1).with_profile(profile).with_skill("power_strike"),
                unit(2, Side::Enemy, 2, 1),
                unit(3, Side::Player, 6, 6),
            ]);
            let decision = scene.decide(0);
            let action: Action = decision.into();
            let state = crate::battle::action::validate_action(
                &scene.units[0],
                &action,
                &scene.units,
                &scene.grid,
                &scene.catalog,
                &scene.config.combat,
            );
            assert!(state.is_ok(), "{profile:?} produced {action:?}");
        }
    }
}
