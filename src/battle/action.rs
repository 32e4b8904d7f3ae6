//! Turn actions and their validation
//!
//! An action is an optional move followed by an optional skill. Validation
//! happens before anything mutates, so a rejected action leaves the battle
//! untouched.

use serde::{Deserialize, Serialize};

use crate::battle::coord::GridCoord;
use crate::battle::grid::BattleGrid;
use crate::battle::pathfinding::find_path;
use crate::battle::skill::{Skill, SkillCatalog, SkillId, TargetMode};
use crate::battle::units::BattleUnit;
use crate::core::config::CombatConfig;
use crate::core::error::InvalidActionError;
use crate::core::types::UnitId;

/// What a unit does with its turn
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Action {
    /// Destination; the route is planned when the action is validated
    #[serde(default)]
    pub move_to: Option<GridCoord>,
    #[serde(default)]
    pub skill: Option<SkillId>,
    #[serde(default)]
    pub target: Option<UnitId>,
}

impl Action {
    /// Do nothing this turn
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn move_to(destination: GridCoord) -> Self {
        Self {
            move_to: Some(destination),
            ..Self::default()
        }
    }

    /// Basic attack against `target`
    pub fn attack(target: UnitId) -> Self {
        Self::skill(SkillId::basic_attack(), Some(target))
    }

    pub fn skill(skill: SkillId, target: Option<UnitId>) -> Self {
        Self {
            move_to: None,
            skill: Some(skill),
            target,
        }
    }

    /// Move first, then act
    pub fn after_moving_to(mut self, destination: GridCoord) -> Self {
        self.move_to = Some(destination);
        self
    }

    pub fn is_pass(&self) -> bool {
        self.move_to.is_none() && self.skill.is_none()
    }
}

/// A validated action, ready to execute
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlannedAction {
    /// Route including the start cell; empty when not moving
    pub path: Vec<GridCoord>,
    pub skill: Option<Skill>,
    /// None for self-targeted skills
    pub target: Option<UnitId>,
}

/// Cooldown, resource, class and guard gating
pub fn check_usable(actor: &BattleUnit, skill: &Skill) -> Result<(), InvalidActionError> {
    if !actor.knows_skill(&skill.id) {
        return Err(InvalidActionError::SkillNotInLoadout(skill.id.clone()));
    }
    let cooldown = actor.cooldown_of(&skill.id);
    if cooldown > 0 {
        return Err(InvalidActionError::OnCooldown {
            skill: skill.id.clone(),
            turns: cooldown,
        });
    }
    if !actor.class_allows(skill) {
        return Err(InvalidActionError::ClassRestricted(skill.id.clone()));
    }
    if skill.is_guard() && actor.statuses.cannot_guard() {
        return Err(InvalidActionError::CannotGuard);
    }
    if !actor.can_afford(skill) {
        return Err(InvalidActionError::InsufficientResources(skill.id.clone()));
    }
    Ok(())
}

/// Range and line-of-sight check from `origin`
pub fn check_reach(
    actor: &BattleUnit,
    skill: &Skill,
    origin: GridCoord,
    target: UnitId,
    target_pos: GridCoord,
    grid: &BattleGrid,
) -> Result<(), InvalidActionError> {
    let range = actor.skill_range(skill);
    let distance = origin.chebyshev(&target_pos);
    if distance > range {
        return Err(InvalidActionError::OutOfRange {
            target,
            distance,
            range,
        });
    }
    if range > 1 && distance > 1 && !grid.line_of_sight(origin, target_pos) {
        return Err(InvalidActionError::NoLineOfSight(target));
    }
    Ok(())
}

/// Could `actor` standing at `origin` hit `target` with `skill`?
pub fn skill_reaches(
    actor: &BattleUnit,
    skill: &Skill,
    origin: GridCoord,
    target: &BattleUnit,
    grid: &BattleGrid,
) -> bool {
    let target_pos = if target.id == actor.id {
        origin
    } else {
        target.position
    };
    check_reach(actor, skill, origin, target.id, target_pos, grid).is_ok()
}

/// Resolve and check the skill part of an action as if cast from `origin`
pub fn check_skill(
    actor: &BattleUnit,
    skill_id: &SkillId,
    target: Option<UnitId>,
    origin: GridCoord,
    units: &[BattleUnit],
    grid: &BattleGrid,
    catalog: &SkillCatalog,
) -> Result<(Skill, Option<UnitId>), InvalidActionError> {
    let skill = catalog
        .get(skill_id)
        .ok_or_else(|| InvalidActionError::UnknownSkill(skill_id.clone()))?;
    check_usable(actor, skill)?;

    if skill.target_mode == TargetMode::SelfOnly {
        return match target {
            Some(id) if id != actor.id => Err(InvalidActionError::InvalidTarget(id)),
            _ => Ok((skill.clone(), None)),
        };
    }

    let target_id = target.ok_or_else(|| InvalidActionError::MissingTarget(skill.id.clone()))?;
    let target_unit = units
        .iter()
        .find(|u| u.id == target_id)
        .ok_or(InvalidActionError::InvalidTarget(target_id))?;
    if !target_unit.is_alive() {
        return Err(InvalidActionError::DeadTarget(target_id));
    }

    let side_ok = match skill.target_mode {
        TargetMode::Ally => !target_unit.is_hostile_to(actor),
        TargetMode::Enemy => target_unit.is_hostile_to(actor),
        TargetMode::SelfOnly => true,
    };
    if !side_ok {
        return Err(InvalidActionError::InvalidTarget(target_id));
    }

    let target_pos = if target_id == actor.id {
        origin
    } else {
        target_unit.position
    };
    check_reach(actor, skill, origin, target_id, target_pos, grid)?;

    let resolved_target = if target_id == actor.id { None } else { Some(target_id) };
    Ok((skill.clone(), resolved_target))
}

/// Validate a full action for `actor` against the current state
pub fn validate_action(
    actor: &BattleUnit,
    action: &Action,
    units: &[BattleUnit],
    grid: &BattleGrid,
    catalog: &SkillCatalog,
    config: &CombatConfig,
) -> Result<PlannedAction, InvalidActionError> {
    let path = match action.move_to {
        Some(destination) if destination != actor.position => find_path(
            grid,
            actor.position,
            destination,
            actor.movement.current,
            config.diagonal_movement_cost,
        )
        .ok_or(InvalidActionError::UnreachableDestination(destination))?,
        _ => Vec::new(),
    };
    let origin = path.last().copied().unwrap_or(actor.position);

    let (skill, target) = match &action.skill {
        Some(skill_id) => {
            let (skill, target) =
                check_skill(actor, skill_id, action.target, origin, units, grid, catalog)?;
            (Some(skill), target)
        }
        None => (None, None),
    };

    Ok(PlannedAction {
        path,
        skill,
        target,
    })
}
