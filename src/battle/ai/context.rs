//! Read-only battle view handed to every AI decision
//!
//! Profiles never mutate anything; the orchestrator builds one of these per
//! decision from the state it owns.

use crate::battle::coord::GridCoord;
use crate::battle::grid::BattleGrid;
use crate::battle::scheduler::FocusFire;
use crate::battle::skill::SkillCatalog;
use crate::battle::units::BattleUnit;
use crate::core::config::BattleConfig;
use crate::core::types::{Round, UnitId};

/// Shared state every `decide` call reads
pub struct BattleState<'a> {
    pub units: &'a [BattleUnit],
    pub grid: &'a BattleGrid,
    pub catalog: &'a SkillCatalog,
    pub config: &'a BattleConfig,
    pub round: Round,
    pub focus_fire: FocusFire,
}

impl<'a> BattleState<'a> {
    pub fn new(
        units: &'a [BattleUnit],
        grid: &'a BattleGrid,
        catalog: &'a SkillCatalog,
        config: &'a BattleConfig,
        round: Round,
        focus_fire: FocusFire,
    ) -> Self {
        Self {
            units,
            grid,
            catalog,
            config,
            round,
            focus_fire,
        }
    }

    /// Get a unit by id, dead or alive
    pub fn unit(&self, id: UnitId) -> Option<&'a BattleUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Living hostile units, roster order
    pub fn enemies_of(&self, unit: &BattleUnit) -> Vec<&'a BattleUnit> {
        self.units
            .iter()
            .filter(|u| u.is_alive() && u.is_hostile_to(unit))
            .collect()
    }

    /// Living friendly units, excluding `unit`
    pub fn allies_of(&self, unit: &BattleUnit) -> Vec<&'a BattleUnit> {
        self.units
            .iter()
            .filter(|u| u.is_alive() && u.id != unit.id && !u.is_hostile_to(unit))
            .collect()
    }

    /// Living friendly units, `unit` included
    pub fn team_of(&self, unit: &BattleUnit) -> Vec<&'a BattleUnit> {
        self.units
            .iter()
            .filter(|u| u.is_alive() && !u.is_hostile_to(unit))
            .collect()
    }

    /// The side's current focus-fire target, if still alive
    pub fn focus_target_for(&self, unit: &BattleUnit) -> Option<&'a BattleUnit> {
        self.focus_fire
            .get(unit.side)
            .and_then(|id| self.unit(id))
            .filter(|u| u.is_alive())
    }

    pub fn cover_at(&self, coord: GridCoord) -> i32 {
        self.grid.cover_at(coord)
    }

    /// Number of living enemies of `unit` adjacent to `coord`
    pub fn adjacent_enemies(&self, unit: &BattleUnit, coord: GridCoord) -> usize {
        self.enemies_of(unit)
            .iter()
            .filter(|e| e.position.chebyshev(&coord) == 1)
            .count()
    }
}
