//! Destination choice for AI movement
//!
//! Every candidate comes from a Dijkstra flood of the unit's movement
//! budget, so any chosen cell is reachable this turn. Lower scores win;
//! equal scores fall back to (x, y) order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::action::skill_reaches;
use crate::battle::ai::context::BattleState;
use crate::battle::ai::targeting::{compare_cells, find_flanking_position};
use crate::battle::coord::GridCoord;
use crate::battle::pathfinding::reachable_cells;
use crate::battle::skill::Skill;
use crate::battle::units::BattleUnit;
use crate::core::types::UnitId;

// Score bands keep "can act" cells ahead of "closer" cells
const OUT_OF_REACH: f32 = 100.0;
const TOO_CLOSE: f32 = 50.0;
const MOVE_COST_WEIGHT: f32 = 0.01;

/// How a unit wants to stand relative to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Positioning {
    /// Close until the skill reaches, moving as little as possible
    Approach,
    /// Stand opposite an ally around the target
    Flank,
    /// Keep at least `min` tiles from every enemy while in reach
    HoldRange { min: u32 },
    /// Stand between `protect` and the target
    Interpose { protect: UnitId },
    Stay,
    /// Maximise distance from the nearest enemy
    Retreat,
}

/// Pick where to end movement this turn
pub fn choose_destination(
    unit: &BattleUnit,
    target: &BattleUnit,
    skill: &Skill,
    positioning: Positioning,
    state: &BattleState,
) -> GridCoord {
    if positioning == Positioning::Stay || unit.movement.current <= 0.0 {
        return unit.position;
    }

    let reachable = reachable_cells(
        state.grid,
        unit.position,
        unit.movement.current,
        state.config.combat.diagonal_movement_cost,
    );

    match positioning {
        Positioning::Stay => unit.position,
        Positioning::Approach => approach(unit, target, skill, &reachable, state),
        Positioning::Flank => find_flanking_position(unit, target, state)
            .filter(|cell| reachable.contains_key(cell))
            .unwrap_or_else(|| approach(unit, target, skill, &reachable, state)),
        Positioning::HoldRange { min } => hold_range(unit, target, skill, min, &reachable, state),
        Positioning::Interpose { protect } => match state.unit(protect).filter(|u| u.is_alive()) {
            Some(ward) => interpose(unit, target, ward, skill, &reachable, state),
            None => approach(unit, target, skill, &reachable, state),
        },
        Positioning::Retreat => retreat(unit, &reachable, state),
    }
}

fn best_cell<F>(unit: &BattleUnit, reachable: &BTreeMap<GridCoord, f32>, state: &BattleState, score: F) -> GridCoord
where
    F: Fn(GridCoord, f32) -> f32,
{
    let penalty = state.config.ai.hazard_avoidance_penalty;
    reachable
        .iter()
        .map(|(&cell, &cost)| {
            let hazard = if cell != unit.position && state.grid.is_hazard(cell) {
                penalty
            } else {
                0.0
            };
            (score(cell, cost) + cost * MOVE_COST_WEIGHT + hazard, cell)
        })
        .min_by(|a, b| compare_cells(*a, *b))
        .map_or(unit.position, |(_, cell)| cell)
}

/// Score for closing on `target`: in-reach cells first, then nearest
fn closing_score(unit: &BattleUnit, target: &BattleUnit, skill: &Skill, cell: GridCoord, state: &BattleState) -> f32 {
    if skill_reaches(unit, skill, cell, target, state.grid) {
        0.0
    } else {
        OUT_OF_REACH + cell.chebyshev(&target.position) as f32 * 10.0 + cell.euclidean(&target.position)
    }
}

fn approach(
    unit: &BattleUnit,
    target: &BattleUnit,
    skill: &Skill,
    reachable: &BTreeMap<GridCoord, f32>,
    state: &BattleState,
) -> GridCoord {
    best_cell(unit, reachable, state, |cell, cost| {
        closing_score(unit, target, skill, cell, state) + cost
    })
}

fn nearest_enemy_distance(unit: &BattleUnit, cell: GridCoord, state: &BattleState) -> u32 {
    state
        .enemies_of(unit)
        .iter()
        .map(|e| e.position.chebyshev(&cell))
        .min()
        .unwrap_or(u32::MAX)
}

fn hold_range(
    unit: &BattleUnit,
    target: &BattleUnit,
    skill: &Skill,
    min: u32,
    reachable: &BTreeMap<GridCoord, f32>,
    state: &BattleState,
) -> GridCoord {
    best_cell(unit, reachable, state, |cell, _| {
        let nearest = nearest_enemy_distance(unit, cell, state);
        let crowding = if nearest < min {
            TOO_CLOSE + (min - nearest) as f32 * 10.0
        } else {
            0.0
        };
        closing_score(unit, target, skill, cell, state) + crowding
    })
}

fn interpose(
    unit: &BattleUnit,
    threat: &BattleUnit,
    ward: &BattleUnit,
    skill: &Skill,
    reachable: &BTreeMap<GridCoord, f32>,
    state: &BattleState,
) -> GridCoord {
    best_cell(unit, reachable, state, |cell, _| {
        let between = cell.chebyshev(&threat.position) * 2 + cell.chebyshev(&ward.position);
        let bonus = if skill_reaches(unit, skill, cell, threat, state.grid) {
            -1.0
        } else {
            0.0
        };
        between as f32 + bonus
    })
}

fn retreat(unit: &BattleUnit, reachable: &BTreeMap<GridCoord, f32>, state: &BattleState) -> GridCoord {
    best_cell(unit, reachable, state, |cell, _| {
        -(nearest_enemy_distance(unit, cell, state).min(1000) as f32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::grid::BattleGrid;
    use crate::battle::scheduler::FocusFire;
    use crate::battle::skill::{SkillCatalog, SkillId};
    use crate::battle::units::UnitStats;
    use crate::core::config::BattleConfig;
    use crate::core::types::Side;

    fn unit(id: u32, side: Side, x: i32, y: i32) -> BattleUnit {
        let mut u = BattleUnit::new(
            UnitId(id),
            format!("u{id}"),
            side,
            GridCoord::new(x, y),
            UnitStats {
                speed: 3.0,
                ..Default::default()
            },
        );
        u.begin_turn(1);
        u
    }

    fn placed(units: &[BattleUnit], rows: &[&str]) -> BattleGrid {
        let mut grid = BattleGrid::from_rows(rows).unwrap();
        for u in units {
            grid.place(u.id, u.position).unwrap();
        }
        grid
    }

    #[test]
    fn test_approach_stops_adjacent() {
        let units = vec![unit(1, Side::Player, 0, 0), unit(2, Side::Enemy, 3, 0)];
        let grid = placed(&units, &["......", "......"]);
        let catalog = SkillCatalog::standard();
        let config = BattleConfig::default();
        let state = BattleState::new(&units, &grid, &catalog, &config, 1, FocusFire::default());
        let basic = catalog.basic_attack().unwrap();

        let dest = choose_destination(&units[0], &units[1], basic, Positioning::Approach, &state);
        assert_eq!(dest, GridCoord::new(2, 0));
    }

    #[test]
    fn test_approach_stays_when_in_reach() {
        let units = vec![unit(1, Side::Player, 0, 0), unit(2, Side::Enemy, 1, 1)];
        let grid = placed(&units, &["....", "...."]);
        let catalog = SkillCatalog::standard();
        let config = BattleConfig::default();
        let state = BattleState::new(&units, &grid, &catalog, &config, 1, FocusFire::default());
        let basic = catalog.basic_attack().unwrap();

        let dest = choose_destination(&units[0], &units[1], basic, Positioning::Approach, &state);
        assert_eq!(dest, GridCoord::new(0, 0));
    }

    #[test]
    fn test_approach_avoids_hazard_when_possible() {
        let units = vec![unit(1, Side::Player, 0, 1), unit(2, Side::Enemy, 3, 1)];
        // (2,1) is a hazard; (2,0) and (2,2) also reach the enemy
        let grid = placed(&units, &["......", "..~...", "......"]);
        let catalog = SkillCatalog::standard();
        let config = BattleConfig::default();
        let state = BattleState::new(&units, &grid, &catalog, &config, 1, FocusFire::default());
        let basic = catalog.basic_attack().unwrap();

        let dest = choose_destination(&units[0], &units[1], basic, Positioning::Approach, &state);
        assert_ne!(dest, GridCoord::new(2, 1));
        assert_eq!(dest.x, 2);
    }

    #[test]
    fn test_hold_range_backs_off() {
        let mut caster = unit(1, Side::Player, 2, 0);
        caster.stats.skill_power = 5;
        let units = vec![caster.with_skill("firebolt").with_resources(0, 10), unit(2, Side::Enemy, 3, 0)];
        let grid = placed(&units, &["........"]);
        let catalog = SkillCatalog::standard();
        let config = BattleConfig::default();
        let state = BattleState::new(&units, &grid, &catalog, &config, 1, FocusFire::default());
        let bolt = catalog.get(&SkillId::new("firebolt")).unwrap();

        let dest = choose_destination(&units[0], &units[1], bolt, Positioning::HoldRange { min: 2 }, &state);
        assert!(dest.chebyshev(&units[1].position) >= 2);
        assert!(dest.chebyshev(&units[1].position) <= 4);
    }

    #[test]
    fn test_stay_and_retreat() {
        let units = vec![unit(1, Side::Player, 1, 0), unit(2, Side::Enemy, 0, 0)];
        let grid = placed(&units, &["......"]);
        let catalog = SkillCatalog::standard();
        let config = BattleConfig::default();
        let state = BattleState::new(&units, &grid, &catalog, &config, 1, FocusFire::default());
        let basic = catalog.basic_attack().unwrap();

        assert_eq!(
            choose_destination(&units[0], &units[1], basic, Positioning::Stay, &state),
            GridCoord::new(1, 0)
        );
        assert_eq!(
            choose_destination(&units[0], &units[1], basic, Positioning::Retreat, &state),
            GridCoord::new(4, 0)
        );
    }
}
