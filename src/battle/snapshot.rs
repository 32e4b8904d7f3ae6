//! Read-only battle snapshots for hosts and tests

use serde::{Deserialize, Serialize};

use crate::battle::coord::GridCoord;
use crate::battle::scheduler::{BattleOutcome, FocusFire, Phase};
use crate::battle::skill::SkillId;
use crate::battle::units::BattleUnit;
use crate::core::types::{Round, Side, UnitId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub name: String,
    pub stacks: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub name: String,
    pub side: Side,
    pub position: GridCoord,
    pub hp: i32,
    pub max_hp: i32,
    pub stamina: i32,
    pub mana: i32,
    pub movement: f32,
    pub alive: bool,
    pub statuses: Vec<StatusSnapshot>,
    /// Loadout skills still cooling down
    pub cooldowns: Vec<(SkillId, u32)>,
}

impl From<&BattleUnit> for UnitSnapshot {
    fn from(unit: &BattleUnit) -> Self {
        Self {
            id: unit.id,
            name: unit.name.clone(),
            side: unit.side,
            position: unit.position,
            hp: unit.hp,
            max_hp: unit.stats.max_hp,
            stamina: unit.stamina.current,
            mana: unit.mana.current,
            movement: unit.movement.current,
            alive: unit.is_alive(),
            statuses: unit
                .statuses
                .iter()
                .map(|s| StatusSnapshot {
                    name: s.name.clone(),
                    stacks: s.stack_count,
                    remaining: s.remaining_duration,
                })
                .collect(),
            cooldowns: unit
                .loadout
                .iter()
                .filter(|slot| slot.cooldown > 0)
                .map(|slot| (slot.skill.clone(), slot.cooldown))
                .collect(),
        }
    }
}

/// Whole-battle view returned by `get_state`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleStateSnapshot {
    pub round: Round,
    pub phase: Phase,
    pub outcome: Option<BattleOutcome>,
    pub awaiting_input: Option<UnitId>,
    pub focus_fire: FocusFire,
    pub grid_width: u32,
    pub grid_height: u32,
    pub units: Vec<UnitSnapshot>,
}

impl BattleStateSnapshot {
    pub fn unit(&self, id: UnitId) -> Option<&UnitSnapshot> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn living(&self, side: Side) -> impl Iterator<Item = &UnitSnapshot> {
        self.units.iter().filter(move |u| u.alive && u.side == side)
    }
}
