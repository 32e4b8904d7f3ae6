//! Turn/initiative scheduler
//!
//! Round structure: RoundStart -> UnitTurn* -> RoundEnd -> RoundStart, with
//! AwaitingInput as the only suspension point and BattleOver as the sink.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::battle::ai::targeting::focus_fire_target;
use crate::battle::units::BattleUnit;
use crate::core::config::AiTuning;
use crate::core::types::{Round, Side, UnitId};

/// How a battle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    Victory,
    /// Player side wiped (mutual wipes included) or round limit hit
    Defeat,
    Cancelled,
}

impl BattleOutcome {
    pub fn is_victory(&self) -> bool {
        matches!(self, BattleOutcome::Victory)
    }
}

/// Scheduler state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    RoundStart,
    UnitTurn,
    RoundEnd,
    /// Suspended until the host submits an action for this unit
    AwaitingInput(UnitId),
    BattleOver(BattleOutcome),
}

impl Phase {
    pub fn is_over(&self) -> bool {
        matches!(self, Phase::BattleOver(_))
    }
}

/// Acting order for one round
#[derive(Debug, Clone, Default)]
pub struct TurnQueue {
    order: VecDeque<UnitId>,
}

impl TurnQueue {
    /// Living units by initiative descending, ties by roster order
    pub fn build(units: &[BattleUnit]) -> Self {
        let mut ranked: Vec<(usize, &BattleUnit)> =
            units.iter().enumerate().filter(|(_, u)| u.is_alive()).collect();
        ranked.sort_by(|(ia, a), (ib, b)| {
            b.stats
                .initiative
                .cmp(&a.stats.initiative)
                .then_with(|| ia.cmp(ib))
        });
        Self {
            order: ranked.into_iter().map(|(_, u)| u.id).collect(),
        }
    }

    pub fn pop_next(&mut self) -> Option<UnitId> {
        self.order.pop_front()
    }

    pub fn remaining(&self) -> impl Iterator<Item = &UnitId> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Per-side focus-fire target, written only by the scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusFire {
    pub player: Option<UnitId>,
    pub enemy: Option<UnitId>,
}

impl FocusFire {
    pub fn get(&self, side: Side) -> Option<UnitId> {
        match side {
            Side::Player => self.player,
            Side::Enemy => self.enemy,
        }
    }

    fn set(&mut self, side: Side, target: Option<UnitId>) {
        match side {
            Side::Player => self.player = target,
            Side::Enemy => self.enemy = target,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    pub phase: Phase,
    pub round: Round,
    queue: TurnQueue,
    focus_fire: FocusFire,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            phase: Phase::RoundStart,
            round: 0,
            queue: TurnQueue::default(),
            focus_fire: FocusFire::default(),
        }
    }

    /// Advance the round counter and rebuild the queue
    pub fn start_round(&mut self, units: &[BattleUnit]) -> Round {
        self.round += 1;
        self.queue = TurnQueue::build(units);
        self.phase = Phase::UnitTurn;
        tracing::debug!(round = self.round, queued = self.queue.len(), "round started");
        self.round
    }

    /// Next living unit in the queue; None ends the round
    pub fn next_actor(&mut self, units: &[BattleUnit]) -> Option<UnitId> {
        while let Some(id) = self.queue.pop_next() {
            if units.iter().any(|u| u.id == id && u.is_alive()) {
                return Some(id);
            }
        }
        self.phase = Phase::RoundEnd;
        None
    }

    pub fn queue(&self) -> &TurnQueue {
        &self.queue
    }

    pub fn focus_fire(&self) -> &FocusFire {
        &self.focus_fire
    }

    /// Recompute both sides' focus-fire targets
    pub fn refresh_focus_fire(&mut self, units: &[BattleUnit], tuning: &AiTuning) {
        for side in Side::all() {
            let target = focus_fire_target(side, units, tuning);
            self.focus_fire.set(side, target);
        }
    }

    pub fn finish(&mut self, outcome: BattleOutcome) {
        self.phase = Phase::BattleOver(outcome);
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        match self.phase {
            Phase::BattleOver(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// Victory when every enemy is dead, Defeat when every player unit is
/// (a mutual wipe counts as Defeat)
pub fn check_terminal(units: &[BattleUnit]) -> Option<BattleOutcome> {
    let side_alive = |side: Side| units.iter().any(|u| u.side == side && u.is_alive());
    if !side_alive(Side::Player) {
        Some(BattleOutcome::Defeat)
    } else if !side_alive(Side::Enemy) {
        Some(BattleOutcome::Victory)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::coord::GridCoord;
    use crate::battle::units::UnitStats;

    fn unit(id: u32, side: Side, initiative: i32) -> BattleUnit {
        BattleUnit::new(
            UnitId(id),
            format!("u{id}"),
            side,
            GridCoord::new(id as i32, 0),
            UnitStats {
                initiative,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_queue_orders_by_initiative_then_roster() {
        let units = vec![
            unit(1, Side::Player, 10),
            unit(2, Side::Enemy, 14),
            unit(3, Side::Enemy, 10),
            unit(4, Side::Player, 3),
        ];
        let queue = TurnQueue::build(&units);
        let order: Vec<UnitId> = queue.remaining().copied().collect();
        assert_eq!(order, vec![UnitId(2), UnitId(1), UnitId(3), UnitId(4)]);
    }

    #[test]
    fn test_queue_skips_dead() {
        let mut units = vec![unit(1, Side::Player, 10), unit(2, Side::Enemy, 5)];
        units[1].mark_dead();
        assert_eq!(TurnQueue::build(&units).len(), 1);
    }

    #[test]
    fn test_next_actor_skips_units_killed_mid_round() {
        let mut units = vec![unit(1, Side::Player, 10), unit(2, Side::Enemy, 5)];
        let mut scheduler = Scheduler::new();
        scheduler.start_round(&units);
        assert_eq!(scheduler.next_actor(&units), Some(UnitId(1)));
        units[1].mark_dead();
        assert_eq!(scheduler.next_actor(&units), None);
        assert_eq!(scheduler.phase, Phase::RoundEnd);
    }

    #[test]
    fn test_terminal_conditions() {
        let mut units = vec![unit(1, Side::Player, 10), unit(2, Side::Enemy, 5)];
        assert_eq!(check_terminal(&units), None);
        units[1].mark_dead();
        assert_eq!(check_terminal(&units), Some(BattleOutcome::Victory));
        units[0].mark_dead();
        assert_eq!(check_terminal(&units), Some(BattleOutcome::Defeat));
    }

    #[test]
    fn test_round_counter() {
        let units = vec![unit(1, Side::Player, 10), unit(2, Side::Enemy, 5)];
        let mut scheduler = Scheduler::new();
        assert_eq!(scheduler.start_round(&units), 1);
        assert_eq!(scheduler.start_round(&units), 2);
    }
}
