//! Structured battle events
//!
//! The engine never formats text; hosts render these however they like.

use serde::{Deserialize, Serialize};

use crate::battle::coord::GridCoord;
use crate::battle::skill::SkillId;
use crate::core::types::{Round, UnitId};

/// Why a unit did not act
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Stunned,
    /// Killed by damage over time at turn start
    DiedAtTurnStart,
}

/// One observable thing that happened in the battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BattleEvent {
    BattleStarted {
        seed: u64,
        units: usize,
    },
    RoundStarted {
        round: Round,
    },
    TurnStarted {
        unit_id: UnitId,
    },
    TurnSkipped {
        unit_id: UnitId,
        reason: SkipReason,
    },
    PlayerInputRequired {
        unit_id: UnitId,
    },
    UnitMoved {
        unit_id: UnitId,
        from: GridCoord,
        to: GridCoord,
    },
    SkillUsed {
        unit_id: UnitId,
        skill: SkillId,
        target: Option<UnitId>,
    },
    AttackMissed {
        attacker: UnitId,
        target: UnitId,
    },
    DamageDealt {
        /// None for damage over time and hazards
        source: Option<UnitId>,
        target: UnitId,
        amount: i32,
        crit: bool,
    },
    Healed {
        source: UnitId,
        target: UnitId,
        amount: i32,
    },
    StatusApplied {
        target: UnitId,
        status: String,
        stacks: u32,
        duration: u32,
    },
    StatusResisted {
        target: UnitId,
        status: String,
    },
    StatusExpired {
        target: UnitId,
        status: String,
    },
    ReactionTriggered {
        observer: UnitId,
        mover: UnitId,
    },
    UnitDied {
        unit_id: UnitId,
    },
    BattleEnded {
        victory: bool,
    },
    BattleCancelled,
}

impl BattleEvent {
    /// Terminal events close the stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BattleEvent::BattleEnded { .. } | BattleEvent::BattleCancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = BattleEvent::DamageDealt {
            source: Some(UnitId(1)),
            target: UnitId(2),
            amount: 7,
            crit: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "damage_dealt");
        assert_eq!(json["amount"], 7);
        assert_eq!(json["source"], 1);
    }

    #[test]
    fn test_event_round_trip() {
        let event = BattleEvent::TurnSkipped {
            unit_id: UnitId(3),
            reason: SkipReason::Stunned,
        };
        let text = serde_json::to_string(&event).unwrap();
        let back: BattleEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_terminal_events() {
        assert!(BattleEvent::BattleEnded { victory: true }.is_terminal());
        assert!(BattleEvent::BattleCancelled.is_terminal());
        assert!(!BattleEvent::RoundStarted { round: 1 }.is_terminal());
    }
}
