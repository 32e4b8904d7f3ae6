//! Status effects and the per-unit status ledger
//!
//! A ledger is a small fixed-capacity ordered collection. All multiplier and
//! capability lookups go through its typed accessors so the damage pipeline
//! reads them in one fixed order.

use arrayvec::ArrayVec;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::battle::constants::MAX_STATUSES_PER_UNIT;

/// Broad category, used by wards and AI debuff counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Buff,
    Debuff,
    /// Damage over time (counts as a debuff)
    Dot,
}

/// Rule for reapplying a status that is already active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackingPolicy {
    /// Replace remaining duration
    Refresh,
    /// Increment stack count (capped) and replace remaining duration
    Stack,
    /// Keep the active instance untouched
    IgnoreIfPresent,
}

/// Stat a status can scale multiplicatively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierAxis {
    OutgoingDamage,
    IncomingDamage,
    Movement,
    Defense,
    Dodge,
    Crit,
}

bitflags! {
    /// Behavioural flags a status grants its holder
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        /// Loses its turn
        const STUNNED      = 1 << 0;
        /// May not use guard skills
        const CANNOT_GUARD = 1 << 1;
        /// Immune to incoming debuffs
        const WARDED       = 1 << 2;
        /// Priority target; enables combo bonuses
        const MARKED       = 1 << 3;
    }
}

/// Per-axis multipliers of one status (1.0 = no effect)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusModifiers {
    pub outgoing_damage: f32,
    pub incoming_damage: f32,
    pub movement: f32,
    pub defense: f32,
    pub dodge: f32,
    pub crit: f32,
}

impl Default for StatusModifiers {
    fn default() -> Self {
        Self {
            outgoing_damage: 1.0,
            incoming_damage: 1.0,
            movement: 1.0,
            defense: 1.0,
            dodge: 1.0,
            crit: 1.0,
        }
    }
}

impl StatusModifiers {
    pub fn get(&self, axis: ModifierAxis) -> f32 {
        match axis {
            ModifierAxis::OutgoingDamage => self.outgoing_damage,
            ModifierAxis::IncomingDamage => self.incoming_damage,
            ModifierAxis::Movement => self.movement,
            ModifierAxis::Defense => self.defense,
            ModifierAxis::Dodge => self.dodge,
            ModifierAxis::Crit => self.crit,
        }
    }

    pub fn set(&mut self, axis: ModifierAxis, value: f32) {
        let slot = match axis {
            ModifierAxis::OutgoingDamage => &mut self.outgoing_damage,
            ModifierAxis::IncomingDamage => &mut self.incoming_damage,
            ModifierAxis::Movement => &mut self.movement,
            ModifierAxis::Defense => &mut self.defense,
            ModifierAxis::Dodge => &mut self.dodge,
            ModifierAxis::Crit => &mut self.crit,
        };
        *slot = value.max(0.0);
    }
}

/// A timed modifier owned by exactly one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub name: String,
    pub kind: StatusKind,
    /// Own turn-starts left before expiry
    #[serde(alias = "duration")]
    pub remaining_duration: u32,
    #[serde(default = "default_stack_count")]
    pub stack_count: u32,
    pub stacking_policy: StackingPolicy,
    #[serde(default)]
    pub modifiers: StatusModifiers,
    /// Flat damage per turn per stack, bypasses defense
    #[serde(default)]
    pub damage_per_turn: i32,
    #[serde(default)]
    pub capabilities: Capabilities,
}

fn default_stack_count() -> u32 {
    1
}

impl StatusEffect {
    pub fn new(
        name: impl Into<String>,
        kind: StatusKind,
        duration: u32,
        stacking_policy: StackingPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            remaining_duration: duration.max(1),
            stack_count: 1,
            stacking_policy,
            modifiers: StatusModifiers::default(),
            damage_per_turn: 0,
            capabilities: Capabilities::empty(),
        }
    }

    pub fn with_modifier(mut self, axis: ModifierAxis, value: f32) -> Self {
        self.modifiers.set(axis, value);
        self
    }

    pub fn with_damage_per_turn(mut self, damage: i32) -> Self {
        self.damage_per_turn = damage.max(0);
        self
    }

    pub fn with_capability(mut self, capability: Capabilities) -> Self {
        self.capabilities |= capability;
        self
    }

    /// Debuffs and DoTs are blocked by wards
    pub fn is_harmful(&self) -> bool {
        !matches!(self.kind, StatusKind::Buff)
    }

    /// Multiplier contributed on one axis, compounded per stack
    pub fn multiplier(&self, axis: ModifierAxis) -> f32 {
        self.modifiers.get(axis).powi(self.stack_count as i32)
    }

    // === Standard status set ===

    /// Takes 25% more damage
    pub fn vulnerable(duration: u32) -> Self {
        Self::new("vulnerable", StatusKind::Debuff, duration, StackingPolicy::Refresh)
            .with_modifier(ModifierAxis::IncomingDamage, 1.25)
    }

    /// Armor stripped: defense halved
    pub fn exposed(duration: u32) -> Self {
        Self::new("exposed", StatusKind::Debuff, duration, StackingPolicy::Refresh)
            .with_modifier(ModifierAxis::Defense, 0.5)
    }

    /// Deals 25% less damage
    pub fn weakened(duration: u32) -> Self {
        Self::new("weakened", StatusKind::Debuff, duration, StackingPolicy::Refresh)
            .with_modifier(ModifierAxis::OutgoingDamage, 0.75)
    }

    /// Deals 25% more damage
    pub fn empowered(duration: u32) -> Self {
        Self::new("empowered", StatusKind::Buff, duration, StackingPolicy::Refresh)
            .with_modifier(ModifierAxis::OutgoingDamage, 1.25)
    }

    /// Braced: takes half damage
    pub fn guarded(duration: u32) -> Self {
        Self::new("guarded", StatusKind::Buff, duration, StackingPolicy::Refresh)
            .with_modifier(ModifierAxis::IncomingDamage, 0.5)
    }

    /// Loses turns while active. Ticks before the stun check, so a duration
    /// of 2 skips exactly one turn.
    pub fn stunned(duration: u32) -> Self {
        Self::new("stunned", StatusKind::Debuff, duration, StackingPolicy::IgnoreIfPresent)
            .with_capability(Capabilities::STUNNED)
    }

    /// Movement halved, easier to hit
    pub fn crippled(duration: u32) -> Self {
        Self::new("crippled", StatusKind::Debuff, duration, StackingPolicy::Refresh)
            .with_modifier(ModifierAxis::Movement, 0.5)
            .with_modifier(ModifierAxis::Dodge, 0.5)
    }

    pub fn hasted(duration: u32) -> Self {
        Self::new("hasted", StatusKind::Buff, duration, StackingPolicy::Refresh)
            .with_modifier(ModifierAxis::Movement, 1.5)
    }

    pub fn poisoned(duration: u32, damage_per_turn: i32) -> Self {
        Self::new("poisoned", StatusKind::Dot, duration, StackingPolicy::Stack)
            .with_damage_per_turn(damage_per_turn)
    }

    pub fn bleeding(duration: u32, damage_per_turn: i32) -> Self {
        Self::new("bleeding", StatusKind::Dot, duration, StackingPolicy::Stack)
            .with_damage_per_turn(damage_per_turn)
    }

    pub fn marked(duration: u32) -> Self {
        Self::new("marked", StatusKind::Debuff, duration, StackingPolicy::Refresh)
            .with_capability(Capabilities::MARKED)
    }

    pub fn warded(duration: u32) -> Self {
        Self::new("warded", StatusKind::Buff, duration, StackingPolicy::Refresh)
            .with_capability(Capabilities::WARDED)
    }

    /// Shield broken: cannot guard, defense reduced
    pub fn sundered(duration: u32) -> Self {
        Self::new("sundered", StatusKind::Debuff, duration, StackingPolicy::Refresh)
            .with_modifier(ModifierAxis::Defense, 0.75)
            .with_capability(Capabilities::CANNOT_GUARD)
    }

    /// Hits harder, guards worse
    pub fn enraged(duration: u32) -> Self {
        Self::new("enraged", StatusKind::Buff, duration, StackingPolicy::Refresh)
            .with_modifier(ModifierAxis::OutgoingDamage, 1.5)
            .with_modifier(ModifierAxis::Defense, 0.5)
    }

    /// Sharpened focus: doubled crit chance
    pub fn focused(duration: u32) -> Self {
        Self::new("focused", StatusKind::Buff, duration, StackingPolicy::Refresh)
            .with_modifier(ModifierAxis::Crit, 2.0)
    }
}

/// Result of applying a status to a ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Added,
    Refreshed,
    Stacked { stack_count: u32 },
    /// `IgnoreIfPresent` status already active
    Ignored,
    /// Ledger is at capacity
    Dropped,
}

impl ApplyOutcome {
    /// Did the application change the ledger?
    pub fn took_effect(&self) -> bool {
        matches!(
            self,
            ApplyOutcome::Added | ApplyOutcome::Refreshed | ApplyOutcome::Stacked { .. }
        )
    }
}

/// What happened during a turn-start tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Summed damage-over-time, to be applied bypassing defense
    pub dot_damage: i32,
    /// Names of statuses that expired this tick
    pub expired: Vec<String>,
}

/// Ordered, fixed-capacity set of active statuses on one unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusLedger {
    statuses: ArrayVec<StatusEffect, MAX_STATUSES_PER_UNIT>,
}

impl StatusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a status, resolving an existing instance by its stacking policy
    ///
    /// Statuses loaded from data are normalized first: DoT is never
    /// negative and stacks stay within `1..=max_stacks`.
    pub fn apply(&mut self, mut status: StatusEffect, max_stacks: u32) -> ApplyOutcome {
        let max_stacks = max_stacks.max(1);
        status.damage_per_turn = status.damage_per_turn.max(0);
        status.stack_count = status.stack_count.clamp(1, max_stacks);

        if let Some(existing) = self.statuses.iter_mut().find(|s| s.name == status.name) {
            return match status.stacking_policy {
                StackingPolicy::Refresh => {
                    existing.remaining_duration = status.remaining_duration;
                    ApplyOutcome::Refreshed
                }
                StackingPolicy::Stack => {
                    existing.stack_count = existing.stack_count.saturating_add(1).min(max_stacks);
                    existing.remaining_duration = status.remaining_duration;
                    ApplyOutcome::Stacked {
                        stack_count: existing.stack_count,
                    }
                }
                StackingPolicy::IgnoreIfPresent => ApplyOutcome::Ignored,
            };
        }

        match self.statuses.try_push(status) {
            Ok(()) => ApplyOutcome::Added,
            Err(err) => {
                tracing::warn!(status = %err.element().name, "status ledger full, dropping status");
                ApplyOutcome::Dropped
            }
        }
    }

    /// Turn-start tick: decrement durations, total DoT, remove expired
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        for status in self.statuses.iter_mut() {
            status.remaining_duration = status.remaining_duration.saturating_sub(1);
            let stacks = i32::try_from(status.stack_count).unwrap_or(i32::MAX);
            report.dot_damage = report
                .dot_damage
                .saturating_add(status.damage_per_turn.saturating_mul(stacks));
            if status.remaining_duration == 0 {
                report.expired.push(status.name.clone());
            }
        }

        self.statuses.retain(|s| s.remaining_duration > 0);
        report
    }

    pub fn has(&self, name: &str) -> bool {
        self.statuses.iter().any(|s| s.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&StatusEffect> {
        self.statuses.iter().find(|s| s.name == name)
    }

    pub fn remove(&mut self, name: &str) -> Option<StatusEffect> {
        let index = self.statuses.iter().position(|s| s.name == name)?;
        Some(self.statuses.remove(index))
    }

    /// Product of every active status' multiplier on `axis`
    pub fn multiplier(&self, axis: ModifierAxis) -> f32 {
        self.statuses.iter().map(|s| s.multiplier(axis)).product()
    }

    /// Union of all granted capability flags
    pub fn capabilities(&self) -> Capabilities {
        self.statuses
            .iter()
            .fold(Capabilities::empty(), |acc, s| acc | s.capabilities)
    }

    pub fn has_capability(&self, flag: Capabilities) -> bool {
        self.capabilities().contains(flag)
    }

    pub fn is_stunned(&self) -> bool {
        self.has_capability(Capabilities::STUNNED)
    }

    pub fn cannot_guard(&self) -> bool {
        self.has_capability(Capabilities::CANNOT_GUARD)
    }

    pub fn is_warded(&self) -> bool {
        self.has_capability(Capabilities::WARDED)
    }

    pub fn is_marked(&self) -> bool {
        self.has_capability(Capabilities::MARKED)
    }

    /// Number of harmful statuses (debuffs and DoTs)
    pub fn debuff_count(&self) -> usize {
        self.statuses.iter().filter(|s| s.is_harmful()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.statuses.iter()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Drop everything (unit died)
    pub fn clear(&mut self) {
        self.statuses.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_new_status() {
        let mut ledger = StatusLedger::new();
        assert_eq!(ledger.apply(StatusEffect::vulnerable(3), 5), ApplyOutcome::Added);
        assert!(ledger.has("vulnerable"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_stack_policy_increments_and_resets_duration() {
        let mut ledger = StatusLedger::new();
        ledger.apply(StatusEffect::poisoned(3, 2), 5);
        ledger.tick(); // duration 3 -> 2

        let outcome = ledger.apply(StatusEffect::poisoned(4, 2), 5);

        assert_eq!(outcome, ApplyOutcome::Stacked { stack_count: 2 });
        let poison = ledger.get("poisoned").unwrap();
        assert_eq!(poison.stack_count, 2);
        // Reset to the new value, not added to the remainder
        assert_eq!(poison.remaining_duration, 4);
    }

    #[test]
    fn test_stack_policy_respects_cap() {
        let mut ledger = StatusLedger::new();
        for _ in 0..10 {
            ledger.apply(StatusEffect::bleeding(2, 1), 3);
        }
        assert_eq!(ledger.get("bleeding").unwrap().stack_count, 3);
    }

    #[test]
    fn test_refresh_policy_keeps_single_stack() {
        let mut ledger = StatusLedger::new();
        ledger.apply(StatusEffect::vulnerable(3), 5);
        ledger.tick();
        ledger.tick();

        let outcome = ledger.apply(StatusEffect::vulnerable(3), 5);

        assert_eq!(outcome, ApplyOutcome::Refreshed);
        let status = ledger.get("vulnerable").unwrap();
        assert_eq!(status.stack_count, 1);
        assert_eq!(status.remaining_duration, 3);
    }

    #[test]
    fn test_ignore_if_present() {
        let mut ledger = StatusLedger::new();
        ledger.apply(StatusEffect::stunned(2), 5);
        ledger.tick();
        assert_eq!(ledger.apply(StatusEffect::stunned(5), 5), ApplyOutcome::Ignored);
        assert_eq!(ledger.get("stunned").unwrap().remaining_duration, 1);
    }

    #[test]
    fn test_tick_applies_dot_and_expires() {
        let mut ledger = StatusLedger::new();
        ledger.apply(StatusEffect::poisoned(1, 3), 5);
        ledger.apply(StatusEffect::empowered(2), 5);

        let report = ledger.tick();

        assert_eq!(report.dot_damage, 3);
        assert_eq!(report.expired, vec!["poisoned".to_string()]);
        assert!(!ledger.has("poisoned"));
        assert!(ledger.has("empowered"));
    }

    #[test]
    fn test_dot_scales_with_stacks() {
        let mut ledger = StatusLedger::new();
        ledger.apply(StatusEffect::poisoned(3, 2), 5);
        ledger.apply(StatusEffect::poisoned(3, 2), 5);
        assert_eq!(ledger.tick().dot_damage, 4);
    }

    #[test]
    fn test_loaded_status_is_normalized_on_apply() {
        let json = r#"{
            "name": "leech",
            "kind": "dot",
            "duration": 3,
            "stack_count": 4000000000,
            "stacking_policy": "stack",
            "damage_per_turn": 2000000000
        }"#;
        let heavy: StatusEffect = serde_json::from_str(json).unwrap();
        let mut antidote = StatusEffect::poisoned(3, 2);
        antidote.name = "antidote".into();
        antidote.damage_per_turn = -50;

        let mut ledger = StatusLedger::new();
        ledger.apply(StatusEffect::poisoned(3, 2), 5);
        ledger.apply(antidote, 5);
        assert_eq!(ledger.get("antidote").unwrap().damage_per_turn, 0);
        assert_eq!(ledger.tick().dot_damage, 2);

        ledger.apply(heavy, 5);
        assert_eq!(ledger.get("leech").unwrap().stack_count, 5);
        assert_eq!(ledger.tick().dot_damage, i32::MAX);
    }

    #[test]
    fn test_multiplier_is_product() {
        let mut ledger = StatusLedger::new();
        assert_eq!(ledger.multiplier(ModifierAxis::IncomingDamage), 1.0);
        ledger.apply(StatusEffect::vulnerable(3), 5);
        ledger.apply(StatusEffect::guarded(3), 5);
        let product = ledger.multiplier(ModifierAxis::IncomingDamage);
        assert!((product - 0.625).abs() < 1e-6);
    }

    #[test]
    fn test_capabilities() {
        let mut ledger = StatusLedger::new();
        assert!(!ledger.is_stunned());
        ledger.apply(StatusEffect::stunned(2), 5);
        ledger.apply(StatusEffect::sundered(2), 5);
        assert!(ledger.is_stunned());
        assert!(ledger.cannot_guard());
        assert!(!ledger.is_warded());
        assert_eq!(ledger.debuff_count(), 2);
    }

    #[test]
    fn test_ledger_capacity() {
        let mut ledger = StatusLedger::new();
        for i in 0..MAX_STATUSES_PER_UNIT {
            let outcome = ledger.apply(
                StatusEffect::new(format!("s{i}"), StatusKind::Buff, 2, StackingPolicy::Refresh),
                5,
            );
            assert_eq!(outcome, ApplyOutcome::Added);
        }
        let overflow = ledger.apply(StatusEffect::hasted(2), 5);
        assert_eq!(overflow, ApplyOutcome::Dropped);
        assert!(!overflow.took_effect());
    }

    #[test]
    fn test_clear() {
        let mut ledger = StatusLedger::new();
        ledger.apply(StatusEffect::marked(2), 5);
        ledger.clear();
        assert!(ledger.is_empty());
    }
}
