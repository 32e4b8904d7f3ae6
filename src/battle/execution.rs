//! Battle execution loop
//!
//! Each turn: refresh -> status tick -> stun check -> action -> movement
//! (reactions, hazards) -> skill -> cooldowns -> terminal check.
//!
//! `step` drives the scheduler until a player unit needs input or the
//! battle ends; `submit_player_action` plays that unit's turn.

use ahash::{AHashMap, AHashSet};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::battle::action::{check_skill, validate_action, Action, PlannedAction};
use crate::battle::ai::{AIProfile, BattleState};
use crate::battle::constants::AOO_REACTION_BUDGET;
use crate::battle::coord::GridCoord;
use crate::battle::events::{BattleEvent, SkipReason};
use crate::battle::grid::BattleGrid;
use crate::battle::pathfinding::{greedy_path, step_cost};
use crate::battle::reactions::{provoked_observers, resolve_reaction};
use crate::battle::resolution::{
    resolve_attack, resolve_heal, resolve_support, AttackModifiers, AttackOutcome, StatusResult,
    SupportOutcome,
};
use crate::battle::scheduler::{check_terminal, BattleOutcome, Phase, Scheduler};
use crate::battle::skill::{Skill, SkillCatalog, SkillEffect, TargetMode};
use crate::battle::snapshot::{BattleStateSnapshot, UnitSnapshot};
use crate::battle::units::BattleUnit;
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, InvalidActionError, Result};
use crate::core::types::{Round, Side, UnitId};

/// A running battle
///
/// Owns every unit, the grid, the RNG and the scheduler. Hosts only touch
/// it through `step`, `submit_player_action`, `cancel` and the read-only
/// accessors.
#[derive(Debug, Clone)]
pub struct BattleHandle {
    units: Vec<BattleUnit>,
    index: AHashMap<UnitId, usize>,
    grid: BattleGrid,
    catalog: SkillCatalog,
    config: BattleConfig,
    rng: ChaCha8Rng,
    seed: u64,
    scheduler: Scheduler,
    /// Events produced outside `step` (battle start), flushed by the next step
    pending: Vec<BattleEvent>,
}

impl BattleHandle {
    /// Validate the roster and place every living unit
    pub fn new(
        units: Vec<BattleUnit>,
        mut grid: BattleGrid,
        seed: u64,
        catalog: SkillCatalog,
        config: BattleConfig,
    ) -> Result<Self> {
        grid.validate()?;
        for unit in &units {
            unit.check_setup()?;
        }

        for side in Side::all() {
            if !units.iter().any(|u| u.side == side && u.is_alive()) {
                return Err(BattleError::EmptySide(side));
            }
        }

        let mut seen = AHashSet::new();
        for unit in &units {
            if !seen.insert(unit.id) {
                return Err(BattleError::DuplicateUnitId(unit.id));
            }
        }

        for unit in &units {
            if let Some(slot) = unit.loadout.iter().find(|slot| !catalog.contains(&slot.skill)) {
                return Err(BattleError::UnknownSkill {
                    unit: unit.id,
                    skill: slot.skill.clone(),
                });
            }
        }

        grid.clear_occupants();
        for unit in units.iter().filter(|u| u.is_alive()) {
            grid.place(unit.id, unit.position)?;
        }

        let index = units.iter().enumerate().map(|(i, u)| (u.id, i)).collect();
        let config = config.sanitized();
        let mut scheduler = Scheduler::new();
        scheduler.refresh_focus_fire(&units, &config.ai);

        tracing::info!(seed, units = units.len(), "battle started");
        let pending = vec![BattleEvent::BattleStarted {
            seed,
            units: units.len(),
        }];

        Ok(Self {
            units,
            index,
            grid,
            catalog,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            scheduler,
            pending,
        })
    }

    // === Accessors ===

    pub fn units(&self) -> &[BattleUnit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&BattleUnit> {
        self.index.get(&id).map(|&i| &self.units[i])
    }

    pub fn grid(&self) -> &BattleGrid {
        &self.grid
    }

    pub fn catalog(&self) -> &SkillCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn round(&self) -> Round {
        self.scheduler.round
    }

    pub fn phase(&self) -> Phase {
        self.scheduler.phase
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        self.scheduler.outcome()
    }

    pub fn is_over(&self) -> bool {
        self.scheduler.phase.is_over()
    }

    /// Unit currently waiting for player input
    pub fn awaiting_input(&self) -> Option<UnitId> {
        match self.scheduler.phase {
            Phase::AwaitingInput(id) => Some(id),
            _ => None,
        }
    }

    fn index_of(&self, id: UnitId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    // === Driving the battle ===

    /// Run turns until player input is needed or the battle ends
    pub fn step(&mut self) -> Vec<BattleEvent> {
        let mut events = std::mem::take(&mut self.pending);

        loop {
            match self.scheduler.phase {
                Phase::AwaitingInput(_) | Phase::BattleOver(_) => break,
                Phase::RoundStart => {
                    if self.scheduler.round >= self.config.combat.max_rounds {
                        tracing::warn!(round = self.scheduler.round, "round limit reached");
                        self.end_battle(BattleOutcome::Defeat, &mut events);
                        continue;
                    }
                    let round = self.scheduler.start_round(&self.units);
                    events.push(BattleEvent::RoundStarted { round });
                }
                Phase::UnitTurn => {
                    if let Some(id) = self.scheduler.next_actor(&self.units) {
                        self.run_turn(id, &mut events);
                    }
                }
                Phase::RoundEnd => {
                    self.scheduler.phase = Phase::RoundStart;
                }
            }
        }

        events
    }

    /// Play the awaiting unit's turn with `action`
    ///
    /// On error nothing changes and the unit is still awaiting input.
    pub fn submit_player_action(&mut self, action: Action) -> std::result::Result<Vec<BattleEvent>, InvalidActionError> {
        let unit_id = match self.scheduler.phase {
            Phase::AwaitingInput(id) => id,
            Phase::BattleOver(_) => return Err(InvalidActionError::BattleOver),
            _ => return Err(InvalidActionError::NotAwaitingInput),
        };
        let idx = self
            .index_of(unit_id)
            .ok_or(InvalidActionError::NotAwaitingInput)?;

        let plan = validate_action(
            &self.units[idx],
            &action,
            &self.units,
            &self.grid,
            &self.catalog,
            &self.config.combat,
        )?;

        let mut events = Vec::new();
        self.scheduler.phase = Phase::UnitTurn;
        self.execute(idx, plan, &mut events);
        self.finish_turn(unit_id, &mut events);
        Ok(events)
    }

    /// Abort the battle; a no-op once it is over
    pub fn cancel(&mut self) -> Vec<BattleEvent> {
        if self.is_over() {
            return Vec::new();
        }
        tracing::info!(round = self.scheduler.round, "battle cancelled");
        self.scheduler.finish(BattleOutcome::Cancelled);
        vec![BattleEvent::BattleCancelled]
    }

    /// AI suggestion for the unit awaiting input (brute policy)
    pub fn suggest_action(&self) -> Option<Action> {
        let id = self.awaiting_input()?;
        let profile = self.unit(id)?.profile.unwrap_or(AIProfile::Brute);
        self.suggest_action_with(profile)
    }

    /// AI suggestion using a specific profile
    ///
    /// Uses its own RNG seeded from the battle seed, round and unit so that
    /// asking for a hint never changes the battle's roll sequence.
    pub fn suggest_action_with(&self, profile: AIProfile) -> Option<Action> {
        let id = self.awaiting_input()?;
        let unit = self.unit(id)?;
        let hint_seed = self
            .seed
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(u64::from(self.scheduler.round) << 32)
            .wrapping_add(u64::from(id.0));
        let mut rng = ChaCha8Rng::seed_from_u64(hint_seed);

        let state = self.decision_state();
        let action: Action = profile.decide(unit, &state, &mut rng).into();
        let legal = validate_action(unit, &action, &self.units, &self.grid, &self.catalog, &self.config.combat);
        Some(if legal.is_ok() { action } else { Action::pass() })
    }

    /// Run to the end, answering player input with `suggest_action`
    pub fn autoplay(&mut self) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        loop {
            events.extend(self.step());
            if self.is_over() {
                break;
            }
            let action = self.suggest_action().unwrap_or_default();
            match self.submit_player_action(action) {
                Ok(turn) => events.extend(turn),
                Err(err) => {
                    tracing::warn!(%err, "suggested action rejected, passing");
                    if let Ok(turn) = self.submit_player_action(Action::pass()) {
                        events.extend(turn);
                    }
                }
            }
        }
        events
    }

    pub fn get_state(&self) -> BattleStateSnapshot {
        BattleStateSnapshot {
            round: self.scheduler.round,
            phase: self.scheduler.phase,
            outcome: self.scheduler.outcome(),
            awaiting_input: self.awaiting_input(),
            focus_fire: *self.scheduler.focus_fire(),
            grid_width: self.grid.width,
            grid_height: self.grid.height,
            units: self.units.iter().map(UnitSnapshot::from).collect(),
        }
    }

    fn decision_state(&self) -> BattleState<'_> {
        BattleState::new(
            &self.units,
            &self.grid,
            &self.catalog,
            &self.config,
            self.scheduler.round,
            *self.scheduler.focus_fire(),
        )
    }

    // === Turn internals ===

    fn run_turn(&mut self, id: UnitId, events: &mut Vec<BattleEvent>) {
        let Some(idx) = self.index_of(id) else {
            return;
        };
        tracing::debug!(unit = %id, round = self.scheduler.round, "turn started");

        self.units[idx].begin_turn(AOO_REACTION_BUDGET);
        events.push(BattleEvent::TurnStarted { unit_id: id });

        let report = self.units[idx].statuses.tick();
        for status in report.expired {
            events.push(BattleEvent::StatusExpired { target: id, status });
        }
        if report.dot_damage > 0 {
            let amount = self.units[idx].take_damage(report.dot_damage);
            events.push(BattleEvent::DamageDealt {
                source: None,
                target: id,
                amount,
                crit: false,
            });
            if !self.units[idx].is_alive() {
                self.handle_death(id, events);
                events.push(BattleEvent::TurnSkipped {
                    unit_id: id,
                    reason: SkipReason::DiedAtTurnStart,
                });
                self.finish_turn(id, events);
                return;
            }
        }

        if self.units[idx].statuses.is_stunned() {
            tracing::debug!(unit = %id, "stunned, turn skipped");
            events.push(BattleEvent::TurnSkipped {
                unit_id: id,
                reason: SkipReason::Stunned,
            });
            self.finish_turn(id, events);
            return;
        }

        if self.units[idx].is_player_controlled() {
            self.scheduler.phase = Phase::AwaitingInput(id);
            events.push(BattleEvent::PlayerInputRequired { unit_id: id });
            return;
        }

        let plan = self.ai_plan(idx);
        self.execute(idx, plan, events);
        self.finish_turn(id, events);
    }

    /// Ask the unit's profile for a decision and make it legal
    fn ai_plan(&mut self, idx: usize) -> PlannedAction {
        let unit = &self.units[idx];
        let profile = unit.profile.unwrap_or(AIProfile::Brute);
        let state = BattleState::new(
            &self.units,
            &self.grid,
            &self.catalog,
            &self.config,
            self.scheduler.round,
            *self.scheduler.focus_fire(),
        );
        let action: Action = profile.decide(unit, &state, &mut self.rng).into();

        match validate_action(unit, &action, &self.units, &self.grid, &self.catalog, &self.config.combat) {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!(unit = %unit.id, %err, "AI action rejected, degrading");
                degrade_plan(unit, &action, &self.units, &self.grid, &self.catalog, &self.config)
            }
        }
    }

    fn execute(&mut self, idx: usize, plan: PlannedAction, events: &mut Vec<BattleEvent>) {
        if !self.walk(idx, &plan.path, events) {
            return;
        }
        if let Some(skill) = plan.skill {
            self.use_skill(idx, &skill, plan.target, events);
        }
    }

    /// Move along `path` one step at a time; false if the mover died
    fn walk(&mut self, idx: usize, path: &[GridCoord], events: &mut Vec<BattleEvent>) -> bool {
        let id = self.units[idx].id;
        let diagonal = self.config.combat.diagonal_movement_cost;

        for step in path.windows(2) {
            let (from, to) = (step[0], step[1]);

            // Reactions resolve before the mover leaves `from`
            for observer_id in provoked_observers(&self.units, &self.units[idx], from, to) {
                let (Some(observer_idx), Some(basic)) = (self.index_of(observer_id), self.catalog.basic_attack()) else {
                    continue;
                };
                events.push(BattleEvent::ReactionTriggered {
                    observer: observer_id,
                    mover: id,
                });
                let cover = self.grid.cover_at(from);
                let (observer, mover) = pair_mut(&mut self.units, observer_idx, idx);
                let outcome = resolve_reaction(observer, mover, basic, cover, &mut self.rng, &self.config.combat);
                push_attack_events(events, observer_id, id, &outcome);
                if outcome.killed {
                    self.handle_death(id, events);
                    return false;
                }
            }

            if !self.grid.move_occupant(from, to) {
                tracing::warn!(unit = %id, %from, %to, "movement blocked mid-path");
                break;
            }
            let unit = &mut self.units[idx];
            unit.position = to;
            unit.movement.spend(step_cost(from, to, diagonal));
            events.push(BattleEvent::UnitMoved {
                unit_id: id,
                from,
                to,
            });

            let hazard = self.config.combat.hazard_damage;
            if hazard > 0 && self.grid.is_hazard(to) {
                let amount = self.units[idx].take_damage(hazard);
                events.push(BattleEvent::DamageDealt {
                    source: None,
                    target: id,
                    amount,
                    crit: false,
                });
                if !self.units[idx].is_alive() {
                    self.handle_death(id, events);
                    return false;
                }
            }
        }

        true
    }

    fn use_skill(&mut self, idx: usize, skill: &Skill, target: Option<UnitId>, events: &mut Vec<BattleEvent>) {
        let id = self.units[idx].id;
        let origin = self.units[idx].position;
        // Ally skills aimed at the caster come back with no target
        let requested = match (skill.target_mode, target) {
            (TargetMode::Ally, None) => Some(id),
            (_, target) => target,
        };

        let (skill, target) = match check_skill(
            &self.units[idx],
            &skill.id,
            requested,
            origin,
            &self.units,
            &self.grid,
            &self.catalog,
        ) {
            Ok(checked) => checked,
            Err(err) => {
                tracing::debug!(unit = %id, %err, "skill dropped after movement");
                return;
            }
        };

        let caster = &mut self.units[idx];
        caster.pay_for(&skill);
        caster.start_cooldown(&skill);
        events.push(BattleEvent::SkillUsed {
            unit_id: id,
            skill: skill.id.clone(),
            target,
        });

        let combat = &self.config.combat;
        match target.and_then(|t| self.index_of(t).map(|i| (t, i))) {
            Some((target_id, target_idx)) if skill.target_mode == TargetMode::Enemy => {
                let cover = self.grid.cover_at(self.units[target_idx].position);
                let (attacker, defender) = pair_mut(&mut self.units, idx, target_idx);
                let outcome = resolve_attack(
                    attacker,
                    defender,
                    &skill,
                    cover,
                    AttackModifiers::default(),
                    &mut self.rng,
                    combat,
                );
                push_attack_events(events, id, target_id, &outcome);
                if outcome.killed {
                    self.handle_death(target_id, events);
                }
            }
            Some((target_id, target_idx)) => {
                let (caster, recipient) = pair_mut(&mut self.units, idx, target_idx);
                let outcome = if skill.effect == SkillEffect::Heal {
                    resolve_heal(caster, Some(recipient), &skill, combat)
                } else {
                    resolve_support(caster, Some(recipient), &skill, combat)
                };
                push_support_events(events, id, target_id, &outcome);
            }
            None => {
                let caster = &mut self.units[idx];
                let outcome = if skill.effect == SkillEffect::Heal {
                    resolve_heal(caster, None, &skill, combat)
                } else {
                    resolve_support(caster, None, &skill, combat)
                };
                push_support_events(events, id, id, &outcome);
            }
        }
    }

    fn handle_death(&mut self, id: UnitId, events: &mut Vec<BattleEvent>) {
        let Some(idx) = self.index_of(id) else {
            return;
        };
        let unit = &mut self.units[idx];
        let position = unit.position;
        unit.mark_dead();
        self.grid.vacate(position);
        tracing::info!(unit = %id, %position, "unit died");
        events.push(BattleEvent::UnitDied { unit_id: id });
    }

    /// Cooldowns, terminal check and focus-fire refresh after any turn
    fn finish_turn(&mut self, id: UnitId, events: &mut Vec<BattleEvent>) {
        if let Some(idx) = self.index_of(id) {
            if self.units[idx].is_alive() {
                self.units[idx].tick_cooldowns();
            }
        }

        if let Some(outcome) = check_terminal(&self.units) {
            self.end_battle(outcome, events);
            return;
        }
        self.scheduler.refresh_focus_fire(&self.units, &self.config.ai);
        self.scheduler.phase = Phase::UnitTurn;
    }

    fn end_battle(&mut self, outcome: BattleOutcome, events: &mut Vec<BattleEvent>) {
        tracing::info!(?outcome, round = self.scheduler.round, "battle ended");
        self.scheduler.finish(outcome);
        events.push(BattleEvent::BattleEnded {
            victory: outcome.is_victory(),
        });
    }
}

/// Two distinct units borrowed mutably at once
fn pair_mut(units: &mut [BattleUnit], a: usize, b: usize) -> (&mut BattleUnit, &mut BattleUnit) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = units.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = units.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

fn status_event(target: UnitId, result: &StatusResult) -> Option<BattleEvent> {
    match result {
        StatusResult::Applied(status) => Some(BattleEvent::StatusApplied {
            target,
            status: status.name.clone(),
            stacks: status.stacks,
            duration: status.duration,
        }),
        StatusResult::Resisted(status) => Some(BattleEvent::StatusResisted {
            target,
            status: status.clone(),
        }),
        StatusResult::NoEffect => None,
    }
}

fn push_attack_events(events: &mut Vec<BattleEvent>, attacker: UnitId, target: UnitId, outcome: &AttackOutcome) {
    if !outcome.hit {
        events.push(BattleEvent::AttackMissed { attacker, target });
    } else if outcome.damage > 0 {
        events.push(BattleEvent::DamageDealt {
            source: Some(attacker),
            target,
            amount: outcome.damage,
            crit: outcome.crit,
        });
    }
    events.extend(outcome.status.as_ref().and_then(|s| status_event(target, s)));
    events.extend(outcome.self_status.as_ref().and_then(|s| status_event(attacker, s)));
}

fn push_support_events(events: &mut Vec<BattleEvent>, caster: UnitId, target: UnitId, outcome: &SupportOutcome) {
    if outcome.healed > 0 {
        events.push(BattleEvent::Healed {
            source: caster,
            target,
            amount: outcome.healed,
        });
    }
    events.extend(outcome.status.as_ref().and_then(|s| status_event(target, s)));
    events.extend(outcome.self_status.as_ref().and_then(|s| status_event(caster, s)));
}

/// Legal stand-in for an AI action that failed validation
///
/// Greedy walk toward the wanted cell, then the skill alone, then pass.
fn degrade_plan(
    unit: &BattleUnit,
    action: &Action,
    units: &[BattleUnit],
    grid: &BattleGrid,
    catalog: &SkillCatalog,
    config: &BattleConfig,
) -> PlannedAction {
    let combat = &config.combat;
    let mut candidates = Vec::new();
    if let Some(goal) = action.move_to {
        let path = greedy_path(grid, unit.position, goal, unit.movement.current, combat.diagonal_movement_cost);
        if let Some(&end) = path.last() {
            candidates.push(Action {
                move_to: Some(end),
                ..action.clone()
            });
        }
    }
    candidates.push(Action {
        move_to: None,
        ..action.clone()
    });

    candidates
        .iter()
        .find_map(|candidate| validate_action(unit, candidate, units, grid, catalog, combat).ok())
        .unwrap_or_default()
}

// === Public API ===

/// Start a battle with the standard skill catalog and default config
pub fn start_battle(units: Vec<BattleUnit>, grid: BattleGrid, rng_seed: u64) -> Result<BattleHandle> {
    BattleHandle::new(units, grid, rng_seed, SkillCatalog::standard(), BattleConfig::default())
}

pub fn start_battle_with(
    units: Vec<BattleUnit>,
    grid: BattleGrid,
    rng_seed: u64,
    catalog: SkillCatalog,
    config: BattleConfig,
) -> Result<BattleHandle> {
    BattleHandle::new(units, grid, rng_seed, catalog, config)
}

pub fn submit_player_action(
    handle: &mut BattleHandle,
    action: Action,
) -> std::result::Result<Vec<BattleEvent>, InvalidActionError> {
    handle.submit_player_action(action)
}

pub fn step(handle: &mut BattleHandle) -> Vec<BattleEvent> {
    handle.step()
}

pub fn get_state(handle: &BattleHandle) -> BattleStateSnapshot {
    handle.get_state()
}
