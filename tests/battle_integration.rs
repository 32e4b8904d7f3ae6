//! Battle system integration tests
//!
//! Full battles driven through the public API: setup, suspend/resume on
//! player input, reactions, determinism and the terminal conditions.

use grid_skirmish::battle::*;
use grid_skirmish::core::{BattleError, InvalidActionError, Side, UnitId};

fn unit(id: u32, side: Side, x: i32, y: i32, stats: UnitStats) -> BattleUnit {
    BattleUnit::new(UnitId(id), format!("unit{id}"), side, GridCoord::new(x, y), stats)
}

fn no_luck(max_hp: i32, attack: i32, defense: i32) -> UnitStats {
    UnitStats {
        max_hp,
        attack,
        defense,
        crit_chance: 0.0,
        dodge_chance: 0.0,
        ..Default::default()
    }
}

/// Step until input is needed, answer with `action_for`, repeat to the end
fn play_out<F>(handle: &mut BattleHandle, mut action_for: F) -> Vec<BattleEvent>
where
    F: FnMut(&BattleHandle, UnitId) -> Action,
{
    let mut events = Vec::new();
    while !handle.is_over() {
        events.extend(step(handle));
        if let Some(id) = handle.awaiting_input() {
            let action = action_for(handle, id);
            events.extend(submit_player_action(handle, action).expect("legal action"));
        }
    }
    events
}

#[test]
fn test_scenario_player_defeats_brute() {
    let player = unit(1, Side::Player, 2, 2, no_luck(30, 10, 2));
    let brute = unit(2, Side::Enemy, 3, 2, no_luck(20, 5, 1)).with_profile(AIProfile::Brute);
    let mut handle = start_battle(vec![player, brute], BattleGrid::new(6, 6), 42).unwrap();

    let mut player_turns = 0;
    let events = play_out(&mut handle, |_, _| {
        player_turns += 1;
        Action::attack(UnitId(2))
    });

    assert_eq!(player_turns, 3);
    assert_eq!(get_state(&handle).outcome, Some(BattleOutcome::Victory));
    assert_eq!(handle.unit(UnitId(1)).unwrap().hp, 24);
    assert_eq!(events.last(), Some(&BattleEvent::BattleEnded { victory: true }));

    let player_hits: Vec<i32> = events
        .iter()
        .filter_map(|e| match e {
            BattleEvent::DamageDealt {
                source: Some(UnitId(1)),
                amount,
                ..
            } => Some(*amount),
            _ => None,
        })
        .collect();
    assert_eq!(player_hits, vec![9, 9, 2]);
}

#[test]
fn test_same_seed_same_events() {
    let roster = || {
        vec![
            unit(
                1,
                Side::Player,
                0,
                0,
                UnitStats {
                    crit_chance: 0.3,
                    dodge_chance: 0.2,
                    ..no_luck(30, 7, 1)
                },
            )
            .with_skill("power_strike"),
            unit(
                2,
                Side::Enemy,
                5,
                4,
                UnitStats {
                    crit_chance: 0.25,
                    dodge_chance: 0.25,
                    ..no_luck(24, 6, 1)
                },
            )
            .with_profile(AIProfile::Skirmisher)
            .with_skill("hamstring"),
            unit(3, Side::Enemy, 6, 1, no_luck(18, 5, 0)).with_profile(AIProfile::Brute),
        ]
    };
    let run = |seed: u64| {
        let mut handle = start_battle(roster(), BattleGrid::new(8, 6), seed).unwrap();
        let events = play_out(&mut handle, |h, _| h.suggest_action().unwrap_or_default());
        (events, handle.outcome())
    };

    let (first, outcome_a) = run(99);
    let (second, outcome_b) = run(99);
    assert_eq!(first, second);
    assert_eq!(outcome_a, outcome_b);
    assert!(outcome_a.is_some());
}

#[test]
fn test_single_reaction_then_spent() {
    // Guard at (2,1) flanked by two player units that both walk away
    let grid = BattleGrid::new(6, 6);
    let guard = unit(
        5,
        Side::Enemy,
        2,
        1,
        UnitStats {
            initiative: 20,
            ..no_luck(40, 4, 0)
        },
    )
    .with_profile(AIProfile::Defender)
    .with_perk(Perk::AttacksOfOpportunity);
    let a = unit(1, Side::Player, 1, 1, no_luck(30, 1, 0));
    let b = unit(2, Side::Player, 3, 1, no_luck(30, 1, 0));
    let mut handle = start_battle(vec![a, b, guard], grid, 5).unwrap();

    // Guard acts first (initiative 20) and refreshes its reaction
    let events = step(&mut handle);
    assert_eq!(handle.awaiting_input(), Some(UnitId(1)));
    let guard_hit: i32 = events
        .iter()
        .filter_map(|e| match e {
            BattleEvent::DamageDealt { amount, .. } => Some(*amount),
            _ => None,
        })
        .sum();
    assert_eq!(guard_hit, 4);
    let hp_a = handle.unit(UnitId(1)).unwrap().hp;

    let events = submit_player_action(&mut handle, Action::move_to(GridCoord::new(0, 3))).unwrap();
    let reactions = events
        .iter()
        .filter(|e| matches!(e, BattleEvent::ReactionTriggered { .. }))
        .count();
    assert_eq!(reactions, 1);
    // floor(4 × 0.75) = 3
    assert_eq!(handle.unit(UnitId(1)).unwrap().hp, hp_a - 3);

    step(&mut handle);
    assert_eq!(handle.awaiting_input(), Some(UnitId(2)));
    let events = submit_player_action(&mut handle, Action::move_to(GridCoord::new(5, 3))).unwrap();
    assert!(!events
        .iter()
        .any(|e| matches!(e, BattleEvent::ReactionTriggered { .. })));
}

#[test]
fn test_reaction_can_stop_the_mover() {
    let guard = unit(5, Side::Enemy, 1, 0, no_luck(40, 12, 0))
        .with_profile(AIProfile::Defender)
        .with_perk(Perk::AttacksOfOpportunity);
    let mut frail = unit(1, Side::Player, 0, 0, no_luck(30, 1, 0));
    frail.stats.initiative = 1;
    let mut handle = start_battle(vec![frail, guard], BattleGrid::new(5, 5), 9).unwrap();

    // Guard hits for 12 in round 1, leaving 18
    step(&mut handle);
    submit_player_action(&mut handle, Action::pass()).unwrap();
    // Round 2 guard hits again (6 left), then the player tries to leave
    step(&mut handle);
    assert_eq!(handle.unit(UnitId(1)).unwrap().hp, 6);

    let events = submit_player_action(&mut handle, Action::move_to(GridCoord::new(0, 3))).unwrap();
    assert!(events.contains(&BattleEvent::UnitDied { unit_id: UnitId(1) }));
    assert_eq!(events.last(), Some(&BattleEvent::BattleEnded { victory: false }));
    let moved: Vec<&BattleEvent> = events
        .iter()
        .filter(|e| matches!(e, BattleEvent::UnitMoved { .. }))
        .collect();
    // Killed by the reaction on the step that disengaged
    assert_eq!(moved.len(), 1);
    assert_eq!(handle.outcome(), Some(BattleOutcome::Defeat));
}

#[test]
fn test_submit_errors_leave_battle_untouched() {
    let hero = unit(1, Side::Player, 0, 0, no_luck(30, 8, 0))
        .with_skill("power_strike")
        .with_skill("shield_wall")
        .with_skill("heal")
        .with_resources(2, 0);
    let foe = unit(2, Side::Enemy, 4, 0, no_luck(20, 5, 0)).with_profile(AIProfile::Brute);
    let grid = BattleGrid::from_rows(&["......", "..#...", "......"]).unwrap();
    let mut handle = start_battle(vec![hero, foe], grid, 1).unwrap();

    assert_eq!(
        submit_player_action(&mut handle, Action::pass()),
        Err(InvalidActionError::NotAwaitingInput)
    );
    step(&mut handle);
    let before = get_state(&handle);

    let cases = [
        (
            Action::skill(SkillId::new("power_strike"), Some(UnitId(2))),
            InvalidActionError::InsufficientResources(SkillId::new("power_strike")),
        ),
        (
            Action::skill(SkillId::new("frenzy"), None),
            InvalidActionError::SkillNotInLoadout(SkillId::new("frenzy")),
        ),
        (
            Action::skill(SkillId::new("nonexistent"), None),
            InvalidActionError::UnknownSkill(SkillId::new("nonexistent")),
        ),
        (
            Action::skill(SkillId::new("heal"), Some(UnitId(2))),
            InvalidActionError::InsufficientResources(SkillId::new("heal")),
        ),
        (
            Action::skill(SkillId::basic_attack(), None),
            InvalidActionError::MissingTarget(SkillId::basic_attack()),
        ),
        (
            Action::attack(UnitId(1)),
            InvalidActionError::InvalidTarget(UnitId(1)),
        ),
        (
            Action::move_to(GridCoord::new(2, 1)),
            InvalidActionError::UnreachableDestination(GridCoord::new(2, 1)),
        ),
        (
            Action::move_to(GridCoord::new(5, 2)),
            InvalidActionError::UnreachableDestination(GridCoord::new(5, 2)),
        ),
    ];
    for (action, expected) in cases {
        assert_eq!(submit_player_action(&mut handle, action), Err(expected));
        assert_eq!(get_state(&handle), before);
    }

    // Still waiting on the same unit and a legal action goes through
    assert_eq!(handle.awaiting_input(), Some(UnitId(1)));
    assert!(submit_player_action(&mut handle, Action::skill(SkillId::new("shield_wall"), None)).is_ok());
}

#[test]
fn test_setup_errors() {
    let a = unit(1, Side::Player, 0, 0, UnitStats::default());
    let b = unit(2, Side::Enemy, 1, 0, UnitStats::default());

    let err = start_battle(vec![a.clone()], BattleGrid::new(3, 3), 0).unwrap_err();
    assert!(matches!(err, BattleError::EmptySide(Side::Enemy)));

    let mut dead = b.clone();
    dead.mark_dead();
    let err = start_battle(vec![a.clone(), dead], BattleGrid::new(3, 3), 0).unwrap_err();
    assert!(matches!(err, BattleError::EmptySide(Side::Enemy)));

    let wall = BattleGrid::from_rows(&[".#."]).unwrap();
    let blocked = unit(2, Side::Enemy, 1, 0, UnitStats::default());
    let err = start_battle(vec![a.clone(), blocked], wall, 0).unwrap_err();
    assert!(matches!(err, BattleError::InvalidPlacement { .. }));

    let outside = unit(2, Side::Enemy, 7, 7, UnitStats::default());
    let err = start_battle(vec![a, outside], BattleGrid::new(3, 3), 0).unwrap_err();
    assert!(matches!(err, BattleError::InvalidPlacement { .. }));
}

#[test]
fn test_seeds_from_serde_descriptors() {
    let seeds: Vec<UnitSeed> = serde_json::from_str(
        r#"[
            {"id": 1, "name": "Vanguard", "side": "player", "position": {"x": 0, "y": 0},
             "stats": {"max_hp": 30, "attack": 10, "defense": 2},
             "skills": ["power_strike"], "perks": ["attacks_of_opportunity"]},
            {"id": 2, "name": "Raider", "side": "enemy", "position": {"x": 1, "y": 0},
             "stats": {"max_hp": 20, "attack": 5, "defense": 1},
             "profile": "brute"}
        ]"#,
    )
    .unwrap();
    let units: Vec<BattleUnit> = seeds.into_iter().map(UnitSeed::into_unit).collect();
    let mut handle = start_battle(units, BattleGrid::new(4, 4), 3).unwrap();

    let events = step(&mut handle);
    assert_eq!(events.last(), Some(&BattleEvent::PlayerInputRequired { unit_id: UnitId(1) }));
    let state = get_state(&handle);
    assert_eq!(state.units.len(), 2);
    assert_eq!(state.unit(UnitId(2)).map(|u| u.max_hp), Some(20));

    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["awaiting_input"], 1);
}

#[test]
fn test_player_wiped_by_poison_is_defeat() {
    // Both sides poisoned to death; the player ticks first and the battle stops there
    let mut a = unit(1, Side::Player, 0, 0, no_luck(10, 1, 0));
    a.hp = 1;
    a.statuses.apply(StatusEffect::poisoned(3, 5), 5);
    let mut b = unit(2, Side::Enemy, 4, 4, no_luck(10, 1, 0)).with_profile(AIProfile::Brute);
    b.hp = 1;
    b.statuses.apply(StatusEffect::poisoned(3, 5), 5);
    let mut handle = start_battle(vec![a, b], BattleGrid::new(5, 5), 0).unwrap();

    let events = step(&mut handle);
    assert_eq!(handle.outcome(), Some(BattleOutcome::Defeat));
    assert!(events.contains(&BattleEvent::UnitDied { unit_id: UnitId(1) }));
    assert!(!events.contains(&BattleEvent::UnitDied { unit_id: UnitId(2) }));
}

#[test]
fn test_cancel_mid_battle() {
    let a = unit(1, Side::Player, 0, 0, no_luck(10, 1, 0));
    let b = unit(2, Side::Enemy, 4, 4, no_luck(10, 1, 0)).with_profile(AIProfile::Brute);
    let mut handle = start_battle(vec![a, b], BattleGrid::new(5, 5), 0).unwrap();
    step(&mut handle);

    assert_eq!(handle.cancel(), vec![BattleEvent::BattleCancelled]);
    assert_eq!(handle.outcome(), Some(BattleOutcome::Cancelled));
    assert!(handle.cancel().is_empty());
    assert!(step(&mut handle).is_empty());
}
