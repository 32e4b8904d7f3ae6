//! Headless Battle Runner
//!
//! Plays a seeded demo skirmish to the end with both sides driven by AI
//! profiles (the player side through `suggest_action_with`) and prints the
//! result as JSON or text.

use std::path::PathBuf;

use clap::Parser;
use grid_skirmish::battle::{
    start_battle_with, AIProfile, BattleEvent, BattleGrid, BattleHandle, BattleOutcome, BattleUnit,
    GridCoord, Perk, SkillCatalog, UnitStats,
};
use grid_skirmish::core::{BattleConfig, Side, UnitId};
use serde::Serialize;

/// Headless Battle Runner - seeded demo skirmish
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run a seeded grid skirmish and report the outcome")]
struct Args {
    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Battle config TOML (combat constants and AI tuning)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra skill catalog TOML merged over the standard skills
    #[arg(long)]
    skills: Option<PathBuf>,

    /// Override the round limit
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print every battle event to stderr as JSON lines
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct BattleResult {
    outcome: String,
    rounds: u32,
    seed: u64,
    player_survivors: usize,
    enemy_survivors: usize,
    player_damage_dealt: i32,
    enemy_damage_dealt: i32,
    healing_done: i32,
    reactions: usize,
    events: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("grid_skirmish=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let mut config = match &args.config {
        Some(path) => BattleConfig::load(path)?,
        None => BattleConfig::default(),
    };
    if let Some(max_rounds) = args.max_rounds {
        config.combat.max_rounds = max_rounds;
    }

    let mut catalog = SkillCatalog::standard();
    if let Some(path) = &args.skills {
        let extra = SkillCatalog::load(path)?;
        for id in extra.ids() {
            if let Some(skill) = extra.get(&id) {
                catalog.insert(skill.clone());
            }
        }
    }

    let (units, hints) = demo_roster();
    let mut handle = start_battle_with(units, demo_grid()?, seed, catalog, config)?;
    let events = run(&mut handle, &hints, args.verbose)?;

    let result = summarize(&handle, &events, seed);
    match args.format.as_str() {
        "text" => print_text(&result),
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        other => {
            eprintln!("Unknown format '{}', defaulting to json", other);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

/// Drive the battle, answering player input with the unit's hint profile
fn run(
    handle: &mut BattleHandle,
    hints: &[(UnitId, AIProfile)],
    verbose: bool,
) -> Result<Vec<BattleEvent>, Box<dyn std::error::Error>> {
    let mut events = Vec::new();
    loop {
        let batch = handle.step();
        log_events(&batch, verbose)?;
        events.extend(batch);
        if handle.is_over() {
            break;
        }

        let Some(unit_id) = handle.awaiting_input() else {
            break;
        };
        let profile = hints
            .iter()
            .find(|(id, _)| *id == unit_id)
            .map_or(AIProfile::Brute, |(_, profile)| *profile);
        let action = handle.suggest_action_with(profile).unwrap_or_default();
        let batch = handle.submit_player_action(action)?;
        log_events(&batch, verbose)?;
        events.extend(batch);
    }
    Ok(events)
}

fn log_events(events: &[BattleEvent], verbose: bool) -> Result<(), serde_json::Error> {
    if verbose {
        for event in events {
            eprintln!("{}", serde_json::to_string(event)?);
        }
    }
    Ok(())
}

fn summarize(handle: &BattleHandle, events: &[BattleEvent], seed: u64) -> BattleResult {
    let side_of = |id: UnitId| handle.unit(id).map(|u| u.side);
    let survivors = |side: Side| {
        handle
            .units()
            .iter()
            .filter(|u| u.side == side && u.is_alive())
            .count()
    };

    let mut result = BattleResult {
        outcome: match handle.outcome() {
            Some(BattleOutcome::Victory) => "victory".to_string(),
            Some(BattleOutcome::Defeat) => "defeat".to_string(),
            Some(BattleOutcome::Cancelled) => "cancelled".to_string(),
            None => "undecided".to_string(),
        },
        rounds: handle.round(),
        seed,
        player_survivors: survivors(Side::Player),
        enemy_survivors: survivors(Side::Enemy),
        player_damage_dealt: 0,
        enemy_damage_dealt: 0,
        healing_done: 0,
        reactions: 0,
        events: events.len(),
    };

    for event in events {
        match event {
            BattleEvent::DamageDealt {
                source: Some(source),
                amount,
                ..
            } => match side_of(*source) {
                Some(Side::Player) => result.player_damage_dealt += amount,
                Some(Side::Enemy) => result.enemy_damage_dealt += amount,
                None => {}
            },
            BattleEvent::Healed { amount, .. } => result.healing_done += amount,
            BattleEvent::ReactionTriggered { .. } => result.reactions += 1,
            _ => {}
        }
    }
    result
}

fn print_text(result: &BattleResult) {
    println!("Battle Result");
    println!("=============");
    println!("Outcome: {}", result.outcome);
    println!("Rounds: {}", result.rounds);
    println!(
        "Survivors: {} player / {} enemy",
        result.player_survivors, result.enemy_survivors
    );
    println!(
        "Damage dealt: {} player / {} enemy",
        result.player_damage_dealt, result.enemy_damage_dealt
    );
    println!("Healing: {}", result.healing_done);
    println!("Attacks of opportunity: {}", result.reactions);
    println!("Events: {}", result.events);
    println!();
    println!("Seed: {}", result.seed);
}

/// 12x8 field with a wall, a pit, cover and a hazard strip
fn demo_grid() -> grid_skirmish::core::Result<BattleGrid> {
    BattleGrid::from_rows(&[
        "............",
        "....+...#...",
        "..#.....#...",
        "..#..~~.....",
        ".....~~..#..",
        "...._...+#..",
        "....+.......",
        "............",
    ])
}

fn stats(max_hp: i32, attack: i32, defense: i32, skill_power: i32, initiative: i32) -> UnitStats {
    UnitStats {
        max_hp,
        attack,
        defense,
        skill_power,
        crit_chance: 0.1,
        dodge_chance: 0.05,
        initiative,
        ..Default::default()
    }
}

fn demo_roster() -> (Vec<BattleUnit>, Vec<(UnitId, AIProfile)>) {
    let at = GridCoord::new;

    let knight = BattleUnit::new(UnitId(1), "Knight", Side::Player, at(1, 3), stats(32, 8, 3, 0, 9))
        .with_class("warrior")
        .with_skill("power_strike")
        .with_skill("shield_bash")
        .with_skill("shield_wall")
        .with_perk(Perk::AttacksOfOpportunity)
        .with_regen(1, 0);
    let mut ranger = BattleUnit::new(UnitId(2), "Ranger", Side::Player, at(0, 1), stats(22, 7, 1, 0, 13))
        .with_class("ranger")
        .with_skill("mark_target")
        .with_skill("crippling_shot")
        .with_regen(1, 0);
    ranger.stats.basic_range = 4;
    let mage = BattleUnit::new(UnitId(3), "Mage", Side::Player, at(0, 5), stats(18, 3, 0, 8, 11))
        .with_class("mage")
        .with_skill("hex")
        .with_skill("frost_snare")
        .with_skill("firebolt")
        .with_resources(4, 14)
        .with_regen(0, 2);
    let cleric = BattleUnit::new(UnitId(4), "Cleric", Side::Player, at(1, 6), stats(22, 4, 1, 6, 10))
        .with_class("priest")
        .with_skill("heal")
        .with_skill("bless")
        .with_skill("ward")
        .with_resources(6, 14)
        .with_regen(0, 2);

    let enemy = |id: u32, name: &str, pos: GridCoord, stats: UnitStats, profile: AIProfile| {
        BattleUnit::new(UnitId(id), name, Side::Enemy, pos, stats).with_profile(profile)
    };
    let warlord = enemy(10, "Warlord", at(11, 3), stats(30, 7, 2, 0, 8), AIProfile::Commander)
        .with_skill("battle_cry")
        .with_skill("power_strike")
        .with_perk(Perk::AttacksOfOpportunity);
    let ogre = enemy(11, "Ogre", at(10, 1), stats(34, 9, 1, 0, 6), AIProfile::Brute)
        .with_skill("reckless_swing")
        .with_skill("power_strike");
    let cutthroat = enemy(12, "Cutthroat", at(11, 6), stats(20, 7, 0, 0, 14), AIProfile::Assassin)
        .with_skill("backstab")
        .with_skill("venom_blade");
    let hexer = enemy(13, "Hexer", at(11, 7), stats(18, 3, 0, 7, 10), AIProfile::Controller)
        .with_skill("frost_snare")
        .with_skill("expose")
        .with_skill("firebolt")
        .with_resources(2, 14)
        .with_regen(0, 2);
    let berserker = enemy(14, "Berserker", at(10, 4), stats(26, 8, 0, 0, 12), AIProfile::Berserker)
        .with_skill("frenzy")
        .with_skill("sunder");

    let hints = vec![
        (UnitId(1), AIProfile::Defender),
        (UnitId(2), AIProfile::Tactician),
        (UnitId(3), AIProfile::Caster),
        (UnitId(4), AIProfile::Support),
    ];
    (
        vec![knight, ranger, mage, cleric, warlord, ogre, cutthroat, hexer, berserker],
        hints,
    )
}
