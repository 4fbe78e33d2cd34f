//! Headless Chronicle Runner
//!
//! Plays a seeded run against the sample registry without a human: walks
//! the shortest path to each exit, fights with a fixed cognitive score and
//! prints a JSON or text summary. Useful for balancing and regression checks.

use chronicle_engine::battle::{BattleAction, BattleState, Side, ADEQUATE_THRESHOLD};
use chronicle_engine::catalog::{InMemoryRegistry, ModuleStatus};
use chronicle_engine::core::config::ChronicleConfig;
use chronicle_engine::core::types::{Direction, Position};
use chronicle_engine::dungeon::{EncounterPayload, INFINITE_DUNGEON_ID};
use chronicle_engine::run::fog::explored_count;
use chronicle_engine::run::{Chronicle, ChronicleRunState, EncounterResponse, RunEvent};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;

/// Headless Chronicle Runner - automated dungeon runs
#[derive(Parser, Debug)]
#[command(name = "chronicle_runner")]
#[command(about = "Play a seeded dungeon run automatically and report the outcome")]
struct Args {
    /// Dungeon id (a module id, or "infinite")
    #[arg(long, default_value = "logic")]
    dungeon: String,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Cognitive score used for every answer
    #[arg(long, default_value_t = 85)]
    score: u8,

    /// Maximum run operations before giving up
    #[arg(long, default_value_t = 5000)]
    max_steps: u32,

    /// Floors to clear before stopping an infinite run
    #[arg(long, default_value_t = 5)]
    floors: u32,

    /// Optional TOML config file
    #[arg(long)]
    config: Option<String>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print each run event to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct RunReport {
    dungeon: String,
    seed: u64,
    status: String,
    final_level: u32,
    battles_won: u32,
    steps: u32,
    player_level: u32,
    experience: u32,
    health: i32,
    inventory: BTreeMap<String, u32>,
    companions: Vec<String>,
    explored_cells: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chronicle_engine=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let config = match &args.config {
        Some(path) => ChronicleConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config '{}': {}", path, e);
            eprintln!("Using default config");
            ChronicleConfig::default()
        }),
        None => ChronicleConfig::default(),
    };

    let registry = InMemoryRegistry::sample();
    let chronicle = Chronicle::from_registry(&registry, config).await;
    let installed: BTreeMap<String, ModuleStatus> = chronicle
        .catalog()
        .modules()
        .into_iter()
        .map(|m| (m.id.clone(), ModuleStatus::Installed))
        .collect();

    let player = chronicle_engine::rewards::PlayerBase::new("Runner");
    let mut run = match chronicle
        .start_run_seeded(&args.dungeon, &installed, &player, &registry, seed)
        .await
    {
        Ok(run) => run,
        Err(e) => {
            eprintln!("Failed to start run: {}", e);
            std::process::exit(1);
        }
    };

    let mut steps = 0;
    while run.is_active() && steps < args.max_steps {
        if run.dungeon.id == INFINITE_DUNGEON_ID && run.current_level > args.floors {
            break;
        }
        steps += 1;

        let next = if let Some(battle) = &run.active_battle {
            fight(&chronicle, &run, battle, args.score)
        } else if run.active_encounter.is_some() {
            answer(&chronicle, &run, args.score)
        } else {
            explore(&chronicle, &run, args.verbose)
        };

        match next {
            Some(next) => run = next,
            None => {
                eprintln!("Runner stuck on floor {} at {:?}", run.current_level, run.position);
                break;
            }
        }
    }

    let report = RunReport {
        dungeon: run.dungeon.id.clone(),
        seed,
        status: format!("{:?}", run.status),
        final_level: run.current_level,
        battles_won: run.battles_won,
        steps,
        player_level: run.player.level,
        experience: run.player.experience,
        health: run.player.stats.health,
        inventory: run.player.inventory.clone(),
        companions: run.player.companions.iter().map(|c| c.name.clone()).collect(),
        explored_cells: run.dungeon.floors.iter().map(explored_count).sum(),
    };

    match args.format.as_str() {
        "text" => {
            println!("Chronicle Run");
            println!("=============");
            println!("Dungeon: {}", report.dungeon);
            println!("Status: {}", report.status);
            println!("Floor reached: {}", report.final_level);
            println!("Battles won: {}", report.battles_won);
            println!("Steps: {}", report.steps);
            println!("Player: level {} ({} xp, {} hp)", report.player_level, report.experience, report.health);
            println!("Explored cells: {}", report.explored_cells);
            println!();
            println!("Seed: {}", report.seed);
        }
        other => {
            if other != "json" {
                eprintln!("Unknown format '{}', defaulting to json", other);
            }
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Failed to encode report: {}", e),
            }
        }
    }
}

/// One battle action: defend when prompted, else the strongest affordable spell
fn fight(
    chronicle: &Chronicle,
    run: &ChronicleRunState,
    battle: &BattleState,
    score: u8,
) -> Option<ChronicleRunState> {
    let action = if battle.status.pending_defense().is_some() {
        BattleAction::Defend
    } else {
        let actor = battle.current_actor()?;
        let target = battle.living_on(Side::Enemies).first().copied()?;
        let spell = actor
            .abilities
            .iter()
            .filter(|a| a.deals_damage() && a.target.is_hostile() && a.mana_cost <= actor.stats.mana)
            .max_by_key(|a| a.damage_power());
        match spell {
            Some(ability) => BattleAction::Spell {
                ability_id: ability.id.clone(),
                target: ability.target.is_single().then_some(target),
            },
            None => BattleAction::Attack { target: Some(target) },
        }
    };

    match chronicle.apply_action(run, &action, score) {
        Ok(outcome) => Some(outcome.run),
        Err(e) => {
            tracing::warn!("Runner action {:?} rejected: {}", action, e);
            chronicle
                .apply_action(run, &BattleAction::Attack { target: None }, score)
                .ok()
                .map(|outcome| outcome.run)
        }
    }
}

fn answer(chronicle: &Chronicle, run: &ChronicleRunState, score: u8) -> Option<ChronicleRunState> {
    let active = run.active_encounter.as_ref()?;
    let encounter = run.dungeon.floor(active.level)?.encounter(&active.encounter_id)?;
    let response = match &encounter.payload {
        EncounterPayload::Discussion(_) => EncounterResponse::Choice(0),
        EncounterPayload::Puzzle(puzzle) if score >= ADEQUATE_THRESHOLD => {
            EncounterResponse::Answer(puzzle.solution.clone())
        }
        EncounterPayload::Puzzle(_) => EncounterResponse::Answer(String::new()),
        _ => EncounterResponse::Scored(score),
    };
    chronicle.respond(run, &response).ok().map(|outcome| outcome.run)
}

fn explore(chronicle: &Chronicle, run: &ChronicleRunState, verbose: bool) -> Option<ChronicleRunState> {
    let floor = run.current_floor()?;
    let path = floor.find_path(run.position, floor.exit_position)?;
    let next_cell = *path.get(1)?;
    let direction = direction_between(run.position, next_cell)?;

    let step = chronicle.move_player(run, direction).ok()?;
    if verbose {
        eprintln!("  floor {} {:?}: {:?}", step.run.current_level, step.run.position, step.event);
    }
    match step.event {
        RunEvent::Blocked => None,
        // Open caches and puzzles on the way
        RunEvent::Discovered { .. } => chronicle.interact(&step.run).ok().map(|s| s.run),
        _ => Some(step.run),
    }
}

fn direction_between(from: Position, to: Position) -> Option<Direction> {
    Direction::ALL
        .into_iter()
        .find(|d| from.step(*d) == to)
}
