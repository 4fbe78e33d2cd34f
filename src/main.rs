//! Chronicle - Entry Point
//!
//! Terminal front end for the Chronicle engine. Loads the sample registry,
//! restores any saved run and drives it one command at a time. Answers are
//! graded by the LLM scorer when `LLM_API_KEY` is set; otherwise the player
//! types the score directly.

use chronicle_engine::battle::{BattleAction, BattleState, BattleStatus};
use chronicle_engine::catalog::{EntityCatalog, InMemoryRegistry, ModuleStatus};
use chronicle_engine::core::config::ChronicleConfig;
use chronicle_engine::core::error::Result;
use chronicle_engine::core::types::{Direction, ParticipantId};
use chronicle_engine::dungeon::INFINITE_DUNGEON_ID;
use chronicle_engine::persistence::{FileStore, SaveStore};
use chronicle_engine::rewards::{PlayerBase, RewardSummary};
use chronicle_engine::run::{Chronicle, ChronicleRunState, EncounterResponse, RunStatus, RunStep};
use chronicle_engine::scorer::{ability_challenge, CognitiveScorer, LlmScorer};

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "data/chronicle.toml";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chronicle_engine=info")),
        )
        .init();

    tracing::info!("Chronicle starting...");

    // Runtime for registry and scorer calls
    let rt = Runtime::new()?;

    let config = if Path::new(CONFIG_PATH).exists() {
        ChronicleConfig::load(CONFIG_PATH)?
    } else {
        ChronicleConfig::default()
    };
    let registry = InMemoryRegistry::sample();
    let chronicle = rt.block_on(Chronicle::from_registry(&registry, config));

    let scorer = LlmScorer::from_env().ok();
    if scorer.is_none() {
        tracing::warn!("LLM_API_KEY not set - answers will be scored by hand");
    }

    let save_dir = std::env::var("CHRONICLE_SAVE_DIR").unwrap_or_else(|_| "saves".into());
    let mut saves = SaveStore::new(FileStore::open(&save_dir)?);
    let loaded = saves.load(chronicle.catalog(), chronicle.config())?;
    for note in &loaded.recovered {
        println!("(recovered: {})", note);
    }
    let mut player = loaded.player;
    let mut run = loaded.run;

    // Modules without prerequisites start installed
    let mut installed: BTreeMap<String, ModuleStatus> = chronicle
        .catalog()
        .modules()
        .into_iter()
        .map(|m| {
            let status = if m.required_modules.is_empty() {
                ModuleStatus::Installed
            } else {
                ModuleStatus::Available
            };
            (m.id.clone(), status)
        })
        .collect();

    println!("\n=== CHRONICLE ===");
    println!("Descend, reason, and argue your way through the dungeon.");
    print_help();

    if let Some(current) = &run {
        println!("Resuming run on floor {}.", current.current_level);
        show_run(current);
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        let (command, rest) = input.split_once(' ').unwrap_or((input, ""));
        let rest = rest.trim();

        match command {
            "quit" | "q" => break,
            "help" | "h" => {
                print_help();
                continue;
            }
            "stats" => {
                let shown = run.as_ref().map(|r| &r.player).unwrap_or(&player);
                print_player(shown);
                continue;
            }
            _ => {}
        }

        let Some(current) = run.as_ref() else {
            // ----- No run in progress -----
            match command {
                "dungeons" => list_dungeons(chronicle.catalog(), &installed),
                "install" => match installed.get_mut(rest) {
                    Some(status) => {
                        *status = ModuleStatus::Installed;
                        println!("Installed {}.", rest);
                    }
                    None => println!("No module named '{}'.", rest),
                },
                "start" => {
                    let dungeon_id = if rest.is_empty() { INFINITE_DUNGEON_ID } else { rest };
                    match rt.block_on(chronicle.start_run(dungeon_id, &installed, &player, &registry)) {
                        Ok(started) => {
                            println!("You enter {}.", started.dungeon.name);
                            show_run(&started);
                            saves.save_run(&started)?;
                            run = Some(started);
                        }
                        Err(e) => println!("Cannot start: {}", e),
                    }
                }
                _ => println!("No run in progress. Try: dungeons, install <id>, start <id>"),
            }
            continue;
        };

        let next = if let Some(battle) = &current.active_battle {
            // ----- Battle -----
            let action = match parse_battle_action(command, rest) {
                Some(action) => action,
                None => {
                    println!("In battle: cast <ability> [target], attack [target], defend, book <id>");
                    continue;
                }
            };
            let challenge = battle_challenge(&chronicle, battle, &action);
            let score = obtain_score(&rt, scorer.as_ref(), &challenge)?;
            match chronicle.apply_action(current, &action, score) {
                Ok(outcome) => {
                    if let Some(battle) = &outcome.run.active_battle {
                        print_new_events(battle, log_len(current));
                    } else if outcome.battle_ended {
                        println!(
                            "{}",
                            if outcome.player_won { "Victory!" } else { "You have fallen." }
                        );
                    }
                    if let Some(summary) = &outcome.rewards {
                        print_rewards(summary);
                    }
                    outcome.run
                }
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            }
        } else if current.active_encounter.is_some() {
            // ----- Non-battle encounter -----
            let response = match command {
                "choose" => match rest.parse() {
                    Ok(index) => EncounterResponse::Choice(index),
                    Err(_) => {
                        println!("Usage: choose <number>");
                        continue;
                    }
                },
                "answer" => EncounterResponse::Answer(rest.to_string()),
                "argue" => {
                    let challenge = current.current_prompt().unwrap_or_default();
                    let score = score_answer(&rt, scorer.as_ref(), &challenge, rest)?;
                    EncounterResponse::Scored(score)
                }
                _ => {
                    println!("Respond with: choose <n>, answer <text>, argue <text>");
                    continue;
                }
            };
            match chronicle.respond(current, &response) {
                Ok(outcome) => {
                    if outcome.resolved {
                        println!("{}", if outcome.success { "Well reasoned." } else { "Not quite." });
                    }
                    if let Some(summary) = &outcome.rewards {
                        print_rewards(summary);
                    }
                    outcome.run
                }
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            }
        } else {
            // ----- Exploration -----
            let result = match command {
                "n" | "north" => chronicle.move_player(current, Direction::Up).map(split_step),
                "s" | "south" => chronicle.move_player(current, Direction::Down).map(split_step),
                "w" | "west" => chronicle.move_player(current, Direction::Left).map(split_step),
                "e" | "east" => chronicle.move_player(current, Direction::Right).map(split_step),
                "x" | "interact" => chronicle.interact(current).map(split_step),
                "use" => chronicle.use_item(current, rest).map(|r| (r, format!("Used {}.", rest))),
                "recruit" => chronicle.recruit(current, rest).map(|r| {
                    let message = match &r.companion {
                        Some(c) if r.success => format!("{} joins your party.", c.name),
                        _ => "They decline to join you.".to_string(),
                    };
                    (r.run, message)
                }),
                "abandon" => Ok((chronicle.abandon(current), "You flee the dungeon.".to_string())),
                "map" | "look" => {
                    show_run(current);
                    continue;
                }
                _ => {
                    println!("Unknown command. Type 'help' for the list.");
                    continue;
                }
            };
            match result {
                Ok((next, message)) => {
                    if !message.is_empty() {
                        println!("{}", message);
                    }
                    next
                }
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            }
        };

        saves.save_run(&next)?;
        if next.is_active() {
            if next.active_battle.is_none() {
                show_run(&next);
            } else if let Some(prompt) = next.current_prompt() {
                println!("{}", prompt);
            }
            run = Some(next);
        } else {
            match next.status {
                RunStatus::Completed => println!("The dungeon is conquered!"),
                RunStatus::Failed => println!("Your run has ended in defeat."),
                _ => println!("Run abandoned."),
            }
            player = next.player;
            run = None;
        }
    }

    println!("\nGoodbye, {}.", player.name);
    Ok(())
}

fn split_step(step: RunStep) -> (ChronicleRunState, String) {
    let message = step.event.describe();
    (step.run, message)
}

fn print_help() {
    println!();
    println!("Commands:");
    println!("  dungeons / install <id> / start [id]  - choose a dungeon (default: infinite)");
    println!("  n / s / e / w                         - move");
    println!("  x                                     - interact with the current cell");
    println!("  map                                   - show the explored floor");
    println!("  use <item> / recruit <companion>      - inventory and party");
    println!("  cast <ability> [target] / attack [target] / defend / book <id>");
    println!("  choose <n> / answer <text> / argue <text>");
    println!("  stats / abandon / quit");
    println!();
}

fn list_dungeons(catalog: &EntityCatalog, installed: &BTreeMap<String, ModuleStatus>) {
    println!("  {} - endless floors themed on installed modules", INFINITE_DUNGEON_ID);
    for module in catalog.modules() {
        let status = installed.get(&module.id).copied().unwrap_or(ModuleStatus::Locked);
        let requires = if module.required_modules.is_empty() {
            String::new()
        } else {
            format!(" (requires {})", module.required_modules.join(", "))
        };
        println!("  {} - {} [{:?}]{}", module.id, module.title, status, requires);
    }
}

fn show_run(run: &ChronicleRunState) {
    println!();
    println!("Floor {} ({:?})", run.current_level, run.current_floor().map(|f| f.phase));
    println!("{}", run.render_floor());
    let stats = &run.player.stats;
    println!(
        "HP {}/{}  MP {}/{}  Lv {}",
        stats.health, stats.max_health, stats.mana, stats.max_mana, run.player.level
    );
    if let Some(prompt) = run.current_prompt() {
        println!("{}", prompt);
    }
}

fn print_player(player: &PlayerBase) {
    println!("{} - level {} ({} xp)", player.name, player.level, player.experience);
    println!("  {:?}", player.stats);
    for (item, count) in &player.inventory {
        println!("  {} x{}", item, count);
    }
    for companion in &player.companions {
        println!("  companion: {}", companion.name);
    }
}

fn print_rewards(summary: &RewardSummary) {
    println!("Rewards: {:?}", summary);
}

fn log_len(run: &ChronicleRunState) -> usize {
    run.active_battle.as_ref().map(|b| b.log.len()).unwrap_or(0)
}

fn print_new_events(battle: &BattleState, from: usize) {
    for event in battle.log.iter().skip(from) {
        println!("  [{}] {}", event.round, event.description);
    }
    for p in &battle.participants {
        println!(
            "  {} {} HP {}/{} MP {}",
            p.id, p.name, p.stats.health, p.stats.max_health, p.stats.mana
        );
    }
    if let BattleStatus::Ongoing { awaiting_defense: Some(_) } = battle.status {
        println!("An attack is coming - defend!");
    } else if let Some(actor) = battle.current_actor() {
        println!("{} acts.", actor.name);
    }
}

fn parse_target(text: &str) -> Option<ParticipantId> {
    text.trim_start_matches('p').parse().ok().map(ParticipantId)
}

fn parse_battle_action(command: &str, rest: &str) -> Option<BattleAction> {
    let mut parts = rest.split_whitespace();
    match command {
        "cast" => Some(BattleAction::Spell {
            ability_id: parts.next()?.to_string(),
            target: parts.next().and_then(parse_target),
        }),
        "attack" => Some(BattleAction::Attack {
            target: parts.next().and_then(parse_target),
        }),
        "defend" => Some(BattleAction::Defend),
        "book" => Some(BattleAction::SwitchSpellbook {
            spellbook_id: parts.next()?.to_string(),
        }),
        _ => None,
    }
}

fn battle_challenge(chronicle: &Chronicle, battle: &BattleState, action: &BattleAction) -> String {
    match action {
        BattleAction::Spell { ability_id, .. } => battle
            .current_actor()
            .and_then(|actor| actor.ability(ability_id))
            .map(|ability| {
                let module = ability
                    .module_id
                    .as_deref()
                    .and_then(|id| chronicle.catalog().module(id));
                ability_challenge(ability, module)
            })
            .unwrap_or_else(|| format!("Explain how {} works.", ability_id)),
        _ => battle
            .pending_prompt
            .clone()
            .unwrap_or_else(|| "Explain your next move in the argument.".to_string()),
    }
}

fn obtain_score(rt: &Runtime, scorer: Option<&LlmScorer>, challenge: &str) -> io::Result<u8> {
    println!("{}", challenge);
    if scorer.is_some() {
        let answer = read_line("Your answer: ")?;
        return score_answer(rt, scorer, challenge, &answer);
    }
    read_score()
}

fn score_answer(rt: &Runtime, scorer: Option<&LlmScorer>, challenge: &str, answer: &str) -> io::Result<u8> {
    let Some(scorer) = scorer else {
        return read_score();
    };
    match rt.block_on(scorer.score(challenge, answer)) {
        Ok(verdict) => {
            if let Some(feedback) = &verdict.feedback {
                println!("({}) {}", verdict.score, feedback);
            }
            Ok(verdict.score)
        }
        Err(e) => {
            tracing::warn!("Scoring failed: {}", e);
            read_score()
        }
    }
}

fn read_score() -> io::Result<u8> {
    loop {
        let line = read_line("Score (0-100): ")?;
        match line.parse::<u32>() {
            Ok(score) => return Ok(score.min(100) as u8),
            Err(_) => println!("Enter a number."),
        }
    }
}

fn read_line(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
    }
    Ok(line.trim().to_string())
}
