//! Run flow integration tests

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chronicle_engine::battle::BattleAction;
use chronicle_engine::catalog::{EntityCatalog, InMemoryRegistry, ModuleStatus};
use chronicle_engine::core::config::ChronicleConfig;
use chronicle_engine::core::error::RunError;
use chronicle_engine::core::types::{Direction, Position};
use chronicle_engine::dungeon::{CellType, INFINITE_DUNGEON_ID};
use chronicle_engine::rewards::PlayerBase;
use chronicle_engine::run::fog::explored_positions;
use chronicle_engine::run::{Chronicle, ChronicleRunState, RunEvent, RunStatus};
use proptest::prelude::*;

/// Chronicle whose floors hold nothing but the guardian
fn quiet_chronicle(registry: &InMemoryRegistry) -> Chronicle {
    chronicle_with_ambient(registry, 0.0)
}

fn chronicle_with_ambient(registry: &InMemoryRegistry, ambient_battle_chance: f64) -> Chronicle {
    let mut config = ChronicleConfig::default();
    config.exploration.ambient_battle_chance = ambient_battle_chance;
    config.generation.encounter_chance = 0.0;
    config.generation.item_cache_chance = 0.0;
    config.generation.puzzle_chance = 0.0;
    let catalog = EntityCatalog::from_content(registry.modules.clone(), registry.characters.clone());
    Chronicle::new(Arc::new(catalog), config)
}

fn installed(ids: &[&str]) -> BTreeMap<String, ModuleStatus> {
    ids.iter()
        .map(|id| (id.to_string(), ModuleStatus::Installed))
        .collect()
}

fn direction_between(from: Position, to: Position) -> Direction {
    Direction::ALL
        .into_iter()
        .find(|d| from.step(*d) == to)
        .expect("path steps are adjacent")
}

/// Follow the shortest path to the exit until something other than a plain
/// move happens
fn walk_to_exit(chronicle: &Chronicle, run: &ChronicleRunState) -> (ChronicleRunState, RunEvent) {
    let floor = run.current_floor().expect("current floor");
    let path = floor
        .find_path(run.position, floor.exit_position)
        .expect("exit reachable");
    let mut current = run.clone();
    for next in path.into_iter().skip(1) {
        let step = chronicle
            .move_player(&current, direction_between(current.position, next))
            .unwrap();
        current = step.run;
        if step.event != RunEvent::Moved {
            return (current, step.event);
        }
    }
    (current, RunEvent::Moved)
}

#[tokio::test]
async fn test_exit_advances_to_next_floor_entry() {
    let registry = InMemoryRegistry::sample();
    let chronicle = quiet_chronicle(&registry);
    let run = chronicle
        .start_run_seeded("logic", &installed(&["logic"]), &PlayerBase::default(), &registry, 5)
        .await
        .unwrap();

    let (next, event) = walk_to_exit(&chronicle, &run);
    assert_eq!(event, RunEvent::FloorAdvanced { level: 2 });
    assert_eq!(next.current_level, 2);
    assert_eq!(next.position, next.current_floor().unwrap().entry_position);
    // The first floor keeps its fog
    assert!(next.dungeon.floor(1).unwrap().cells.iter().any(|c| c.explored));
}

#[tokio::test]
async fn test_plain_floor_step_can_start_ambient_battle() {
    let registry = InMemoryRegistry::sample();
    let chronicle = chronicle_with_ambient(&registry, 1.0);
    let run = chronicle
        .start_run_seeded("logic", &installed(&["logic"]), &PlayerBase::default(), &registry, 5)
        .await
        .unwrap();

    let floor = run.current_floor().unwrap();
    let plain = floor
        .walkable_neighbors(run.position)
        .into_iter()
        .find(|p| floor.cell(*p).is_some_and(|c| c.cell_type == CellType::Floor))
        .expect("entry opens onto a corridor");

    let step = chronicle
        .move_player(&run, direction_between(run.position, plain))
        .unwrap();
    assert_eq!(
        step.event,
        RunEvent::BattleStarted {
            encounter_id: None,
            ambient: true
        }
    );
    let battle = step.run.active_battle.as_ref().expect("ambient battle");
    assert!(battle.participants.iter().any(|p| !p.is_player && !p.is_ally));

    // Exploring is locked until the battle ends
    assert_eq!(
        chronicle.move_player(&step.run, Direction::Up).unwrap_err(),
        RunError::BattleInProgress
    );
}

#[tokio::test]
async fn test_defeating_guardian_completes_run() {
    let registry = InMemoryRegistry::sample();
    let chronicle = quiet_chronicle(&registry);
    let mut run = chronicle
        .start_run_seeded("logic", &installed(&["logic"]), &PlayerBase::default(), &registry, 9)
        .await
        .unwrap();

    for level in 2..=7 {
        let (next, event) = walk_to_exit(&chronicle, &run);
        assert_eq!(event, RunEvent::FloorAdvanced { level });
        run = next;
    }

    let (mut run, event) = walk_to_exit(&chronicle, &run);
    assert!(matches!(event, RunEvent::BattleStarted { ambient: false, .. }));

    // Weaken the guardian so one blow settles it
    if let Some(battle) = run.active_battle.as_mut() {
        for p in battle.participants.iter_mut().filter(|p| !p.is_player && !p.is_ally) {
            p.stats.health = 1;
        }
    }

    let mut outcome = None;
    for _ in 0..10 {
        let Some(battle) = &run.active_battle else {
            break;
        };
        let action = if battle.status.pending_defense().is_some() {
            BattleAction::Defend
        } else {
            BattleAction::Attack { target: None }
        };
        let result = chronicle.apply_action(&run, &action, 90).unwrap();
        run = result.run.clone();
        if result.battle_ended {
            outcome = Some(result);
            break;
        }
    }

    let outcome = outcome.expect("battle ended");
    assert!(outcome.player_won);
    assert!(outcome.rewards.is_some());
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.battles_won, 1);
    assert_eq!(
        chronicle.move_player(&run, Direction::Up).unwrap_err(),
        RunError::RunNotActive
    );
}

#[tokio::test]
async fn test_infinite_dungeon_generates_floors_on_demand() {
    let registry = InMemoryRegistry::sample();
    let chronicle = quiet_chronicle(&registry);
    let run = chronicle
        .start_run_seeded(
            INFINITE_DUNGEON_ID,
            &installed(&["logic", "fallacies"]),
            &PlayerBase::default(),
            &registry,
            21,
        )
        .await
        .unwrap();
    assert!(run.dungeon.is_infinite());

    let mut run = run;
    for level in 2..=9 {
        let (next, event) = walk_to_exit(&chronicle, &run);
        assert_eq!(event, RunEvent::FloorAdvanced { level });
        run = next;
    }
    assert!(run.dungeon.floors.len() >= 9);
    assert_eq!(run.status, RunStatus::Active);
}

#[tokio::test]
async fn test_same_seed_same_run() {
    let registry = InMemoryRegistry::sample();
    let chronicle = quiet_chronicle(&registry);
    let player = PlayerBase::default();
    let a = chronicle
        .start_run_seeded("logic", &installed(&["logic"]), &player, &registry, 77)
        .await
        .unwrap();
    let b = chronicle
        .start_run_seeded("logic", &installed(&["logic"]), &player, &registry, 77)
        .await
        .unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(a.dungeon.floors, b.dungeon.floors);
    assert_eq!(a.position, b.position);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_fog_reveal_is_monotonic(
        seed in any::<u64>(),
        moves in proptest::collection::vec(0usize..4, 1..60),
    ) {
        let registry = InMemoryRegistry::sample();
        let chronicle = quiet_chronicle(&registry);
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut run = rt
            .block_on(chronicle.start_run_seeded(
                "logic",
                &installed(&["logic"]),
                &PlayerBase::default(),
                &registry,
                seed,
            ))
            .unwrap();

        let mut revealed: HashSet<Position> =
            explored_positions(run.current_floor().unwrap()).into_iter().collect();
        prop_assert!(revealed.contains(&run.position));

        for m in moves {
            let step = chronicle.move_player(&run, Direction::ALL[m]).unwrap();
            if step.run.current_level != run.current_level {
                break;
            }
            let now: HashSet<Position> =
                explored_positions(step.run.current_floor().unwrap()).into_iter().collect();
            prop_assert!(now.is_superset(&revealed));
            prop_assert!(now.contains(&step.run.position));
            revealed = now;
            run = step.run;
        }
    }
}
