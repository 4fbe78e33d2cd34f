//! Floor generation and dungeon assembly integration tests

use chronicle_engine::catalog::{EntityCatalog, GuardianSpec, InMemoryRegistry, PhaseType, SACRED_CIRCUIT};
use chronicle_engine::core::config::GenerationConfig;
use chronicle_engine::dungeon::*;
use proptest::prelude::*;

fn request(level: u32, width: u32, height: u32, seed: u64) -> FloorRequest<'static> {
    FloorRequest {
        level,
        width,
        height,
        dungeon_seed: seed,
        difficulty_bonus: 0,
        module: None,
        guardian: None,
    }
}

fn sample_catalog() -> EntityCatalog {
    let registry = InMemoryRegistry::sample();
    EntityCatalog::from_content(registry.modules, registry.characters)
}

#[test]
fn test_sample_dungeon_walks_the_circuit() {
    let catalog = sample_catalog();
    let module = catalog.module("logic").expect("sample module").clone();
    let guardian = GuardianSpec::from_module(&module);
    let dungeon = assemble_dungeon(&module, &guardian, 17, &catalog, &GenerationConfig::default());

    let phases: Vec<PhaseType> = dungeon.floors.iter().map(|f| f.phase).collect();
    assert_eq!(phases, SACRED_CIRCUIT.to_vec());

    // Only the final floor carries the guardian
    for floor in &dungeon.floors {
        let has_boss = floor.cells.iter().any(|c| c.cell_type == CellType::FloorBoss);
        assert_eq!(has_boss, dungeon.is_final_floor(floor.level), "floor {}", floor.level);
    }
}

#[test]
fn test_fresh_floor_is_fully_fogged() {
    let floor = generate_floor(&request(1, 15, 15, 3), &EntityCatalog::builtin(), &GenerationConfig::default());
    assert!(floor.cells.iter().all(|c| !c.explored && !c.visited));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_floors_are_structurally_valid(
        width in 0u32..32,
        height in 0u32..32,
        level in 1u32..8,
        seed in any::<u64>(),
    ) {
        let catalog = EntityCatalog::builtin();
        let floor = generate_floor(&request(level, width, height, seed), &catalog, &GenerationConfig::default());

        prop_assert_eq!(floor.cells.len(), (floor.width * floor.height) as usize);
        prop_assert!(floor.cells.len() >= 1);
        prop_assert!(floor.is_walkable(floor.entry_position));
        prop_assert!(floor.is_walkable(floor.exit_position));
        prop_assert!(floor.find_path(floor.entry_position, floor.exit_position).is_some());
        if floor.cells.len() > 1 {
            prop_assert_ne!(floor.entry_position, floor.exit_position);
        }
        for encounter in &floor.encounters {
            prop_assert!(floor.is_walkable(encounter.position));
        }
    }

    #[test]
    fn prop_generation_is_deterministic(seed in any::<u64>(), level in 1u32..8) {
        let catalog = EntityCatalog::builtin();
        let config = GenerationConfig::default();
        let a = generate_floor(&request(level, 15, 15, seed), &catalog, &config);
        let b = generate_floor(&request(level, 15, 15, seed), &catalog, &config);
        prop_assert_eq!(a, b);
    }
}
