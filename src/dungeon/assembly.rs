//! Dungeon assembly from module metadata
//!
//! A module dungeon gets one floor per Sacred Circuit phase with the guardian
//! waiting on the last. The infinite dungeon cycles through installed modules
//! and grows one floor at a time as the player descends.

use serde::{Deserialize, Serialize};

use crate::catalog::{
    AbilityRef, Alignment, Element, EntityCatalog, GuardianSpec, ModuleSummary, SACRED_CIRCUIT,
};
use crate::core::config::GenerationConfig;
use crate::dungeon::floor::{generate_floor, Floor, FloorRequest};

/// Id of the endless dungeon built from every installed module
pub const INFINITE_DUNGEON_ID: &str = "infinite";

/// Levels per difficulty step in the infinite dungeon
const INFINITE_LEVELS_PER_STEP: u32 = SACRED_CIRCUIT.len() as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DungeonKind {
    /// Single module, no prerequisites
    Standard,
    /// Single module gated on other installed modules
    Challenge,
    /// Endless, floors appended lazily
    Infinite,
}

/// Environment flavor derived from alignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentTheme {
    pub name: String,
    pub element: Element,
    pub ambience: String,
}

impl EnvironmentTheme {
    pub fn for_alignment(alignment: Alignment) -> Self {
        let (name, ambience) = match alignment {
            Alignment::Chaos => ("Shifting Labyrinth", "Walls whisper half-truths as you pass."),
            Alignment::Law => ("Ordered Archive", "Every corridor is catalogued and numbered."),
            Alignment::Neutral => ("Twilight Athenaeum", "Dust hangs in pale lamplight."),
        };
        Self {
            name: name.to_string(),
            element: Element::for_alignment(alignment),
            ambience: ambience.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dungeon {
    pub id: String,
    pub name: String,
    pub kind: DungeonKind,
    pub alignment: Alignment,
    pub difficulty: u32,
    pub theme: EnvironmentTheme,
    #[serde(default)]
    pub required_modules: Vec<String>,
    /// Modules cycled for floor theming (infinite dungeons)
    #[serde(default)]
    pub theme_modules: Vec<String>,
    pub seed: u64,
    pub floor_width: u32,
    pub floor_height: u32,
    pub floors: Vec<Floor>,
    #[serde(default)]
    pub guardian: Option<GuardianSpec>,
}

impl Dungeon {
    pub fn is_infinite(&self) -> bool {
        self.kind == DungeonKind::Infinite
    }

    /// Floor at a 1-based level
    pub fn floor(&self, level: u32) -> Option<&Floor> {
        self.floors.iter().find(|f| f.level == level)
    }

    pub fn floor_mut(&mut self, level: u32) -> Option<&mut Floor> {
        self.floors.iter_mut().find(|f| f.level == level)
    }

    /// Last level of a finite dungeon
    pub fn final_level(&self) -> Option<u32> {
        if self.is_infinite() {
            None
        } else {
            self.floors.iter().map(|f| f.level).max()
        }
    }

    pub fn is_final_floor(&self, level: u32) -> bool {
        self.final_level() == Some(level)
    }

    /// Make sure `level` exists, generating it for infinite dungeons
    ///
    /// Returns false when a finite dungeon has no such floor.
    pub fn ensure_floor(
        &mut self,
        level: u32,
        catalog: &EntityCatalog,
        config: &GenerationConfig,
    ) -> bool {
        if self.floor(level).is_some() {
            return true;
        }
        if !self.is_infinite() {
            return false;
        }

        let module = self.theme_module_for(level, catalog);
        let request = FloorRequest {
            level,
            width: self.floor_width,
            height: self.floor_height,
            dungeon_seed: self.seed,
            difficulty_bonus: (level.saturating_sub(1)) / INFINITE_LEVELS_PER_STEP,
            module: module.as_ref(),
            guardian: None,
        };
        let floor = generate_floor(&request, catalog, config);
        tracing::info!("Infinite dungeon descended to floor {}", level);
        self.floors.push(floor);
        self.floors.sort_by_key(|f| f.level);
        true
    }

    fn theme_module_for(&self, level: u32, catalog: &EntityCatalog) -> Option<ModuleSummary> {
        if self.theme_modules.is_empty() {
            return None;
        }
        let index = (level.max(1) - 1) as usize % self.theme_modules.len();
        catalog.module(&self.theme_modules[index]).cloned()
    }
}

/// Resolve every guardian ability once, before any battle sees it
fn resolve_guardian(guardian: &GuardianSpec, catalog: &EntityCatalog) -> GuardianSpec {
    let mut resolved = guardian.clone();
    resolved.abilities = guardian
        .abilities
        .iter()
        .map(|a| AbilityRef::Resolved(catalog.resolve(a)))
        .collect();
    resolved
}

/// Build a finite dungeon for a module
pub fn assemble_dungeon(
    module: &ModuleSummary,
    guardian: &GuardianSpec,
    seed: u64,
    catalog: &EntityCatalog,
    config: &GenerationConfig,
) -> Dungeon {
    let guardian = resolve_guardian(guardian, catalog);
    let difficulty = module.difficulty.clamp(1, 5);
    let final_level = SACRED_CIRCUIT.len() as u32;

    let floors: Vec<Floor> = (1..=final_level)
        .map(|level| {
            let request = FloorRequest {
                level,
                width: config.floor_width,
                height: config.floor_height,
                dungeon_seed: seed,
                difficulty_bonus: difficulty - 1,
                module: Some(module),
                guardian: (level == final_level).then_some(&guardian),
            };
            generate_floor(&request, catalog, config)
        })
        .collect();

    let kind = if module.is_challenge() {
        DungeonKind::Challenge
    } else {
        DungeonKind::Standard
    };

    tracing::info!(
        "Assembled {:?} dungeon '{}' ({} floors, difficulty {})",
        kind,
        module.id,
        floors.len(),
        difficulty
    );

    Dungeon {
        id: module.id.clone(),
        name: format!("The {} Labyrinth", module.title),
        kind,
        alignment: module.alignment,
        difficulty,
        theme: EnvironmentTheme::for_alignment(module.alignment),
        required_modules: module.required_modules.clone(),
        theme_modules: vec![module.id.clone()],
        seed,
        floor_width: config.floor_width,
        floor_height: config.floor_height,
        floors,
        guardian: Some(guardian),
    }
}

/// Build the infinite dungeon over the given modules; only floor 1 exists
pub fn assemble_infinite_dungeon(
    modules: &[ModuleSummary],
    seed: u64,
    catalog: &EntityCatalog,
    config: &GenerationConfig,
) -> Dungeon {
    let mut theme_modules: Vec<String> = modules.iter().map(|m| m.id.clone()).collect();
    theme_modules.sort();
    theme_modules.dedup();

    let mut dungeon = Dungeon {
        id: INFINITE_DUNGEON_ID.to_string(),
        name: "The Endless Stair".into(),
        kind: DungeonKind::Infinite,
        alignment: Alignment::Neutral,
        difficulty: 1,
        theme: EnvironmentTheme::for_alignment(Alignment::Neutral),
        required_modules: Vec::new(),
        theme_modules,
        seed,
        floor_width: config.floor_width,
        floor_height: config.floor_height,
        floors: Vec::new(),
        guardian: None,
    };
    dungeon.ensure_floor(1, catalog, config);
    dungeon
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::cell::CellType;

    fn logic_module() -> ModuleSummary {
        let registry = crate::catalog::InMemoryRegistry::sample();
        registry
            .modules
            .into_iter()
            .find(|m| m.id == "logic")
            .expect("sample has logic")
    }

    #[test]
    fn test_finite_dungeon_has_seven_floors_and_boss() {
        let catalog = EntityCatalog::builtin();
        let module = logic_module();
        let guardian = GuardianSpec::from_module(&module);
        let dungeon = assemble_dungeon(&module, &guardian, 42, &catalog, &GenerationConfig::default());

        assert_eq!(dungeon.floors.len(), 7);
        assert_eq!(dungeon.final_level(), Some(7));
        let last = dungeon.floor(7).expect("floor 7");
        assert_eq!(
            last.cell(last.exit_position).map(|c| c.cell_type),
            Some(CellType::FloorBoss)
        );
        for level in 1..7 {
            let floor = dungeon.floor(level).expect("floor");
            assert_eq!(
                floor.cell(floor.exit_position).map(|c| c.cell_type),
                Some(CellType::Exit)
            );
        }
    }

    #[test]
    fn test_guardian_abilities_resolved() {
        let catalog = EntityCatalog::builtin();
        let module = logic_module();
        let guardian = GuardianSpec::from_module(&module);
        let dungeon = assemble_dungeon(&module, &guardian, 1, &catalog, &GenerationConfig::default());
        let guardian = dungeon.guardian.expect("guardian");
        assert!(guardian
            .abilities
            .iter()
            .all(|a| matches!(a, AbilityRef::Resolved(_))));
    }

    #[test]
    fn test_infinite_dungeon_grows_on_demand() {
        let catalog = EntityCatalog::builtin();
        let module = logic_module();
        let config = GenerationConfig::default();
        let mut dungeon = assemble_infinite_dungeon(&[module], 5, &catalog, &config);

        assert_eq!(dungeon.floors.len(), 1);
        assert_eq!(dungeon.final_level(), None);
        assert!(dungeon.ensure_floor(2, &catalog, &config));
        assert!(dungeon.floor(2).is_some());
        assert!(!dungeon.is_final_floor(2));
    }

    #[test]
    fn test_finite_dungeon_does_not_grow() {
        let catalog = EntityCatalog::builtin();
        let module = logic_module();
        let guardian = GuardianSpec::from_module(&module);
        let config = GenerationConfig::default();
        let mut dungeon = assemble_dungeon(&module, &guardian, 3, &catalog, &config);
        assert!(!dungeon.ensure_floor(8, &catalog, &config));
    }
}
