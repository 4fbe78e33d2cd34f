//! Entity catalogs - immutable tables built once at startup
//!
//! Abilities, items, enemy/companion templates, spellbooks and the Sacred
//! Circuit phases. Module and character data from the registries is folded
//! in at construction time; afterwards the catalog is read-only and shared
//! across runs behind an `Arc`.

pub mod abilities;
pub mod entities;
pub mod items;
pub mod phases;
pub mod registry;

pub use abilities::{
    Ability, AbilityRef, Effect, EffectType, Element, Spellbook, StatKind, StatusKind, TargetMode,
    STARTER_SPELLBOOK,
};
pub use entities::{CompanionTemplate, EnemyTemplate, EntityKind, GuardianSpec, Stats};
pub use items::{Item, ItemKind, CACHE_LOOT_TABLE};
pub use phases::{EncounterType, Phase, PhaseType, SACRED_CIRCUIT};
pub use registry::{
    Alignment, CharacterRegistry, CharacterSummary, ContentRegistry, InMemoryRegistry,
    ModuleStatus, ModuleSummary, NodeSummary,
};

use ahash::AHashMap;

/// Read-only lookup tables for every catalog entity
#[derive(Debug, Clone)]
pub struct EntityCatalog {
    abilities: AHashMap<String, Ability>,
    items: AHashMap<String, Item>,
    enemies: AHashMap<String, EnemyTemplate>,
    companions: AHashMap<String, CompanionTemplate>,
    spellbooks: AHashMap<String, Spellbook>,
    characters: AHashMap<String, CharacterSummary>,
    modules: AHashMap<String, ModuleSummary>,
    /// Sorted ids so seeded selection does not depend on hash order
    enemy_order: Vec<String>,
    character_order: Vec<String>,
    module_order: Vec<String>,
}

impl EntityCatalog {
    /// Catalog with built-in tables only
    pub fn builtin() -> Self {
        Self::from_content(Vec::new(), Vec::new())
    }

    /// Build from already-fetched registry content
    pub fn from_content(modules: Vec<ModuleSummary>, characters: Vec<CharacterSummary>) -> Self {
        let mut abilities: AHashMap<String, Ability> = abilities::builtin_abilities()
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();
        let mut spellbooks: AHashMap<String, Spellbook> = abilities::builtin_spellbooks()
            .into_iter()
            .map(|b| (b.id.clone(), b))
            .collect();

        // Each module contributes one ability per node and a spellbook of them
        for module in &modules {
            let mut ability_ids = Vec::new();
            for node in &module.nodes {
                let ability = Ability::from_module_node(module, &node.id, &node.title);
                ability_ids.push(ability.id.clone());
                abilities.insert(ability.id.clone(), ability);
            }
            if !ability_ids.is_empty() {
                spellbooks.insert(
                    module.id.clone(),
                    Spellbook {
                        id: module.id.clone(),
                        name: format!("{} Codex", module.title),
                        ability_ids,
                    },
                );
            }
        }

        let enemies: AHashMap<String, EnemyTemplate> = entities::builtin_enemies()
            .into_iter()
            .map(|e| (e.id.clone(), e))
            .collect();
        let mut enemy_order: Vec<String> = enemies.keys().cloned().collect();
        enemy_order.sort();

        let mut character_order: Vec<String> = characters.iter().map(|c| c.id.clone()).collect();
        character_order.sort();
        character_order.dedup();

        let mut module_order: Vec<String> = modules.iter().map(|m| m.id.clone()).collect();
        module_order.sort();
        module_order.dedup();

        Self {
            abilities,
            items: items::builtin_items()
                .into_iter()
                .map(|i| (i.id.clone(), i))
                .collect(),
            enemies,
            companions: entities::builtin_companions()
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
            spellbooks,
            characters: characters.into_iter().map(|c| (c.id.clone(), c)).collect(),
            modules: modules.into_iter().map(|m| (m.id.clone(), m)).collect(),
            enemy_order,
            character_order,
            module_order,
        }
    }

    /// Fetch all registry content once and build the catalog
    pub async fn from_registry<R>(registry: &R) -> Self
    where
        R: ContentRegistry + CharacterRegistry,
    {
        let modules = registry.modules().await;
        let characters = registry.characters().await;
        tracing::info!(
            "Building entity catalog from {} modules and {} characters",
            modules.len(),
            characters.len()
        );
        Self::from_content(modules, characters)
    }

    // === LOOKUPS ===

    pub fn ability(&self, id: &str) -> Option<&Ability> {
        self.abilities.get(id)
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn enemy(&self, id: &str) -> Option<&EnemyTemplate> {
        self.enemies.get(id)
    }

    pub fn companion(&self, id: &str) -> Option<&CompanionTemplate> {
        self.companions.get(id)
    }

    pub fn spellbook(&self, id: &str) -> Option<&Spellbook> {
        self.spellbooks.get(id)
    }

    pub fn character(&self, id: &str) -> Option<&CharacterSummary> {
        self.characters.get(id)
    }

    pub fn module(&self, id: &str) -> Option<&ModuleSummary> {
        self.modules.get(id)
    }

    // === DEGRADING LOOKUPS ===
    // Missing ids yield a placeholder so a run stays playable.

    pub fn ability_or_placeholder(&self, id: &str) -> Ability {
        self.ability(id).cloned().unwrap_or_else(|| {
            tracing::warn!("Ability '{}' not in catalog, using placeholder", id);
            Ability::placeholder(id)
        })
    }

    pub fn enemy_or_placeholder(&self, id: &str) -> EnemyTemplate {
        self.enemy(id).cloned().unwrap_or_else(|| {
            tracing::warn!("Enemy '{}' not in catalog, using placeholder", id);
            EnemyTemplate::placeholder(id)
        })
    }

    pub fn companion_or_placeholder(&self, id: &str) -> CompanionTemplate {
        self.companion(id).cloned().unwrap_or_else(|| {
            tracing::warn!("Companion '{}' not in catalog, using placeholder", id);
            CompanionTemplate::placeholder(id)
        })
    }

    /// Resolve an ability reference to a concrete ability
    pub fn resolve(&self, ability: &AbilityRef) -> Ability {
        match ability {
            AbilityRef::Resolved(ability) => ability.clone(),
            AbilityRef::Id(id) => self.ability_or_placeholder(id),
        }
    }

    pub fn resolve_all(&self, abilities: &[AbilityRef]) -> Vec<Ability> {
        abilities.iter().map(|a| self.resolve(a)).collect()
    }

    // === SELECTION TABLES ===

    /// Enemies at or below `max_tier`, in stable id order
    pub fn enemies_up_to_tier(&self, max_tier: u32) -> Vec<&EnemyTemplate> {
        let eligible: Vec<&EnemyTemplate> = self
            .enemy_order
            .iter()
            .filter_map(|id| self.enemies.get(id))
            .filter(|e| e.tier <= max_tier)
            .collect();

        if eligible.is_empty() {
            // Fall back to the weakest tier rather than an empty table
            let min_tier = self.enemies.values().map(|e| e.tier).min().unwrap_or(1);
            return self
                .enemy_order
                .iter()
                .filter_map(|id| self.enemies.get(id))
                .filter(|e| e.tier == min_tier)
                .collect();
        }
        eligible
    }

    /// Characters in stable id order
    pub fn characters(&self) -> Vec<&CharacterSummary> {
        self.character_order
            .iter()
            .filter_map(|id| self.characters.get(id))
            .collect()
    }

    /// Modules in stable id order
    pub fn modules(&self) -> Vec<&ModuleSummary> {
        self.module_order
            .iter()
            .filter_map(|id| self.modules.get(id))
            .collect()
    }

    /// Abilities of a spellbook, resolved
    pub fn spellbook_abilities(&self, spellbook_id: &str) -> Option<Vec<Ability>> {
        self.spellbook(spellbook_id).map(|book| {
            book.ability_ids
                .iter()
                .map(|id| self.ability_or_placeholder(id))
                .collect()
        })
    }
}

impl Default for EntityCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
