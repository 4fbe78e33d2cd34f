//! Run/session manager
//!
//! `Chronicle` holds the shared catalog and configuration. `start_run` awaits
//! the content registry before any assembly happens; every other operation is
//! a synchronous transition from one run state to the next.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::battle::{
    apply_action as apply_battle_action, start_battle, BattleAction, BattleSetup, BattleStatus,
    CombatantSpec, ResponseQuality,
};
use crate::catalog::{
    Ability, CharacterRegistry, ContentRegistry, EncounterType, EnemyTemplate, EntityCatalog,
    GuardianSpec, ItemKind, ModuleStatus, ModuleSummary, STARTER_SPELLBOOK,
};
use crate::core::config::ChronicleConfig;
use crate::core::error::RunError;
use crate::core::types::{Direction, EncounterId, RunId};
use crate::dungeon::{
    assemble_dungeon, assemble_infinite_dungeon, CellType, EncounterDefinition, EncounterPayload,
    EntityRef, INFINITE_DUNGEON_ID,
};
use crate::rewards::{distribute_rewards, recruit_companion, PlayerBase, RewardSummary, Rewards};
use crate::run::fog;
use crate::run::state::{
    ActionOutcome, ActiveEncounter, ChronicleRunState, EncounterOutcome, EncounterResponse,
    RecruitResult, RunEvent, RunStatus, RunStep,
};

/// Entry point for run operations
#[derive(Debug, Clone)]
pub struct Chronicle {
    catalog: Arc<EntityCatalog>,
    config: ChronicleConfig,
}

impl Chronicle {
    pub fn new(catalog: Arc<EntityCatalog>, config: ChronicleConfig) -> Self {
        Self { catalog, config }
    }

    /// Build the catalog from a registry and wrap it
    pub async fn from_registry<R>(registry: &R, config: ChronicleConfig) -> Self
    where
        R: ContentRegistry + CharacterRegistry,
    {
        let catalog = EntityCatalog::from_registry(registry).await;
        Self::new(Arc::new(catalog), config)
    }

    pub fn catalog(&self) -> &Arc<EntityCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &ChronicleConfig {
        &self.config
    }

    // ===== RUN LIFECYCLE =====

    /// Start a run using the configured seed, or a random one
    pub async fn start_run<R: ContentRegistry>(
        &self,
        dungeon_id: &str,
        installed: &BTreeMap<String, ModuleStatus>,
        player: &PlayerBase,
        registry: &R,
    ) -> Result<ChronicleRunState, RunError> {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        self.start_run_seeded(dungeon_id, installed, player, registry, seed)
            .await
    }

    pub async fn start_run_seeded<R: ContentRegistry>(
        &self,
        dungeon_id: &str,
        installed: &BTreeMap<String, ModuleStatus>,
        player: &PlayerBase,
        registry: &R,
        seed: u64,
    ) -> Result<ChronicleRunState, RunError> {
        let dungeon = if dungeon_id == INFINITE_DUNGEON_ID {
            let installed_ids: Vec<&String> = installed
                .iter()
                .filter(|(_, status)| **status == ModuleStatus::Installed)
                .map(|(id, _)| id)
                .collect();
            if installed_ids.is_empty() {
                return Err(RunError::NoInstalledModules);
            }

            let mut modules = Vec::with_capacity(installed_ids.len());
            for id in installed_ids {
                match self.lookup_module(registry, id).await {
                    Some(module) => modules.push(module),
                    None => tracing::warn!("Installed module '{}' is not in the registry, skipping", id),
                }
            }
            if modules.is_empty() {
                return Err(RunError::NoInstalledModules);
            }
            assemble_infinite_dungeon(&modules, seed, &self.catalog, &self.config.generation)
        } else {
            let module = self
                .lookup_module(registry, dungeon_id)
                .await
                .ok_or_else(|| RunError::DungeonNotFound(dungeon_id.to_string()))?;

            let missing: Vec<String> = module
                .required_modules
                .iter()
                .filter(|id| installed.get(*id) != Some(&ModuleStatus::Installed))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(RunError::MissingPrerequisite(missing));
            }

            let guardian = GuardianSpec::from_module(&module);
            assemble_dungeon(&module, &guardian, seed, &self.catalog, &self.config.generation)
        };

        // Each run starts rested
        let mut player = player.clone();
        player.stats.health = player.stats.max_health;
        player.stats.mana = player.stats.max_mana;

        let entry = dungeon.floor(1).map(|f| f.entry_position).unwrap_or_default();
        let mut run = ChronicleRunState {
            id: RunId::new(),
            dungeon,
            current_level: 1,
            position: entry,
            player,
            active_battle: None,
            active_encounter: None,
            status: RunStatus::Active,
            battles_won: 0,
            rng: ChaCha8Rng::seed_from_u64(seed.rotate_left(17) ^ 0x5eed),
        };
        self.reveal(&mut run);

        tracing::info!(
            "Run {} started in '{}' with seed {}",
            run.id,
            run.dungeon.id,
            seed
        );
        Ok(run)
    }

    async fn lookup_module<R: ContentRegistry>(&self, registry: &R, id: &str) -> Option<ModuleSummary> {
        match registry.module_by_id(id).await {
            Some(module) => Some(module),
            None => self.catalog.module(id).cloned(),
        }
    }

    /// Mark the run abandoned and drop any battle or encounter in progress
    ///
    /// Player stats stay as they were after the last settled battle.
    pub fn abandon(&self, run: &ChronicleRunState) -> ChronicleRunState {
        let mut next = run.clone();
        next.active_battle = None;
        next.active_encounter = None;
        if next.is_active() {
            next.status = RunStatus::Abandoned;
            tracing::info!("Run {} abandoned on floor {}", next.id, next.current_level);
        }
        next
    }

    // ===== EXPLORATION =====

    /// Step one cell; walls and edges leave the run unchanged
    pub fn move_player(&self, run: &ChronicleRunState, direction: Direction) -> Result<RunStep, RunError> {
        ensure_explorable(run)?;

        let mut next = run.clone();
        self.ensure_current_floor(&mut next)?;

        let target = next.position.step(direction);
        let walkable = next.current_floor().is_some_and(|f| f.is_walkable(target));
        if !walkable {
            return Ok(RunStep {
                run: run.clone(),
                event: RunEvent::Blocked,
            });
        }

        next.position = target;
        self.reveal(&mut next);
        let event = self.enter_cell(&mut next);
        Ok(RunStep { run: next, event })
    }

    /// Resolve whatever is on the player's cell
    pub fn interact(&self, run: &ChronicleRunState) -> Result<RunStep, RunError> {
        ensure_explorable(run)?;

        let mut next = run.clone();
        let position = next.position;
        let Some(cell) = next.current_floor().and_then(|f| f.cell(position)).cloned() else {
            return Ok(RunStep {
                run: next,
                event: RunEvent::NothingHere,
            });
        };

        let event = match cell.cell_type {
            CellType::ItemCache => {
                if let Some(slot) = next.current_floor_mut().and_then(|f| f.cell_mut(position)) {
                    slot.clear();
                }
                match cell.item_id {
                    Some(item_id) => {
                        next.player.add_item(&item_id, 1);
                        tracing::debug!("Run {} opened a cache: {}", next.id, item_id);
                        RunEvent::ItemFound { item_id, quantity: 1 }
                    }
                    None => RunEvent::NothingHere,
                }
            }
            CellType::ArtifactPuzzle | CellType::Encounter | CellType::FloorBoss => cell
                .encounter_id
                .and_then(|id| self.activate_encounter(&mut next, &id))
                .unwrap_or(RunEvent::NothingHere),
            _ => RunEvent::NothingHere,
        };

        Ok(RunStep { run: next, event })
    }

    fn enter_cell(&self, run: &mut ChronicleRunState) -> RunEvent {
        let position = run.position;
        let Some(cell) = run.current_floor().and_then(|f| f.cell(position)).cloned() else {
            return RunEvent::Moved;
        };

        match cell.cell_type {
            CellType::Exit => self.advance_floor(run),
            CellType::FloorBoss => match cell.encounter_id {
                Some(id) => self
                    .activate_encounter(run, &id)
                    .unwrap_or_else(|| self.advance_floor(run)),
                None => self.advance_floor(run),
            },
            CellType::Encounter => cell
                .encounter_id
                .and_then(|id| self.activate_encounter(run, &id))
                .unwrap_or(RunEvent::Moved),
            CellType::ItemCache => RunEvent::Discovered {
                description: "A cache glints here. Interact to open it.".into(),
            },
            CellType::ArtifactPuzzle => RunEvent::Discovered {
                description: "An artifact puzzle is etched into the floor. Interact to study it.".into(),
            },
            CellType::Floor => self.roll_ambient_battle(run),
            CellType::Entrance | CellType::Wall => RunEvent::Moved,
        }
    }

    /// Start the encounter with `id` on the current floor
    ///
    /// Returns `None` when it was already completed.
    fn activate_encounter(&self, run: &mut ChronicleRunState, id: &EncounterId) -> Option<RunEvent> {
        let level = run.current_level;
        let position = run.position;
        let found = run.current_floor().and_then(|f| f.encounter(id)).cloned();

        let encounter = match found {
            Some(encounter) => encounter,
            None => {
                tracing::warn!("Encounter '{}' missing from floor {}, using a placeholder", id, level);
                let placeholder = EncounterDefinition {
                    id: id.clone(),
                    encounter_type: EncounterType::Battle,
                    difficulty: 1,
                    position,
                    entity: EntityRef::None,
                    module_id: None,
                    completed: false,
                    payload: EncounterPayload::None,
                    rewards: Rewards::default(),
                };
                if let Some(floor) = run.current_floor_mut() {
                    floor.encounters.push(placeholder.clone());
                }
                placeholder
            }
        };

        if encounter.completed {
            if encounter.encounter_type != EncounterType::Boss {
                if let Some(cell) = run.current_floor_mut().and_then(|f| f.cell_mut(encounter.position)) {
                    cell.clear();
                }
            }
            return None;
        }

        if encounter.encounter_type.is_combat() {
            let difficulty = run.current_floor().map(|f| f.difficulty).unwrap_or(1);
            let (enemies, enemy_rewards) = self.enemy_specs(&encounter.entity, difficulty);
            let rewards = encounter.rewards.clone().merge(&enemy_rewards);
            self.begin_battle(run, enemies, rewards, Some(encounter.id.clone()));
            return Some(RunEvent::BattleStarted {
                encounter_id: Some(encounter.id),
                ambient: false,
            });
        }

        run.active_encounter = Some(ActiveEncounter {
            encounter_id: encounter.id.clone(),
            level,
            node: 0,
        });
        let prompt = run.current_prompt().unwrap_or_else(|| encounter.prompt());
        tracing::debug!("Run {} entered {:?} encounter {}", run.id, encounter.encounter_type, encounter.id);
        Some(RunEvent::EncounterStarted {
            encounter_id: encounter.id,
            prompt,
        })
    }

    fn roll_ambient_battle(&self, run: &mut ChronicleRunState) -> RunEvent {
        let chance = self.config.exploration.ambient_battle_chance;
        if run.rng.gen::<f64>() >= chance {
            return RunEvent::Moved;
        }

        let difficulty = run.current_floor().map(|f| f.difficulty).unwrap_or(1);
        let pool = self.catalog.enemies_up_to_tier(difficulty);
        let Some(template) = pool.choose(&mut run.rng).map(|t| (*t).clone()) else {
            return RunEvent::Moved;
        };

        let rewards = template.rewards.clone();
        self.begin_battle(run, vec![self.enemy_spec(&template)], rewards, None);
        RunEvent::BattleStarted {
            encounter_id: None,
            ambient: true,
        }
    }

    fn advance_floor(&self, run: &mut ChronicleRunState) -> RunEvent {
        let level = run.current_level;
        if run.dungeon.is_final_floor(level) {
            run.status = RunStatus::Completed;
            tracing::info!("Run {} completed '{}'", run.id, run.dungeon.id);
            return RunEvent::RunCompleted;
        }

        let next_level = level + 1;
        if !run
            .dungeon
            .ensure_floor(next_level, &self.catalog, &self.config.generation)
        {
            tracing::warn!("Dungeon '{}' has no floor {}, completing run", run.dungeon.id, next_level);
            run.status = RunStatus::Completed;
            return RunEvent::RunCompleted;
        }

        run.current_level = next_level;
        run.position = run.current_floor().map(|f| f.entry_position).unwrap_or_default();
        self.reveal(run);
        tracing::info!("Run {} reached floor {}", run.id, next_level);
        RunEvent::FloorAdvanced { level: next_level }
    }

    fn ensure_current_floor(&self, run: &mut ChronicleRunState) -> Result<(), RunError> {
        let level = run.current_level;
        if run
            .dungeon
            .ensure_floor(level, &self.catalog, &self.config.generation)
        {
            Ok(())
        } else {
            Err(RunError::DungeonNotFound(format!("{} floor {}", run.dungeon.id, level)))
        }
    }

    fn reveal(&self, run: &mut ChronicleRunState) {
        let radius = self.config.exploration.reveal_radius;
        let position = run.position;
        if let Some(floor) = run.current_floor_mut() {
            fog::reveal_around(floor, position, radius);
            fog::mark_visited(floor, position);
        }
    }

    // ===== BATTLE =====

    fn enemy_spec(&self, template: &EnemyTemplate) -> CombatantSpec {
        CombatantSpec {
            template_id: template.id.clone(),
            name: template.name.clone(),
            stats: template.stats.clone(),
            abilities: self.catalog.resolve_all(&template.abilities),
            taunt: template.taunt.clone(),
        }
    }

    fn guardian_spec(&self, guardian: &GuardianSpec) -> CombatantSpec {
        CombatantSpec {
            template_id: guardian.id.clone(),
            name: guardian.name.clone(),
            stats: guardian.stats.clone(),
            abilities: self.catalog.resolve_all(&guardian.abilities),
            taunt: guardian.taunt.clone(),
        }
    }

    /// Combatants and their combined rewards for an encounter entity
    fn enemy_specs(&self, entity: &EntityRef, difficulty: u32) -> (Vec<CombatantSpec>, Rewards) {
        match entity {
            EntityRef::Enemies(ids) if !ids.is_empty() => {
                let mut rewards = Rewards::default();
                let specs = ids
                    .iter()
                    .map(|id| {
                        let template = self.catalog.enemy_or_placeholder(id);
                        rewards = std::mem::take(&mut rewards).merge(&template.rewards);
                        self.enemy_spec(&template)
                    })
                    .collect();
                (specs, rewards)
            }
            EntityRef::Guardian(guardian) => (vec![self.guardian_spec(guardian)], guardian.rewards.clone()),
            other => {
                tracing::warn!("Combat encounter without enemies ({:?}), fielding a placeholder", other);
                let template = self
                    .catalog
                    .enemies_up_to_tier(difficulty)
                    .first()
                    .map(|t| (*t).clone())
                    .unwrap_or_else(|| EnemyTemplate::placeholder("unknown"));
                (vec![self.enemy_spec(&template)], template.rewards.clone())
            }
        }
    }

    fn spellbook_or_starter(&self, spellbook_id: &str) -> Vec<Ability> {
        self.catalog
            .spellbook_abilities(spellbook_id)
            .or_else(|| {
                tracing::warn!("Unknown spellbook '{}', falling back to the starter", spellbook_id);
                self.catalog.spellbook_abilities(STARTER_SPELLBOOK)
            })
            .unwrap_or_default()
    }

    fn begin_battle(
        &self,
        run: &mut ChronicleRunState,
        enemies: Vec<CombatantSpec>,
        rewards: Rewards,
        encounter_id: Option<EncounterId>,
    ) {
        let player = &run.player;
        let spellbooks: BTreeMap<String, Vec<Ability>> = player
            .spellbooks
            .iter()
            .filter_map(|id| self.catalog.spellbook_abilities(id).map(|a| (id.clone(), a)))
            .collect();

        let allies = player
            .companions
            .iter()
            .map(|companion| CombatantSpec {
                template_id: companion.id.clone(),
                name: companion.name.clone(),
                stats: companion.stats.clone(),
                abilities: companion
                    .ability_ids
                    .iter()
                    .map(|id| self.catalog.ability_or_placeholder(id))
                    .collect(),
                taunt: None,
            })
            .collect();

        let setup = BattleSetup {
            player: CombatantSpec {
                template_id: "player".into(),
                name: player.name.clone(),
                stats: player.stats.clone(),
                abilities: self.spellbook_or_starter(&player.active_spellbook),
                taunt: None,
            },
            allies,
            enemies,
            spellbooks,
            active_spellbook: player.active_spellbook.clone(),
            rewards,
            encounter_id,
            config: self.config.battle.clone(),
            seed: run.rng.gen(),
        };

        run.active_battle = Some(start_battle(setup));
        tracing::info!("Run {} entered battle on floor {}", run.id, run.current_level);

        // Enemies moving first can end it before the player acts
        self.settle_battle(run);
    }

    /// Apply a player-side battle action
    pub fn apply_action(
        &self,
        run: &ChronicleRunState,
        action: &BattleAction,
        cognitive_score: u8,
    ) -> Result<ActionOutcome, RunError> {
        if !run.is_active() {
            return Err(RunError::RunNotActive);
        }
        let battle = run.active_battle.as_ref().ok_or(RunError::NoActiveBattle)?;
        let next_battle = apply_battle_action(battle, action, cognitive_score)?;

        let mut next = run.clone();
        next.active_battle = Some(next_battle);
        let settled = self.settle_battle(&mut next);

        Ok(ActionOutcome {
            run: next,
            battle_ended: settled.is_some(),
            player_won: settled.as_ref().is_some_and(|(won, _)| *won),
            rewards: settled.and_then(|(_, rewards)| rewards),
        })
    }

    /// Close out a finished battle; `None` while it is still ongoing
    fn settle_battle(&self, run: &mut ChronicleRunState) -> Option<(bool, Option<RewardSummary>)> {
        if !run.active_battle.as_ref()?.status.is_over() {
            return None;
        }
        let battle = run.active_battle.take()?;
        let won = battle.status == BattleStatus::PlayerVictory;

        if let Some(fighter) = battle.player() {
            let floor_health = if won { 1 } else { 0 };
            run.player.stats.health = fighter.stats.health.max(floor_health);
            run.player.stats.mana = fighter.stats.mana;
        }

        if !won {
            run.status = RunStatus::Failed;
            tracing::info!("Run {} failed on floor {}", run.id, run.current_level);
            return Some((false, None));
        }
        run.battles_won += 1;

        let mut boss_defeated = false;
        if let Some(id) = &battle.encounter_id {
            let level = run.current_level;
            if let Some(floor) = run.dungeon.floor_mut(level) {
                let mut cleared = None;
                if let Some(encounter) = floor.encounter_mut(id) {
                    encounter.completed = true;
                    boss_defeated = encounter.encounter_type == EncounterType::Boss;
                    cleared = (!boss_defeated).then_some(encounter.position);
                }
                if let Some(cell) = cleared.and_then(|pos| floor.cell_mut(pos)) {
                    cell.clear();
                }
            }
        }

        let (player, summary) = distribute_rewards(
            &run.player,
            &battle.rewards,
            &self.catalog,
            self.config.party.party_cap,
            &mut run.rng,
        );
        run.player = player;

        if boss_defeated && run.dungeon.is_final_floor(run.current_level) {
            run.status = RunStatus::Completed;
            tracing::info!("Run {} defeated the guardian of '{}'", run.id, run.dungeon.id);
        }
        Some((true, Some(summary)))
    }

    // ===== ENCOUNTERS =====

    /// Answer the active non-battle encounter
    pub fn respond(
        &self,
        run: &ChronicleRunState,
        response: &EncounterResponse,
    ) -> Result<EncounterOutcome, RunError> {
        if !run.is_active() {
            return Err(RunError::RunNotActive);
        }
        let active = run.active_encounter.as_ref().ok_or(RunError::NoActiveEncounter)?;
        let encounter = run
            .dungeon
            .floor(active.level)
            .and_then(|f| f.encounter(&active.encounter_id))
            .ok_or(RunError::NoActiveEncounter)?;

        let success = match (&encounter.payload, response) {
            (EncounterPayload::Discussion(tree), EncounterResponse::Choice(index)) => {
                let node = tree
                    .node(active.node)
                    .ok_or_else(|| RunError::InvalidResponse(format!("no discussion node {}", active.node)))?;
                let choice = node
                    .choices
                    .get(*index)
                    .ok_or_else(|| RunError::InvalidResponse(format!("no choice {}", index)))?;

                if let Some(next_node) = choice.next {
                    let mut next = run.clone();
                    if let Some(active) = next.active_encounter.as_mut() {
                        active.node = next_node;
                    }
                    return Ok(EncounterOutcome {
                        run: next,
                        resolved: false,
                        success: false,
                        rewards: None,
                    });
                }
                choice.success
            }
            (
                EncounterPayload::Debate(_) | EncounterPayload::Scroll(_),
                EncounterResponse::Scored(score),
            ) => ResponseQuality::from_score(*score).is_success(),
            (EncounterPayload::Puzzle(puzzle), EncounterResponse::Answer(answer)) => {
                puzzle.is_solution(answer)
            }
            (_, other) => {
                return Err(RunError::InvalidResponse(format!(
                    "{:?} does not answer a {:?} encounter",
                    other, encounter.encounter_type
                )))
            }
        };

        let rewards = encounter.rewards.clone();
        let id = encounter.id.clone();
        let position = encounter.position;
        let level = active.level;

        let mut next = run.clone();
        next.active_encounter = None;
        if let Some(floor) = next.dungeon.floor_mut(level) {
            if let Some(encounter) = floor.encounter_mut(&id) {
                encounter.completed = true;
            }
            if let Some(cell) = floor.cell_mut(position) {
                cell.clear();
            }
        }

        let summary = if success {
            let (player, summary) = distribute_rewards(
                &next.player,
                &rewards,
                &self.catalog,
                self.config.party.party_cap,
                &mut next.rng,
            );
            next.player = player;
            Some(summary)
        } else {
            None
        };
        tracing::info!(
            "Run {} resolved encounter {} ({})",
            next.id,
            id,
            if success { "success" } else { "failure" }
        );

        Ok(EncounterOutcome {
            run: next,
            resolved: true,
            success,
            rewards: summary,
        })
    }

    // ===== PARTY & INVENTORY =====

    pub fn recruit(&self, run: &ChronicleRunState, companion_id: &str) -> Result<RecruitResult, RunError> {
        if !run.is_active() {
            return Err(RunError::RunNotActive);
        }
        if run.in_battle() {
            return Err(RunError::BattleInProgress);
        }

        let template = self.catalog.companion_or_placeholder(companion_id);
        let outcome = recruit_companion(&run.player, &template, self.config.party.party_cap);
        let mut next = run.clone();
        next.player = outcome.player;
        Ok(RecruitResult {
            run: next,
            success: outcome.success,
            companion: outcome.companion,
        })
    }

    /// Consume a healing or mana item outside battle
    pub fn use_item(&self, run: &ChronicleRunState, item_id: &str) -> Result<ChronicleRunState, RunError> {
        if !run.is_active() {
            return Err(RunError::RunNotActive);
        }
        if run.in_battle() {
            return Err(RunError::BattleInProgress);
        }

        let item = self
            .catalog
            .item(item_id)
            .ok_or_else(|| RunError::ItemNotUsable(item_id.to_string()))?;
        let (heal, mana) = match &item.kind {
            ItemKind::Consumable { heal, mana } => (*heal, *mana),
            _ => return Err(RunError::ItemNotUsable(item_id.to_string())),
        };
        if run.player.item_count(item_id) == 0 {
            return Err(RunError::ItemNotUsable(format!("{} (none carried)", item_id)));
        }

        let mut next = run.clone();
        next.player.take_item(item_id);
        let stats = &mut next.player.stats;
        stats.health = (stats.health + heal.max(0)).min(stats.max_health);
        stats.mana = (stats.mana + mana.max(0)).min(stats.max_mana);
        tracing::debug!("Run {} used {}", next.id, item_id);
        Ok(next)
    }
}

fn ensure_explorable(run: &ChronicleRunState) -> Result<(), RunError> {
    if !run.is_active() {
        return Err(RunError::RunNotActive);
    }
    if run.in_battle() {
        return Err(RunError::BattleInProgress);
    }
    if run.active_encounter.is_some() {
        return Err(RunError::EncounterInProgress);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryRegistry;
    use crate::core::types::Position;
    use crate::dungeon::MapCell;

    fn chronicle(registry: &InMemoryRegistry) -> Chronicle {
        let mut config = ChronicleConfig::default();
        config.exploration.ambient_battle_chance = 0.0;
        let catalog = EntityCatalog::from_content(registry.modules.clone(), registry.characters.clone());
        Chronicle::new(Arc::new(catalog), config)
    }

    fn installed(ids: &[&str]) -> BTreeMap<String, ModuleStatus> {
        ids.iter()
            .map(|id| (id.to_string(), ModuleStatus::Installed))
            .collect()
    }

    async fn logic_run(chronicle: &Chronicle, registry: &InMemoryRegistry) -> ChronicleRunState {
        chronicle
            .start_run_seeded("logic", &installed(&["logic"]), &PlayerBase::default(), registry, 11)
            .await
            .unwrap()
    }

    /// Put a cell of `cell_type` under the player
    fn place_underfoot(run: &mut ChronicleRunState, cell: MapCell) {
        let pos = run.position;
        if let Some(slot) = run.current_floor_mut().and_then(|f| f.cell_mut(pos)) {
            *slot = cell;
        }
    }

    #[tokio::test]
    async fn test_start_run_places_player_at_entry() {
        let registry = InMemoryRegistry::sample();
        let chronicle = chronicle(&registry);
        let run = logic_run(&chronicle, &registry).await;

        let floor = run.current_floor().unwrap();
        assert_eq!(run.position, floor.entry_position);
        assert_eq!(run.status, RunStatus::Active);
        assert!(floor.cell(run.position).unwrap().explored);
    }

    #[tokio::test]
    async fn test_missing_prerequisites_reported() {
        let registry = InMemoryRegistry::sample();
        let chronicle = chronicle(&registry);
        let err = chronicle
            .start_run_seeded(
                "epistemology",
                &installed(&["logic"]),
                &PlayerBase::default(),
                &registry,
                1,
            )
            .await
            .unwrap_err();
        assert_eq!(err, RunError::MissingPrerequisite(vec!["fallacies".to_string()]));
    }

    #[tokio::test]
    async fn test_infinite_requires_installed_modules() {
        let registry = InMemoryRegistry::sample();
        let chronicle = chronicle(&registry);
        let mut modules = BTreeMap::new();
        modules.insert("logic".to_string(), ModuleStatus::Available);
        let err = chronicle
            .start_run_seeded(INFINITE_DUNGEON_ID, &modules, &PlayerBase::default(), &registry, 1)
            .await
            .unwrap_err();
        assert_eq!(err, RunError::NoInstalledModules);
    }

    #[tokio::test]
    async fn test_unknown_dungeon() {
        let registry = InMemoryRegistry::sample();
        let chronicle = chronicle(&registry);
        let err = chronicle
            .start_run_seeded("alchemy", &BTreeMap::new(), &PlayerBase::default(), &registry, 1)
            .await
            .unwrap_err();
        assert_eq!(err, RunError::DungeonNotFound("alchemy".into()));
    }

    #[tokio::test]
    async fn test_blocked_move_changes_nothing() {
        let registry = InMemoryRegistry::sample();
        let chronicle = chronicle(&registry);
        let run = logic_run(&chronicle, &registry).await;

        let floor = run.current_floor().unwrap();
        let blocked = Direction::ALL
            .iter()
            .copied()
            .find(|d| !floor.is_walkable(run.position.step(*d)));
        if let Some(direction) = blocked {
            let step = chronicle.move_player(&run, direction).unwrap();
            assert_eq!(step.event, RunEvent::Blocked);
            assert_eq!(step.run.position, run.position);
        }
    }

    #[tokio::test]
    async fn test_item_cache_grants_once() {
        let registry = InMemoryRegistry::sample();
        let chronicle = chronicle(&registry);
        let mut run = logic_run(&chronicle, &registry).await;
        let mut cache = MapCell::of_type(CellType::ItemCache);
        cache.item_id = Some("mana_tonic".into());
        place_underfoot(&mut run, cache);

        let first = chronicle.interact(&run).unwrap();
        assert_eq!(
            first.event,
            RunEvent::ItemFound {
                item_id: "mana_tonic".into(),
                quantity: 1
            }
        );
        let second = chronicle.interact(&first.run).unwrap();
        assert_eq!(second.event, RunEvent::NothingHere);
        assert_eq!(second.run.player.item_count("mana_tonic"), 1);
    }

    #[tokio::test]
    async fn test_use_item_heals_and_consumes() {
        let registry = InMemoryRegistry::sample();
        let chronicle = chronicle(&registry);
        let mut run = logic_run(&chronicle, &registry).await;
        run.player.stats.health = 10;
        run.player.add_item("healing_draught", 1);

        let next = chronicle.use_item(&run, "healing_draught").unwrap();
        assert_eq!(next.player.stats.health, 40);
        assert_eq!(next.player.item_count("healing_draught"), 0);
        assert!(matches!(
            chronicle.use_item(&next, "healing_draught"),
            Err(RunError::ItemNotUsable(_))
        ));
    }

    #[tokio::test]
    async fn test_abandon_discards_battle() {
        let registry = InMemoryRegistry::sample();
        let chronicle = chronicle(&registry);
        let run = logic_run(&chronicle, &registry).await;
        let abandoned = chronicle.abandon(&run);
        assert_eq!(abandoned.status, RunStatus::Abandoned);
        assert!(abandoned.active_battle.is_none());
        assert_eq!(
            chronicle.move_player(&abandoned, Direction::Up).unwrap_err(),
            RunError::RunNotActive
        );
    }

    #[tokio::test]
    async fn test_apply_action_without_battle() {
        let registry = InMemoryRegistry::sample();
        let chronicle = chronicle(&registry);
        let run = logic_run(&chronicle, &registry).await;
        let err = chronicle
            .apply_action(&run, &BattleAction::Defend, 80)
            .unwrap_err();
        assert_eq!(err, RunError::NoActiveBattle);
    }

    #[tokio::test]
    async fn test_recruit_duplicate_fails() {
        let registry = InMemoryRegistry::sample();
        let chronicle = chronicle(&registry);
        let run = logic_run(&chronicle, &registry).await;

        let first = chronicle.recruit(&run, "scribe_owl").unwrap();
        assert!(first.success);
        let second = chronicle.recruit(&first.run, "scribe_owl").unwrap();
        assert!(!second.success);
        assert_eq!(second.run.player.companions.len(), 1);
    }

    #[tokio::test]
    async fn test_puzzle_encounter_resolves() {
        let registry = InMemoryRegistry::sample();
        let chronicle = chronicle(&registry);
        let mut run = logic_run(&chronicle, &registry).await;
        let pos: Position = run.position;

        let encounter = EncounterDefinition {
            id: EncounterId("L1-TEST".into()),
            encounter_type: EncounterType::Puzzle,
            difficulty: 1,
            position: pos,
            entity: EntityRef::None,
            module_id: None,
            completed: false,
            payload: EncounterPayload::Puzzle(crate::dungeon::PuzzleData {
                riddle: "What has keys but opens no locks?".into(),
                solution: "piano".into(),
                hint: None,
            }),
            rewards: Rewards::experience(20),
        };
        let mut cell = MapCell::of_type(CellType::ArtifactPuzzle);
        cell.encounter_id = Some(encounter.id.clone());
        place_underfoot(&mut run, cell);
        run.current_floor_mut().unwrap().encounters.push(encounter);

        let started = chronicle.interact(&run).unwrap();
        assert!(matches!(started.event, RunEvent::EncounterStarted { .. }));

        let wrong_kind = chronicle
            .respond(&started.run, &EncounterResponse::Choice(0))
            .unwrap_err();
        assert!(matches!(wrong_kind, RunError::InvalidResponse(_)));

        let outcome = chronicle
            .respond(&started.run, &EncounterResponse::Answer(" Piano ".into()))
            .unwrap();
        assert!(outcome.resolved && outcome.success);
        assert_eq!(outcome.rewards.unwrap().experience, 20);
        assert!(outcome.run.active_encounter.is_none());
        assert!(outcome
            .run
            .current_floor()
            .unwrap()
            .cell(pos)
            .unwrap()
            .is_plain_floor());
    }
}
