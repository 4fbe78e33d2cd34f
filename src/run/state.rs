//! Run aggregate and the values run operations hand back

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::battle::BattleState;
use crate::catalog::{EntityCatalog, GuardianSpec};
use crate::core::config::ChronicleConfig;
use crate::core::types::{EncounterId, Position, RunId};
use crate::dungeon::{generate_floor, Dungeon, EncounterPayload, Floor, FloorRequest};
use crate::rewards::{Companion, PlayerBase, RewardSummary};
use crate::run::fog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Active,
    Completed,
    Failed,
    Abandoned,
}

/// Non-battle encounter the player is currently answering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEncounter {
    pub encounter_id: EncounterId,
    pub level: u32,
    /// Discussion tree cursor
    #[serde(default)]
    pub node: usize,
}

/// Aggregate root for one dungeon run
///
/// Every run operation takes `&ChronicleRunState` and returns a new value;
/// the previous state stays valid until the caller replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChronicleRunState {
    pub id: RunId,
    /// The run's own copy; fog flags on its cells belong to this run
    pub dungeon: Dungeon,
    pub current_level: u32,
    pub position: Position,
    pub player: PlayerBase,
    #[serde(default)]
    pub active_battle: Option<BattleState>,
    #[serde(default)]
    pub active_encounter: Option<ActiveEncounter>,
    pub status: RunStatus,
    #[serde(default)]
    pub battles_won: u32,
    pub rng: ChaCha8Rng,
}

impl ChronicleRunState {
    pub fn is_active(&self) -> bool {
        self.status == RunStatus::Active
    }

    pub fn current_floor(&self) -> Option<&Floor> {
        self.dungeon.floor(self.current_level)
    }

    pub fn current_floor_mut(&mut self) -> Option<&mut Floor> {
        self.dungeon.floor_mut(self.current_level)
    }

    pub fn in_battle(&self) -> bool {
        self.active_battle.is_some()
    }

    /// Text the player should answer next, if any
    pub fn current_prompt(&self) -> Option<String> {
        if let Some(battle) = &self.active_battle {
            return battle.pending_prompt.clone();
        }
        let active = self.active_encounter.as_ref()?;
        let encounter = self
            .dungeon
            .floor(active.level)?
            .encounter(&active.encounter_id)?;

        match &encounter.payload {
            EncounterPayload::Discussion(tree) => {
                let node = tree.node(active.node)?;
                let mut text = format!("{}: {}", tree.speaker, node.prompt);
                for (i, choice) in node.choices.iter().enumerate() {
                    text.push_str(&format!("\n  [{}] {}", i, choice.text));
                }
                Some(text)
            }
            _ => Some(encounter.prompt()),
        }
    }

    /// Map of the current floor with fog applied
    pub fn render_floor(&self) -> String {
        self.current_floor()
            .map(|floor| floor.render(Some(self.position), true))
            .unwrap_or_default()
    }

    /// Recover from structural damage in a restored run
    ///
    /// Floors whose grid does not match their dimensions are regenerated
    /// (fog starts over for them), a missing infinite floor is generated on
    /// demand, and a player standing off the walkable grid is moved to the
    /// floor entry. Returns a description of each repair.
    pub fn repair(&mut self, catalog: &EntityCatalog, config: &ChronicleConfig) -> Vec<String> {
        let mut repairs = Vec::new();

        let broken: Vec<u32> = self
            .dungeon
            .floors
            .iter()
            .filter(|f| f.cells.len() != (f.width * f.height) as usize)
            .map(|f| f.level)
            .collect();
        for level in broken {
            let floor = self.regenerate_floor(level, catalog, config);
            if let Some(slot) = self.dungeon.floor_mut(level) {
                *slot = floor;
            }
            repairs.push(format!("floor {} map was corrupt and has been regenerated", level));
        }

        if self.current_floor().is_none() {
            if self
                .dungeon
                .ensure_floor(self.current_level, catalog, &config.generation)
            {
                repairs.push(format!("floor {} regenerated on demand", self.current_level));
            } else {
                let fallback = self.dungeon.floors.iter().map(|f| f.level).min().unwrap_or(1);
                repairs.push(format!(
                    "floor {} missing, returning to floor {}",
                    self.current_level, fallback
                ));
                self.current_level = fallback;
            }
        }

        let misplaced = self
            .current_floor()
            .filter(|floor| !floor.is_walkable(self.position))
            .map(|floor| floor.entry_position);
        if let Some(entry) = misplaced {
            repairs.push(format!(
                "position {:?} invalid, moved to entry {:?}",
                self.position, entry
            ));
            self.position = entry;
        }

        let radius = config.exploration.reveal_radius;
        let position = self.position;
        if let Some(floor) = self.current_floor_mut() {
            fog::reveal_around(floor, position, radius);
            fog::mark_visited(floor, position);
        }

        for repair in &repairs {
            tracing::warn!("Run {}: {}", self.id, repair);
        }
        repairs
    }

    fn regenerate_floor(&self, level: u32, catalog: &EntityCatalog, config: &ChronicleConfig) -> Floor {
        let module = self
            .dungeon
            .theme_modules
            .first()
            .and_then(|id| catalog.module(id));
        let guardian: Option<&GuardianSpec> = if self.dungeon.is_final_floor(level) {
            self.dungeon.guardian.as_ref()
        } else {
            None
        };
        let request = FloorRequest {
            level,
            width: self.dungeon.floor_width,
            height: self.dungeon.floor_height,
            dungeon_seed: self.dungeon.seed,
            difficulty_bonus: self.dungeon.difficulty.saturating_sub(1),
            module,
            guardian,
        };
        generate_floor(&request, catalog, &config.generation)
    }
}

/// What a movement or interaction did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEvent {
    /// Wall or edge; the run is unchanged
    Blocked,
    Moved,
    /// Something to interact with underfoot
    Discovered { description: String },
    BattleStarted {
        encounter_id: Option<EncounterId>,
        ambient: bool,
    },
    EncounterStarted { encounter_id: EncounterId, prompt: String },
    ItemFound { item_id: String, quantity: u32 },
    NothingHere,
    FloorAdvanced { level: u32 },
    RunCompleted,
}

impl RunEvent {
    /// One-line message for the player
    pub fn describe(&self) -> String {
        match self {
            RunEvent::Blocked => "You can't go that way.".into(),
            RunEvent::Moved => String::new(),
            RunEvent::Discovered { description } => description.clone(),
            RunEvent::BattleStarted { ambient: true, .. } => "Something lunges from the shadows!".into(),
            RunEvent::BattleStarted { .. } => "A battle begins!".into(),
            RunEvent::EncounterStarted { prompt, .. } => prompt.clone(),
            RunEvent::ItemFound { item_id, quantity } => format!("Found {} x{}", item_id, quantity),
            RunEvent::NothingHere => "Nothing here.".into(),
            RunEvent::FloorAdvanced { level } => format!("You descend to floor {}.", level),
            RunEvent::RunCompleted => "The dungeon is conquered!".into(),
        }
    }
}

/// Result of `move_player` / `interact`
#[derive(Debug, Clone)]
pub struct RunStep {
    pub run: ChronicleRunState,
    pub event: RunEvent,
}

/// Result of a battle action at run level
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub run: ChronicleRunState,
    pub battle_ended: bool,
    pub player_won: bool,
    pub rewards: Option<RewardSummary>,
}

/// Player input for a non-battle encounter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterResponse {
    /// Discussion choice index at the current node
    Choice(usize),
    /// Externally scored free-text answer (debate, scroll)
    Scored(u8),
    /// Puzzle solution
    Answer(String),
}

/// Result of `respond`
#[derive(Debug, Clone)]
pub struct EncounterOutcome {
    pub run: ChronicleRunState,
    /// False while a discussion continues to another node
    pub resolved: bool,
    pub success: bool,
    pub rewards: Option<RewardSummary>,
}

/// Result of `recruit`
#[derive(Debug, Clone)]
pub struct RecruitResult {
    pub run: ChronicleRunState,
    pub success: bool,
    pub companion: Option<Companion>,
}
