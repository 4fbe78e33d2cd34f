//! Read-only content and character registries
//!
//! The engine only sees these at their interface boundary. Lookups are async
//! because real registries sit behind I/O; they are awaited during run and
//! dungeon setup, never inside a battle turn.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;

/// Thematic alignment of a learning module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Chaos,
    Law,
    #[default]
    Neutral,
}

/// Install state of a module for a given player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    Installed,
    Available,
    Locked,
}

/// One knowledge node inside a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: String,
    pub title: String,
    /// Short concept statement used for prompts
    #[serde(default)]
    pub concept: String,
}

/// Module metadata consumed by dungeon assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub alignment: Alignment,
    /// 1 (introductory) to 5 (advanced)
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    /// Non-empty marks a challenge dungeon
    #[serde(default)]
    pub required_modules: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<NodeSummary>,
}

fn default_difficulty() -> u32 {
    1
}

impl ModuleSummary {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            alignment: Alignment::Neutral,
            difficulty: 1,
            required_modules: Vec::new(),
            nodes: Vec::new(),
        }
    }

    pub fn is_challenge(&self) -> bool {
        !self.required_modules.is_empty()
    }
}

/// NPC identity and dialogue for discussion/debate encounters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default)]
    pub greeting: String,
    /// Dialogue lines, one per discussion node
    #[serde(default)]
    pub lines: Vec<String>,
    /// Debate thesis the character defends
    #[serde(default)]
    pub thesis: Option<String>,
    /// Companion this character joins as, if any
    #[serde(default)]
    pub companion_id: Option<String>,
}

impl CharacterSummary {
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: "Silent Scholar".into(),
            title: String::new(),
            alignment: Alignment::Neutral,
            greeting: "...".into(),
            lines: Vec::new(),
            thesis: None,
            companion_id: None,
        }
    }
}

/// Source of module metadata
#[allow(async_fn_in_trait)]
pub trait ContentRegistry {
    async fn module_by_id(&self, id: &str) -> Option<ModuleSummary>;

    async fn modules(&self) -> Vec<ModuleSummary>;
}

/// Source of NPC identities
#[allow(async_fn_in_trait)]
pub trait CharacterRegistry {
    async fn character_by_id(&self, id: &str) -> Option<CharacterSummary>;

    async fn characters(&self) -> Vec<CharacterSummary>;
}

/// TOML-backed registry implementing both interfaces
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryRegistry {
    #[serde(default)]
    pub modules: Vec<ModuleSummary>,
    #[serde(default)]
    pub characters: Vec<CharacterSummary>,
}

const SAMPLE_REGISTRY: &str = include_str!("../../data/modules.toml");

impl InMemoryRegistry {
    pub fn new(modules: Vec<ModuleSummary>, characters: Vec<CharacterSummary>) -> Self {
        Self { modules, characters }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load from a TOML file with `[[modules]]` and `[[characters]]` tables
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Bundled sample content (`data/modules.toml`)
    pub fn sample() -> Self {
        Self::from_toml(SAMPLE_REGISTRY).unwrap_or_else(|e| {
            tracing::error!("Bundled sample registry is invalid: {}", e);
            Self::default()
        })
    }
}

impl ContentRegistry for InMemoryRegistry {
    async fn module_by_id(&self, id: &str) -> Option<ModuleSummary> {
        self.modules.iter().find(|m| m.id == id).cloned()
    }

    async fn modules(&self) -> Vec<ModuleSummary> {
        self.modules.clone()
    }
}

impl CharacterRegistry for InMemoryRegistry {
    async fn character_by_id(&self, id: &str) -> Option<CharacterSummary> {
        self.characters.iter().find(|c| c.id == id).cloned()
    }

    async fn characters(&self) -> Vec<CharacterSummary> {
        self.characters.clone()
    }
}
