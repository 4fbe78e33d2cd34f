//! Item definitions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Single-use restorative
    Consumable { heal: i32, mana: i32 },
    /// Crafting/progression material
    Material,
    /// Quest artifact recovered from puzzles
    Artifact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: ItemKind,
}

impl Item {
    fn new(id: &str, name: &str, description: &str, kind: ItemKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            kind,
        }
    }

    pub fn is_consumable(&self) -> bool {
        matches!(self.kind, ItemKind::Consumable { .. })
    }
}

/// Items dropped by caches when the floor's phase does not pick one
pub const CACHE_LOOT_TABLE: [&str; 4] = ["healing_draught", "mana_tonic", "insight_shard", "healing_draught"];

pub fn builtin_items() -> Vec<Item> {
    vec![
        Item::new(
            "healing_draught",
            "Healing Draught",
            "Restores 30 health",
            ItemKind::Consumable { heal: 30, mana: 0 },
        ),
        Item::new(
            "mana_tonic",
            "Mana Tonic",
            "Restores 20 mana",
            ItemKind::Consumable { heal: 0, mana: 20 },
        ),
        Item::new(
            "elixir_of_focus",
            "Elixir of Focus",
            "Restores 60 health and 30 mana",
            ItemKind::Consumable { heal: 60, mana: 30 },
        ),
        Item::new(
            "insight_shard",
            "Insight Shard",
            "A crystallised moment of understanding",
            ItemKind::Material,
        ),
        Item::new(
            "archive_key",
            "Archive Key",
            "Opens sealed sections of the archive",
            ItemKind::Artifact,
        ),
        Item::new(
            "circuit_relic",
            "Circuit Relic",
            "Recovered from a solved artifact puzzle",
            ItemKind::Artifact,
        ),
    ]
}
