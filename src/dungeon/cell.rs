//! Floor grid cells

use serde::{Deserialize, Serialize};

use crate::core::types::EncounterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    Wall,
    Floor,
    Entrance,
    Exit,
    FloorBoss,
    Encounter,
    ItemCache,
    ArtifactPuzzle,
}

impl CellType {
    pub fn is_walkable(&self) -> bool {
        !matches!(self, CellType::Wall)
    }

    /// Single-character glyph for text rendering
    pub fn glyph(&self) -> char {
        match self {
            CellType::Wall => '#',
            CellType::Floor => '.',
            CellType::Entrance => '<',
            CellType::Exit => '>',
            CellType::FloorBoss => 'B',
            CellType::Encounter => '!',
            CellType::ItemCache => '$',
            CellType::ArtifactPuzzle => '?',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapCell {
    pub cell_type: CellType,
    pub walkable: bool,
    /// Revealed by fog of war
    #[serde(default)]
    pub explored: bool,
    /// Stood on by the player
    #[serde(default)]
    pub visited: bool,
    #[serde(default)]
    pub encounter_id: Option<EncounterId>,
    #[serde(default)]
    pub item_id: Option<String>,
}

impl MapCell {
    pub fn wall() -> Self {
        Self::of_type(CellType::Wall)
    }

    pub fn floor() -> Self {
        Self::of_type(CellType::Floor)
    }

    pub fn of_type(cell_type: CellType) -> Self {
        Self {
            cell_type,
            walkable: cell_type.is_walkable(),
            explored: false,
            visited: false,
            encounter_id: None,
            item_id: None,
        }
    }

    /// Change the cell type, keeping fog flags
    pub fn set_type(&mut self, cell_type: CellType) {
        self.cell_type = cell_type;
        self.walkable = cell_type.is_walkable();
    }

    /// Revert to plain floor, dropping any payload
    pub fn clear(&mut self) {
        self.set_type(CellType::Floor);
        self.encounter_id = None;
        self.item_id = None;
    }

    /// Plain floor with nothing on it
    pub fn is_plain_floor(&self) -> bool {
        self.cell_type == CellType::Floor && self.encounter_id.is_none() && self.item_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walls_are_not_walkable() {
        assert!(!MapCell::wall().walkable);
        assert!(MapCell::floor().walkable);
        assert!(MapCell::of_type(CellType::FloorBoss).walkable);
    }

    #[test]
    fn test_clear_keeps_fog_flags() {
        let mut cell = MapCell::of_type(CellType::ItemCache);
        cell.item_id = Some("mana_tonic".into());
        cell.explored = true;
        cell.clear();
        assert!(cell.is_plain_floor());
        assert!(cell.explored);
    }
}
