//! Dungeons, floors and encounter placement

pub mod assembly;
pub mod cell;
pub mod encounter;
pub mod floor;

pub use assembly::{
    assemble_dungeon, assemble_infinite_dungeon, Dungeon, DungeonKind, EnvironmentTheme,
    INFINITE_DUNGEON_ID,
};
pub use cell::{CellType, MapCell};
pub use encounter::{
    DebateData, DiscussionChoice, DiscussionNode, DiscussionTree, EncounterDefinition,
    EncounterPayload, EntityRef, PuzzleData, ScrollData,
};
pub use floor::{generate_floor, Floor, FloorRequest};
