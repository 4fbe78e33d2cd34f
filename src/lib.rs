//! Chronicle Engine - procedural dungeons and cognitive turn-based battles
//!
//! Runs are driven through the [`run::Chronicle`] facade. Every operation
//! takes the current state by reference and hands back a new one, so a
//! rejected action never leaves a half-applied run behind.

pub mod battle;
pub mod catalog;
pub mod core;
pub mod dungeon;
pub mod persistence;
pub mod rewards;
pub mod run;
pub mod scorer;
