//! Battle system - turn-based duels resolved by reasoning quality
//!
//! Every player-side action carries a cognitive score (0-100). The score maps
//! to a quality tier, and the tier's multiplier scales the action's effect.
//! Enemy spells aimed at the player pause the battle until the player
//! answers with a defense.

pub mod ai;
pub mod constants;
pub mod engine;
pub mod participant;
pub mod quality;
pub mod state;
pub mod status;

// Re-exports for convenient access
pub use ai::{pick_targets, BattleAi, EnemyIntent, SimpleAi};
pub use crate::core::error::BattleError;
pub use constants::*;
pub use engine::{apply_action, apply_action_with, start_battle, start_battle_with, BattleAction, BattleSetup};
pub use participant::{BattleParticipant, CombatantSpec, Side, StatusEffect};
pub use quality::{score_to_multiplier, ResponseQuality};
pub use state::{BattleEvent, BattleEventType, BattleState, BattleStatus, PendingDefense};
pub use status::{tick_statuses, TickOutcome};
