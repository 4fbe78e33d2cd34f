//! Engine configuration with documented constants
//!
//! Tunable values for generation, exploration, battle and party size are
//! collected here. Response-quality thresholds are deliberately absent: they
//! live in `battle::constants` and are not tunable.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{ChronicleError, Result};

/// Floor generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Grid width in cells
    pub floor_width: u32,
    /// Grid height in cells
    pub floor_height: u32,
    /// Carve step budget as a fraction of `width × height`
    ///
    /// At 0.3 a 15×15 floor gets ~67 carve steps, which fills most of the
    /// odd-coordinate lattice before the walk runs out of budget.
    pub carve_ratio: f64,
    /// Per-step chance to seed an encounter on the freshly carved cell
    pub encounter_chance: f64,
    /// Per-step chance to seed an item cache
    pub item_cache_chance: f64,
    /// Per-step chance to seed a puzzle (only on phases that allow puzzles)
    pub puzzle_chance: f64,
    /// Random exit picks attempted before falling back to the nearest cell
    pub max_exit_attempts: u32,
    /// Preferred minimum Manhattan distance between entrance and exit
    pub min_exit_distance: i32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            floor_width: 15,
            floor_height: 15,
            carve_ratio: 0.3,
            encounter_chance: 0.15,
            item_cache_chance: 0.05,
            puzzle_chance: 0.03,
            max_exit_attempts: 64,
            min_exit_distance: 6,
        }
    }
}

/// Exploration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Fog-of-war reveal radius (Chebyshev distance)
    pub reveal_radius: i32,
    /// Chance of an ambient battle when stepping onto a plain floor cell
    pub ambient_battle_chance: f64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            reveal_radius: 2,
            ambient_battle_chance: 0.10,
        }
    }
}

/// Battle parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Damage reduction percent granted by a STRONG defend
    pub defend_base_reduction: i32,
    /// Hard cap on guard reduction percent
    pub guard_cap: i32,
    /// Enemy turns resolved in one call before the loop gives up
    pub max_enemy_turns: usize,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            defend_base_reduction: 50,
            guard_cap: 80,
            max_enemy_turns: 64,
        }
    }
}

/// Party parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartyConfig {
    /// Maximum companions travelling with the player
    pub party_cap: usize,
}

impl Default for PartyConfig {
    fn default() -> Self {
        Self { party_cap: 3 }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChronicleConfig {
    /// Base seed; `None` draws a fresh seed per run
    pub seed: Option<u64>,
    pub generation: GenerationConfig,
    pub exploration: ExplorationConfig,
    pub battle: BattleConfig,
    pub party: PartyConfig,
}

impl ChronicleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file; missing sections fall back to defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: ChronicleConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let gen = &self.generation;

        if gen.floor_width == 0 || gen.floor_height == 0 {
            return Err(ChronicleError::InvalidConfig(
                "floor dimensions must be non-zero".into(),
            ));
        }

        let probabilities = [
            ("carve_ratio", gen.carve_ratio),
            ("encounter_chance", gen.encounter_chance),
            ("item_cache_chance", gen.item_cache_chance),
            ("puzzle_chance", gen.puzzle_chance),
            ("ambient_battle_chance", self.exploration.ambient_battle_chance),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ChronicleError::InvalidConfig(format!(
                    "{} ({}) must be within [0, 1]",
                    name, value
                )));
            }
        }

        // Placement rolls share one uniform draw per step
        let placement_total = gen.encounter_chance + gen.item_cache_chance + gen.puzzle_chance;
        if placement_total > 1.0 {
            return Err(ChronicleError::InvalidConfig(format!(
                "placement chances sum to {:.2}, must be <= 1",
                placement_total
            )));
        }

        if self.exploration.reveal_radius < 0 {
            return Err(ChronicleError::InvalidConfig("reveal_radius must be >= 0".into()));
        }

        if !(0..=100).contains(&self.battle.guard_cap) {
            return Err(ChronicleError::InvalidConfig(format!(
                "guard_cap ({}) must be a percentage",
                self.battle.guard_cap
            )));
        }

        if self.party.party_cap == 0 {
            return Err(ChronicleError::InvalidConfig("party_cap must be >= 1".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ChronicleConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ChronicleConfig::from_toml(
            r#"
            seed = 7

            [generation]
            floor_width = 21
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, Some(7));
        assert_eq!(config.generation.floor_width, 21);
        assert_eq!(config.generation.floor_height, 15);
        assert_eq!(config.exploration.reveal_radius, 2);
        assert_eq!(config.party.party_cap, 3);
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        let mut config = ChronicleConfig::default();
        config.exploration.ambient_battle_chance = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_placement_overflow() {
        let mut config = ChronicleConfig::default();
        config.generation.encounter_chance = 0.7;
        config.generation.item_cache_chance = 0.4;
        assert!(config.validate().is_err());
    }
}
