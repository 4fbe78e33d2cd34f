//! The Sacred Circuit: seven floor archetypes cycled per dungeon level

use serde::{Deserialize, Serialize};

/// Encounter categories placed on floors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterType {
    Battle,
    Boss,
    Discussion,
    Debate,
    Scroll,
    Puzzle,
}

impl EncounterType {
    /// Does resolving this encounter hand off to the battle engine?
    pub fn is_combat(&self) -> bool {
        matches!(self, EncounterType::Battle | EncounterType::Boss)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    Invocation,
    Exploration,
    Confrontation,
    Dialectic,
    Revelation,
    Integration,
    Ascension,
}

/// Phases in circuit order
pub const SACRED_CIRCUIT: [PhaseType; 7] = [
    PhaseType::Invocation,
    PhaseType::Exploration,
    PhaseType::Confrontation,
    PhaseType::Dialectic,
    PhaseType::Revelation,
    PhaseType::Integration,
    PhaseType::Ascension,
];

impl PhaseType {
    /// Phase for a 1-based dungeon level: `(level - 1) mod 7`
    pub fn for_level(level: u32) -> Self {
        let index = (level.max(1) - 1) as usize % SACRED_CIRCUIT.len();
        SACRED_CIRCUIT[index]
    }

    pub fn index(&self) -> usize {
        SACRED_CIRCUIT
            .iter()
            .position(|p| p == self)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseType::Invocation => "Invocation",
            PhaseType::Exploration => "Exploration",
            PhaseType::Confrontation => "Confrontation",
            PhaseType::Dialectic => "Dialectic",
            PhaseType::Revelation => "Revelation",
            PhaseType::Integration => "Integration",
            PhaseType::Ascension => "Ascension",
        }
    }

    /// Static archetype for this phase
    pub fn archetype(&self) -> Phase {
        use EncounterType::*;

        let (difficulty, encounters, allows_puzzles): (u32, &[EncounterType], bool) = match self {
            PhaseType::Invocation => (1, &[Battle, Scroll], false),
            PhaseType::Exploration => (1, &[Battle, Discussion, Scroll], true),
            PhaseType::Confrontation => (2, &[Battle], false),
            PhaseType::Dialectic => (2, &[Debate, Discussion, Battle], false),
            PhaseType::Revelation => (3, &[Scroll, Battle], true),
            PhaseType::Integration => (3, &[Battle, Debate, Discussion, Scroll], true),
            PhaseType::Ascension => (4, &[Battle, Debate], true),
        };

        Phase {
            phase_type: *self,
            difficulty,
            allowed_encounters: encounters.to_vec(),
            allows_puzzles,
        }
    }
}

/// Floor archetype: difficulty and which encounters may appear
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub phase_type: PhaseType,
    /// Base difficulty before dungeon scaling
    pub difficulty: u32,
    pub allowed_encounters: Vec<EncounterType>,
    pub allows_puzzles: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_cycles_every_seven_levels() {
        assert_eq!(PhaseType::for_level(1), PhaseType::Invocation);
        assert_eq!(PhaseType::for_level(7), PhaseType::Ascension);
        assert_eq!(PhaseType::for_level(8), PhaseType::Invocation);
        assert_eq!(PhaseType::for_level(10), PhaseType::Confrontation);
        assert_eq!(PhaseType::for_level(11), PhaseType::Dialectic);
    }

    #[test]
    fn test_level_zero_treated_as_first() {
        assert_eq!(PhaseType::for_level(0), PhaseType::Invocation);
    }

    #[test]
    fn test_every_phase_allows_some_encounter() {
        for phase in SACRED_CIRCUIT {
            let archetype = phase.archetype();
            assert!(!archetype.allowed_encounters.is_empty());
            assert!(!archetype.allowed_encounters.contains(&EncounterType::Boss));
            assert!(!archetype.allowed_encounters.contains(&EncounterType::Puzzle));
        }
    }

    #[test]
    fn test_index_matches_circuit_order() {
        for (i, phase) in SACRED_CIRCUIT.iter().enumerate() {
            assert_eq!(phase.index(), i);
        }
    }
}
