use thiserror::Error;

use crate::core::types::ParticipantId;

#[derive(Error, Debug)]
pub enum ChronicleError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Scorer error: {0}")]
    ScorerError(String),

    #[error("Registry error: {0}")]
    RegistryError(String),

    #[error("Run error: {0}")]
    Run(#[from] RunError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ChronicleError>;

/// Rejected battle actions; the battle state is left untouched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BattleError {
    #[error("Not enough mana: need {required}, have {available}")]
    InsufficientMana { required: i32, available: i32 },

    #[error("Unknown ability: {0}")]
    UnknownAbility(String),

    #[error("Invalid target: {0}")]
    UnknownTarget(ParticipantId),

    #[error("No valid target for {0}")]
    NoValidTarget(String),

    #[error("It is not a player-controlled turn ({0} is acting)")]
    NotPlayerTurn(ParticipantId),

    #[error("Only the player can do that")]
    PlayerOnlyAction,

    #[error("An attack is incoming: defend first")]
    DefenseRequired,

    #[error("The battle is already over")]
    BattleOver,

    #[error("Unknown or locked spellbook: {0}")]
    UnknownSpellbook(String),
}

/// Precondition failures of the run API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("Missing prerequisite modules: {}", .0.join(", "))]
    MissingPrerequisite(Vec<String>),

    #[error("The infinite dungeon needs at least one installed module")]
    NoInstalledModules,

    #[error("Dungeon not found: {0}")]
    DungeonNotFound(String),

    #[error("The run is not active")]
    RunNotActive,

    #[error("No battle in progress")]
    NoActiveBattle,

    #[error("No encounter in progress")]
    NoActiveEncounter,

    #[error("A battle is in progress")]
    BattleInProgress,

    #[error("An encounter is in progress")]
    EncounterInProgress,

    #[error("Item not usable: {0}")]
    ItemNotUsable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Battle(#[from] BattleError),
}

/// Storage failures
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {found} (max {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}
