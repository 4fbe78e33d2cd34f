pub mod config;
pub mod error;
pub mod types;

pub use config::ChronicleConfig;
pub use error::{BattleError, ChronicleError, PersistError, Result, RunError};
pub use types::{Direction, EncounterId, ParticipantId, Position, RunId};
