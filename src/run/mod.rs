//! Run/session management - the aggregate root of a dungeon run

pub mod fog;
pub mod manager;
pub mod state;

pub use manager::Chronicle;
pub use state::{
    ActionOutcome, ActiveEncounter, ChronicleRunState, EncounterOutcome, EncounterResponse,
    RecruitResult, RunEvent, RunStatus, RunStep,
};
