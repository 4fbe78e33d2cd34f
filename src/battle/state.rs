//! Battle state, status machine and log

use std::collections::BTreeMap;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::battle::participant::{BattleParticipant, Side};
use crate::catalog::Ability;
use crate::core::config::BattleConfig;
use crate::core::types::{EncounterId, ParticipantId};
use crate::rewards::Rewards;

/// An enemy spell held until the player answers with a defense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDefense {
    pub defender: ParticipantId,
    pub attacker: ParticipantId,
    pub ability_id: String,
}

/// Battle state machine: `Ongoing` -> `PlayerVictory | PlayerDefeat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    Ongoing {
        /// Set when the next input must be the player's defense
        awaiting_defense: Option<PendingDefense>,
    },
    PlayerVictory,
    PlayerDefeat,
}

impl BattleStatus {
    pub fn ongoing() -> Self {
        BattleStatus::Ongoing {
            awaiting_defense: None,
        }
    }

    pub fn is_over(&self) -> bool {
        !matches!(self, BattleStatus::Ongoing { .. })
    }

    pub fn pending_defense(&self) -> Option<&PendingDefense> {
        match self {
            BattleStatus::Ongoing { awaiting_defense } => awaiting_defense.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleEventType {
    BattleStarted,
    Action { actor: ParticipantId },
    StatusTick { participant: ParticipantId },
    TurnSkipped { participant: ParticipantId },
    DefensePrompt { defender: ParticipantId },
    Defeated { participant: ParticipantId },
    Anomaly,
    BattleEnded,
}

/// Append-only battle log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleEvent {
    pub round: u32,
    pub event_type: BattleEventType,
    pub description: String,
}

/// Complete battle state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleState {
    pub participants: Vec<BattleParticipant>,
    /// Speed-descending order, fixed at battle start
    pub turn_order: Vec<ParticipantId>,
    pub turn_index: usize,
    pub current_turn_actor_id: ParticipantId,
    pub status: BattleStatus,
    pub round: u32,
    pub log: Vec<BattleEvent>,
    /// Cognitive challenge or taunt awaiting the player
    #[serde(default)]
    pub pending_prompt: Option<String>,
    #[serde(default)]
    pub encounter_id: Option<EncounterId>,
    /// Unlocked spellbooks, resolved at battle start
    pub spellbooks: BTreeMap<String, Vec<Ability>>,
    pub active_spellbook: String,
    /// Paid out on victory
    pub rewards: Rewards,
    pub config: BattleConfig,
    pub rng: ChaCha8Rng,
}

impl BattleState {
    pub fn participant(&self, id: ParticipantId) -> Option<&BattleParticipant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn participant_mut(&mut self, id: ParticipantId) -> Option<&mut BattleParticipant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    pub fn player(&self) -> Option<&BattleParticipant> {
        self.participants.iter().find(|p| p.is_player)
    }

    pub fn current_actor(&self) -> Option<&BattleParticipant> {
        self.participant(self.current_turn_actor_id)
    }

    /// Living participant ids on a side, in participant order
    pub fn living_on(&self, side: Side) -> Vec<ParticipantId> {
        self.participants
            .iter()
            .filter(|p| p.side() == side && p.is_alive())
            .map(|p| p.id)
            .collect()
    }

    pub fn side_defeated(&self, side: Side) -> bool {
        self.living_on(side).is_empty()
    }

    /// Is it a player-controlled participant's turn with no defense pending?
    pub fn awaiting_player_action(&self) -> bool {
        matches!(self.status, BattleStatus::Ongoing { awaiting_defense: None })
            && self
                .current_actor()
                .is_some_and(|a| a.side() == Side::Party && a.is_alive())
    }

    pub fn log_event(&mut self, event_type: BattleEventType, description: String) {
        tracing::debug!("[round {}] {}", self.round, description);
        self.log.push(BattleEvent {
            round: self.round,
            event_type,
            description,
        });
    }

    /// Advance to the next living participant in turn order (wrapping)
    ///
    /// Returns false if nobody is alive.
    pub fn advance_turn(&mut self) -> bool {
        let len = self.turn_order.len();
        for step in 1..=len {
            let raw = self.turn_index + step;
            let index = raw % len;
            let id = self.turn_order[index];
            if self.participant(id).is_some_and(|p| p.is_alive()) {
                if raw >= len {
                    self.round += 1;
                }
                self.turn_index = index;
                self.current_turn_actor_id = id;
                return true;
            }
        }
        false
    }

    /// Resolve victory/defeat; returns true if the battle just ended
    pub fn check_battle_end(&mut self) -> bool {
        if self.status.is_over() {
            return false;
        }

        let enemies_down = self.side_defeated(Side::Enemies);
        let party_down = self.side_defeated(Side::Party);

        let outcome = match (enemies_down, party_down) {
            (false, false) => return false,
            (true, true) => {
                tracing::warn!("Battle anomaly: both sides defeated, resolving as victory");
                self.log_event(
                    BattleEventType::Anomaly,
                    "Both sides fell at once; the last blow was yours".into(),
                );
                BattleStatus::PlayerVictory
            }
            (true, false) => BattleStatus::PlayerVictory,
            (false, true) => BattleStatus::PlayerDefeat,
        };

        let description = match outcome {
            BattleStatus::PlayerVictory => "Victory!".to_string(),
            _ => "Defeat...".to_string(),
        };
        self.status = outcome;
        self.pending_prompt = None;
        self.log_event(BattleEventType::BattleEnded, description);
        tracing::info!("Battle ended: {:?}", self.status);
        true
    }
}
