//! Battle participants and their live status effects

use serde::{Deserialize, Serialize};

use crate::catalog::{Ability, StatKind, Stats, StatusKind};
use crate::core::types::ParticipantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Player and companions
    Party,
    Enemies,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Party => Side::Enemies,
            Side::Enemies => Side::Party,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub value: i32,
    /// Remaining turns; `None` persists until removed
    pub duration: Option<u32>,
}

impl StatusEffect {
    pub fn new(kind: StatusKind, value: i32, duration: Option<u32>) -> Self {
        Self {
            kind,
            value,
            duration,
        }
    }
}

/// Everything needed to field one combatant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantSpec {
    /// Catalog id (enemy template, companion, or "player")
    pub template_id: String,
    pub name: String,
    pub stats: Stats,
    /// Already resolved against the catalog
    pub abilities: Vec<Ability>,
    #[serde(default)]
    pub taunt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleParticipant {
    pub id: ParticipantId,
    pub template_id: String,
    pub name: String,
    pub is_player: bool,
    pub is_ally: bool,
    pub stats: Stats,
    pub abilities: Vec<Ability>,
    #[serde(default)]
    pub statuses: Vec<StatusEffect>,
    #[serde(default)]
    pub taunt: Option<String>,
}

impl BattleParticipant {
    pub fn from_spec(id: ParticipantId, spec: CombatantSpec, is_player: bool, is_ally: bool) -> Self {
        let mut stats = spec.stats;
        stats.clamp_pools();
        Self {
            id,
            template_id: spec.template_id,
            name: spec.name,
            is_player,
            is_ally,
            stats,
            abilities: spec.abilities,
            statuses: Vec::new(),
            taunt: spec.taunt,
        }
    }

    pub fn side(&self) -> Side {
        if self.is_player || self.is_ally {
            Side::Party
        } else {
            Side::Enemies
        }
    }

    pub fn is_alive(&self) -> bool {
        self.stats.health > 0
    }

    pub fn ability(&self, ability_id: &str) -> Option<&Ability> {
        self.abilities.iter().find(|a| a.id == ability_id)
    }

    /// Base stat adjusted by active boosts and drains (never below 0)
    pub fn effective_stat(&self, stat: StatKind) -> i32 {
        let base = match stat {
            StatKind::Strength => self.stats.strength,
            StatKind::Intelligence => self.stats.intelligence,
            StatKind::Wisdom => self.stats.wisdom,
            StatKind::Speed => self.stats.speed,
            StatKind::Adaptability => self.stats.adaptability,
        };
        let modifier: i32 = self
            .statuses
            .iter()
            .map(|s| match s.kind {
                StatusKind::Boost(k) if k == stat => s.value,
                StatusKind::Drain(k) if k == stat => -s.value,
                _ => 0,
            })
            .sum();
        (base + modifier).max(0)
    }

    /// Damage reduction percent from guard statuses
    pub fn guard_percent(&self, cap: i32) -> i32 {
        let total: i32 = self
            .statuses
            .iter()
            .filter(|s| s.kind == StatusKind::Guard)
            .map(|s| s.value)
            .sum();
        total.clamp(0, cap)
    }

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.statuses.iter().any(|s| s.kind == kind)
    }

    /// Add a status, replacing any existing one of the same kind
    pub fn apply_status(&mut self, effect: StatusEffect) {
        self.statuses.retain(|s| s.kind != effect.kind);
        self.statuses.push(effect);
    }

    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let dealt = amount.max(0).min(self.stats.health);
        self.stats.health -= dealt;
        dealt
    }

    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.stats.health;
        self.stats.health = (self.stats.health + amount.max(0)).min(self.stats.max_health);
        self.stats.health - before
    }

    pub fn restore_mana(&mut self, amount: i32) -> i32 {
        let before = self.stats.mana;
        self.stats.mana = (self.stats.mana + amount.max(0)).min(self.stats.max_mana);
        self.stats.mana - before
    }

    pub fn spend_mana(&mut self, amount: i32) {
        self.stats.mana = (self.stats.mana - amount.max(0)).max(0);
    }
}
