//! Ability definitions, effects and spellbooks

use serde::{Deserialize, Serialize};

use crate::catalog::registry::{Alignment, ModuleSummary};

/// Elemental affinity used for weakness/resistance scaling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Physical,
    Fire,
    Frost,
    Storm,
    Arcane,
    Psychic,
    Radiant,
    Shadow,
}

impl Element {
    /// Theme element for a module alignment
    pub fn for_alignment(alignment: Alignment) -> Self {
        match alignment {
            Alignment::Chaos => Element::Shadow,
            Alignment::Law => Element::Radiant,
            Alignment::Neutral => Element::Arcane,
        }
    }
}

/// Who an ability lands on, relative to the caster's side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    SelfOnly,
    SingleEnemy,
    AllEnemies,
    SingleAlly,
    AllAllies,
}

impl TargetMode {
    pub fn is_hostile(&self) -> bool {
        matches!(self, TargetMode::SingleEnemy | TargetMode::AllEnemies)
    }

    pub fn is_single(&self) -> bool {
        matches!(self, TargetMode::SingleEnemy | TargetMode::SingleAlly)
    }
}

/// Stats that buffs and drains can modify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Strength,
    Intelligence,
    Wisdom,
    Speed,
    Adaptability,
}

/// Ongoing conditions carried by a battle participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    // Damage over time
    Poison,
    Burn,

    // Incapacitating
    Sleep,
    Paralysis,
    Frozen,

    // Control
    Charm,

    // Beneficial
    /// Percent damage reduction
    Guard,
    Regeneration,
    Boost(StatKind),

    // Detrimental
    Drain(StatKind),
}

impl StatusKind {
    pub fn is_damage_over_time(&self) -> bool {
        matches!(self, StatusKind::Poison | StatusKind::Burn)
    }

    pub fn is_incapacitating(&self) -> bool {
        matches!(self, StatusKind::Sleep | StatusKind::Paralysis | StatusKind::Frozen)
    }
}

/// What a single effect does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    Damage,
    Heal,
    RestoreMana,
    /// Grants `Guard` with the effect value as reduction percent
    Shield,
    Boost(StatKind),
    Drain(StatKind),
    Inflict(StatusKind),
}

impl EffectType {
    /// Does the multiplier scale this effect's magnitude?
    pub fn scales_with_quality(&self) -> bool {
        // Inflicted conditions keep their magnitude; quality only gates them
        !matches!(self, EffectType::Inflict(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub effect_type: EffectType,
    pub value: i32,
    /// `None` means instant (damage/heal) or indefinite (statuses)
    #[serde(default)]
    pub duration: Option<u32>,
}

impl Effect {
    pub fn new(effect_type: EffectType, value: i32) -> Self {
        Self {
            effect_type,
            value,
            duration: None,
        }
    }

    pub fn lasting(effect_type: EffectType, value: i32, duration: u32) -> Self {
        Self {
            effect_type,
            value,
            duration: Some(duration),
        }
    }
}

/// Immutable catalog ability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub mana_cost: i32,
    pub target: TargetMode,
    pub element: Element,
    pub effects: Vec<Effect>,
    /// Module this ability is themed on (prompt generation)
    #[serde(default)]
    pub module_id: Option<String>,
    #[serde(default)]
    pub node_id: Option<String>,
}

impl Ability {
    pub fn new(id: &str, name: &str, mana_cost: i32, target: TargetMode, element: Element) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            mana_cost,
            target,
            element,
            effects: Vec::new(),
            module_id: None,
            node_id: None,
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Total raw damage across all damage effects
    pub fn damage_power(&self) -> i32 {
        self.effects
            .iter()
            .filter(|e| e.effect_type == EffectType::Damage)
            .map(|e| e.value)
            .sum()
    }

    pub fn deals_damage(&self) -> bool {
        self.damage_power() > 0
    }

    /// Stand-in used when a lookup misses
    pub fn placeholder(id: &str) -> Self {
        Ability::new(id, "Faded Technique", 0, TargetMode::SingleEnemy, Element::Physical)
            .with_effect(Effect::new(EffectType::Damage, 5))
            .with_description("A half-remembered technique")
    }

    /// Derive a themed ability from a module node
    pub fn from_module_node(module: &ModuleSummary, node_id: &str, node_title: &str) -> Self {
        let difficulty = module.difficulty.max(1) as i32;
        let mut ability = Ability::new(
            &format!("{}:{}", module.id, node_id),
            node_title,
            6 + difficulty,
            TargetMode::SingleEnemy,
            Element::for_alignment(module.alignment),
        )
        .with_effect(Effect::new(EffectType::Damage, 12 + 2 * difficulty))
        .with_description(&format!("Channel your grasp of {}", node_title));
        ability.module_id = Some(module.id.clone());
        ability.node_id = Some(node_id.to_string());
        ability
    }
}

/// Unresolved-or-resolved ability reference
///
/// Templates name abilities by id; battle setup resolves every reference
/// once, so combat code only ever sees `Resolved`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AbilityRef {
    Id(String),
    Resolved(Ability),
}

impl AbilityRef {
    pub fn id(&self) -> &str {
        match self {
            AbilityRef::Id(id) => id,
            AbilityRef::Resolved(ability) => &ability.id,
        }
    }
}

impl From<&str> for AbilityRef {
    fn from(id: &str) -> Self {
        AbilityRef::Id(id.to_string())
    }
}

/// Named set of abilities a player can equip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spellbook {
    pub id: String,
    pub name: String,
    pub ability_ids: Vec<String>,
}

impl Spellbook {
    pub fn new(id: &str, name: &str, ability_ids: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ability_ids: ability_ids.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Id of the spellbook every new player starts with
pub const STARTER_SPELLBOOK: &str = "initiate";

/// Built-in abilities shared by players, companions, enemies and guardians
pub fn builtin_abilities() -> Vec<Ability> {
    use EffectType::*;

    vec![
        // === PLAYER ===
        Ability::new("reasoned_bolt", "Reasoned Bolt", 8, TargetMode::SingleEnemy, Element::Arcane)
            .with_effect(Effect::new(Damage, 20))
            .with_description("A precise argument given form"),
        Ability::new("socratic_flame", "Socratic Flame", 12, TargetMode::SingleEnemy, Element::Fire)
            .with_effect(Effect::new(Damage, 14))
            .with_effect(Effect::lasting(Inflict(StatusKind::Burn), 5, 3)),
        Ability::new("clarity_wave", "Clarity Wave", 15, TargetMode::AllEnemies, Element::Radiant)
            .with_effect(Effect::new(Damage, 10)),
        Ability::new("mending_insight", "Mending Insight", 10, TargetMode::SingleAlly, Element::Radiant)
            .with_effect(Effect::new(Heal, 25)),
        Ability::new("focus", "Focus", 6, TargetMode::SelfOnly, Element::Arcane)
            .with_effect(Effect::lasting(Boost(StatKind::Intelligence), 4, 3))
            .with_effect(Effect::new(RestoreMana, 4)),
        Ability::new("lull_of_doubt", "Lull of Doubt", 10, TargetMode::SingleEnemy, Element::Psychic)
            .with_effect(Effect::lasting(Inflict(StatusKind::Sleep), 40, 2)),
        Ability::new("rally", "Rally", 14, TargetMode::AllAllies, Element::Radiant)
            .with_effect(Effect::new(Heal, 12))
            .with_effect(Effect::lasting(Shield, 20, 1)),
        // === ENEMY ===
        Ability::new("chaos_lash", "Chaos Lash", 6, TargetMode::SingleEnemy, Element::Shadow)
            .with_effect(Effect::new(Damage, 12)),
        Ability::new("venom_doubt", "Venom of Doubt", 8, TargetMode::SingleEnemy, Element::Shadow)
            .with_effect(Effect::new(Damage, 6))
            .with_effect(Effect::lasting(Inflict(StatusKind::Poison), 4, 3)),
        Ability::new("rigid_decree", "Rigid Decree", 10, TargetMode::SingleEnemy, Element::Storm)
            .with_effect(Effect::new(Damage, 15))
            .with_effect(Effect::lasting(Inflict(StatusKind::Paralysis), 30, 1)),
        Ability::new("mesmer_gaze", "Mesmer Gaze", 10, TargetMode::SingleEnemy, Element::Psychic)
            .with_effect(Effect::lasting(Inflict(StatusKind::Charm), 35, 1)),
        Ability::new("frost_axiom", "Frost Axiom", 9, TargetMode::SingleEnemy, Element::Frost)
            .with_effect(Effect::new(Damage, 10))
            .with_effect(Effect::lasting(Inflict(StatusKind::Frozen), 25, 1)),
        Ability::new("fortify", "Fortify", 6, TargetMode::SelfOnly, Element::Physical)
            .with_effect(Effect::lasting(Shield, 30, 2)),
        Ability::new("sap_resolve", "Sap Resolve", 7, TargetMode::SingleEnemy, Element::Shadow)
            .with_effect(Effect::lasting(Drain(StatKind::Strength), 3, 2))
            .with_effect(Effect::new(Damage, 5)),
        // === GUARDIAN ===
        Ability::new("guardian_judgement", "Guardian's Judgement", 16, TargetMode::SingleEnemy, Element::Radiant)
            .with_effect(Effect::new(Damage, 24)),
        Ability::new("guardian_cataclysm", "Cataclysm", 20, TargetMode::AllEnemies, Element::Shadow)
            .with_effect(Effect::new(Damage, 14)),
        Ability::new("guardian_renewal", "Renewal", 12, TargetMode::SelfOnly, Element::Radiant)
            .with_effect(Effect::new(Heal, 20))
            .with_effect(Effect::lasting(Inflict(StatusKind::Regeneration), 5, 3)),
    ]
}

/// Spellbooks available without any module installed
pub fn builtin_spellbooks() -> Vec<Spellbook> {
    vec![
        Spellbook::new(
            STARTER_SPELLBOOK,
            "Initiate's Primer",
            &["reasoned_bolt", "mending_insight", "focus", "clarity_wave"],
        ),
        Spellbook::new(
            "dialectic",
            "Dialectic Codex",
            &["socratic_flame", "lull_of_doubt", "rally", "reasoned_bolt"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ids_unique() {
        let abilities = builtin_abilities();
        let mut ids: Vec<&str> = abilities.iter().map(|a| a.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), abilities.len());
    }

    #[test]
    fn test_spellbooks_reference_builtin_abilities() {
        let abilities = builtin_abilities();
        for book in builtin_spellbooks() {
            for id in &book.ability_ids {
                assert!(abilities.iter().any(|a| &a.id == id), "missing {}", id);
            }
        }
    }

    #[test]
    fn test_damage_power_sums_damage_effects() {
        let ability = Ability::new("x", "X", 0, TargetMode::SingleEnemy, Element::Fire)
            .with_effect(Effect::new(EffectType::Damage, 7))
            .with_effect(Effect::new(EffectType::Heal, 50))
            .with_effect(Effect::new(EffectType::Damage, 3));
        assert_eq!(ability.damage_power(), 10);
    }

    #[test]
    fn test_status_classification() {
        assert!(StatusKind::Poison.is_damage_over_time());
        assert!(StatusKind::Frozen.is_incapacitating());
        assert!(!StatusKind::Charm.is_incapacitating());
        assert!(!StatusKind::Guard.is_damage_over_time());
    }
}
