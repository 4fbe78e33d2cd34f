//! Entity taxonomy, stat blocks and enemy/companion/guardian templates

use serde::{Deserialize, Serialize};

use crate::catalog::abilities::{AbilityRef, Element};
use crate::catalog::registry::{Alignment, ModuleSummary};
use crate::rewards::{ItemGrant, Rewards};

/// Entity taxonomy used for AI flavor and theming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Chaos-aligned
    Specter,
    /// Law-aligned
    Construct,
    /// Neutral
    Archetype,
    /// Ally-aligned
    Companion,
}

impl EntityKind {
    pub fn for_alignment(alignment: Alignment) -> Self {
        match alignment {
            Alignment::Chaos => EntityKind::Specter,
            Alignment::Law => EntityKind::Construct,
            Alignment::Neutral => EntityKind::Archetype,
        }
    }
}

/// Live or template stat block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub health: i32,
    pub max_health: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub speed: i32,
    pub strength: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub adaptability: i32,
    pub resistances: Vec<Element>,
    pub weaknesses: Vec<Element>,
}

impl Default for Stats {
    /// Starting stat block for a fresh player
    fn default() -> Self {
        Self {
            health: 100,
            max_health: 100,
            mana: 50,
            max_mana: 50,
            speed: 10,
            strength: 10,
            intelligence: 12,
            wisdom: 10,
            adaptability: 10,
            resistances: Vec::new(),
            weaknesses: Vec::new(),
        }
    }
}

impl Stats {
    /// Full-health block with the given pools and core stats
    pub fn new(health: i32, mana: i32, speed: i32, strength: i32, intelligence: i32) -> Self {
        Self {
            health,
            max_health: health,
            mana,
            max_mana: mana,
            speed,
            strength,
            intelligence,
            wisdom: 8,
            adaptability: 8,
            resistances: Vec::new(),
            weaknesses: Vec::new(),
        }
    }

    pub fn with_weakness(mut self, element: Element) -> Self {
        self.weaknesses.push(element);
        self
    }

    pub fn with_resistance(mut self, element: Element) -> Self {
        self.resistances.push(element);
        self
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Weakness ×1.5, resistance ×0.5, both cancel out
    pub fn elemental_factor(&self, element: Element) -> f64 {
        let mut factor = 1.0;
        if self.weaknesses.contains(&element) {
            factor *= 1.5;
        }
        if self.resistances.contains(&element) {
            factor *= 0.5;
        }
        factor
    }

    /// Clamp pools into `[0, max]`
    pub fn clamp_pools(&mut self) {
        self.max_health = self.max_health.max(1);
        self.max_mana = self.max_mana.max(0);
        self.health = self.health.clamp(0, self.max_health);
        self.mana = self.mana.clamp(0, self.max_mana);
    }
}

/// Enemy template (immutable catalog entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub id: String,
    pub name: String,
    pub kind: EntityKind,
    /// 1 (trivial) to 5 (deadly)
    pub tier: u32,
    pub stats: Stats,
    pub abilities: Vec<AbilityRef>,
    /// Spoken when the enemy opens a battle
    #[serde(default)]
    pub taunt: Option<String>,
    #[serde(default)]
    pub rewards: Rewards,
}

impl EnemyTemplate {
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: "Shapeless Doubt".into(),
            kind: EntityKind::Archetype,
            tier: 1,
            stats: Stats::new(25, 10, 6, 6, 6),
            abilities: Vec::new(),
            taunt: None,
            rewards: Rewards::experience(5),
        }
    }
}

/// Companion template (recruitable ally)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionTemplate {
    pub id: String,
    pub name: String,
    pub stats: Stats,
    pub abilities: Vec<AbilityRef>,
}

impl CompanionTemplate {
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: "Wandering Student".into(),
            stats: Stats::new(30, 10, 7, 7, 7),
            abilities: Vec::new(),
        }
    }
}

/// Boss-tier enemy attached to a dungeon's final floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianSpec {
    pub id: String,
    pub name: String,
    pub kind: EntityKind,
    pub stats: Stats,
    pub abilities: Vec<AbilityRef>,
    #[serde(default)]
    pub taunt: Option<String>,
    #[serde(default)]
    pub rewards: Rewards,
}

impl GuardianSpec {
    /// Derive a guardian from module metadata
    pub fn from_module(module: &ModuleSummary) -> Self {
        let difficulty = module.difficulty.clamp(1, 5) as i32;
        let element = Element::for_alignment(module.alignment);

        let mut stats = Stats::new(
            80 + 30 * difficulty,
            60 + 10 * difficulty,
            8 + difficulty,
            12 + 2 * difficulty,
            12 + 2 * difficulty,
        )
        .with_resistance(element);
        stats.wisdom = 10 + difficulty;

        let mut abilities: Vec<AbilityRef> = vec![
            "guardian_judgement".into(),
            "guardian_cataclysm".into(),
            "guardian_renewal".into(),
        ];
        if let Some(node) = module.nodes.first() {
            abilities.push(AbilityRef::Id(format!("{}:{}", module.id, node.id)));
        }

        let mut rewards = Rewards::experience(100 * difficulty as u32);
        rewards.items.push(ItemGrant::new("insight_shard", 3));
        rewards.spellbooks.push(module.id.clone());

        Self {
            id: format!("guardian:{}", module.id),
            name: format!("Guardian of {}", module.title),
            kind: EntityKind::for_alignment(module.alignment),
            stats,
            abilities,
            taunt: Some(format!(
                "You seek mastery of {}? Prove you can explain it.",
                module.title
            )),
            rewards,
        }
    }
}

/// Built-in enemy roster
pub fn builtin_enemies() -> Vec<EnemyTemplate> {
    let enemy = |id: &str,
                 name: &str,
                 kind: EntityKind,
                 tier: u32,
                 stats: Stats,
                 abilities: &[&str],
                 taunt: &str| EnemyTemplate {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        tier,
        stats,
        abilities: abilities.iter().map(|a| AbilityRef::from(*a)).collect(),
        taunt: Some(taunt.to_string()),
        rewards: Rewards::experience(10 * tier).with_item(ItemGrant::with_chance("healing_draught", 1, 0.35)),
    };

    vec![
        enemy(
            "doubt_specter",
            "Doubt Specter",
            EntityKind::Specter,
            1,
            Stats::new(30, 20, 8, 6, 8).with_weakness(Element::Radiant),
            &["chaos_lash"],
            "Are you sure you understand?",
        ),
        enemy(
            "fallacy_wisp",
            "Fallacy Wisp",
            EntityKind::Specter,
            2,
            Stats::new(40, 30, 12, 5, 11)
                .with_weakness(Element::Radiant)
                .with_resistance(Element::Shadow),
            &["venom_doubt", "mesmer_gaze"],
            "Every argument bends if you twist it far enough.",
        ),
        enemy(
            "rote_construct",
            "Rote Construct",
            EntityKind::Construct,
            1,
            Stats::new(45, 15, 5, 9, 4)
                .with_weakness(Element::Fire)
                .with_resistance(Element::Physical),
            &["rigid_decree"],
            "Recite. Repeat. Recite.",
        ),
        enemy(
            "dogma_golem",
            "Dogma Golem",
            EntityKind::Construct,
            3,
            Stats::new(70, 30, 4, 12, 6)
                .with_weakness(Element::Psychic)
                .with_resistance(Element::Physical),
            &["rigid_decree", "fortify"],
            "The rule is the rule.",
        ),
        enemy(
            "mirror_archetype",
            "Mirror Archetype",
            EntityKind::Archetype,
            2,
            Stats::new(50, 30, 9, 8, 9),
            &["frost_axiom", "sap_resolve"],
            "I know only what you know.",
        ),
        enemy(
            "paradox_sage",
            "Paradox Sage",
            EntityKind::Archetype,
            4,
            Stats::new(80, 50, 11, 9, 14).with_resistance(Element::Arcane),
            &["mesmer_gaze", "frost_axiom", "venom_doubt"],
            "This statement is false. Answer me.",
        ),
    ]
}

/// Built-in recruitable companions
pub fn builtin_companions() -> Vec<CompanionTemplate> {
    vec![
        CompanionTemplate {
            id: "scribe_owl".into(),
            name: "Scribe Owl".into(),
            stats: Stats::new(40, 40, 9, 5, 12),
            abilities: vec!["mending_insight".into(), "reasoned_bolt".into()],
        },
        CompanionTemplate {
            id: "iron_tutor".into(),
            name: "Iron Tutor".into(),
            stats: Stats::new(60, 20, 6, 12, 6).with_resistance(Element::Physical),
            abilities: vec!["fortify".into()],
        },
        CompanionTemplate {
            id: "ember_fox".into(),
            name: "Ember Fox".into(),
            stats: Stats::new(35, 30, 13, 8, 10),
            abilities: vec!["socratic_flame".into()],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elemental_factor() {
        let stats = Stats::new(10, 0, 1, 1, 1)
            .with_weakness(Element::Fire)
            .with_resistance(Element::Frost);
        assert_eq!(stats.elemental_factor(Element::Fire), 1.5);
        assert_eq!(stats.elemental_factor(Element::Frost), 0.5);
        assert_eq!(stats.elemental_factor(Element::Storm), 1.0);
    }

    #[test]
    fn test_clamp_pools() {
        let mut stats = Stats::new(20, 10, 1, 1, 1);
        stats.health = 35;
        stats.mana = -4;
        stats.clamp_pools();
        assert_eq!(stats.health, 20);
        assert_eq!(stats.mana, 0);
    }

    #[test]
    fn test_missing_stats_fields_default() {
        let stats: Stats = serde_json::from_str(r#"{"health": 40}"#).unwrap();
        assert_eq!(stats.health, 40);
        assert_eq!(stats.max_health, Stats::default().max_health);
        assert!(stats.weaknesses.is_empty());
    }

    #[test]
    fn test_guardian_scales_with_difficulty() {
        let mut module = ModuleSummary::new("logic", "Logic");
        module.difficulty = 1;
        let easy = GuardianSpec::from_module(&module);
        module.difficulty = 4;
        let hard = GuardianSpec::from_module(&module);
        assert!(hard.stats.max_health > easy.stats.max_health);
        assert_eq!(hard.id, "guardian:logic");
        assert!(hard.rewards.spellbooks.contains(&"logic".to_string()));
    }
}
