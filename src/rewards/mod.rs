//! Rewards, recruitment and the persistent player base
//!
//! Battle and encounter outcomes are converted into item grants, experience,
//! spellbook unlocks and companions here. Every function returns a new
//! `PlayerBase`; the input is never edited in place.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{CompanionTemplate, EntityCatalog, Stats, STARTER_SPELLBOOK};

/// Experience needed to advance from `level` to `level + 1`
pub const EXPERIENCE_PER_LEVEL: u32 = 100;

// Per-level stat growth
pub const LEVEL_HEALTH_GAIN: i32 = 10;
pub const LEVEL_MANA_GAIN: i32 = 5;
pub const LEVEL_STAT_GAIN: i32 = 1;

fn default_chance() -> f64 {
    1.0
}

/// One item in a reward bundle, gated by an independent roll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemGrant {
    pub item_id: String,
    pub quantity: u32,
    /// Probability in `[0, 1]` that the grant is paid out
    #[serde(default = "default_chance")]
    pub chance: f64,
}

impl ItemGrant {
    pub fn new(item_id: &str, quantity: u32) -> Self {
        Self::with_chance(item_id, quantity, 1.0)
    }

    pub fn with_chance(item_id: &str, quantity: u32, chance: f64) -> Self {
        Self {
            item_id: item_id.to_string(),
            quantity,
            chance,
        }
    }
}

/// Reward bundle attached to enemies, guardians and encounters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rewards {
    pub experience: u32,
    pub items: Vec<ItemGrant>,
    pub spellbooks: Vec<String>,
    pub companions: Vec<String>,
}

impl Rewards {
    pub fn experience(amount: u32) -> Self {
        Self {
            experience: amount,
            ..Default::default()
        }
    }

    pub fn with_item(mut self, grant: ItemGrant) -> Self {
        self.items.push(grant);
        self
    }

    pub fn with_spellbook(mut self, spellbook_id: &str) -> Self {
        self.spellbooks.push(spellbook_id.to_string());
        self
    }

    pub fn with_companion(mut self, companion_id: &str) -> Self {
        self.companions.push(companion_id.to_string());
        self
    }

    /// Combine two bundles (used when several enemies fall in one battle)
    pub fn merge(mut self, other: &Rewards) -> Self {
        self.experience += other.experience;
        self.items.extend(other.items.iter().cloned());
        self.spellbooks.extend(other.spellbooks.iter().cloned());
        self.companions.extend(other.companions.iter().cloned());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.experience == 0
            && self.items.is_empty()
            && self.spellbooks.is_empty()
            && self.companions.is_empty()
    }
}

/// A recruited ally travelling with the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Companion {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub ability_ids: Vec<String>,
}

impl Companion {
    pub fn from_template(template: &CompanionTemplate) -> Self {
        Self {
            id: template.id.clone(),
            name: template.name.clone(),
            stats: template.stats.clone(),
            ability_ids: template.abilities.iter().map(|a| a.id().to_string()).collect(),
        }
    }
}

fn default_level() -> u32 {
    1
}

fn default_name() -> String {
    "Seeker".into()
}

fn default_spellbooks() -> Vec<String> {
    vec![STARTER_SPELLBOOK.to_string()]
}

fn default_active_spellbook() -> String {
    STARTER_SPELLBOOK.to_string()
}

/// Persistent player record that outlives individual runs
///
/// Every field has a serde default so older or partial snapshots still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerBase {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_level")]
    pub level: u32,
    /// Progress toward the next level
    #[serde(default)]
    pub experience: u32,
    #[serde(default)]
    pub stats: Stats,
    /// Item id -> quantity (ordered for stable output)
    #[serde(default)]
    pub inventory: BTreeMap<String, u32>,
    #[serde(default = "default_spellbooks")]
    pub spellbooks: Vec<String>,
    #[serde(default = "default_active_spellbook")]
    pub active_spellbook: String,
    #[serde(default)]
    pub companions: Vec<Companion>,
}

impl Default for PlayerBase {
    fn default() -> Self {
        Self {
            name: default_name(),
            level: default_level(),
            experience: 0,
            stats: Stats::default(),
            inventory: BTreeMap::new(),
            spellbooks: default_spellbooks(),
            active_spellbook: default_active_spellbook(),
            companions: Vec::new(),
        }
    }
}

impl PlayerBase {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn item_count(&self, item_id: &str) -> u32 {
        self.inventory.get(item_id).copied().unwrap_or(0)
    }

    pub fn add_item(&mut self, item_id: &str, quantity: u32) {
        if quantity == 0 {
            return;
        }
        *self.inventory.entry(item_id.to_string()).or_insert(0) += quantity;
    }

    /// Remove one unit of an item; false if none was held
    pub fn take_item(&mut self, item_id: &str) -> bool {
        match self.inventory.get_mut(item_id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    self.inventory.remove(item_id);
                }
                true
            }
            _ => false,
        }
    }

    pub fn has_companion(&self, companion_id: &str) -> bool {
        self.companions.iter().any(|c| c.id == companion_id)
    }

    pub fn experience_to_next_level(&self) -> u32 {
        EXPERIENCE_PER_LEVEL * self.level.max(1)
    }

    /// Add experience and apply any level-ups; returns levels gained
    pub fn gain_experience(&mut self, amount: u32) -> u32 {
        self.experience = self.experience.saturating_add(amount);
        let mut gained = 0;
        while self.experience >= self.experience_to_next_level() {
            self.experience -= self.experience_to_next_level();
            self.level += 1;
            gained += 1;

            let stats = &mut self.stats;
            stats.max_health += LEVEL_HEALTH_GAIN;
            stats.health += LEVEL_HEALTH_GAIN;
            stats.max_mana += LEVEL_MANA_GAIN;
            stats.mana += LEVEL_MANA_GAIN;
            stats.strength += LEVEL_STAT_GAIN;
            stats.intelligence += LEVEL_STAT_GAIN;
            stats.wisdom += LEVEL_STAT_GAIN;
            stats.speed += LEVEL_STAT_GAIN;
            stats.adaptability += LEVEL_STAT_GAIN;
            stats.clamp_pools();
        }
        gained
    }
}

/// What a reward distribution actually paid out
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardSummary {
    pub experience: u32,
    pub levels_gained: u32,
    /// (item id, quantity) pairs that passed their chance roll
    pub items: Vec<(String, u32)>,
    /// Spellbooks newly unlocked (duplicates excluded)
    pub spellbooks: Vec<String>,
    pub companions: Vec<String>,
}

/// Result of a recruitment attempt
#[derive(Debug, Clone, PartialEq)]
pub struct RecruitOutcome {
    pub player: PlayerBase,
    pub success: bool,
    pub companion: Option<Companion>,
}

/// Try to add a companion to the party
///
/// Already-present companions and a full party both yield `success = false`
/// with the player unchanged.
pub fn recruit_companion(
    player: &PlayerBase,
    template: &CompanionTemplate,
    party_cap: usize,
) -> RecruitOutcome {
    if player.has_companion(&template.id) {
        tracing::debug!("Companion '{}' already in party", template.id);
        return RecruitOutcome {
            player: player.clone(),
            success: false,
            companion: None,
        };
    }

    if player.companions.len() >= party_cap {
        tracing::debug!(
            "Party full ({}/{}), cannot recruit '{}'",
            player.companions.len(),
            party_cap,
            template.id
        );
        return RecruitOutcome {
            player: player.clone(),
            success: false,
            companion: None,
        };
    }

    let companion = Companion::from_template(template);
    let mut next = player.clone();
    next.companions.push(companion.clone());
    tracing::info!("{} joined the party", companion.name);

    RecruitOutcome {
        player: next,
        success: true,
        companion: Some(companion),
    }
}

/// Apply a reward bundle to the player base
pub fn distribute_rewards<R: Rng>(
    player: &PlayerBase,
    rewards: &Rewards,
    catalog: &EntityCatalog,
    party_cap: usize,
    rng: &mut R,
) -> (PlayerBase, RewardSummary) {
    let mut next = player.clone();
    let mut summary = RewardSummary::default();

    // Items: each grant rolls independently
    for grant in &rewards.items {
        let chance = grant.chance.clamp(0.0, 1.0);
        let paid = chance >= 1.0 || rng.gen::<f64>() < chance;
        if paid && grant.quantity > 0 {
            next.add_item(&grant.item_id, grant.quantity);
            summary.items.push((grant.item_id.clone(), grant.quantity));
        }
    }

    // Experience
    summary.experience = rewards.experience;
    summary.levels_gained = next.gain_experience(rewards.experience);
    if summary.levels_gained > 0 {
        tracing::info!("{} reached level {}", next.name, next.level);
    }

    // Spellbooks, deduplicated by id
    for spellbook_id in &rewards.spellbooks {
        if next.spellbooks.iter().any(|s| s == spellbook_id) {
            continue;
        }
        if catalog.spellbook(spellbook_id).is_none() {
            tracing::warn!("Reward names unknown spellbook '{}', skipping", spellbook_id);
            continue;
        }
        next.spellbooks.push(spellbook_id.clone());
        summary.spellbooks.push(spellbook_id.clone());
    }

    // Companions
    for companion_id in &rewards.companions {
        let template = catalog.companion_or_placeholder(companion_id);
        let outcome = recruit_companion(&next, &template, party_cap);
        if outcome.success {
            summary.companions.push(companion_id.clone());
        }
        next = outcome.player;
    }

    (next, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_certain_items_always_granted() {
        let catalog = EntityCatalog::builtin();
        let rewards = Rewards::default().with_item(ItemGrant::new("mana_tonic", 2));
        let (player, summary) =
            distribute_rewards(&PlayerBase::default(), &rewards, &catalog, 3, &mut rng());
        assert_eq!(player.item_count("mana_tonic"), 2);
        assert_eq!(summary.items, vec![("mana_tonic".to_string(), 2)]);
    }

    #[test]
    fn test_zero_chance_items_never_granted() {
        let catalog = EntityCatalog::builtin();
        let rewards = Rewards::default().with_item(ItemGrant::with_chance("mana_tonic", 1, 0.0));
        let mut rng = rng();
        for _ in 0..20 {
            let (player, _) =
                distribute_rewards(&PlayerBase::default(), &rewards, &catalog, 3, &mut rng);
            assert_eq!(player.item_count("mana_tonic"), 0);
        }
    }

    #[test]
    fn test_spellbooks_deduplicated() {
        let catalog = EntityCatalog::builtin();
        let rewards = Rewards::default()
            .with_spellbook("dialectic")
            .with_spellbook("dialectic")
            .with_spellbook(STARTER_SPELLBOOK);
        let (player, summary) =
            distribute_rewards(&PlayerBase::default(), &rewards, &catalog, 3, &mut rng());
        assert_eq!(player.spellbooks, vec![STARTER_SPELLBOOK.to_string(), "dialectic".into()]);
        assert_eq!(summary.spellbooks, vec!["dialectic".to_string()]);
    }

    #[test]
    fn test_level_up_raises_stats() {
        let mut player = PlayerBase::default();
        let before = player.stats.clone();
        let gained = player.gain_experience(100);
        assert_eq!(gained, 1);
        assert_eq!(player.level, 2);
        assert_eq!(player.experience, 0);
        assert_eq!(player.stats.max_health, before.max_health + LEVEL_HEALTH_GAIN);
        assert_eq!(player.stats.strength, before.strength + LEVEL_STAT_GAIN);
    }

    #[test]
    fn test_multiple_level_ups_in_one_grant() {
        let mut player = PlayerBase::default();
        // 100 for level 2, 200 for level 3, 50 left over
        assert_eq!(player.gain_experience(350), 2);
        assert_eq!(player.level, 3);
        assert_eq!(player.experience, 50);
    }

    #[test]
    fn test_recruit_duplicate_fails() {
        let catalog = EntityCatalog::builtin();
        let owl = catalog.companion_or_placeholder("scribe_owl");
        let first = recruit_companion(&PlayerBase::default(), &owl, 3);
        assert!(first.success);
        let second = recruit_companion(&first.player, &owl, 3);
        assert!(!second.success);
        assert!(second.companion.is_none());
        assert_eq!(second.player.companions.len(), 1);
    }

    #[test]
    fn test_recruit_respects_party_cap() {
        let catalog = EntityCatalog::builtin();
        let mut player = PlayerBase::default();
        for id in ["scribe_owl", "iron_tutor", "ember_fox"] {
            let outcome = recruit_companion(&player, &catalog.companion_or_placeholder(id), 3);
            assert!(outcome.success);
            player = outcome.player;
        }
        let extra = CompanionTemplate::placeholder("stray");
        let outcome = recruit_companion(&player, &extra, 3);
        assert!(!outcome.success);
        assert_eq!(outcome.player.companions.len(), 3);
    }

    #[test]
    fn test_take_item_removes_empty_entries() {
        let mut player = PlayerBase::default();
        player.add_item("healing_draught", 1);
        assert!(player.take_item("healing_draught"));
        assert!(!player.take_item("healing_draught"));
        assert!(player.inventory.is_empty());
    }

    #[test]
    fn test_partial_player_base_loads_with_defaults() {
        let player: PlayerBase = serde_json::from_str(r#"{"name": "Ada", "level": 4}"#).unwrap();
        assert_eq!(player.name, "Ada");
        assert_eq!(player.level, 4);
        assert_eq!(player.stats, Stats::default());
        assert_eq!(player.active_spellbook, STARTER_SPELLBOOK);
    }
}
