//! Encounter definitions placed on floors
//!
//! Encounters are created during floor generation and only ever flip their
//! `completed` flag afterwards. Builders here take the generator's RNG so
//! placement stays reproducible for a given seed.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{CharacterSummary, EncounterType, EntityCatalog, GuardianSpec, ModuleSummary};
use crate::core::types::{EncounterId, Position};
use crate::rewards::{ItemGrant, Rewards};

/// Hard ceiling on encounter difficulty
pub const MAX_ENCOUNTER_DIFFICULTY: u32 = 5;

/// What an encounter is about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRef {
    /// Enemy template ids fought together
    Enemies(Vec<String>),
    Guardian(Box<GuardianSpec>),
    Character(String),
    None,
}

/// One reply in a discussion node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionChoice {
    pub text: String,
    /// Next node index; `None` ends the discussion
    #[serde(default)]
    pub next: Option<usize>,
    /// Outcome when this choice ends the discussion
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionNode {
    pub prompt: String,
    pub choices: Vec<DiscussionChoice>,
}

/// Branching dialogue, entered at node 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionTree {
    pub speaker: String,
    pub nodes: Vec<DiscussionNode>,
}

impl DiscussionTree {
    pub fn node(&self, index: usize) -> Option<&DiscussionNode> {
        self.nodes.get(index)
    }
}

/// Comprehension check on a module node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollData {
    pub title: String,
    pub passage: String,
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateData {
    pub speaker: String,
    pub thesis: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleData {
    pub riddle: String,
    /// Compared case-insensitively after trimming
    pub solution: String,
    #[serde(default)]
    pub hint: Option<String>,
}

impl PuzzleData {
    pub fn is_solution(&self, answer: &str) -> bool {
        answer.trim().eq_ignore_ascii_case(self.solution.trim())
    }
}

/// Type-specific encounter data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterPayload {
    None,
    Discussion(DiscussionTree),
    Debate(DebateData),
    Scroll(ScrollData),
    Puzzle(PuzzleData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterDefinition {
    pub id: EncounterId,
    pub encounter_type: EncounterType,
    pub difficulty: u32,
    pub position: Position,
    pub entity: EntityRef,
    /// Module used for theming prompts
    #[serde(default)]
    pub module_id: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub payload: EncounterPayload,
    /// Granted on success, in addition to defeated enemy rewards
    #[serde(default)]
    pub rewards: Rewards,
}

impl EncounterDefinition {
    /// Opening line shown when the encounter activates
    pub fn prompt(&self) -> String {
        match &self.payload {
            EncounterPayload::Discussion(tree) => tree
                .node(0)
                .map(|n| format!("{}: {}", tree.speaker, n.prompt))
                .unwrap_or_else(|| format!("{} has nothing to say.", tree.speaker)),
            EncounterPayload::Debate(debate) => {
                format!("{} contends: \"{}\" Argue your position.", debate.speaker, debate.thesis)
            }
            EncounterPayload::Scroll(scroll) => {
                format!("{}\n\n{}\n\n{}", scroll.title, scroll.passage, scroll.question)
            }
            EncounterPayload::Puzzle(puzzle) => puzzle.riddle.clone(),
            EncounterPayload::None => match self.encounter_type {
                EncounterType::Boss => "The guardian bars the way.".into(),
                _ => "Something stirs in the dark.".into(),
            },
        }
    }
}

/// Inputs shared by every encounter builder
pub struct EncounterContext<'a> {
    pub level: u32,
    pub index: usize,
    pub position: Position,
    pub difficulty: u32,
    pub module: Option<&'a ModuleSummary>,
    pub catalog: &'a EntityCatalog,
}

impl<'a> EncounterContext<'a> {
    fn definition(
        &self,
        encounter_type: EncounterType,
        entity: EntityRef,
        payload: EncounterPayload,
        rewards: Rewards,
    ) -> EncounterDefinition {
        EncounterDefinition {
            id: EncounterId::for_floor(self.level, self.index),
            encounter_type,
            difficulty: self.difficulty,
            position: self.position,
            entity,
            module_id: self.module.map(|m| m.id.clone()),
            completed: false,
            payload,
            rewards,
        }
    }

    /// Concept text for a random node of the theming module
    fn pick_concept(&self, rng: &mut ChaCha8Rng) -> (String, String) {
        let node = self.module.and_then(|m| m.nodes.choose(rng));
        match node {
            Some(node) if !node.concept.is_empty() => (node.title.clone(), node.concept.clone()),
            Some(node) => (node.title.clone(), format!("The idea of {}.", node.title)),
            None => (
                "The Examined Life".into(),
                "An unexamined belief cannot be defended.".into(),
            ),
        }
    }

    fn pick_character(&self, rng: &mut ChaCha8Rng) -> CharacterSummary {
        let characters = self.catalog.characters();
        characters
            .choose(rng)
            .map(|c| (*c).clone())
            .unwrap_or_else(|| CharacterSummary::placeholder("wandering_scholar"))
    }
}

/// Build an encounter of the given type
pub fn build_encounter(
    encounter_type: EncounterType,
    ctx: &EncounterContext<'_>,
    rng: &mut ChaCha8Rng,
) -> EncounterDefinition {
    match encounter_type {
        EncounterType::Battle | EncounterType::Boss => build_battle(ctx, rng),
        EncounterType::Discussion => build_discussion(ctx, rng),
        EncounterType::Debate => build_debate(ctx, rng),
        EncounterType::Scroll => build_scroll(ctx, rng),
        EncounterType::Puzzle => build_puzzle(ctx, rng),
    }
}

fn build_battle(ctx: &EncounterContext<'_>, rng: &mut ChaCha8Rng) -> EncounterDefinition {
    let pool = ctx.catalog.enemies_up_to_tier(ctx.difficulty);
    let count = if ctx.difficulty >= 3 { 2 } else { 1 };
    let enemies: Vec<String> = (0..count)
        .filter_map(|_| pool.choose(rng).map(|e| e.id.clone()))
        .collect();

    ctx.definition(
        EncounterType::Battle,
        EntityRef::Enemies(enemies),
        EncounterPayload::None,
        Rewards::default(),
    )
}

/// Boss encounter attached to a final floor's exit
pub fn build_boss(ctx: &EncounterContext<'_>, guardian: &GuardianSpec) -> EncounterDefinition {
    let mut definition = ctx.definition(
        EncounterType::Boss,
        EntityRef::Guardian(Box::new(guardian.clone())),
        EncounterPayload::None,
        Rewards::default(),
    );
    definition.difficulty = MAX_ENCOUNTER_DIFFICULTY;
    definition
}

fn build_discussion(ctx: &EncounterContext<'_>, rng: &mut ChaCha8Rng) -> EncounterDefinition {
    let character = ctx.pick_character(rng);
    let (title, concept) = ctx.pick_concept(rng);
    let line = character
        .lines
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| format!("Tell me, what do you make of {}?", title));

    let mut answers = vec![
        DiscussionChoice {
            text: concept.clone(),
            next: None,
            success: true,
        },
        DiscussionChoice {
            text: format!("{} is whatever feels right at the time.", title),
            next: None,
            success: false,
        },
        DiscussionChoice {
            text: "It cannot be known, so why ask?".into(),
            next: None,
            success: false,
        },
    ];
    answers.shuffle(rng);

    let greeting = if character.greeting.is_empty() {
        format!("{} regards you quietly.", character.name)
    } else {
        character.greeting.clone()
    };

    let tree = DiscussionTree {
        speaker: character.name.clone(),
        nodes: vec![
            DiscussionNode {
                prompt: greeting,
                choices: vec![
                    DiscussionChoice {
                        text: format!("Ask about {}", title),
                        next: Some(1),
                        success: false,
                    },
                    DiscussionChoice {
                        text: "Walk away".into(),
                        next: None,
                        success: false,
                    },
                ],
            },
            DiscussionNode {
                prompt: format!("{} Which statement captures {}?", line, title),
                choices: answers,
            },
        ],
    };

    let mut rewards = Rewards::experience(15 * ctx.difficulty);
    if let Some(companion_id) = &character.companion_id {
        rewards = rewards.with_companion(companion_id);
    }

    ctx.definition(
        EncounterType::Discussion,
        EntityRef::Character(character.id),
        EncounterPayload::Discussion(tree),
        rewards,
    )
}

fn build_debate(ctx: &EncounterContext<'_>, rng: &mut ChaCha8Rng) -> EncounterDefinition {
    let character = ctx.pick_character(rng);
    let thesis = match &character.thesis {
        Some(thesis) => thesis.clone(),
        None => {
            let (title, _) = ctx.pick_concept(rng);
            format!("{} is an empty abstraction with no practical use.", title)
        }
    };

    ctx.definition(
        EncounterType::Debate,
        EntityRef::Character(character.id.clone()),
        EncounterPayload::Debate(DebateData {
            speaker: character.name,
            thesis,
        }),
        Rewards::experience(25 * ctx.difficulty).with_item(ItemGrant::new("insight_shard", 1)),
    )
}

fn build_scroll(ctx: &EncounterContext<'_>, rng: &mut ChaCha8Rng) -> EncounterDefinition {
    let (title, concept) = ctx.pick_concept(rng);
    ctx.definition(
        EncounterType::Scroll,
        EntityRef::None,
        EncounterPayload::Scroll(ScrollData {
            question: format!("Explain {} in your own words.", title),
            title,
            passage: concept,
        }),
        Rewards::experience(10 * ctx.difficulty).with_item(ItemGrant::new("mana_tonic", 1)),
    )
}

const RIDDLES: [(&str, &str, &str); 4] = [
    (
        "I am true when both my parts are true, and false the moment either fails. What am I?",
        "conjunction",
        "Think of the word 'and'.",
    ),
    (
        "From 'if P then Q' and 'not Q', what may you conclude about P?",
        "not p",
        "Modus tollens.",
    ),
    (
        "The more of me you take, the more you leave behind. What am I?",
        "footsteps",
        "Walk the corridor and look back.",
    ),
    (
        "What is the only thing Socrates claimed to know?",
        "nothing",
        "It is a very short answer.",
    ),
];

fn build_puzzle(ctx: &EncounterContext<'_>, rng: &mut ChaCha8Rng) -> EncounterDefinition {
    let (riddle, solution, hint) = RIDDLES[rng.gen_range(0..RIDDLES.len())];
    ctx.definition(
        EncounterType::Puzzle,
        EntityRef::None,
        EncounterPayload::Puzzle(PuzzleData {
            riddle: riddle.to_string(),
            solution: solution.to_string(),
            hint: Some(hint.to_string()),
        }),
        Rewards::experience(20 * ctx.difficulty).with_item(ItemGrant::new("circuit_relic", 1)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryRegistry;
    use rand::SeedableRng;

    fn context<'a>(catalog: &'a EntityCatalog, difficulty: u32) -> EncounterContext<'a> {
        EncounterContext {
            level: 2,
            index: 4,
            position: Position::new(3, 3),
            difficulty,
            module: None,
            catalog,
        }
    }

    #[test]
    fn test_battle_enemies_respect_tier() {
        let catalog = EntityCatalog::builtin();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let encounter = build_encounter(EncounterType::Battle, &context(&catalog, 1), &mut rng);
        assert_eq!(encounter.id.as_str(), "L2-E4");
        match encounter.entity {
            EntityRef::Enemies(ids) => {
                assert_eq!(ids.len(), 1);
                assert!(catalog.enemy(&ids[0]).is_some_and(|e| e.tier <= 1));
            }
            other => panic!("unexpected entity {:?}", other),
        }
    }

    #[test]
    fn test_discussion_has_exactly_one_correct_answer() {
        let registry = InMemoryRegistry::sample();
        let catalog = EntityCatalog::from_content(registry.modules, registry.characters);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let encounter = build_encounter(EncounterType::Discussion, &context(&catalog, 2), &mut rng);
        let EncounterPayload::Discussion(tree) = encounter.payload else {
            panic!("expected discussion payload");
        };
        let answers = &tree.nodes[1].choices;
        assert_eq!(answers.iter().filter(|c| c.success).count(), 1);
    }

    #[test]
    fn test_puzzle_solution_is_case_insensitive() {
        let puzzle = PuzzleData {
            riddle: "?".into(),
            solution: "Footsteps".into(),
            hint: None,
        };
        assert!(puzzle.is_solution("  footsteps "));
        assert!(!puzzle.is_solution("echo"));
    }
}
