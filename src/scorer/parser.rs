//! Grading prompts and reply parsing
//!
//! The model is asked for a JSON verdict; anything around the JSON object is
//! ignored and the score is clamped into 0-100.

use serde::{Deserialize, Serialize};

use crate::battle::MAX_COGNITIVE_SCORE;
use crate::catalog::{Ability, ModuleSummary};
use crate::core::error::{ChronicleError, Result};

/// Parsed grading reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreVerdict {
    pub score: u8,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Deserialize)]
struct RawVerdict {
    score: f64,
    #[serde(default)]
    feedback: Option<String>,
}

/// Parse a model reply into a clamped verdict
pub fn parse_verdict(response: &str) -> Result<ScoreVerdict> {
    let json_str = extract_json(response)?;
    let raw: RawVerdict = serde_json::from_str(json_str).map_err(|e| {
        ChronicleError::ScorerError(format!("Failed to parse verdict: {} - Response: {}", e, response))
    })?;

    let score = if raw.score.is_finite() {
        raw.score.round().clamp(0.0, MAX_COGNITIVE_SCORE as f64) as u8
    } else {
        0
    };
    Ok(ScoreVerdict {
        score,
        feedback: raw.feedback,
    })
}

/// Extract JSON object from LLM response (handles surrounding text)
fn extract_json(response: &str) -> Result<&str> {
    let start = response
        .find('{')
        .ok_or_else(|| ChronicleError::ScorerError("No JSON found in response".into()))?;
    let end = response
        .rfind('}')
        .ok_or_else(|| ChronicleError::ScorerError("No closing brace found in response".into()))?;
    if end < start {
        return Err(ChronicleError::ScorerError("Malformed JSON in response".into()));
    }
    Ok(&response[start..=end])
}

/// Challenge text shown when the player casts `ability`
pub fn ability_challenge(ability: &Ability, module: Option<&ModuleSummary>) -> String {
    let topic = match (module, &ability.node_id) {
        (Some(module), Some(node_id)) => module
            .nodes
            .iter()
            .find(|n| &n.id == node_id)
            .map(|n| format!("{} ({})", n.title, n.concept))
            .unwrap_or_else(|| module.title.clone()),
        (Some(module), None) => module.title.clone(),
        _ => ability.description.clone(),
    };
    format!(
        "To cast {}, explain in your own words: {}",
        ability.name, topic
    )
}

/// User message for one grading request
pub fn grading_request(challenge: &str, answer: &str) -> String {
    format!(
        "CHALLENGE:\n{}\n\nPLAYER ANSWER:\n{}\n\nGrade this answer as JSON:",
        challenge, answer
    )
}

/// System prompt for grading
pub const SCORE_SYSTEM_PROMPT: &str = r#"You grade short answers in a learning game.
Judge how well the answer explains, probes, applies or connects the idea in the challenge.

SCALE:
- 95-100: precise, complete and insightful
- 80-94: correct and clear
- 60-79: mostly right with gaps
- 40-59: vague or partially wrong
- 0-39: wrong, empty or off-topic

OUTPUT FORMAT (JSON only, no explanation):
{"score": 0-100, "feedback": "one short sentence"}
"#;
