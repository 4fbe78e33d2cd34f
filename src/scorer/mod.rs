//! Cognitive scoring boundary
//!
//! The engine never grades answers itself. A scorer turns a challenge and a
//! free-text answer into a 0-100 score that battle and encounter resolution
//! consume.

pub mod client;
pub mod parser;

pub use client::{GradingClient, ScorerEndpoint};
pub use parser::{ability_challenge, grading_request, parse_verdict, ScoreVerdict, SCORE_SYSTEM_PROMPT};

use crate::battle::MAX_COGNITIVE_SCORE;
use crate::core::error::Result;

/// Grades a player's answer to a challenge
#[allow(async_fn_in_trait)]
pub trait CognitiveScorer {
    async fn score(&self, challenge: &str, answer: &str) -> Result<ScoreVerdict>;
}

/// Returns the same score for every answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedScorer(pub u8);

impl FixedScorer {
    pub fn new(score: u8) -> Self {
        Self(score.min(MAX_COGNITIVE_SCORE))
    }
}

impl CognitiveScorer for FixedScorer {
    async fn score(&self, _challenge: &str, _answer: &str) -> Result<ScoreVerdict> {
        Ok(ScoreVerdict {
            score: self.0.min(MAX_COGNITIVE_SCORE),
            feedback: None,
        })
    }
}

/// Scorer backed by a hosted language model
#[derive(Debug, Clone)]
pub struct LlmScorer {
    client: GradingClient,
}

impl LlmScorer {
    pub fn new(client: GradingClient) -> Self {
        Self { client }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(GradingClient::from_env()?))
    }
}

impl CognitiveScorer for LlmScorer {
    async fn score(&self, challenge: &str, answer: &str) -> Result<ScoreVerdict> {
        // Blank answers never reach the model
        if answer.trim().is_empty() {
            return Ok(ScoreVerdict {
                score: 0,
                feedback: Some("No answer given.".into()),
            });
        }

        let verdict = self.client.grade(challenge, answer).await?;
        tracing::debug!("Scored answer {} via {}", verdict.score, self.client.model());
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_scorer_ignores_answer() {
        let scorer = FixedScorer::new(72);
        let a = scorer.score("why?", "because").await.unwrap();
        let b = scorer.score("why?", "").await.unwrap();
        assert_eq!(a.score, 72);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_fixed_scorer_caps_at_max() {
        let scorer = FixedScorer(250);
        assert_eq!(scorer.score("", "").await.unwrap().score, MAX_COGNITIVE_SCORE);
        assert_eq!(FixedScorer::new(250).0, MAX_COGNITIVE_SCORE);
    }

    #[tokio::test]
    async fn test_llm_scorer_short_circuits_blank_answers() {
        let client = GradingClient::new("k", "http://127.0.0.1:9", "m");
        let scorer = LlmScorer::new(client);
        let verdict = scorer.score("Explain modus ponens", "   ").await.unwrap();
        assert_eq!(verdict.score, 0);
    }
}
