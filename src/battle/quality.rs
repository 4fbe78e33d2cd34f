//! Cognitive score to response quality mapping

use serde::{Deserialize, Serialize};

use crate::battle::constants::*;

/// Quality tier of a player's response
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseQuality {
    Failed,
    Poor,
    Adequate,
    Strong,
    Perfect,
}

impl ResponseQuality {
    /// Tier for a 0-100 score; scores above 100 count as 100
    pub fn from_score(score: u8) -> Self {
        match score.min(MAX_COGNITIVE_SCORE) {
            s if s >= PERFECT_THRESHOLD => ResponseQuality::Perfect,
            s if s >= STRONG_THRESHOLD => ResponseQuality::Strong,
            s if s >= ADEQUATE_THRESHOLD => ResponseQuality::Adequate,
            s if s >= POOR_THRESHOLD => ResponseQuality::Poor,
            _ => ResponseQuality::Failed,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            ResponseQuality::Perfect => PERFECT_MULTIPLIER,
            ResponseQuality::Strong => STRONG_MULTIPLIER,
            ResponseQuality::Adequate => ADEQUATE_MULTIPLIER,
            ResponseQuality::Poor => POOR_MULTIPLIER,
            ResponseQuality::Failed => FAILED_MULTIPLIER,
        }
    }

    /// Counts as a pass for non-battle encounters
    pub fn is_success(&self) -> bool {
        *self >= ResponseQuality::Adequate
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResponseQuality::Perfect => "PERFECT",
            ResponseQuality::Strong => "STRONG",
            ResponseQuality::Adequate => "ADEQUATE",
            ResponseQuality::Poor => "POOR",
            ResponseQuality::Failed => "FAILED",
        }
    }
}

/// Damage multiplier for a cognitive score
pub fn score_to_multiplier(score: u8) -> f64 {
    ResponseQuality::from_score(score).multiplier()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_values() {
        assert_eq!(score_to_multiplier(95), 2.0);
        assert_eq!(score_to_multiplier(80), 1.0);
        assert_eq!(score_to_multiplier(60), 0.5);
        assert_eq!(score_to_multiplier(40), 0.0);
        assert_eq!(score_to_multiplier(0), -0.3);
    }

    #[test]
    fn test_boundaries_are_exclusive_below() {
        assert_eq!(ResponseQuality::from_score(94), ResponseQuality::Strong);
        assert_eq!(ResponseQuality::from_score(79), ResponseQuality::Adequate);
        assert_eq!(ResponseQuality::from_score(59), ResponseQuality::Poor);
        assert_eq!(ResponseQuality::from_score(39), ResponseQuality::Failed);
    }

    #[test]
    fn test_scores_above_range_saturate() {
        assert_eq!(ResponseQuality::from_score(250), ResponseQuality::Perfect);
    }

    #[test]
    fn test_success_cutoff() {
        assert!(ResponseQuality::Adequate.is_success());
        assert!(!ResponseQuality::Poor.is_success());
    }
}
