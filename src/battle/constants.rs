//! Battle constants - fixed values that are not part of `ChronicleConfig`
//!
//! Response-quality thresholds are fixed so a given cognitive score always
//! means the same thing in combat.

// Cognitive score thresholds (inclusive lower bounds)
pub const PERFECT_THRESHOLD: u8 = 95;
pub const STRONG_THRESHOLD: u8 = 80;
pub const ADEQUATE_THRESHOLD: u8 = 60;
pub const POOR_THRESHOLD: u8 = 40;

// Damage multipliers per quality tier
pub const PERFECT_MULTIPLIER: f64 = 2.0;
pub const STRONG_MULTIPLIER: f64 = 1.0;
pub const ADEQUATE_MULTIPLIER: f64 = 0.5;
pub const POOR_MULTIPLIER: f64 = 0.0;
pub const FAILED_MULTIPLIER: f64 = -0.3;

/// Highest score a scorer may report
pub const MAX_COGNITIVE_SCORE: u8 = 100;

/// PERFECT responses refund this fraction of max mana (at least 1)
pub const PERFECT_MANA_BONUS_FRACTION: f64 = 0.10;

/// Enemy actions resolve at STRONG quality
pub const ENEMY_MULTIPLIER: f64 = STRONG_MULTIPLIER;

/// Basic attacks are physical and scale with strength
pub const BASIC_ATTACK_NAME: &str = "Strike";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_strictly_descending() {
        assert!(PERFECT_THRESHOLD > STRONG_THRESHOLD);
        assert!(STRONG_THRESHOLD > ADEQUATE_THRESHOLD);
        assert!(ADEQUATE_THRESHOLD > POOR_THRESHOLD);
        assert!(PERFECT_THRESHOLD <= MAX_COGNITIVE_SCORE);
    }

    #[test]
    fn test_multipliers_descending() {
        assert!(PERFECT_MULTIPLIER > STRONG_MULTIPLIER);
        assert!(STRONG_MULTIPLIER > ADEQUATE_MULTIPLIER);
        assert!(ADEQUATE_MULTIPLIER > POOR_MULTIPLIER);
        assert!(POOR_MULTIPLIER > FAILED_MULTIPLIER);
    }
}
