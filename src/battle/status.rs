//! Start-of-turn status ticking
//!
//! Order per tick: damage over time, regeneration, incapacitation roll,
//! charm roll, then duration decrement and pruning.

use rand::Rng;

use crate::battle::participant::BattleParticipant;
use crate::catalog::StatusKind;

/// What the tick did to the acting participant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub damage_taken: i32,
    pub healed: i32,
    /// Turn is lost to sleep/paralysis/frozen
    pub skipped: bool,
    /// Hostile action turns against the actor's own side
    pub charmed: bool,
    pub messages: Vec<String>,
}

/// Chance in `[0, 1]` for a magnitude-proportional status roll
fn status_chance(value: i32) -> f64 {
    (value as f64 / 100.0).clamp(0.0, 1.0)
}

/// Tick `participant`'s statuses in place
pub fn tick_statuses<R: Rng>(participant: &mut BattleParticipant, rng: &mut R) -> TickOutcome {
    let mut outcome = TickOutcome::default();

    // Damage over time lands before anything else
    let dot: i32 = participant
        .statuses
        .iter()
        .filter(|s| s.kind.is_damage_over_time())
        .map(|s| s.value.max(0))
        .sum();
    if dot > 0 {
        outcome.damage_taken = participant.take_damage(dot);
        outcome
            .messages
            .push(format!("{} suffers {} damage over time", participant.name, outcome.damage_taken));
    }

    let regen: i32 = participant
        .statuses
        .iter()
        .filter(|s| s.kind == StatusKind::Regeneration)
        .map(|s| s.value.max(0))
        .sum();
    if regen > 0 && participant.is_alive() {
        outcome.healed = participant.heal(regen);
        if outcome.healed > 0 {
            outcome
                .messages
                .push(format!("{} regenerates {} health", participant.name, outcome.healed));
        }
    }

    if participant.is_alive() {
        for status in participant.statuses.iter().filter(|s| s.kind.is_incapacitating()) {
            if rng.gen::<f64>() < status_chance(status.value) {
                outcome.skipped = true;
                outcome
                    .messages
                    .push(format!("{} is {:?} and loses the turn", participant.name, status.kind));
                break;
            }
        }

        if !outcome.skipped {
            if let Some(charm) = participant.statuses.iter().find(|s| s.kind == StatusKind::Charm) {
                if rng.gen::<f64>() < status_chance(charm.value) {
                    outcome.charmed = true;
                    outcome
                        .messages
                        .push(format!("{} is charmed and turns on their allies", participant.name));
                }
            }
        }
    }

    // Finite durations tick down; expired effects drop off
    for status in participant.statuses.iter_mut() {
        if let Some(remaining) = status.duration.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
    }
    participant.statuses.retain(|s| s.duration != Some(0));

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::participant::{CombatantSpec, StatusEffect};
    use crate::catalog::Stats;
    use crate::core::types::ParticipantId;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn participant() -> BattleParticipant {
        BattleParticipant::from_spec(
            ParticipantId(1),
            CombatantSpec {
                template_id: "dummy".into(),
                name: "Dummy".into(),
                stats: Stats::new(40, 10, 5, 5, 5),
                abilities: Vec::new(),
                taunt: None,
            },
            false,
            false,
        )
    }

    #[test]
    fn test_poison_ticks_and_expires() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut p = participant();
        p.apply_status(StatusEffect::new(StatusKind::Poison, 4, Some(2)));

        let first = tick_statuses(&mut p, &mut rng);
        assert_eq!(first.damage_taken, 4);
        assert_eq!(p.stats.health, 36);

        tick_statuses(&mut p, &mut rng);
        assert_eq!(p.stats.health, 32);
        assert!(p.statuses.is_empty());
    }

    #[test]
    fn test_certain_sleep_skips_turn() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut p = participant();
        p.apply_status(StatusEffect::new(StatusKind::Sleep, 100, Some(1)));
        let outcome = tick_statuses(&mut p, &mut rng);
        assert!(outcome.skipped);
        assert!(p.statuses.is_empty());
    }

    #[test]
    fn test_zero_magnitude_never_skips() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let mut p = participant();
            p.apply_status(StatusEffect::new(StatusKind::Paralysis, 0, Some(1)));
            assert!(!tick_statuses(&mut p, &mut rng).skipped);
        }
    }

    #[test]
    fn test_indefinite_status_persists() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut p = participant();
        p.apply_status(StatusEffect::new(StatusKind::Guard, 20, None));
        for _ in 0..5 {
            tick_statuses(&mut p, &mut rng);
        }
        assert!(p.has_status(StatusKind::Guard));
    }
}
