//! Battle engine integration tests

use std::collections::BTreeMap;

use chronicle_engine::battle::*;
use chronicle_engine::catalog::{Ability, Effect, EffectType, Element, Stats, StatusKind, TargetMode};
use chronicle_engine::core::config::BattleConfig;
use chronicle_engine::core::types::ParticipantId;
use chronicle_engine::rewards::Rewards;
use proptest::prelude::*;

fn reasoned_bolt() -> Ability {
    Ability::new("reasoned_bolt", "Reasoned Bolt", 10, TargetMode::SingleEnemy, Element::Arcane)
        .with_effect(Effect::new(EffectType::Damage, 20))
}

fn combatant(id: &str, stats: Stats, abilities: Vec<Ability>) -> CombatantSpec {
    CombatantSpec {
        template_id: id.into(),
        name: id.into(),
        stats,
        abilities,
        taunt: None,
    }
}

fn duel(player_stats: Stats, enemy_stats: Stats) -> BattleSetup {
    BattleSetup {
        player: combatant("player", player_stats, vec![reasoned_bolt()]),
        allies: Vec::new(),
        enemies: vec![combatant("specter", enemy_stats, Vec::new())],
        spellbooks: BTreeMap::new(),
        active_spellbook: "initiate".into(),
        rewards: Rewards::experience(25),
        encounter_id: None,
        config: BattleConfig::default(),
        seed: 42,
    }
}

fn bolt_at(target: ParticipantId) -> BattleAction {
    BattleAction::Spell {
        ability_id: "reasoned_bolt".into(),
        target: Some(target),
    }
}

#[test]
fn test_perfect_answer_defeats_specter() {
    // Player (speed 12, 30 mana) casts a 20-damage bolt at a 30 hp specter
    // with a perfect answer: 20 x 2.0 = 40, the specter drops to 0.
    let battle = start_battle(duel(Stats::new(60, 30, 12, 10, 12), Stats::new(30, 0, 8, 10, 5)));
    assert_eq!(battle.current_turn_actor_id, ParticipantId(0));

    let next = apply_action(&battle, &bolt_at(ParticipantId(1)), 97).unwrap();
    assert_eq!(next.status, BattleStatus::PlayerVictory);
    assert_eq!(next.participant(ParticipantId(1)).unwrap().stats.health, 0);

    // 30 - 10 cost + 3 insight bonus
    assert_eq!(next.player().unwrap().stats.mana, 23);
    assert!(next
        .log
        .iter()
        .any(|e| matches!(e.event_type, BattleEventType::Defeated { participant } if participant == ParticipantId(1))));
}

#[test]
fn test_elemental_weakness_scales_damage() {
    let weak = Stats::new(100, 0, 8, 10, 5).with_weakness(Element::Arcane);
    let battle = start_battle(duel(Stats::new(60, 30, 12, 10, 12), weak));
    // STRONG: 20 x 1.0 x 1.5 = 30
    let next = apply_action(&battle, &bolt_at(ParticipantId(1)), 85).unwrap();
    assert_eq!(next.participant(ParticipantId(1)).unwrap().stats.health, 70);
}

#[test]
fn test_elemental_resistance_halves_damage() {
    let resistant = Stats::new(100, 0, 8, 10, 5).with_resistance(Element::Arcane);
    let battle = start_battle(duel(Stats::new(60, 30, 12, 10, 12), resistant));
    // STRONG: 20 x 1.0 x 0.5 = 10
    let next = apply_action(&battle, &bolt_at(ParticipantId(1)), 85).unwrap();
    assert_eq!(next.participant(ParticipantId(1)).unwrap().stats.health, 90);
}

#[test]
fn test_perfect_counter_against_spellcasting_enemy() {
    // Player 50/50 with a 20-power bolt; the enemy holds the same spell and
    // the mana to cast it, but never gets a turn.
    let mut setup = duel(Stats::new(50, 30, 12, 10, 12), Stats::new(30, 20, 8, 10, 5));
    setup.enemies[0].abilities = vec![reasoned_bolt()];
    let battle = start_battle(setup);
    assert_eq!(battle.current_turn_actor_id, ParticipantId(0));

    let next = apply_action(&battle, &bolt_at(ParticipantId(1)), 96).unwrap();
    // 30 - round(20 x 2.0), clamped at 0
    assert_eq!(next.participant(ParticipantId(1)).unwrap().stats.health, 0);
    assert_eq!(next.status, BattleStatus::PlayerVictory);
    assert_eq!(next.player().unwrap().stats.health, 50);
}

#[test]
fn test_charmed_attack_turns_on_own_side() {
    let mut setup = duel(Stats::new(60, 30, 12, 10, 12), Stats::new(200, 0, 5, 10, 5));
    setup.allies = vec![combatant("diotima", Stats::new(40, 20, 9, 8, 14), Vec::new())];
    let mut battle = start_battle(setup);
    battle
        .participant_mut(ParticipantId(0))
        .unwrap()
        .apply_status(StatusEffect::new(StatusKind::Charm, 100, Some(1)));

    let next = apply_action(&battle, &BattleAction::Attack { target: Some(ParticipantId(2)) }, 85).unwrap();
    // Strength 10 at STRONG lands on the only other party member
    assert_eq!(next.participant(ParticipantId(1)).unwrap().stats.health, 30);
    assert_eq!(next.participant(ParticipantId(2)).unwrap().stats.health, 200);
    assert!(!next.player().unwrap().has_status(StatusKind::Charm));
}

#[test]
fn test_ally_takes_turn_between_player_and_enemy() {
    let mut setup = duel(Stats::new(60, 30, 12, 10, 12), Stats::new(200, 0, 5, 10, 5));
    setup.allies = vec![combatant("diotima", Stats::new(40, 20, 9, 8, 14), Vec::new())];
    let battle = start_battle(setup);
    assert_eq!(
        battle.turn_order,
        vec![ParticipantId(0), ParticipantId(1), ParticipantId(2)]
    );

    let after_player = apply_action(&battle, &bolt_at(ParticipantId(2)), 85).unwrap();
    assert_eq!(after_player.current_turn_actor_id, ParticipantId(1));
    assert!(after_player.awaiting_player_action());

    // The ally is player-controlled but cannot switch spellbooks
    let err = apply_action(
        &after_player,
        &BattleAction::SwitchSpellbook {
            spellbook_id: "initiate".into(),
        },
        85,
    )
    .unwrap_err();
    assert_eq!(err, BattleError::PlayerOnlyAction);

    let after_ally = apply_action(&after_player, &BattleAction::Attack { target: None }, 85).unwrap();
    // Enemy acted, play is back with the player
    assert_eq!(after_ally.current_turn_actor_id, ParticipantId(0));
    assert!(after_ally.round > battle.round);
}

#[test]
fn test_rejected_action_leaves_state_untouched() {
    let battle = start_battle(duel(Stats::new(60, 5, 12, 10, 12), Stats::new(30, 0, 8, 10, 5)));
    let before = serde_json::to_string(&battle).unwrap();
    assert!(apply_action(&battle, &bolt_at(ParticipantId(1)), 90).is_err());
    assert_eq!(serde_json::to_string(&battle).unwrap(), before);
}

#[test]
fn test_player_defeat_is_terminal() {
    let battle = start_battle(duel(Stats::new(5, 0, 12, 1, 1), Stats::new(500, 0, 8, 30, 5)));
    let next = apply_action(&battle, &BattleAction::Attack { target: None }, 85).unwrap();
    assert_eq!(next.status, BattleStatus::PlayerDefeat);
    assert_eq!(
        apply_action(&next, &BattleAction::Defend, 85).unwrap_err(),
        BattleError::BattleOver
    );
}

proptest! {
    #[test]
    fn prop_quality_mapping_is_pure_and_monotonic(a in 0u8..=255, b in 0u8..=255) {
        prop_assert_eq!(score_to_multiplier(a), score_to_multiplier(a));
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(score_to_multiplier(lo) <= score_to_multiplier(hi));
        prop_assert!(ResponseQuality::from_score(lo) <= ResponseQuality::from_score(hi));
    }

    #[test]
    fn prop_non_perfect_cast_spends_exact_cost(score in 0u8..PERFECT_THRESHOLD) {
        let battle = start_battle(duel(Stats::new(60, 30, 12, 10, 12), Stats::new(300, 0, 8, 10, 5)));
        let next = apply_action(&battle, &bolt_at(ParticipantId(1)), score).unwrap();
        prop_assert_eq!(next.player().unwrap().stats.mana, 20);
    }

    #[test]
    fn prop_battle_always_terminates(scores in proptest::collection::vec(0u8..=100, 1..16)) {
        let mut battle = start_battle(duel(Stats::new(50, 0, 12, 10, 12), Stats::new(80, 0, 8, 10, 5)));
        let mut actions = 0;
        while !battle.status.is_over() {
            prop_assert!(actions < 200, "battle did not end");
            let score = scores[actions % scores.len()];
            let action = if battle.status.pending_defense().is_some() {
                BattleAction::Defend
            } else {
                BattleAction::Attack { target: None }
            };
            battle = apply_action(&battle, &action, score).unwrap();
            actions += 1;
        }
        for p in &battle.participants {
            prop_assert!(p.stats.health >= 0 && p.stats.health <= p.stats.max_health);
            prop_assert!(p.stats.mana >= 0 && p.stats.mana <= p.stats.max_mana);
        }
    }
}
