//! Battle engine: setup, action resolution and the enemy loop
//!
//! Each player-side action resolves in phases:
//! validate -> status tick -> quality -> resolve -> end check -> enemy turns.
//! Validation happens on the borrowed input; all mutation happens on a clone
//! that is only returned once the whole call has committed.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::battle::ai::{pick_targets, BattleAi, EnemyIntent, SimpleAi};
use crate::battle::constants::{BASIC_ATTACK_NAME, ENEMY_MULTIPLIER, PERFECT_MANA_BONUS_FRACTION};
use crate::battle::participant::{BattleParticipant, CombatantSpec, Side, StatusEffect};
use crate::battle::quality::ResponseQuality;
use crate::battle::state::{BattleEventType, BattleState, BattleStatus, PendingDefense};
use crate::battle::status::{tick_statuses, TickOutcome};
use crate::catalog::{Ability, EffectType, Element, StatKind, StatusKind, TargetMode};
use crate::core::config::BattleConfig;
use crate::core::error::BattleError;
use crate::core::types::{EncounterId, ParticipantId};
use crate::rewards::Rewards;

/// Player-side action request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleAction {
    Spell {
        ability_id: String,
        #[serde(default)]
        target: Option<ParticipantId>,
    },
    Attack {
        #[serde(default)]
        target: Option<ParticipantId>,
    },
    Defend,
    SwitchSpellbook {
        spellbook_id: String,
    },
}

/// Inputs for `start_battle`; every ability is already resolved
#[derive(Debug, Clone)]
pub struct BattleSetup {
    pub player: CombatantSpec,
    pub allies: Vec<CombatantSpec>,
    pub enemies: Vec<CombatantSpec>,
    pub spellbooks: BTreeMap<String, Vec<Ability>>,
    pub active_spellbook: String,
    pub rewards: Rewards,
    pub encounter_id: Option<EncounterId>,
    pub config: BattleConfig,
    pub seed: u64,
}

/// Validated player action, ready to resolve
enum PlannedAction {
    Cast {
        ability: Ability,
        targets: Vec<ParticipantId>,
    },
    Attack {
        target: ParticipantId,
    },
    Defend,
    Switch {
        spellbook_id: String,
    },
}

// ===== SETUP =====

/// Build the initial battle state
///
/// If the fastest participant is an enemy, its taunt becomes the pending
/// prompt and enemy turns run until a player-side participant is up.
pub fn start_battle(setup: BattleSetup) -> BattleState {
    start_battle_with(setup, &SimpleAi)
}

pub fn start_battle_with<A: BattleAi>(setup: BattleSetup, ai: &A) -> BattleState {
    let mut participants = Vec::with_capacity(1 + setup.allies.len() + setup.enemies.len());
    participants.push(BattleParticipant::from_spec(ParticipantId(0), setup.player, true, false));

    let mut next_id = 1;
    for ally in setup.allies {
        participants.push(BattleParticipant::from_spec(ParticipantId(next_id), ally, false, true));
        next_id += 1;
    }
    for enemy in setup.enemies {
        participants.push(BattleParticipant::from_spec(ParticipantId(next_id), enemy, false, false));
        next_id += 1;
    }

    // Stable sort keeps player, then allies, then enemies on speed ties
    let mut order: Vec<&BattleParticipant> = participants.iter().collect();
    order.sort_by(|a, b| b.stats.speed.cmp(&a.stats.speed));
    let turn_order: Vec<ParticipantId> = order.iter().map(|p| p.id).collect();
    let first = turn_order.first().copied().unwrap_or(ParticipantId(0));

    let enemy_names: Vec<String> = participants
        .iter()
        .filter(|p| p.side() == Side::Enemies)
        .map(|p| p.name.clone())
        .collect();

    let mut state = BattleState {
        participants,
        turn_order,
        turn_index: 0,
        current_turn_actor_id: first,
        status: BattleStatus::ongoing(),
        round: 1,
        log: Vec::new(),
        pending_prompt: None,
        encounter_id: setup.encounter_id,
        spellbooks: setup.spellbooks,
        active_spellbook: setup.active_spellbook,
        rewards: setup.rewards,
        config: setup.config,
        rng: ChaCha8Rng::seed_from_u64(setup.seed),
    };

    state.log_event(
        BattleEventType::BattleStarted,
        format!("Battle begins against {}", enemy_names.join(", ")),
    );

    if state.check_battle_end() {
        return state;
    }
    if !state.current_actor().is_some_and(|a| a.is_alive()) && !state.advance_turn() {
        state.check_battle_end();
        return state;
    }

    if let Some(actor) = state.current_actor() {
        if actor.side() == Side::Enemies {
            if let Some(taunt) = actor.taunt.clone() {
                let line = format!("{}: \"{}\"", actor.name, taunt);
                push_prompt(&mut state, line);
            }
            run_enemy_turns(&mut state, ai);
        }
    }

    state
}

// ===== PLAYER ACTIONS =====

/// Resolve one player-side action with the default AI
pub fn apply_action(
    battle: &BattleState,
    action: &BattleAction,
    cognitive_score: u8,
) -> Result<BattleState, BattleError> {
    apply_action_with(battle, action, cognitive_score, &SimpleAi)
}

/// Resolve one player-side action
///
/// Rejected actions return an error and leave `battle` untouched.
pub fn apply_action_with<A: BattleAi>(
    battle: &BattleState,
    action: &BattleAction,
    cognitive_score: u8,
    ai: &A,
) -> Result<BattleState, BattleError> {
    if battle.status.is_over() {
        return Err(BattleError::BattleOver);
    }

    if let Some(pending) = battle.status.pending_defense() {
        return match action {
            BattleAction::Defend => {
                let mut next = battle.clone();
                resolve_defense(&mut next, pending.clone(), cognitive_score, ai);
                Ok(next)
            }
            _ => Err(BattleError::DefenseRequired),
        };
    }

    let actor = battle.current_actor().ok_or(BattleError::BattleOver)?;
    if actor.side() != Side::Party || !actor.is_alive() {
        return Err(BattleError::NotPlayerTurn(actor.id));
    }

    let plan = validate_action(battle, actor, action)?;
    let actor_id = actor.id;

    let mut next = battle.clone();
    next.pending_prompt = None;
    resolve_party_turn(&mut next, actor_id, plan, cognitive_score);
    finish_turn(&mut next, ai);
    Ok(next)
}

fn validate_action(
    battle: &BattleState,
    actor: &BattleParticipant,
    action: &BattleAction,
) -> Result<PlannedAction, BattleError> {
    match action {
        BattleAction::Spell { ability_id, target } => {
            let ability = actor
                .ability(ability_id)
                .ok_or_else(|| BattleError::UnknownAbility(ability_id.clone()))?;
            if ability.mana_cost > actor.stats.mana {
                return Err(BattleError::InsufficientMana {
                    required: ability.mana_cost,
                    available: actor.stats.mana,
                });
            }
            let targets = explicit_targets(battle, actor, ability.target, *target, &ability.name)?;
            Ok(PlannedAction::Cast {
                ability: ability.clone(),
                targets,
            })
        }
        BattleAction::Attack { target } => {
            let targets =
                explicit_targets(battle, actor, TargetMode::SingleEnemy, *target, BASIC_ATTACK_NAME)?;
            let target = targets
                .first()
                .copied()
                .ok_or_else(|| BattleError::NoValidTarget(BASIC_ATTACK_NAME.into()))?;
            Ok(PlannedAction::Attack { target })
        }
        BattleAction::Defend => Ok(PlannedAction::Defend),
        BattleAction::SwitchSpellbook { spellbook_id } => {
            if !actor.is_player {
                return Err(BattleError::PlayerOnlyAction);
            }
            if !battle.spellbooks.contains_key(spellbook_id) {
                return Err(BattleError::UnknownSpellbook(spellbook_id.clone()));
            }
            Ok(PlannedAction::Switch {
                spellbook_id: spellbook_id.clone(),
            })
        }
    }
}

/// Targets for a player-chosen action; explicit targets must be valid
fn explicit_targets(
    battle: &BattleState,
    actor: &BattleParticipant,
    mode: TargetMode,
    explicit: Option<ParticipantId>,
    action_name: &str,
) -> Result<Vec<ParticipantId>, BattleError> {
    let side = if mode.is_hostile() {
        actor.side().opposite()
    } else {
        actor.side()
    };

    let targets = match mode {
        TargetMode::SelfOnly => vec![actor.id],
        TargetMode::SingleEnemy | TargetMode::SingleAlly => match explicit {
            Some(id) => {
                let valid = battle
                    .participant(id)
                    .is_some_and(|p| p.is_alive() && p.side() == side);
                if !valid {
                    return Err(BattleError::UnknownTarget(id));
                }
                vec![id]
            }
            None if mode == TargetMode::SingleAlly => vec![actor.id],
            None => battle.living_on(side).into_iter().take(1).collect(),
        },
        TargetMode::AllEnemies | TargetMode::AllAllies => battle.living_on(side),
    };

    if targets.is_empty() {
        return Err(BattleError::NoValidTarget(action_name.to_string()));
    }
    Ok(targets)
}

fn resolve_party_turn(
    state: &mut BattleState,
    actor_id: ParticipantId,
    plan: PlannedAction,
    cognitive_score: u8,
) {
    let tick = tick_actor(state, actor_id);
    if !is_alive(state, actor_id) || tick.skipped {
        return;
    }

    let quality = ResponseQuality::from_score(cognitive_score);
    let multiplier = quality.multiplier();
    let actor_name = name_of(state, actor_id);
    let mut earns_bonus = true;

    match plan {
        PlannedAction::Cast { ability, targets } => {
            if let Some(actor) = state.participant_mut(actor_id) {
                actor.spend_mana(ability.mana_cost);
            }
            let targets = if tick.charmed && ability.target.is_hostile() {
                charm_targets(state, actor_id, ability.target)
            } else {
                targets
            };

            if multiplier < 0.0 {
                let power = if ability.deals_damage() {
                    ability.damage_power()
                } else {
                    ability.mana_cost
                };
                backfire(state, actor_id, power, multiplier, &ability.name);
            } else if multiplier == 0.0 {
                state.log_event(
                    BattleEventType::Action { actor: actor_id },
                    format!("{}'s {} fizzles ({})", actor_name, ability.name, quality.label()),
                );
            } else {
                state.log_event(
                    BattleEventType::Action { actor: actor_id },
                    format!("{} casts {} ({})", actor_name, ability.name, quality.label()),
                );
                apply_effects(state, actor_id, &ability, &targets, multiplier, None);
            }
        }
        PlannedAction::Attack { target } => {
            let target = if tick.charmed {
                charm_targets(state, actor_id, TargetMode::SingleEnemy)
                    .first()
                    .copied()
                    .unwrap_or(target)
            } else {
                target
            };

            if multiplier < 0.0 {
                let strength = strength_of(state, actor_id);
                backfire(state, actor_id, strength, multiplier, BASIC_ATTACK_NAME);
            } else if multiplier == 0.0 {
                state.log_event(
                    BattleEventType::Action { actor: actor_id },
                    format!("{}'s strike goes wide ({})", actor_name, quality.label()),
                );
            } else {
                basic_attack(state, actor_id, target, multiplier, 0);
            }
        }
        PlannedAction::Defend => {
            let reduction = defend_reduction(&state.config, multiplier);
            if reduction > 0 {
                if let Some(actor) = state.participant_mut(actor_id) {
                    actor.apply_status(StatusEffect::new(StatusKind::Guard, reduction, Some(1)));
                }
                state.log_event(
                    BattleEventType::Action { actor: actor_id },
                    format!("{} braces, guarding {}% ({})", actor_name, reduction, quality.label()),
                );
            } else {
                state.log_event(
                    BattleEventType::Action { actor: actor_id },
                    format!("{} fumbles the guard ({})", actor_name, quality.label()),
                );
            }
        }
        PlannedAction::Switch { spellbook_id } => {
            earns_bonus = false;
            let abilities = state.spellbooks.get(&spellbook_id).cloned().unwrap_or_default();
            if let Some(actor) = state.participant_mut(actor_id) {
                actor.abilities = abilities;
            }
            state.log_event(
                BattleEventType::Action { actor: actor_id },
                format!("{} opens the {} spellbook", actor_name, spellbook_id),
            );
            state.active_spellbook = spellbook_id;
        }
    }

    if earns_bonus && quality == ResponseQuality::Perfect {
        perfect_bonus(state, actor_id);
    }
}

/// Guard percent granted by a defense at the given multiplier
fn defend_reduction(config: &BattleConfig, multiplier: f64) -> i32 {
    if multiplier <= 0.0 {
        return 0;
    }
    let reduction = (config.defend_base_reduction as f64 * multiplier).round() as i32;
    reduction.clamp(0, config.guard_cap)
}

fn perfect_bonus(state: &mut BattleState, actor_id: ParticipantId) {
    let Some(actor) = state.participant_mut(actor_id) else {
        return;
    };
    if !actor.is_alive() {
        return;
    }
    let bonus = ((actor.stats.max_mana as f64 * PERFECT_MANA_BONUS_FRACTION).round() as i32).max(1);
    let restored = actor.restore_mana(bonus);
    let message = format!("{}'s insight restores {} mana", actor.name, restored);
    state.log_event(BattleEventType::Action { actor: actor_id }, message);
}

// ===== DEFENSE PROMPT =====

fn resolve_defense<A: BattleAi>(
    state: &mut BattleState,
    pending: PendingDefense,
    cognitive_score: u8,
    ai: &A,
) {
    let quality = ResponseQuality::from_score(cognitive_score);
    let reduction = defend_reduction(&state.config, quality.multiplier());
    let defender_name = name_of(state, pending.defender);

    state.status = BattleStatus::ongoing();
    state.pending_prompt = None;
    state.log_event(
        BattleEventType::Action {
            actor: pending.defender,
        },
        format!("{} defends ({}), blocking {}%", defender_name, quality.label(), reduction),
    );

    let attacker = state
        .participant(pending.attacker)
        .filter(|p| p.is_alive())
        .and_then(|p| p.ability(&pending.ability_id).cloned());

    if let Some(ability) = attacker {
        let targets = match ability.target {
            TargetMode::AllEnemies => state.living_on(Side::Party),
            _ => vec![pending.defender],
        };
        if let Some(attacker) = state.participant_mut(pending.attacker) {
            attacker.spend_mana(ability.mana_cost);
        }
        let attacker_name = name_of(state, pending.attacker);
        state.log_event(
            BattleEventType::Action {
                actor: pending.attacker,
            },
            format!("{} unleashes {}", attacker_name, ability.name),
        );
        apply_effects(
            state,
            pending.attacker,
            &ability,
            &targets,
            ENEMY_MULTIPLIER,
            Some((pending.defender, reduction)),
        );
    }

    if quality == ResponseQuality::Perfect {
        perfect_bonus(state, pending.defender);
    }

    finish_turn(state, ai);
}

// ===== TURN FLOW =====

fn finish_turn<A: BattleAi>(state: &mut BattleState, ai: &A) {
    if state.check_battle_end() {
        return;
    }
    if !state.advance_turn() {
        state.check_battle_end();
        return;
    }
    run_enemy_turns(state, ai);
}

/// Resolve enemy turns until a player-side participant is up
fn run_enemy_turns<A: BattleAi>(state: &mut BattleState, ai: &A) {
    for _ in 0..state.config.max_enemy_turns {
        if state.status.is_over() || state.status.pending_defense().is_some() {
            return;
        }
        let Some(actor) = state.current_actor() else {
            state.check_battle_end();
            return;
        };
        if actor.side() == Side::Party {
            return;
        }

        let actor_id = actor.id;
        enemy_turn(state, actor_id, ai);

        if state.status.pending_defense().is_some() || state.check_battle_end() {
            return;
        }
        if !state.advance_turn() {
            state.check_battle_end();
            return;
        }
    }
    tracing::warn!(
        "Enemy loop stopped after {} turns without reaching the party",
        state.config.max_enemy_turns
    );
}

fn enemy_turn<A: BattleAi>(state: &mut BattleState, actor_id: ParticipantId, ai: &A) {
    let tick = tick_actor(state, actor_id);
    if !is_alive(state, actor_id) || tick.skipped {
        return;
    }

    let mut rng = state.rng.clone();
    let intent = match state.participant(actor_id) {
        Some(actor) => ai.choose_action(state, actor, tick.charmed, &mut rng),
        None => EnemyIntent::Wait,
    };
    state.rng = rng;
    let actor_name = name_of(state, actor_id);

    match intent {
        EnemyIntent::Cast { ability, targets } => {
            let player_id = state.player().filter(|p| p.is_alive()).map(|p| p.id);
            let threatens_player = !tick.charmed
                && ability.deals_damage()
                && ability.target.is_hostile()
                && player_id.is_some_and(|pid| targets.contains(&pid));

            if let (true, Some(defender)) = (threatens_player, player_id) {
                state.status = BattleStatus::Ongoing {
                    awaiting_defense: Some(PendingDefense {
                        defender,
                        attacker: actor_id,
                        ability_id: ability.id.clone(),
                    }),
                };
                let prompt = format!(
                    "{} readies {}! Defend yourself: {}",
                    actor_name,
                    ability.name,
                    defense_challenge(&ability)
                );
                push_prompt(state, prompt.clone());
                state.log_event(BattleEventType::DefensePrompt { defender }, prompt);
                return;
            }

            if let Some(actor) = state.participant_mut(actor_id) {
                actor.spend_mana(ability.mana_cost);
            }
            state.log_event(
                BattleEventType::Action { actor: actor_id },
                format!("{} casts {}", actor_name, ability.name),
            );
            apply_effects(state, actor_id, &ability, &targets, ENEMY_MULTIPLIER, None);
        }
        EnemyIntent::Attack { target } => {
            basic_attack(state, actor_id, target, ENEMY_MULTIPLIER, 0);
        }
        EnemyIntent::Wait => {
            state.log_event(
                BattleEventType::Action { actor: actor_id },
                format!("{} hesitates", actor_name),
            );
        }
    }
}

fn defense_challenge(ability: &Ability) -> String {
    if ability.description.is_empty() {
        format!("counter the {} with a clear argument.", ability.name)
    } else {
        format!("{}. Counter it with a clear argument.", ability.description)
    }
}

// ===== RESOLUTION HELPERS =====

fn is_alive(state: &BattleState, id: ParticipantId) -> bool {
    state.participant(id).is_some_and(|p| p.is_alive())
}

fn name_of(state: &BattleState, id: ParticipantId) -> String {
    state
        .participant(id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn strength_of(state: &BattleState, id: ParticipantId) -> i32 {
    state
        .participant(id)
        .map(|p| p.effective_stat(StatKind::Strength))
        .unwrap_or(0)
}

fn push_prompt(state: &mut BattleState, line: String) {
    state.pending_prompt = Some(match state.pending_prompt.take() {
        Some(existing) => format!("{}\n{}", existing, line),
        None => line,
    });
}

fn tick_actor(state: &mut BattleState, actor_id: ParticipantId) -> TickOutcome {
    let Some(actor) = state.participants.iter_mut().find(|p| p.id == actor_id) else {
        return TickOutcome::default();
    };
    let outcome = tick_statuses(actor, &mut state.rng);
    let died = !actor.is_alive();
    let name = actor.name.clone();

    for message in &outcome.messages {
        state.log_event(
            BattleEventType::StatusTick {
                participant: actor_id,
            },
            message.clone(),
        );
    }
    if died {
        state.log_event(
            BattleEventType::Defeated {
                participant: actor_id,
            },
            format!("{} succumbs", name),
        );
    } else if outcome.skipped {
        state.log_event(
            BattleEventType::TurnSkipped {
                participant: actor_id,
            },
            format!("{} cannot act", name),
        );
    }
    outcome
}

fn charm_targets(state: &mut BattleState, actor_id: ParticipantId, mode: TargetMode) -> Vec<ParticipantId> {
    let mut rng = state.rng.clone();
    let targets = match state.participant(actor_id) {
        Some(actor) => pick_targets(state, actor, mode, true, &mut rng),
        None => Vec::new(),
    };
    state.rng = rng;
    targets
}

/// Final damage after elemental scaling and guard reduction
fn mitigated_damage(
    target: &BattleParticipant,
    value: f64,
    element: Element,
    extra_reduction: i32,
    guard_cap: i32,
) -> i32 {
    let raw = (value * target.stats.elemental_factor(element)).round() as i32;
    let reduction = (target.guard_percent(guard_cap) + extra_reduction).clamp(0, guard_cap);
    ((raw as f64) * f64::from(100 - reduction) / 100.0).round() as i32
}

fn backfire(state: &mut BattleState, actor_id: ParticipantId, power: i32, multiplier: f64, what: &str) {
    let damage = (power.max(0) as f64 * -multiplier).round() as i32;
    let Some(actor) = state.participant_mut(actor_id) else {
        return;
    };
    let dealt = actor.take_damage(damage);
    let died = !actor.is_alive();
    let name = actor.name.clone();
    state.log_event(
        BattleEventType::Action { actor: actor_id },
        format!("{}'s {} backfires for {} damage (FAILED)", name, what, dealt),
    );
    if died {
        state.log_event(
            BattleEventType::Defeated {
                participant: actor_id,
            },
            format!("{} is undone by their own confusion", name),
        );
    }
}

fn basic_attack(
    state: &mut BattleState,
    attacker_id: ParticipantId,
    target_id: ParticipantId,
    multiplier: f64,
    extra_reduction: i32,
) {
    let strength = strength_of(state, attacker_id);
    let attacker_name = name_of(state, attacker_id);
    let guard_cap = state.config.guard_cap;

    let Some(target) = state.participant_mut(target_id) else {
        return;
    };
    if !target.is_alive() {
        return;
    }
    let damage = mitigated_damage(
        target,
        strength as f64 * multiplier,
        Element::Physical,
        extra_reduction,
        guard_cap,
    );
    let dealt = target.take_damage(damage);
    let died = !target.is_alive();
    let target_name = target.name.clone();

    state.log_event(
        BattleEventType::Action { actor: attacker_id },
        format!("{} strikes {} for {} damage", attacker_name, target_name, dealt),
    );
    if died {
        state.log_event(
            BattleEventType::Defeated {
                participant: target_id,
            },
            format!("{} falls", target_name),
        );
    }
}

/// Apply an ability's effects to each living target
///
/// `defense` adds a one-off reduction for a single participant (forced
/// defense against an enemy spell).
fn apply_effects(
    state: &mut BattleState,
    caster_id: ParticipantId,
    ability: &Ability,
    targets: &[ParticipantId],
    multiplier: f64,
    defense: Option<(ParticipantId, i32)>,
) {
    let guard_cap = state.config.guard_cap;
    let mut lines = Vec::new();
    let mut fallen = Vec::new();

    for &target_id in targets {
        let Some(target) = state.participant_mut(target_id) else {
            continue;
        };
        if !target.is_alive() {
            continue;
        }

        let extra = defense
            .filter(|(id, _)| *id == target_id)
            .map(|(_, r)| r)
            .unwrap_or(0);
        let mut parts = Vec::new();

        for effect in &ability.effects {
            let value = if effect.effect_type.scales_with_quality() {
                (effect.value as f64 * multiplier).round() as i32
            } else {
                effect.value
            };
            match effect.effect_type {
                EffectType::Damage => {
                    let damage = mitigated_damage(
                        target,
                        effect.value as f64 * multiplier,
                        ability.element,
                        extra,
                        guard_cap,
                    );
                    parts.push(format!("{} damage", target.take_damage(damage)));
                }
                EffectType::Heal => {
                    parts.push(format!("+{} health", target.heal(value)));
                }
                EffectType::RestoreMana => {
                    parts.push(format!("+{} mana", target.restore_mana(value)));
                }
                EffectType::Shield => {
                    let value = value.clamp(0, guard_cap);
                    target.apply_status(StatusEffect::new(
                        StatusKind::Guard,
                        value,
                        effect.duration.or(Some(1)),
                    ));
                    parts.push(format!("guard {}%", value));
                }
                EffectType::Boost(stat) => {
                    target.apply_status(StatusEffect::new(
                        StatusKind::Boost(stat),
                        value,
                        effect.duration,
                    ));
                    parts.push(format!("{:?} up", stat));
                }
                EffectType::Drain(stat) => {
                    target.apply_status(StatusEffect::new(
                        StatusKind::Drain(stat),
                        value,
                        effect.duration,
                    ));
                    parts.push(format!("{:?} down", stat));
                }
                EffectType::Inflict(kind) => {
                    target.apply_status(StatusEffect::new(kind, value, effect.duration));
                    parts.push(format!("{:?}", kind));
                }
            }
            if !target.is_alive() {
                break;
            }
        }

        lines.push(format!("{} -> {}: {}", ability.name, target.name, parts.join(", ")));
        if !target.is_alive() {
            fallen.push((target_id, target.name.clone()));
        }
    }

    for line in lines {
        state.log_event(BattleEventType::Action { actor: caster_id }, line);
    }
    for (id, name) in fallen {
        state.log_event(BattleEventType::Defeated { participant: id }, format!("{} falls", name));
    }
}
