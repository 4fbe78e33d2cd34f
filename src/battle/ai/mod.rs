//! Enemy AI for battle decision-making
//!
//! The `BattleAi` trait keeps the engine independent of how enemies choose;
//! `SimpleAi` is the default: a random affordable ability against a random
//! opposing target, otherwise a basic attack.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::battle::participant::{BattleParticipant, Side};
use crate::battle::state::BattleState;
use crate::catalog::{Ability, TargetMode};
use crate::core::types::ParticipantId;

/// What an enemy decided to do this turn
#[derive(Debug, Clone, PartialEq)]
pub enum EnemyIntent {
    Cast {
        ability: Ability,
        targets: Vec<ParticipantId>,
    },
    Attack {
        target: ParticipantId,
    },
    /// Nobody to act against
    Wait,
}

/// Trait for battle AI implementations
pub trait BattleAi {
    /// Pick an action for `actor`; `charmed` flips hostile targeting
    fn choose_action<R: Rng>(
        &self,
        battle: &BattleState,
        actor: &BattleParticipant,
        charmed: bool,
        rng: &mut R,
    ) -> EnemyIntent;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleAi;

impl BattleAi for SimpleAi {
    fn choose_action<R: Rng>(
        &self,
        battle: &BattleState,
        actor: &BattleParticipant,
        charmed: bool,
        rng: &mut R,
    ) -> EnemyIntent {
        let affordable: Vec<&Ability> = actor
            .abilities
            .iter()
            .filter(|a| a.mana_cost <= actor.stats.mana)
            .collect();

        if let Some(ability) = affordable.choose(rng) {
            let targets = pick_targets(battle, actor, ability.target, charmed, rng);
            if !targets.is_empty() {
                return EnemyIntent::Cast {
                    ability: (*ability).clone(),
                    targets,
                };
            }
        }

        match pick_targets(battle, actor, TargetMode::SingleEnemy, charmed, rng).first() {
            Some(&target) => EnemyIntent::Attack { target },
            None => EnemyIntent::Wait,
        }
    }
}

/// Random target selection relative to the actor's side
pub fn pick_targets<R: Rng>(
    battle: &BattleState,
    actor: &BattleParticipant,
    mode: TargetMode,
    charmed: bool,
    rng: &mut R,
) -> Vec<ParticipantId> {
    let own = actor.side();
    let hostile_side = if charmed { own } else { own.opposite() };

    match mode {
        TargetMode::SelfOnly => vec![actor.id],
        TargetMode::SingleEnemy => {
            let pool = hostile_pool(battle, actor, hostile_side);
            pool.choose(rng).copied().into_iter().collect()
        }
        TargetMode::AllEnemies => hostile_pool(battle, actor, hostile_side),
        TargetMode::SingleAlly => battle.living_on(own).choose(rng).copied().into_iter().collect(),
        TargetMode::AllAllies => battle.living_on(own),
    }
}

/// Living targets on `side`; a charmed actor avoids itself when it can
fn hostile_pool(battle: &BattleState, actor: &BattleParticipant, side: Side) -> Vec<ParticipantId> {
    let living = battle.living_on(side);
    if side == actor.side() {
        let others: Vec<ParticipantId> = living.iter().copied().filter(|id| *id != actor.id).collect();
        if !others.is_empty() {
            return others;
        }
    }
    living
}
