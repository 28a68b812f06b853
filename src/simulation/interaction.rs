//! Interactions between the protagonist and wild creatures
//!
//! Hunting and eating are commands issued between ticks. Creature strikes
//! and territorial encounters are resolved inside the tick.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::types::{EntityId, Gender};
use crate::entity::{AiState, BehaviorCategory, Creature, Protagonist, SocialIntent, Species, Target};
use crate::simulation::registry::EntityRegistry;

/// Result of a successful hunt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HuntReport {
    pub target: EntityId,
    pub species: Species,
    pub damage_dealt: f32,
    pub killed: bool,
    /// Damage the protagonist took from a retaliation strike
    pub retaliation: f32,
    /// State the target switched to, if it survived
    pub response: Option<AiState>,
}

/// A corpse eaten by the protagonist
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionEvent {
    pub entity: EntityId,
    pub species: Species,
    pub position: Vec3,
    pub hunger_restored: f32,
}

/// How a territorial encounter ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SocialOutcome {
    Mated,
    /// The wild tiger died
    DecisiveWin { gap: f32 },
    /// The wild tiger retreats wounded
    NarrowWin { gap: f32, wild_health_lost: f32 },
    /// The protagonist lost and took damage
    Defeat { gap: f32, damage_taken: f32 },
}

/// Decide what a territorial creature wants from the protagonist
///
/// Same gender always means a fight. Opposite gender means mating interest
/// with `mate_interest_chance`, otherwise no interest at all (`None`).
pub fn choose_social_intent<R: Rng>(
    wild: Option<Gender>,
    player: Gender,
    config: &SimulationConfig,
    rng: &mut R,
) -> Option<SocialIntent> {
    let wild = wild?;
    if wild == player {
        return Some(SocialIntent::Fight);
    }
    let chance = config.mate_interest_chance.clamp(0.0, 1.0);
    if rng.gen::<f32>() < chance {
        Some(SocialIntent::Mate)
    } else {
        None
    }
}

/// Strike the nearest huntable creature in range
///
/// `None` when nothing is in range; nothing is mutated in that case.
pub fn hunt(protagonist: &mut Protagonist, registry: &mut EntityRegistry) -> Option<HuntReport> {
    let origin = protagonist.position;
    let id = registry.nearest(origin, protagonist.attack_range.max(0.0), |c| {
        c.is_alive() && c.species.is_huntable()
    })?;
    let creature = registry.get_mut(id)?;

    let before = creature.vitals.health();
    let killed = creature.apply_damage(protagonist.attack_damage);
    let damage_dealt = before - creature.vitals.health();

    let mut report = HuntReport {
        target: id,
        species: creature.species,
        damage_dealt,
        killed,
        retaliation: 0.0,
        response: None,
    };

    if killed {
        tracing::info!(species = creature.species.name(), "hunt killed its target");
        return Some(report);
    }

    let distance = creature.position.distance(origin);
    if creature.category() == BehaviorCategory::Prey {
        if distance <= creature.sensory.attack_range {
            report.retaliation = protagonist
                .vitals
                .damage(creature.species.profile().attack_damage);
        }
        creature.transition(AiState::Fleeing);
        creature.target = Some(Target::Position(origin));
        report.response = Some(AiState::Fleeing);
    } else {
        creature.transition(AiState::Aggressive);
        creature.target = Some(Target::Protagonist);
        report.response = Some(AiState::Aggressive);
    }
    tracing::debug!(species = creature.species.name(), damage_dealt, "hunt wounded its target");
    Some(report)
}

/// Eat the nearest corpse in reach, removing it
pub fn eat(
    protagonist: &mut Protagonist,
    registry: &mut EntityRegistry,
    config: &SimulationConfig,
) -> Option<ConsumptionEvent> {
    let id = registry.nearest(protagonist.position, config.eat_range, |c| c.is_dead())?;
    let corpse = registry.remove(id)?;
    let hunger_restored = protagonist.feed(config.hunger_restore);
    tracing::info!(species = corpse.species.name(), hunger_restored, "corpse eaten");
    Some(ConsumptionEvent {
        entity: id,
        species: corpse.species,
        position: corpse.position,
        hunger_restored,
    })
}

/// Resolve a territorial creature's pending encounter with the protagonist
///
/// Only creatures with a social intent take part. The intent is consumed
/// and the social cooldown started whatever the outcome.
pub fn resolve_encounter<R: Rng>(
    protagonist: &mut Protagonist,
    creature: &mut Creature,
    config: &SimulationConfig,
    rng: &mut R,
) -> Option<SocialOutcome> {
    if creature.is_dead() {
        return None;
    }
    let intent = creature.social.take()?;
    creature.social_cooldown = config.social_cooldown;

    let outcome = match intent {
        SocialIntent::Mate => {
            creature.heal(config.mate_health_bonus);
            creature.vitals.restore_stamina(config.mate_stamina_bonus);
            protagonist.vitals.heal(config.mate_health_bonus);
            protagonist.vitals.restore_stamina(config.mate_stamina_bonus);
            protagonist.gain_experience(config.mate_experience_bonus);
            creature.transition(AiState::Friendly);
            SocialOutcome::Mated
        }
        SocialIntent::Fight => fight(protagonist, creature, config, rng),
    };
    tracing::info!(?outcome, "territorial encounter resolved");
    Some(outcome)
}

fn fight<R: Rng>(
    protagonist: &mut Protagonist,
    creature: &mut Creature,
    config: &SimulationConfig,
    rng: &mut R,
) -> SocialOutcome {
    let player_power = config.fight_player_base + config.fight_level_bonus * protagonist.level as f32;
    let jitter = if config.fight_wild_jitter > 0.0 {
        rng.gen_range(0.0..config.fight_wild_jitter)
    } else {
        0.0
    };
    let wild_power = config.fight_wild_base + jitter;
    let gap = player_power - wild_power;

    if gap > config.decisive_gap {
        creature.kill();
        protagonist.gain_experience(config.decisive_experience);
        SocialOutcome::DecisiveWin { gap }
    } else if gap > 0.0 {
        let wild_health_lost = creature.vitals.damage(creature.vitals.health() * config.retreat_health_loss);
        creature.transition(AiState::Retreating);
        creature.target = Some(Target::Protagonist);
        protagonist.gain_experience(config.narrow_experience);
        SocialOutcome::NarrowWin { gap, wild_health_lost }
    } else {
        let damage = (config.loss_damage_base + gap.abs() / 2.0).min(config.loss_damage_cap);
        let damage_taken = protagonist.vitals.damage(damage);
        creature.transition(AiState::Dominant);
        creature.target = Some(Target::Protagonist);
        SocialOutcome::Defeat { gap, damage_taken }
    }
}

/// Let an eligible creature strike the protagonist; returns damage dealt
pub fn strike_protagonist(
    creature: &mut Creature,
    protagonist: &mut Protagonist,
    config: &SimulationConfig,
) -> Option<f32> {
    if creature.attack_cooldown > 0.0 {
        return None;
    }
    let distance = creature.position.distance(protagonist.position);
    if !creature.can_attack(distance) {
        return None;
    }
    creature.attack_cooldown = config.entity_attack_cooldown;
    let damage = protagonist.vitals.damage(creature.species.profile().attack_damage);
    tracing::debug!(species = creature.species.name(), damage, "creature struck the protagonist");
    Some(damage)
}
