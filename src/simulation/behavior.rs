//! Behavior state machines
//!
//! Every creature runs one finite-state machine per tick. Species pick one of
//! three behavior variants over the shared creature record:
//!
//! - `Herd` (rabbit, boar, wolf): idle/grazing/moving with flee or attack overrides
//! - `Flock` (deer): wandering with flock cohesion, alert levels and social alarm
//! - `Territorial` (tiger): wandering that routes detection into social encounters
//!
//! Detection overrides are checked before any timeout transition.

use ahash::AHashMap;
use glam::Vec3;
use rand::Rng;

use crate::core::config::SimulationConfig;
use crate::core::types::{planar_direction, planar_distance, yaw_from_direction, EntityId};
use crate::entity::{
    AiState, BehaviorCategory, Creature, MovementIntent, Pace, PhysicalState, Protagonist, Species,
    Target,
};
use crate::simulation::detection::Detection;
use crate::simulation::interaction::choose_social_intent;
use crate::world::Environment;

const IDLE_MIN_TIME: f32 = 1.0;
const GRAZE_TIME: f32 = 3.0;
const MOVE_TIME: f32 = 3.0;
const ALERT_TIME: f32 = 1.0;
const FLEE_TIME: f32 = 4.0;
const AGGRESSION_TIME: f32 = 2.0;

const TIGER_IDLE_TIME: f32 = 2.0;
const TIGER_WANDER_TIME: f32 = 6.0;
const APPROACH_GIVE_UP_TIME: f32 = 8.0;
const RETREAT_TIME: f32 = 6.0;
const DOMINANT_TIME: f32 = 5.0;
const FRIENDLY_TIME: f32 = 10.0;

/// Wander targets are picked this far from the current position
const WANDER_MIN: f32 = 5.0;
const WANDER_MAX: f32 = 15.0;
/// Close enough to a movement target to stop
const ARRIVAL_DISTANCE: f32 = 1.0;
/// Angular frequency of the zig-zag of a panicked deer
const ZIGZAG_RATE: f32 = 4.0;
const ZIGZAG_AMPLITUDE: f32 = 0.5;

/// Behavior variant selected by species
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeciesBehavior {
    Herd,
    Flock,
    Territorial,
}

impl SpeciesBehavior {
    pub fn of(species: Species) -> Self {
        match species {
            Species::Deer => SpeciesBehavior::Flock,
            Species::Tiger => SpeciesBehavior::Territorial,
            Species::Rabbit | Species::Boar | Species::Wolf => SpeciesBehavior::Herd,
        }
    }

    /// Detection radius for this creature right now
    ///
    /// Never larger than the creature's base sensory radius: a grazing deer
    /// has its head down, and a tiger that just had an encounter is not
    /// looking for another one.
    pub fn detection_radius(&self, creature: &Creature) -> f32 {
        let base = creature.sensory.detection_radius.max(0.0);
        match self {
            SpeciesBehavior::Herd => base,
            SpeciesBehavior::Flock => {
                if creature.ai() == AiState::Grazing {
                    base * 0.8
                } else {
                    base
                }
            }
            SpeciesBehavior::Territorial => {
                if creature.social_cooldown > 0.0 {
                    base * 0.5
                } else {
                    base
                }
            }
        }
    }

    /// Run detection overrides, then timeout transitions
    pub fn advance_state<R: Rng>(
        &self,
        creature: &mut Creature,
        ctx: &BehaviorContext,
        rng: &mut R,
    ) -> StateOutcome {
        let before = creature.ai();
        let mut outcome = StateOutcome::default();
        match self {
            SpeciesBehavior::Herd => advance_herd(creature, ctx, rng),
            SpeciesBehavior::Flock => advance_flock(creature, ctx, rng, &mut outcome),
            SpeciesBehavior::Territorial => advance_territorial(creature, ctx, rng),
        }
        if creature.ai() != before {
            outcome.changed = Some((before, creature.ai()));
        }
        outcome
    }

    /// Desired motion for the current state
    pub fn movement_intent(&self, creature: &Creature, ctx: &BehaviorContext) -> MovementIntent {
        let threat = ctx.protagonist.position;
        match creature.ai() {
            AiState::Idle | AiState::Grazing => MovementIntent::still(),
            AiState::Alert | AiState::Dominant | AiState::Friendly => {
                MovementIntent::watch(resolve_target(creature, ctx).unwrap_or(threat))
            }
            AiState::Moving | AiState::Wandering => self.wander_intent(creature, ctx),
            AiState::Fleeing => {
                let away = planar_direction(threat, creature.position);
                let away = if away == Vec3::ZERO {
                    -creature.forward()
                } else {
                    away
                };
                let panicked = *self == SpeciesBehavior::Flock
                    && creature.alert_level > ctx.config.alert_high_threshold;
                if panicked {
                    let lateral = Vec3::new(-away.z, 0.0, away.x);
                    let sway = (creature.state_timer * ZIGZAG_RATE).sin() * ZIGZAG_AMPLITUDE;
                    MovementIntent::toward(away + lateral * sway, Pace::Run)
                } else {
                    MovementIntent::toward(away, Pace::Run)
                }
            }
            AiState::Retreating => {
                MovementIntent::toward(planar_direction(threat, creature.position), Pace::Run)
            }
            AiState::Aggressive => {
                if planar_distance(creature.position, threat) <= creature.sensory.attack_range {
                    MovementIntent::watch(threat)
                } else {
                    MovementIntent::toward(planar_direction(creature.position, threat), Pace::Run)
                }
            }
            AiState::Approaching => {
                if planar_distance(creature.position, threat) <= ctx.config.encounter_range {
                    MovementIntent::watch(threat)
                } else {
                    MovementIntent::toward(planar_direction(creature.position, threat), Pace::Walk)
                }
            }
        }
    }

    fn wander_intent(&self, creature: &Creature, ctx: &BehaviorContext) -> MovementIntent {
        if *self == SpeciesBehavior::Flock {
            if let Some(centroid) = ctx.flock.centroid {
                if planar_distance(creature.position, centroid) > ctx.config.flock_cohesion_distance {
                    return MovementIntent::toward(
                        planar_direction(creature.position, centroid),
                        Pace::Walk,
                    );
                }
            }
        }
        match resolve_target(creature, ctx) {
            Some(goal) if planar_distance(creature.position, goal) > ARRIVAL_DISTANCE => {
                MovementIntent::toward(planar_direction(creature.position, goal), Pace::Walk)
            }
            _ => MovementIntent::still(),
        }
    }
}

/// What the rest of the tick needs to know about one state update
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StateOutcome {
    /// (from, to) when the AI state changed
    pub changed: Option<(AiState, AiState)>,
    /// The creature spotted the protagonist and alarms its flock
    pub alarm: bool,
}

/// Nearby same-species members of a flocking creature
#[derive(Debug, Clone, Default)]
pub struct FlockView {
    pub centroid: Option<Vec3>,
    pub mates: Vec<EntityId>,
}

impl FlockView {
    /// Flock-mates of `id` among `neighbors`, which must already be limited to the flock radius
    pub fn gather(id: EntityId, neighbors: &[(EntityId, Vec3)]) -> Self {
        let mates: Vec<(EntityId, Vec3)> = neighbors
            .iter()
            .copied()
            .filter(|(other, _)| *other != id)
            .collect();
        if mates.is_empty() {
            return Self::default();
        }
        let sum = mates.iter().fold(Vec3::ZERO, |acc, (_, pos)| acc + *pos);
        Self {
            centroid: Some(sum / mates.len() as f32),
            mates: mates.into_iter().map(|(mate, _)| mate).collect(),
        }
    }
}

/// Read-only view of the world one creature decides against
pub struct BehaviorContext<'a> {
    pub protagonist: &'a Protagonist,
    /// This tick's detection of the protagonist by this creature
    pub detection: Option<Detection>,
    pub flock: &'a FlockView,
    /// Positions of live creatures at the start of the tick
    pub positions: &'a AHashMap<EntityId, Vec3>,
    pub config: &'a SimulationConfig,
}

impl<'a> BehaviorContext<'a> {
    fn observed(&self) -> Option<Detection> {
        self.detection.filter(|d| d.observed)
    }
}

/// Resolve a target to a point; stale entity handles resolve to nothing
pub fn resolve_target(creature: &Creature, ctx: &BehaviorContext) -> Option<Vec3> {
    match creature.target? {
        Target::Position(p) => Some(p),
        Target::Protagonist => Some(ctx.protagonist.position),
        Target::Entity(id) => ctx.positions.get(&id).copied(),
    }
}

fn random_wander_point<R: Rng>(origin: Vec3, rng: &mut R) -> Vec3 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = rng.gen_range(WANDER_MIN..WANDER_MAX);
    origin + Vec3::new(angle.sin() * distance, 0.0, angle.cos() * distance)
}

fn start_moving<R: Rng>(creature: &mut Creature, state: AiState, ctx: &BehaviorContext, rng: &mut R) {
    // Flocking deer sometimes trail a mate instead of picking a spot
    let follow = ctx
        .flock
        .mates
        .get(rng.gen_range(0..ctx.flock.mates.len().max(1)))
        .copied()
        .filter(|_| rng.gen_bool(0.5));
    creature.transition(state);
    creature.target = Some(match follow {
        Some(mate) => Target::Entity(mate),
        None => Target::Position(random_wander_point(creature.position, rng)),
    });
}

fn settle(creature: &mut Creature, state: AiState) {
    creature.transition(state);
    creature.target = None;
}

/// Flee from the protagonist if prey, attack if predator or boar
///
/// Returns true when an override fired.
fn react_to_protagonist(creature: &mut Creature, ctx: &BehaviorContext) -> bool {
    let Some(detection) = ctx.observed() else {
        return false;
    };
    let threat = ctx.protagonist.position;
    let within_flee = detection.distance <= creature.sensory.flee_distance;

    if within_flee && creature.category() == BehaviorCategory::Prey {
        creature.transition(AiState::Fleeing);
        creature.target = Some(Target::Position(threat));
        return true;
    }
    if within_flee && creature.species.attacks_unprovoked() && creature.species.allows(AiState::Aggressive) {
        creature.transition(AiState::Aggressive);
        creature.target = Some(Target::Protagonist);
        return true;
    }
    if creature.ai().is_calm() {
        creature.transition(AiState::Alert);
        creature.target = Some(Target::Position(threat));
        return true;
    }
    false
}

fn advance_timeouts<R: Rng>(creature: &mut Creature, ctx: &BehaviorContext, rng: &mut R, travel: AiState) {
    let t = creature.state_timer;
    match creature.ai() {
        AiState::Idle if t >= IDLE_MIN_TIME => {
            let roll: f32 = rng.gen();
            if roll < 0.4 {
                settle(creature, AiState::Grazing);
            } else if roll < 0.8 {
                start_moving(creature, travel, ctx, rng);
            } else {
                settle(creature, AiState::Idle);
            }
        }
        AiState::Grazing if t >= GRAZE_TIME => settle(creature, AiState::Idle),
        AiState::Moving | AiState::Wandering => {
            let lost_target = creature.target.is_some() && resolve_target(creature, ctx).is_none();
            if lost_target {
                settle(creature, AiState::Idle);
            } else if t >= MOVE_TIME {
                if rng.gen_bool(0.5) {
                    settle(creature, AiState::Idle);
                } else {
                    start_moving(creature, travel, ctx, rng);
                }
            }
        }
        AiState::Alert if t >= ALERT_TIME => settle(creature, AiState::Idle),
        AiState::Fleeing => {
            let safe = ctx.config.safe_distance_factor * creature.sensory.flee_distance;
            let distance = planar_distance(creature.position, ctx.protagonist.position);
            if t >= FLEE_TIME || distance >= safe {
                settle(creature, AiState::Idle);
            }
        }
        AiState::Aggressive if t >= AGGRESSION_TIME => settle(creature, AiState::Idle),
        _ => {}
    }
}

fn advance_herd<R: Rng>(creature: &mut Creature, ctx: &BehaviorContext, rng: &mut R) {
    if react_to_protagonist(creature, ctx) {
        return;
    }
    advance_timeouts(creature, ctx, rng, AiState::Moving);
}

fn advance_flock<R: Rng>(
    creature: &mut Creature,
    ctx: &BehaviorContext,
    rng: &mut R,
    outcome: &mut StateOutcome,
) {
    if let Some(detection) = ctx.observed() {
        // Alert jumps once per sighting, however many ticks it lasts
        if !creature.threat_in_sight {
            creature.threat_in_sight = true;
            creature.alert_level = (creature.alert_level + ctx.config.alert_rise).min(1.0);
            outcome.alarm = true;
        }

        // A jumpy deer bolts even from beyond its flee distance
        let jumpy = creature.alert_level > ctx.config.alert_high_threshold;
        if jumpy && detection.distance > creature.sensory.flee_distance {
            creature.transition(AiState::Fleeing);
            creature.target = Some(Target::Position(ctx.protagonist.position));
            return;
        }
        if react_to_protagonist(creature, ctx) {
            return;
        }
    }
    advance_timeouts(creature, ctx, rng, AiState::Wandering);
}

fn advance_territorial<R: Rng>(creature: &mut Creature, ctx: &BehaviorContext, rng: &mut R) {
    let t = creature.state_timer;
    let ready = creature.social_cooldown <= 0.0;

    if ready && ctx.observed().is_some() && matches!(creature.ai(), AiState::Idle | AiState::Wandering) {
        match choose_social_intent(creature.gender, ctx.protagonist.gender, ctx.config, rng) {
            Some(intent) => {
                creature.transition(AiState::Alert);
                creature.target = Some(Target::Protagonist);
                creature.social = Some(intent);
                tracing::debug!(?intent, "tiger noticed the protagonist");
            }
            None => {
                creature.transition(AiState::Friendly);
                creature.target = Some(Target::Protagonist);
                creature.social = None;
                creature.social_cooldown = ctx.config.social_cooldown;
            }
        }
        return;
    }

    match creature.ai() {
        AiState::Idle if t >= TIGER_IDLE_TIME => start_moving(creature, AiState::Wandering, ctx, rng),
        AiState::Wandering if t >= TIGER_WANDER_TIME => {
            if rng.gen_bool(0.5) {
                settle(creature, AiState::Idle);
            } else {
                start_moving(creature, AiState::Wandering, ctx, rng);
            }
        }
        AiState::Alert if t >= ALERT_TIME => {
            creature.transition(AiState::Approaching);
            creature.target = Some(Target::Protagonist);
        }
        AiState::Approaching if t >= APPROACH_GIVE_UP_TIME => {
            creature.social = None;
            creature.social_cooldown = ctx.config.social_cooldown;
            start_moving(creature, AiState::Wandering, ctx, rng);
        }
        AiState::Retreating if t >= RETREAT_TIME => start_moving(creature, AiState::Wandering, ctx, rng),
        AiState::Dominant if t >= DOMINANT_TIME => start_moving(creature, AiState::Wandering, ctx, rng),
        AiState::Friendly if t >= FRIENDLY_TIME => start_moving(creature, AiState::Wandering, ctx, rng),
        _ => {}
    }
}

/// Apply a movement intent: speed, stamina, position, facing and gait
pub fn integrate(
    creature: &mut Creature,
    intent: MovementIntent,
    dt: f32,
    env: &Environment,
    config: &SimulationConfig,
) {
    let profile = creature.species.profile();
    let running = intent.pace == Pace::Run && creature.vitals.stamina() > 0.0;
    let speed = match intent.pace {
        Pace::Still => 0.0,
        Pace::Walk => profile.walk_speed,
        Pace::Run if running => profile.run_speed,
        Pace::Run => profile.walk_speed,
    };

    if running {
        creature.vitals.drain_stamina(config.stamina_drain * dt);
    } else {
        creature.vitals.restore_stamina(config.stamina_regen * dt);
    }

    creature.velocity = intent.direction * speed;
    let (lo, hi) = config.world_bounds();
    let mut next = creature.position + creature.velocity * dt;
    next.x = next.x.clamp(lo, hi);
    next.z = next.z.clamp(lo, hi);
    next.y = env.ground_height(next.x, next.z) + config.spawn_clearance;
    if next.is_finite() {
        creature.position = next;
    }

    let facing_dir = if intent.direction != Vec3::ZERO {
        Some(intent.direction)
    } else {
        intent.look_at.map(|p| planar_direction(creature.position, p))
    };
    if let Some(yaw) = facing_dir.and_then(yaw_from_direction) {
        creature.facing = yaw;
    }

    creature.physical = if speed <= 0.0 {
        PhysicalState::Idle
    } else if running {
        PhysicalState::Running
    } else {
        PhysicalState::Walking
    };
}

/// One full behavior step for a live creature
pub fn update_creature<R: Rng>(
    creature: &mut Creature,
    ctx: &BehaviorContext,
    env: &Environment,
    dt: f32,
    rng: &mut R,
) -> StateOutcome {
    if creature.is_dead() {
        return StateOutcome::default();
    }

    creature.state_timer += dt;
    creature.attack_cooldown = (creature.attack_cooldown - dt).max(0.0);
    creature.social_cooldown = (creature.social_cooldown - dt).max(0.0);
    if ctx.observed().is_none() {
        creature.alert_level = (creature.alert_level - ctx.config.alert_decay * dt).max(0.0);
        creature.threat_in_sight = false;
    }

    let behavior = SpeciesBehavior::of(creature.species);
    let outcome = behavior.advance_state(creature, ctx, rng);
    let intent = behavior.movement_intent(creature, ctx);
    integrate(creature, intent, dt, env, ctx.config);
    outcome
}

/// Social alarm from a flock-mate: raise alert and join the flight when it runs high
///
/// Returns true if the mate started fleeing.
pub fn receive_alarm(creature: &mut Creature, threat: Vec3, config: &SimulationConfig) -> bool {
    if creature.is_dead() || !creature.species.flocks() {
        return false;
    }
    creature.alert_level = (creature.alert_level + config.alert_social_rise).min(1.0);
    if creature.alert_level > config.alert_high_threshold && creature.ai() != AiState::Fleeing {
        creature.transition(AiState::Fleeing);
        creature.target = Some(Target::Position(threat));
        return true;
    }
    false
}
