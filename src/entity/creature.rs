//! The shared creature record

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::{forward_from_yaw, Gender};
use crate::entity::body::Vitals;
use crate::entity::species::{BehaviorCategory, SensoryProfile, Species};
use crate::entity::state::{AiState, PhysicalState, Target};

/// Social intent a territorial creature has toward the protagonist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocialIntent {
    Mate,
    Fight,
}

/// A wild creature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creature {
    pub species: Species,
    pub gender: Option<Gender>,
    pub vitals: Vitals,

    pub position: Vec3,
    /// Yaw in radians; forward is (sin, 0, cos)
    pub facing: f32,
    pub velocity: Vec3,

    pub physical: PhysicalState,
    ai: AiState,
    pub target: Option<Target>,
    /// Seconds spent in the current AI state
    pub state_timer: f32,

    pub sensory: SensoryProfile,

    /// Flock alarm in [0, 1]
    pub alert_level: f32,
    /// The protagonist was observed on the previous step
    pub threat_in_sight: bool,
    pub social: Option<SocialIntent>,
    /// Seconds left before this creature engages the protagonist socially again
    pub social_cooldown: f32,
    /// Seconds left before this creature can strike again
    pub attack_cooldown: f32,

    /// Seconds since death; `None` while alive
    death_elapsed: Option<f32>,
}

impl Creature {
    pub fn new(species: Species, position: Vec3) -> Self {
        let profile = species.profile();
        Self {
            species,
            gender: None,
            vitals: Vitals::new(profile.max_health, profile.max_stamina),
            position,
            facing: 0.0,
            velocity: Vec3::ZERO,
            physical: PhysicalState::Idle,
            ai: species.rest_state(),
            target: None,
            state_timer: 0.0,
            sensory: profile.sensory,
            alert_level: 0.0,
            threat_in_sight: false,
            social: None,
            social_cooldown: 0.0,
            attack_cooldown: 0.0,
            death_elapsed: None,
        }
    }

    /// Gender is only kept for species that use it
    pub fn with_gender(mut self, gender: Gender) -> Self {
        if self.species.has_gender() {
            self.gender = Some(gender);
        }
        self
    }

    pub fn with_sensory(mut self, sensory: SensoryProfile) -> Self {
        self.sensory = sensory;
        self
    }

    pub fn with_facing(mut self, facing: f32) -> Self {
        self.facing = facing;
        self
    }

    pub fn category(&self) -> BehaviorCategory {
        self.species.category()
    }

    pub fn ai(&self) -> AiState {
        self.ai
    }

    pub fn forward(&self) -> Vec3 {
        forward_from_yaw(self.facing)
    }

    pub fn is_alive(&self) -> bool {
        self.death_elapsed.is_none()
    }

    pub fn is_dead(&self) -> bool {
        self.death_elapsed.is_some()
    }

    pub fn death_elapsed(&self) -> Option<f32> {
        self.death_elapsed
    }

    /// Move to `next`, resetting the state timer.
    ///
    /// States outside the species set are refused. Returns whether the
    /// state changed.
    pub fn transition(&mut self, next: AiState) -> bool {
        debug_assert!(
            self.species.allows(next),
            "{:?} has no {:?} state",
            self.species,
            next
        );
        if !self.species.allows(next) || self.is_dead() {
            return false;
        }
        if self.ai != next {
            tracing::trace!(species = self.species.name(), from = ?self.ai, to = ?next, "state change");
        }
        self.ai = next;
        self.state_timer = 0.0;
        true
    }

    /// Apply damage; returns true if this blow killed the creature
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        if self.is_dead() {
            return false;
        }
        self.vitals.damage(amount);
        if self.vitals.is_depleted() {
            self.die();
            return true;
        }
        false
    }

    pub fn heal(&mut self, amount: f32) {
        if self.is_alive() {
            self.vitals.heal(amount);
        }
    }

    /// Force death. Returns false if already dead.
    pub fn kill(&mut self) -> bool {
        if self.is_dead() {
            return false;
        }
        self.vitals.set_health(0.0);
        self.die();
        true
    }

    fn die(&mut self) {
        self.ai = self.species.rest_state();
        self.physical = PhysicalState::Dead;
        self.target = None;
        self.social = None;
        self.velocity = Vec3::ZERO;
        self.state_timer = 0.0;
        self.death_elapsed = Some(0.0);
    }

    /// Advance the corpse timer; returns the new elapsed time for dead creatures
    pub fn advance_decay(&mut self, dt: f32) -> Option<f32> {
        if let Some(elapsed) = self.death_elapsed.as_mut() {
            *elapsed += dt;
        }
        self.death_elapsed
    }

    /// Whether this creature may strike a target at `distance`
    ///
    /// Aggressive creatures strike anything in range; predators and boars
    /// strike in range regardless of state. Prey only retaliate when hunted.
    pub fn can_attack(&self, distance: f32) -> bool {
        if self.is_dead() || distance > self.sensory.attack_range {
            return false;
        }
        self.ai == AiState::Aggressive || self.species.attacks_unprovoked()
    }
}
