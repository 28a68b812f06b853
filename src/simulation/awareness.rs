//! Threat awareness - one smoothed danger signal for the protagonist
//!
//! Four readings are combined each tick:
//! - proximity: how deep the nearest threat's detection bubble reaches
//! - movement: how much noise the protagonist's gait makes
//! - stealth: how exposed the protagonist is
//! - environment: water and thick cover, where ambushes happen
//!
//! The weighted sum is blended into the previous score so single-frame
//! spikes do not flicker the UI.

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::entity::{AiState, PhysicalState};
use crate::simulation::detection::LineOfSight;

/// Categorical projection of the awareness score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThreatLevel {
    Safe,
    Alert,
    Danger,
    Imminent,
}

impl ThreatLevel {
    pub fn from_score(score: f32) -> Self {
        if score < 0.2 {
            ThreatLevel::Safe
        } else if score < 0.4 {
            ThreatLevel::Alert
        } else if score < 0.7 {
            ThreatLevel::Danger
        } else {
            ThreatLevel::Imminent
        }
    }
}

/// One threat as seen this tick
#[derive(Debug, Clone, Copy)]
pub struct ThreatReading {
    pub distance: f32,
    pub effective_radius: f32,
    pub state: AiState,
    pub line_of_sight: LineOfSight,
}

/// Everything the aggregator reads in one tick
#[derive(Debug, Clone, Default)]
pub struct AwarenessInputs {
    pub threats: Vec<ThreatReading>,
    pub physical: PhysicalState,
    pub stealth: f32,
    /// Distance to the nearest water perimeter, if any water is known
    pub water_distance: Option<f32>,
    pub vegetation_density: f32,
}

/// Component readings behind the last update
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AwarenessBreakdown {
    pub proximity: f32,
    pub movement: f32,
    pub stealth: f32,
    pub environment: f32,
    /// Weighted sum before smoothing
    pub target: f32,
}

fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Strongest single threat reading
pub fn proximity_component(threats: &[ThreatReading], config: &SimulationConfig) -> f32 {
    threats
        .iter()
        .map(|threat| {
            if !(threat.effective_radius > 0.0) || !threat.distance.is_finite() {
                return 0.0;
            }
            let closeness = (1.0 - threat.distance / threat.effective_radius).max(0.0);
            let los = match threat.line_of_sight {
                LineOfSight::Clear => 1.0,
                _ => config.blocked_los_multiplier,
            };
            unit(closeness * threat.state.threat_multiplier() * los)
        })
        .fold(0.0, f32::max)
}

/// Gait noise normalized so a sprint reads 1.0
pub fn movement_component(physical: PhysicalState) -> f32 {
    unit(physical.movement_multiplier() / PhysicalState::Running.movement_multiplier())
}

pub fn stealth_component(stealth: f32) -> f32 {
    let stealth = if stealth.is_finite() {
        stealth.clamp(0.0, 100.0)
    } else {
        0.0
    };
    1.0 - stealth / 100.0
}

pub fn environment_component(
    water_distance: Option<f32>,
    vegetation_density: f32,
    config: &SimulationConfig,
) -> f32 {
    let mut value = config.environment_baseline;
    if water_distance.is_some_and(|d| d <= config.water_proximity) {
        value *= config.near_water_factor;
    }
    if vegetation_density >= config.dense_vegetation_threshold {
        value *= config.dense_vegetation_factor;
    }
    let ceiling = config.environment_baseline
        * config.near_water_factor.max(1.0)
        * config.dense_vegetation_factor.max(1.0);
    if ceiling > 0.0 {
        unit(value / ceiling)
    } else {
        0.0
    }
}

/// Running awareness score for one protagonist
#[derive(Debug, Clone, Default)]
pub struct AwarenessAggregator {
    score: f32,
    breakdown: AwarenessBreakdown,
}

impl AwarenessAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    /// Read-only projection of the score
    pub fn level(&self) -> ThreatLevel {
        ThreatLevel::from_score(self.score)
    }

    pub fn breakdown(&self) -> AwarenessBreakdown {
        self.breakdown
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Blend this tick's readings into the score and return it
    pub fn update(&mut self, inputs: &AwarenessInputs, config: &SimulationConfig) -> f32 {
        let proximity = proximity_component(&inputs.threats, config);
        let movement = movement_component(inputs.physical);
        let stealth = stealth_component(inputs.stealth);
        let environment =
            environment_component(inputs.water_distance, unit(inputs.vegetation_density), config);

        let target = config.awareness_weight_proximity * proximity
            + config.awareness_weight_movement * movement
            + config.awareness_weight_stealth * stealth
            + config.awareness_weight_environment * environment;

        self.breakdown = AwarenessBreakdown {
            proximity,
            movement,
            stealth,
            environment,
            target,
        };

        if target.is_finite() {
            let alpha = unit(config.awareness_smoothing);
            self.score = unit(self.score + alpha * (target - self.score));
        }
        self.score
    }
}
