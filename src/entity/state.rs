//! Behavior and animation states

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::EntityId;

/// Behavioral mode driving the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AiState {
    Idle,
    Grazing,
    Moving,
    Alert,
    Fleeing,
    Aggressive,
    Wandering,
    Approaching,
    Retreating,
    Dominant,
    Friendly,
}

impl AiState {
    /// Threat weight of a creature in this state, seen from the protagonist
    ///
    /// Aggressive reads as attacking, Approaching and Dominant as closing in,
    /// Alert as stalking, the calm states as hidden, and the disengaging
    /// states as cooling down.
    pub fn threat_multiplier(&self) -> f32 {
        match self {
            AiState::Aggressive => 1.0,
            AiState::Approaching | AiState::Dominant => 0.8,
            AiState::Alert => 0.5,
            AiState::Idle | AiState::Grazing | AiState::Moving | AiState::Wandering => 0.3,
            AiState::Fleeing | AiState::Retreating | AiState::Friendly => 0.1,
        }
    }

    /// Calm states react to detection; the rest are already engaged
    pub fn is_calm(&self) -> bool {
        matches!(
            self,
            AiState::Idle | AiState::Grazing | AiState::Moving | AiState::Wandering
        )
    }
}

/// Animation-facing physical state; never drives decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PhysicalState {
    #[default]
    Idle,
    Walking,
    Running,
    Crouching,
    Dead,
}

impl PhysicalState {
    /// Noise multiplier used by the awareness signal
    pub fn movement_multiplier(&self) -> f32 {
        match self {
            PhysicalState::Idle => 0.7,
            PhysicalState::Walking => 1.0,
            PhysicalState::Running => 1.4,
            PhysicalState::Crouching => 0.5,
            PhysicalState::Dead => 0.0,
        }
    }
}

/// What a creature is oriented toward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Position(Vec3),
    Protagonist,
    Entity(EntityId),
}

/// Speed class of a movement intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    Still,
    Walk,
    Run,
}

/// Desired motion for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementIntent {
    /// Ground-plane direction, normalized or zero
    pub direction: Vec3,
    pub pace: Pace,
    /// Point to turn toward when standing still
    pub look_at: Option<Vec3>,
}

impl MovementIntent {
    pub fn still() -> Self {
        Self {
            direction: Vec3::ZERO,
            pace: Pace::Still,
            look_at: None,
        }
    }

    pub fn watch(point: Vec3) -> Self {
        Self {
            direction: Vec3::ZERO,
            pace: Pace::Still,
            look_at: Some(point),
        }
    }

    pub fn toward(direction: Vec3, pace: Pace) -> Self {
        let direction = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero();
        let pace = if direction == Vec3::ZERO { Pace::Still } else { pace };
        Self {
            direction,
            pace,
            look_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threat_multiplier_ordering() {
        assert!(AiState::Aggressive.threat_multiplier() > AiState::Approaching.threat_multiplier());
        assert!(AiState::Approaching.threat_multiplier() > AiState::Alert.threat_multiplier());
        assert!(AiState::Alert.threat_multiplier() > AiState::Idle.threat_multiplier());
        assert!(AiState::Idle.threat_multiplier() > AiState::Fleeing.threat_multiplier());
    }

    #[test]
    fn test_degenerate_intent_is_still() {
        let intent = MovementIntent::toward(Vec3::new(0.0, 5.0, 0.0), Pace::Run);
        assert_eq!(intent.pace, Pace::Still);
        assert_eq!(intent.direction, Vec3::ZERO);
    }

    #[test]
    fn test_intent_is_flattened() {
        let intent = MovementIntent::toward(Vec3::new(3.0, 9.0, 4.0), Pace::Walk);
        assert!((intent.direction.length() - 1.0).abs() < 1e-5);
        assert_eq!(intent.direction.y, 0.0);
    }
}
