//! The player-controlled tiger, as the wildlife simulation sees it

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::{forward_from_yaw, Gender};
use crate::entity::body::Vitals;
use crate::entity::state::PhysicalState;

/// Protagonist attributes read by detection and written by interactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protagonist {
    pub position: Vec3,
    /// Yaw in radians
    pub facing: f32,
    /// 0 = fully exposed, 100 = perfect stealth
    pub stealth: f32,
    pub physical: PhysicalState,
    pub attack_range: f32,
    pub attack_damage: f32,
    pub level: u32,
    pub gender: Gender,
    pub vitals: Vitals,
    pub hunger: f32,
    pub max_hunger: f32,
    pub experience: u32,
}

impl Default for Protagonist {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            facing: 0.0,
            stealth: 0.0,
            physical: PhysicalState::Idle,
            attack_range: 3.0,
            attack_damage: 35.0,
            level: 1,
            gender: Gender::Male,
            vitals: Vitals::new(200.0, 150.0),
            hunger: 50.0,
            max_hunger: 100.0,
            experience: 0,
        }
    }
}

impl Protagonist {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn forward(&self) -> Vec3 {
        forward_from_yaw(self.facing)
    }

    /// Stealth clamped to [0, 100]; non-finite values read as no stealth
    pub fn stealth_effectiveness(&self) -> f32 {
        if self.stealth.is_finite() {
            self.stealth.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    /// Restore hunger, returning the amount actually restored
    pub fn feed(&mut self, amount: f32) -> f32 {
        let before = self.hunger;
        let amount = if amount.is_finite() { amount.max(0.0) } else { 0.0 };
        self.hunger = (self.hunger + amount).clamp(0.0, self.max_hunger.max(0.0));
        self.hunger - before
    }

    pub fn gain_experience(&mut self, amount: u32) {
        self.experience = self.experience.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stealth_is_clamped() {
        let mut tiger = Protagonist::default();
        tiger.stealth = 150.0;
        assert_eq!(tiger.stealth_effectiveness(), 100.0);
        tiger.stealth = -5.0;
        assert_eq!(tiger.stealth_effectiveness(), 0.0);
        tiger.stealth = f32::NAN;
        assert_eq!(tiger.stealth_effectiveness(), 0.0);
    }

    #[test]
    fn test_feed_caps_at_max() {
        let mut tiger = Protagonist::default();
        tiger.hunger = 90.0;
        assert_eq!(tiger.feed(30.0), 10.0);
        assert_eq!(tiger.hunger, 100.0);
    }
}
