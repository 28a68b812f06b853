//! Physical body simulation

use serde::{Deserialize, Serialize};

/// Health and stamina pools, always within [0, max]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    health: f32,
    max_health: f32,
    stamina: f32,
    max_stamina: f32,
}

impl Vitals {
    /// Full pools. Non-finite or negative maxima are treated as zero.
    pub fn new(max_health: f32, max_stamina: f32) -> Self {
        let max_health = sanitize_max(max_health);
        let max_stamina = sanitize_max(max_stamina);
        Self {
            health: max_health,
            max_health,
            stamina: max_stamina,
            max_stamina,
        }
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    pub fn stamina(&self) -> f32 {
        self.stamina
    }

    pub fn max_stamina(&self) -> f32 {
        self.max_stamina
    }

    pub fn is_depleted(&self) -> bool {
        self.health <= 0.0
    }

    /// Apply damage, returning the amount actually taken
    pub fn damage(&mut self, amount: f32) -> f32 {
        let before = self.health;
        self.health = clamp_pool(self.health - non_negative(amount), self.max_health);
        before - self.health
    }

    /// Heal, returning the amount actually restored
    pub fn heal(&mut self, amount: f32) -> f32 {
        let before = self.health;
        self.health = clamp_pool(self.health + non_negative(amount), self.max_health);
        self.health - before
    }

    pub fn set_health(&mut self, value: f32) {
        self.health = clamp_pool(value, self.max_health);
    }

    pub fn drain_stamina(&mut self, amount: f32) {
        self.stamina = clamp_pool(self.stamina - non_negative(amount), self.max_stamina);
    }

    pub fn restore_stamina(&mut self, amount: f32) {
        self.stamina = clamp_pool(self.stamina + non_negative(amount), self.max_stamina);
    }
}

fn sanitize_max(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

fn non_negative(amount: f32) -> f32 {
    if amount.is_finite() {
        amount.max(0.0)
    } else if amount == f32::INFINITY {
        f32::MAX
    } else {
        0.0
    }
}

fn clamp_pool(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}
