//! Simulation configuration with documented constants
//!
//! All tuning numbers for spawning, detection, awareness, behavior and
//! interactions live here. A config can be built from defaults or loaded from
//! a TOML file where any omitted field keeps its default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, WildError};

/// Configuration for the wildlife simulation
///
/// Distances are world units (meters), times are seconds of accumulated
/// simulation time, never wall-clock time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the default deterministic random source
    pub seed: u64,

    // === WORLD ===
    /// Half the side length of the square world; bounds are [-extent, extent] on x and z
    pub world_half_extent: f32,

    /// Spawn points must be at least this far inside the world bounds
    pub world_margin: f32,

    /// Largest dt a single update integrates
    ///
    /// Frame hitches longer than this are truncated so movement, timers and
    /// decay never jump by more than one small step.
    pub max_dt: f32,

    // === SPATIAL SYSTEM ===
    /// Size of each cell in the spatial grid (world units)
    ///
    /// With a population cap around 20 the grid stays tiny; the cell size
    /// mostly decides how many neighbor cells a radius query visits.
    pub grid_cell_size: f32,

    // === SPAWNING ===
    /// Hard upper bound on live + dead creatures held by the registry
    pub population_cap: usize,

    /// Seconds between automatic spawn attempts
    pub spawn_interval: f32,

    /// Rejection-sampling attempts when looking for a group anchor
    pub spawn_attempts: u32,

    /// Steepest terrain (0 = flat, 1 = vertical) a group may spawn on
    pub max_spawn_slope: f32,

    /// Minimum distance from any water-body perimeter
    pub water_clearance: f32,

    /// Minimum distance between a new anchor and every existing creature
    pub min_entity_spacing: f32,

    /// Minimum distance between a new anchor and the protagonist's last known position
    pub min_protagonist_distance: f32,

    /// Radius of the ring group members are placed on around the anchor
    pub group_spread: f32,

    /// Height above terrain at which creatures are placed
    pub spawn_clearance: f32,

    // === LIFECYCLE ===
    /// Seconds a corpse stays in the world before it is swept
    pub decay_window: f32,

    // === DETECTION ===
    /// Floor of the stealth modifier; perfect stealth still leaves this share of the radius
    pub min_stealth_factor: f32,

    /// Sample points along a sight line
    pub los_samples: u32,

    /// Eye height above the body position for sight lines
    pub eye_height: f32,

    /// Mean vegetation density along a sight line above which sight is blocked
    pub vegetation_block_density: f32,

    /// Dot product threshold for the rear cone (facing · to-observer below this = behind)
    pub rear_cone_dot: f32,

    /// Chance a crouching protagonist approaching from behind goes unnoticed
    pub rear_miss_chance_crouching: f32,

    /// Chance a walking protagonist approaching from behind goes unnoticed
    pub rear_miss_chance_walking: f32,

    // === AWARENESS ===
    /// Weight of the nearest-threat proximity signal
    pub awareness_weight_proximity: f32,
    /// Weight of the protagonist's movement noise
    pub awareness_weight_movement: f32,
    /// Weight of the protagonist's exposure (inverse stealth)
    pub awareness_weight_stealth: f32,
    /// Weight of the surroundings (water, vegetation)
    pub awareness_weight_environment: f32,

    /// Exponential smoothing factor; share of the new reading blended in each tick
    ///
    /// At 0.3 a step change reaches ~90% of its value after about six ticks,
    /// enough to hide single-frame jitter without lagging real danger.
    pub awareness_smoothing: f32,

    /// Environmental signal before modifiers
    pub environment_baseline: f32,
    /// Multiplier when the protagonist is close to water (where predators gather)
    pub near_water_factor: f32,
    /// Distance from a water perimeter that counts as "near water"
    pub water_proximity: f32,
    /// Multiplier when the local vegetation is dense
    pub dense_vegetation_factor: f32,
    /// Vegetation density counted as dense
    pub dense_vegetation_threshold: f32,
    /// Proximity multiplier for a threat without clear line of sight
    pub blocked_los_multiplier: f32,

    // === BEHAVIOR ===
    /// Radius within which deer count each other as flock-mates
    pub flock_radius: f32,
    /// Wandering deer closer than this to the flock centroid stop steering toward it
    pub flock_cohesion_distance: f32,
    /// Alert level gained by a deer that detects the protagonist
    pub alert_rise: f32,
    /// Alert level passed to flock-mates on detection
    pub alert_social_rise: f32,
    /// Alert level lost per second without a threat
    pub alert_decay: f32,
    /// Alert level above which fleeing deer zig-zag and mates join the flight
    pub alert_high_threshold: f32,
    /// Fleeing ends early once the threat is this many flee distances away
    pub safe_distance_factor: f32,
    /// Stamina drained per second while running
    pub stamina_drain: f32,
    /// Stamina regenerated per second while not running
    pub stamina_regen: f32,
    /// Seconds between two strikes of the same creature on the protagonist
    pub entity_attack_cooldown: f32,

    // === INTERACTIONS ===
    /// Reach for eating a carcass
    pub eat_range: f32,
    /// Hunger restored by one carcass
    pub hunger_restore: f32,
    /// Distance at which a social encounter resolves
    pub encounter_range: f32,
    /// Chance an opposite-gender tiger is interested in mating
    pub mate_interest_chance: f32,
    pub mate_health_bonus: f32,
    pub mate_stamina_bonus: f32,
    pub mate_experience_bonus: u32,
    /// Seconds a tiger ignores the protagonist after an encounter
    pub social_cooldown: f32,
    pub fight_player_base: f32,
    /// Player power gained per level
    pub fight_level_bonus: f32,
    pub fight_wild_base: f32,
    /// Wild power jitter is drawn from [0, jitter)
    pub fight_wild_jitter: f32,
    /// Power gap above which a win is decisive
    pub decisive_gap: f32,
    pub decisive_experience: u32,
    pub narrow_experience: u32,
    /// Share of current health a narrowly beaten tiger loses
    pub retreat_health_loss: f32,
    pub loss_damage_base: f32,
    pub loss_damage_cap: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,

            world_half_extent: 250.0,
            world_margin: 10.0,
            max_dt: 0.1,

            grid_cell_size: 20.0,

            population_cap: 20,
            spawn_interval: 8.0,
            spawn_attempts: 50,
            max_spawn_slope: 0.5,
            water_clearance: 10.0,
            min_entity_spacing: 15.0,
            min_protagonist_distance: 40.0,
            group_spread: 4.0,
            spawn_clearance: 0.5,

            decay_window: 30.0,

            min_stealth_factor: 0.3,
            los_samples: 10,
            eye_height: 1.2,
            vegetation_block_density: 0.8,
            rear_cone_dot: -0.3,
            rear_miss_chance_crouching: 0.8,
            rear_miss_chance_walking: 0.7,

            // Weights sum to 1.0
            awareness_weight_proximity: 0.4,
            awareness_weight_movement: 0.25,
            awareness_weight_stealth: 0.2,
            awareness_weight_environment: 0.15,
            awareness_smoothing: 0.3,
            environment_baseline: 0.5,
            near_water_factor: 1.3,
            water_proximity: 15.0,
            dense_vegetation_factor: 1.2,
            dense_vegetation_threshold: 0.6,
            blocked_los_multiplier: 0.5,

            flock_radius: 20.0,
            flock_cohesion_distance: 5.0,
            alert_rise: 0.6,
            alert_social_rise: 0.3,
            alert_decay: 0.1,
            alert_high_threshold: 0.7,
            safe_distance_factor: 2.0,
            stamina_drain: 10.0,
            stamina_regen: 5.0,
            entity_attack_cooldown: 1.5,

            eat_range: 3.0,
            hunger_restore: 30.0,
            encounter_range: 4.0,
            mate_interest_chance: 0.6,
            mate_health_bonus: 20.0,
            mate_stamina_bonus: 20.0,
            mate_experience_bonus: 50,
            social_cooldown: 20.0,
            fight_player_base: 50.0,
            fight_level_bonus: 10.0,
            fight_wild_base: 60.0,
            fight_wild_jitter: 30.0,
            decisive_gap: 30.0,
            decisive_experience: 100,
            narrow_experience: 40,
            retreat_health_loss: 0.4,
            loss_damage_base: 10.0,
            loss_damage_cap: 30.0,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; omitted fields keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.grid_cell_size <= 0.0 {
            return Err(WildError::InvalidConfig(format!(
                "grid_cell_size ({}) must be positive",
                self.grid_cell_size
            )));
        }

        let positive = [
            ("world_half_extent", self.world_half_extent),
            ("max_dt", self.max_dt),
            ("decay_window", self.decay_window),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(WildError::InvalidConfig(format!(
                    "{} ({}) must be finite and positive",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("world_margin", self.world_margin),
            ("fight_wild_jitter", self.fight_wild_jitter),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(WildError::InvalidConfig(format!(
                    "{} ({}) must be finite and non-negative",
                    name, value
                )));
            }
        }

        if self.world_margin >= self.world_half_extent {
            return Err(WildError::InvalidConfig(format!(
                "world_margin ({}) leaves no spawnable area inside half extent {}",
                self.world_margin, self.world_half_extent
            )));
        }

        // Spawn sampling draws across the full inner span
        let span = 2.0 * (self.world_half_extent - self.world_margin);
        if !span.is_finite() {
            return Err(WildError::InvalidConfig(format!(
                "world_half_extent ({}) is too large to sample",
                self.world_half_extent
            )));
        }

        if !(0.0..=1.0).contains(&self.min_stealth_factor) {
            return Err(WildError::InvalidConfig(format!(
                "min_stealth_factor ({}) must be within [0, 1]",
                self.min_stealth_factor
            )));
        }

        let chances = [
            ("rear_miss_chance_crouching", self.rear_miss_chance_crouching),
            ("rear_miss_chance_walking", self.rear_miss_chance_walking),
            ("mate_interest_chance", self.mate_interest_chance),
            ("awareness_smoothing", self.awareness_smoothing),
            ("retreat_health_loss", self.retreat_health_loss),
        ];
        for (name, value) in chances {
            if !(0.0..=1.0).contains(&value) {
                return Err(WildError::InvalidConfig(format!(
                    "{} ({}) must be within [0, 1]",
                    name, value
                )));
            }
        }

        let weight_sum = self.awareness_weight_proximity
            + self.awareness_weight_movement
            + self.awareness_weight_stealth
            + self.awareness_weight_environment;
        if (weight_sum - 1.0).abs() > 0.01 {
            return Err(WildError::InvalidConfig(format!(
                "awareness weights should sum to 1.0, got {:.3}",
                weight_sum
            )));
        }

        if self.los_samples == 0 {
            return Err(WildError::InvalidConfig("los_samples must be at least 1".into()));
        }

        Ok(())
    }

    /// Inclusive world bounds on x and z
    pub fn world_bounds(&self) -> (f32, f32) {
        (-self.world_half_extent, self.world_half_extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            population_cap = 8
            decay_window = 12.5
            "#,
        )
        .unwrap();

        assert_eq!(config.population_cap, 8);
        assert_eq!(config.decay_window, 12.5);
        assert_eq!(config.spawn_attempts, 50);
        assert_eq!(config.min_stealth_factor, 0.3);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let result = SimulationConfig::from_toml_str("awareness_weight_proximity = 0.9");
        assert!(matches!(result, Err(WildError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = SimulationConfig::from_toml_str("population_cap = \"many\"");
        assert!(matches!(result, Err(WildError::ConfigParse(_))));
    }

    #[test]
    fn test_inverted_world_rejected() {
        let result = SimulationConfig::from_toml_str("world_half_extent = -5.0\nworld_margin = -10.0");
        assert!(matches!(result, Err(WildError::InvalidConfig(_))));
    }

    #[test]
    fn test_non_finite_world_rejected() {
        for value in ["nan", "inf", "-inf"] {
            let result = SimulationConfig::from_toml_str(&format!("world_half_extent = {}", value));
            assert!(matches!(result, Err(WildError::InvalidConfig(_))), "{}", value);
        }
        let result = SimulationConfig::from_toml_str("world_margin = nan");
        assert!(matches!(result, Err(WildError::InvalidConfig(_))));
    }

    #[test]
    fn test_unsampleable_world_rejected() {
        let config = SimulationConfig {
            world_half_extent: f32::MAX,
            world_margin: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(WildError::InvalidConfig(_))));
    }

    #[test]
    fn test_bad_timing_rejected() {
        for (max_dt, decay_window) in [(f32::NAN, 30.0), (f32::INFINITY, 30.0), (0.1, f32::NAN), (0.1, -1.0)] {
            let config = SimulationConfig {
                max_dt,
                decay_window,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{} {}", max_dt, decay_window);
        }
    }

    #[test]
    fn test_bad_fight_jitter_rejected() {
        for jitter in [f32::INFINITY, f32::NAN, -1.0] {
            let config = SimulationConfig {
                fight_wild_jitter: jitter,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{}", jitter);
        }
        let calm = SimulationConfig {
            fight_wild_jitter: 0.0,
            ..Default::default()
        };
        assert!(calm.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_chance_rejected() {
        let mut config = SimulationConfig::default();
        config.rear_miss_chance_crouching = 1.5;
        assert!(config.validate().is_err());
    }
}
