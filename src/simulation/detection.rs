//! Detection - whether a creature perceives the protagonist
//!
//! A detection is built from independent, inspectable components: stealth
//! scaled radius, line of sight through terrain and vegetation, and the
//! rear-approach miss roll. Results are cached for the rest of the tick.

use ahash::AHashMap;
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::types::{planar_direction, EntityId};
use crate::entity::{Creature, PhysicalState, Protagonist};
use crate::simulation::behavior::SpeciesBehavior;
use crate::world::Environment;

/// Outcome of a sight-line test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineOfSight {
    Clear,
    BlockedByTerrain,
    BlockedByVegetation,
    /// Not evaluated because the observer was already out of range
    NotChecked,
}

impl LineOfSight {
    pub fn is_clear(&self) -> bool {
        matches!(self, LineOfSight::Clear)
    }
}

/// Explainable detection result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub distance: f32,
    /// Share of the detection radius left after stealth, in [floor, 1]
    pub stealth_modifier: f32,
    pub effective_radius: f32,
    pub line_of_sight: LineOfSight,
    /// Observer is inside the creature's rear cone
    pub from_behind: bool,
    /// The rear-approach roll made the creature miss an otherwise visible observer
    pub stealth_miss: bool,
    pub observed: bool,
}

impl Detection {
    fn unobserved(distance: f32, stealth_modifier: f32, effective_radius: f32) -> Self {
        Self {
            distance,
            stealth_modifier,
            effective_radius,
            line_of_sight: LineOfSight::NotChecked,
            from_behind: false,
            stealth_miss: false,
            observed: false,
        }
    }
}

/// `max(floor, 1 - stealth/100)` with stealth clamped to [0, 100]
pub fn stealth_modifier(stealth: f32, floor: f32) -> f32 {
    let stealth = if stealth.is_finite() {
        stealth.clamp(0.0, 100.0)
    } else {
        0.0
    };
    (1.0 - stealth / 100.0).max(floor)
}

pub fn effective_radius(detection_radius: f32, stealth: f32, floor: f32) -> f32 {
    detection_radius.max(0.0) * stealth_modifier(stealth, floor)
}

/// Sample the segment between two eyes against terrain and vegetation
pub fn line_of_sight(from: Vec3, to: Vec3, env: &Environment, config: &SimulationConfig) -> LineOfSight {
    let samples = config.los_samples.max(1);
    let eye = Vec3::new(0.0, config.eye_height, 0.0);
    let start = from + eye;
    let end = to + eye;

    let mut density_sum = 0.0;
    for i in 1..=samples {
        let t = i as f32 / (samples + 1) as f32;
        let point = start.lerp(end, t);
        if env.ground_height(point.x, point.z) > point.y {
            return LineOfSight::BlockedByTerrain;
        }
        density_sum += env.vegetation_density(point.x, point.z);
    }

    if density_sum / samples as f32 > config.vegetation_block_density {
        LineOfSight::BlockedByVegetation
    } else {
        LineOfSight::Clear
    }
}

/// Miss chance for a rear approach, if the observer's posture qualifies
pub fn rear_miss_chance(physical: PhysicalState, config: &SimulationConfig) -> Option<f32> {
    match physical {
        PhysicalState::Crouching => Some(config.rear_miss_chance_crouching),
        PhysicalState::Walking => Some(config.rear_miss_chance_walking),
        _ => None,
    }
}

/// Whether `creature` perceives `observer`
///
/// The random source is only drawn from for a visible rear approach in a
/// stealth-favorable posture, so out-of-range checks never consume entropy.
pub fn can_observe<R: Rng>(
    observer: &Protagonist,
    creature: &Creature,
    env: &Environment,
    config: &SimulationConfig,
    rng: &mut R,
) -> Detection {
    let distance = observer.position.distance(creature.position);
    let modifier = stealth_modifier(observer.stealth_effectiveness(), config.min_stealth_factor);
    let radius = SpeciesBehavior::of(creature.species).detection_radius(creature) * modifier;

    if creature.is_dead() || !distance.is_finite() || distance > radius {
        return Detection::unobserved(distance, modifier, radius);
    }

    let los = line_of_sight(observer.position, creature.position, env, config);
    let to_observer = planar_direction(creature.position, observer.position);
    let from_behind = creature.forward().dot(to_observer) < config.rear_cone_dot;

    let mut detection = Detection {
        distance,
        stealth_modifier: modifier,
        effective_radius: radius,
        line_of_sight: los,
        from_behind,
        stealth_miss: false,
        observed: false,
    };
    if !los.is_clear() {
        return detection;
    }

    if from_behind {
        if let Some(chance) = rear_miss_chance(observer.physical, config) {
            if rng.gen::<f32>() < chance {
                detection.stealth_miss = true;
                return detection;
            }
        }
    }

    detection.observed = true;
    detection
}

/// Per-tick cache in front of `can_observe`
///
/// The engine has a single observer, so entries are keyed by the observed
/// creature. The cache must be cleared whenever the tick advances.
#[derive(Debug, Default)]
pub struct DetectionService {
    cache: AHashMap<EntityId, Detection>,
}

impl DetectionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every cached result
    pub fn begin_tick(&mut self) {
        self.cache.clear();
    }

    pub fn forget(&mut self, id: EntityId) {
        self.cache.remove(&id);
    }

    pub fn cached(&self, id: EntityId) -> Option<Detection> {
        self.cache.get(&id).copied()
    }

    pub fn observe<R: Rng>(
        &mut self,
        id: EntityId,
        observer: &Protagonist,
        creature: &Creature,
        env: &Environment,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> Detection {
        *self
            .cache
            .entry(id)
            .or_insert_with(|| can_observe(observer, creature, env, config, rng))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Species;
    use crate::world::{FlatTerrain, HeightFn, StaticWater, UniformVegetation};
    use proptest::prelude::*;
    use rand::rngs::mock::StepRng;
    use slotmap::SlotMap;
    use std::f32::consts::PI;

    fn always_low() -> StepRng {
        StepRng::new(0, 0)
    }

    fn always_high() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    /// Creature at the origin facing +z, with the given detection radius
    fn creature_facing_plus_z(radius: f32) -> Creature {
        let mut deer = Creature::new(Species::Deer, Vec3::ZERO);
        deer.sensory.detection_radius = radius;
        deer.facing = 0.0;
        deer
    }

    fn observer_at(z: f32, stealth: f32, physical: PhysicalState) -> Protagonist {
        let mut tiger = Protagonist::at(Vec3::new(0.0, 0.0, z));
        tiger.stealth = stealth;
        tiger.physical = physical;
        tiger
    }

    #[test]
    fn test_scenario_stealth_shrinks_radius_below_distance() {
        let terrain = FlatTerrain::default();
        let water = StaticWater::default();
        let veg = UniformVegetation::default();
        let env = Environment::new(&terrain, &water, &veg);
        let config = SimulationConfig::default();

        let creature = creature_facing_plus_z(30.0);
        let observer = observer_at(20.0, 50.0, PhysicalState::Walking);
        let d = can_observe(&observer, &creature, &env, &config, &mut always_high());

        assert!((d.effective_radius - 15.0).abs() < 1e-4);
        assert!(!d.observed);
        assert_eq!(d.line_of_sight, LineOfSight::NotChecked);
    }

    #[test]
    fn test_scenario_no_stealth_clear_sight_is_observed() {
        let terrain = FlatTerrain::default();
        let water = StaticWater::default();
        let veg = UniformVegetation::default();
        let env = Environment::new(&terrain, &water, &veg);
        let config = SimulationConfig::default();

        // Observer in front of the creature
        let creature = creature_facing_plus_z(25.0);
        let observer = observer_at(20.0, 0.0, PhysicalState::Walking);
        let d = can_observe(&observer, &creature, &env, &config, &mut always_low());

        assert_eq!(d.effective_radius, 25.0);
        assert!(d.line_of_sight.is_clear());
        assert!(!d.from_behind);
        assert!(d.observed);
    }

    #[test]
    fn test_perfect_stealth_keeps_floor_radius() {
        assert!((stealth_modifier(100.0, 0.3) - 0.3).abs() < 1e-6);
        assert_eq!(stealth_modifier(0.0, 0.3), 1.0);
        assert!((effective_radius(40.0, 100.0, 0.3) - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_ridge_blocks_sight() {
        let terrain = HeightFn {
            height: |_x: f32, z: f32| if (9.0..11.0).contains(&z) { 10.0 } else { 0.0 },
            slope: |_, _| 0.0,
        };
        let water = StaticWater::default();
        let veg = UniformVegetation::default();
        let env = Environment::new(&terrain, &water, &veg);
        let config = SimulationConfig::default();

        let creature = creature_facing_plus_z(30.0);
        let observer = observer_at(20.0, 0.0, PhysicalState::Running);
        let d = can_observe(&observer, &creature, &env, &config, &mut always_low());
        assert_eq!(d.line_of_sight, LineOfSight::BlockedByTerrain);
        assert!(!d.observed);
    }

    #[test]
    fn test_dense_vegetation_blocks_sight() {
        let terrain = FlatTerrain::default();
        let water = StaticWater::default();
        let veg = UniformVegetation { density: 0.95 };
        let env = Environment::new(&terrain, &water, &veg);
        let config = SimulationConfig::default();

        let creature = creature_facing_plus_z(30.0);
        let observer = observer_at(10.0, 0.0, PhysicalState::Walking);
        let d = can_observe(&observer, &creature, &env, &config, &mut always_low());
        assert_eq!(d.line_of_sight, LineOfSight::BlockedByVegetation);
        assert!(!d.observed);
    }

    #[test]
    fn test_rear_approach_roll_is_pinned_by_rng() {
        let terrain = FlatTerrain::default();
        let water = StaticWater::default();
        let veg = UniformVegetation::default();
        let env = Environment::new(&terrain, &water, &veg);
        let config = SimulationConfig::default();

        // Creature faces away from the observer
        let creature = creature_facing_plus_z(30.0).with_facing(PI);
        let observer = observer_at(10.0, 0.0, PhysicalState::Crouching);

        let missed = can_observe(&observer, &creature, &env, &config, &mut always_low());
        assert!(missed.from_behind);
        assert!(missed.stealth_miss);
        assert!(!missed.observed);

        let seen = can_observe(&observer, &creature, &env, &config, &mut always_high());
        assert!(seen.from_behind);
        assert!(!seen.stealth_miss);
        assert!(seen.observed);
    }

    #[test]
    fn test_running_gets_no_rear_bonus() {
        let terrain = FlatTerrain::default();
        let water = StaticWater::default();
        let veg = UniformVegetation::default();
        let env = Environment::new(&terrain, &water, &veg);
        let config = SimulationConfig::default();

        let creature = creature_facing_plus_z(30.0).with_facing(PI);
        let observer = observer_at(10.0, 0.0, PhysicalState::Running);
        let d = can_observe(&observer, &creature, &env, &config, &mut always_low());
        assert!(d.from_behind);
        assert!(d.observed);
    }

    #[test]
    fn test_dead_creatures_observe_nothing() {
        let terrain = FlatTerrain::default();
        let water = StaticWater::default();
        let veg = UniformVegetation::default();
        let env = Environment::new(&terrain, &water, &veg);
        let config = SimulationConfig::default();

        let mut creature = creature_facing_plus_z(30.0);
        creature.kill();
        let observer = observer_at(1.0, 0.0, PhysicalState::Running);
        assert!(!can_observe(&observer, &creature, &env, &config, &mut always_low()).observed);
    }

    #[test]
    fn test_service_caches_until_next_tick() {
        let terrain = FlatTerrain::default();
        let water = StaticWater::default();
        let veg = UniformVegetation::default();
        let env = Environment::new(&terrain, &water, &veg);
        let config = SimulationConfig::default();

        let mut ids: SlotMap<EntityId, ()> = SlotMap::with_key();
        let id = ids.insert(());
        let creature = creature_facing_plus_z(30.0);
        let mut observer = observer_at(10.0, 0.0, PhysicalState::Walking);

        let mut service = DetectionService::new();
        let first = service.observe(id, &observer, &creature, &env, &config, &mut always_low());
        assert!(first.observed);

        // Moving out of range does not change the cached answer within a tick
        observer.position = Vec3::new(0.0, 0.0, 500.0);
        let cached = service.observe(id, &observer, &creature, &env, &config, &mut always_low());
        assert_eq!(first, cached);

        service.begin_tick();
        assert!(service.is_empty());
        let fresh = service.observe(id, &observer, &creature, &env, &config, &mut always_low());
        assert!(!fresh.observed);
    }

    proptest! {
        #[test]
        fn prop_never_observed_beyond_effective_radius(
            radius in 0.0f32..100.0,
            stealth in -50.0f32..150.0,
            distance in 0.0f32..200.0,
            facing in -PI..PI,
            seed in any::<u64>(),
        ) {
            use rand::SeedableRng;
            let terrain = FlatTerrain::default();
            let water = StaticWater::default();
            let veg = UniformVegetation::default();
            let env = Environment::new(&terrain, &water, &veg);
            let config = SimulationConfig::default();

            let creature = creature_facing_plus_z(radius).with_facing(facing);
            let observer = observer_at(distance, stealth, PhysicalState::Walking);
            let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
            let d = can_observe(&observer, &creature, &env, &config, &mut rng);

            let limit = radius * (1.0 - stealth.clamp(0.0, 100.0) / 100.0).max(0.3);
            // Margin keeps float rounding of the distance out of the comparison
            if distance > limit * 1.001 + 1e-3 {
                prop_assert!(!d.observed);
            }
        }
    }
}
