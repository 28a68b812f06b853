//! Creature storage, spawning and lifecycle
//!
//! Creatures live in a generational arena. Handles stay valid until the
//! creature is swept, eaten or removed, after which lookups return `None`.

use std::collections::BTreeMap;

use glam::Vec3;
use ordered_float::OrderedFloat;
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::core::config::SimulationConfig;
use crate::core::types::{planar_distance, EntityId, Gender};
use crate::entity::{AiState, Creature, Species};
use crate::world::Environment;

/// Snapshot of the population for HUDs and the headless runner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub total: usize,
    pub alive: usize,
    pub dead: usize,
    pub by_species: BTreeMap<Species, usize>,
    /// Live creatures only
    pub by_state: BTreeMap<AiState, usize>,
}

/// Owner of every creature in the simulation
#[derive(Debug)]
pub struct EntityRegistry {
    creatures: SlotMap<EntityId, Creature>,
    spawn_cooldown: f32,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            creatures: SlotMap::with_key(),
            spawn_cooldown: 0.0,
        }
    }

    /// Total creatures including corpses; this is what the cap bounds
    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.creatures.contains_key(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Creature> {
        self.creatures.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Creature> {
        self.creatures.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Creature)> + '_ {
        self.creatures.iter()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.creatures.keys().collect()
    }

    /// Insert a creature directly, ignoring the cap
    pub fn insert(&mut self, creature: Creature) -> EntityId {
        self.creatures.insert(creature)
    }

    /// Immediate removal; `None` for stale handles
    pub fn remove(&mut self, id: EntityId) -> Option<Creature> {
        self.creatures.remove(id)
    }

    /// Force a creature's health to zero. False if missing or already dead.
    pub fn kill(&mut self, id: EntityId) -> bool {
        match self.creatures.get_mut(id) {
            Some(creature) => {
                let killed = creature.kill();
                if killed {
                    tracing::info!(species = creature.species.name(), "creature killed");
                }
                killed
            }
            None => false,
        }
    }

    pub fn entities_by_species(&self, species: Species) -> Vec<EntityId> {
        self.creatures
            .iter()
            .filter(|(_, c)| c.species == species)
            .map(|(id, _)| id)
            .collect()
    }

    /// Closest creature within `radius` of `point` that passes `filter`
    pub fn nearest<F>(&self, point: Vec3, radius: f32, filter: F) -> Option<EntityId>
    where
        F: Fn(&Creature) -> bool,
    {
        self.creatures
            .iter()
            .filter(|(_, c)| filter(c))
            .map(|(id, c)| (id, c.position.distance(point)))
            .filter(|(_, d)| *d <= radius)
            .min_by_key(|(_, d)| OrderedFloat(*d))
            .map(|(id, _)| id)
    }

    pub fn statistics(&self) -> PopulationStats {
        let mut stats = PopulationStats {
            total: self.creatures.len(),
            ..Default::default()
        };
        for creature in self.creatures.values() {
            *stats.by_species.entry(creature.species).or_insert(0) += 1;
            if creature.is_alive() {
                stats.alive += 1;
                *stats.by_state.entry(creature.ai()).or_insert(0) += 1;
            } else {
                stats.dead += 1;
            }
        }
        stats
    }

    pub fn spawn_cooldown(&self) -> f32 {
        self.spawn_cooldown
    }

    /// Count down the spawn timer; true when a spawn is due
    ///
    /// The timer is reset to the spawn interval whenever it fires, whether
    /// or not the spawn then succeeds.
    pub fn tick_spawn_cooldown(&mut self, dt: f32, config: &SimulationConfig) -> bool {
        self.spawn_cooldown -= dt;
        if self.spawn_cooldown > 0.0 {
            return false;
        }
        self.spawn_cooldown = config.spawn_interval;
        true
    }

    /// Spawn one group of a randomly drawn species
    ///
    /// Returns `None` when the population is already at the cap or no valid
    /// anchor point turned up within the attempt budget.
    pub fn spawn_group<R: Rng>(
        &mut self,
        env: &Environment,
        config: &SimulationConfig,
        rng: &mut R,
        avoid: Option<Vec3>,
    ) -> Option<Vec<EntityId>> {
        let room = config.population_cap.saturating_sub(self.len());
        if room == 0 {
            tracing::debug!(cap = config.population_cap, "spawn skipped, population at cap");
            return None;
        }

        let species = draw_species(rng)?;
        let (min, max) = species.profile().group_size;
        let size = (rng.gen_range(min..=max.max(min)) as usize).min(room);

        let Some(anchor) = self.find_anchor(env, config, rng, avoid) else {
            tracing::debug!(
                species = species.name(),
                attempts = config.spawn_attempts,
                "no valid spawn point"
            );
            return None;
        };

        let (lo, hi) = config.world_bounds();
        let phase = rng.gen_range(0.0..std::f32::consts::TAU);
        let mut ids = Vec::with_capacity(size);
        for i in 0..size {
            let offset = if i == 0 {
                Vec3::ZERO
            } else {
                let angle = phase + std::f32::consts::TAU * i as f32 / (size - 1) as f32;
                Vec3::new(angle.sin(), 0.0, angle.cos()) * config.group_spread
            };
            let x = (anchor.x + offset.x).clamp(lo, hi);
            let z = (anchor.z + offset.z).clamp(lo, hi);
            let position = Vec3::new(x, env.ground_height(x, z) + config.spawn_clearance, z);

            let mut creature = Creature::new(species, position)
                .with_facing(rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI));
            if species.has_gender() {
                let gender = if rng.gen_bool(0.5) {
                    Gender::Male
                } else {
                    Gender::Female
                };
                creature = creature.with_gender(gender);
            }
            ids.push(self.creatures.insert(creature));
        }

        tracing::debug!(species = species.name(), size, ?anchor, "spawned group");
        Some(ids)
    }

    fn find_anchor<R: Rng>(
        &self,
        env: &Environment,
        config: &SimulationConfig,
        rng: &mut R,
        avoid: Option<Vec3>,
    ) -> Option<Vec3> {
        let limit = config.world_half_extent - config.world_margin;
        if !(limit > 0.0) {
            return None;
        }
        let water = env.water.water_bodies();

        for _ in 0..config.spawn_attempts {
            let x = rng.gen_range(-limit..limit);
            let z = rng.gen_range(-limit..limit);
            let candidate = Vec3::new(x, env.ground_height(x, z), z);
            if self.is_valid_anchor(candidate, env, &water, config, avoid) {
                return Some(candidate);
            }
        }
        None
    }

    fn is_valid_anchor(
        &self,
        candidate: Vec3,
        env: &Environment,
        water: &[crate::world::WaterBody],
        config: &SimulationConfig,
        avoid: Option<Vec3>,
    ) -> bool {
        if env.ground_slope(candidate.x, candidate.z) > config.max_spawn_slope {
            return false;
        }
        let near_water = water
            .iter()
            .filter_map(|body| body.distance_to_perimeter(candidate))
            .any(|d| d < config.water_clearance);
        if near_water {
            return false;
        }
        let crowded = self
            .creatures
            .values()
            .any(|c| planar_distance(c.position, candidate) < config.min_entity_spacing);
        if crowded {
            return false;
        }
        avoid.map_or(true, |p| planar_distance(p, candidate) >= config.min_protagonist_distance)
    }

    /// Advance death timers and remove corpses past the decay window
    pub fn sweep(&mut self, dt: f32, decay_window: f32) -> Vec<(EntityId, Species)> {
        let mut expired = Vec::new();
        for (id, creature) in self.creatures.iter_mut() {
            if let Some(elapsed) = creature.advance_decay(dt) {
                if elapsed >= decay_window {
                    expired.push((id, creature.species));
                }
            }
        }
        for (id, species) in &expired {
            self.creatures.remove(*id);
            tracing::debug!(species = species.name(), "corpse decayed");
        }
        expired
    }

    /// Drop every creature and reset the spawn timer
    pub fn clear(&mut self) {
        self.creatures.clear();
        self.spawn_cooldown = 0.0;
    }
}

fn draw_species<R: Rng>(rng: &mut R) -> Option<Species> {
    let weights = Species::ALL.map(|s| s.profile().spawn_weight);
    let dist = WeightedIndex::new(weights).ok()?;
    Some(Species::ALL[dist.sample(rng)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{FlatTerrain, HeightFn, StaticWater, UniformVegetation, WaterBody, WaterKind};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_spawn_never_exceeds_cap() {
        let terrain = FlatTerrain::default();
        let water = StaticWater::default();
        let veg = UniformVegetation::default();
        let env = Environment::new(&terrain, &water, &veg);
        let config = SimulationConfig {
            population_cap: 7,
            min_entity_spacing: 1.0,
            ..Default::default()
        };

        let mut registry = EntityRegistry::new();
        let mut r = rng();
        for _ in 0..50 {
            registry.spawn_group(&env, &config, &mut r, None);
            assert!(registry.len() <= config.population_cap);
        }
        assert_eq!(registry.len(), 7);
        assert!(registry.spawn_group(&env, &config, &mut r, None).is_none());
    }

    #[test]
    fn test_spawned_groups_respect_placement_rules() {
        let terrain = FlatTerrain { height: 3.0 };
        let water = StaticWater {
            bodies: vec![WaterBody::new(Vec3::ZERO, 60.0, WaterKind::Lake)],
        };
        let veg = UniformVegetation::default();
        let env = Environment::new(&terrain, &water, &veg);
        let config = SimulationConfig::default();
        let avoid = Vec3::new(100.0, 0.0, 100.0);

        let mut registry = EntityRegistry::new();
        let mut r = rng();
        for _ in 0..10 {
            let Some(ids) = registry.spawn_group(&env, &config, &mut r, Some(avoid)) else {
                continue;
            };
            let anchor = registry.get(ids[0]).map(|c| c.position).unwrap();
            assert!(anchor.x.abs() <= config.world_half_extent - config.world_margin);
            assert!(anchor.z.abs() <= config.world_half_extent - config.world_margin);
            assert!(planar_distance(anchor, Vec3::ZERO) - 60.0 >= config.water_clearance);
            assert!(planar_distance(anchor, avoid) >= config.min_protagonist_distance);
            for id in &ids {
                let creature = registry.get(*id).unwrap();
                assert!((creature.position.y - 3.5).abs() < 1e-5);
                assert!(planar_distance(creature.position, anchor) <= config.group_spread + 1e-3);
            }
        }
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_new_groups_keep_clear_of_existing_creatures() {
        let terrain = FlatTerrain::default();
        let water = StaticWater::default();
        let veg = UniformVegetation::default();
        let env = Environment::new(&terrain, &water, &veg);
        let config = SimulationConfig {
            population_cap: 200,
            ..Default::default()
        };

        let mut registry = EntityRegistry::new();
        let mut r = rng();
        let mut placed = 0;
        for _ in 0..25 {
            let before: Vec<Vec3> = registry.iter().map(|(_, c)| c.position).collect();
            let Some(ids) = registry.spawn_group(&env, &config, &mut r, None) else {
                continue;
            };
            let anchor = registry.get(ids[0]).map(|c| c.position).unwrap();
            for existing in &before {
                assert!(planar_distance(*existing, anchor) >= config.min_entity_spacing);
            }
            placed += 1;
        }
        assert!(placed > 1);
    }

    #[test]
    fn test_anchors_avoid_steep_ground() {
        // Steep in the west, gentle in the east
        let terrain = HeightFn {
            height: |_, _| 0.0,
            slope: |x: f32, _: f32| if x < 0.0 { 0.9 } else { 0.1 },
        };
        let water = StaticWater::default();
        let veg = UniformVegetation::default();
        let env = Environment::new(&terrain, &water, &veg);
        let config = SimulationConfig {
            population_cap: 200,
            ..Default::default()
        };

        let mut registry = EntityRegistry::new();
        let mut r = rng();
        let mut placed = 0;
        for _ in 0..20 {
            let Some(ids) = registry.spawn_group(&env, &config, &mut r, None) else {
                continue;
            };
            let anchor = registry.get(ids[0]).map(|c| c.position).unwrap();
            assert!(anchor.x >= 0.0);
            assert!(env.ground_slope(anchor.x, anchor.z) <= config.max_spawn_slope);
            placed += 1;
        }
        assert!(placed > 0);
    }

    #[test]
    fn test_steep_world_spawns_nothing() {
        let terrain = HeightFn {
            height: |_, _| 0.0,
            slope: |_, _| 0.9,
        };
        let water = StaticWater::default();
        let veg = UniformVegetation::default();
        let env = Environment::new(&terrain, &water, &veg);
        let config = SimulationConfig::default();

        let mut registry = EntityRegistry::new();
        assert!(registry.spawn_group(&env, &config, &mut rng(), None).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_tigers_get_a_gender() {
        let terrain = FlatTerrain::default();
        let water = StaticWater::default();
        let veg = UniformVegetation::default();
        let env = Environment::new(&terrain, &water, &veg);
        let config = SimulationConfig {
            population_cap: 400,
            min_entity_spacing: 0.0,
            ..Default::default()
        };

        let mut registry = EntityRegistry::new();
        let mut r = rng();
        for _ in 0..100 {
            registry.spawn_group(&env, &config, &mut r, None);
        }
        let tigers = registry.entities_by_species(Species::Tiger);
        assert!(!tigers.is_empty());
        for id in tigers {
            assert!(registry.get(id).unwrap().gender.is_some());
        }
        for id in registry.entities_by_species(Species::Deer) {
            assert!(registry.get(id).unwrap().gender.is_none());
        }
    }

    #[test]
    fn test_decay_boundary() {
        let mut registry = EntityRegistry::new();
        let id = registry.insert(Creature::new(Species::Boar, Vec3::ZERO));
        assert!(registry.kill(id));
        assert!(!registry.kill(id));

        // 29 seconds of sweeping leaves the corpse in place
        for _ in 0..29 {
            assert!(registry.sweep(1.0, 30.0).is_empty());
        }
        assert!(registry.contains(id));
        let removed = registry.sweep(1.0, 30.0);
        assert_eq!(removed, vec![(id, Species::Boar)]);
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn test_live_creatures_are_never_swept() {
        let mut registry = EntityRegistry::new();
        let id = registry.insert(Creature::new(Species::Deer, Vec3::ZERO));
        for _ in 0..100 {
            registry.sweep(1.0, 30.0);
        }
        assert!(registry.contains(id));
    }

    #[test]
    fn test_stale_handles() {
        let mut registry = EntityRegistry::new();
        let id = registry.insert(Creature::new(Species::Rabbit, Vec3::ZERO));
        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
        assert!(!registry.kill(id));

        // A reused slot does not revive the old handle
        let fresh = registry.insert(Creature::new(Species::Rabbit, Vec3::ZERO));
        assert_ne!(id, fresh);
        assert!(registry.get(id).is_none());
        assert!(registry.contains(fresh));
    }

    #[test]
    fn test_statistics() {
        let mut registry = EntityRegistry::new();
        registry.insert(Creature::new(Species::Deer, Vec3::ZERO));
        registry.insert(Creature::new(Species::Deer, Vec3::X));
        let tiger = registry.insert(Creature::new(Species::Tiger, Vec3::Z));
        registry.kill(tiger);

        let stats = registry.statistics();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.alive, 2);
        assert_eq!(stats.dead, 1);
        assert_eq!(stats.by_species.get(&Species::Deer), Some(&2));
        assert_eq!(stats.by_species.get(&Species::Tiger), Some(&1));
        assert_eq!(stats.by_state.get(&AiState::Idle), Some(&2));
        assert_eq!(stats.by_state.get(&AiState::Wandering), None);
    }

    #[test]
    fn test_nearest_honors_filter_and_radius() {
        let mut registry = EntityRegistry::new();
        let near = registry.insert(Creature::new(Species::Deer, Vec3::new(1.0, 0.0, 0.0)));
        let far = registry.insert(Creature::new(Species::Wolf, Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(registry.nearest(Vec3::ZERO, 5.0, |_| true), Some(near));
        assert_eq!(
            registry.nearest(Vec3::ZERO, 5.0, |c| c.species == Species::Wolf),
            Some(far)
        );
        assert_eq!(registry.nearest(Vec3::ZERO, 0.5, |_| true), None);
    }

    #[test]
    fn test_spawn_timer_resets_when_it_fires() {
        let config = SimulationConfig::default();
        let mut registry = EntityRegistry::new();
        assert!(registry.tick_spawn_cooldown(0.1, &config), "first tick spawns");
        assert_eq!(registry.spawn_cooldown(), config.spawn_interval);
        assert!(!registry.tick_spawn_cooldown(config.spawn_interval - 1.0, &config));
        assert!(registry.tick_spawn_cooldown(1.0, &config));
    }
}
