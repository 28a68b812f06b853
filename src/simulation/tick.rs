//! Tick system - orchestrates one wildlife update
//!
//! Each call to [`WildlifeEngine::update`] runs, in order:
//! spawn cooldown -> behavior (detection feeds the overrides) -> awareness
//! -> creature strikes and territorial encounters -> corpse sweep -> spatial rebuild.
//!
//! Everything is single-threaded and driven by accumulated `dt`, so a seeded
//! engine replays identically.

use ahash::AHashMap;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::types::{planar_distance, EntityId, Tick};
use crate::entity::{AiState, Creature, Protagonist, Species};
use crate::simulation::awareness::{AwarenessAggregator, AwarenessInputs, ThreatLevel, ThreatReading};
use crate::simulation::behavior::{receive_alarm, update_creature, BehaviorContext, FlockView};
use crate::simulation::detection::{Detection, DetectionService};
use crate::simulation::interaction::{
    self, resolve_encounter, strike_protagonist, ConsumptionEvent, HuntReport, SocialOutcome,
};
use crate::simulation::registry::{EntityRegistry, PopulationStats};
use crate::spatial::SpatialIndex;
use crate::world::Environment;

/// Events generated during a tick or by a command
///
/// Collected by the engine until [`WildlifeEngine::drain_events`] is called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationEvent {
    Spawned {
        species: Species,
        members: Vec<EntityId>,
    },
    StateChanged {
        entity: EntityId,
        species: Species,
        from: AiState,
        to: AiState,
    },
    /// A flocking creature spotted the protagonist and warned its mates
    Alarm {
        entity: EntityId,
        mates_alerted: usize,
    },
    /// A creature hit the protagonist
    Struck {
        entity: EntityId,
        species: Species,
        damage: f32,
    },
    Encounter {
        entity: EntityId,
        outcome: SocialOutcome,
    },
    Hunted(HuntReport),
    Consumed(ConsumptionEvent),
    Decayed {
        entity: EntityId,
        species: Species,
    },
}

type ConsumptionHook = Box<dyn FnMut(&ConsumptionEvent)>;

/// The wildlife simulation: owns every creature and the per-tick services
pub struct WildlifeEngine<R: Rng = ChaCha8Rng> {
    config: SimulationConfig,
    registry: EntityRegistry,
    grid: SpatialIndex,
    detection: DetectionService,
    awareness: AwarenessAggregator,
    rng: R,
    events: Vec<SimulationEvent>,
    consumption_hooks: Vec<ConsumptionHook>,
    last_protagonist: Option<Vec3>,
    tick: Tick,
    disposed: bool,
}

impl WildlifeEngine<ChaCha8Rng> {
    /// Engine seeded from `config.seed`
    pub fn new(config: SimulationConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> WildlifeEngine<R> {
    pub fn with_rng(config: SimulationConfig, rng: R) -> Self {
        Self {
            grid: SpatialIndex::new(config.grid_cell_size),
            config,
            registry: EntityRegistry::new(),
            detection: DetectionService::new(),
            awareness: AwarenessAggregator::new(),
            rng,
            events: Vec::new(),
            consumption_hooks: Vec::new(),
            last_protagonist: None,
            tick: 0,
            disposed: false,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Number of completed ticks
    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn get(&self, id: EntityId) -> Option<&Creature> {
        self.registry.get(id)
    }

    pub fn creatures(&self) -> impl Iterator<Item = (EntityId, &Creature)> + '_ {
        self.registry.iter()
    }

    /// Insert a prepared creature, bypassing spawn placement and the cap
    pub fn insert(&mut self, creature: Creature) -> Option<EntityId> {
        if self.disposed {
            return None;
        }
        let position = creature.position;
        let id = self.registry.insert(creature);
        self.grid.insert(id, position);
        Some(id)
    }

    /// Advance the simulation by `dt` seconds
    ///
    /// `dt` is clamped to `max_dt`; non-finite or non-positive steps are ignored.
    pub fn update(&mut self, dt: f32, protagonist: &mut Protagonist, env: &Environment) {
        if self.disposed || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let dt = dt.min(self.config.max_dt);
        self.tick += 1;
        self.detection.begin_tick();
        self.last_protagonist = Some(protagonist.position);

        if self.registry.tick_spawn_cooldown(dt, &self.config) {
            self.spawn_group(env);
        }

        self.update_behaviors(dt, protagonist, env);
        self.update_awareness(protagonist, env);
        self.resolve_interactions(protagonist);

        for (id, species) in self.registry.sweep(dt, self.config.decay_window) {
            self.grid.remove(id);
            self.detection.forget(id);
            self.events.push(SimulationEvent::Decayed { entity: id, species });
        }

        self.grid
            .rebuild(self.registry.iter().map(|(id, c)| (id, c.position)));
    }

    fn update_behaviors(&mut self, dt: f32, protagonist: &Protagonist, env: &Environment) {
        let positions: AHashMap<EntityId, Vec3> = self
            .registry
            .iter()
            .filter(|(_, c)| c.is_alive())
            .map(|(id, c)| (id, c.position))
            .collect();

        let mut alarms = Vec::new();
        for id in self.registry.ids() {
            let Some(creature) = self.registry.get(id) else {
                continue;
            };
            if creature.is_dead() {
                continue;
            }

            let detection =
                self.detection
                    .observe(id, protagonist, creature, env, &self.config, &mut self.rng);
            let flock = if creature.species.flocks() {
                let neighbors = self.flock_neighbors(creature.species, creature.position);
                FlockView::gather(id, &neighbors)
            } else {
                FlockView::default()
            };

            let ctx = BehaviorContext {
                protagonist,
                detection: Some(detection),
                flock: &flock,
                positions: &positions,
                config: &self.config,
            };
            let Some(creature) = self.registry.get_mut(id) else {
                continue;
            };
            let outcome = update_creature(creature, &ctx, env, dt, &mut self.rng);
            if let Some((from, to)) = outcome.changed {
                self.events.push(SimulationEvent::StateChanged {
                    entity: id,
                    species: creature.species,
                    from,
                    to,
                });
            }
            if outcome.alarm {
                alarms.push((id, flock.mates));
            }
        }

        for (source, mates) in alarms {
            let mut alerted = 0;
            for mate in mates {
                let Some(creature) = self.registry.get_mut(mate) else {
                    continue;
                };
                let before = creature.ai();
                if receive_alarm(creature, protagonist.position, &self.config) {
                    self.events.push(SimulationEvent::StateChanged {
                        entity: mate,
                        species: creature.species,
                        from: before,
                        to: creature.ai(),
                    });
                }
                alerted += 1;
            }
            self.events.push(SimulationEvent::Alarm {
                entity: source,
                mates_alerted: alerted,
            });
        }
    }

    /// Live same-species creatures within the flock radius, from last tick's grid
    fn flock_neighbors(&self, species: Species, center: Vec3) -> Vec<(EntityId, Vec3)> {
        self.grid
            .query(center, self.config.flock_radius)
            .into_iter()
            .filter_map(|other| {
                self.registry
                    .get(other)
                    .filter(|c| c.is_alive() && c.species == species)
                    .map(|c| (other, c.position))
            })
            .collect()
    }

    fn update_awareness(&mut self, protagonist: &Protagonist, env: &Environment) {
        let mut threats = Vec::new();
        for id in self.registry.ids() {
            let Some(creature) = self.registry.get(id) else {
                continue;
            };
            if creature.is_dead() || !creature.species.is_threat() {
                continue;
            }
            // Cached from the behavior pass for every creature alive at its start
            let detection =
                self.detection
                    .observe(id, protagonist, creature, env, &self.config, &mut self.rng);
            threats.push(ThreatReading {
                distance: detection.distance,
                effective_radius: detection.effective_radius,
                state: creature.ai(),
                line_of_sight: detection.line_of_sight,
            });
        }

        let position = protagonist.position;
        let inputs = AwarenessInputs {
            threats,
            physical: protagonist.physical,
            stealth: protagonist.stealth_effectiveness(),
            water_distance: env.nearest_water_distance(position),
            vegetation_density: env.vegetation_density(position.x, position.z),
        };
        self.awareness.update(&inputs, &self.config);
    }

    fn resolve_interactions(&mut self, protagonist: &mut Protagonist) {
        for id in self.registry.ids() {
            let Some(creature) = self.registry.get_mut(id) else {
                continue;
            };
            if creature.is_dead() {
                continue;
            }

            if let Some(damage) = strike_protagonist(creature, protagonist, &self.config) {
                self.events.push(SimulationEvent::Struck {
                    entity: id,
                    species: creature.species,
                    damage,
                });
            }

            let in_reach = planar_distance(creature.position, protagonist.position)
                <= self.config.encounter_range;
            if creature.ai() == AiState::Approaching && creature.social.is_some() && in_reach {
                if let Some(outcome) =
                    resolve_encounter(protagonist, creature, &self.config, &mut self.rng)
                {
                    self.events.push(SimulationEvent::Encounter { entity: id, outcome });
                }
            }
        }
    }

    /// Spawn one group away from the protagonist's last known position
    pub fn spawn_group(&mut self, env: &Environment) -> Option<Vec<EntityId>> {
        if self.disposed {
            return None;
        }
        let members = self
            .registry
            .spawn_group(env, &self.config, &mut self.rng, self.last_protagonist)?;
        let mut species = None;
        for id in &members {
            if let Some(creature) = self.registry.get(*id) {
                self.grid.insert(*id, creature.position);
                species = Some(creature.species);
            }
        }
        if let Some(species) = species {
            self.events.push(SimulationEvent::Spawned {
                species,
                members: members.clone(),
            });
        }
        Some(members)
    }

    /// Entities within `radius` of `point`, including corpses
    pub fn entities_near(&self, point: Vec3, radius: f32) -> Vec<EntityId> {
        self.grid
            .query(point, radius)
            .into_iter()
            .filter(|id| self.registry.contains(*id))
            .collect()
    }

    pub fn entities_by_species(&self, species: Species) -> Vec<EntityId> {
        self.registry.entities_by_species(species)
    }

    pub fn population(&self) -> usize {
        self.registry.len()
    }

    pub fn statistics(&self) -> PopulationStats {
        self.registry.statistics()
    }

    /// This tick's detection of the protagonist by `id`, if evaluated
    pub fn detection_of(&self, id: EntityId) -> Option<Detection> {
        self.detection.cached(id)
    }

    pub fn awareness(&self) -> &AwarenessAggregator {
        &self.awareness
    }

    pub fn threat_level(&self) -> ThreatLevel {
        self.awareness.level()
    }

    /// Strike the nearest huntable creature within the protagonist's reach
    pub fn attempt_hunt(&mut self, protagonist: &mut Protagonist) -> Option<HuntReport> {
        if self.disposed {
            return None;
        }
        let report = interaction::hunt(protagonist, &mut self.registry)?;
        self.events.push(SimulationEvent::Hunted(report));
        Some(report)
    }

    /// Eat the nearest corpse within reach, notifying consumption hooks
    pub fn attempt_eat(&mut self, protagonist: &mut Protagonist) -> Option<ConsumptionEvent> {
        if self.disposed {
            return None;
        }
        let event = interaction::eat(protagonist, &mut self.registry, &self.config)?;
        self.grid.remove(event.entity);
        self.detection.forget(event.entity);
        for hook in self.consumption_hooks.iter_mut() {
            hook(&event);
        }
        self.events.push(SimulationEvent::Consumed(event));
        Some(event)
    }

    /// Register a callback run whenever a corpse is eaten
    pub fn on_consumption<F>(&mut self, hook: F)
    where
        F: FnMut(&ConsumptionEvent) + 'static,
    {
        self.consumption_hooks.push(Box::new(hook));
    }

    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        if self.registry.remove(id).is_none() {
            return false;
        }
        self.grid.remove(id);
        self.detection.forget(id);
        true
    }

    pub fn kill_entity(&mut self, id: EntityId) -> bool {
        self.registry.kill(id)
    }

    pub fn drain_events(&mut self) -> Vec<SimulationEvent> {
        std::mem::take(&mut self.events)
    }

    /// Release every creature and hook. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        tracing::debug!(population = self.registry.len(), "disposing wildlife engine");
        self.registry.clear();
        self.grid.clear();
        self.detection.begin_tick();
        self.awareness.reset();
        self.events.clear();
        self.consumption_hooks.clear();
        self.last_protagonist = None;
        self.disposed = true;
    }
}
