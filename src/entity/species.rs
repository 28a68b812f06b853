//! Species table
//!
//! Every creature shares one record; the species tag selects its constants,
//! its closed set of AI states and its spawn parameters.

use serde::{Deserialize, Serialize};

use crate::entity::state::AiState;

/// Closed set of wild species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    Deer,
    Rabbit,
    Boar,
    Wolf,
    Tiger,
}

/// Coarse classification that decides the default response to the protagonist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorCategory {
    Prey,
    Predator,
    Neutral,
    Territorial,
}

/// Sensory constants, overridable per creature at construction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensoryProfile {
    pub detection_radius: f32,
    pub flee_distance: f32,
    pub attack_range: f32,
}

/// Per-species constants
#[derive(Debug, Clone, Copy)]
pub struct SpeciesProfile {
    pub max_health: f32,
    pub max_stamina: f32,
    pub sensory: SensoryProfile,
    pub walk_speed: f32,
    pub run_speed: f32,
    /// Damage of one strike on the protagonist
    pub attack_damage: f32,
    /// Relative weight in the spawn draw
    pub spawn_weight: u32,
    /// Inclusive group size range
    pub group_size: (u32, u32),
}

const GENERIC_STATES: &[AiState] = &[
    AiState::Idle,
    AiState::Grazing,
    AiState::Moving,
    AiState::Alert,
    AiState::Fleeing,
    AiState::Aggressive,
];

const DEER_STATES: &[AiState] = &[
    AiState::Idle,
    AiState::Grazing,
    AiState::Wandering,
    AiState::Alert,
    AiState::Fleeing,
];

const TIGER_STATES: &[AiState] = &[
    AiState::Idle,
    AiState::Wandering,
    AiState::Alert,
    AiState::Approaching,
    AiState::Retreating,
    AiState::Dominant,
    AiState::Friendly,
];

impl Species {
    pub const ALL: [Species; 5] = [
        Species::Deer,
        Species::Rabbit,
        Species::Boar,
        Species::Wolf,
        Species::Tiger,
    ];

    pub fn category(&self) -> BehaviorCategory {
        match self {
            Species::Deer | Species::Rabbit => BehaviorCategory::Prey,
            Species::Wolf => BehaviorCategory::Predator,
            Species::Boar => BehaviorCategory::Neutral,
            Species::Tiger => BehaviorCategory::Territorial,
        }
    }

    pub fn profile(&self) -> SpeciesProfile {
        match self {
            Species::Deer => SpeciesProfile {
                max_health: 60.0,
                max_stamina: 100.0,
                sensory: SensoryProfile {
                    detection_radius: 30.0,
                    flee_distance: 25.0,
                    attack_range: 1.5,
                },
                walk_speed: 2.5,
                run_speed: 9.0,
                attack_damage: 6.0,
                spawn_weight: 35,
                group_size: (3, 6),
            },
            Species::Rabbit => SpeciesProfile {
                max_health: 20.0,
                max_stamina: 60.0,
                sensory: SensoryProfile {
                    detection_radius: 20.0,
                    flee_distance: 15.0,
                    attack_range: 0.8,
                },
                walk_speed: 1.5,
                run_speed: 8.0,
                attack_damage: 1.0,
                spawn_weight: 30,
                group_size: (1, 3),
            },
            Species::Boar => SpeciesProfile {
                max_health: 90.0,
                max_stamina: 80.0,
                sensory: SensoryProfile {
                    detection_radius: 22.0,
                    flee_distance: 12.0,
                    attack_range: 2.0,
                },
                walk_speed: 2.0,
                run_speed: 6.5,
                attack_damage: 12.0,
                spawn_weight: 15,
                group_size: (1, 3),
            },
            Species::Wolf => SpeciesProfile {
                max_health: 80.0,
                max_stamina: 120.0,
                sensory: SensoryProfile {
                    detection_radius: 35.0,
                    flee_distance: 18.0,
                    attack_range: 2.2,
                },
                walk_speed: 3.0,
                run_speed: 8.5,
                attack_damage: 15.0,
                spawn_weight: 12,
                group_size: (2, 4),
            },
            Species::Tiger => SpeciesProfile {
                max_health: 150.0,
                max_stamina: 150.0,
                sensory: SensoryProfile {
                    detection_radius: 40.0,
                    flee_distance: 0.0,
                    attack_range: 3.0,
                },
                walk_speed: 2.5,
                run_speed: 8.0,
                attack_damage: 25.0,
                spawn_weight: 8,
                group_size: (1, 1),
            },
        }
    }

    /// The AI states this species may ever be in
    pub fn states(&self) -> &'static [AiState] {
        match self {
            Species::Deer => DEER_STATES,
            Species::Tiger => TIGER_STATES,
            Species::Rabbit | Species::Boar | Species::Wolf => GENERIC_STATES,
        }
    }

    pub fn allows(&self, state: AiState) -> bool {
        self.states().contains(&state)
    }

    /// State a creature rests in (spawn state, and the state of a corpse)
    pub fn rest_state(&self) -> AiState {
        match self {
            Species::Tiger => AiState::Wandering,
            _ => AiState::Idle,
        }
    }

    /// Whether `attempt_hunt` may target this species
    ///
    /// Territorial tigers are met through social encounters instead.
    pub fn is_huntable(&self) -> bool {
        self.category() != BehaviorCategory::Territorial
    }

    /// Whether this species strikes a target in range without being provoked
    pub fn attacks_unprovoked(&self) -> bool {
        matches!(self, Species::Boar) || self.category() == BehaviorCategory::Predator
    }

    /// Whether the awareness signal treats this species as a threat
    pub fn is_threat(&self) -> bool {
        self.category() != BehaviorCategory::Prey
    }

    pub fn flocks(&self) -> bool {
        matches!(self, Species::Deer)
    }

    pub fn has_gender(&self) -> bool {
        self.category() == BehaviorCategory::Territorial
    }

    pub fn name(&self) -> &'static str {
        match self {
            Species::Deer => "deer",
            Species::Rabbit => "rabbit",
            Species::Boar => "boar",
            Species::Wolf => "wolf",
            Species::Tiger => "tiger",
        }
    }
}
