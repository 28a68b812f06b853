pub mod body;
pub mod creature;
pub mod protagonist;
pub mod species;
pub mod state;

pub use body::Vitals;
pub use creature::{Creature, SocialIntent};
pub use protagonist::Protagonist;
pub use species::{BehaviorCategory, SensoryProfile, Species, SpeciesProfile};
pub use state::{AiState, MovementIntent, Pace, PhysicalState, Target};
