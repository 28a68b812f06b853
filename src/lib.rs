//! Wildlife Sim - creature behavior and threat detection for a stealth hunting game
//!
//! The player is a tiger; everything else in the forest is simulated here.
//! Drive it with [`WildlifeEngine::update`] once per frame.

pub mod core;
pub mod entity;
pub mod simulation;
pub mod spatial;
pub mod world;

pub use crate::core::{EntityId, Result, SimulationConfig, WildError};
pub use crate::entity::{Creature, Protagonist, Species};
pub use crate::simulation::{SimulationEvent, WildlifeEngine};
pub use crate::world::Environment;
