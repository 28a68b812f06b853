pub mod awareness;
pub mod behavior;
pub mod detection;
pub mod interaction;
pub mod registry;
pub mod tick;

pub use awareness::{AwarenessAggregator, AwarenessBreakdown, ThreatLevel};
pub use behavior::SpeciesBehavior;
pub use detection::{can_observe, Detection, DetectionService, LineOfSight};
pub use interaction::{ConsumptionEvent, HuntReport, SocialOutcome};
pub use registry::{EntityRegistry, PopulationStats};
pub use tick::{SimulationEvent, WildlifeEngine};
