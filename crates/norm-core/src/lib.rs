//! Moral Community Simulation Library
//!
//! Agents issue, honor, deny and let expire directed obligations under a set
//! of norms, accumulating trust and relational debt while they drift between
//! normative regimes and emergent affiliations.

use rand::rngs::SmallRng;
use rand::SeedableRng;

pub mod batch;
pub mod components;
pub mod config;
pub mod error;
pub mod norms;
pub mod output;
pub mod scenario;
pub mod simulation;
pub mod spatial;
pub mod systems;

pub use batch::{BatchReport, BatchRunner, RunSummary, Toggles};
pub use components::{Agent, ObligationVector, Population, Traits};
pub use config::SimConfig;
pub use error::{ConfigError, SimError, TransitionError};
pub use norms::{Acknowledgment, EnforcementPolicy, NormDefinition, NormRegistry};
pub use output::{write_outputs, SimulationLog};
pub use scenario::ScenarioPreset;
pub use simulation::Simulation;
pub use spatial::{Arena, FnProximity, Proximity};

/// Seeded random number generator; every stochastic draw goes through it
pub struct SimRng(pub SmallRng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }
}
