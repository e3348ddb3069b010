//! Simulation Components
//!
//! Agents, the population that owns them, and the obligation vectors that
//! run between them.

pub mod agent;
pub mod obligation;
pub mod population;

pub use agent::*;
pub use obligation::*;
pub use population::Population;
