//! Simulation Systems
//!
//! Step and generation-boundary systems for enforcement, lifecycle, obligation
//! sampling, drift, affiliation and repair. Each one takes the simulation
//! context explicitly.

pub mod affiliation;
pub mod drift;
pub mod enforcement;
pub mod lifecycle;
pub mod obligations;
pub mod repair;

pub use affiliation::{
    classify_scenario, classify_scenarios, update_affiliations, update_group_dynamics, HostilePairs,
};
pub use drift::apply_normative_drift;
pub use enforcement::{enforce, enforcement_step, StepContext, StepSummary};
pub use lifecycle::{
    apply_deaths, death_chance, make_offspring, mutation_rate, random_traits, reproduce, spawn_founder,
};
pub use obligations::{regenerate_obligations, sample_obligation};
pub use repair::apply_moral_repair;

use rand::Rng;

/// Uniform offset in [-amount, amount]; zero amount draws nothing
pub(crate) fn jitter<R: Rng + ?Sized>(rng: &mut R, amount: f32) -> f32 {
    if amount <= 0.0 {
        return 0.0;
    }
    rng.gen_range(-amount..=amount)
}
