//! Enforcement Policies
//!
//! Decide what happens to a pending obligation on one enforcement step. The
//! decision is pure; applying it (ledger, trust, log) is the enforcement
//! system's job.

use rand::Rng;

use norm_events::ObligationStatus;

/// Closed set of enforcement policies. Each norm uses exactly one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnforcementPolicy {
    /// Deny on missing acknowledgment, expire on age, fulfill on proximity
    Threshold,
    /// Resolve immediately with p = strength x proximity factor x acknowledgment factor
    Probabilistic {
        distant_factor: f32,
        unacknowledged_factor: f32,
    },
}

/// What the policy sees of one obligation on one step
#[derive(Debug, Clone, Copy)]
pub struct PolicyInput {
    pub source_acknowledges: bool,
    pub target_acknowledges: bool,
    pub within_proximity: bool,
    pub expired: bool,
    /// False while a gated vector waits for its readiness signal
    pub ready: bool,
    pub strength: f32,
}

impl PolicyInput {
    pub fn both_acknowledge(&self) -> bool {
        self.source_acknowledges && self.target_acknowledges
    }
}

/// Outcome of one enforcement step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    StillPending,
    Resolved(ObligationStatus),
}

impl EnforcementPolicy {
    pub fn decide<R: Rng + ?Sized>(&self, input: &PolicyInput, rng: &mut R) -> Resolution {
        match *self {
            EnforcementPolicy::Threshold => decide_threshold(input),
            EnforcementPolicy::Probabilistic {
                distant_factor,
                unacknowledged_factor,
            } => decide_probabilistic(input, distant_factor, unacknowledged_factor, rng),
        }
    }
}

fn decide_threshold(input: &PolicyInput) -> Resolution {
    if input.ready && !input.both_acknowledge() {
        return Resolution::Resolved(ObligationStatus::Denied);
    }
    if input.expired {
        return Resolution::Resolved(ObligationStatus::Expired);
    }
    if input.ready && input.within_proximity {
        return Resolution::Resolved(ObligationStatus::Fulfilled);
    }
    Resolution::StillPending
}

/// Success probability for the probabilistic policy
pub fn success_probability(input: &PolicyInput, distant_factor: f32, unacknowledged_factor: f32) -> f32 {
    let proximity = if input.within_proximity { 1.0 } else { distant_factor };
    let acknowledgment = if input.both_acknowledge() { 1.0 } else { unacknowledged_factor };
    input.strength * proximity * acknowledgment
}

fn decide_probabilistic<R: Rng + ?Sized>(
    input: &PolicyInput,
    distant_factor: f32,
    unacknowledged_factor: f32,
    rng: &mut R,
) -> Resolution {
    if input.expired {
        return Resolution::Resolved(ObligationStatus::Expired);
    }
    if !input.ready {
        return Resolution::StillPending;
    }
    let p = success_probability(input, distant_factor, unacknowledged_factor);
    if rng.gen::<f32>() < p {
        Resolution::Resolved(ObligationStatus::Fulfilled)
    } else {
        Resolution::Resolved(ObligationStatus::Denied)
    }
}
