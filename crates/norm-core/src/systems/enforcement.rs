//! Enforcement System
//!
//! Runs once per simulation step over every pending obligation. The norm's
//! policy decides; this module applies the outcome to the ledger, trust maps,
//! counters and the obligation log.

use rand::rngs::SmallRng;

use norm_events::{ObligationLogEntry, ObligationStatus};

use crate::components::{ObligationVector, Population};
use crate::config::SimConfig;
use crate::norms::{EnforcementPolicy, NormRegistry, PolicyInput, Resolution};
use crate::output::SimulationLog;
use crate::simulation::Simulation;
use crate::spatial::Proximity;

/// Shared per-step context handed to every enforcement call
pub struct StepContext<'a> {
    pub generation: u32,
    pub log: &'a mut SimulationLog,
}

/// Counts of what one step resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepSummary {
    pub fulfilled: u32,
    pub denied: u32,
    pub expired: u32,
    pub still_pending: u32,
}

impl StepSummary {
    fn count(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::StillPending => self.still_pending += 1,
            Resolution::Resolved(ObligationStatus::Fulfilled) => self.fulfilled += 1,
            Resolution::Resolved(ObligationStatus::Denied) => self.denied += 1,
            Resolution::Resolved(ObligationStatus::Expired) => self.expired += 1,
            Resolution::Resolved(_) => {}
        }
    }
}

/// Enforce every pending obligation once, then let the motion stand-in move
pub fn enforcement_step(sim: &mut Simulation) -> StepSummary {
    let Simulation {
        config,
        registry,
        population,
        vectors,
        proximity,
        rng,
        log,
        generation,
        ..
    } = sim;

    let mut ctx = StepContext {
        generation: *generation,
        log,
    };
    let mut summary = StepSummary::default();

    for vector in vectors.iter_mut().filter(|v| v.is_pending()) {
        let resolution = enforce(vector, registry, population, &**proximity, config, &mut rng.0, &mut ctx);
        summary.count(resolution);
    }

    proximity.advance(&mut rng.0);
    summary
}

/// Advance one pending obligation by one step
pub fn enforce(
    vector: &mut ObligationVector,
    registry: &NormRegistry,
    population: &mut Population,
    proximity: &dyn Proximity,
    config: &SimConfig,
    rng: &mut SmallRng,
    ctx: &mut StepContext<'_>,
) -> Resolution {
    if !vector.is_pending() {
        return Resolution::Resolved(vector.status());
    }

    let endpoints = (population.get(vector.source), population.get(vector.target));
    let (Some(source), Some(target)) = endpoints else {
        tracing::trace!("Obligation {} -> {} has an absent endpoint", vector.source, vector.target);
        vector.tick();
        return Resolution::StillPending;
    };
    if source.id == target.id {
        tracing::trace!("Obligation {} -> {} binds an agent to itself", vector.source, vector.target);
        vector.tick();
        return Resolution::StillPending;
    }

    // Unknown norms are acknowledged by nobody and enforced by threshold
    let policy = registry
        .get(&vector.norm)
        .map_or(EnforcementPolicy::Threshold, |norm| norm.policy);
    let input = PolicyInput {
        source_acknowledges: registry.acknowledges(&vector.norm, source),
        target_acknowledges: registry.acknowledges(&vector.norm, target),
        within_proximity: proximity.within(vector.source, vector.target, config.obligations.proximity_threshold),
        expired: vector.has_expired(),
        ready: vector.is_ready(),
        strength: vector.strength,
    };

    match policy.decide(&input, rng) {
        Resolution::StillPending => {
            vector.tick();
            Resolution::StillPending
        }
        Resolution::Resolved(status) => apply_resolution(vector, status, population, config, ctx),
    }
}

/// Transition the vector together with its ledger write, trust update,
/// counters and log entry. The status never changes without them.
///
/// A denial or expiry already on the source's ledger for this target is not
/// applied or logged again.
fn apply_resolution(
    vector: &mut ObligationVector,
    status: ObligationStatus,
    population: &mut Population,
    config: &SimConfig,
    ctx: &mut StepContext<'_>,
) -> Resolution {
    let Some((source, target)) = population.pair_mut(vector.source, vector.target) else {
        vector.tick();
        return Resolution::StillPending;
    };
    if let Err(e) = vector.transition(status) {
        tracing::warn!("Policy for {} produced {}", vector.norm, e);
        return Resolution::Resolved(vector.status());
    }

    if status.is_breach() && source.ledger_status(target.id) == Some(status) {
        tracing::trace!("{} -> {} already {}, not logging again", source.id, target.id, status);
        return Resolution::Resolved(status);
    }

    source.record_outcome(target.id, status);
    match status {
        ObligationStatus::Fulfilled => {
            source.attempts += 1;
            source.successes += 1;
            source.adjust_trust(target.id, config.trust.increment);
            target.adjust_trust(source.id, config.trust.increment);
        }
        ObligationStatus::Denied => {
            source.attempts += 1;
            source.adjust_trust(target.id, -config.trust.decrement);
            target.adjust_trust(source.id, -config.trust.decrement);
        }
        ObligationStatus::Expired => {
            source.adjust_trust(target.id, -config.trust.decrement);
            target.adjust_trust(source.id, -config.trust.decrement);
        }
        ObligationStatus::Pending | ObligationStatus::Repaired => {}
    }

    tracing::trace!("{} -> {} under {}: {}", vector.source, vector.target, vector.norm, status);
    ctx.log.record_obligation(ObligationLogEntry::new(
        ctx.generation,
        vector.source,
        vector.target,
        vector.norm.clone(),
        status,
    ));
    Resolution::Resolved(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Agent, Traits};
    use crate::norms::NormDefinition;
    use crate::spatial::FnProximity;
    use norm_events::AgentId;
    use rand::SeedableRng;

    fn setup(source_acks: bool, target_acks: bool) -> (Population, NormRegistry) {
        let a = Agent::new(AgentId(1), 0, "legal", Traits::default()).with_acknowledgments([("legal", source_acks)]);
        let b = Agent::new(AgentId(2), 0, "legal", Traits::default()).with_acknowledgments([("legal", target_acks)]);
        let mut registry = NormRegistry::new();
        registry.register(NormDefinition::recorded("legal", EnforcementPolicy::Threshold));
        (Population::from_agents(vec![a, b]), registry)
    }

    fn run_step(
        vector: &mut ObligationVector,
        population: &mut Population,
        registry: &NormRegistry,
        distance: f32,
        log: &mut SimulationLog,
    ) -> Resolution {
        let config = SimConfig::default();
        let proximity = FnProximity::new(move |_: AgentId, _: AgentId| Some(distance));
        let mut rng = SmallRng::seed_from_u64(0);
        let mut ctx = StepContext { generation: 1, log };
        enforce(vector, registry, population, &proximity, &config, &mut rng, &mut ctx)
    }

    #[test]
    fn test_fulfillment_updates_both_sides() {
        let (mut population, registry) = setup(true, true);
        let mut log = SimulationLog::new();
        let mut vector = ObligationVector::new(AgentId(1), AgentId(2), "legal", 0.5, 5, 1);

        let resolution = run_step(&mut vector, &mut population, &registry, 1.0, &mut log);

        assert_eq!(resolution, Resolution::Resolved(ObligationStatus::Fulfilled));
        let source = population.get(AgentId(1)).unwrap();
        let target = population.get(AgentId(2)).unwrap();
        assert_eq!(source.trust_in(AgentId(2)), 1.0);
        assert_eq!(target.trust_in(AgentId(1)), 1.0);
        assert_eq!(source.attempts, 1);
        assert_eq!(source.successes, 1);
        assert_eq!(source.ledger_status(AgentId(2)), Some(ObligationStatus::Fulfilled));
        assert_eq!(log.obligations.len(), 1);
    }

    #[test]
    fn test_far_apart_ages_then_expires() {
        let (mut population, registry) = setup(true, true);
        let mut log = SimulationLog::new();
        let mut vector = ObligationVector::new(AgentId(1), AgentId(2), "legal", 0.5, 2, 1);

        assert_eq!(run_step(&mut vector, &mut population, &registry, 1000.0, &mut log), Resolution::StillPending);
        assert_eq!(run_step(&mut vector, &mut population, &registry, 1000.0, &mut log), Resolution::StillPending);
        assert_eq!(vector.age, 2);
        assert_eq!(
            run_step(&mut vector, &mut population, &registry, 1000.0, &mut log),
            Resolution::Resolved(ObligationStatus::Expired)
        );

        let source = population.get(AgentId(1)).unwrap();
        assert_eq!(source.trust_in(AgentId(2)), -1.0);
        assert_eq!(source.attempts, 0);
        assert_eq!(source.contradiction_debt(), 1);
        assert_eq!(log.obligations.len(), 1);
    }

    #[test]
    fn test_repeat_denial_is_not_logged_twice() {
        let (mut population, registry) = setup(true, false);
        let mut log = SimulationLog::new();

        let mut first = ObligationVector::new(AgentId(1), AgentId(2), "legal", 0.5, 5, 1);
        let mut second = ObligationVector::new(AgentId(1), AgentId(2), "legal", 0.5, 5, 1);
        run_step(&mut first, &mut population, &registry, 1.0, &mut log);
        run_step(&mut second, &mut population, &registry, 1.0, &mut log);

        assert_eq!(first.status(), ObligationStatus::Denied);
        assert_eq!(second.status(), ObligationStatus::Denied);
        assert_eq!(log.obligations.len(), 1);
        assert_eq!(population.get(AgentId(1)).unwrap().trust_in(AgentId(2)), -1.0);
    }

    #[test]
    fn test_gated_vector_waits_for_signal() {
        let (mut population, registry) = setup(true, true);
        let mut log = SimulationLog::new();
        let mut vector = ObligationVector::new(AgentId(1), AgentId(2), "legal", 0.5, 5, 1).gated();

        assert_eq!(run_step(&mut vector, &mut population, &registry, 1.0, &mut log), Resolution::StillPending);
        assert_eq!(vector.age, 1);

        vector.raise_gate();
        assert_eq!(
            run_step(&mut vector, &mut population, &registry, 1.0, &mut log),
            Resolution::Resolved(ObligationStatus::Fulfilled)
        );
    }

    #[test]
    fn test_absent_endpoint_is_ignored() {
        let (mut population, registry) = setup(true, true);
        let mut log = SimulationLog::new();
        let mut vector = ObligationVector::new(AgentId(1), AgentId(42), "legal", 0.5, 5, 1);

        assert_eq!(run_step(&mut vector, &mut population, &registry, 1.0, &mut log), Resolution::StillPending);
        assert!(log.obligations.is_empty());
    }

    #[test]
    fn test_self_obligation_stays_pending() {
        let (mut population, registry) = setup(true, true);
        let mut log = SimulationLog::new();
        let mut vector = ObligationVector::new(AgentId(1), AgentId(1), "legal", 0.5, 5, 1);

        assert_eq!(run_step(&mut vector, &mut population, &registry, 1.0, &mut log), Resolution::StillPending);
        assert!(vector.is_pending());
        assert_eq!(vector.age, 1);
        assert!(log.obligations.is_empty());
        assert_eq!(population.get(AgentId(1)).unwrap().ledger_status(AgentId(1)), None);
    }
}
