//! Obligation Sampling
//!
//! Obligation vectors live for one generation. At every boundary the old set
//! is dropped and a fresh one is sampled from nearby, non-hostile pairs.

use rand::rngs::SmallRng;
use rand::Rng;
use std::cmp::Reverse;

use crate::components::{Agent, ObligationVector, Population, MAX_STRENGTH, MIN_STRENGTH};
use crate::config::ObligationConfig;
use crate::norms::NormRegistry;
use crate::simulation::Simulation;
use crate::spatial::Proximity;
use crate::systems::affiliation::HostilePairs;

/// Replace every obligation vector with a fresh sample. Returns how many
/// were issued; draws without an eligible target are skipped, not retried.
pub fn regenerate_obligations(sim: &mut Simulation) -> usize {
    sim.vectors.clear();

    let live = sim.population.len();
    if live < 2 {
        tracing::debug!("Only {} agents alive, no obligations issued", live);
        return 0;
    }

    let config = &sim.config.obligations;
    let draws = ((live as f32 * config.count_multiplier).floor() as usize).min(config.max_vectors);
    let mut skipped = 0usize;

    for _ in 0..draws {
        match sample_obligation(
            &sim.population,
            &sim.registry,
            &*sim.proximity,
            &sim.hostile_pairs,
            config,
            sim.generation,
            &mut sim.rng.0,
        ) {
            Some(vector) => sim.vectors.push(vector),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} of {} obligation draws with no eligible target", skipped, draws);
    }
    sim.vectors.len()
}

/// Draw one obligation: a random source, then a target that is nearby and
/// not in a group hostile to the source's
pub fn sample_obligation(
    population: &Population,
    registry: &NormRegistry,
    proximity: &dyn Proximity,
    hostile_pairs: &HostilePairs,
    config: &ObligationConfig,
    generation: u32,
    rng: &mut SmallRng,
) -> Option<ObligationVector> {
    let agents = population.agents();
    if agents.len() < 2 {
        return None;
    }

    let source = &agents[rng.gen_range(0..agents.len())];
    let source_group = source.affiliation_or_default();
    let eligible: Vec<&Agent> = agents
        .iter()
        .filter(|target| target.id != source.id)
        .filter(|target| proximity.within(source.id, target.id, config.proximity_threshold))
        .filter(|target| !hostile_pairs.contains(source_group, target.affiliation_or_default()))
        .collect();

    if eligible.is_empty() {
        return None;
    }

    let target = if config.vulnerability_targeting {
        // min_by_key keeps the first of equal keys
        eligible
            .iter()
            .copied()
            .min_by_key(|agent| Reverse(agent.contradiction_debt()))?
    } else {
        eligible[rng.gen_range(0..eligible.len())]
    };

    let strength = rng.gen_range(MIN_STRENGTH..=MAX_STRENGTH);
    let norm = registry.sample(rng)?.name.clone();
    let expiration = config
        .expiration_base
        .saturating_add(rng.gen_range(0..=config.expiration_jitter));

    Some(ObligationVector::new(source.id, target.id, norm, strength, expiration, generation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Traits;
    use crate::config::NormConfig;
    use crate::spatial::FnProximity;
    use norm_events::{AgentId, ObligationStatus};
    use rand::SeedableRng;

    fn grouped(id: u64, group: &str) -> Agent {
        let mut agent = Agent::new(AgentId(id), 0, group, Traits::default());
        agent.affiliation = Some(group.to_string());
        agent
    }

    fn everyone_close() -> FnProximity<impl Fn(AgentId, AgentId) -> Option<f32>> {
        FnProximity::new(|_: AgentId, _: AgentId| Some(0.0))
    }

    #[test]
    fn test_sampled_vectors_are_well_formed() {
        let population = Population::from_agents((0..6).map(|i| grouped(i, "legal")).collect());
        let registry = NormRegistry::from_config(&NormConfig::default());
        let config = ObligationConfig::default();
        let mut rng = SmallRng::seed_from_u64(8);

        for _ in 0..100 {
            let vector = sample_obligation(
                &population,
                &registry,
                &everyone_close(),
                &HostilePairs::default(),
                &config,
                4,
                &mut rng,
            )
            .unwrap();
            assert_ne!(vector.source, vector.target);
            assert!((MIN_STRENGTH..=MAX_STRENGTH).contains(&vector.strength));
            assert!(registry.contains(&vector.norm));
            assert!(vector.expiration >= config.expiration_base);
            assert!(vector.expiration <= config.expiration_base + config.expiration_jitter);
            assert_eq!(vector.created_generation, 4);
            assert_eq!(vector.status(), ObligationStatus::Pending);
        }
    }

    #[test]
    fn test_no_target_in_range_skips_draw() {
        let population = Population::from_agents(vec![grouped(1, "legal"), grouped(2, "legal")]);
        let registry = NormRegistry::from_config(&NormConfig::default());
        let far = FnProximity::new(|_: AgentId, _: AgentId| Some(1000.0));
        let mut rng = SmallRng::seed_from_u64(1);

        let vector = sample_obligation(
            &population,
            &registry,
            &far,
            &HostilePairs::default(),
            &ObligationConfig::default(),
            0,
            &mut rng,
        );
        assert!(vector.is_none());
    }

    #[test]
    fn test_hostile_groups_are_excluded() {
        let population = Population::from_agents(vec![
            grouped(1, "legal"),
            grouped(2, "legal"),
            grouped(3, "care"),
            grouped(4, "care"),
        ]);
        let registry = NormRegistry::from_config(&NormConfig::default());
        let mut hostile = HostilePairs::default();
        hostile.insert("care", "legal");
        let mut rng = SmallRng::seed_from_u64(2);

        for _ in 0..100 {
            let vector = sample_obligation(
                &population,
                &registry,
                &everyone_close(),
                &hostile,
                &ObligationConfig::default(),
                0,
                &mut rng,
            )
            .unwrap();
            let source = population.get(vector.source).unwrap();
            let target = population.get(vector.target).unwrap();
            assert_eq!(source.affiliation, target.affiliation);
        }
    }

    #[test]
    fn test_vulnerability_targeting_picks_most_indebted() {
        let mut indebted = grouped(3, "legal");
        indebted.record_outcome(AgentId(9), ObligationStatus::Denied);
        indebted.record_outcome(AgentId(8), ObligationStatus::Expired);
        let mut tied = grouped(4, "legal");
        tied.record_outcome(AgentId(9), ObligationStatus::Denied);
        tied.record_outcome(AgentId(8), ObligationStatus::Denied);

        let population = Population::from_agents(vec![grouped(1, "legal"), grouped(2, "legal"), indebted, tied]);
        let registry = NormRegistry::from_config(&NormConfig::default());
        let config = ObligationConfig {
            vulnerability_targeting: true,
            ..ObligationConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(3);

        for _ in 0..50 {
            let vector = sample_obligation(
                &population,
                &registry,
                &everyone_close(),
                &HostilePairs::default(),
                &config,
                0,
                &mut rng,
            )
            .unwrap();
            // Agent 3 is first among the most indebted, unless it is the source
            let expected = if vector.source == AgentId(3) { AgentId(4) } else { AgentId(3) };
            assert_eq!(vector.target, expected);
        }
    }

    #[test]
    fn test_huge_expiration_saturates() {
        let population = Population::from_agents(vec![grouped(1, "legal"), grouped(2, "legal")]);
        let registry = NormRegistry::from_config(&NormConfig::default());
        let config = ObligationConfig {
            expiration_base: u32::MAX - 1,
            expiration_jitter: u32::MAX,
            ..ObligationConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(6);

        for _ in 0..20 {
            let vector = sample_obligation(
                &population,
                &registry,
                &everyone_close(),
                &HostilePairs::default(),
                &config,
                0,
                &mut rng,
            )
            .unwrap();
            assert!(vector.expiration >= u32::MAX - 1);
        }
    }
}
