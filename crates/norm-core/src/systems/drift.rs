//! Normative Drift
//!
//! Between generations each agent's momentum wanders, an acknowledgment may
//! flip, and the preferred norm may move to another acknowledged one. With
//! directed emergence, the flip instead adopts the norm preferred by the
//! agent's most trusted living neighbor.

use rand::rngs::SmallRng;
use rand::Rng;

use crate::components::{Agent, Population};
use crate::config::DriftConfig;
use crate::simulation::Simulation;
use crate::systems::jitter;
use crate::systems::lifecycle::MOMENTUM_RANGE;

/// Preferred norm of the living neighbor with the highest positive trust.
/// Ties keep the lowest id.
pub fn most_trusted_preference(agent: &Agent, population: &Population) -> Option<String> {
    let mut best: Option<(&Agent, f32)> = None;
    for (&other, &trust) in &agent.trust {
        if trust <= 0.0 {
            continue;
        }
        let Some(neighbor) = population.get(other) else {
            continue;
        };
        if best.map_or(true, |(_, max)| trust > max) {
            best = Some((neighbor, trust));
        }
    }
    best.map(|(neighbor, _)| neighbor.norm_preference.clone())
}

/// Drift one agent. Returns true when an acknowledgment changed.
///
/// `directed` is the norm to adopt under directed emergence; `None` there
/// means the flip draw changes nothing.
pub fn drift_agent(
    agent: &mut Agent,
    directed: Option<Option<&str>>,
    norms: &[String],
    config: &DriftConfig,
    rng: &mut SmallRng,
) -> bool {
    let momentum = (agent.traits.cultural_momentum + jitter(rng, config.momentum_jitter))
        .clamp(MOMENTUM_RANGE.0, MOMENTUM_RANGE.1);
    agent.traits.cultural_momentum = momentum;

    let mut changed = false;
    if rng.gen::<f32>() < config.flip_chance * (1.1 - momentum) {
        match directed {
            Some(Some(norm)) => {
                if !agent.acknowledges(norm) {
                    agent.set_acknowledgment(norm, true);
                    changed = true;
                }
            }
            Some(None) => {}
            None if norms.is_empty() => {}
            None => {
                let norm = &norms[rng.gen_range(0..norms.len())];
                let current = agent.acknowledges(norm);
                agent.set_acknowledgment(norm.clone(), !current);
                changed = true;
            }
        }
    }

    if rng.gen::<f32>() < config.preference_shift_chance {
        let acknowledged: Vec<&str> = agent.acknowledged_norms().collect();
        if !acknowledged.is_empty() {
            let preference = acknowledged[rng.gen_range(0..acknowledged.len())].to_string();
            agent.norm_preference = preference;
        }
    }
    changed
}

/// Drift every agent once. Returns how many acknowledgments changed.
pub fn apply_normative_drift(sim: &mut Simulation) -> usize {
    let config = &sim.config.drift;

    // Neighbor preferences are read before anyone drifts
    let directed: Vec<Option<String>> = if config.directed_emergence {
        sim.population
            .iter()
            .map(|agent| most_trusted_preference(agent, &sim.population))
            .collect()
    } else {
        Vec::new()
    };
    let norms: Vec<String> = sim.registry.names().map(str::to_string).collect();

    let mut changed = 0;
    for (index, agent) in sim.population.iter_mut().enumerate() {
        let target = if config.directed_emergence {
            Some(directed.get(index).and_then(|norm| norm.as_deref()))
        } else {
            None
        };
        if drift_agent(agent, target, &norms, config, &mut sim.rng.0) {
            changed += 1;
        }
    }

    if changed > 0 {
        tracing::debug!("Normative drift changed {} acknowledgments", changed);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Traits;
    use norm_events::AgentId;
    use rand::SeedableRng;

    fn norms() -> Vec<String> {
        ["legal", "care", "reciprocity", "sanctity"].iter().map(|n| n.to_string()).collect()
    }

    fn always_flip() -> DriftConfig {
        DriftConfig {
            flip_chance: 1.0,
            preference_shift_chance: 0.0,
            momentum_jitter: 0.0,
            directed_emergence: false,
        }
    }

    fn agent() -> Agent {
        Agent::new(
            AgentId(1),
            0,
            "legal",
            Traits {
                cultural_momentum: 0.1,
                ..Traits::default()
            },
        )
        .with_acknowledgments([("legal", false), ("care", false), ("reciprocity", false), ("sanctity", false)])
    }

    #[test]
    fn test_random_flip_changes_one_norm() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut a = agent();

        assert!(drift_agent(&mut a, None, &norms(), &always_flip(), &mut rng));
        assert_eq!(a.acknowledged_norms().count(), 1);
    }

    #[test]
    fn test_directed_emergence_adopts_neighbor_norm() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut a = agent();

        assert!(drift_agent(&mut a, Some(Some("sanctity")), &norms(), &always_flip(), &mut rng));
        assert!(a.acknowledges("sanctity"));
        assert_eq!(a.acknowledged_norms().count(), 1);

        // Already acknowledged: nothing left to adopt
        assert!(!drift_agent(&mut a, Some(Some("sanctity")), &norms(), &always_flip(), &mut rng));
        // No trusted neighbor
        assert!(!drift_agent(&mut a, Some(None), &norms(), &always_flip(), &mut rng));
    }

    #[test]
    fn test_momentum_stays_in_range() {
        let mut rng = SmallRng::seed_from_u64(6);
        let config = DriftConfig {
            momentum_jitter: 0.5,
            ..DriftConfig::default()
        };
        let mut a = agent();
        for _ in 0..200 {
            drift_agent(&mut a, None, &norms(), &config, &mut rng);
            assert!((MOMENTUM_RANGE.0..=MOMENTUM_RANGE.1).contains(&a.traits.cultural_momentum));
        }
    }

    #[test]
    fn test_preference_shifts_to_acknowledged_norm() {
        let mut rng = SmallRng::seed_from_u64(2);
        let config = DriftConfig {
            flip_chance: 0.0,
            preference_shift_chance: 1.0,
            momentum_jitter: 0.0,
            directed_emergence: false,
        };
        let mut a = agent();
        a.set_acknowledgment("care", true);

        drift_agent(&mut a, None, &norms(), &config, &mut rng);
        assert_eq!(a.norm_preference, "care");
    }

    #[test]
    fn test_most_trusted_living_neighbor() {
        let mut a = agent();
        a.adjust_trust(AgentId(2), 1.0);
        a.adjust_trust(AgentId(3), 3.0);
        a.adjust_trust(AgentId(99), 10.0);
        let b = Agent::new(AgentId(2), 0, "care", Traits::default());
        let c = Agent::new(AgentId(3), 0, "sanctity", Traits::default());
        let population = Population::from_agents(vec![a.clone(), b, c]);

        assert_eq!(most_trusted_preference(&a, &population).as_deref(), Some("sanctity"));

        let mut distrustful = agent();
        distrustful.adjust_trust(AgentId(2), -1.0);
        assert_eq!(most_trusted_preference(&distrustful, &population), None);
    }
}
