//! Moral Repair
//!
//! Generation-boundary pass that turns denied or expired ledger entries into
//! repaired ones with a fixed probability.

use rand::Rng;

use norm_events::{AgentId, ObligationLogEntry};

use crate::simulation::Simulation;

/// Attempt repair on every breached ledger entry. Returns the repair count.
pub fn apply_moral_repair(sim: &mut Simulation) -> usize {
    let generation = sim.generation;
    let probability = sim.config.repair.probability;
    let mut repaired = 0;

    for agent in sim.population.iter_mut() {
        let breached: Vec<AgentId> = agent
            .ledger()
            .iter()
            .filter(|(_, status)| status.is_breach())
            .map(|(&target, _)| target)
            .collect();

        for target in breached {
            if sim.rng.0.gen::<f32>() >= probability {
                continue;
            }
            if agent.repair_entry(target) {
                sim.log.record_obligation(ObligationLogEntry::repaired(generation, agent.id, target));
                repaired += 1;
            }
        }
    }

    if repaired > 0 {
        tracing::debug!("Repaired {} ledger entries at generation {}", repaired, generation);
    }
    repaired
}
