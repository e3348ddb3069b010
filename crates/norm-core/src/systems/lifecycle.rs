//! Lifecycle System
//!
//! Founding agents, the per-generation death rule, and reproduction with
//! inheritance and mutation.

use rand::rngs::SmallRng;
use rand::Rng;

use norm_events::{AgentId, BiographyEntry, BiographyKind, MoralStance, Role};

use crate::components::{Agent, Traits};
use crate::config::{DeathConfig, ReproductionConfig, SimConfig};
use crate::norms::NormRegistry;
use crate::simulation::Simulation;
use crate::systems::jitter;

/// Momentum stays inside this band for every agent
pub const MOMENTUM_RANGE: (f32, f32) = (0.1, 1.0);

/// Random starting traits for a founding agent
pub fn random_traits(rng: &mut SmallRng) -> Traits {
    let roles = Role::all();
    Traits {
        role: roles[rng.gen_range(0..roles.len())],
        // Average of two uniforms, biased toward the middle
        temperament: (rng.gen::<f32>() + rng.gen::<f32>()) / 2.0,
        moral_stance: if rng.gen_bool(0.5) {
            MoralStance::Absolutist
        } else {
            MoralStance::Pragmatist
        },
        memory_length: rng.gen_range(1.0..=10.0),
        cultural_momentum: rng.gen_range(MOMENTUM_RANGE.0..=MOMENTUM_RANGE.1),
    }
}

/// A founding agent with random traits, preference and acknowledgments
pub fn spawn_founder(id: AgentId, registry: &NormRegistry, config: &SimConfig, rng: &mut SmallRng) -> Agent {
    let traits = random_traits(rng);
    let preference = registry
        .sample(rng)
        .map(|norm| norm.name.clone())
        .unwrap_or_default();

    let mut agent = Agent::new(id, 0, preference, traits);
    for name in registry.names() {
        let acknowledged = rng.gen::<f32>() < config.population.initial_acknowledgment_chance;
        agent.set_acknowledgment(name, acknowledged);
    }
    agent
}

/// Chance that `agent` dies at this generation boundary
pub fn death_chance(agent: &Agent, generation: u32, config: &DeathConfig) -> f32 {
    let age = agent.age(generation);
    let conflict = (agent.internal_conflict() as f32 * config.conflict_weight).min(config.conflict_cap);
    let old_age = if age > config.age_threshold {
        config.old_age_boost * (age - config.age_threshold) as f32
    } else {
        0.0
    };
    config.base_rate + conflict + old_age
}

/// Evaluate the death rule once for every agent. Returns the number removed.
pub fn apply_deaths(sim: &mut Simulation) -> usize {
    let generation = sim.generation;
    let death = &sim.config.death;
    let rng = &mut sim.rng.0;

    let dying: Vec<AgentId> = sim
        .population
        .iter()
        .filter(|agent| rng.gen::<f32>() < death_chance(agent, generation, death))
        .map(|agent| agent.id)
        .collect();

    let removed = sim.population.remove_all(&dying);
    for agent in &removed {
        sim.proximity.remove(agent.id);
        tracing::debug!(
            "{} died at age {} with conflict {}",
            agent.id,
            agent.age(generation),
            agent.internal_conflict()
        );
        sim.log.record_biography(BiographyEntry::new(
            generation,
            agent.id,
            BiographyKind::Died {
                age: agent.age(generation),
                internal_conflict: agent.internal_conflict(),
            },
        ));
    }
    removed.len()
}

/// Chance that each inherited acknowledgment is re-drawn, capped at 1
pub fn mutation_rate(parent: &Agent, config: &ReproductionConfig) -> f32 {
    (config.mutation_base + config.max_conflict_mutation * parent.internal_conflict() as f32).min(1.0)
}

/// Child of `parent`, born at `generation`
pub fn make_offspring(
    parent: &Agent,
    id: AgentId,
    generation: u32,
    registry: &NormRegistry,
    config: &ReproductionConfig,
    rng: &mut SmallRng,
) -> Agent {
    let mutation_rate = mutation_rate(parent, config);

    let preference = if rng.gen::<f32>() < config.preference_inheritance {
        parent.norm_preference.clone()
    } else {
        registry
            .sample(rng)
            .map_or_else(|| parent.norm_preference.clone(), |norm| norm.name.clone())
    };

    let traits = Traits {
        role: parent.traits.role,
        temperament: (parent.traits.temperament + jitter(rng, config.trait_jitter)).clamp(0.0, 1.0),
        moral_stance: parent.traits.moral_stance,
        memory_length: (parent.traits.memory_length + jitter(rng, config.trait_jitter)).max(1.0),
        cultural_momentum: (parent.traits.cultural_momentum + jitter(rng, config.momentum_jitter))
            .clamp(MOMENTUM_RANGE.0, MOMENTUM_RANGE.1),
    };

    let mut child = Agent::new(id, generation, preference, traits);
    for name in registry.names() {
        let acknowledged = if rng.gen::<f32>() < 1.0 - mutation_rate {
            parent.acknowledges(name)
        } else {
            rng.gen_bool(0.5)
        };
        child.set_acknowledgment(name, acknowledged);
    }
    child.last_acknowledgments = child.acknowledgments.clone();

    // Re-classified at the next generation boundary
    child.scenario_group = parent.scenario_group;
    child.affiliation = parent.affiliation.clone();
    child
}

/// Give every surviving agent one chance to reproduce, up to the population
/// cap. Offspring join the population after all parents are evaluated.
pub fn reproduce(sim: &mut Simulation) -> usize {
    let generation = sim.generation;
    let cap = sim.population_cap;
    let mut offspring: Vec<(AgentId, Agent)> = Vec::new();

    for parent in sim.population.iter() {
        if sim.population.len() + offspring.len() >= cap {
            tracing::trace!("Population at cap {}, {} does not reproduce", cap, parent.id);
            continue;
        }
        if sim.rng.0.gen::<f32>() >= sim.config.reproduction.chance {
            continue;
        }

        let id = AgentId(sim.next_id);
        sim.next_id += 1;
        let child = make_offspring(parent, id, generation, &sim.registry, &sim.config.reproduction, &mut sim.rng.0);
        offspring.push((parent.id, child));
    }

    let births = offspring.len();
    for (parent, child) in offspring {
        sim.proximity.place(child.id, Some(parent), &mut sim.rng.0);
        tracing::debug!("{} born to {}", child.id, parent);
        sim.log.record_biography(BiographyEntry::new(
            generation,
            child.id,
            BiographyKind::Born { parent: Some(parent) },
        ));
        sim.population.push(child);
    }
    births
}
