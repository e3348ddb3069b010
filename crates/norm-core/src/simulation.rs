//! Simulation Context
//!
//! Owns everything a run touches: configuration, norm registry, population,
//! live obligation vectors, hostile pairs, proximity source, random number
//! generator and the run log. Every system receives it explicitly.
//!
//! Two clocks drive a run. `step` enforces every pending obligation once;
//! `advance_generation` runs the boundary systems in a fixed order.

use norm_events::{AgentId, BiographyEntry, BiographyKind, GenerationMetrics};

use crate::components::{Agent, ObligationVector, Population};
use crate::config::SimConfig;
use crate::error::{ConfigError, SimError};
use crate::norms::{NormDefinition, NormRegistry};
use crate::output::{agent_log_entry, aggregate_metrics, RunTag, SimulationLog};
use crate::scenario::ScenarioPreset;
use crate::spatial::{Arena, Proximity};
use crate::systems::{self, HostilePairs, StepSummary};
use crate::SimRng;

/// Label used in agent logs when no preset was applied
pub const DEFAULT_SCENARIO_LABEL: &str = "random";

pub struct Simulation {
    pub(crate) config: SimConfig,
    pub(crate) registry: NormRegistry,
    pub(crate) population: Population,
    pub(crate) vectors: Vec<ObligationVector>,
    pub(crate) hostile_pairs: HostilePairs,
    pub(crate) proximity: Box<dyn Proximity>,
    pub(crate) rng: SimRng,
    pub(crate) log: SimulationLog,
    pub(crate) generation: u32,
    pub(crate) steps: u64,
    pub(crate) next_id: u64,
    pub(crate) population_cap: usize,
    pub(crate) scenario_label: String,
}

impl Simulation {
    /// Random founding population in the default arena, seeded from the config
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        Self::with_preset(config, None)
    }

    /// Founding population with every agent passed through `preset`
    pub fn with_preset(config: SimConfig, preset: Option<ScenarioPreset>) -> Result<Self, SimError> {
        config.validate()?;
        let seed = config.simulation.seed;
        let proximity = Box::new(Arena::new(&config.arena));
        let mut sim = Self::empty(config, proximity, seed);
        sim.spawn_founders(preset);
        sim.population_cap = sim.config.population_cap();
        sim.initialize();
        sim.regenerate_obligations();

        tracing::info!(
            seed,
            population = sim.population.len(),
            vectors = sim.vectors.len(),
            scenario = %sim.scenario_label,
            "Simulation initialized"
        );
        Ok(sim)
    }

    /// Run over a caller-built population and proximity source.
    ///
    /// The population cap is the given agent count times the configured cap
    /// multiplier. No obligations are issued until the caller adds some or
    /// the first generation boundary samples them.
    pub fn from_agents(
        config: SimConfig,
        agents: Vec<Agent>,
        proximity: Box<dyn Proximity>,
        seed: u64,
    ) -> Result<Self, SimError> {
        if agents.is_empty() {
            return Err(ConfigError::invalid("population", "at least one agent is required").into());
        }
        config.validate()?;

        let mut sim = Self::empty(config, proximity, seed);
        sim.next_id = agents.iter().map(|a| a.id.0 + 1).max().unwrap_or(0);
        sim.population_cap = agents.len().saturating_mul(sim.config.reproduction.cap_multiplier);
        sim.population = Population::from_agents(agents);
        sim.initialize();
        Ok(sim)
    }

    fn empty(config: SimConfig, proximity: Box<dyn Proximity>, seed: u64) -> Self {
        let registry = NormRegistry::from_config(&config.norms);
        Self {
            config,
            registry,
            population: Population::new(),
            vectors: Vec::new(),
            hostile_pairs: HostilePairs::default(),
            proximity,
            rng: SimRng::seeded(seed),
            log: SimulationLog::new(),
            generation: 0,
            steps: 0,
            next_id: 0,
            population_cap: 0,
            scenario_label: DEFAULT_SCENARIO_LABEL.to_string(),
        }
    }

    fn spawn_founders(&mut self, preset: Option<ScenarioPreset>) {
        if let Some(preset) = preset {
            self.scenario_label = preset.label().to_string();
        }
        for _ in 0..self.config.population.size {
            let id = self.allocate_id();
            let mut agent = systems::spawn_founder(id, &self.registry, &self.config, &mut self.rng.0);
            if let Some(preset) = preset {
                preset.apply(&mut agent, &self.registry, &mut self.rng.0);
            }
            self.proximity.place(id, None, &mut self.rng.0);
            self.log
                .record_biography(BiographyEntry::new(0, id, BiographyKind::Born { parent: None }));
            self.population.push(agent);
        }
    }

    /// Classify, snapshot acknowledgments and derive metrics for the
    /// founding population
    fn initialize(&mut self) {
        systems::classify_scenarios(self);
        for agent in self.population.iter_mut() {
            agent.last_acknowledgments = agent.acknowledgments.clone();
            agent.recompute_metrics();
        }
    }

    fn allocate_id(&mut self) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        id
    }

    /// One enforcement tick over every pending obligation
    pub fn step(&mut self) -> StepSummary {
        self.steps += 1;
        systems::enforcement_step(self)
    }

    pub fn run_steps(&mut self, steps: u32) -> StepSummary {
        let mut total = StepSummary::default();
        for _ in 0..steps {
            let summary = self.step();
            total.fulfilled += summary.fulfilled;
            total.denied += summary.denied;
            total.expired += summary.expired;
            total.still_pending = summary.still_pending;
        }
        total
    }

    /// Generation boundary. Order: death, metric refresh, obligation
    /// resampling, drift, affiliation, group dynamics, classification,
    /// capture, metrics, repair, reproduction.
    pub fn advance_generation(&mut self) -> GenerationMetrics {
        self.generation += 1;

        let deaths = systems::apply_deaths(self);
        self.recompute_agent_metrics();
        let issued = systems::regenerate_obligations(self);
        systems::apply_normative_drift(self);
        systems::update_affiliations(self);
        let merges = systems::update_group_dynamics(self);
        systems::classify_scenarios(self);
        self.recompute_agent_metrics();
        self.capture_generation();

        let metrics = aggregate_metrics(self.generation, &self.population, self.hostile_pairs.len());
        self.log.record_metrics(metrics);

        let repaired = if self.config.repair.enabled {
            systems::apply_moral_repair(self)
        } else {
            0
        };
        let births = systems::reproduce(self);

        let metrics = self.log.latest_metrics().cloned().unwrap_or_default();
        tracing::info!(
            generation = self.generation,
            population = metrics.population,
            vectors = issued,
            fulfillment_rate = metrics.fulfillment_rate,
            hostile_pairs = metrics.hostile_pairs,
            "Generation complete"
        );
        tracing::debug!(deaths, births, merges, repaired, "Generation {} lifecycle", self.generation);
        metrics
    }

    /// Steps, then a boundary
    pub fn run_generation(&mut self) -> GenerationMetrics {
        self.run_steps(self.config.simulation.steps_per_generation);
        self.advance_generation()
    }

    /// Run `generations` full generations. Returns the last metrics record.
    pub fn run(&mut self, generations: u32) -> Option<GenerationMetrics> {
        let mut last = None;
        for _ in 0..generations {
            last = Some(self.run_generation());
            if self.population.is_empty() {
                tracing::warn!("Population died out at generation {}", self.generation);
                break;
            }
        }
        last
    }

    /// Start over from a fresh founding population, keeping the registry's
    /// configured norms and discarding the log
    pub fn reset(&mut self, seed: u64, preset: Option<ScenarioPreset>) -> Result<(), SimError> {
        let mut config = self.config.clone();
        config.simulation.seed = seed;
        let tag = self.log.tag().cloned();
        *self = Self::with_preset(config, preset)?;
        self.log.set_tag(tag);
        Ok(())
    }

    /// Add a norm while running. Returns false for a duplicate name.
    pub fn register_norm(&mut self, definition: NormDefinition) -> bool {
        self.registry.register(definition)
    }

    pub fn regenerate_obligations(&mut self) -> usize {
        systems::regenerate_obligations(self)
    }

    pub fn update_group_dynamics(&mut self) -> usize {
        systems::update_group_dynamics(self)
    }

    pub fn recompute_agent_metrics(&mut self) {
        for agent in self.population.iter_mut() {
            agent.recompute_metrics();
        }
    }

    /// Biography entries for acknowledgment changes, then one agent log
    /// entry per live agent
    fn capture_generation(&mut self) {
        let generation = self.generation;
        for agent in self.population.iter_mut() {
            for (norm, acknowledged) in agent.take_acknowledgment_changes() {
                self.log.record_biography(BiographyEntry::new(
                    generation,
                    agent.id,
                    BiographyKind::AcknowledgmentChanged { norm, acknowledged },
                ));
            }
        }
        for agent in self.population.iter() {
            self.log
                .record_agent(agent_log_entry(agent, generation, &self.scenario_label));
        }
    }

    /// Queue an obligation vector for the next enforcement steps. An agent
    /// cannot owe itself, so self-obligations are refused.
    pub fn issue(&mut self, vector: ObligationVector) -> bool {
        if vector.source == vector.target {
            tracing::debug!("Refusing obligation of {} to itself", vector.source);
            return false;
        }
        self.vectors.push(vector);
        true
    }

    pub fn set_run_tag(&mut self, tag: Option<RunTag>) {
        self.log.set_tag(tag);
    }

    /// Hand the accumulated log to the caller, leaving an empty one with the
    /// same tag
    pub fn take_log(&mut self) -> SimulationLog {
        let tag = self.log.tag().cloned();
        let log = std::mem::take(&mut self.log);
        self.log.set_tag(tag);
        log
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn registry(&self) -> &NormRegistry {
        &self.registry
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Direct agent access for setting up experiments
    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.population.get(id)
    }

    pub fn vectors(&self) -> &[ObligationVector] {
        &self.vectors
    }

    pub fn hostile_pairs(&self) -> &HostilePairs {
        &self.hostile_pairs
    }

    pub fn proximity(&self) -> &dyn Proximity {
        &*self.proximity
    }

    pub fn log(&self) -> &SimulationLog {
        &self.log
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn population_cap(&self) -> usize {
        self.population_cap
    }

    pub fn scenario_label(&self) -> &str {
        &self.scenario_label
    }
}
