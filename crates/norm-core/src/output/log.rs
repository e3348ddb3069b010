//! Simulation Log
//!
//! Append-only record of everything a run produced: obligation resolutions,
//! per-agent captures, biography entries and generation metrics. Entries
//! are tagged with the batch run when one is set.

use serde::Serialize;

use norm_events::{AgentLogEntry, BiographyEntry, GenerationMetrics, ObligationLogEntry};

use crate::components::Agent;

/// Batch run identification stamped onto log entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunTag {
    pub run: u32,
    pub batch_scenario: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationLog {
    pub obligations: Vec<ObligationLogEntry>,
    pub agents: Vec<AgentLogEntry>,
    pub biography: Vec<BiographyEntry>,
    pub metrics: Vec<GenerationMetrics>,
    #[serde(skip)]
    tag: Option<RunTag>,
}

impl SimulationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tag(&mut self, tag: Option<RunTag>) {
        self.tag = tag;
    }

    pub fn tag(&self) -> Option<&RunTag> {
        self.tag.as_ref()
    }

    pub fn record_obligation(&mut self, entry: ObligationLogEntry) {
        let entry = match &self.tag {
            Some(tag) => entry.tagged(tag.run, tag.batch_scenario.clone()),
            None => entry,
        };
        self.obligations.push(entry);
    }

    pub fn record_agent(&mut self, mut entry: AgentLogEntry) {
        if let Some(tag) = &self.tag {
            entry.run = Some(tag.run);
            entry.batch_scenario = Some(tag.batch_scenario.clone());
        }
        self.agents.push(entry);
    }

    pub fn record_biography(&mut self, entry: BiographyEntry) {
        self.biography.push(entry);
    }

    /// Metrics records are never touched again once appended
    pub fn record_metrics(&mut self, mut metrics: GenerationMetrics) {
        if let Some(tag) = &self.tag {
            metrics.run = Some(tag.run);
            metrics.batch_scenario = Some(tag.batch_scenario.clone());
        }
        self.metrics.push(metrics);
    }

    pub fn latest_metrics(&self) -> Option<&GenerationMetrics> {
        self.metrics.last()
    }

    /// Move another log's entries onto the end of this one
    pub fn append(&mut self, other: &mut SimulationLog) {
        self.obligations.append(&mut other.obligations);
        self.agents.append(&mut other.agents);
        self.biography.append(&mut other.biography);
        self.metrics.append(&mut other.metrics);
    }

    pub fn is_empty(&self) -> bool {
        self.obligations.is_empty() && self.agents.is_empty() && self.biography.is_empty() && self.metrics.is_empty()
    }
}

/// Capture one agent's state for the per-generation agent log
pub fn agent_log_entry(agent: &Agent, generation: u32, scenario: &str) -> AgentLogEntry {
    let counts = agent.ledger_counts();
    AgentLogEntry {
        generation,
        scenario: scenario.to_string(),
        id: agent.id,
        norm_preference: agent.norm_preference.clone(),
        acknowledgments: agent.acknowledgments.clone(),
        attempts: agent.attempts,
        successes: agent.successes,
        conflict: agent.internal_conflict(),
        debt: agent.contradiction_debt(),
        momentum: agent.traits.cultural_momentum,
        trust_map_size: agent.trust.len(),
        max_trust: agent.max_trust(),
        fulfilled: counts.fulfilled,
        denied: counts.denied,
        expired: counts.expired,
        repaired: counts.repaired,
        role: agent.traits.role,
        temperament: agent.traits.temperament,
        moral_stance: agent.traits.moral_stance,
        scenario_group: agent.scenario_group,
        memory_length: agent.traits.memory_length,
        affiliation: agent.affiliation.clone(),
        run: None,
        batch_scenario: None,
    }
}
