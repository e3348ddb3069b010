//! Norm Registry
//!
//! Maps norm names to an enforcement policy and an acknowledgment predicate.
//! The set is open: norms can be registered while a simulation is running.
//! Registering a name twice is a no-op that keeps the original definition.

pub mod policy;

pub use policy::{EnforcementPolicy, PolicyInput, Resolution};

use rand::Rng;
use std::collections::HashMap;

use crate::components::Agent;
use crate::config::{NormConfig, PolicyKind};

/// How an agent is judged to recognize a norm
#[derive(Debug, Clone, PartialEq)]
pub enum Acknowledgment {
    /// The agent's own acknowledgment flag for this norm
    Recorded,
    /// Every agent recognizes the norm
    Universal,
    /// The agent must acknowledge every listed norm
    Requires(Vec<String>),
}

impl Acknowledgment {
    pub fn holds(&self, norm: &str, agent: &Agent) -> bool {
        match self {
            Acknowledgment::Recorded => agent.acknowledges(norm),
            Acknowledgment::Universal => true,
            Acknowledgment::Requires(norms) => norms.iter().all(|n| agent.acknowledges(n)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormDefinition {
    pub name: String,
    pub policy: EnforcementPolicy,
    pub acknowledgment: Acknowledgment,
}

impl NormDefinition {
    pub fn new(name: impl Into<String>, policy: EnforcementPolicy, acknowledgment: Acknowledgment) -> Self {
        Self {
            name: name.into(),
            policy,
            acknowledgment,
        }
    }

    /// A norm judged by each agent's own flag
    pub fn recorded(name: impl Into<String>, policy: EnforcementPolicy) -> Self {
        Self::new(name, policy, Acknowledgment::Recorded)
    }

    pub fn acknowledged_by(&self, agent: &Agent) -> bool {
        self.acknowledgment.holds(&self.name, agent)
    }
}

/// Norms in registration order
#[derive(Debug, Clone, Default)]
pub struct NormRegistry {
    norms: Vec<NormDefinition>,
    index: HashMap<String, usize>,
}

impl NormRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the starting norm set, one policy per norm as configured
    pub fn from_config(config: &NormConfig) -> Self {
        let mut registry = Self::new();
        for name in &config.names {
            let policy = match config.policy_for(name) {
                PolicyKind::Threshold => EnforcementPolicy::Threshold,
                PolicyKind::Probabilistic => EnforcementPolicy::Probabilistic {
                    distant_factor: config.distant_factor,
                    unacknowledged_factor: config.unacknowledged_factor,
                },
            };
            registry.register(NormDefinition::recorded(name.clone(), policy));
        }
        registry
    }

    /// Add a norm. Returns false, leaving the registry untouched, if the name exists.
    pub fn register(&mut self, definition: NormDefinition) -> bool {
        if self.index.contains_key(&definition.name) {
            tracing::debug!("Ignoring duplicate registration of norm {}", definition.name);
            return false;
        }
        self.index.insert(definition.name.clone(), self.norms.len());
        self.norms.push(definition);
        true
    }

    pub fn get(&self, name: &str) -> Option<&NormDefinition> {
        self.index.get(name).map(|&i| &self.norms[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.norms.iter().map(|n| n.name.as_str())
    }

    /// Uniformly random norm, `None` only for an empty registry
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&NormDefinition> {
        if self.norms.is_empty() {
            return None;
        }
        self.norms.get(rng.gen_range(0..self.norms.len()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormDefinition> {
        self.norms.iter()
    }

    pub fn len(&self) -> usize {
        self.norms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.norms.is_empty()
    }

    /// Unknown norms are acknowledged by nobody
    pub fn acknowledges(&self, norm: &str, agent: &Agent) -> bool {
        self.get(norm).map_or(false, |def| def.acknowledged_by(agent))
    }
}
