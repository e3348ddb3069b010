//! Population
//!
//! Sole owner of every live agent, with an id index kept in step with the
//! agent order. Iteration order is insertion order, which keeps every
//! population-wide pass deterministic.

use std::collections::HashMap;

use norm_events::AgentId;

use super::agent::Agent;

#[derive(Debug, Clone, Default)]
pub struct Population {
    agents: Vec<Agent>,
    index: HashMap<AgentId, usize>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_agents(agents: Vec<Agent>) -> Self {
        let mut population = Self { agents, index: HashMap::new() };
        population.reindex();
        population
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn push(&mut self, agent: Agent) {
        self.index.insert(agent.id, self.agents.len());
        self.agents.push(agent);
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.index.get(&id).map(|&i| &self.agents[i])
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.agents[i]),
            None => None,
        }
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.index.contains_key(&id)
    }

    /// Position of an agent in iteration order
    pub fn position(&self, id: AgentId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Two distinct agents, mutably. `None` if either is absent or `a == b`.
    pub fn pair_mut(&mut self, a: AgentId, b: AgentId) -> Option<(&mut Agent, &mut Agent)> {
        let i = *self.index.get(&a)?;
        let j = *self.index.get(&b)?;
        if i == j {
            return None;
        }
        if i < j {
            let (left, right) = self.agents.split_at_mut(j);
            Some((&mut left[i], &mut right[0]))
        } else {
            let (left, right) = self.agents.split_at_mut(i);
            Some((&mut right[0], &mut left[j]))
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Agent> {
        self.agents.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Agent> {
        self.agents.iter_mut()
    }

    /// Remove the given agents, returning them in population order
    pub fn remove_all(&mut self, ids: &[AgentId]) -> Vec<Agent> {
        if ids.is_empty() {
            return Vec::new();
        }
        let (removed, kept): (Vec<Agent>, Vec<Agent>) =
            std::mem::take(&mut self.agents).into_iter().partition(|a| ids.contains(&a.id));
        self.agents = kept;
        self.reindex();
        removed
    }

    fn reindex(&mut self) {
        self.index = self.agents.iter().enumerate().map(|(i, a)| (a.id, i)).collect();
    }
}
