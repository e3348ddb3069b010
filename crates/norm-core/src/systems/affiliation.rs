//! Affiliation System
//!
//! Emergent groups from trust: each agent joins the group it trusts most,
//! then group pairs turn hostile or merge on their pooled average trust.
//! Also holds the acknowledgment-pattern scenario classification.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use norm_events::{AgentId, BiographyEntry, BiographyKind, ScenarioGroup};

use crate::components::{Agent, Population};
use crate::config::{AffiliationConfig, CARE_NORM, LEGAL_NORM};
use crate::norms::NormRegistry;
use crate::simulation::Simulation;

/// Unordered group-label pairs, rebuilt every generation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostilePairs(BTreeSet<(String, String)>);

impl HostilePairs {
    fn key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    /// A group is never hostile to itself
    pub fn insert(&mut self, a: &str, b: &str) -> bool {
        if a == b {
            return false;
        }
        self.0.insert(Self::key(a, b))
    }

    pub fn contains(&self, a: &str, b: &str) -> bool {
        a != b && self.0.contains(&Self::key(a, b))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }
}

/// One agent moving from one group label to another
#[derive(Debug, Clone, PartialEq)]
pub struct Relabel {
    pub agent: AgentId,
    pub from: Option<String>,
    pub to: String,
}

/// Group the agent trusts most, summed over living neighbors.
///
/// Ties keep the group met first in trust-map order. No living neighbor
/// means the preference-derived default.
pub fn trusted_group(agent: &Agent, population: &Population) -> String {
    let mut totals: Vec<(&str, f32)> = Vec::new();
    for (&other, &trust) in &agent.trust {
        let Some(neighbor) = population.get(other) else {
            continue;
        };
        let group = neighbor.affiliation_or_default();
        match totals.iter_mut().find(|(g, _)| *g == group) {
            Some((_, total)) => *total += trust,
            None => totals.push((group, trust)),
        }
    }

    let mut best: Option<(&str, f32)> = None;
    for (group, total) in totals {
        if best.map_or(true, |(_, max)| total > max) {
            best = Some((group, total));
        }
    }
    best.map_or_else(|| agent.default_affiliation().to_string(), |(group, _)| group.to_string())
}

/// Recompute every affiliation from the trust snapshot taken before any
/// agent moves
pub fn assign_affiliations(population: &mut Population) -> Vec<Relabel> {
    let snapshot: &Population = population;
    let next: Vec<String> = snapshot.iter().map(|agent| trusted_group(agent, snapshot)).collect();

    let mut changes = Vec::new();
    for (agent, group) in population.iter_mut().zip(next) {
        if agent.affiliation.as_deref() == Some(group.as_str()) {
            continue;
        }
        let from = agent.affiliation.replace(group.clone());
        changes.push(Relabel {
            agent: agent.id,
            from,
            to: group,
        });
    }
    changes
}

/// Result of one round of group dynamics
#[derive(Debug, Clone, Default)]
pub struct GroupDynamics {
    pub hostile: HostilePairs,
    /// (absorbed group, absorbing group)
    pub merges: Vec<(String, String)>,
    pub relabeled: Vec<Relabel>,
}

/// Evaluate every pair of distinct groups on pooled average trust, then
/// apply the planned merges
pub fn resolve_groups(population: &mut Population, config: &AffiliationConfig) -> GroupDynamics {
    // Labels in encounter order with member counts
    let mut groups: Vec<(String, usize)> = Vec::new();
    let mut membership: HashMap<AgentId, usize> = HashMap::new();
    for agent in population.iter() {
        let label = agent.affiliation_or_default();
        let index = match groups.iter().position(|(g, _)| g == label) {
            Some(index) => index,
            None => {
                groups.push((label.to_string(), 0));
                groups.len() - 1
            }
        };
        groups[index].1 += 1;
        membership.insert(agent.id, index);
    }

    // Directed links pooled per unordered pair, both directions together
    let mut links: BTreeMap<(usize, usize), (f32, u32)> = BTreeMap::new();
    for agent in population.iter() {
        let Some(&from) = membership.get(&agent.id) else {
            continue;
        };
        for (other, &trust) in &agent.trust {
            let Some(&to) = membership.get(other) else {
                continue;
            };
            if from == to {
                continue;
            }
            let link = links.entry((from.min(to), from.max(to))).or_insert((0.0, 0));
            link.0 += trust;
            link.1 += 1;
        }
    }

    let mut dynamics = GroupDynamics::default();
    let mut merge_into: Vec<usize> = (0..groups.len()).collect();

    for (&(i, j), &(sum, count)) in &links {
        let average = sum / count as f32;
        if average < config.hostility_threshold {
            dynamics.hostile.insert(&groups[i].0, &groups[j].0);
        } else if average > config.merge_threshold {
            // i was met before j, so i keeps its label on a size tie
            let (smaller, larger) = if groups[j].1 <= groups[i].1 { (j, i) } else { (i, j) };
            if merge_into[smaller] == smaller {
                merge_into[smaller] = larger;
                dynamics.merges.push((groups[smaller].0.clone(), groups[larger].0.clone()));
            }
        }
    }

    if dynamics.merges.is_empty() {
        return dynamics;
    }

    for agent in population.iter_mut() {
        let Some(&start) = membership.get(&agent.id) else {
            continue;
        };
        // Follow merge chains; each hop moves to a strictly larger group
        let mut root = start;
        for _ in 0..groups.len() {
            if merge_into[root] == root {
                break;
            }
            root = merge_into[root];
        }
        if root == start {
            continue;
        }
        let to = groups[root].0.clone();
        let from = agent.affiliation.replace(to.clone());
        dynamics.relabeled.push(Relabel {
            agent: agent.id,
            from,
            to,
        });
    }
    dynamics
}

/// Trust-driven affiliation pass. Returns how many agents changed group.
pub fn update_affiliations(sim: &mut Simulation) -> usize {
    let changes = assign_affiliations(&mut sim.population);
    record_relabels(sim, &changes);
    changes.len()
}

/// Rebuild the hostile pairs and apply group merges. Returns the merge count.
pub fn update_group_dynamics(sim: &mut Simulation) -> usize {
    let dynamics = resolve_groups(&mut sim.population, &sim.config.affiliation);

    for (absorbed, absorbing) in &dynamics.merges {
        tracing::debug!("Group {} merges into {}", absorbed, absorbing);
    }
    record_relabels(sim, &dynamics.relabeled);
    sim.hostile_pairs = dynamics.hostile;
    dynamics.merges.len()
}

fn record_relabels(sim: &mut Simulation, changes: &[Relabel]) {
    let generation = sim.generation;
    for change in changes {
        sim.log.record_biography(BiographyEntry::new(
            generation,
            change.agent,
            BiographyKind::AffiliationChanged {
                from: change.from.clone(),
                to: change.to.clone(),
            },
        ));
    }
}

/// Scenario group from the agent's own acknowledgment flags over the
/// registered norms
pub fn classify_scenario(agent: &Agent, registry: &NormRegistry) -> ScenarioGroup {
    if registry.is_empty() {
        return ScenarioGroup::Collapsed;
    }
    let acknowledged: Vec<&str> = registry.names().filter(|norm| agent.acknowledges(norm)).collect();

    match acknowledged.as_slice() {
        all if all.len() == registry.len() => ScenarioGroup::Utopian,
        [] => ScenarioGroup::Collapsed,
        [only] if *only == LEGAL_NORM => ScenarioGroup::Authoritarian,
        [only] if *only == CARE_NORM => ScenarioGroup::AllCare,
        _ => ScenarioGroup::Pluralist,
    }
}

pub fn classify_scenarios(sim: &mut Simulation) {
    let registry = &sim.registry;
    for agent in sim.population.iter_mut() {
        agent.scenario_group = classify_scenario(agent, registry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Traits;
    use crate::config::NormConfig;

    fn grouped(id: u64, group: &str) -> Agent {
        let mut agent = Agent::new(AgentId(id), 0, group, Traits::default());
        agent.affiliation = Some(group.to_string());
        agent
    }

    #[test]
    fn test_hostile_pairs_are_symmetric() {
        let mut pairs = HostilePairs::default();
        assert!(pairs.insert("legal", "care"));
        assert!(!pairs.insert("care", "legal"));
        assert!(!pairs.insert("care", "care"));

        assert!(pairs.contains("legal", "care"));
        assert!(pairs.contains("care", "legal"));
        assert!(!pairs.contains("legal", "legal"));
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_affiliation_follows_most_trusted_group() {
        let mut agent = grouped(1, "legal");
        agent.adjust_trust(AgentId(2), 1.0);
        agent.adjust_trust(AgentId(3), 1.5);
        agent.adjust_trust(AgentId(4), 1.0);
        agent.adjust_trust(AgentId(99), 50.0); // dead

        let population = Population::from_agents(vec![
            agent,
            grouped(2, "care"),
            grouped(3, "sanctity"),
            grouped(4, "care"),
        ]);

        let chosen = trusted_group(population.get(AgentId(1)).unwrap(), &population);
        assert_eq!(chosen, "care");
    }

    #[test]
    fn test_affiliation_tie_keeps_first_group() {
        let mut agent = grouped(1, "legal");
        agent.adjust_trust(AgentId(2), 2.0);
        agent.adjust_trust(AgentId(3), 2.0);
        let population = Population::from_agents(vec![agent, grouped(2, "care"), grouped(3, "sanctity")]);

        assert_eq!(trusted_group(population.get(AgentId(1)).unwrap(), &population), "care");
    }

    #[test]
    fn test_no_trust_falls_back_to_preference() {
        let mut agent = Agent::new(AgentId(1), 0, "reciprocity", Traits::default());
        agent.affiliation = Some("care".into());
        let mut population = Population::from_agents(vec![agent]);

        let changes = assign_affiliations(&mut population);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].from.as_deref(), Some("care"));
        assert_eq!(population.get(AgentId(1)).unwrap().affiliation.as_deref(), Some("reciprocity"));
    }

    #[test]
    fn test_low_trust_marks_groups_hostile() {
        let mut a = grouped(1, "legal");
        a.adjust_trust(AgentId(3), 0.2);
        let mut b = grouped(3, "care");
        b.adjust_trust(AgentId(1), 0.2);
        let mut population = Population::from_agents(vec![a, grouped(2, "legal"), b]);

        let dynamics = resolve_groups(&mut population, &AffiliationConfig::default());

        assert!(dynamics.hostile.contains("care", "legal"));
        assert!(dynamics.merges.is_empty());
    }

    #[test]
    fn test_high_trust_merges_smaller_group() {
        let mut a = grouped(1, "care");
        a.adjust_trust(AgentId(2), 4.0);
        let mut b = grouped(2, "legal");
        b.adjust_trust(AgentId(1), 5.0);
        let mut population = Population::from_agents(vec![a, b, grouped(3, "legal")]);

        let dynamics = resolve_groups(&mut population, &AffiliationConfig::default());

        assert_eq!(dynamics.merges, vec![("care".to_string(), "legal".to_string())]);
        assert_eq!(population.get(AgentId(1)).unwrap().affiliation.as_deref(), Some("legal"));
        assert_eq!(dynamics.relabeled.len(), 1);
        assert!(dynamics.hostile.is_empty());
    }

    #[test]
    fn test_merge_tie_keeps_first_encountered_label() {
        let mut a = grouped(1, "care");
        a.adjust_trust(AgentId(2), 4.0);
        let b = grouped(2, "legal");
        let mut population = Population::from_agents(vec![a, b]);

        resolve_groups(&mut population, &AffiliationConfig::default());

        assert_eq!(population.get(AgentId(2)).unwrap().affiliation.as_deref(), Some("care"));
    }

    #[test]
    fn test_scenario_classification() {
        let registry = NormRegistry::from_config(&NormConfig::default());
        let agent = |acks: [bool; 4]| {
            Agent::new(AgentId(1), 0, "legal", Traits::default()).with_acknowledgments([
                ("legal", acks[0]),
                ("care", acks[1]),
                ("reciprocity", acks[2]),
                ("sanctity", acks[3]),
            ])
        };

        assert_eq!(classify_scenario(&agent([true; 4]), &registry), ScenarioGroup::Utopian);
        assert_eq!(classify_scenario(&agent([false; 4]), &registry), ScenarioGroup::Collapsed);
        assert_eq!(
            classify_scenario(&agent([true, false, false, false]), &registry),
            ScenarioGroup::Authoritarian
        );
        assert_eq!(classify_scenario(&agent([false, true, false, false]), &registry), ScenarioGroup::AllCare);
        assert_eq!(classify_scenario(&agent([false, false, true, false]), &registry), ScenarioGroup::Pluralist);
        assert_eq!(classify_scenario(&agent([true, true, false, false]), &registry), ScenarioGroup::Pluralist);
    }
}
