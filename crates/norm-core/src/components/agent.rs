//! Agent Components
//!
//! Per-agent normative and social state, lifecycle traits and counters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use norm_events::{AgentId, MoralStance, ObligationStatus, Role, ScenarioGroup};

/// Lifecycle traits, fixed at birth except for cultural momentum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traits {
    pub role: Role,
    /// 0.0 (placid) to 1.0 (volatile)
    pub temperament: f32,
    pub moral_stance: MoralStance,
    /// How many generations of grievances the agent carries, at least 1.0
    pub memory_length: f32,
    /// Drifts slightly every generation, kept within [0.1, 1.0]
    pub cultural_momentum: f32,
}

impl Default for Traits {
    fn default() -> Self {
        Self {
            role: Role::Citizen,
            temperament: 0.5,
            moral_stance: MoralStance::Pragmatist,
            memory_length: 5.0,
            cultural_momentum: 0.5,
        }
    }
}

/// Status counts over an agent's relational ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerCounts {
    pub fulfilled: u32,
    pub denied: u32,
    pub expired: u32,
    pub repaired: u32,
}

impl LedgerCounts {
    pub fn total(&self) -> u32 {
        self.fulfilled + self.denied + self.expired + self.repaired
    }
}

/// A simulated member of the moral community
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    /// Norm name -> whether this agent recognizes the norm
    pub acknowledgments: BTreeMap<String, bool>,
    pub norm_preference: String,
    /// Acknowledgments as of the last biography capture
    pub last_acknowledgments: BTreeMap<String, bool>,
    /// Directed, unbounded trust in other agents
    pub trust: BTreeMap<AgentId, f32>,
    /// Target -> status of the latest obligation issued to it
    ledger: BTreeMap<AgentId, ObligationStatus>,
    internal_conflict: u32,
    contradiction_debt: u32,
    pub scenario_group: ScenarioGroup,
    pub affiliation: Option<String>,
    pub traits: Traits,
    pub attempts: u32,
    pub successes: u32,
    pub birth_generation: u32,
}

impl Agent {
    pub fn new(id: AgentId, birth_generation: u32, norm_preference: impl Into<String>, traits: Traits) -> Self {
        Self {
            id,
            acknowledgments: BTreeMap::new(),
            norm_preference: norm_preference.into(),
            last_acknowledgments: BTreeMap::new(),
            trust: BTreeMap::new(),
            ledger: BTreeMap::new(),
            internal_conflict: 0,
            contradiction_debt: 0,
            scenario_group: ScenarioGroup::Collapsed,
            affiliation: None,
            traits,
            attempts: 0,
            successes: 0,
            birth_generation,
        }
    }

    pub fn with_acknowledgments<'a>(mut self, norms: impl IntoIterator<Item = (&'a str, bool)>) -> Self {
        for (norm, acknowledged) in norms {
            self.acknowledgments.insert(norm.to_string(), acknowledged);
        }
        self
    }

    /// Unknown norms count as unacknowledged
    pub fn acknowledges(&self, norm: &str) -> bool {
        self.acknowledgments.get(norm).copied().unwrap_or(false)
    }

    pub fn set_acknowledgment(&mut self, norm: impl Into<String>, acknowledged: bool) {
        self.acknowledgments.insert(norm.into(), acknowledged);
    }

    pub fn acknowledged_norms(&self) -> impl Iterator<Item = &str> {
        self.acknowledgments
            .iter()
            .filter(|(_, &acknowledged)| acknowledged)
            .map(|(norm, _)| norm.as_str())
    }

    /// Affiliation label used when no trust-derived group is available
    pub fn default_affiliation(&self) -> &str {
        &self.norm_preference
    }

    /// Current affiliation, or the preference-derived default
    pub fn affiliation_or_default(&self) -> &str {
        self.affiliation.as_deref().unwrap_or_else(|| self.default_affiliation())
    }

    pub fn age(&self, generation: u32) -> u32 {
        generation.saturating_sub(self.birth_generation)
    }

    /// Trust in `other`, 0.0 when there is no entry
    pub fn trust_in(&self, other: AgentId) -> f32 {
        self.trust.get(&other).copied().unwrap_or(0.0)
    }

    pub fn adjust_trust(&mut self, other: AgentId, delta: f32) {
        *self.trust.entry(other).or_insert(0.0) += delta;
    }

    pub fn max_trust(&self) -> f32 {
        self.trust.values().copied().fold(None, |max: Option<f32>, t| {
            Some(max.map_or(t, |m| m.max(t)))
        })
        .unwrap_or(0.0)
    }

    pub fn ledger(&self) -> &BTreeMap<AgentId, ObligationStatus> {
        &self.ledger
    }

    pub fn ledger_status(&self, target: AgentId) -> Option<ObligationStatus> {
        self.ledger.get(&target).copied()
    }

    /// Overwrite the ledger entry for `target` with a resolved status.
    ///
    /// `Pending` is never stored; the ledger only holds resolutions.
    pub fn record_outcome(&mut self, target: AgentId, status: ObligationStatus) {
        if status.is_pending() {
            return;
        }
        self.ledger.insert(target, status);
        self.recompute_metrics();
    }

    /// Turn a denied or expired entry into a repaired one. Returns false
    /// when the entry is absent or not repairable.
    pub fn repair_entry(&mut self, target: AgentId) -> bool {
        match self.ledger.get_mut(&target) {
            Some(status) if status.can_transition_to(ObligationStatus::Repaired) => {
                *status = ObligationStatus::Repaired;
                self.recompute_metrics();
                true
            }
            _ => false,
        }
    }

    /// Re-derive conflict and debt from the ledger
    pub fn recompute_metrics(&mut self) {
        let counts = self.ledger_counts();
        self.internal_conflict = counts.denied;
        self.contradiction_debt = counts.denied + counts.expired;
    }

    /// Ledger entries with status `denied`
    pub fn internal_conflict(&self) -> u32 {
        self.internal_conflict
    }

    /// Ledger entries with status `denied` or `expired`
    pub fn contradiction_debt(&self) -> u32 {
        self.contradiction_debt
    }

    pub fn ledger_counts(&self) -> LedgerCounts {
        let mut counts = LedgerCounts::default();
        for status in self.ledger.values() {
            match status {
                ObligationStatus::Fulfilled => counts.fulfilled += 1,
                ObligationStatus::Denied => counts.denied += 1,
                ObligationStatus::Expired => counts.expired += 1,
                ObligationStatus::Repaired => counts.repaired += 1,
                ObligationStatus::Pending => {}
            }
        }
        counts
    }

    /// Acknowledgment flips since the last snapshot, then refresh the snapshot
    pub fn take_acknowledgment_changes(&mut self) -> Vec<(String, bool)> {
        let changes: Vec<(String, bool)> = self
            .acknowledgments
            .iter()
            .filter(|(norm, acknowledged)| self.last_acknowledgments.get(*norm) != Some(*acknowledged))
            .map(|(norm, &acknowledged)| (norm.clone(), acknowledged))
            .collect();
        self.last_acknowledgments = self.acknowledgments.clone();
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: u64) -> Agent {
        Agent::new(AgentId(id), 0, "legal", Traits::default())
    }

    #[test]
    fn test_metrics_are_derived_from_ledger() {
        let mut a = agent(1);
        a.record_outcome(AgentId(2), ObligationStatus::Denied);
        a.record_outcome(AgentId(3), ObligationStatus::Expired);
        a.record_outcome(AgentId(4), ObligationStatus::Fulfilled);

        assert_eq!(a.internal_conflict(), 1);
        assert_eq!(a.contradiction_debt(), 2);

        // Overwriting the entry drops the old denial
        a.record_outcome(AgentId(2), ObligationStatus::Fulfilled);
        assert_eq!(a.internal_conflict(), 0);
        assert_eq!(a.contradiction_debt(), 1);
        assert_eq!(a.ledger().len(), 3);
    }

    #[test]
    fn test_pending_is_never_recorded() {
        let mut a = agent(1);
        a.record_outcome(AgentId(2), ObligationStatus::Pending);
        assert!(a.ledger().is_empty());
    }

    #[test]
    fn test_repair_only_from_breach() {
        let mut a = agent(1);
        a.record_outcome(AgentId(2), ObligationStatus::Denied);
        a.record_outcome(AgentId(3), ObligationStatus::Fulfilled);

        assert!(a.repair_entry(AgentId(2)));
        assert!(!a.repair_entry(AgentId(2)));
        assert!(!a.repair_entry(AgentId(3)));
        assert!(!a.repair_entry(AgentId(99)));

        let counts = a.ledger_counts();
        assert_eq!(counts.repaired, 1);
        assert_eq!(counts.total() as usize, a.ledger().len());
        assert_eq!(a.contradiction_debt(), 0);
    }

    #[test]
    fn test_trust_is_unbounded() {
        let mut a = agent(1);
        for _ in 0..10 {
            a.adjust_trust(AgentId(2), -1.0);
        }
        assert_eq!(a.trust_in(AgentId(2)), -10.0);
        assert_eq!(a.trust_in(AgentId(3)), 0.0);
        assert_eq!(a.max_trust(), -10.0);
    }

    #[test]
    fn test_acknowledgment_changes() {
        let mut a = agent(1).with_acknowledgments([("legal", true), ("care", false)]);
        let first = a.take_acknowledgment_changes();
        assert_eq!(first.len(), 2);

        assert!(a.take_acknowledgment_changes().is_empty());

        a.set_acknowledgment("care", true);
        assert_eq!(a.take_acknowledgment_changes(), vec![("care".to_string(), true)]);
    }

    #[test]
    fn test_default_affiliation_follows_preference() {
        let mut a = agent(1);
        assert_eq!(a.affiliation_or_default(), "legal");
        a.affiliation = Some("care".into());
        assert_eq!(a.affiliation_or_default(), "care");
    }
}
