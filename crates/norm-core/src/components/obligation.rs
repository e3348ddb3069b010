//! Obligation Vectors
//!
//! One directed, time-bounded commitment from a source agent to a target agent
//! under a named norm. Vectors hold agent ids only; they never own agents.

use serde::{Deserialize, Serialize};

use norm_events::{AgentId, ObligationStatus};

use crate::error::TransitionError;

/// Lowest strength a sampled obligation can carry
pub const MIN_STRENGTH: f32 = 0.2;
/// Highest strength a sampled obligation can carry
pub const MAX_STRENGTH: f32 = 1.0;

/// Readiness gate for deferred resolution.
///
/// A waiting vector cannot be fulfilled or denied, but it still ages and can
/// still expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gate {
    Open,
    Waiting,
    Raised,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObligationVector {
    pub source: AgentId,
    pub target: AgentId,
    pub strength: f32,
    pub norm: String,
    status: ObligationStatus,
    /// Enforcement steps survived while pending
    pub age: u32,
    pub expiration: u32,
    pub created_generation: u32,
    gate: Gate,
}

impl ObligationVector {
    pub fn new(
        source: AgentId,
        target: AgentId,
        norm: impl Into<String>,
        strength: f32,
        expiration: u32,
        created_generation: u32,
    ) -> Self {
        Self {
            source,
            target,
            strength: strength.clamp(MIN_STRENGTH, MAX_STRENGTH),
            norm: norm.into(),
            status: ObligationStatus::Pending,
            age: 0,
            expiration,
            created_generation,
            gate: Gate::Open,
        }
    }

    /// Hold resolution until `raise_gate` is called
    pub fn gated(mut self) -> Self {
        self.gate = Gate::Waiting;
        self
    }

    pub fn raise_gate(&mut self) {
        if self.gate == Gate::Waiting {
            self.gate = Gate::Raised;
        }
    }

    /// Whether fulfillment or denial may be decided this step
    pub fn is_ready(&self) -> bool {
        self.gate != Gate::Waiting
    }

    pub fn status(&self) -> ObligationStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    pub fn has_expired(&self) -> bool {
        self.age >= self.expiration
    }

    /// Age by one step. Resolved vectors do not age.
    pub fn tick(&mut self) {
        if self.is_pending() {
            self.age += 1;
        }
    }

    pub fn transition(&mut self, next: ObligationStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector() -> ObligationVector {
        ObligationVector::new(AgentId(1), AgentId(2), "legal", 0.5, 3, 0)
    }

    #[test]
    fn test_strength_is_clamped() {
        let weak = ObligationVector::new(AgentId(1), AgentId(2), "care", 0.01, 3, 0);
        assert_eq!(weak.strength, MIN_STRENGTH);
        let strong = ObligationVector::new(AgentId(1), AgentId(2), "care", 7.0, 3, 0);
        assert_eq!(strong.strength, MAX_STRENGTH);
    }

    #[test]
    fn test_legal_lifecycle() {
        let mut v = vector();
        assert!(v.is_pending());
        v.transition(ObligationStatus::Denied).unwrap();
        v.transition(ObligationStatus::Repaired).unwrap();
        assert_eq!(v.status(), ObligationStatus::Repaired);
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut v = vector();
        v.transition(ObligationStatus::Fulfilled).unwrap();

        let err = v.transition(ObligationStatus::Denied).unwrap_err();
        assert_eq!(err.from, ObligationStatus::Fulfilled);
        assert!(v.transition(ObligationStatus::Repaired).is_err());
        assert_eq!(v.status(), ObligationStatus::Fulfilled);

        let mut v = vector();
        v.transition(ObligationStatus::Expired).unwrap();
        v.transition(ObligationStatus::Repaired).unwrap();
        assert!(v.transition(ObligationStatus::Repaired).is_err());
        assert!(v.transition(ObligationStatus::Pending).is_err());
    }

    #[test]
    fn test_pending_cannot_be_repaired() {
        let mut v = vector();
        assert!(v.transition(ObligationStatus::Repaired).is_err());
        assert!(v.is_pending());
    }

    #[test]
    fn test_aging_and_expiry() {
        let mut v = vector();
        for _ in 0..3 {
            assert!(!v.has_expired());
            v.tick();
        }
        assert!(v.has_expired());

        v.transition(ObligationStatus::Expired).unwrap();
        v.tick();
        assert_eq!(v.age, 3);
    }

    #[test]
    fn test_gate() {
        let mut v = vector().gated();
        assert!(!v.is_ready());
        v.raise_gate();
        assert!(v.is_ready());

        assert!(vector().is_ready());
    }
}
