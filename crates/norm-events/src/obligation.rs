//! Obligation Records
//!
//! Status values and log entries for directed obligations between agents.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Norm label written on log entries produced by moral repair.
pub const REPAIR_NORM: &str = "n/a";

/// Unique, monotonically assigned agent identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an obligation.
///
/// `Pending` is the only initial state. `Fulfilled`, `Denied` and `Expired` are
/// terminal under normal flow; only `Denied` and `Expired` may later become
/// `Repaired`, and nothing leaves `Repaired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    Pending,
    Fulfilled,
    Denied,
    Expired,
    Repaired,
}

impl ObligationStatus {
    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: ObligationStatus) -> bool {
        use ObligationStatus::*;
        matches!(
            (self, next),
            (Pending, Fulfilled) | (Pending, Denied) | (Pending, Expired) | (Denied, Repaired) | (Expired, Repaired)
        )
    }

    /// True for statuses that count as a broken obligation.
    pub fn is_breach(self) -> bool {
        matches!(self, ObligationStatus::Denied | ObligationStatus::Expired)
    }

    pub fn is_pending(self) -> bool {
        self == ObligationStatus::Pending
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObligationStatus::Pending => "pending",
            ObligationStatus::Fulfilled => "fulfilled",
            ObligationStatus::Denied => "denied",
            ObligationStatus::Expired => "expired",
            ObligationStatus::Repaired => "repaired",
        }
    }
}

impl fmt::Display for ObligationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resolution of an obligation, appended to the obligation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObligationLogEntry {
    pub generation: u32,
    pub from: AgentId,
    pub to: AgentId,
    pub norm: String,
    pub status: ObligationStatus,
    /// Batch run index, set only under batch orchestration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<u32>,
    /// Batch scenario label, set only under batch orchestration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_scenario: Option<String>,
}

impl ObligationLogEntry {
    pub fn new(
        generation: u32,
        from: AgentId,
        to: AgentId,
        norm: impl Into<String>,
        status: ObligationStatus,
    ) -> Self {
        Self {
            generation,
            from,
            to,
            norm: norm.into(),
            status,
            run: None,
            batch_scenario: None,
        }
    }

    /// Entry recorded when a denied or expired obligation is repaired.
    pub fn repaired(generation: u32, from: AgentId, to: AgentId) -> Self {
        Self::new(generation, from, to, REPAIR_NORM, ObligationStatus::Repaired)
    }

    pub fn tagged(mut self, run: u32, batch_scenario: impl Into<String>) -> Self {
        self.run = Some(run);
        self.batch_scenario = Some(batch_scenario.into());
        self
    }
}
