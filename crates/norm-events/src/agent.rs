//! Agent Records
//!
//! Trait enums, scenario labels, per-generation agent log entries and
//! biography entries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::obligation::AgentId;

/// Social role, fixed at birth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    Enforcer,
    Mediator,
    Dissenter,
}

impl Role {
    pub fn all() -> &'static [Role] {
        &[Role::Citizen, Role::Enforcer, Role::Mediator, Role::Dissenter]
    }
}

/// Moral stance, fixed at birth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoralStance {
    Absolutist,
    Pragmatist,
}

/// Classification derived purely from an agent's acknowledgment pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScenarioGroup {
    /// Acknowledges every norm
    Utopian,
    /// Acknowledges no norm
    Collapsed,
    /// Acknowledges only the legal norm
    Authoritarian,
    /// Acknowledges only the care norm
    AllCare,
    /// Any other pattern
    Pluralist,
}

impl ScenarioGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioGroup::Utopian => "utopian",
            ScenarioGroup::Collapsed => "collapsed",
            ScenarioGroup::Authoritarian => "authoritarian",
            ScenarioGroup::AllCare => "allCare",
            ScenarioGroup::Pluralist => "pluralist",
        }
    }
}

impl fmt::Display for ScenarioGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-generation, per-agent state capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentLogEntry {
    pub generation: u32,
    /// Label of the scenario the run was started from
    pub scenario: String,
    pub id: AgentId,
    pub norm_preference: String,
    pub acknowledgments: BTreeMap<String, bool>,
    pub attempts: u32,
    pub successes: u32,
    pub conflict: u32,
    pub debt: u32,
    pub momentum: f32,
    pub trust_map_size: usize,
    pub max_trust: f32,
    pub fulfilled: u32,
    pub denied: u32,
    pub expired: u32,
    pub repaired: u32,
    pub role: Role,
    pub temperament: f32,
    pub moral_stance: MoralStance,
    pub scenario_group: ScenarioGroup,
    pub memory_length: f32,
    pub affiliation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_scenario: Option<String>,
}

/// What happened to an agent at a generation boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BiographyKind {
    Born {
        parent: Option<AgentId>,
    },
    Died {
        age: u32,
        internal_conflict: u32,
    },
    AcknowledgmentChanged {
        norm: String,
        acknowledged: bool,
    },
    AffiliationChanged {
        from: Option<String>,
        to: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiographyEntry {
    pub generation: u32,
    pub agent: AgentId,
    #[serde(flatten)]
    pub kind: BiographyKind,
}

impl BiographyEntry {
    pub fn new(generation: u32, agent: AgentId, kind: BiographyKind) -> Self {
        Self { generation, agent, kind }
    }
}
