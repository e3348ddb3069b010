//! Shared record types and serialization for the moral community simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! The simulation core produces these records; analysis tooling consumes them.

pub mod agent;
pub mod metrics;
pub mod obligation;

pub use agent::{AgentLogEntry, BiographyEntry, BiographyKind, MoralStance, Role, ScenarioGroup};
pub use metrics::{ratio, GenerationMetrics};
pub use obligation::{AgentId, ObligationLogEntry, ObligationStatus, REPAIR_NORM};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serializes a record to a single JSON line.
pub fn to_jsonl<T: Serialize>(record: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}

/// Deserializes a record from a JSON line.
pub fn from_jsonl<T: DeserializeOwned>(line: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(line.trim())
}
