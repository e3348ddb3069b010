//! Output Generation
//!
//! In-memory run logs, per-generation metrics aggregation and JSONL output.

pub mod log;
pub mod metrics;
pub mod writer;

pub use log::{agent_log_entry, RunTag, SimulationLog};
pub use metrics::aggregate_metrics;
pub use writer::{write_outputs, JsonlWriter};
