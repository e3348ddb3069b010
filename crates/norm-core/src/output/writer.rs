//! JSONL Writer
//!
//! Append-only JSON-lines output for run logs.

use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::SimError;
use crate::output::log::SimulationLog;

pub const OBLIGATIONS_FILE: &str = "obligations.jsonl";
pub const AGENTS_FILE: &str = "agents.jsonl";
pub const BIOGRAPHY_FILE: &str = "biography.jsonl";
pub const METRICS_FILE: &str = "metrics.json";

/// Writes one serialized record per line
pub struct JsonlWriter {
    writer: BufWriter<File>,
    record_count: u64,
}

impl JsonlWriter {
    /// Create a writer that truncates the file at `path`
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            record_count: 0,
        })
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<(), SimError> {
        let json = norm_events::to_jsonl(record)?;
        writeln!(self.writer, "{}", json)?;
        self.record_count += 1;
        Ok(())
    }

    pub fn write_all<T: Serialize>(&mut self, records: &[T]) -> Result<(), SimError> {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("Failed to flush JSONL writer: {}", e);
        }
    }
}

/// Write every log stream of a run into `dir`
pub fn write_outputs(dir: impl AsRef<Path>, log: &SimulationLog) -> Result<(), SimError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut obligations = JsonlWriter::new(dir.join(OBLIGATIONS_FILE))?;
    obligations.write_all(&log.obligations)?;
    obligations.flush()?;

    let mut agents = JsonlWriter::new(dir.join(AGENTS_FILE))?;
    agents.write_all(&log.agents)?;
    agents.flush()?;

    let mut biography = JsonlWriter::new(dir.join(BIOGRAPHY_FILE))?;
    biography.write_all(&log.biography)?;
    biography.flush()?;

    let metrics = serde_json::to_string_pretty(&log.metrics)?;
    fs::write(dir.join(METRICS_FILE), metrics)?;

    tracing::info!(
        "Wrote {} obligation entries, {} agent entries, {} biography entries and {} metrics records to {}",
        obligations.record_count(),
        agents.record_count(),
        biography.record_count(),
        log.metrics.len(),
        dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use norm_events::{AgentId, GenerationMetrics, ObligationLogEntry, ObligationStatus};
    use std::io::BufRead;
    use tempfile::tempdir;

    #[test]
    fn test_jsonl_writing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("obligations.jsonl");

        let mut writer = JsonlWriter::new(&path).unwrap();
        writer
            .write(&ObligationLogEntry::new(1, AgentId(1), AgentId(2), "care", ObligationStatus::Denied))
            .unwrap();
        writer
            .write(&ObligationLogEntry::new(1, AgentId(2), AgentId(1), "legal", ObligationStatus::Fulfilled))
            .unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.record_count(), 2);

        let file = File::open(&path).unwrap();
        let lines: Vec<String> = std::io::BufReader::new(file).lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 2);

        let parsed: ObligationLogEntry = norm_events::from_jsonl(&lines[0]).unwrap();
        assert_eq!(parsed.status, ObligationStatus::Denied);
        assert_eq!(parsed.norm, "care");
    }

    #[test]
    fn test_write_outputs_creates_all_files() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("run");
        let mut log = SimulationLog::new();
        log.record_metrics(GenerationMetrics::default());

        write_outputs(&out, &log).unwrap();

        for name in [OBLIGATIONS_FILE, AGENTS_FILE, BIOGRAPHY_FILE, METRICS_FILE] {
            assert!(out.join(name).exists(), "missing {}", name);
        }
        let metrics: Vec<GenerationMetrics> =
            serde_json::from_str(&fs::read_to_string(out.join(METRICS_FILE)).unwrap()).unwrap();
        assert_eq!(metrics.len(), 1);
    }
}
