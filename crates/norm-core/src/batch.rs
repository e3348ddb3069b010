//! Batch Driver
//!
//! Runs every scenario preset under every toggle combination, one run after
//! another from a fresh simulation, and gathers their tagged logs.

use serde::Serialize;

use norm_events::GenerationMetrics;

use crate::config::SimConfig;
use crate::error::SimError;
use crate::output::{RunTag, SimulationLog};
use crate::scenario::ScenarioPreset;
use crate::simulation::Simulation;

/// Feature flags varied across batch runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toggles {
    pub moral_repair: bool,
    pub directed_emergence: bool,
    pub vulnerability_targeting: bool,
}

impl Toggles {
    /// All eight combinations, starting with everything off
    pub fn all() -> Vec<Toggles> {
        (0..8u8)
            .map(|bits| Toggles {
                moral_repair: bits & 1 != 0,
                directed_emergence: bits & 2 != 0,
                vulnerability_targeting: bits & 4 != 0,
            })
            .collect()
    }

    pub fn apply(&self, config: &mut SimConfig) {
        config.repair.enabled = self.moral_repair;
        config.drift.directed_emergence = self.directed_emergence;
        config.obligations.vulnerability_targeting = self.vulnerability_targeting;
    }

    /// Label suffix, e.g. `+repair+vulnerable`
    pub fn suffix(&self) -> String {
        let mut suffix = String::new();
        if self.moral_repair {
            suffix.push_str("+repair");
        }
        if self.directed_emergence {
            suffix.push_str("+directed");
        }
        if self.vulnerability_targeting {
            suffix.push_str("+vulnerable");
        }
        suffix
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run: u32,
    pub batch_scenario: String,
    pub seed: u64,
    pub generations: u32,
    pub final_metrics: Option<GenerationMetrics>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub runs: Vec<RunSummary>,
    pub log: SimulationLog,
}

pub struct BatchRunner {
    config: SimConfig,
    repetitions: u32,
    generations: u32,
    base_seed: u64,
    presets: Vec<ScenarioPreset>,
    toggles: Vec<Toggles>,
}

impl BatchRunner {
    pub fn new(config: SimConfig, repetitions: u32, generations: u32) -> Self {
        let base_seed = config.simulation.seed;
        Self {
            config,
            repetitions,
            generations,
            base_seed,
            presets: ScenarioPreset::all().to_vec(),
            toggles: Toggles::all(),
        }
    }

    pub fn with_presets(mut self, presets: Vec<ScenarioPreset>) -> Self {
        self.presets = presets;
        self
    }

    pub fn with_toggles(mut self, toggles: Vec<Toggles>) -> Self {
        self.toggles = toggles;
        self
    }

    pub fn with_base_seed(mut self, seed: u64) -> Self {
        self.base_seed = seed;
        self
    }

    pub fn run_count(&self) -> usize {
        self.repetitions as usize * self.presets.len() * self.toggles.len()
    }

    /// Run the full cross product. Run `i` is seeded with `base_seed + i`.
    pub fn run(&self) -> Result<BatchReport, SimError> {
        self.config.validate()?;
        tracing::info!(
            runs = self.run_count(),
            generations = self.generations,
            base_seed = self.base_seed,
            "Starting batch"
        );

        let mut report = BatchReport::default();
        let mut run = 0u32;
        for _ in 0..self.repetitions {
            for &preset in &self.presets {
                for toggles in &self.toggles {
                    let summary = self.run_one(run, preset, toggles, &mut report.log)?;
                    report.runs.push(summary);
                    run += 1;
                }
            }
        }
        Ok(report)
    }

    fn run_one(
        &self,
        run: u32,
        preset: ScenarioPreset,
        toggles: &Toggles,
        log: &mut SimulationLog,
    ) -> Result<RunSummary, SimError> {
        let mut config = self.config.clone();
        toggles.apply(&mut config);
        let seed = self.base_seed.wrapping_add(u64::from(run));
        config.simulation.seed = seed;
        let batch_scenario = format!("{}{}", preset.label(), toggles.suffix());

        let mut sim = Simulation::with_preset(config, Some(preset))?;
        sim.set_run_tag(Some(RunTag {
            run,
            batch_scenario: batch_scenario.clone(),
        }));
        let final_metrics = sim.run(self.generations);
        log.append(&mut sim.take_log());

        tracing::info!(
            run,
            scenario = %batch_scenario,
            population = sim.population().len(),
            "Batch run complete"
        );
        Ok(RunSummary {
            run,
            batch_scenario,
            seed,
            generations: sim.generation(),
            final_metrics,
        })
    }
}
