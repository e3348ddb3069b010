//! Moral Community Simulation
//!
//! Runs a single seeded simulation or a batch over every scenario preset and
//! toggle combination, writing JSONL logs to an output directory.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use norm_core::config::DEFAULT_TUNING_PATH;
use norm_core::{write_outputs, BatchRunner, ScenarioPreset, SimConfig, SimError, Simulation};

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "moral_sim")]
#[command(about = "Agent-based simulation of obligations, trust and emergent moral communities")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one simulation
    Run {
        /// Random seed for reproducibility (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,

        /// Number of generations to simulate
        #[arg(long)]
        generations: Option<u32>,

        /// Initial population size
        #[arg(long)]
        population: Option<usize>,

        /// Scenario preset applied to every founding agent
        #[arg(long)]
        scenario: Option<ScenarioPreset>,

        /// Tuning file
        #[arg(long, default_value = DEFAULT_TUNING_PATH)]
        config: PathBuf,

        /// Output directory
        #[arg(long, default_value = "output")]
        output: PathBuf,
    },

    /// Run every preset under every toggle combination
    Batch {
        /// Repetitions of the full preset x toggle cross product
        #[arg(long, default_value_t = 1)]
        repetitions: u32,

        /// Generations per run
        #[arg(long)]
        generations: Option<u32>,

        /// Seed of the first run; run i uses seed + i
        #[arg(long)]
        seed: Option<u64>,

        /// Tuning file
        #[arg(long, default_value = DEFAULT_TUNING_PATH)]
        config: PathBuf,

        /// Output directory
        #[arg(long, default_value = "output/batch")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command) -> Result<(), SimError> {
    match command {
        Command::Run {
            seed,
            generations,
            population,
            scenario,
            config,
            output,
        } => {
            let mut config = load_config(&config)?;
            if let Some(seed) = seed {
                config.simulation.seed = seed;
            }
            if let Some(generations) = generations {
                config.simulation.generations = generations;
            }
            if let Some(population) = population {
                config.population.size = population;
            }

            println!("Moral Community Simulation");
            println!("==========================");
            println!("Seed: {}", config.simulation.seed);
            println!("Population: {}", config.population.size);
            println!("Generations: {}", config.simulation.generations);
            println!();

            let generations = config.simulation.generations;
            let mut sim = Simulation::with_preset(config, scenario)?;
            let last = sim.run(generations);
            write_outputs(&output, sim.log())?;

            println!();
            println!("Simulation complete!");
            println!("Final population: {}", sim.population().len());
            if let Some(metrics) = last {
                println!("Fulfillment rate: {:.3}", metrics.fulfillment_rate);
                println!("Relational integrity: {:.3}", metrics.relational_integrity);
                println!("Emergent regimes: {}", metrics.emergent_regimes);
                println!("Hostile pairs: {}", metrics.hostile_pairs);
            }
            println!("Output written to {}", output.display());
            Ok(())
        }
        Command::Batch {
            repetitions,
            generations,
            seed,
            config,
            output,
        } => {
            let mut config = load_config(&config)?;
            if let Some(seed) = seed {
                config.simulation.seed = seed;
            }
            let generations = generations.unwrap_or(config.simulation.generations);

            let runner = BatchRunner::new(config, repetitions, generations);
            println!("Running {} batch runs of {} generations", runner.run_count(), generations);
            let report = runner.run()?;
            write_outputs(&output, &report.log)?;

            let summaries = serde_json::to_string_pretty(&report.runs)?;
            std::fs::write(output.join("runs.json"), summaries)?;

            println!("Batch complete: {} runs", report.runs.len());
            println!("Output written to {}", output.display());
            Ok(())
        }
    }
}

/// Load the tuning file, falling back to defaults when it does not exist
fn load_config(path: &Path) -> Result<SimConfig, SimError> {
    if path.exists() {
        tracing::info!("Loading config from {}", path.display());
        Ok(SimConfig::load(path)?)
    } else {
        tracing::warn!("Config file {} not found, using defaults", path.display());
        Ok(SimConfig::default())
    }
}
