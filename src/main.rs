//! Gridsim - headless runner
//!
//! Runs one scenario (or a batch of seeds) and writes the metric record as JSON.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use gridsim::core::config::ScenarioFile;
use gridsim::core::error::Result;
use gridsim::core::types::Step;
use gridsim::scenarios::{LifeModel, SegregationModel, SugarscapeModel};
use gridsim::simulation::{run, run_batch, Model};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    Life,
    Segregation,
    Sugarscape,
}

/// Run a grid simulation and export its per-step metrics
#[derive(Parser, Debug)]
#[command(name = "gridsim")]
#[command(about = "Run a grid-based agent simulation and output its metrics as JSON")]
struct Args {
    /// Scenario to run
    #[arg(value_enum)]
    scenario: Scenario,

    /// Maximum steps; a scenario may stop earlier on its own
    #[arg(long, default_value_t = 100)]
    steps: Step,

    /// Random seed, overriding the config file
    #[arg(long)]
    seed: Option<u64>,

    /// TOML config file with [life], [segregation] and [sugarscape] tables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Capacity map for the sugarscape scenario
    #[arg(long)]
    map: Option<PathBuf>,

    /// Write JSON here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Run this many consecutive seeds in parallel
    #[arg(long)]
    batch: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridsim=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut file = match &args.config {
        Some(path) => ScenarioFile::load(path)?,
        None => ScenarioFile::default(),
    };
    if let Some(seed) = args.seed {
        file.life.seed = Some(seed);
        file.segregation.seed = Some(seed);
        file.sugarscape.seed = Some(seed);
    }
    if let Some(map) = &args.map {
        file.sugarscape.map = Some(map.clone());
    }

    let json = match args.batch {
        Some(count) => run_seeds(&args, &file, count)?,
        None => match args.scenario {
            Scenario::Life => run_single(LifeModel::new(file.life)?, args.steps)?,
            Scenario::Segregation => {
                run_single(SegregationModel::new(file.segregation)?, args.steps)?
            }
            Scenario::Sugarscape => run_single(SugarscapeModel::new(file.sugarscape)?, args.steps)?,
        },
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!("Metrics written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run_single<M: Model>(mut model: M, max_steps: Step) -> Result<String> {
    let executed = run(&mut model, max_steps)?;
    if let Some(row) = model.metrics().last() {
        tracing::info!(
            "Stopped after {} steps (finished: {}), last metrics: {:?}",
            executed,
            !model.running(),
            row.values
        );
    }
    model.metrics().to_json()
}

/// Consecutive seeds starting at `--seed` (or a random base)
fn run_seeds(args: &Args, file: &ScenarioFile, count: usize) -> Result<String> {
    let base = args.seed.unwrap_or_else(rand::random);
    let seeds: Vec<u64> = (0..count as u64).map(|i| base.wrapping_add(i)).collect();
    tracing::info!("Batch of {} seeds starting at {}", count, base);

    let runs = match args.scenario {
        Scenario::Life => run_batch(&seeds, args.steps, |seed| {
            let mut config = file.life.clone();
            config.seed = Some(seed);
            LifeModel::new(config)
        })?,
        Scenario::Segregation => run_batch(&seeds, args.steps, |seed| {
            let mut config = file.segregation.clone();
            config.seed = Some(seed);
            SegregationModel::new(config)
        })?,
        Scenario::Sugarscape => run_batch(&seeds, args.steps, |seed| {
            let mut config = file.sugarscape.clone();
            config.seed = Some(seed);
            SugarscapeModel::new(config)
        })?,
    };

    for r in &runs {
        tracing::info!(
            "Seed {}: {} steps (finished: {})",
            r.seed,
            r.steps,
            r.finished
        );
    }
    Ok(serde_json::to_string_pretty(&runs)?)
}
