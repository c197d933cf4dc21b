//! Multi-seed batch runs
//!
//! Each run is an independent, single-threaded simulation; rayon only
//! spreads whole runs across threads, so every result matches a serial run
//! with the same seed.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::Step;
use crate::simulation::metrics::MetricRecord;
use crate::simulation::scheduler::{run, Model};

/// Outcome of one run in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRun {
    pub seed: u64,
    pub steps: Step,
    /// True if the model stopped on its own before the step bound
    pub finished: bool,
    pub metrics: MetricRecord,
}

/// Build and run one model per seed, in parallel. Results follow `seeds` order.
pub fn run_batch<M, F>(seeds: &[u64], max_steps: Step, build: F) -> Result<Vec<BatchRun>>
where
    M: Model,
    F: Fn(u64) -> Result<M> + Sync,
{
    let runs = seeds
        .par_iter()
        .map(|&seed| {
            let mut model = build(seed)?;
            let steps = run(&mut model, max_steps)?;
            Ok(BatchRun {
                seed,
                steps,
                finished: !model.running(),
                metrics: model.metrics().clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::info!("Batch of {} runs complete", runs.len());
    Ok(runs)
}
