//! blockstats -- descriptive statistics on a block-parallel compute model.
//!
//! Backends can only reduce or sort one fixed-size block at a time. This crate
//! builds global min, max, mean, standard deviation, median and quartiles on
//! top of that: block reductions folded on the host, block sorts recombined by
//! a k-way merge.

pub mod accel;
pub mod config;
pub mod ingest;
pub mod stats;

use accel::{BackendManager, ComputeBackend};
use config::StatsConfig;
use stats::{Pipeline, StatsError, StatsReport};

/// Build the backend manager described by `config`.
pub fn backend_manager(config: &StatsConfig) -> BackendManager {
    BackendManager::new()
        .with_scalar_threshold(config.compute.scalar_threshold)
        .with_verification(config.compute.verify)
}

/// Run the full statistics pipeline over `values`.
pub fn analyze(
    values: Vec<f32>,
    config: &StatsConfig,
    manager: &BackendManager,
) -> Result<StatsReport, StatsError> {
    let backend = manager.backend(config.compute.backend, values.len())?;
    let block_size = config
        .compute
        .block_size
        .unwrap_or_else(|| backend.preferred_block_size());
    tracing::info!(
        records = values.len(),
        backend = %backend.kind(),
        block_size,
        "Analyzing dataset"
    );
    Pipeline::new(&backend, block_size, values)
        .with_merge_strategy(config.merge.strategy)
        .run()
}
