//! Block-parallel statistics pipeline.
//!
//! Partitioning, host-side accumulation of block partials, the k-way merge
//! that recovers a global order from block-local sorts, order statistics, and
//! the orchestrator that sequences them.

pub mod accumulate;
pub mod merge;
pub mod order;
pub mod partition;
pub mod pipeline;
pub mod report;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accel::{BackendError, BackendKind};

pub use merge::MergeStrategy;
pub use order::Quartiles;
pub use partition::{PadPolicy, PaddedDataset};
pub use pipeline::{Pipeline, Stage, StageTiming};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("invalid block size {0}: must be positive")]
    InvalidBlockSize(usize),

    #[error("compute backend failure: {0}")]
    ComputeBackend(#[from] BackendError),

    #[error("numeric domain error: {0}")]
    NumericDomain(String),

    #[error("insufficient data: need {needed} records, have {have}")]
    InsufficientData { needed: usize, have: usize },
}

/// Reduction-derived statistics: everything computable without a global order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub count: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    /// Population variance; `None` until the variance stage has run.
    pub variance: Option<f64>,
}

impl Moments {
    pub fn std_dev(&self) -> Option<f64> {
        self.variance.map(f64::sqrt)
    }
}

/// Final result of a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub record_count: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub quartiles: Quartiles,
    pub block_size: usize,
    pub backend: BackendKind,
    pub merge: MergeStrategy,
    pub timings: Vec<StageTiming>,
}

impl StatsReport {
    pub fn moments(&self) -> Moments {
        Moments {
            count: self.record_count,
            min: self.min,
            max: self.max,
            mean: self.mean,
            variance: Some(self.variance),
        }
    }
}
