//! Compute backends -- block-local reductions and sorts.
//!
//! Every backend only ever sees one block at a time: it can reduce a block to
//! a single partial result or sort a block in place, never the whole dataset.
//! The pipeline in [`crate::stats`] turns those block-local results into
//! global statistics.

pub mod cpu;
pub mod kernels;
pub mod manager;
pub mod parallel;

pub use manager::{BackendManager, DeviceInfo, ManagedBackend};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("compute backend {backend:?} is not available")]
    Unavailable { backend: BackendKind },

    #[error("no device with index {index} ({count} available)")]
    UnknownDevice { index: usize, count: usize },

    #[error("block size must be positive")]
    ZeroBlockSize,

    #[error("dispatch of {len} values is not a multiple of block size {block_size}")]
    Misaligned { len: usize, block_size: usize },

    #[error("{op} on {backend:?} disagrees with scalar reference: {detail}")]
    VerificationMismatch {
        op: &'static str,
        backend: BackendKind,
        detail: String,
    },
}

/// Backend types for block execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Sequential per-block reference. Verification baseline.
    Scalar,
    /// Blocks dispatched across the rayon work-stealing pool.
    Parallel,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Scalar => f.write_str("scalar"),
            BackendKind::Parallel => f.write_str("parallel"),
        }
    }
}

/// One block-local reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReduceKind {
    Sum,
    Min,
    Max,
    /// Sum of `(x - mean)^2` around the global mean from an earlier pass.
    SquaredDeviation { mean: f64 },
}

impl ReduceKind {
    /// Value placed in pad slots. Neutral for sum, min and max; for squared
    /// deviation it is the mean rounded to `f32`, which leaves the residual
    /// reported by [`ReduceKind::pad_residual`].
    pub fn neutral_pad(&self) -> f32 {
        match self {
            ReduceKind::Sum => 0.0,
            ReduceKind::Min => f32::INFINITY,
            ReduceKind::Max => f32::NEG_INFINITY,
            ReduceKind::SquaredDeviation { mean } => *mean as f32,
        }
    }

    /// What one pad slot adds to its block's partial. Computed exactly the
    /// way the kernels load the pad value, so the host can subtract it.
    pub fn pad_residual(&self) -> f64 {
        match self {
            ReduceKind::SquaredDeviation { mean } => {
                let d = self.neutral_pad() as f64 - mean;
                d * d
            }
            _ => 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReduceKind::Sum => "sum",
            ReduceKind::Min => "min",
            ReduceKind::Max => "max",
            ReduceKind::SquaredDeviation { .. } => "sq_dev",
        }
    }
}

/// Capability interface every block executor implements.
///
/// `data.len()` must be an exact multiple of `block_size`. Implementations
/// return one partial per block from `reduce` and a buffer of the same length
/// from `sort_blocks` where each block is ascending on its own.
pub trait ComputeBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Parallel-execution granularity this backend prefers.
    fn preferred_block_size(&self) -> usize;

    fn reduce(&self, kind: ReduceKind, block_size: usize, data: &[f32])
        -> Result<Vec<f64>, BackendError>;

    fn sort_blocks(&self, block_size: usize, data: &[f32]) -> Result<Vec<f32>, BackendError>;
}

/// Reject a dispatch the block grid cannot cover exactly.
pub(crate) fn check_dispatch(block_size: usize, len: usize) -> Result<(), BackendError> {
    if block_size == 0 {
        return Err(BackendError::ZeroBlockSize);
    }
    if len % block_size != 0 {
        return Err(BackendError::Misaligned { len, block_size });
    }
    Ok(())
}

/// Metadata recording which backend ran a stage and for how long.
#[derive(Debug, Clone, Serialize)]
pub struct AccelMetadata {
    pub backend: BackendKind,
    pub duration_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dispatch() {
        assert!(check_dispatch(4, 8).is_ok());
        assert!(check_dispatch(4, 0).is_ok());
        assert_eq!(check_dispatch(0, 8), Err(BackendError::ZeroBlockSize));
        assert_eq!(
            check_dispatch(4, 6),
            Err(BackendError::Misaligned { len: 6, block_size: 4 })
        );
    }

    #[test]
    fn test_neutral_pads() {
        assert_eq!(ReduceKind::Sum.neutral_pad(), 0.0);
        assert_eq!(ReduceKind::Min.neutral_pad(), f32::INFINITY);
        assert_eq!(ReduceKind::Max.neutral_pad(), f32::NEG_INFINITY);
        assert_eq!(ReduceKind::SquaredDeviation { mean: 2.5 }.neutral_pad(), 2.5);
        assert_eq!(ReduceKind::Sum.pad_residual(), 0.0);
        assert_eq!(ReduceKind::SquaredDeviation { mean: 2.5 }.pad_residual(), 0.0);
    }

    #[test]
    fn test_pad_residual_of_unrepresentable_mean() {
        // 10000000.5 rounds to 10000000 in f32
        let kind = ReduceKind::SquaredDeviation { mean: 10_000_000.5 };
        assert_eq!(kind.neutral_pad(), 10_000_000.0);
        assert_eq!(kind.pad_residual(), 0.25);
    }
}
