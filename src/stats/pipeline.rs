//! Pipeline orchestrator.
//!
//! Runs the stages in dependency order:
//!
//! ```text
//! Ingested -> MeanComputed -> VarianceComputed -> Sorted -> Merged
//!          -> QuantilesComputed -> Done
//! ```
//!
//! Each state owns exactly the buffer the next stage reads. Padded buffers for
//! the reduction passes live only for the duration of their pass. Any error
//! moves the pipeline to `Failed`, and no statistics are handed out after that.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::partition::{padded_len, PadPolicy, PaddedDataset};
use super::{accumulate, merge, order, MergeStrategy, Moments, Quartiles, StatsError, StatsReport};
use crate::accel::{AccelMetadata, BackendError, ComputeBackend, ReduceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingested,
    MeanComputed,
    VarianceComputed,
    Sorted,
    Merged,
    QuantilesComputed,
    Done,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Ingested => "ingested",
            Stage::MeanComputed => "mean_computed",
            Stage::VarianceComputed => "variance_computed",
            Stage::Sorted => "sorted",
            Stage::Merged => "merged",
            Stage::QuantilesComputed => "quantiles_computed",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Wall-clock cost of reaching one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: Stage,
    #[serde(flatten)]
    pub meta: AccelMetadata,
}

enum State {
    Ingested,
    MeanComputed {
        moments: Moments,
    },
    VarianceComputed {
        moments: Moments,
    },
    Sorted {
        moments: Moments,
        sorted: PaddedDataset,
    },
    Merged {
        moments: Moments,
        ordered: Vec<f32>,
    },
    QuantilesComputed {
        moments: Moments,
        quartiles: Quartiles,
    },
    Done(StatsReport),
    Failed(StatsError),
}

impl State {
    fn stage(&self) -> Stage {
        match self {
            State::Ingested => Stage::Ingested,
            State::MeanComputed { .. } => Stage::MeanComputed,
            State::VarianceComputed { .. } => Stage::VarianceComputed,
            State::Sorted { .. } => Stage::Sorted,
            State::Merged { .. } => Stage::Merged,
            State::QuantilesComputed { .. } => Stage::QuantilesComputed,
            State::Done(_) => Stage::Done,
            State::Failed(_) => Stage::Failed,
        }
    }
}

/// One statistics run over one dataset.
pub struct Pipeline<'a> {
    backend: &'a dyn ComputeBackend,
    block_size: usize,
    strategy: MergeStrategy,
    dataset: Vec<f32>,
    state: State,
    timings: Vec<StageTiming>,
}

impl<'a> Pipeline<'a> {
    /// Take ownership of `dataset` for the run.
    pub fn new(backend: &'a dyn ComputeBackend, block_size: usize, dataset: Vec<f32>) -> Self {
        Self {
            backend,
            block_size,
            strategy: MergeStrategy::default(),
            dataset,
            state: State::Ingested,
            timings: Vec::new(),
        }
    }

    pub fn with_merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    /// Reduction statistics, once the mean stage has completed and until the
    /// pipeline fails.
    pub fn moments(&self) -> Option<Moments> {
        match &self.state {
            State::MeanComputed { moments }
            | State::VarianceComputed { moments }
            | State::Sorted { moments, .. }
            | State::Merged { moments, .. }
            | State::QuantilesComputed { moments, .. } => Some(*moments),
            State::Done(report) => Some(report.moments()),
            State::Ingested | State::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&StatsError> {
        match &self.state {
            State::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn timings(&self) -> &[StageTiming] {
        &self.timings
    }

    /// Perform the next transition. A finished pipeline stays `Done`; a failed
    /// one keeps returning its error.
    pub fn advance(&mut self) -> Result<Stage, StatsError> {
        let state = std::mem::replace(&mut self.state, State::Ingested);
        match state {
            State::Done(report) => {
                self.state = State::Done(report);
                return Ok(Stage::Done);
            }
            State::Failed(e) => {
                self.state = State::Failed(e.clone());
                return Err(e);
            }
            _ => {}
        }

        let from = state.stage();
        let started = Instant::now();
        match self.transition(state) {
            Ok(next) => {
                let stage = next.stage();
                let duration_us = started.elapsed().as_micros() as u64;
                debug!(%from, to = %stage, duration_us, "pipeline stage complete");
                self.timings.push(StageTiming {
                    stage,
                    meta: AccelMetadata {
                        backend: self.backend.kind(),
                        duration_us,
                    },
                });
                let mut next = next;
                if let State::Done(report) = &mut next {
                    report.timings = self.timings.clone();
                }
                self.state = next;
                Ok(stage)
            }
            Err(e) => {
                warn!(%from, error = %e, "pipeline failed");
                self.state = State::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Drive every remaining stage and return the report.
    pub fn run(mut self) -> Result<StatsReport, StatsError> {
        info!(
            records = self.dataset.len(),
            block_size = self.block_size,
            backend = %self.backend.kind(),
            merge = %self.strategy,
            "starting statistics pipeline"
        );
        loop {
            self.advance()?;
            if let State::Done(report) = self.state {
                return Ok(report);
            }
        }
    }

    fn transition(&self, state: State) -> Result<State, StatsError> {
        Ok(match state {
            State::Ingested => State::MeanComputed {
                moments: self.compute_mean()?,
            },
            State::MeanComputed { moments } => State::VarianceComputed {
                moments: self.compute_variance(moments)?,
            },
            State::VarianceComputed { moments } => State::Sorted {
                moments,
                sorted: self.sort_blocks()?,
            },
            State::Sorted { moments, sorted } => State::Merged {
                moments,
                ordered: self.merge(sorted)?,
            },
            State::Merged { moments, ordered } => State::QuantilesComputed {
                moments,
                quartiles: order::quartiles(&ordered)?,
            },
            State::QuantilesComputed { moments, quartiles } => {
                State::Done(self.report(moments, quartiles))
            }
            done @ (State::Done(_) | State::Failed(_)) => done,
        })
    }

    /// One reduction pass over a stage-local buffer padded with the kind's
    /// neutral element.
    fn reduce(&self, kind: ReduceKind) -> Result<Vec<f64>, StatsError> {
        let padded = PaddedDataset::new(
            &self.dataset,
            self.block_size,
            PadPolicy::Neutral(kind.neutral_pad()),
        )?;
        let partials = self.backend.reduce(kind, self.block_size, padded.values())?;
        if partials.len() != padded.block_count() {
            return Err(BackendError::Misaligned {
                len: partials.len(),
                block_size: padded.block_count(),
            }
            .into());
        }
        debug!(op = kind.name(), blocks = partials.len(), "block reduction complete");
        Ok(partials)
    }

    fn compute_mean(&self) -> Result<Moments, StatsError> {
        let count = self.dataset.len();
        if count == 0 {
            return Err(StatsError::InsufficientData { needed: 1, have: 0 });
        }
        if let Some(i) = self.dataset.iter().position(|v| !v.is_finite()) {
            return Err(StatsError::NumericDomain(format!(
                "record {} is not finite: {}",
                i, self.dataset[i]
            )));
        }

        let mean = accumulate::mean(&self.reduce(ReduceKind::Sum)?, count)?;
        let min = accumulate::min(&self.reduce(ReduceKind::Min)?)?;
        let max = accumulate::max(&self.reduce(ReduceKind::Max)?)?;
        Ok(Moments {
            count,
            min: min as f32,
            max: max as f32,
            mean,
            variance: None,
        })
    }

    fn compute_variance(&self, moments: Moments) -> Result<Moments, StatsError> {
        let kind = ReduceKind::SquaredDeviation { mean: moments.mean };
        let partials = self.reduce(kind)?;
        let pad = padded_len(moments.count, self.block_size) - moments.count;
        let residual = pad as f64 * kind.pad_residual();
        let variance = accumulate::variance(&partials, residual, moments.count, moments.mean)?;
        Ok(Moments {
            variance: Some(variance),
            ..moments
        })
    }

    fn sort_blocks(&self) -> Result<PaddedDataset, StatsError> {
        let padded = PaddedDataset::new(&self.dataset, self.block_size, PadPolicy::SymmetricExtremal)?;
        let sorted = self.backend.sort_blocks(self.block_size, padded.values())?;
        if sorted.len() != padded.len() {
            return Err(BackendError::Misaligned {
                len: sorted.len(),
                block_size: self.block_size,
            }
            .into());
        }
        debug!(
            blocks = padded.block_count(),
            pad_left = padded.pad_left(),
            pad_right = padded.pad_right(),
            "block sort complete"
        );
        Ok(padded.with_values(sorted))
    }

    fn merge(&self, sorted: PaddedDataset) -> Result<Vec<f32>, StatsError> {
        let ordered = merge::merge(self.strategy, sorted.values(), sorted.block_size())?;
        let ordered = merge::strip_sentinels(ordered, sorted.pad_left(), sorted.pad_right())?;
        debug_assert_eq!(ordered.len(), sorted.original_len());
        Ok(ordered)
    }

    fn report(&self, moments: Moments, quartiles: Quartiles) -> StatsReport {
        let variance = moments.variance.unwrap_or(0.0);
        StatsReport {
            record_count: moments.count,
            min: moments.min,
            max: moments.max,
            mean: moments.mean,
            variance,
            std_dev: variance.sqrt(),
            quartiles,
            block_size: self.block_size,
            backend: self.backend.kind(),
            merge: self.strategy,
            // Filled in once the final transition is timed.
            timings: Vec::new(),
        }
    }
}
