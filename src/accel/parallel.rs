use rayon::prelude::*;

use super::{check_dispatch, kernels, BackendError, BackendKind, ComputeBackend, ReduceKind};

/// Work-group width the parallel backend asks for by default.
pub const PARALLEL_BLOCK_SIZE: usize = 256;

/// Data-parallel backend: one work unit per block on the rayon pool.
///
/// Work units share nothing mutable; each writes only its own partial slot or
/// its own block of the output buffer. The call returns once every block is
/// done, which is the stage barrier the pipeline relies on.
#[derive(Debug, Clone, Copy)]
pub struct ParallelBackend {
    block_size: usize,
}

impl ParallelBackend {
    pub fn new() -> Self {
        Self {
            block_size: PARALLEL_BLOCK_SIZE,
        }
    }

    /// Worker threads available to a dispatch.
    pub fn compute_units(&self) -> usize {
        rayon::current_num_threads()
    }
}

impl Default for ParallelBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for ParallelBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Parallel
    }

    fn preferred_block_size(&self) -> usize {
        self.block_size
    }

    fn reduce(
        &self,
        kind: ReduceKind,
        block_size: usize,
        data: &[f32],
    ) -> Result<Vec<f64>, BackendError> {
        check_dispatch(block_size, data.len())?;
        Ok(data
            .par_chunks_exact(block_size)
            .map_init(
                || Vec::with_capacity(block_size),
                |scratch, block| kernels::tree_reduce_block(kind, block, scratch),
            )
            .collect())
    }

    fn sort_blocks(&self, block_size: usize, data: &[f32]) -> Result<Vec<f32>, BackendError> {
        check_dispatch(block_size, data.len())?;
        let mut out = data.to_vec();
        if block_size.is_power_of_two() {
            out.par_chunks_exact_mut(block_size)
                .for_each(kernels::bitonic_sort);
        } else {
            out.par_chunks_exact_mut(block_size)
                .for_each(kernels::sort_block);
        }
        Ok(out)
    }
}
