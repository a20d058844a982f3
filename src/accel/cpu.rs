use super::{check_dispatch, kernels, BackendError, BackendKind, ComputeBackend, ReduceKind};

/// Preferred block size for the scalar reference.
pub const SCALAR_BLOCK_SIZE: usize = 64;

/// Scalar CPU reference backend. Walks the blocks one after another with the
/// sequential kernels; every other backend is verified against it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarBackend;

impl ScalarBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ComputeBackend for ScalarBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Scalar
    }

    fn preferred_block_size(&self) -> usize {
        SCALAR_BLOCK_SIZE
    }

    fn reduce(
        &self,
        kind: ReduceKind,
        block_size: usize,
        data: &[f32],
    ) -> Result<Vec<f64>, BackendError> {
        check_dispatch(block_size, data.len())?;
        Ok(data
            .chunks_exact(block_size)
            .map(|block| kernels::fold_block(kind, block))
            .collect())
    }

    fn sort_blocks(&self, block_size: usize, data: &[f32]) -> Result<Vec<f32>, BackendError> {
        check_dispatch(block_size, data.len())?;
        let mut out = data.to_vec();
        for block in out.chunks_exact_mut(block_size) {
            kernels::sort_block(block);
        }
        Ok(out)
    }
}
