//! Splitting a dataset into equal-size blocks.

use super::StatsError;

/// Real elements are always finite, so the infinities are unambiguous
/// sentinels.
pub const LOW_SENTINEL: f32 = f32::NEG_INFINITY;
pub const HIGH_SENTINEL: f32 = f32::INFINITY;

/// How pad slots are filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PadPolicy {
    /// Append copies of a value that is neutral for the reduction being run.
    Neutral(f32),
    /// Prepend `floor(pad/2)` low sentinels and append `ceil(pad/2)` high
    /// sentinels. Keeps sentinels at the extreme ends of any sorted order.
    SymmetricExtremal,
}

/// Dataset padded to a whole number of blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedDataset {
    values: Vec<f32>,
    block_size: usize,
    original_len: usize,
    pad_left: usize,
    pad_right: usize,
}

impl PaddedDataset {
    /// Pad `data` up to the next multiple of `block_size`.
    pub fn new(data: &[f32], block_size: usize, policy: PadPolicy) -> Result<Self, StatsError> {
        if block_size == 0 {
            return Err(StatsError::InvalidBlockSize(block_size));
        }
        let padded_len = padded_len(data.len(), block_size);
        let pad = padded_len - data.len();

        let (pad_left, pad_right, left_fill, right_fill) = match policy {
            PadPolicy::Neutral(fill) => (0, pad, fill, fill),
            PadPolicy::SymmetricExtremal => (pad / 2, pad - pad / 2, LOW_SENTINEL, HIGH_SENTINEL),
        };

        let mut values = Vec::with_capacity(padded_len);
        values.resize(pad_left, left_fill);
        values.extend_from_slice(data);
        values.resize(padded_len, right_fill);

        Ok(Self {
            values,
            block_size,
            original_len: data.len(),
            pad_left,
            pad_right,
        })
    }

    /// Rebuild from a buffer that already carries this dataset's layout, such
    /// as the output of a block sort.
    pub fn with_values(&self, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        Self {
            values,
            block_size: self.block_size,
            original_len: self.original_len,
            pad_left: self.pad_left,
            pad_right: self.pad_right,
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn block_count(&self) -> usize {
        self.values.len() / self.block_size
    }

    /// Number of real values before padding.
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    pub fn pad_left(&self) -> usize {
        self.pad_left
    }

    pub fn pad_right(&self) -> usize {
        self.pad_right
    }

}

/// `block_size * ceil(len / block_size)`.
pub fn padded_len(len: usize, block_size: usize) -> usize {
    len.div_ceil(block_size) * block_size
}
