//! Median and quartiles from a globally ordered sequence.

use serde::{Deserialize, Serialize};

use super::StatsError;

/// Records needed before quartiles are defined.
pub const MIN_RECORDS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

/// Value at rank `index` under the even/odd rule: for an even-length sequence
/// average elements `index - 1` and `index`, for an odd length take `index`.
fn at_rank(ordered: &[f32], index: usize) -> f64 {
    if ordered.len() % 2 == 0 {
        (ordered[index - 1] as f64 + ordered[index] as f64) / 2.0
    } else {
        ordered[index] as f64
    }
}

/// Median of an ascending sequence.
pub fn median(ordered: &[f32]) -> Result<f64, StatsError> {
    if ordered.is_empty() {
        return Err(StatsError::InsufficientData { needed: 1, have: 0 });
    }
    Ok(at_rank(ordered, ordered.len() / 2))
}

/// First quartile, median and third quartile of an ascending sequence, at
/// ranks `N/4`, `N/2` and `3N/4`.
pub fn quartiles(ordered: &[f32]) -> Result<Quartiles, StatsError> {
    let n = ordered.len();
    if n < MIN_RECORDS {
        return Err(StatsError::InsufficientData {
            needed: MIN_RECORDS,
            have: n,
        });
    }
    Ok(Quartiles {
        q1: at_rank(ordered, n / 4),
        median: median(ordered)?,
        q3: at_rank(ordered, 3 * n / 4),
    })
}
