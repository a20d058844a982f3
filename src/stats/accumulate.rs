//! Host-side folding of per-block partial results.

use tracing::debug;

use super::StatsError;

/// Relative size of a negative variance that is treated as cancellation noise
/// and clamped, rather than rejected.
const CLAMP_TOLERANCE: f64 = 1e-9;

/// Global mean from per-block sums. Divides by the real record count, not the
/// padded length.
pub fn mean(partial_sums: &[f64], count: usize) -> Result<f64, StatsError> {
    if count == 0 {
        return Err(StatsError::NumericDomain(
            "mean of zero records".to_string(),
        ));
    }
    Ok(partial_sums.iter().sum::<f64>() / count as f64)
}

pub fn min(partials: &[f64]) -> Result<f64, StatsError> {
    partials
        .iter()
        .copied()
        .reduce(f64::min)
        .ok_or_else(|| StatsError::NumericDomain("min over zero blocks".to_string()))
}

pub fn max(partials: &[f64]) -> Result<f64, StatsError> {
    partials
        .iter()
        .copied()
        .reduce(f64::max)
        .ok_or_else(|| StatsError::NumericDomain("max over zero blocks".to_string()))
}

/// Population variance from per-block sums of squared deviations.
///
/// `pad_residual` is the total the pad slots added to the partials; it is
/// removed before dividing by the real record count. Small negative results
/// from floating-point cancellation clamp to zero. Anything else outside
/// `[0, inf)` is a domain error.
pub fn variance(
    partial_sq_devs: &[f64],
    pad_residual: f64,
    count: usize,
    mean: f64,
) -> Result<f64, StatsError> {
    if count == 0 {
        return Err(StatsError::NumericDomain(
            "variance of zero records".to_string(),
        ));
    }
    let variance = (partial_sq_devs.iter().sum::<f64>() - pad_residual) / count as f64;
    if !variance.is_finite() {
        return Err(StatsError::NumericDomain(format!(
            "variance is not finite: {}",
            variance
        )));
    }
    if variance < 0.0 {
        let scale = (mean * mean).max(1.0);
        if variance < -CLAMP_TOLERANCE * scale {
            return Err(StatsError::NumericDomain(format!(
                "negative variance {}",
                variance
            )));
        }
        debug!(variance, "clamping negative variance to zero");
        return Ok(0.0);
    }
    Ok(variance)
}
