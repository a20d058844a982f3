//! Per-block kernels shared by the backends.
//!
//! A kernel touches exactly one block. The scalar backend uses the sequential
//! folds as its reference; the parallel backend uses the work-group style tree
//! reduction and the bitonic network.

use std::cmp::Ordering;

use super::ReduceKind;

/// Value a block element contributes before combining.
#[inline]
fn load(kind: ReduceKind, x: f32) -> f64 {
    match kind {
        ReduceKind::SquaredDeviation { mean } => {
            let d = x as f64 - mean;
            d * d
        }
        _ => x as f64,
    }
}

/// Identity element of the combining operator.
#[inline]
fn identity(kind: ReduceKind) -> f64 {
    match kind {
        ReduceKind::Sum | ReduceKind::SquaredDeviation { .. } => 0.0,
        ReduceKind::Min => f64::INFINITY,
        ReduceKind::Max => f64::NEG_INFINITY,
    }
}

/// Combining operator for two partials of the same kind.
#[inline]
pub fn combine(kind: ReduceKind, a: f64, b: f64) -> f64 {
    match kind {
        ReduceKind::Sum | ReduceKind::SquaredDeviation { .. } => a + b,
        ReduceKind::Min => a.min(b),
        ReduceKind::Max => a.max(b),
    }
}

/// Sequential left fold over one block.
pub fn fold_block(kind: ReduceKind, block: &[f32]) -> f64 {
    block
        .iter()
        .fold(identity(kind), |acc, &x| combine(kind, acc, load(kind, x)))
}

/// Tree reduction over one block, the way a work-group reduces through local
/// memory: load every element into `scratch`, then repeatedly fold the upper
/// half onto the lower half until one value is left.
///
/// Handles any block length; odd widths leave the middle element in place for
/// the next round.
pub fn tree_reduce_block(kind: ReduceKind, block: &[f32], scratch: &mut Vec<f64>) -> f64 {
    scratch.clear();
    scratch.extend(block.iter().map(|&x| load(kind, x)));

    let mut width = scratch.len();
    if width == 0 {
        return identity(kind);
    }
    while width > 1 {
        let stride = width.div_ceil(2);
        for i in 0..width - stride {
            scratch[i] = combine(kind, scratch[i], scratch[i + stride]);
        }
        width = stride;
    }
    scratch[0]
}

/// Comparison-sort one block under IEEE total ordering (stable).
pub fn sort_block(block: &mut [f32]) {
    block.sort_by(f32::total_cmp);
}

/// In-place bitonic sorting network. `block.len()` must be a power of two.
///
/// Each `(k, j)` round is one barrier-separated step of the network; within a
/// round every compare-exchange touches a disjoint pair, which is what lets a
/// work-group run the round with one lane per pair.
pub fn bitonic_sort(block: &mut [f32]) {
    let n = block.len();
    debug_assert!(n.is_power_of_two() || n == 0);
    if n < 2 {
        return;
    }

    let mut k = 2;
    while k <= n {
        let mut j = k / 2;
        while j > 0 {
            for i in 0..n {
                let partner = i ^ j;
                if partner > i {
                    let ascending = i & k == 0;
                    let ord = block[i].total_cmp(&block[partner]);
                    let out_of_order = if ascending {
                        ord == Ordering::Greater
                    } else {
                        ord == Ordering::Less
                    };
                    if out_of_order {
                        block.swap(i, partner);
                    }
                }
            }
            j /= 2;
        }
        k *= 2;
    }
}
