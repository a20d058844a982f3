//! K-way merge of block-sorted data into one global order.
//!
//! Both strategies consume the output of a block sort: `sorted.len()` is a
//! multiple of `block_size` and each block is ascending under IEEE total
//! ordering. They select the minimum unconsumed head on every step, breaking
//! ties by the lowest block index, so their outputs are identical.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use super::partition::{HIGH_SENTINEL, LOW_SENTINEL};
use super::StatsError;
use crate::accel::check_dispatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Scan every head each step. O(N * G); the reference.
    Linear,
    /// Min-heap of heads. O(N log G).
    #[default]
    Heap,
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeStrategy::Linear => f.write_str("linear"),
            MergeStrategy::Heap => f.write_str("heap"),
        }
    }
}

pub fn merge(
    strategy: MergeStrategy,
    sorted: &[f32],
    block_size: usize,
) -> Result<Vec<f32>, StatsError> {
    match strategy {
        MergeStrategy::Linear => merge_linear(sorted, block_size),
        MergeStrategy::Heap => merge_heap(sorted, block_size),
    }
}

fn check_layout(sorted: &[f32], block_size: usize) -> Result<(), StatsError> {
    if block_size == 0 {
        return Err(StatsError::InvalidBlockSize(block_size));
    }
    check_dispatch(block_size, sorted.len())?;
    Ok(())
}

/// Reference merge: one cursor per block, linear scan for the minimum head.
pub fn merge_linear(sorted: &[f32], block_size: usize) -> Result<Vec<f32>, StatsError> {
    check_layout(sorted, block_size)?;
    let groups = sorted.len() / block_size;
    let mut cursors = vec![0usize; groups];
    let mut out = Vec::with_capacity(sorted.len());

    for _ in 0..sorted.len() {
        let mut best: Option<(usize, f32)> = None;
        for (group, &cursor) in cursors.iter().enumerate() {
            if cursor == block_size {
                continue;
            }
            let head = sorted[group * block_size + cursor];
            match best {
                Some((_, min)) if head.total_cmp(&min) != Ordering::Less => {}
                _ => best = Some((group, head)),
            }
        }
        // Every step consumes one of the N' values, so a head always exists.
        let Some((group, head)) = best else { break };
        out.push(head);
        cursors[group] += 1;
    }

    debug_assert!(cursors.iter().all(|&c| c == block_size));
    Ok(out)
}

/// Head of one block, ordered so that `BinaryHeap` pops the smallest value
/// and, among equal values, the lowest block index.
struct Head {
    value: f32,
    group: usize,
}

impl Ord for Head {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .total_cmp(&self.value)
            .then_with(|| other.group.cmp(&self.group))
    }
}

impl PartialOrd for Head {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Head {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Head {}

/// Priority-queue merge.
pub fn merge_heap(sorted: &[f32], block_size: usize) -> Result<Vec<f32>, StatsError> {
    check_layout(sorted, block_size)?;
    let groups = sorted.len() / block_size;
    let mut cursors = vec![0usize; groups];
    let mut heap: BinaryHeap<Head> = (0..groups)
        .map(|group| Head {
            value: sorted[group * block_size],
            group,
        })
        .collect();
    let mut out = Vec::with_capacity(sorted.len());

    while let Some(Head { value, group }) = heap.pop() {
        out.push(value);
        cursors[group] += 1;
        let cursor = cursors[group];
        if cursor < block_size {
            heap.push(Head {
                value: sorted[group * block_size + cursor],
                group,
            });
        }
    }

    debug_assert_eq!(out.len(), sorted.len());
    Ok(out)
}

/// Drop the `pad_left` low sentinels at the front and the `pad_right` high
/// sentinels at the back of a merged order, checking that they are there.
pub fn strip_sentinels(
    mut ordered: Vec<f32>,
    pad_left: usize,
    pad_right: usize,
) -> Result<Vec<f32>, StatsError> {
    if pad_left + pad_right > ordered.len() {
        return Err(StatsError::NumericDomain(format!(
            "{} sentinels in a merged order of length {}",
            pad_left + pad_right,
            ordered.len()
        )));
    }
    let tail = ordered.len() - pad_right;
    if ordered[..pad_left].iter().any(|&v| v != LOW_SENTINEL)
        || ordered[tail..].iter().any(|&v| v != HIGH_SENTINEL)
    {
        return Err(StatsError::NumericDomain(
            "pad sentinels are not at the ends of the merged order".to_string(),
        ));
    }
    ordered.truncate(tail);
    ordered.drain(..pad_left);
    Ok(ordered)
}
