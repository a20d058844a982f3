//! End-to-end pipeline tests against straightforward host-side statistics.

use blockstats::accel::cpu::ScalarBackend;
use blockstats::accel::manager::BackendPreference;
use blockstats::accel::parallel::ParallelBackend;
use blockstats::accel::{BackendKind, ComputeBackend, ReduceKind};
use blockstats::config::StatsConfig;
use blockstats::stats::merge::{merge_heap, merge_linear, strip_sentinels};
use blockstats::stats::{MergeStrategy, PadPolicy, PaddedDataset, Pipeline, Stage, StatsError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_values(seed: u64, n: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-40.0f32..45.0)).collect()
}

fn host_sorted(values: &[f32]) -> Vec<f32> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    sorted
}

#[test]
fn test_neutral_sum_matches_unpadded_sum() {
    let values = random_values(1, 1001);
    let expected: f64 = values.iter().map(|&v| v as f64).sum();
    let backend = ScalarBackend::new();
    for block_size in [1, 7, 64, 256, 2048] {
        let padded = PaddedDataset::new(&values, block_size, PadPolicy::Neutral(0.0)).unwrap();
        let partials = backend.reduce(ReduceKind::Sum, block_size, padded.values()).unwrap();
        let total: f64 = partials.iter().sum();
        assert!((total - expected).abs() < 1e-6, "block size {}", block_size);
    }
}

#[test]
fn test_identity_padded_extrema_match_unpadded() {
    let values = random_values(2, 333);
    let backend = ParallelBackend::new();
    let min = values.iter().copied().fold(f32::INFINITY, f32::min) as f64;
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
    for block_size in [4, 100, 512] {
        for (kind, expected) in [(ReduceKind::Min, min), (ReduceKind::Max, max)] {
            let padded =
                PaddedDataset::new(&values, block_size, PadPolicy::Neutral(kind.neutral_pad()))
                    .unwrap();
            let partials = backend.reduce(kind, block_size, padded.values()).unwrap();
            let folded = match kind {
                ReduceKind::Min => partials.iter().copied().fold(f64::INFINITY, f64::min),
                _ => partials.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            };
            assert_eq!(folded, expected);
        }
    }
}

#[test]
fn test_merge_recovers_global_order_with_sentinels() {
    let values = random_values(3, 5);
    let padded = PaddedDataset::new(&values, 4, PadPolicy::SymmetricExtremal).unwrap();
    assert_eq!(padded.len(), 8);
    let pad = padded.pad_left() + padded.pad_right();
    assert_eq!(pad, 3);

    let sorted = ParallelBackend::new().sort_blocks(4, padded.values()).unwrap();
    let merged = merge_linear(&sorted, 4).unwrap();
    let stripped = strip_sentinels(merged, padded.pad_left(), padded.pad_right()).unwrap();
    assert_eq!(stripped.len(), 5);
    assert_eq!(stripped, host_sorted(&values));
}

#[test]
fn test_merge_prefix_property_large() {
    let values = random_values(4, 4000);
    let padded = PaddedDataset::new(&values, 64, PadPolicy::SymmetricExtremal).unwrap();
    let sorted = ScalarBackend::new().sort_blocks(64, padded.values()).unwrap();
    let merged = merge_heap(&sorted, 64).unwrap();
    let stripped = strip_sentinels(merged, padded.pad_left(), padded.pad_right()).unwrap();
    let expected = host_sorted(&values);
    for k in [0, 1, 17, 1000, 3999, 4000] {
        assert_eq!(&stripped[..k], &expected[..k]);
    }
}

#[test]
fn test_full_run_matches_host_statistics() {
    let values = random_values(5, 10_000);
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let sorted = host_sorted(&values);

    let backend = ParallelBackend::new();
    let report = Pipeline::new(&backend, 256, values).run().unwrap();

    assert_eq!(report.record_count, 10_000);
    assert_eq!(report.min, sorted[0]);
    assert_eq!(report.max, sorted[sorted.len() - 1]);
    assert!((report.mean - mean).abs() < 1e-6);
    assert!((report.std_dev - variance.sqrt()).abs() < 1e-4);
    let median = (sorted[4999] as f64 + sorted[5000] as f64) / 2.0;
    assert_eq!(report.quartiles.median, median);
    let q1 = (sorted[2499] as f64 + sorted[2500] as f64) / 2.0;
    assert_eq!(report.quartiles.q1, q1);
}

#[test]
fn test_variance_with_large_offset_matches_host() {
    let mut rng = StdRng::seed_from_u64(8);
    let values: Vec<f32> = (0..999)
        .map(|_| 2_000_000.0 + rng.gen_range(0i32..16) as f32)
        .collect();
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;

    let backend = ParallelBackend::new();
    for block_size in [64, 100] {
        let report = Pipeline::new(&backend, block_size, values.clone()).run().unwrap();
        assert_eq!(report.mean, mean);
        assert!(
            (report.variance - variance).abs() < 1e-9 * variance,
            "block size {}: {} vs {}",
            block_size,
            report.variance,
            variance
        );
    }
}

#[test]
fn test_scalar_and_parallel_runs_agree_on_odd_block_size() {
    let values = random_values(6, 777);
    let scalar = ScalarBackend::new();
    let parallel = ParallelBackend::new();
    let a = Pipeline::new(&scalar, 30, values.clone())
        .with_merge_strategy(MergeStrategy::Linear)
        .run()
        .unwrap();
    let b = Pipeline::new(&parallel, 30, values).run().unwrap();
    assert_eq!(a.quartiles, b.quartiles);
    assert_eq!((a.min, a.max), (b.min, b.max));
    assert!((a.std_dev - b.std_dev).abs() < 1e-6);
}

#[test]
fn test_single_record_moments_without_quartiles() {
    let backend = ScalarBackend::new();
    let mut pipeline = Pipeline::new(&backend, 16, vec![12.5]);
    assert_eq!(pipeline.advance().unwrap(), Stage::MeanComputed);
    assert_eq!(pipeline.advance().unwrap(), Stage::VarianceComputed);
    let moments = pipeline.moments().unwrap();
    assert_eq!((moments.min, moments.max, moments.mean), (12.5, 12.5, 12.5));
    assert_eq!(moments.std_dev(), Some(0.0));

    let err = loop {
        match pipeline.advance() {
            Ok(_) => continue,
            Err(e) => break e,
        }
    };
    assert_eq!(err, StatsError::InsufficientData { needed: 4, have: 1 });
    assert_eq!(pipeline.stage(), Stage::Failed);
}

#[test]
fn test_analyze_with_config() {
    let mut config = StatsConfig::default();
    config.compute.backend = BackendPreference::Parallel;
    config.compute.block_size = Some(8);
    config.compute.verify = true;
    config.merge.strategy = MergeStrategy::Linear;

    let manager = blockstats::backend_manager(&config);
    let report = blockstats::analyze(vec![5.0, 1.0, 9.0, 3.0], &config, &manager).unwrap();
    assert_eq!(report.backend, BackendKind::Parallel);
    assert_eq!(report.block_size, 8);
    assert_eq!(report.mean, 4.5);
    assert_eq!(report.quartiles.median, 4.0);
    assert_eq!(report.timings.len(), 6);
    assert_eq!(report.timings.last().map(|t| t.stage), Some(Stage::Done));
}

#[test]
fn test_analyze_auto_uses_preferred_block_size() {
    let config = StatsConfig::default();
    let manager = blockstats::backend_manager(&config);
    let report = blockstats::analyze(random_values(7, 100), &config, &manager).unwrap();
    assert_eq!(report.backend, BackendKind::Scalar);
    assert_eq!(report.block_size, ScalarBackend::new().preferred_block_size());
}

#[test]
fn test_verified_parallel_run_with_cancelling_values() {
    let mut config = StatsConfig::default();
    config.compute.backend = BackendPreference::Parallel;
    config.compute.block_size = Some(4);
    config.compute.verify = true;

    let manager = blockstats::backend_manager(&config);
    let values = vec![1.0e30, 1.0, -1.0e30, 1.0];
    let report = blockstats::analyze(values, &config, &manager).unwrap();
    assert_eq!(report.record_count, 4);
    assert_eq!(report.min, -1.0e30);
    assert_eq!(report.max, 1.0e30);
    assert_eq!(report.quartiles.median, 1.0);
}
