use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::cpu::ScalarBackend;
use super::parallel::ParallelBackend;
use super::{BackendError, BackendKind, ComputeBackend, ReduceKind};

/// Payloads below this many values stay on the scalar backend; dispatch
/// overhead dominates for them.
pub const DEFAULT_SCALAR_THRESHOLD: usize = 4096;

/// Tolerance for summed partials, relative to the summed magnitude of the
/// block's terms. Summation order may differ between backends, and
/// cancellation makes the error independent of the partial itself.
const SUM_TOLERANCE: f64 = 1e-9;

/// Which backend the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// Pick by payload size.
    #[default]
    Auto,
    Scalar,
    Parallel,
}

/// One enumerated compute device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub kind: BackendKind,
    pub compute_units: usize,
    pub preferred_block_size: usize,
}

/// Manager to handle backend enumeration, selection and verified dispatch.
pub struct BackendManager {
    scalar: ScalarBackend,
    parallel: Option<ParallelBackend>,
    scalar_threshold: usize,
    verify: bool,
}

impl BackendManager {
    pub fn new() -> Self {
        Self::with_backends(Some(ParallelBackend::new()))
    }

    /// Manager that only knows the scalar reference.
    pub fn scalar_only() -> Self {
        Self::with_backends(None)
    }

    pub fn with_backends(parallel: Option<ParallelBackend>) -> Self {
        let manager = Self {
            scalar: ScalarBackend::new(),
            parallel,
            scalar_threshold: DEFAULT_SCALAR_THRESHOLD,
            verify: cfg!(debug_assertions),
        };
        info!(
            parallel = manager.parallel.is_some(),
            workers = manager.parallel.map(|p| p.compute_units()).unwrap_or(1),
            "BackendManager initialized"
        );
        manager
    }

    pub fn with_scalar_threshold(mut self, threshold: usize) -> Self {
        self.scalar_threshold = threshold;
        self
    }

    /// Cross-check every non-scalar dispatch against the scalar reference.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Enumerate available devices, scalar reference first.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        let mut devices = vec![DeviceInfo {
            index: 0,
            name: "Scalar CPU reference".to_string(),
            kind: BackendKind::Scalar,
            compute_units: 1,
            preferred_block_size: self.scalar.preferred_block_size(),
        }];
        if let Some(parallel) = &self.parallel {
            devices.push(DeviceInfo {
                index: devices.len(),
                name: "Parallel CPU (rayon)".to_string(),
                kind: BackendKind::Parallel,
                compute_units: parallel.compute_units(),
                preferred_block_size: parallel.preferred_block_size(),
            });
        }
        devices
    }

    /// Preference that pins dispatch to the device listed at `index`.
    pub fn device_preference(&self, index: usize) -> Result<BackendPreference, BackendError> {
        let devices = self.devices();
        let device = devices.get(index).ok_or(BackendError::UnknownDevice {
            index,
            count: devices.len(),
        })?;
        Ok(match device.kind {
            BackendKind::Scalar => BackendPreference::Scalar,
            BackendKind::Parallel => BackendPreference::Parallel,
        })
    }

    /// Select the backend for a preference and payload size.
    pub fn select(
        &self,
        preference: BackendPreference,
        payload_len: usize,
    ) -> Result<BackendKind, BackendError> {
        match preference {
            BackendPreference::Scalar => Ok(BackendKind::Scalar),
            BackendPreference::Parallel => match self.parallel {
                Some(_) => Ok(BackendKind::Parallel),
                None => Err(BackendError::Unavailable {
                    backend: BackendKind::Parallel,
                }),
            },
            BackendPreference::Auto => {
                if payload_len < self.scalar_threshold || self.parallel.is_none() {
                    Ok(BackendKind::Scalar)
                } else {
                    Ok(BackendKind::Parallel)
                }
            }
        }
    }

    /// Resolve a preference to a dispatchable backend.
    pub fn backend(
        &self,
        preference: BackendPreference,
        payload_len: usize,
    ) -> Result<ManagedBackend<'_>, BackendError> {
        let kind = self.select(preference, payload_len)?;
        let inner: &dyn ComputeBackend = match (kind, &self.parallel) {
            (BackendKind::Parallel, Some(parallel)) => parallel,
            (BackendKind::Parallel, None) => {
                return Err(BackendError::Unavailable { backend: kind });
            }
            (BackendKind::Scalar, _) => &self.scalar,
        };
        debug!(backend = %kind, payload_len, verify = self.verify, "selected backend");
        let reference = (self.verify && kind != BackendKind::Scalar).then_some(&self.scalar);
        Ok(ManagedBackend { inner, reference })
    }
}

impl Default for BackendManager {
    fn default() -> Self {
        Self::new()
    }
}

/// A selected backend, optionally shadowed by the scalar reference.
pub struct ManagedBackend<'a> {
    inner: &'a dyn ComputeBackend,
    reference: Option<&'a ScalarBackend>,
}

impl ManagedBackend<'_> {
    fn mismatch(&self, op: &'static str, detail: String) -> BackendError {
        warn!(
            backend = %self.inner.kind(),
            op,
            %detail,
            "Acceleration mismatch against scalar reference"
        );
        BackendError::VerificationMismatch {
            op,
            backend: self.inner.kind(),
            detail,
        }
    }
}

impl ComputeBackend for ManagedBackend<'_> {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    fn preferred_block_size(&self) -> usize {
        self.inner.preferred_block_size()
    }

    fn reduce(
        &self,
        kind: ReduceKind,
        block_size: usize,
        data: &[f32],
    ) -> Result<Vec<f64>, BackendError> {
        let partials = self.inner.reduce(kind, block_size, data)?;
        if let Some(reference) = self.reference {
            let expected = reference.reduce(kind, block_size, data)?;
            if partials.len() != expected.len() {
                return Err(self.mismatch(
                    kind.name(),
                    format!("{} partials, expected {}", partials.len(), expected.len()),
                ));
            }
            let bad = data
                .chunks_exact(block_size)
                .zip(partials.iter().zip(&expected))
                .position(|(block, (&got, &want))| match kind {
                    ReduceKind::Min | ReduceKind::Max => got != want,
                    // Non-negative terms: the partial is their magnitude.
                    ReduceKind::SquaredDeviation { .. } => {
                        (got - want).abs() > SUM_TOLERANCE * want.abs().max(1.0)
                    }
                    ReduceKind::Sum => {
                        let magnitude: f64 = block.iter().map(|&x| (x as f64).abs()).sum();
                        (got - want).abs() > SUM_TOLERANCE * magnitude.max(1.0)
                    }
                });
            if let Some(block) = bad {
                return Err(self.mismatch(
                    kind.name(),
                    format!(
                        "block {}: got {}, expected {}",
                        block, partials[block], expected[block]
                    ),
                ));
            }
            debug!(op = kind.name(), backend = %self.kind(), "verification passed");
        }
        Ok(partials)
    }

    fn sort_blocks(&self, block_size: usize, data: &[f32]) -> Result<Vec<f32>, BackendError> {
        let sorted = self.inner.sort_blocks(block_size, data)?;
        if let Some(reference) = self.reference {
            let expected = reference.sort_blocks(block_size, data)?;
            if let Some(i) = sorted.iter().zip(&expected).position(|(a, b)| a != b) {
                return Err(self.mismatch(
                    "sort_blocks",
                    format!("index {}: got {}, expected {}", i, sorted[i], expected[i]),
                ));
            }
            debug!(op = "sort_blocks", backend = %self.kind(), "verification passed");
        }
        Ok(sorted)
    }
}
