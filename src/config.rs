//! TOML configuration for blockstats.
//!
//! Every section is optional; missing keys fall back to compiled-in defaults.
//! Command-line flags override whatever is loaded here.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::accel::manager::{BackendPreference, DEFAULT_SCALAR_THRESHOLD};
use crate::stats::MergeStrategy;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "BLOCKSTATS_CONFIG";

/// Config file picked up from the working directory.
pub const LOCAL_CONFIG: &str = "blockstats.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default)]
    pub compute: ComputeConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StatsConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded blockstats configuration");
        Ok(config)
    }

    /// Try, in order: the file named by `BLOCKSTATS_CONFIG`, `./blockstats.toml`,
    /// then compiled-in defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "BLOCKSTATS_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Compute
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeConfig {
    /// `auto`, `scalar` or `parallel`.
    pub backend: BackendPreference,
    /// Block size; the selected backend's preferred size when unset.
    pub block_size: Option<usize>,
    /// Cross-check non-scalar backends against the scalar reference.
    pub verify: bool,
    /// Payloads smaller than this run on the scalar backend under `auto`.
    pub scalar_threshold: usize,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::Auto,
            block_size: None,
            verify: cfg!(debug_assertions),
            scalar_threshold: DEFAULT_SCALAR_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// `heap` or `linear`.
    pub strategy: MergeStrategy,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Emit JSON log lines instead of the human format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
