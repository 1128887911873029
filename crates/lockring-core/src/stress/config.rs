//! Stress driver configuration.
//!
//! Loaded from JSON. Every field is optional; missing fields take the
//! values from [`StressConfig::default`].
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound on worker threads. Beyond this the run measures scheduler
/// noise rather than lock contention.
pub const MAX_WORKERS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StressConfig {
    /// Number of worker threads hammering the list.
    pub workers: usize,
    /// Operations each worker performs.
    pub ops_per_worker: usize,
    /// Elements pushed before the workers start.
    pub prefill: usize,
    /// A worker reports progress (and checks for cancellation) every this
    /// many operations.
    pub progress_interval: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().clamp(2, MAX_WORKERS),
            ops_per_worker: 10_000,
            prefill: 64,
            progress_interval: 1_000,
        }
    }
}

impl StressConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(ConfigError::Invalid(format!(
                "workers must be between 1 and {MAX_WORKERS}, got {}",
                self.workers
            )));
        }
        if self.ops_per_worker == 0 {
            return Err(ConfigError::Invalid(
                "ops_per_worker must be at least 1".to_string(),
            ));
        }
        if self.progress_interval == 0 {
            return Err(ConfigError::Invalid(
                "progress_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
