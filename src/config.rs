//! Configuration for the parallel group-by path
//!
//! Settings can be built in code through [`ParallelConfigBuilder`] or loaded
//! from a TOML or YAML document. [`ParallelConfig::load_default`] looks for
//! `colagg/config.toml` under the platform configuration directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Worker count used when the host does not report its parallelism
pub const FALLBACK_WORKERS: usize = 4;

/// Configuration for worker-pool execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Number of worker threads in the pool
    pub workers: usize,
    /// Upper bound on chunks in flight at once (effective batch is `min(batch_cap, workers)`)
    pub batch_cap: usize,
    /// Pipelining depth used when sizing chunks
    pub chunks_per_worker: usize,
    /// Lower bound on rows per chunk
    pub min_chunk_rows: usize,
    /// Hard timeout for a single chunk task, in seconds
    pub task_timeout_secs: u64,
    /// Pause between batches, in milliseconds
    pub batch_pause_ms: u64,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        let workers = match num_cpus::get() {
            0 => FALLBACK_WORKERS,
            n => n,
        };

        ParallelConfig {
            workers,
            batch_cap: 4,
            chunks_per_worker: 2,
            min_chunk_rows: 100_000,
            task_timeout_secs: 300,
            batch_pause_ms: 0,
        }
    }
}

impl ParallelConfig {
    /// Creates a builder starting from the defaults
    pub fn builder() -> ParallelConfigBuilder {
        ParallelConfigBuilder::new()
    }

    /// Number of chunks dispatched per batch
    pub fn batch_size(&self) -> usize {
        self.batch_cap.min(self.workers).max(1)
    }

    /// Per-task timeout as a `Duration`
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    /// Pause between batches as a `Duration`
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    /// Rejects settings the planner and pool cannot work with
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("workers", self.workers as u64),
            ("batch_cap", self.batch_cap as u64),
            ("chunks_per_worker", self.chunks_per_worker as u64),
            ("min_chunk_rows", self.min_chunk_rows as u64),
            ("task_timeout_secs", self.task_timeout_secs),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(Error::Config(format!("{} must be at least 1", name)));
            }
        }
        Ok(())
    }

    /// Parses and validates a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: ParallelConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a YAML document
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let config: ParallelConfig = serde_yaml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file, choosing the format by extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            other => Err(Error::Config(format!(
                "unsupported configuration format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    /// Default location of the user configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("colagg").join("config.toml"))
    }

    /// Loads the user configuration if it exists, otherwise the defaults
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => {
                log::debug!("loading parallel config from {}", path.display());
                Self::from_path(path)
            }
            _ => Ok(Self::default()),
        }
    }
}

/// Builder for ParallelConfig
pub struct ParallelConfigBuilder {
    config: ParallelConfig,
}

impl ParallelConfigBuilder {
    /// Creates a new builder
    pub fn new() -> Self {
        ParallelConfigBuilder {
            config: ParallelConfig::default(),
        }
    }

    /// Sets the worker count
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Sets the batch cap
    pub fn batch_cap(mut self, cap: usize) -> Self {
        self.config.batch_cap = cap;
        self
    }

    /// Sets the pipelining depth
    pub fn chunks_per_worker(mut self, chunks: usize) -> Self {
        self.config.chunks_per_worker = chunks;
        self
    }

    /// Sets the minimum chunk size
    pub fn min_chunk_rows(mut self, rows: usize) -> Self {
        self.config.min_chunk_rows = rows;
        self
    }

    /// Sets the per-task timeout
    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.config.task_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Sets the pause between batches
    pub fn batch_pause(mut self, pause: Duration) -> Self {
        self.config.batch_pause_ms = pause.as_millis() as u64;
        self
    }

    /// Builds and validates the config
    pub fn build(self) -> Result<ParallelConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ParallelConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
