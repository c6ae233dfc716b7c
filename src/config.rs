//! Job configuration: recognized options, floors, and file/env loading.
//!
//! A [`JobConfig`] can be built in code with the `with_*` helpers, or loaded
//! from a JSON document with [`JobConfig::from_file`]. Environment variables
//! of the form `BULKLINE_<FIELD>` (e.g. `BULKLINE_THREAD_COUNT`) override
//! file values, so deployments can retarget a job without editing it.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest accepted write-queue capacity. Submission backpressure degrades
/// into lockstep below this.
pub const QUEUE_CAPACITY_FLOOR: usize = 10;

/// Default number of output rows accumulated between checkpoints.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

fn default_thread_count() -> usize {
    num_cpus::get().max(1)
}

fn default_queue_capacity() -> usize {
    100
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_shutdown_timeout_secs() -> u64 {
    600
}

/// Configuration for one bulk enrichment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Table file, or directory containing `<input_table>.csv`.
    pub input_location: PathBuf,
    /// Name of the input table (file stem, matched case-insensitively).
    pub input_table: String,
    /// Output file path, or directory to create `<output_table>.csv` in.
    pub output_location: PathBuf,
    /// Name of the output table.
    pub output_table: String,
    /// Extra output columns contributed by the row processor, in the order
    /// they are appended after the input headers.
    #[serde(default)]
    pub extra_columns: Vec<String>,
    /// Number of worker threads processing rows. Clamped to at least 1.
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,
    /// Capacity of the ordered write queue. Clamped to at least
    /// [`QUEUE_CAPACITY_FLOOR`].
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Output rows accumulated before each flush + checkpoint.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Additional attempts per row before its failure is recorded.
    #[serde(default)]
    pub retry_limit: usize,
    /// How long worker-pool shutdown waits for in-flight rows.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl JobConfig {
    /// Create a config with default tuning for the given input and output
    /// tables.
    pub fn new(
        input_location: impl Into<PathBuf>,
        input_table: impl Into<String>,
        output_location: impl Into<PathBuf>,
        output_table: impl Into<String>,
    ) -> Self {
        Self {
            input_location: input_location.into(),
            input_table: input_table.into(),
            output_location: output_location.into(),
            output_table: output_table.into(),
            extra_columns: Vec::new(),
            thread_count: default_thread_count(),
            queue_capacity: default_queue_capacity(),
            batch_size: default_batch_size(),
            retry_limit: 0,
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }

    pub fn with_extra_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.thread_count = threads;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_retry_limit(mut self, retries: usize) -> Self {
        self.retry_limit = retries;
        self
    }

    /// Load a config from a JSON file, then apply `BULKLINE_*` environment
    /// overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Apply `BULKLINE_*` environment variable overrides in place.
    ///
    /// String fields are replaced verbatim; numeric fields that fail to parse
    /// are left unchanged with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("BULKLINE_INPUT_LOCATION") {
            self.input_location = v.into();
        }
        if let Ok(v) = env::var("BULKLINE_INPUT_TABLE") {
            self.input_table = v;
        }
        if let Ok(v) = env::var("BULKLINE_OUTPUT_LOCATION") {
            self.output_location = v.into();
        }
        if let Ok(v) = env::var("BULKLINE_OUTPUT_TABLE") {
            self.output_table = v;
        }
        override_usize("BULKLINE_THREAD_COUNT", &mut self.thread_count);
        override_usize("BULKLINE_QUEUE_CAPACITY", &mut self.queue_capacity);
        override_usize("BULKLINE_BATCH_SIZE", &mut self.batch_size);
        override_usize("BULKLINE_RETRY_LIMIT", &mut self.retry_limit);
        if let Ok(v) = env::var("BULKLINE_SHUTDOWN_TIMEOUT_SECS") {
            match v.parse() {
                Ok(secs) => self.shutdown_timeout_secs = secs,
                Err(_) => tracing::warn!(value = %v, "ignoring unparseable BULKLINE_SHUTDOWN_TIMEOUT_SECS"),
            }
        }
    }

    /// Copy of this config with all floors applied.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut cfg = self.clone();
        cfg.thread_count = cfg.thread_count.max(1);
        cfg.queue_capacity = cfg.queue_capacity.max(QUEUE_CAPACITY_FLOOR);
        cfg.batch_size = cfg.batch_size.max(1);
        cfg
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Concrete path of the output artifact.
    ///
    /// A location with an extension is used as-is; anything else is treated
    /// as a directory holding `<output_table>.csv`. Checkpoints use a sibling
    /// of this path.
    #[must_use]
    pub fn resolved_output_path(&self) -> PathBuf {
        if self.output_location.extension().is_some() {
            self.output_location.clone()
        } else {
            self.output_location
                .join(format!("{}.csv", self.output_table))
        }
    }
}

fn override_usize(key: &str, slot: &mut usize) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(n) => *slot = n,
            Err(_) => tracing::warn!(%key, value = %v, "ignoring unparseable environment override"),
        }
    }
}
