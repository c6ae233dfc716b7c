//! Run accounting: live counters shared across pipeline threads, and the
//! serializable summary returned to the caller.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters updated by the driver, the worker pool, and the writer.
///
/// All counters are monotonic and relaxed; they feed logs and the final
/// [`RunSummary`], never control flow.
#[derive(Debug, Default)]
pub struct RunMetrics {
    rows_submitted: AtomicU64,
    rows_written: AtomicU64,
    rows_failed: AtomicU64,
    retries: AtomicU64,
    checkpoints_saved: AtomicU64,
    checkpoint_failures: AtomicU64,
}

impl RunMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.rows_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self) {
        self.rows_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.rows_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_checkpoint(&self) {
        self.checkpoints_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_checkpoint_failure(&self) {
        self.checkpoint_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn checkpoints_saved(&self) -> u64 {
        self.checkpoints_saved.load(Ordering::Relaxed)
    }

    /// Snapshot the counters into a summary for the finished run.
    #[must_use]
    pub fn snapshot(&self, elapsed: Duration, output_path: PathBuf) -> RunSummary {
        RunSummary {
            rows_submitted: self.rows_submitted.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            rows_failed: self.rows_failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            checkpoints_saved: self.checkpoints_saved.load(Ordering::Relaxed),
            checkpoint_failures: self.checkpoint_failures.load(Ordering::Relaxed),
            elapsed_ms: elapsed.as_millis() as u64,
            output_path,
        }
    }
}

/// Final statistics for a completed run, returned by [`crate::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub rows_submitted: u64,
    pub rows_written: u64,
    /// Rows whose extra columns carry the error placeholder.
    pub rows_failed: u64,
    pub retries: u64,
    pub checkpoints_saved: u64,
    pub checkpoint_failures: u64,
    pub elapsed_ms: u64,
    pub output_path: PathBuf,
}

impl RunSummary {
    /// Print the summary to stdout as pretty JSON.
    pub fn print(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("failed to render run summary: {e}"),
        }
    }

    /// Save the summary to a JSON file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("serialize run summary")?;
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}
