//! Error types for the bulkline pipeline.
//!
//! Fatal errors unwind synchronously out of [`crate::run`]; per-row and
//! checkpoint failures are absorbed where they happen and surface only in
//! logs and the run summary.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving or reading the input table.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The named table does not exist at the input location.
    #[error("table '{table}' not found in {}", .location.display())]
    TableNotFound { table: String, location: PathBuf },

    /// The input exists but cannot be parsed as a table.
    #[error("malformed input in {}: {message}", .location.display())]
    Malformed { location: PathBuf, message: String },

    /// The input location cannot be read.
    #[error("failed to read {}", .location.display())]
    Io {
        location: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while loading a [`crate::JobConfig`] from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level pipeline errors returned by [`crate::run`].
///
/// Anything not represented here is by definition non-fatal: row-processor
/// failures become placeholder cells, and intermediate checkpoint failures
/// are logged and retried on the next batch boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input could not be opened or decoded.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The output location could not be prepared.
    #[error("failed to prepare output location {}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The definitive final artifact could not be written. Unlike
    /// intermediate checkpoints, this write is load-bearing.
    #[error("failed to write final output {}: {cause:#}", .path.display())]
    FinalWrite { path: PathBuf, cause: anyhow::Error },

    /// The writer thread died without completing its drain.
    #[error("writer thread failed: {message}")]
    Writer { message: String },

    /// The run was cancelled before the input was fully submitted. Rows
    /// already enqueued were drained; checkpointed output remains on disk.
    #[error("pipeline interrupted before the input was fully submitted")]
    Interrupted,
}
