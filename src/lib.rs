//! # Bulkline
//!
//! A **streaming bulk-row enrichment pipeline** for Rust. Bulkline reads a
//! large tabular input one row at a time, fans rows out to a bounded pool of
//! worker threads running a user-supplied row processor (typically a remote
//! lookup), and writes enriched rows back to an output table **in original
//! row order**, with backpressure and periodic crash-safe checkpoints.
//!
//! ## Key Features
//!
//! - **Streaming ingestion** - rows are read lazily, never the whole table
//! - **Bounded parallelism** - a fixed worker pool processes rows concurrently
//! - **Strict output ordering** - results land in row-index order no matter
//!   which worker finishes first
//! - **Backpressure** - a bounded write queue blocks submission when the
//!   writer falls behind, so memory stays bounded
//! - **Crash-safe checkpoints** - the output path always holds a complete,
//!   openable snapshot of progress so far
//! - **Per-row fault isolation** - a failing (or panicking) processor marks
//!   that row and the run continues
//!
//! ## Quick Start
//!
//! ```no_run
//! use bulkline::{ExtraColumns, JobConfig, Row, run};
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let cfg = JobConfig::new("data/accounts.csv", "accounts", "out", "accounts_enriched")
//!     .with_extra_columns(["status"])
//!     .with_threads(8)
//!     .with_queue_capacity(500);
//!
//! let summary = run(&cfg, |row: &Row, _index: usize| {
//!     let mut extra = ExtraColumns::new();
//!     let status = match row.get("email") {
//!         Some(e) if e.contains('@') => "OK",
//!         _ => "invalid",
//!     };
//!     extra.insert("status".to_string(), status.to_string());
//!     Ok(extra)
//! })?;
//!
//! summary.print();
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Rows and tables
//!
//! A [`Row`] is an ordered mapping from column header to cell value. The
//! first record of the input table is the header; every data row is aligned
//! to it (short rows are padded with empty strings). A table with no header
//! record yields no rows: no header, no data.
//!
//! ### The row processor
//!
//! The [`RowProcessor`] trait (implemented for free by closures) is the sole
//! collaborator the pipeline depends on: `(row, index) -> ExtraColumns`. Any
//! error or panic is captured per row; the affected row carries the
//! [`ERROR_PLACEHOLDER`] in each of its extra columns and the run continues.
//!
//! ### Ordering
//!
//! The driver submits rows in index order and enqueues each `(index, row,
//! pending result)` item on a strict-FIFO bounded queue. The single writer
//! resolves pending results in dequeue order, blocking on the head-of-line
//! row even when later rows already completed. That in-order resolution is
//! the whole ordering mechanism - no sort buffer, at the cost of some writer
//! idle time.
//!
//! ### Checkpoints
//!
//! Every `batch_size` output rows, the writer snapshots the entire output
//! table to a sibling temp file and atomically renames it over the output
//! path. The path is therefore always either the previous complete snapshot
//! or the new one. Intermediate checkpoint failures are logged and skipped;
//! only the final artifact write is fatal.
//!
//! ## Error Handling
//!
//! [`run`] returns [`RunSummary`] on success or a fatal [`PipelineError`]:
//! unreadable input, missing table, a failed final write, or a cancelled
//! run. Per-row and checkpoint failures never unwind the pipeline; they are
//! counted in the summary and logged via `tracing`.
//!
//! ## Module Overview
//!
//! - [`config`] - recognized options, floors, file/env loading
//! - [`source`] - streaming row source (CSV, and JSON with `io-json`)
//! - [`pool`] - fixed worker pool and pending results
//! - [`queue`] - bounded ordered write queue
//! - [`writer`] - the single ordered writer and its batching
//! - [`table`] - in-memory output table and durable persistence
//! - [`driver`] - run lifecycle, shutdown, cancellation
//! - [`metrics`] - run counters and the final summary
//! - [`testing`] - table helpers and stand-in processors for tests

pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod queue;
pub mod row;
pub mod source;
pub mod table;
pub mod testing;
pub mod writer;

// General re-exports
pub use config::{DEFAULT_BATCH_SIZE, JobConfig, QUEUE_CAPACITY_FLOOR};
pub use driver::{CancelToken, run, run_with_cancel};
pub use error::{ConfigError, PipelineError, SourceError};
pub use metrics::{RunMetrics, RunSummary};
pub use pool::{ExtraColumns, PendingResult, RowProcessor, WorkerPool};
pub use queue::{QueueConsumer, QueueItem, QueueProducer, WorkItem, write_queue};
pub use row::{Row, RowIndex};
pub use source::{RowStream, open_table};
pub use table::{Table, checkpoint_path};
pub use writer::{ERROR_PLACEHOLDER, TableWriter, WriterHandle};
