//! The single ordered writer.
//!
//! Exactly one writer thread drains the write queue in submission order,
//! resolves each row's pending result (blocking until that specific row
//! completes, even when later rows already have), batches output rows, and
//! checkpoints the table at batch boundaries. In-order resolution trades
//! some writer idle time for strict output ordering without a sort buffer; a
//! stuck row processor therefore stalls the writer, which is an accepted
//! tradeoff.
//!
//! Failure policy: a row whose result cannot be resolved gets the
//! [`ERROR_PLACEHOLDER`] in every extra column and the run continues. A
//! failed intermediate checkpoint is logged and the next one proceeds
//! normally. Only the final artifact write is fatal.

use crate::error::PipelineError;
use crate::metrics::RunMetrics;
use crate::queue::{QueueConsumer, QueueItem, WorkItem};
use crate::table::Table;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Value substituted into every extra column of a row whose processing
/// failed or was abandoned.
pub const ERROR_PLACEHOLDER: &str = "error";

/// Writer lifecycle. The header transition happens on the first real item;
/// a sentinel arriving first still produces a header-only output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    AwaitingHeader,
    Accumulating,
    Draining,
    Terminal,
}

pub struct TableWriter {
    input_headers: Arc<Vec<String>>,
    extra_columns: Vec<String>,
    batch_size: usize,
    output_path: PathBuf,
    metrics: Arc<RunMetrics>,
    state: WriterState,
    table: Table,
    batch: Vec<WorkItem>,
}

impl TableWriter {
    /// Start the writer on its own thread, consuming `queue` until the
    /// sentinel arrives. Must be running before submission begins so the
    /// queue drains from the start.
    pub fn spawn(
        input_headers: Arc<Vec<String>>,
        extra_columns: Vec<String>,
        batch_size: usize,
        output_path: PathBuf,
        queue: QueueConsumer,
        metrics: Arc<RunMetrics>,
    ) -> WriterHandle {
        let writer = Self {
            input_headers,
            extra_columns,
            batch_size: batch_size.max(1),
            output_path,
            metrics,
            state: WriterState::AwaitingHeader,
            table: Table::new(),
            batch: Vec::new(),
        };
        let handle = thread::Builder::new()
            .name("bulkline-writer".to_string())
            .spawn(move || writer.run(&queue))
            .expect("spawn writer thread");
        WriterHandle { handle }
    }

    fn run(mut self, queue: &QueueConsumer) -> Result<(), PipelineError> {
        loop {
            match queue.take() {
                QueueItem::Work(item) => self.accept(item),
                QueueItem::Done => return self.drain(),
            }
        }
    }

    fn accept(&mut self, item: WorkItem) {
        if self.state == WriterState::AwaitingHeader {
            self.write_header();
            self.state = WriterState::Accumulating;
        }
        self.batch.push(item);
        if self.batch.len() >= self.batch_size {
            self.flush_batch();
            self.save_checkpoint();
        }
    }

    /// Output header: input headers in original order, then the configured
    /// extra columns. Written exactly once per run. An input with no header
    /// and no extra columns produces an empty output table.
    fn write_header(&mut self) {
        let mut header = self.input_headers.as_ref().clone();
        header.extend(self.extra_columns.iter().cloned());
        if !header.is_empty() {
            self.table.push_row(header);
        }
    }

    /// Resolve and append every batched row, in order.
    fn flush_batch(&mut self) {
        for item in self.batch.drain(..) {
            let extra = match item.pending.wait() {
                Ok(columns) => Some(columns),
                Err(message) => {
                    self.metrics.record_failed();
                    tracing::warn!(index = item.index, error = %message, "row processing failed");
                    None
                }
            };
            let mut cells = item.row.cells().to_vec();
            for column in &self.extra_columns {
                cells.push(match &extra {
                    Some(map) => map.get(column).cloned().unwrap_or_default(),
                    None => ERROR_PLACEHOLDER.to_string(),
                });
            }
            self.table.push_row(cells);
            self.metrics.record_written();
        }
    }

    /// Snapshot the table so the output path can be opened mid-run.
    /// Non-fatal on failure; the next boundary tries again.
    fn save_checkpoint(&mut self) {
        match self.table.checkpoint(&self.output_path) {
            Ok(()) => {
                self.metrics.record_checkpoint();
                tracing::info!(path = %self.output_path.display(), rows = self.table.len(), "checkpoint saved");
            }
            Err(e) => {
                self.metrics.record_checkpoint_failure();
                tracing::error!(path = %self.output_path.display(), error = %format!("{e:#}"), "checkpoint failed");
            }
        }
    }

    /// Sentinel received: flush what remains and write the final artifact.
    fn drain(&mut self) -> Result<(), PipelineError> {
        if self.state == WriterState::AwaitingHeader {
            // Header-only input still produces a header-only output.
            self.write_header();
        }
        self.state = WriterState::Draining;
        if !self.batch.is_empty() {
            self.flush_batch();
            self.save_checkpoint();
        }
        self.table
            .write_csv(&self.output_path)
            .map_err(|cause| PipelineError::FinalWrite {
                path: self.output_path.clone(),
                cause,
            })?;
        self.state = WriterState::Terminal;
        tracing::debug!(rows = self.table.len(), "writer terminal");
        Ok(())
    }
}

/// Join handle for the writer thread.
pub struct WriterHandle {
    handle: JoinHandle<Result<(), PipelineError>>,
}

impl WriterHandle {
    /// Wait for the writer to reach its terminal state and surface its
    /// outcome. A panicked writer is reported as [`PipelineError::Writer`].
    pub fn join(self) -> Result<(), PipelineError> {
        match self.handle.join() {
            Ok(outcome) => outcome,
            Err(panic) => Err(PipelineError::Writer {
                message: panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "writer panicked".to_string()),
            }),
        }
    }
}
