//! Pipeline driver: lifecycle and error-propagation glue.
//!
//! [`run`] wires row source → worker pool → ordered write queue → writer,
//! submitting rows in index order and blocking on the queue when the writer
//! falls behind. Fatal errors (unreadable input, missing table, final
//! artifact write failure) unwind synchronously to the caller; everything
//! per-row is absorbed downstream. Partial, checkpointed output stays on
//! disk as a recovery artifact in every failure mode.

use crate::config::JobConfig;
use crate::error::{PipelineError, SourceError};
use crate::metrics::{RunMetrics, RunSummary};
use crate::pool::{RowProcessor, WorkerPool};
use crate::queue::{PutError, WorkItem, write_queue};
use crate::source::open_table;
use crate::writer::TableWriter;
use std::fs::create_dir_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How often a producer blocked on a full queue rechecks for cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Cooperative cancellation flag for a running pipeline.
///
/// Cancelling stops further submission; rows already enqueued are drained by
/// the writer, and the run surfaces [`PipelineError::Interrupted`].
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Run the pipeline to completion.
pub fn run(config: &JobConfig, processor: impl RowProcessor) -> Result<RunSummary, PipelineError> {
    run_with_cancel(config, processor, &CancelToken::new())
}

/// Run the pipeline with an external cancellation handle.
pub fn run_with_cancel(
    config: &JobConfig,
    processor: impl RowProcessor,
    cancel: &CancelToken,
) -> Result<RunSummary, PipelineError> {
    let cfg = config.normalized();
    let started = Instant::now();

    let stream = open_table(&cfg.input_location, &cfg.input_table)?;
    let output_path = cfg.resolved_output_path();
    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).map_err(|source| PipelineError::Output {
            path: output_path.clone(),
            source,
        })?;
    }

    tracing::info!(
        input = %cfg.input_location.display(),
        table = %cfg.input_table,
        output = %output_path.display(),
        threads = cfg.thread_count,
        queue = cfg.queue_capacity,
        "starting bulk enrichment run"
    );

    let metrics = Arc::new(RunMetrics::new());
    let (producer, consumer) = write_queue(cfg.queue_capacity);
    // The writer starts before submission begins so the queue drains from
    // the first row.
    let writer = TableWriter::spawn(
        stream.shared_headers(),
        cfg.extra_columns.clone(),
        cfg.batch_size,
        output_path.clone(),
        consumer,
        Arc::clone(&metrics),
    );
    let pool = WorkerPool::new(
        cfg.thread_count,
        Arc::new(processor),
        cfg.retry_limit,
        Arc::clone(&metrics),
    );

    let mut interrupted = false;
    let mut source_failure: Option<SourceError> = None;

    'submit: for (index, next) in stream.enumerate() {
        if cancel.is_cancelled() {
            interrupted = true;
            break;
        }
        let row = match next {
            Ok(row) => row,
            Err(e) => {
                source_failure = Some(e);
                break;
            }
        };
        let row = Arc::new(row);
        let pending = pool.submit(Arc::clone(&row), index);
        metrics.record_submitted();

        let mut item = WorkItem {
            index,
            row,
            pending,
        };
        loop {
            match producer.put_timeout(item, CANCEL_POLL) {
                Ok(()) => break,
                Err(PutError::Full(back)) => {
                    if cancel.is_cancelled() {
                        interrupted = true;
                        break 'submit;
                    }
                    item = back;
                }
                // Writer terminated early; join below surfaces its failure.
                Err(PutError::Closed(_)) => break 'submit,
            }
        }
    }

    // Exactly one sentinel, after the source is exhausted (or abandoned).
    producer.finish();
    if !pool.shutdown(cfg.shutdown_timeout()) {
        tracing::warn!("worker pool did not drain within the shutdown timeout");
    }
    writer.join()?;

    if let Some(e) = source_failure {
        return Err(e.into());
    }
    if interrupted {
        tracing::warn!("run cancelled; enqueued rows were drained");
        return Err(PipelineError::Interrupted);
    }

    let summary = metrics.snapshot(started.elapsed(), output_path);
    tracing::info!(
        rows = summary.rows_written,
        failed = summary.rows_failed,
        checkpoints = summary.checkpoints_saved,
        elapsed_ms = summary.elapsed_ms,
        "run complete"
    );
    Ok(summary)
}
