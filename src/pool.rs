//! Fixed-size worker pool invoking the row processor.
//!
//! Submission is non-blocking: [`WorkerPool::submit`] hands the row to an
//! unbounded task channel and returns a [`PendingResult`] immediately. Global
//! memory stays bounded because the driver only submits as fast as the
//! bounded write queue accepts the matching work items.
//!
//! Completion order among workers is arbitrary; ordering is restored
//! downstream by the writer, which resolves pending results strictly in
//! submission order.

use crate::metrics::RunMetrics;
use crate::row::{Row, RowIndex};
use anyhow::anyhow;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Extra output columns contributed by the processor for one row.
pub type ExtraColumns = HashMap<String, String>;

/// The sole collaborator interface the pipeline depends on.
///
/// Implementations receive each data row with its zero-based index and
/// return the values for the configured extra output columns. Any error (or
/// panic) is captured per row: the run continues and the affected row
/// carries the error placeholder in its extra columns.
pub trait RowProcessor: Send + Sync + 'static {
    fn process(&self, row: &Row, index: RowIndex) -> anyhow::Result<ExtraColumns>;
}

impl<F> RowProcessor for F
where
    F: Fn(&Row, RowIndex) -> anyhow::Result<ExtraColumns> + Send + Sync + 'static,
{
    fn process(&self, row: &Row, index: RowIndex) -> anyhow::Result<ExtraColumns> {
        self(row, index)
    }
}

struct Task {
    row: Arc<Row>,
    index: RowIndex,
    reply: Sender<Result<ExtraColumns, String>>,
}

/// Asynchronous handle for one row's processing outcome.
///
/// Resolved exactly once, by the writer, via [`PendingResult::wait`].
pub struct PendingResult {
    reply: Receiver<Result<ExtraColumns, String>>,
}

impl PendingResult {
    /// Block until this row's processing completes.
    ///
    /// A task abandoned by the pool (worker gone before replying) resolves
    /// as an error, so the writer can substitute the placeholder and move on.
    pub fn wait(self) -> Result<ExtraColumns, String> {
        match self.reply.recv() {
            Ok(outcome) => outcome,
            Err(_) => Err("row processing abandoned".to_string()),
        }
    }
}

/// Fixed-size pool of OS threads running the row processor.
pub struct WorkerPool {
    tasks: Option<Sender<Task>>,
    exited: Receiver<()>,
    threads: usize,
}

impl WorkerPool {
    /// Spawn `threads` workers (minimum 1) over the given processor.
    pub fn new(
        threads: usize,
        processor: Arc<dyn RowProcessor>,
        retry_limit: usize,
        metrics: Arc<RunMetrics>,
    ) -> Self {
        let threads = threads.max(1);
        let (task_tx, task_rx) = unbounded::<Task>();
        let (exit_tx, exit_rx) = bounded(threads);
        for worker in 0..threads {
            let task_rx = task_rx.clone();
            let exit_tx = exit_tx.clone();
            let processor = Arc::clone(&processor);
            let metrics = Arc::clone(&metrics);
            thread::Builder::new()
                .name(format!("bulkline-worker-{worker}"))
                .spawn(move || {
                    worker_loop(&task_rx, processor.as_ref(), retry_limit, &metrics);
                    let _ = exit_tx.send(());
                })
                .expect("spawn worker thread");
        }
        Self {
            tasks: Some(task_tx),
            exited: exit_rx,
            threads,
        }
    }

    /// Schedule one row for processing. Never blocks.
    pub fn submit(&self, row: Arc<Row>, index: RowIndex) -> PendingResult {
        let (reply_tx, reply_rx) = bounded(1);
        if let Some(tasks) = &self.tasks {
            // A failed send means every worker is gone; the dropped reply
            // sender resolves the handle as abandoned.
            let _ = tasks.send(Task {
                row,
                index,
                reply: reply_tx,
            });
        }
        PendingResult { reply: reply_rx }
    }

    /// Stop accepting work and wait up to `timeout` for in-flight rows.
    ///
    /// Returns `false` if the deadline expired with workers still busy; the
    /// remaining workers are abandoned (their pending results resolve as
    /// errors once they are dropped).
    pub fn shutdown(mut self, timeout: Duration) -> bool {
        drop(self.tasks.take());
        let deadline = Instant::now() + timeout;
        for _ in 0..self.threads {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if self.exited.recv_timeout(remaining).is_err() {
                return false;
            }
        }
        true
    }
}

fn worker_loop(
    tasks: &Receiver<Task>,
    processor: &dyn RowProcessor,
    retry_limit: usize,
    metrics: &RunMetrics,
) {
    while let Ok(task) = tasks.recv() {
        let mut attempt = 0;
        let outcome = loop {
            let result = catch_unwind(AssertUnwindSafe(|| processor.process(&task.row, task.index)))
                .unwrap_or_else(|panic| Err(anyhow!("processor panicked: {}", panic_message(&panic))));
            match result {
                Ok(columns) => break Ok(columns),
                Err(e) if attempt < retry_limit => {
                    attempt += 1;
                    metrics.record_retry();
                    tracing::warn!(index = task.index, attempt, error = %format!("{e:#}"), "retrying row");
                }
                Err(e) => break Err(format!("{e:#}")),
            }
        };
        // The receiver may already be gone (writer drained past a cancelled
        // run); delivery is best-effort.
        let _ = task.reply.send(outcome);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
