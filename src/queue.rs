//! Bounded, order-preserving channel between the driver and the writer.
//!
//! Items are dequeued in exactly the order they were enqueued; since the
//! driver enqueues in row-index order, the writer inherits its ordering
//! guarantee from FIFO alone, without a sort buffer. `put` blocks the
//! producer at capacity, which is the pipeline's backpressure mechanism.

use crate::pool::PendingResult;
use crate::row::{Row, RowIndex};
use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded};
use std::sync::Arc;
use std::time::Duration;

/// One enqueued unit of work: the input row, its index, and the handle the
/// writer will block on.
pub struct WorkItem {
    pub index: RowIndex,
    pub row: Arc<Row>,
    pub pending: PendingResult,
}

/// Queue payload. `Done` is the reserved end-of-stream sentinel, enqueued
/// exactly once after the row source is exhausted.
pub enum QueueItem {
    Work(WorkItem),
    Done,
}

/// Create a write queue with the given capacity, split into its producer and
/// consumer halves.
#[must_use]
pub fn write_queue(capacity: usize) -> (QueueProducer, QueueConsumer) {
    let (tx, rx) = bounded(capacity);
    (QueueProducer { tx }, QueueConsumer { rx })
}

/// Outcome of a bounded [`QueueProducer::put_timeout`] attempt, returning the
/// item so the caller can retry or drop it.
pub enum PutError {
    /// The queue stayed full for the whole timeout.
    Full(WorkItem),
    /// The writer is gone; no further items will be accepted.
    Closed(WorkItem),
}

pub struct QueueProducer {
    tx: Sender<QueueItem>,
}

impl QueueProducer {
    /// Enqueue a work item, blocking while the queue is at capacity.
    ///
    /// Errors only when the writer has terminated.
    pub fn put(&self, item: WorkItem) -> Result<(), WorkItem> {
        self.tx.send(QueueItem::Work(item)).map_err(|e| match e.0 {
            QueueItem::Work(item) => item,
            QueueItem::Done => unreachable!("put never sends the sentinel"),
        })
    }

    /// Like [`QueueProducer::put`], but give up after `timeout` so the caller
    /// can check for cancellation between attempts.
    pub fn put_timeout(&self, item: WorkItem, timeout: Duration) -> Result<(), PutError> {
        match self.tx.send_timeout(QueueItem::Work(item), timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(QueueItem::Work(item))) => Err(PutError::Full(item)),
            Err(SendTimeoutError::Disconnected(QueueItem::Work(item))) => {
                Err(PutError::Closed(item))
            }
            Err(_) => unreachable!("put_timeout never sends the sentinel"),
        }
    }

    /// Enqueue the end-of-stream sentinel and release the producer side.
    pub fn finish(self) {
        let _ = self.tx.send(QueueItem::Done);
    }

    /// Items currently buffered in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

pub struct QueueConsumer {
    rx: Receiver<QueueItem>,
}

impl QueueConsumer {
    /// Dequeue the next item, blocking while the queue is empty.
    ///
    /// A disconnected producer is treated as end-of-stream, so the writer
    /// always gets to drain and finalize.
    #[must_use]
    pub fn take(&self) -> QueueItem {
        self.rx.recv().unwrap_or(QueueItem::Done)
    }
}
