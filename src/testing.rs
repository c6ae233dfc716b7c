//! Testing utilities for bulkline pipelines.
//!
//! This module ships with the crate (like the rest of the public API) so
//! downstream users can exercise their own row processors against real
//! pipeline runs. It includes:
//!
//! - **Table helpers**: write and read small CSV tables under a temp dir
//! - **Fixtures**: a canned accounts table
//! - **Processors**: deterministic stand-ins for the remote lookup:
//!   static, flaky, deliberately slow, and gated (blocks until released)
//!
//! # Example
//!
//! ```no_run
//! use bulkline::{JobConfig, run};
//! use bulkline::testing::{StaticProcessor, table_file};
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let input = table_file(dir.path(), "users", &["id", "name"], &[&["1", "Alice"]]);
//!
//! let cfg = JobConfig::new(input, "users", dir.path().join("out.csv"), "out")
//!     .with_extra_columns(["status"]);
//! let summary = run(&cfg, StaticProcessor::new(&[("status", "OK")]))?;
//! assert_eq!(summary.rows_written, 1);
//! # Ok(())
//! # }
//! ```

use crate::pool::{ExtraColumns, RowProcessor};
use crate::row::{Row, RowIndex};
use anyhow::bail;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Build an [`ExtraColumns`] map from `(column, value)` pairs.
#[must_use]
pub fn extra(pairs: &[(&str, &str)]) -> ExtraColumns {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Write a CSV table named `<name>.csv` under `dir` and return its path.
pub fn table_file(dir: &Path, name: &str, headers: &[&str], rows: &[&[&str]]) -> PathBuf {
    let path = dir.join(format!("{name}.csv"));
    let mut wtr = csv::Writer::from_path(&path).expect("create test table");
    wtr.write_record(headers).expect("write test header");
    for row in rows {
        wtr.write_record(*row).expect("write test row");
    }
    wtr.flush().expect("flush test table");
    path
}

/// Read a whole CSV table back, header row included.
pub fn read_table(path: &Path) -> Vec<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .expect("open table");
    rdr.records()
        .map(|r| r.expect("read record").iter().map(str::to_string).collect())
        .collect()
}

/// Canned fixture: a small accounts table with `id,name,email` columns.
pub fn sample_accounts(dir: &Path) -> PathBuf {
    table_file(
        dir,
        "accounts",
        &["id", "name", "email"],
        &[
            &["1", "Alice", "alice@example.com"],
            &["2", "Bob", "bob@example.com"],
            &["3", "Carol", "carol@example.com"],
            &["4", "Dave", "dave@example.com"],
            &["5", "Erin", "erin@example.com"],
        ],
    )
}

/// Processor returning the same extra columns for every row.
#[derive(Clone)]
pub struct StaticProcessor {
    extra: ExtraColumns,
}

impl StaticProcessor {
    #[must_use]
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self { extra: extra(pairs) }
    }
}

impl RowProcessor for StaticProcessor {
    fn process(&self, _row: &Row, _index: RowIndex) -> anyhow::Result<ExtraColumns> {
        Ok(self.extra.clone())
    }
}

/// Processor that fails for chosen row indices and succeeds elsewhere.
#[derive(Clone)]
pub struct FlakyProcessor {
    fail_on: HashSet<RowIndex>,
    extra: ExtraColumns,
}

impl FlakyProcessor {
    #[must_use]
    pub fn new(fail_on: impl IntoIterator<Item = RowIndex>, pairs: &[(&str, &str)]) -> Self {
        Self {
            fail_on: fail_on.into_iter().collect(),
            extra: extra(pairs),
        }
    }
}

impl RowProcessor for FlakyProcessor {
    fn process(&self, _row: &Row, index: RowIndex) -> anyhow::Result<ExtraColumns> {
        if self.fail_on.contains(&index) {
            bail!("simulated failure for row {index}");
        }
        Ok(self.extra.clone())
    }
}

/// Processor where *lower* indices complete later, to exercise the ordered
/// writer against out-of-order completion.
#[derive(Clone)]
pub struct SlowLowIndexProcessor {
    rows: usize,
    step: Duration,
    extra: ExtraColumns,
}

impl SlowLowIndexProcessor {
    #[must_use]
    pub fn new(rows: usize, step: Duration, pairs: &[(&str, &str)]) -> Self {
        Self {
            rows,
            step,
            extra: extra(pairs),
        }
    }
}

impl RowProcessor for SlowLowIndexProcessor {
    fn process(&self, _row: &Row, index: RowIndex) -> anyhow::Result<ExtraColumns> {
        let rank = self.rows.saturating_sub(index) as u32;
        thread::sleep(self.step * rank);
        Ok(self.extra.clone())
    }
}

/// Processor that blocks every invocation until its [`Gate`] releases it.
/// Useful for backpressure and mid-run checkpoint tests.
pub struct GatedProcessor {
    release: Receiver<()>,
    started: Arc<AtomicUsize>,
    extra: ExtraColumns,
}

impl GatedProcessor {
    /// Number of invocations that have entered the processor so far.
    #[must_use]
    pub fn started(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.started)
    }
}

/// Release side of a [`GatedProcessor`].
pub struct Gate {
    tx: Sender<()>,
}

impl Gate {
    /// Let `n` blocked (or future) invocations proceed.
    pub fn allow(&self, n: usize) {
        for _ in 0..n {
            let _ = self.tx.send(());
        }
    }

    /// Release every current and future invocation.
    pub fn open(self) {
        drop(self.tx);
    }
}

/// Build a gated processor and its release handle.
#[must_use]
pub fn gated_processor(pairs: &[(&str, &str)]) -> (GatedProcessor, Gate) {
    let (tx, rx) = unbounded();
    (
        GatedProcessor {
            release: rx,
            started: Arc::new(AtomicUsize::new(0)),
            extra: extra(pairs),
        },
        Gate { tx },
    )
}

impl RowProcessor for GatedProcessor {
    fn process(&self, _row: &Row, _index: RowIndex) -> anyhow::Result<ExtraColumns> {
        self.started.fetch_add(1, Ordering::SeqCst);
        // A dropped gate releases everyone.
        let _ = self.release.recv();
        Ok(self.extra.clone())
    }
}
