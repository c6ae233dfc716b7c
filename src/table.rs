//! In-memory output table with durable, crash-safe persistence.
//!
//! The table is exclusively owned and mutated by the writer thread; nothing
//! here needs locking. Persistence comes in two flavors:
//!
//! - [`Table::write_csv`] serializes the whole table to a path, sharding the
//!   serialization across threads for large tables while preserving
//!   deterministic row order (shard buffers are concatenated in index order).
//! - [`Table::checkpoint`] writes the table to a sibling temp path and then
//!   atomically renames it over the target, falling back to copy + delete
//!   where rename is not possible. The target path is therefore always either
//!   the previous complete snapshot or the new one, never a torn write.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use rayon::iter::IntoParallelIterator;
use rayon::iter::ParallelIterator;
use std::fs::{self, File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Row count above which serialization is sharded across threads.
const PARALLEL_WRITE_THRESHOLD: usize = 20_000;

/// The growing output table: a header row followed by data rows.
#[derive(Debug, Default)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    /// All rows, header first (once written).
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serialize the whole table to `path`, creating parent directories.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
        }
        if self.rows.len() >= PARALLEL_WRITE_THRESHOLD {
            self.write_csv_sharded(path)
        } else {
            let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
            let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
            for (i, row) in self.rows.iter().enumerate() {
                wtr.write_record(row)
                    .with_context(|| format!("serialize row #{}", i + 1))?;
            }
            wtr.flush()?;
            Ok(())
        }
    }

    /// Serialize shard buffers in parallel, then concatenate them in shard
    /// index order so the file layout is independent of thread scheduling.
    fn write_csv_sharded(&self, path: &Path) -> Result<()> {
        let shard_count = (2 * num_cpus::get().max(2)).clamp(1, self.rows.len());
        let ranges = split_ranges(self.rows.len(), shard_count);

        let mut buffers: Vec<(usize, Vec<u8>)> = ranges
            .into_par_iter()
            .map(|(idx, start, end)| {
                let mut buf: Vec<u8> = Vec::with_capacity((end - start).saturating_mul(64)); // heuristic
                {
                    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(&mut buf);
                    for row in &self.rows[start..end] {
                        wtr.write_record(row)?;
                    }
                    wtr.flush()?;
                }
                Ok::<_, anyhow::Error>((idx, buf))
            })
            .collect::<Result<Vec<_>>>()?;

        buffers.sort_by_key(|(idx, _)| *idx);

        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        for (_, buf) in buffers {
            file.write_all(&buf)?;
        }
        file.flush()?;
        Ok(())
    }

    /// Durably snapshot the table at `path` via temp-file-then-rename.
    pub fn checkpoint(&self, path: &Path) -> Result<()> {
        let tmp = checkpoint_path(path);
        if let Err(e) = self.write_csv(&tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        if fs::rename(&tmp, path).is_err() {
            // Non-atomic fallback, e.g. across filesystems.
            fs::copy(&tmp, path).with_context(|| format!("replace {}", path.display()))?;
            let _ = fs::remove_file(&tmp);
        }
        Ok(())
    }
}

/// Sibling temp path used while a checkpoint is being written.
#[must_use]
pub fn checkpoint_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".checkpoint");
    PathBuf::from(os)
}

/// Split `[0, len)` into `parts` contiguous ranges as `(shard_idx, start, end)`.
fn split_ranges(len: usize, parts: usize) -> Vec<(usize, usize, usize)> {
    let parts = parts.max(1).min(len.max(1));
    let base = len / parts;
    let rem = len % parts;

    let mut out = Vec::with_capacity(parts);
    let mut start = 0usize;
    for idx in 0..parts {
        let extra = if idx < rem { 1 } else { 0 };
        let end = start + base + extra;
        if start < end {
            out.push((idx, start, end));
        }
        start = end;
    }
    out
}
