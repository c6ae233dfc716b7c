//! Streaming row source.
//!
//! [`open_table`] resolves a named table at an input location and returns a
//! lazy, forward-only [`RowStream`] over its data rows. The first physical
//! record is the header and is not emitted; every emitted row is aligned to
//! that header (missing trailing cells become empty strings, surplus cells
//! are dropped, values are whitespace-trimmed).
//!
//! A file location must have a stem matching the table name
//! (case-insensitive); a directory location is scanned for `<table>.csv`,
//! or `<table>.json` with the `io-json` feature, where the table is a JSON
//! array of flat objects.
//!
//! An input with no header record at all yields an empty stream rather than
//! an error: no header, no data.

use crate::error::SourceError;
use crate::row::{Row, RowIndex};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Open the named table and return a stream over its data rows.
pub fn open_table(location: impl AsRef<Path>, table: &str) -> Result<RowStream, SourceError> {
    let location = location.as_ref();
    let path = resolve_table(location, table)?;
    tracing::debug!(table, path = %path.display(), "opening input table");

    #[cfg(feature = "io-json")]
    if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) {
        return json::open(&path);
    }

    open_csv(&path)
}

/// Map a `(location, table)` pair onto a concrete file path.
fn resolve_table(location: &Path, table: &str) -> Result<PathBuf, SourceError> {
    let io_err = |source| SourceError::Io {
        location: location.to_path_buf(),
        source,
    };
    let meta = fs::metadata(location).map_err(io_err)?;

    if meta.is_file() {
        let matches = location
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.eq_ignore_ascii_case(table));
        if matches {
            return Ok(location.to_path_buf());
        }
        return Err(SourceError::TableNotFound {
            table: table.to_string(),
            location: location.to_path_buf(),
        });
    }

    // Directory: case-insensitive stem scan. CSV wins over JSON when both
    // exist under the same name.
    #[cfg(feature = "io-json")]
    let mut json_match: Option<PathBuf> = None;
    for entry in fs::read_dir(location).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let stem_matches = path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.eq_ignore_ascii_case(table));
        if !stem_matches || !path.is_file() {
            continue;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => return Ok(path),
            #[cfg(feature = "io-json")]
            Some(ext) if ext.eq_ignore_ascii_case("json") => json_match = Some(path),
            _ => {}
        }
    }
    #[cfg(feature = "io-json")]
    if let Some(path) = json_match {
        return Ok(path);
    }
    Err(SourceError::TableNotFound {
        table: table.to_string(),
        location: location.to_path_buf(),
    })
}

fn open_csv(path: &Path) -> Result<RowStream, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Io {
        location: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut header = csv::StringRecord::new();
    let headers = match reader.read_record(&mut header) {
        Ok(true) => header.iter().map(str::to_string).collect(),
        Ok(false) => Vec::new(),
        Err(e) => return Err(csv_error(path, e)),
    };

    Ok(RowStream {
        headers: Arc::new(headers),
        backend: Backend::Csv(reader),
        location: path.to_path_buf(),
        next_index: 0,
    })
}

fn csv_error(path: &Path, e: csv::Error) -> SourceError {
    if e.is_io_error() {
        if let csv::ErrorKind::Io(source) = e.into_kind() {
            return SourceError::Io {
                location: path.to_path_buf(),
                source,
            };
        }
        unreachable!("is_io_error implies ErrorKind::Io");
    }
    SourceError::Malformed {
        location: path.to_path_buf(),
        message: e.to_string(),
    }
}

#[derive(Debug)]
enum Backend {
    /// Lazy CSV record reader; the file handle is released when the stream
    /// is dropped.
    Csv(csv::Reader<File>),
    #[cfg(feature = "io-json")]
    Json(std::vec::IntoIter<Vec<String>>),
}

/// A lazy, single-pass stream of [`Row`]s in physical table order.
#[derive(Debug)]
pub struct RowStream {
    headers: Arc<Vec<String>>,
    backend: Backend,
    location: PathBuf,
    next_index: RowIndex,
}

impl RowStream {
    /// Column headers of the table, in input order. Empty for a table with
    /// no header record.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Shared handle to the headers, for components that outlive the stream.
    #[must_use]
    pub fn shared_headers(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.headers)
    }

    /// Index the next emitted row will carry.
    #[must_use]
    pub fn next_index(&self) -> RowIndex {
        self.next_index
    }
}

impl Iterator for RowStream {
    type Item = Result<Row, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.headers.is_empty() {
            return None;
        }
        let cells = match &mut self.backend {
            Backend::Csv(reader) => {
                let mut record = csv::StringRecord::new();
                match reader.read_record(&mut record) {
                    Ok(true) => record.iter().map(str::to_string).collect(),
                    Ok(false) => return None,
                    Err(e) => return Some(Err(csv_error(&self.location, e))),
                }
            }
            #[cfg(feature = "io-json")]
            Backend::Json(rows) => rows.next()?,
        };
        self.next_index += 1;
        Some(Ok(Row::new(Arc::clone(&self.headers), cells)))
    }
}

#[cfg(feature = "io-json")]
mod json {
    //! JSON table backend: an array of flat objects, the first object's key
    //! order defining the header.

    use super::{Backend, RowStream, SourceError};
    use serde_json::Value;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    pub(super) fn open(path: &Path) -> Result<RowStream, SourceError> {
        let raw = fs::read_to_string(path).map_err(|source| SourceError::Io {
            location: path.to_path_buf(),
            source,
        })?;
        let doc: Value = serde_json::from_str(&raw).map_err(|e| SourceError::Malformed {
            location: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let Value::Array(items) = doc else {
            return Err(SourceError::Malformed {
                location: path.to_path_buf(),
                message: "expected a top-level JSON array of objects".to_string(),
            });
        };

        let mut headers: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<String>> = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let Value::Object(obj) = item else {
                return Err(SourceError::Malformed {
                    location: path.to_path_buf(),
                    message: format!("element #{} is not an object", i + 1),
                });
            };
            if headers.is_empty() {
                headers = obj.keys().cloned().collect();
            }
            let cells = headers
                .iter()
                .map(|h| obj.get(h).map(cell_text).unwrap_or_default())
                .collect();
            rows.push(cells);
        }

        Ok(RowStream {
            headers: Arc::new(headers),
            backend: Backend::Json(rows.into_iter()),
            location: path.to_path_buf(),
            next_index: 0,
        })
    }

    fn cell_text(v: &Value) -> String {
        match v {
            Value::Null => String::new(),
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        }
    }
}
