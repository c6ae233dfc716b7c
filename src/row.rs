//! The row data model shared by the source, the worker pool, and the writer.

use std::sync::Arc;

/// Zero-based position of a data row in the input table (header excluded).
pub type RowIndex = usize;

/// One data row of a table: an ordered mapping from column header to cell
/// value, preserving the input column order.
///
/// Rows share a single header vector per stream, so cloning a `Row` only
/// clones its cells. A `Row` is immutable once read; cells are aligned to the
/// header on construction (missing trailing cells become empty strings,
/// surplus cells are dropped).
#[derive(Debug, Clone)]
pub struct Row {
    headers: Arc<Vec<String>>,
    cells: Vec<String>,
}

impl Row {
    pub(crate) fn new(headers: Arc<Vec<String>>, mut cells: Vec<String>) -> Self {
        cells.resize(headers.len(), String::new());
        Self { headers, cells }
    }

    /// The column headers this row is aligned to, in input order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Cell values in input column order, one per header.
    #[must_use]
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Look up a cell by column header.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        let i = self.headers.iter().position(|h| h == column)?;
        Some(self.cells[i].as_str())
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate `(header, cell)` pairs in input column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter().map(String::as_str))
    }
}
