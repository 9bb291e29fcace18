// ============================================================
// CSV DOCUMENT
// ============================================================
// Rectangular table of string cells, first row is the header

use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};

/// A header plus rows of string cells.
///
/// Every row carries exactly as many cells as the header; `push_row`
/// rejects anything else, so a built document is always rectangular.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvDocument {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvDocument {
    /// Create a header-only document
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row, failing if its width differs from the header
    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.header.len() {
            return Err(AppError::ValidationError(format!(
                "Row {} has {} cells, header has {}",
                self.rows.len() + 1,
                row.len(),
                self.header.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows including the header
    pub fn line_count(&self) -> usize {
        self.rows.len() + 1
    }

    pub fn is_header_only(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header followed by the data rows
    pub fn lines(&self) -> impl Iterator<Item = &Vec<String>> {
        std::iter::once(&self.header).chain(self.rows.iter())
    }
}
