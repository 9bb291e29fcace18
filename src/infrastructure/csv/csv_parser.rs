// ============================================================
// CSV READ-BACK
// ============================================================
// Load an exported CSV file into a CsvDocument again

use csv::{ReaderBuilder, Trim};
use std::path::Path;

use crate::domain::csv::CsvDocument;
use crate::domain::error::{AppError, Result};

const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Reader for exported tables. Without an explicit delimiter the header
/// line decides which one is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvParser {
    delimiter: Option<u8>,
    trim: bool,
}

impl CsvParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Invalid UTF-8 is replaced, not rejected
    pub fn read_path(&self, path: &Path) -> Result<CsvDocument> {
        let bytes = std::fs::read(path).map_err(|e| {
            AppError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.read_str(&String::from_utf8_lossy(&bytes))
    }

    /// Rows narrower or wider than the header are an error
    pub fn read_str(&self, text: &str) -> Result<CsvDocument> {
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| sniff_delimiter(text.lines().next().unwrap_or_default()));

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(if self.trim { Trim::All } else { Trim::None })
            .flexible(true)
            .from_reader(text.as_bytes());

        let header = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Unreadable CSV header: {}", e)))?
            .clone();

        let mut document = CsvDocument::new(header.iter());
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                AppError::ParseError(format!("Unreadable CSV line {}: {}", line + 2, e))
            })?;
            document.push_row(record.iter().map(str::to_string).collect())?;
        }
        Ok(document)
    }

    /// What a quote-unaware consumer sees: lines split on every comma
    pub fn split_unquoted(text: &str) -> Vec<Vec<String>> {
        text.split('\n')
            .map(|line| line.split(',').map(str::to_string).collect())
            .collect()
    }
}

/// Most frequent candidate outside quotes; comma on a tie or no hit
fn sniff_delimiter(header_line: &str) -> u8 {
    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut quoted = false;
    for byte in header_line.bytes() {
        if byte == b'"' {
            quoted = !quoted;
            continue;
        }
        if quoted {
            continue;
        }
        if let Some(slot) = CANDIDATE_DELIMITERS.iter().position(|d| *d == byte) {
            counts[slot] += 1;
        }
    }

    let mut best = 0;
    for slot in 1..counts.len() {
        if counts[slot] > counts[best] {
            best = slot;
        }
    }
    CANDIDATE_DELIMITERS[best]
}
