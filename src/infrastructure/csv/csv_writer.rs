// ============================================================
// CSV WRITER
// ============================================================
// Serialize a CsvDocument: `,` between cells, `\n` between rows

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::domain::csv::{CsvDocument, Quoting};
use crate::domain::error::{AppError, Result};

/// CSV serializer with configurable quoting
pub struct CsvWriter {
    /// Delimiter character (default: comma)
    delimiter: u8,

    quoting: Quoting,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quoting: Quoting::Necessary,
        }
    }
}

impl CsvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_quoting(mut self, quoting: Quoting) -> Self {
        self.quoting = quoting;
        self
    }

    /// Render header and rows; the last row has no trailing newline
    pub fn render(&self, document: &CsvDocument) -> Result<String> {
        // A lone empty cell would come out of the csv writer as `""`
        if self.quoting == Quoting::Never || document.header().is_empty() {
            return Ok(self.join_verbatim(document));
        }

        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .has_headers(false)
            .from_writer(Vec::new());

        for line in document.lines() {
            writer.write_record(line)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::IoError(format!("Failed to flush CSV output: {}", e)))?;
        let mut text = String::from_utf8(bytes)
            .map_err(|e| AppError::ParseError(format!("CSV output is not UTF-8: {}", e)))?;

        if text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }

    fn join_verbatim(&self, document: &CsvDocument) -> String {
        let delimiter = char::from(self.delimiter).to_string();
        document
            .lines()
            .map(|line| line.join(&delimiter))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
