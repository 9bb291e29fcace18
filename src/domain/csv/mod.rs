// ============================================================
// CSV DOMAIN LAYER
// ============================================================
// Core types and value objects for CSV export
// No I/O, no async

mod cell;
mod csv_document;
mod export_config;

pub use cell::{cell_text, optional_cell_text};
pub use csv_document::CsvDocument;
pub use export_config::{ExportConfig, ExportMode, HeaderStrategy, Quoting, SchemaPolicy};

/// MIME type of every exported CSV blob
pub const CSV_MIME_TYPE: &str = "text/csv;charset=utf-8";
