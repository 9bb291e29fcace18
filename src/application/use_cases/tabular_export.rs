// ============================================================
// TABULAR EXPORT USE CASE
// ============================================================
// Normalize extraction results into a rectangular table, serialize
// it as CSV and hand it to a download sink

use indexmap::{IndexMap, IndexSet};
use tracing::{info, warn};

use crate::domain::csv::{
    cell_text, optional_cell_text, CsvDocument, ExportConfig, ExportMode, HeaderStrategy,
    SchemaPolicy, CSV_MIME_TYPE,
};
use crate::domain::error::{AppError, Result};
use crate::domain::extraction::{parse_label_value_lines, ExtractionResult, Record};
use crate::infrastructure::csv::CsvWriter;
use crate::infrastructure::download::{Blob, DownloadSink};

/// Fixed header of label-value exports
pub const LABEL_VALUE_HEADER: [&str; 3] = ["ImageName", "Label", "Value"];

/// Optional leading column naming the entry in flat-mapping exports
pub const IMAGE_NAME_COLUMN: &str = "ImageName";

/// A ready-to-download CSV; only exists when the export can succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub document: CsvDocument,
}

pub struct TabularExportEngine {
    config: ExportConfig,
    writer: CsvWriter,
}

impl TabularExportEngine {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            writer: CsvWriter::new().with_quoting(config.quoting),
            config,
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Build the table for `input`, read as the shape `mode` names
    pub fn to_csv(&self, input: &ExtractionResult, mode: ExportMode) -> Result<CsvDocument> {
        match (mode, input) {
            (ExportMode::ObjectRows, ExtractionResult::ObjectRows(rows)) => {
                self.object_rows(rows)
            }
            (ExportMode::LabelValueText, ExtractionResult::LabelValueText(texts)) => {
                Self::label_value_text(texts)
            }
            (ExportMode::FlatMapping, ExtractionResult::FlatMapping(entries)) => {
                self.flat_mapping(entries)
            }
            (mode, input) => Err(AppError::ValidationError(format!(
                "Export mode {} does not match a {} result",
                mode,
                input.mode()
            ))),
        }
    }

    /// Serialize with the configured quoting
    pub fn render(&self, document: &CsvDocument) -> Result<String> {
        self.writer.render(document)
    }

    /// Hand the document to `sink` as a CSV blob.
    ///
    /// Failures are logged and never reach the caller.
    pub fn trigger_download(&self, document: &CsvDocument, filename: &str, sink: &dyn DownloadSink) {
        let text = match self.render(document) {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, filename, "CSV serialization failed");
                return;
            }
        };

        match sink.download(Blob::new(text, CSV_MIME_TYPE), filename) {
            Ok(path) => info!(path = %path.display(), rows = document.rows().len(), "CSV downloaded"),
            Err(err) => warn!(error = %err, filename, "CSV download failed"),
        }
    }

    /// Convert and download in one step
    pub fn export(
        &self,
        input: &ExtractionResult,
        mode: ExportMode,
        filename: &str,
        sink: &dyn DownloadSink,
    ) -> Result<()> {
        let document = self.to_csv(input, mode)?;
        self.trigger_download(&document, filename, sink);
        Ok(())
    }

    /// The download action for a screen's result, absent when there is
    /// nothing to export (no records, or the conversion fails)
    pub fn download_action(&self, input: &ExtractionResult, filename: &str) -> Option<CsvExport> {
        match self.to_csv(input, input.mode()) {
            Ok(document) => Some(CsvExport {
                filename: filename.to_string(),
                document,
            }),
            Err(AppError::EmptyInput) => None,
            Err(err) => {
                warn!(error = %err, filename, "CSV export unavailable");
                None
            }
        }
    }

    fn object_rows(&self, rows: &[Record]) -> Result<CsvDocument> {
        let first = rows.first().ok_or(AppError::EmptyInput)?;
        let header: Vec<String> = first.keys().cloned().collect();

        let mut document = CsvDocument::new(header.iter().cloned());
        for (index, record) in rows.iter().enumerate() {
            if self.config.schema_policy == SchemaPolicy::Strict {
                Self::check_schema(index, &header, record)?;
            }
            let cells = header
                .iter()
                .map(|key| optional_cell_text(record.get(key)))
                .collect();
            document.push_row(cells)?;
        }
        Ok(document)
    }

    fn check_schema(index: usize, header: &[String], record: &Record) -> Result<()> {
        let uniform =
            record.len() == header.len() && header.iter().all(|key| record.contains_key(key));
        if uniform {
            return Ok(());
        }
        Err(AppError::SchemaMismatch {
            row: index,
            expected: header.to_vec(),
            found: record.keys().cloned().collect(),
        })
    }

    fn label_value_text(texts: &IndexMap<String, String>) -> Result<CsvDocument> {
        let mut document = CsvDocument::new(LABEL_VALUE_HEADER);
        for (image_name, text) in texts {
            for pair in parse_label_value_lines(text) {
                document.push_row(vec![image_name.clone(), pair.label, pair.value])?;
            }
        }
        Ok(document)
    }

    fn flat_mapping(&self, entries: &IndexMap<String, Record>) -> Result<CsvDocument> {
        let fields: IndexSet<&String> = match self.config.header_strategy {
            HeaderStrategy::Union => entries.values().flat_map(|record| record.keys()).collect(),
            HeaderStrategy::FirstEntry => entries
                .values()
                .next()
                .map(|record| record.keys().collect())
                .unwrap_or_default(),
        };

        let key_column = self.config.image_name_column;
        let header = key_column
            .then(|| IMAGE_NAME_COLUMN.to_string())
            .into_iter()
            .chain(fields.iter().map(|field| (*field).clone()));
        let mut document = CsvDocument::new(header);

        for (image_name, record) in entries {
            let mut cells = Vec::with_capacity(fields.len() + 1);
            if key_column {
                cells.push(image_name.clone());
            }
            cells.extend(
                fields
                    .iter()
                    .map(|field| record.get(*field).map(cell_text).unwrap_or_default()),
            );
            document.push_row(cells)?;
        }
        Ok(document)
    }
}

impl Default for TabularExportEngine {
    fn default() -> Self {
        Self::new(ExportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::csv::Quoting;
    use crate::infrastructure::csv::CsvParser;
    use crate::infrastructure::download::DirectoryDownloads;
    use serde_json::{json, Value};

    fn records(value: Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    fn ocr_results() -> ExtractionResult {
        ExtractionResult::ObjectRows(records(json!([
            {"Recognized Text": "Basic", "Confidence Score": 96, "OCR Model": "Tesseract"},
            {"Recognized Text": "Salary", "Confidence Score": 88.5, "OCR Model": "EasyOCR"},
            {"Recognized Text": "HRA", "Confidence Score": 91, "OCR Model": "Tesseract"}
        ])))
    }

    #[test]
    fn test_object_rows_header_and_row_count() {
        let engine = TabularExportEngine::default();
        let doc = engine.to_csv(&ocr_results(), ExportMode::ObjectRows).unwrap();

        assert_eq!(doc.line_count(), 4);
        assert_eq!(doc.header(), &["Recognized Text", "Confidence Score", "OCR Model"]);
        assert_eq!(doc.rows()[1], vec!["Salary", "88.5", "EasyOCR"]);
    }

    #[test]
    fn test_object_rows_empty_input_fails() {
        let engine = TabularExportEngine::default();
        let err = engine
            .to_csv(&ExtractionResult::ObjectRows(Vec::new()), ExportMode::ObjectRows)
            .unwrap_err();
        assert_eq!(err, AppError::EmptyInput);
    }

    #[test]
    fn test_object_rows_lenient_fills_gaps() {
        let input = ExtractionResult::ObjectRows(records(json!([
            {"a": 1, "b": 2},
            {"b": 3, "c": 4}
        ])));
        let doc = TabularExportEngine::default()
            .to_csv(&input, ExportMode::ObjectRows)
            .unwrap();

        assert_eq!(doc.header(), &["a", "b"]);
        assert_eq!(doc.rows()[1], vec!["", "3"]);
    }

    #[test]
    fn test_object_rows_strict_rejects_ragged_records() {
        let input = ExtractionResult::ObjectRows(records(json!([
            {"a": 1, "b": 2},
            {"b": 3, "a": 5},
            {"a": 1, "c": 4}
        ])));
        let engine = TabularExportEngine::new(
            ExportConfig::default().with_schema_policy(SchemaPolicy::Strict),
        );

        match engine.to_csv(&input, ExportMode::ObjectRows).unwrap_err() {
            AppError::SchemaMismatch { row, expected, found } => {
                assert_eq!(row, 2);
                assert_eq!(expected, vec!["a", "b"]);
                assert_eq!(found, vec!["a", "c"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_label_value_text_exact_output() {
        let input = ExtractionResult::from_json(
            ExportMode::LabelValueText,
            json!({"img1": "Name: Alice\nAge: 30\n\n"}),
        )
        .unwrap();
        let engine = TabularExportEngine::default();
        let doc = engine.to_csv(&input, ExportMode::LabelValueText).unwrap();

        assert_eq!(
            engine.render(&doc).unwrap(),
            "ImageName,Label,Value\nimg1,Name,Alice\nimg1,Age,30"
        );
    }

    #[test]
    fn test_label_value_text_without_pairs_is_header_only() {
        let input = ExtractionResult::from_json(
            ExportMode::LabelValueText,
            json!({"img1": "no pairs here\n\n", "img2": ""}),
        )
        .unwrap();
        let doc = TabularExportEngine::default()
            .to_csv(&input, ExportMode::LabelValueText)
            .unwrap();

        assert!(doc.is_header_only());
        assert_eq!(doc.header(), &LABEL_VALUE_HEADER);
    }

    #[test]
    fn test_flat_mapping_unions_fields() {
        let input = ExtractionResult::from_json(
            ExportMode::FlatMapping,
            json!({
                "jan.png": {"Employee": "Bob", "Basic": 1000},
                "feb.png": {"Basic": 1100, "Bonus": 50}
            }),
        )
        .unwrap();
        let doc = TabularExportEngine::default()
            .to_csv(&input, ExportMode::FlatMapping)
            .unwrap();

        assert_eq!(doc.header(), &["Employee", "Basic", "Bonus"]);
        assert_eq!(doc.rows()[0], vec!["Bob", "1000", ""]);
        assert_eq!(doc.rows()[1], vec!["", "1100", "50"]);
    }

    #[test]
    fn test_flat_mapping_disjoint_fields() {
        let input = ExtractionResult::from_json(
            ExportMode::FlatMapping,
            json!({"a": {"x": 1}, "b": {"y": 2}}),
        )
        .unwrap();
        let engine = TabularExportEngine::default();
        let doc = engine.to_csv(&input, ExportMode::FlatMapping).unwrap();

        assert_eq!(doc.header(), &["x", "y"]);
        assert_eq!(engine.render(&doc).unwrap(), "x,y\n1,\n,2");

        let legacy = TabularExportEngine::new(ExportConfig::legacy());
        let doc = legacy.to_csv(&input, ExportMode::FlatMapping).unwrap();
        assert_eq!(legacy.render(&doc).unwrap(), "x\n1\n");
    }

    #[test]
    fn test_flat_mapping_image_name_column() {
        let input = ExtractionResult::from_json(
            ExportMode::FlatMapping,
            json!({"jan.png": {"Basic": 1000}, "feb.png": {"Bonus": 50}}),
        )
        .unwrap();
        let engine =
            TabularExportEngine::new(ExportConfig::default().with_image_name_column(true));
        let doc = engine.to_csv(&input, ExportMode::FlatMapping).unwrap();

        assert_eq!(doc.header(), &["ImageName", "Basic", "Bonus"]);
        assert_eq!(doc.rows()[1], vec!["feb.png", "", "50"]);

        let empty = ExtractionResult::FlatMapping(IndexMap::new());
        let doc = engine.to_csv(&empty, ExportMode::FlatMapping).unwrap();
        assert!(doc.is_header_only());
        assert_eq!(doc.header(), &[IMAGE_NAME_COLUMN]);
    }

    #[test]
    fn test_flat_mapping_first_entry_strategy() {
        let input = ExtractionResult::from_json(
            ExportMode::FlatMapping,
            json!({
                "jan.png": {"Employee": "Bob"},
                "feb.png": {"Employee": "Ann", "Bonus": 50}
            }),
        )
        .unwrap();
        let engine = TabularExportEngine::new(
            ExportConfig::default().with_header_strategy(HeaderStrategy::FirstEntry),
        );
        let doc = engine.to_csv(&input, ExportMode::FlatMapping).unwrap();

        assert_eq!(doc.header(), &["Employee"]);
        assert_eq!(doc.rows()[1], vec!["Ann"]);
    }

    #[test]
    fn test_empty_cells_stay_bare_without_quoting() {
        let input = ExtractionResult::ObjectRows(records(json!([
            {"t": null}, {"t": ""}, {"t": "x"}
        ])));
        let engine = TabularExportEngine::new(ExportConfig::default().with_quoting(Quoting::Never));
        let doc = engine.to_csv(&input, ExportMode::ObjectRows).unwrap();
        assert_eq!(engine.render(&doc).unwrap(), "t\n\n\nx");
    }

    #[test]
    fn test_mode_mismatch_is_rejected() {
        let err = TabularExportEngine::default()
            .to_csv(&ocr_results(), ExportMode::FlatMapping)
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn test_unquoted_split_keeps_width_without_commas() {
        let engine = TabularExportEngine::default();
        let doc = engine.to_csv(&ocr_results(), ExportMode::ObjectRows).unwrap();
        let text = engine.render(&doc).unwrap();

        let rows = CsvParser::split_unquoted(&text);
        assert_eq!(rows.len(), doc.line_count());
        assert!(rows.iter().all(|row| row.len() == doc.header().len()));
    }

    #[test]
    fn test_quoted_output_parses_back_with_commas() {
        let input = ExtractionResult::ObjectRows(records(json!([
            {"Recognized Text": "12 Main St, Pune", "Confidence Score": 70}
        ])));
        let engine = TabularExportEngine::default();
        let doc = engine.to_csv(&input, ExportMode::ObjectRows).unwrap();

        let parsed = CsvParser::new()
            .read_str(&engine.render(&doc).unwrap())
            .unwrap();
        assert_eq!(parsed, doc);

        let legacy = TabularExportEngine::new(ExportConfig::default().with_quoting(Quoting::Never));
        let naive = CsvParser::split_unquoted(&legacy.render(&doc).unwrap());
        assert_ne!(naive[1].len(), doc.header().len());
    }

    #[test]
    fn test_download_action_absent_for_empty_rows() {
        let engine = TabularExportEngine::default();
        assert!(engine
            .download_action(&ExtractionResult::ObjectRows(Vec::new()), "ocr_results.csv")
            .is_none());

        let action = engine
            .download_action(&ocr_results(), "ocr_results.csv")
            .unwrap();
        assert_eq!(action.filename, "ocr_results.csv");
        assert_eq!(action.document.rows().len(), 3);
    }

    #[test]
    fn test_trigger_download_writes_file_and_releases_url() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectoryDownloads::new(dir.path());
        let engine = TabularExportEngine::default();

        engine
            .export(&ocr_results(), ExportMode::ObjectRows, "ocr_results.csv", &sink)
            .unwrap();

        let saved = sink.saved_paths();
        assert_eq!(saved.len(), 1);
        let content = std::fs::read_to_string(&saved[0]).unwrap();
        assert!(content.starts_with("Recognized Text,Confidence Score,OCR Model\nBasic,96,"));
        assert_eq!(sink.registry().live_count(), 0);
    }

    #[test]
    fn test_trigger_download_swallows_sink_failures() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        std::fs::write(&blocker, "x").unwrap();
        let sink = DirectoryDownloads::new(&blocker);

        let engine = TabularExportEngine::default();
        let doc = engine.to_csv(&ocr_results(), ExportMode::ObjectRows).unwrap();
        engine.trigger_download(&doc, "ocr_results.csv", &sink);

        assert!(sink.saved_paths().is_empty());
        assert_eq!(sink.registry().live_count(), 0);
    }
}
