// ============================================================
// EXTRACTION RESULTS
// ============================================================
// Shapes the OCR backend returns, tagged by the endpoint that produced them

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::csv::ExportMode;
use crate::domain::error::{AppError, Result};

/// One record of an object-rows result; keys keep insertion order
pub type Record = IndexMap<String, Value>;

/// Extraction payload, discriminated by the screen that requested it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum ExtractionResult {
    /// Ordered records with uniform keys (crop OCR results)
    ObjectRows(Vec<Record>),
    /// Key to newline-delimited `label: value` text (cloud batch)
    LabelValueText(IndexMap<String, String>),
    /// Key to field map, field sets may differ per key (slip upload)
    FlatMapping(IndexMap<String, Record>),
}

impl ExtractionResult {
    /// The export mode matching this variant
    pub fn mode(&self) -> ExportMode {
        match self {
            ExtractionResult::ObjectRows(_) => ExportMode::ObjectRows,
            ExtractionResult::LabelValueText(_) => ExportMode::LabelValueText,
            ExtractionResult::FlatMapping(_) => ExportMode::FlatMapping,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ExtractionResult::ObjectRows(rows) => rows.len(),
            ExtractionResult::LabelValueText(texts) => texts.len(),
            ExtractionResult::FlatMapping(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Interpret an untyped JSON payload as the shape `mode` names.
    ///
    /// Flat-mapping accepts text entries too; they are split into
    /// label/value fields the same way label-value text is.
    pub fn from_json(mode: ExportMode, value: Value) -> Result<Self> {
        match mode {
            ExportMode::ObjectRows => {
                let rows: Vec<Record> = serde_json::from_value(value).map_err(|e| {
                    AppError::ParseError(format!("Expected an array of objects: {}", e))
                })?;
                Ok(ExtractionResult::ObjectRows(rows))
            }
            ExportMode::LabelValueText => {
                let texts: IndexMap<String, String> =
                    serde_json::from_value(value).map_err(|e| {
                        AppError::ParseError(format!("Expected a map of key to text: {}", e))
                    })?;
                Ok(ExtractionResult::LabelValueText(texts))
            }
            ExportMode::FlatMapping => {
                let raw: IndexMap<String, Value> = serde_json::from_value(value).map_err(|e| {
                    AppError::ParseError(format!("Expected a map of key to fields: {}", e))
                })?;
                let mut entries = IndexMap::with_capacity(raw.len());
                for (key, entry) in raw {
                    let record = match entry {
                        Value::Object(fields) => fields.into_iter().collect(),
                        Value::String(text) => record_from_text(&text),
                        other => {
                            return Err(AppError::ParseError(format!(
                                "Entry '{}' is neither an object nor text: {}",
                                key, other
                            )))
                        }
                    };
                    entries.insert(key, record);
                }
                Ok(ExtractionResult::FlatMapping(entries))
            }
        }
    }
}

/// A single `label: value` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelValue {
    pub label: String,
    pub value: String,
}

/// Label/value rows extracted for one image, for tabular display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledImage {
    pub image_name: String,
    pub entries: Vec<LabelValue>,
}

/// Split `text` into label/value pairs on the first `:` of each line.
///
/// Lines without a colon, or whose trimmed label or value is empty, are
/// skipped.
pub fn parse_label_value_lines(text: &str) -> Vec<LabelValue> {
    text.lines()
        .filter_map(|line| {
            let (label, value) = line.split_once(':')?;
            let label = label.trim();
            let value = value.trim();
            if label.is_empty() || value.is_empty() {
                return None;
            }
            Some(LabelValue {
                label: label.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

/// Group parsed label/value lines per image, preserving key order
pub fn label_value_tables(texts: &IndexMap<String, String>) -> Vec<LabeledImage> {
    texts
        .iter()
        .map(|(image_name, text)| LabeledImage {
            image_name: image_name.clone(),
            entries: parse_label_value_lines(text),
        })
        .collect()
}

/// Fields of a text entry; a repeated label keeps its last value
pub fn record_from_text(text: &str) -> Record {
    parse_label_value_lines(text)
        .into_iter()
        .map(|pair| (pair.label, Value::String(pair.value)))
        .collect()
}
