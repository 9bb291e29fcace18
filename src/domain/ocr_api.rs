// ============================================================
// OCR BACKEND CONTRACT
// ============================================================
// Request and response bodies of the external OCR service

use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::AppError;
use crate::domain::extraction::Record;

/// Kind of financial slip the backend prompts its extractor with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlipType {
    #[default]
    #[serde(rename = "salary slip")]
    Salary,
    #[serde(rename = "balance slip")]
    Balance,
    #[serde(rename = "cash slip")]
    Cash,
}

impl SlipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlipType::Salary => "salary slip",
            SlipType::Balance => "balance slip",
            SlipType::Cash => "cash slip",
        }
    }
}

impl fmt::Display for SlipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlipType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase().replace('-', " ").replace('_', " ");
        match normalized.as_str() {
            "salary" | "salary slip" => Ok(SlipType::Salary),
            "balance" | "balance slip" => Ok(SlipType::Balance),
            "cash" | "cash slip" => Ok(SlipType::Cash),
            other => Err(AppError::ValidationError(format!(
                "Unknown slip type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropParams {
    pub upper_percent: f64,
    pub lower_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TesseractParams {
    pub psm: u8,
    pub oem: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EasyOcrParams {
    pub languages: Vec<String>,
    pub gpu: bool,
}

/// Body of the `/api/upload` answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_url: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// JSON body for crop-and-recognize processing of an uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProcessRequest {
    pub file_url: String,
    pub crop_params: CropParams,
    pub max_cropped_images: u8,
    pub tesseract_params: TesseractParams,
    pub easyocr_params: EasyOcrParams,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CropProcessResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results_csv_url: Option<String>,
    #[serde(default)]
    pub tesseract_image_urls: Vec<String>,
    #[serde(default)]
    pub easyocr_image_urls: Vec<String>,
    #[serde(default)]
    pub ocr_results: Vec<Record>,
}

/// JSON body for batch extraction over images stored in the cloud
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudBatchRequest {
    pub folder_name: String,
    pub num_images: u8,
    pub input_type: SlipType,
}

/// Extraction answer shared by the slip upload and cloud batch endpoints
///
/// `extracted_data` values are objects or free text depending on the
/// extractor; the caller decides which shape to read them as.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SlipExtractionResponse {
    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub extracted_data: IndexMap<String, Value>,
    #[serde(default)]
    pub pie_chart_files: Vec<String>,
    #[serde(default)]
    pub bar_chart_files: Vec<String>,
}

/// The extractor answers `[]` when the path it was given is invalid
fn map_or_empty_list<'de, D>(deserializer: D) -> Result<IndexMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Map(IndexMap<String, Value>),
        List(Vec<Value>),
    }

    match Shape::deserialize(deserializer)? {
        Shape::Map(entries) => Ok(entries),
        Shape::List(items) if items.is_empty() => Ok(IndexMap::new()),
        Shape::List(items) => Err(de::Error::custom(format!(
            "expected an object of entries, found a list of {} items",
            items.len()
        ))),
    }
}

/// `{ "error": "..." }` body returned with non-2xx statuses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendErrorBody {
    pub error: String,
}
