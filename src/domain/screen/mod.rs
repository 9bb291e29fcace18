// ============================================================
// SCREEN STATE
// ============================================================
// One immutable state struct per screen, advanced by a pure reducer

mod cloud_batch;
mod crop_ocr;
mod quick_process;
mod slip_upload;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::domain::csv::cell_text;
use crate::domain::extraction::ExtractionResult;

pub use cloud_batch::{
    cloud_view, CloudBatchAction, CloudBatchState, DEFAULT_IMAGE_COUNT, MAX_IMAGE_COUNT,
};
pub use crop_ocr::{CropOcrAction, CropOcrState, Hyperparameter, Hyperparameters};
pub use quick_process::{QuickProcessAction, QuickProcessState};
pub use slip_upload::{slip_view, SlipUploadAction, SlipUploadState};

/// Message shown for every backend failure, transient or not
pub const GENERIC_FAILURE: &str = "An error occurred during file processing.";

/// Shown when submit is pressed before a file is chosen
pub const MISSING_FILE: &str = "Please select a file to upload.";

/// Label shown before any file is chosen
pub const NO_FILE_CHOSEN: &str = "No file chosen";

/// A screen's state machine: reducer plus the in-flight flag the
/// submission guard reads.
pub trait ScreenState: Clone + Default + Send + 'static {
    type Action: Send;

    fn reduce(self, action: Self::Action) -> Self;

    fn is_loading(&self) -> bool;
}

/// A local file picked for upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub file_name: String,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = display_name(&path);
        Self { path, file_name }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Chart image URLs generated by the backend
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChartSet {
    pub pie: Vec<String>,
    pub bar: Vec<String>,
}

impl ChartSet {
    pub fn is_empty(&self) -> bool {
        self.pie.is_empty() && self.bar.is_empty()
    }
}

/// Extracted data plus the charts drawn from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionView {
    pub data: ExtractionResult,
    pub charts: ChartSet,
}

/// Read every entry as text; structured entries keep their JSON text
pub(crate) fn text_entries(raw: IndexMap<String, Value>) -> IndexMap<String, String> {
    raw.into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(text) => text,
                other => cell_text(&other),
            };
            (key, text)
        })
        .collect()
}
