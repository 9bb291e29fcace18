use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ChartSet, ExtractionView, ScreenState, GENERIC_FAILURE};
use crate::domain::error::Result;
use crate::domain::csv::ExportMode;
use crate::domain::extraction::ExtractionResult;
use crate::domain::ocr_api::{SlipExtractionResponse, SlipType};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SlipUploadState {
    pub slip_type: SlipType,
    /// Names of the files sent with the last submission
    pub files: Vec<String>,
    pub extracted: Option<ExtractionView>,
    pub loading: bool,
    pub error: Option<String>,
}

impl SlipUploadState {
    pub fn extraction(&self) -> Option<&ExtractionResult> {
        self.extracted.as_ref().map(|view| &view.data)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlipUploadAction {
    SlipTypeChanged(SlipType),
    /// Submission refused before any request went out
    Rejected(String),
    SubmitStarted(Vec<String>),
    Succeeded(ExtractionView),
    Failed,
}

/// Read a slip extraction answer as per-file field maps
pub fn slip_view(response: SlipExtractionResponse) -> Result<ExtractionView> {
    let raw = Value::Object(response.extracted_data.into_iter().collect());
    let data = ExtractionResult::from_json(ExportMode::FlatMapping, raw)?;
    Ok(ExtractionView {
        data,
        charts: ChartSet {
            pie: response.pie_chart_files,
            bar: response.bar_chart_files,
        },
    })
}

impl ScreenState for SlipUploadState {
    type Action = SlipUploadAction;

    fn reduce(self, action: SlipUploadAction) -> Self {
        match action {
            SlipUploadAction::SlipTypeChanged(slip_type) => Self { slip_type, ..self },
            SlipUploadAction::Rejected(message) => Self {
                error: Some(message),
                ..self
            },
            SlipUploadAction::SubmitStarted(files) => Self {
                files,
                loading: true,
                error: None,
                ..self
            },
            SlipUploadAction::Succeeded(view) => Self {
                extracted: Some(view),
                loading: false,
                error: None,
                ..self
            },
            SlipUploadAction::Failed => Self {
                loading: false,
                error: Some(GENERIC_FAILURE.to_string()),
                ..self
            },
        }
    }

    fn is_loading(&self) -> bool {
        self.loading
    }
}
