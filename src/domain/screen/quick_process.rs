use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use super::{ScreenState, SelectedFile, GENERIC_FAILURE};
use crate::domain::ocr_api::CropParams;

/// Single-request page: upload with crop percentages, show the raw answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickProcessState {
    pub file: Option<SelectedFile>,
    pub crop: CropParams,
    pub result: Option<Value>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for QuickProcessState {
    fn default() -> Self {
        Self {
            file: None,
            crop: CropParams {
                upper_percent: 0.02,
                lower_percent: 0.64,
            },
            result: None,
            loading: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuickProcessAction {
    FileSelected(Option<PathBuf>),
    CropChanged(CropParams),
    Rejected(String),
    SubmitStarted,
    Succeeded(Value),
    Failed,
}

impl ScreenState for QuickProcessState {
    type Action = QuickProcessAction;

    fn reduce(self, action: QuickProcessAction) -> Self {
        match action {
            QuickProcessAction::FileSelected(path) => Self {
                file: path.map(SelectedFile::new),
                ..self
            },
            QuickProcessAction::CropChanged(crop) => Self { crop, ..self },
            QuickProcessAction::Rejected(message) => Self {
                error: Some(message),
                ..self
            },
            QuickProcessAction::SubmitStarted => Self {
                loading: true,
                error: None,
                ..self
            },
            QuickProcessAction::Succeeded(result) => Self {
                result: Some(result),
                loading: false,
                ..self
            },
            QuickProcessAction::Failed => Self {
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
