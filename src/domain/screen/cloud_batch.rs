use serde::{Deserialize, Serialize};

use super::{text_entries, ChartSet, ExtractionView, ScreenState, GENERIC_FAILURE};
use crate::domain::extraction::{label_value_tables, ExtractionResult, LabeledImage};
use crate::domain::ocr_api::{CloudBatchRequest, SlipExtractionResponse, SlipType};

pub const DEFAULT_IMAGE_COUNT: u8 = 10;
pub const MAX_IMAGE_COUNT: u8 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudBatchState {
    pub slip_type: SlipType,
    pub num_images: u8,
    pub extracted: Option<ExtractionView>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for CloudBatchState {
    fn default() -> Self {
        Self {
            slip_type: SlipType::default(),
            num_images: DEFAULT_IMAGE_COUNT,
            extracted: None,
            loading: false,
            error: None,
        }
    }
}

impl CloudBatchState {
    /// The folder is named after the slip type
    pub fn request(&self) -> CloudBatchRequest {
        CloudBatchRequest {
            folder_name: self.slip_type.as_str().to_string(),
            num_images: self.num_images,
            input_type: self.slip_type,
        }
    }

    pub fn extraction(&self) -> Option<&ExtractionResult> {
        self.extracted.as_ref().map(|view| &view.data)
    }

    /// Label/value tables for display, one per image
    pub fn tables(&self) -> Vec<LabeledImage> {
        match self.extraction() {
            Some(ExtractionResult::LabelValueText(texts)) => label_value_tables(texts),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CloudBatchAction {
    SlipTypeChanged(SlipType),
    ImageCountChanged(u8),
    SubmitStarted,
    Succeeded(ExtractionView),
    Failed,
}

/// Read a cloud batch answer as per-image label/value text
pub fn cloud_view(response: SlipExtractionResponse) -> ExtractionView {
    ExtractionView {
        data: ExtractionResult::LabelValueText(text_entries(response.extracted_data)),
        charts: ChartSet {
            pie: response.pie_chart_files,
            bar: response.bar_chart_files,
        },
    }
}

impl ScreenState for CloudBatchState {
    type Action = CloudBatchAction;

    fn reduce(self, action: CloudBatchAction) -> Self {
        match action {
            CloudBatchAction::SlipTypeChanged(slip_type) => Self { slip_type, ..self },
            CloudBatchAction::ImageCountChanged(count) => Self {
                num_images: count.clamp(1, MAX_IMAGE_COUNT),
                ..self
            },
            CloudBatchAction::SubmitStarted => Self {
                loading: true,
                error: None,
                ..self
            },
            CloudBatchAction::Succeeded(view) => Self {
                extracted: Some(view),
                loading: false,
                error: None,
                ..self
            },
            CloudBatchAction::Failed => Self {
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

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    #[test]
    fn test_image_count_is_clamped() {
        let state = CloudBatchState::default().reduce(CloudBatchAction::ImageCountChanged(99));
        assert_eq!(state.num_images, MAX_IMAGE_COUNT);

        let state = state.reduce(CloudBatchAction::ImageCountChanged(0));
        assert_eq!(state.num_images, 1);
    }

    #[test]
    fn test_request_uses_slip_type_as_folder() {
        let state = CloudBatchState::default().reduce(CloudBatchAction::SlipTypeChanged(SlipType::Balance));
        let request = state.request();
        assert_eq!(request.folder_name, "balance slip");
        assert_eq!(request.num_images, DEFAULT_IMAGE_COUNT);
    }

    #[test]
    fn test_tables_after_success() {
        let mut extracted_data = IndexMap::new();
        extracted_data.insert("img1".to_string(), json!("Name: Alice\nAge: 30\n\n"));
        let view = cloud_view(SlipExtractionResponse {
            extracted_data,
            ..SlipExtractionResponse::default()
        });

        let state = CloudBatchState::default()
            .reduce(CloudBatchAction::SubmitStarted)
            .reduce(CloudBatchAction::Succeeded(view));

        let tables = state.tables();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].entries[1].value, "30");
    }
}
