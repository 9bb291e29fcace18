use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use super::{ScreenState, SelectedFile, GENERIC_FAILURE, NO_FILE_CHOSEN};
use crate::domain::extraction::{ExtractionResult, Record};
use crate::domain::ocr_api::{
    CropParams, CropProcessRequest, CropProcessResponse, EasyOcrParams, TesseractParams,
};

/// Tuning knobs sent along with a crop-and-recognize request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Hyperparameters {
    #[validate(range(min = 0.0, max = 1.0))]
    pub upper_percent: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub lower_percent: f64,
    #[validate(range(min = 1, max = 20))]
    pub max_cropped_images: u8,
    #[validate(range(min = 0, max = 13))]
    pub tesseract_psm: u8,
    #[validate(range(min = 0, max = 3))]
    pub tesseract_oem: u8,
    pub easyocr_gpu: bool,
    #[validate(length(min = 1))]
    pub easyocr_languages: Vec<String>,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            upper_percent: 0.0,
            lower_percent: 0.0,
            max_cropped_images: 10,
            tesseract_psm: 3,
            tesseract_oem: 3,
            easyocr_gpu: true,
            easyocr_languages: vec!["en".to_string()],
        }
    }
}

impl Hyperparameters {
    pub fn to_request(&self, file_url: String) -> CropProcessRequest {
        CropProcessRequest {
            file_url,
            crop_params: CropParams {
                upper_percent: self.upper_percent,
                lower_percent: self.lower_percent,
            },
            max_cropped_images: self.max_cropped_images,
            tesseract_params: TesseractParams {
                psm: self.tesseract_psm,
                oem: self.tesseract_oem,
            },
            easyocr_params: EasyOcrParams {
                languages: self.easyocr_languages.clone(),
                gpu: self.easyocr_gpu,
            },
        }
    }
}

/// A single slider change; values are clamped to the slider range
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hyperparameter {
    UpperPercent(f64),
    LowerPercent(f64),
    MaxCroppedImages(u8),
    TesseractPsm(u8),
    TesseractOem(u8),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropOcrState {
    pub file: Option<SelectedFile>,
    pub file_name: String,
    /// Object URL of the selected file, or its path when unreadable
    pub preview: Option<String>,
    pub hyperparameters: Hyperparameters,
    /// Tesseract renders followed by EasyOCR renders
    pub processed_images: Vec<String>,
    pub ocr_results: Option<Vec<Record>>,
    pub results_csv_url: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for CropOcrState {
    fn default() -> Self {
        Self {
            file: None,
            file_name: NO_FILE_CHOSEN.to_string(),
            preview: None,
            hyperparameters: Hyperparameters::default(),
            processed_images: Vec::new(),
            ocr_results: None,
            results_csv_url: None,
            loading: false,
            error: None,
        }
    }
}

impl CropOcrState {
    /// Recognized words as an exportable result, once a run succeeded
    pub fn extraction(&self) -> Option<ExtractionResult> {
        self.ocr_results
            .as_ref()
            .map(|rows| ExtractionResult::ObjectRows(rows.clone()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CropOcrAction {
    FileSelected {
        path: Option<PathBuf>,
        preview: Option<String>,
    },
    HyperparameterChanged(Hyperparameter),
    GpuToggled,
    /// Blank entries are dropped; an empty list keeps the current one
    LanguagesChanged(Vec<String>),
    /// Submission refused before any request went out
    Rejected(String),
    SubmitStarted,
    Succeeded(CropProcessResponse),
    Failed,
}

impl ScreenState for CropOcrState {
    type Action = CropOcrAction;

    fn reduce(self, action: CropOcrAction) -> Self {
        match action {
            CropOcrAction::FileSelected { path, preview } => {
                let file = path.map(SelectedFile::new);
                let file_name = file
                    .as_ref()
                    .map(|file| file.file_name.clone())
                    .unwrap_or_else(|| NO_FILE_CHOSEN.to_string());
                let preview = file
                    .as_ref()
                    .map(|file| preview.unwrap_or_else(|| file.path.display().to_string()));
                Self {
                    file,
                    file_name,
                    preview,
                    ..self
                }
            }
            CropOcrAction::HyperparameterChanged(change) => {
                let mut hyperparameters = self.hyperparameters;
                match change {
                    Hyperparameter::UpperPercent(value) => {
                        hyperparameters.upper_percent = clamp_percent(value)
                    }
                    Hyperparameter::LowerPercent(value) => {
                        hyperparameters.lower_percent = clamp_percent(value)
                    }
                    Hyperparameter::MaxCroppedImages(value) => {
                        hyperparameters.max_cropped_images = value.clamp(1, 20)
                    }
                    Hyperparameter::TesseractPsm(value) => {
                        hyperparameters.tesseract_psm = value.min(13)
                    }
                    Hyperparameter::TesseractOem(value) => {
                        hyperparameters.tesseract_oem = value.min(3)
                    }
                }
                Self {
                    hyperparameters,
                    ..self
                }
            }
            CropOcrAction::GpuToggled => {
                let mut hyperparameters = self.hyperparameters;
                hyperparameters.easyocr_gpu = !hyperparameters.easyocr_gpu;
                Self {
                    hyperparameters,
                    ..self
                }
            }
            CropOcrAction::LanguagesChanged(languages) => {
                let languages: Vec<String> = languages
                    .into_iter()
                    .map(|language| language.trim().to_string())
                    .filter(|language| !language.is_empty())
                    .collect();
                if languages.is_empty() {
                    return self;
                }
                let mut hyperparameters = self.hyperparameters;
                hyperparameters.easyocr_languages = languages;
                Self {
                    hyperparameters,
                    ..self
                }
            }
            CropOcrAction::Rejected(message) => Self {
                error: Some(message),
                ..self
            },
            CropOcrAction::SubmitStarted => Self {
                loading: true,
                error: None,
                ..self
            },
            CropOcrAction::Succeeded(response) => {
                let mut processed_images = response.tesseract_image_urls;
                processed_images.extend(response.easyocr_image_urls);
                Self {
                    processed_images,
                    ocr_results: Some(response.ocr_results),
                    results_csv_url: response.results_csv_url,
                    loading: false,
                    error: None,
                    ..self
                }
            }
            CropOcrAction::Failed => Self {
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

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_selection_updates_label() {
        let state = CropOcrState::default().reduce(CropOcrAction::FileSelected {
            path: Some(PathBuf::from("scans/slip.pdf")),
            preview: Some("blob:ocrdesk/1".into()),
        });
        assert_eq!(state.file_name, "slip.pdf");
        assert_eq!(state.preview.as_deref(), Some("blob:ocrdesk/1"));

        let cleared = state.reduce(CropOcrAction::FileSelected {
            path: None,
            preview: Some("blob:ocrdesk/2".into()),
        });
        assert_eq!(cleared.file_name, NO_FILE_CHOSEN);
        assert!(cleared.file.is_none());
        assert_eq!(cleared.preview, None);
    }

    #[test]
    fn test_preview_falls_back_to_path() {
        let state = CropOcrState::default().reduce(CropOcrAction::FileSelected {
            path: Some(PathBuf::from("scans/slip.png")),
            preview: None,
        });
        assert_eq!(
            state.preview,
            Some(PathBuf::from("scans/slip.png").display().to_string())
        );
    }

    #[test]
    fn test_sliders_clamp_to_range() {
        let state = CropOcrState::default()
            .reduce(CropOcrAction::HyperparameterChanged(Hyperparameter::UpperPercent(1.7)))
            .reduce(CropOcrAction::HyperparameterChanged(Hyperparameter::TesseractPsm(40)))
            .reduce(CropOcrAction::HyperparameterChanged(Hyperparameter::MaxCroppedImages(0)))
            .reduce(CropOcrAction::GpuToggled);

        assert_eq!(state.hyperparameters.upper_percent, 1.0);
        assert_eq!(state.hyperparameters.tesseract_psm, 13);
        assert_eq!(state.hyperparameters.max_cropped_images, 1);
        assert!(!state.hyperparameters.easyocr_gpu);
        assert!(state.hyperparameters.validate().is_ok());
    }

    #[test]
    fn test_languages_ignore_blank_input() {
        let state = CropOcrState::default()
            .reduce(CropOcrAction::LanguagesChanged(vec![" en ".into(), "id".into(), "".into()]));
        assert_eq!(state.hyperparameters.easyocr_languages, vec!["en", "id"]);

        let unchanged = state.reduce(CropOcrAction::LanguagesChanged(vec!["  ".into()]));
        assert_eq!(unchanged.hyperparameters.easyocr_languages, vec!["en", "id"]);
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let params = Hyperparameters {
            lower_percent: -0.5,
            easyocr_languages: Vec::new(),
            ..Hyperparameters::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_success_concatenates_image_urls() {
        let response: CropProcessResponse = serde_json::from_value(json!({
            "tesseract_image_urls": ["t0", "t1"],
            "easyocr_image_urls": ["e0"],
            "ocr_results": [{"Recognized Text": "Pay", "Confidence Score": 90, "OCR Model": "Tesseract"}]
        }))
        .unwrap();

        let state = CropOcrState::default()
            .reduce(CropOcrAction::SubmitStarted)
            .reduce(CropOcrAction::Succeeded(response));

        assert!(!state.loading);
        assert_eq!(state.processed_images, vec!["t0", "t1", "e0"]);
        assert!(matches!(
            state.extraction(),
            Some(ExtractionResult::ObjectRows(rows)) if rows.len() == 1
        ));
    }

    #[test]
    fn test_failure_keeps_previous_results() {
        let response = CropProcessResponse {
            ocr_results: vec![Record::new()],
            ..CropProcessResponse::default()
        };
        let state = CropOcrState::default()
            .reduce(CropOcrAction::Succeeded(response))
            .reduce(CropOcrAction::SubmitStarted);
        assert!(state.loading);
        assert_eq!(state.error, None);

        let failed = state.reduce(CropOcrAction::Failed);
        assert!(!failed.loading);
        assert_eq!(failed.error.as_deref(), Some(GENERIC_FAILURE));
        assert!(failed.ocr_results.is_some());
    }

    #[test]
    fn test_request_carries_hyperparameters() {
        let request = Hyperparameters::default().to_request("https://cdn/slip.png".into());
        assert_eq!(request.max_cropped_images, 10);
        assert_eq!(request.tesseract_params.psm, 3);
        assert_eq!(request.easyocr_params.languages, vec!["en"]);
    }
}
