pub mod use_cases;

pub use use_cases::cloud_batch::CloudBatchController;
pub use use_cases::crop_ocr::{CropOcrController, OCR_RESULTS_FILE};
pub use use_cases::quick_process::QuickProcessController;
pub use use_cases::screen_store::{ScreenStore, SubmitOutcome};
pub use use_cases::slip_upload::{SlipUploadController, EXTRACTED_DATA_FILE};
pub use use_cases::tabular_export::{CsvExport, TabularExportEngine};
