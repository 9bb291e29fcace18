// ============================================================
// CLOUD BATCH SCREEN
// ============================================================
// Extract label/value text from slips already stored in the backend's
// cloud folder

use std::sync::Arc;

use super::screen_store::{ScreenStore, SubmitOutcome};
use super::tabular_export::{CsvExport, TabularExportEngine};
use super::slip_upload::EXTRACTED_DATA_FILE;
use crate::domain::extraction::LabeledImage;
use crate::domain::ocr_api::SlipType;
use crate::domain::screen::{cloud_view, CloudBatchAction, CloudBatchState};
use crate::infrastructure::backend::OcrBackend;
use crate::infrastructure::download::DownloadSink;
use crate::infrastructure::logging::{add_log, LogBuffer};

const LOG_SOURCE: &str = "CloudBatch";

pub struct CloudBatchController {
    backend: Arc<dyn OcrBackend>,
    engine: Arc<TabularExportEngine>,
    logs: LogBuffer,
    store: ScreenStore<CloudBatchState>,
}

impl CloudBatchController {
    pub fn new(
        backend: Arc<dyn OcrBackend>,
        engine: Arc<TabularExportEngine>,
        logs: LogBuffer,
    ) -> Self {
        Self {
            backend,
            engine,
            logs,
            store: ScreenStore::new(),
        }
    }

    pub fn state(&self) -> CloudBatchState {
        self.store.snapshot()
    }

    pub fn set_slip_type(&self, slip_type: SlipType) -> CloudBatchState {
        self.store.dispatch(CloudBatchAction::SlipTypeChanged(slip_type))
    }

    pub fn set_image_count(&self, count: u8) -> CloudBatchState {
        self.store.dispatch(CloudBatchAction::ImageCountChanged(count))
    }

    pub async fn submit(&self) -> SubmitOutcome {
        if !self.store.begin(CloudBatchAction::SubmitStarted) {
            add_log(
                &self.logs,
                "INFO",
                LOG_SOURCE,
                "Submit ignored: a request is already in flight",
            );
            return SubmitOutcome::Ignored;
        }

        let request = self.store.snapshot().request();
        match self.backend.process_cloud_batch(&request).await {
            Ok(response) => {
                let view = cloud_view(response);
                add_log(
                    &self.logs,
                    "INFO",
                    LOG_SOURCE,
                    &format!(
                        "Extracted {} of {} images from '{}'",
                        view.data.len(),
                        request.num_images,
                        request.folder_name
                    ),
                );
                self.store.dispatch(CloudBatchAction::Succeeded(view));
                SubmitOutcome::Completed
            }
            Err(err) => {
                add_log(
                    &self.logs,
                    "ERROR",
                    LOG_SOURCE,
                    &format!("Error during file processing: {}", err),
                );
                let state = self.store.dispatch(CloudBatchAction::Failed);
                SubmitOutcome::Failed(state.error.unwrap_or_default())
            }
        }
    }

    /// Per-image label/value tables of the last result
    pub fn tables(&self) -> Vec<LabeledImage> {
        self.store.snapshot().tables()
    }

    pub fn csv_export(&self) -> Option<CsvExport> {
        let state = self.store.snapshot();
        let extraction = state.extraction()?;
        self.engine.download_action(extraction, EXTRACTED_DATA_FILE)
    }

    pub fn download_csv(&self, sink: &dyn DownloadSink) -> bool {
        match self.csv_export() {
            Some(export) => {
                self.engine
                    .trigger_download(&export.document, &export.filename, sink);
                true
            }
            None => false,
        }
    }
}
