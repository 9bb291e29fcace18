// ============================================================
// SLIP UPLOAD SCREEN
// ============================================================
// Send a batch of slip images for field extraction and export the
// per-file fields as one table

use std::path::PathBuf;
use std::sync::Arc;

use super::screen_store::{ScreenStore, SubmitOutcome};
use super::tabular_export::{CsvExport, TabularExportEngine};
use crate::domain::error::Result;
use crate::domain::ocr_api::SlipType;
use crate::domain::screen::{
    slip_view, ExtractionView, SlipUploadAction, SlipUploadState, MISSING_FILE,
};
use crate::domain::upload::UploadFile;
use crate::infrastructure::backend::OcrBackend;
use crate::infrastructure::download::DownloadSink;
use crate::infrastructure::logging::{add_log, LogBuffer};
use crate::infrastructure::storage::read_upload;

pub const EXTRACTED_DATA_FILE: &str = "extracted_data.csv";

const LOG_SOURCE: &str = "SlipUpload";

pub struct SlipUploadController {
    backend: Arc<dyn OcrBackend>,
    engine: Arc<TabularExportEngine>,
    logs: LogBuffer,
    store: ScreenStore<SlipUploadState>,
}

impl SlipUploadController {
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

    pub fn state(&self) -> SlipUploadState {
        self.store.snapshot()
    }

    pub fn set_slip_type(&self, slip_type: SlipType) -> SlipUploadState {
        self.store.dispatch(SlipUploadAction::SlipTypeChanged(slip_type))
    }

    /// Read every file, then send them in one request.
    ///
    /// A file outside the allow-list rejects the whole batch before
    /// anything is sent.
    pub async fn submit(&self, paths: &[PathBuf]) -> SubmitOutcome {
        if paths.is_empty() {
            return self.reject(MISSING_FILE.to_string());
        }

        let files = match Self::read_all(paths).await {
            Ok(files) => files,
            Err(err) => {
                add_log(&self.logs, "WARN", LOG_SOURCE, &err.to_string());
                return self.reject(err.to_string());
            }
        };

        let names = files.iter().map(|file| file.file_name.clone()).collect();
        if !self.store.begin(SlipUploadAction::SubmitStarted(names)) {
            add_log(
                &self.logs,
                "INFO",
                LOG_SOURCE,
                "Submit ignored: a request is already in flight",
            );
            return SubmitOutcome::Ignored;
        }

        let slip_type = self.store.snapshot().slip_type;
        match self.run(files, slip_type).await {
            Ok(view) => {
                add_log(
                    &self.logs,
                    "INFO",
                    LOG_SOURCE,
                    &format!("Extracted {} {} entries", view.data.len(), slip_type),
                );
                self.store.dispatch(SlipUploadAction::Succeeded(view));
                SubmitOutcome::Completed
            }
            Err(err) => {
                add_log(
                    &self.logs,
                    "ERROR",
                    LOG_SOURCE,
                    &format!("Error during file processing: {}", err),
                );
                let state = self.store.dispatch(SlipUploadAction::Failed);
                SubmitOutcome::Failed(state.error.unwrap_or_default())
            }
        }
    }

    fn reject(&self, message: String) -> SubmitOutcome {
        self.store
            .dispatch(SlipUploadAction::Rejected(message.clone()));
        SubmitOutcome::Rejected(message)
    }

    async fn read_all(paths: &[PathBuf]) -> Result<Vec<UploadFile>> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(read_upload(path).await?);
        }
        Ok(files)
    }

    async fn run(&self, files: Vec<UploadFile>, slip_type: SlipType) -> Result<ExtractionView> {
        let response = self.backend.process_slips(files, slip_type).await?;
        slip_view(response)
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
