use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use super::screen_store::{ScreenStore, SubmitOutcome};
use crate::domain::ocr_api::CropParams;
use crate::domain::screen::{QuickProcessAction, QuickProcessState, MISSING_FILE};
use crate::infrastructure::backend::OcrBackend;
use crate::infrastructure::logging::{add_log, LogBuffer};
use crate::infrastructure::storage::read_upload;

const LOG_SOURCE: &str = "QuickProcess";

/// One file, one request, raw JSON answer
pub struct QuickProcessController {
    backend: Arc<dyn OcrBackend>,
    logs: LogBuffer,
    store: ScreenStore<QuickProcessState>,
}

impl QuickProcessController {
    pub fn new(backend: Arc<dyn OcrBackend>, logs: LogBuffer) -> Self {
        Self {
            backend,
            logs,
            store: ScreenStore::new(),
        }
    }

    pub fn state(&self) -> QuickProcessState {
        self.store.snapshot()
    }

    pub fn select_file(&self, path: Option<PathBuf>) -> QuickProcessState {
        self.store.dispatch(QuickProcessAction::FileSelected(path))
    }

    pub fn set_crop(&self, crop: CropParams) -> QuickProcessState {
        self.store.dispatch(QuickProcessAction::CropChanged(crop))
    }

    pub fn result(&self) -> Option<Value> {
        self.store.snapshot().result
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let snapshot = self.store.snapshot();
        let Some(file) = snapshot.file else {
            self.store
                .dispatch(QuickProcessAction::Rejected(MISSING_FILE.to_string()));
            return SubmitOutcome::Rejected(MISSING_FILE.to_string());
        };

        let upload = match read_upload(&file.path).await {
            Ok(upload) => upload,
            Err(err) => {
                self.store
                    .dispatch(QuickProcessAction::Rejected(err.to_string()));
                return SubmitOutcome::Rejected(err.to_string());
            }
        };

        if !self.store.begin(QuickProcessAction::SubmitStarted) {
            return SubmitOutcome::Ignored;
        }

        match self.backend.process_file(upload, snapshot.crop).await {
            Ok(result) => {
                add_log(
                    &self.logs,
                    "INFO",
                    LOG_SOURCE,
                    &format!("Processed {}", file.file_name),
                );
                self.store.dispatch(QuickProcessAction::Succeeded(result));
                SubmitOutcome::Completed
            }
            Err(err) => {
                add_log(
                    &self.logs,
                    "ERROR",
                    LOG_SOURCE,
                    &format!("Error uploading file: {}", err),
                );
                let state = self.store.dispatch(QuickProcessAction::Failed);
                SubmitOutcome::Failed(state.error.unwrap_or_default())
            }
        }
    }
}
