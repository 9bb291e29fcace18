// ============================================================
// CROP OCR SCREEN
// ============================================================
// Upload one file, run both OCR engines on its cropped pages, export
// the recognized words

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use validator::Validate;

use super::screen_store::{ScreenStore, SubmitOutcome};
use super::tabular_export::{CsvExport, TabularExportEngine};
use crate::domain::error::Result;
use crate::domain::ocr_api::CropProcessResponse;
use crate::domain::screen::{
    CropOcrAction, CropOcrState, Hyperparameter, Hyperparameters, MISSING_FILE,
};
use crate::infrastructure::backend::OcrBackend;
use crate::infrastructure::download::{Blob, BlobRegistry, DownloadSink, ObjectUrl};
use crate::infrastructure::logging::{add_log, LogBuffer};
use crate::infrastructure::storage::read_upload;

pub const OCR_RESULTS_FILE: &str = "ocr_results.csv";

const LOG_SOURCE: &str = "CropOcr";

pub struct CropOcrController {
    backend: Arc<dyn OcrBackend>,
    engine: Arc<TabularExportEngine>,
    logs: LogBuffer,
    store: ScreenStore<CropOcrState>,
    previews: BlobRegistry,
    /// Holds the live preview URL; replacing it revokes the old one
    preview: Mutex<Option<ObjectUrl>>,
}

impl CropOcrController {
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
            previews: BlobRegistry::new(),
            preview: Mutex::new(None),
        }
    }

    pub fn state(&self) -> CropOcrState {
        self.store.snapshot()
    }

    pub fn select_file(&self, path: Option<PathBuf>) -> CropOcrState {
        let handle = path.as_deref().and_then(|path| self.preview_url(path));
        let preview = handle.as_ref().map(|url| url.as_str().to_string());

        let mut slot = self
            .preview
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = handle;
        self.store
            .dispatch(CropOcrAction::FileSelected { path, preview })
    }

    /// Registry backing the preview URLs in `state().preview`
    pub fn previews(&self) -> &BlobRegistry {
        &self.previews
    }

    fn preview_url(&self, path: &Path) -> Option<ObjectUrl> {
        match std::fs::read(path) {
            Ok(bytes) => {
                let mime_type = mime_guess::from_path(path).first_or_octet_stream();
                Some(
                    self.previews
                        .create_object_url(Blob::new(bytes, mime_type.essence_str())),
                )
            }
            Err(err) => {
                add_log(
                    &self.logs,
                    "WARN",
                    LOG_SOURCE,
                    &format!("No preview for {}: {}", path.display(), err),
                );
                None
            }
        }
    }

    pub fn set_hyperparameter(&self, change: Hyperparameter) -> CropOcrState {
        self.store
            .dispatch(CropOcrAction::HyperparameterChanged(change))
    }

    pub fn toggle_gpu(&self) -> CropOcrState {
        self.store.dispatch(CropOcrAction::GpuToggled)
    }

    pub fn set_languages(&self, languages: Vec<String>) -> CropOcrState {
        self.store
            .dispatch(CropOcrAction::LanguagesChanged(languages))
    }

    /// Upload the selected file, then process it with the current
    /// hyperparameters. At most one request runs at a time.
    pub async fn submit(&self) -> SubmitOutcome {
        let snapshot = self.store.snapshot();
        let Some(file) = snapshot.file else {
            self.store
                .dispatch(CropOcrAction::Rejected(MISSING_FILE.to_string()));
            return SubmitOutcome::Rejected(MISSING_FILE.to_string());
        };

        if let Err(err) = snapshot.hyperparameters.validate() {
            let message = format!("Invalid hyperparameters: {}", err);
            self.store.dispatch(CropOcrAction::Rejected(message.clone()));
            return SubmitOutcome::Rejected(message);
        }

        if !self.store.begin(CropOcrAction::SubmitStarted) {
            add_log(
                &self.logs,
                "INFO",
                LOG_SOURCE,
                "Submit ignored: a request is already in flight",
            );
            return SubmitOutcome::Ignored;
        }

        match self.run(&file.path, &snapshot.hyperparameters).await {
            Ok(response) => {
                add_log(
                    &self.logs,
                    "INFO",
                    LOG_SOURCE,
                    &format!(
                        "Processed {}: {} images, {} recognized words",
                        file.file_name,
                        response.tesseract_image_urls.len() + response.easyocr_image_urls.len(),
                        response.ocr_results.len()
                    ),
                );
                self.store.dispatch(CropOcrAction::Succeeded(response));
                SubmitOutcome::Completed
            }
            Err(err) => {
                add_log(
                    &self.logs,
                    "ERROR",
                    LOG_SOURCE,
                    &format!("Error during file processing: {}", err),
                );
                let state = self.store.dispatch(CropOcrAction::Failed);
                SubmitOutcome::Failed(state.error.unwrap_or_default())
            }
        }
    }

    async fn run(
        &self,
        path: &Path,
        hyperparameters: &Hyperparameters,
    ) -> Result<CropProcessResponse> {
        let upload = read_upload(path).await?;
        let uploaded = self.backend.upload(upload).await?;
        add_log(
            &self.logs,
            "INFO",
            LOG_SOURCE,
            &format!("Uploaded to {}", uploaded.file_url),
        );

        let request = hyperparameters.to_request(uploaded.file_url);
        self.backend.process_crop(&request).await
    }

    /// Download action, absent until a run produced at least one word
    pub fn csv_export(&self) -> Option<CsvExport> {
        let extraction = self.store.snapshot().extraction()?;
        self.engine.download_action(&extraction, OCR_RESULTS_FILE)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::FakeBackend;
    use crate::domain::screen::{GENERIC_FAILURE, NO_FILE_CHOSEN};
    use crate::infrastructure::download::DirectoryDownloads;
    use crate::infrastructure::logging::{new_log_buffer, snapshot};

    fn controller(backend: Arc<FakeBackend>) -> (CropOcrController, LogBuffer) {
        let logs = new_log_buffer();
        let controller = CropOcrController::new(
            backend,
            Arc::new(TabularExportEngine::default()),
            logs.clone(),
        );
        (controller, logs)
    }

    fn slip_file(dir: &Path) -> PathBuf {
        let path = dir.join("slip.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        path
    }

    #[test]
    fn test_preview_url_follows_selection() {
        let dir = tempfile::tempdir().unwrap();
        let (controller, _) = controller(Arc::new(FakeBackend::default()));
        let first = slip_file(dir.path());
        let second = dir.path().join("slip.pdf");
        std::fs::write(&second, b"%PDF").unwrap();

        let state = controller.select_file(Some(first));
        let first_url = state.preview.unwrap();
        assert!(first_url.starts_with("blob:ocrdesk/"));
        let blob = controller.previews().resolve(&first_url).unwrap();
        assert_eq!(blob.mime_type, "image/png");

        let state = controller.select_file(Some(second));
        let second_url = state.preview.unwrap();
        assert_ne!(first_url, second_url);
        assert!(controller.previews().resolve(&first_url).is_none());
        assert_eq!(controller.previews().live_count(), 1);

        let cleared = controller.select_file(None);
        assert_eq!(cleared.preview, None);
        assert_eq!(controller.previews().live_count(), 0);
    }

    #[test]
    fn test_unreadable_file_previews_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let (controller, logs) = controller(Arc::new(FakeBackend::default()));
        let missing = dir.path().join("gone.png");

        let state = controller.select_file(Some(missing.clone()));
        assert_eq!(state.preview, Some(missing.display().to_string()));
        assert_eq!(controller.previews().live_count(), 0);
        assert!(snapshot(&logs).iter().any(|entry| entry.level == "WARN"));
    }

    #[tokio::test]
    async fn test_submit_without_file_is_rejected() {
        let backend = Arc::new(FakeBackend::default());
        let (controller, _) = controller(backend.clone());

        let outcome = controller.submit().await;
        assert_eq!(outcome, SubmitOutcome::Rejected(MISSING_FILE.to_string()));
        assert_eq!(backend.calls(), 0);
        assert_eq!(controller.state().file_name, NO_FILE_CHOSEN);
        assert_eq!(controller.state().error.as_deref(), Some(MISSING_FILE));
    }

    #[tokio::test]
    async fn test_submit_uploads_then_processes() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FakeBackend::default());
        let (controller, _) = controller(backend.clone());

        controller.select_file(Some(slip_file(dir.path())));
        controller.set_hyperparameter(Hyperparameter::UpperPercent(0.25));

        assert_eq!(controller.submit().await, SubmitOutcome::Completed);
        assert_eq!(backend.calls(), 2);

        let request = backend.last_crop_request().unwrap();
        assert_eq!(request.file_url, "https://cdn.example/slip.png");
        assert_eq!(request.crop_params.upper_percent, 0.25);

        let state = controller.state();
        assert!(!state.loading);
        assert_eq!(state.processed_images.len(), 2);
        assert!(controller.csv_export().is_some());
    }

    #[tokio::test]
    async fn test_backend_failure_collapses_to_generic_message() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FakeBackend::failing());
        let (controller, logs) = controller(backend);

        controller.select_file(Some(slip_file(dir.path())));
        let outcome = controller.submit().await;

        assert_eq!(outcome, SubmitOutcome::Failed(GENERIC_FAILURE.to_string()));
        assert!(!controller.state().loading);
        assert!(snapshot(&logs)
            .iter()
            .any(|entry| entry.level == "ERROR" && entry.source == LOG_SOURCE));
    }

    #[tokio::test]
    async fn test_second_submit_while_pending_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FakeBackend::gated());
        let (controller, _) = controller(backend.clone());
        let controller = Arc::new(controller);
        controller.select_file(Some(slip_file(dir.path())));

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit().await }
        });
        backend.wait_for_calls(1).await;

        assert_eq!(controller.submit().await, SubmitOutcome::Ignored);
        assert!(controller.state().loading);

        backend.release();
        assert_eq!(first.await.unwrap(), SubmitOutcome::Completed);
        assert_eq!(backend.upload_calls(), 1);
    }

    #[tokio::test]
    async fn test_no_download_without_results() {
        let backend = Arc::new(FakeBackend::with_empty_results());
        let dir = tempfile::tempdir().unwrap();
        let (controller, _) = controller(backend);
        let sink = DirectoryDownloads::new(dir.path().join("downloads"));

        assert!(!controller.download_csv(&sink));

        controller.select_file(Some(slip_file(dir.path())));
        assert_eq!(controller.submit().await, SubmitOutcome::Completed);
        assert!(controller.csv_export().is_none());
        assert!(!controller.download_csv(&sink));
        assert!(sink.saved_paths().is_empty());
    }

    #[tokio::test]
    async fn test_download_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FakeBackend::default());
        let (controller, _) = controller(backend);
        let sink = DirectoryDownloads::new(dir.path().join("downloads"));

        controller.select_file(Some(slip_file(dir.path())));
        controller.submit().await;

        assert!(controller.download_csv(&sink));
        let saved = sink.saved_paths();
        assert_eq!(saved[0].file_name().unwrap(), OCR_RESULTS_FILE);
    }
}
