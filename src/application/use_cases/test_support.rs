//! In-memory OCR backend for controller tests

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::domain::error::{AppError, Result};
use crate::domain::extraction::Record;
use crate::domain::ocr_api::{
    CloudBatchRequest, CropParams, CropProcessRequest, CropProcessResponse,
    SlipExtractionResponse, SlipType, UploadResponse,
};
use crate::domain::upload::UploadFile;
use crate::infrastructure::backend::OcrBackend;

#[derive(Default)]
pub struct FakeBackend {
    fail: bool,
    empty_results: bool,
    gate: Option<Semaphore>,
    calls: AtomicUsize,
    upload_calls: AtomicUsize,
    crop_requests: Mutex<Vec<CropProcessRequest>>,
    slip_batches: Mutex<Vec<(Vec<String>, SlipType)>>,
    cloud_requests: Mutex<Vec<CloudBatchRequest>>,
}

impl FakeBackend {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every call blocks until `release`
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn with_empty_results() -> Self {
        Self {
            empty_results: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn last_crop_request(&self) -> Option<CropProcessRequest> {
        self.crop_requests.lock().unwrap().last().cloned()
    }

    pub fn slip_batches(&self) -> Vec<(Vec<String>, SlipType)> {
        self.slip_batches.lock().unwrap().clone()
    }

    pub fn cloud_requests(&self) -> Vec<CloudBatchRequest> {
        self.cloud_requests.lock().unwrap().clone()
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1024);
        }
    }

    pub async fn wait_for_calls(&self, expected: usize) {
        while self.calls() < expected {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    async fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;
        }
        if self.fail {
            return Err(AppError::BackendError(
                "Backend answered 500: extractor crashed".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl OcrBackend for FakeBackend {
    async fn process_file(&self, file: UploadFile, crop: CropParams) -> Result<Value> {
        self.enter().await?;
        Ok(json!({
            "file": file.file_name,
            "upper_percent": crop.upper_percent,
            "text": "Net Pay: 1200"
        }))
    }

    async fn upload(&self, file: UploadFile) -> Result<UploadResponse> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;
        Ok(UploadResponse {
            file_url: format!("https://cdn.example/{}", file.file_name),
            message: None,
        })
    }

    async fn process_crop(&self, request: &CropProcessRequest) -> Result<CropProcessResponse> {
        self.enter().await?;
        self.crop_requests.lock().unwrap().push(request.clone());

        let ocr_results = if self.empty_results {
            Vec::new()
        } else {
            let mut row = Record::new();
            row.insert("Recognized Text".into(), json!("Net"));
            row.insert("Confidence Score".into(), json!(91));
            row.insert("OCR Model".into(), json!("Tesseract"));
            vec![row]
        };

        Ok(CropProcessResponse {
            message: Some("Processed".into()),
            results_csv_url: None,
            tesseract_image_urls: vec!["https://cdn.example/t0.png".into()],
            easyocr_image_urls: vec!["https://cdn.example/e0.png".into()],
            ocr_results,
        })
    }

    async fn process_slips(
        &self,
        files: Vec<UploadFile>,
        slip_type: SlipType,
    ) -> Result<SlipExtractionResponse> {
        self.enter().await?;
        let names: Vec<String> = files.into_iter().map(|file| file.file_name).collect();
        self.slip_batches
            .lock()
            .unwrap()
            .push((names.clone(), slip_type));

        let mut extracted_data = IndexMap::new();
        if !self.empty_results {
            for (index, name) in names.into_iter().enumerate() {
                extracted_data.insert(name, json!({"Basic": 1000 + index, "HRA": 200}));
            }
        }
        Ok(SlipExtractionResponse {
            extracted_data,
            pie_chart_files: vec!["https://cdn.example/pie.png".into()],
            bar_chart_files: Vec::new(),
        })
    }

    async fn process_cloud_batch(
        &self,
        request: &CloudBatchRequest,
    ) -> Result<SlipExtractionResponse> {
        self.enter().await?;
        self.cloud_requests.lock().unwrap().push(request.clone());

        let mut extracted_data = IndexMap::new();
        if !self.empty_results {
            extracted_data.insert("img1".to_string(), json!("Name: Alice\nAge: 30"));
            extracted_data.insert("img2".to_string(), json!("Name: Bob"));
        }
        Ok(SlipExtractionResponse {
            extracted_data,
            ..SlipExtractionResponse::default()
        })
    }
}
