use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use super::OcrBackend;
use crate::domain::error::{AppError, Result};
use crate::domain::ocr_api::{
    BackendErrorBody, CloudBatchRequest, CropParams, CropProcessRequest, CropProcessResponse,
    SlipExtractionResponse, SlipType, UploadResponse,
};
use crate::domain::upload::UploadFile;
use crate::infrastructure::config::BackendConfig;

/// `reqwest` implementation of the OCR backend contract
pub struct HttpOcrBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpOcrBackend {
    /// Fails when the HTTP client cannot be built (TLS backend setup)
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn endpoint(base_url: &str, path: &str) -> Result<url::Url> {
        let base = url::Url::parse(base_url.trim()).map_err(|e| {
            AppError::ValidationError(format!("Invalid backend URL '{}': {}", base_url, e))
        })?;
        base.join(path).map_err(|e| {
            AppError::ValidationError(format!("Invalid backend path '{}': {}", path, e))
        })
    }

    fn file_part(file: UploadFile) -> Result<Part> {
        Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.mime_type)
            .map_err(|_| AppError::ValidationError("Invalid form-data content type.".to_string()))
    }

    /// Decode a 2xx body as `T`; otherwise surface the `{ error }` message
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::BackendError(format!("Failed to read backend response body: {}", e))
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<BackendErrorBody>(&body)
                .map(|parsed| parsed.error)
                .unwrap_or(body);
            return Err(AppError::BackendError(format!(
                "Backend answered {}: {}",
                status.as_u16(),
                detail
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            AppError::ParseError(format!("Unexpected backend response shape: {}", e))
        })
    }
}

#[async_trait]
impl OcrBackend for HttpOcrBackend {
    async fn process_file(&self, file: UploadFile, crop: CropParams) -> Result<Value> {
        let url = Self::endpoint(&self.config.quick_url, "/process_file")?;
        let form = Form::new()
            .part("file", Self::file_part(file)?)
            .text("upper_percent", crop.upper_percent.to_string())
            .text("lower_percent", crop.lower_percent.to_string());

        let response = self.client.post(url).multipart(form).send().await?;
        Self::read_json(response).await
    }

    async fn upload(&self, file: UploadFile) -> Result<UploadResponse> {
        let url = Self::endpoint(&self.config.crop_url, "/api/upload")?;
        let form = Form::new().part("file", Self::file_part(file)?);

        let response = self.client.post(url).multipart(form).send().await?;
        Self::read_json(response).await
    }

    async fn process_crop(&self, request: &CropProcessRequest) -> Result<CropProcessResponse> {
        let url = Self::endpoint(&self.config.crop_url, "/process")?;
        let response = self.client.post(url).json(request).send().await?;
        Self::read_json(response).await
    }

    async fn process_slips(
        &self,
        files: Vec<UploadFile>,
        slip_type: SlipType,
    ) -> Result<SlipExtractionResponse> {
        if files.is_empty() {
            return Err(AppError::ValidationError(
                "At least one file is required.".to_string(),
            ));
        }

        let mut url = Self::endpoint(&self.config.slip_url, "/process")?;
        url.query_pairs_mut()
            .append_pair("input_type", slip_type.as_str());

        let mut form = Form::new();
        for file in files {
            form = form.part("files", Self::file_part(file)?);
        }

        let response = self.client.post(url).multipart(form).send().await?;
        Self::read_json(response).await
    }

    async fn process_cloud_batch(
        &self,
        request: &CloudBatchRequest,
    ) -> Result<SlipExtractionResponse> {
        let url = Self::endpoint(&self.config.cloud_url, "/process")?;
        let response = self.client.post(url).json(request).send().await?;
        Self::read_json(response).await
    }
}
