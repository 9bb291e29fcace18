pub mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::error::Result;
use crate::domain::ocr_api::{
    CloudBatchRequest, CropParams, CropProcessRequest, CropProcessResponse,
    SlipExtractionResponse, SlipType, UploadResponse,
};
use crate::domain::upload::UploadFile;

pub use http::HttpOcrBackend;

/// The external OCR service, one method per endpoint a screen calls
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// `POST /process_file`, multipart file with crop percentages
    async fn process_file(&self, file: UploadFile, crop: CropParams) -> Result<Value>;

    /// `POST /api/upload`, multipart file; answers with its hosted URL
    async fn upload(&self, file: UploadFile) -> Result<UploadResponse>;

    /// `POST /process` with a previously uploaded file URL
    async fn process_crop(&self, request: &CropProcessRequest) -> Result<CropProcessResponse>;

    /// `POST /process?input_type=...`, multipart `files`
    async fn process_slips(
        &self,
        files: Vec<UploadFile>,
        slip_type: SlipType,
    ) -> Result<SlipExtractionResponse>;

    /// `POST /process` over images already stored in the cloud folder
    async fn process_cloud_batch(
        &self,
        request: &CloudBatchRequest,
    ) -> Result<SlipExtractionResponse>;
}
