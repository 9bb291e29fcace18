use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};

/// Extensions the file picker accepts
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "pdf"];

/// A file selected for upload, already read into memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Build an upload after checking the extension allow-list
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        check_allowed(&file_name)?;
        let mime_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == "application/pdf"
    }
}

/// Lowercased extension of `file_name`, if it has one
pub fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

pub fn is_allowed(file_name: &str) -> bool {
    extension_of(file_name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

pub fn check_allowed(file_name: &str) -> Result<()> {
    if file_name.trim().is_empty() {
        return Err(AppError::ValidationError("No selected file".to_string()));
    }
    if !is_allowed(file_name) {
        return Err(AppError::ValidationError(format!(
            "Invalid file type: {} (allowed: {})",
            file_name,
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }
    Ok(())
}
