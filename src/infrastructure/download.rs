// ============================================================
// DOWNLOADS
// ============================================================
// Blob registry with revocable object URLs, and a sink that saves
// activated downloads into a directory

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::domain::error::{AppError, Result};
use crate::infrastructure::storage::{ensure_download_dir, sanitize_file_name, unique_path};

/// Bytes plus their MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Blob {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// In-process table of blobs reachable through object URLs
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    blobs: Arc<Mutex<HashMap<String, Blob>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `blob`; the URL is revoked when the handle drops
    pub fn create_object_url(&self, blob: Blob) -> ObjectUrl {
        let url = format!("blob:ocrdesk/{}", Uuid::new_v4());
        self.lock().insert(url.clone(), blob);
        ObjectUrl {
            url,
            registry: self.clone(),
        }
    }

    pub fn resolve(&self, url: &str) -> Option<Blob> {
        self.lock().get(url).cloned()
    }

    /// Object URLs not yet revoked
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn revoke(&self, url: &str) {
        self.lock().remove(url);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Blob>> {
        self.blobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handle to a registered blob
#[derive(Debug)]
pub struct ObjectUrl {
    url: String,
    registry: BlobRegistry,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}

/// Hidden link pointing at an object URL with a suggested file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadAnchor {
    pub href: String,
    pub download: String,
}

/// Where activated downloads end up
pub trait DownloadSink: Send + Sync {
    /// Save `blob` under (a sanitized form of) `filename`
    fn download(&self, blob: Blob, filename: &str) -> Result<PathBuf>;
}

/// Saves downloads into a directory, numbering name clashes
pub struct DirectoryDownloads {
    dir: PathBuf,
    registry: BlobRegistry,
    saved: Mutex<Vec<PathBuf>>,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_registry(dir, BlobRegistry::new())
    }

    pub fn with_registry(dir: impl Into<PathBuf>, registry: BlobRegistry) -> Self {
        Self {
            dir: dir.into(),
            registry,
            saved: Mutex::new(Vec::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn registry(&self) -> &BlobRegistry {
        &self.registry
    }

    /// Paths written so far, oldest first
    pub fn saved_paths(&self) -> Vec<PathBuf> {
        self.saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn activate(&self, anchor: &DownloadAnchor) -> Result<PathBuf> {
        let blob = self.registry.resolve(&anchor.href).ok_or_else(|| {
            AppError::Internal(format!("Object URL already revoked: {}", anchor.href))
        })?;

        ensure_download_dir(&self.dir)?;
        let path = unique_path(&self.dir, &anchor.download);
        std::fs::write(&path, &blob.bytes)
            .map_err(|e| AppError::IoError(format!("Failed to write {}: {}", path.display(), e)))?;

        self.saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(path.clone());
        Ok(path)
    }
}

impl DownloadSink for DirectoryDownloads {
    fn download(&self, blob: Blob, filename: &str) -> Result<PathBuf> {
        let object_url = self.registry.create_object_url(blob);
        let anchor = DownloadAnchor {
            href: object_url.as_str().to_string(),
            download: sanitize_file_name(filename),
        };
        // `object_url` drops at the end of this scope, success or not.
        self.activate(&anchor)
    }
}
