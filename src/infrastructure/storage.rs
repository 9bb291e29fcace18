use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::{AppError, Result};
use crate::domain::upload::UploadFile;

/// Create the downloads directory if needed and return it
pub fn ensure_download_dir(download_dir: &Path) -> std::io::Result<PathBuf> {
    ensure_dir(download_dir)?;
    Ok(download_dir.to_path_buf())
}

/// Read a picked file into an upload, enforcing the extension allow-list
pub async fn read_upload(path: &Path) -> Result<UploadFile> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| {
            AppError::ValidationError(format!("Not a file path: {}", path.display()))
        })?;
    crate::domain::upload::check_allowed(&file_name)?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::IoError(format!("Failed to read {}: {}", path.display(), e)))?;
    UploadFile::new(file_name, bytes)
}

/// Reduce a suggested download name to one safe path component
pub fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() || ":*?\"<>|".contains(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "download.csv".to_string()
    } else {
        cleaned
    }
}

/// First path in `dir` for `file_name` that does not exist yet,
/// numbering duplicates as `name (1).ext`, `name (2).ext`, ...
pub fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };

    (1..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext)),
            None => dir.join(format!("{} ({})", stem, n)),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
