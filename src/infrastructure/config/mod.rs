use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::csv::ExportConfig;
use crate::domain::error::{AppError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "ocrdesk.toml";
pub const ENV_PREFIX: &str = "OCRDESK_";

/// Base URLs of the OCR services, one per screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Serves `/process_file`
    pub quick_url: String,
    /// Serves `/api/upload` and the crop `/process`
    pub crop_url: String,
    /// Serves the multipart slip `/process`
    pub slip_url: String,
    /// Serves the cloud batch `/process`
    pub cloud_url: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            quick_url: "http://localhost:5000".to_string(),
            crop_url: "http://127.0.0.1:5001".to_string(),
            slip_url: "http://127.0.0.2:5000".to_string(),
            cloud_url: "http://localhost:5000".to_string(),
            timeout_secs: 120,
        }
    }
}

impl BackendConfig {
    /// Point every screen at the same base URL
    pub fn single(base_url: &str) -> Self {
        Self {
            quick_url: base_url.to_string(),
            crop_url: base_url.to_string(),
            slip_url: base_url.to_string(),
            cloud_url: base_url.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub download_dir: PathBuf,
    pub export: ExportConfig,
    pub mock_backend_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            download_dir: PathBuf::from("downloads"),
            export: ExportConfig::default(),
            mock_backend_port: 4010,
        }
    }
}

pub struct ConfigService;

impl ConfigService {
    /// Defaults, then `ocrdesk.toml`, then `OCRDESK_*` variables
    pub fn load() -> Result<AppConfig> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Like `load`, reading the TOML layer from `path` (missing is fine)
    pub fn load_from(path: &Path) -> Result<AppConfig> {
        Self::figment(path)
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load configuration: {}", e)))
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::csv::{HeaderStrategy, Quoting};

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigService::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.backend.timeout_secs, 120);
        assert_eq!(config.export, ExportConfig::default());
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocrdesk.toml");
        std::fs::write(
            &path,
            r#"
download_dir = "/tmp/exports"

[backend]
crop_url = "http://ocr.internal:5001"

[export]
quoting = "never"
header_strategy = "first-entry"
"#,
        )
        .unwrap();

        let config = ConfigService::load_from(&path).unwrap();
        assert_eq!(config.backend.crop_url, "http://ocr.internal:5001");
        assert_eq!(config.backend.slip_url, BackendConfig::default().slip_url);
        assert_eq!(config.download_dir, PathBuf::from("/tmp/exports"));
        assert_eq!(config.export.quoting, Quoting::Never);
        assert_eq!(config.export.header_strategy, HeaderStrategy::FirstEntry);
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocrdesk.toml");
        std::fs::write(&path, "[export]\nquoting = \"sometimes\"\n").unwrap();

        let err = ConfigService::load_from(&path).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
