//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::ConfigError;

/// Pages read from each document unless configured otherwise.
pub const DEFAULT_MAX_PAGES: u32 = 3;

/// Main configuration for invex.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvexConfig {
    /// LLM service configuration.
    pub llm: LlmConfig,

    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Output configuration.
    pub output: OutputConfig,
}

/// LLM service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key. Takes precedence over `api_key_env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,

    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,

    /// Chat model name.
    pub model: String,

    /// Completion token limit.
    pub max_tokens: u32,

    /// Sampling temperature. Zero keeps runs reproducible.
    pub temperature: f32,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Retries after the first attempt for retryable failures.
    pub max_retries: u32,

    /// First backoff delay in milliseconds.
    pub initial_backoff_ms: u64,

    /// Upper bound on the backoff delay in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            max_tokens: 1000,
            temperature: 0.0,
            timeout_secs: 60,
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the config value or the environment.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.to_string());
        }

        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(self.api_key_env.clone()))
    }
}

/// Which OCR engine handles pages without a text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendKind {
    /// External tesseract executable.
    Tesseract,
    /// Bundled ONNX models (feature `onnx-ocr`).
    Onnx,
}

impl std::fmt::Display for OcrBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrBackendKind::Tesseract => write!(f, "tesseract"),
            OcrBackendKind::Onnx => write!(f, "onnx"),
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Engine used for the per-page fallback.
    pub backend: OcrBackendKind,

    /// Path (or bare name on `PATH`) of the tesseract executable.
    pub tesseract_path: PathBuf,

    /// Tesseract language code.
    pub language: String,

    /// Directory with `det.onnx`, `latin_rec.onnx` and `latin_dict.txt`.
    pub model_dir: PathBuf,

    /// Keep `[UNK]` markers in ONNX recognition output.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackendKind::Tesseract,
            tesseract_path: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            model_dir: PathBuf::from("models"),
            keep_unk: false,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Pages read from the start of each document.
    pub max_pages: u32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Header of the trailing filename column.
    pub file_column: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_column: "__file__".to_string(),
        }
    }
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check everything a batch run needs before the first document.
    ///
    /// Returns the resolved API key.
    pub fn validate(&self) -> Result<String, ConfigError> {
        if self.pdf.max_pages == 0 {
            return Err(ConfigError::InvalidMaxPages);
        }

        match self.ocr.backend {
            OcrBackendKind::Tesseract => {
                if !tesseract_available(&self.ocr.tesseract_path) {
                    return Err(ConfigError::TesseractNotFound(
                        self.ocr.tesseract_path.clone(),
                    ));
                }
            }
            OcrBackendKind::Onnx => {
                if !cfg!(feature = "onnx-ocr") {
                    return Err(ConfigError::BackendUnavailable(
                        OcrBackendKind::Onnx.to_string(),
                    ));
                }
                if !self.ocr.model_dir.is_dir() {
                    return Err(ConfigError::ModelDirMissing(self.ocr.model_dir.clone()));
                }
            }
        }

        self.llm.resolve_api_key()
    }
}

/// Probe the tesseract executable with `--version`.
pub fn tesseract_available(path: &Path) -> bool {
    let ok = Command::new(path)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    if !ok {
        debug!("tesseract not runnable at {}", path.display());
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = InvexConfig::default();
        assert_eq!(config.pdf.max_pages, 3);
        assert_eq!(config.llm.model, "gpt-4");
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.ocr.backend, OcrBackendKind::Tesseract);
        assert_eq!(config.output.file_column, "__file__");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: InvexConfig =
            serde_json::from_str(r#"{"llm": {"model": "gpt-4o-mini"}, "ocr": {"backend": "onnx"}}"#)
                .unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_tokens, 1000);
        assert_eq!(config.ocr.backend, OcrBackendKind::Onnx);
        assert_eq!(config.pdf.max_pages, 3);
    }

    #[test]
    fn test_api_key_from_config_wins() {
        let llm = LlmConfig {
            api_key: Some("sk-config".to_string()),
            api_key_env: "INVEX_TEST_UNSET_VARIABLE".to_string(),
            ..LlmConfig::default()
        };
        assert_eq!(llm.resolve_api_key().unwrap(), "sk-config");
    }

    #[test]
    fn test_missing_api_key() {
        let llm = LlmConfig {
            api_key: Some("   ".to_string()),
            api_key_env: "INVEX_TEST_UNSET_VARIABLE".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            llm.resolve_api_key(),
            Err(ConfigError::MissingApiKey(var)) if var == "INVEX_TEST_UNSET_VARIABLE"
        ));
    }

    #[test]
    fn test_validate_rejects_zero_pages() {
        let mut config = InvexConfig::default();
        config.pdf.max_pages = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMaxPages)));
    }

    #[test]
    fn test_validate_rejects_missing_tesseract() {
        let mut config = InvexConfig::default();
        config.ocr.tesseract_path = PathBuf::from("/nonexistent/bin/tesseract");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TesseractNotFound(_))
        ));
    }

    #[test]
    fn test_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = InvexConfig::default();
        config.pdf.max_pages = 5;
        config.save(&path).unwrap();

        let loaded = InvexConfig::from_file(&path).unwrap();
        assert_eq!(loaded.pdf.max_pages, 5);
    }
}
