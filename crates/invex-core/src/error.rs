//! Error types for the invex-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the invex library.
#[derive(Error, Debug)]
pub enum InvexError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// LLM request error.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Schema definition error.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract images from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// A page limit of zero was requested.
    #[error("page limit must be at least 1")]
    NoPagesRequested,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The OCR engine could not be started.
    #[error("failed to run OCR engine: {0}")]
    Engine(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Image could not be prepared for the engine.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors reported by the LLM collaborator.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The provider throttled the request.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Non-success status from the provider.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// The provider answered but the body had no usable completion.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited(_) | LlmError::Network(_) | LlmError::Timeout(_) => true,
            LlmError::Api { status, .. } => *status >= 500,
            LlmError::Auth(_) | LlmError::MalformedResponse(_) => false,
        }
    }
}

/// Errors related to extraction schema definitions.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// Schema declares no fields.
    #[error("schema '{0}' has no fields")]
    NoFields(String),

    /// A field name is empty.
    #[error("schema contains an empty field name")]
    EmptyField,

    /// A field is declared twice.
    #[error("duplicate field: {0}")]
    DuplicateField(String),

    /// A synonym points at a field the schema does not declare.
    #[error("synonym '{alias}' maps to unknown field '{target}'")]
    UnknownSynonymTarget { alias: String, target: String },

    /// An alias is listed more than once.
    #[error("alias '{0}' is listed more than once")]
    DuplicateAlias(String),

    /// An alias shadows a different canonical field.
    #[error("alias '{alias}' is itself a field but maps to '{target}'")]
    AliasShadowsField { alias: String, target: String },

    /// A metadata field (serial/filename) is not declared.
    #[error("{role} field '{field}' is not a schema field")]
    UnknownMetadataField { role: &'static str, field: String },

    /// No built-in schema with this name.
    #[error("unknown schema: {0}")]
    UnknownSchema(String),

    /// Schema file could not be parsed.
    #[error("invalid schema file: {0}")]
    Parse(String),
}

/// Errors found while validating configuration before a run.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No API key in the config file or the environment.
    #[error("no API key configured (set llm.api_key or the {0} environment variable)")]
    MissingApiKey(String),

    /// The tesseract executable could not be run.
    #[error("tesseract executable not usable at {}", .0.display())]
    TesseractNotFound(PathBuf),

    /// The ONNX OCR model directory is missing.
    #[error("OCR model directory not found: {}", .0.display())]
    ModelDirMissing(PathBuf),

    /// The OCR engine failed to initialize.
    #[error("OCR engine failed to start: {0}")]
    OcrEngine(#[from] OcrError),

    /// The OCR backend was not compiled in.
    #[error("OCR backend '{0}' is not available in this build")]
    BackendUnavailable(String),

    /// Page limit of zero.
    #[error("pdf.max_pages must be at least 1")]
    InvalidMaxPages,

    /// Config file could not be read or parsed.
    #[error("failed to load config {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;
