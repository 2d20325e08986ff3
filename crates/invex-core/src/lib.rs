//! Core library for LLM-assisted invoice field extraction.
//!
//! This crate provides:
//! - PDF processing (per-page text with OCR fallback for scanned pages)
//! - OCR backends (tesseract executable, pure Rust ONNX models)
//! - An OpenAI-compatible chat client with retries
//! - Schema-driven normalization of model output into fixed records

pub mod error;
pub mod extraction;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod pdf;

pub use error::{InvexError, Result};
pub use extraction::{normalize, ExtractionOutcome, ExtractionPipeline, Prompt, ResponseValidator};
pub use llm::{LlmClient, OpenAiClient, RetryPolicy};
pub use models::{ExtractionSchema, InvexConfig, NormalizedRecord, ResultSet};
pub use ocr::{backend_from_config, OcrBackend, TesseractOcr};
#[cfg(feature = "onnx-ocr")]
pub use ocr::OnnxOcr;
pub use pdf::{Document, PdfProcessor, TextExtractor};
