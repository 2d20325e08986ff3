//! Per-document orchestration: text, prompt, LLM, validation, normalization.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{normalize, Prompt, ResponseValidator};
use crate::error::PdfError;
use crate::llm::LlmClient;
use crate::models::config::DEFAULT_MAX_PAGES;
use crate::models::{ExtractionSchema, NormalizedRecord};
use crate::ocr::OcrBackend;
use crate::pdf::{Document, PdfExtractor, PdfProcessor, TextExtractor};

/// Why a record holds the values it does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// The model answered with a JSON object.
    Extracted,
    /// No text could be recovered from the scanned pages.
    NoText,
    /// The model could not be reached or refused the request.
    LlmFailed(String),
    /// The model answered with something that is not a JSON object.
    InvalidResponse,
    /// The file could not be read or opened as a PDF.
    DocumentUnreadable(String),
}

impl ExtractionOutcome {
    pub fn is_extracted(&self) -> bool {
        matches!(self, ExtractionOutcome::Extracted)
    }
}

impl fmt::Display for ExtractionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionOutcome::Extracted => write!(f, "extracted"),
            ExtractionOutcome::NoText => write!(f, "no text found"),
            ExtractionOutcome::LlmFailed(reason) => write!(f, "LLM request failed: {}", reason),
            ExtractionOutcome::InvalidResponse => write!(f, "LLM response was not a JSON object"),
            ExtractionOutcome::DocumentUnreadable(reason) => {
                write!(f, "document unreadable: {}", reason)
            }
        }
    }
}

/// Turns one document into one normalized record under a fixed schema.
pub struct ExtractionPipeline<O, L> {
    schema: ExtractionSchema,
    text: TextExtractor<O>,
    llm: L,
    validator: ResponseValidator,
    max_pages: u32,
}

impl<O: OcrBackend, L: LlmClient> ExtractionPipeline<O, L> {
    pub fn new(schema: ExtractionSchema, ocr: O, llm: L) -> Self {
        let validator = ResponseValidator::with_repair(schema.repair_json());
        Self {
            schema,
            text: TextExtractor::new(ocr),
            llm,
            validator,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Override how many leading pages are read from each document.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn schema(&self) -> &ExtractionSchema {
        &self.schema
    }

    /// Extract one record. Only failures to open the document are returned
    /// as errors; every other failure yields an all-null record.
    pub async fn process(&self, document: &Document) -> Result<NormalizedRecord, PdfError> {
        self.process_with_outcome(document)
            .await
            .map(|(record, _)| record)
    }

    /// Like [`ExtractionPipeline::process`], also reporting the outcome.
    pub async fn process_with_outcome(
        &self,
        document: &Document,
    ) -> Result<(NormalizedRecord, ExtractionOutcome), PdfError> {
        if self.max_pages == 0 {
            return Err(PdfError::NoPagesRequested);
        }
        let pdf = PdfExtractor::load(document.bytes())?;
        self.process_pages(document.filename(), &pdf).await
    }

    /// Run the pipeline over an already opened page source.
    pub async fn process_pages(
        &self,
        filename: &str,
        pdf: &dyn PdfProcessor,
    ) -> Result<(NormalizedRecord, ExtractionOutcome), PdfError> {
        let (mut record, outcome) = match self.text.extract_from(pdf, self.max_pages)? {
            Some(text) => self.extract_fields(filename, &text).await,
            None => {
                info!("No text found in {}", filename);
                (NormalizedRecord::empty(&self.schema), ExtractionOutcome::NoText)
            }
        };

        record.attach_source(&self.schema, filename);
        Ok((record, outcome))
    }

    /// An all-null record for a document that could not be processed.
    pub fn degraded_record(&self, filename: &str) -> NormalizedRecord {
        let mut record = NormalizedRecord::empty(&self.schema);
        record.attach_source(&self.schema, filename);
        record
    }

    async fn extract_fields(
        &self,
        filename: &str,
        text: &str,
    ) -> (NormalizedRecord, ExtractionOutcome) {
        let prompt = Prompt::for_extraction(&self.schema, text);

        let raw = match self.llm.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("LLM request failed for {}: {}", filename, e);
                return (
                    NormalizedRecord::empty(&self.schema),
                    ExtractionOutcome::LlmFailed(e.to_string()),
                );
            }
        };

        let cleaned = raw.trim().replace('\n', " ");
        match self.validator.validate(&cleaned) {
            Some(Value::Object(map)) => {
                let record = normalize(&map, &self.schema);
                debug!(
                    "{}: {}/{} fields filled",
                    filename,
                    record.filled_count(),
                    record.len()
                );
                (record, ExtractionOutcome::Extracted)
            }
            Some(other) => {
                warn!("LLM returned a JSON {} for {}, expected an object", json_kind(&other), filename);
                (
                    NormalizedRecord::empty(&self.schema),
                    ExtractionOutcome::InvalidResponse,
                )
            }
            None => {
                warn!("LLM response for {} is not valid JSON", filename);
                (
                    NormalizedRecord::empty(&self.schema),
                    ExtractionOutcome::InvalidResponse,
                )
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::pdf::fakes::{FakeOcr, FakePdf};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed answer and records the prompts it was given.
    struct FakeLlm {
        answer: Option<&'static str>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<Prompt>>,
    }

    impl FakeLlm {
        fn answering(answer: &'static str) -> Self {
            Self {
                answer: Some(answer),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                answer: None,
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LlmClient for FakeLlm {
        async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.clone());
            match self.answer {
                Some(answer) => Ok(answer.to_string()),
                None => Err(LlmError::Api {
                    status: 500,
                    message: "internal error".to_string(),
                }),
            }
        }
    }

    fn schema() -> ExtractionSchema {
        ExtractionSchema::builder("invoice")
            .fields(["Invoice#", "Date"])
            .synonym("Invoice No", "Invoice#")
            .build()
            .unwrap()
    }

    fn pages(pages: Vec<Option<&'static str>>) -> FakePdf {
        FakePdf { pages }
    }

    #[tokio::test]
    async fn test_end_to_end_with_synonym() {
        let llm = FakeLlm::answering(r#"{"Invoice No": "INV-001", "Date": "2024-01-01"}"#);
        let pipeline = ExtractionPipeline::new(schema(), FakeOcr::new(), llm);

        let (record, outcome) = pipeline
            .process_pages("a.pdf", &pages(vec![Some("Invoice No: INV-001 dated 2024-01-01")]))
            .await
            .unwrap();

        assert_eq!(outcome, ExtractionOutcome::Extracted);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "Invoice#": "INV-001",
                "Date": "2024-01-01",
                "source_file": "a.pdf",
                "serial": null
            })
        );

        let prompt = pipeline.llm.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.user.contains("- \"Invoice No\" = \"Invoice#\""));
        assert!(prompt.user.ends_with("Invoice No: INV-001 dated 2024-01-01"));
    }

    #[tokio::test]
    async fn test_no_text_skips_llm() {
        let llm = FakeLlm::answering("{}");
        let pipeline = ExtractionPipeline::new(schema(), FakeOcr::new(), llm);

        let (record, outcome) = pipeline
            .process_pages("blank.pdf", &pages(vec![]))
            .await
            .unwrap();

        assert_eq!(outcome, ExtractionOutcome::NoText);
        assert!(record.is_degraded());
        assert_eq!(record.source_file.as_deref(), Some("blank.pdf"));
        assert_eq!(pipeline.llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_llm_failure_degrades() {
        let pipeline = ExtractionPipeline::new(schema(), FakeOcr::new(), FakeLlm::failing());

        let (record, outcome) = pipeline
            .process_pages("a.pdf", &pages(vec![Some("text")]))
            .await
            .unwrap();

        assert!(matches!(outcome, ExtractionOutcome::LlmFailed(_)));
        assert!(record.is_degraded());
        assert_eq!(record.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_json_degrades() {
        let llm = FakeLlm::answering("Sorry, I cannot help with that.");
        let pipeline = ExtractionPipeline::new(schema(), FakeOcr::new(), llm);

        let (record, outcome) = pipeline
            .process_pages("a.pdf", &pages(vec![Some("text")]))
            .await
            .unwrap();

        assert_eq!(outcome, ExtractionOutcome::InvalidResponse);
        assert!(record.is_degraded());
    }

    #[tokio::test]
    async fn test_non_object_degrades() {
        let llm = FakeLlm::answering(r#"["INV-001", "2024-01-01"]"#);
        let pipeline = ExtractionPipeline::new(schema(), FakeOcr::new(), llm);

        let (record, outcome) = pipeline
            .process_pages("a.pdf", &pages(vec![Some("text")]))
            .await
            .unwrap();

        assert_eq!(outcome, ExtractionOutcome::InvalidResponse);
        assert!(record.is_degraded());
    }

    #[tokio::test]
    async fn test_multiline_response_is_flattened() {
        let llm = FakeLlm::answering("\n```json\n{\n  \"Date\": \"2024-01-01\",\n}\n```\n");
        let pipeline = ExtractionPipeline::new(schema(), FakeOcr::new(), llm);

        let record = pipeline
            .process_pages("a.pdf", &pages(vec![Some("text")]))
            .await
            .unwrap()
            .0;

        assert_eq!(record.get("Date"), Some(&json!("2024-01-01")));
    }

    #[tokio::test]
    async fn test_filename_field_is_filled() {
        let schema = ExtractionSchema::builtin("annexure6").unwrap();
        let llm = FakeLlm::answering(r#"{"File Name": "ignored.pdf", "Qty": 4}"#);
        let pipeline = ExtractionPipeline::new(schema, FakeOcr::new(), llm);

        let record = pipeline
            .process_pages("inv-7.pdf", &pages(vec![Some("text")]))
            .await
            .unwrap()
            .0;

        assert_eq!(record.get("File Name"), Some(&json!("inv-7.pdf")));
        assert_eq!(record.get("Quantity"), Some(&json!(4)));
    }

    #[tokio::test]
    async fn test_model_serial_is_not_kept() {
        let schema = ExtractionSchema::builtin("annexure7").unwrap();
        let llm = FakeLlm::answering(r#"{"S No. #": "17", "Qty": 3}"#);
        let pipeline = ExtractionPipeline::new(schema, FakeOcr::new(), llm);

        let record = pipeline
            .process_pages("be-1.pdf", &pages(vec![Some("text")]))
            .await
            .unwrap()
            .0;

        assert_eq!(record.get("S No. #"), Some(&Value::Null));
        assert_eq!(record.serial, None);
        assert_eq!(record.get("Quantity"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn test_ocr_text_reaches_prompt() {
        let llm = FakeLlm::answering("{}");
        let pipeline = ExtractionPipeline::new(schema(), FakeOcr::new(), llm);

        pipeline
            .process_pages("scan.pdf", &pages(vec![None, Some("second page")]))
            .await
            .unwrap();

        let prompt = pipeline.llm.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.user.ends_with("ocr page 1\nsecond page"));
    }

    #[tokio::test]
    async fn test_unopenable_document_is_an_error() {
        let pipeline = ExtractionPipeline::new(schema(), FakeOcr::new(), FakeLlm::failing());
        let document = Document::new("broken.pdf", b"not a pdf".to_vec());

        assert!(matches!(
            pipeline.process(&document).await,
            Err(PdfError::Parse(_))
        ));
        assert_eq!(pipeline.llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_repeat_runs_are_identical() {
        let llm = FakeLlm::answering(r#"{"Invoice#": "X", "Date": null}"#);
        let pipeline = ExtractionPipeline::new(schema(), FakeOcr::new(), llm);
        let pdf = pages(vec![Some("text")]);

        let first = pipeline.process_pages("a.pdf", &pdf).await.unwrap();
        let second = pipeline.process_pages("a.pdf", &pdf).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(
            serde_json::to_value(ExtractionOutcome::LlmFailed("timeout".into())).unwrap(),
            json!({"status": "llm_failed", "reason": "timeout"})
        );
        assert_eq!(
            serde_json::to_value(ExtractionOutcome::Extracted).unwrap(),
            json!({"status": "extracted"})
        );
    }
}
