//! Page text with per-page OCR fallback.

use tracing::{debug, warn};

use super::{Document, PdfExtractor, PdfProcessor, Result};
use crate::error::PdfError;
use crate::ocr::OcrBackend;

/// Reads the first pages of a document, OCRing pages with no text layer.
pub struct TextExtractor<O> {
    ocr: O,
}

impl<O: OcrBackend> TextExtractor<O> {
    pub fn new(ocr: O) -> Self {
        Self { ocr }
    }

    /// Text of the first `max_pages` pages of a document.
    ///
    /// A page whose embedded text is empty or only whitespace is OCRed
    /// instead. Returns `Ok(None)` when nothing was recovered from any page.
    /// Fails only when the bytes cannot be opened as a PDF or `max_pages` is
    /// zero.
    pub fn extract(&self, document: &Document, max_pages: u32) -> Result<Option<String>> {
        if max_pages == 0 {
            return Err(PdfError::NoPagesRequested);
        }
        let pdf = PdfExtractor::load(document.bytes())?;
        self.extract_from(&pdf, max_pages)
    }

    /// Same as [`TextExtractor::extract`] over an already opened page source.
    pub fn extract_from(&self, pdf: &dyn PdfProcessor, max_pages: u32) -> Result<Option<String>> {
        if max_pages == 0 {
            return Err(PdfError::NoPagesRequested);
        }

        let pages = pdf.page_count().min(max_pages);
        let mut text = String::new();

        for page in 1..=pages {
            let native = match pdf.extract_page_text(page) {
                Ok(t) => t,
                Err(e) => {
                    debug!("No text layer on page {}: {}", page, e);
                    String::new()
                }
            };

            if !native.trim().is_empty() {
                debug!("Page {}: {} chars of embedded text", page, native.len());
                text.push_str(&native);
                text.push('\n');
                continue;
            }

            if let Some(ocr_text) = self.ocr_page(pdf, page) {
                debug!("Page {}: {} chars from {} OCR", page, ocr_text.len(), self.ocr.name());
                text.push_str(&ocr_text);
                text.push('\n');
            }
        }

        let text = text.trim();
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text.to_string()))
        }
    }

    fn ocr_page(&self, pdf: &dyn PdfProcessor, page: u32) -> Option<String> {
        let image = match pdf.render_page(page) {
            Ok(image) => image,
            Err(e) => {
                warn!("Page {} has no text and no image to OCR: {}", page, e);
                return None;
            }
        };

        match self.ocr.recognize(&image) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("OCR failed on page {}: {}", page, e);
                None
            }
        }
    }
}
