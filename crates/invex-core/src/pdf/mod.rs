//! PDF access: per-page text and page images.

mod extractor;
mod text;

pub use extractor::PdfExtractor;
pub use text::TextExtractor;

#[cfg(test)]
pub(crate) use text::tests as fakes;

use std::path::Path;

use crate::error::PdfError;
use image::DynamicImage;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Raw bytes of one PDF file, identified by its filename.
#[derive(Debug, Clone)]
pub struct Document {
    filename: String,
    bytes: Vec<u8>,
}

impl Document {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read a document from disk. The filename is the path's final component.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(filename, bytes))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Trait for PDF page access.
pub trait PdfProcessor {
    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract embedded text from a page (1-indexed). Empty when the page has
    /// no text layer.
    fn extract_page_text(&self, page: u32) -> Result<String>;

    /// Produce an image of a page for OCR.
    fn render_page(&self, page: u32) -> Result<DynamicImage>;
}
