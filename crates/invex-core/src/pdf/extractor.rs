//! PDF page access using lopdf and pdf-extract.

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document as LoDocument, Object, ObjectId};
use tracing::{debug, trace, warn};

use super::{PdfProcessor, Result};
use crate::error::PdfError;

/// Page access over a loaded PDF.
///
/// Text comes from pdf-extract's per-page output, with lopdf's own extractor
/// for pages pdf-extract could not produce. Page images are the raster
/// XObjects placed on the page, which is what scanned invoices consist of.
pub struct PdfExtractor {
    document: LoDocument,
    page_texts: Vec<String>,
}

impl PdfExtractor {
    /// Parse PDF bytes.
    pub fn load(data: &[u8]) -> Result<Self> {
        let mut document = LoDocument::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Many invoice generators encrypt with an empty user password.
        let raw_data = if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            document
                .save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_texts = match std::panic::catch_unwind(|| {
            pdf_extract::extract_text_from_mem_by_pages(&raw_data)
        }) {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => {
                debug!("pdf-extract failed, using lopdf text only: {:?}", e);
                Vec::new()
            }
            Err(_) => {
                warn!("pdf-extract panicked, using lopdf text only");
                Vec::new()
            }
        };

        debug!(
            "Loaded PDF with {} pages ({} with pdf-extract text)",
            document.get_pages().len(),
            page_texts.len()
        );

        Ok(Self {
            document,
            page_texts,
        })
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.document
            .get_pages()
            .get(&page)
            .copied()
            .ok_or(PdfError::InvalidPage(page))
    }

    /// Raster images placed on a page through its XObject resources.
    pub fn page_images(&self, page: u32) -> Result<Vec<DynamicImage>> {
        let page_id = self.page_id(page)?;
        let Some(resources) = self.page_resources(page_id) else {
            return Ok(Vec::new());
        };

        let mut images = Vec::new();
        if let Ok(xobjects) = resources.get(b"XObject") {
            if let Ok((_, Object::Dictionary(xobjects))) = self.document.dereference(xobjects) {
                for (name, reference) in xobjects.iter() {
                    let Ok((_, object)) = self.document.dereference(reference) else {
                        continue;
                    };
                    if let Some(img) = self.decode_image(object) {
                        trace!(
                            "Page {} image {}: {}x{}",
                            page,
                            String::from_utf8_lossy(name),
                            img.width(),
                            img.height()
                        );
                        images.push(img);
                    }
                }
            }
        }

        debug!("Found {} images on page {}", images.len(), page);
        Ok(images)
    }

    /// Resources of a page, following the `Parent` chain for inherited ones.
    fn page_resources(&self, page_id: ObjectId) -> Option<Dictionary> {
        let mut node_id = page_id;
        // Page trees are shallow; the bound guards against reference cycles.
        for _ in 0..32 {
            let Ok(Object::Dictionary(node)) = self.document.get_object(node_id) else {
                return None;
            };
            if let Ok(resources) = node.get(b"Resources") {
                if let Ok((_, Object::Dictionary(dict))) = self.document.dereference(resources) {
                    return Some(dict.clone());
                }
            }
            match node.get(b"Parent") {
                Ok(Object::Reference(parent)) => node_id = *parent,
                _ => return None,
            }
        }
        None
    }

    fn decode_image(&self, object: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = object else {
            return None;
        };
        let dict = &stream.dict;
        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }

        let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
        let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;

        match first_name(dict.get(b"Filter").ok()) {
            Some(b"DCTDecode") => {
                return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                    .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Skipping image with unsupported filter");
                return None;
            }
            _ => {}
        }

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8);
        if bits != 8 {
            trace!("Unsupported bits per component: {}", bits);
            return None;
        }

        let color_space = match dict.get(b"ColorSpace").ok() {
            Some(Object::Reference(r)) => self
                .document
                .get_object(*r)
                .ok()
                .and_then(|o| first_name(Some(o))),
            other => first_name(other),
        }
        .unwrap_or(b"DeviceRGB");

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let pixels = (width as usize) * (height as usize);

        match color_space {
            b"DeviceRGB" | b"RGB" if data.len() >= pixels * 3 => {
                RgbImage::from_raw(width, height, data[..pixels * 3].to_vec())
                    .map(DynamicImage::ImageRgb8)
            }
            b"DeviceGray" | b"G" if data.len() >= pixels => {
                GrayImage::from_raw(width, height, data[..pixels].to_vec())
                    .map(DynamicImage::ImageLuma8)
            }
            _ => {
                trace!(
                    "Could not decode {}x{} image in {}",
                    width,
                    height,
                    String::from_utf8_lossy(color_space)
                );
                None
            }
        }
    }
}

/// Name of a PDF object, or the first name of an array.
fn first_name(object: Option<&Object>) -> Option<&[u8]> {
    match object? {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(items) => items.first().and_then(|o| o.as_name().ok()),
        _ => None,
    }
}

impl PdfProcessor for PdfExtractor {
    fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        if page == 0 || page > self.page_count() {
            return Err(PdfError::InvalidPage(page));
        }

        if let Some(text) = self.page_texts.get((page - 1) as usize) {
            if !text.trim().is_empty() {
                return Ok(text.clone());
            }
        }

        self.document
            .extract_text(&[page])
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    fn render_page(&self, page: u32) -> Result<DynamicImage> {
        // A scanned page is one full-page raster; pick the largest.
        self.page_images(page)?
            .into_iter()
            .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
            .ok_or_else(|| PdfError::ImageExtraction(format!("no images on page {}", page)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_rejects_garbage() {
        let result = PdfExtractor::load(b"definitely not a pdf");
        assert!(matches!(result, Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_first_name() {
        let name = Object::Name(b"DCTDecode".to_vec());
        assert_eq!(first_name(Some(&name)), Some(&b"DCTDecode"[..]));

        let array = Object::Array(vec![Object::Name(b"FlateDecode".to_vec())]);
        assert_eq!(first_name(Some(&array)), Some(&b"FlateDecode"[..]));

        assert_eq!(first_name(Some(&Object::Integer(3))), None);
        assert_eq!(first_name(None), None);
    }
}
