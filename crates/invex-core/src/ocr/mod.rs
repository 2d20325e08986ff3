//! OCR backends used for pages without a text layer.

#[cfg(feature = "onnx-ocr")]
mod onnx;
mod tesseract;

#[cfg(feature = "onnx-ocr")]
pub use onnx::OnnxOcr;
pub use tesseract::TesseractOcr;

use image::DynamicImage;

use crate::error::{ConfigError, OcrError};
use crate::models::config::{OcrBackendKind, OcrConfig};

/// Converts a page image into text.
///
/// An empty string is a valid answer for a blank page.
pub trait OcrBackend {
    /// Recognize the text on an image.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;

    /// Short engine name for logs.
    fn name(&self) -> &'static str;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        (**self).recognize(image)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Build the backend selected in the configuration.
pub fn backend_from_config(config: &OcrConfig) -> Result<Box<dyn OcrBackend>, ConfigError> {
    match config.backend {
        OcrBackendKind::Tesseract => Ok(Box::new(TesseractOcr::new(
            config.tesseract_path.clone(),
            config.language.clone(),
        ))),
        #[cfg(feature = "onnx-ocr")]
        OcrBackendKind::Onnx => OnnxOcr::from_dir(&config.model_dir, config.keep_unk)
            .map(|engine| Box::new(engine) as Box<dyn OcrBackend>)
            .map_err(ConfigError::from),
        #[cfg(not(feature = "onnx-ocr"))]
        OcrBackendKind::Onnx => Err(ConfigError::BackendUnavailable(
            OcrBackendKind::Onnx.to_string(),
        )),
    }
}

/// A detected text box with its coordinates and content.
#[derive(Debug, Clone)]
pub struct TextBox {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4) for quadrilateral.
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
    /// Get the axis-aligned bounding rectangle.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Mean recognition confidence, or `None` for no boxes.
pub fn mean_confidence(boxes: &[TextBox]) -> Option<f32> {
    if boxes.is_empty() {
        return None;
    }
    Some(boxes.iter().map(|b| b.confidence).sum::<f32>() / boxes.len() as f32)
}

/// Sort boxes top-to-bottom, then left-to-right within a 20px row band,
/// and join their text with newlines.
pub fn reading_order_text(boxes: &mut [TextBox]) -> String {
    boxes.sort_by(|a, b| {
        let (ax, ay, _, _) = a.rect();
        let (bx, by, _, _) = b.rect();
        let row_a = (ay / 20.0) as i32;
        let row_b = (by / 20.0) as i32;
        row_a
            .cmp(&row_b)
            .then(ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal))
    });

    boxes
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_box(x: f32, y: f32, text: &str) -> TextBox {
        TextBox {
            bbox: [x, y, x + 50.0, y, x + 50.0, y + 10.0, x, y + 10.0],
            text: text.to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_reading_order() {
        let mut boxes = vec![
            text_box(200.0, 105.0, "Date: 01.02.2024"),
            text_box(10.0, 10.0, "TAX INVOICE"),
            text_box(10.0, 102.0, "Invoice No: 42"),
        ];
        assert_eq!(
            reading_order_text(&mut boxes),
            "TAX INVOICE\nInvoice No: 42\nDate: 01.02.2024"
        );
    }

    #[test]
    fn test_mean_confidence() {
        let mut boxes = vec![text_box(0.0, 0.0, "a"), text_box(0.0, 30.0, "b")];
        boxes[1].confidence = 0.5;
        let mean = mean_confidence(&boxes).unwrap();
        assert!((mean - 0.7).abs() < 1e-6);
        assert_eq!(mean_confidence(&[]), None);
    }

    #[test]
    fn test_rect() {
        let tb = text_box(5.0, 7.0, "x");
        assert_eq!(tb.rect(), (5.0, 7.0, 55.0, 17.0));
    }

    #[test]
    fn test_backend_from_config_tesseract() {
        let backend = backend_from_config(&OcrConfig::default()).unwrap();
        assert_eq!(backend.name(), "tesseract");
    }
}
