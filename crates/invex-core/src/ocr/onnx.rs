//! Pure Rust OCR using `pure-onnx-ocr` (no external ONNX Runtime).

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use super::{mean_confidence, reading_order_text, OcrBackend, TextBox};
use crate::error::OcrError;

const DETECTION_MODEL: &str = "det.onnx";
const RECOGNITION_MODEL: &str = "latin_rec.onnx";
const DICTIONARY: &str = "latin_dict.txt";

/// OCR engine backed by detection + recognition ONNX models on disk.
pub struct OnnxOcr {
    engine: pure_onnx_ocr::engine::OcrEngine,
    keep_unk: bool,
}

impl OnnxOcr {
    /// Load models from a directory containing `det.onnx`, `latin_rec.onnx`
    /// and `latin_dict.txt`.
    pub fn from_dir(model_dir: &Path, keep_unk: bool) -> Result<Self, OcrError> {
        if !model_dir.is_dir() {
            return Err(OcrError::ModelLoad(format!(
                "model directory not found: {}",
                model_dir.display()
            )));
        }

        let det_path = model_dir.join(DETECTION_MODEL);
        let rec_path = model_dir.join(RECOGNITION_MODEL);
        let dict_path = model_dir.join(DICTIONARY);

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded ONNX OCR models from {}", model_dir.display());

        Ok(Self { engine, keep_unk })
    }
}

impl OcrBackend for OnnxOcr {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let mut boxes: Vec<TextBox> = results
            .iter()
            .map(|r| TextBox {
                bbox: polygon_to_bbox(&r.bounding_box),
                text: if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                },
                confidence: r.confidence,
            })
            .collect();

        let text = reading_order_text(&mut boxes);

        debug!(
            "ONNX OCR: {} text boxes (mean confidence {:.2}) on {}x{} image in {}ms",
            boxes.len(),
            mean_confidence(&boxes).unwrap_or(0.0),
            width,
            height,
            start.elapsed().as_millis()
        );

        Ok(text)
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// First four exterior points of a polygon as `[x1, y1, ..., x4, y4]`.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_dir() {
        let result = OnnxOcr::from_dir(Path::new("/nonexistent/models"), false);
        assert!(matches!(result, Err(OcrError::ModelLoad(_))));
    }
}
