//! OCR through an external tesseract executable.

use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

use image::DynamicImage;
use tracing::debug;

use super::OcrBackend;
use crate::error::OcrError;

/// Runs `tesseract <image> stdout -l <lang>` on a temporary PNG.
pub struct TesseractOcr {
    executable: PathBuf,
    language: String,
}

impl TesseractOcr {
    pub fn new(executable: PathBuf, language: String) -> Self {
        Self {
            executable,
            language,
        }
    }
}

impl OcrBackend for TesseractOcr {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let start = Instant::now();

        let temp_dir = tempfile::tempdir()
            .map_err(|e| OcrError::InvalidImage(format!("failed to create temp dir: {}", e)))?;
        let image_path = temp_dir.path().join("page.png");
        image
            .save_with_format(&image_path, image::ImageFormat::Png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

        let output = Command::new(&self.executable)
            .arg(&image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| {
                OcrError::Engine(format!("{}: {}", self.executable.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Recognition(stderr.trim().to_string()));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            // Tesseract reports DPI guesses and similar notes on stderr.
            debug!("tesseract: {}", stderr.trim());
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(
            "tesseract recognized {} chars in {}ms",
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable_is_engine_error() {
        let ocr = TesseractOcr::new(
            PathBuf::from("/nonexistent/bin/tesseract"),
            "eng".to_string(),
        );
        let image = DynamicImage::new_luma8(8, 8);
        assert!(matches!(ocr.recognize(&image), Err(OcrError::Engine(_))));
    }
}
