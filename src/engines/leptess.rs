//! Leptess/Tesseract engine implementation
//!
//! Tesseract-based OCR engine. Better for noisy phone photos and the only engine
//! here with Japanese models. Uses tesseract-static for static linking (no
//! system dependencies) and downloads `tessdata_fast` models on first use.

use super::download;
use crate::engine::{
    EngineMode, LanguageSpec, PageSegmentation, ProgressReporter, RecognitionRequest,
    RecognitionResult, Recognizer,
};
use crate::error::OcrError;
use crate::raster::RasterImage;
use std::path::PathBuf;
use tesseract_static::tesseract::Tesseract;

/// Tesseract OCR Engine
pub struct LeptessEngine {
    /// Directory holding `<lang>.traineddata` files
    tessdata_path: PathBuf,
    /// Whether missing models may be downloaded into `tessdata_path`
    managed: bool,
}

impl LeptessEngine {
    /// Create a Tesseract-based engine and make sure the default languages load
    pub fn new(tessdata_path: Option<&str>, language: &LanguageSpec) -> Result<Self, OcrError> {
        let (tessdata_path, managed) = match tessdata_path {
            Some(path) => (PathBuf::from(path), false),
            None => (download::cache_dir(Some("tessdata"))?, true),
        };

        let engine = Self {
            tessdata_path,
            managed,
        };
        engine.ensure_languages(language)?;

        // Validate that tessdata is accessible by doing a test initialization
        let test_tess = Tesseract::new(Some(engine.tessdata_str()?), Some(&language.to_string()))
            .map_err(|e| {
                OcrError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
            })?;
        drop(test_tess);

        tracing::info!(
            "Leptess engine initialized (tessdata: {:?}, language: {})",
            engine.tessdata_path,
            language
        );

        Ok(engine)
    }

    fn tessdata_str(&self) -> Result<&str, OcrError> {
        self.tessdata_path
            .to_str()
            .ok_or_else(|| OcrError::InitializationError("Invalid tessdata path".to_string()))
    }

    /// Download any missing `tessdata_fast` model for the requested languages
    fn ensure_languages(&self, language: &LanguageSpec) -> Result<(), OcrError> {
        for lang in language.languages() {
            let filename = format!("{}.traineddata", lang);
            if self.tessdata_path.join(&filename).exists() {
                continue;
            }
            if !self.managed {
                return Err(OcrError::InitializationError(format!(
                    "{} not found in {:?}",
                    filename, self.tessdata_path
                )));
            }
            download::ensure_downloaded(&tessdata_url(lang), &self.tessdata_path, &filename)?;
        }
        Ok(())
    }
}

impl Recognizer for LeptessEngine {
    fn name(&self) -> &'static str {
        "leptess"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - better for noisy phone photos, supports Japanese"
    }

    fn recognize(
        &self,
        image: &RasterImage,
        request: &RecognitionRequest,
        progress: &ProgressReporter,
    ) -> Result<RecognitionResult, OcrError> {
        let mut warnings = Vec::new();
        if request.options.engine_mode == EngineMode::Legacy {
            warnings.push(
                "tessdata_fast models are LSTM-only; legacy engine mode ignored".to_string(),
            );
        }

        progress.report("loading language traineddata", 0.0);
        self.ensure_languages(&request.language)
            .map_err(|e| OcrError::RecognitionFailure(e.to_string()))?;

        // BMP is always supported by leptonica
        let bmp_data = image
            .encode(image::ImageFormat::Bmp)
            .map_err(|e| OcrError::RecognitionFailure(e.to_string()))?;
        tracing::debug!(
            "Recognizing {}x{} image ({} bytes BMP, language {})",
            image.width(),
            image.height(),
            bmp_data.len(),
            request.language
        );

        progress.report("initializing api", 0.2);
        let language = request.language.to_string();
        let mut tess = Tesseract::new(Some(self.tessdata_str()?), Some(&language)).map_err(|e| {
            OcrError::RecognitionFailure(format!("Failed to create Tesseract: {}", e))
        })?;

        let psm = match request.options.page_segmentation {
            PageSegmentation::SingleBlock => "6",
            PageSegmentation::Auto => "3",
        };
        let preserve = if request.options.preserve_interword_spaces {
            "1"
        } else {
            "0"
        };
        tess = tess
            .set_variable("tessedit_pageseg_mode", psm)
            .and_then(|t| t.set_variable("preserve_interword_spaces", preserve))
            .map_err(|e| {
                OcrError::RecognitionFailure(format!("Failed to configure Tesseract: {}", e))
            })?;

        tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            OcrError::RecognitionFailure(format!(
                "Failed to set image ({}x{}): {}",
                image.width(),
                image.height(),
                e
            ))
        })?;

        progress.report("recognizing text", 0.4);
        tess = tess.recognize().map_err(|e| {
            OcrError::RecognitionFailure(format!("Failed to recognize text: {}", e))
        })?;

        let text = tess
            .get_text()
            .map_err(|e| OcrError::RecognitionFailure(format!("Failed to get text: {}", e)))?;
        progress.report("recognizing text", 1.0);

        Ok(RecognitionResult {
            text: text.trim().to_string(),
            warnings,
        })
    }

    fn supported_languages(&self) -> Vec<String> {
        // Any tessdata_fast language can be fetched; these are the ones
        // receipts most often need
        vec![
            "jpn".to_string(),
            "jpn_vert".to_string(),
            "eng".to_string(),
            "chi_sim".to_string(),
            "chi_tra".to_string(),
            "kor".to_string(),
        ]
    }
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}
