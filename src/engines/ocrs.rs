//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use. The models only
//! cover the Latin alphabet, so Japanese receipts need the Tesseract engine.

use super::download;
use crate::engine::{
    EngineMode, PageSegmentation, ProgressReporter, RecognitionRequest, RecognitionResult,
    Recognizer,
};
use crate::error::OcrError;
use crate::raster::RasterImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// OCR Engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: OcrsOcrEngine,
}

impl OcrsEngine {
    /// Create the engine, downloading models if needed
    pub fn new() -> Result<Self, OcrError> {
        let cache_dir = download::cache_dir(None)?;
        let detection_model_path =
            download::ensure_downloaded(DETECTION_MODEL_URL, &cache_dir, "text-detection.rten")?;
        let recognition_model_path = download::ensure_downloaded(
            RECOGNITION_MODEL_URL,
            &cache_dir,
            "text-recognition.rten",
        )?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            OcrError::InitializationError(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            OcrError::InitializationError(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            OcrError::InitializationError(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }
}

impl Recognizer for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - fast, no system dependencies required"
    }

    fn recognize(
        &self,
        image: &RasterImage,
        request: &RecognitionRequest,
        progress: &ProgressReporter,
    ) -> Result<RecognitionResult, OcrError> {
        let warnings = option_warnings(request);
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        // ImageSource::from_bytes expects HWC bytes
        let rgb_img = image.to_dynamic().into_rgb8();
        let dimensions = rgb_img.dimensions();

        progress.report("preparing input", 0.0);
        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            OcrError::RecognitionFailure(format!("Failed to create image source: {}", e))
        })?;
        let ocr_input = self.engine.prepare_input(img_source).map_err(|e| {
            OcrError::RecognitionFailure(format!("Failed to prepare input: {}", e))
        })?;

        progress.report("detecting words", 0.25);
        let word_rects = self.engine.detect_words(&ocr_input).map_err(|e| {
            OcrError::RecognitionFailure(format!("Failed to detect words: {}", e))
        })?;

        progress.report("grouping lines", 0.5);
        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        progress.report("recognizing text", 0.6);
        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| OcrError::RecognitionFailure(format!("Failed to recognize text: {}", e)))?;

        let separator = if request.options.preserve_interword_spaces {
            " "
        } else {
            ""
        };
        let text = line_texts
            .iter()
            .filter_map(|line| line.as_ref())
            .map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(separator)
            })
            .collect::<Vec<_>>()
            .join("\n");

        progress.report("recognizing text", 1.0);

        Ok(RecognitionResult { text, warnings })
    }

    fn supported_languages(&self) -> Vec<String> {
        // ocrs currently only supports English/Latin alphabet
        vec!["eng".to_string()]
    }
}

/// Caveats for request settings ocrs cannot honor
fn option_warnings(request: &RecognitionRequest) -> Vec<String> {
    let mut warnings = Vec::new();

    if !request.language.contains("eng") {
        warnings.push(format!(
            "ocrs only recognizes Latin script; requested '{}'",
            request.language
        ));
    }
    if request.options.page_segmentation == PageSegmentation::SingleBlock {
        warnings.push("ocrs always detects text regions automatically".to_string());
    }
    if request.options.engine_mode == EngineMode::Legacy {
        warnings.push("ocrs has no legacy engine; using its neural models".to_string());
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RecognitionOptions;

    fn request(language: &str, options: RecognitionOptions) -> RecognitionRequest {
        RecognitionRequest {
            language: language.parse().unwrap(),
            options,
        }
    }

    #[test]
    fn test_no_warnings_for_supported_settings() {
        let options = RecognitionOptions {
            page_segmentation: PageSegmentation::Auto,
            ..RecognitionOptions::default()
        };
        assert!(option_warnings(&request("eng", options)).is_empty());
        assert!(option_warnings(&request("jpn+eng", options)).is_empty());
    }

    #[test]
    fn test_warns_about_unsupported_language_and_modes() {
        let options = RecognitionOptions {
            page_segmentation: PageSegmentation::SingleBlock,
            engine_mode: EngineMode::Legacy,
            preserve_interword_spaces: true,
        };
        let warnings = option_warnings(&request("jpn", options));
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("jpn"));
    }
}
