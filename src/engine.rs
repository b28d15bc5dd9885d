use crate::error::OcrError;
use crate::raster::RasterImage;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tokio::sync::mpsc;

/// Expected layout of text regions in the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PageSegmentation {
    /// One uniform block of text, typical for a cropped receipt
    #[default]
    SingleBlock,
    /// Let the engine detect regions on its own
    Auto,
}

/// Recognition model family the engine should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EngineMode {
    #[default]
    LstmOnly,
    Legacy,
}

/// Engine settings for one recognition call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecognitionOptions {
    pub page_segmentation: PageSegmentation,
    pub engine_mode: EngineMode,
    pub preserve_interword_spaces: bool,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            page_segmentation: PageSegmentation::SingleBlock,
            engine_mode: EngineMode::LstmOnly,
            preserve_interword_spaces: true,
        }
    }
}

/// One or more language models joined with `+`, e.g. `jpn+eng`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSpec {
    languages: Vec<String>,
}

impl LanguageSpec {
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn contains(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }
}

impl FromStr for LanguageSpec {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut languages: Vec<String> = Vec::new();
        for raw in s.split('+') {
            let lang = raw.trim();
            if lang.is_empty() {
                continue;
            }
            if !lang
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(OcrError::InvalidConfig(format!(
                    "invalid language code: {:?}",
                    lang
                )));
            }
            if !languages.iter().any(|l| l == lang) {
                languages.push(lang.to_string());
            }
        }

        if languages.is_empty() {
            return Err(OcrError::InvalidConfig("language spec is empty".to_string()));
        }
        Ok(Self { languages })
    }
}

impl fmt::Display for LanguageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.languages.join("+"))
    }
}

/// Everything a recognizer needs besides the image
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub language: LanguageSpec,
    pub options: RecognitionOptions,
}

/// Raw engine output
#[derive(Debug, Clone, Default)]
pub struct RecognitionResult {
    pub text: String,
    pub warnings: Vec<String>,
}

/// Progress notification emitted while an engine works
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionProgress {
    pub status: String,
    /// Fraction of the current call completed, 0.0 to 1.0
    pub progress: f32,
}

/// Sending half of a recognition progress stream.
///
/// Reporting never fails; updates are dropped once nobody listens.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<RecognitionProgress>>,
}

impl ProgressReporter {
    pub fn new(tx: mpsc::UnboundedSender<RecognitionProgress>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RecognitionProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn report(&self, status: &str, progress: f32) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(RecognitionProgress {
                status: status.to_string(),
                progress: progress.clamp(0.0, 1.0),
            });
        }
    }
}

/// Trait that all OCR engines must implement
pub trait Recognizer: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize the text in a preprocessed image
    fn recognize(
        &self,
        image: &RasterImage,
        request: &RecognitionRequest,
        progress: &ProgressReporter,
    ) -> Result<RecognitionResult, OcrError>;

    /// Get supported languages
    fn supported_languages(&self) -> Vec<String>;
}
