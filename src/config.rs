use crate::engine::{EngineMode, LanguageSpec, PageSegmentation, RecognitionOptions};
use crate::error::OcrError;
use crate::preprocessing::{GrayscaleStrategy, Preset, ProcessingConfig};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "receipt-ocr")]
#[command(about = "Receipt photo preprocessing and OCR server")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "RECEIPT_OCR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "RECEIPT_OCR_PORT", default_value = "9292")]
    pub port: u16,

    /// Maximum capture size in bytes (default: 50MB)
    #[arg(long, env = "RECEIPT_OCR_MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: usize,

    /// OCR engine to use (defaults to the first compiled-in engine)
    #[arg(long, env = "RECEIPT_OCR_ENGINE")]
    pub engine: Option<String>,

    /// Recognition languages joined with '+'
    #[arg(long, env = "RECEIPT_OCR_LANGUAGE", default_value = "jpn+eng")]
    pub language: String,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Expected text layout
    #[arg(long, env = "RECEIPT_OCR_PAGE_SEGMENTATION", value_enum, default_value_t = PageSegmentation::SingleBlock)]
    pub page_segmentation: PageSegmentation,

    /// Recognition model family
    #[arg(long, env = "RECEIPT_OCR_ENGINE_MODE", value_enum, default_value_t = EngineMode::LstmOnly)]
    pub engine_mode: EngineMode,

    /// Keep spacing between words in the engine output
    #[arg(
        long,
        env = "RECEIPT_OCR_PRESERVE_INTERWORD_SPACES",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub preserve_interword_spaces: bool,

    /// Preprocessing preset
    #[arg(long, env = "RECEIPT_OCR_PRESET", value_enum, default_value_t = Preset::Standard)]
    pub preset: Preset,

    /// Override the preset's integer scale factor (1 to 8)
    #[arg(long, env = "RECEIPT_OCR_SCALE_FACTOR")]
    pub scale_factor: Option<u32>,

    /// Override the preset's contrast coefficient
    #[arg(long, env = "RECEIPT_OCR_CONTRAST", allow_hyphen_values = true)]
    pub contrast: Option<f32>,

    /// Override the preset's binarization threshold
    #[arg(long, env = "RECEIPT_OCR_THRESHOLD")]
    pub threshold: Option<u8>,

    /// Override the preset's grayscale formula
    #[arg(long, env = "RECEIPT_OCR_GRAYSCALE", value_enum)]
    pub grayscale: Option<GrayscaleStrategy>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub engine: Option<String>,
    pub language: LanguageSpec,
    pub tessdata_path: Option<String>,
    pub recognition: RecognitionOptions,
    pub preset: Preset,
    pub processing: ProcessingConfig,
}

impl TryFrom<Args> for Config {
    type Error = OcrError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let mut processing = args.preset.config();
        if let Some(scale_factor) = args.scale_factor {
            processing.scale_factor = scale_factor;
        }
        if let Some(contrast) = args.contrast {
            processing.contrast_coefficient = contrast;
        }
        if let Some(threshold) = args.threshold {
            processing.binarization_threshold = threshold;
        }
        if let Some(grayscale) = args.grayscale {
            processing.grayscale_strategy = grayscale;
        }
        processing.validate()?;

        if args.max_file_size == 0 {
            return Err(OcrError::InvalidConfig(
                "max file size must be positive".to_string(),
            ));
        }

        Ok(Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            engine: args.engine,
            language: args.language.parse()?,
            tessdata_path: args.tessdata_path,
            recognition: RecognitionOptions {
                page_segmentation: args.page_segmentation,
                engine_mode: args.engine_mode,
                preserve_interword_spaces: args.preserve_interword_spaces,
            },
            preset: args.preset,
            processing,
        })
    }
}
