use crate::error::OcrError;
use crate::raster::RasterImage;
use serde::Serialize;
use std::time::Instant;

use super::steps;

/// How RGB triples collapse into one gray value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GrayscaleStrategy {
    /// Perceptual weights 0.299 R + 0.587 G + 0.114 B
    #[default]
    LumaWeighted,
    /// Plain (R + G + B) / 3
    ChannelMean,
}

/// Named starting points for [`ProcessingConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// 2x upscale, luma-weighted gray, contrast 1.5, threshold 140
    #[default]
    Standard,
    /// No upscale, channel-mean gray, no contrast change, threshold 128
    Basic,
}

impl Preset {
    pub fn config(self) -> ProcessingConfig {
        match self {
            Self::Standard => ProcessingConfig {
                scale_factor: 2,
                contrast_coefficient: 1.5,
                binarization_threshold: 140,
                grayscale_strategy: GrayscaleStrategy::LumaWeighted,
            },
            Self::Basic => ProcessingConfig {
                scale_factor: 1,
                contrast_coefficient: 0.0,
                binarization_threshold: 128,
                grayscale_strategy: GrayscaleStrategy::ChannelMean,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Basic => "basic",
        }
    }
}

/// Largest accepted integer upscale factor
pub const MAX_SCALE_FACTOR: u32 = 8;

/// Parameters of one preprocessing run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProcessingConfig {
    pub scale_factor: u32,
    pub contrast_coefficient: f32,
    pub binarization_threshold: u8,
    pub grayscale_strategy: GrayscaleStrategy,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Preset::Standard.config()
    }
}

impl ProcessingConfig {
    pub fn basic() -> Self {
        Preset::Basic.config()
    }

    /// Reject parameters the transforms cannot honor
    pub fn validate(&self) -> Result<(), OcrError> {
        if !(1..=MAX_SCALE_FACTOR).contains(&self.scale_factor) {
            return Err(OcrError::InvalidConfig(format!(
                "scale factor must lie in 1..={}, got {}",
                MAX_SCALE_FACTOR, self.scale_factor
            )));
        }
        // The contrast factor's denominator vanishes at 259 and the slope turns
        // negative at or below -255.
        if !self.contrast_coefficient.is_finite()
            || self.contrast_coefficient <= -255.0
            || self.contrast_coefficient >= 259.0
        {
            return Err(OcrError::InvalidConfig(format!(
                "contrast coefficient must lie in (-255, 259), got {}",
                self.contrast_coefficient
            )));
        }
        Ok(())
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Preprocessed image (not serialized)
    #[serde(skip)]
    pub image: RasterImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Parameters the run used
    pub config: ProcessingConfig,
    /// Individual step timings, in execution order
    pub steps: Vec<StepTiming>,
}

/// Fixed preprocessing pipeline: scale, grayscale, contrast, binarize
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: ProcessingConfig,
}

impl Pipeline {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Turn a captured photo into a two-valued image ready for recognition.
    ///
    /// The output is at least as large as the input and every color channel is
    /// 0 or 255. An image without pixels, or one that would scale past the
    /// pixel budget, is rejected as `InvalidImage`.
    pub fn process(&self, image: &RasterImage) -> Result<PreprocessingResult, OcrError> {
        if image.is_empty() {
            return Err(OcrError::InvalidImage(format!(
                "{}x{} image has no pixels",
                image.width(),
                image.height()
            )));
        }

        let start = Instant::now();
        let mut steps_timing = Vec::new();
        let config = self.config;

        let img = self.run_step("scale", image, &mut steps_timing, |img| {
            steps::scale::apply(img, config.scale_factor)
        })?;
        let img = self.run_step("grayscale", &img, &mut steps_timing, |img| {
            Ok(steps::grayscale::apply(img, config.grayscale_strategy))
        })?;
        let img = self.run_step("contrast", &img, &mut steps_timing, |img| {
            Ok(steps::contrast::apply(img, config.contrast_coefficient))
        })?;
        let img = self.run_step("threshold", &img, &mut steps_timing, |img| {
            Ok(steps::threshold::apply(img, config.binarization_threshold))
        })?;

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "Preprocessed {}x{} -> {}x{} in {}ms",
            image.width(),
            image.height(),
            img.width(),
            img.height(),
            total_time_ms
        );

        Ok(PreprocessingResult {
            image: img,
            total_time_ms,
            config,
            steps: steps_timing,
        })
    }

    fn run_step<F>(
        &self,
        name: &str,
        img: &RasterImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<RasterImage, OcrError>
    where
        F: FnOnce(&RasterImage) -> Result<RasterImage, OcrError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms: step_start.elapsed().as_millis() as u64,
        });
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(width: u32, height: u32) -> RasterImage {
        RasterImage::from_fn(width, height, |x, y| {
            [
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                ((x + y) % 256) as u8,
                255,
            ]
        })
    }

    fn assert_binary(image: &RasterImage) {
        for pixel in image.pixels() {
            for channel in &pixel[..3] {
                assert!(*channel == 0 || *channel == 255, "got {}", channel);
            }
        }
    }

    #[test]
    fn test_standard_preset_doubles_and_binarizes() {
        let result = Pipeline::new(ProcessingConfig::default())
            .process(&photo(100, 100))
            .unwrap();

        assert_eq!(result.image.dimensions(), (200, 200));
        assert_binary(&result.image);
    }

    #[test]
    fn test_basic_preset_keeps_size() {
        let result = Pipeline::new(ProcessingConfig::basic())
            .process(&photo(40, 30))
            .unwrap();

        assert_eq!(result.image.dimensions(), (40, 30));
        assert_binary(&result.image);
    }

    #[test]
    fn test_steps_run_in_fixed_order() {
        let result = Pipeline::new(ProcessingConfig::default())
            .process(&photo(8, 8))
            .unwrap();

        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["scale", "grayscale", "contrast", "threshold"]);
    }

    #[test]
    fn test_matches_manual_composition() {
        let config = ProcessingConfig {
            scale_factor: 3,
            contrast_coefficient: 40.0,
            binarization_threshold: 100,
            grayscale_strategy: GrayscaleStrategy::ChannelMean,
        };
        let input = photo(10, 6);

        let expected = steps::threshold::apply(
            &steps::contrast::apply(
                &steps::grayscale::apply(
                    &steps::scale::apply(&input, 3).unwrap(),
                    config.grayscale_strategy,
                ),
                40.0,
            ),
            100,
        );
        let result = Pipeline::new(config).process(&input).unwrap();

        assert_eq!(result.image, expected);
    }

    #[test]
    fn test_input_is_not_modified() {
        let input = photo(12, 12);
        let copy = input.clone();
        Pipeline::new(ProcessingConfig::default())
            .process(&input)
            .unwrap();
        assert_eq!(input, copy);
    }

    #[test]
    fn test_zero_dimension_is_invalid_image() {
        let pipeline = Pipeline::new(ProcessingConfig::default());

        for (w, h) in [(0, 0), (0, 10), (10, 0)] {
            let err = pipeline.process(&RasterImage::filled(w, h, [0; 4])).unwrap_err();
            assert!(matches!(err, OcrError::InvalidImage(_)), "{}x{}", w, h);
        }
    }

    #[test]
    fn test_dark_ink_stays_black_light_paper_turns_white() {
        let input = RasterImage::from_fn(20, 20, |x, _| {
            if x < 10 {
                [30, 35, 40, 255]
            } else {
                [230, 225, 210, 255]
            }
        });
        let result = Pipeline::new(ProcessingConfig::default())
            .process(&input)
            .unwrap();

        assert_eq!(result.image.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(result.image.pixel(39, 39), [255, 255, 255, 255]);
    }

    #[test]
    fn test_validate_rejects_unusable_parameters() {
        assert!(ProcessingConfig::default().validate().is_ok());
        assert!(ProcessingConfig::basic().validate().is_ok());

        let zero_scale = ProcessingConfig {
            scale_factor: 0,
            ..ProcessingConfig::default()
        };
        assert!(matches!(zero_scale.validate(), Err(OcrError::InvalidConfig(_))));

        for scale_factor in [MAX_SCALE_FACTOR + 1, 2_000_000_000] {
            let config = ProcessingConfig {
                scale_factor,
                ..ProcessingConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(OcrError::InvalidConfig(_))),
                "scale {} accepted",
                scale_factor
            );
        }
        let largest = ProcessingConfig {
            scale_factor: MAX_SCALE_FACTOR,
            ..ProcessingConfig::default()
        };
        assert!(largest.validate().is_ok());

        for coefficient in [259.0, 300.0, -255.0, f32::NAN] {
            let config = ProcessingConfig {
                contrast_coefficient: coefficient,
                ..ProcessingConfig::default()
            };
            assert!(config.validate().is_err(), "{} accepted", coefficient);
        }
    }

    #[test]
    fn test_oversized_output_is_invalid_image() {
        // Pipeline built without validation still refuses to allocate
        let pipeline = Pipeline::new(ProcessingConfig {
            scale_factor: 2_000_000_000,
            ..ProcessingConfig::default()
        });
        let err = pipeline.process(&photo(3, 1)).unwrap_err();
        assert!(matches!(err, OcrError::InvalidImage(_)));
    }
}
