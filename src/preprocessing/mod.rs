//! Image preprocessing for receipt photos
//!
//! Turns a captured photo into a two-valued image that OCR engines read reliably.

pub mod pipeline;
pub mod steps;

pub use pipeline::{
    GrayscaleStrategy, Pipeline, PreprocessingResult, Preset, ProcessingConfig, StepTiming,
};
