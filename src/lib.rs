//! Receipt photo preprocessing, OCR and text normalization.
//!
//! A captured photo is held by the [`orchestrator::Orchestrator`] until the
//! user confirms it, then run through the [`preprocessing::Pipeline`], handed
//! to a [`engine::Recognizer`], and cleaned up by [`correction`].

pub mod capture;
pub mod config;
pub mod correction;
pub mod engine;
pub mod engines;
pub mod error;
pub mod orchestrator;
pub mod preprocessing;
pub mod raster;
pub mod server;

pub use capture::RawImage;
pub use config::{Args, Config};
pub use error::OcrError;
pub use orchestrator::{JobEvent, JobOutcome, JobReport, JobState, Orchestrator};
pub use raster::RasterImage;
