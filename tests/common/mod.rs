#![allow(dead_code)]

use receipt_ocr::engine::{
    ProgressReporter, RecognitionOptions, RecognitionRequest, RecognitionResult, Recognizer,
};
use receipt_ocr::{OcrError, RasterImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Mutex};

/// Recognizer that returns canned text and records what it was given
pub struct ScriptedRecognizer {
    reply: Result<String, String>,
    calls: AtomicUsize,
    last_dimensions: Mutex<Option<(u32, u32)>>,
}

impl ScriptedRecognizer {
    pub fn text(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            last_dimensions: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            ..Self::text("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_dimensions(&self) -> Option<(u32, u32)> {
        *self.last_dimensions.lock().unwrap()
    }
}

impl Recognizer for ScriptedRecognizer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn description(&self) -> &'static str {
        "Canned recognizer for tests"
    }

    fn recognize(
        &self,
        image: &RasterImage,
        _request: &RecognitionRequest,
        progress: &ProgressReporter,
    ) -> Result<RecognitionResult, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_dimensions.lock().unwrap() = Some(image.dimensions());
        progress.report("recognizing text", 1.0);

        match &self.reply {
            Ok(text) => Ok(RecognitionResult {
                text: text.clone(),
                warnings: vec!["scripted".to_string()],
            }),
            Err(message) => Err(OcrError::RecognitionFailure(message.clone())),
        }
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["jpn".to_string(), "eng".to_string()]
    }
}

/// Recognizer that signals when it starts and blocks until released
pub struct GatedRecognizer {
    started: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl GatedRecognizer {
    /// Returns the recognizer, the "started" receiver and the release sender
    pub fn new() -> (Self, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let recognizer = Self {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        };
        (recognizer, started_rx, release_tx)
    }
}

impl Recognizer for GatedRecognizer {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn description(&self) -> &'static str {
        "Blocks until the test releases it"
    }

    fn recognize(
        &self,
        _image: &RasterImage,
        _request: &RecognitionRequest,
        _progress: &ProgressReporter,
    ) -> Result<RecognitionResult, OcrError> {
        let _ = self.started.lock().unwrap().send(());
        let _ = self.release.lock().unwrap().recv();
        Ok(RecognitionResult {
            text: "released".to_string(),
            warnings: Vec::new(),
        })
    }

    fn supported_languages(&self) -> Vec<String> {
        Vec::new()
    }
}

pub fn request() -> RecognitionRequest {
    RecognitionRequest {
        language: "jpn+eng".parse().unwrap(),
        options: RecognitionOptions::default(),
    }
}

/// Light receipt paper with a few dark print rows
pub fn receipt_raster(width: u32, height: u32) -> RasterImage {
    RasterImage::from_fn(width, height, |x, y| {
        if (y / 4) % 3 == 0 && x % 7 != 0 {
            [30, 28, 25, 255]
        } else {
            [240, 236, 228, 255]
        }
    })
}

pub fn receipt_png(width: u32, height: u32) -> Vec<u8> {
    receipt_raster(width, height)
        .encode(image::ImageFormat::Png)
        .unwrap()
}
