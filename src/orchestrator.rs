//! Capture/process state machine.
//!
//! One receipt at a time moves through
//! `Idle -> ImageSelected -> Processing -> Completed | Failed -> Idle`.
//! The held image lives in the orchestrator and is only touched on transitions.

use crate::capture::RawImage;
use crate::correction::CorrectionRuleSet;
use crate::engine::{ProgressReporter, RecognitionProgress, RecognitionRequest, Recognizer};
use crate::error::OcrError;
use crate::preprocessing::{Pipeline, PreprocessingResult, ProcessingConfig, StepTiming};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::broadcast;

/// Capacity of the presentation event channel
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    ImageSelected,
    Processing,
    Completed,
    Failed,
}

/// Inputs that move a job between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTrigger {
    /// An image arrived from the capture side
    Capture,
    /// Retry requested; drop the held image
    Reset,
    /// Use the held image
    Confirm,
    /// Preprocessing, recognition and correction finished
    Succeed,
    /// Any stage of the job failed
    Fail,
    /// Failure reported, back to capture-ready
    Recover,
}

impl JobState {
    /// Next state for `trigger`, or the error that rejects it
    pub fn on(self, trigger: JobTrigger) -> Result<JobState, OcrError> {
        use JobState::*;
        use JobTrigger::*;

        match (self, trigger) {
            (Processing, Capture | Reset | Confirm) => Err(OcrError::JobInFlight),

            (Idle | ImageSelected | Completed, Capture) => Ok(ImageSelected),
            (Failed, Capture) => Err(OcrError::InvalidRequest(
                "previous job has not recovered yet".to_string(),
            )),

            (_, Reset) => Ok(Idle),

            (ImageSelected, Confirm) => Ok(Processing),
            (_, Confirm) => Err(OcrError::NoImageSelected),

            (Processing, Succeed) => Ok(Completed),
            (Processing, Fail) => Ok(Failed),
            (Failed, Recover) => Ok(Idle),

            (state, trigger) => Err(OcrError::Internal(format!(
                "{:?} cannot handle {:?}",
                state, trigger
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::ImageSelected => "image_selected",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

/// Notification for the presentation side
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    ImageSelected { bytes: usize },
    Reset,
    Processing { status: String, progress: f32 },
    Completed { text: String },
    Failed { message: String },
}

/// Point-in-time view of the orchestrator
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub state: JobState,
    pub progress: Option<RecognitionProgress>,
    pub text: Option<String>,
    pub error: Option<String>,
}

/// What a finished job produced
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    /// Corrected text
    pub text: String,
    /// Text exactly as the engine returned it
    pub raw_text: String,
    pub warnings: Vec<String>,
    pub preprocessing_ms: u64,
    pub recognition_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// How a confirmed job ended
#[derive(Debug)]
pub enum JobOutcome {
    Completed(JobReport),
    Failed(OcrError),
}

#[derive(Debug)]
struct Slot {
    state: JobState,
    held: Option<RawImage>,
    progress: Option<RecognitionProgress>,
    text: Option<String>,
    error: Option<String>,
}

pub struct Orchestrator {
    slot: Mutex<Slot>,
    pipeline: Pipeline,
    corrector: CorrectionRuleSet,
    recognizer: Arc<dyn Recognizer>,
    request: RecognitionRequest,
    events: broadcast::Sender<JobEvent>,
}

impl Orchestrator {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        processing: ProcessingConfig,
        request: RecognitionRequest,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            slot: Mutex::new(Slot {
                state: JobState::Idle,
                held: None,
                progress: None,
                text: None,
                error: None,
            }),
            pipeline: Pipeline::new(processing),
            corrector: CorrectionRuleSet::default(),
            recognizer,
            request,
            events,
        }
    }

    pub fn recognizer(&self) -> &Arc<dyn Recognizer> {
        &self.recognizer
    }

    pub fn request(&self) -> &RecognitionRequest {
        &self.request
    }

    pub fn processing_config(&self) -> &ProcessingConfig {
        self.pipeline.config()
    }

    /// Stream of transition notifications
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> JobState {
        self.lock().state
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let slot = self.lock();
        JobSnapshot {
            state: slot.state,
            progress: slot.progress.clone(),
            text: slot.text.clone(),
            error: slot.error.clone(),
        }
    }

    /// Hold a freshly captured image. Replaces any image already held and
    /// drops a previous result. Rejected while a job is processing.
    pub fn select_image(&self, image: RawImage) -> Result<JobSnapshot, OcrError> {
        {
            let mut slot = self.lock();
            let next = slot.state.on(JobTrigger::Capture)?;
            if image.is_empty() {
                return Err(OcrError::InvalidImage("captured image is empty".to_string()));
            }

            let bytes = image.len();
            slot.state = next;
            slot.held = Some(image);
            slot.progress = None;
            slot.text = None;
            slot.error = None;

            tracing::info!("Image selected ({} bytes)", bytes);
            self.emit(JobEvent::ImageSelected { bytes });
        }
        Ok(self.snapshot())
    }

    /// Discard the held image and return to `Idle`
    pub fn reset(&self) -> Result<JobSnapshot, OcrError> {
        {
            let mut slot = self.lock();
            slot.state = slot.state.on(JobTrigger::Reset)?;
            slot.held = None;
            slot.progress = None;
            slot.text = None;

            tracing::debug!("Job reset");
            self.emit(JobEvent::Reset);
        }
        Ok(self.snapshot())
    }

    /// Run preprocessing, recognition and correction on the held image.
    ///
    /// Returns `Err` only when the request is rejected up front (no image held,
    /// or a job already running); nothing changes in that case. Failures of
    /// the job itself come back as `JobOutcome::Failed` after the orchestrator
    /// is capture-ready again.
    pub async fn confirm(&self) -> Result<JobOutcome, OcrError> {
        let raw = {
            let mut slot = self.lock();
            let next = slot.state.on(JobTrigger::Confirm)?;
            let raw = slot.held.take().ok_or(OcrError::NoImageSelected)?;
            slot.state = next;
            slot.progress = None;
            raw
        };

        tracing::info!(
            "Processing receipt with {} ({})",
            self.recognizer.name(),
            self.request.language
        );
        self.emit(JobEvent::Processing {
            status: "preprocessing".to_string(),
            progress: 0.0,
        });

        let mut in_flight = InFlight {
            orchestrator: self,
            armed: true,
        };
        let result = self.run_job(raw).await;
        in_flight.armed = false;

        let mut slot = self.lock();
        match result {
            Ok(report) => {
                slot.state = slot.state.on(JobTrigger::Succeed)?;
                slot.text = Some(report.text.clone());
                slot.error = None;

                tracing::info!(
                    "Receipt processed: preprocessing {}ms, recognition {}ms, {} chars",
                    report.preprocessing_ms,
                    report.recognition_ms,
                    report.text.chars().count()
                );
                self.emit(JobEvent::Completed {
                    text: report.text.clone(),
                });
                Ok(JobOutcome::Completed(report))
            }
            Err(err) => {
                tracing::warn!("Receipt processing failed: {}", err);
                self.fail(&mut slot, err.to_string())?;
                Ok(JobOutcome::Failed(err))
            }
        }
    }

    /// `Processing -> Failed -> Idle`, keeping `message` for the snapshot
    fn fail(&self, slot: &mut Slot, message: String) -> Result<(), OcrError> {
        slot.state = slot.state.on(JobTrigger::Fail)?;
        self.emit(JobEvent::Failed {
            message: message.clone(),
        });
        slot.state = slot.state.on(JobTrigger::Recover)?;
        slot.progress = None;
        slot.text = None;
        slot.error = Some(message);
        Ok(())
    }

    async fn run_job(&self, raw: RawImage) -> Result<JobReport, OcrError> {
        let pipeline = self.pipeline.clone();
        let prepared = tokio::task::spawn_blocking(move || {
            let image = raw.decode()?;
            tracing::debug!("Decoded {}x{} capture", image.width(), image.height());
            pipeline.process(&image)
        })
        .await
        .map_err(|e| OcrError::Internal(format!("Preprocessing task failed: {}", e)))??;

        let PreprocessingResult {
            image,
            total_time_ms: preprocessing_ms,
            steps,
            ..
        } = prepared;

        let recognition_start = Instant::now();
        let (reporter, mut updates) = ProgressReporter::channel();
        let recognizer = Arc::clone(&self.recognizer);
        let request = self.request.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            recognizer.recognize(&image, &request, &reporter)
        });

        let joined = loop {
            tokio::select! {
                biased;
                Some(update) = updates.recv() => self.record_progress(update),
                joined = &mut task => break joined,
            }
        };
        while let Ok(update) = updates.try_recv() {
            self.record_progress(update);
        }

        let recognized = joined.map_err(|e| {
            OcrError::RecognitionFailure(format!("Recognition task failed: {}", e))
        })??;
        let recognition_ms = recognition_start.elapsed().as_millis() as u64;

        let text = self.corrector.correct(&recognized.text);

        Ok(JobReport {
            text,
            raw_text: recognized.text,
            warnings: recognized.warnings,
            preprocessing_ms,
            recognition_ms,
            steps,
        })
    }

    fn record_progress(&self, update: RecognitionProgress) {
        tracing::debug!("{} ({:.0}%)", update.status, update.progress * 100.0);
        self.lock().progress = Some(update.clone());
        self.emit(JobEvent::Processing {
            status: update.status,
            progress: update.progress,
        });
    }

    fn emit(&self, event: JobEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Armed while `confirm` awaits the job. If the future is dropped before the
/// job settles, the job is failed so the orchestrator is capture-ready again.
struct InFlight<'a> {
    orchestrator: &'a Orchestrator,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut slot = self.orchestrator.lock();
        if slot.state != JobState::Processing {
            return;
        }
        tracing::warn!("Receipt processing abandoned before it finished");
        let message = "processing was abandoned before it finished".to_string();
        if let Err(err) = self.orchestrator.fail(&mut slot, message) {
            tracing::error!("Failed to settle abandoned job: {}", err);
        }
    }
}
