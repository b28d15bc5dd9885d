use crate::capture::RawImage;
use crate::config::Config;
use crate::engine::{RecognitionOptions, RecognitionRequest};
use crate::engines::{EngineInfo, EngineRegistry};
use crate::error::OcrError;
use crate::orchestrator::{JobEvent, JobOutcome, JobSnapshot, Orchestrator};
use crate::preprocessing::{ProcessingConfig, StepTiming};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

/// Room for multipart framing around the image itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub config: Arc<Config>,
    pub engines: Arc<Vec<EngineInfo>>,
}

/// Completed job response
#[derive(Serialize)]
pub struct ProcessResponse {
    pub text: String,
    pub raw_text: String,
    pub engine: String,
    pub processing_time_ms: u64,
    pub preprocessing_ms: u64,
    pub recognition_ms: u64,
    pub warnings: Vec<String>,
    pub steps: Vec<StepTiming>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine: String,
    pub available_engines: Vec<EngineInfo>,
    pub language: String,
    pub recognition: RecognitionOptions,
    pub preset: String,
    pub processing: ProcessingConfig,
    pub supported_formats: Vec<String>,
    pub max_file_size_bytes: usize,
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let registry = EngineRegistry::new(&config)?;
    let recognizer = registry.resolve(config.engine.as_deref())?;
    tracing::info!(
        "Using {} engine (default: {}, available: {})",
        recognizer.name(),
        registry.default_name(),
        registry.list().join(", ")
    );

    let orchestrator = Orchestrator::new(
        recognizer,
        config.processing,
        RecognitionRequest {
            language: config.language.clone(),
            options: config.recognition,
        },
    );
    tokio::spawn(log_events(orchestrator.subscribe()));
    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        engines: Arc::new(registry.info()),
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Log job events until the orchestrator is dropped. Returns how many were seen.
async fn log_events(mut events: broadcast::Receiver<JobEvent>) -> usize {
    let mut seen = 0;
    loop {
        match events.recv().await {
            Ok(JobEvent::Failed { message }) => {
                seen += 1;
                tracing::info!("Job failed: {}", message);
            }
            Ok(event) => {
                seen += 1;
                tracing::debug!(?event, "Job event");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Event log fell behind, skipped {} job events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return seen,
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    // Data URIs are a third larger than the bytes they carry
    let body_limit = state.config.max_file_size / 3 * 4 + MULTIPART_OVERHEAD;

    Router::new()
        .route("/capture", post(handle_capture))
        .route("/retry", post(handle_retry))
        .route("/process", post(handle_process))
        .route("/job", get(handle_job))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Accept a captured photo, as a `file` part or a `data_uri` text part
async fn handle_capture(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<JobSnapshot>, OcrError> {
    let mut image: Option<RawImage> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| OcrError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                let mime = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                if !mime.starts_with("image/") {
                    tracing::warn!("Received file with content type: {}", mime);
                }
                let data = field.bytes().await.map_err(|e| {
                    OcrError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?;
                image = Some(RawImage::Encoded(data.to_vec()));
            }
            "data_uri" => {
                let uri = field.text().await.map_err(|e| {
                    OcrError::InvalidRequest(format!("Invalid data URI field: {}", e))
                })?;
                image = Some(RawImage::DataUri(uri));
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let image = image.ok_or(OcrError::MissingFile)?;

    let size = image.payload_len();
    if size > state.config.max_file_size {
        return Err(OcrError::ImageTooLarge {
            size,
            max: state.config.max_file_size,
        });
    }

    state.orchestrator.select_image(image).map(Json)
}

/// Discard the held photo so a new one can be captured
async fn handle_retry(State(state): State<AppState>) -> Result<Json<JobSnapshot>, OcrError> {
    state.orchestrator.reset().map(Json)
}

/// Confirm the held photo and run it to completion.
///
/// The job runs on its own task, so it still settles if the client goes away.
async fn handle_process(
    State(state): State<AppState>,
) -> Result<Json<ProcessResponse>, OcrError> {
    let start = Instant::now();

    let orchestrator = Arc::clone(&state.orchestrator);
    let outcome = tokio::spawn(async move { orchestrator.confirm().await })
        .await
        .map_err(|e| OcrError::Internal(format!("Processing task failed: {}", e)))??;

    match outcome {
        JobOutcome::Completed(report) => {
            let processing_time_ms = start.elapsed().as_millis() as u64;
            tracing::info!(
                "OCR completed in {}ms, text length: {}",
                processing_time_ms,
                report.text.len()
            );

            Ok(Json(ProcessResponse {
                text: report.text,
                raw_text: report.raw_text,
                engine: state.orchestrator.recognizer().name().to_string(),
                processing_time_ms,
                preprocessing_ms: report.preprocessing_ms,
                recognition_ms: report.recognition_ms,
                warnings: report.warnings,
                steps: report.steps,
            }))
        }
        JobOutcome::Failed(err) => Err(err),
    }
}

async fn handle_job(State(state): State<AppState>) -> Json<JobSnapshot> {
    Json(state.orchestrator.snapshot())
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let orchestrator = &state.orchestrator;

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: orchestrator.recognizer().name().to_string(),
        available_engines: state.engines.as_ref().clone(),
        language: orchestrator.request().language.to_string(),
        recognition: orchestrator.request().options,
        preset: state.config.preset.as_str().to_string(),
        processing: *orchestrator.processing_config(),
        supported_formats: supported_formats(),
        max_file_size_bytes: state.config.max_file_size,
    })
}

fn supported_formats() -> Vec<String> {
    vec![
        "image/png".to_string(),
        "image/jpeg".to_string(),
        "image/gif".to_string(),
        "image/bmp".to_string(),
        "image/webp".to_string(),
        "image/tiff".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ProgressReporter, RecognitionResult, Recognizer};
    use crate::raster::RasterImage;

    struct Silent;

    impl Recognizer for Silent {
        fn name(&self) -> &'static str {
            "silent"
        }

        fn description(&self) -> &'static str {
            "never called"
        }

        fn recognize(
            &self,
            _image: &RasterImage,
            _request: &RecognitionRequest,
            _progress: &ProgressReporter,
        ) -> Result<RecognitionResult, OcrError> {
            Ok(RecognitionResult::default())
        }

        fn supported_languages(&self) -> Vec<String> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn test_event_log_drains_until_orchestrator_drops() {
        let orchestrator = Orchestrator::new(
            Arc::new(Silent),
            ProcessingConfig::default(),
            RecognitionRequest {
                language: "eng".parse().unwrap(),
                options: RecognitionOptions::default(),
            },
        );
        let logger = tokio::spawn(log_events(orchestrator.subscribe()));

        orchestrator
            .select_image(RawImage::Encoded(vec![1, 2, 3]))
            .unwrap();
        orchestrator.reset().unwrap();
        drop(orchestrator);

        assert_eq!(logger.await.unwrap(), 2);
    }
}
