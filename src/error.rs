use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("No image selected")]
    NoImageSelected,

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Recognition failed: {0}")]
    RecognitionFailure(String),

    #[error("A receipt is already being processed")]
    JobInFlight,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            OcrError::NoImageSelected => "NO_IMAGE_SELECTED",
            OcrError::InvalidImage(_) => "INVALID_IMAGE",
            OcrError::RecognitionFailure(_) => "RECOGNITION_FAILURE",
            OcrError::JobInFlight => "JOB_IN_FLIGHT",
            OcrError::InvalidConfig(_) => "INVALID_CONFIG",
            OcrError::InitializationError(_) => "INIT_ERROR",
            OcrError::ImageTooLarge { .. } => "IMAGE_TOO_LARGE",
            OcrError::MissingFile => "MISSING_FILE",
            OcrError::InvalidRequest(_) => "INVALID_REQUEST",
            OcrError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            OcrError::NoImageSelected => StatusCode::CONFLICT,
            OcrError::InvalidImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            OcrError::RecognitionFailure(_) => StatusCode::BAD_GATEWAY,
            OcrError::JobInFlight => StatusCode::CONFLICT,
            OcrError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            OcrError::InitializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OcrError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            OcrError::MissingFile => StatusCode::BAD_REQUEST,
            OcrError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            OcrError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}
