use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LineArtError {
    /// The caller sent something that can never be converted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A pipeline stage failed on input that was otherwise valid.
    #[error("Conversion failed: {0}")]
    ProcessingFailure(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Conversion exceeded {secs}s deadline")]
    Timeout { secs: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LineArtError {
    /// Whether the failure should be reported to the caller as a 4xx.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LineArtError::InvalidInput(_) | LineArtError::InvalidRequest(_)
        )
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for LineArtError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            LineArtError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            LineArtError::ProcessingFailure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_FAILURE")
            }
            LineArtError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            LineArtError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "CONVERSION_TIMEOUT"),
            LineArtError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
