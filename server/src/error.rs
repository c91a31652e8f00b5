use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lockstep_core::UploadResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("No file")]
    MissingFile,

    #[error("Invalid filename")]
    InvalidFilename,

    #[error("Upload interrupted: {0}")]
    Multipart(#[from] MultipartError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFile | AppError::InvalidFilename => StatusCode::BAD_REQUEST,
            AppError::Multipart(e) => e.status(),
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = UploadResponse {
            url: None,
            error: Some(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
