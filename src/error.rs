use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Request-level failures. Both map to HTTP 400 with an `{"error": ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Input must be a JSON object or an array of objects.")]
    InvalidInputShape,

    #[error("{0}")]
    Prediction(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
