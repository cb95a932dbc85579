use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

use crate::database::StoreError;

/// Request-level failures, rendered as structured JSON.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing 'name'")]
    MissingName,
    #[error("Invalid JSON body")]
    InvalidBody,
    #[error("Unknown endpoint")]
    UnknownEndpoint,
    #[error("storage query failed: {0}")]
    Store(#[from] StoreError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingName | ApiError::InvalidBody => StatusCode::BAD_REQUEST,
            ApiError::UnknownEndpoint => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}
