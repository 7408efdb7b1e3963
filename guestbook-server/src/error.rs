//! Mapping of library errors onto HTTP responses.
//!
//! Every client-side failure becomes `400 {"message": reason}`. Storage and
//! registry failures are logged here and answered with a bare 500 so no
//! internal detail leaks to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use guestbook_core::{AdmissionError, RegistryError, RejectionKind, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Generic reason for bodies and query strings that fail to parse.
pub const MALFORMED_REQUEST: &str = "There was an error with the request.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{}", MALFORMED_REQUEST)]
    MalformedRequest,

    #[error("internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl ApiError {
    /// Log `err` and collapse it into an opaque 500.
    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        error!(%err, "{context}");
        ApiError::Internal
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_)
            | ApiError::ValidationFailed(_)
            | ApiError::RateLimited(_)
            | ApiError::MalformedRequest => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateId(_) | StoreError::TimestampOutOfRange(_) => {
                ApiError::ValidationFailed(err.to_string())
            }
            other => ApiError::internal("storage failure", other),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidName(_) => ApiError::ValidationFailed(err.to_string()),
            other => ApiError::internal("site registry failure", other),
        }
    }
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::Rejected(rejection) => match rejection.kind {
                RejectionKind::NotFound => ApiError::NotFound(rejection.reason),
                RejectionKind::RateLimited => ApiError::RateLimited(rejection.reason),
                RejectionKind::ValidationFailed => ApiError::ValidationFailed(rejection.reason),
            },
            AdmissionError::Store(err) => err.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
