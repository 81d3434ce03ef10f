use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::MedibotError;
use crate::screening::ScreeningError;

/// Error returned by every route handler
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unprocessable(String),
    /// A required credential is not configured
    ServiceUnavailable(String),
    /// The index, embedder or hosted model failed
    BadGateway(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::BadGateway(msg) => {
                tracing::warn!("backend failure: {msg}");
                (StatusCode::BAD_GATEWAY, format!("An error occurred: {msg}"))
            }
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<ScreeningError> for ApiError {
    fn from(e: ScreeningError) -> Self {
        match e {
            ScreeningError::UnknownQuestionnaire(_) => ApiError::NotFound(e.to_string()),
            _ => ApiError::Unprocessable(e.to_string()),
        }
    }
}

impl From<MedibotError> for ApiError {
    fn from(e: MedibotError) -> Self {
        if e.is_backend_failure() {
            return ApiError::BadGateway(e.to_string());
        }

        let message = e.to_string();
        match e {
            MedibotError::MissingCredential { .. } => ApiError::ServiceUnavailable(message),
            MedibotError::SessionNotFound { .. } => ApiError::NotFound(message),
            MedibotError::InvalidInput(msg) => ApiError::BadRequest(msg),
            MedibotError::Screening(inner) => inner.into(),
            _ => ApiError::Internal(message),
        }
    }
}
