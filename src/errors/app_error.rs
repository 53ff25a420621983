//! Application error taxonomy.
//!
//! Every failure a client-facing operation can surface is one of these
//! variants. All of them are recovered at the handler boundary and rendered
//! as a `{code, message}` JSON body; none of them crash the serving process.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// The persistence layer is unreachable or closed. Degraded mode:
    /// requests are denied, the process keeps serving.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Unknown or expired session token
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// The session's generation counter has reached the quota
    #[error("generation limit reached")]
    QuotaExceeded,

    /// Unknown voice profile id
    #[error("voice profile not found: {0}")]
    ProfileNotFound(i64),

    /// Empty or over-length input text
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The external text-to-speech collaborator failed or timed out
    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(String),

    /// The external object-storage collaborator failed or is not configured
    #[error("audio storage failed: {0}")]
    StorageFailed(String),
}

impl AppError {
    /// Machine-readable error code carried in the response body
    pub fn code(&self) -> &'static str {
        match self {
            AppError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            AppError::InvalidSession(_) => "INVALID_SESSION",
            AppError::QuotaExceeded => "QUOTA_EXCEEDED",
            AppError::ProfileNotFound(_) => "PROFILE_NOT_FOUND",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::SynthesisFailed(_) => "SYNTHESIS_FAILED",
            AppError::StorageFailed(_) => "STORAGE_FAILED",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidSession(_) => StatusCode::NOT_FOUND,
            AppError::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::SynthesisFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::StorageFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => {
                AppError::StorageUnavailable("datastore unavailable".to_string())
            }
            // A row vanishing mid-operation reads as an invalid session at the
            // client boundary; profile lookups map NotFound explicitly.
            StoreError::NotFound => AppError::InvalidSession("record not found".to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
