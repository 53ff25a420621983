//! Authentication middleware errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingAuthHeader,

    #[error("invalid Authorization header")]
    InvalidAuthHeader,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("auth configuration error: {0}")]
    ConfigError(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "code": "UNAUTHORIZED",
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}
