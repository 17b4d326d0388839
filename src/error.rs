use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Request-level failures. Every handler error maps onto one of these and is
/// rendered as a `{"message": "..."}` JSON body with the matching status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No input data provided")]
    MissingBody,

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Unauthorized")
    }

    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized("Invalid username or password")
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        ApiError::Unprocessable(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::MissingBody => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let ApiError::Internal(ref e) = self {
            tracing::error!(error = %e, "internal error");
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
