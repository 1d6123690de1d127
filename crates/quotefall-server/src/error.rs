use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use quotefall_portfolio::StoreError;

/// API-level error categories mapped to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or invalid access key")]
    Unauthorized,

    #[error("this operation requires the admin key")]
    Forbidden,

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::UnknownInvestment(_)) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<quotefall_core::ValidationError> for ApiError {
    fn from(error: quotefall_core::ValidationError) -> Self {
        Self::BadRequest(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
