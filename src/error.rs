use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::audio::EncodeError;
use crate::tts::GenerationError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("speech generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("audio encoding failed: {0}")]
    Encoding(#[from] EncodeError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::Validation(msg) => warn!("Rejected request: {}", msg),
            Self::Internal(e) => error!("Request failed: {:?}", e),
            other => error!("Request failed: {}", other),
        }
        let body = ErrorDetail {
            detail: self.detail(),
        };
        (self.status(), Json(body)).into_response()
    }
}
