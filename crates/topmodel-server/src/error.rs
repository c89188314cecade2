use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use topmodel_shared::api::ErrorResponse;

use crate::upstream::UpstreamError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("The model did not return an image. Text response: {0}")]
    NoImage(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            AppError::NoImage(_) => {
                tracing::warn!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Upstream(UpstreamError::NotConfigured) => {
                tracing::error!("generation requested but GEMINI_API_KEY is not set");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "API key not configured on the server.".to_string(),
                )
            }
            AppError::Upstream(e @ UpstreamError::Timeout) => {
                tracing::error!("Upstream error: {}", e);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    format!("Image generation failed on the server: {}", e),
                )
            }
            AppError::Upstream(e @ UpstreamError::Unreachable(_)) => {
                tracing::error!("Upstream error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    format!("Image generation failed on the server: {}", e),
                )
            }
            AppError::Upstream(e) => {
                tracing::error!("Upstream error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Image generation failed on the server: {}", e),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
