use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use topmodel_shared::api::{GenerateRequest, GenerateResponse};

use crate::error::AppError;
use crate::prompt::build_prompt;
use crate::routes::AppState;
use crate::upstream::split_data_uri;

/// POST /api/generate
pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(req) = payload.map_err(rejection_error)?;

    if req.base64_image.trim().is_empty() || req.style_prompt.trim().is_empty() {
        return Err(AppError::Validation(
            "Missing base64Image or stylePrompt".to_string(),
        ));
    }

    let image = split_data_uri(&req.base64_image);
    tracing::info!(
        mime_type = %image.mime_type,
        image_bytes = image.data.len(),
        prompt_chars = req.style_prompt.chars().count(),
        "generation requested"
    );

    let prompt = build_prompt(&req.style_prompt);
    let output = state.model.generate(image, &prompt).await?;

    match output.image {
        Some(image) => {
            tracing::info!(image_bytes = image.data.len(), "generation succeeded");
            Ok(Json(GenerateResponse {
                image_url: image.to_data_uri(),
            }))
        }
        None => Err(AppError::NoImage(
            output
                .text
                .unwrap_or_else(|| "No text response received.".to_string()),
        )),
    }
}

/// Body over the size cap is 413; any other unreadable body is 400.
fn rejection_error(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::BytesRejection(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            AppError::PayloadTooLarge(e.body_text())
        }
        other => AppError::Validation(other.body_text()),
    }
}

/// Any method other than POST on the generation endpoint.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
