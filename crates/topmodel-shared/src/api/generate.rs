use serde::{Deserialize, Serialize};

/// Body of `POST /api/generate`.
///
/// Both fields default to empty so that a body missing one of them reaches
/// the handler's validation instead of failing inside the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub base64_image: String,
    #[serde(default)]
    pub style_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub image_url: String,
}

/// Error payload returned with every 4xx/5xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
