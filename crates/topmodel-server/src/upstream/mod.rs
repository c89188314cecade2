//! Client side of the third-party image model.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

mod gemini;

pub use gemini::GeminiModel;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("API key not configured")]
    NotConfigured,

    #[error("model request timed out")]
    Timeout,

    #[error("model unreachable: {0}")]
    Unreachable(String),

    /// Error payload from the model API, `status` is its canonical code
    /// such as `INTERNAL` or `INVALID_ARGUMENT`.
    #[error("[{status}] {message}")]
    Api { status: String, message: String },

    #[error("malformed model response: {0}")]
    Malformed(String),
}

/// Base64 image payload with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// What the model answered: an image when it produced one, plus any text.
#[derive(Debug, Clone, Default)]
pub struct ModelOutput {
    pub image: Option<InlineImage>,
    pub text: Option<String>,
}

#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn generate(&self, image: InlineImage, prompt: &str)
        -> Result<ModelOutput, UpstreamError>;
}

fn data_uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^data:(image/[a-z]+);base64,").expect("data URI pattern is valid")
    })
}

/// Split a `data:image/...;base64,` URI into MIME type and payload.
///
/// The MIME type falls back to `image/jpeg` when the prefix is missing or
/// unrecognised; input without a comma is taken as bare base64.
pub fn split_data_uri(uri: &str) -> InlineImage {
    let mime_type = data_uri_pattern()
        .captures(uri)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "image/jpeg".to_string());

    let data = match uri.split_once(',') {
        Some((_, data)) => data.to_string(),
        None => uri.to_string(),
    };

    InlineImage { mime_type, data }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_png_data_uri() {
        let image = split_data_uri("data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "iVBORw0KGgo=");
    }

    #[test]
    fn unknown_prefix_defaults_to_jpeg() {
        let image = split_data_uri("data:application/octet-stream;base64,AAAA");
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, "AAAA");
    }

    #[test]
    fn bare_base64_is_kept_whole() {
        let image = split_data_uri("/9j/4AAQSkZJRg==");
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, "/9j/4AAQSkZJRg==");
    }

    #[test]
    fn round_trips_to_data_uri() {
        let uri = "data:image/webp;base64,UklGRg==";
        assert_eq!(split_data_uri(uri).to_data_uri(), uri);
    }
}
