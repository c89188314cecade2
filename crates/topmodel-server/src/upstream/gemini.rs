use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ImageModel, InlineImage, ModelOutput, UpstreamError};
use crate::config::Config;

/// `generateContent` client for Gemini image models.
pub struct GeminiModel {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiModel {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

// ============ Wire types ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 2],
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    #[serde(rename_all = "camelCase")]
    Inline { inline_data: WireBlob },
    Text { text: &'a str },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlob {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 2],
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<WireBlob>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

fn parse_output(body: GenerateContentResponse) -> ModelOutput {
    let parts = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    let mut output = ModelOutput::default();
    for part in parts {
        if let Some(blob) = part.inline_data {
            if output.image.is_none() {
                output.image = Some(InlineImage {
                    mime_type: blob.mime_type,
                    data: blob.data,
                });
            }
        } else if let Some(text) = part.text {
            let text = text.trim();
            if !text.is_empty() {
                output.text = Some(match output.text.take() {
                    Some(prev) => format!("{} {}", prev, text),
                    None => text.to_string(),
                });
            }
        }
    }
    output
}

#[async_trait]
impl ImageModel for GeminiModel {
    async fn generate(
        &self,
        image: InlineImage,
        prompt: &str,
    ) -> Result<ModelOutput, UpstreamError> {
        let api_key = self.api_key.as_deref().ok_or(UpstreamError::NotConfigured)?;

        let body = GenerateContentRequest {
            contents: [Content {
                parts: [
                    RequestPart::Inline {
                        inline_data: WireBlob {
                            mime_type: image.mime_type,
                            data: image.data,
                        },
                    },
                    RequestPart::Text { text: prompt },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["IMAGE", "TEXT"],
            },
        };

        tracing::debug!(model = %self.model, "calling generateContent");

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout
                } else {
                    UpstreamError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiErrorEnvelope>(&text) {
                Ok(envelope) => UpstreamError::Api {
                    status: envelope.error.status,
                    message: envelope.error.message,
                },
                Err(_) => UpstreamError::Api {
                    status: status.as_u16().to_string(),
                    message: text.chars().take(200).collect(),
                },
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        Ok(parse_output(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_generate_content_shape() {
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [
                    RequestPart::Inline {
                        inline_data: WireBlob {
                            mime_type: "image/png".to_string(),
                            data: "AAAA".to_string(),
                        },
                    },
                    RequestPart::Text { text: "prompt" },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["IMAGE", "TEXT"],
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        let parts = &value["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "AAAA");
        assert_eq!(parts[1]["text"], "prompt");
        assert_eq!(value["generationConfig"]["responseModalities"][0], "IMAGE");
    }

    #[test]
    fn picks_first_inline_image() {
        let body: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[
                {"text":"Here you go"},
                {"inlineData":{"mimeType":"image/png","data":"AAAA"}},
                {"inlineData":{"mimeType":"image/png","data":"BBBB"}}
            ]}}]}"#,
        )
        .unwrap();
        let output = parse_output(body);
        assert_eq!(output.image.unwrap().data, "AAAA");
        assert_eq!(output.text.as_deref(), Some("Here you go"));
    }

    #[test]
    fn text_only_answer_has_no_image() {
        let body: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"I can't do that."}]}}]}"#,
        )
        .unwrap();
        let output = parse_output(body);
        assert!(output.image.is_none());
        assert_eq!(output.text.as_deref(), Some("I can't do that."));
    }

    #[test]
    fn empty_candidates_are_tolerated() {
        let body: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        let output = parse_output(body);
        assert!(output.image.is_none());
        assert!(output.text.is_none());
    }
}
