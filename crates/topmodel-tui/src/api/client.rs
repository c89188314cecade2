use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use topmodel_shared::{api::GenerateRequest, GENERATE_PATH};

/// Client-side limit for one generation round trip.
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Upstream failure classes recognised in server error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorKind {
    UpstreamInternal,
    InvalidArgument,
    GatewayTimeout,
    Other,
}

impl ServerErrorKind {
    pub fn classify(status: u16, message: &str) -> Self {
        let lower = message.to_lowercase();
        if status == 504 {
            ServerErrorKind::GatewayTimeout
        } else if message.contains("INVALID_ARGUMENT") || lower.contains("invalid argument") {
            ServerErrorKind::InvalidArgument
        } else if message.contains("INTERNAL") || lower.contains("internal error") {
            ServerErrorKind::UpstreamInternal
        } else {
            ServerErrorKind::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("Incomplete user data. Finish your profile and selfie first.")]
    IncompleteUserData,
    #[error("Generation took too long (30s) and was cancelled. Please try again.")]
    Timeout,
    #[error("Connection error. Check your internet connection and try again.")]
    Connection,
    #[error("{}", unexpected_response_message(.status))]
    UnexpectedResponse { status: u16 },
    #[error("{}", server_error_message(.kind, .message))]
    ServerError {
        kind: ServerErrorKind,
        message: String,
    },
    #[error("The server answered, but the response did not contain an image.")]
    NoImage,
}

fn unexpected_response_message(status: &u16) -> String {
    if *status == 504 {
        "The server took too long to respond (the AI is very busy). Please try again in a few moments."
            .to_string()
    } else {
        format!(
            "The server returned an unexpected response (status {}). Please try again.",
            status
        )
    }
}

fn server_error_message(kind: &ServerErrorKind, message: &str) -> String {
    match kind {
        ServerErrorKind::UpstreamInternal => {
            "The AI model had an internal error. Please try again.".to_string()
        }
        ServerErrorKind::InvalidArgument => {
            "The AI model rejected the photo or style. Try another selfie or style.".to_string()
        }
        ServerErrorKind::GatewayTimeout => {
            "The AI model took too long to answer. Please try again in a few moments.".to_string()
        }
        ServerErrorKind::Other => message.to_string(),
    }
}

/// Anything that can turn a selfie and a style prompt into an image URL.
pub trait ImageGenerator: Clone + Send + Sync + 'static {
    fn generate(
        &self,
        selfie: String,
        prompt: String,
    ) -> impl Future<Output = Result<String, GenerateError>> + Send;
}

/// Run `fut`, giving up with [`GenerateError::Timeout`] after `deadline`.
/// The future is dropped on expiry, which cancels an in-flight request.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, GenerateError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| GenerateError::Timeout)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseBody {
    image_url: Option<String>,
    error: Option<String>,
}

/// Map a proxy response to an image URL or a typed error.
pub fn interpret_response(status: u16, body: &str) -> Result<String, GenerateError> {
    let parsed: ResponseBody = serde_json::from_str(body)
        .map_err(|_| GenerateError::UnexpectedResponse { status })?;

    if !(200..300).contains(&status) {
        let message = parsed
            .error
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("A server error occurred (status {}).", status));
        return Err(GenerateError::ServerError {
            kind: ServerErrorKind::classify(status, &message),
            message,
        });
    }

    match parsed.image_url {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(GenerateError::NoImage),
    }
}

#[derive(Clone)]
pub struct GenerationClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl GenerationClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: GENERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url, GENERATE_PATH)
    }

    /// POST the selfie and prompt to the proxy and return the image data URI.
    pub async fn generate_image(&self, selfie: &str, prompt: &str) -> Result<String, GenerateError> {
        let req = GenerateRequest {
            base64_image: selfie.to_string(),
            style_prompt: prompt.to_string(),
        };

        let exchange = async {
            let response = self.client.post(self.url()).json(&req).send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = with_deadline(self.timeout, exchange)
            .await
            .map_err(|e| {
                tracing::warn!("generation request timed out after {:?}", self.timeout);
                e
            })?
            .map_err(|e| {
                tracing::warn!("generation request failed: {}", e);
                GenerateError::Connection
            })?;

        tracing::debug!(status, body_bytes = body.len(), "generation response received");
        interpret_response(status, &body)
    }
}

impl ImageGenerator for GenerationClient {
    async fn generate(&self, selfie: String, prompt: String) -> Result<String, GenerateError> {
        self.generate_image(&selfie, &prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn serve_json(status: StatusCode, body: Value) -> String {
        serve(Router::new().route(
            GENERATE_PATH,
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        ))
        .await
    }

    #[test]
    fn success_with_image_url() {
        let url = interpret_response(200, r#"{"imageUrl":"data:image/png;base64,AAAA"}"#).unwrap();
        assert_eq!(url, "data:image/png;base64,AAAA");
    }

    #[test]
    fn success_without_image_is_no_image() {
        assert_eq!(interpret_response(200, "{}"), Err(GenerateError::NoImage));
        assert_eq!(
            interpret_response(200, r#"{"imageUrl":""}"#),
            Err(GenerateError::NoImage)
        );
    }

    #[test]
    fn non_json_body_is_unexpected_response() {
        assert_eq!(
            interpret_response(502, "<html>Bad Gateway</html>"),
            Err(GenerateError::UnexpectedResponse { status: 502 })
        );
        let err = interpret_response(504, "An error occurred").unwrap_err();
        assert!(err.to_string().contains("took too long"));
    }

    #[test]
    fn json_error_carries_server_message() {
        let err = interpret_response(400, r#"{"error":"Missing base64Image or stylePrompt"}"#)
            .unwrap_err();
        assert_eq!(
            err,
            GenerateError::ServerError {
                kind: ServerErrorKind::Other,
                message: "Missing base64Image or stylePrompt".to_string(),
            }
        );
        assert_eq!(err.to_string(), "Missing base64Image or stylePrompt");
    }

    #[test]
    fn json_error_without_message_mentions_status() {
        let err = interpret_response(500, "{}").unwrap_err();
        assert!(err.to_string().contains("status 500"));
    }

    #[test]
    fn known_upstream_failures_are_classified() {
        let internal = interpret_response(
            500,
            r#"{"error":"Image generation failed on the server: [INTERNAL] Internal error encountered."}"#,
        )
        .unwrap_err();
        assert!(matches!(
            internal,
            GenerateError::ServerError { kind: ServerErrorKind::UpstreamInternal, .. }
        ));

        let invalid = interpret_response(
            500,
            r#"{"error":"Image generation failed on the server: [INVALID_ARGUMENT] Request contains an invalid argument."}"#,
        )
        .unwrap_err();
        assert!(matches!(
            invalid,
            GenerateError::ServerError { kind: ServerErrorKind::InvalidArgument, .. }
        ));

        let gateway = interpret_response(504, r#"{"error":"model request timed out"}"#).unwrap_err();
        assert!(matches!(
            gateway,
            GenerateError::ServerError { kind: ServerErrorKind::GatewayTimeout, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_elapses_into_timeout() {
        let result = with_deadline(GENERATION_TIMEOUT, std::future::pending::<()>()).await;
        assert_eq!(result, Err(GenerateError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_passes_through_fast_results() {
        let result = with_deadline(GENERATION_TIMEOUT, async { 7 }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn posts_request_and_returns_image() {
        let base = serve(Router::new().route(
            GENERATE_PATH,
            post(|Json(req): Json<Value>| async move {
                assert_eq!(req["base64Image"], "data:image/jpeg;base64,U0VMRklF");
                assert_eq!(req["stylePrompt"], "X");
                Json(json!({ "imageUrl": "data:image/png;base64,R0VO" }))
            }),
        ))
        .await;

        let client = GenerationClient::new(&base);
        let url = client
            .generate_image("data:image/jpeg;base64,U0VMRklF", "X")
            .await
            .unwrap();
        assert_eq!(url, "data:image/png;base64,R0VO");
    }

    #[tokio::test]
    async fn server_error_payload_is_surfaced() {
        let base = serve_json(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "API key not configured on the server." }),
        )
        .await;

        let err = GenerationClient::new(&base)
            .generate_image("data:image/jpeg;base64,AAAA", "X")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API key not configured on the server.");
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let base = serve(Router::new().route(
            GENERATE_PATH,
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "imageUrl": "data:image/png;base64,AAAA" }))
            }),
        ))
        .await;

        let err = GenerationClient::new(&base)
            .with_timeout(Duration::from_millis(100))
            .generate_image("data:image/jpeg;base64,AAAA", "X")
            .await
            .unwrap_err();
        assert_eq!(err, GenerateError::Timeout);
    }

    #[tokio::test]
    async fn unreachable_server_is_connection_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = GenerationClient::new(&format!("http://{}", addr))
            .generate_image("data:image/jpeg;base64,AAAA", "X")
            .await
            .unwrap_err();
        assert_eq!(err, GenerateError::Connection);
    }
}
