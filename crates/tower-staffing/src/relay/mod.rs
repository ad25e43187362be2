//! Client for the image-analysis model that reads resident screenshots.
//!
//! Nothing else in the crate talks to the model API; callers hand an
//! [`ImageRequest`] to a [`VisionRelay`] and get the model's raw text back.

pub mod prompts;

use crate::config::RelayConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const TEMPERATURE: f32 = 0.0;
const MAX_OUTPUT_TOKENS: u32 = 2000;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("image analysis is not configured (GEMINI_API_KEY is unset)")]
    MissingApiKey,
    #[error("image request is missing {0}")]
    InvalidRequest(&'static str),
    #[error("the image model is rate limited; wait a minute and try again")]
    RateLimited,
    #[error("image model error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("image model request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image model returned no text")]
    EmptyResponse,
}

impl RelayError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub base64_data: String,
    pub media_type: String,
    pub prompt: String,
}

impl ImageRequest {
    pub fn resident_scan(base64_data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            base64_data: base64_data.into(),
            media_type: media_type.into(),
            prompt: prompts::RESIDENT_EXTRACTION_PROMPT.to_string(),
        }
    }

    fn check(&self) -> Result<(), RelayError> {
        if self.base64_data.trim().is_empty() {
            return Err(RelayError::InvalidRequest("image data"));
        }
        if self.media_type.trim().is_empty() {
            return Err(RelayError::InvalidRequest("a media type"));
        }
        if self.prompt.trim().is_empty() {
            return Err(RelayError::InvalidRequest("a prompt"));
        }
        Ok(())
    }
}

#[async_trait]
pub trait VisionRelay: Send + Sync {
    /// Returns the model's text for one image; no retries.
    async fn analyze(&self, request: &ImageRequest) -> Result<String, RelayError>;
}

#[derive(Clone)]
pub struct GeminiRelay {
    client: Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl GeminiRelay {
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self) -> String {
        format!("{}/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl VisionRelay for GeminiRelay {
    async fn analyze(&self, request: &ImageRequest) -> Result<String, RelayError> {
        request.check()?;
        let api_key = self.api_key.as_deref().ok_or(RelayError::MissingApiKey)?;

        debug!(
            model = %self.model,
            media_type = %request.media_type,
            payload_bytes = request.base64_data.len(),
            "sending image to model"
        );

        let response = self
            .client
            .post(self.url())
            .query(&[("key", api_key)])
            .json(&GenerateRequest::from_image(request))
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        match interpret_response(status, &body) {
            Ok(text) => {
                info!(model = %self.model, chars = text.len(), "image analyzed");
                Ok(text)
            }
            Err(err) => {
                warn!(model = %self.model, status, error = %err, "image analysis failed");
                Err(err)
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 2],
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Image { inline_data: InlineData<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

impl<'a> GenerateRequest<'a> {
    fn from_image(request: &'a ImageRequest) -> Self {
        Self {
            contents: [RequestContent {
                parts: [
                    RequestPart::Image {
                        inline_data: InlineData {
                            mime_type: &request.media_type,
                            data: &request.base64_data,
                        },
                    },
                    RequestPart::Text {
                        text: &request.prompt,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<u16>,
    message: Option<String>,
}

/// Maps an HTTP status and body to the first candidate's text or a typed error.
fn interpret_response(status: u16, body: &str) -> Result<String, RelayError> {
    let parsed: GenerateResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(_) if status == 429 => return Err(RelayError::RateLimited),
        Err(_) => {
            return Err(RelayError::Api {
                status,
                message: snippet(body),
            })
        }
    };

    if let Some(error) = parsed.error {
        if status == 429 || error.code == Some(429) {
            return Err(RelayError::RateLimited);
        }
        return Err(RelayError::Api {
            status: error.code.unwrap_or(status),
            message: error
                .message
                .unwrap_or_else(|| "unknown model error".to_string()),
        });
    }
    if status == 429 {
        return Err(RelayError::RateLimited);
    }
    if !(200..300).contains(&status) {
        return Err(RelayError::Api {
            status,
            message: snippet(body),
        });
    }

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .filter(|text| !text.trim().is_empty())
        .ok_or(RelayError::EmptyResponse)
}

fn snippet(body: &str) -> String {
    const LIMIT: usize = 200;
    match body.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn relay_config(api_key: Option<&str>) -> RelayConfig {
        RelayConfig {
            api_key: api_key.map(str::to_string),
            model: "gemini-2.5-flash".to_string(),
            endpoint: "http://127.0.0.1:9/v1beta/models/".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn request_body_carries_image_prompt_and_generation_config() {
        let request = ImageRequest::resident_scan("aGVsbG8=", "image/png");
        let body = serde_json::to_value(GenerateRequest::from_image(&request)).expect("serialize");

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[0]["inline_data"]["data"], "aGVsbG8=");
        assert_eq!(parts[1]["text"], prompts::RESIDENT_EXTRACTION_PROMPT);
        assert_eq!(body["generationConfig"]["temperature"], 0.0);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2000);
    }

    #[test]
    fn first_candidate_text_is_returned() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "[{\"name\":\"Ada\"}]" }, { "text": "ignored" }] } },
                { "content": { "parts": [{ "text": "second" }] } }
            ]
        });
        let text = interpret_response(200, &body.to_string()).expect("text");
        assert_eq!(text, "[{\"name\":\"Ada\"}]");
    }

    #[test]
    fn rate_limits_are_distinguishable() {
        let from_status = interpret_response(429, "Too Many Requests").expect_err("limited");
        assert!(from_status.is_rate_limited());

        let from_body = json!({ "error": { "code": 429, "message": "quota" } });
        let err = interpret_response(200, &from_body.to_string()).expect_err("limited");
        assert!(err.is_rate_limited());
    }

    #[test]
    fn api_errors_keep_status_and_message() {
        let body = json!({ "error": { "code": 400, "message": "bad image" } });
        match interpret_response(400, &body.to_string()) {
            Err(RelayError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad image");
            }
            other => panic!("expected api error, got {other:?}"),
        }

        match interpret_response(503, "<html>unavailable</html>") {
            Err(RelayError::Api { status, .. }) => assert_eq!(status, 503),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn missing_or_blank_text_is_empty_response() {
        for body in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{ "content": { "parts": [] } }] }),
            json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] }),
        ] {
            let err = interpret_response(200, &body.to_string()).expect_err("empty");
            assert!(matches!(err, RelayError::EmptyResponse), "got {err:?}");
        }
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(500);
        match interpret_response(500, &body) {
            Err(RelayError::Api { message, .. }) => assert_eq!(message.len(), 203),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unconfigured_relay_refuses_before_sending() {
        let relay = GeminiRelay::new(&relay_config(None)).expect("client");
        assert!(!relay.is_configured());
        let err = relay
            .analyze(&ImageRequest::resident_scan("aGVsbG8=", "image/png"))
            .await
            .expect_err("no key");
        assert!(matches!(err, RelayError::MissingApiKey));
    }

    #[tokio::test]
    async fn incomplete_request_is_rejected() {
        let relay = GeminiRelay::new(&relay_config(Some("key"))).expect("client");
        assert_eq!(relay.url(), "http://127.0.0.1:9/v1beta/models/gemini-2.5-flash:generateContent");
        let err = relay
            .analyze(&ImageRequest::resident_scan("", "image/png"))
            .await
            .expect_err("no data");
        assert!(matches!(err, RelayError::InvalidRequest(_)));
    }
}
