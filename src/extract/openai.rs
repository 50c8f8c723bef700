//! OpenAI chat-completions client with schema-constrained decoding.
//!
//! The [`VisionModel`] trait is the seam between the pipeline and the
//! network: tests substitute a mock, production uses [`OpenAiVision`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use super::ExtractorConfig;
use crate::core::ExtractError;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// One multimodal extraction request: a fixed system instruction, a user
/// turn with text plus one base64 image, and the target schema.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub system: String,
    pub user_text: String,
    pub image_base64: String,
    pub mime_type: String,
    /// Image fidelity hint; always "high" for extraction accuracy.
    pub detail: String,
    pub schema: Value,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// Error from the vision-model call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// Network or HTTP transport error.
    #[error("network error: {0}")]
    Network(String),

    /// The call did not complete within the configured timeout.
    #[error("model call timed out")]
    Timeout,

    /// The API answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Retries exhausted on transient failures.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// The model returned no parsed payload.
    #[error("model returned no structured payload")]
    Empty,

    /// The response could not be decoded.
    #[error("failed to parse model response: {0}")]
    Parse(String),
}

impl ModelError {
    /// Transient failures are worth another attempt; schema and auth
    /// problems are not.
    fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Invokes a vision-capable model with a schema-constrained request.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Returns the schema-conformant structured object the model produced.
    async fn extract(&self, request: &VisionRequest) -> Result<Value, ModelError>;
}

/// OpenAI chat-completions implementation with per-attempt timeout and a
/// bounded retry budget for transient failures.
pub struct OpenAiVision {
    client: reqwest::Client,
    api_key: String,
    model: String,
    retry_budget: u32,
}

impl OpenAiVision {
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        if config.api_key.is_empty() {
            return Err(ExtractError::InvalidInput("API key is required".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExtractError::ModelInvocation(e.to_string()))?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            retry_budget: config.retry_budget,
        })
    }

    fn request_body(&self, request: &VisionRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: json!(request.system),
                },
                ChatMessage {
                    role: "user",
                    content: json!([
                        { "type": "text", "text": request.user_text },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": format!(
                                    "data:{};base64,{}",
                                    request.mime_type, request.image_base64
                                ),
                                "detail": request.detail,
                            }
                        }
                    ]),
                },
            ],
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "invoice_data",
                    "strict": true,
                    "schema": request.schema,
                }
            }),
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
        }
    }

    async fn attempt(&self, body: &ChatRequest) -> Result<Value, ModelError> {
        let resp = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout
                } else {
                    ModelError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let value: Value =
            serde_json::from_str(&text).map_err(|e| ModelError::Parse(e.to_string()))?;

        // Refusals and empty completions both count as "no parsed payload".
        let message = &value["choices"][0]["message"];
        if let Some(refusal) = message["refusal"].as_str() {
            return Err(ModelError::Parse(format!("model refused: {refusal}")));
        }
        let content = message["content"].as_str().ok_or(ModelError::Empty)?;
        if content.trim().is_empty() {
            return Err(ModelError::Empty);
        }
        serde_json::from_str(content).map_err(|e| ModelError::Parse(e.to_string()))
    }
}

#[async_trait]
impl VisionModel for OpenAiVision {
    async fn extract(&self, request: &VisionRequest) -> Result<Value, ModelError> {
        let body = self.request_body(request);
        let attempts = self.retry_budget.max(1);
        let mut last: Option<ModelError> = None;

        for attempt in 1..=attempts {
            match self.attempt(&body).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < attempts => {
                    tracing::warn!(
                        attempt,
                        error = %err,
                        "transient model error, backing off before retry"
                    );
                    tokio::time::sleep(Duration::from_millis(500 * 2u64.pow(attempt - 1))).await;
                    last = Some(err);
                }
                Err(err) if err.is_transient() => {
                    return Err(ModelError::RetriesExhausted {
                        attempts,
                        last: last.map(|e| e.to_string()).unwrap_or_else(|| err.to_string()),
                    });
                }
                Err(err) => return Err(err),
            }
        }
        // Loop always returns; kept for exhaustiveness.
        Err(ModelError::Empty)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: Value,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> VisionRequest {
        VisionRequest {
            system: "extract".into(),
            user_text: "please".into(),
            image_base64: "aGVsbG8=".into(),
            mime_type: "image/png".into(),
            detail: "high".into(),
            schema: crate::core::invoice_json_schema(),
            max_output_tokens: 4000,
            temperature: 0.1,
        }
    }

    #[test]
    fn api_url_is_https() {
        assert!(OPENAI_API_URL.starts_with("https://"));
    }

    #[test]
    fn request_body_embeds_image_as_data_uri() {
        let config = ExtractorConfig::new("sk-test");
        let client = OpenAiVision::new(&config).unwrap();
        let body = client.request_body(&sample_request());
        let json = serde_json::to_value(&body).unwrap();
        let image_url = &json["messages"][1]["content"][1]["image_url"];
        assert_eq!(image_url["detail"], "high");
        assert!(image_url["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let config = ExtractorConfig::new("");
        assert!(OpenAiVision::new(&config).is_err());
    }

    #[test]
    fn transient_classification() {
        assert!(ModelError::Timeout.is_transient());
        assert!(ModelError::Api { status: 429, message: String::new() }.is_transient());
        assert!(ModelError::Api { status: 503, message: String::new() }.is_transient());
        assert!(!ModelError::Api { status: 401, message: String::new() }.is_transient());
        assert!(!ModelError::Empty.is_transient());
    }
}
