//! Vision client for image annotation.
//!
//! Talks to any OpenAI-compatible `chat/completions` endpoint (OpenAI, Groq,
//! Ollama, vLLM...). Every request asks for JSON-object output; the reply is
//! decoded into an [`ImageAnnotation`] with no fallback parser.

mod config;
mod prompts;

pub use config::{LlmConfig, DEFAULT_ENDPOINT};
pub use prompts::DEFAULT_SYSTEM_PROMPT;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{ImageAnnotation, ImageFormat, ImageReference};
use prompts::JSON_OBJECT_FORMAT;

/// Errors that can occur while annotating one image.
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// The source image could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to reach the service or receive its reply
    #[error("connection error: {0}")]
    Transport(String),

    /// The service answered with a non-success status
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// The reply was not the expected JSON shape
    #[error("invalid response: {0}")]
    Decode(String),
}

/// An image ready to be embedded in a request.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    data_uri: String,
}

impl EncodedImage {
    /// Read `image` from disk and encode it.
    pub fn read(image: &ImageReference) -> Result<Self, AnnotationError> {
        let bytes = std::fs::read(image.path()).map_err(|source| AnnotationError::Read {
            path: image.path().to_path_buf(),
            source,
        })?;
        Ok(Self::from_bytes(&bytes, image.format()))
    }

    pub fn from_bytes(bytes: &[u8], format: ImageFormat) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self {
            data_uri: format!("data:{};base64,{}", format.mime_type(), encoded),
        }
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }
}

/// Something that can turn an encoded image into an annotation.
#[async_trait]
pub trait Annotator: Send + Sync {
    /// Run one request for `image`. No retries.
    async fn annotate(&self, image: &EncodedImage) -> Result<ImageAnnotation, AnnotationError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart<'a> {
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Vision client for an OpenAI-compatible API.
pub struct VisionClient {
    config: LlmConfig,
    client: Client,
}

impl VisionClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self, AnnotationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnnotationError::Transport(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn build_request<'a>(&'a self, image: &'a EncodedImage) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(self.config.get_system_prompt()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_uri(),
                        },
                    }]),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                kind: JSON_OBJECT_FORMAT,
            },
        }
    }

    /// Send one completion request and return the message text.
    async fn complete(&self, image: &EncodedImage) -> Result<String, AnnotationError> {
        let url = self.config.completions_url();
        let request = self.build_request(image);

        debug!("POST {} (model: {})", url, self.config.model);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(ref key) = self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| AnnotationError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnnotationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| AnnotationError::Transport(e.to_string()))?;

        extract_content(&body)
    }
}

#[async_trait]
impl Annotator for VisionClient {
    async fn annotate(&self, image: &EncodedImage) -> Result<ImageAnnotation, AnnotationError> {
        let content = self.complete(image).await?;
        decode_annotation(&content)
    }
}

/// Pull the first choice's message text out of a completion body.
fn extract_content(body: &str) -> Result<String, AnnotationError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| AnnotationError::Decode(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(AnnotationError::Decode(format!(
            "service error: {}",
            error.message
        )));
    }

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AnnotationError::Decode("response has no message content".to_string()))
}

/// Decode the model's JSON text into an annotation.
///
/// The text must be a JSON object; missing keys take their defaults.
pub fn decode_annotation(content: &str) -> Result<ImageAnnotation, AnnotationError> {
    let value: serde_json::Value = serde_json::from_str(content.trim())
        .map_err(|e| AnnotationError::Decode(format!("not JSON: {}", e)))?;

    if !value.is_object() {
        return Err(AnnotationError::Decode(
            "expected a JSON object".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| AnnotationError::Decode(e.to_string()))
}
