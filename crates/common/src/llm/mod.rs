//! LLM client abstraction
//!
//! One chat completion per content request and one image generation per
//! image request. Failures are surfaced as `GenerationError`, never retried.

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Raw image returned by a generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl GeneratedImage {
    /// Wrap bytes, sniffing the mime type from the magic number
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let mime_type = sniff_image_mime(&bytes).to_string();
        Self { bytes, mime_type }
    }

    /// `data:<mime>;base64,<payload>`
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        _ => "image/png",
    }
}

/// Trait for text and image generation
#[async_trait]
pub trait Generator: Send + Sync {
    /// Single chat completion: system instruction plus one user message
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Single image for the prompt
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage>;

    /// Chat model identifier, for logs and metrics
    fn model_name(&self) -> &str;
}

/// Client for OpenAI-compatible chat and image endpoints
pub struct OpenAIGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    image_model: String,
    image_size: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'a str>,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
    url: Option<String>,
}

impl OpenAIGenerator {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            chat_model: config.chat_model.clone(),
            image_model: config.image_model.clone(),
            image_size: config.image_size.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::GenerationError {
                message: format!("Request to {} failed: {}", endpoint, e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GenerationError {
                message: format!("API error {}: {}", status, body),
            });
        }

        response.json().await.map_err(|e| AppError::GenerationError {
            message: format!("Failed to parse {} response: {}", endpoint, e),
        })
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response: ChatResponse = self.post_json("chat/completions", &request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::GenerationError {
                message: "Empty completion".to_string(),
            })
    }

    async fn image(&self, prompt: &str) -> Result<GeneratedImage> {
        // dall-e models return URLs unless asked otherwise; gpt-image models always return base64
        let response_format = self.image_model.starts_with("dall-e").then_some("b64_json");

        let request = ImageRequest {
            model: &self.image_model,
            prompt,
            n: 1,
            size: &self.image_size,
            response_format,
        };

        let response: ImageResponse = self.post_json("images/generations", &request).await?;
        let datum = response.data.into_iter().next().ok_or_else(|| AppError::GenerationError {
            message: "Image response contained no data".to_string(),
        })?;

        let bytes = match (datum.b64_json, datum.url) {
            (Some(b64), _) => STANDARD.decode(b64.trim()).map_err(|e| AppError::GenerationError {
                message: format!("Invalid base64 image payload: {}", e),
            })?,
            (None, Some(url)) => {
                let response = self.client.get(&url).send().await?.error_for_status()?;
                response.bytes().await?.to_vec()
            }
            (None, None) => {
                return Err(AppError::GenerationError {
                    message: "Image response had neither b64_json nor url".to_string(),
                })
            }
        };

        Ok(GeneratedImage::from_bytes(bytes))
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let start = Instant::now();
        let result = self.chat(system, user).await;
        metrics::record_generation(start.elapsed().as_secs_f64(), "text", result.is_ok());
        result
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        let start = Instant::now();
        let result = self.image(prompt).await;
        metrics::record_generation(start.elapsed().as_secs_f64(), "image", result.is_ok());
        result
    }

    fn model_name(&self) -> &str {
        &self.chat_model
    }
}

/// Smallest valid PNG, returned by the mock generator
pub const MOCK_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Mock generator for testing: returns a canned completion
pub struct MockGenerator {
    completion: Option<String>,
}

impl MockGenerator {
    pub fn new(completion: impl Into<String>) -> Self {
        Self { completion: Some(completion.into()) }
    }

    /// A generator whose every call fails like an upstream outage
    pub fn failing() -> Self {
        Self { completion: None }
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        self.completion.clone().ok_or_else(|| AppError::GenerationError {
            message: "mock generator configured to fail".to_string(),
        })
    }

    async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage> {
        match self.completion {
            Some(_) => Ok(GeneratedImage::from_bytes(MOCK_PNG.to_vec())),
            None => Err(AppError::GenerationError {
                message: "mock generator configured to fail".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "mock-generator"
    }
}

/// Create a generator based on configuration
pub fn create_generator(config: &LlmConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "openai" => {
            let key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
                message: "llm.api_key is required for the openai provider".to_string(),
            })?;
            Ok(Arc::new(OpenAIGenerator::new(key, config)?))
        }
        "mock" => Ok(Arc::new(MockGenerator::new(
            "TITOLO: Articolo di prova\nESTRATTO: Estratto di prova\nSLUG:\nCONTENUTO_HTML:\n<p>Contenuto di prova</p>",
        ))),
        other => Err(AppError::Configuration {
            message: format!("Unknown llm provider: {}", other),
        }),
    }
}
