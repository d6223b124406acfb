//! OpenAI image generation provider (gpt-image-1).
//!
//! Fallback backend. Text-to-image goes through `images/generations`,
//! image-to-image through the multipart `images/edits` endpoint.

use crate::error::{sanitize_error_message, ImageForgeError, Result};
use crate::messages;
use crate::provider::ImageProvider;
use crate::types::{
    AspectRatio, GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ProviderKind,
    Resolution,
};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-image-1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// Builder for OpenAiProvider.
#[derive(Debug, Clone, Default)]
pub struct OpenAiProviderBuilder {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl OpenAiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `OPENAI_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides the model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Overrides the API base URL (mainly for tests).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Overrides the per-call wall-clock timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<OpenAiProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ImageForgeError::Auth("OPENAI_API_KEY not set and no API key provided".into())
            })?;

        Ok(OpenAiProvider {
            client: reqwest::Client::new(),
            api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}

/// OpenAI image generation provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Creates a new `OpenAiProviderBuilder`.
    pub fn builder() -> OpenAiProviderBuilder {
        OpenAiProviderBuilder::new()
    }

    async fn generate_impl(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let start = Instant::now();

        let url = format!("{}/images/generations", self.base_url);
        let body = OpenAiImageRequest::from_generation_request(request, &self.model);

        let fetch = async {
            let response = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await?;
            self.read_response(response).await
        };

        let openai_response = tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| ImageForgeError::Timeout(self.timeout))??;

        let data = extract_image(openai_response)?;
        let duration_ms = start.elapsed().as_millis() as u64;

        Ok(GeneratedImage::new(
            data,
            ImageFormat::Png,
            ProviderKind::OpenAI,
            GenerationMetadata {
                model: Some(self.model.clone()),
                duration_ms: Some(duration_ms),
            },
        ))
    }

    /// Edits the reference image via the multipart edits endpoint.
    async fn edit_impl(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let start = Instant::now();

        let reference = request
            .reference_image
            .as_ref()
            .ok_or(ImageForgeError::Validation(messages::MISSING_IMAGE))?;

        let url = format!("{}/images/edits", self.base_url);

        let fetch = async {
            let image_part = reqwest::multipart::Part::bytes(reference.data.clone())
                .file_name(format!("input.{}", reference.format.extension()))
                .mime_str(reference.format.mime_type())?;

            let form = reqwest::multipart::Form::new()
                .text("model", self.model.clone())
                .text("prompt", request.prompt.clone())
                .part("image[]", image_part)
                .text("output_format", "png");

            let response = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .multipart(form)
                .send()
                .await?;
            self.read_response(response).await
        };

        let openai_response = tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| ImageForgeError::Timeout(self.timeout))??;

        let data = extract_image(openai_response)?;
        let duration_ms = start.elapsed().as_millis() as u64;

        Ok(GeneratedImage::new(
            data,
            ImageFormat::Png,
            ProviderKind::OpenAI,
            GenerationMetadata {
                model: Some(self.model.clone()),
                duration_ms: Some(duration_ms),
            },
        ))
    }

    async fn read_response(&self, response: reqwest::Response) -> Result<OpenAiImageResponse> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }
        Ok(response.json().await?)
    }

    fn parse_error(&self, status: u16, text: &str) -> ImageForgeError {
        let text = sanitize_error_message(text);
        if status == 429 || status == 503 {
            return ImageForgeError::RateLimited { status };
        }
        if status == 401 || status == 403 {
            return ImageForgeError::Auth(text);
        }
        let lower = text.to_lowercase();
        if lower.contains("safety") || lower.contains("blocked") || lower.contains("content_policy")
        {
            return ImageForgeError::ContentBlocked(text);
        }
        ImageForgeError::Api {
            status,
            message: text,
        }
    }
}

#[async_trait]
impl ImageProvider for OpenAiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        if request.is_edit() {
            self.edit_impl(request).await
        } else {
            self.generate_impl(request).await
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAI
    }

    async fn health_check(&self) -> Result<()> {
        if self.api_key.starts_with("sk-") {
            Ok(())
        } else {
            Err(ImageForgeError::Auth("Invalid API key format".into()))
        }
    }
}

/// Closest gpt-image-1 canvas for each aspect ratio.
fn size_for(ratio: AspectRatio) -> &'static str {
    match ratio {
        AspectRatio::Square => "1024x1024",
        AspectRatio::ThreeTwo
        | AspectRatio::Standard
        | AspectRatio::Landscape
        | AspectRatio::Ultrawide => "1536x1024",
        AspectRatio::TwoThree | AspectRatio::StandardPortrait | AspectRatio::Portrait => {
            "1024x1536"
        }
    }
}

/// Maps the resolution tier onto a gpt-image-1 quality level.
fn quality_for(resolution: Resolution) -> &'static str {
    match resolution {
        Resolution::OneK => "medium",
        Resolution::TwoK | Resolution::FourK => "high",
    }
}

fn extract_image(response: OpenAiImageResponse) -> Result<Vec<u8>> {
    let image_data = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ImageForgeError::UnexpectedResponse("No images in response".into()))?;

    let b64 = image_data.b64_json.ok_or_else(|| {
        ImageForgeError::UnexpectedResponse("Response contained no image data".into())
    })?;

    base64::engine::general_purpose::STANDARD
        .decode(&b64)
        .map_err(|e| ImageForgeError::Decode(e.to_string()))
}

#[derive(Debug, Serialize)]
struct OpenAiImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: &'static str,
    quality: &'static str,
    output_format: &'static str,
}

impl OpenAiImageRequest {
    fn from_generation_request(req: &GenerationRequest, model: &str) -> Self {
        Self {
            model: model.to_string(),
            prompt: req.prompt.clone(),
            n: 1,
            size: size_for(req.aspect_ratio),
            quality: quality_for(req.resolution),
            output_format: "png",
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiImageResponse {
    data: Vec<OpenAiImageData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiImageData {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    revised_prompt: Option<String>,
}
