//! Gemini (Google) image generation provider.
//!
//! This is the primary backend. It speaks the `generateContent` REST API,
//! classifies failures so the fallback layer can react, and retries once
//! without the thinking config when the model rejects it.

use crate::error::{sanitize_error_message, ImageForgeError, Result};
use crate::provider::ImageProvider;
use crate::types::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, Mode, ProviderKind,
};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-3-pro-image-preview";

// Leaves headroom under the usual 120 s edge-proxy budget.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(115);

/// Builder for GeminiProvider.
#[derive(Debug, Clone, Default)]
pub struct GeminiProviderBuilder {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GEMINI_API_KEY` env var.
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
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ImageForgeError::Auth("GEMINI_API_KEY not set and no API key provided".into())
            })?;

        Ok(GeminiProvider {
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

/// Gemini image generation provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    async fn generate_impl(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let include_hint = request.quality_hint.is_some();
        let first = self.call(request, include_hint).await;
        match first {
            Err(ImageForgeError::ConfigRejected(message)) if include_hint => {
                tracing::warn!(error = %message, "thinking config rejected, retrying without it");
                self.call(request, false).await
            }
            other => other,
        }
    }

    /// One `generateContent` round trip under the wall-clock budget.
    /// The request future is dropped on expiry, which aborts the transfer.
    async fn call(&self, request: &GenerationRequest, include_hint: bool) -> Result<GeneratedImage> {
        let start = Instant::now();

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GeminiRequest::from_generation_request(request, include_hint);

        let fetch = async {
            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(self.parse_error(status.as_u16(), &text));
            }

            Ok(response.json::<GeminiResponse>().await?)
        };

        let gemini_response: GeminiResponse = tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| ImageForgeError::Timeout(self.timeout))??;

        // Prompt-level blocks come back as HTTP 200 with feedback attached.
        if let Some(ref feedback) = gemini_response.prompt_feedback {
            if let Some(ref reason) = feedback.block_reason {
                let msg = feedback
                    .block_reason_message
                    .clone()
                    .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
                return Err(ImageForgeError::ContentBlocked(msg));
            }
        }

        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| {
                ImageForgeError::ContentBlocked("No candidates in response".into())
            })?;

        if let Some(ref finish_reason) = candidate.finish_reason {
            if is_safety_finish_reason(finish_reason) {
                return Err(ImageForgeError::ContentBlocked(format!(
                    "Content blocked by safety filter: {}",
                    finish_reason
                )));
            }
        }

        let content = candidate
            .content
            .ok_or_else(|| ImageForgeError::ContentBlocked("No content in candidate".into()))?;

        let mut inline = None;
        let mut note = None;
        for part in content.parts {
            if inline.is_none() {
                if let Some(data) = part.inline_data {
                    inline = Some(data);
                    continue;
                }
            }
            if note.is_none() {
                if let Some(text) = part.text {
                    note = Some(text);
                }
            }
        }

        // A 200 with no image part means the model declined to draw.
        let inline =
            inline.ok_or_else(|| ImageForgeError::ContentBlocked("No image data in response".into()))?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(&inline.data)
            .map_err(|e| ImageForgeError::Decode(e.to_string()))?;

        let format = inline
            .mime_type
            .as_deref()
            .and_then(ImageFormat::from_mime_type)
            .unwrap_or_default();

        let duration_ms = start.elapsed().as_millis() as u64;

        let mut image = GeneratedImage::new(
            data,
            format,
            ProviderKind::Gemini,
            GenerationMetadata {
                model: Some(self.model.clone()),
                duration_ms: Some(duration_ms),
            },
        );
        if let Some(note) = note {
            image = image.with_text_note(note);
        }
        Ok(image)
    }

    fn parse_error(&self, status: u16, text: &str) -> ImageForgeError {
        let text = sanitize_error_message(text);
        if status == 429 || status == 503 {
            return ImageForgeError::RateLimited { status };
        }
        if status == 401 || status == 403 {
            return ImageForgeError::Auth(text);
        }
        if is_config_rejection(&text) {
            return ImageForgeError::ConfigRejected(text);
        }
        let lower = text.to_lowercase();
        if lower.contains("safety")
            || lower.contains("blocked")
            || lower.contains("content_policy")
            || lower.contains("prohibited")
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
impl ImageProvider for GeminiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        self.generate_impl(request).await
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/models/{}", self.base_url, self.model);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(ImageForgeError::Auth("Invalid API key".into())),
            s if !(200..300).contains(&s) => Err(ImageForgeError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

/// Finish reasons the model uses when output was suppressed on policy grounds.
fn is_safety_finish_reason(reason: &str) -> bool {
    matches!(
        reason,
        "SAFETY"
            | "IMAGE_SAFETY"
            | "IMAGE_PROHIBITED_CONTENT"
            | "IMAGE_RECITATION"
            | "RECITATION"
            | "PROHIBITED_CONTENT"
            | "BLOCKLIST"
    )
}

/// Matches complaints about the thinking config, which preview models
/// reject depending on rollout state.
fn is_config_rejection(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("thinking") || lower.contains("invalid config")
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<GeminiImageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<GeminiThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: &'static str,
    image_size: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiThinkingConfig {
    thinking_level: &'static str,
}

impl GeminiRequest {
    fn from_generation_request(req: &GenerationRequest, include_hint: bool) -> Self {
        let mut parts = vec![GeminiRequestPart::Text {
            text: req.prompt.clone(),
        }];

        if let Some(ref reference) = req.reference_image {
            parts.push(GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: reference.format.mime_type().to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(&reference.data),
                },
            });
        }

        // The size config only applies to pure generation; edits inherit
        // their geometry from the reference image.
        let image_config = (req.mode == Mode::TextToImage).then(|| GeminiImageConfig {
            aspect_ratio: req.aspect_ratio.as_str(),
            image_size: req.resolution.as_str(),
        });

        let thinking_config = if include_hint {
            req.quality_hint.map(|hint| GeminiThinkingConfig {
                thinking_level: hint.as_str(),
            })
        } else {
            None
        };

        Self {
            contents: vec![GeminiContent {
                role: "user",
                parts,
            }],
            generation_config: GeminiConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
                image_config,
                thinking_config,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}
