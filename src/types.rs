//! Core types for image generation.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Attempts to map a MIME type to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }
}

/// Image provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini image models (primary).
    Gemini,
    /// OpenAI image models (fallback).
    OpenAI,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

/// Generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Generate a new image from the prompt alone.
    #[default]
    TextToImage,
    /// Transform a supplied reference image according to the prompt.
    ImageToImage,
}

impl Mode {
    /// Returns the mode as its wire string (e.g., "text-to-image").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextToImage => "text-to-image",
            Self::ImageToImage => "image-to-image",
        }
    }
}

/// Common aspect ratios for image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1 square aspect ratio.
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// 3:2 photo landscape aspect ratio.
    #[serde(rename = "3:2")]
    ThreeTwo,
    /// 2:3 photo portrait aspect ratio.
    #[serde(rename = "2:3")]
    TwoThree,
    /// 4:3 standard landscape aspect ratio.
    #[serde(rename = "4:3")]
    Standard,
    /// 3:4 standard portrait aspect ratio.
    #[serde(rename = "3:4")]
    StandardPortrait,
    /// 16:9 landscape (widescreen) aspect ratio.
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16 portrait (tall) aspect ratio.
    #[serde(rename = "9:16")]
    Portrait,
    /// 21:9 ultrawide aspect ratio.
    #[serde(rename = "21:9")]
    Ultrawide,
}

impl AspectRatio {
    /// Returns the aspect ratio as a string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::ThreeTwo => "3:2",
            Self::TwoThree => "2:3",
            Self::Standard => "4:3",
            Self::StandardPortrait => "3:4",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Ultrawide => "21:9",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// Roughly 1024 px on the long edge.
    #[default]
    #[serde(rename = "1K")]
    OneK,
    /// Roughly 2048 px on the long edge.
    #[serde(rename = "2K")]
    TwoK,
    /// Roughly 4096 px on the long edge.
    #[serde(rename = "4K")]
    FourK,
}

impl Resolution {
    /// Returns the resolution as its wire string (e.g., "2K").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

/// Optional speed/fidelity trade-off forwarded to the primary provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityHint {
    /// Favor latency over reasoning depth.
    #[serde(rename = "LOW")]
    Low,
    /// Favor reasoning depth over latency.
    #[serde(rename = "HIGH")]
    High,
}

impl QualityHint {
    /// Returns the hint as its wire string ("LOW" or "HIGH").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::High => "HIGH",
        }
    }
}

/// A decoded reference image attached to an image-to-image request.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    /// Raw image bytes (already base64-decoded).
    pub data: Vec<u8>,
    /// Declared format of the bytes.
    pub format: ImageFormat,
}

/// A validated request to generate an image.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The text prompt describing the desired image.
    pub prompt: String,
    /// Generation mode.
    pub mode: Mode,
    /// Desired aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Desired output resolution.
    pub resolution: Resolution,
    /// Optional speed/fidelity hint.
    pub quality_hint: Option<QualityHint>,
    /// Reference image; present exactly when `mode` is image-to-image.
    pub reference_image: Option<ReferenceImage>,
}

impl GenerationRequest {
    /// Creates a new text-to-image request with the given prompt and defaults.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            mode: Mode::default(),
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            quality_hint: None,
            reference_image: None,
        }
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Sets the output resolution.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the speed/fidelity hint.
    pub fn with_quality_hint(mut self, hint: QualityHint) -> Self {
        self.quality_hint = Some(hint);
        self
    }

    /// Attaches a reference image and switches the request to image-to-image.
    pub fn with_reference_image(mut self, data: Vec<u8>, format: ImageFormat) -> Self {
        self.reference_image = Some(ReferenceImage { data, format });
        self.mode = Mode::ImageToImage;
        self
    }

    /// Returns true if this is an image editing request.
    pub fn is_edit(&self) -> bool {
        self.mode == Mode::ImageToImage
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
}

/// A generated image with its data and metadata.
#[derive(Debug, Clone)]
#[must_use = "generated image should be saved or processed"]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
    /// Optional accompanying text returned alongside the image.
    pub text_note: Option<String>,
    /// Provider that generated this image.
    pub provider: ProviderKind,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a new generated image.
    pub fn new(
        data: Vec<u8>,
        format: ImageFormat,
        provider: ProviderKind,
        metadata: GenerationMetadata,
    ) -> Self {
        Self {
            data,
            format,
            text_note: None,
            provider,
            metadata,
        }
    }

    /// Attaches the text the model returned alongside the image.
    pub fn with_text_note(mut self, note: impl Into<String>) -> Self {
        self.text_note = Some(note.into());
        self
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }
}
