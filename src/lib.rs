#![warn(missing_docs)]
//! ImageForge - prompt-to-image generation with provider fallback.
//!
//! Requests go to Gemini first; transient failures (timeout, overload) can
//! fall back to OpenAI's image API. The crate ships an HTTP service around
//! that pipeline and doubles as a library for driving providers directly.
//!
//! # Quick Start
//!
//! ```no_run
//! use imageforge::{GeminiProvider, GenerationRequest, ImageProvider};
//!
//! #[tokio::main]
//! async fn main() -> imageforge::Result<()> {
//!     let provider = GeminiProvider::builder().build()?;
//!     let request = GenerationRequest::new("A lighthouse at dusk");
//!     let image = provider.generate(&request).await?;
//!     image.save("lighthouse.png")?;
//!     Ok(())
//! }
//! ```

mod error;

pub mod fallback;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod server;
pub mod types;
pub mod validate;


// Re-export error types at crate root
pub use error::{ImageForgeError, Result};

// Re-export commonly used types
pub use provider::ImageProvider;
pub use providers::{GeminiProvider, GeminiProviderBuilder, OpenAiProvider, OpenAiProviderBuilder};
pub use types::{
    AspectRatio, GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, Mode,
    ProviderKind, QualityHint, Resolution,
};
