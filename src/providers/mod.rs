//! Image generation providers.

mod gemini;
mod openai;

pub use gemini::{GeminiProvider, GeminiProviderBuilder};
pub use openai::{OpenAiProvider, OpenAiProviderBuilder};
