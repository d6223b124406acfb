//! Fallback orchestration across the primary and secondary providers.
//!
//! The primary (Gemini) handles every request first. When it fails, a pure
//! decision function picks what happens next so the policy stays testable
//! apart from any network traffic. At most one recovery attempt is made.

use crate::error::{ImageForgeError, Result};
use crate::provider::ImageProvider;
use crate::providers::{GeminiProvider, OpenAiProvider};
use crate::types::{GeneratedImage, GenerationRequest, Mode};

/// Recovery step chosen after a primary-provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackAction {
    /// Report the primary failure to the caller.
    Surface,
    /// Give the primary provider one more attempt.
    RetryPrimary,
    /// Hand the request to the secondary provider.
    UseSecondary,
}

/// Controls when a failed request may move to the secondary provider.
#[derive(Debug, Clone, Copy)]
pub struct FallbackPolicy {
    /// Fall back when the primary times out.
    pub fallback_on_timeout: bool,
    /// Fall back when the primary is rate limited or overloaded.
    pub fallback_on_overload: bool,
    /// Allow image-to-image requests to fall back as well.
    pub fallback_for_edits: bool,
    /// Retry the primary once on overload when the secondary is not usable.
    pub retry_primary_on_overload: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            fallback_on_timeout: true,
            fallback_on_overload: true,
            fallback_for_edits: true,
            retry_primary_on_overload: false,
        }
    }
}

/// Picks the recovery step for a primary failure.
///
/// Safety blocks, validation failures and unknown errors always surface;
/// only transient failures (timeout, overload) move to the secondary.
pub fn decide(
    error: &ImageForgeError,
    mode: Mode,
    secondary_available: bool,
    policy: &FallbackPolicy,
) -> FallbackAction {
    let mode_allows_secondary = mode == Mode::TextToImage || policy.fallback_for_edits;
    match error {
        ImageForgeError::Timeout(_)
            if policy.fallback_on_timeout && secondary_available && mode_allows_secondary =>
        {
            FallbackAction::UseSecondary
        }
        ImageForgeError::RateLimited { .. }
            if policy.fallback_on_overload && secondary_available && mode_allows_secondary =>
        {
            FallbackAction::UseSecondary
        }
        ImageForgeError::RateLimited { .. } if policy.retry_primary_on_overload => {
            FallbackAction::RetryPrimary
        }
        _ => FallbackAction::Surface,
    }
}

/// Runs a request against the primary provider, applying the fallback
/// policy on failure. The secondary is called at most once; if it fails
/// too, the original primary error is surfaced.
pub async fn generate_with_fallback(
    primary: &GeminiProvider,
    secondary: Option<&OpenAiProvider>,
    policy: &FallbackPolicy,
    request: &GenerationRequest,
) -> Result<GeneratedImage> {
    let err = match primary.generate(request).await {
        Ok(image) => return Ok(image),
        Err(err) => err,
    };

    match decide(&err, request.mode, secondary.is_some(), policy) {
        FallbackAction::Surface => Err(err),
        FallbackAction::RetryPrimary => {
            tracing::warn!(error = %err, "retrying primary provider after transient failure");
            primary.generate(request).await
        }
        FallbackAction::UseSecondary => match secondary {
            Some(provider) => {
                tracing::warn!(
                    error = %err,
                    provider = provider.name(),
                    "primary provider failed, falling back"
                );
                match provider.generate(request).await {
                    Ok(image) => Ok(image),
                    Err(fallback_err) => {
                        tracing::error!(error = %fallback_err, "fallback provider also failed");
                        Err(err)
                    }
                }
            }
            None => Err(err),
        },
    }
}
