//! Error types for image generation.

use std::time::Duration;

/// Errors that can occur while validating a request or generating an image.
#[derive(Debug, thiserror::Error)]
pub enum ImageForgeError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Request rejected before any provider was called.
    #[error("validation failed: {0}")]
    Validation(&'static str),

    /// Provider did not answer within the wall-clock budget.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Provider is rate limited (429) or overloaded (503).
    #[error("provider rate limited or overloaded (status {status})")]
    RateLimited { status: u16 },

    /// Provider rejected the request configuration (e.g. the thinking level).
    #[error("provider rejected request configuration: {0}")]
    ConfigRejected(String),

    /// Content was blocked by safety filters, or the provider returned no image.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// API returned an error response not covered by a more specific variant.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response had a success status but an unusable shape.
    #[error("unexpected provider response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (e.g., saving a file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for image generation operations.
pub type Result<T> = std::result::Result<T, ImageForgeError>;

const MAX_MESSAGE_LEN: usize = 500;

/// Trims provider error text down to something safe to log and embed in
/// error variants: control characters stripped, length capped.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let cleaned: String = text
        .trim()
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if cleaned.chars().count() > MAX_MESSAGE_LEN {
        let truncated: String = cleaned.chars().take(MAX_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ImageForgeError::Api {
            status: 500,
            message: "Internal error".into(),
        };
        assert_eq!(err.to_string(), "API error: 500 - Internal error");

        let err = ImageForgeError::RateLimited { status: 429 };
        assert_eq!(
            err.to_string(),
            "provider rate limited or overloaded (status 429)"
        );

        let err = ImageForgeError::Timeout(Duration::from_secs(115));
        assert_eq!(err.to_string(), "request timed out after 115s");

        let err = ImageForgeError::ContentBlocked("PROHIBITED_CONTENT".into());
        assert_eq!(err.to_string(), "content blocked: PROHIBITED_CONTENT");
    }

    #[test]
    fn test_sanitize_strips_control_chars() {
        let sanitized = sanitize_error_message("bad\nrequest\t{\"code\": 400}");
        assert_eq!(sanitized, "bad request {\"code\": 400}");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "x".repeat(2_000);
        let sanitized = sanitize_error_message(&long);
        assert_eq!(sanitized.chars().count(), MAX_MESSAGE_LEN + 3);
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn test_sanitize_keeps_short_messages() {
        assert_eq!(
            sanitize_error_message("  model overloaded  "),
            "model overloaded"
        );
    }
}
