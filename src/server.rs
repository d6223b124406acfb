//! HTTP service surface.
//!
//! One generation endpoint plus a health probe. Success responses carry the
//! raw image bytes with metadata in headers; failures map to a fixed JSON
//! error body so provider detail never leaks to clients.

use crate::error::ImageForgeError;
use crate::fallback::{generate_with_fallback, FallbackPolicy};
use crate::messages;
use crate::providers::{GeminiProvider, OpenAiProvider};
use crate::types::{GeneratedImage, ProviderKind};
use crate::validate;
use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;

// Sized for a base64-wrapped reference image at the 7 MiB decoded cap.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared state behind the HTTP handlers.
pub struct AppState {
    /// Primary provider, always configured.
    pub primary: GeminiProvider,
    /// Fallback provider, present when a credential was supplied.
    pub secondary: Option<OpenAiProvider>,
    /// Policy applied to primary failures.
    pub policy: FallbackPolicy,
}

/// Builds the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/generate", post(handle_generate))
        .route("/healthz", get(handle_healthz))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn handle_generate(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request = match validate::parse(&body) {
        Ok(request) => request,
        Err(err) => return error_response(&err),
    };

    tracing::debug!(
        mode = request.mode.as_str(),
        aspect_ratio = request.aspect_ratio.as_str(),
        resolution = request.resolution.as_str(),
        "generation request accepted"
    );

    match generate_with_fallback(&state.primary, state.secondary.as_ref(), &state.policy, &request)
        .await
    {
        Ok(image) => image_response(image),
        Err(err) => {
            tracing::error!(error = %err, "image generation failed");
            error_response(&err)
        }
    }
}

async fn handle_healthz(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "fallback": if state.secondary.is_some() { "enabled" } else { "disabled" },
    }))
}

/// Assembles the binary success response.
fn image_response(image: GeneratedImage) -> Response {
    let encoded_note = image
        .text_note
        .as_deref()
        .map(|note| urlencoding::encode(note).into_owned())
        .unwrap_or_default();
    let provider = match image.provider {
        ProviderKind::Gemini => HeaderValue::from_static("gemini"),
        ProviderKind::OpenAI => HeaderValue::from_static("openai"),
    };
    let mime = image.format.mime_type();

    let mut response = Response::new(Body::from(image.data));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));
    headers.insert(
        "x-text-response",
        HeaderValue::from_str(&encoded_note).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    headers.insert("x-image-provider", provider);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(err: &ImageForgeError) -> Response {
    let (status, message) = status_and_message(err);
    (status, Json(json!({ "error": message }))).into_response()
}

/// Maps an error onto the HTTP status and fixed client-facing message.
fn status_and_message(err: &ImageForgeError) -> (StatusCode, &'static str) {
    match err {
        ImageForgeError::Validation(message) => (StatusCode::BAD_REQUEST, *message),
        ImageForgeError::ContentBlocked(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, messages::SAFETY_BLOCKED)
        }
        ImageForgeError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, messages::TIMEOUT),
        _ => (StatusCode::BAD_GATEWAY, messages::GENERATION_FAILED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationMetadata, ImageFormat};
    use std::time::Duration;

    #[test]
    fn test_status_and_message_mapping() {
        let validation = ImageForgeError::Validation(messages::EMPTY_PROMPT);
        assert_eq!(
            status_and_message(&validation),
            (StatusCode::BAD_REQUEST, messages::EMPTY_PROMPT)
        );

        let blocked = ImageForgeError::ContentBlocked("SAFETY".into());
        assert_eq!(
            status_and_message(&blocked),
            (StatusCode::UNPROCESSABLE_ENTITY, messages::SAFETY_BLOCKED)
        );

        let timeout = ImageForgeError::Timeout(Duration::from_secs(115));
        assert_eq!(
            status_and_message(&timeout),
            (StatusCode::GATEWAY_TIMEOUT, messages::TIMEOUT)
        );

        let rate_limited = ImageForgeError::RateLimited { status: 429 };
        assert_eq!(
            status_and_message(&rate_limited),
            (StatusCode::BAD_GATEWAY, messages::GENERATION_FAILED)
        );

        let api = ImageForgeError::Api {
            status: 500,
            message: "provider detail".into(),
        };
        assert_eq!(
            status_and_message(&api),
            (StatusCode::BAD_GATEWAY, messages::GENERATION_FAILED)
        );
    }

    #[test]
    fn test_image_response_headers() {
        let image = GeneratedImage::new(
            vec![1, 2, 3],
            ImageFormat::Png,
            ProviderKind::Gemini,
            GenerationMetadata::default(),
        )
        .with_text_note("hello world");

        let response = image_response(image);
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(headers.get("x-text-response").unwrap(), "hello%20world");
        assert_eq!(headers.get("x-image-provider").unwrap(), "gemini");
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
    }

    #[test]
    fn test_image_response_without_note() {
        let image = GeneratedImage::new(
            vec![1, 2, 3],
            ImageFormat::WebP,
            ProviderKind::OpenAI,
            GenerationMetadata::default(),
        );

        let response = image_response(image);
        let headers = response.headers();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/webp");
        assert_eq!(headers.get("x-text-response").unwrap(), "");
        assert_eq!(headers.get("x-image-provider").unwrap(), "openai");
    }
}
