//! Inbound request validation.
//!
//! Turns an untrusted JSON body into a [`GenerationRequest`], rejecting bad
//! input with a fixed user-facing message. Checks run in a set priority
//! order so a request with several problems always gets the same answer.

use crate::error::{ImageForgeError, Result};
use crate::messages;
use crate::types::{
    AspectRatio, GenerationRequest, ImageFormat, Mode, QualityHint, ReferenceImage, Resolution,
};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use serde_json::{Map, Value};

/// Maximum prompt length in characters.
pub const MAX_PROMPT_LENGTH: usize = 10_000;

/// Maximum decoded reference image size in bytes (7 MiB).
pub const MAX_IMAGE_SIZE_BYTES: usize = 7 * 1024 * 1024;

/// Parses and validates a raw request body.
pub fn parse(body: &[u8]) -> Result<GenerationRequest> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ImageForgeError::Validation(messages::INVALID_BODY))?;
    validate(&value)
}

/// Validates a parsed JSON value and assembles the request.
pub fn validate(value: &Value) -> Result<GenerationRequest> {
    let body = value
        .as_object()
        .ok_or(ImageForgeError::Validation(messages::INVALID_BODY))?;

    let prompt = body
        .get("prompt")
        .and_then(Value::as_str)
        .ok_or(ImageForgeError::Validation(messages::EMPTY_PROMPT))?;
    check_prompt(prompt)?;

    let mode = enum_field::<Mode>(body, "mode", messages::INVALID_MODE)?.unwrap_or_default();
    let aspect_ratio =
        enum_field::<AspectRatio>(body, "aspectRatio", messages::INVALID_ASPECT_RATIO)?
            .unwrap_or_default();
    let resolution = enum_field::<Resolution>(body, "resolution", messages::INVALID_RESOLUTION)?
        .unwrap_or_default();
    let quality_hint = enum_field::<QualityHint>(body, "qualityHint", messages::INVALID_QUALITY_HINT)?;

    // Declared media type is checked whenever present, whatever the mode.
    let format = match body.get("imageMimeType") {
        None | Some(Value::Null) => None,
        Some(v) => {
            let mime = v
                .as_str()
                .ok_or(ImageForgeError::Validation(messages::INVALID_IMAGE_FORMAT))?;
            let format = ImageFormat::from_mime_type(mime)
                .ok_or(ImageForgeError::Validation(messages::INVALID_IMAGE_FORMAT))?;
            Some(format)
        }
    };

    // The image payload is only decoded for image-to-image; a stray image on
    // a text-to-image request is discarded without inspection.
    let reference_image = if mode == Mode::ImageToImage {
        let raw = body
            .get("image")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());
        let (raw, format) = match (raw, format) {
            (Some(raw), Some(format)) => (raw, format),
            _ => return Err(ImageForgeError::Validation(messages::MISSING_IMAGE)),
        };
        let data = decode_base64_image(raw)?;
        check_reference_size(data.len())?;
        Some(ReferenceImage { data, format })
    } else {
        None
    };

    Ok(GenerationRequest {
        prompt: prompt.to_string(),
        mode,
        aspect_ratio,
        resolution,
        quality_hint,
        reference_image,
    })
}

/// Checks that a prompt is non-empty and within the length cap.
pub fn check_prompt(prompt: &str) -> Result<()> {
    if prompt.is_empty() {
        return Err(ImageForgeError::Validation(messages::EMPTY_PROMPT));
    }
    if prompt.chars().count() > MAX_PROMPT_LENGTH {
        return Err(ImageForgeError::Validation(messages::PROMPT_TOO_LONG));
    }
    Ok(())
}

/// Checks that a decoded reference image is within the size cap.
pub fn check_reference_size(len: usize) -> Result<()> {
    if len > MAX_IMAGE_SIZE_BYTES {
        return Err(ImageForgeError::Validation(messages::IMAGE_TOO_LARGE));
    }
    Ok(())
}

/// Reads an optional enum field, treating `null` as absent.
fn enum_field<T: serde::de::DeserializeOwned>(
    body: &Map<String, Value>,
    key: &str,
    message: &'static str,
) -> Result<Option<T>> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|_| ImageForgeError::Validation(message)),
    }
}

/// Strips a `data:` URL prefix, leaving the bare base64 payload.
fn strip_data_url_prefix(s: &str) -> &str {
    match s.split_once(',') {
        Some((_, rest)) => rest,
        None => s,
    }
}

/// Decodes a base64 image payload, tolerating a data URL wrapper,
/// embedded whitespace, and missing padding.
fn decode_base64_image(raw: &str) -> Result<Vec<u8>> {
    let encoded = strip_data_url_prefix(raw);
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(&cleaned)
        .or_else(|_| STANDARD_NO_PAD.decode(&cleaned))
        .map_err(|_| ImageForgeError::Validation(messages::INVALID_IMAGE_DATA))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(err: ImageForgeError) -> &'static str {
        match err {
            ImageForgeError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_minimal_request_gets_defaults() {
        let request = validate(&json!({"prompt": "a cat"})).unwrap();
        assert_eq!(request.prompt, "a cat");
        assert_eq!(request.mode, Mode::TextToImage);
        assert_eq!(request.aspect_ratio, AspectRatio::Square);
        assert_eq!(request.resolution, Resolution::OneK);
        assert!(request.quality_hint.is_none());
        assert!(request.reference_image.is_none());
    }

    #[test]
    fn test_explicit_fields_are_parsed() {
        let request = validate(&json!({
            "prompt": "a tall waterfall",
            "aspectRatio": "9:16",
            "resolution": "4K",
            "qualityHint": "HIGH",
        }))
        .unwrap();
        assert_eq!(request.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(request.resolution, Resolution::FourK);
        assert_eq!(request.quality_hint, Some(QualityHint::High));
    }

    #[test]
    fn test_malformed_body_rejected() {
        let err = parse(b"not json").unwrap_err();
        assert_eq!(message(err), messages::INVALID_BODY);

        let err = validate(&json!(["prompt"])).unwrap_err();
        assert_eq!(message(err), messages::INVALID_BODY);
    }

    #[test]
    fn test_prompt_required() {
        let err = validate(&json!({})).unwrap_err();
        assert_eq!(message(err), messages::EMPTY_PROMPT);

        let err = validate(&json!({"prompt": ""})).unwrap_err();
        assert_eq!(message(err), messages::EMPTY_PROMPT);

        let err = validate(&json!({"prompt": 42})).unwrap_err();
        assert_eq!(message(err), messages::EMPTY_PROMPT);
    }

    #[test]
    fn test_prompt_length_cap() {
        let at_cap = "p".repeat(MAX_PROMPT_LENGTH);
        assert!(validate(&json!({ "prompt": at_cap })).is_ok());

        let over_cap = "p".repeat(MAX_PROMPT_LENGTH + 1);
        let err = validate(&json!({ "prompt": over_cap })).unwrap_err();
        assert_eq!(message(err), messages::PROMPT_TOO_LONG);
    }

    #[test]
    fn test_unrecognized_enum_values_rejected() {
        let err = validate(&json!({"prompt": "x", "mode": "inpaint"})).unwrap_err();
        assert_eq!(message(err), messages::INVALID_MODE);

        let err = validate(&json!({"prompt": "x", "aspectRatio": "5:4"})).unwrap_err();
        assert_eq!(message(err), messages::INVALID_ASPECT_RATIO);

        let err = validate(&json!({"prompt": "x", "resolution": "8K"})).unwrap_err();
        assert_eq!(message(err), messages::INVALID_RESOLUTION);

        let err = validate(&json!({"prompt": "x", "qualityHint": "MEDIUM"})).unwrap_err();
        assert_eq!(message(err), messages::INVALID_QUALITY_HINT);
    }

    #[test]
    fn test_null_optional_fields_treated_as_absent() {
        let request = validate(&json!({
            "prompt": "x",
            "mode": null,
            "aspectRatio": null,
            "resolution": null,
            "qualityHint": null,
            "imageMimeType": null,
        }))
        .unwrap();
        assert_eq!(request.aspect_ratio, AspectRatio::Square);
        assert_eq!(request.resolution, Resolution::OneK);
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let err = validate(&json!({"prompt": "", "aspectRatio": "5:4"})).unwrap_err();
        assert_eq!(message(err), messages::EMPTY_PROMPT);

        let err = validate(&json!({"prompt": "x", "mode": "inpaint", "resolution": "8K"}))
            .unwrap_err();
        assert_eq!(message(err), messages::INVALID_MODE);
    }

    #[test]
    fn test_declared_mime_checked_even_for_text_to_image() {
        let err = validate(&json!({"prompt": "x", "imageMimeType": "image/gif"})).unwrap_err();
        assert_eq!(message(err), messages::INVALID_IMAGE_FORMAT);
    }

    #[test]
    fn test_text_to_image_discards_supplied_image() {
        let request = validate(&json!({
            "prompt": "x",
            "image": STANDARD.encode(b"bytes"),
            "imageMimeType": "image/png",
        }))
        .unwrap();
        assert_eq!(request.mode, Mode::TextToImage);
        assert!(request.reference_image.is_none());
    }

    #[test]
    fn test_image_to_image_requires_image_and_mime() {
        let err = validate(&json!({"prompt": "x", "mode": "image-to-image"})).unwrap_err();
        assert_eq!(message(err), messages::MISSING_IMAGE);

        let err = validate(&json!({
            "prompt": "x",
            "mode": "image-to-image",
            "image": STANDARD.encode(b"bytes"),
        }))
        .unwrap_err();
        assert_eq!(message(err), messages::MISSING_IMAGE);

        let err = validate(&json!({
            "prompt": "x",
            "mode": "image-to-image",
            "image": "",
            "imageMimeType": "image/png",
        }))
        .unwrap_err();
        assert_eq!(message(err), messages::MISSING_IMAGE);
    }

    #[test]
    fn test_image_to_image_decodes_reference() {
        let request = validate(&json!({
            "prompt": "x",
            "mode": "image-to-image",
            "image": STANDARD.encode(b"fake image bytes"),
            "imageMimeType": "image/jpeg",
        }))
        .unwrap();
        let reference = request.reference_image.unwrap();
        assert_eq!(reference.data, b"fake image bytes");
        assert_eq!(reference.format, ImageFormat::Jpeg);
    }

    #[test]
    fn test_data_url_and_bare_base64_decode_identically() {
        let encoded = STANDARD.encode(b"fake image bytes");
        let bare = validate(&json!({
            "prompt": "x",
            "mode": "image-to-image",
            "image": encoded,
            "imageMimeType": "image/png",
        }))
        .unwrap();
        let data_url = validate(&json!({
            "prompt": "x",
            "mode": "image-to-image",
            "image": format!("data:image/png;base64,{encoded}"),
            "imageMimeType": "image/png",
        }))
        .unwrap();
        assert_eq!(
            bare.reference_image.unwrap().data,
            data_url.reference_image.unwrap().data
        );
    }

    #[test]
    fn test_base64_whitespace_and_missing_padding_tolerated() {
        let encoded = STANDARD.encode(b"fake image bytes!");
        let wrapped = format!("{}\n{}", &encoded[..10], &encoded[10..]);
        let request = validate(&json!({
            "prompt": "x",
            "mode": "image-to-image",
            "image": wrapped,
            "imageMimeType": "image/png",
        }))
        .unwrap();
        assert_eq!(request.reference_image.unwrap().data, b"fake image bytes!");

        let unpadded = encoded.trim_end_matches('=').to_string();
        let request = validate(&json!({
            "prompt": "x",
            "mode": "image-to-image",
            "image": unpadded,
            "imageMimeType": "image/png",
        }))
        .unwrap();
        assert_eq!(request.reference_image.unwrap().data, b"fake image bytes!");
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let err = validate(&json!({
            "prompt": "x",
            "mode": "image-to-image",
            "image": "!!not-base64!!",
            "imageMimeType": "image/png",
        }))
        .unwrap_err();
        assert_eq!(message(err), messages::INVALID_IMAGE_DATA);
    }

    #[test]
    fn test_oversized_image_rejected() {
        let oversized = STANDARD.encode(vec![0u8; MAX_IMAGE_SIZE_BYTES + 1]);
        let err = validate(&json!({
            "prompt": "x",
            "mode": "image-to-image",
            "image": oversized,
            "imageMimeType": "image/png",
        }))
        .unwrap_err();
        assert_eq!(message(err), messages::IMAGE_TOO_LARGE);
    }
}
