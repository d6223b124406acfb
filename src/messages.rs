//! User-facing error messages.
//!
//! Every message a client can see lives here so the HTTP surface never
//! leaks raw provider error text. Handlers log the underlying error and
//! respond with one of these fixed strings.

/// Prompt was missing, not a string, or empty.
pub const EMPTY_PROMPT: &str = "Please enter a prompt.";

/// Prompt exceeded the maximum length.
pub const PROMPT_TOO_LONG: &str = "Prompt is too long. Please shorten it.";

/// Image-to-image request without an image or its media type.
pub const MISSING_IMAGE: &str = "Please upload an image.";

/// Decoded reference image exceeded the size cap.
pub const IMAGE_TOO_LARGE: &str = "Image must be under 7 MB.";

/// Declared media type is not one of the supported formats.
pub const INVALID_IMAGE_FORMAT: &str = "Supported formats: JPEG, PNG, WebP.";

/// Reference image payload was not decodable base64.
pub const INVALID_IMAGE_DATA: &str = "Image data is not valid base64.";

/// Mode was present but not a recognized value.
pub const INVALID_MODE: &str = "Invalid mode.";

/// Aspect ratio was present but not a recognized value.
pub const INVALID_ASPECT_RATIO: &str = "Invalid aspect ratio.";

/// Resolution was present but not a recognized value.
pub const INVALID_RESOLUTION: &str = "Resolution must be 1K, 2K, or 4K.";

/// Quality hint was present but not a recognized value.
pub const INVALID_QUALITY_HINT: &str = "Invalid quality hint.";

/// Request body was not a JSON object.
pub const INVALID_BODY: &str = "Invalid request body.";

/// Generation failed for a reason the caller cannot fix by editing input.
pub const GENERATION_FAILED: &str = "Image generation failed. Please try again.";

/// The provider suppressed the output on content-policy grounds.
pub const SAFETY_BLOCKED: &str =
    "The request was blocked by content safety filters. Try rephrasing your prompt.";

/// The provider did not respond within the time budget.
pub const TIMEOUT: &str = "Request timed out. Try a simpler prompt or lower resolution.";
