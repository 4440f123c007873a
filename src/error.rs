//! Error types for image generation.

use crate::image::ProviderId;

/// Longest upstream message surfaced to the user.
const MAX_MESSAGE_LEN: usize = 300;

/// Fallback text for failures that carry nothing better to show.
pub(crate) const GENERIC_FAILURE: &str = "Failed to generate image. Please try again.";

/// Errors that can occur while configuring, generating, downloading or copying.
#[derive(Debug, thiserror::Error)]
pub enum PollinateError {
    /// User input was rejected before any request was made.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A paid provider was selected without a stored API key.
    #[error("no API key configured for {0}")]
    MissingKey(ProviderId),

    /// The provider rejected the credentials (HTTP 401).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Provider returned a non-success response.
    #[error("generation failed: {status} - {message}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body, if any.
        message: String,
    },

    /// Payload was fetched but could not be used as an image.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// Clipboard write denied or unsupported.
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    /// Provider not compiled in (feature not enabled).
    #[error("provider not available: {0}")]
    ProviderNotAvailable(ProviderId),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (settings file, download target).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used to route errors to user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad or missing input; nothing was sent.
    Validation,
    /// Credentials rejected by the provider.
    Authentication,
    /// Provider or transport failure.
    Upstream,
    /// Response could not be rendered as an image.
    Decode,
    /// Clipboard failure; soft, download still works.
    Clipboard,
    /// Local filesystem or serialization failure.
    Io,
}

impl PollinateError {
    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::MissingKey(_) | Self::ProviderNotAvailable(_) => {
                ErrorCategory::Validation
            }
            Self::Auth(_) => ErrorCategory::Authentication,
            Self::Upstream { .. } | Self::Network(_) => ErrorCategory::Upstream,
            Self::Decode(_) => ErrorCategory::Decode,
            Self::Clipboard(_) => ErrorCategory::Clipboard,
            Self::Io(_) | Self::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns the text to show in a notification for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::MissingKey(provider) => {
                format!("Please enter an API key for {}", provider.label())
            }
            Self::Auth(_) => "Invalid API Key".into(),
            Self::Upstream { message, .. } if !message.is_empty() => message.clone(),
            Self::Upstream { .. } | Self::Network(_) | Self::Decode(_) => GENERIC_FAILURE.into(),
            Self::Clipboard(_) => "Failed to copy. Try downloading the image instead.".into(),
            Self::ProviderNotAvailable(provider) => {
                format!("{} support is not enabled in this build", provider.label())
            }
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Invalid data: {e}"),
        }
    }
}

/// Pulls a human-readable message out of an error response body.
///
/// Recognizes the common JSON envelopes (`{"error": {"message": ..}}`,
/// `{"error": ".."}`, `{"message": ..}`, `{"detail": ..}`) and falls back to
/// the raw text.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let found = value
            .pointer("/error/message")
            .or_else(|| value.get("error").filter(|v| v.is_string()))
            .or_else(|| value.get("message"))
            .or_else(|| value.get("detail"))
            .and_then(|v| v.as_str());
        if let Some(msg) = found {
            return Some(sanitize_error_message(msg));
        }
    }

    Some(sanitize_error_message(trimmed))
}

/// Collapses whitespace and truncates long upstream messages.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_MESSAGE_LEN {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(MAX_MESSAGE_LEN).collect();
    truncated.push('…');
    truncated
}

/// Result type alias for image generation operations.
pub type Result<T> = std::result::Result<T, PollinateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_and_upstream_are_distinct_categories() {
        let auth = PollinateError::Auth("401".into());
        let upstream = PollinateError::Upstream {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(auth.category(), ErrorCategory::Authentication);
        assert_eq!(upstream.category(), ErrorCategory::Upstream);
        assert_ne!(auth.category(), upstream.category());
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            PollinateError::Auth("whatever".into()).user_message(),
            "Invalid API Key"
        );
        assert_eq!(
            PollinateError::Upstream {
                status: 502,
                message: String::new()
            }
            .user_message(),
            GENERIC_FAILURE
        );
        assert_eq!(
            PollinateError::Decode("corrupt".into()).user_message(),
            GENERIC_FAILURE
        );
        assert_eq!(
            PollinateError::MissingKey(ProviderId::OpenAi).user_message(),
            "Please enter an API key for OpenAI DALL-E 3"
        );
    }

    #[test]
    fn test_error_display() {
        let err = PollinateError::Upstream {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "generation failed: 404 - Not found");
    }

    #[test]
    fn test_extract_error_message_shapes() {
        assert_eq!(
            extract_error_message(r#"{"error":{"message":"bad prompt"}}"#).as_deref(),
            Some("bad prompt")
        );
        assert_eq!(
            extract_error_message(r#"{"error":"quota exceeded"}"#).as_deref(),
            Some("quota exceeded")
        );
        assert_eq!(
            extract_error_message(r#"{"message":"height too large"}"#).as_deref(),
            Some("height too large")
        );
        assert_eq!(
            extract_error_message("  Internal   Server Error \n").as_deref(),
            Some("Internal Server Error")
        );
        assert_eq!(extract_error_message("   "), None);
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(MAX_MESSAGE_LEN + 50);
        let out = sanitize_error_message(&long);
        assert_eq!(out.chars().count(), MAX_MESSAGE_LEN + 1);
        assert!(out.ends_with('…'));
    }
}
