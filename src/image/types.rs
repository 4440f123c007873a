//! Core types for image generation.

use crate::error::{PollinateError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Image formats the providers return.
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

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Image generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Pollinations.ai; free without a key, paid endpoint with one.
    #[default]
    Pollinations,
    /// OpenAI DALL-E 3.
    #[serde(rename = "openai")]
    OpenAi,
    /// Stability AI SDXL.
    Stability,
    /// Together AI (FLUX.1 schnell).
    Together,
}

impl ProviderId {
    /// All providers, in display order.
    pub const ALL: [ProviderId; 4] = [
        Self::Pollinations,
        Self::OpenAi,
        Self::Stability,
        Self::Together,
    ];

    /// Returns the identifier used in settings and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pollinations => "pollinations",
            Self::OpenAi => "openai",
            Self::Stability => "stability",
            Self::Together => "together",
        }
    }

    /// Returns the human-readable provider name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pollinations => "Pollinations.ai",
            Self::OpenAi => "OpenAI DALL-E 3",
            Self::Stability => "Stability AI",
            Self::Together => "Together AI",
        }
    }

    /// Returns true if this provider cannot be used without an API key.
    pub fn is_paid(&self) -> bool {
        !matches!(self, Self::Pollinations)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = PollinateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PollinateError::Validation(format!("unknown provider: {s}")))
    }
}

/// Output dimensions, parsed from a `"WxH"` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageSize {
    /// Creates a size, rejecting zero dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PollinateError::Validation(format!(
                "image size must be positive, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Returns the size as shown to the user, e.g. `512 × 512`.
    pub fn label(&self) -> String {
        format!("{} × {}", self.width, self.height)
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ImageSize {
    type Err = PollinateError;

    fn from_str(token: &str) -> Result<Self> {
        let invalid = || PollinateError::Validation(format!("invalid image size: {token:?}"));
        let (w, h) = token.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        Self::new(width, height)
    }
}

/// A user-supplied seed, forwarded exactly as entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seed {
    /// Numeric seed.
    Number(u64),
    /// Seed given as text; sent without re-parsing.
    Text(String),
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Seed {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Seed {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Optional generation parameters.
///
/// Defaults: no negative prompt, no seed (a random one is drawn where the
/// provider accepts seeds), `enhance` off, `safe` off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Things the image should not contain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    /// Explicit seed; `None` means random.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<Seed>,
    /// Let the provider rewrite the prompt (paid Pollinations only).
    #[serde(default)]
    pub enhance: bool,
    /// Ask the provider for strict content filtering.
    #[serde(default)]
    pub safe: bool,
}

impl GenerationOptions {
    /// Returns the negative prompt when it has content.
    pub fn negative_prompt(&self) -> Option<&str> {
        self.negative_prompt
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "flux";

/// A validated request to generate an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    prompt: String,
    /// Model identifier as chosen by the user; adapters map it.
    pub model: String,
    /// Output dimensions.
    pub size: ImageSize,
    /// Optional parameters.
    pub options: GenerationOptions,
}

impl GenerationRequest {
    /// Creates a request, trimming the prompt. Fails on an empty prompt.
    pub fn new(prompt: impl AsRef<str>) -> Result<Self> {
        let prompt = prompt.as_ref().trim();
        if prompt.is_empty() {
            return Err(PollinateError::Validation(
                "Please enter a prompt to generate an image".into(),
            ));
        }
        Ok(Self {
            prompt: prompt.to_string(),
            model: DEFAULT_MODEL.to_string(),
            size: ImageSize::default(),
            options: GenerationOptions::default(),
        })
    }

    /// Returns the trimmed prompt.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Sets the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the output size.
    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    /// Sets an explicit seed.
    pub fn with_seed(mut self, seed: impl Into<Seed>) -> Self {
        self.options.seed = Some(seed.into());
        self
    }

    /// Replaces all optional parameters.
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Handle to a transient in-memory image held by the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectHandle(String);

impl ObjectHandle {
    pub(crate) fn generate() -> Self {
        Self(format!("blob:pollinate/{}", uuid::Uuid::new_v4()))
    }

    /// Returns the handle as a URI string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A displayable image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "uri", rename_all = "snake_case")]
pub enum ImageRef {
    /// Remote image, usable as-is.
    Url(String),
    /// Self-contained `data:` URI.
    DataUri(String),
    /// Transient object stored in the session.
    Object(ObjectHandle),
}

impl ImageRef {
    /// Returns the reference as a URI string.
    pub fn as_uri(&self) -> &str {
        match self {
            Self::Url(u) | Self::DataUri(u) => u,
            Self::Object(h) => h.as_str(),
        }
    }

    /// Returns true if this reference points to a transient object.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Object(_))
    }
}

/// The outcome of one successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Where to find the image.
    pub image_ref: ImageRef,
    /// Provider display name.
    pub provider_label: String,
    /// Model display name.
    pub model_label: String,
    /// Dimensions, e.g. `512 × 512`.
    pub size_label: String,
    /// Local time of generation, e.g. `03:04:05 PM`.
    pub timestamp: String,
}
