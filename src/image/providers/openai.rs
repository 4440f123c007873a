//! OpenAI image generation (dall-e-3).

use crate::error::{PollinateError, Result};
use crate::image::descriptor::{data_uri, parse_url, NormalizedImage, RequestDescriptor};
use crate::image::provider::ImageAdapter;
use crate::image::types::{GenerationRequest, ImageFormat, ImageSize, ProviderId};
use serde::{Deserialize, Serialize};

const GENERATIONS_URL: &str = "https://api.openai.com/v1/images/generations";

/// OpenAI image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenAiImageModel {
    /// DALL-E 3 - high quality image generation.
    #[default]
    DallE3,
}

impl OpenAiImageModel {
    /// Returns the API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DallE3 => "dall-e-3",
        }
    }

    /// Returns the display name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DallE3 => "DALL-E 3",
        }
    }
}

/// Builder for OpenAiAdapter.
#[derive(Debug, Clone)]
pub struct OpenAiAdapterBuilder {
    base_url: String,
    model: OpenAiImageModel,
    quality: String,
}

impl Default for OpenAiAdapterBuilder {
    fn default() -> Self {
        Self {
            base_url: GENERATIONS_URL.into(),
            model: OpenAiImageModel::default(),
            quality: "standard".into(),
        }
    }
}

impl OpenAiAdapterBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the generations endpoint.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the quality: "standard" (default) or "hd".
    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    /// Builds the adapter.
    pub fn build(self) -> OpenAiAdapter {
        OpenAiAdapter {
            base_url: self.base_url,
            model: self.model,
            quality: self.quality,
        }
    }
}

/// OpenAI image generation adapter.
#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    base_url: String,
    model: OpenAiImageModel,
    quality: String,
}

impl Default for OpenAiAdapter {
    fn default() -> Self {
        OpenAiAdapterBuilder::new().build()
    }
}

impl OpenAiAdapter {
    /// Creates a new `OpenAiAdapterBuilder`.
    pub fn builder() -> OpenAiAdapterBuilder {
        OpenAiAdapterBuilder::new()
    }

    /// Maps the requested size to one dall-e-3 accepts.
    fn resolve_size(size: ImageSize) -> String {
        // dall-e-3 has no 512x512 tier.
        if size.width == 512 && size.height == 512 {
            return "1024x1024".into();
        }
        size.to_string()
    }
}

impl ImageAdapter for OpenAiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn model_label(&self, _model: &str) -> String {
        self.model.label().to_string()
    }

    fn build(
        &self,
        request: &GenerationRequest,
        credentials: Option<&str>,
    ) -> Result<RequestDescriptor> {
        let key = credentials.ok_or(PollinateError::MissingKey(ProviderId::OpenAi))?;
        let body = OpenAiImageRequest::from_generation_request(request, &self.model, &self.quality);
        RequestDescriptor::post_json(parse_url(&self.base_url)?, serde_json::to_value(&body)?)
            .bearer(key)
    }

    fn normalize(&self, _descriptor: &RequestDescriptor, body: &[u8]) -> Result<NormalizedImage> {
        let response: OpenAiImageResponse =
            serde_json::from_slice(body).map_err(|e| PollinateError::Decode(e.to_string()))?;

        let image_data = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| PollinateError::Decode("No images in OpenAI response".into()))?;

        if let Some(url) = image_data.url {
            Ok(NormalizedImage::Url(url))
        } else if let Some(b64) = image_data.b64_json {
            Ok(NormalizedImage::DataUri(data_uri(ImageFormat::Png, &b64)))
        } else {
            Err(PollinateError::Decode(
                "OpenAI response contained no image data".into(),
            ))
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
    quality: String,
}

impl OpenAiImageRequest {
    fn from_generation_request(
        req: &GenerationRequest,
        model: &OpenAiImageModel,
        quality: &str,
    ) -> Self {
        Self {
            model: model.as_str().to_string(),
            prompt: req.prompt().to_string(),
            n: 1,
            size: OpenAiAdapter::resolve_size(req.size),
            quality: quality.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiImageResponse {
    data: Vec<OpenAiImageData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    revised_prompt: Option<String>,
}
