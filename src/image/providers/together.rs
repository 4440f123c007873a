//! Together AI image generation (FLUX.1 schnell).

use crate::error::{PollinateError, Result};
use crate::image::descriptor::{parse_url, NormalizedImage, RequestDescriptor};
use crate::image::provider::ImageAdapter;
use crate::image::types::{GenerationRequest, ProviderId};
use serde::{Deserialize, Serialize};

const GENERATIONS_URL: &str = "https://api.together.xyz/v1/images/generations";
const MODEL: &str = "black-forest-labs/FLUX.1-schnell-Free";

/// Builder for TogetherAdapter.
#[derive(Debug, Clone)]
pub struct TogetherAdapterBuilder {
    base_url: String,
}

impl Default for TogetherAdapterBuilder {
    fn default() -> Self {
        Self {
            base_url: GENERATIONS_URL.into(),
        }
    }
}

impl TogetherAdapterBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the generations endpoint.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builds the adapter.
    pub fn build(self) -> TogetherAdapter {
        TogetherAdapter {
            base_url: self.base_url,
        }
    }
}

/// Together AI adapter.
#[derive(Debug, Clone)]
pub struct TogetherAdapter {
    base_url: String,
}

impl Default for TogetherAdapter {
    fn default() -> Self {
        TogetherAdapterBuilder::new().build()
    }
}

impl TogetherAdapter {
    /// Creates a new `TogetherAdapterBuilder`.
    pub fn builder() -> TogetherAdapterBuilder {
        TogetherAdapterBuilder::new()
    }
}

impl ImageAdapter for TogetherAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Together
    }

    fn model_label(&self, _model: &str) -> String {
        "FLUX.1 schnell".into()
    }

    fn build(
        &self,
        request: &GenerationRequest,
        credentials: Option<&str>,
    ) -> Result<RequestDescriptor> {
        let key = credentials.ok_or(PollinateError::MissingKey(ProviderId::Together))?;
        let body = TogetherRequest {
            model: MODEL,
            prompt: request.prompt(),
            width: request.size.width,
            height: request.size.height,
            n: 1,
        };
        RequestDescriptor::post_json(parse_url(&self.base_url)?, serde_json::to_value(&body)?)
            .bearer(key)
    }

    fn normalize(&self, _descriptor: &RequestDescriptor, body: &[u8]) -> Result<NormalizedImage> {
        let response: TogetherResponse =
            serde_json::from_slice(body).map_err(|e| PollinateError::Decode(e.to_string()))?;
        response
            .data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .map(NormalizedImage::Url)
            .ok_or_else(|| PollinateError::Decode("Together response contained no image URL".into()))
    }
}

#[derive(Debug, Serialize)]
struct TogetherRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    width: u32,
    height: u32,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct TogetherResponse {
    data: Vec<TogetherImageData>,
}

#[derive(Debug, Deserialize)]
struct TogetherImageData {
    #[serde(default)]
    url: Option<String>,
}
