//! Stability AI (SDXL 1.0) text-to-image.

use crate::error::{PollinateError, Result};
use crate::image::descriptor::{data_uri, parse_url, NormalizedImage, RequestDescriptor};
use crate::image::provider::ImageAdapter;
use crate::image::types::{GenerationRequest, ImageFormat, ProviderId};
use base64::Engine;
use serde::{Deserialize, Serialize};

const TEXT_TO_IMAGE_URL: &str =
    "https://api.stability.ai/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image";

const MAX_DIMENSION: u32 = 1024;
const CFG_SCALE: u32 = 7;
const STEPS: u32 = 30;

/// Builder for StabilityAdapter.
#[derive(Debug, Clone)]
pub struct StabilityAdapterBuilder {
    base_url: String,
}

impl Default for StabilityAdapterBuilder {
    fn default() -> Self {
        Self {
            base_url: TEXT_TO_IMAGE_URL.into(),
        }
    }
}

impl StabilityAdapterBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the text-to-image endpoint.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builds the adapter.
    pub fn build(self) -> StabilityAdapter {
        StabilityAdapter {
            base_url: self.base_url,
        }
    }
}

/// Stability AI adapter. Responses carry base64 images.
#[derive(Debug, Clone)]
pub struct StabilityAdapter {
    base_url: String,
}

impl Default for StabilityAdapter {
    fn default() -> Self {
        StabilityAdapterBuilder::new().build()
    }
}

impl StabilityAdapter {
    /// Creates a new `StabilityAdapterBuilder`.
    pub fn builder() -> StabilityAdapterBuilder {
        StabilityAdapterBuilder::new()
    }
}

impl ImageAdapter for StabilityAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Stability
    }

    fn model_label(&self, _model: &str) -> String {
        "Stable Diffusion XL".into()
    }

    fn build(
        &self,
        request: &GenerationRequest,
        credentials: Option<&str>,
    ) -> Result<RequestDescriptor> {
        let key = credentials.ok_or(PollinateError::MissingKey(ProviderId::Stability))?;
        let body = StabilityRequest::from_generation_request(request);
        RequestDescriptor::post_json(parse_url(&self.base_url)?, serde_json::to_value(&body)?)
            .accept_json()
            .bearer(key)
    }

    fn normalize(&self, _descriptor: &RequestDescriptor, body: &[u8]) -> Result<NormalizedImage> {
        let response: StabilityResponse =
            serde_json::from_slice(body).map_err(|e| PollinateError::Decode(e.to_string()))?;
        let artifact = response
            .artifacts
            .into_iter()
            .next()
            .ok_or_else(|| PollinateError::Decode("No artifacts in Stability response".into()))?;

        // Validate, but keep the payload byte-identical in the URI.
        base64::engine::general_purpose::STANDARD
            .decode(&artifact.base64)
            .map_err(|e| PollinateError::Decode(e.to_string()))?;

        Ok(NormalizedImage::DataUri(data_uri(
            ImageFormat::Png,
            &artifact.base64,
        )))
    }
}

#[derive(Debug, Serialize)]
struct StabilityRequest {
    text_prompts: Vec<TextPrompt>,
    cfg_scale: u32,
    steps: u32,
    width: u32,
    height: u32,
    samples: u32,
}

#[derive(Debug, Serialize)]
struct TextPrompt {
    text: String,
    weight: u32,
}

impl StabilityRequest {
    fn from_generation_request(req: &GenerationRequest) -> Self {
        Self {
            text_prompts: vec![TextPrompt {
                text: req.prompt().to_string(),
                weight: 1,
            }],
            cfg_scale: CFG_SCALE,
            steps: STEPS,
            width: req.size.width.min(MAX_DIMENSION),
            height: req.size.height.min(MAX_DIMENSION),
            samples: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StabilityResponse {
    artifacts: Vec<StabilityArtifact>,
}

#[derive(Debug, Deserialize)]
struct StabilityArtifact {
    base64: String,
    #[serde(default, rename = "finishReason")]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}
