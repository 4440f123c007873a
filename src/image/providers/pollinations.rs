//! Pollinations.ai image generation, free and paid.
//!
//! Without a key, requests go to the public endpoint and the generated image
//! URL itself is the result. With a key, requests go to the paid endpoint and
//! the returned bytes are held as a transient object.

use crate::error::{PollinateError, Result};
use crate::image::descriptor::{decode_image, parse_url, NormalizedImage, RequestDescriptor};
use crate::image::provider::ImageAdapter;
use crate::image::types::{GenerationRequest, ProviderId};
use rand::Rng;

const FREE_BASE_URL: &str = "https://image.pollinations.ai/prompt";
const PAID_BASE_URL: &str = "https://gen.pollinations.ai/image";

/// Upper bound (exclusive) for randomly drawn seeds.
const SEED_RANGE: u32 = 1_000_000;

/// Pollinations model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PollinationsModel {
    /// Flux - high quality, the default.
    #[default]
    Flux,
    /// Turbo - fast, lower quality.
    Turbo,
    /// Kontext (paid only).
    Kontext,
    /// Seedream (paid only).
    Seedream,
    /// GPT Image (paid only).
    GptImage,
}

impl PollinationsModel {
    const FREE: [Self; 2] = [Self::Flux, Self::Turbo];
    const PAID: [Self; 5] = [
        Self::Flux,
        Self::Turbo,
        Self::Kontext,
        Self::Seedream,
        Self::GptImage,
    ];

    /// Returns the API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flux => "flux",
            Self::Turbo => "turbo",
            Self::Kontext => "kontext",
            Self::Seedream => "seedream",
            Self::GptImage => "gptimage",
        }
    }

    /// Returns the display name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Flux => "Flux (High Quality)",
            Self::Turbo => "Turbo (Fast)",
            Self::Kontext => "Kontext",
            Self::Seedream => "Seedream",
            Self::GptImage => "GPT Image",
        }
    }

    /// Maps user input through the model table for the given tier.
    /// Unknown identifiers fall back to Flux.
    pub fn resolve(model: &str, paid: bool) -> Self {
        let table: &[Self] = if paid { &Self::PAID } else { &Self::FREE };
        table
            .iter()
            .copied()
            .find(|m| m.as_str() == model.trim())
            .unwrap_or_default()
    }

    fn lookup_any(model: &str) -> Option<Self> {
        Self::PAID.into_iter().find(|m| m.as_str() == model.trim())
    }
}

/// Builder for PollinationsAdapter.
#[derive(Debug, Clone)]
pub struct PollinationsAdapterBuilder {
    free_base_url: String,
    paid_base_url: String,
}

impl Default for PollinationsAdapterBuilder {
    fn default() -> Self {
        Self {
            free_base_url: FREE_BASE_URL.into(),
            paid_base_url: PAID_BASE_URL.into(),
        }
    }
}

impl PollinationsAdapterBuilder {
    /// Creates a new builder with the public endpoints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the free endpoint base (prompt is appended as a path segment).
    pub fn free_base_url(mut self, url: impl Into<String>) -> Self {
        self.free_base_url = url.into();
        self
    }

    /// Overrides the paid endpoint base.
    pub fn paid_base_url(mut self, url: impl Into<String>) -> Self {
        self.paid_base_url = url.into();
        self
    }

    /// Builds the adapter.
    pub fn build(self) -> PollinationsAdapter {
        PollinationsAdapter {
            free_base_url: self.free_base_url.trim_end_matches('/').to_string(),
            paid_base_url: self.paid_base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Pollinations.ai adapter.
#[derive(Debug, Clone)]
pub struct PollinationsAdapter {
    free_base_url: String,
    paid_base_url: String,
}

impl Default for PollinationsAdapter {
    fn default() -> Self {
        PollinationsAdapterBuilder::new().build()
    }
}

impl PollinationsAdapter {
    /// Creates a new `PollinationsAdapterBuilder`.
    pub fn builder() -> PollinationsAdapterBuilder {
        PollinationsAdapterBuilder::new()
    }

    fn is_paid_url(&self, descriptor: &RequestDescriptor) -> bool {
        descriptor.url.as_str().starts_with(&self.paid_base_url)
    }
}

impl ImageAdapter for PollinationsAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Pollinations
    }

    fn model_label(&self, model: &str) -> String {
        PollinationsModel::lookup_any(model)
            .map(|m| m.label().to_string())
            .unwrap_or_else(|| model.to_string())
    }

    fn build(
        &self,
        request: &GenerationRequest,
        credentials: Option<&str>,
    ) -> Result<RequestDescriptor> {
        let paid = credentials.is_some();
        let base = if paid {
            &self.paid_base_url
        } else {
            &self.free_base_url
        };

        // "." and ".." would be resolved away as dot segments, encoded or not.
        let prompt = request.prompt();
        if prompt == "." || prompt == ".." {
            return Err(PollinateError::Validation(format!(
                "Prompt {prompt:?} cannot be sent as an image path"
            )));
        }

        let mut url = parse_url(&format!("{}/{}", base, urlencoding::encode(prompt)))?;

        let model = PollinationsModel::resolve(&request.model, paid);
        let seed = match &request.options.seed {
            Some(seed) => seed.to_string(),
            None => rand::thread_rng().gen_range(0..SEED_RANGE).to_string(),
        };

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("model", model.as_str())
                .append_pair("width", &request.size.width.to_string())
                .append_pair("height", &request.size.height.to_string())
                .append_pair("seed", &seed)
                .append_pair("nologo", "true");
            if let Some(negative) = request.options.negative_prompt() {
                query.append_pair("negative_prompt", negative);
            }
            if paid && request.options.enhance {
                query.append_pair("enhance", "true");
            }
            if request.options.safe {
                query.append_pair("safe", "true");
            }
        }

        let descriptor = RequestDescriptor::get(url);
        match credentials {
            Some(key) => descriptor.bearer(key),
            None => Ok(descriptor),
        }
    }

    fn normalize(&self, descriptor: &RequestDescriptor, body: &[u8]) -> Result<NormalizedImage> {
        let format = decode_image(body)?;

        if descriptor.is_authenticated() || self.is_paid_url(descriptor) {
            return Ok(NormalizedImage::Bytes {
                data: body.to_vec(),
                format,
            });
        }

        Ok(NormalizedImage::Url(descriptor.url.to_string()))
    }
}

/// Decodes the prompt path segment of a Pollinations URL.
pub fn prompt_from_url(url: &reqwest::Url) -> Result<String> {
    let segment = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .ok_or_else(|| PollinateError::Validation(format!("no prompt segment in {url}")))?;
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|e| PollinateError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::descriptor::test_support::tiny_png;
    use crate::image::types::{GenerationOptions, ImageSize};
    use reqwest::header::AUTHORIZATION;

    fn fox() -> GenerationRequest {
        GenerationRequest::new("a red fox")
            .unwrap()
            .with_model("flux")
            .with_size("512x512".parse().unwrap())
    }

    #[test]
    fn test_model_resolution() {
        assert_eq!(PollinationsModel::resolve("turbo", false), PollinationsModel::Turbo);
        assert_eq!(PollinationsModel::resolve("dall-e", false), PollinationsModel::Flux);
        // Paid-only models are not available without a key.
        assert_eq!(PollinationsModel::resolve("kontext", false), PollinationsModel::Flux);
        assert_eq!(PollinationsModel::resolve("kontext", true), PollinationsModel::Kontext);
        assert_eq!(PollinationsModel::resolve("gptimage", true), PollinationsModel::GptImage);
    }

    #[test]
    fn test_free_request_construction() {
        let adapter = PollinationsAdapter::default();
        let desc = adapter.build(&fox(), None).unwrap();

        assert_eq!(desc.method, reqwest::Method::GET);
        assert!(!desc.is_authenticated());
        assert!(desc
            .url
            .as_str()
            .starts_with("https://image.pollinations.ai/prompt/a%20red%20fox?"));
        assert_eq!(desc.query_param("model").as_deref(), Some("flux"));
        assert_eq!(desc.query_param("width").as_deref(), Some("512"));
        assert_eq!(desc.query_param("height").as_deref(), Some("512"));
        assert_eq!(desc.query_param("nologo").as_deref(), Some("true"));

        let seed: u32 = desc.query_param("seed").unwrap().parse().unwrap();
        assert!(seed < SEED_RANGE);
        assert!(desc.query_param("enhance").is_none());
        assert!(desc.query_param("negative_prompt").is_none());
        assert!(desc.body.is_none());
    }

    #[test]
    fn test_prompt_segment_decodes_to_trimmed_prompt() {
        let adapter = PollinationsAdapter::default();
        let prompts = [
            "  a red fox  ",
            "café & crème / 100% ? #tag",
            "line\nbreak + plus",
            "emoji 🦊 fox",
            "quotes \"'()*!~",
        ];
        for prompt in prompts {
            let req = GenerationRequest::new(prompt).unwrap();
            let desc = adapter.build(&req, None).unwrap();
            assert_eq!(prompt_from_url(&desc.url).unwrap(), prompt.trim());
        }

        for prompt in ["...", ". .", "a.b"] {
            let req = GenerationRequest::new(prompt).unwrap();
            let desc = adapter.build(&req, None).unwrap();
            assert_eq!(prompt_from_url(&desc.url).unwrap(), prompt);
        }

        for prompt in [".", " .. "] {
            let req = GenerationRequest::new(prompt).unwrap();
            assert!(matches!(
                adapter.build(&req, None),
                Err(PollinateError::Validation(_))
            ));
            assert!(matches!(
                adapter.build(&req, Some("pk")),
                Err(PollinateError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_random_seed_varies() {
        let adapter = PollinationsAdapter::default();
        let seeds: std::collections::HashSet<_> = (0..5)
            .map(|_| adapter.build(&fox(), None).unwrap().query_param("seed"))
            .collect();
        // Five draws from a million values colliding to one is vanishingly unlikely.
        assert!(seeds.len() > 1);
    }

    #[test]
    fn test_explicit_seed_is_forwarded() {
        let adapter = PollinationsAdapter::default();
        let desc = adapter.build(&fox().with_seed(1234), None).unwrap();
        assert_eq!(desc.query_param("seed").as_deref(), Some("1234"));

        let desc = adapter.build(&fox().with_seed("007"), None).unwrap();
        assert_eq!(desc.query_param("seed").as_deref(), Some("007"));
    }

    #[test]
    fn test_paid_request_construction() {
        let adapter = PollinationsAdapter::default();
        let req = fox().with_model("seedream").with_options(GenerationOptions {
            negative_prompt: Some("blurry".into()),
            seed: None,
            enhance: true,
            safe: true,
        });
        let desc = adapter.build(&req, Some("pk-123")).unwrap();

        assert!(desc
            .url
            .as_str()
            .starts_with("https://gen.pollinations.ai/image/a%20red%20fox?"));
        assert_eq!(desc.headers[AUTHORIZATION], "Bearer pk-123");
        assert_eq!(desc.query_param("model").as_deref(), Some("seedream"));
        assert_eq!(desc.query_param("negative_prompt").as_deref(), Some("blurry"));
        assert_eq!(desc.query_param("enhance").as_deref(), Some("true"));
        assert_eq!(desc.query_param("safe").as_deref(), Some("true"));
    }

    #[test]
    fn test_free_request_never_sends_enhance() {
        let adapter = PollinationsAdapter::default();
        let req = fox().with_options(GenerationOptions {
            enhance: true,
            ..Default::default()
        });
        let desc = adapter.build(&req, None).unwrap();
        assert!(desc.query_param("enhance").is_none());
    }

    #[test]
    fn test_model_labels() {
        let adapter = PollinationsAdapter::default();
        assert_eq!(adapter.model_label("flux"), "Flux (High Quality)");
        assert_eq!(adapter.model_label("turbo"), "Turbo (Fast)");
        assert_eq!(adapter.model_label("mystery"), "mystery");
    }

    #[test]
    fn test_normalize_free_returns_url() {
        let adapter = PollinationsAdapter::default();
        let desc = adapter.build(&fox(), None).unwrap();
        let image = adapter.normalize(&desc, &tiny_png()).unwrap();
        assert_eq!(image, NormalizedImage::Url(desc.url.to_string()));
    }

    #[test]
    fn test_normalize_paid_returns_bytes() {
        let adapter = PollinationsAdapter::default();
        let desc = adapter.build(&fox(), Some("pk")).unwrap();
        let png = tiny_png();
        match adapter.normalize(&desc, &png).unwrap() {
            NormalizedImage::Bytes { data, format } => {
                assert_eq!(data, png);
                assert_eq!(format, crate::ImageFormat::Png);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_normalize_rejects_corrupt_payload() {
        let adapter = PollinationsAdapter::default();
        let desc = adapter.build(&fox(), None).unwrap();
        let err = adapter.normalize(&desc, b"\x89PNG garbage").unwrap_err();
        assert!(matches!(err, PollinateError::Decode(_)));
    }

    #[test]
    fn test_base_url_override_trims_slash() {
        let adapter = PollinationsAdapter::builder()
            .free_base_url("http://localhost:9999/prompt/")
            .build();
        let req = GenerationRequest::new("x")
            .unwrap()
            .with_size(ImageSize::new(64, 32).unwrap());
        let desc = adapter.build(&req, None).unwrap();
        assert!(desc.url.as_str().starts_with("http://localhost:9999/prompt/x?"));
    }
}
