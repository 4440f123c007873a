//! Executes request descriptors and normalizes provider responses.

use crate::error::{extract_error_message, PollinateError, Result};
use crate::image::{
    AdapterRegistry, GenerationRequest, GenerationResult, ImageAdapter, ImageRef,
    NormalizedImage, RequestDescriptor,
};
use crate::session::SessionContext;
use std::time::Instant;

/// Sends requests to providers, one attempt each.
#[derive(Debug)]
pub struct Dispatcher {
    client: reqwest::Client,
    registry: AdapterRegistry,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(AdapterRegistry::with_defaults())
    }
}

impl Dispatcher {
    /// Creates a dispatcher over the given adapters.
    pub fn new(registry: AdapterRegistry) -> Self {
        Self::with_client(reqwest::Client::new(), registry)
    }

    /// Creates a dispatcher with a preconfigured HTTP client.
    pub fn with_client(client: reqwest::Client, registry: AdapterRegistry) -> Self {
        Self { client, registry }
    }

    /// The HTTP client, shared with download.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// The adapter registry.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Generates an image with the session's active provider and makes it the
    /// current result.
    pub async fn dispatch<'a>(
        &self,
        ctx: &'a mut SessionContext,
        request: &GenerationRequest,
    ) -> Result<&'a GenerationResult> {
        let provider = ctx.config.provider;
        let adapter = self.registry.get(provider)?;
        let descriptor = adapter.build(request, ctx.credentials(provider))?;

        tracing::debug!(
            provider = %provider,
            method = %descriptor.method,
            authenticated = descriptor.is_authenticated(),
            "dispatching generation request"
        );

        let start = Instant::now();
        let normalized = self.execute(adapter, &descriptor).await?;

        let image_ref = match normalized {
            NormalizedImage::Url(url) => ImageRef::Url(url),
            NormalizedImage::DataUri(uri) => ImageRef::DataUri(uri),
            NormalizedImage::Bytes { data, format } => {
                ImageRef::Object(ctx.objects_mut().insert(data, format))
            }
        };

        tracing::info!(
            provider = %provider,
            duration_ms = start.elapsed().as_millis() as u64,
            transient = image_ref.is_transient(),
            "image generated"
        );

        let result = GenerationResult {
            image_ref,
            provider_label: adapter.name().to_string(),
            model_label: adapter.model_label(&request.model),
            size_label: request.size.label(),
            timestamp: chrono::Local::now().format("%I:%M:%S %p").to_string(),
        };
        Ok(ctx.supersede(result))
    }

    /// Sends one descriptor and normalizes a successful body.
    pub async fn execute(
        &self,
        adapter: &dyn ImageAdapter,
        descriptor: &RequestDescriptor,
    ) -> Result<NormalizedImage> {
        let mut request = self
            .client
            .request(descriptor.method.clone(), descriptor.url.clone())
            .headers(descriptor.headers.clone());
        if let Some(body) = &descriptor.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(
                status.as_u16(),
                &text,
                descriptor.is_authenticated(),
            ));
        }

        let body = response.bytes().await?;
        adapter.normalize(descriptor, &body)
    }
}

/// Maps a non-success response to an error.
///
/// Only a 401 on a request that carried credentials counts as an
/// authentication failure.
pub(crate) fn classify_failure(status: u16, body: &str, authenticated: bool) -> PollinateError {
    let message = extract_error_message(body).unwrap_or_default();
    if status == 401 && authenticated {
        tracing::warn!(status, "provider rejected API key: {message}");
        return PollinateError::Auth(if message.is_empty() {
            "Invalid API Key".into()
        } else {
            message
        });
    }
    tracing::warn!(status, "provider returned an error: {message}");
    PollinateError::Upstream { status, message }
}
