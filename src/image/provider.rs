//! Provider adapter trait and the registry that selects adapters.

use crate::error::{PollinateError, Result};
use crate::image::descriptor::{NormalizedImage, RequestDescriptor};
use crate::image::types::{GenerationRequest, ProviderId};
use std::collections::BTreeMap;

/// One text-to-image provider.
///
/// Adapters do no I/O: they describe the request and interpret the body.
/// The dispatcher executes the request and classifies HTTP failures.
pub trait ImageAdapter: Send + Sync {
    /// Returns which provider this adapter speaks to.
    fn id(&self) -> ProviderId;

    /// Returns the display name of the model that will serve `model`.
    fn model_label(&self, model: &str) -> String;

    /// Builds the HTTP request. `credentials` is the trimmed, non-empty key.
    fn build(
        &self,
        request: &GenerationRequest,
        credentials: Option<&str>,
    ) -> Result<RequestDescriptor>;

    /// Turns a successful response body into a displayable image.
    fn normalize(&self, descriptor: &RequestDescriptor, body: &[u8]) -> Result<NormalizedImage>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &'static str {
        self.id().label()
    }
}

/// Adapters keyed by provider.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<ProviderId, Box<dyn ImageAdapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every compiled-in provider at its public endpoint.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(crate::image::providers::PollinationsAdapter::default());

        #[cfg(feature = "openai-image")]
        registry.register(crate::image::providers::OpenAiAdapter::default());

        #[cfg(feature = "stability-image")]
        registry.register(crate::image::providers::StabilityAdapter::default());

        #[cfg(feature = "together-image")]
        registry.register(crate::image::providers::TogetherAdapter::default());

        registry
    }

    /// Adds an adapter, replacing any previous one for the same provider.
    pub fn register(&mut self, adapter: impl ImageAdapter + 'static) -> &mut Self {
        self.adapters.insert(adapter.id(), Box::new(adapter));
        self
    }

    /// Looks up the adapter for a provider.
    pub fn get(&self, id: ProviderId) -> Result<&dyn ImageAdapter> {
        self.adapters
            .get(&id)
            .map(|a| a.as_ref())
            .ok_or(PollinateError::ProviderNotAvailable(id))
    }

    /// Returns true if the provider has an adapter.
    pub fn contains(&self, id: ProviderId) -> bool {
        self.adapters.contains_key(&id)
    }

    /// Iterates over registered providers.
    pub fn providers(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.adapters.keys().copied()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.adapters.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_include_pollinations() {
        let registry = AdapterRegistry::with_defaults();
        let adapter = registry.get(ProviderId::Pollinations).unwrap();
        assert_eq!(adapter.id(), ProviderId::Pollinations);
        assert_eq!(adapter.name(), "Pollinations.ai");
    }

    #[cfg(feature = "image")]
    #[test]
    fn test_defaults_include_all_paid_providers() {
        let registry = AdapterRegistry::with_defaults();
        let ids: Vec<_> = registry.providers().collect();
        assert_eq!(ids, ProviderId::ALL.to_vec());
    }

    #[test]
    fn test_missing_adapter_is_reported() {
        let registry = AdapterRegistry::new();
        assert!(matches!(
            registry.get(ProviderId::Stability),
            Err(PollinateError::ProviderNotAvailable(ProviderId::Stability))
        ));
    }
}
