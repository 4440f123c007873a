//! Image generation module.

mod descriptor;
mod provider;
pub mod providers;
mod types;

pub use descriptor::{NormalizedImage, RequestDescriptor};
pub use provider::{AdapterRegistry, ImageAdapter};
pub use types::{
    GenerationOptions, GenerationRequest, GenerationResult, ImageFormat, ImageRef, ImageSize,
    ObjectHandle, ProviderId, Seed, DEFAULT_MODEL,
};

#[cfg(test)]
pub(crate) use descriptor::test_support;
