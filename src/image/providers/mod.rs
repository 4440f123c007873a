//! Image generation providers.

mod pollinations;

#[cfg(feature = "openai-image")]
mod openai;
#[cfg(feature = "stability-image")]
mod stability;
#[cfg(feature = "together-image")]
mod together;

pub use pollinations::{
    prompt_from_url, PollinationsAdapter, PollinationsAdapterBuilder, PollinationsModel,
};

#[cfg(feature = "openai-image")]
pub use openai::{OpenAiAdapter, OpenAiAdapterBuilder, OpenAiImageModel};

#[cfg(feature = "stability-image")]
pub use stability::{StabilityAdapter, StabilityAdapterBuilder};

#[cfg(feature = "together-image")]
pub use together::{TogetherAdapter, TogetherAdapterBuilder};
