#![warn(missing_docs)]
//! Pollinate - text-to-image requests across several providers.
//!
//! A prompt plus options becomes a provider-specific HTTP request, the
//! response is normalized into an image reference, and the outcome is
//! reported through a [`Presenter`](present::Presenter). Provider choice and
//! API keys are persisted in a small key-value store.
//!
//! # Quick Start
//!
//! ```no_run
//! use pollinate::{Dispatcher, GenerationRequest, ImageSize, SessionContext};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> pollinate::Result<()> {
//!     let dispatcher = Dispatcher::default();
//!     let mut session = SessionContext::default();
//!     let request = GenerationRequest::new("A red fox in the snow")?
//!         .with_size(ImageSize::new(512, 512)?);
//!     let result = dispatcher.dispatch(&mut session, &request).await?;
//!     println!("{}", result.image_ref.as_uri());
//!     Ok(())
//! }
//! ```
//!
//! # Persisted settings
//!
//! ```no_run
//! use pollinate::settings::{FileStore, ProviderConfig, SettingsStore};
//! use pollinate::ProviderId;
//!
//! fn main() -> pollinate::Result<()> {
//!     let mut settings = SettingsStore::new(FileStore::open_default()?);
//!     let mut config = ProviderConfig::default().with_provider(ProviderId::OpenAi);
//!     config.set_key(ProviderId::OpenAi, "sk-...");
//!     settings.save(&config)?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! Pollinations.ai (free and keyed) is always available.
//!
//! - `openai-image`: OpenAI DALL-E 3
//! - `stability-image`: Stability AI (SDXL)
//! - `together-image`: Together AI (FLUX.1 schnell)
//! - `image`: all of the above
//! - `cli`: the `pollinate` command-line tool

mod error;

pub mod dispatch;
pub mod image;
pub mod present;
pub mod session;
pub mod settings;
pub mod studio;

// Re-export error types at crate root
pub use error::{ErrorCategory, PollinateError, Result};

pub use dispatch::Dispatcher;
pub use image::{
    AdapterRegistry, GenerationOptions, GenerationRequest, GenerationResult, ImageAdapter,
    ImageFormat, ImageRef, ImageSize, ProviderId, Seed,
};
pub use present::{Clipboard, Notification, NotificationLevel, Presenter};
pub use session::SessionContext;
pub use settings::{ProviderConfig, SettingsStore};
pub use studio::{GenerateInput, Studio};

pub use image::providers::{PollinationsAdapter, PollinationsAdapterBuilder, PollinationsModel};

#[cfg(feature = "openai-image")]
pub use image::providers::{OpenAiAdapter, OpenAiAdapterBuilder, OpenAiImageModel};

#[cfg(feature = "stability-image")]
pub use image::providers::{StabilityAdapter, StabilityAdapterBuilder};

#[cfg(feature = "together-image")]
pub use image::providers::{TogetherAdapter, TogetherAdapterBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{PollinateError, Result};
    pub use crate::image::{GenerationRequest, ImageAdapter, ImageSize, ProviderId};
    pub use crate::present::{Clipboard, Presenter};
    pub use crate::studio::{GenerateInput, Studio};
    pub use crate::Dispatcher;
}
