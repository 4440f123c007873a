//! Top-level user actions.
//!
//! Every action reports its outcome through the [`Presenter`]; failures are
//! logged and turned into notifications, never returned.

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::image::{GenerationOptions, GenerationRequest, GenerationResult, ImageSize};
use crate::present::{self, Clipboard, CopiedContent, Notification, Presenter};
use crate::session::SessionContext;
use crate::settings::{KeyValueStore, ProviderConfig, SettingsStore};
use std::path::{Path, PathBuf};

/// Raw form input for one generation.
#[derive(Debug, Clone, Default)]
pub struct GenerateInput {
    /// Prompt as typed.
    pub prompt: String,
    /// Model identifier.
    pub model: String,
    /// Size token such as `512x512`.
    pub size: String,
    /// Advanced parameters.
    pub options: GenerationOptions,
}

impl GenerateInput {
    /// Input with the default model and size.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: crate::image::DEFAULT_MODEL.into(),
            size: ImageSize::default().to_string(),
            options: GenerationOptions::default(),
        }
    }

    /// Sets the model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the size token.
    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    /// Sets the advanced parameters.
    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates the input into a request.
    pub fn to_request(&self) -> Result<GenerationRequest> {
        let request = GenerationRequest::new(&self.prompt)?;
        let size: ImageSize = self.size.parse()?;
        let model = match self.model.trim() {
            "" => crate::image::DEFAULT_MODEL,
            m => m,
        };
        Ok(request
            .with_model(model)
            .with_size(size)
            .with_options(self.options.clone()))
    }
}

/// Settings, dispatcher and session state for one user.
#[derive(Debug)]
pub struct Studio<S> {
    settings: SettingsStore<S>,
    dispatcher: Dispatcher,
    session: SessionContext,
}

impl<S: KeyValueStore> Studio<S> {
    /// Loads settings from `store` and uses the default adapters.
    pub fn new(store: S) -> Self {
        Self::with_dispatcher(store, Dispatcher::default())
    }

    /// Loads settings from `store` and uses the given dispatcher.
    pub fn with_dispatcher(store: S, dispatcher: Dispatcher) -> Self {
        let settings = SettingsStore::new(store);
        let session = SessionContext::new(settings.load(), settings.load_key());
        Self {
            settings,
            dispatcher,
            session,
        }
    }

    /// Session state, read-only.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// The latest result.
    pub fn current(&self) -> Option<&GenerationResult> {
        self.session.current()
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Runs one generation. Returns true if a new result is current.
    pub async fn generate(&mut self, input: &GenerateInput, presenter: &mut dyn Presenter) -> bool {
        let request = match input.to_request() {
            Ok(request) => request,
            Err(e) => {
                presenter.notify(Notification::error(e.user_message()));
                return false;
            }
        };

        let Some(_busy) = self.session.busy().try_acquire() else {
            tracing::debug!("generation already running, ignoring trigger");
            return false;
        };

        let provider = self.session.config.provider;
        presenter.show_pending();
        match self.dispatcher.dispatch(&mut self.session, &request).await {
            Ok(result) => {
                presenter.show_result(result);
                presenter.notify(Notification::success("Image generated successfully! ✨"));
                true
            }
            Err(e) => {
                tracing::error!(provider = %provider, "generation error: {e}");
                presenter.show_failed();
                presenter.notify(Notification::error(e.user_message()));
                false
            }
        }
    }

    /// Saves the current image into `dir`.
    pub async fn download(&self, dir: &Path, presenter: &mut dyn Presenter) -> Option<PathBuf> {
        let current = self.session.current()?;
        presenter.notify(Notification::info("Preparing download..."));

        match present::download(
            &current.image_ref,
            self.session.objects(),
            self.dispatcher.client(),
            dir,
        )
        .await
        {
            Ok(path) => {
                presenter.notify(Notification::success("Image downloaded! 📥"));
                Some(path)
            }
            Err(e) => {
                tracing::error!("download error: {e}");
                presenter.notify(Notification::error(
                    "Failed to download image. Try copying the URL instead.",
                ));
                None
            }
        }
    }

    /// Copies the current image (or its URL) to the clipboard.
    pub async fn copy(
        &self,
        clipboard: &mut dyn Clipboard,
        presenter: &mut dyn Presenter,
    ) -> Option<CopiedContent> {
        let current = self.session.current()?;

        match present::copy(&current.image_ref, self.session.objects(), clipboard).await {
            Ok(copied) => {
                let message = match copied {
                    CopiedContent::Image => "Image copied to clipboard! 📋",
                    CopiedContent::Url => "URL copied to clipboard! 📋",
                };
                presenter.notify(Notification::success(message));
                Some(copied)
            }
            Err(e) => {
                tracing::error!("copy error: {e}");
                presenter.notify(Notification::error(e.user_message()));
                None
            }
        }
    }

    /// Persists and applies a provider config. Returns false if rejected.
    pub fn save_settings(&mut self, config: ProviderConfig, presenter: &mut dyn Presenter) -> bool {
        match self.settings.save(&config) {
            Ok(()) => {
                self.session.config = self.settings.load();
                presenter.notify(Notification::success("Settings saved"));
                true
            }
            Err(e) => {
                tracing::warn!("settings not saved: {e}");
                presenter.notify(Notification::error(e.user_message()));
                false
            }
        }
    }

    /// Stores (or, if blank, clears) the Pollinations key.
    pub fn save_key(&mut self, key: &str, presenter: &mut dyn Presenter) -> bool {
        match self.settings.save_key(key) {
            Ok(stored) => {
                self.session.pollinations_key = self.settings.load_key();
                presenter.notify(Notification::success(if stored {
                    "API key saved"
                } else {
                    "API key cleared, using free mode"
                }));
                true
            }
            Err(e) => {
                tracing::warn!("API key not saved: {e}");
                presenter.notify(Notification::error(e.user_message()));
                false
            }
        }
    }

    /// Removes the Pollinations key.
    pub fn clear_key(&mut self, presenter: &mut dyn Presenter) -> bool {
        self.save_key("", presenter)
    }
}
