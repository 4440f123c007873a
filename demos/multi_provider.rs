//! Switching providers through persisted settings.
//!
//! Run with: `cargo run --example multi_provider`
//!
//! Picks the first of `OPENAI_API_KEY`, `STABILITY_API_KEY` or
//! `TOGETHER_API_KEY` that is set, and falls back to free Pollinations.

use pollinate::settings::MemoryStore;
use pollinate::{
    GenerateInput, GenerationResult, Notification, Presenter, ProviderConfig, ProviderId, Studio,
};

struct PrintPresenter;

impl Presenter for PrintPresenter {
    fn show_pending(&mut self) {
        println!("Generating...");
    }

    fn show_result(&mut self, result: &GenerationResult) {
        println!(
            "{} / {} / {} at {}",
            result.provider_label, result.model_label, result.size_label, result.timestamp
        );
        println!("{}", result.image_ref.as_uri());
    }

    fn show_failed(&mut self) {
        println!("No image this time.");
    }

    fn notify(&mut self, notification: Notification) {
        println!("[{:?}] {}", notification.level, notification.message);
    }
}

#[tokio::main]
async fn main() {
    let mut studio = Studio::new(MemoryStore::new());
    let mut presenter = PrintPresenter;

    let mut config = ProviderConfig::default();
    for (id, var) in [
        (ProviderId::OpenAi, "OPENAI_API_KEY"),
        (ProviderId::Stability, "STABILITY_API_KEY"),
        (ProviderId::Together, "TOGETHER_API_KEY"),
    ] {
        if let Ok(key) = std::env::var(var) {
            config.set_key(id, &key);
            if config.provider == ProviderId::Pollinations {
                config = config.with_provider(id);
            }
        }
    }
    studio.save_settings(config, &mut presenter);
    println!("Provider: {}", studio.session().config.provider.label());

    let input = GenerateInput::new("A serene mountain lake at dawn").size("1024x1024");
    if studio.generate(&input, &mut presenter).await {
        let dir = std::env::temp_dir();
        if let Some(path) = studio.download(&dir, &mut presenter).await {
            println!("Saved to {}", path.display());
        }
    }
}
