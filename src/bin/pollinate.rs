//! CLI for Pollinate - text-to-image generation.

use clap::{Args, Parser, Subcommand};
use pollinate::present::SystemClipboard;
use pollinate::settings::{FileStore, KeyValueStore};
use pollinate::{
    GenerateInput, GenerationOptions, GenerationResult, Notification, NotificationLevel,
    Presenter, ProviderConfig, ProviderId, Seed, SettingsStore, Studio,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pollinate")]
#[command(about = "Generate images from text via Pollinations, OpenAI, Stability AI or Together AI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image with the configured provider
    Generate(GenerateArgs),

    /// Show or change provider settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Manage the Pollinations API key
    #[command(subcommand)]
    Key(KeyCommand),

    /// List available providers
    Providers,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the image
    prompt: String,

    /// Model identifier
    #[arg(short, long, default_value = pollinate::image::DEFAULT_MODEL)]
    model: String,

    /// Image size as WIDTHxHEIGHT
    #[arg(short, long, default_value = "1024x1024")]
    size: String,

    /// Seed for deterministic generation, sent as given
    #[arg(long)]
    seed: Option<String>,

    /// What the image should not contain
    #[arg(long)]
    negative_prompt: Option<String>,

    /// Let the provider rewrite the prompt (keyed Pollinations only)
    #[arg(long)]
    enhance: bool,

    /// Ask for strict content filtering
    #[arg(long)]
    safe: bool,

    /// Save the image into this directory
    #[arg(short, long)]
    download: Option<PathBuf>,

    /// Copy the image (or its URL) to the clipboard
    #[arg(long)]
    copy: bool,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print the active provider and which keys are stored
    Show,

    /// Switch provider and store keys
    Set(SetArgs),
}

#[derive(Args)]
struct SetArgs {
    /// Provider to activate (pollinations, openai, stability, together)
    #[arg(short, long)]
    provider: Option<ProviderId>,

    /// OpenAI API key (empty to remove)
    #[arg(long)]
    openai_key: Option<String>,

    /// Stability AI API key (empty to remove)
    #[arg(long)]
    stability_key: Option<String>,

    /// Together AI API key (empty to remove)
    #[arg(long)]
    together_key: Option<String>,
}

#[derive(Subcommand)]
enum KeyCommand {
    /// Show whether a key is stored
    Show,
    /// Store a key, enabling the paid endpoint
    Set {
        /// The API key
        key: String,
    },
    /// Remove the key and return to free mode
    Clear,
}

/// Writes notifications to stderr and results to stdout.
struct ConsolePresenter {
    json: bool,
    failed: bool,
    errors: Vec<String>,
    result: Option<GenerationResult>,
}

impl ConsolePresenter {
    fn new(json: bool) -> Self {
        Self {
            json,
            failed: false,
            errors: Vec::new(),
            result: None,
        }
    }
}

impl Presenter for ConsolePresenter {
    fn show_pending(&mut self) {
        if !self.json {
            eprintln!("Generating...");
        }
    }

    fn show_result(&mut self, result: &GenerationResult) {
        self.result = Some(result.clone());
        if !self.json {
            println!("{}", result.image_ref.as_uri());
            println!(
                "{} · {} · {} · {}",
                result.provider_label, result.model_label, result.size_label, result.timestamp
            );
        }
    }

    fn show_failed(&mut self) {
        self.failed = true;
    }

    fn notify(&mut self, notification: Notification) {
        if notification.level == NotificationLevel::Error {
            self.errors.push(notification.message.clone());
        }
        if !self.json {
            eprintln!("{}", notification.message);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pollinate=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = FileStore::open_default()?;

    match cli.command {
        Commands::Generate(args) => generate(store, args, cli.json).await?,
        Commands::Settings(SettingsCommand::Show) => show_settings(store, cli.json)?,
        Commands::Settings(SettingsCommand::Set(args)) => set_settings(store, args, cli.json)?,
        Commands::Key(command) => key(store, command, cli.json)?,
        Commands::Providers => list_providers(cli.json)?,
    }

    Ok(())
}

async fn generate(store: FileStore, args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let mut studio = Studio::new(store);
    let mut presenter = ConsolePresenter::new(json_output);

    let input = GenerateInput::new(&args.prompt)
        .model(&args.model)
        .size(&args.size)
        .options(GenerationOptions {
            negative_prompt: args.negative_prompt,
            seed: args.seed.as_deref().map(Seed::from),
            enhance: args.enhance,
            safe: args.safe,
        });

    if !studio.generate(&input, &mut presenter).await {
        if json_output {
            let result = serde_json::json!({
                "success": false,
                "error": presenter.errors.last(),
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        let reason = presenter
            .errors
            .last()
            .cloned()
            .unwrap_or_else(|| {
                if presenter.failed {
                    "generation failed".into()
                } else {
                    "another generation is already running".into()
                }
            });
        anyhow::bail!(reason);
    }

    let saved = match &args.download {
        Some(dir) => studio.download(dir, &mut presenter).await,
        None => None,
    };
    let copied = if args.copy {
        studio.copy(&mut SystemClipboard, &mut presenter).await
    } else {
        None
    };

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "result": presenter.result,
            "downloaded": saved.map(|p| p.display().to_string()),
            "copied": copied.is_some(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(())
}

fn show_settings(store: FileStore, json_output: bool) -> anyhow::Result<()> {
    let path = store.path().to_path_buf();
    let settings = SettingsStore::new(store);
    let config = settings.load();
    let has_key = settings.load_key().is_some();

    if json_output {
        let stored: Vec<&str> = config.keys.keys().map(|id| id.as_str()).collect();
        let result = serde_json::json!({
            "file": path.display().to_string(),
            "provider": config.provider,
            "stored_keys": stored,
            "pollinations_key": has_key,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Settings file: {}", path.display());
        println!("Provider: {} ({})", config.provider.label(), config.provider);
        println!(
            "Pollinations key: {}",
            if has_key { "set" } else { "not set (free mode)" }
        );
        for id in ProviderId::ALL.iter().filter(|id| id.is_paid()) {
            let status = if config.key_for(*id).is_some() { "set" } else { "-" };
            println!("  {} key: {}", id.label(), status);
        }
    }
    Ok(())
}

fn set_settings(store: FileStore, args: SetArgs, json_output: bool) -> anyhow::Result<()> {
    let mut studio = Studio::new(store);
    let mut presenter = ConsolePresenter::new(json_output);

    let mut config: ProviderConfig = studio.session().config.clone();
    if let Some(provider) = args.provider {
        config = config.with_provider(provider);
    }
    for (id, key) in [
        (ProviderId::OpenAi, &args.openai_key),
        (ProviderId::Stability, &args.stability_key),
        (ProviderId::Together, &args.together_key),
    ] {
        if let Some(key) = key {
            config.set_key(id, key);
        }
    }

    if !studio.save_settings(config, &mut presenter) {
        anyhow::bail!(presenter
            .errors
            .last()
            .cloned()
            .unwrap_or_else(|| "settings not saved".into()));
    }
    if json_output {
        let result = serde_json::json!({
            "success": true,
            "provider": studio.session().config.provider,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}

fn key(store: FileStore, command: KeyCommand, json_output: bool) -> anyhow::Result<()> {
    let mut studio = Studio::new(store.clone());
    let mut presenter = ConsolePresenter::new(json_output);

    let ok = match command {
        KeyCommand::Show => {
            let stored = store.get(pollinate::settings::API_KEY_ENTRY)?.is_some();
            if json_output {
                println!("{}", serde_json::json!({ "pollinations_key": stored }));
            } else {
                println!(
                    "Pollinations key: {}",
                    if stored { "set" } else { "not set (free mode)" }
                );
            }
            return Ok(());
        }
        KeyCommand::Set { key } => studio.save_key(&key, &mut presenter),
        KeyCommand::Clear => studio.clear_key(&mut presenter),
    };

    if !ok {
        anyhow::bail!("failed to update API key");
    }
    if json_output {
        let mode = if studio.session().pollinations_key.is_some() {
            "paid"
        } else {
            "free"
        };
        println!("{}", serde_json::json!({ "success": true, "mode": mode }));
    }
    Ok(())
}

fn list_providers(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct ProviderInfo {
        name: &'static str,
        kind: &'static str,
        requires_key: bool,
        enabled: bool,
    }

    let dispatcher = pollinate::Dispatcher::default();
    let registry = dispatcher.registry();
    let providers: Vec<ProviderInfo> = ProviderId::ALL
        .iter()
        .map(|id| ProviderInfo {
            name: id.label(),
            kind: id.as_str(),
            requires_key: id.is_paid(),
            enabled: registry.contains(*id),
        })
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&providers)?);
    } else {
        println!("Available providers:\n");
        for p in &providers {
            let status = if p.enabled { "✓" } else { "✗" };
            println!("  {} {} ({})", status, p.name, p.kind);
            if p.requires_key {
                println!("    API key: required (pollinate settings set --{}-key)", p.kind);
            } else {
                println!("    API key: optional (pollinate key set)");
            }
        }
    }

    Ok(())
}
