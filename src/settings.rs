//! Durable provider settings and API keys.
//!
//! Two entries live in a key-value store: a bare Pollinations key and the
//! full [`ProviderConfig`] as JSON. Loading never fails: anything missing or
//! unreadable yields the free Pollinations default.

use crate::error::{PollinateError, Result};
use crate::image::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Storage key for the bare Pollinations API key.
pub const API_KEY_ENTRY: &str = "pollinations_api_key";

/// Storage key for the serialized [`ProviderConfig`].
pub const SETTINGS_ENTRY: &str = "pollinations_settings";

/// Overrides the settings directory.
pub const CONFIG_DIR_ENV: &str = "POLLINATE_CONFIG_DIR";

const SETTINGS_FILE: &str = "settings.json";

/// Active provider plus stored keys for paid providers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider used for the next generation.
    pub provider: ProviderId,
    /// Keys by provider, kept when switching away.
    #[serde(default)]
    pub keys: BTreeMap<ProviderId, String>,
}

impl ProviderConfig {
    /// Returns the config with `provider` active.
    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = provider;
        self
    }

    /// Stores or clears (when blank) the key for a provider.
    pub fn set_key(&mut self, provider: ProviderId, key: &str) {
        match non_blank(key) {
            Some(key) => {
                self.keys.insert(provider, key);
            }
            None => {
                self.keys.remove(&provider);
            }
        }
    }

    /// Returns the trimmed key for a provider, if one is set.
    pub fn key_for(&self, provider: ProviderId) -> Option<&str> {
        self.keys
            .get(&provider)
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
    }

    /// Checks that the active provider can be used.
    pub fn validate(&self) -> Result<()> {
        if self.provider.is_paid() && self.key_for(self.provider).is_none() {
            return Err(PollinateError::MissingKey(self.provider));
        }
        Ok(())
    }

    fn normalized(&self) -> Self {
        let keys = self
            .keys
            .iter()
            .filter(|(id, _)| id.is_paid())
            .filter_map(|(id, k)| non_blank(k).map(|k| (*id, k)))
            .collect();
        Self {
            provider: self.provider,
            keys,
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// A durable string key-value store.
pub trait KeyValueStore {
    /// Reads an entry.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes an entry, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Deletes an entry. Removing a missing entry is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory store, for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by one JSON object file.
///
/// The file is read on every access and rewritten in full on every change.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Uses the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `settings.json` in the default config directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(default_config_dir()?.join(SETTINGS_FILE)))
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like `read_all`, but a file that no longer parses is replaced rather
    /// than blocking every later write.
    fn read_for_update(&self) -> Result<BTreeMap<String, String>> {
        match self.read_all() {
            Err(PollinateError::Json(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "overwriting malformed settings file: {e}"
                );
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut entries = self.read_for_update()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Resolves `$POLLINATE_CONFIG_DIR`, then `$XDG_CONFIG_HOME/pollinate`,
/// then `$HOME/.config/pollinate`.
pub fn default_config_dir() -> Result<PathBuf> {
    let var = |name: &str| std::env::var_os(name).filter(|v| !v.is_empty());

    if let Some(dir) = var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(dir).join("pollinate"));
    }
    if let Some(home) = var("HOME").or_else(|| var("USERPROFILE")) {
        return Ok(PathBuf::from(home).join(".config").join("pollinate"));
    }
    Err(PollinateError::Validation(format!(
        "cannot locate a config directory; set {CONFIG_DIR_ENV}"
    )))
}

/// Reads and writes provider settings through a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct SettingsStore<S> {
    store: S,
}

impl<S: KeyValueStore> SettingsStore<S> {
    /// Wraps a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Loads the provider config, falling back to the default on any problem.
    pub fn load(&self) -> ProviderConfig {
        let raw = match self.store.get(SETTINGS_ENTRY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ProviderConfig::default(),
            Err(e) => {
                tracing::warn!("failed to read settings, using defaults: {e}");
                return ProviderConfig::default();
            }
        };

        match serde_json::from_str::<ProviderConfig>(&raw) {
            Ok(config) => config.normalized(),
            Err(e) => {
                tracing::warn!("ignoring malformed settings: {e}");
                ProviderConfig::default()
            }
        }
    }

    /// Validates and persists the full config.
    ///
    /// A paid provider without a key is rejected and nothing is written.
    pub fn save(&mut self, config: &ProviderConfig) -> Result<()> {
        let config = config.normalized();
        config.validate()?;
        self.store
            .set(SETTINGS_ENTRY, &serde_json::to_string(&config)?)?;
        tracing::debug!(provider = %config.provider, "saved settings");
        Ok(())
    }

    /// Loads the bare Pollinations key.
    pub fn load_key(&self) -> Option<String> {
        match self.store.get(API_KEY_ENTRY) {
            Ok(value) => value.as_deref().and_then(non_blank),
            Err(e) => {
                tracing::warn!("failed to read API key: {e}");
                None
            }
        }
    }

    /// Saves the bare Pollinations key. A blank key clears it.
    ///
    /// Returns true if a key is now stored.
    pub fn save_key(&mut self, key: &str) -> Result<bool> {
        match non_blank(key) {
            Some(key) => {
                self.store.set(API_KEY_ENTRY, &key)?;
                Ok(true)
            }
            None => {
                self.clear_key()?;
                Ok(false)
            }
        }
    }

    /// Removes the bare Pollinations key, reverting to free mode.
    pub fn clear_key(&mut self) -> Result<()> {
        self.store.remove(API_KEY_ENTRY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SettingsStore<MemoryStore> {
        SettingsStore::new(MemoryStore::new())
    }

    #[test]
    fn test_load_defaults_when_empty() {
        let config = store().load();
        assert_eq!(config.provider, ProviderId::Pollinations);
        assert!(config.keys.is_empty());
    }

    #[test]
    fn test_load_defaults_on_malformed_json() {
        let mut mem = MemoryStore::new();
        mem.set(SETTINGS_ENTRY, "{not json").unwrap();
        assert_eq!(SettingsStore::new(mem).load(), ProviderConfig::default());

        let mut mem = MemoryStore::new();
        mem.set(SETTINGS_ENTRY, r#"{"provider":"midjourney"}"#).unwrap();
        assert_eq!(SettingsStore::new(mem).load(), ProviderConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let mut settings = store();
        let mut config = ProviderConfig::default().with_provider(ProviderId::Stability);
        config.set_key(ProviderId::Stability, "  sk-st  ");
        config.set_key(ProviderId::OpenAi, "sk-oa");
        settings.save(&config).unwrap();

        let loaded = settings.load();
        assert_eq!(loaded.provider, ProviderId::Stability);
        assert_eq!(loaded.key_for(ProviderId::Stability), Some("sk-st"));
        assert_eq!(loaded.key_for(ProviderId::OpenAi), Some("sk-oa"));
    }

    #[test]
    fn test_wire_format() {
        let mut settings = store();
        let mut config = ProviderConfig::default().with_provider(ProviderId::OpenAi);
        config.set_key(ProviderId::OpenAi, "sk-oa");
        settings.save(&config).unwrap();

        let raw = settings.inner().get(SETTINGS_ENTRY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"provider": "openai", "keys": {"openai": "sk-oa"}})
        );
    }

    #[test]
    fn test_paid_provider_without_key_blocks_save() {
        let mut settings = store();
        let mut original = ProviderConfig::default().with_provider(ProviderId::OpenAi);
        original.set_key(ProviderId::OpenAi, "sk-oa");
        settings.save(&original).unwrap();

        let switched = original.clone().with_provider(ProviderId::Together);
        let err = settings.save(&switched).unwrap_err();
        assert!(matches!(err, PollinateError::MissingKey(ProviderId::Together)));

        let mut blank = original.clone().with_provider(ProviderId::Stability);
        blank.keys.insert(ProviderId::Stability, "   ".into());
        assert!(settings.save(&blank).is_err());

        assert_eq!(settings.load(), original);
    }

    #[test]
    fn test_switching_keeps_inactive_keys() {
        let mut settings = store();
        let mut config = ProviderConfig::default().with_provider(ProviderId::OpenAi);
        config.set_key(ProviderId::OpenAi, "sk-oa");
        settings.save(&config).unwrap();

        let config = settings.load().with_provider(ProviderId::Pollinations);
        settings.save(&config).unwrap();

        let reloaded = settings.load();
        assert_eq!(reloaded.provider, ProviderId::Pollinations);
        assert_eq!(reloaded.key_for(ProviderId::OpenAi), Some("sk-oa"));
    }

    #[test]
    fn test_single_key_variant() {
        let mut settings = store();
        assert_eq!(settings.load_key(), None);

        assert!(settings.save_key("  pk-live ").unwrap());
        assert_eq!(settings.load_key().as_deref(), Some("pk-live"));

        assert!(!settings.save_key("   ").unwrap());
        assert_eq!(settings.load_key(), None);

        settings.save_key("pk").unwrap();
        settings.clear_key().unwrap();
        assert_eq!(settings.load_key(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        let mut settings = SettingsStore::new(FileStore::new(&path));
        let mut config = ProviderConfig::default().with_provider(ProviderId::Together);
        config.set_key(ProviderId::Together, "tg");
        settings.save(&config).unwrap();
        settings.save_key("pk").unwrap();

        let reopened = SettingsStore::new(FileStore::new(&path));
        assert_eq!(reopened.load(), config);
        assert_eq!(reopened.load_key().as_deref(), Some("pk"));
    }

    #[test]
    fn test_file_store_corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "[1, 2").unwrap();

        let settings = SettingsStore::new(FileStore::new(&path));
        assert_eq!(settings.load(), ProviderConfig::default());
        assert_eq!(settings.load_key(), None);
    }

    #[test]
    fn test_file_store_corrupt_file_is_overwritten_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "[1, 2").unwrap();

        let mut settings = SettingsStore::new(FileStore::new(&path));
        settings.clear_key().unwrap();
        settings.save(&ProviderConfig::default()).unwrap();
        settings.save_key("pk").unwrap();

        let reopened = SettingsStore::new(FileStore::new(&path));
        assert_eq!(reopened.load(), ProviderConfig::default());
        assert_eq!(reopened.load_key().as_deref(), Some("pk"));

        std::fs::write(&path, "{not json").unwrap();
        let mut settings = SettingsStore::new(FileStore::new(&path));
        let mut config = ProviderConfig::default().with_provider(ProviderId::Together);
        config.set_key(ProviderId::Together, "tg");
        settings.save(&config).unwrap();
        assert_eq!(settings.load(), config);
        assert_eq!(settings.load_key(), None);
    }

    #[test]
    fn test_file_store_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join(SETTINGS_FILE));
        store.remove(API_KEY_ENTRY).unwrap();
        assert!(!store.path().exists());
    }
}
