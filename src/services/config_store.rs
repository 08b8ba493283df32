// Configuration Storage Service
// Handles config file read/write, version backup and credential lookup

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::providers::{
    SightengineCredentials, DEFAULT_REQUEST_TIMEOUT_SECS, SAPLING_DEFAULT_URL,
    SIGHTENGINE_DEFAULT_URL,
};

pub const SAPLING: &str = "sapling";
pub const SIGHTENGINE: &str = "sightengine";
pub const SIGHTENGINE_USER: &str = "sightengine_user";
pub const SIGHTENGINE_SECRET: &str = "sightengine_secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub demo_mode: bool,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            demo_mode: false,
            detection: DetectionConfig::default(),
            providers: HashMap::new(),
            api_keys: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            max_poll_attempts: 60,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl DetectionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub base_url: Option<String>,
}

fn default_version() -> String { env!("CARGO_PKG_VERSION").to_string() }
fn default_poll_interval() -> u64 { 2 }
fn default_max_poll_attempts() -> u32 { 60 }
fn default_request_timeout() -> u64 { DEFAULT_REQUEST_TIMEOUT_SECS }

/// Names accepted by `set_api_key` / `delete_api_key`.
pub const CREDENTIAL_KEYS: [&str; 3] = [SAPLING, SIGHTENGINE_USER, SIGHTENGINE_SECRET];
/// Names accepted by `set_provider_url`.
pub const PROVIDERS: [&str; 2] = [SAPLING, SIGHTENGINE];

const MAX_BACKUPS: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a valid aiscope config: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown credential '{0}', expected one of: sapling, sightengine_user, sightengine_secret")]
    UnknownCredential(String),

    #[error("unknown provider '{0}', expected sapling or sightengine")]
    UnknownProvider(String),

    #[error("refusing to store an empty value for '{0}'")]
    EmptyValue(&'static str),

    #[error("{provider} base URL must start with http:// or https://, got '{url}'")]
    InvalidUrl { provider: &'static str, url: String },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError + '_ {
    move |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn canonical(name: &str, known: &[&'static str]) -> Option<&'static str> {
    let name = name.trim().to_ascii_lowercase();
    known.iter().copied().find(|k| *k == name)
}

/// Credential key as stored in `apiKeys`; case and surrounding space are ignored.
pub fn credential_key(name: &str) -> Result<&'static str, ConfigError> {
    canonical(name, &CREDENTIAL_KEYS).ok_or_else(|| ConfigError::UnknownCredential(name.to_string()))
}

pub fn provider_name(name: &str) -> Result<&'static str, ConfigError> {
    canonical(name, &PROVIDERS).ok_or_else(|| ConfigError::UnknownProvider(name.to_string()))
}

/// JSON file of provider credentials and endpoints, with rolling backups.
pub struct ConfigStore {
    dir: PathBuf,
    file: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: PathBuf) -> Self {
        let file = dir.join("config.json");
        Self { dir, file }
    }

    /// `<user config dir>/aiscope`
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("aiscope"))
    }

    pub fn config_file(&self) -> &Path {
        &self.file
    }

    fn backup_dir(&self) -> PathBuf {
        self.dir.join("backups")
    }

    /// A missing file reads as the default config.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.file.exists() {
            return Ok(AppConfig::default());
        }
        let raw = fs::read_to_string(&self.file).map_err(io_error(&self.file))?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Malformed {
            path: self.file.clone(),
            source,
        })
    }

    /// Write the config, first copying the current file into `backups/`.
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        if self.file.exists() {
            self.backup_current()?;
        }

        let json = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Malformed {
            path: self.file.clone(),
            source,
        })?;
        fs::write(&self.file, json).map_err(io_error(&self.file))
    }

    fn backup_current(&self) -> Result<(), ConfigError> {
        let backups = self.backup_dir();
        fs::create_dir_all(&backups).map_err(io_error(&backups))?;

        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let target = backups.join(format!("config_{}.json", stamp));
        fs::copy(&self.file, &target).map_err(io_error(&target))?;

        prune_backups(&backups, MAX_BACKUPS)
    }

    fn update<F>(&self, edit: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.load()?;
        edit(&mut config);
        self.save(&config)
    }

    /// Stored value for a credential key, ignoring environment overrides.
    pub fn api_key(&self, name: &str) -> Result<Option<String>, ConfigError> {
        let key = credential_key(name)?;
        Ok(self.load()?.api_keys.get(key).cloned())
    }

    pub fn set_api_key(&self, name: &str, value: &str) -> Result<(), ConfigError> {
        let key = credential_key(name)?;
        let value = non_empty(value).ok_or(ConfigError::EmptyValue(key))?;
        self.update(|config| {
            config.api_keys.insert(key.to_string(), value);
        })
    }

    /// Returns whether a stored value was removed.
    pub fn delete_api_key(&self, name: &str) -> Result<bool, ConfigError> {
        let key = credential_key(name)?;
        let mut config = self.load()?;
        if config.api_keys.remove(key).is_none() {
            return Ok(false);
        }
        self.save(&config)?;
        Ok(true)
    }

    pub fn provider_url(&self, name: &str) -> Result<Option<String>, ConfigError> {
        let provider = provider_name(name)?;
        Ok(self
            .load()?
            .providers
            .get(provider)
            .and_then(|p| p.base_url.clone()))
    }

    pub fn set_provider_url(&self, name: &str, url: &str) -> Result<(), ConfigError> {
        let provider = provider_name(name)?;
        let url = non_empty(url).ok_or(ConfigError::EmptyValue(provider))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl { provider, url });
        }
        self.update(|config| {
            config.providers.entry(provider.to_string()).or_default().base_url =
                Some(url.trim_end_matches('/').to_string());
        })
    }
}

/// Keep the newest `keep` backups; file names sort by their timestamp.
fn prune_backups(dir: &Path, keep: usize) -> Result<(), ConfigError> {
    let mut backups: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_error(dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    if backups.len() <= keep {
        return Ok(());
    }

    backups.sort();
    let stale = backups.len() - keep;
    for path in backups.into_iter().take(stale) {
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "config.backup.prune_failed");
        }
    }
    Ok(())
}

// ============ Environment Overrides ============

fn env_names(key: &str) -> &'static [&'static str] {
    match key {
        SAPLING => &["SAPLING_API_KEY", "AISCOPE_SAPLING_API_KEY"],
        SIGHTENGINE_USER => &["SIGHTENGINE_API_USER", "AISCOPE_SIGHTENGINE_API_USER"],
        SIGHTENGINE_SECRET => &["SIGHTENGINE_API_SECRET", "AISCOPE_SIGHTENGINE_API_SECRET"],
        _ => &[],
    }
}

fn url_env_name(provider: &str) -> Option<&'static str> {
    match provider {
        SAPLING => Some("SAPLING_API_URL"),
        SIGHTENGINE => Some("SIGHTENGINE_API_URL"),
        _ => None,
    }
}

fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn non_empty(val: &str) -> Option<String> {
    let v = val.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// API key from environment first, then the config file.
pub fn lookup_api_key<E>(config: &AppConfig, key: &str, env_lookup: E) -> Option<String>
where
    E: Fn(&str) -> Option<String>,
{
    env_names(key)
        .iter()
        .find_map(|name| env_lookup(*name).as_deref().and_then(non_empty))
        .or_else(|| config.api_keys.get(key).and_then(|v| non_empty(v)))
}

/// Provider base URL from environment, then the config file, then the default.
pub fn lookup_provider_url<E>(config: &AppConfig, provider: &str, env_lookup: E) -> String
where
    E: Fn(&str) -> Option<String>,
{
    url_env_name(provider)
        .and_then(|name| env_lookup(name))
        .as_deref()
        .and_then(non_empty)
        .or_else(|| {
            config
                .providers
                .get(provider)
                .and_then(|p| p.base_url.as_deref())
                .and_then(non_empty)
        })
        .unwrap_or_else(|| match provider {
            SAPLING => SAPLING_DEFAULT_URL.to_string(),
            _ => SIGHTENGINE_DEFAULT_URL.to_string(),
        })
}

pub fn demo_mode_enabled<E>(config: &AppConfig, env_lookup: E) -> bool
where
    E: Fn(&str) -> Option<String>,
{
    match env_lookup("AISCOPE_DEMO_MODE").as_deref().map(str::trim) {
        Some("1") | Some("true") | Some("TRUE") => true,
        Some("0") | Some("false") | Some("FALSE") => false,
        _ => config.demo_mode,
    }
}

/// Provider credentials; an absent entry surfaces as a configuration error
/// when the detector that needs it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub sapling_api_key: Option<String>,
    pub sightengine: Option<SightengineCredentials>,
}

impl Credentials {
    pub fn resolve(config: &AppConfig) -> Self {
        Self::resolve_with(config, process_env)
    }

    pub fn resolve_with<E>(config: &AppConfig, env_lookup: E) -> Self
    where
        E: Fn(&str) -> Option<String>,
    {
        let sapling_api_key = lookup_api_key(config, SAPLING, &env_lookup);
        let user = lookup_api_key(config, SIGHTENGINE_USER, &env_lookup);
        let secret = lookup_api_key(config, SIGHTENGINE_SECRET, &env_lookup);
        let sightengine = match (user, secret) {
            (Some(api_user), Some(api_secret)) => Some(SightengineCredentials { api_user, api_secret }),
            _ => None,
        };

        Self {
            sapling_api_key,
            sightengine,
        }
    }
}

/// Loaded configuration with environment overrides applied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: AppConfig,
    pub demo_mode: bool,
    pub credentials: Credentials,
    pub sapling_url: String,
    pub sightengine_url: String,
}

impl Settings {
    pub fn from_config(config: AppConfig) -> Self {
        Self::from_config_with(config, process_env)
    }

    pub fn from_config_with<E>(config: AppConfig, env_lookup: E) -> Self
    where
        E: Fn(&str) -> Option<String>,
    {
        Self {
            demo_mode: demo_mode_enabled(&config, &env_lookup),
            credentials: Credentials::resolve_with(&config, &env_lookup),
            sapling_url: lookup_provider_url(&config, SAPLING, &env_lookup),
            sightengine_url: lookup_provider_url(&config, SIGHTENGINE, &env_lookup),
            config,
        }
    }

    /// Load from the default config location, falling back to defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        let config = match ConfigStore::default_config_dir() {
            Some(dir) => ConfigStore::new(dir).load()?,
            None => AppConfig::default(),
        };
        Ok(Self::from_config(config))
    }
}
